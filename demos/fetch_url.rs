use openid_fetchers::net::build_fetcher;
use openid_fetchers::{get_default_fetcher, set_default_fetcher, Engine, FetcherConfig};

// Usage: fetch_url <url> [reqwest|curl|ureq|stdlib] [post-body]
//
// Without an engine the default fetcher picks the best one compiled in.
// RUST_LOG=debug shows the redirect hops.
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "https://example.com/".to_string());
    let engine = match args.next().as_deref() {
        Some("reqwest") => Some(Engine::Reqwest),
        Some("curl") => Some(Engine::Curl),
        Some("ureq") => Some(Engine::Ureq),
        Some("stdlib") => Some(Engine::Std),
        _ => None,
    };
    let body = args.next();

    if let Some(engine) = engine {
        match build_fetcher(engine, &FetcherConfig::default()) {
            Ok(fetcher) => set_default_fetcher(Some(fetcher), true),
            Err(e) => {
                eprintln!("Cannot use {}: {}", engine, e);
                std::process::exit(2);
            }
        }
    }

    let fetcher = get_default_fetcher().expect("default fetcher");
    println!("Fetching {} with {}", url, fetcher.name());

    match openid_fetchers::fetch(&url, body.as_deref().map(str::as_bytes), None) {
        Ok(resp) => {
            println!("{} {}", resp.status(), resp.status_text());
            println!("Final URL: {}", resp.final_url());
            for (name, value) in resp.headers() {
                println!("  {}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            println!("{} bytes of body", resp.body().len());
        }
        Err(e) => {
            eprintln!("Fetch failed: {}", e);
            if let Some(kind) = e.kind() {
                eprintln!("Kind: {:?}", kind);
            }
            std::process::exit(1);
        }
    }
}
