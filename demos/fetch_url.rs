//! Fetch a URL through the bridge and print the result.
//!
//! Run with: cargo run --example fetch_url -- https://example.com/

use anyhow::Result;
use scriptnet_bridge::{FetchOutput, FetchParams, Outcome, Session};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com/".to_string());

    let session = Session::new();
    let promise = session.fetch(FetchParams { url: Some(url), ..Default::default() })?;

    match promise.settle().await {
        Outcome::Resolved(FetchOutput::Response { body, status, headers }) => {
            println!("status: {status}");
            for (name, value) in &headers {
                println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
            }
            println!("\n{body}");
        }
        Outcome::Resolved(FetchOutput::Body(body)) => println!("{body}"),
        Outcome::Rejected(e) => anyhow::bail!("fetch failed: {e}"),
    }

    Ok(())
}
