//! Download a URL to a file, printing progress while the transfer runs.
//!
//! Run with: cargo run --example download_file -- <url> <destination>

use std::pin::pin;
use std::time::Duration;

use anyhow::Result;
use scriptnet_bridge::{DownloadParams, Outcome, Session};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let url = args.next();
    let destination = args.next();

    let session = Session::new();
    let promise = session.download(DownloadParams {
        url,
        destination,
        ..Default::default()
    })?;

    let started = match promise.settle().await {
        Outcome::Resolved(started) => started,
        Outcome::Rejected(e) => anyhow::bail!("download failed: {e}"),
    };
    println!("length: {} bytes", started.length);

    let progress = started.progress;
    let mut done = pin!(started.promise.settle());
    loop {
        tokio::select! {
            outcome = &mut done => {
                match outcome {
                    Outcome::Resolved(msg) => println!("{msg}"),
                    Outcome::Rejected(e) => anyhow::bail!("transfer failed: {e} ({:?})", e.kind),
                }
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if let Some(count) = progress.get() {
                    println!("{count} / {} bytes", started.length);
                }
            }
        }
    }

    Ok(())
}
