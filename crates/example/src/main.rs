//! Demo CLI for sprout.
//!
//! Without arguments, creates a temporary file, watches it, writes to it and
//! prints the update the watch delivers. With an address, follows that
//! resource until interrupted.
//!
//! # Usage
//!
//! ```bash
//! sprout-demo [address]
//! ```
//!
//! # Example
//!
//! ```bash
//! sprout-demo ./config.json
//! STORAGE_EMULATOR_HOST=localhost:4443 sprout-demo gs://bucket/config.json
//! ```

use sprout_core::{FnHandler, TracingConfig, TracingFormat};
use sprout_resource::{CancellationToken, ResourceFactory};
use sprout_watch::{WatchConfig, Watcher, watch};
use std::error::Error;
use std::time::Duration;

const DEMO_INTERVAL: Duration = Duration::from_millis(500);

type DemoResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    TracingConfig::new().with_format(TracingFormat::Compact).init();

    let args: Vec<String> = std::env::args().collect();
    let result = match args.get(1) {
        Some(address) => follow(address).await,
        None => walkthrough().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Writes to a watched temp file and prints the delivered update.
async fn walkthrough() -> DemoResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sprout-demo.txt");
    tokio::fs::write(&path, "").await?;

    let resource = ResourceFactory::default()
        .create(path.to_string_lossy())
        .await?;

    let (updates_tx, mut updates) = tokio::sync::mpsc::unbounded_channel();
    let handler = FnHandler::new(move |bytes| {
        let _ = updates_tx.send(String::from_utf8_lossy(&bytes).into_owned());
    });

    let cancel = CancellationToken::new();
    let mut handle = watch(cancel.clone(), DEMO_INTERVAL, resource, handler);
    println!("watching {}", path.display());

    tokio::fs::write(&path, "lol").await?;
    println!("wrote \"lol\"");

    let update = tokio::select! {
        Some(update) = updates.recv() => update,
        Some(err) = handle.next_error() => return Err(err.into()),
        else => return Err("watch stopped before delivering an update".into()),
    };
    println!("update: {update}");

    handle.stop().await?;
    Ok(())
}

/// Prints every revision of `address` until Ctrl-C.
async fn follow(address: &str) -> DemoResult {
    let resource = ResourceFactory::default().create(address).await?;

    let handler = FnHandler::new(|bytes| {
        println!("--- update ({} bytes) ---", bytes.len());
        println!("{}", String::from_utf8_lossy(&bytes));
    })
    .with_error(|err| eprintln!("refresh failed: {err}"));

    let watcher = Watcher::new(WatchConfig::new(DEMO_INTERVAL))?;
    let mut handle = watcher.spawn(CancellationToken::new(), resource, handler);
    tracing::info!(%address, "following, press Ctrl-C to stop");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            Some(err) = handle.next_error() => eprintln!("poll failed: {err}"),
        }
    }

    handle.stop().await?;
    Ok(())
}
