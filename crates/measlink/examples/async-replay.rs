//! Replay a capture file through the tokio read loop.
//!
//! Run with:
//!   cargo run --example async-replay --features async -- capture.bin

use measlink::session::{run_async, Pipeline, StopReason};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: async-replay <capture-file>")?;
    let bytes = std::fs::read(&path)?;

    let mut pipeline = Pipeline::default();
    let (tx, rx) = std::sync::mpsc::channel();
    pipeline.registry_mut().notifier_mut().forward_to(tx);

    let exit = run_async(bytes.as_slice(), pipeline, CancellationToken::new()).await;
    if let StopReason::Failed(err) = exit.reason {
        return Err(err.into());
    }

    for event in rx.try_iter() {
        println!("{event}");
    }
    println!("{} measurement(s)", exit.pipeline.registry().len());
    Ok(())
}
