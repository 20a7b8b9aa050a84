//! Replay a capture file on a worker thread and print the final registry.
//!
//! Run with:
//!   cargo run --example capture-summary -- capture.bin
//!
//! Make a capture with:
//!   cargo run --features cli -- emit capture.bin -r 1=20.5 -r 2=3.3

use std::fs::File;
use std::sync::mpsc;

use measlink::session::{Pipeline, StopReason, Worker};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: capture-summary <capture-file>")?;

    let (tx, rx) = mpsc::channel();
    let handle = Worker::new(File::open(&path)?, Pipeline::default())
        .with_updates(tx)
        .spawn()?;

    // The sender is dropped when the worker finishes, which ends this loop.
    for update in rx {
        eprintln!("{} -> {}", update.measurement.label(), update.measurement.latest_value);
    }

    let exit = handle.join()?;
    if let StopReason::Failed(err) = exit.reason {
        return Err(err.into());
    }

    for m in exit.pipeline.registry().iter() {
        println!("{:>5}  {:<16} {}", m.id, m.label(), m.latest_value);
    }
    let stats = exit.pipeline.stats();
    println!("{} frame(s), {} malformed", stats.frames, stats.malformed);
    Ok(())
}
