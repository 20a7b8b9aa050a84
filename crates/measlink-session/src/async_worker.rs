//! Tokio variant of the read loop.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DEFAULT_READ_CHUNK_SIZE;
use crate::pipeline::Pipeline;
use crate::worker::{StopReason, WorkerExit};

/// Read from `reader` into `pipeline` until the stream ends, a read fails,
/// or `cancel` fires. Cancellation is observed even while a read is pending.
pub async fn run_async<R>(
    mut reader: R,
    mut pipeline: Pipeline,
    cancel: CancellationToken,
) -> WorkerExit
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; DEFAULT_READ_CHUNK_SIZE];

    let reason = loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break StopReason::Aborted,
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => break StopReason::EndOfStream,
            Ok(n) => {
                if let Err(err) = pipeline.ingest(&buf[..n]) {
                    break StopReason::Failed(err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => break StopReason::Failed(err.into()),
        }
    };

    match &reason {
        StopReason::Failed(err) => warn!(error = %err, "async worker stopped on error"),
        other => debug!(reason = ?other, "async worker stopped"),
    }

    WorkerExit { pipeline, reason }
}
