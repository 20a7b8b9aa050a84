use measlink_frame::FrameConfig;
use measlink_session::{Pipeline, SessionConfig};
use tracing::info;

use crate::cmd::{DecodeArgs, ReplayArgs};
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{print_summary, print_update, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = std::fs::read(&args.file)
        .map_err(|err| io_error(&format!("read {}", args.file.display()), err))?;

    let config = session_config(&args.decode);
    let mut pipeline = Pipeline::new(&config).map_err(|err| session_error("replay", err))?;

    let chunk_size = usize::try_from(args.chunk_size).unwrap_or(usize::MAX);
    for chunk in bytes.chunks(chunk_size) {
        let report = pipeline
            .ingest(chunk)
            .map_err(|err| session_error("replay", err))?;
        for update in pipeline.updates(&report.events) {
            print_update(&update, format);
        }
    }

    info!(
        file = %args.file.display(),
        bytes = bytes.len(),
        partial = pipeline.assembler().partial_len(),
        "replay finished"
    );
    print_summary(
        pipeline.registry(),
        &pipeline.stats(),
        &pipeline.diagnostics(),
        format,
    );
    Ok(SUCCESS)
}

pub(crate) fn session_config(decode: &DecodeArgs) -> SessionConfig {
    SessionConfig {
        frame: FrameConfig {
            max_payload_size: decode.max_payload,
            ..FrameConfig::default()
        },
        encoding: decode.encoding,
        definitions: decode.definitions.clone(),
        ..SessionConfig::default()
    }
}
