use std::fs::OpenOptions;
use std::io::Write;

use measlink_frame::{FrameWriter, Record, MAX_RECORDS_PER_FRAME};
use measlink_transport::{PortConfig, SerialStream};
use serde::Serialize;

use crate::cmd::EmitArgs;
use crate::exit::{frame_error, io_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct EmitOutput {
    kind: &'static str,
    target: String,
    frames: usize,
    records: usize,
    encoding: String,
}

pub fn run(args: EmitArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = group_records(&args.records, args.batch)?;
    let target = args.target.display().to_string();

    if args.serial {
        let config = PortConfig::default().with_baud_rate(args.baud);
        let port = SerialStream::open(&target, &config)
            .map_err(|err| transport_error("emit", err))?;
        let port = write_frames(port, &frames, &args)?;
        port.close().map_err(|err| transport_error("emit", err))?;
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.target)
            .map_err(|err| io_error(&format!("open {target}"), err))?;
        let mut file = write_frames(file, &frames, &args)?;
        file.flush()
            .map_err(|err| io_error(&format!("flush {target}"), err))?;
    }

    let out = EmitOutput {
        kind: "emit",
        target,
        frames: frames.len(),
        records: args.records.len(),
        encoding: args.encoding.to_string(),
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "wrote {} frame(s), {} record(s) ({}) to {}",
            out.frames, out.records, out.encoding, out.target
        ),
    }
    Ok(SUCCESS)
}

fn write_frames<W: Write>(inner: W, frames: &[&[Record]], args: &EmitArgs) -> CliResult<W> {
    let mut writer = FrameWriter::new(inner);
    for records in frames {
        writer
            .send_records(records, args.encoding)
            .map_err(|err| frame_error("emit", err))?;
    }
    Ok(writer.into_inner())
}

fn group_records(records: &[Record], batch: bool) -> CliResult<Vec<&[Record]>> {
    if !batch {
        return Ok(records.chunks(1).collect());
    }
    if records.len() > MAX_RECORDS_PER_FRAME {
        return Err(CliError::new(
            USAGE,
            format!(
                "--batch allows at most {MAX_RECORDS_PER_FRAME} records, got {}",
                records.len()
            ),
        ));
    }
    Ok(vec![records])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbatched_records_get_one_frame_each() {
        let records = vec![Record::new(1, 1.0), Record::new(2, 2.0)];
        let frames = group_records(&records, false).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], &[Record::new(2, 2.0)]);
    }

    #[test]
    fn batch_over_limit_is_usage_error() {
        let records = vec![Record::new(1, 0.0); MAX_RECORDS_PER_FRAME + 1];
        let err = group_records(&records, true).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
