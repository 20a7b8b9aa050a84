mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "measlink", version, about = "Serial measurement telemetry CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "MEASLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_monitor_subcommand() {
        let cli = Cli::try_parse_from([
            "measlink",
            "monitor",
            "/dev/ttyUSB0",
            "--baud",
            "57600",
            "--encoding",
            "i16",
            "--count",
            "10",
        ])
        .expect("monitor args should parse");

        let Command::Monitor(args) = cli.command else {
            panic!("expected monitor");
        };
        assert_eq!(args.baud, 57600);
        assert_eq!(args.decode.encoding, measlink_frame::ValueEncoding::I16Le);
        assert_eq!(args.count, Some(10));
    }

    #[test]
    fn emit_requires_a_record() {
        let err = Cli::try_parse_from(["measlink", "emit", "/tmp/out.bin"])
            .expect_err("missing --record should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn emit_collects_repeated_records() {
        let cli = Cli::try_parse_from([
            "measlink", "emit", "/tmp/out.bin", "-r", "1=2.5", "-r", "3=4", "--batch",
        ])
        .expect("emit args should parse");

        let Command::Emit(args) = cli.command else {
            panic!("expected emit");
        };
        assert_eq!(args.records.len(), 2);
        assert!(args.batch);
    }

    #[test]
    fn emit_help_explains_marker_collisions() {
        use clap::CommandFactory;

        let mut cli = Cli::command();
        let emit = cli
            .find_subcommand_mut("emit")
            .expect("emit subcommand exists");
        let help = emit.render_long_help().to_string();
        assert!(help.contains("no escaping"));
        assert!(help.contains("65227"));
    }

    #[test]
    fn rejects_unknown_encoding() {
        let err = Cli::try_parse_from(["measlink", "replay", "cap.bin", "--encoding", "f16"])
            .expect_err("f16 is not supported");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn replay_rejects_zero_chunk_size() {
        let result = Cli::try_parse_from(["measlink", "replay", "cap.bin", "--chunk-size", "0"]);
        assert!(result.is_err());
    }
}
