use clap::{Args, Subcommand};
use std::path::PathBuf;

use measlink_frame::{Record, ValueEncoding};
use measlink_transport::DEFAULT_BAUD_RATE;

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod emit;
pub mod monitor;
pub mod ports;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports.
    Ports(PortsArgs),
    /// Read measurements from a serial port.
    Monitor(MonitorArgs),
    /// Feed a captured byte stream through the pipeline.
    Replay(ReplayArgs),
    /// Encode records as frames and write them to a file or port.
    Emit(EmitArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Emit(args) => emit::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PortsArgs {
    /// Keep polling and print the list whenever it changes.
    #[arg(long)]
    pub watch: bool,
    /// Poll interval for --watch, in milliseconds.
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,
}

/// Settings shared by commands that decode frames.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Record value encoding (f32, f64, i16, u16, i32, u32).
    #[arg(long, default_value = "f32", env = "MEASLINK_ENCODING")]
    pub encoding: ValueEncoding,
    /// JSON file declaring measurement names and units.
    #[arg(long, value_name = "FILE", env = "MEASLINK_DEFINITIONS")]
    pub definitions: Option<PathBuf>,
    /// Maximum frame payload in bytes.
    #[arg(long, default_value_t = measlink_frame::DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial port name (e.g. /dev/ttyUSB0, COM3).
    pub port: String,
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, env = "MEASLINK_BAUD")]
    pub baud: u32,
    #[arg(long, default_value = "8")]
    pub data_bits: u8,
    /// none, odd or even.
    #[arg(long, default_value = "none")]
    pub parity: String,
    #[arg(long, default_value = "1")]
    pub stop_bits: u8,
    /// none, software or hardware.
    #[arg(long, default_value = "none")]
    pub flow_control: String,
    #[command(flatten)]
    pub decode: DecodeArgs,
    /// Exit after N measurement updates.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file holding raw bytes as read from the port.
    pub file: PathBuf,
    /// Feed the capture in chunks of this many bytes.
    #[arg(long, default_value = "64", value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: u64,
    #[command(flatten)]
    pub decode: DecodeArgs,
}

#[derive(Args, Debug)]
pub struct EmitArgs {
    /// Output file (appended to), or a port name with --serial.
    pub target: PathBuf,
    /// Record to send, as id=value. Repeatable.
    ///
    /// Frames have no escaping: a record whose encoded bytes contain a
    /// frame marker (FF CC or CB FE), such as id 65227, is rejected.
    #[arg(
        long = "record",
        short = 'r',
        value_name = "ID=VALUE",
        required = true,
        value_parser = parse_record
    )]
    pub records: Vec<Record>,
    /// Put all records in one frame instead of one frame each.
    #[arg(long)]
    pub batch: bool,
    /// Treat TARGET as a serial port.
    #[arg(long)]
    pub serial: bool,
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, env = "MEASLINK_BAUD")]
    pub baud: u32,
    #[arg(long, default_value = "f32", env = "MEASLINK_ENCODING")]
    pub encoding: ValueEncoding,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_record(input: &str) -> Result<Record, String> {
    let (id, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{input}'"))?;
    let id: u16 = id
        .trim()
        .parse()
        .map_err(|_| format!("record id must be 0..=65535, got '{id}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("record value must be a number, got '{value}'"))?;
    Ok(Record::new(id, value))
}

pub(crate) fn install_ctrlc_handler(
    running: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, std::sync::atomic::Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
