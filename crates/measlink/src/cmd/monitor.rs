use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use measlink_session::{SerialSession, StopReason};
use measlink_transport::{
    parse_data_bits, parse_flow_control, parse_parity, parse_stop_bits, PortConfig,
};

use crate::cmd::replay::session_config;
use crate::cmd::{install_ctrlc_handler, MonitorArgs};
use crate::exit::{session_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_summary, print_update, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let port_config = port_config(&args)?;
    let config = session_config(&args.decode);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (tx, rx) = mpsc::channel();
    let session = SerialSession::open_with_updates(&args.port, &port_config, &config, tx)
        .map_err(|err| session_error("monitor", err))?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(update) => {
                print_update(&update, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if session.is_finished() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let exit = session
        .close()
        .map_err(|err| session_error("monitor", err))?;
    print_summary(
        exit.pipeline.registry(),
        &exit.pipeline.stats(),
        &exit.pipeline.diagnostics(),
        format,
    );

    match exit.reason {
        StopReason::Failed(err) => Err(session_error("monitor", err)),
        StopReason::Aborted | StopReason::EndOfStream => Ok(SUCCESS),
    }
}

fn port_config(args: &MonitorArgs) -> CliResult<PortConfig> {
    let map = |err| transport_error("monitor", err);
    Ok(PortConfig {
        baud_rate: args.baud,
        data_bits: parse_data_bits(args.data_bits).map_err(map)?,
        parity: parse_parity(&args.parity).map_err(map)?,
        stop_bits: parse_stop_bits(args.stop_bits).map_err(map)?,
        flow_control: parse_flow_control(&args.flow_control).map_err(map)?,
        ..PortConfig::default()
    })
}
