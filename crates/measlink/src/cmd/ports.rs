use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use measlink_transport::{available_ports, PortWatcher};

use crate::cmd::{install_ctrlc_handler, PortsArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_ports, OutputFormat};

pub fn run(args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.watch {
        let ports = available_ports().map_err(|err| transport_error("list ports", err))?;
        print_ports(&ports, format);
        return Ok(SUCCESS);
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let interval = Duration::from_millis(args.interval_ms.max(1));
    let mut watcher = PortWatcher::new();
    while running.load(Ordering::SeqCst) {
        if let Some(ports) = watcher
            .poll()
            .map_err(|err| transport_error("list ports", err))?
        {
            print_ports(&ports, format);
        }
        thread::sleep(interval);
    }

    Ok(SUCCESS)
}
