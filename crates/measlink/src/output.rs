use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, CellAlignment, ContentArrangement, Table};
use measlink_frame::Diagnostics;
use measlink_registry::{Measurement, MeasurementRegistry};
use measlink_session::{MeasurementUpdate, PipelineStats};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct UpdateOutput<'a> {
    kind: &'static str,
    event: &'static str,
    id: u16,
    name: &'a str,
    unit: &'a str,
    value: f64,
}

#[derive(Serialize)]
struct MeasurementOutput<'a> {
    id: u16,
    name: &'a str,
    unit: &'a str,
    value: Option<f64>,
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    kind: &'static str,
    bytes: u64,
    frames: u64,
    records: u64,
    malformed: u64,
    discarded_bytes: u64,
    too_large: u64,
    restarts: u64,
    measurements: Vec<MeasurementOutput<'a>>,
}

#[derive(Serialize)]
struct PortsOutput<'a> {
    kind: &'static str,
    ports: &'a [String],
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// One line per registry change. Table mode streams the same lines as
/// pretty and prints the full table at the end.
pub fn print_update(update: &MeasurementUpdate, format: OutputFormat) {
    let m = &update.measurement;
    let event = if update.event.is_created() {
        "created"
    } else {
        "updated"
    };

    match format {
        OutputFormat::Json => print_json(&UpdateOutput {
            kind: "update",
            event,
            id: m.id,
            name: &m.name,
            unit: &m.unit,
            value: m.latest_value,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{event:<7} {:<16} {}", m.label(), value_with_unit(m));
        }
    }
}

pub fn print_summary(
    registry: &MeasurementRegistry,
    stats: &PipelineStats,
    diagnostics: &Diagnostics,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&SummaryOutput {
            kind: "summary",
            bytes: stats.bytes,
            frames: stats.frames,
            records: stats.records,
            malformed: stats.malformed,
            discarded_bytes: diagnostics.discarded_bytes,
            too_large: diagnostics.too_large,
            restarts: diagnostics.restarts,
            measurements: registry
                .iter()
                .map(|m| MeasurementOutput {
                    id: m.id,
                    name: &m.name,
                    unit: &m.unit,
                    value: m.present.then_some(m.latest_value),
                })
                .collect(),
        }),
        OutputFormat::Table => {
            println!("{}", measurement_table(registry));
            print_counters(stats, diagnostics);
        }
        OutputFormat::Pretty => {
            for m in registry.iter() {
                println!("{:<16} {}", m.label(), value_with_unit(m));
            }
            print_counters(stats, diagnostics);
        }
    }
}

pub fn print_ports(ports: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PortsOutput {
            kind: "ports",
            ports,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT"]);
            for port in ports {
                table.add_row(vec![port.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if ports.is_empty() {
                println!("(no serial ports)");
            }
            for port in ports {
                println!("{port}");
            }
        }
    }
}

fn measurement_table(registry: &MeasurementRegistry) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "NAME", "VALUE", "UNIT"]);
    for m in registry.iter() {
        let value = if m.present {
            m.latest_value.to_string()
        } else {
            "-".to_string()
        };
        table.add_row(vec![m.id.to_string(), m.name.clone(), value, m.unit.clone()]);
    }
    if let Some(column) = table.column_mut(2) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table
}

fn print_counters(stats: &PipelineStats, diagnostics: &Diagnostics) {
    println!(
        "frames={} records={} malformed={} discarded={} too_large={} restarts={}",
        stats.frames,
        stats.records,
        stats.malformed,
        diagnostics.discarded_bytes,
        diagnostics.too_large,
        diagnostics.restarts
    );
}

fn value_with_unit(m: &Measurement) -> String {
    if !m.present {
        return "-".to_string();
    }
    if m.unit.is_empty() {
        m.latest_value.to_string()
    } else {
        format!("{} {}", m.latest_value, m.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_measurements_in_first_seen_order() {
        let mut registry = MeasurementRegistry::new();
        registry.upsert(9, 1.5).unwrap();
        registry.register(2, "Speed", "km/h").unwrap();

        let rendered = measurement_table(&registry).to_string();
        let nine = rendered.find("1.5").unwrap();
        let speed = rendered.find("Speed").unwrap();
        assert!(nine < speed);
        assert!(rendered.contains("km/h"));
    }

    #[test]
    fn undeclared_value_renders_as_dash() {
        let mut registry = MeasurementRegistry::new();
        registry.register(2, "Speed", "km/h").unwrap();
        let m = registry.get(2).unwrap();
        assert_eq!(value_with_unit(m), "-");
    }

    #[test]
    fn value_with_unit_joins_with_space() {
        let mut registry = MeasurementRegistry::new();
        registry.register(1, "Temp", "C").unwrap();
        registry.upsert(1, 21.5).unwrap();
        assert_eq!(value_with_unit(registry.get(1).unwrap()), "21.5 C");
    }
}
