//! Bytes in, registry updates out.
//!
//! [`Pipeline`] chains the frame assembler, the record parser and the
//! measurement registry. It owns all three, so whoever drives `ingest` is
//! the only writer of the registry.

use measlink_frame::{Diagnostics, FrameAssembler, FrameParser};
use measlink_registry::{ChangeEvent, Measurement, MeasurementRegistry, RegistryError};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Outcome of one `ingest` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    /// Frames completed by this chunk.
    pub frames: usize,
    /// Records applied to the registry.
    pub records: usize,
    /// Registry events, in the order they were published.
    pub events: Vec<ChangeEvent>,
    /// Frames dropped because their payload did not decode.
    pub malformed: usize,
    /// Assembly discards for this chunk.
    pub diagnostics: Diagnostics,
}

/// Running totals since the pipeline was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub bytes: u64,
    pub frames: u64,
    pub records: u64,
    pub malformed: u64,
    pub created: u64,
    pub updated: u64,
}

/// A registry write paired with the state it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementUpdate {
    pub event: ChangeEvent,
    pub measurement: Measurement,
}

/// Assembler, parser and registry driven as one unit.
pub struct Pipeline {
    assembler: FrameAssembler,
    parser: FrameParser,
    registry: MeasurementRegistry,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build a pipeline from config, loading the definitions file if one is set.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut registry = MeasurementRegistry::with_config(config.registry);
        if let Some(path) = &config.definitions {
            registry.load_definitions(path)?;
        }

        Ok(Self::from_parts(
            FrameAssembler::with_config(config.frame.clone()),
            FrameParser::new(config.encoding),
            registry,
        ))
    }

    /// Assemble a pipeline from already-built parts.
    pub fn from_parts(
        assembler: FrameAssembler,
        parser: FrameParser,
        registry: MeasurementRegistry,
    ) -> Self {
        Self {
            assembler,
            parser,
            registry,
            stats: PipelineStats::default(),
        }
    }

    /// Feed one chunk from the transport.
    ///
    /// Completed frames are decoded and applied to the registry in arrival
    /// order. A frame that fails to decode is dropped whole: none of its
    /// records reach the registry.
    ///
    /// Under `DeliveryPolicy::Propagate` a failing subscriber does not stop
    /// the chunk: every assembled record is still applied, and the first
    /// failure comes back as [`SessionError::Delivery`] with the full report.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<PipelineReport> {
        let assembled = self.assembler.ingest(bytes);
        self.stats.bytes = self.stats.bytes.saturating_add(bytes.len() as u64);

        let mut report = PipelineReport {
            frames: assembled.frames.len(),
            diagnostics: assembled.diagnostics,
            ..PipelineReport::default()
        };

        let mut delivery_error = None;
        for frame in &assembled.frames {
            self.stats.frames += 1;
            let records = match self.parser.parse(frame) {
                Ok(records) => records,
                Err(err) => {
                    warn!(
                        payload_len = frame.payload.len(),
                        error = %err,
                        "dropping malformed frame"
                    );
                    report.malformed += 1;
                    self.stats.malformed += 1;
                    continue;
                }
            };

            for record in records {
                let event = match self.registry.upsert(record.id, record.value) {
                    Ok(event) => event,
                    Err(RegistryError::Subscriber {
                        subscriber,
                        event,
                        message,
                    }) => {
                        delivery_error.get_or_insert(RegistryError::Subscriber {
                            subscriber,
                            event,
                            message,
                        });
                        event
                    }
                    Err(other) => return Err(other.into()),
                };
                if event.is_created() {
                    self.stats.created += 1;
                } else {
                    self.stats.updated += 1;
                }
                report.records += 1;
                self.stats.records += 1;
                report.events.push(event);
            }
        }

        if report.frames > 0 {
            debug!(
                frames = report.frames,
                records = report.records,
                malformed = report.malformed,
                "chunk ingested"
            );
        }

        if let Some(source) = delivery_error {
            return Err(SessionError::Delivery {
                source,
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    /// Pair each event with the measurement it refers to.
    pub fn updates(&self, events: &[ChangeEvent]) -> Vec<MeasurementUpdate> {
        events
            .iter()
            .filter_map(|event| {
                self.registry
                    .get(event.id())
                    .ok()
                    .map(|measurement| MeasurementUpdate {
                        event: *event,
                        measurement: measurement.clone(),
                    })
            })
            .collect()
    }

    pub fn registry(&self) -> &MeasurementRegistry {
        &self.registry
    }

    /// Mutable registry access, for subscribing or declaring measurements.
    pub fn registry_mut(&mut self) -> &mut MeasurementRegistry {
        &mut self.registry
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Assembly discards since creation.
    pub fn diagnostics(&self) -> Diagnostics {
        self.assembler.totals()
    }

    /// Hand back the registry.
    pub fn into_registry(self) -> MeasurementRegistry {
        self.registry
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_parts(
            FrameAssembler::new(),
            FrameParser::default(),
            MeasurementRegistry::new(),
        )
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("assembler", &self.assembler)
            .field("parser", &self.parser)
            .field("measurements", &self.registry.len())
            .field("stats", &self.stats)
            .finish()
    }
}
