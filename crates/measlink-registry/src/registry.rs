use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::measurement::{Measurement, MeasurementDefinition, MeasurementId};
use crate::notifier::{ChangeEvent, ChangeNotifier, HandlerResult, SubscriberId};

/// Id-keyed set of measurements, iterated in first-seen order.
///
/// `upsert` and `register` are the only write paths. Every write is applied
/// first and then published, so subscribers always observe the new state.
pub struct MeasurementRegistry {
    measurements: HashMap<MeasurementId, Measurement>,
    order: Vec<MeasurementId>,
    notifier: ChangeNotifier,
    config: RegistryConfig,
}

impl MeasurementRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            measurements: HashMap::new(),
            order: Vec::new(),
            notifier: ChangeNotifier::with_policy(config.delivery),
            config,
        }
    }

    /// Record a new value for `id`, creating the measurement on first sight.
    ///
    /// Returns `Created(id)` for an unknown id, `Updated(id)` otherwise, even
    /// when the value did not change. An error is only possible under
    /// `DeliveryPolicy::Propagate`; the value is stored regardless.
    pub fn upsert(&mut self, id: MeasurementId, value: f64) -> Result<ChangeEvent> {
        let event = match self.measurements.entry(id) {
            Entry::Occupied(mut entry) => {
                let measurement = entry.get_mut();
                measurement.latest_value = value;
                measurement.present = true;
                ChangeEvent::Updated(id)
            }
            Entry::Vacant(entry) => {
                entry.insert(Measurement::observed(id, value));
                self.order.push(id);
                debug!(id, "measurement created");
                ChangeEvent::Created(id)
            }
        };

        self.notifier.publish(event)?;
        Ok(event)
    }

    /// Declare a name and unit for `id`.
    ///
    /// An unknown id is created without a value (`present == false`); a known
    /// id keeps its value and gets the new metadata.
    pub fn register(
        &mut self,
        id: MeasurementId,
        name: impl Into<String>,
        unit: impl Into<String>,
    ) -> Result<ChangeEvent> {
        let (name, unit) = (name.into(), unit.into());

        let event = match self.measurements.entry(id) {
            Entry::Occupied(mut entry) => {
                let measurement = entry.get_mut();
                measurement.name = name;
                measurement.unit = unit;
                ChangeEvent::Updated(id)
            }
            Entry::Vacant(entry) => {
                debug!(id, name = %name, "measurement declared");
                entry.insert(Measurement::declared(id, name, unit));
                self.order.push(id);
                ChangeEvent::Created(id)
            }
        };

        self.notifier.publish(event)?;
        Ok(event)
    }

    /// Declare every definition in order. Duplicate ids are rejected before
    /// anything is registered.
    pub fn register_all(&mut self, definitions: &[MeasurementDefinition]) -> Result<usize> {
        let mut seen = HashSet::new();
        for def in definitions {
            if !seen.insert(def.id) {
                return Err(RegistryError::DuplicateDefinition(def.id));
            }
        }

        for def in definitions {
            self.register(def.id, def.name.clone(), def.unit.clone())?;
        }
        Ok(definitions.len())
    }

    /// Load definitions from a JSON file (`[{"id", "name", "unit"}, ...]`).
    pub fn load_definitions(&mut self, path: &Path) -> Result<usize> {
        let definitions = read_definitions(path, self.config.max_definitions_file_size)?;
        let count = self.register_all(&definitions)?;
        info!(path = %path.display(), count, "loaded measurement definitions");
        Ok(count)
    }

    /// Look up a measurement.
    pub fn get(&self, id: MeasurementId) -> Result<&Measurement> {
        self.measurements
            .get(&id)
            .ok_or(RegistryError::NotFound(id))
    }

    /// Declared name of a measurement (empty if none).
    pub fn name(&self, id: MeasurementId) -> Result<&str> {
        self.get(id).map(|m| m.name.as_str())
    }

    /// Declared unit of a measurement (empty if none).
    pub fn unit(&self, id: MeasurementId) -> Result<&str> {
        self.get(id).map(|m| m.unit.as_str())
    }

    /// All ids in first-seen order.
    pub fn list_ids(&self) -> Vec<MeasurementId> {
        self.order.clone()
    }

    /// Measurements in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.measurements.get(id))
    }

    pub fn contains(&self, id: MeasurementId) -> bool {
        self.measurements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Subscribe to change events.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&ChangeEvent) -> HandlerResult + Send + 'static,
    {
        self.notifier.subscribe(handler)
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut ChangeNotifier {
        &mut self.notifier
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for MeasurementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MeasurementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementRegistry")
            .field("ids", &self.order)
            .field("notifier", &self.notifier)
            .finish()
    }
}

fn read_definitions(path: &Path, max_bytes: usize) -> Result<Vec<MeasurementDefinition>> {
    let file = std::fs::File::open(path)
        .map_err(|err| RegistryError::LoadFailed(format!("{}: {err}", path.display())))?;
    let metadata = file
        .metadata()
        .map_err(|err| RegistryError::LoadFailed(format!("{}: {err}", path.display())))?;

    if metadata.len() > max_bytes as u64 {
        return Err(RegistryError::LoadFailed(format!(
            "definitions file too large ({} bytes, max {max_bytes}): {}",
            metadata.len(),
            path.display()
        )));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| RegistryError::LoadFailed(format!("{}: {err}", path.display())))?;
    if content.len() > max_bytes {
        return Err(RegistryError::LoadFailed(format!(
            "definitions file grew while reading: {}",
            path.display()
        )));
    }

    Ok(serde_json::from_str(&content)?)
}
