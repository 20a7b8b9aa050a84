use crate::notifier::DeliveryPolicy;

/// Controls registry and notification behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// What happens when a subscriber fails during publish.
    pub delivery: DeliveryPolicy,
    /// Maximum bytes accepted from a definitions file.
    pub max_definitions_file_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryPolicy::Isolate,
            max_definitions_file_size: 256 * 1024,
        }
    }
}
