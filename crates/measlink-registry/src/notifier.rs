//! Synchronous multi-subscriber change notification.
//!
//! Handlers run on the caller's thread, in subscription order, before
//! `publish` returns. Nothing is queued. A host that consumes events on
//! another thread subscribes a forwarding handler ([`ChangeNotifier::forward_to`])
//! and drains the queue itself.

use std::fmt;
use std::sync::mpsc::Sender;

use serde::Serialize;
use tracing::warn;

use crate::error::{RegistryError, Result};
use crate::measurement::MeasurementId;

/// A measurement was created or its value/metadata updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "event", content = "id", rename_all = "snake_case")]
pub enum ChangeEvent {
    Created(MeasurementId),
    Updated(MeasurementId),
}

impl ChangeEvent {
    /// The measurement this event is about.
    pub fn id(&self) -> MeasurementId {
        match self {
            Self::Created(id) | Self::Updated(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(id) => write!(f, "created({id})"),
            Self::Updated(id) => write!(f, "updated({id})"),
        }
    }
}

/// Error a handler reports back to the notifier.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of a subscriber handler.
pub type HandlerResult = std::result::Result<(), HandlerError>;

type Handler = Box<dyn FnMut(&ChangeEvent) -> HandlerResult + Send>;

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What `publish` does when a handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Log and count the failure, keep delivering to the remaining handlers.
    #[default]
    Isolate,
    /// Stop at the first failure and return it to the caller.
    Propagate,
}

/// Ordered list of subscribers.
pub struct ChangeNotifier {
    subscribers: Vec<(SubscriberId, Handler)>,
    next_id: u64,
    policy: DeliveryPolicy,
    failures: u64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_policy(DeliveryPolicy::default())
    }

    pub fn with_policy(policy: DeliveryPolicy) -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
            policy,
            failures: 0,
        }
    }

    /// Register a handler. It receives every event published from now on.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&ChangeEvent) -> HandlerResult + Send + 'static,
    {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Subscribe a handler that pushes every event into a channel.
    ///
    /// A dropped receiver turns into a handler failure.
    pub fn forward_to(&mut self, sender: Sender<ChangeEvent>) -> SubscriberId {
        self.subscribe(move |event| sender.send(*event).map_err(Into::into))
    }

    /// Remove a handler. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every handler in subscription order.
    pub fn publish(&mut self, event: ChangeEvent) -> Result<()> {
        for (subscriber, handler) in self.subscribers.iter_mut() {
            let Err(err) = handler(&event) else {
                continue;
            };

            match self.policy {
                DeliveryPolicy::Isolate => {
                    self.failures = self.failures.saturating_add(1);
                    warn!(%subscriber, %event, error = %err, "subscriber failed");
                }
                DeliveryPolicy::Propagate => {
                    return Err(RegistryError::Subscriber {
                        subscriber: *subscriber,
                        event,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of handler failures absorbed under `Isolate`.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DeliveryPolicy) {
        self.policy = policy;
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscribers.len())
            .field("policy", &self.policy)
            .field("failures", &self.failures)
            .finish()
    }
}
