//! In-process event bus.
//!
//! Synchronous topic pub/sub: `emit` invokes subscribers in registration
//! order before it returns, and every subscriber of one emit observes the
//! same value. A subscriber failure is caught and logged without affecting
//! its siblings. Re-entrant emits (a subscriber publishing while a dispatch
//! is running) are queued and delivered after the current dispatch unwinds,
//! preserving causality order per topic.
//!
//! # Design Notes
//!
//! Handlers are stored as `Arc<dyn Fn>` so a dispatch can snapshot the
//! subscriber list and run it without holding the lock. Subscribing or
//! unsubscribing from inside a handler is therefore allowed; the change
//! takes effect from the next emit.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use crate::diagnostics::DiagnosticEvent;
use crate::envelope::{EventEnvelope, Platform};

/// Error type subscribers may return; it is logged, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Value carried on the bus.
#[derive(Debug, Clone)]
pub enum BusMessage {
    /// A validated platform event.
    Event(EventEnvelope),
    /// A background-task failure report.
    Diagnostic(DiagnosticEvent),
}

impl BusMessage {
    /// The envelope, when this message carries one.
    pub fn envelope(&self) -> Option<&EventEnvelope> {
        match self {
            BusMessage::Event(envelope) => Some(envelope),
            BusMessage::Diagnostic(_) => None,
        }
    }
}

/// Topic name for a platform's normalized events.
pub fn platform_event_topic(platform: Platform) -> String {
    format!("{}:event", platform.as_str())
}

type Handler = Arc<dyn Fn(&BusMessage) -> Result<(), HandlerError> + Send + Sync>;

struct SubscriberEntry {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    topics: HashMap<String, Vec<SubscriberEntry>>,
    next_id: u64,
    dispatching: bool,
    pending: VecDeque<(String, BusMessage)>,
}

/// The in-process pub/sub bus.
///
/// Cloning is cheap; all clones share the same topic table.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

/// Handle returned by [`EventBus::subscribe`]; call
/// [`unsubscribe`](Subscription::unsubscribe) to detach the handler.
pub struct Subscription {
    id: u64,
    topic: String,
    inner: Weak<Mutex<BusInner>>,
}

impl Subscription {
    /// Detach the handler. Safe to call after the bus is gone.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut guard = inner.lock().expect("bus lock poisoned");
            if let Some(entries) = guard.topics.get_mut(&self.topic) {
                entries.retain(|entry| entry.id != self.id);
            }
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` on `topic`.
    ///
    /// Handlers run in registration order on the emitter's thread.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&BusMessage) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut guard = self.inner.lock().expect("bus lock poisoned");
        guard.next_id += 1;
        let id = guard.next_id;
        guard
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(SubscriberEntry {
                id,
                handler: Arc::new(handler),
            });

        Subscription {
            id,
            topic: topic.to_string(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of subscribers currently registered on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let guard = self.inner.lock().expect("bus lock poisoned");
        guard.topics.get(topic).map(|v| v.len()).unwrap_or(0)
    }

    /// Publish `message` on `topic`.
    ///
    /// If called from inside a handler, the message is queued and delivered
    /// after the current dispatch unwinds.
    pub fn emit(&self, topic: &str, message: BusMessage) {
        {
            let mut guard = self.inner.lock().expect("bus lock poisoned");
            guard.pending.push_back((topic.to_string(), message));
            if guard.dispatching {
                // A dispatch higher up the stack will drain the queue.
                return;
            }
            guard.dispatching = true;
        }

        self.drain();
    }

    /// Convenience: publish a diagnostic event on [`DIAGNOSTICS_TOPIC`]
    /// (see [`crate::diagnostics`]).
    pub fn emit_diagnostic(&self, event: DiagnosticEvent) {
        self.emit(
            crate::diagnostics::DIAGNOSTICS_TOPIC,
            BusMessage::Diagnostic(event),
        );
    }

    fn drain(&self) {
        loop {
            let next = {
                let mut guard = self.inner.lock().expect("bus lock poisoned");
                match guard.pending.pop_front() {
                    Some(item) => Some(item),
                    None => {
                        guard.dispatching = false;
                        None
                    }
                }
            };

            let Some((topic, message)) = next else {
                return;
            };

            // Snapshot so handlers can (un)subscribe without deadlocking.
            let handlers: Vec<Handler> = {
                let guard = self.inner.lock().expect("bus lock poisoned");
                guard
                    .topics
                    .get(&topic)
                    .map(|entries| entries.iter().map(|e| Arc::clone(&e.handler)).collect())
                    .unwrap_or_default()
            };

            for handler in handlers {
                if let Err(error) = handler(&message) {
                    tracing::warn!(topic = %topic, %error, "bus subscriber failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock().expect("bus lock poisoned");
        f.debug_struct("EventBus")
            .field("topics", &guard.topics.len())
            .field("pending", &guard.pending.len())
            .finish()
    }
}
