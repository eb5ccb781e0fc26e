//! Canonical event envelope.
//!
//! Every platform event is normalized into one shape before it touches the
//! bus: a wire/log [`EventRecord`] (loose, serde-facing) and the validated
//! [`EventEnvelope`] (typed payloads) built from it. Adapters produce
//! records; the router re-validates them, so a malformed record can never
//! reach the notification pipeline.

mod record;
mod types;
mod validate;

pub use record::{EventRecord, RecordData};
pub use types::{
    CountSemantics, EventData, EventEnvelope, EventKind, GiftData, Platform, UserId,
};
pub use validate::ValidationError;
