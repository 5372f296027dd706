//! ffb-core: shared types, IDs, errors, and the event system.
//!
//! This crate is the foundational dependency for the other ffb-* crates,
//! providing type-safe identifiers, a unified error type, the capability
//! catalog, media descriptors, queue item lifecycle, and a broadcast event
//! bus.

pub mod catalog;
pub mod error;
pub mod events;
pub mod ids;
pub mod job;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use catalog::*;
pub use error::{Error, ProcessErrorKind, Result};
pub use events::{Event, EventBus, EventPayload};
pub use ids::*;
pub use job::*;
pub use media::*;
