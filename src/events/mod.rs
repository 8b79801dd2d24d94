//! Domain event emission for saved-item state changes.

pub mod emitter;
pub mod models;
pub mod sinks;

pub use emitter::{ErrorReporter, ItemsEventEmitter, TracingErrorReporter};
pub use models::{EventKind, ItemEvent};
pub use sinks::{EmissionError, EventSink};
