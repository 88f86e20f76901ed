//! Domain types flowing through the triage pipeline.
//!
//! - [`bug`]: the raw bug report accepted from callers
//! - [`signal`]: normalized signals extracted from it
//! - [`retrieval`]: scored knowledge items returned by the channels

pub mod bug;
pub mod retrieval;
pub mod signal;

pub use bug::{BugContext, BugInput, ErrorInfo};
pub use retrieval::{Channel, RetrievalResult};
pub use signal::{BugSignal, EntityKind, ParsedStackTrace, StackFrame};
