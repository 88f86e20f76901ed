//! Signal extraction: turns a raw bug report into a [`BugSignal`](crate::domain::BugSignal).
//!
//! - [`stack`]: stack-trace parsing and framework/business classification
//! - [`entities`]: entity and error-keyword extraction
//! - [`logs`]: log correlation and ordering
//! - [`preprocess`]: the composition of the three

pub mod entities;
pub mod logs;
pub mod preprocess;
pub mod stack;

pub use entities::EntityExtractor;
pub use logs::{extract_timestamp, LogAggregator};
pub use preprocess::Preprocessor;
pub use stack::{StackParser, FRAMEWORK_PATTERNS};
