//! `convene-core`: shared domain types, configuration and clock abstraction
//! used by every other crate in the workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result};
