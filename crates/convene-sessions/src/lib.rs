//! `convene-sessions`: interview session storage and the status state machine.
//!
//! * [`repository::AvailabilityRepository`] is the persistence seam, with a
//!   SQLite ([`sqlite::SqliteRepository`]) and an in-memory
//!   ([`memory::MemoryRepository`]) implementation.
//! * [`coordinator::SessionCoordinator`] owns every status transition:
//!   submissions, confirmation, cancellation and sweep re-evaluation.

pub mod coordinator;
pub mod db;
pub mod error;
pub mod memory;
pub mod repository;
pub mod sqlite;
pub mod types;

pub use coordinator::{SessionCoordinator, SessionGuard};
pub use error::{CoordinatorError, RepositoryError};
pub use memory::MemoryRepository;
pub use repository::AvailabilityRepository;
pub use sqlite::SqliteRepository;
pub use types::{NewSession, SessionView, SubmitOutcome};
