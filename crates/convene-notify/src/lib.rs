//! `convene-notify`: the outbound notification seam.
//!
//! The engine never delivers mail itself. It talks to a [`Notifier`]; the
//! bundled [`QueueNotifier`] hands each [`Notification`] to an mpsc channel
//! so a delivery adapter (SMTP, chat, …) can pick it up.

pub mod error;
pub mod notifier;
pub mod queue;
pub mod types;

pub use error::NotifyError;
pub use notifier::Notifier;
pub use queue::QueueNotifier;
pub use types::{Notification, ReminderTier};
