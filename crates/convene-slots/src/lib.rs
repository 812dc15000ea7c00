//! `convene-slots`: pure time arithmetic for interview sessions.
//!
//! * [`timeslot`] lays candidates out back to back inside the proposed window.
//! * [`resolver`] slices each interviewer's availability into atomic units and
//!   intersects them across every assigned interviewer.
//!
//! Nothing here touches storage, clocks or the network.

pub mod resolver;
pub mod timeslot;

pub use resolver::{AtomicSlot, CommonSlotResolver, Resolution};
pub use timeslot::{compute_candidate_slots, compute_end_time};
