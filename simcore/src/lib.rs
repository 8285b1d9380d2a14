#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

//! This is a general purpose discrete-event simulation toolkit that provides the mechanisms such
//! as: clock, event queue, and storage containers (stacks and queues).
//!
//! Time advances only when an event is taken out of the [`EventQueue`] and the [`Clock`] is
//! moved to its time. The queue orders events by their [`Ord`] implementation, so any
//! tie-breaking policy between events scheduled at the same time must be encoded there.

pub use clock::{Clock, ClockRef, Tick};
pub use queue::{EventQueue, Fifo, Stack};

mod clock;
mod queue;

/// Errors raised by the simulation primitives.
///
/// All of them indicate misuse or a violated capacity plan rather than a recoverable runtime
/// condition, and are expected to terminate a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A bounded event queue is full.
    #[error("event queue is full (capacity: {capacity})")]
    CapacityExceeded {
        /// The bound the queue was constructed with.
        capacity: usize,
    },
    /// Tried to look at or remove an element of an empty queue.
    #[error("event queue is empty")]
    EmptyQueue,
    /// Tried to move the clock backwards.
    #[error("cannot move clock from {now} back to {requested}")]
    StaleTime {
        /// Current time of the clock.
        now: Tick,
        /// Requested time.
        requested: Tick,
    },
}

/// Result alias using [`Error`](enum.Error.html).
pub type Result<T> = std::result::Result<T, Error>;
