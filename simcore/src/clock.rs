use std::cell::Cell;
use std::rc::Rc;

use crate::{Error, Result};

/// Simulation time unit.
pub type Tick = u64;

/// Simulation clock.
///
/// The clock can only move forward. Any number of read-only [`ClockRef`] handles can be taken
/// from it and handed out to objects that need to know the current time without being able to
/// change it.
#[derive(Debug, Default)]
pub struct Clock {
    time: Rc<Cell<Tick>>,
}

impl Clock {
    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> Tick {
        self.time.get()
    }

    /// Moves the clock to `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleTime`] if `time` precedes the current time; the clock is left
    /// unchanged in that case.
    pub fn advance(&mut self, time: Tick) -> Result<()> {
        let now = self.time.get();
        if time < now {
            return Err(Error::StaleTime {
                now,
                requested: time,
            });
        }
        self.time.set(time);
        Ok(())
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn handle(&self) -> ClockRef {
        ClockRef {
            time: Rc::clone(&self.time),
        }
    }
}

/// This struct has only immutable access to the simulation clock exposed.
#[derive(Debug, Clone)]
pub struct ClockRef {
    time: Rc<Cell<Tick>>,
}

impl ClockRef {
    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> Tick {
        self.time.get()
    }
}
