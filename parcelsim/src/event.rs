use std::cmp::Ordering;

use crate::{PackageId, Tick, WarehouseId};

/// What happens when an event is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Package reaches the head of its route.
    Arrival {
        /// Arriving package.
        package: PackageId,
    },
    /// Periodic transport from `origin` to the neighbor `section`.
    Departure {
        /// Warehouse the transport leaves from.
        origin: WarehouseId,
        /// Section being shipped, i.e., the warehouse the transport goes to.
        section: WarehouseId,
    },
}

impl EventKind {
    fn rank(self) -> u8 {
        match self {
            Self::Arrival { .. } => 0,
            Self::Departure { .. } => 1,
        }
    }
}

/// Event scheduled at a point in simulated time.
///
/// Events are totally ordered by time first. At equal times, arrivals precede departures,
/// arrivals are ordered by package ID, and departures by origin and then section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Time at which the event is processed.
    pub time: Tick,
    /// Event payload.
    pub kind: EventKind,
}

impl Event {
    /// Constructs an arrival event.
    #[must_use]
    pub fn arrival(time: Tick, package: PackageId) -> Self {
        Self {
            time,
            kind: EventKind::Arrival { package },
        }
    }

    /// Constructs a departure event.
    #[must_use]
    pub fn departure(time: Tick, origin: WarehouseId, section: WarehouseId) -> Self {
        Self {
            time,
            kind: EventKind::Departure { origin, section },
        }
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.kind.rank().cmp(&other.kind.rank()))
            .then_with(|| match (self.kind, other.kind) {
                (EventKind::Arrival { package: lhs }, EventKind::Arrival { package: rhs }) => {
                    lhs.cmp(&rhs)
                }
                (
                    EventKind::Departure {
                        origin: lhs_origin,
                        section: lhs_section,
                    },
                    EventKind::Departure {
                        origin: rhs_origin,
                        section: rhs_section,
                    },
                ) => (lhs_origin, lhs_section).cmp(&(rhs_origin, rhs_section)),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
