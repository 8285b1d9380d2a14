//! Notifications of package state transitions.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serde::Serialize;

use crate::{PackageId, Route, Tick, WarehouseId};

/// A single change in the state or location of a package.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Stored in a section.
    Stored {
        time: Tick,
        package: PackageId,
        warehouse: WarehouseId,
        section: WarehouseId,
    },
    /// Taken out of a section during a departure.
    Removed {
        time: Tick,
        package: PackageId,
        warehouse: WarehouseId,
        section: WarehouseId,
    },
    /// Put back into the section it was removed from, because the transport was full.
    Restored {
        time: Tick,
        package: PackageId,
        warehouse: WarehouseId,
        section: WarehouseId,
    },
    /// Left `origin` for `destination`.
    InTransit {
        time: Tick,
        package: PackageId,
        origin: WarehouseId,
        destination: WarehouseId,
    },
    /// Reached its destination.
    Delivered {
        time: Tick,
        package: PackageId,
        warehouse: WarehouseId,
    },
    /// Queued because the section was full.
    Waiting {
        time: Tick,
        package: PackageId,
        warehouse: WarehouseId,
        section: WarehouseId,
    },
    /// Moved from a full warehouse to its secondary storage.
    SecondaryStorage {
        time: Tick,
        package: PackageId,
        primary: WarehouseId,
        secondary: WarehouseId,
        section: WarehouseId,
    },
    /// Sent through a different neighbor because the section was full.
    Detoured {
        time: Tick,
        package: PackageId,
        warehouse: WarehouseId,
        alternative: WarehouseId,
    },
    /// Route recalculated at a warehouse and found different.
    Rerouted {
        time: Tick,
        package: PackageId,
        warehouse: WarehouseId,
        previous: Route,
        route: Route,
    },
    /// Can never reach its destination.
    Undeliverable {
        time: Tick,
        package: PackageId,
        warehouse: WarehouseId,
    },
}

impl Transition {
    /// Time of the transition.
    #[must_use]
    pub fn time(&self) -> Tick {
        match self {
            Self::Stored { time, .. }
            | Self::Removed { time, .. }
            | Self::Restored { time, .. }
            | Self::InTransit { time, .. }
            | Self::Delivered { time, .. }
            | Self::Waiting { time, .. }
            | Self::SecondaryStorage { time, .. }
            | Self::Detoured { time, .. }
            | Self::Rerouted { time, .. }
            | Self::Undeliverable { time, .. } => *time,
        }
    }

    /// Package that changed.
    #[must_use]
    pub fn package(&self) -> PackageId {
        match self {
            Self::Stored { package, .. }
            | Self::Removed { package, .. }
            | Self::Restored { package, .. }
            | Self::InTransit { package, .. }
            | Self::Delivered { package, .. }
            | Self::Waiting { package, .. }
            | Self::SecondaryStorage { package, .. }
            | Self::Detoured { package, .. }
            | Self::Rerouted { package, .. }
            | Self::Undeliverable { package, .. } => *package,
        }
    }

    /// Warehouse where the package is after the transition, or the one it left if in transit.
    #[must_use]
    pub fn warehouse(&self) -> WarehouseId {
        match self {
            Self::Stored { warehouse, .. }
            | Self::Removed { warehouse, .. }
            | Self::Restored { warehouse, .. }
            | Self::Delivered { warehouse, .. }
            | Self::Waiting { warehouse, .. }
            | Self::Detoured { warehouse, .. }
            | Self::Rerouted { warehouse, .. }
            | Self::Undeliverable { warehouse, .. } => *warehouse,
            Self::InTransit { origin, .. } => *origin,
            Self::SecondaryStorage { secondary, .. } => *secondary,
        }
    }

    /// Section, next warehouse, or alternative hop involved in the transition, if any.
    #[must_use]
    pub fn target(&self) -> Option<WarehouseId> {
        match self {
            Self::Stored { section, .. }
            | Self::Removed { section, .. }
            | Self::Restored { section, .. }
            | Self::Waiting { section, .. }
            | Self::SecondaryStorage { section, .. } => Some(*section),
            Self::InTransit { destination, .. } => Some(*destination),
            Self::Detoured { alternative, .. } => Some(*alternative),
            Self::Rerouted { route, .. } => route.next_hop(),
            Self::Delivered { .. } | Self::Undeliverable { .. } => None,
        }
    }

    /// Short snake case name of the transition.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stored { .. } => "stored",
            Self::Removed { .. } => "removed",
            Self::Restored { .. } => "restored",
            Self::InTransit { .. } => "in_transit",
            Self::Delivered { .. } => "delivered",
            Self::Waiting { .. } => "waiting",
            Self::SecondaryStorage { .. } => "secondary_storage",
            Self::Detoured { .. } => "detoured",
            Self::Rerouted { .. } => "rerouted",
            Self::Undeliverable { .. } => "undeliverable",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = |id: WarehouseId| usize::from(id);
        write!(
            f,
            "{:07} package {:03} ",
            self.time(),
            usize::from(self.package())
        )?;
        match self {
            Self::Stored {
                warehouse, section, ..
            } => write!(
                f,
                "stored at {:03} in section {:03}",
                id(*warehouse),
                id(*section)
            ),
            Self::Removed {
                warehouse, section, ..
            } => write!(
                f,
                "removed from {:03} in section {:03}",
                id(*warehouse),
                id(*section)
            ),
            Self::Restored {
                warehouse, section, ..
            } => write!(
                f,
                "restored at {:03} in section {:03}",
                id(*warehouse),
                id(*section)
            ),
            Self::InTransit {
                origin,
                destination,
                ..
            } => write!(
                f,
                "in transit from {:03} to {:03}",
                id(*origin),
                id(*destination)
            ),
            Self::Delivered { warehouse, .. } => write!(f, "delivered at {:03}", id(*warehouse)),
            Self::Waiting {
                warehouse, section, ..
            } => write!(
                f,
                "waiting at {:03} for section {:03}",
                id(*warehouse),
                id(*section)
            ),
            Self::SecondaryStorage {
                primary,
                secondary,
                section,
                ..
            } => write!(
                f,
                "moved from {:03} to secondary storage {:03} for section {:03}",
                id(*primary),
                id(*secondary),
                id(*section)
            ),
            Self::Detoured {
                warehouse,
                alternative,
                ..
            } => write!(
                f,
                "detoured at {:03} through {:03}",
                id(*warehouse),
                id(*alternative)
            ),
            Self::Rerouted {
                warehouse,
                previous,
                route,
                ..
            } => write!(
                f,
                "rerouted at {:03} from [{}] to [{}]",
                id(*warehouse),
                previous,
                route
            ),
            Self::Undeliverable { warehouse, .. } => {
                write!(f, "undeliverable at {:03}", id(*warehouse))
            }
        }
    }
}

/// Receiver of transition notifications.
///
/// Sinks must not fail the simulation: any errors should be handled (e.g., logged) internally.
pub trait TransitionSink {
    /// Called once for every transition, in the order they happen.
    fn notify(&mut self, transition: &Transition);

    /// Called at the end of a run.
    fn flush(&mut self) {}
}

/// Writes one line of text per transition.
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    /// Constructs a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TransitionSink for TextSink<W> {
    fn notify(&mut self, transition: &Transition) {
        if let Err(err) = writeln!(self.writer, "{}", transition) {
            log::error!("Unable to write transition: {}", err);
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::error!("Unable to flush transitions: {}", err);
        }
    }
}

#[derive(Serialize)]
struct TransitionRecord {
    time: Tick,
    package: PackageId,
    kind: &'static str,
    warehouse: WarehouseId,
    target: Option<WarehouseId>,
}

impl From<&Transition> for TransitionRecord {
    fn from(transition: &Transition) -> Self {
        Self {
            time: transition.time(),
            package: transition.package(),
            kind: transition.name(),
            warehouse: transition.warehouse(),
            target: transition.target(),
        }
    }
}

/// Writes transitions as CSV rows with the header `time,package,kind,warehouse,target`.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    /// Constructs a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }
}

impl<W: Write> TransitionSink for CsvSink<W> {
    fn notify(&mut self, transition: &Transition) {
        if let Err(err) = self.writer.serialize(TransitionRecord::from(transition)) {
            log::error!("Unable to write CSV record: {}", err);
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::error!("Unable to flush CSV output: {}", err);
        }
    }
}

/// Collects transitions in a shared buffer.
///
/// The recorder can be cloned before being passed to the scheduler, and the clone used to
/// inspect the transitions afterwards.
#[derive(Debug, Clone, Default)]
pub struct TransitionRecorder {
    transitions: Rc<RefCell<Vec<Transition>>>,
}

impl TransitionRecorder {
    /// Constructs an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded transitions.
    #[must_use]
    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.borrow().clone()
    }

    /// Returns the transitions of a single package.
    #[must_use]
    pub fn for_package(&self, package: PackageId) -> Vec<Transition> {
        self.transitions
            .borrow()
            .iter()
            .filter(|transition| transition.package() == package)
            .cloned()
            .collect()
    }

    /// Number of recorded transitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.borrow().len()
    }

    /// Checks if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.borrow().is_empty()
    }
}

impl TransitionSink for TransitionRecorder {
    fn notify(&mut self, transition: &Transition) {
        self.transitions.borrow_mut().push(transition.clone());
    }
}
