//! Package flow simulation through a network of warehouses.
//!
//! Packages are posted at their origin warehouse, wait in the section dedicated to their next
//! hop, and are periodically shipped along the transport links of the warehouse [`Graph`] until
//! they reach their destination. Everything happens in simulated time driven by the
//! [`Scheduler`]; see its documentation for the event model.

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::inline_always
)]

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

pub use simcore::Tick;

mod config;
pub use config::{
    EdgeConfig, Features, PackageConfig, ReroutePolicy, SecondaryStorage, Setup, SimulationConfig,
    StorageConfig, TransportParams,
};

mod event;
pub use event::{Event, EventKind};

mod graph;
pub use graph::{Edge, Graph};

mod metrics;
pub use metrics::{MetricsRecorder, SimulationMetrics};

mod package;
pub use package::{Package, PackageState, WeightClass, ROUTE_HISTORY_LIMIT};

mod route;
pub use route::Route;

mod routing;
pub use routing::{
    find_all_routes, shortest_path, weight_factor, HopRouting, PlannedRoute, RouteFinder, Routing,
};

mod scheduler;
pub use scheduler::{RunState, Scheduler};

mod storage;
pub use storage::{
    Admission, Load, Retrieval, Section, SectionLimits, Storage, StoredPackage, Warehouse,
    WarehouseLimits,
};

mod transition;
pub use transition::{CsvSink, TextSink, Transition, TransitionRecorder, TransitionSink};

/// Warehouse ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct WarehouseId(usize);

/// Package ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct PackageId(usize);

/// Error type encompassing all simulation errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration is missing data or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Referenced a warehouse that does not exist.
    #[error("unknown warehouse: {0}")]
    UnknownWarehouse(WarehouseId),
    /// Referenced a package that does not exist.
    #[error("unknown package: {0}")]
    UnknownPackage(PackageId),
    /// Failed to parse the plain-text input format.
    #[error("line {line}: {message}")]
    Parse {
        /// Line number, starting from 1.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// Failed to parse JSON configuration.
    #[error("unable to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to read the input.
    #[error("unable to read input: {0}")]
    Io(#[from] std::io::Error),
    /// Fatal error of the simulation engine, such as an overflowing event queue.
    #[error(transparent)]
    Engine(#[from] simcore::Error),
}

/// Result alias using [`Error`](enum.Error.html).
pub type Result<T> = std::result::Result<T, Error>;
