use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{Load, PackageId, Route, Tick, WarehouseId};

/// Number of past routes remembered by a package; the oldest is evicted first.
pub const ROUTE_HISTORY_LIMIT: usize = 5;

/// State of a package in its lifecycle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PackageState {
    /// Package exists but its post time has not come yet.
    NotPosted,
    /// Sits in a warehouse section waiting for transport.
    Stored,
    /// Waits in the queue of a full section.
    Waiting,
    /// Travels between two warehouses.
    InTransit,
    /// Reached its destination.
    Delivered,
    /// Can never reach its destination.
    Undeliverable,
}

impl PackageState {
    /// Delivered and undeliverable packages are never touched again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Undeliverable)
    }
}

impl Default for PackageState {
    fn default() -> Self {
        Self::NotPosted
    }
}

/// Weight tier of a package.
///
/// Heavier packages take more space in storage and slow down handling and transport.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WeightClass {
    /// Up to 1 unit.
    Light,
    /// Up to 3 units.
    Medium,
    /// Up to 5 units.
    Heavy,
    /// Anything heavier.
    ExtraHeavy,
}

impl WeightClass {
    /// Classifies the given weight.
    #[must_use]
    pub fn from_weight(weight: u32) -> Self {
        match weight {
            0..=1 => Self::Light,
            2..=3 => Self::Medium,
            4..=5 => Self::Heavy,
            _ => Self::ExtraHeavy,
        }
    }

    /// Multiplier applied to removal costs and transport latencies.
    #[must_use]
    pub fn impact_factor(self) -> f64 {
        match self {
            Self::Light => 1.0,
            Self::Medium => 1.2,
            Self::Heavy => 1.5,
            Self::ExtraHeavy => 2.0,
        }
    }

    /// Storage units taken in a section.
    #[must_use]
    pub fn storage_space(self) -> u32 {
        match self {
            Self::Light => 1,
            Self::Medium => 2,
            Self::Heavy => 3,
            Self::ExtraHeavy => 5,
        }
    }
}

/// A package traveling from its origin to its destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    id: PackageId,
    origin: WarehouseId,
    destination: WarehouseId,
    post_time: Tick,
    location: WarehouseId,
    state: PackageState,
    route: Route,
    weight: u32,
    special_handling: bool,
    history: VecDeque<Route>,
    last_route_calculation: Tick,
}

impl Package {
    /// Constructs a new unposted package of unit weight, located at its origin, with no route.
    #[must_use]
    pub fn new(
        id: PackageId,
        origin: WarehouseId,
        destination: WarehouseId,
        post_time: Tick,
    ) -> Self {
        Self {
            id,
            origin,
            destination,
            post_time,
            location: origin,
            state: PackageState::NotPosted,
            route: Route::default(),
            weight: 1,
            special_handling: false,
            history: VecDeque::new(),
            last_route_calculation: 0,
        }
    }

    /// Sets the weight of the package.
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Marks the package as requiring special handling, which triggers route recalculation
    /// at every warehouse when dynamic routing is enabled.
    #[must_use]
    pub fn with_special_handling(mut self, special_handling: bool) -> Self {
        self.special_handling = special_handling;
        self
    }

    /// Sets the initial route.
    #[must_use]
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    /// Package ID.
    #[must_use]
    pub fn id(&self) -> PackageId {
        self.id
    }

    /// Warehouse the package is posted at.
    #[must_use]
    pub fn origin(&self) -> WarehouseId {
        self.origin
    }

    /// Warehouse the package is delivered to.
    #[must_use]
    pub fn destination(&self) -> WarehouseId {
        self.destination
    }

    /// Time the package enters the network.
    #[must_use]
    pub fn post_time(&self) -> Tick {
        self.post_time
    }

    /// Last warehouse the package has been admitted to.
    #[must_use]
    pub fn location(&self) -> WarehouseId {
        self.location
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PackageState {
        self.state
    }

    /// Remaining route, starting at the current or next warehouse.
    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Weight in units.
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Weight class derived from the weight.
    #[must_use]
    pub fn weight_class(&self) -> WeightClass {
        WeightClass::from_weight(self.weight)
    }

    /// Whether the package requires special handling.
    #[must_use]
    pub fn special_handling(&self) -> bool {
        self.special_handling
    }

    /// Previously followed routes, oldest first.
    pub fn route_history(&self) -> impl Iterator<Item = &Route> {
        self.history.iter()
    }

    /// Number of times the route has been replaced, capped at [`ROUTE_HISTORY_LIMIT`].
    #[must_use]
    pub fn route_changes(&self) -> usize {
        self.history.len()
    }

    /// Time the route was last computed.
    #[must_use]
    pub fn last_route_calculation(&self) -> Tick {
        self.last_route_calculation
    }

    /// Space and weight taken in storage.
    #[must_use]
    pub fn load(&self) -> Load {
        Load {
            space: self.weight_class().storage_space(),
            weight: self.weight,
        }
    }

    pub(crate) fn set_state(&mut self, state: PackageState) {
        self.state = state;
    }

    pub(crate) fn set_location(&mut self, location: WarehouseId) {
        self.location = location;
    }

    pub(crate) fn route_mut(&mut self) -> &mut Route {
        &mut self.route
    }

    pub(crate) fn set_route_calculated(&mut self, time: Tick) {
        self.last_route_calculation = time;
    }

    /// Replaces the route, remembering the previous one.
    pub(crate) fn replace_route(&mut self, route: Route) -> Route {
        let previous = std::mem::replace(&mut self.route, route);
        if self.history.len() == ROUTE_HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(previous.clone());
        previous
    }
}
