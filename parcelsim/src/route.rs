use std::collections::VecDeque;
use std::iter::FromIterator;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::WarehouseId;

/// Ordered sequence of warehouses a package still has to visit, including the warehouse it is
/// currently at (or heading to) and its destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route(VecDeque<WarehouseId>);

impl Route {
    /// Current or next warehouse.
    #[must_use]
    pub fn head(&self) -> Option<WarehouseId> {
        self.0.front().copied()
    }

    /// Warehouse right after the head.
    #[must_use]
    pub fn next_hop(&self) -> Option<WarehouseId> {
        self.0.get(1).copied()
    }

    /// Final warehouse of the route.
    #[must_use]
    pub fn destination(&self) -> Option<WarehouseId> {
        self.0.back().copied()
    }

    /// Removes the head once the hop is complete.
    pub fn advance(&mut self) -> Option<WarehouseId> {
        self.0.pop_front()
    }

    /// Puts `warehouse` in front of the route.
    pub fn prepend(&mut self, warehouse: WarehouseId) {
        self.0.push_front(warehouse);
    }

    /// Number of warehouses left, including the head.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if there are no warehouses left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of edges along the route.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Iterates over the warehouses from the head to the destination.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = WarehouseId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<WarehouseId> for Route {
    fn from_iter<I: IntoIterator<Item = WarehouseId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<usize>> for Route {
    fn from(warehouses: Vec<usize>) -> Self {
        warehouses.into_iter().map(WarehouseId::from).collect()
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().format(" -> "))
    }
}
