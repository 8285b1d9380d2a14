use serde::{Deserialize, Serialize};

use crate::{Error, Result, Tick, WarehouseId};

/// Transport link between two warehouses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Maximum number of packages shipped in one departure.
    pub capacity: usize,
    /// Transport time before any time-of-day adjustment.
    pub base_latency: Tick,
    /// Static multiplier of the latency.
    pub time_multiplier: f64,
    /// Inactive edges are invisible to routing and never used for transport.
    pub active: bool,
}

impl Edge {
    /// Constructs an active edge with a unit time multiplier.
    #[must_use]
    pub fn new(capacity: usize, base_latency: Tick) -> Self {
        Self {
            capacity,
            base_latency,
            time_multiplier: 1.0,
            active: true,
        }
    }

    /// Sets the time multiplier.
    #[must_use]
    pub fn with_time_multiplier(mut self, time_multiplier: f64) -> Self {
        self.time_multiplier = time_multiplier;
        self
    }
}

/// Undirected warehouse network.
///
/// Edges `i -> j` and `j -> i` always share the same attributes. Edges are never removed, only
/// deactivated. Every modification bumps the [revision](Graph::revision), which lets route
/// caches detect stale entries.
#[derive(Debug, Clone)]
pub struct Graph {
    num_warehouses: usize,
    edges: Vec<Option<Edge>>,
    time_varying: bool,
    revision: u64,
}

impl Graph {
    /// Constructs a graph of `num_warehouses` disconnected warehouses.
    #[must_use]
    pub fn new(num_warehouses: usize) -> Self {
        Self {
            num_warehouses,
            edges: vec![None; num_warehouses * num_warehouses],
            time_varying: false,
            revision: 0,
        }
    }

    /// Enables the periodic congestion factor in [`Graph::dynamic_latency`].
    #[must_use]
    pub fn time_varying(mut self, time_varying: bool) -> Self {
        self.time_varying = time_varying;
        self
    }

    /// Number of warehouses in the network.
    #[must_use]
    pub fn num_warehouses(&self) -> usize {
        self.num_warehouses
    }

    /// Checks if edge latencies change over time.
    #[must_use]
    pub fn is_time_varying(&self) -> bool {
        self.time_varying
    }

    /// Counter incremented by every edge insertion or modification.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Connects `a` and `b`, replacing any previous edge between them.
    ///
    /// # Errors
    ///
    /// Fails if either warehouse does not exist or if `a == b`.
    pub fn add_edge(&mut self, a: WarehouseId, b: WarehouseId, edge: Edge) -> Result<()> {
        if a == b {
            return Err(Error::Config(format!("self-loop at warehouse {}", a)));
        }
        let forward = self.index(a, b)?;
        let backward = self.index(b, a)?;
        self.edges[forward] = Some(edge);
        self.edges[backward] = Some(edge);
        self.revision += 1;
        Ok(())
    }

    /// Activates or deactivates an existing edge.
    ///
    /// # Errors
    ///
    /// Fails if either warehouse does not exist or they are not connected.
    pub fn set_active(&mut self, a: WarehouseId, b: WarehouseId, active: bool) -> Result<()> {
        let forward = self.index(a, b)?;
        let backward = self.index(b, a)?;
        let edge = self.edges[forward]
            .as_mut()
            .ok_or_else(|| Error::Config(format!("no edge between {} and {}", a, b)))?;
        edge.active = active;
        let edge = *edge;
        self.edges[backward] = Some(edge);
        self.revision += 1;
        Ok(())
    }

    /// Returns the edge between `a` and `b`, regardless of whether it is active.
    #[must_use]
    pub fn edge(&self, a: WarehouseId, b: WarehouseId) -> Option<&Edge> {
        self.index(a, b)
            .ok()
            .and_then(|index| self.edges[index].as_ref())
    }

    /// Checks if `a` and `b` are connected by an active edge.
    #[must_use]
    pub fn has_edge(&self, a: WarehouseId, b: WarehouseId) -> bool {
        self.edge(a, b).map_or(false, |edge| edge.active)
    }

    /// Iterates over warehouses connected to `warehouse` by active edges, in ascending order.
    pub fn neighbors(&self, warehouse: WarehouseId) -> impl Iterator<Item = WarehouseId> + '_ {
        let from = usize::from(warehouse);
        let row = if from < self.num_warehouses {
            &self.edges[from * self.num_warehouses..(from + 1) * self.num_warehouses]
        } else {
            &self.edges[..0]
        };
        row.iter()
            .enumerate()
            .filter(|(_, edge)| edge.map_or(false, |edge| edge.active))
            .map(|(to, _)| WarehouseId::from(to))
    }

    /// Iterates over all active directed edges `(from, to)`, ordered by `from` and then `to`.
    pub fn directed_edges(&self) -> impl Iterator<Item = (WarehouseId, WarehouseId)> + '_ {
        (0..self.num_warehouses).flat_map(move |from| {
            let from = WarehouseId::from(from);
            self.neighbors(from).map(move |to| (from, to))
        })
    }

    /// Latency of the edge between `a` and `b` at `time`, or `None` if there is no active edge.
    ///
    /// In a time-varying graph, the latency oscillates by up to 10% around its base value.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn dynamic_latency(&self, a: WarehouseId, b: WarehouseId, time: Tick) -> Option<Tick> {
        let edge = self.edge(a, b).filter(|edge| edge.active)?;
        let mut latency = edge.base_latency as f64 * edge.time_multiplier;
        if self.time_varying {
            latency *= 1.0 + 0.1 * (0.01 * time as f64).sin();
        }
        Some(latency.max(0.0) as Tick)
    }

    fn index(&self, a: WarehouseId, b: WarehouseId) -> Result<usize> {
        let (a, b) = (usize::from(a), usize::from(b));
        if a >= self.num_warehouses {
            return Err(Error::UnknownWarehouse(WarehouseId::from(a)));
        }
        if b >= self.num_warehouses {
            return Err(Error::UnknownWarehouse(WarehouseId::from(b)));
        }
        Ok(a * self.num_warehouses + b)
    }
}
