//! Route computation over the warehouse [`Graph`].

use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use ordered_float::OrderedFloat;

use crate::{Graph, Route, Tick, WarehouseId};

/// Policy computing routes for packages.
pub trait Routing {
    /// Computes a route from `origin` to `destination`, inclusive, for a package of the given
    /// `weight` at `time`. Returns `None` if the destination is unreachable.
    fn route(
        &mut self,
        graph: &Graph,
        origin: WarehouseId,
        destination: WarehouseId,
        weight: u32,
        time: Tick,
    ) -> Option<Route>;
}

/// Routes along the paths with the fewest hops. See [`shortest_path`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HopRouting;

impl Routing for HopRouting {
    fn route(
        &mut self,
        graph: &Graph,
        origin: WarehouseId,
        destination: WarehouseId,
        _: u32,
        _: Tick,
    ) -> Option<Route> {
        Some(shortest_path(graph, origin, destination)).filter(|route| !route.is_empty())
    }
}

/// Finds a path with the fewest hops by breadth-first search.
///
/// The search always starts from the lower of the two IDs and visits neighbors in ascending
/// order, so among equally short paths, the one going through lower IDs earlier on that side
/// wins. Consequently, `shortest_path(graph, b, a)` is always `shortest_path(graph, a, b)`
/// reversed. Returns a single-element route if `origin` equals `destination`, and an empty route
/// if `destination` is unreachable.
#[must_use]
pub fn shortest_path(graph: &Graph, origin: WarehouseId, destination: WarehouseId) -> Route {
    let size = graph.num_warehouses();
    if usize::from(origin) >= size || usize::from(destination) >= size {
        return Route::default();
    }
    if origin > destination {
        return breadth_first(graph, destination, origin).iter().rev().collect();
    }
    breadth_first(graph, origin, destination)
}

fn breadth_first(graph: &Graph, origin: WarehouseId, destination: WarehouseId) -> Route {
    let size = graph.num_warehouses();
    let mut predecessors: Vec<Option<WarehouseId>> = vec![None; size];
    let mut visited = vec![false; size];
    visited[usize::from(origin)] = true;
    let mut queue = VecDeque::new();
    queue.push_back(origin);
    while let Some(current) = queue.pop_front() {
        if current == destination {
            break;
        }
        for next in graph.neighbors(current) {
            if !visited[usize::from(next)] {
                visited[usize::from(next)] = true;
                predecessors[usize::from(next)] = Some(current);
                queue.push_back(next);
            }
        }
    }
    if visited[usize::from(destination)] {
        reconstruct(&predecessors, origin, destination)
    } else {
        Route::default()
    }
}

fn reconstruct(
    predecessors: &[Option<WarehouseId>],
    origin: WarehouseId,
    destination: WarehouseId,
) -> Route {
    let mut route = Route::default();
    let mut current = destination;
    route.prepend(current);
    while current != origin {
        match predecessors[usize::from(current)] {
            Some(previous) => {
                route.prepend(previous);
                current = previous;
            }
            None => return Route::default(),
        }
    }
    route
}

/// Route with its estimated transport cost.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    /// Warehouses along the route, inclusive.
    pub path: Route,
    /// Sum of edge latencies, scaled by the weight factor.
    pub cost: f64,
}

/// Cost multiplier for heavier packages: each unit above 1 adds 10%.
#[must_use]
pub fn weight_factor(weight: u32) -> f64 {
    1.0 + 0.1 * (f64::from(weight.max(1)) - 1.0)
}

/// Finds routes of the lowest latency, taking package weight and time into account.
///
/// Results are cached for each `(origin, destination)` pair. Because the weight factor scales
/// every edge cost by the same amount, the cheapest path does not depend on the weight, and only
/// the cost is rescaled when serving a cached route. The cache is dropped whenever the graph
/// changes and, for a time-varying graph, whenever the requested time changes.
#[derive(Debug, Default)]
pub struct RouteFinder {
    cache: HashMap<(WarehouseId, WarehouseId), Option<PlannedRoute>>,
    revision: Option<u64>,
    time: Option<Tick>,
    hits: usize,
    misses: usize,
}

impl RouteFinder {
    /// Constructs a route finder with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the cheapest route by Dijkstra's algorithm, or `None` if `destination` is
    /// unreachable.
    ///
    /// The cost of an edge is its [dynamic latency](Graph::dynamic_latency) at `time`
    /// multiplied by [`weight_factor`]. Among routes of equal cost, the one reaching lower IDs
    /// first wins.
    pub fn find_best_route(
        &mut self,
        graph: &Graph,
        origin: WarehouseId,
        destination: WarehouseId,
        weight: u32,
        time: Tick,
    ) -> Option<PlannedRoute> {
        self.refresh(graph, time);
        let plan = match self.cache.entry((origin, destination)) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                entry
                    .insert(dijkstra(graph, origin, destination, time))
                    .clone()
            }
        };
        plan.map(|plan| PlannedRoute {
            path: plan.path,
            cost: plan.cost * weight_factor(weight),
        })
    }

    /// Drops all cached routes.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Number of requests served from the cache.
    #[must_use]
    pub fn cache_hits(&self) -> usize {
        self.hits
    }

    /// Number of requests that required a search.
    #[must_use]
    pub fn cache_misses(&self) -> usize {
        self.misses
    }

    fn refresh(&mut self, graph: &Graph, time: Tick) {
        let graph_changed = self.revision != Some(graph.revision());
        let time_changed = graph.is_time_varying() && self.time != Some(time);
        if (graph_changed || time_changed) && !self.cache.is_empty() {
            log::trace!("Dropping {} cached routes", self.cache.len());
            self.invalidate();
        }
        self.revision = Some(graph.revision());
        self.time = Some(time);
    }
}

impl Routing for RouteFinder {
    fn route(
        &mut self,
        graph: &Graph,
        origin: WarehouseId,
        destination: WarehouseId,
        weight: u32,
        time: Tick,
    ) -> Option<Route> {
        self.find_best_route(graph, origin, destination, weight, time)
            .map(|plan| plan.path)
    }
}

#[allow(clippy::cast_precision_loss)]
fn dijkstra(
    graph: &Graph,
    origin: WarehouseId,
    destination: WarehouseId,
    time: Tick,
) -> Option<PlannedRoute> {
    let size = graph.num_warehouses();
    if usize::from(origin) >= size || usize::from(destination) >= size {
        return None;
    }
    let mut distances = vec![f64::INFINITY; size];
    let mut predecessors: Vec<Option<WarehouseId>> = vec![None; size];
    let mut heap = BinaryHeap::new();
    distances[usize::from(origin)] = 0.0;
    heap.push(Reverse((OrderedFloat(0.0), origin)));
    while let Some(Reverse((OrderedFloat(cost), current))) = heap.pop() {
        if current == destination {
            break;
        }
        if cost > distances[usize::from(current)] {
            continue;
        }
        for next in graph.neighbors(current) {
            if let Some(latency) = graph.dynamic_latency(current, next, time) {
                let candidate = cost + latency as f64;
                if candidate < distances[usize::from(next)] {
                    distances[usize::from(next)] = candidate;
                    predecessors[usize::from(next)] = Some(current);
                    heap.push(Reverse((OrderedFloat(candidate), next)));
                }
            }
        }
    }
    let cost = distances[usize::from(destination)];
    if cost.is_finite() {
        Some(PlannedRoute {
            path: reconstruct(&predecessors, origin, destination),
            cost,
        })
    } else {
        None
    }
}

/// Enumerates all simple paths from `origin` to `destination` with at most `max_depth` hops.
///
/// Paths are produced in depth-first order, visiting neighbors in ascending order of IDs.
#[must_use]
pub fn find_all_routes(
    graph: &Graph,
    origin: WarehouseId,
    destination: WarehouseId,
    max_depth: usize,
) -> Vec<Route> {
    let size = graph.num_warehouses();
    let mut routes = Vec::new();
    if usize::from(origin) >= size || usize::from(destination) >= size {
        return routes;
    }
    let mut visited = vec![false; size];
    visited[usize::from(origin)] = true;
    let mut path = vec![origin];
    collect_routes(
        graph,
        destination,
        max_depth,
        &mut path,
        &mut visited,
        &mut routes,
    );
    routes
}

fn collect_routes(
    graph: &Graph,
    destination: WarehouseId,
    max_depth: usize,
    path: &mut Vec<WarehouseId>,
    visited: &mut [bool],
    routes: &mut Vec<Route>,
) {
    let current = match path.last() {
        Some(&current) => current,
        None => return,
    };
    if current == destination {
        routes.push(path.iter().copied().collect());
        return;
    }
    if path.len() > max_depth {
        return;
    }
    for next in graph.neighbors(current) {
        if !visited[usize::from(next)] {
            visited[usize::from(next)] = true;
            path.push(next);
            collect_routes(graph, destination, max_depth, path, visited, routes);
            path.pop();
            visited[usize::from(next)] = false;
        }
    }
}
