//! Discrete-event scheduler driving packages through the warehouse network.
//!
//! Two kinds of events exist. An **arrival** happens when a package is posted at its origin or
//! reaches the next warehouse of its route: it is either delivered, or stored in the section
//! dedicated to its next hop. A **departure** happens periodically for every directed edge and
//! ships packages from one section: all packages are taken out, each removal taking some time,
//! and those fitting in the transport are sent on their way, while the rest are put back.

use simcore::{Clock, EventQueue};

use crate::{
    Admission, Error, Event, EventKind, Features, Graph, HopRouting, MetricsRecorder, Package,
    PackageId, PackageState, ReroutePolicy, Result, Route, RouteFinder, Routing, Setup,
    SimulationMetrics, Storage, StoredPackage, Tick, Transition, TransitionSink, TransportParams,
    WarehouseId,
};

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    /// Constructed, no event seeded yet.
    Initializing,
    /// Events are being processed.
    Running,
    /// Event queue has been exhausted.
    Terminated,
}

/// Owns the whole simulation state and processes events in time order.
pub struct Scheduler {
    packages: Vec<Package>,
    storage: Storage,
    graph: Graph,
    routing: Box<dyn Routing>,
    events: EventQueue<Event>,
    clock: Clock,
    transport: TransportParams,
    features: Features,
    reroute: ReroutePolicy,
    active_packages: usize,
    metrics: SimulationMetrics,
    recorders: Vec<Box<dyn MetricsRecorder>>,
    sinks: Vec<Box<dyn TransitionSink>>,
    state: RunState,
}

impl Scheduler {
    /// Constructs a scheduler, routing by latency if `multiple_routes` is enabled, and by the
    /// number of hops otherwise.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::with_routing`].
    pub fn new(setup: Setup) -> Result<Self> {
        let routing: Box<dyn Routing> = if setup.features.multiple_routes {
            Box::new(RouteFinder::new())
        } else {
            Box::new(HopRouting)
        };
        Self::with_routing(setup, routing)
    }

    /// Constructs a scheduler with a custom routing policy.
    ///
    /// Packages without a route are routed at time 0. Those whose destination is unreachable
    /// are marked undeliverable right away and never enter the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the setup is inconsistent, e.g., the storage does not match the
    /// graph, package IDs do not match their positions, or a package references a warehouse
    /// that does not exist.
    pub fn with_routing(setup: Setup, routing: Box<dyn Routing>) -> Result<Self> {
        validate(&setup)?;
        let events = match setup.max_events {
            Some(capacity) => EventQueue::bounded(capacity),
            None => EventQueue::default(),
        };
        let metrics = SimulationMetrics {
            total_packages: setup.packages.len(),
            ..SimulationMetrics::default()
        };
        let mut scheduler = Self {
            packages: setup.packages,
            storage: setup.storage,
            graph: setup.graph,
            routing,
            events,
            clock: Clock::default(),
            transport: setup.transport,
            features: setup.features,
            reroute: setup.reroute,
            active_packages: 0,
            metrics,
            recorders: Vec::new(),
            sinks: Vec::new(),
            state: RunState::Initializing,
        };
        scheduler.seed_arrivals()?;
        Ok(scheduler)
    }

    /// Registers a receiver of package transitions.
    pub fn add_sink(&mut self, sink: Box<dyn TransitionSink>) {
        self.sinks.push(sink);
    }

    /// Registers an additional metrics recorder.
    pub fn add_recorder(&mut self, recorder: Box<dyn MetricsRecorder>) {
        self.recorders.push(recorder);
    }

    /// Activates or deactivates the edge between `a` and `b`.
    ///
    /// Packages stored for a deactivated edge are rerouted at its next departure.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist.
    pub fn set_edge_active(&mut self, a: WarehouseId, b: WarehouseId, active: bool) -> Result<()> {
        log::info!(
            "Edge {} -- {} {} at {}",
            a,
            b,
            if active { "activated" } else { "deactivated" },
            self.clock.time()
        );
        self.graph.set_active(a, b, active)
    }

    /// All packages, indexed by their IDs.
    #[must_use]
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Package of the given ID, if it exists.
    #[must_use]
    pub fn package(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(usize::from(id))
    }

    /// Warehouse storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Warehouse network.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> Tick {
        self.clock.time()
    }

    /// Number of packages that are neither delivered nor undeliverable.
    #[must_use]
    pub fn active_packages(&self) -> usize {
        self.active_packages
    }

    /// Metrics collected so far.
    #[must_use]
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of scheduled events.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Reports packages that could not be routed and schedules the first departure of every
    /// directed edge one interval after the earliest post time.
    ///
    /// Called by [`Scheduler::run_until`] if needed; does nothing when called again.
    ///
    /// # Errors
    ///
    /// Fails if the event queue overflows.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != RunState::Initializing {
            return Ok(());
        }
        log::info!(
            "Starting simulation of {} packages ({} active) through {} warehouses",
            self.packages.len(),
            self.active_packages,
            self.graph.num_warehouses()
        );
        let unrouted: Vec<_> = self
            .packages
            .iter()
            .filter(|package| package.state() == PackageState::Undeliverable)
            .map(|package| (package.post_time(), package.id(), package.origin()))
            .collect();
        for (time, package, warehouse) in unrouted {
            log::warn!("Package {} has no route to its destination", package);
            self.notify(Transition::Undeliverable {
                time,
                package,
                warehouse,
            });
            self.record(|m| m.undeliverable());
        }
        let first_post = self
            .packages
            .iter()
            .filter(|package| package.state() == PackageState::NotPosted)
            .map(Package::post_time)
            .min();
        if let Some(first_post) = first_post {
            let start = first_post + self.transport.interval;
            let size = self.graph.num_warehouses();
            for origin in (0..size).map(WarehouseId::from) {
                for section in (0..size).map(WarehouseId::from) {
                    if self.graph.edge(origin, section).is_some() {
                        self.events
                            .insert(Event::departure(start, origin, section))?;
                    }
                }
            }
        }
        self.state = RunState::Running;
        Ok(())
    }

    /// Runs the simulation until no events are left.
    ///
    /// # Errors
    ///
    /// Fails if the event queue overflows.
    pub fn run(&mut self) -> Result<SimulationMetrics> {
        self.run_until(Tick::MAX)
    }

    /// Processes events until the first one scheduled later than `horizon`, which stays in
    /// the queue, and returns the metrics at that point.
    ///
    /// # Errors
    ///
    /// Fails if the event queue overflows.
    pub fn run_until(&mut self, horizon: Tick) -> Result<SimulationMetrics> {
        self.initialize()?;
        while let Ok(event) = self.events.peek_min() {
            if event.time > horizon {
                log::info!("Stopped at {} with {} events pending", horizon, self.events.len());
                return Ok(self.metrics.clone());
            }
            let event = self.events.extract_min()?;
            self.step(event)?;
        }
        if self.state != RunState::Terminated {
            self.state = RunState::Terminated;
            for sink in &mut self.sinks {
                sink.flush();
            }
            log::info!(
                "Simulation finished at {}: {}/{} packages delivered",
                self.clock.time(),
                self.metrics.delivered,
                self.metrics.total_packages
            );
        }
        Ok(self.metrics.clone())
    }

    fn step(&mut self, event: Event) -> Result<()> {
        if event.time < self.clock.time() {
            log::warn!(
                "Skipping stale event {:?} at {}",
                event,
                self.clock.time()
            );
            return Ok(());
        }
        self.clock.advance(event.time)?;
        self.record(|m| m.event(event.time));
        log::trace!("Processing {:?}", event);
        match event.kind {
            EventKind::Arrival { package } => self.arrive(event.time, package),
            EventKind::Departure { origin, section } => self.depart(event.time, origin, section),
        }
    }

    fn seed_arrivals(&mut self) -> Result<()> {
        for index in 0..self.packages.len() {
            let package = &self.packages[index];
            if package.route().is_empty() {
                let route = self.routing.route(
                    &self.graph,
                    package.origin(),
                    package.destination(),
                    package.weight(),
                    0,
                );
                let package = &mut self.packages[index];
                match route {
                    Some(route) => *package.route_mut() = route,
                    None => {
                        package.set_state(PackageState::Undeliverable);
                        continue;
                    }
                }
            }
            let package = &self.packages[index];
            self.events
                .insert(Event::arrival(package.post_time(), package.id()))?;
            self.active_packages += 1;
        }
        Ok(())
    }

    fn arrive(&mut self, time: Tick, id: PackageId) -> Result<()> {
        let package = &self.packages[usize::from(id)];
        if package.state().is_terminal() {
            log::warn!("Ignoring arrival of {} package {}", package.state(), id);
            return Ok(());
        }
        let current = match package.route().head() {
            Some(current) => current,
            None => {
                let location = package.location();
                self.give_up(time, id, location);
                return Ok(());
            }
        };
        self.package_mut(id).set_location(current);
        if self.packages[usize::from(id)].route().len() == 1 {
            self.deliver(time, id, current);
            return Ok(());
        }
        if self.features.dynamic_routing && self.should_recalculate(time, id) {
            self.recalculate_route(time, id, current);
        }
        let package = self.package_mut(id);
        package.route_mut().advance();
        match package.route().head() {
            Some(next) => self.admit(time, id, current, next),
            None => self.deliver(time, id, current),
        }
        Ok(())
    }

    fn should_recalculate(&self, time: Tick, id: PackageId) -> bool {
        let package = &self.packages[usize::from(id)];
        time.saturating_sub(package.last_route_calculation()) > self.reroute.interval
            || package.special_handling()
            || package.route_changes() > self.reroute.max_route_changes
    }

    fn recalculate_route(&mut self, time: Tick, id: PackageId, current: WarehouseId) {
        let package = &self.packages[usize::from(id)];
        let route = self.routing.route(
            &self.graph,
            current,
            package.destination(),
            package.weight(),
            time,
        );
        self.record(|m| m.route_recalculation());
        let route = match route {
            Some(route) => route,
            None => {
                log::debug!("No new route for package {} at {}", id, current);
                return;
            }
        };
        let package = self.package_mut(id);
        package.set_route_calculated(time);
        if package.route() == &route {
            return;
        }
        let previous = package.replace_route(route.clone());
        self.notify(Transition::Rerouted {
            time,
            package: id,
            warehouse: current,
            previous,
            route,
        });
        self.record(|m| m.alternative_route());
    }

    fn deliver(&mut self, time: Tick, id: PackageId, warehouse: WarehouseId) {
        let package = self.package_mut(id);
        package.set_state(PackageState::Delivered);
        package.set_location(warehouse);
        let lead_time = time.saturating_sub(package.post_time());
        self.active_packages -= 1;
        self.notify(Transition::Delivered {
            time,
            package: id,
            warehouse,
        });
        self.record(|m| m.delivery(time, lead_time));
    }

    fn give_up(&mut self, time: Tick, id: PackageId, warehouse: WarehouseId) {
        log::warn!("Package {} is undeliverable from {}", id, warehouse);
        self.package_mut(id).set_state(PackageState::Undeliverable);
        self.active_packages -= 1;
        self.notify(Transition::Undeliverable {
            time,
            package: id,
            warehouse,
        });
        self.record(|m| m.undeliverable());
    }

    /// Stores the package at `current` in the section for `next`, escalating through
    /// secondary storage, a detour, and the waiting queue when the section is full.
    fn admit(&mut self, time: Tick, id: PackageId, current: WarehouseId, next: WarehouseId) {
        let stored = StoredPackage::new(id, self.packages[usize::from(id)].load());
        if !self.storage[current].can_ever_store(stored.load, next) {
            self.give_up(time, id, current);
            return;
        }
        if self.storage[current].try_store(stored, next) {
            log::debug!("Package {} stored at {} for {}", id, current, next);
            self.package_mut(id).set_state(PackageState::Stored);
            self.notify(Transition::Stored {
                time,
                package: id,
                warehouse: current,
                section: next,
            });
            let occupancy = self.storage[current].occupancy();
            self.record(|m| m.occupancy(occupancy));
            return;
        }
        self.record(|m| m.capacity_overflow());
        if self.try_secondary_storage(time, stored, current, next)
            || self.try_detour(time, stored, current, next)
        {
            return;
        }
        log::debug!("Package {} waits at {} for {}", id, current, next);
        self.storage[current].store_in_waiting_queue(stored, next);
        self.package_mut(id).set_state(PackageState::Waiting);
        self.notify(Transition::Waiting {
            time,
            package: id,
            warehouse: current,
            section: next,
        });
        self.record(|m| m.waiting());
    }

    fn try_secondary_storage(
        &mut self,
        time: Tick,
        stored: StoredPackage,
        current: WarehouseId,
        next: WarehouseId,
    ) -> bool {
        let secondary = match self.storage[current].secondary_storage() {
            Some(secondary) => secondary,
            None => return false,
        };
        if secondary == next || !self.graph.has_edge(secondary, next) {
            return false;
        }
        match self
            .storage
            .transfer_to_secondary_storage(current, stored, next)
        {
            Some(secondary) => {
                log::debug!(
                    "Package {} moved from {} to secondary storage {}",
                    stored.id,
                    current,
                    secondary
                );
                let package = self.package_mut(stored.id);
                package.set_state(PackageState::Stored);
                package.set_location(secondary);
                self.notify(Transition::SecondaryStorage {
                    time,
                    package: stored.id,
                    primary: current,
                    secondary,
                    section: next,
                });
                let occupancy = self.storage[secondary].occupancy();
                self.record(|m| {
                    m.secondary_transfer();
                    m.occupancy(occupancy);
                });
                true
            }
            None => false,
        }
    }

    fn try_detour(
        &mut self,
        time: Tick,
        stored: StoredPackage,
        current: WarehouseId,
        next: WarehouseId,
    ) -> bool {
        let package = &self.packages[usize::from(stored.id)];
        let (destination, weight) = (package.destination(), package.weight());
        let candidates: Vec<_> = self
            .graph
            .neighbors(current)
            .filter(|&alternative| {
                alternative != next && self.storage[current].can_store(stored.load, alternative)
            })
            .collect();
        for alternative in candidates {
            let route = self
                .routing
                .route(&self.graph, alternative, destination, weight, time)
                .filter(|route| route.iter().all(|warehouse| warehouse != current));
            if let Some(route) = route {
                log::debug!(
                    "Package {} detoured at {} through {}",
                    stored.id,
                    current,
                    alternative
                );
                self.storage[current].try_store(stored, alternative);
                let package = self.package_mut(stored.id);
                package.replace_route(route);
                package.set_state(PackageState::Stored);
                self.notify(Transition::Detoured {
                    time,
                    package: stored.id,
                    warehouse: current,
                    alternative,
                });
                self.notify(Transition::Stored {
                    time,
                    package: stored.id,
                    warehouse: current,
                    section: alternative,
                });
                let occupancy = self.storage[current].occupancy();
                self.record(|m| {
                    m.alternative_route();
                    m.occupancy(occupancy);
                });
                return true;
            }
        }
        false
    }

    fn depart(&mut self, time: Tick, origin: WarehouseId, section: WarehouseId) -> Result<()> {
        if self.active_packages > 0 {
            self.events.insert(Event::departure(
                time + self.transport.interval,
                origin,
                section,
            ))?;
        }
        if !self.graph.has_edge(origin, section) {
            self.reroute_stranded(time, origin, section);
            return Ok(());
        }
        let admitted = self.storage[origin].process_waiting_queue(section);
        self.report_admitted(time, origin, section, admitted);
        let count = self.storage[origin].section_size(section);
        if count == 0 {
            return Ok(());
        }

        let mut removal_time = time;
        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            let retrieval = match self.storage[origin].retrieve(section) {
                Some(retrieval) => retrieval,
                None => break,
            };
            let package = &self.packages[usize::from(retrieval.package.id)];
            removal_time += self.scaled(self.transport.removal_cost, package);
            self.notify(Transition::Removed {
                time: removal_time,
                package: retrieval.package.id,
                warehouse: origin,
                section,
            });
            self.report_admitted(removal_time, origin, section, retrieval.admitted);
            removed.push(retrieval.package);
        }

        let capacity = self.transport_capacity(origin, section, time);
        let restored = removed.len() - capacity.min(removed.len());
        log::debug!(
            "Departure {} -> {} at {}: shipping {} of {} packages",
            origin,
            section,
            time,
            removed.len() - restored,
            removed.len()
        );
        for stored in removed[restored..].iter().rev() {
            let package = &self.packages[usize::from(stored.id)];
            let arrival = removal_time + self.transport_latency(origin, section, time, package);
            self.package_mut(stored.id)
                .set_state(PackageState::InTransit);
            self.notify(Transition::InTransit {
                time: removal_time,
                package: stored.id,
                origin,
                destination: section,
            });
            self.record(|m| m.transport());
            self.events.insert(Event::arrival(arrival, stored.id))?;
        }
        for &stored in removed[..restored].iter().rev() {
            match self.storage[origin].store(stored, section) {
                Admission::Stored => {
                    self.notify(Transition::Restored {
                        time: removal_time,
                        package: stored.id,
                        warehouse: origin,
                        section,
                    });
                    self.record(|m| m.rearrangement());
                }
                Admission::Waiting => {
                    self.package_mut(stored.id).set_state(PackageState::Waiting);
                    self.notify(Transition::Waiting {
                        time: removal_time,
                        package: stored.id,
                        warehouse: origin,
                        section,
                    });
                    self.record(|m| m.waiting());
                }
            }
        }
        Ok(())
    }

    /// Sends packages stored for an inactive edge along new routes from `origin`.
    fn reroute_stranded(&mut self, time: Tick, origin: WarehouseId, section: WarehouseId) {
        while let Some(retrieval) = self.storage[origin].retrieve(section) {
            let id = retrieval.package.id;
            self.report_admitted(time, origin, section, retrieval.admitted);
            let package = &self.packages[usize::from(id)];
            let route = self.routing.route(
                &self.graph,
                origin,
                package.destination(),
                package.weight(),
                time,
            );
            self.notify(Transition::Removed {
                time,
                package: id,
                warehouse: origin,
                section,
            });
            let path = match route {
                Some(path) => path,
                None => {
                    self.give_up(time, id, origin);
                    continue;
                }
            };
            let mut route = path.clone();
            route.advance();
            let next = route.head();
            let package = self.package_mut(id);
            package.set_route_calculated(time);
            let mut previous = package.replace_route(route);
            previous.prepend(origin);
            self.notify(Transition::Rerouted {
                time,
                package: id,
                warehouse: origin,
                previous,
                route: path,
            });
            self.record(|m| {
                m.route_recalculation();
                m.alternative_route();
            });
            match next {
                Some(next) => self.admit(time, id, origin, next),
                None => self.deliver(time, id, origin),
            }
        }
    }

    fn report_admitted(
        &mut self,
        time: Tick,
        warehouse: WarehouseId,
        section: WarehouseId,
        admitted: Vec<PackageId>,
    ) {
        for package in admitted {
            self.package_mut(package).set_state(PackageState::Stored);
            self.notify(Transition::Stored {
                time,
                package,
                warehouse,
                section,
            });
        }
    }

    fn transport_capacity(&self, origin: WarehouseId, section: WarehouseId, time: Tick) -> usize {
        if !self.features.variable_transport_capacity {
            return self.transport.capacity;
        }
        let base = self
            .graph
            .edge(origin, section)
            .map_or(self.transport.capacity, |edge| edge.capacity);
        dynamic_capacity(base, time)
    }

    fn transport_latency(
        &self,
        origin: WarehouseId,
        section: WarehouseId,
        time: Tick,
        package: &Package,
    ) -> Tick {
        let latency = if self.features.variable_transport_time {
            self.graph
                .dynamic_latency(origin, section, time)
                .unwrap_or(self.transport.latency)
        } else {
            self.transport.latency
        };
        self.scaled(latency, package)
    }

    /// Scales handling times by the weight impact factor if package weights are enabled.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn scaled(&self, value: Tick, package: &Package) -> Tick {
        if self.features.variable_package_weight {
            (value as f64 * package.weight_class().impact_factor()) as Tick
        } else {
            value
        }
    }

    fn package_mut(&mut self, id: PackageId) -> &mut Package {
        &mut self.packages[usize::from(id)]
    }

    fn notify(&mut self, transition: Transition) {
        log::debug!("{}", transition);
        for sink in &mut self.sinks {
            sink.notify(&transition);
        }
    }

    fn record<F>(&mut self, f: F)
    where
        F: Fn(&mut dyn MetricsRecorder),
    {
        f(&mut self.metrics);
        for recorder in &mut self.recorders {
            f(recorder.as_mut());
        }
    }
}

/// Edge capacity varying periodically over time, never below 1.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn dynamic_capacity(capacity: usize, time: Tick) -> usize {
    let factor = 1.0 + 0.2 * (0.05 * time as f64).sin();
    ((capacity as f64 * factor) as usize).max(1)
}

fn validate(setup: &Setup) -> Result<()> {
    let size = setup.graph.num_warehouses();
    if size == 0 {
        return Err(Error::Config(String::from("no warehouses")));
    }
    if setup.storage.len() != size {
        return Err(Error::Config(format!(
            "{} warehouses in storage but {} in the graph",
            setup.storage.len(),
            size
        )));
    }
    for (index, warehouse) in setup.storage.iter().enumerate() {
        if usize::from(warehouse.id()) != index || warehouse.num_sections() != size {
            return Err(Error::Config(format!(
                "warehouse at position {} has ID {} and {} sections",
                index,
                warehouse.id(),
                warehouse.num_sections()
            )));
        }
    }
    if setup.transport.capacity == 0 || setup.transport.interval == 0 {
        return Err(Error::Config(String::from(
            "transport capacity and interval must be positive",
        )));
    }
    let check = |warehouse: WarehouseId| {
        if usize::from(warehouse) < size {
            Ok(())
        } else {
            Err(Error::UnknownWarehouse(warehouse))
        }
    };
    for (index, package) in setup.packages.iter().enumerate() {
        if usize::from(package.id()) != index {
            return Err(Error::Config(format!(
                "package at position {} has ID {}",
                index,
                package.id()
            )));
        }
        check(package.origin())?;
        check(package.destination())?;
        package.route().iter().try_for_each(check)?;
        let route: &Route = package.route();
        if !route.is_empty()
            && (route.head() != Some(package.origin())
                || route.destination() != Some(package.destination()))
        {
            return Err(Error::Config(format!(
                "route {} of package {} does not lead from {} to {}",
                route,
                package.id(),
                package.origin(),
                package.destination()
            )));
        }
        let hops: Vec<_> = route.iter().collect();
        if let Some(hop) = hops
            .windows(2)
            .find(|hop| setup.graph.edge(hop[0], hop[1]).is_none())
        {
            return Err(Error::Config(format!(
                "route {} of package {} uses missing edge {}-{}",
                route,
                package.id(),
                hop[0],
                hop[1]
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Edge, TransitionRecorder, WarehouseLimits};
    use rstest::{fixture, rstest};

    fn w(id: usize) -> WarehouseId {
        WarehouseId::from(id)
    }

    fn p(id: usize) -> PackageId {
        PackageId::from(id)
    }

    fn transport() -> TransportParams {
        TransportParams {
            capacity: 1,
            latency: 5,
            interval: 10,
            removal_cost: 1,
        }
    }

    fn triangle() -> Graph {
        let mut graph = Graph::new(3);
        graph.add_edge(w(0), w(1), Edge::new(1, 5)).unwrap();
        graph.add_edge(w(1), w(2), Edge::new(1, 5)).unwrap();
        graph.add_edge(w(0), w(2), Edge::new(1, 5)).unwrap();
        graph
    }

    fn setup(graph: Graph, packages: Vec<Package>) -> Setup {
        let size = graph.num_warehouses();
        Setup {
            transport: transport(),
            features: Features::default(),
            reroute: ReroutePolicy::default(),
            graph,
            storage: Storage::unlimited(size),
            packages,
            max_events: None,
        }
    }

    #[fixture]
    fn line() -> Graph {
        let mut graph = Graph::new(3);
        graph.add_edge(w(0), w(1), Edge::new(1, 5)).unwrap();
        graph.add_edge(w(1), w(2), Edge::new(1, 5)).unwrap();
        graph
    }

    #[rstest]
    fn test_two_hops(line: Graph) {
        let recorder = TransitionRecorder::new();
        let mut scheduler =
            Scheduler::new(setup(line, vec![Package::new(p(0), w(0), w(2), 0)])).unwrap();
        scheduler.add_sink(Box::new(recorder.clone()));
        assert_eq!(scheduler.state(), RunState::Initializing);
        let metrics = scheduler.run().unwrap();
        assert_eq!(scheduler.state(), RunState::Terminated);
        assert_eq!(metrics.delivered, 1);
        assert_eq!(metrics.transports, 2);
        assert_eq!(metrics.last_delivery, Some(26));
        assert_eq!(scheduler.active_packages(), 0);
        assert_eq!(scheduler.pending_events(), 0);
        let package = scheduler.package(p(0)).unwrap();
        assert_eq!(package.state(), PackageState::Delivered);
        assert_eq!(package.location(), w(2));
        assert_eq!(
            recorder.transitions(),
            vec![
                Transition::Stored {
                    time: 0,
                    package: p(0),
                    warehouse: w(0),
                    section: w(1)
                },
                Transition::Removed {
                    time: 11,
                    package: p(0),
                    warehouse: w(0),
                    section: w(1)
                },
                Transition::InTransit {
                    time: 11,
                    package: p(0),
                    origin: w(0),
                    destination: w(1)
                },
                Transition::Stored {
                    time: 16,
                    package: p(0),
                    warehouse: w(1),
                    section: w(2)
                },
                Transition::Removed {
                    time: 21,
                    package: p(0),
                    warehouse: w(1),
                    section: w(2)
                },
                Transition::InTransit {
                    time: 21,
                    package: p(0),
                    origin: w(1),
                    destination: w(2)
                },
                Transition::Delivered {
                    time: 26,
                    package: p(0),
                    warehouse: w(2)
                },
            ]
        );
    }

    #[test]
    fn test_posted_at_destination() {
        let mut scheduler =
            Scheduler::new(setup(triangle(), vec![Package::new(p(0), w(1), w(1), 7)])).unwrap();
        let metrics = scheduler.run().unwrap();
        assert_eq!(metrics.delivered, 1);
        assert_eq!(metrics.transports, 0);
        assert_eq!(metrics.last_delivery, Some(7));
        assert_eq!(metrics.total_delivery_time, 0);
    }

    #[test]
    fn test_restored_packages_keep_order() {
        // Capacity 1: three packages stored at 0 leave one by one, the oldest first.
        let packages = (0..3).map(|id| Package::new(p(id), w(0), w(1), 0)).collect();
        let recorder = TransitionRecorder::new();
        let mut scheduler = Scheduler::new(setup(triangle(), packages)).unwrap();
        scheduler.add_sink(Box::new(recorder.clone()));
        let metrics = scheduler.run().unwrap();
        assert_eq!(metrics.delivered, 3);
        assert_eq!(metrics.rearrangements, 3);
        let delivered: Vec<_> = recorder
            .transitions()
            .into_iter()
            .filter_map(|t| match t {
                Transition::Delivered { time, package, .. } => Some((time, package)),
                _ => None,
            })
            .collect();
        assert_eq!(delivered, vec![(18, p(0)), (27, p(1)), (36, p(2))]);
    }

    #[test]
    fn test_unreachable_destination() {
        let mut graph = Graph::new(3);
        graph.add_edge(w(0), w(1), Edge::new(1, 5)).unwrap();
        let packages = vec![
            Package::new(p(0), w(0), w(2), 3),
            Package::new(p(1), w(0), w(1), 0),
        ];
        let recorder = TransitionRecorder::new();
        let mut scheduler = Scheduler::new(setup(graph, packages)).unwrap();
        scheduler.add_sink(Box::new(recorder.clone()));
        assert_eq!(scheduler.active_packages(), 1);
        let metrics = scheduler.run().unwrap();
        assert_eq!(metrics.undeliverable, 1);
        assert_eq!(metrics.delivered, 1);
        assert_eq!(
            recorder.for_package(p(0)),
            vec![Transition::Undeliverable {
                time: 3,
                package: p(0),
                warehouse: w(0)
            }]
        );
    }

    #[test]
    fn test_oversized_package() {
        let mut setup = setup(
            triangle(),
            vec![Package::new(p(0), w(0), w(1), 0).with_weight(10)],
        );
        setup.storage = Storage::limited(
            3,
            WarehouseLimits {
                capacity: 6,
                weight_capacity: 100,
            },
        );
        let mut scheduler = Scheduler::new(setup).unwrap();
        let metrics = scheduler.run().unwrap();
        assert_eq!(metrics.undeliverable, 1);
        assert_eq!(
            scheduler.package(p(0)).unwrap().state(),
            PackageState::Undeliverable
        );
    }

    #[rstest]
    fn test_waiting_queue(line: Graph) {
        let packages = (0..2).map(|id| Package::new(p(id), w(0), w(1), 0)).collect();
        let mut setup = setup(line, packages);
        setup.storage = Storage::limited(
            3,
            WarehouseLimits {
                capacity: 3,
                weight_capacity: 100,
            },
        );
        let recorder = TransitionRecorder::new();
        let mut scheduler = Scheduler::new(setup).unwrap();
        scheduler.add_sink(Box::new(recorder.clone()));
        scheduler.run_until(0).unwrap();
        assert_eq!(
            scheduler.package(p(1)).unwrap().state(),
            PackageState::Waiting
        );
        assert_eq!(scheduler.storage()[w(0)].waiting_len(w(1)), 1);
        let metrics = scheduler.run().unwrap();
        assert_eq!(metrics.delivered, 2);
        assert_eq!(metrics.capacity_overflows, 1);
        assert_eq!(metrics.waiting, 1);
        assert_eq!(
            recorder.for_package(p(1))[..2],
            [
                Transition::Waiting {
                    time: 0,
                    package: p(1),
                    warehouse: w(0),
                    section: w(1)
                },
                Transition::Stored {
                    time: 11,
                    package: p(1),
                    warehouse: w(0),
                    section: w(1)
                }
            ]
        );
    }

    #[test]
    fn test_deactivated_edge() {
        let recorder = TransitionRecorder::new();
        let mut scheduler =
            Scheduler::new(setup(triangle(), vec![Package::new(p(0), w(0), w(2), 0)])).unwrap();
        scheduler.add_sink(Box::new(recorder.clone()));
        scheduler.run_until(5).unwrap();
        scheduler.set_edge_active(w(0), w(2), false).unwrap();
        let metrics = scheduler.run().unwrap();
        assert_eq!(metrics.delivered, 1);
        assert_eq!(metrics.alternative_routes, 1);
        let package = scheduler.package(p(0)).unwrap();
        assert_eq!(package.route_changes(), 1);
        assert!(recorder.for_package(p(0)).contains(&Transition::Rerouted {
            time: 10,
            package: p(0),
            warehouse: w(0),
            previous: Route::from(vec![0, 2]),
            route: Route::from(vec![0, 1, 2]),
        }));
    }

    #[test]
    fn test_bounded_queue_overflow() {
        let mut setup = setup(triangle(), vec![Package::new(p(0), w(0), w(2), 0)]);
        setup.max_events = Some(2);
        let mut scheduler = Scheduler::new(setup).unwrap();
        assert!(matches!(
            scheduler.run(),
            Err(Error::Engine(simcore::Error::CapacityExceeded { .. }))
        ));
    }

    #[test]
    fn test_invalid_setup() {
        let packages = vec![Package::new(p(1), w(0), w(1), 0)];
        assert!(matches!(
            Scheduler::new(setup(triangle(), packages)),
            Err(Error::Config(_))
        ));
        let packages = vec![Package::new(p(0), w(0), w(5), 0)];
        assert!(matches!(
            Scheduler::new(setup(triangle(), packages)),
            Err(Error::UnknownWarehouse(_))
        ));
        let packages =
            vec![Package::new(p(0), w(0), w(2), 0).with_route(Route::from(vec![1, 2]))];
        assert!(matches!(
            Scheduler::new(setup(triangle(), packages)),
            Err(Error::Config(_))
        ));
    }

    #[rstest]
    fn test_route_without_edge_rejected(line: Graph) {
        let packages =
            vec![Package::new(p(0), w(0), w(2), 0).with_route(Route::from(vec![0, 2]))];
        assert!(matches!(
            Scheduler::new(setup(line.clone(), packages)),
            Err(Error::Config(_))
        ));
        let packages =
            vec![Package::new(p(0), w(0), w(2), 0).with_route(Route::from(vec![0, 1, 2]))];
        let mut scheduler = Scheduler::new(setup(line, packages)).unwrap();
        scheduler.run().unwrap();
        assert_eq!(scheduler.active_packages(), 0);
    }

    #[rstest(time, expected, case(0, 100), case(10, 109), case(94, 80))]
    fn test_dynamic_capacity(time: Tick, expected: usize) {
        assert_eq!(dynamic_capacity(100, time), expected);
    }

    #[test]
    fn test_dynamic_capacity_never_zero() {
        assert_eq!(dynamic_capacity(0, 0), 1);
        assert_eq!(dynamic_capacity(1, 94), 1);
    }
}
