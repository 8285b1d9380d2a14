use serde::Serialize;

use crate::Tick;

/// Receives notifications about notable occurrences during a simulation.
///
/// All methods do nothing by default, so implementors only pick what they need.
pub trait MetricsRecorder {
    /// An event has been processed at `time`.
    fn event(&mut self, _time: Tick) {}
    /// A package has been put back into its section after a departure.
    fn rearrangement(&mut self) {}
    /// A package has left a warehouse.
    fn transport(&mut self) {}
    /// A package has been delivered at `time`, `lead_time` after being posted.
    fn delivery(&mut self, _time: Tick, _lead_time: Tick) {}
    /// A package has been found undeliverable.
    fn undeliverable(&mut self) {}
    /// A route has been recalculated.
    fn route_recalculation(&mut self) {}
    /// A package did not fit in its section.
    fn capacity_overflow(&mut self) {}
    /// A package has been given a different route.
    fn alternative_route(&mut self) {}
    /// A package has been moved to secondary storage.
    fn secondary_transfer(&mut self) {}
    /// A package has been put in a waiting queue.
    fn waiting(&mut self) {}
    /// A warehouse has reached the given occupancy.
    fn occupancy(&mut self, _occupancy: u32) {}
}

/// Summary of a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationMetrics {
    /// Number of packages in the simulation.
    pub total_packages: usize,
    /// Number of processed events.
    pub processed_events: usize,
    /// Number of packages put back into sections after departures.
    pub rearrangements: usize,
    /// Number of packages shipped, counting each hop.
    pub transports: usize,
    /// Number of delivered packages.
    pub delivered: usize,
    /// Number of undeliverable packages.
    pub undeliverable: usize,
    /// Number of route recalculations.
    pub route_recalculations: usize,
    /// Number of times a package did not fit in its section.
    pub capacity_overflows: usize,
    /// Number of times a package has been given a different route.
    pub alternative_routes: usize,
    /// Number of transfers to secondary storage.
    pub secondary_transfers: usize,
    /// Number of times a package was put in a waiting queue.
    pub waiting: usize,
    /// Highest occupancy of a single warehouse.
    pub max_occupancy: u32,
    /// Sum of times between posting and delivery.
    pub total_delivery_time: Tick,
    /// Time of the last delivery.
    pub last_delivery: Option<Tick>,
    /// Time of the last processed event.
    pub end_time: Tick,
}

impl SimulationMetrics {
    /// Average time from posting to delivery.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_delivery_time(&self) -> Option<f64> {
        if self.delivered == 0 {
            None
        } else {
            Some(self.total_delivery_time as f64 / self.delivered as f64)
        }
    }

    /// Delivered packages per tick of simulated time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        if self.end_time == 0 {
            0.0
        } else {
            self.delivered as f64 / self.end_time as f64
        }
    }
}

impl MetricsRecorder for SimulationMetrics {
    fn event(&mut self, time: Tick) {
        self.processed_events += 1;
        self.end_time = time;
    }
    fn rearrangement(&mut self) {
        self.rearrangements += 1;
    }
    fn transport(&mut self) {
        self.transports += 1;
    }
    fn delivery(&mut self, time: Tick, lead_time: Tick) {
        self.delivered += 1;
        self.total_delivery_time += lead_time;
        self.last_delivery = Some(time);
    }
    fn undeliverable(&mut self) {
        self.undeliverable += 1;
    }
    fn route_recalculation(&mut self) {
        self.route_recalculations += 1;
    }
    fn capacity_overflow(&mut self) {
        self.capacity_overflows += 1;
    }
    fn alternative_route(&mut self) {
        self.alternative_routes += 1;
    }
    fn secondary_transfer(&mut self) {
        self.secondary_transfers += 1;
    }
    fn waiting(&mut self) {
        self.waiting += 1;
    }
    fn occupancy(&mut self, occupancy: u32) {
        self.max_occupancy = self.max_occupancy.max(occupancy);
    }
}

impl std::fmt::Display for SimulationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Delivered {}/{} packages ({} undeliverable) by {}",
            self.delivered, self.total_packages, self.undeliverable, self.end_time
        )?;
        match self.average_delivery_time() {
            Some(average) => writeln!(f, "Average delivery time: {:.2}", average)?,
            None => writeln!(f, "Average delivery time: n/a")?,
        }
        writeln!(f, "Throughput: {:.4} packages per tick", self.throughput())?;
        writeln!(
            f,
            "Transports: {}, rearrangements: {}, events: {}",
            self.transports, self.rearrangements, self.processed_events
        )?;
        write!(
            f,
            "Overflows: {}, waiting: {}, secondary transfers: {}, alternative routes: {}, \
             recalculations: {}, max occupancy: {}",
            self.capacity_overflows,
            self.waiting,
            self.secondary_transfers,
            self.alternative_routes,
            self.route_recalculations,
            self.max_occupancy
        )
    }
}
