//! Simulation configuration: JSON format, the plain-text input formats, and validation.

use std::io::{BufRead, Read};
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    Edge, Error, Graph, Package, PackageId, Result, Storage, Tick, WarehouseId, WarehouseLimits,
};

/// Transport parameters shared by all edges unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportParams {
    /// Maximum number of packages shipped in one departure.
    pub capacity: usize,
    /// Time it takes to travel along an edge.
    pub latency: Tick,
    /// Time between two consecutive departures along the same edge.
    pub interval: Tick,
    /// Time it takes to take one package out of a section.
    pub removal_cost: Tick,
}

/// Optional simulation features.
///
/// In JSON, features can be given either as an object with boolean fields, or as a bit mask:
/// `1` variable transport time, `2` variable package weight, `4` variable transport capacity,
/// `8` limited storage capacity, `16` multiple routes, `32` dynamic routing.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FeatureInput")]
pub struct Features {
    /// Edge latencies change periodically over time.
    pub variable_transport_time: bool,
    /// Packages have weights that affect storage, handling, and transport.
    pub variable_package_weight: bool,
    /// Transport capacity is taken from edges and changes periodically over time.
    pub variable_transport_capacity: bool,
    /// Warehouse sections have capacity and weight limits.
    pub limited_storage_capacity: bool,
    /// Routes minimize latency instead of hops.
    pub multiple_routes: bool,
    /// Routes are recalculated on the way.
    pub dynamic_routing: bool,
}

impl Features {
    /// Decodes a bit mask.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self {
            variable_transport_time: bits & 1 != 0,
            variable_package_weight: bits & 2 != 0,
            variable_transport_capacity: bits & 4 != 0,
            limited_storage_capacity: bits & 8 != 0,
            multiple_routes: bits & 16 != 0,
            dynamic_routing: bits & 32 != 0,
        }
    }

    /// Encodes as a bit mask.
    #[must_use]
    pub fn bits(self) -> u32 {
        [
            self.variable_transport_time,
            self.variable_package_weight,
            self.variable_transport_capacity,
            self.limited_storage_capacity,
            self.multiple_routes,
            self.dynamic_routing,
        ]
        .iter()
        .enumerate()
        .filter(|&(_, &enabled)| enabled)
        .map(|(bit, _)| 1_u32 << bit)
        .sum()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureInput {
    Bits(u32),
    Flags(FeatureFlags),
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FeatureFlags {
    variable_transport_time: bool,
    variable_package_weight: bool,
    variable_transport_capacity: bool,
    limited_storage_capacity: bool,
    multiple_routes: bool,
    dynamic_routing: bool,
}

impl From<FeatureInput> for Features {
    fn from(input: FeatureInput) -> Self {
        match input {
            FeatureInput::Bits(bits) => Self::from_bits(bits),
            FeatureInput::Flags(flags) => Self {
                variable_transport_time: flags.variable_transport_time,
                variable_package_weight: flags.variable_package_weight,
                variable_transport_capacity: flags.variable_transport_capacity,
                limited_storage_capacity: flags.limited_storage_capacity,
                multiple_routes: flags.multiple_routes,
                dynamic_routing: flags.dynamic_routing,
            },
        }
    }
}

fn default_time_multiplier() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

/// Transport link between two warehouses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// One end.
    pub from: WarehouseId,
    /// The other end.
    pub to: WarehouseId,
    /// Capacity; defaults to the transport capacity.
    #[serde(default)]
    pub capacity: Option<usize>,
    /// Base latency; defaults to the transport latency.
    #[serde(default)]
    pub latency: Option<Tick>,
    /// Static latency multiplier.
    #[serde(default = "default_time_multiplier")]
    pub time_multiplier: f64,
    /// Whether the edge is initially active.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl EdgeConfig {
    /// Constructs an active edge with default attributes.
    #[must_use]
    pub fn new(from: WarehouseId, to: WarehouseId) -> Self {
        Self {
            from,
            to,
            capacity: None,
            latency: None,
            time_multiplier: 1.0,
            active: true,
        }
    }
}

/// Package to be posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Package ID; defaults to the position in the list. IDs must be `0..n` in any order.
    #[serde(default)]
    pub id: Option<PackageId>,
    /// Warehouse where the package is posted.
    pub origin: WarehouseId,
    /// Warehouse where the package is delivered.
    pub destination: WarehouseId,
    /// Time of posting.
    pub post_time: Tick,
    /// Weight; sampled from `1..=10` if missing and weights are enabled, otherwise 1.
    #[serde(default)]
    pub weight: Option<u32>,
    /// Special handling flag; sampled with probability 0.1 if missing.
    #[serde(default)]
    pub special_handling: Option<bool>,
    /// Initial route; computed at the start of the simulation if missing.
    #[serde(default)]
    pub route: Option<Vec<WarehouseId>>,
}

impl PackageConfig {
    /// Constructs a package with all optional attributes missing.
    #[must_use]
    pub fn new(origin: WarehouseId, destination: WarehouseId, post_time: Tick) -> Self {
        Self {
            id: None,
            origin,
            destination,
            post_time,
            weight: None,
            special_handling: None,
            route: None,
        }
    }
}

/// Assignment of a secondary storage warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryStorage {
    /// Warehouse whose overflow is handled.
    pub warehouse: WarehouseId,
    /// Warehouse taking over the overflow.
    pub secondary: WarehouseId,
}

/// Storage limits of every warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Total storage units of a warehouse, split evenly between its sections.
    pub capacity: u32,
    /// Total weight of a warehouse, split evenly between its sections.
    pub weight_capacity: u32,
    /// Secondary storage assignments.
    pub secondary: Vec<SecondaryStorage>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let limits = WarehouseLimits::default();
        Self {
            capacity: limits.capacity,
            weight_capacity: limits.weight_capacity,
            secondary: Vec::new(),
        }
    }
}

/// When packages recalculate their routes, if dynamic routing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReroutePolicy {
    /// Recalculate if more than this much time passed since the last calculation.
    pub interval: Tick,
    /// Recalculate at every warehouse once the route changed more than this many times.
    pub max_route_changes: usize,
}

impl Default for ReroutePolicy {
    fn default() -> Self {
        Self {
            interval: 100,
            max_route_changes: 3,
        }
    }
}

/// Complete description of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Transport parameters.
    pub transport: TransportParams,
    /// Number of warehouses.
    pub warehouses: usize,
    /// Transport links.
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,
    /// Packages to deliver.
    pub packages: Vec<PackageConfig>,
    /// Enabled features.
    #[serde(default)]
    pub features: Features,
    /// Storage limits, used only if limited storage is enabled.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Route recalculation policy, used only if dynamic routing is enabled.
    #[serde(default)]
    pub reroute: ReroutePolicy,
    /// Maximum number of pending events; unbounded if missing.
    #[serde(default)]
    pub max_events: Option<usize>,
    /// Seed for sampling missing package attributes.
    #[serde(default)]
    pub seed: u64,
}

/// Validated simulation input, ready to be passed to the [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone)]
pub struct Setup {
    /// Transport parameters.
    pub transport: TransportParams,
    /// Enabled features.
    pub features: Features,
    /// Route recalculation policy.
    pub reroute: ReroutePolicy,
    /// Warehouse network.
    pub graph: Graph,
    /// Warehouses.
    pub storage: Storage,
    /// Packages; the package at position `i` has ID `i`.
    pub packages: Vec<Package>,
    /// Maximum number of pending events.
    pub max_events: Option<usize>,
}

impl SimulationConfig {
    /// Constructs a configuration with default features and no edges or packages.
    #[must_use]
    pub fn new(transport: TransportParams, warehouses: usize) -> Self {
        Self {
            transport,
            warehouses,
            edges: Vec::new(),
            packages: Vec::new(),
            features: Features::default(),
            storage: StorageConfig::default(),
            reroute: ReroutePolicy::default(),
            max_events: None,
            seed: 0,
        }
    }

    /// Parses a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the input is not a valid configuration.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parses the basic plain-text format:
    ///
    /// ```text
    /// capacity latency interval removal_cost
    /// num_warehouses
    /// <num_warehouses x num_warehouses adjacency matrix of 0s and 1s>
    /// num_packages
    /// <post_time> pac <id> org <origin> dst <destination>
    /// ...
    /// ```
    ///
    /// Tokens may be separated by any whitespace. Only the upper triangle of the matrix is read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] on malformed input, or [`Error::Io`] if reading fails.
    pub fn from_legacy<R: BufRead>(reader: R) -> Result<Self> {
        let lines = read_lines(reader)?;
        let mut tokens = Tokens::new(&lines);
        let transport = TransportParams {
            capacity: tokens.next("transport capacity")?,
            latency: tokens.next("transport latency")?,
            interval: tokens.next("transport interval")?,
            removal_cost: tokens.next("removal cost")?,
        };
        let warehouses: usize = tokens.next("number of warehouses")?;
        let mut config = Self::new(transport, warehouses);
        for from in 0..warehouses {
            for to in 0..warehouses {
                let connection: u8 = tokens.next("adjacency matrix entry")?;
                if connection == 1 && from < to {
                    config
                        .edges
                        .push(EdgeConfig::new(WarehouseId(from), WarehouseId(to)));
                }
            }
        }
        let num_packages: usize = tokens.next("number of packages")?;
        for _ in 0..num_packages {
            let post_time = tokens.next("post time")?;
            tokens.skip("`pac`")?;
            let id = tokens.next("package ID")?;
            tokens.skip("`org`")?;
            let origin = tokens.next("origin")?;
            tokens.skip("`dst`")?;
            let destination = tokens.next("destination")?;
            let mut package =
                PackageConfig::new(WarehouseId(origin), WarehouseId(destination), post_time);
            package.id = Some(PackageId(id));
            config.packages.push(package);
        }
        Ok(config)
    }

    /// Parses the extended plain-text format:
    ///
    /// ```text
    /// capacity latency interval removal_cost
    /// feature_bits
    /// num_warehouses
    /// <from> <to> <capacity> [<latency> <time_multiplier>]
    /// ...
    /// <empty line>
    /// num_packages
    /// <id> <origin> <destination> <post_time>
    /// ...
    /// ```
    ///
    /// Edge latency and multiplier are read only if variable transport time is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] on malformed input, or [`Error::Io`] if reading fails.
    pub fn from_legacy_extended<R: BufRead>(reader: R) -> Result<Self> {
        let lines = read_lines(reader)?;
        let mut lines = LineCursor::new(&lines);

        let (line, params) = lines.next("transport parameters")?;
        let mut tokens = Tokens::at(line, params);
        let transport = TransportParams {
            capacity: tokens.next("transport capacity")?,
            latency: tokens.next("transport latency")?,
            interval: tokens.next("transport interval")?,
            removal_cost: tokens.next("removal cost")?,
        };
        let (line, bits) = lines.next("feature bits")?;
        let features = Features::from_bits(Tokens::at(line, bits).next("feature bits")?);
        let (line, count) = lines.next("number of warehouses")?;
        let warehouses = Tokens::at(line, count).next("number of warehouses")?;

        let mut config = Self::new(transport, warehouses);
        config.features = features;
        loop {
            let (line, text) = lines.next("number of packages")?;
            if text.trim().is_empty() {
                break;
            }
            let mut tokens = Tokens::at(line, text);
            let mut edge = EdgeConfig::new(
                WarehouseId(tokens.next("edge origin")?),
                WarehouseId(tokens.next("edge destination")?),
            );
            edge.capacity = Some(tokens.next("edge capacity")?);
            if features.variable_transport_time {
                edge.latency = Some(tokens.next("edge latency")?);
                edge.time_multiplier = tokens.next("time multiplier")?;
            }
            config.edges.push(edge);
        }

        let (line, count) = lines.next("number of packages")?;
        let num_packages: usize = Tokens::at(line, count).next("number of packages")?;
        for _ in 0..num_packages {
            let (line, text) = lines.next("package")?;
            let mut tokens = Tokens::at(line, text);
            let id = tokens.next("package ID")?;
            let origin = tokens.next("origin")?;
            let destination = tokens.next("destination")?;
            let post_time = tokens.next("post time")?;
            let mut package =
                PackageConfig::new(WarehouseId(origin), WarehouseId(destination), post_time);
            package.id = Some(PackageId(id));
            config.packages.push(package);
        }
        Ok(config)
    }

    /// Checks the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.warehouses == 0 {
            return Err(Error::Config(String::from("no warehouses")));
        }
        if self.transport.capacity == 0 {
            return Err(Error::Config(String::from(
                "transport capacity must be positive",
            )));
        }
        if self.transport.interval == 0 {
            return Err(Error::Config(String::from(
                "transport interval must be positive",
            )));
        }
        let check_warehouse = |id: WarehouseId, context: &str| {
            if usize::from(id) < self.warehouses {
                Ok(())
            } else {
                Err(Error::Config(format!(
                    "{} refers to unknown warehouse {}",
                    context, id
                )))
            }
        };
        for edge in &self.edges {
            check_warehouse(edge.from, "edge")?;
            check_warehouse(edge.to, "edge")?;
            if edge.from == edge.to {
                return Err(Error::Config(format!(
                    "self-loop at warehouse {}",
                    edge.from
                )));
            }
            if edge.capacity == Some(0) {
                return Err(Error::Config(format!(
                    "edge {}-{} has no capacity",
                    edge.from, edge.to
                )));
            }
        }
        for secondary in &self.storage.secondary {
            check_warehouse(secondary.warehouse, "secondary storage")?;
            check_warehouse(secondary.secondary, "secondary storage")?;
        }
        let mut seen = vec![false; self.packages.len()];
        for (position, package) in self.packages.iter().enumerate() {
            let id = package.id.unwrap_or(PackageId(position));
            let context = format!("package {}", id);
            check_warehouse(package.origin, &context)?;
            check_warehouse(package.destination, &context)?;
            match seen.get_mut(usize::from(id)) {
                Some(seen) if !*seen => *seen = true,
                Some(_) => return Err(Error::Config(format!("duplicate {}", context))),
                None => {
                    return Err(Error::Config(format!(
                        "{} out of range; IDs must be consecutive starting from 0",
                        context
                    )))
                }
            }
            if let Some(route) = &package.route {
                for &hop in route {
                    check_warehouse(hop, &context)?;
                }
                if route.first() != Some(&package.origin)
                    || route.last() != Some(&package.destination)
                {
                    return Err(Error::Config(format!(
                        "route of {} must lead from its origin to its destination",
                        context
                    )));
                }
                if let Some(hop) = route.windows(2).find(|hop| !self.connects(hop[0], hop[1])) {
                    return Err(Error::Config(format!(
                        "route of {} uses missing edge {}-{}",
                        context, hop[0], hop[1]
                    )));
                }
            }
        }
        Ok(())
    }

    fn connects(&self, a: WarehouseId, b: WarehouseId) -> bool {
        self.edges
            .iter()
            .any(|edge| (edge.from, edge.to) == (a, b) || (edge.from, edge.to) == (b, a))
    }

    /// Validates the configuration and builds the simulation input.
    ///
    /// Missing package weights and special handling flags are sampled from a generator seeded
    /// with [`seed`](Self::seed), so the result is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn into_setup(self) -> Result<Setup> {
        self.validate()?;
        let features = self.features;
        let mut graph = Graph::new(self.warehouses).time_varying(features.variable_transport_time);
        for edge in &self.edges {
            let mut attributes = Edge::new(
                edge.capacity.unwrap_or(self.transport.capacity),
                edge.latency.unwrap_or(self.transport.latency),
            )
            .with_time_multiplier(edge.time_multiplier);
            attributes.active = edge.active;
            graph.add_edge(edge.from, edge.to, attributes)?;
        }

        let mut storage = if features.limited_storage_capacity {
            Storage::limited(
                self.warehouses,
                WarehouseLimits {
                    capacity: self.storage.capacity,
                    weight_capacity: self.storage.weight_capacity,
                },
            )
        } else {
            Storage::unlimited(self.warehouses)
        };
        for secondary in &self.storage.secondary {
            storage[secondary.warehouse].set_secondary_storage(Some(secondary.secondary));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut packages: Vec<Package> = self
            .packages
            .into_iter()
            .enumerate()
            .map(|(position, config)| {
                let weight = config.weight.unwrap_or_else(|| {
                    if features.variable_package_weight {
                        rng.gen_range(1..=10)
                    } else {
                        1
                    }
                });
                let special_handling = config
                    .special_handling
                    .unwrap_or_else(|| rng.gen_bool(0.1));
                let mut package = Package::new(
                    config.id.unwrap_or(PackageId(position)),
                    config.origin,
                    config.destination,
                    config.post_time,
                )
                .with_weight(weight)
                .with_special_handling(special_handling);
                if let Some(route) = config.route {
                    package = package.with_route(route.into_iter().collect());
                }
                package
            })
            .collect();
        packages.sort_by_key(Package::id);

        Ok(Setup {
            transport: self.transport,
            features,
            reroute: self.reroute,
            graph,
            storage,
            packages,
            max_events: self.max_events,
        })
    }
}

fn read_lines<R: BufRead>(reader: R) -> Result<Vec<String>> {
    Ok(reader.lines().collect::<std::io::Result<Vec<_>>>()?)
}

/// Lines numbered from 1.
struct LineCursor<'a> {
    lines: &'a [String],
    position: usize,
}

impl<'a> LineCursor<'a> {
    fn new(lines: &'a [String]) -> Self {
        Self { lines, position: 0 }
    }

    fn next(&mut self, what: &str) -> Result<(usize, &'a str)> {
        let line = self.lines.get(self.position).ok_or_else(|| Error::Parse {
            line: self.position + 1,
            message: format!("missing {}", what),
        })?;
        self.position += 1;
        Ok((self.position, line.as_str()))
    }
}

/// Whitespace-separated tokens that remember the line they come from.
struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    line: usize,
}

impl<'a> Tokens<'a> {
    fn new(lines: &'a [String]) -> Self {
        Self {
            inner: Box::new(lines.iter().enumerate().flat_map(|(number, line)| {
                line.split_whitespace().map(move |token| (number + 1, token))
            })),
            line: 1,
        }
    }

    fn at(line: usize, text: &'a str) -> Self {
        Self {
            inner: Box::new(text.split_whitespace().map(move |token| (line, token))),
            line,
        }
    }

    fn token(&mut self, what: &str) -> Result<&'a str> {
        let (line, token) = self.inner.next().ok_or_else(|| Error::Parse {
            line: self.line,
            message: format!("missing {}", what),
        })?;
        self.line = line;
        Ok(token)
    }

    fn skip(&mut self, what: &str) -> Result<()> {
        self.token(what).map(|_| ())
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.token(what)?;
        token.parse().map_err(|_| Error::Parse {
            line: self.line,
            message: format!("invalid {}: `{}`", what, token),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Route;
    use rstest::rstest;

    const LEGACY: &str = "1 5 10 1
3
0 1 1
1 0 1
1 1 0
2
0 pac 1 org 0 dst 2
5 pac 0 org 2 dst 1
";

    const EXTENDED: &str = "2 5 10 1
9
3
0 1 4 6 1.5
1 2 3 5 1.0

2
0 0 2 0
1 2 0 7
";

    fn w(id: usize) -> WarehouseId {
        WarehouseId(id)
    }

    #[test]
    fn test_legacy_format() {
        let config = SimulationConfig::from_legacy(LEGACY.as_bytes()).unwrap();
        assert_eq!(
            config.transport,
            TransportParams {
                capacity: 1,
                latency: 5,
                interval: 10,
                removal_cost: 1
            }
        );
        assert_eq!(config.warehouses, 3);
        assert_eq!(
            config
                .edges
                .iter()
                .map(|edge| (usize::from(edge.from), usize::from(edge.to)))
                .collect::<Vec<_>>(),
            vec![(0, 1), (0, 2), (1, 2)]
        );
        assert_eq!(config.packages.len(), 2);
        assert_eq!(config.packages[1].id, Some(PackageId(0)));
        assert_eq!(config.packages[1].origin, w(2));
        assert_eq!(config.packages[1].post_time, 5);

        let setup = config.into_setup().unwrap();
        assert_eq!(setup.packages[0].id(), PackageId(0));
        assert_eq!(setup.packages[0].origin(), w(2));
        assert_eq!(setup.packages[1].destination(), w(2));
        assert!(setup.graph.has_edge(w(2), w(0)));
        assert_eq!(setup.graph.edge(w(0), w(1)).unwrap().base_latency, 5);
        assert_eq!(setup.packages[0].weight(), 1);
    }

    #[rstest(
        input,
        line,
        case("1 5 10", 1),
        case("1 5 10 1\n2\n0 1\n1 x\n", 4),
        case("1 5 10 1\n1\n0\n1\n0 pac 0 org 0", 5)
    )]
    fn test_legacy_errors(input: &str, line: usize) {
        match SimulationConfig::from_legacy(input.as_bytes()) {
            Err(Error::Parse { line: actual, .. }) => assert_eq!(actual, line),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_extended_format() {
        let config = SimulationConfig::from_legacy_extended(EXTENDED.as_bytes()).unwrap();
        assert_eq!(config.features.bits(), 9);
        assert!(config.features.variable_transport_time);
        assert!(config.features.limited_storage_capacity);
        assert_eq!(config.edges.len(), 2);
        assert_eq!(config.edges[0].latency, Some(6));
        assert!((config.edges[0].time_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.edges[1].capacity, Some(3));
        assert_eq!(config.packages[1].post_time, 7);
        assert_eq!(config.packages[1].destination, w(0));
    }

    #[test]
    fn test_extended_format_without_variable_time() {
        let input = "2 5 10 1\n0\n2\n0 1 4\n\n1\n0 0 1 3\n";
        let config = SimulationConfig::from_legacy_extended(input.as_bytes()).unwrap();
        assert_eq!(config.edges[0].latency, None);
        assert_eq!(config.edges[0].capacity, Some(4));
        let setup = config.into_setup().unwrap();
        assert_eq!(setup.graph.edge(w(0), w(1)).unwrap().base_latency, 5);
    }

    #[test]
    fn test_json_format() {
        let json = r#"{
            "transport": {"capacity": 2, "latency": 5, "interval": 10, "removal_cost": 1},
            "warehouses": 3,
            "edges": [{"from": 0, "to": 1}, {"from": 1, "to": 2, "capacity": 4, "latency": 7}],
            "packages": [
                {"origin": 0, "destination": 2, "post_time": 0, "weight": 4},
                {"origin": 2, "destination": 0, "post_time": 3, "route": [2, 1, 0]}
            ],
            "features": 10,
            "storage": {"capacity": 30, "secondary": [{"warehouse": 0, "secondary": 1}]},
            "seed": 7
        }"#;
        let config = SimulationConfig::from_json(json.as_bytes()).unwrap();
        assert_eq!(config.features, Features::from_bits(10));
        assert_eq!(config.storage.weight_capacity, 5000);
        assert_eq!(config.reroute, ReroutePolicy::default());
        let setup = config.into_setup().unwrap();
        assert_eq!(setup.graph.edge(w(1), w(2)).unwrap().capacity, 4);
        assert_eq!(setup.graph.edge(w(1), w(2)).unwrap().base_latency, 7);
        assert_eq!(setup.graph.edge(w(0), w(1)).unwrap().capacity, 2);
        assert_eq!(setup.packages[0].weight(), 4);
        assert!(
            (1..=10).contains(&setup.packages[1].weight()),
            "sampled weight out of range"
        );
        assert_eq!(setup.packages[1].route(), &Route::from(vec![2, 1, 0]));
        assert_eq!(setup.storage[w(0)].secondary_storage(), Some(w(1)));
        assert_eq!(setup.storage[w(0)].available_capacity(w(1)), Some(10));
    }

    #[test]
    fn test_features_as_flags() {
        let features: Features =
            serde_json::from_str(r#"{"multiple_routes": true, "dynamic_routing": true}"#)
                .unwrap();
        assert_eq!(features.bits(), 48);
        assert_eq!(Features::from_bits(63).bits(), 63);
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let mut config = SimulationConfig::new(
            TransportParams {
                capacity: 1,
                latency: 1,
                interval: 1,
                removal_cost: 1,
            },
            2,
        );
        config.features.variable_package_weight = true;
        config.packages = (0..50)
            .map(|time| PackageConfig::new(w(0), w(1), time))
            .collect();
        let sample = |config: SimulationConfig| {
            config
                .into_setup()
                .unwrap()
                .packages
                .iter()
                .map(|package| (package.weight(), package.special_handling()))
                .collect::<Vec<_>>()
        };
        let first = sample(config.clone());
        assert_eq!(first, sample(config.clone()));
        assert!(first.iter().all(|(weight, _)| (1..=10).contains(weight)));
        config.seed = 1;
        assert_ne!(first, sample(config));
    }

    fn base_config() -> SimulationConfig {
        let mut config = SimulationConfig::new(
            TransportParams {
                capacity: 1,
                latency: 5,
                interval: 10,
                removal_cost: 1,
            },
            3,
        );
        config.edges.push(EdgeConfig::new(w(0), w(1)));
        config.packages.push(PackageConfig::new(w(0), w(1), 0));
        config
    }

    #[rstest(
        modify,
        case(|c: &mut SimulationConfig| c.warehouses = 0),
        case(|c: &mut SimulationConfig| c.transport.capacity = 0),
        case(|c: &mut SimulationConfig| c.transport.interval = 0),
        case(|c: &mut SimulationConfig| c.edges.push(EdgeConfig::new(WarehouseId(1), WarehouseId(1)))),
        case(|c: &mut SimulationConfig| c.edges.push(EdgeConfig::new(WarehouseId(1), WarehouseId(3)))),
        case(|c: &mut SimulationConfig| c.packages[0].destination = WarehouseId(5)),
        case(|c: &mut SimulationConfig| c.packages[0].id = Some(PackageId(1))),
        case(|c: &mut SimulationConfig| {
            let mut duplicate = c.packages[0].clone();
            duplicate.id = Some(PackageId(0));
            c.packages.push(duplicate);
        }),
        case(|c: &mut SimulationConfig| c.packages[0].route = Some(vec![WarehouseId(1)])),
        case(|c: &mut SimulationConfig| {
            c.packages[0].destination = WarehouseId(2);
            c.packages[0].route = Some(vec![WarehouseId(0), WarehouseId(2)]);
        }),
        case(|c: &mut SimulationConfig| c.storage.secondary.push(SecondaryStorage {
            warehouse: WarehouseId(0),
            secondary: WarehouseId(3),
        }))
    )]
    fn test_invalid_config(modify: fn(&mut SimulationConfig)) {
        let mut config = base_config();
        assert!(config.validate().is_ok());
        modify(&mut config);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(matches!(config.into_setup(), Err(Error::Config(_))));
    }
}
