use parcelsim::*;

fn w(id: usize) -> WarehouseId {
    WarehouseId::from(id)
}

fn p(id: usize) -> PackageId {
    PackageId::from(id)
}

fn run(config: SimulationConfig) -> (Scheduler, SimulationMetrics, TransitionRecorder) {
    let recorder = TransitionRecorder::new();
    let mut scheduler = Scheduler::new(config.into_setup().unwrap()).unwrap();
    scheduler.add_sink(Box::new(recorder.clone()));
    let metrics = scheduler.run().unwrap();
    (scheduler, metrics, recorder)
}

fn lines(transitions: &[Transition]) -> Vec<String> {
    transitions.iter().map(ToString::to_string).collect()
}

#[test]
fn test_three_warehouses_fixed_route() {
    let config = SimulationConfig::from_json(
        r#"{
            "transport": {"capacity": 1, "latency": 5, "interval": 10, "removal_cost": 1},
            "warehouses": 3,
            "edges": [{"from": 0, "to": 1}, {"from": 1, "to": 2}, {"from": 0, "to": 2}],
            "packages": [
                {"origin": 0, "destination": 2, "post_time": 0, "route": [0, 1, 2]}
            ]
        }"#
        .as_bytes(),
    )
    .unwrap();
    let (scheduler, metrics, recorder) = run(config);
    assert_eq!(
        lines(&recorder.transitions()),
        vec![
            "0000000 package 000 stored at 000 in section 001",
            "0000011 package 000 removed from 000 in section 001",
            "0000011 package 000 in transit from 000 to 001",
            "0000016 package 000 stored at 001 in section 002",
            "0000021 package 000 removed from 001 in section 002",
            "0000021 package 000 in transit from 001 to 002",
            "0000026 package 000 delivered at 002",
        ]
    );
    assert_eq!(metrics.delivered, 1);
    assert_eq!(metrics.last_delivery, Some(26));
    assert_eq!(scheduler.state(), RunState::Terminated);
}

#[test]
fn test_legacy_input() {
    let input = "1 5 10 1\n3\n0 1 0\n1 0 1\n0 1 0\n2\n0 pac 0 org 0 dst 2\n5 pac 1 org 2 dst 0\n";
    let setup = SimulationConfig::from_legacy(input.as_bytes())
        .unwrap()
        .into_setup()
        .unwrap();
    let mut scheduler = Scheduler::new(setup).unwrap();

    let metrics = scheduler.run_until(16).unwrap();
    assert_eq!(scheduler.time(), 16);
    assert_eq!(metrics.transports, 2);
    assert_eq!(scheduler.active_packages(), 2);
    assert_eq!(scheduler.state(), RunState::Running);
    assert!(scheduler.pending_events() > 0);

    let metrics = scheduler.run().unwrap();
    assert_eq!(metrics.delivered, 2);
    assert_eq!(metrics.transports, 4);
    assert_eq!(metrics.total_delivery_time, 26 + 21);
    assert_eq!(metrics.last_delivery, Some(26));
    for package in scheduler.packages() {
        assert_eq!(package.state(), PackageState::Delivered);
        assert_eq!(package.location(), package.destination());
    }
}

#[test]
fn test_disconnected_warehouse() {
    let input = "1 5 10 1\n3\n0 1 0\n1 0 0\n0 0 0\n2\n0 pac 0 org 0 dst 2\n0 pac 1 org 1 dst 0\n";
    let config = SimulationConfig::from_legacy(input.as_bytes()).unwrap();
    let (scheduler, metrics, recorder) = run(config);
    assert_eq!(metrics.undeliverable, 1);
    assert_eq!(metrics.delivered, 1);
    assert_eq!(
        scheduler.package(p(0)).map(Package::state),
        Some(PackageState::Undeliverable)
    );
    assert_eq!(
        lines(&recorder.for_package(p(0))),
        vec!["0000000 package 000 undeliverable at 000"]
    );
}

fn limited_config() -> SimulationConfig {
    let mut config = SimulationConfig::new(
        TransportParams {
            capacity: 1,
            latency: 5,
            interval: 10,
            removal_cost: 1,
        },
        3,
    );
    config.edges = vec![
        EdgeConfig::new(w(0), w(1)),
        EdgeConfig::new(w(1), w(2)),
        EdgeConfig::new(w(0), w(2)),
    ];
    for _ in 0..2 {
        let mut package = PackageConfig::new(w(0), w(1), 0);
        package.weight = Some(1);
        package.special_handling = Some(false);
        config.packages.push(package);
    }
    config.features.limited_storage_capacity = true;
    // One storage unit per section.
    config.storage.capacity = 3;
    config
}

#[test]
fn test_overflow_to_secondary_storage() {
    let mut config = limited_config();
    config.storage.secondary.push(SecondaryStorage {
        warehouse: w(0),
        secondary: w(2),
    });
    let (scheduler, metrics, recorder) = run(config);
    assert_eq!(
        lines(&recorder.for_package(p(1))),
        vec![
            "0000000 package 001 moved from 000 to secondary storage 002 for section 001",
            "0000011 package 001 removed from 002 in section 001",
            "0000011 package 001 in transit from 002 to 001",
            "0000016 package 001 delivered at 001",
        ]
    );
    assert_eq!(metrics.capacity_overflows, 1);
    assert_eq!(metrics.secondary_transfers, 1);
    assert_eq!(metrics.delivered, 2);
    assert_eq!(scheduler.storage().max_occupancy(), 0);
}

#[test]
fn test_overflow_detour() {
    let (scheduler, metrics, recorder) = run(limited_config());
    assert_eq!(
        lines(&recorder.for_package(p(1))),
        vec![
            "0000000 package 001 detoured at 000 through 002",
            "0000000 package 001 stored at 000 in section 002",
            "0000011 package 001 removed from 000 in section 002",
            "0000011 package 001 in transit from 000 to 002",
            "0000016 package 001 stored at 002 in section 001",
            "0000021 package 001 removed from 002 in section 001",
            "0000021 package 001 in transit from 002 to 001",
            "0000026 package 001 delivered at 001",
        ]
    );
    assert_eq!(metrics.capacity_overflows, 1);
    assert_eq!(metrics.alternative_routes, 1);
    assert_eq!(metrics.waiting, 0);
    assert_eq!(metrics.max_occupancy, 2);
    let package = scheduler.package(p(1)).unwrap();
    assert_eq!(package.route_changes(), 1);
    assert_eq!(
        package.route_history().next(),
        Some(&Route::from(vec![1]))
    );
}

#[test]
fn test_dynamic_routing() {
    let mut config = SimulationConfig::new(
        TransportParams {
            capacity: 1,
            latency: 5,
            interval: 10,
            removal_cost: 1,
        },
        3,
    );
    let mut edges = vec![
        EdgeConfig::new(w(0), w(1)),
        EdgeConfig::new(w(1), w(2)),
        EdgeConfig::new(w(0), w(2)),
    ];
    edges[0].latency = Some(1);
    edges[1].latency = Some(1);
    edges[2].latency = Some(10);
    config.edges = edges;
    let mut package = PackageConfig::new(w(0), w(2), 0);
    package.special_handling = Some(true);
    package.route = Some(vec![w(0), w(2)]);
    config.packages.push(package);
    config.features = Features::from_bits(16 | 32);

    let (scheduler, metrics, recorder) = run(config);
    assert_eq!(
        recorder.for_package(p(0))[0],
        Transition::Rerouted {
            time: 0,
            package: p(0),
            warehouse: w(0),
            previous: Route::from(vec![0, 2]),
            route: Route::from(vec![0, 1, 2]),
        }
    );
    assert_eq!(metrics.route_recalculations, 2);
    assert_eq!(metrics.alternative_routes, 1);
    assert_eq!(metrics.transports, 2);
    assert_eq!(metrics.last_delivery, Some(26));
    let package = scheduler.package(p(0)).unwrap();
    assert_eq!(package.last_route_calculation(), 16);
    assert_eq!(package.route_changes(), 1);
}

#[test]
fn test_heavy_package_slows_down_handling() {
    let mut config = SimulationConfig::new(
        TransportParams {
            capacity: 1,
            latency: 5,
            interval: 10,
            removal_cost: 2,
        },
        2,
    );
    config.edges.push(EdgeConfig::new(w(0), w(1)));
    let mut package = PackageConfig::new(w(0), w(1), 0);
    package.weight = Some(4);
    config.packages.push(package);
    config.features.variable_package_weight = true;

    let (_, metrics, recorder) = run(config);
    // Heavy packages take 1.5 times longer to remove (3) and to transport (7, truncated).
    assert_eq!(
        lines(&recorder.for_package(p(0)))[1..],
        [
            "0000013 package 000 removed from 000 in section 001",
            "0000013 package 000 in transit from 000 to 001",
            "0000020 package 000 delivered at 001",
        ]
    );
    assert_eq!(metrics.last_delivery, Some(20));
}

#[test]
fn test_bounded_event_queue() {
    let input = r#"{
        "transport": {"capacity": 1, "latency": 5, "interval": 10, "removal_cost": 1},
        "warehouses": 2,
        "edges": [{"from": 0, "to": 1}],
        "packages": [{"origin": 0, "destination": 1, "post_time": 0}],
        "max_events": 2
    }"#;
    let setup = SimulationConfig::from_json(input.as_bytes())
        .unwrap()
        .into_setup()
        .unwrap();
    let mut scheduler = Scheduler::new(setup).unwrap();
    assert!(matches!(
        scheduler.run(),
        Err(Error::Engine(simcore::Error::CapacityExceeded { capacity: 2 }))
    ));
}
