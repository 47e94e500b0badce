/// Integration tests for configuration-driven simulation runs.
use poolsim_core::config::{ConfigError, SimConfig};
use poolsim_core::engine::{SimError, SimulationEngine, Topology};
use poolsim_core::event_log::{MemoryEventLog, NullSink};
use poolsim_core::request::JobCategory;
use poolsim_filters::FilterError;

fn standalone_config() -> SimConfig {
    SimConfig::from_str(
        r#"
[simulation]
name = "integration-test"
seed = 42
cycles = 2000

[generator]
min_duration = 1
max_duration = 100
process_probability = 0.6

[pool]
servers = 4
cooldown = 50
high_threshold = 80
low_threshold = 50
arrival_probability = 0.3
initial_queue_per_server = 100
block = "private-192"
"#,
    )
    .unwrap()
}

fn routed_config() -> SimConfig {
    SimConfig::from_str(
        r#"
[simulation]
name = "routed-test"
seed = 7
cycles = 3000

[router]
arrival_probability = 0.4

[router.stream]
servers = 2
cooldown = 200
block = "private-192"

[router.process]
servers = 3
cooldown = 200
block = "private-10"
"#,
    )
    .unwrap()
}

#[test]
fn test_full_standalone_run() {
    let config = standalone_config();
    let report = poolsim_core::run_simulation(&config, &mut NullSink).unwrap();

    assert_eq!(report.name, "integration-test");
    assert_eq!(report.cycles, 2000);
    let pool = report.pool("pool").unwrap();
    assert_eq!(pool.initial_servers, 4);
    assert!(pool.final_servers >= 1);
    assert!(pool.peak_servers >= pool.final_servers);
    // 400 preloaded items push the queue over 80 per server.
    assert!(pool.scale_ups > 0);
    assert!(pool.processed > 0);
    assert_eq!(pool.admitted, 400 + report.arrivals);
    assert!((pool.throughput - pool.processed as f64 / 2000.0).abs() < 1e-12);
    let (min, max) = (pool.min_duration.unwrap(), pool.max_duration.unwrap());
    assert!(1 <= min && min <= max && max <= 100);
}

#[test]
fn test_accounting_balances() {
    let config = standalone_config();
    let mut engine = SimulationEngine::new(&config).unwrap();
    let report = engine.run(&mut NullSink).unwrap();
    let pool = &report.pools[0];
    // Every admitted item is either still queued, was blocked at
    // distribution, or was handed to a worker.
    assert_eq!(
        pool.admitted,
        pool.final_queue as u64 + pool.blocked + pool.processed
    );
    assert_eq!(pool.processed, pool.completed + pool.busy_workers as u64);
}

#[test]
fn test_full_routed_run() {
    let config = routed_config();
    let report = poolsim_core::run_simulation(&config, &mut NullSink).unwrap();

    let stream = report.pool("stream").unwrap();
    let process = report.pool("process").unwrap();
    assert_eq!(stream.filter, "private-192");
    assert_eq!(process.filter, "private-10");
    assert_eq!(stream.admitted + process.admitted, report.arrivals);
    assert!(process.admitted > stream.admitted);
    assert_eq!(
        report.total_processed(),
        stream.processed + process.processed
    );
}

#[test]
fn test_partial_router_table_runs_on_routed_defaults() {
    let mut config = SimConfig::from_str("[router]\n[router.stream]\nservers = 2\n").unwrap();
    config.simulation.cycles = 3000;
    let router = config.router.as_ref().unwrap();
    assert_eq!(router.stream.cooldown, 200);
    assert_eq!(router.process.cooldown, 200);

    let mut engine = SimulationEngine::new(&config).unwrap();
    for pool in engine.topology().pools() {
        assert_eq!(pool.queue_len(), 0);
    }
    let report = engine.run(&mut NullSink).unwrap();

    // Each pool only ever saw items of its own category.
    let Topology::Routed(router) = engine.topology() else {
        panic!("expected a routed topology");
    };
    let routed = router.stats();
    assert_eq!(
        router.pool(JobCategory::Stream).stats().admitted,
        routed.routed_stream
    );
    assert_eq!(
        router.pool(JobCategory::Process).stats().admitted,
        routed.routed_process
    );
    assert_eq!(routed.generated, report.arrivals);
    let admitted: u64 = report.pools.iter().map(|p| p.admitted).sum();
    assert_eq!(admitted, report.arrivals);
}

#[test]
fn test_same_seed_is_reproducible() {
    let config = routed_config();
    let run = || {
        let mut log = MemoryEventLog::new();
        let report = poolsim_core::run_simulation(&config, &mut log).unwrap();
        (report, log.records().to_vec())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_different_seed_differs() {
    let mut a = standalone_config();
    let mut b = standalone_config();
    a.simulation.seed = 1;
    b.simulation.seed = 2;
    let ra = poolsim_core::run_simulation(&a, &mut NullSink).unwrap();
    let rb = poolsim_core::run_simulation(&b, &mut NullSink).unwrap();
    assert_ne!(ra.pools, rb.pools);
}

#[test]
fn test_run_standalone_entry_point() {
    let mut log = MemoryEventLog::new();
    let report =
        poolsim_core::run_standalone(3, 1000, 25, Some(JobCategory::Stream), &mut log).unwrap();
    assert_eq!(report.cycles, 1000);
    assert_eq!(report.pools.len(), 1);
    assert_eq!(report.pools[0].label, "stream");
    assert!(log.matching("[stream] Server").count() > 0);
}

#[test]
fn test_cooldown_sweep() {
    let config = standalone_config();
    let reports = poolsim_core::compare_cooldowns(&config, &[0, 200]).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].name, "integration-test (cooldown 0)");
    // Actions under a 200-cycle cooldown are at least 201 cycles apart.
    let slow = &reports[1].pools[0];
    assert!(slow.scale_ups + slow.scale_downs <= 2000 / 201 + 1);
    assert!(reports[0].pools[0].scale_ups > 0);
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim.toml");
    let config = routed_config();
    std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();
    let loaded = SimConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_config_file() {
    let err = SimConfig::from_file(std::path::Path::new("/nonexistent/poolsim.toml"));
    assert!(matches!(err, Err(ConfigError::Io(_))));
}

#[test]
fn test_bad_filter_surfaces_as_config_error() {
    let mut config = standalone_config();
    config.pool.block = "prefix:".to_string();
    let err = poolsim_core::run_simulation(&config, &mut NullSink).unwrap_err();
    assert!(matches!(
        err,
        SimError::Config(ConfigError::Filter(FilterError::EmptyPrefixList(_)))
    ));
}
