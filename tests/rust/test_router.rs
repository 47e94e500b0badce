/// Integration tests for the dual-pool router.
use poolsim_core::generator::RequestGenerator;
use poolsim_core::pool::{Admission, PoolController, PoolEvent, PoolSettings};
use poolsim_core::request::JobCategory;
use poolsim_core::router::Router;
use poolsim_filters::{AllowAll, PrefixBlock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn external_pool(servers: u32, cooldown: u32) -> PoolController {
    PoolController::new(
        PoolSettings {
            servers,
            cooldown,
            admission: Admission::External,
            ..PoolSettings::default()
        },
        Box::new(AllowAll::new()),
        RequestGenerator::default(),
    )
}

#[test]
fn test_traffic_reaches_matching_pool_only() {
    let mut router = Router::new(
        external_pool(2, 200),
        external_pool(2, 200),
        RequestGenerator::default(),
        0.4,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..2_000 {
        router.run_cycle(&mut rng);
    }

    let stats = router.stats();
    assert_eq!(stats.generated, stats.routed_stream + stats.routed_process);
    assert_eq!(
        router.pool(JobCategory::Stream).stats().admitted,
        stats.routed_stream
    );
    assert_eq!(
        router.pool(JobCategory::Process).stats().admitted,
        stats.routed_process
    );
    // Roughly 40% arrivals, 60% of them processing.
    assert!(stats.generated > 650 && stats.generated < 950);
    assert!(stats.routed_process > stats.routed_stream);
}

#[test]
fn test_pools_run_in_lockstep() {
    let mut router = Router::new(
        external_pool(1, 10),
        external_pool(3, 10),
        RequestGenerator::default(),
        0.4,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..100 {
        let report = router.run_cycle(&mut rng);
        assert_eq!(report.stream.cycle, router.now());
        assert_eq!(report.process.cycle, router.now());
        assert_eq!(report.stream.label, Some(JobCategory::Stream));
        assert_eq!(report.process.label, Some(JobCategory::Process));
    }
    for pool in router.pools() {
        assert_eq!(pool.now(), 100);
    }
}

#[test]
fn test_generated_item_category_matches_admitting_pool() {
    let mut router = Router::new(
        external_pool(2, 200),
        external_pool(2, 200),
        RequestGenerator::default(),
        1.0,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    for _ in 0..200 {
        let report = router.run_cycle(&mut rng);
        let admitted: Vec<Option<JobCategory>> = report
            .pools()
            .iter()
            .filter(|r| {
                r.events
                    .iter()
                    .any(|e| matches!(e, PoolEvent::Admitted { .. }))
            })
            .map(|r| r.label)
            .collect();
        assert_eq!(admitted, vec![report.routed]);
    }
}

#[test]
fn test_pools_keep_their_own_configuration() {
    let stream = PoolController::new(
        PoolSettings {
            servers: 4,
            cooldown: 0,
            admission: Admission::External,
            ..PoolSettings::default()
        },
        Box::new(PrefixBlock::private_192()),
        RequestGenerator::default(),
    );
    let process = external_pool(4, 1_000);
    let mut router = Router::new(stream, process, RequestGenerator::default(), 0.0);
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    for _ in 0..10 {
        router.run_cycle(&mut rng);
    }
    // Both pools are empty; only the one without a long cooldown keeps
    // shedding workers.
    assert_eq!(router.pool(JobCategory::Stream).servers(), 1);
    assert_eq!(router.pool(JobCategory::Process).servers(), 3);
    assert_eq!(router.pool(JobCategory::Stream).filter_name(), "private-192");
    assert_eq!(router.pool(JobCategory::Process).filter_name(), "none");
}

#[test]
fn test_same_seed_same_routing() {
    let run = |seed: u64| {
        let mut router = Router::new(
            external_pool(2, 50),
            external_pool(2, 50),
            RequestGenerator::default(),
            0.4,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..500)
            .map(|_| router.run_cycle(&mut rng).routed)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(5), run(5));
    assert_ne!(run(5), run(6));
}
