/// Integration tests for the pool controller's per-cycle algorithm.
use poolsim_core::generator::RequestGenerator;
use poolsim_core::pool::{Admission, PoolController, PoolSettings, ScaleDecision};
use poolsim_core::request::{JobCategory, WorkItem};
use poolsim_filters::{filter_by_name, AllowAll, PrefixBlock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn item(source: &str, duration: u32) -> WorkItem {
    WorkItem::new(source, "8.8.8.8", duration, JobCategory::Process)
}

fn external(servers: u32, cooldown: u32) -> PoolSettings {
    PoolSettings {
        servers,
        cooldown,
        admission: Admission::External,
        ..PoolSettings::default()
    }
}

fn busy_pool(seed: u64) -> (PoolController, ChaCha8Rng) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pool = PoolController::new(
        PoolSettings {
            servers: 1,
            cooldown: 5,
            ..PoolSettings::default()
        },
        Box::new(PrefixBlock::private_192()),
        RequestGenerator::default(),
    );
    pool.preload(2_000, &mut rng);
    (pool, rng)
}

#[test]
fn test_worker_invariant_holds_every_cycle() {
    let (mut pool, mut rng) = busy_pool(1);
    for _ in 0..1_500 {
        pool.run_cycle(&mut rng);
        for worker in pool.workers() {
            assert_eq!(
                worker.remaining() > 0,
                worker.is_busy(),
                "worker {} violates remaining/busy invariant",
                worker.id
            );
        }
    }
}

#[test]
fn test_queue_never_grows_during_distribution() {
    let (mut pool, mut rng) = busy_pool(2);
    for _ in 0..1_500 {
        let report = pool.run_cycle(&mut rng);
        assert!(report.queue_after_distribution <= report.queue_before_distribution);
    }
}

#[test]
fn test_unit_duration_item_finishes_same_cycle() {
    let mut pool = PoolController::new(
        external(1, 0),
        Box::new(AllowAll::new()),
        RequestGenerator::default(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    pool.inject(item("1.2.3.4", 1));
    pool.run_cycle(&mut rng);
    assert!(pool.workers()[0].is_idle());
    assert_eq!(pool.stats().processed, 1);
    assert_eq!(pool.stats().completed, 1);
}

#[test]
fn test_steady_state_never_scales() {
    let mut pool = PoolController::new(
        external(2, 0),
        Box::new(AllowAll::new()),
        RequestGenerator::default(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for i in 0..130 {
        pool.inject(item(&format!("1.1.0.{}", i), 1_000));
    }
    for _ in 0..200 {
        let report = pool.run_cycle(&mut rng);
        // 128 queued stays within [50 * 2, 80 * 2].
        assert_eq!(report.queue_after_distribution, 128);
        assert_eq!(report.scale, ScaleDecision::Hold);
        assert_eq!(pool.servers(), 2);
    }
}

#[test]
fn test_no_action_within_cooldown_window() {
    let (mut pool, mut rng) = busy_pool(3);
    let period = u64::from(pool.settings().cooldown);
    let mut actions = Vec::new();
    for _ in 0..3_000 {
        let report = pool.run_cycle(&mut rng);
        if report.scale.is_action() {
            actions.push(report.cycle);
        }
    }
    assert!(actions.len() >= 2, "expected several scaling actions");
    for pair in actions.windows(2) {
        assert!(
            pair[1] >= pair[0] + period + 1,
            "actions at {} and {} violate cooldown {}",
            pair[0],
            pair[1],
            period
        );
    }
}

#[test]
fn test_removal_never_goes_below_one() {
    let mut pool = PoolController::new(
        external(5, 0),
        Box::new(AllowAll::new()),
        RequestGenerator::default(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for _ in 0..50 {
        pool.run_cycle(&mut rng);
        assert!(pool.servers() >= 1);
    }
    assert_eq!(pool.servers(), 1);
    assert_eq!(pool.stats().scale_downs, 4);
}

#[test]
fn test_blocked_head_then_overload_scales_up() {
    let mut pool = PoolController::new(
        PoolSettings {
            high_threshold: 80,
            ..external(1, 0)
        },
        Box::new(PrefixBlock::private_10()),
        RequestGenerator::default(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    pool.inject(item("10.0.0.5", 1));
    for i in 0..82 {
        pool.inject(item(&format!("1.1.1.{}", i), 1));
    }

    let report = pool.run_cycle(&mut rng);
    assert_eq!(pool.stats().processed, 1);
    assert_eq!(pool.stats().blocked, 1);
    assert_eq!(pool.stats().scale_ups, 1);
    assert_eq!(pool.servers(), 2);
    assert_eq!(report.queue_after_distribution, 81);
    assert_eq!(report.scale, ScaleDecision::Added { worker_id: 1 });
}

#[test]
fn test_all_busy_skips_removal_without_cooldown() {
    let mut pool = PoolController::new(
        external(2, 10),
        Box::new(AllowAll::new()),
        RequestGenerator::default(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    pool.inject(item("1.1.1.1", 100));
    pool.inject(item("1.1.1.2", 100));

    for _ in 0..3 {
        let report = pool.run_cycle(&mut rng);
        assert_eq!(report.scale, ScaleDecision::NoIdleWorker);
        assert_eq!(pool.cooldown_remaining(), 0);
        assert_eq!(pool.servers(), 2);
    }
    assert_eq!(pool.stats().scale_down_misses, 3);
    assert_eq!(pool.stats().scale_downs, 0);
}

#[test]
fn test_prefix_policy_discards_head_at_distribution() {
    let mut pool = PoolController::new(
        external(1, 0),
        filter_by_name("prefix:10.").unwrap(),
        RequestGenerator::default(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert!(pool.inject(item("10.0.0.5", 4)));
    assert_eq!(pool.queue_len(), 1);

    let report = pool.run_cycle(&mut rng);
    assert_eq!(pool.stats().blocked, 1);
    assert_eq!(pool.stats().processed, 0);
    assert_eq!(pool.queue_len(), 0);
    assert!(pool.workers()[0].is_idle());
    assert_eq!(report.queue_after_distribution, 0);
}

#[test]
fn test_admission_filtering_keeps_blocked_out_of_queue() {
    let mut pool = PoolController::new(
        PoolSettings {
            filter_at_admission: true,
            ..external(1, 0)
        },
        Box::new(PrefixBlock::private_192()),
        RequestGenerator::default(),
    );
    assert!(!pool.inject(item("192.168.0.44", 3)));
    assert!(pool.inject(item("192.168.1.44", 3)));
    assert_eq!(pool.queue_len(), 1);
    assert_eq!(pool.stats().blocked, 1);
    assert_eq!(pool.stats().admitted, 1);
}

#[test]
fn test_scale_up_worker_ids_are_monotonic() {
    let (mut pool, mut rng) = busy_pool(4);
    let mut added = Vec::new();
    for _ in 0..500 {
        if let ScaleDecision::Added { worker_id } = pool.run_cycle(&mut rng).scale {
            added.push(worker_id);
        }
    }
    assert!(!added.is_empty());
    assert!(added.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(added[0], 1);
}
