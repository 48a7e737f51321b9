// Engine lifecycle regression tests
//
// Drive the simulation timer on a paused tokio clock:
// - double start keeps a single timer and a single attacker seeding
// - stop halts ticking, keeps attackers idle and reports them as inactive
// - option changes replace the timer instead of stacking a second one
// - an empty RSU set still produces a stats snapshot
use rsu_trust_sim::{
    AttackSimulationEngine, OptionsUpdate, Rsu, SimError, SimulationEvent, SimulationOptions,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn cluster(count: usize) -> Vec<Rsu> {
    (0..count)
        .map(|i| Rsu::new(format!("RSU-{:02}", i), 40.0 + i as f64 * 0.002, -74.0))
        .collect()
}

fn engine(seed: u64) -> AttackSimulationEngine {
    AttackSimulationEngine::new(SimulationOptions::default(), Some(seed))
}

#[tokio::test(start_paused = true)]
async fn test_double_start_keeps_one_timer() {
    let engine = engine(1);
    engine.start(cluster(10)).unwrap();
    engine.start(cluster(10)).unwrap();

    // Default frequency ticks every 1000 ms, plus the immediate cycle
    tokio::time::sleep(Duration::from_millis(5500)).await;

    let cycles = engine.cycle_count();
    assert!((5..=7).contains(&cycles), "ran {} cycles", cycles);
    assert_eq!(engine.attacker_pool_stats().attacker_count, 5);
    assert_eq!(engine.stats().active_attackers, 5);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_ticking_and_keeps_attackers() {
    let engine = engine(2);
    let last_active = Arc::new(AtomicUsize::new(usize::MAX));
    let seen = last_active.clone();
    engine.on_stats_updated(move |stats| {
        seen.store(stats.active_attackers, Ordering::SeqCst);
    });

    engine.start(cluster(10)).unwrap();
    assert_eq!(last_active.load(Ordering::SeqCst), 5);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    engine.stop();
    engine.stop();
    assert!(!engine.is_running());
    let cycles = engine.cycle_count();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.cycle_count(), cycles);
    assert_eq!(engine.stats().active_attackers, 0);
    assert_eq!(last_active.load(Ordering::SeqCst), 0);
    assert_eq!(engine.attacker_pool_stats().attacker_count, 5);

    // Restart reuses the idle pool
    engine.start(engine.current_rsus()).unwrap();
    assert_eq!(engine.attacker_pool_stats().attacker_count, 5);
    assert_eq!(engine.stats().active_attackers, 5);
}

#[tokio::test(start_paused = true)]
async fn test_update_options_replaces_timer() {
    let engine = engine(3);
    engine.start(cluster(5)).unwrap();

    engine
        .update_options(OptionsUpdate {
            attack_frequency: Some(30.0),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(engine.options().interval(), Duration::from_millis(800));

    let before = engine.cycle_count();
    tokio::time::sleep(Duration::from_millis(4100)).await;
    let ran = engine.cycle_count() - before;

    // 800 ms alone gives 5; a leftover 1000 ms timer would add 4 more
    assert!((4..=6).contains(&ran), "ran {} cycles", ran);
}

#[tokio::test(start_paused = true)]
async fn test_empty_rsu_set_still_reports_stats() {
    let engine = engine(4);
    let mut rx = engine.subscribe();

    engine.start(Vec::new()).unwrap();
    assert!(engine.is_running());
    assert_eq!(engine.stats().attacks_attempted, 0);

    match rx.try_recv() {
        Ok(SimulationEvent::StatsUpdated(stats)) => {
            assert_eq!(stats.attacks_attempted, 0);
            assert_eq!(stats.active_attackers, 5);
        }
        other => panic!("expected a stats snapshot, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(engine.stats().attacks_attempted, 0);
}

#[tokio::test(start_paused = true)]
async fn test_demo_seed_bootstraps_history() {
    let options = SimulationOptions {
        seed_demo_attacks: true,
        attack_frequency: 1.0,
        ..Default::default()
    };
    let engine = AttackSimulationEngine::new(options, Some(5));
    engine.start(cluster(31)).unwrap();

    assert!(engine.attack_history().len() >= 5);
    let rsus = engine.current_rsus();
    assert!(rsus[0].quarantined);
    assert!(rsus[30].quarantined);
    assert!(rsus[10].attack_detected);
    assert_eq!(engine.stats().network_degradation, 0.15);
}

#[tokio::test(start_paused = true)]
async fn test_observers_receive_ticks() {
    let engine = engine(6);
    let stats_calls = Arc::new(AtomicUsize::new(0));
    let rsu_calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let calls = stats_calls.clone();
        engine.on_stats_updated(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }
    let calls = rsu_calls.clone();
    engine.on_rsus_updated(move |rsus| {
        assert_eq!(rsus.len(), 8);
        calls.fetch_add(1, Ordering::SeqCst);
    });

    engine.start(cluster(8)).unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    engine.stop();

    // Immediate cycle plus two ticks, then the snapshot published by stop
    assert_eq!(rsu_calls.load(Ordering::SeqCst), 3);
    assert_eq!(stats_calls.load(Ordering::SeqCst), 8);
}

#[test]
fn test_start_outside_runtime_fails() {
    let engine = engine(7);
    assert!(matches!(engine.start(cluster(3)), Err(SimError::RuntimeUnavailable)));
    assert!(!engine.is_running());
}

#[test]
fn test_update_options_outside_runtime_while_stopped() {
    let engine = engine(8);
    engine
        .update_options(OptionsUpdate {
            attack_frequency: Some(0.0),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(engine.options().attack_frequency, 1.0);
}

#[test]
fn test_counters_never_regress() {
    let options = SimulationOptions {
        attack_frequency: 30.0,
        ..Default::default()
    };
    let engine = AttackSimulationEngine::new(options, Some(9));
    engine.set_rsus(cluster(15));

    let mut previous = engine.stats();
    for _ in 0..25 {
        engine.step();
        let current = engine.stats();
        assert!(current.attacks_attempted >= previous.attacks_attempted);
        assert!(current.attacks_successful >= previous.attacks_successful);
        assert!(current.attacks_detected >= previous.attacks_detected);
        assert!(current.attacks_mitigated >= previous.attacks_mitigated);
        assert!(current.trust_updates >= previous.trust_updates);
        assert!(current.blockchain_txs >= previous.blockchain_txs);
        assert!((0.0..=1.0).contains(&current.network_degradation));
        previous = current;
    }
    assert!(previous.attacks_attempted > 0);
}

#[test]
fn test_tick_event_order() {
    let options = SimulationOptions {
        attack_frequency: 30.0,
        ..Default::default()
    };
    let engine = AttackSimulationEngine::new(options, Some(10));
    engine.set_rsus(cluster(20));
    let mut rx = engine.subscribe();
    assert!(engine.step());

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    let n = events.len();
    assert!(n >= 2);
    assert!(matches!(events[n - 2], SimulationEvent::RsusUpdated(_)));
    assert!(matches!(events[n - 1], SimulationEvent::StatsUpdated(_)));
    assert!(
        events[..n - 2]
            .iter()
            .all(|e| matches!(e, SimulationEvent::AttackGenerated(_)))
    );
}
