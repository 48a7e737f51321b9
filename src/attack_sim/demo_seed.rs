//! Demo Seed
//!
//! Presentation-only bootstrap: fabricates a few attack events and marks a
//! slice of the RSU population so a freshly started dashboard is not empty.
//! None of this goes through the attacker or trust models.
use crate::attack_sim::catalog::{self, AttackVector};
use crate::attack_sim::{AttackEvent, AttackerPool};
use crate::types::Rsu;
use rand::Rng;

pub const DEMO_ATTACK_COUNT: usize = 5;
pub const DEMO_NETWORK_DEGRADATION: f64 = 0.15;

const DEMO_SUCCESS_RATE: f64 = 0.6;
const DEMO_DETECTION_RATE: f64 = 0.7;
const DEMO_MITIGATION_RATE: f64 = 0.5;

/// Output of [`seed_demo_attacks`]
#[derive(Debug, Clone)]
pub struct DemoSeed {
    pub events: Vec<AttackEvent>,
    pub rsus: Vec<Rsu>,
}

/// Fabricate demo events against random RSUs and mark every 30th RSU
/// quarantined and every other 10th RSU compromised. Empty input yields an
/// empty seed.
pub fn seed_demo_attacks<R: Rng + ?Sized>(rsus: &[Rsu], pool: &AttackerPool, rng: &mut R) -> DemoSeed {
    if rsus.is_empty() {
        return DemoSeed {
            events: Vec::new(),
            rsus: Vec::new(),
        };
    }

    let events = (0..DEMO_ATTACK_COUNT)
        .map(|_| {
            let target = &rsus[rng.gen_range(0..rsus.len())];
            let vector: &'static AttackVector = catalog::random_vector(rng, None);
            let attacker_name = match pool.attackers() {
                [] => "Unknown",
                attackers => attackers[rng.gen_range(0..attackers.len())].profile().name,
            };

            let mut event = AttackEvent::new(vector, attacker_name, &target.rsu_id);
            event.success = rng.gen_bool(DEMO_SUCCESS_RATE);
            event.detected = rng.gen_bool(DEMO_DETECTION_RATE);
            event.mitigated = event.detected && rng.gen_bool(DEMO_MITIGATION_RATE);
            event.affected_nodes = vec![target.rsu_id.clone()];
            event
        })
        .collect();

    let rsus = rsus
        .iter()
        .enumerate()
        .map(|(index, rsu)| {
            let mut rsu = rsu.clone();
            if index % 30 == 0 {
                rsu.attack_detected = false;
                rsu.quarantined = true;
                rsu.trust_score = Some(rsu.trust().saturating_sub(40).max(40));
                rsu.trust_score_change = Some(-40);
            } else if index % 10 == 0 {
                rsu.attack_detected = true;
                rsu.quarantined = false;
                rsu.trust_score = Some(rsu.trust().saturating_sub(20).max(60));
                rsu.trust_score_change = Some(-20);
            }
            rsu
        })
        .collect();

    DemoSeed { events, rsus }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grid(count: usize) -> Vec<Rsu> {
        (0..count)
            .map(|i| Rsu::new(format!("RSU-{}", i), 0.0, i as f64 * 0.1))
            .collect()
    }

    #[test]
    fn test_empty_population_seeds_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let seed = seed_demo_attacks(&[], &AttackerPool::new(), &mut rng);
        assert!(seed.events.is_empty());
        assert!(seed.rsus.is_empty());
    }

    #[test]
    fn test_five_events_against_known_rsus() {
        let mut rng = StdRng::seed_from_u64(2);
        let rsus = grid(12);
        let pool = AttackerPool::with_random(3, &mut rng);
        let seed = seed_demo_attacks(&rsus, &pool, &mut rng);

        assert_eq!(seed.events.len(), DEMO_ATTACK_COUNT);
        for event in &seed.events {
            assert!(rsus.iter().any(|r| r.rsu_id == event.target_id));
            assert_eq!(event.affected_nodes, vec![event.target_id.clone()]);
            assert!(!event.mitigated || event.detected);
            assert!(pool.attackers().iter().any(|a| a.profile().name == event.attacker_profile));
        }
    }

    #[test]
    fn test_rsu_marking_pattern() {
        let mut rng = StdRng::seed_from_u64(3);
        let seed = seed_demo_attacks(&grid(31), &AttackerPool::new(), &mut rng);

        // Index 0 and 30 hit the quarantine branch first
        for index in [0, 30] {
            let rsu = &seed.rsus[index];
            assert!(rsu.quarantined);
            assert!(!rsu.attack_detected);
            assert_eq!(rsu.trust(), 50);
        }
        for index in [10, 20] {
            let rsu = &seed.rsus[index];
            assert!(rsu.attack_detected);
            assert_eq!(rsu.trust(), 70);
            assert_eq!(rsu.trust_score_change, Some(-20));
        }
        assert!(!seed.rsus[5].attack_detected);
        assert_eq!(seed.rsus[5].trust_score, None);
        assert!(seed.events.iter().all(|e| e.attacker_profile == "Unknown"));
    }
}
