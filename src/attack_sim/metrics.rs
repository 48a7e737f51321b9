//! Simulation Statistics and Attack Metrics
//!
//! `SimulationStats` is the running aggregate the engine publishes each tick;
//! `AttackMetrics` is an after-the-fact breakdown of an attack history.
use crate::attack_sim::AttackEvent;
use crate::types::Rsu;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStats {
    pub attacks_attempted: u64,
    pub attacks_successful: u64,
    pub attacks_detected: u64,
    pub attacks_mitigated: u64,
    pub rsus_compromised: usize,
    pub rsus_quarantined: usize,
    pub trust_updates: usize,
    pub blockchain_txs: usize,
    pub active_attackers: usize,
    /// 0-1
    pub network_degradation: f64,
}

impl SimulationStats {
    /// Fold one attack outcome into the monotonic counters
    pub fn record_attack(&mut self, event: &AttackEvent) {
        self.attacks_attempted += 1;
        if event.success {
            self.attacks_successful += 1;
        }
        if event.detected {
            self.attacks_detected += 1;
        }
        if event.mitigated {
            self.attacks_mitigated += 1;
        }
    }

    /// Re-derive the RSU-based figures from the current snapshot.
    ///
    /// Compromised and quarantined counts track the snapshot exactly; trust
    /// updates and ledger transactions never move backwards.
    pub fn update_from_rsus(&mut self, rsus: &[Rsu]) {
        self.rsus_compromised = rsus.iter().filter(|r| r.attack_detected).count();
        self.rsus_quarantined = rsus.iter().filter(|r| r.quarantined).count();

        let changed = rsus
            .iter()
            .filter(|r| r.trust_score_change.is_some_and(|c| c != 0))
            .count();
        let anchored = rsus.iter().filter(|r| r.blockchain_protected).count();

        self.trust_updates = self.trust_updates.max(changed);
        self.blockchain_txs = self.blockchain_txs.max(anchored);
    }

    pub fn set_network_degradation(&mut self, average_throughput: f64) {
        self.network_degradation = (1.0 - average_throughput / 100.0).clamp(0.0, 1.0);
    }

    /// Zero everything except the attacker count
    pub fn reset(&mut self) {
        *self = Self {
            active_attackers: self.active_attackers,
            ..Self::default()
        };
    }

    pub fn success_rate(&self) -> f64 {
        self.attacks_successful as f64 / self.attacks_attempted.max(1) as f64
    }

    pub fn detection_rate(&self) -> f64 {
        self.attacks_detected as f64 / self.attacks_attempted.max(1) as f64
    }

    /// Share of detected attacks that were also mitigated
    pub fn mitigation_rate(&self) -> f64 {
        self.attacks_mitigated as f64 / self.attacks_detected.max(1) as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeBreakdown {
    pub attempted: usize,
    pub successful: usize,
    pub detected: usize,
    pub mitigated: usize,
}

impl OutcomeBreakdown {
    fn add(&mut self, event: &AttackEvent) {
        self.attempted += 1;
        self.successful += usize::from(event.success);
        self.detected += usize::from(event.detected);
        self.mitigated += usize::from(event.mitigated);
    }

    pub fn success_rate(&self) -> f64 {
        self.successful as f64 / self.attempted.max(1) as f64
    }

    pub fn detection_rate(&self) -> f64 {
        self.detected as f64 / self.attempted.max(1) as f64
    }
}

/// Breakdown of an attack history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackMetrics {
    pub total: OutcomeBreakdown,
    /// Keyed by attack name
    pub by_vector: BTreeMap<String, OutcomeBreakdown>,
    /// Keyed by attacker profile name
    pub by_attacker: BTreeMap<String, OutcomeBreakdown>,
    pub mean_network_impact: f64,
    /// Distinct targets hit at least once
    pub targets_hit: usize,
    /// Largest propagation footprint of a single attack
    pub max_affected_nodes: usize,
}

impl AttackMetrics {
    pub fn from_events(events: &[AttackEvent]) -> Self {
        if events.is_empty() {
            return Self::default();
        }

        let mut metrics = Self::default();
        let mut targets = std::collections::BTreeSet::new();
        let mut impact_sum = 0.0;

        for event in events {
            metrics.total.add(event);
            metrics
                .by_vector
                .entry(event.attack.name.clone())
                .or_default()
                .add(event);
            metrics
                .by_attacker
                .entry(event.attacker_profile.clone())
                .or_default()
                .add(event);

            impact_sum += event.network_impact;
            if event.success {
                targets.insert(event.target_id.as_str());
            }
            metrics.max_affected_nodes = metrics.max_affected_nodes.max(event.affected_nodes.len());
        }

        metrics.mean_network_impact = impact_sum / events.len() as f64;
        metrics.targets_hit = targets.len();
        metrics
    }

    /// Attack name with the highest success rate (ties go to the first name)
    pub fn most_effective_vector(&self) -> Option<(&str, f64)> {
        self.by_vector
            .iter()
            .map(|(name, b)| (name.as_str(), b.success_rate()))
            .fold(None::<(&str, f64)>, |best, (name, rate)| match best {
                Some((_, best_rate)) if best_rate >= rate => best,
                _ => Some((name, rate)),
            })
    }
}
