//! Attack Simulation Framework
//!
//! Models adversaries attacking a V2X roadside-unit network and feeds the
//! outcomes back into RSU trust scores.
//!
//! Features:
//! - Static attack vector catalog with free-text anomaly resolution
//! - Adaptive attackers spawned from behaviour profiles
//! - Timer-driven simulation engine with observer and channel delivery
//! - Run statistics and per-vector metrics
pub mod attacker;
pub mod catalog;
pub mod demo_seed;
pub mod metrics;
pub mod orchestrator;

pub use attacker::{AttackContext, Attacker, AttackerPool, AttackerProfile, PoolStats};
pub use catalog::{Attack, AttackCategory, AttackVector, MatchTier};
pub use metrics::{AttackMetrics, SimulationStats};
pub use orchestrator::AttackSimulationEngine;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One simulated attack attempt, as published to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackEvent {
    pub id: String,
    pub attack: Attack,
    /// Display name of the attacker profile
    pub attacker_profile: String,
    pub target_id: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub detected: bool,
    pub mitigated: bool,
    /// Throughput degradation fraction of the vector (0-1)
    pub network_impact: f64,
    /// Topology nodes the attack landed on, target first
    pub affected_nodes: Vec<String>,
}

impl AttackEvent {
    pub fn new(vector: &AttackVector, attacker_profile: &str, target_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            attack: vector.to_attack(),
            attacker_profile: attacker_profile.to_string(),
            target_id: target_id.to_string(),
            timestamp: Utc::now(),
            success: false,
            detected: false,
            mitigated: false,
            network_impact: vector.network_impact,
            affected_nodes: Vec::new(),
        }
    }
}
