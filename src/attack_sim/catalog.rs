//! Attack Vector Catalog
//!
//! Static registry of every attack vector the simulation knows about,
//! grouped by category, plus the resolver that maps free-text anomaly
//! descriptions back onto a catalog entry.
use crate::types::Severity;
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Attack vector category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackCategory {
    Network,
    Protocol,
    Data,
    Infrastructure,
}

impl AttackCategory {
    pub const ALL: [AttackCategory; 4] = [
        AttackCategory::Network,
        AttackCategory::Protocol,
        AttackCategory::Data,
        AttackCategory::Infrastructure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackCategory::Network => "network",
            AttackCategory::Protocol => "protocol",
            AttackCategory::Data => "data",
            AttackCategory::Infrastructure => "infrastructure",
        }
    }
}

impl fmt::Display for AttackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog-defined attack vector. Never mutated after definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackVector {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: AttackCategory,
    pub severity: Severity,
    /// Base probability of a successful attack (0-1)
    pub success_probability: f64,
    /// How hard the attack is to detect (0-1, higher = harder)
    pub detection_difficulty: f64,
    /// Likelihood of spreading to connected RSUs (0-1)
    pub propagation_factor: f64,
    /// Trust points removed on success
    pub trust_impact: u32,
    /// Throughput degradation fraction (0-1)
    pub network_impact: f64,
    /// Seconds to recover if unmitigated
    pub recovery_time: u32,
    /// Only usable once some RSU is already compromised
    pub requires_compromised_rsu: bool,
    pub signature: &'static [&'static str],
    pub mitigation_strategy: &'static str,
}

/// Target classes an attack can be aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetType {
    #[serde(rename = "RSU")]
    Rsu,
}

/// How an attack was carried out
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetails {
    pub method: String,
    pub signature: Vec<String>,
}

/// Runtime projection of an [`AttackVector`] carried by attack events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attack {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub category: AttackCategory,
    pub target_type: TargetType,
    pub likely_impact: String,
    pub prerequisites: Vec<String>,
    pub mitigation_strategies: Vec<String>,
    pub execution_details: ExecutionDetails,
}

impl AttackVector {
    pub fn to_attack(&self) -> Attack {
        let prerequisites = if self.requires_compromised_rsu {
            vec!["Compromised RSU Access".to_string()]
        } else {
            Vec::new()
        };

        Attack {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            severity: self.severity,
            category: self.category,
            target_type: TargetType::Rsu,
            likely_impact: format!(
                "Reduces trust score by {}% and affects network performance by {:.0}%",
                self.trust_impact,
                self.network_impact * 100.0
            ),
            prerequisites,
            mitigation_strategies: vec![self.mitigation_strategy.to_string()],
            execution_details: ExecutionDetails {
                method: "Automated Simulation".to_string(),
                signature: self.signature.iter().map(|s| s.to_string()).collect(),
            },
        }
    }
}

/// The full catalog. Every category holds at least one vector.
pub static ATTACK_VECTORS: [AttackVector; 8] = [
    AttackVector {
        id: "ddos",
        name: "Distributed Denial of Service",
        description: "Floods RSU with excessive traffic to disrupt services",
        category: AttackCategory::Network,
        severity: Severity::High,
        success_probability: 0.75,
        detection_difficulty: 0.5,
        propagation_factor: 0.3,
        trust_impact: 15,
        network_impact: 0.8,
        recovery_time: 600,
        requires_compromised_rsu: false,
        signature: &["high_bandwidth_usage", "connection_flood", "rapid_requests"],
        mitigation_strategy: "Traffic filtering, rate limiting, and load balancing",
    },
    AttackVector {
        id: "jamming",
        name: "Signal Jamming",
        description: "Interferes with RSU wireless communications",
        category: AttackCategory::Network,
        severity: Severity::Critical,
        success_probability: 0.6,
        detection_difficulty: 0.7,
        propagation_factor: 0.1,
        trust_impact: 25,
        network_impact: 0.9,
        recovery_time: 300,
        requires_compromised_rsu: false,
        signature: &["signal_loss", "communication_errors", "intermittent_connectivity"],
        mitigation_strategy: "Frequency hopping, signal boosting, and redundant channels",
    },
    AttackVector {
        id: "sybil",
        name: "Sybil Attack",
        description: "Creates multiple fake identities to manipulate system",
        category: AttackCategory::Protocol,
        severity: Severity::High,
        success_probability: 0.65,
        detection_difficulty: 0.8,
        propagation_factor: 0.5,
        trust_impact: 20,
        network_impact: 0.4,
        recovery_time: 900,
        requires_compromised_rsu: false,
        signature: &["duplicate_ids", "inconsistent_behavior", "geographical_impossibilities"],
        mitigation_strategy: "Strong identity verification and behavior analysis",
    },
    AttackVector {
        id: "replay",
        name: "Message Replay",
        description: "Captures and repeats legitimate messages to cause confusion",
        category: AttackCategory::Protocol,
        severity: Severity::Medium,
        success_probability: 0.8,
        detection_difficulty: 0.6,
        propagation_factor: 0.2,
        trust_impact: 10,
        network_impact: 0.3,
        recovery_time: 180,
        requires_compromised_rsu: false,
        signature: &["duplicate_messages", "out_of_sequence_timestamps", "repeated_patterns"],
        mitigation_strategy: "Timestamp verification and nonce usage in communications",
    },
    AttackVector {
        id: "injection",
        name: "Malicious Data Injection",
        description: "Inserts false data into the network to mislead vehicles",
        category: AttackCategory::Data,
        severity: Severity::Critical,
        success_probability: 0.7,
        detection_difficulty: 0.75,
        propagation_factor: 0.6,
        trust_impact: 30,
        network_impact: 0.5,
        recovery_time: 1200,
        requires_compromised_rsu: true,
        signature: &["data_inconsistency", "logical_impossibilities", "pattern_deviation"],
        mitigation_strategy: "Data validation, cross-checking, and plausibility analysis",
    },
    AttackVector {
        id: "tampering",
        name: "Data Tampering",
        description: "Modifies legitimate data during transmission",
        category: AttackCategory::Data,
        severity: Severity::High,
        success_probability: 0.6,
        detection_difficulty: 0.7,
        propagation_factor: 0.4,
        trust_impact: 20,
        network_impact: 0.4,
        recovery_time: 600,
        requires_compromised_rsu: false,
        signature: &["checksum_failure", "integrity_violations", "modified_fields"],
        mitigation_strategy: "Cryptographic signatures and data integrity checks",
    },
    AttackVector {
        id: "mitm",
        name: "Man-in-the-Middle",
        description: "Intercepts communications between RSUs and vehicles",
        category: AttackCategory::Infrastructure,
        severity: Severity::Critical,
        success_probability: 0.5,
        detection_difficulty: 0.85,
        propagation_factor: 0.3,
        trust_impact: 25,
        network_impact: 0.6,
        recovery_time: 1500,
        requires_compromised_rsu: false,
        signature: &["routing_anomalies", "certificate_mismatches", "latency_spikes"],
        mitigation_strategy: "TLS/SSL with certificate pinning and connection validation",
    },
    AttackVector {
        id: "compromise",
        name: "RSU Compromise",
        description: "Takes complete control of an RSU through software vulnerability",
        category: AttackCategory::Infrastructure,
        severity: Severity::Critical,
        success_probability: 0.4,
        detection_difficulty: 0.9,
        propagation_factor: 0.7,
        trust_impact: 50,
        network_impact: 0.7,
        recovery_time: 3600,
        requires_compromised_rsu: false,
        signature: &["unauthorized_access", "unusual_commands", "behavioral_changes"],
        mitigation_strategy: "Regular security updates, intrusion detection, and hardware security modules",
    },
];

/// Flattened view of the catalog
pub fn all_vectors() -> &'static [AttackVector] {
    &ATTACK_VECTORS
}

pub fn vectors_in(category: AttackCategory) -> impl Iterator<Item = &'static AttackVector> {
    ATTACK_VECTORS.iter().filter(move |v| v.category == category)
}

pub fn find_vector(id: &str) -> Option<&'static AttackVector> {
    ATTACK_VECTORS.iter().find(|v| v.id == id)
}

pub fn category_of(id: &str) -> Option<AttackCategory> {
    find_vector(id).map(|v| v.category)
}

/// Uniformly random vector, optionally restricted to one category
pub fn random_vector<R: Rng + ?Sized>(
    rng: &mut R,
    category: Option<AttackCategory>,
) -> &'static AttackVector {
    match category {
        Some(category) => {
            let pool: Vec<&'static AttackVector> = vectors_in(category).collect();
            pool[rng.gen_range(0..pool.len())]
        }
        None => &ATTACK_VECTORS[rng.gen_range(0..ATTACK_VECTORS.len())],
    }
}

/// Which resolution tier produced a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchTier {
    Exact,
    Fuzzy,
    RandomDefault,
}

#[derive(Debug, Clone, Copy)]
pub struct VectorMatch {
    pub vector: &'static AttackVector,
    pub tier: MatchTier,
}

/// Map a free-text anomaly type onto the catalog.
///
/// Resolution order: exact name, then substring containment in either
/// direction, then a uniformly random vector. Always yields a vector.
pub fn resolve_anomaly_type<R: Rng + ?Sized>(anomaly_type: &str, rng: &mut R) -> VectorMatch {
    if let Some(vector) = ATTACK_VECTORS.iter().find(|v| v.name == anomaly_type) {
        return VectorMatch {
            vector,
            tier: MatchTier::Exact,
        };
    }

    // "" is a substring of every name
    if !anomaly_type.is_empty()
        && let Some(vector) = ATTACK_VECTORS
            .iter()
            .find(|v| anomaly_type.contains(v.name) || v.name.contains(anomaly_type))
    {
        return VectorMatch {
            vector,
            tier: MatchTier::Fuzzy,
        };
    }

    VectorMatch {
        vector: random_vector(rng, None),
        tier: MatchTier::RandomDefault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_every_category_has_vectors() {
        for category in AttackCategory::ALL {
            assert!(vectors_in(category).count() > 0, "{} is empty", category);
        }
        assert_eq!(all_vectors().len(), 8);
    }

    #[test]
    fn test_vector_ids_are_unique() {
        let mut ids: Vec<&str> = all_vectors().iter().map(|v| v.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all_vectors().len());
    }

    #[test]
    fn test_probabilities_are_normalised() {
        for v in all_vectors() {
            for p in [
                v.success_probability,
                v.detection_difficulty,
                v.propagation_factor,
                v.network_impact,
            ] {
                assert!((0.0..=1.0).contains(&p), "{} has {} out of range", v.id, p);
            }
            assert!(v.trust_impact > 0);
        }
    }

    #[test]
    fn test_only_injection_requires_compromised_rsu() {
        let gated: Vec<&str> = all_vectors()
            .iter()
            .filter(|v| v.requires_compromised_rsu)
            .map(|v| v.id)
            .collect();
        assert_eq!(gated, vec!["injection"]);
    }

    #[test]
    fn test_random_vector_respects_category() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let v = random_vector(&mut rng, Some(AttackCategory::Data));
            assert_eq!(v.category, AttackCategory::Data);
        }
    }

    #[test]
    fn test_resolve_exact_name() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = resolve_anomaly_type("Sybil Attack", &mut rng);
        assert_eq!(m.tier, MatchTier::Exact);
        assert_eq!(m.vector.id, "sybil");
    }

    #[test]
    fn test_resolve_fuzzy_in_both_directions() {
        let mut rng = StdRng::seed_from_u64(1);

        // Anomaly text is a substring of the vector name
        let m = resolve_anomaly_type("Denial of Service", &mut rng);
        assert_eq!(m.tier, MatchTier::Fuzzy);
        assert_eq!(m.vector.id, "ddos");

        // Vector name is a substring of the anomaly text
        let m = resolve_anomaly_type("Suspected Data Tampering on RSU-4", &mut rng);
        assert_eq!(m.tier, MatchTier::Fuzzy);
        assert_eq!(m.vector.id, "tampering");
    }

    #[test]
    fn test_resolve_falls_back_to_random() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = resolve_anomaly_type("GPS Spoofing", &mut rng);
        assert_eq!(m.tier, MatchTier::RandomDefault);
        assert!(find_vector(m.vector.id).is_some());

        let m = resolve_anomaly_type("", &mut rng);
        assert_eq!(m.tier, MatchTier::RandomDefault);
    }

    #[test]
    fn test_to_attack_projection() {
        let attack = find_vector("injection").unwrap().to_attack();
        assert_eq!(attack.category, AttackCategory::Data);
        assert_eq!(attack.target_type, TargetType::Rsu);
        assert_eq!(attack.prerequisites, vec!["Compromised RSU Access".to_string()]);
        assert_eq!(attack.execution_details.signature.len(), 3);
        assert!(attack.likely_impact.contains("30%"));

        let attack = find_vector("ddos").unwrap().to_attack();
        assert!(attack.prerequisites.is_empty());
        assert!(attack.likely_impact.contains("80%"));
    }
}
