//! RSU Trust Scoring
//!
//! Folds anomalies into per-RSU trust scores, quarantines RSUs that fall below
//! the trust floor and slowly rehabilitates RSUs that are left alone.
use crate::error::{Result, SimError};
use crate::trust_ledger::{LedgerReceipt, RsuTrustEntry, TrustLedger};
use crate::types::{Anomaly, DEFAULT_TRUST_SCORE, Rsu, Severity};
use rand::Rng;
use tracing::trace;

/// Below this an RSU is quarantined
pub const QUARANTINE_THRESHOLD: i32 = 30;
/// Recovery stops at this score
pub const RECOVERY_CEILING: i32 = 90;
/// Recovering RSUs at or above this score clear `attack_detected`
pub const ATTACK_CLEAR_THRESHOLD: i32 = 60;
/// A single-cycle drop at least this large is anchored on the ledger
pub const BLOCKCHAIN_DROP_THRESHOLD: i32 = -20;

/// Attack types produced by synthetic generation
pub const RSU_ATTACK_TYPES: [&str; 5] = [
    "Sybil Attack",
    "Denial of Service",
    "GPS Spoofing",
    "Malicious Data Injection",
    "Replay Attack",
];

const UNKNOWN_ATTACK: &str = "Unknown Attack";
const UNKNOWN_RSU: &str = "RSU-unknown";

/// Trust points removed for (attack type, severity), ordered Critical, High,
/// Medium, Low
fn impact_row(attack_type: &str) -> [i32; 4] {
    match attack_type {
        "Sybil Attack" => [40, 30, 20, 10],
        "Denial of Service" => [50, 35, 25, 15],
        "GPS Spoofing" => [45, 30, 20, 10],
        "Malicious Data Injection" => [40, 30, 20, 10],
        "Replay Attack" => [35, 25, 15, 5],
        _ => [40, 30, 20, 10],
    }
}

/// Trust left after one attack. Unknown types use the default row and
/// unknown severities score as Medium. Result is within 0..=100.
pub fn calculate_rsu_trust_after_attack(current_trust: i32, attack_type: &str, severity: &str) -> i32 {
    let row = impact_row(attack_type);
    let impact = match Severity::parse(severity).unwrap_or(Severity::Medium) {
        Severity::Critical => row[0],
        Severity::High => row[1],
        Severity::Medium => row[2],
        Severity::Low => row[3],
    };
    current_trust.saturating_sub(impact).clamp(0, 100)
}

/// Loose match between an anomaly and an RSU: exact id on either target
/// field, or the id appearing as a whole token in the free-text description.
/// `RSU-10` in the text does not match `RSU-1`.
pub fn anomaly_targets_rsu(anomaly: &Anomaly, rsu_id: &str) -> bool {
    if rsu_id.is_empty() {
        return false;
    }

    anomaly.target_id.as_deref() == Some(rsu_id)
        || anomaly.rsu_id.as_deref() == Some(rsu_id)
        || [anomaly.message.as_deref(), anomaly.details.as_deref()]
            .into_iter()
            .flatten()
            .any(|text| mentions_id(text, rsu_id))
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True if `id` occurs in `text` with no id characters on either side
fn mentions_id(text: &str, id: &str) -> bool {
    text.match_indices(id).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + id.len()..].chars().next();
        !before.is_some_and(is_id_char) && !after.is_some_and(is_id_char)
    })
}

/// Return updated copies of `rsus` with this cycle's anomalies applied.
///
/// Matched RSUs compound every matching anomaly, get `attack_detected`, and
/// are quarantined below the threshold. Quarantine is never cleared here.
/// Unmatched, unquarantined RSUs below the ceiling recover 1-3 points.
pub fn update_rsu_trust_scores<R: Rng + ?Sized>(
    rsus: &[Rsu],
    anomalies: &[Anomaly],
    rng: &mut R,
) -> Vec<Rsu> {
    rsus.iter()
        .map(|rsu| {
            let mut rsu = rsu.clone();
            if !rsu.has_id() {
                return rsu;
            }

            let current = rsu.trust();
            let related: Vec<&Anomaly> = anomalies
                .iter()
                .filter(|a| anomaly_targets_rsu(a, &rsu.rsu_id))
                .collect();

            if !related.is_empty() {
                let new_trust = related.iter().fold(current, |trust, anomaly| {
                    let attack_type = if anomaly.anomaly_type.is_empty() {
                        UNKNOWN_ATTACK
                    } else {
                        anomaly.anomaly_type.as_str()
                    };
                    calculate_rsu_trust_after_attack(trust, attack_type, &anomaly.severity)
                });
                let change = new_trust - current;

                trace!(rsu = %rsu.rsu_id, anomalies = related.len(), from = current, to = new_trust, "trust lowered");

                rsu.attack_detected = true;
                rsu.trust_score = Some(new_trust);
                rsu.trust_score_change = Some(change);
                if new_trust < QUARANTINE_THRESHOLD {
                    rsu.quarantined = true;
                }
                if change <= BLOCKCHAIN_DROP_THRESHOLD {
                    rsu.blockchain_protected = true;
                }
            } else if current < RECOVERY_CEILING && !rsu.quarantined {
                let new_trust = (current + rng.gen_range(1..=3)).min(RECOVERY_CEILING);
                rsu.trust_score = Some(new_trust);
                rsu.trust_score_change = Some(new_trust - current);
                if new_trust >= ATTACK_CLEAR_THRESHOLD {
                    rsu.attack_detected = false;
                }
            } else {
                rsu.trust_score = Some(current);
                rsu.trust_score_change = Some(0);
            }

            rsu
        })
        .collect()
}

/// Synthetic anomaly generation: one Bernoulli trial per RSU.
///
/// Uses its own drop ranges per severity, independent of the impact table.
pub fn generate_rsu_attacks<R: Rng + ?Sized>(
    rsus: &[Rsu],
    probability: f64,
    rng: &mut R,
) -> Vec<Anomaly> {
    let probability = if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut attacks = Vec::new();
    for rsu in rsus.iter().filter(|r| r.has_id()) {
        if !rng.gen_bool(probability) {
            continue;
        }

        let attack_type = RSU_ATTACK_TYPES[rng.gen_range(0..RSU_ATTACK_TYPES.len())];
        let severity = Severity::ALL[rng.gen_range(0..Severity::ALL.len())];

        let old_trust = rsu.trust();
        let drop = match severity {
            Severity::Critical => rng.gen_range(20.0..50.0),
            Severity::High => rng.gen_range(10.0..30.0),
            Severity::Medium => rng.gen_range(5.0..15.0),
            Severity::Low => rng.gen_range(1.0..6.0),
        };
        let new_trust = (old_trust as f64 - drop).max(0.0).round() as i32;

        let id = &rsu.rsu_id;
        let details = match rng.gen_range(0..5) {
            0 => format!(
                "{} detected on {} with {} severity",
                attack_type,
                id,
                severity.as_str().to_lowercase()
            ),
            1 => format!("Security alert: {} targeting {}", attack_type, id),
            2 => format!("{} alert: {} affecting {}", severity, attack_type, id),
            3 => format!("{} compromised by {}", id, attack_type),
            _ => format!("Network integrity breach: {} on {}", attack_type, id),
        };

        let mut anomaly = Anomaly::new(attack_type, severity.as_str()).with_details(details);
        anomaly.rsu_id = Some(id.clone());
        anomaly.target_type = Some("RSU".to_string());
        anomaly.old_trust = Some(old_trust);
        anomaly.new_trust = Some(new_trust);
        attacks.push(anomaly);
    }

    attacks
}

/// Whether an anomaly concerns an RSU at all
pub fn is_rsu_anomaly(anomaly: &Anomaly) -> bool {
    anomaly.target_type.as_deref() == Some("RSU")
        || anomaly.target().is_some_and(|t| t.contains("RSU"))
        || anomaly
            .text()
            .is_some_and(|t| t.to_lowercase().contains("rsu"))
}

/// Ledger entries for the RSU-related anomalies, filling gaps with defaults
pub fn rsu_attack_entries(anomalies: &[Anomaly]) -> Vec<RsuTrustEntry> {
    anomalies
        .iter()
        .filter(|a| is_rsu_anomaly(a))
        .map(|anomaly| {
            let severity = if anomaly.severity.is_empty() {
                Severity::Medium.as_str().to_string()
            } else {
                anomaly.severity.clone()
            };
            let old_trust = anomaly.old_trust.unwrap_or(DEFAULT_TRUST_SCORE);
            let new_trust = anomaly.new_trust.unwrap_or_else(|| {
                let drop = match Severity::parse(&severity) {
                    Some(Severity::Critical) => 30,
                    Some(Severity::High) => 20,
                    Some(Severity::Medium) => 10,
                    Some(Severity::Low) => 5,
                    None => 0,
                };
                old_trust.saturating_sub(drop).max(0)
            });

            RsuTrustEntry {
                rsu_id: anomaly.target().unwrap_or(UNKNOWN_RSU).to_string(),
                attack_type: if anomaly.anomaly_type.is_empty() {
                    UNKNOWN_ATTACK.to_string()
                } else {
                    anomaly.anomaly_type.clone()
                },
                severity,
                details: anomaly.text().map(str::to_string).unwrap_or_else(|| {
                    format!("Attack detected on {}", anomaly.target().unwrap_or("RSU"))
                }),
                old_trust,
                new_trust,
            }
        })
        .collect()
}

/// Write every RSU-related anomaly to the ledger, stopping at the first
/// rejected write.
pub fn record_rsu_attacks(anomalies: &[Anomaly], ledger: &dyn TrustLedger) -> Result<Vec<LedgerReceipt>> {
    rsu_attack_entries(anomalies)
        .into_iter()
        .map(|entry| ledger.record(entry).map_err(SimError::from))
        .collect()
}
