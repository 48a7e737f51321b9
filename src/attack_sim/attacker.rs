//! Attacker Model
//!
//! Adversary profiles and the runtime attackers spawned from them. Each
//! attacker picks vectors according to its profile, rolls success and
//! detection independently, and learns from failures against a vector.
use crate::attack_sim::catalog::{self, AttackVector};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Probability of picking from the preferred subset when it is non-empty
const PREFERRED_BIAS: f64 = 0.7;
/// Detection difficulty ceiling for the "easy vector" fallback
const EASY_VECTOR_DIFFICULTY: f64 = 0.3;
/// Cap on the success bonus earned from earlier failures
const MAX_ADAPTATION_BONUS: f64 = 0.3;
/// Attackers above this skill count as high-skill in pool stats
const HIGH_SKILL_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Motivation {
    Financial,
    Disruption,
    DataTheft,
    Research,
    NationState,
}

impl fmt::Display for Motivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Motivation::Financial => write!(f, "Financial"),
            Motivation::Disruption => write!(f, "Disruption"),
            Motivation::DataTheft => write!(f, "Data Theft"),
            Motivation::Research => write!(f, "Research"),
            Motivation::NationState => write!(f, "Nation State"),
        }
    }
}

/// Class of adversary behaviour. All attributes are in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackerProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub skill: f64,
    /// Likelihood of continuing after being detected
    pub persistence: f64,
    pub preferred_vectors: &'static [&'static str],
    pub adaptability: f64,
    pub stealthiness: f64,
    pub resources: f64,
    pub motivation: Motivation,
}

impl AttackerProfile {
    pub fn prefers(&self, vector_id: &str) -> bool {
        self.preferred_vectors.contains(&vector_id)
    }
}

pub static ATTACKER_PROFILES: [AttackerProfile; 4] = [
    AttackerProfile {
        id: "script_kiddie",
        name: "Script Kiddie",
        description: "Uses pre-made tools with limited understanding",
        skill: 0.2,
        persistence: 0.3,
        preferred_vectors: &["ddos", "jamming"],
        adaptability: 0.1,
        stealthiness: 0.1,
        resources: 0.2,
        motivation: Motivation::Disruption,
    },
    AttackerProfile {
        id: "hacktivist",
        name: "Hacktivist",
        description: "Motivated by ideology to disrupt services",
        skill: 0.5,
        persistence: 0.7,
        preferred_vectors: &["ddos", "sybil", "tampering"],
        adaptability: 0.4,
        stealthiness: 0.3,
        resources: 0.4,
        motivation: Motivation::Disruption,
    },
    AttackerProfile {
        id: "cybercriminal",
        name: "Cybercriminal",
        description: "Profit-driven attacker targeting valuable data",
        skill: 0.7,
        persistence: 0.6,
        preferred_vectors: &["mitm", "injection", "replay"],
        adaptability: 0.6,
        stealthiness: 0.6,
        resources: 0.5,
        motivation: Motivation::Financial,
    },
    AttackerProfile {
        id: "apts",
        name: "Advanced Persistent Threat",
        description: "Highly skilled group with significant resources",
        skill: 0.9,
        persistence: 0.9,
        preferred_vectors: &["compromise", "mitm", "injection"],
        adaptability: 0.8,
        stealthiness: 0.9,
        resources: 0.8,
        motivation: Motivation::NationState,
    },
];

pub fn find_profile(id: &str) -> Option<&'static AttackerProfile> {
    ATTACKER_PROFILES.iter().find(|p| p.id == id)
}

/// Environment an attempt is resolved against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackContext {
    /// Network defense level (0-1)
    pub defense_level: f64,
    /// Global attacker skill setting (0-1); 0.5 leaves profile skill unchanged
    pub skill_level: f64,
}

impl Default for AttackContext {
    fn default() -> Self {
        Self {
            defense_level: 0.5,
            skill_level: 0.5,
        }
    }
}

/// Outcome of one attack attempt
#[derive(Debug, Clone)]
pub struct AttackAttempt {
    pub success: bool,
    pub detected: bool,
    pub vector: Option<&'static AttackVector>,
    pub attacker_id: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttackerStats {
    pub profile_id: &'static str,
    pub active_attack_count: usize,
    pub total_successful_attacks: u32,
    pub total_failed_attacks: u32,
}

/// Runtime attacker. Counters only grow until [`Attacker::reset_learning`].
#[derive(Debug, Clone)]
pub struct Attacker {
    profile: &'static AttackerProfile,
    /// target id -> vector currently active against it
    active_attacks: HashMap<String, &'static AttackVector>,
    failed_attempts: HashMap<&'static str, u32>,
    successful_attacks: HashMap<&'static str, u32>,
    last_attack_time: Option<DateTime<Utc>>,
}

impl Attacker {
    pub fn new(profile: &'static AttackerProfile) -> Self {
        Self {
            profile,
            active_attacks: HashMap::new(),
            failed_attempts: HashMap::new(),
            successful_attacks: HashMap::new(),
            last_attack_time: None,
        }
    }

    /// Attacker with the named profile, or a uniformly random one when the id
    /// is missing or unknown
    pub fn spawn<R: Rng + ?Sized>(profile_id: Option<&str>, rng: &mut R) -> Self {
        let profile = profile_id
            .and_then(find_profile)
            .unwrap_or_else(|| &ATTACKER_PROFILES[rng.gen_range(0..ATTACKER_PROFILES.len())]);
        Self::new(profile)
    }

    pub fn profile(&self) -> &'static AttackerProfile {
        self.profile
    }

    pub fn active_attacks(&self) -> &HashMap<String, &'static AttackVector> {
        &self.active_attacks
    }

    pub fn failed_attempts(&self, vector_id: &str) -> u32 {
        self.failed_attempts.get(vector_id).copied().unwrap_or(0)
    }

    pub fn successful_attacks(&self, vector_id: &str) -> u32 {
        self.successful_attacks.get(vector_id).copied().unwrap_or(0)
    }

    pub fn last_attack_time(&self) -> Option<DateTime<Utc>> {
        self.last_attack_time
    }

    /// Pick a vector suited to this attacker, or `None` if nothing fits
    pub fn select_attack_vector<R: Rng + ?Sized>(
        &self,
        compromised_rsu_ids: &[String],
        rng: &mut R,
    ) -> Option<&'static AttackVector> {
        let can_use_advanced = !compromised_rsu_ids.is_empty();
        let profile = self.profile;

        let mut available: Vec<&'static AttackVector> = catalog::all_vectors()
            .iter()
            .filter(|v| can_use_advanced || !v.requires_compromised_rsu)
            .filter(|v| {
                profile.prefers(v.id)
                    || (v.detection_difficulty <= profile.skill
                        && v.success_probability <= profile.resources)
            })
            .collect();

        if available.is_empty() {
            available = catalog::all_vectors()
                .iter()
                .filter(|v| {
                    !v.requires_compromised_rsu && v.detection_difficulty <= EASY_VECTOR_DIFFICULTY
                })
                .collect();
        }

        if available.is_empty() {
            return None;
        }

        let preferred: Vec<&'static AttackVector> = available
            .iter()
            .copied()
            .filter(|v| profile.prefers(v.id))
            .collect();

        if !preferred.is_empty() && rng.gen_bool(PREFERRED_BIAS) {
            return Some(preferred[rng.gen_range(0..preferred.len())]);
        }

        Some(available[rng.gen_range(0..available.len())])
    }

    /// Skill after applying the global skill setting
    pub fn effective_skill(&self, ctx: &AttackContext) -> f64 {
        clamp_unit(self.profile.skill * ctx.skill_level / 0.5)
    }

    pub fn success_probability(&self, vector: &AttackVector, ctx: &AttackContext) -> f64 {
        let defense = clamp_unit(ctx.defense_level);
        let mut p = vector.success_probability;
        p *= 0.5 + self.effective_skill(ctx) * 0.5;
        p *= 1.0 - defense * 0.8;

        let previous_fails = self.failed_attempts(vector.id);
        if previous_fails > 0 {
            let bonus = (previous_fails as f64 * 0.05 * self.profile.adaptability)
                .min(MAX_ADAPTATION_BONUS);
            p += bonus;
        }
        clamp_unit(p)
    }

    pub fn detection_probability(&self, vector: &AttackVector, ctx: &AttackContext) -> f64 {
        let defense = clamp_unit(ctx.defense_level);
        let mut p = 1.0 - vector.detection_difficulty;
        p *= 0.3 + defense * 0.7;
        p *= 1.0 - self.profile.stealthiness * 0.8;
        clamp_unit(p)
    }

    /// Select a vector and attempt it against `target_id`
    pub fn attempt_attack<R: Rng + ?Sized>(
        &mut self,
        target_id: &str,
        compromised_rsu_ids: &[String],
        ctx: &AttackContext,
        rng: &mut R,
    ) -> AttackAttempt {
        match self.select_attack_vector(compromised_rsu_ids, rng) {
            Some(vector) => self.attempt_with_vector(target_id, vector, ctx, rng),
            None => AttackAttempt {
                success: false,
                detected: false,
                vector: None,
                attacker_id: self.profile.id,
            },
        }
    }

    /// Attempt a specific vector. Success and detection are independent draws.
    pub fn attempt_with_vector<R: Rng + ?Sized>(
        &mut self,
        target_id: &str,
        vector: &'static AttackVector,
        ctx: &AttackContext,
        rng: &mut R,
    ) -> AttackAttempt {
        let success = rng.gen_bool(self.success_probability(vector, ctx));
        let detected = rng.gen_bool(self.detection_probability(vector, ctx));

        if success {
            *self.successful_attacks.entry(vector.id).or_insert(0) += 1;
            self.active_attacks.insert(target_id.to_string(), vector);
        } else {
            *self.failed_attempts.entry(vector.id).or_insert(0) += 1;
        }
        self.last_attack_time = Some(Utc::now());

        AttackAttempt {
            success,
            detected,
            vector: Some(vector),
            attacker_id: self.profile.id,
        }
    }

    /// Persistence roll: does the attacker keep going after detection?
    pub fn continue_after_detection<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(clamp_unit(self.profile.persistence))
    }

    pub fn stats(&self) -> AttackerStats {
        AttackerStats {
            profile_id: self.profile.id,
            active_attack_count: self.active_attacks.len(),
            total_successful_attacks: self.successful_attacks.values().sum(),
            total_failed_attacks: self.failed_attempts.values().sum(),
        }
    }

    pub fn reset_learning(&mut self) {
        self.active_attacks.clear();
        self.failed_attempts.clear();
        self.successful_attacks.clear();
        self.last_attack_time = None;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolStats {
    pub attacker_count: usize,
    pub attackers_by_motivation: BTreeMap<String, usize>,
    pub total_active_attacks: usize,
    pub high_skill_attacker_count: usize,
}

/// Exclusive owner of the simulation's attackers
#[derive(Debug, Clone, Default)]
pub struct AttackerPool {
    attackers: Vec<Attacker>,
}

impl AttackerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool of `count` attackers with random profiles
    pub fn with_random<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut pool = Self::new();
        for _ in 0..count {
            pool.add_attacker(None, rng);
        }
        pool
    }

    pub fn len(&self) -> usize {
        self.attackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attackers.is_empty()
    }

    pub fn attackers(&self) -> &[Attacker] {
        &self.attackers
    }

    pub fn add_attacker<R: Rng + ?Sized>(&mut self, profile_id: Option<&str>, rng: &mut R) {
        self.attackers.push(Attacker::spawn(profile_id, rng));
    }

    /// Remove and return the attacker at `index`; out-of-range is a no-op
    pub fn remove_attacker(&mut self, index: usize) -> Option<Attacker> {
        (index < self.attackers.len()).then(|| self.attackers.remove(index))
    }

    pub fn clear(&mut self) {
        self.attackers.clear();
    }

    /// Top the pool up to `minimum` attackers; returns how many were added
    pub fn ensure_minimum<R: Rng + ?Sized>(&mut self, minimum: usize, rng: &mut R) -> usize {
        let missing = minimum.saturating_sub(self.attackers.len());
        for _ in 0..missing {
            self.add_attacker(None, rng);
        }
        missing
    }

    pub fn random_attacker_mut<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&mut Attacker> {
        if self.attackers.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.attackers.len());
        self.attackers.get_mut(index)
    }

    pub fn reset_learning(&mut self) {
        for attacker in &mut self.attackers {
            attacker.reset_learning();
        }
    }

    pub fn pool_stats(&self) -> PoolStats {
        let mut attackers_by_motivation = BTreeMap::new();
        for attacker in &self.attackers {
            *attackers_by_motivation
                .entry(attacker.profile.motivation.to_string())
                .or_insert(0) += 1;
        }

        PoolStats {
            attacker_count: self.attackers.len(),
            attackers_by_motivation,
            total_active_attacks: self.attackers.iter().map(|a| a.active_attacks.len()).sum(),
            high_skill_attacker_count: self
                .attackers
                .iter()
                .filter(|a| a.profile.skill > HIGH_SKILL_THRESHOLD)
                .count(),
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
