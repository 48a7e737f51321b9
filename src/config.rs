//! Simulation Configuration
//!
//! Host-facing knobs for the attack simulation. Field names follow the
//! dashboard's camelCase option object so a saved settings blob loads as-is.
use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ATTACK_FREQUENCY_RANGE: (f64, f64) = (1.0, 30.0);
pub const DEFENSE_LEVEL_RANGE: (f64, f64) = (30.0, 90.0);
pub const ATTACKER_SKILL_RANGE: (f64, f64) = (20.0, 90.0);

const BASE_INTERVAL_MS: f64 = 2000.0;
const MIN_INTERVAL_MS: f64 = 800.0;
const INTERVAL_STEP_MS: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationOptions {
    /// Per-RSU attack chance per tick, in percent
    pub attack_frequency: f64,
    /// Global attacker skill, 50 is neutral
    pub attacker_skill_level: f64,
    /// Network defense, in percent
    pub defense_level: f64,
    pub enable_network_effects: bool,
    pub enable_visualization: bool,
    pub real_time_simulation: bool,
    /// Bootstrap a handful of fake attacks on start
    pub seed_demo_attacks: bool,
    /// Pool size guaranteed on start
    pub minimum_attackers: usize,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            attack_frequency: 20.0,
            attacker_skill_level: 60.0,
            defense_level: 60.0,
            enable_network_effects: true,
            enable_visualization: true,
            real_time_simulation: true,
            seed_demo_attacks: false,
            minimum_attackers: 5,
        }
    }
}

impl SimulationOptions {
    /// Load options from a JSON file. Missing fields take their defaults and
    /// the result is clamped.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SimError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let options: SimulationOptions = serde_json::from_str(&raw)?;
        Ok(options.clamped())
    }

    /// Force the numeric knobs into their supported ranges
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        self.attack_frequency = clamp_or(
            self.attack_frequency,
            ATTACK_FREQUENCY_RANGE,
            defaults.attack_frequency,
        );
        self.defense_level = clamp_or(self.defense_level, DEFENSE_LEVEL_RANGE, defaults.defense_level);
        self.attacker_skill_level = clamp_or(
            self.attacker_skill_level,
            ATTACKER_SKILL_RANGE,
            defaults.attacker_skill_level,
        );
        self
    }

    pub fn merge(&mut self, update: &OptionsUpdate) {
        if let Some(v) = update.attack_frequency {
            self.attack_frequency = v;
        }
        if let Some(v) = update.attacker_skill_level {
            self.attacker_skill_level = v;
        }
        if let Some(v) = update.defense_level {
            self.defense_level = v;
        }
        if let Some(v) = update.enable_network_effects {
            self.enable_network_effects = v;
        }
        if let Some(v) = update.enable_visualization {
            self.enable_visualization = v;
        }
        if let Some(v) = update.real_time_simulation {
            self.real_time_simulation = v;
        }
        if let Some(v) = update.seed_demo_attacks {
            self.seed_demo_attacks = v;
        }
        if let Some(v) = update.minimum_attackers {
            self.minimum_attackers = v;
        }
        *self = self.clone().clamped();
    }

    /// Tick period: faster with higher frequency, never under 800 ms
    pub fn interval(&self) -> Duration {
        let ms = (BASE_INTERVAL_MS - self.attack_frequency * INTERVAL_STEP_MS).max(MIN_INTERVAL_MS);
        Duration::from_millis(ms as u64)
    }

    /// Per-RSU attack probability for one tick
    pub fn attack_probability(&self) -> f64 {
        self.attack_frequency / 100.0
    }

    pub fn defense_fraction(&self) -> f64 {
        self.defense_level / 100.0
    }

    pub fn skill_fraction(&self) -> f64 {
        self.attacker_skill_level / 100.0
    }
}

fn clamp_or(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Partial options accepted by `update_options`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionsUpdate {
    pub attack_frequency: Option<f64>,
    pub attacker_skill_level: Option<f64>,
    pub defense_level: Option<f64>,
    pub enable_network_effects: Option<bool>,
    pub enable_visualization: Option<bool>,
    pub real_time_simulation: Option<bool>,
    pub seed_demo_attacks: Option<bool>,
    pub minimum_attackers: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_interval_formula() {
        let mut options = SimulationOptions::default();
        assert_eq!(options.interval(), Duration::from_millis(1000));

        options.attack_frequency = 1.0;
        assert_eq!(options.interval(), Duration::from_millis(1950));

        options.attack_frequency = 30.0;
        assert_eq!(options.interval(), Duration::from_millis(800));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut options = SimulationOptions::default();
        options.merge(&OptionsUpdate {
            attack_frequency: Some(500.0),
            defense_level: Some(-10.0),
            attacker_skill_level: Some(f64::NAN),
            ..Default::default()
        });

        assert_eq!(options.attack_frequency, 30.0);
        assert_eq!(options.defense_level, 30.0);
        assert_eq!(options.attacker_skill_level, 60.0);
    }

    #[test]
    fn test_merge_only_touches_given_fields() {
        let mut options = SimulationOptions::default();
        options.merge(&OptionsUpdate {
            enable_network_effects: Some(false),
            ..Default::default()
        });
        assert!(!options.enable_network_effects);
        assert_eq!(options.attack_frequency, 20.0);
        assert!(options.enable_visualization);
    }

    #[test]
    fn test_camel_case_json_with_defaults() {
        let options: SimulationOptions =
            serde_json::from_str(r#"{"attackFrequency": 10, "defenseLevel": 80}"#).unwrap();
        assert_eq!(options.attack_frequency, 10.0);
        assert_eq!(options.defense_level, 80.0);
        assert_eq!(options.minimum_attackers, 5);
        assert!(!options.seed_demo_attacks);

        let update: OptionsUpdate = serde_json::from_str(r#"{"attackerSkillLevel": 40}"#).unwrap();
        assert_eq!(update.attacker_skill_level, Some(40.0));
        assert_eq!(update.attack_frequency, None);
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("rsu_sim_options_{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{"attackFrequency": 99, "seedDemoAttacks": true}}"#).unwrap();
        drop(file);

        let options = SimulationOptions::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(options.attack_frequency, 30.0);
        assert!(options.seed_demo_attacks);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SimulationOptions::from_json_file("/nonexistent/rsu_sim.json").unwrap_err();
        assert!(matches!(err, SimError::ConfigIo { .. }));
        assert!(err.to_string().contains("/nonexistent/rsu_sim.json"));
    }
}
