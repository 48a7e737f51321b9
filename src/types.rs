use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trust score assumed for an RSU that has never been scored
pub const DEFAULT_TRUST_SCORE: i32 = 90;

/// Attack severity tiers shared by the catalog, trust scoring and topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// Case-insensitive parse; `None` for anything outside the four tiers
    pub fn parse(value: &str) -> Option<Self> {
        Severity::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::parse(s).ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Roadside unit snapshot.
///
/// Owned by the persistence layer; the engine receives a copy, rewrites trust
/// fields each tick and republishes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsu {
    #[serde(default)]
    pub rsu_id: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_score: Option<i32>,
    /// Signed delta applied by the most recent trust update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_score_change: Option<i32>,
    #[serde(default)]
    pub attack_detected: bool,
    #[serde(default)]
    pub quarantined: bool,
    #[serde(default)]
    pub blockchain_protected: bool,
}

impl Rsu {
    pub fn new(rsu_id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            rsu_id: rsu_id.into(),
            lat,
            lng,
            trust_score: None,
            trust_score_change: None,
            attack_detected: false,
            quarantined: false,
            blockchain_protected: false,
        }
    }

    pub fn with_trust(mut self, trust_score: i32) -> Self {
        self.trust_score = Some(trust_score);
        self
    }

    /// Current trust, falling back to [`DEFAULT_TRUST_SCORE`]
    /// Current trust, clamped to 0..=100 for snapshots loaded from disk
    pub fn trust(&self) -> i32 {
        self.trust_score.unwrap_or(DEFAULT_TRUST_SCORE).clamp(0, 100)
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    pub fn has_id(&self) -> bool {
        !self.rsu_id.is_empty()
    }
}

/// Anomaly record exchanged with the anomaly store.
///
/// Upstream producers disagree on field names (`type` vs `attack_type`,
/// `message` vs `details`, `target_id` vs `rsu_id`), so every alternative is
/// accepted and kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", alias = "attack_type", default)]
    pub anomaly_type: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsu_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    /// Raw severity text; unrecognised values score as Medium
    #[serde(default)]
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_trust: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_trust: Option<i32>,
}

impl Anomaly {
    pub fn new(anomaly_type: impl Into<String>, severity: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            anomaly_type: anomaly_type.into(),
            timestamp: Utc::now(),
            target_id: None,
            rsu_id: None,
            target_type: None,
            severity: severity.into(),
            message: None,
            details: None,
            status: None,
            old_trust: None,
            new_trust: None,
        }
    }

    pub fn targeting(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// First non-empty target reference (`target_id`, then `rsu_id`)
    pub fn target(&self) -> Option<&str> {
        self.target_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.rsu_id.as_deref().filter(|t| !t.is_empty()))
    }

    /// Free-text description (`message`, then `details`)
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.details.as_deref())
    }
}
