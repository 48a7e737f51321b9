pub mod attack_sim;
pub mod config;
pub mod error;
pub mod events;
pub mod network;
pub mod trust_ledger;
pub mod trust_scoring;
pub mod types;

pub use attack_sim::{AttackEvent, AttackSimulationEngine, SimulationStats};
pub use config::{OptionsUpdate, SimulationOptions};
pub use error::{Result, SimError};
pub use events::SimulationEvent;
pub use network::{NetworkStats, NetworkTopology};
pub use trust_ledger::{InMemoryLedger, LedgerError, TrustLedger};
pub use types::{Anomaly, GeoPoint, Rsu, Severity};
