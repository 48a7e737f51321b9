use crate::trust_ledger::LedgerError;
use std::path::PathBuf;

/// Failures surfaced by the simulation crate.
///
/// The tick itself never fails; these cover the host-facing edges only.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("no tokio runtime is available to drive the simulation timer")]
    RuntimeUnavailable,

    #[error("failed to read configuration file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("trust ledger write failed: {0}")]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, SimError>;
