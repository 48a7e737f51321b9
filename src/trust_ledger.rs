//! RSU Trust Ledger
//!
//! Write-only sink for significant RSU trust changes. The production ledger is
//! an external service; `InMemoryLedger` keeps a hash-chained copy so a
//! tampered or reordered history is detectable.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

/// One trust change destined for the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsuTrustEntry {
    pub rsu_id: String,
    pub attack_type: String,
    pub severity: String,
    pub details: String,
    pub old_trust: i32,
    pub new_trust: i32,
}

/// Acknowledgement returned by a ledger write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub sequence: u64,
    pub entry_hash: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger rejected entry for {rsu_id}: {reason}")]
    Rejected { rsu_id: String, reason: String },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Opaque ledger-write collaborator
pub trait TrustLedger: Send + Sync {
    fn record(&self, entry: RsuTrustEntry) -> Result<LedgerReceipt, LedgerError>;
}

/// A chained ledger record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub entry: RsuTrustEntry,
    /// Hash of the previous record (empty for the first)
    pub prev_hash: String,
    pub entry_hash: String,
}

impl LedgerRecord {
    fn new(sequence: u64, entry: RsuTrustEntry, prev_hash: String) -> Self {
        let timestamp = Utc::now();
        let entry_hash = compute_hash(sequence, &timestamp, &entry, &prev_hash);
        Self {
            sequence,
            timestamp,
            entry,
            prev_hash,
            entry_hash,
        }
    }

    pub fn verify_hash(&self) -> bool {
        compute_hash(self.sequence, &self.timestamp, &self.entry, &self.prev_hash)
            == self.entry_hash
    }

    pub fn follows(&self, prev: &LedgerRecord) -> bool {
        self.prev_hash == prev.entry_hash && self.sequence == prev.sequence + 1
    }

    fn receipt(&self) -> LedgerReceipt {
        LedgerReceipt {
            sequence: self.sequence,
            entry_hash: self.entry_hash.clone(),
            timestamp: self.timestamp,
        }
    }
}

fn compute_hash(
    sequence: u64,
    timestamp: &DateTime<Utc>,
    entry: &RsuTrustEntry,
    prev_hash: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(timestamp.to_rfc3339().as_bytes());
    hasher.update(serde_json::to_string(entry).unwrap_or_default().as_bytes());
    hasher.update(prev_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash-chained in-process ledger. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    records: Arc<Mutex<Vec<LedgerRecord>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<LedgerRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Check every record's hash and its link to the one before it
    pub fn verify_chain(&self) -> bool {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().all(LedgerRecord::verify_hash)
            && records.windows(2).all(|w| w[1].follows(&w[0]))
            && records.first().is_none_or(|r| r.prev_hash.is_empty())
    }
}

impl TrustLedger for InMemoryLedger {
    fn record(&self, entry: RsuTrustEntry) -> Result<LedgerReceipt, LedgerError> {
        if entry.rsu_id.is_empty() {
            return Err(LedgerError::Rejected {
                rsu_id: entry.rsu_id,
                reason: "missing RSU id".to_string(),
            });
        }

        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let (sequence, prev_hash) = records
            .last()
            .map(|r| (r.sequence + 1, r.entry_hash.clone()))
            .unwrap_or((0, String::new()));

        let record = LedgerRecord::new(sequence, entry, prev_hash);
        let receipt = record.receipt();
        records.push(record);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rsu_id: &str) -> RsuTrustEntry {
        RsuTrustEntry {
            rsu_id: rsu_id.to_string(),
            attack_type: "Sybil Attack".to_string(),
            severity: "High".to_string(),
            details: format!("Sybil Attack detected on {}", rsu_id),
            old_trust: 85,
            new_trust: 65,
        }
    }

    #[test]
    fn test_records_are_chained() {
        let ledger = InMemoryLedger::new();
        let first = ledger.record(entry("RSU-1")).unwrap();
        let second = ledger.record(entry("RSU-2")).unwrap();

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);

        let records = ledger.entries();
        assert!(records[0].prev_hash.is_empty());
        assert_eq!(records[1].prev_hash, first.entry_hash);
        assert!(ledger.verify_chain());
    }

    #[test]
    fn test_tampering_breaks_chain() {
        let ledger = InMemoryLedger::new();
        ledger.record(entry("RSU-1")).unwrap();
        ledger.record(entry("RSU-2")).unwrap();

        ledger.records.lock().unwrap()[0].entry.new_trust = 80;
        assert!(!ledger.verify_chain());
    }

    #[test]
    fn test_missing_rsu_id_is_rejected() {
        let ledger = InMemoryLedger::new();
        let err = ledger.record(entry("")).unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { .. }));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let ledger = InMemoryLedger::new();
        let handle = ledger.clone();
        handle.record(entry("RSU-9")).unwrap();
        assert_eq!(ledger.len(), 1);
    }
}
