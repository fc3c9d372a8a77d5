use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CronError, Result};

/// One ledger entry, keyed by job id.
///
/// Created on submission, `audited` flipped by the reconciler once the job's
/// outcome has been recorded, deleted by the reconciler after the retention
/// window has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub time_created: DateTime<Utc>,
    pub audited: bool,
}

impl JobRecord {
    pub fn new(time_created: DateTime<Utc>) -> Self {
        Self {
            time_created,
            audited: false,
        }
    }
}

/// The durable record of recently submitted jobs.
///
/// Persisted as a single JSON object mapping job id to record. Read wholesale
/// at the start of every run and rewritten wholesale at the end; there is no
/// incremental merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeMap<String, JobRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted ledger document. An unparseable document is a fatal
    /// condition: the run must abort without touching ledger state.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let entries: BTreeMap<String, JobRecord> = serde_json::from_slice(bytes)
            .map_err(|e| CronError::LedgerCorruption(e.to_string()))?;
        Ok(Self { entries })
    }

    pub fn encode(&self) -> Vec<u8> {
        // BTreeMap keys give a stable serialization order for diffing.
        serde_json::to_vec_pretty(&self.entries).unwrap_or_default()
    }

    pub fn insert(&mut self, job_id: impl Into<String>, record: JobRecord) {
        self.entries.insert(job_id.into(), record);
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.entries.get(job_id)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.entries.contains_key(job_id)
    }

    /// Mark an entry audited. Audited is monotonic: there is no way back.
    pub fn mark_audited(&mut self, job_id: &str) -> bool {
        if let Some(record) = self.entries.get_mut(job_id) {
            record.audited = true;
            true
        } else {
            false
        }
    }

    /// Job ids whose outcome has not been recorded yet.
    pub fn unaudited_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, r)| !r.audited)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Delete entries older than the retention window, but only once their
    /// outcome has been recorded. An un-audited entry is never deleted, no
    /// matter its age. Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, r| !(r.audited && now - r.time_created > retention));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobRecord)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn parse_round_trip() {
        let raw = br#"{"job-1": {"timeCreated": "2024-01-01T00:00:00Z", "audited": false}}"#;
        let ledger = Ledger::parse(raw).unwrap();
        assert_eq!(ledger.len(), 1);
        let record = ledger.get("job-1").unwrap();
        assert_eq!(record.time_created, ts("2024-01-01T00:00:00Z"));
        assert!(!record.audited);

        let reparsed = Ledger::parse(&ledger.encode()).unwrap();
        assert_eq!(reparsed, ledger);
    }

    #[test]
    fn parse_empty_document() {
        let ledger = Ledger::parse(b"{}").unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn parse_garbage_is_corruption() {
        let err = Ledger::parse(b"not json at all").unwrap_err();
        assert!(matches!(err, CronError::LedgerCorruption(_)));
    }

    #[test]
    fn mark_audited_is_monotonic() {
        let mut ledger = Ledger::new();
        ledger.insert("job-1", JobRecord::new(Utc::now()));
        assert!(ledger.mark_audited("job-1"));
        assert!(ledger.get("job-1").unwrap().audited);
        assert!(!ledger.mark_audited("missing"));
    }

    #[test]
    fn unaudited_ids_only() {
        let mut ledger = Ledger::new();
        ledger.insert("a", JobRecord::new(Utc::now()));
        ledger.insert("b", JobRecord::new(Utc::now()));
        ledger.mark_audited("a");
        assert_eq!(ledger.unaudited_ids(), vec!["b".to_string()]);
    }

    #[test]
    fn purge_removes_old_audited_entries() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let mut ledger = Ledger::new();
        ledger.insert("old", JobRecord::new(now - Duration::days(8)));
        ledger.mark_audited("old");
        ledger.insert("fresh", JobRecord::new(now - Duration::days(1)));
        ledger.mark_audited("fresh");

        let removed = ledger.purge_expired(now, Duration::days(7));
        assert_eq!(removed, 1);
        assert!(!ledger.contains("old"));
        assert!(ledger.contains("fresh"));
    }

    #[test]
    fn purge_never_removes_unaudited_entries() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let mut ledger = Ledger::new();
        ledger.insert("stale", JobRecord::new(now - Duration::days(30)));

        let removed = ledger.purge_expired(now, Duration::days(7));
        assert_eq!(removed, 0);
        assert!(ledger.contains("stale"));
    }
}
