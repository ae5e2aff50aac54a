//! In-memory cache of patient visit histories.
//!
//! Owned by the caller and passed explicitly; there is no process-wide
//! instance. Entries are refreshed from a [`VisitSource`] once older than
//! the configured TTL.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::history::{SourceError, VisitRecord, VisitSource};

// ═══════════════════════════════════════════════════════════
// CachedHistory: one patient's visits
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct CachedHistory {
    visits: Vec<VisitRecord>,
    loaded_at: DateTime<Utc>,
}

impl CachedHistory {
    pub fn visits(&self) -> &[VisitRecord] {
        &self.visits
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.loaded_at < ttl
    }
}

// ═══════════════════════════════════════════════════════════
// PatientHistoryCache
// ═══════════════════════════════════════════════════════════

pub struct PatientHistoryCache {
    ttl: Duration,
    entries: HashMap<String, CachedHistory>,
}

impl PatientHistoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached visits for `patient_id`, loading from `source` when the entry
    /// is missing or stale. A failed reload leaves the stale entry in place.
    pub fn get_or_load(
        &mut self,
        patient_id: &str,
        source: &dyn VisitSource,
        now: DateTime<Utc>,
    ) -> Result<&[VisitRecord], CacheError> {
        let fresh = self
            .entries
            .get(patient_id)
            .is_some_and(|entry| entry.is_fresh(now, self.ttl));

        if !fresh {
            let visits = source.visits(patient_id)?;
            tracing::debug!(patient_id, visits = visits.len(), "Loaded visit history");
            self.entries.insert(
                patient_id.to_string(),
                CachedHistory {
                    visits,
                    loaded_at: now,
                },
            );
        }

        self.entries
            .get(patient_id)
            .map(CachedHistory::visits)
            .ok_or_else(|| CacheError::NotCached(patient_id.to_string()))
    }

    pub fn get(&self, patient_id: &str) -> Option<&CachedHistory> {
        self.entries.get(patient_id)
    }

    /// Drop one patient's entry. Returns true if it was cached.
    pub fn invalidate(&mut self, patient_id: &str) -> bool {
        self.entries.remove(patient_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove stale entries and return how many were dropped.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(now, ttl));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted stale visit histories");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Visit source error: {0}")]
    Source(#[from] SourceError),
    #[error("Patient {0} is not cached")]
    NotCached(String),
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
