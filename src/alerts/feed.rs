//! Pure filtering, counting and partitioning over a caller-owned snapshot
//! of alerts. Nothing here caches or shares the collection.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Alert, AlertFilter, AlertPriority, CategoryFilter, PriorityFilter};

use super::AlertError;

fn matches_text(alert: &Alert, needle_lower: &str) -> bool {
    alert.patient_name().to_lowercase().contains(needle_lower)
        || alert.title().to_lowercase().contains(needle_lower)
        || alert.description().to_lowercase().contains(needle_lower)
}

fn matches_priority(alert: &Alert, filter: PriorityFilter) -> bool {
    match filter {
        PriorityFilter::All => true,
        PriorityFilter::Only(p) => alert.priority() == p,
    }
}

fn matches_category(alert: &Alert, filter: CategoryFilter) -> bool {
    match filter {
        CategoryFilter::All => true,
        CategoryFilter::Only(c) => alert.category() == c,
    }
}

/// Case-insensitive substring match on patient name, title or description.
/// An empty query matches everything.
pub fn filter_by_text<'a>(alerts: &'a [Alert], query: &str) -> Vec<&'a Alert> {
    if query.is_empty() {
        return alerts.iter().collect();
    }
    let needle = query.to_lowercase();
    alerts.iter().filter(|a| matches_text(a, &needle)).collect()
}

pub fn filter_by_priority(alerts: &[Alert], filter: PriorityFilter) -> Vec<&Alert> {
    alerts.iter().filter(|a| matches_priority(a, filter)).collect()
}

pub fn filter_by_category(alerts: &[Alert], filter: CategoryFilter) -> Vec<&Alert> {
    alerts.iter().filter(|a| matches_category(a, filter)).collect()
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        let text_ok = match self.query.as_deref() {
            None | Some("") => true,
            Some(q) => matches_text(alert, &q.to_lowercase()),
        };
        text_ok && matches_priority(alert, self.priority) && matches_category(alert, self.category)
    }

    /// Alerts satisfying every criterion, in input order.
    pub fn apply<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts.iter().filter(|a| self.matches(a)).collect()
    }
}

/// Unacknowledged alerts of one priority, for the summary tiles.
pub fn count_unacknowledged_by_priority(alerts: &[Alert], priority: AlertPriority) -> usize {
    alerts
        .iter()
        .filter(|a| a.priority() == priority && !a.is_acknowledged())
        .count()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Unacknowledged counts for every priority in one pass.
pub fn summarize(alerts: &[Alert]) -> PriorityCounts {
    let mut counts = PriorityCounts::default();
    for alert in alerts.iter().filter(|a| !a.is_acknowledged()) {
        match alert.priority() {
            AlertPriority::Critical => counts.critical += 1,
            AlertPriority::High => counts.high += 1,
            AlertPriority::Medium => counts.medium += 1,
            AlertPriority::Low => counts.low += 1,
        }
    }
    counts
}

/// Disjoint split of a snapshot by acknowledgment state.
#[derive(Debug, Default, Serialize)]
pub struct Partition<'a> {
    pub active: Vec<&'a Alert>,
    pub acknowledged: Vec<&'a Alert>,
}

impl Partition<'_> {
    pub fn len(&self) -> usize {
        self.active.len() + self.acknowledged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn partition<'a, I>(alerts: I) -> Partition<'a>
where
    I: IntoIterator<Item = &'a Alert>,
{
    let (acknowledged, active) = alerts.into_iter().partition(|a| a.is_acknowledged());
    Partition {
        active,
        acknowledged,
    }
}

/// Acknowledge one alert in a caller-owned collection.
/// `Ok(false)` when it was already acknowledged.
pub fn acknowledge(
    alerts: &mut [Alert],
    alert_id: &str,
    at: DateTime<Utc>,
) -> Result<bool, AlertError> {
    let alert = alerts
        .iter_mut()
        .find(|a| a.id() == alert_id)
        .ok_or_else(|| AlertError::AlertNotFound(alert_id.to_string()))?;

    let changed = alert.acknowledge(at);
    tracing::debug!(alert_id, changed, "Alert acknowledged");
    Ok(changed)
}

pub fn filter_current(alerts: &[Alert], now: DateTime<Utc>) -> Vec<&Alert> {
    alerts.iter().filter(|a| !a.is_expired(now)).collect()
}

pub fn filter_expired(alerts: &[Alert], now: DateTime<Utc>) -> Vec<&Alert> {
    alerts.iter().filter(|a| a.is_expired(now)).collect()
}

/// Unacknowledged first, then Critical..Low, then newest first.
pub fn sort_for_display(alerts: &mut [&Alert]) {
    alerts.sort_by(|a, b| {
        a.is_acknowledged()
            .cmp(&b.is_acknowledged())
            .then_with(|| b.priority().cmp(&a.priority()))
            .then_with(|| b.created_at().cmp(&a.created_at()))
    });
}

/// Alerts for one patient, e.g. for a letter or a patient view.
pub fn for_patient<'a>(alerts: &'a [Alert], patient_id: &str) -> Vec<&'a Alert> {
    alerts.iter().filter(|a| a.patient_id() == patient_id).collect()
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::models::{AlertCategory, NewAlert};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn arb_alert() -> impl Strategy<Value = Alert> {
        (0usize..4, 0usize..5, any::<bool>(), "[a-z]{1,8}").prop_map(|(p, c, ack, name)| {
            let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            let mut alert = Alert::new(
                NewAlert {
                    patient_id: name.clone(),
                    patient_name: name,
                    priority: AlertPriority::ALL[p],
                    category: AlertCategory::ALL[c],
                    title: "t".into(),
                    description: "d".into(),
                    recommendations: vec![],
                },
                created,
                created + Duration::days(1),
            )
            .unwrap();
            if ack {
                alert.acknowledge(created);
            }
            alert
        })
    }

    proptest! {
        /// Every alert lands in exactly one partition
        #[test]
        fn partition_preserves_count(alerts in proptest::collection::vec(arb_alert(), 0..40)) {
            let parts = partition(&alerts);
            prop_assert_eq!(parts.active.len() + parts.acknowledged.len(), alerts.len());
            prop_assert!(parts.acknowledged.iter().all(|a| a.is_acknowledged()));
            prop_assert!(parts.active.iter().all(|a| !a.is_acknowledged()));
        }

        /// Summary tiles agree with per-priority counts
        #[test]
        fn summary_matches_counts(alerts in proptest::collection::vec(arb_alert(), 0..40)) {
            let counts = summarize(&alerts);
            prop_assert_eq!(counts.critical, count_unacknowledged_by_priority(&alerts, AlertPriority::Critical));
            prop_assert_eq!(counts.low, count_unacknowledged_by_priority(&alerts, AlertPriority::Low));
            prop_assert_eq!(counts.total(), partition(&alerts).active.len());
        }
    }
}
