//! Alert generation, the feed queries a dashboard runs over a snapshot,
//! and the letter request handed to the document collaborator.

pub mod feed;
pub mod generator;
pub mod letter;

pub use feed::{
    acknowledge, count_unacknowledged_by_priority, filter_by_category, filter_by_priority,
    filter_by_text, filter_current, filter_expired, for_patient, partition, sort_for_display,
    summarize, Partition, PriorityCounts,
};
pub use generator::{AlertGenerator, PatientRef};
pub use letter::{request_letter, DocumentRenderer, LetterRequest, RenderError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{AlertCategory, AlertPriority};

// ---------------------------------------------------------------------------
// AlertError
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("Alert {alert_id} expires at {expires_at}, not after creation at {created_at}")]
    InvalidExpiry {
        alert_id: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },

    #[error("Expiry window for {priority} {category} alert is out of range")]
    ExpiryOutOfRange {
        priority: AlertPriority,
        category: AlertCategory,
    },

    #[error("Failed to parse alerts ({0}): {1}")]
    Parse(String, String),
}

/// Load an alert snapshot from a JSON array, validating every record.
pub fn load_alerts(source: &str, raw: &str) -> Result<Vec<crate::models::Alert>, AlertError> {
    serde_json::from_str(raw).map_err(|e| AlertError::Parse(source.to_string(), e.to_string()))
}
