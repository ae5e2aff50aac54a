use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AlertCategory, AlertPriority};
use crate::alerts::AlertError;

/// Lifecycle state. Expiry is a derived property, not a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertState {
    Active,
    Acknowledged,
}

/// Fields supplied by whatever process raises an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub patient_id: String,
    pub patient_name: String,
    pub priority: AlertPriority,
    pub category: AlertCategory,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// A time-bounded, acknowledgeable notification about one patient.
///
/// Priority and category are fixed at creation. The only mutation is
/// [`Alert::acknowledge`], which moves `Active -> Acknowledged` once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AlertRecord")]
pub struct Alert {
    id: String,
    patient_id: String,
    patient_name: String,
    priority: AlertPriority,
    category: AlertCategory,
    title: String,
    description: String,
    recommendations: Vec<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    acknowledged: bool,
    acknowledged_at: Option<DateTime<Utc>>,
}

/// Wire shape used to validate alerts coming from outside the crate.
#[derive(Deserialize)]
struct AlertRecord {
    id: String,
    patient_id: String,
    patient_name: String,
    priority: AlertPriority,
    category: AlertCategory,
    title: String,
    description: String,
    #[serde(default)]
    recommendations: Vec<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    acknowledged: bool,
    #[serde(default)]
    acknowledged_at: Option<DateTime<Utc>>,
}

impl TryFrom<AlertRecord> for Alert {
    type Error = AlertError;

    fn try_from(record: AlertRecord) -> Result<Self, Self::Error> {
        let mut alert = Alert::with_id(
            record.id,
            NewAlert {
                patient_id: record.patient_id,
                patient_name: record.patient_name,
                priority: record.priority,
                category: record.category,
                title: record.title,
                description: record.description,
                recommendations: record.recommendations,
            },
            record.created_at,
            record.expires_at,
        )?;
        if record.acknowledged {
            alert.acknowledged = true;
            alert.acknowledged_at = record.acknowledged_at;
        }
        Ok(alert)
    }
}

impl Alert {
    /// Create an active alert with a fresh opaque id.
    pub fn new(
        new: NewAlert,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, AlertError> {
        Self::with_id(Uuid::new_v4().to_string(), new, created_at, expires_at)
    }

    /// Create an active alert with a caller-chosen id.
    pub fn with_id(
        id: impl Into<String>,
        new: NewAlert,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, AlertError> {
        let id = id.into();
        if expires_at <= created_at {
            return Err(AlertError::InvalidExpiry {
                alert_id: id,
                created_at,
                expires_at,
            });
        }

        Ok(Self {
            id,
            patient_id: new.patient_id,
            patient_name: new.patient_name,
            priority: new.priority,
            category: new.category,
            title: new.title,
            description: new.description,
            recommendations: new.recommendations,
            created_at,
            expires_at,
            acknowledged: false,
            acknowledged_at: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn patient_name(&self) -> &str {
        &self.patient_name
    }

    pub fn priority(&self) -> AlertPriority {
        self.priority
    }

    pub fn category(&self) -> AlertCategory {
        self.category
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        self.acknowledged_at
    }

    pub fn state(&self) -> AlertState {
        if self.acknowledged {
            AlertState::Acknowledged
        } else {
            AlertState::Active
        }
    }

    /// Past `expires_at`. Advisory only: expired alerts stay in the feed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Acknowledge the alert. Returns true if this call changed state;
    /// a second call is a no-op and keeps the original timestamp.
    pub fn acknowledge(&mut self, at: DateTime<Utc>) -> bool {
        if self.acknowledged {
            return false;
        }
        self.acknowledged = true;
        self.acknowledged_at = Some(at);
        true
    }
}
