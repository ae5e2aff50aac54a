use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clinical::metrics::{EgfrEquation, CKD_EPI_2009_RACE_COEFFICIENT};
use crate::models::{AlertCategory, AlertPriority};

/// Application-level constants
pub const APP_NAME: &str = "ckd-sentinel";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest accepted alert lifetime or decline window (about 100 years).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Longest accepted patient history cache TTL (one year).
pub const MAX_CACHE_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "ckd_sentinel_lib=info,ckd_sentinel=info,warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Read(String, String),

    #[error("Failed to parse config {0}: {1}")]
    Parse(String, String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which creatinine equation variant to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EgfrVariant {
    /// CKD-EPI 2009 with the race coefficient applied.
    #[default]
    #[serde(rename = "ckd_epi_2009")]
    CkdEpi2009,
    /// CKD-EPI 2009 constants without any race adjustment.
    #[serde(rename = "ckd_epi_2009_race_free")]
    CkdEpi2009RaceFree,
}

/// Alert lifetimes in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertExpiry {
    pub critical_days: i64,
    pub high_days: i64,
    pub medium_days: i64,
    pub low_days: i64,
    /// Overrides the priority window for prediction alerts.
    pub prediction_days: i64,
}

impl Default for AlertExpiry {
    fn default() -> Self {
        Self {
            critical_days: 7,
            high_days: 14,
            medium_days: 30,
            low_days: 30,
            prediction_days: 90,
        }
    }
}

impl AlertExpiry {
    pub fn window(&self, priority: AlertPriority, category: AlertCategory) -> chrono::Duration {
        let days = match (category, priority) {
            (AlertCategory::Prediction, _) => self.prediction_days,
            (_, AlertPriority::Critical) => self.critical_days,
            (_, AlertPriority::High) => self.high_days,
            (_, AlertPriority::Medium) => self.medium_days,
            (_, AlertPriority::Low) => self.low_days,
        };
        chrono::Duration::try_days(days).unwrap_or(chrono::Duration::MAX)
    }

    fn all_days(&self) -> [i64; 5] {
        [
            self.critical_days,
            self.high_days,
            self.medium_days,
            self.low_days,
            self.prediction_days,
        ]
    }
}

/// Lower bounds of the prediction probability bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionBands {
    pub moderate: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for PredictionBands {
    fn default() -> Self {
        Self {
            moderate: 0.25,
            high: 0.5,
            very_high: 0.75,
        }
    }
}

/// Thresholds for flagging a rapid eGFR decline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclineThresholds {
    /// mL/min/1.73m².
    pub absolute_drop: f64,
    /// Fraction of the baseline, 0.25 = 25 %.
    pub relative_drop: f64,
    pub window_days: i64,
}

impl Default for DeclineThresholds {
    fn default() -> Self {
        Self {
            absolute_drop: 15.0,
            relative_drop: 0.25,
            window_days: 90,
        }
    }
}

/// Engine settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub egfr_variant: EgfrVariant,
    pub race_coefficient: f64,
    pub alert_expiry: AlertExpiry,
    pub prediction_bands: PredictionBands,
    pub rapid_decline: DeclineThresholds,
    pub cache_ttl_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            egfr_variant: EgfrVariant::default(),
            race_coefficient: CKD_EPI_2009_RACE_COEFFICIENT,
            alert_expiry: AlertExpiry::default(),
            prediction_bands: PredictionBands::default(),
            rapid_decline: DeclineThresholds::default(),
            cache_ttl_secs: 900,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), variant = ?config.egfr_variant, "Loaded engine config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.race_coefficient.is_finite() && self.race_coefficient > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "race_coefficient must be positive, got {}",
                self.race_coefficient
            )));
        }
        if self
            .alert_expiry
            .all_days()
            .iter()
            .any(|d| !(1..=MAX_WINDOW_DAYS).contains(d))
        {
            return Err(ConfigError::Invalid(format!(
                "alert expiry windows must be between 1 and {MAX_WINDOW_DAYS} days"
            )));
        }
        let b = &self.prediction_bands;
        if !(0.0 < b.moderate && b.moderate < b.high && b.high < b.very_high && b.very_high <= 1.0)
        {
            return Err(ConfigError::Invalid(
                "prediction bands must satisfy 0 < moderate < high < very_high <= 1".into(),
            ));
        }
        let d = &self.rapid_decline;
        if d.absolute_drop <= 0.0 || d.relative_drop <= 0.0 || d.window_days <= 0 {
            return Err(ConfigError::Invalid(
                "rapid decline thresholds must be positive".into(),
            ));
        }
        if d.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Invalid(format!(
                "rapid_decline.window_days must be at most {MAX_WINDOW_DAYS}"
            )));
        }
        if !(1..=MAX_CACHE_TTL_SECS).contains(&self.cache_ttl_secs) {
            return Err(ConfigError::Invalid(format!(
                "cache_ttl_secs must be between 1 and {MAX_CACHE_TTL_SECS}"
            )));
        }
        Ok(())
    }

    /// Equation constants for the configured variant.
    pub fn egfr_equation(&self) -> EgfrEquation {
        match self.egfr_variant {
            EgfrVariant::CkdEpi2009 => {
                EgfrEquation::ckd_epi_2009().with_race_coefficient(self.race_coefficient)
            }
            EgfrVariant::CkdEpi2009RaceFree => EgfrEquation::ckd_epi_2009_race_free(),
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.cache_ttl_secs).unwrap_or(chrono::Duration::MAX)
    }
}
