//! Per-patient visit history: eGFR/uACR trajectory and rapid-decline detection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clinical::metrics::{calculate_egfr_with, calculate_uacr};
use crate::clinical::risk::risk_from_metrics;
use crate::config::{DeclineThresholds, EngineConfig};
use crate::models::RiskLevel;

/// One clinic visit. Any lab may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub patient_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub creatinine_mg_dl: Option<f64>,
    #[serde(default)]
    pub urine_albumin_mg_l: Option<f64>,
    #[serde(default)]
    pub urine_creatinine_mg_dl: Option<f64>,
}

/// Fixed patient attributes the equation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub date_of_birth: NaiveDate,
    pub is_female: bool,
    #[serde(default)]
    pub is_black: bool,
}

impl Demographics {
    /// Age in fractional years on `date`.
    pub fn age_on(&self, date: NaiveDate) -> f64 {
        (date - self.date_of_birth).num_days() as f64 / 365.25
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub egfr: Option<f64>,
    pub uacr: Option<f64>,
    /// False when `egfr` was carried forward from an earlier visit.
    pub egfr_measured: bool,
    pub uacr_measured: bool,
    pub risk_level: RiskLevel,
}

/// Chronological trajectory. Each point holds the latest known eGFR and
/// uACR as of its date; unusable labs do not replace earlier values.
pub fn build_timeline(
    demographics: &Demographics,
    visits: &[VisitRecord],
    config: &EngineConfig,
) -> Vec<TimelinePoint> {
    let equation = config.egfr_equation();
    let mut ordered: Vec<&VisitRecord> = visits.iter().collect();
    ordered.sort_by_key(|v| v.date);

    let mut egfr = None;
    let mut uacr = None;
    let mut points = Vec::with_capacity(ordered.len());

    for visit in ordered {
        let measured_egfr = visit.creatinine_mg_dl.and_then(|scr| {
            calculate_egfr_with(
                &equation,
                scr,
                demographics.age_on(visit.date),
                demographics.is_female,
                demographics.is_black,
            )
            .map_err(|e| tracing::debug!(date = %visit.date, error = %e, "Skipping creatinine"))
            .ok()
        });
        let measured_uacr = match (visit.urine_albumin_mg_l, visit.urine_creatinine_mg_dl) {
            (Some(alb), Some(ucr)) => calculate_uacr(alb, ucr).ok(),
            _ => None,
        };

        if measured_egfr.is_some() {
            egfr = measured_egfr;
        }
        if measured_uacr.is_some() {
            uacr = measured_uacr;
        }

        points.push(TimelinePoint {
            date: visit.date,
            egfr,
            uacr,
            egfr_measured: measured_egfr.is_some(),
            uacr_measured: measured_uacr.is_some(),
            risk_level: risk_from_metrics(egfr, uacr),
        });
    }

    points
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineFinding {
    pub baseline_date: NaiveDate,
    pub baseline_egfr: f64,
    pub latest_date: NaiveDate,
    pub latest_egfr: f64,
    /// mL/min/1.73m², positive for a decline.
    pub absolute_drop: f64,
    /// Fraction of the baseline.
    pub relative_drop: f64,
}

impl DeclineFinding {
    pub fn days(&self) -> i64 {
        (self.latest_date - self.baseline_date).num_days()
    }
}

/// Compare the latest measured eGFR with the earliest measured one inside
/// the look-back window. Carried-forward values are ignored.
pub fn detect_rapid_decline(
    timeline: &[TimelinePoint],
    thresholds: &DeclineThresholds,
) -> Option<DeclineFinding> {
    let measured: Vec<(NaiveDate, f64)> = timeline
        .iter()
        .filter(|p| p.egfr_measured)
        .filter_map(|p| p.egfr.map(|e| (p.date, e)))
        .collect();

    let &(latest_date, latest_egfr) = measured.iter().max_by_key(|(d, _)| *d)?;
    // A window reaching past the calendar covers the whole history.
    let window_start = chrono::Duration::try_days(thresholds.window_days)
        .and_then(|w| latest_date.checked_sub_signed(w))
        .unwrap_or(NaiveDate::MIN);
    let &(baseline_date, baseline_egfr) = measured
        .iter()
        .filter(|(d, _)| *d >= window_start && *d < latest_date)
        .min_by_key(|(d, _)| *d)?;

    let absolute_drop = baseline_egfr - latest_egfr;
    if absolute_drop <= 0.0 || baseline_egfr <= 0.0 {
        return None;
    }
    let relative_drop = absolute_drop / baseline_egfr;

    if absolute_drop >= thresholds.absolute_drop || relative_drop >= thresholds.relative_drop {
        tracing::info!(
            baseline = baseline_egfr,
            latest = latest_egfr,
            days = (latest_date - baseline_date).num_days(),
            "Rapid eGFR decline"
        );
        Some(DeclineFinding {
            baseline_date,
            baseline_egfr,
            latest_date,
            latest_egfr,
            absolute_drop,
            relative_drop,
        })
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Data source
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Visit source unavailable: {0}")]
    Unavailable(String),
}

/// Where visit histories come from (EHR export, database, fixture).
pub trait VisitSource {
    fn visits(&self, patient_id: &str) -> Result<Vec<VisitRecord>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn patient() -> Demographics {
        Demographics {
            date_of_birth: date(1970, 6, 1),
            is_female: false,
            is_black: false,
        }
    }

    fn visit(on: NaiveDate, scr: Option<f64>, urine: Option<(f64, f64)>) -> VisitRecord {
        VisitRecord {
            patient_id: "P12345".into(),
            date: on,
            creatinine_mg_dl: scr,
            urine_albumin_mg_l: urine.map(|u| u.0),
            urine_creatinine_mg_dl: urine.map(|u| u.1),
        }
    }

    fn point(on: NaiveDate, egfr: f64) -> TimelinePoint {
        TimelinePoint {
            date: on,
            egfr: Some(egfr),
            uacr: None,
            egfr_measured: true,
            uacr_measured: false,
            risk_level: RiskLevel::Unknown,
        }
    }

    #[test]
    fn age_on_visit_date() {
        let age = patient().age_on(date(2026, 6, 1));
        assert!((age - 56.0).abs() < 0.01);
    }

    #[test]
    fn timeline_is_sorted_and_carries_forward() {
        let visits = vec![
            visit(date(2026, 3, 1), None, Some((45.0, 90.0))),
            visit(date(2026, 1, 1), Some(1.0), None),
            visit(date(2026, 5, 1), Some(1.4), None),
        ];
        let timeline = build_timeline(&patient(), &visits, &EngineConfig::default());

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[0].date, date(2026, 1, 1));
        assert!(timeline[0].uacr.is_none());
        assert_eq!(timeline[0].risk_level, RiskLevel::Unknown);

        assert_eq!(timeline[1].egfr, timeline[0].egfr);
        assert!(!timeline[1].egfr_measured);
        assert_eq!(timeline[1].uacr, Some(500.0));
        assert!(timeline[1].risk_level.is_known());

        assert!(timeline[2].egfr_measured);
        assert!(timeline[2].egfr.unwrap() < timeline[0].egfr.unwrap());
        assert_eq!(timeline[2].uacr, Some(500.0));
    }

    #[test]
    fn invalid_lab_does_not_overwrite_previous_value() {
        let visits = vec![
            visit(date(2026, 1, 1), Some(1.0), None),
            visit(date(2026, 2, 1), Some(0.0), None),
        ];
        let timeline = build_timeline(&patient(), &visits, &EngineConfig::default());
        assert_eq!(timeline[1].egfr, timeline[0].egfr);
        assert!(!timeline[1].egfr_measured);
    }

    #[test]
    fn empty_history_yields_empty_timeline() {
        assert!(build_timeline(&patient(), &[], &EngineConfig::default()).is_empty());
    }

    #[test]
    fn detects_absolute_drop_within_window() {
        let timeline = vec![
            point(date(2026, 1, 1), 60.0),
            point(date(2026, 2, 1), 55.0),
            point(date(2026, 3, 15), 45.0),
        ];
        let finding = detect_rapid_decline(&timeline, &DeclineThresholds::default()).unwrap();
        assert_eq!(finding.baseline_egfr, 60.0);
        assert_eq!(finding.latest_egfr, 45.0);
        assert_eq!(finding.absolute_drop, 15.0);
        assert_eq!(finding.relative_drop, 0.25);
        assert_eq!(finding.days(), 73);
    }

    #[test]
    fn relative_drop_alone_triggers() {
        let timeline = vec![point(date(2026, 1, 1), 20.0), point(date(2026, 2, 1), 14.0)];
        let finding = detect_rapid_decline(&timeline, &DeclineThresholds::default()).unwrap();
        assert!(finding.absolute_drop < 15.0);
        assert!(finding.relative_drop >= 0.25);
    }

    #[test]
    fn small_drop_is_not_flagged() {
        let timeline = vec![point(date(2026, 1, 1), 60.0), point(date(2026, 2, 1), 55.0)];
        assert!(detect_rapid_decline(&timeline, &DeclineThresholds::default()).is_none());
    }

    #[test]
    fn baseline_outside_window_is_ignored() {
        let timeline = vec![point(date(2025, 6, 1), 80.0), point(date(2026, 2, 1), 50.0)];
        assert!(detect_rapid_decline(&timeline, &DeclineThresholds::default()).is_none());
    }

    #[test]
    fn oversized_window_covers_whole_history() {
        let thresholds = DeclineThresholds {
            window_days: 100_000_000,
            ..DeclineThresholds::default()
        };
        let timeline = vec![point(date(2020, 1, 1), 80.0), point(date(2026, 2, 1), 50.0)];
        let finding = detect_rapid_decline(&timeline, &thresholds).unwrap();
        assert_eq!(finding.baseline_egfr, 80.0);

        let unbounded = DeclineThresholds {
            window_days: i64::MAX,
            ..DeclineThresholds::default()
        };
        assert!(detect_rapid_decline(&timeline, &unbounded).is_some());
    }

    #[test]
    fn carried_forward_points_are_ignored() {
        let mut carried = point(date(2026, 2, 1), 40.0);
        carried.egfr_measured = false;
        let timeline = vec![point(date(2026, 1, 1), 60.0), carried];
        assert!(detect_rapid_decline(&timeline, &DeclineThresholds::default()).is_none());
    }

    #[test]
    fn improvement_is_not_a_decline() {
        let timeline = vec![point(date(2026, 1, 1), 40.0), point(date(2026, 2, 1), 60.0)];
        assert!(detect_rapid_decline(&timeline, &DeclineThresholds::default()).is_none());
    }
}
