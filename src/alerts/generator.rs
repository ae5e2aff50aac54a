use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clinical::{Assessment, AssessmentRequest};
use crate::config::{AlertExpiry, EngineConfig};
use crate::history::DeclineFinding;
use crate::models::{
    Alert, AlertCategory, AlertPriority, Cadence, KidneyMetrics, NewAlert, PredictionBand,
    RiskLevel, TestKind, TestPriority,
};
use crate::prediction::Prediction;

use super::AlertError;

/// Who an alert is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: String,
    pub name: String,
}

/// Turns clinical findings into alerts with configured lifetimes.
pub struct AlertGenerator {
    expiry: AlertExpiry,
}

impl AlertGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            expiry: config.alert_expiry.clone(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        patient: &PatientRef,
        priority: AlertPriority,
        category: AlertCategory,
        title: String,
        description: String,
        recommendations: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Alert, AlertError> {
        let expires_at = now
            .checked_add_signed(self.expiry.window(priority, category))
            .ok_or(AlertError::ExpiryOutOfRange { priority, category })?;
        let alert = Alert::new(
            NewAlert {
                patient_id: patient.id.clone(),
                patient_name: patient.name.clone(),
                priority,
                category,
                title,
                description,
                recommendations,
            },
            now,
            expires_at,
        )?;
        tracing::info!(
            alert_id = alert.id(),
            priority = priority.as_str(),
            category = category.as_str(),
            "Alert raised"
        );
        Ok(alert)
    }

    /// Risk, referral and urgent-test alerts for one assessment.
    pub fn from_assessment(
        &self,
        patient: &PatientRef,
        request: &AssessmentRequest,
        assessment: &Assessment,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AlertError> {
        let mut alerts = Vec::new();
        let labs = describe_metrics(&assessment.metrics);
        let plan: Vec<String> = assessment
            .recommendations
            .iter()
            .map(|r| format!("{}: {}", r.test.display_name(), r.frequency()))
            .collect();

        match assessment.risk_level {
            RiskLevel::VeryHigh => alerts.push(self.build(
                patient,
                AlertPriority::Critical,
                AlertCategory::Risk,
                "Very High CKD Risk".into(),
                format!("{labs}. KDIGO risk is Very High."),
                plan.clone(),
                now,
            )?),
            RiskLevel::High => {
                let title = if request.has_diabetes {
                    "High CKD Risk with Diabetes"
                } else {
                    "High CKD Risk"
                };
                alerts.push(self.build(
                    patient,
                    AlertPriority::High,
                    AlertCategory::Risk,
                    title.into(),
                    format!("{labs}. KDIGO risk is High."),
                    plan.clone(),
                    now,
                )?);
            }
            _ => {}
        }

        if let Some(reason) = assessment.referral_reason {
            alerts.push(self.build(
                patient,
                AlertPriority::High,
                AlertCategory::Referral,
                "Nephrology Referral Recommended".into(),
                format!("{labs}. Referral criterion: {}.", reason.describe()),
                vec![
                    "Refer to nephrology".into(),
                    "Send recent eGFR and uACR results with the referral".into(),
                ],
                now,
            )?);
        }

        for rec in assessment
            .recommendations
            .iter()
            .filter(|r| r.priority == TestPriority::Urgent)
        {
            alerts.push(self.build(
                patient,
                AlertPriority::Medium,
                AlertCategory::Test,
                format!("Urgent Test: {}", rec.test),
                rec.rationale.clone(),
                vec![
                    format!("Order {}", rec.test.display_name()),
                    format!("Frequency: {}", rec.frequency()),
                ],
                now,
            )?);
        }

        Ok(alerts)
    }

    pub fn from_decline(
        &self,
        patient: &PatientRef,
        finding: &DeclineFinding,
        now: DateTime<Utc>,
    ) -> Result<Alert, AlertError> {
        self.build(
            patient,
            AlertPriority::Critical,
            AlertCategory::Risk,
            "Rapid eGFR Decline".into(),
            format!(
                "eGFR {:.1} mL/min/1.73m², down {:.1} ({:.0}%) from {:.1} over {} days.",
                finding.latest_egfr,
                finding.absolute_drop,
                finding.relative_drop * 100.0,
                finding.baseline_egfr,
                finding.days()
            ),
            vec![
                "Urgent nephrology referral".into(),
                "Check for acute kidney injury".into(),
                "Review medications for nephrotoxicity".into(),
            ],
            now,
        )
    }

    /// `None` below the High band.
    pub fn from_prediction(
        &self,
        patient: &PatientRef,
        prediction: &Prediction,
        now: DateTime<Utc>,
    ) -> Result<Option<Alert>, AlertError> {
        let (priority, title) = match prediction.band {
            PredictionBand::VeryHigh => (AlertPriority::Critical, "Very High Predicted CKD Risk"),
            PredictionBand::High => (AlertPriority::High, "High Predicted CKD Risk"),
            PredictionBand::Low | PredictionBand::Moderate => return Ok(None),
        };

        let alert = self.build(
            patient,
            priority,
            AlertCategory::Prediction,
            title.into(),
            format!(
                "{:.1}% probability of developing CKD in the next 5 years (from {} {:.1}).",
                prediction.probability * 100.0,
                prediction.test,
                prediction.value
            ),
            vec![
                "Monitor kidney function closely".into(),
                "Optimize blood pressure control".into(),
                "Consider ACE inhibitor or ARB therapy".into(),
            ],
            now,
        )?;
        Ok(Some(alert))
    }

    /// `None` while the last test is still within its cadence.
    pub fn overdue_test(
        &self,
        patient: &PatientRef,
        test: TestKind,
        last_done: DateTime<Utc>,
        cadence: Cadence,
        now: DateTime<Utc>,
    ) -> Result<Option<Alert>, AlertError> {
        let days = (now - last_done).num_days();
        if days <= cadence.interval_days() {
            return Ok(None);
        }

        let alert = self.build(
            patient,
            AlertPriority::Medium,
            AlertCategory::Test,
            format!("Overdue Test: {test}"),
            format!("Last test was {days} days ago. Recommended frequency: {cadence}."),
            vec![format!("Order {}", test.display_name())],
            now,
        )?;
        Ok(Some(alert))
    }
}

fn describe_metrics(metrics: &KidneyMetrics) -> String {
    let mut parts = Vec::new();
    if let (Some(egfr), Some(cat)) = (metrics.egfr, metrics.egfr_category) {
        parts.push(format!("eGFR {egfr:.1} mL/min/1.73m² ({cat})"));
    }
    if let (Some(uacr), Some(cat)) = (metrics.uacr, metrics.uacr_category) {
        parts.push(format!("uACR {uacr:.1} mg/g ({cat})"));
    }
    if parts.is_empty() {
        "No kidney metrics available".into()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::assess;
    use crate::models::LabReading;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn patient() -> PatientRef {
        PatientRef {
            id: "P12345".into(),
            name: "John Smith".into(),
        }
    }

    fn generator() -> AlertGenerator {
        AlertGenerator::new(&EngineConfig::default())
    }

    fn request(scr: f64, age: f64, urine: Option<(f64, f64)>, dm: bool) -> AssessmentRequest {
        AssessmentRequest {
            reading: LabReading {
                creatinine_mg_dl: scr,
                age_years: age,
                is_female: true,
                is_black: false,
                urine_albumin_mg_l: urine.map(|u| u.0),
                urine_creatinine_mg_dl: urine.map(|u| u.1),
            },
            has_diabetes: dm,
            has_hypertension: false,
        }
    }

    #[test]
    fn very_high_risk_raises_critical_and_referral() {
        let req = request(1.2, 55.0, Some((45.0, 90.0)), false);
        let assessment = assess(&req, &EngineConfig::default());
        let alerts = generator()
            .from_assessment(&patient(), &req, &assessment, now())
            .unwrap();

        let risk = alerts.iter().find(|a| a.category() == AlertCategory::Risk).unwrap();
        assert_eq!(risk.priority(), AlertPriority::Critical);
        assert_eq!(risk.expires_at(), now() + Duration::days(7));
        assert!(risk.description().contains("uACR 500.0 mg/g (A3)"));
        assert!(!risk.recommendations().is_empty());

        let referral = alerts
            .iter()
            .find(|a| a.category() == AlertCategory::Referral)
            .unwrap();
        assert_eq!(referral.priority(), AlertPriority::High);
        assert_eq!(referral.expires_at(), now() + Duration::days(14));

        let tests: Vec<_> = alerts
            .iter()
            .filter(|a| a.category() == AlertCategory::Test)
            .collect();
        assert_eq!(tests.len(), 2);
        assert!(tests.iter().all(|a| a.priority() == AlertPriority::Medium));
    }

    #[test]
    fn high_risk_title_mentions_diabetes() {
        // eGFR in G3a with A2 albuminuria is High.
        let req = request(1.2, 55.0, Some((10.0, 50.0)), true);
        let assessment = assess(&req, &EngineConfig::default());
        assert_eq!(assessment.risk_level, RiskLevel::High);

        let alerts = generator()
            .from_assessment(&patient(), &req, &assessment, now())
            .unwrap();
        assert_eq!(alerts[0].title(), "High CKD Risk with Diabetes");
        assert_eq!(alerts[0].priority(), AlertPriority::High);
        assert!(alerts.iter().any(|a| a.category() == AlertCategory::Referral));
    }

    #[test]
    fn low_risk_raises_nothing() {
        let req = request(0.7, 40.0, Some((2.0, 100.0)), false);
        let assessment = assess(&req, &EngineConfig::default());
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        let alerts = generator()
            .from_assessment(&patient(), &req, &assessment, now())
            .unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn missing_labs_raise_test_alerts_only() {
        let req = request(0.0, 55.0, None, true);
        let assessment = assess(&req, &EngineConfig::default());
        let alerts = generator()
            .from_assessment(&patient(), &req, &assessment, now())
            .unwrap();
        assert!(!alerts.is_empty());
        assert!(alerts.iter().all(|a| a.category() == AlertCategory::Test));
        assert_eq!(alerts[0].title(), "Urgent Test: eGFR");
    }

    #[test]
    fn decline_alert_leads_with_latest_egfr() {
        let finding = DeclineFinding {
            baseline_date: chrono::NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            baseline_egfr: 60.0,
            latest_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            latest_egfr: 45.0,
            absolute_drop: 15.0,
            relative_drop: 0.25,
        };
        let alert = generator().from_decline(&patient(), &finding, now()).unwrap();
        assert_eq!(alert.title(), "Rapid eGFR Decline");
        assert_eq!(alert.priority(), AlertPriority::Critical);
        assert!(alert.description().starts_with("eGFR 45.0 mL/min/1.73m², down 15.0 (25%)"));
        assert!(alert.description().ends_with("over 90 days."));
    }

    #[test]
    fn prediction_alerts_by_band() {
        let make = |probability: f64, band| Prediction {
            test: TestKind::Egfr,
            value: 52.0,
            probability,
            band,
        };
        let g = generator();

        let high = g
            .from_prediction(&patient(), &make(0.725, PredictionBand::High), now())
            .unwrap()
            .unwrap();
        assert_eq!(high.priority(), AlertPriority::High);
        assert_eq!(high.expires_at(), now() + Duration::days(90));
        assert!(high.description().starts_with("72.5% probability"));

        let very_high = g
            .from_prediction(&patient(), &make(0.9, PredictionBand::VeryHigh), now())
            .unwrap()
            .unwrap();
        assert_eq!(very_high.priority(), AlertPriority::Critical);

        assert!(g
            .from_prediction(&patient(), &make(0.3, PredictionBand::Moderate), now())
            .unwrap()
            .is_none());
    }

    #[test]
    fn oversized_expiry_is_an_error_not_a_panic() {
        let mut config = EngineConfig::default();
        config.alert_expiry.medium_days = 200_000_000_000_000;
        let g = AlertGenerator::new(&config);
        let err = g
            .overdue_test(
                &patient(),
                TestKind::Uacr,
                now() - Duration::days(400),
                Cadence::Annual,
                now(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            AlertError::ExpiryOutOfRange {
                priority: AlertPriority::Medium,
                category: AlertCategory::Test,
            }
        );
    }

    #[test]
    fn overdue_only_past_cadence() {
        let g = generator();
        let last = now() - Duration::days(395);
        let alert = g
            .overdue_test(&patient(), TestKind::Uacr, last, Cadence::Annual, now())
            .unwrap()
            .unwrap();
        assert_eq!(alert.title(), "Overdue Test: uACR");
        assert_eq!(
            alert.description(),
            "Last test was 395 days ago. Recommended frequency: Annual."
        );
        assert_eq!(alert.expires_at(), now() + Duration::days(30));

        let recent = now() - Duration::days(365);
        assert!(g
            .overdue_test(&patient(), TestKind::Uacr, recent, Cadence::Annual, now())
            .unwrap()
            .is_none());
    }
}
