//! One-shot assessment: labs in, classification and follow-up plan out.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::models::{KidneyMetrics, LabReading, RiskLevel, TestRecommendation};

use super::metrics::derive_metrics;
use super::recommendations::{recommend, RecommendationInput};
use super::risk::{referral_reason, risk_from_metrics, ReferralReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub reading: LabReading,
    #[serde(default)]
    pub has_diabetes: bool,
    #[serde(default)]
    pub has_hypertension: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub metrics: KidneyMetrics,
    pub risk_level: RiskLevel,
    pub referral_recommended: bool,
    pub referral_reason: Option<ReferralReason>,
    pub recommendations: Vec<TestRecommendation>,
    /// Why a metric is missing, one line per problem.
    pub data_gaps: Vec<String>,
}

/// Classify one request. Never fails: invalid or missing inputs degrade
/// to absent metrics, `Unknown` risk and data-gap recommendations.
pub fn assess(request: &AssessmentRequest, config: &EngineConfig) -> Assessment {
    let reading = &request.reading;
    let (metrics, problems) = derive_metrics(reading, &config.egfr_equation());

    let mut data_gaps: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
    if reading.urine_albumin_mg_l.is_none() || reading.urine_creatinine_mg_dl.is_none() {
        data_gaps.push("urine albumin and urine creatinine are both required for uACR".into());
    }

    let risk_level = risk_from_metrics(metrics.egfr, metrics.uacr);
    if !risk_level.is_known() {
        tracing::info!(gaps = data_gaps.len(), "Incomplete labs, risk level Unknown");
    }

    let referral = metrics.egfr.and_then(|egfr| {
        referral_reason(
            egfr,
            metrics.uacr,
            request.has_diabetes,
            request.has_hypertension,
        )
    });
    if let Some(reason) = referral {
        tracing::info!(reason = reason.describe(), "Nephrology referral recommended");
    }

    let recommendations = recommend(&RecommendationInput {
        risk_level,
        has_diabetes: request.has_diabetes,
        has_hypertension: request.has_hypertension,
        has_egfr: metrics.egfr.is_some(),
        has_uacr: metrics.uacr.is_some(),
        age_years: reading.age_years,
    });

    tracing::debug!(
        risk = risk_level.as_str(),
        egfr = ?metrics.egfr,
        uacr = ?metrics.uacr,
        recommendations = recommendations.len(),
        "Assessment complete"
    );

    Assessment {
        metrics,
        risk_level,
        referral_recommended: referral.is_some(),
        referral_reason: referral,
        recommendations,
        data_gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EgfrCategory, TestKind, TestPriority, UacrCategory};

    fn request(reading: LabReading) -> AssessmentRequest {
        AssessmentRequest {
            reading,
            has_diabetes: false,
            has_hypertension: false,
        }
    }

    fn scenario_reading() -> LabReading {
        LabReading {
            creatinine_mg_dl: 1.2,
            age_years: 55.0,
            is_female: true,
            is_black: false,
            urine_albumin_mg_l: Some(45.0),
            urine_creatinine_mg_dl: Some(90.0),
        }
    }

    #[test]
    fn reference_scenario_is_very_high_with_referral() {
        let result = assess(&request(scenario_reading()), &EngineConfig::default());
        assert_eq!(result.metrics.egfr_category, Some(EgfrCategory::G3a));
        assert_eq!(result.metrics.uacr, Some(500.0));
        assert_eq!(result.metrics.uacr_category, Some(UacrCategory::A3));
        assert_eq!(result.risk_level, RiskLevel::VeryHigh);
        assert!(result.referral_recommended);
        assert_eq!(result.referral_reason, Some(ReferralReason::VeryHighRisk));
        assert!(result.data_gaps.is_empty());
        assert_eq!(result.recommendations[0].priority, TestPriority::Urgent);
    }

    #[test]
    fn missing_urine_labs_degrade_to_unknown() {
        let reading = LabReading {
            urine_albumin_mg_l: None,
            urine_creatinine_mg_dl: None,
            ..scenario_reading()
        };
        let result = assess(&request(reading), &EngineConfig::default());
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert!(!result.referral_recommended);
        assert_eq!(result.data_gaps.len(), 1);
        let uacr = result
            .recommendations
            .iter()
            .find(|r| r.test == TestKind::Uacr)
            .unwrap();
        assert_eq!(uacr.priority, TestPriority::Recommended);
    }

    #[test]
    fn invalid_creatinine_is_a_gap_not_a_failure() {
        let reading = LabReading {
            creatinine_mg_dl: 0.0,
            ..scenario_reading()
        };
        let result = assess(&request(reading), &EngineConfig::default());
        assert!(result.metrics.egfr.is_none());
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert!(result.data_gaps[0].contains("creatinine_mg_dl"));
        assert_eq!(result.recommendations[0].test, TestKind::Egfr);
        assert_eq!(result.recommendations[0].priority, TestPriority::Urgent);
    }

    #[test]
    fn severe_egfr_refers_even_without_uacr() {
        let reading = LabReading {
            creatinine_mg_dl: 4.0,
            age_years: 70.0,
            is_female: false,
            is_black: false,
            urine_albumin_mg_l: None,
            urine_creatinine_mg_dl: None,
        };
        let result = assess(&request(reading), &EngineConfig::default());
        assert!(result.metrics.egfr.unwrap() < 30.0);
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert_eq!(result.referral_reason, Some(ReferralReason::SevereEgfrLoss));
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let json = r#"{"reading": {"creatinine_mg_dl": 0.9, "age_years": 45, "is_female": false}}"#;
        let req: AssessmentRequest = serde_json::from_str(json).unwrap();
        assert!(!req.has_diabetes);
        assert!(req.reading.urine_albumin_mg_l.is_none());
    }
}
