//! Clinical risk classification: metrics, KDIGO matrix, referral and
//! follow-up recommendations.

pub mod assessment;
pub mod metrics;
pub mod recommendations;
pub mod risk;

pub use assessment::{assess, Assessment, AssessmentRequest};
pub use metrics::{
    calculate_egfr, calculate_egfr_with, calculate_uacr, categorize_egfr, categorize_uacr,
    creatinine_umol_to_mg_dl, derive_metrics, EgfrEquation,
};
pub use recommendations::{generate_test_recommendations, recommend, RecommendationInput};
pub use risk::{
    classify, determine_risk_level, is_nephrology_referral_recommended, referral_reason,
    risk_from_metrics, ReferralReason,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClinicalError {
    #[error("Invalid input: {field} must be a positive number, got {value}")]
    InvalidInput { field: &'static str, value: f64 },
}
