//! KDIGO heat-map classification and nephrology referral.

use serde::{Deserialize, Serialize};

use crate::models::{EgfrCategory, RiskLevel, UacrCategory};

use super::metrics::{categorize_egfr, categorize_uacr};

use crate::models::RiskLevel::{High as H, Low as L, Moderate as M, VeryHigh as VH};

/// Rows: G1, G2, G3a, G3b, G4, G5. Columns: A1, A2, A3.
const RISK_MATRIX: [[RiskLevel; 3]; 6] = [
    [L, M, H],
    [L, M, H],
    [M, H, VH],
    [H, VH, VH],
    [VH, VH, VH],
    [VH, VH, VH],
];

/// eGFR below which referral is always recommended.
pub const SEVERE_EGFR_THRESHOLD: f64 = 30.0;

/// Look up the heat-map cell for two categories.
pub fn classify(egfr: EgfrCategory, uacr: UacrCategory) -> RiskLevel {
    RISK_MATRIX[egfr.index()][uacr.index()]
}

/// Risk level for two computed metrics.
pub fn determine_risk_level(egfr: f64, uacr: f64) -> RiskLevel {
    classify(categorize_egfr(egfr), categorize_uacr(uacr))
}

/// Risk level when either metric may be missing; `Unknown` if so.
pub fn risk_from_metrics(egfr: Option<f64>, uacr: Option<f64>) -> RiskLevel {
    match (egfr, uacr) {
        (Some(egfr), Some(uacr)) => determine_risk_level(egfr, uacr),
        _ => RiskLevel::Unknown,
    }
}

/// Why a referral was recommended. Rules are checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferralReason {
    /// eGFR < 30 regardless of albuminuria.
    SevereEgfrLoss,
    VeryHighRisk,
    HighRiskWithComorbidity,
}

impl ReferralReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::SevereEgfrLoss => "eGFR below 30 mL/min/1.73m²",
            Self::VeryHighRisk => "very high KDIGO risk",
            Self::HighRiskWithComorbidity => "high KDIGO risk with diabetes or hypertension",
        }
    }
}

/// First referral rule that fires, if any. `uacr` may be absent; the
/// eGFR override still applies in that case.
pub fn referral_reason(
    egfr: f64,
    uacr: Option<f64>,
    has_diabetes: bool,
    has_hypertension: bool,
) -> Option<ReferralReason> {
    if egfr < SEVERE_EGFR_THRESHOLD {
        return Some(ReferralReason::SevereEgfrLoss);
    }

    match risk_from_metrics(Some(egfr), uacr) {
        RiskLevel::VeryHigh => Some(ReferralReason::VeryHighRisk),
        RiskLevel::High if has_diabetes || has_hypertension => {
            Some(ReferralReason::HighRiskWithComorbidity)
        }
        _ => None,
    }
}

pub fn is_nephrology_referral_recommended(
    egfr: f64,
    uacr: Option<f64>,
    has_diabetes: bool,
    has_hypertension: bool,
) -> bool {
    referral_reason(egfr, uacr, has_diabetes, has_hypertension).is_some()
}
