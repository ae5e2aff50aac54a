//! Kidney-function metrics from raw labs.
//!
//! All functions here are pure. Invalid inputs yield
//! [`ClinicalError::InvalidInput`]; callers treat that as missing data.

use serde::{Deserialize, Serialize};

use crate::models::{EgfrCategory, KidneyMetrics, LabReading, UacrCategory};

use super::ClinicalError;

/// Multiplier applied for self-identified Black patients by the 2009
/// CKD-EPI creatinine equation. Deprecated clinically; kept configurable.
pub const CKD_EPI_2009_RACE_COEFFICIENT: f64 = 1.159;

/// µmol/L per mg/dL of creatinine.
pub const CREATININE_UMOL_PER_MG_DL: f64 = 88.4;

/// Constants of a CKD-EPI style creatinine equation:
/// `base × min(Scr/κ, 1)^α × max(Scr/κ, 1)^exp × decay^age × sex × race`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EgfrEquation {
    pub base: f64,
    pub kappa_female: f64,
    pub kappa_male: f64,
    pub alpha_female: f64,
    pub alpha_male: f64,
    pub upper_exponent: f64,
    pub age_decay: f64,
    pub female_multiplier: f64,
    pub race_coefficient: f64,
}

impl EgfrEquation {
    /// CKD-EPI 2009 with the legacy race coefficient.
    pub fn ckd_epi_2009() -> Self {
        Self {
            base: 141.0,
            kappa_female: 0.7,
            kappa_male: 0.9,
            alpha_female: -0.329,
            alpha_male: -0.411,
            upper_exponent: -1.209,
            age_decay: 0.993,
            female_multiplier: 1.018,
            race_coefficient: CKD_EPI_2009_RACE_COEFFICIENT,
        }
    }

    /// CKD-EPI 2009 constants with the race term neutralised.
    pub fn ckd_epi_2009_race_free() -> Self {
        Self {
            race_coefficient: 1.0,
            ..Self::ckd_epi_2009()
        }
    }

    /// Same equation with a different race multiplier.
    pub fn with_race_coefficient(self, race_coefficient: f64) -> Self {
        Self {
            race_coefficient,
            ..self
        }
    }
}

impl Default for EgfrEquation {
    fn default() -> Self {
        Self::ckd_epi_2009()
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<f64, ClinicalError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ClinicalError::InvalidInput { field, value })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// eGFR (mL/min/1.73m²) using the default CKD-EPI 2009 equation.
pub fn calculate_egfr(
    creatinine_mg_dl: f64,
    age_years: f64,
    is_female: bool,
    is_black: bool,
) -> Result<f64, ClinicalError> {
    calculate_egfr_with(
        &EgfrEquation::default(),
        creatinine_mg_dl,
        age_years,
        is_female,
        is_black,
    )
}

/// eGFR using explicit equation constants. Rounded to one decimal, never negative.
pub fn calculate_egfr_with(
    equation: &EgfrEquation,
    creatinine_mg_dl: f64,
    age_years: f64,
    is_female: bool,
    is_black: bool,
) -> Result<f64, ClinicalError> {
    let scr = require_positive("creatinine_mg_dl", creatinine_mg_dl)?;
    let age = require_positive("age_years", age_years)?;

    let (kappa, alpha) = if is_female {
        (equation.kappa_female, equation.alpha_female)
    } else {
        (equation.kappa_male, equation.alpha_male)
    };

    let ratio = scr / kappa;
    let mut egfr = equation.base
        * ratio.min(1.0).powf(alpha)
        * ratio.max(1.0).powf(equation.upper_exponent)
        * equation.age_decay.powf(age);

    if is_female {
        egfr *= equation.female_multiplier;
    }
    if is_black {
        egfr *= equation.race_coefficient;
    }

    Ok(round1(egfr).max(0.0))
}

/// uACR (mg/g) from urine albumin (mg/L) and urine creatinine (mg/dL).
pub fn calculate_uacr(
    urine_albumin_mg_l: f64,
    urine_creatinine_mg_dl: f64,
) -> Result<f64, ClinicalError> {
    let creatinine = require_positive("urine_creatinine_mg_dl", urine_creatinine_mg_dl)?;
    if !urine_albumin_mg_l.is_finite() || urine_albumin_mg_l < 0.0 {
        return Err(ClinicalError::InvalidInput {
            field: "urine_albumin_mg_l",
            value: urine_albumin_mg_l,
        });
    }
    Ok(round1(1000.0 * urine_albumin_mg_l / creatinine))
}

/// Convert serum creatinine from µmol/L to mg/dL.
pub fn creatinine_umol_to_mg_dl(umol_per_l: f64) -> f64 {
    umol_per_l / CREATININE_UMOL_PER_MG_DL
}

/// KDIGO G category. Bands are closed at the lower edge.
pub fn categorize_egfr(egfr: f64) -> EgfrCategory {
    if egfr >= 90.0 {
        EgfrCategory::G1
    } else if egfr >= 60.0 {
        EgfrCategory::G2
    } else if egfr >= 45.0 {
        EgfrCategory::G3a
    } else if egfr >= 30.0 {
        EgfrCategory::G3b
    } else if egfr >= 15.0 {
        EgfrCategory::G4
    } else {
        EgfrCategory::G5
    }
}

/// KDIGO A category. Bands are closed at the lower edge.
pub fn categorize_uacr(uacr: f64) -> UacrCategory {
    if uacr >= 300.0 {
        UacrCategory::A3
    } else if uacr >= 30.0 {
        UacrCategory::A2
    } else {
        UacrCategory::A1
    }
}

/// Derive both metrics independently. Each failure is returned alongside
/// the metrics so the caller can report the gap instead of aborting.
pub fn derive_metrics(
    reading: &LabReading,
    equation: &EgfrEquation,
) -> (KidneyMetrics, Vec<ClinicalError>) {
    let mut problems = Vec::new();

    let egfr = calculate_egfr_with(
        equation,
        reading.creatinine_mg_dl,
        reading.age_years,
        reading.is_female,
        reading.is_black,
    )
    .map_err(|e| problems.push(e))
    .ok();

    let uacr = match (reading.urine_albumin_mg_l, reading.urine_creatinine_mg_dl) {
        (Some(albumin), Some(creatinine)) => calculate_uacr(albumin, creatinine)
            .map_err(|e| problems.push(e))
            .ok(),
        _ => None,
    };

    let metrics = KidneyMetrics {
        egfr,
        egfr_category: egfr.map(categorize_egfr),
        uacr,
        uacr_category: uacr.map(categorize_uacr),
    };

    (metrics, problems)
}
