use serde::{Deserialize, Serialize};

use super::enums::{EgfrCategory, UacrCategory};

/// Raw labs for one assessment. Constructed per request, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabReading {
    /// Serum creatinine, mg/dL.
    pub creatinine_mg_dl: f64,
    pub age_years: f64,
    pub is_female: bool,
    /// Only consulted by equations that carry a race coefficient.
    #[serde(default)]
    pub is_black: bool,
    /// Urine albumin, mg/L.
    #[serde(default)]
    pub urine_albumin_mg_l: Option<f64>,
    /// Urine creatinine, mg/dL.
    #[serde(default)]
    pub urine_creatinine_mg_dl: Option<f64>,
}

/// Kidney-function metrics derived from a [`LabReading`].
///
/// An absent value means the metric could not be computed (incomplete or
/// invalid inputs); categories are present exactly when their value is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KidneyMetrics {
    pub egfr: Option<f64>,
    pub egfr_category: Option<EgfrCategory>,
    pub uacr: Option<f64>,
    pub uacr_category: Option<UacrCategory>,
}

impl KidneyMetrics {
    pub fn is_complete(&self) -> bool {
        self.egfr.is_some() && self.uacr.is_some()
    }
}
