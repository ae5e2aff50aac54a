//! Bridge to the external CKD prediction model.
//!
//! The model itself lives elsewhere; this crate only validates its output
//! and maps the probability onto a band.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{EngineConfig, PredictionBands};
use crate::models::{PredictionBand, TestKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Prediction service unreachable: {0}")]
    Unreachable(String),

    #[error("Prediction probability out of range: {0}")]
    ProbabilityOutOfRange(f64),
}

/// Collaborator that scores a single lab value.
pub trait RiskPredictor {
    /// Probability in `[0, 1]` of developing CKD.
    fn predict(&self, test: TestKind, value: f64) -> Result<f64, PredictionError>;
}

impl PredictionBand {
    /// Band for `probability`; each threshold is the inclusive lower bound.
    pub fn from_probability(probability: f64, bands: &PredictionBands) -> Self {
        if probability >= bands.very_high {
            Self::VeryHigh
        } else if probability >= bands.high {
            Self::High
        } else if probability >= bands.moderate {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub test: TestKind,
    pub value: f64,
    pub probability: f64,
    pub band: PredictionBand,
}

/// Ask the predictor once and band the answer. Failures are returned to
/// the caller as-is.
pub fn predict_band(
    predictor: &dyn RiskPredictor,
    test: TestKind,
    value: f64,
    config: &EngineConfig,
) -> Result<Prediction, PredictionError> {
    let probability = predictor.predict(test, value).inspect_err(|e| {
        tracing::warn!(test = test.as_str(), error = %e, "Prediction request failed");
    })?;

    if !(0.0..=1.0).contains(&probability) {
        tracing::warn!(test = test.as_str(), probability, "Prediction outside [0, 1]");
        return Err(PredictionError::ProbabilityOutOfRange(probability));
    }

    let band = PredictionBand::from_probability(probability, &config.prediction_bands);
    tracing::debug!(test = test.as_str(), probability, band = band.as_str(), "Prediction banded");
    Ok(Prediction {
        test,
        value,
        probability,
        band,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Fixed(f64);

    impl RiskPredictor for Fixed {
        fn predict(&self, _test: TestKind, _value: f64) -> Result<f64, PredictionError> {
            Ok(self.0)
        }
    }

    struct Offline {
        calls: Cell<u32>,
    }

    impl RiskPredictor for Offline {
        fn predict(&self, _test: TestKind, _value: f64) -> Result<f64, PredictionError> {
            self.calls.set(self.calls.get() + 1);
            Err(PredictionError::Unreachable("connection refused".into()))
        }
    }

    #[test]
    fn bands_use_inclusive_lower_bounds() {
        let bands = PredictionBands::default();
        assert_eq!(PredictionBand::from_probability(0.0, &bands), PredictionBand::Low);
        assert_eq!(PredictionBand::from_probability(0.25, &bands), PredictionBand::Moderate);
        assert_eq!(PredictionBand::from_probability(0.5, &bands), PredictionBand::High);
        assert_eq!(PredictionBand::from_probability(0.725, &bands), PredictionBand::High);
        assert_eq!(PredictionBand::from_probability(0.75, &bands), PredictionBand::VeryHigh);
        assert_eq!(PredictionBand::from_probability(1.0, &bands), PredictionBand::VeryHigh);
    }

    #[test]
    fn predict_band_wraps_probability() {
        let p = predict_band(&Fixed(0.725), TestKind::Egfr, 48.0, &EngineConfig::default()).unwrap();
        assert_eq!(p.band, PredictionBand::High);
        assert_eq!(p.probability, 0.725);
        assert_eq!(p.value, 48.0);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let err = predict_band(&Fixed(1.3), TestKind::Uacr, 40.0, &EngineConfig::default())
            .unwrap_err();
        assert_eq!(err, PredictionError::ProbabilityOutOfRange(1.3));
        assert!(predict_band(&Fixed(-0.1), TestKind::Uacr, 40.0, &EngineConfig::default()).is_err());
        assert!(predict_band(&Fixed(f64::NAN), TestKind::Uacr, 40.0, &EngineConfig::default()).is_err());
    }

    #[test]
    fn unreachable_is_surfaced_without_retry() {
        let offline = Offline { calls: Cell::new(0) };
        let err = predict_band(&offline, TestKind::Egfr, 48.0, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, PredictionError::Unreachable(_)));
        assert_eq!(offline.calls.get(), 1);
    }
}
