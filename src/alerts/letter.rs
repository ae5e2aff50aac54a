//! Referral and test-order letters. Rendering belongs to an external
//! document service; this module only assembles what it needs.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Alert, AlertCategory};

/// Lab values as they appear in alert text: "eGFR 28.4", "eGFR: 41", "uACR = 12.5".
/// The number must follow the name directly, so "eGFR has decreased by 15"
/// or "eGFR below 30" carry no value.
static RE_EGFR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\begfr\s*(?:[:=]\s*)?(\d+(?:\.\d+)?)").unwrap());
static RE_UACR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\buacr\s*(?:[:=]\s*)?(\d+(?:\.\d+)?)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterKind {
    Referral,
    TestOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterRequest {
    pub kind: LetterKind,
    pub patient_name: String,
    pub patient_id: String,
    pub subject: String,
    pub egfr: Option<f64>,
    pub uacr: Option<f64>,
    pub recommendations: Vec<String>,
}

fn first_value(re: &Regex, texts: &[&str]) -> Option<f64> {
    texts
        .iter()
        .find_map(|t| re.captures(t))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl LetterRequest {
    /// Test alerts become order letters; every other category a referral.
    pub fn from_alert(alert: &Alert) -> Self {
        let mut texts = vec![alert.description()];
        texts.extend(alert.recommendations().iter().map(String::as_str));

        let kind = match alert.category() {
            AlertCategory::Test => LetterKind::TestOrder,
            _ => LetterKind::Referral,
        };

        Self {
            kind,
            patient_name: alert.patient_name().to_string(),
            patient_id: alert.patient_id().to_string(),
            subject: alert.title().to_string(),
            egfr: first_value(&RE_EGFR, &texts),
            uacr: first_value(&RE_UACR, &texts),
            recommendations: alert.recommendations().to_vec(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Document service unavailable: {0}")]
    Unavailable(String),

    #[error("Document service rejected request: {0}")]
    Rejected(String),
}

/// External document generator (PDF service, print queue).
pub trait DocumentRenderer {
    fn render(&self, request: &LetterRequest) -> Result<Vec<u8>, RenderError>;
}

/// Build the request for `alert` and hand it to `renderer`.
pub fn request_letter(
    alert: &Alert,
    renderer: &dyn DocumentRenderer,
) -> Result<Vec<u8>, RenderError> {
    let request = LetterRequest::from_alert(alert);
    tracing::info!(
        alert_id = alert.id(),
        kind = ?request.kind,
        has_egfr = request.egfr.is_some(),
        has_uacr = request.uacr.is_some(),
        "Requesting letter"
    );
    renderer.render(&request)
}
