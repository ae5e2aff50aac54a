use serde::{Deserialize, Serialize};

use super::enums::{Cadence, TestKind, TestPriority};

/// One recommended follow-up test. Generated fresh per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecommendation {
    pub test: TestKind,
    pub priority: TestPriority,
    #[serde(rename = "frequency")]
    pub cadence: Cadence,
    pub rationale: String,
}

impl TestRecommendation {
    /// Cadence as a free-form string, e.g. "Every 3 months".
    pub fn frequency(&self) -> &'static str {
        self.cadence.as_str()
    }
}
