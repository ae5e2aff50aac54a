//! Follow-up test recommendations.
//!
//! Every rule is independent: each one that applies contributes its own
//! entries, and none suppresses another. Output is ordered by priority
//! (Urgent first) and, within a priority, by rule order.

use crate::models::{Cadence, RiskLevel, TestKind, TestPriority, TestRecommendation};

/// Age from which an annual metabolic panel is added.
pub const AGE_MONITORING_THRESHOLD: f64 = 60.0;

/// Patient context the rules read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationInput {
    pub risk_level: RiskLevel,
    pub has_diabetes: bool,
    pub has_hypertension: bool,
    pub has_egfr: bool,
    pub has_uacr: bool,
    pub age_years: f64,
}

pub fn generate_test_recommendations(
    risk_level: RiskLevel,
    has_diabetes: bool,
    has_hypertension: bool,
    has_egfr: bool,
    has_uacr: bool,
    age_years: f64,
) -> Vec<TestRecommendation> {
    recommend(&RecommendationInput {
        risk_level,
        has_diabetes,
        has_hypertension,
        has_egfr,
        has_uacr,
        age_years,
    })
}

/// Run every rule over `input` and order the result.
pub fn recommend(input: &RecommendationInput) -> Vec<TestRecommendation> {
    let mut out = Vec::new();

    missing_egfr_rule(input, &mut out);
    missing_uacr_rule(input, &mut out);
    monitoring_cadence_rule(input, &mut out);
    diabetes_rule(input, &mut out);
    hypertension_rule(input, &mut out);
    age_rule(input, &mut out);

    // Stable: ties keep rule order.
    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}

fn entry(
    test: TestKind,
    priority: TestPriority,
    cadence: Cadence,
    rationale: impl Into<String>,
) -> TestRecommendation {
    TestRecommendation {
        test,
        priority,
        cadence,
        rationale: rationale.into(),
    }
}

/// Comorbidity monitoring runs tighter once risk is Moderate or above,
/// and while risk cannot be established.
fn comorbidity_cadence(risk: RiskLevel) -> Cadence {
    if risk.is_at_least(RiskLevel::Moderate) || !risk.is_known() {
        Cadence::Every3Months
    } else {
        Cadence::Every6Months
    }
}

fn missing_egfr_rule(input: &RecommendationInput, out: &mut Vec<TestRecommendation>) {
    if input.has_egfr {
        return;
    }
    out.push(entry(
        TestKind::Egfr,
        TestPriority::Urgent,
        Cadence::AsSoonAsPossible,
        "Baseline kidney function not established.",
    ));
}

fn missing_uacr_rule(input: &RecommendationInput, out: &mut Vec<TestRecommendation>) {
    if input.has_uacr {
        return;
    }
    if input.has_diabetes || input.has_hypertension {
        out.push(entry(
            TestKind::Uacr,
            TestPriority::Urgent,
            Cadence::AsSoonAsPossible,
            "Albuminuria screening missing in a patient with diabetes or hypertension.",
        ));
    } else {
        out.push(entry(
            TestKind::Uacr,
            TestPriority::Recommended,
            Cadence::Within3Months,
            "Albuminuria screening missing; uACR not on record.",
        ));
    }
}

fn monitoring_cadence_rule(input: &RecommendationInput, out: &mut Vec<TestRecommendation>) {
    if !(input.has_egfr && input.has_uacr) {
        return;
    }

    let (priority, cadence) = match input.risk_level {
        RiskLevel::Low => (TestPriority::Routine, Cadence::Annual),
        RiskLevel::Moderate => (TestPriority::Recommended, Cadence::Every6Months),
        RiskLevel::High => (TestPriority::Recommended, Cadence::Every3To4Months),
        RiskLevel::VeryHigh => (TestPriority::Urgent, Cadence::Every1To3Months),
        RiskLevel::Unknown => return,
    };

    let label = input.risk_level.label();
    out.push(entry(
        TestKind::Egfr,
        priority,
        cadence,
        format!("{label} KDIGO risk: track kidney function {}.", cadence.as_str().to_lowercase()),
    ));
    out.push(entry(
        TestKind::Uacr,
        priority,
        cadence,
        format!("{label} KDIGO risk: track albuminuria {}.", cadence.as_str().to_lowercase()),
    ));
}

fn diabetes_rule(input: &RecommendationInput, out: &mut Vec<TestRecommendation>) {
    if !input.has_diabetes {
        return;
    }
    out.push(entry(
        TestKind::HbA1c,
        TestPriority::Recommended,
        comorbidity_cadence(input.risk_level),
        "Diabetes: glycaemic control drives CKD progression.",
    ));
}

fn hypertension_rule(input: &RecommendationInput, out: &mut Vec<TestRecommendation>) {
    if !input.has_hypertension {
        return;
    }
    out.push(entry(
        TestKind::BloodPressure,
        TestPriority::Recommended,
        comorbidity_cadence(input.risk_level),
        "Hypertension: blood pressure control slows kidney function loss.",
    ));
}

fn age_rule(input: &RecommendationInput, out: &mut Vec<TestRecommendation>) {
    if input.age_years < AGE_MONITORING_THRESHOLD {
        return;
    }
    push_unless_implied(
        out,
        entry(
            TestKind::Lipids,
            TestPriority::Routine,
            Cadence::Annual,
            "Monitor for age-related decline (age 60 or over).",
        ),
    );
}

/// Append unless an entry for the same test at equal or higher priority exists.
fn push_unless_implied(out: &mut Vec<TestRecommendation>, rec: TestRecommendation) {
    let implied = out
        .iter()
        .any(|existing| existing.test == rec.test && existing.priority >= rec.priority);
    if !implied {
        out.push(rec);
    }
}
