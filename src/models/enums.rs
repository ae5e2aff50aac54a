use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Declaration order is severity order, so `Ord` is meaningful for ordinals.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// KDIGO glomerular filtration rate category.
    EgfrCategory {
        G1 => "G1",
        G2 => "G2",
        G3a => "G3a",
        G3b => "G3b",
        G4 => "G4",
        G5 => "G5",
    }
);

str_enum!(
    /// KDIGO albuminuria category.
    UacrCategory {
        A1 => "A1",
        A2 => "A2",
        A3 => "A3",
    }
);

impl EgfrCategory {
    /// Row index into the KDIGO heat map.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl UacrCategory {
    /// Column index into the KDIGO heat map.
    pub fn index(self) -> usize {
        self as usize
    }
}

str_enum!(
    /// Follow-up test kinds the recommendation engine can order.
    TestKind {
        Egfr => "eGFR",
        Uacr => "uACR",
        BloodPressure => "BloodPressure",
        HbA1c => "HbA1c",
        Lipids => "Lipids",
    }
);

impl TestKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Egfr => "eGFR (serum creatinine)",
            Self::Uacr => "urine albumin-to-creatinine ratio",
            Self::BloodPressure => "blood pressure",
            Self::HbA1c => "HbA1c",
            Self::Lipids => "lipid / metabolic panel",
        }
    }
}

str_enum!(
    /// Priority of a follow-up test. `Urgent` sorts highest.
    TestPriority {
        Routine => "Routine",
        Recommended => "Recommended",
        Urgent => "Urgent",
    }
);

str_enum!(
    /// Follow-up cadence attached to a test recommendation.
    Cadence {
        Annual => "Annual",
        Every6Months => "Every 6 months",
        Within3Months => "Within 3 months",
        Every3To4Months => "Every 3-4 months",
        Every3Months => "Every 3 months",
        Every1To3Months => "Every 1-3 months",
        AsSoonAsPossible => "As soon as possible",
    }
);

impl Cadence {
    /// Longest acceptable gap between two tests, used for overdue detection.
    pub fn interval_days(&self) -> i64 {
        match self {
            Self::Annual => 365,
            Self::Every6Months => 183,
            Self::Within3Months => 90,
            Self::Every3To4Months => 120,
            Self::Every3Months => 90,
            Self::Every1To3Months => 90,
            Self::AsSoonAsPossible => 0,
        }
    }
}

str_enum!(
    /// Alert priority. Declared low to high so `Ord` follows urgency.
    AlertPriority {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
);

str_enum!(
    AlertCategory {
        Risk => "Risk",
        Test => "Test",
        Prediction => "Prediction",
        Medication => "Medication",
        Referral => "Referral",
    }
);

str_enum!(
    /// Band of a probability returned by the external prediction model.
    PredictionBand {
        Low => "Low",
        Moderate => "Moderate",
        High => "High",
        VeryHigh => "VeryHigh",
    }
);

/// KDIGO risk level.
///
/// `Unknown` marks an incomplete classification. It is not a clinical tier:
/// it has no severity and deliberately does not implement `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "VeryHigh",
            Self::Unknown => "Unknown",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryHigh => "Very High",
            other => other.as_str(),
        }
    }

    /// Numeric risk value (1..=4); `None` for `Unknown`.
    pub fn severity(&self) -> Option<u8> {
        match self {
            Self::Low => Some(1),
            Self::Moderate => Some(2),
            Self::High => Some(3),
            Self::VeryHigh => Some(4),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.severity().is_some()
    }

    /// True for Moderate and above. `Unknown` is not "at least" anything.
    pub fn is_at_least(&self, other: RiskLevel) -> bool {
        match (self.severity(), other.severity()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Moderate" => Ok(Self::Moderate),
            "High" => Ok(Self::High),
            "VeryHigh" | "Very High" => Ok(Self::VeryHigh),
            "Unknown" => Ok(Self::Unknown),
            _ => Err(ModelError::InvalidEnum {
                field: "RiskLevel".into(),
                value: s.into(),
            }),
        }
    }
}
