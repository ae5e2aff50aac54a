use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::enums::{AlertCategory, AlertPriority};
use super::ModelError;

/// `"all"` or one priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(AlertPriority),
}

impl FromStr for PriorityFilter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        AlertPriority::from_str(s).map(Self::Only)
    }
}

/// `"all"` or one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(AlertCategory),
}

impl FromStr for CategoryFilter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        AlertCategory::from_str(s).map(Self::Only)
    }
}

/// Dashboard filter. All set criteria must hold (AND).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFilter {
    /// Case-insensitive substring over patient name, title and description.
    pub query: Option<String>,
    pub priority: PriorityFilter,
    pub category: CategoryFilter,
}
