pub mod alert;
pub mod enums;
pub mod filters;
pub mod lab;
pub mod recommendation;

pub use alert::{Alert, AlertState, NewAlert};
pub use enums::*;
pub use filters::{AlertFilter, CategoryFilter, PriorityFilter};
pub use lab::{KidneyMetrics, LabReading};
pub use recommendation::TestRecommendation;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
