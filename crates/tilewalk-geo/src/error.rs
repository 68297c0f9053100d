//! Error types for geometry operations.

use std::fmt;

/// Errors that can occur when building geometric summaries.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Not enough points to describe the requested shape.
    TooFewPoints { expected: usize, actual: usize },
    /// A coordinate was NaN or infinite.
    NonFinite { context: &'static str },
    /// A parameter was outside its valid range.
    InvalidParameter {
        context: &'static str,
        detail: String,
    },
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewPoints { expected, actual } => {
                write!(f, "too few points: expected at least {expected}, got {actual}")
            }
            Self::NonFinite { context } => {
                write!(f, "non-finite coordinate in {context}")
            }
            Self::InvalidParameter { context, detail } => {
                write!(f, "invalid {context}: {detail}")
            }
        }
    }
}

impl std::error::Error for GeoError {}

/// Result type for geometry operations.
pub type GeoResult<T> = Result<T, GeoError>;
