use std::fmt;

use sift_filter::FilterError;

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationError {
    UnknownType(String),
    InvalidAggregation(String),
    Filter(FilterError),
}

impl fmt::Display for AggregationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationError::UnknownType(tag) => write!(f, "unknown aggregation type: {tag}"),
            AggregationError::InvalidAggregation(msg) => write!(f, "invalid aggregation: {msg}"),
            AggregationError::Filter(e) => write!(f, "filter error: {e}"),
        }
    }
}

impl std::error::Error for AggregationError {}

impl From<FilterError> for AggregationError {
    fn from(e: FilterError) -> Self {
        AggregationError::Filter(e)
    }
}
