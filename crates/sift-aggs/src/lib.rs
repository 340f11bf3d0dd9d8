mod aggregation;
mod buckets;
mod error;

pub use aggregation::{Aggregation, FilterAggregation};
pub use buckets::{BucketsAggregation, DateInterval};
pub use error::AggregationError;
