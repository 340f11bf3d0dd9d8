mod condition;
mod error;
mod filter;
mod query;

pub use condition::{Condition, all, any, eq, find, gt, gte, lt, lte, neq, nfind, prefix};
pub use error::FilterError;
pub use filter::{Filter, FilterJson, SortDirection, Statement};
pub use query::Query;
