//! Service Layer
//!
//! Business logic behind the HTTP handlers. Services speak the core error
//! types; handlers convert them into `ApiError`.

mod dashboard_service;
pub mod export;
mod media_service;
mod metrics_aggregator;
mod role_filter;

pub use dashboard_service::*;
pub use export::{escape_csv_cell, flatten_json, to_csv};
pub use media_service::*;
pub use metrics_aggregator::*;
pub use role_filter::*;
