pub mod error;
pub mod services;
pub mod traits;

pub use error::AggregationError;
pub use services::aggregation_service::{AggregationService, BatchReport, WorkerSettings};
pub use traits::TradeLedger;
