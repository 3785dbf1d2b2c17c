pub mod error;
pub mod handlers;
pub mod ingestion;
pub mod server;
pub mod throttle;

pub use error::ApiError;
pub use ingestion::IngestionGateway;
pub use server::{ApiServer, AppState};
pub use throttle::ClientThrottle;
