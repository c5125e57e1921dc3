mod cors;
mod requests_logging;

pub use cors::make_cors_layer;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
