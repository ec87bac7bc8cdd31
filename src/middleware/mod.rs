pub mod request_logger;

pub use request_logger::{HttpLogPayload, log_request};
