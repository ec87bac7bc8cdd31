#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod app;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod handler;
pub mod healthcheck;
pub mod middleware;
pub mod port;
pub mod proxy;
pub mod sink;
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;

pub use dispatcher::{Delivery, DispatchError, Kaho, SinkFlags};
pub use domain::{LogEntry, Severity};
pub use error::KahoError;
pub use healthcheck::{healthcheck, healthcheck_with_port};
