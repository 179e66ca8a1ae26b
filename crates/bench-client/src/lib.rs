//! HTTP side of the benchmark: request bodies and single-request runs.

pub mod client;
pub mod error;
pub mod request;

pub use client::BenchClient;
pub use error::{ClientError, Result};
pub use request::{BenchRequest, Endpoint};
