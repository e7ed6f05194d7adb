//! Blocking client for a remote parameter source.
//!
//! A [`Worker`] holds one connection, over raw TCP or a WebSocket, and exposes
//! three round trips: fetching the parameter snapshot, reporting a scalar
//! return and polling for an out of band signal.

pub mod buffer;
pub mod config;
pub mod endpoint;
pub mod error;
mod session;
pub mod signal;
mod transport;
pub mod worker;

pub use buffer::ParameterBuffer;
pub use config::WorkerOptions;
pub use endpoint::{Endpoint, Scheme};
pub use error::{Result, WorkerErr};
pub use signal::Signal;
pub use worker::Worker;

/// Connects a new worker to `uri` with the default options.
///
/// # Arguments
/// * `uri` - `tcp://host:port`, `ws://host[:port][/path]` or `wss://host[:port][/path]`.
///
/// # Returns
/// A connected worker, `WorkerErr::InvalidEndpoint` or `WorkerErr::Connect`.
pub fn create_worker(uri: &str) -> Result<Worker> {
    create_worker_with(uri, WorkerOptions::default())
}

/// Connects a new worker to `uri`.
///
/// # Arguments
/// * `uri` - The endpoint of the parameter source.
/// * `options` - Connection and call settings.
pub fn create_worker_with(uri: &str, options: WorkerOptions) -> Result<Worker> {
    let endpoint = uri.parse::<Endpoint>()?;
    Worker::connect(endpoint, options)
}
