//! A parameter source serving snapshots to workers over TCP and WebSockets.

pub mod generation;
mod peer;
mod server;
mod state;

pub use peer::{Peer, StreamPeer, WsPeer};
pub use server::ParamSource;
pub use state::{DEFAULT_RETURNS_CAPACITY, SourceState};
