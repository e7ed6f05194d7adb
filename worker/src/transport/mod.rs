//! The byte level connection to a parameter source, one variant per endpoint scheme.

mod tcp;
mod tls;
mod ws;

use std::io;

use comms::Serialize;

use crate::{
    config::WorkerOptions,
    endpoint::{Endpoint, Scheme},
};

pub(crate) use tcp::TcpConnection;
pub(crate) use ws::WsConnection;

/// An established connection, chosen once by the endpoint's scheme.
pub(crate) enum Connection {
    Tcp(TcpConnection),
    Ws(WsConnection),
}

impl Connection {
    /// Opens a connection to `endpoint`, handshakes included.
    ///
    /// # Arguments
    /// * `endpoint` - Where the parameter source listens.
    /// * `options` - The worker's connection settings.
    ///
    /// # Returns
    /// The connection or the `io::Error` that prevented it.
    pub async fn connect(endpoint: &Endpoint, options: &WorkerOptions) -> io::Result<Self> {
        match endpoint.scheme() {
            Scheme::Tcp => TcpConnection::connect(endpoint, options).await.map(Self::Tcp),
            Scheme::Ws | Scheme::Wss => WsConnection::connect(endpoint, options).await.map(Self::Ws),
        }
    }

    /// Sends `msg` as a single frame.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        match self {
            Self::Tcp(conn) => conn.send(msg).await,
            Self::Ws(conn) => conn.send(msg).await,
        }
    }

    /// Waits for the next frame and returns its body.
    ///
    /// # Arguments
    /// * `buf` - Receive buffer reused across calls, the body borrows from it.
    pub async fn recv_frame<'buf>(&mut self, buf: &'buf mut Vec<u8>) -> io::Result<&'buf [u8]> {
        match self {
            Self::Tcp(conn) => conn.recv_frame(buf).await,
            Self::Ws(conn) => conn.recv_frame(buf).await,
        }
    }

    /// Closes the connection, closing twice is a no-op.
    pub async fn close(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(conn) => conn.close().await,
            Self::Ws(conn) => conn.close().await,
        }
    }
}
