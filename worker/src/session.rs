use std::io;

use comms::{CodecErr, Deserialize, msg::Msg};
use log::{debug, trace};
use tokio::time;

use crate::{
    config::WorkerOptions,
    endpoint::Endpoint,
    error::{Result, WorkerErr},
    signal::Signal,
    transport::Connection,
};

/// The request/response exchange with a parameter source over one connection.
///
/// Responses are matched to requests by order, callers must not interleave
/// two requests on the same session.
pub(crate) struct Session {
    conn: Connection,
    rx_buf: Vec<u8>,
}

impl Session {
    /// Establishes the connection to `endpoint`.
    ///
    /// # Arguments
    /// * `endpoint` - Where the parameter source listens.
    /// * `options` - The worker's connection settings.
    ///
    /// # Returns
    /// A new session or `WorkerErr::Connect`.
    pub async fn open(endpoint: &Endpoint, options: &WorkerOptions) -> Result<Self> {
        let connect = Connection::connect(endpoint, options);

        let conn = match options.connect_timeout {
            Some(after) => match time::timeout(after, connect).await {
                Ok(conn) => conn,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no connection within {}ms", after.as_millis()),
                )),
            },
            None => connect.await,
        };

        let conn = conn.map_err(|source| WorkerErr::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;

        Ok(Self {
            conn,
            rx_buf: Vec::with_capacity(options.recv_buffer_hint),
        })
    }

    /// Fetches the current parameter snapshot into `dst`.
    ///
    /// `dst` is only written once the whole response has been received and
    /// validated.
    ///
    /// # Arguments
    /// * `dst` - Replaced with the received values.
    pub async fn fetch_parameters_into(&mut self, dst: &mut Vec<f64>) -> Result<()> {
        self.send(&Msg::FetchRequest).await?;

        match self.recv().await? {
            Msg::FetchResponse(params) => {
                params.copy_into(dst);
                trace!(len = dst.len(); "fetched parameters");
                Ok(())
            }
            other => Err(unexpected("fetch_response", &other)),
        }
    }

    /// Reports a scalar return, the remote sends no acknowledgement.
    pub async fn send_returns(&mut self, value: f64) -> Result<()> {
        self.send(&Msg::ReturnsRequest(value)).await
    }

    /// Asks for a pending signal, the remote answers right away.
    pub async fn poll_signal(&mut self) -> Result<Option<Signal>> {
        self.send(&Msg::SignalPoll).await?;

        match self.recv().await? {
            Msg::SignalResponse(signal) => Ok(signal.map(Signal::from)),
            other => Err(unexpected("signal_response", &other)),
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        debug!("closing session");
        self.conn.close().await.map_err(WorkerErr::lost)
    }

    async fn send(&mut self, msg: &Msg<'_>) -> Result<()> {
        self.conn.send(msg).await.map_err(WorkerErr::from_io)
    }

    async fn recv(&mut self) -> Result<Msg<'_>> {
        let body = self
            .conn
            .recv_frame(&mut self.rx_buf)
            .await
            .map_err(WorkerErr::from_io)?;

        Ok(Msg::deserialize(body)?)
    }
}

fn unexpected(expected: &'static str, got: &Msg<'_>) -> WorkerErr {
    CodecErr::UnexpectedMessage {
        expected,
        got: got.kind(),
    }
    .into()
}
