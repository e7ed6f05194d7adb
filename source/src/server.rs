use std::{future, io, net::SocketAddr, sync::Arc};

use comms::{CodecErr, Deserialize, Params, msg::Msg};
use log::{debug, info, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    task::{self, JoinSet},
};

use crate::{
    peer::{Peer, StreamPeer, WsPeer},
    state::SourceState,
};

/// The largest frame accepted from a worker, requests are a handful of bytes.
const MAX_REQUEST_LEN: usize = 1 << 16;

/// Serves the parameter snapshot of a `SourceState` to any number of workers.
///
/// Every connection runs as its own task and answers its worker's requests in
/// order until it hangs up.
pub struct ParamSource {
    state: Arc<SourceState>,
    tasks: JoinSet<io::Result<()>>,
}

impl ParamSource {
    /// Creates a new `ParamSource`.
    ///
    /// # Arguments
    /// * `state` - The state shared by every connection.
    pub fn new(state: Arc<SourceState>) -> Self {
        Self {
            state,
            tasks: JoinSet::new(),
        }
    }

    pub fn state(&self) -> &Arc<SourceState> {
        &self.state
    }

    /// Binds a new worker to this source and spawns its own task.
    ///
    /// # Arguments
    /// * `peer` - The connected worker.
    pub fn spawn<P: Peer + 'static>(&mut self, peer: P) {
        let state = Arc::clone(&self.state);
        self.tasks.spawn(Self::answer(state, peer));
    }

    /// Accepts workers speaking raw TCP frames until an accept fails.
    pub async fn serve_tcp(&mut self, listener: TcpListener) -> io::Result<()> {
        self.serve(Some(listener), None).await
    }

    /// Accepts WebSocket workers until an accept fails.
    pub async fn serve_ws(&mut self, listener: TcpListener) -> io::Result<()> {
        self.serve(None, Some(listener)).await
    }

    /// Accepts workers on both listeners while reaping finished connections.
    ///
    /// # Arguments
    /// * `tcp` - Listener for raw TCP workers, if any.
    /// * `ws` - Listener for WebSocket workers, if any.
    ///
    /// # Returns
    /// Only returns on an accept error.
    pub async fn serve(
        &mut self,
        tcp: Option<TcpListener>,
        ws: Option<TcpListener>,
    ) -> io::Result<()> {
        loop {
            tokio::select! {
                conn = accept(&tcp) => {
                    let (stream, addr) = conn?;
                    info!("tcp worker connected from {addr}");
                    self.spawn(StreamPeer::tcp(stream)?);
                }
                conn = accept(&ws) => {
                    let (stream, addr) = conn?;
                    info!("websocket worker connected from {addr}");
                    let state = Arc::clone(&self.state);
                    self.tasks.spawn(async move {
                        let peer = WsPeer::accept(stream, MAX_REQUEST_LEN).await?;
                        Self::answer(state, peer).await
                    });
                }
                Some(ret) = self.tasks.join_next() => match ret {
                    Ok(Ok(())) => debug!("worker disconnected"),
                    Ok(Err(e)) => warn!("worker connection failed: {e}"),
                    Err(e) => warn!("worker task panicked: {e}"),
                },
            }
        }
    }

    /// Waits for every connected worker to hang up.
    pub async fn run(&mut self) -> io::Result<()> {
        while let Some(ret) = self.tasks.join_next().await {
            ret??
        }

        Ok(())
    }

    /// Answers one worker's requests until it disconnects.
    async fn answer<P: Peer>(state: Arc<SourceState>, mut peer: P) -> io::Result<()> {
        let mut rx_buf = Vec::new();

        while let Some(body) = peer.recv_frame(&mut rx_buf).await? {
            match Msg::deserialize(body)? {
                Msg::FetchRequest => {
                    if state.refresh_on_fetch() {
                        let state = Arc::clone(&state);
                        task::spawn_blocking(move || state.refresh()).await?;
                    }

                    let snapshot = state.fetch();
                    let msg = Msg::FetchResponse(Params::from_values(&snapshot));
                    peer.send(&msg).await?;
                }
                Msg::ReturnsRequest(value) => state.record_returns(value),
                Msg::SignalPoll => {
                    let signal = state.pop_signal();
                    peer.send(&Msg::SignalResponse(signal.as_deref())).await?;
                }
                other => {
                    warn!("worker sent a {}, dropping it", other.kind());
                    return Err(CodecErr::UnexpectedMessage {
                        expected: "request",
                        got: other.kind(),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}

async fn accept(listener: &Option<TcpListener>) -> io::Result<(TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => future::pending().await,
    }
}
