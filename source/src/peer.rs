use std::io;

use comms::{FrameReceiver, FrameSender, msg::Msg};
use futures::{SinkExt, StreamExt};
use log::{debug, trace};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{
        self, Message,
        handshake::server::{ErrorResponse, Request, Response},
        protocol::WebSocketConfig,
    },
};

/// One connected worker, as seen from the source.
#[allow(unused)]
#[trait_variant::make(Peer: Send)]
pub trait PeerTemplate {
    /// Should wait for the next frame sent by the worker.
    ///
    /// # Arguments
    /// * `buf` - Receive buffer reused across calls.
    ///
    /// # Returns
    /// The frame body, `None` once the worker hung up, or an io error.
    async fn recv_frame<'buf>(&mut self, buf: &'buf mut Vec<u8>)
    -> io::Result<Option<&'buf [u8]>>;

    /// Should send `msg` to the worker as a single frame.
    async fn send(&mut self, msg: &Msg<'_>) -> io::Result<()>;
}

/// A worker speaking length delimited frames over a byte stream.
pub struct StreamPeer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: FrameReceiver<R>,
    tx: FrameSender<W>,
}

impl<R, W> StreamPeer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(rx: FrameReceiver<R>, tx: FrameSender<W>) -> Self {
        Self { rx, tx }
    }
}

impl StreamPeer<OwnedReadHalf, OwnedWriteHalf> {
    /// Wraps an accepted TCP connection.
    pub fn tcp(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        Ok(Self::new(rx, tx))
    }
}

impl<R, W> Peer for StreamPeer<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv_frame<'buf>(
        &mut self,
        buf: &'buf mut Vec<u8>,
    ) -> io::Result<Option<&'buf [u8]>> {
        self.rx.try_recv_frame(buf).await
    }

    async fn send(&mut self, msg: &Msg<'_>) -> io::Result<()> {
        self.tx.send(msg).await
    }
}

/// A worker sending one whole frame per binary WebSocket message.
pub struct WsPeer {
    ws: WebSocketStream<TcpStream>,
}

impl WsPeer {
    /// Runs the server side handshake on an accepted connection.
    ///
    /// # Arguments
    /// * `stream` - The accepted TCP connection.
    /// * `max_frame_len` - The largest message accepted from the worker.
    pub async fn accept(stream: TcpStream, max_frame_len: usize) -> io::Result<Self> {
        stream.set_nodelay(true)?;

        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(max_frame_len);
        config.max_frame_size = Some(max_frame_len);

        let log_job = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            debug!("websocket worker joined job {}", req.uri().path());
            Ok(resp)
        };

        let ws = tokio_tungstenite::accept_hdr_async_with_config(stream, log_job, Some(config))
            .await
            .map_err(into_io)?;

        Ok(Self { ws })
    }
}

impl Peer for WsPeer {
    async fn recv_frame<'buf>(
        &mut self,
        buf: &'buf mut Vec<u8>,
    ) -> io::Result<Option<&'buf [u8]>> {
        loop {
            let msg = match self.ws.next().await {
                Some(msg) => msg.map_err(into_io)?,
                None => return Ok(None),
            };

            match msg {
                Message::Binary(data) => {
                    *buf = data;
                    let frame: &'buf [u8] = buf;
                    let body = comms::frame_body(frame)?;
                    trace!(len = body.len(); "received ws frame");
                    return Ok(Some(body));
                }
                Message::Close(_) => return Ok(None),
                Message::Text(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "text message on a binary protocol",
                    ));
                }
                _ => continue,
            }
        }
    }

    async fn send(&mut self, msg: &Msg<'_>) -> io::Result<()> {
        let mut frame = Vec::new();
        comms::encode_frame(msg, &mut frame)?;
        self.ws
            .send(Message::Binary(frame))
            .await
            .map_err(into_io)
    }
}

fn into_io(e: tungstenite::Error) -> io::Error {
    match e {
        tungstenite::Error::Io(e) => e,
        e => io::Error::other(e),
    }
}
