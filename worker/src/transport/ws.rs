use std::io;

use comms::{CodecErr, Serialize};
use futures::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
    tungstenite::{self, Message, protocol::WebSocketConfig},
};

use super::tls;
use crate::{
    config::WorkerOptions,
    endpoint::{Endpoint, Scheme},
};

/// Frames carried one per binary WebSocket message, prefix included.
pub(crate) struct WsConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    max_frame_len: usize,
    closed: bool,
}

impl WsConnection {
    pub async fn connect(endpoint: &Endpoint, options: &WorkerOptions) -> io::Result<Self> {
        let connector = match endpoint.scheme() {
            Scheme::Wss => Some(Connector::Rustls(tls::client_config(options.tls_insecure)?)),
            _ => None,
        };

        // Parameter frames easily outgrow tungstenite's default message limit.
        let limit = options.max_frame_len.saturating_add(comms::LEN_TYPE_SIZE);
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(limit);
        config.max_frame_size = Some(limit);

        let uri = endpoint.to_string();
        let (ws, response) =
            connect_async_tls_with_config(uri.as_str(), Some(config), options.nodelay, connector)
                .await
                .map_err(into_io)?;

        info!("connected to {uri}, handshake status {}", response.status());

        Ok(Self {
            ws,
            max_frame_len: options.max_frame_len,
            closed: false,
        })
    }

    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        let mut frame = Vec::new();
        comms::encode_frame(msg, &mut frame)?;

        let len = frame.len();
        self.ws
            .send(Message::Binary(frame))
            .await
            .map_err(into_io)?;

        trace!(len = len; "sent ws frame");
        Ok(())
    }

    pub async fn recv_frame<'buf>(&mut self, buf: &'buf mut Vec<u8>) -> io::Result<&'buf [u8]> {
        loop {
            let msg = match self.ws.next().await {
                Some(msg) => msg.map_err(into_io)?,
                None => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            };

            match msg {
                Message::Binary(data) => {
                    *buf = data;
                    let frame: &'buf [u8] = buf;
                    let body = comms::frame_body(frame)?;

                    if body.len() > self.max_frame_len {
                        let max = self.max_frame_len;
                        return Err(CodecErr::FrameTooLarge { len: body.len(), max }.into());
                    }

                    trace!(len = body.len(); "received ws frame");
                    return Ok(body);
                }
                Message::Close(frame) => {
                    debug!("remote closed the websocket: {frame:?}");
                    self.closed = true;
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "websocket closed by the remote",
                    ));
                }
                Message::Text(text) => {
                    warn!("dropping text message of {} bytes", text.len());
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "text message on a binary protocol",
                    ));
                }
                // Pings are answered by tungstenite itself.
                _ => continue,
            }
        }
    }

    pub async fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        match self.ws.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(into_io(e)),
        }
    }
}

fn into_io(e: tungstenite::Error) -> io::Error {
    match e {
        tungstenite::Error::Io(e) => e,
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            io::Error::new(io::ErrorKind::ConnectionAborted, e)
        }
        e => io::Error::other(e),
    }
}
