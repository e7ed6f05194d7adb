use std::io;

use comms::{FrameReceiver, FrameSender, Serialize};
use log::{debug, info};
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::{config::WorkerOptions, endpoint::Endpoint};

/// Length delimited frames straight over a TCP stream.
pub(crate) struct TcpConnection {
    rx: FrameReceiver<OwnedReadHalf>,
    tx: FrameSender<OwnedWriteHalf>,
    closed: bool,
}

impl TcpConnection {
    pub async fn connect(endpoint: &Endpoint, options: &WorkerOptions) -> io::Result<Self> {
        let addr = endpoint.authority();
        let stream = TcpStream::connect(&addr).await?;
        stream.set_nodelay(options.nodelay)?;
        info!("connected to tcp://{addr}");

        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);

        Ok(Self {
            rx: rx.with_max_frame_len(options.max_frame_len),
            tx,
            closed: false,
        })
    }

    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.tx.send(msg).await
    }

    pub async fn recv_frame<'buf>(&mut self, buf: &'buf mut Vec<u8>) -> io::Result<&'buf [u8]> {
        self.rx.recv_frame(buf).await
    }

    pub async fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        debug!("shutting down tcp stream");
        self.tx.shutdown().await
    }
}
