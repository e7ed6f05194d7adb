use std::io;

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{CodecErr, Deserialize, LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN};

/// The receiving end handle of the communication.
pub struct FrameReceiver<R: AsyncRead + Unpin> {
    rx: R,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReceiver<R> {
    /// Creates a new `FrameReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Bounds the size of the frames this receiver accepts.
    ///
    /// # Arguments
    /// * `max_frame_len` - The largest body, in bytes, that will be read.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Waits to receive a whole frame from the inner reader.
    ///
    /// `buf` keeps its allocation between calls, a steady stream of equally sized
    /// frames only allocates once.
    ///
    /// # Arguments
    /// * `buf` - The buffer where the frame body is read into.
    ///
    /// # Returns
    /// The frame body on success or `io::Error` on failure. A body over the size
    /// limit yields an `InvalidData` error carrying `CodecErr::FrameTooLarge`.
    pub async fn recv_frame<'buf>(&mut self, buf: &'buf mut Vec<u8>) -> io::Result<&'buf [u8]> {
        match self.try_recv_frame(buf).await? {
            Some(body) => Ok(body),
            None => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
        }
    }

    /// Like `recv_frame`, but tells a clean hang up apart from a cut frame.
    ///
    /// # Arguments
    /// * `buf` - The buffer where the frame body is read into.
    ///
    /// # Returns
    /// `None` if the reader ended right at a frame boundary. Ending anywhere
    /// else is an `UnexpectedEof` error.
    pub async fn try_recv_frame<'buf>(
        &mut self,
        buf: &'buf mut Vec<u8>,
    ) -> io::Result<Option<&'buf [u8]>> {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        let mut filled = 0;

        while filled < LEN_TYPE_SIZE {
            match self.rx.read(&mut size_buf[filled..]).await? {
                0 if filled == 0 => return Ok(None),
                0 => return Err(cut_frame()),
                n => filled += n,
            }
        }

        let len = LenType::from_le_bytes(size_buf) as usize;

        if len > self.max_frame_len {
            let max = self.max_frame_len;
            return Err(CodecErr::FrameTooLarge { len, max }.into());
        }

        buf.resize(len, 0);
        self.rx.read_exact(buf).await.map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => cut_frame(),
            _ => e,
        })?;
        trace!(len = len; "received frame");

        Ok(Some(buf.as_slice()))
    }

    /// Waits to receive a new message from the inner receiver.
    ///
    /// # Arguments
    /// * `buf` - The buffer to use for deserialization, the returned
    ///           `T`'s lifetimes will be tied to this buffer.
    ///
    /// # Returns
    /// A result object that returns `T` on success or `io::Error` on failure,
    /// decoding failures being reported as `InvalidData`.
    pub async fn recv_into<'buf, T>(&mut self, buf: &'buf mut Vec<u8>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
    {
        let body = self.recv_frame(buf).await?;
        Ok(T::deserialize(body)?)
    }
}

fn cut_frame() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended inside a frame")
}
