mod codec;
mod deserialize;
mod error;
mod frame;
pub mod msg;
mod receiver;
mod sender;
mod serialize;

use tokio::io::{AsyncRead, AsyncWrite};

pub use codec::{F64_SIZE, Params, decode_params_into, encode_params};
pub use deserialize::Deserialize;
pub use error::CodecErr;
pub use frame::{LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN, encode_frame, frame_body};
pub use receiver::FrameReceiver;
pub use sender::FrameSender;
pub use serialize::Serialize;

/// Creates both `FrameReceiver` and `FrameSender` network channel parts.
///
/// Given a reader and writer creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of a frame receiver and sender.
pub fn channel<R, W>(rx: R, tx: W) -> (FrameReceiver<R>, FrameSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (FrameReceiver::new(rx), FrameSender::new(tx))
}
