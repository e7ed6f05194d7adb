use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// Failures while decoding a frame body into a message.
///
/// A `CodecErr` is only produced after a whole frame has been consumed from the
/// stream, the exception being `FrameTooLarge`, which is raised before reading
/// the body and therefore leaves the stream in an unknown position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecErr {
    /// The body ended before a fixed size field could be read.
    Truncated { needed: usize, got: usize },
    /// The tag byte doesn't name any known message kind.
    UnknownTag(u8),
    /// The declared parameter count disagrees with the bytes that follow it.
    CountMismatch { declared: usize, available: usize },
    /// A fixed size payload had the wrong length.
    PayloadLength {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    /// The signal presence flag wasn't 0 or 1.
    InvalidSignalFlag(u8),
    /// The length prefix exceeds the configured limit.
    FrameTooLarge { len: usize, max: usize },
    /// The length prefix of a self delimited frame disagrees with its size.
    PrefixMismatch { declared: usize, actual: usize },
    /// A well formed message arrived where another kind was expected.
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },
}

impl CodecErr {
    /// Whether the stream can no longer be trusted to be positioned at a frame boundary.
    pub fn is_desync(&self) -> bool {
        matches!(self, Self::FrameTooLarge { .. })
    }

    /// Returns the `CodecErr` carried inside an `io::Error`, if any.
    ///
    /// # Arguments
    /// * `err` - An error returned by a frame receiver.
    pub fn from_io(err: &io::Error) -> Option<&CodecErr> {
        err.get_ref().and_then(|inner| inner.downcast_ref())
    }
}

impl Display for CodecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, got } => {
                write!(f, "truncated frame: needed {needed} bytes, got {got}")
            }
            Self::UnknownTag(tag) => write!(f, "unknown message tag {tag}"),
            Self::CountMismatch {
                declared,
                available,
            } => write!(
                f,
                "parameter count mismatch: declared {declared} values, {available} bytes available"
            ),
            Self::PayloadLength {
                kind,
                expected,
                got,
            } => write!(
                f,
                "invalid {kind} payload: expected {expected} bytes, got {got}"
            ),
            Self::InvalidSignalFlag(flag) => write!(f, "invalid signal flag {flag}"),
            Self::FrameTooLarge { len, max } => {
                write!(f, "frame of {len} bytes exceeds the limit of {max} bytes")
            }
            Self::PrefixMismatch { declared, actual } => write!(
                f,
                "length prefix declares {declared} bytes but the frame carries {actual}"
            ),
            Self::UnexpectedMessage { expected, got } => {
                write!(f, "unexpected message: expected {expected}, got {got}")
            }
        }
    }
}

impl Error for CodecErr {}

impl From<CodecErr> for io::Error {
    fn from(value: CodecErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}
