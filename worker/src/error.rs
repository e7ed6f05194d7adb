use std::{error::Error, fmt, io, time::Duration};

use comms::CodecErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker client failures.
#[derive(Debug)]
pub enum WorkerErr {
    /// The endpoint URI couldn't be parsed.
    InvalidEndpoint { uri: String, reason: String },
    /// The connection was never established.
    Connect { endpoint: String, source: io::Error },
    /// The connection broke mid call, or an earlier call already closed it.
    ConnectionLost { detail: String },
    /// No response arrived within the configured call timeout.
    Timeout { after: Duration },
    /// The remote sent a malformed or unexpected response.
    Codec(CodecErr),
}

impl WorkerErr {
    /// Whether the session can't be used anymore after this error.
    ///
    /// A codec error on a fully consumed frame leaves the stream positioned at
    /// the next frame boundary, every other failure mid call doesn't.
    pub fn closes_session(&self) -> bool {
        match self {
            Self::ConnectionLost { .. } | Self::Timeout { .. } => true,
            Self::Codec(e) => e.is_desync(),
            Self::InvalidEndpoint { .. } | Self::Connect { .. } => false,
        }
    }

    pub(crate) fn lost(detail: impl fmt::Display) -> Self {
        Self::ConnectionLost {
            detail: detail.to_string(),
        }
    }

    /// Classifies an I/O failure on an established connection.
    ///
    /// Decoding failures travel through the frame receiver as `InvalidData`
    /// errors carrying a `CodecErr`, anything else is a broken transport.
    pub(crate) fn from_io(e: io::Error) -> Self {
        match CodecErr::from_io(&e) {
            Some(codec) => Self::Codec(codec.clone()),
            None => Self::lost(e),
        }
    }
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::InvalidEndpoint { uri, reason } => {
                write!(f, "invalid endpoint '{uri}': {reason}")
            }
            WorkerErr::Connect { endpoint, source } => {
                write!(f, "failed to connect to {endpoint}: {source}")
            }
            WorkerErr::ConnectionLost { detail } => write!(f, "connection lost: {detail}"),
            WorkerErr::Timeout { after } => {
                write!(f, "no response within {}ms", after.as_millis())
            }
            WorkerErr::Codec(e) => write!(f, "malformed response: {e}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Connect { source, .. } => Some(source),
            WorkerErr::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecErr> for WorkerErr {
    fn from(value: CodecErr) -> Self {
        Self::Codec(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        let kind = match &value {
            WorkerErr::InvalidEndpoint { .. } => io::ErrorKind::InvalidInput,
            WorkerErr::Connect { source, .. } => source.kind(),
            WorkerErr::ConnectionLost { .. } => io::ErrorKind::ConnectionAborted,
            WorkerErr::Timeout { .. } => io::ErrorKind::TimedOut,
            WorkerErr::Codec(_) => io::ErrorKind::InvalidData,
        };

        io::Error::new(kind, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_travel_through_io() {
        let io_err: io::Error = CodecErr::UnknownTag(7).into();
        let err = WorkerErr::from_io(io_err);

        assert!(matches!(err, WorkerErr::Codec(CodecErr::UnknownTag(7))));
        assert!(!err.closes_session());
    }

    #[test]
    fn broken_pipes_lose_the_connection() {
        let err = WorkerErr::from_io(io::Error::from(io::ErrorKind::BrokenPipe));

        assert!(matches!(err, WorkerErr::ConnectionLost { .. }));
        assert!(err.closes_session());
    }

    #[test]
    fn oversized_frames_close_the_session() {
        let err = WorkerErr::from(CodecErr::FrameTooLarge { len: 10, max: 1 });
        assert!(err.closes_session());
    }

    #[test]
    fn io_boundary_keeps_the_kind() {
        let err: io::Error = WorkerErr::Timeout {
            after: Duration::from_millis(5),
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(err.to_string(), "no response within 5ms");
    }
}
