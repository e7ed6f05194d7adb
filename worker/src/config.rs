use std::{io, time::Duration};

use serde::{Deserialize, Serialize};

/// The default bound on establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Room for 16M `f64` values plus the message header.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 27;

/// Connection and call settings for a worker instance.
///
/// Durations are written as milliseconds when (de)serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerOptions {
    /// Upper bound on the connect and handshake phase, `None` waits forever.
    #[serde(with = "opt_millis")]
    pub connect_timeout: Option<Duration>,
    /// Upper bound on every round trip, `None` waits forever.
    #[serde(with = "opt_millis")]
    pub call_timeout: Option<Duration>,
    /// The largest frame body accepted from the remote.
    pub max_frame_len: usize,
    /// Disables Nagle's algorithm on the underlying socket.
    pub nodelay: bool,
    /// Accepts any TLS certificate on `wss` endpoints.
    pub tls_insecure: bool,
    /// Bytes to preallocate for the receive buffer.
    pub recv_buffer_hint: usize,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            call_timeout: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            nodelay: true,
            tls_insecure: false,
            recv_buffer_hint: 0,
        }
    }
}

impl WorkerOptions {
    /// Parses options from a json document, missing fields take their defaults.
    ///
    /// # Arguments
    /// * `json` - The json text.
    ///
    /// # Returns
    /// The options or an `InvalidData` io error describing the problem.
    pub fn from_json(json: &str) -> io::Result<Self> {
        serde_json::from_str(json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let millis = Option::<u64>::deserialize(d)?;
        Ok(millis.map(Duration::from_millis))
    }
}
