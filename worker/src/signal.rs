use std::{fmt, str};

/// An out of band message from the remote source.
#[derive(Clone, PartialEq, Eq)]
pub struct Signal {
    bytes: Vec<u8>,
}

impl Signal {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The payload as text, if it is valid utf-8.
    pub fn as_str(&self) -> Option<&str> {
        str::from_utf8(&self.bytes).ok()
    }
}

impl From<&[u8]> for Signal {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl From<Vec<u8>> for Signal {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.debug_tuple("Signal").field(&s).finish(),
            None => f.debug_tuple("Signal").field(&self.bytes).finish(),
        }
    }
}
