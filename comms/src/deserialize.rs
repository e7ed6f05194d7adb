use crate::CodecErr;

/// Reads a message out of a frame body, borrowing from it where possible.
pub trait Deserialize<'a>: Sized {
    fn deserialize(body: &'a [u8]) -> Result<Self, CodecErr>;
}
