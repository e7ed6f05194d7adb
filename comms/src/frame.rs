//! Frame layout: `length:u32 LE | body`, where the length covers the whole body.

use std::io;

use crate::{CodecErr, Serialize};

pub type LenType = u32;
pub const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// The largest body a length prefix can describe.
pub const MAX_FRAME_LEN: usize = LenType::MAX as usize;

/// Converts a body length into its wire prefix.
pub(crate) fn len_prefix(len: usize) -> io::Result<[u8; LEN_TYPE_SIZE]> {
    let len = LenType::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame body of {len} bytes doesn't fit a {LEN_TYPE_SIZE} byte length prefix"),
        )
    })?;

    Ok(len.to_le_bytes())
}

/// Serializes `msg` as a complete, contiguous frame into `out`.
///
/// Used by transports that delimit messages themselves and need the whole frame
/// in a single buffer.
///
/// # Arguments
/// * `msg` - A serializable object.
/// * `out` - Cleared and filled with the length prefix and the body.
///
/// # Returns
/// An `io::Error` if the body is too large for the length prefix.
pub fn encode_frame<'a, T: Serialize<'a>>(msg: &'a T, out: &mut Vec<u8>) -> io::Result<()> {
    out.clear();
    out.resize(LEN_TYPE_SIZE, 0);

    if let Some(tail) = msg.serialize(out) {
        out.extend_from_slice(tail);
    }

    let prefix = len_prefix(out.len() - LEN_TYPE_SIZE)?;
    out[..LEN_TYPE_SIZE].copy_from_slice(&prefix);
    Ok(())
}

/// Validates the length prefix of a complete frame and returns its body.
///
/// # Arguments
/// * `frame` - The length prefix followed by the body.
///
/// # Returns
/// The body, or a `CodecErr` if the prefix is missing or disagrees with the frame size.
pub fn frame_body(frame: &[u8]) -> Result<&[u8], CodecErr> {
    if frame.len() < LEN_TYPE_SIZE {
        return Err(CodecErr::Truncated {
            needed: LEN_TYPE_SIZE,
            got: frame.len(),
        });
    }

    let (prefix, body) = frame.split_at(LEN_TYPE_SIZE);

    // SAFETY: `prefix` was split to be exactly `LEN_TYPE_SIZE` bytes long just above.
    let declared = LenType::from_le_bytes(prefix.try_into().unwrap()) as usize;

    if declared != body.len() {
        return Err(CodecErr::PrefixMismatch {
            declared,
            actual: body.len(),
        });
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::Msg;

    #[test]
    fn frames_a_returns_request() {
        let mut out = Vec::new();
        encode_frame(&Msg::ReturnsRequest(2.5), &mut out).unwrap();

        let mut expected = 9u32.to_le_bytes().to_vec();
        expected.push(3);
        expected.extend_from_slice(&2.5f64.to_le_bytes());
        assert_eq!(out, expected);
    }

    #[test]
    fn body_roundtrip() {
        let mut out = Vec::new();
        encode_frame(&Msg::SignalPoll, &mut out).unwrap();
        assert_eq!(frame_body(&out).unwrap(), &[4]);
    }

    #[test]
    fn rejects_lying_prefix() {
        let frame = [5, 0, 0, 0, 1];
        assert_eq!(
            frame_body(&frame),
            Err(CodecErr::PrefixMismatch {
                declared: 5,
                actual: 1
            })
        );
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            frame_body(&[1, 0]),
            Err(CodecErr::Truncated { needed: 4, got: 2 })
        ));
    }
}
