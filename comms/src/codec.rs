//! Wire representation of a parameter buffer: `count:u32 LE | count x f64 LE`.

use std::{borrow::Cow, ptr};

use crate::CodecErr;

type CountType = u32;
const COUNT_SIZE: usize = size_of::<CountType>();

/// Size in bytes of a single encoded parameter.
pub const F64_SIZE: usize = size_of::<f64>();

/// A view over an encoded run of `f64` parameters.
///
/// On little endian hosts a `Params` built from values borrows them as raw
/// bytes, so encoding never copies the buffer. A `Params` decoded from the wire
/// borrows the receive buffer, so decoding costs a single bulk copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Params<'a> {
    bytes: Cow<'a, [u8]>,
}

impl<'a> Params<'a> {
    /// Creates a new `Params` from a slice of values.
    ///
    /// # Arguments
    /// * `values` - The parameters to encode.
    ///
    /// # Returns
    /// A new `Params` instance.
    pub fn from_values(values: &'a [f64]) -> Self {
        #[cfg(target_endian = "little")]
        let bytes = Cow::Borrowed(bytemuck::cast_slice(values));

        #[cfg(target_endian = "big")]
        let bytes = Cow::Owned(values.iter().flat_map(|v| v.to_le_bytes()).collect());

        Self { bytes }
    }

    /// Wraps already validated little endian bytes, `bytes.len()` must be a multiple of `F64_SIZE`.
    pub(crate) fn from_wire(bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len() % F64_SIZE, 0);
        Self {
            bytes: Cow::Borrowed(bytes),
        }
    }

    /// The amount of parameters in this view.
    pub fn len(&self) -> usize {
        self.bytes.len() / F64_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The encoded little endian bytes, without the count header.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the parameters into `dst`, replacing its contents.
    ///
    /// The previous allocation of `dst` is reused when it's large enough.
    ///
    /// # Arguments
    /// * `dst` - The destination buffer.
    pub fn copy_into(&self, dst: &mut Vec<f64>) {
        let n = self.len();
        dst.clear();
        dst.reserve(n);

        // SAFETY: `dst` has capacity for at least `n` values and exactly `n * F64_SIZE`
        //         bytes are written before the length is set. Every bit pattern is a
        //         valid `f64`, and the source never overlaps a freshly reserved region.
        unsafe {
            ptr::copy_nonoverlapping(
                self.bytes.as_ptr(),
                dst.as_mut_ptr().cast::<u8>(),
                n * F64_SIZE,
            );
            dst.set_len(n);
        }

        #[cfg(target_endian = "big")]
        for v in dst.iter_mut() {
            *v = f64::from_bits(v.to_bits().swap_bytes());
        }
    }

    /// Copies the parameters into a new vector.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut out = Vec::new();
        self.copy_into(&mut out);
        out
    }

    /// Writes the count header into `buf`.
    ///
    /// # Returns
    /// The encoded values, to be written right after the header.
    pub(crate) fn write_header(&self, buf: &mut Vec<u8>) -> &[u8] {
        buf.extend_from_slice(&(self.len() as CountType).to_le_bytes());
        &self.bytes
    }

    /// Parses a parameter payload, validating its declared count.
    pub(crate) fn parse(payload: &'a [u8]) -> Result<Self, CodecErr> {
        if payload.len() < COUNT_SIZE {
            return Err(CodecErr::Truncated {
                needed: COUNT_SIZE,
                got: payload.len(),
            });
        }

        let (count, values) = payload.split_at(COUNT_SIZE);

        // SAFETY: `count` was split to be exactly `COUNT_SIZE` bytes long just above.
        let declared = CountType::from_le_bytes(count.try_into().unwrap()) as usize;

        if declared.checked_mul(F64_SIZE) != Some(values.len()) {
            return Err(CodecErr::CountMismatch {
                declared,
                available: values.len(),
            });
        }

        Ok(Self::from_wire(values))
    }
}

/// Appends the wire representation of `values` to `buf`.
///
/// # Arguments
/// * `values` - The parameters to encode.
/// * `buf` - Where to write the count header and the values.
pub fn encode_params(values: &[f64], buf: &mut Vec<u8>) {
    let params = Params::from_values(values);
    let bytes = params.write_header(buf);
    buf.extend_from_slice(bytes);
}

/// Decodes a parameter payload into `dst`.
///
/// # Arguments
/// * `payload` - The count header followed by the encoded values.
/// * `dst` - The destination buffer, left untouched on failure.
///
/// # Returns
/// A `CodecErr` if the declared count doesn't match the available bytes.
pub fn decode_params_into(payload: &[u8], dst: &mut Vec<f64>) -> Result<(), CodecErr> {
    Params::parse(payload)?.copy_into(dst);
    Ok(())
}
