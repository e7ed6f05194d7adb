/// Writes a message body into a frame buffer.
pub trait Serialize<'a> {
    /// Appends the head of the body to `buf`.
    ///
    /// # Returns
    /// An optional tail to be written right after `buf` without being copied into it.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
