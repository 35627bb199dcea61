//! Growable byte buffer with independent read and write cursors.
//!
//! The write cursor is the end of the written region; the read cursor moves
//! forward as values are decoded. Capacity doubles whenever a write does not
//! fit, so a message built value-by-value reallocates `O(log n)` times.
//!
//! # Example
//!
//! ```
//! use render_stream::codec::WireBuffer;
//!
//! let mut buf = WireBuffer::new();
//! buf.write(&7u32).write("hello");
//!
//! assert_eq!(buf.read::<u32>().unwrap(), 7);
//! assert_eq!(buf.read::<String>().unwrap(), "hello");
//! assert_eq!(buf.remaining(), 0);
//! ```

use bytes::{Bytes, BytesMut};

use super::{Decode, Encode};
use crate::error::{Error, Result};

/// Initial capacity of a fresh buffer.
pub const DEFAULT_CAPACITY: usize = 256;

/// A byte region owned by exactly one in-flight message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireBuffer {
    data: BytesMut,
    read: usize,
}

impl WireBuffer {
    /// Create an empty buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            read: 0,
        }
    }

    /// Wrap received bytes for reading. The write cursor sits at the end.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: BytesMut::from(bytes),
            read: 0,
        }
    }

    /// Append the encoding of `value`.
    pub fn write<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode(self);
        self
    }

    /// Decode the next `T` at the read cursor and advance past it.
    pub fn read<T: Decode>(&mut self) -> Result<T> {
        T::decode(self)
    }

    /// Append raw bytes, growing by doubling when needed.
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.grow_for(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Borrow the next `n` unread bytes and advance the read cursor.
    pub fn take(&mut self, n: usize) -> Result<&[u8]> {
        let available = self.remaining();
        if n > available {
            return Err(Error::UnexpectedEof {
                needed: n,
                available,
            });
        }
        let start = self.read;
        self.read += n;
        Ok(&self.data[start..start + n])
    }

    /// Read exactly `N` bytes into an array.
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Split off every unread byte, leaving the buffer fully consumed.
    pub fn take_rest(&mut self) -> Bytes {
        let rest = Bytes::copy_from_slice(&self.data[self.read..]);
        self.read = self.data.len();
        rest
    }

    /// Bytes written but not yet read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read
    }

    /// Total bytes written.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current read cursor.
    #[inline]
    pub fn read_offset(&self) -> usize {
        self.read
    }

    /// Current allocated capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Everything written so far.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the written region into shareable bytes.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    fn grow_for(&mut self, additional: usize) {
        let len = self.data.len();
        let capacity = self.data.capacity();
        if capacity - len >= additional {
            return;
        }
        let mut target = capacity.max(1);
        while target - len < additional {
            target *= 2;
        }
        self.data.reserve(target - len);
    }
}

impl From<Bytes> for WireBuffer {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursors_are_independent() {
        let mut buf = WireBuffer::new();
        buf.write(&1u32).write(&2u32);
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.read::<u32>().unwrap(), 1);
        assert_eq!(buf.read_offset(), 4);

        buf.write(&3u32);
        assert_eq!(buf.read::<u32>().unwrap(), 2);
        assert_eq!(buf.read::<u32>().unwrap(), 3);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_growth_doubles_capacity() {
        let mut buf = WireBuffer::with_capacity(4);
        buf.put_slice(&[0u8; 5]);
        assert!(buf.capacity() >= 8);

        let before = buf.capacity();
        buf.put_slice(&vec![0u8; before]);
        assert!(buf.capacity() >= before * 2);
        assert_eq!(buf.len(), 5 + before);
    }

    #[test]
    fn test_read_past_end_is_error() {
        let mut buf = WireBuffer::new();
        buf.write(&1u16);
        let err = buf.read::<u32>().unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedEof {
                needed: 4,
                available: 2
            }
        ));
        // A failed read does not move the cursor.
        assert_eq!(buf.read::<u16>().unwrap(), 1);
    }

    #[test]
    fn test_take_rest() {
        let mut buf = WireBuffer::from_bytes(&[1, 0, 0, 0, 9, 9]);
        assert_eq!(buf.read::<u32>().unwrap(), 1);
        assert_eq!(&buf.take_rest()[..], &[9, 9]);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_from_bytes_reads_from_start() {
        let buf = WireBuffer::from(Bytes::from_static(&[0xAA, 0xBB]));
        assert_eq!(buf.remaining(), 2);
        assert_eq!(buf.as_slice(), &[0xAA, 0xBB]);
    }
}
