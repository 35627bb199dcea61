//! Codec module - binary encoding of call arguments and return values.
//!
//! Every value on the wire is fixed-width little-endian, except:
//!
//! - strings: `u32` byte length (including a trailing NUL), UTF-8 bytes, NUL
//! - arrays: `u32` element count followed by each encoded element
//!
//! Composite geometric and color types are the concatenation of their
//! components in declaration order.
//!
//! # Example
//!
//! ```
//! use render_stream::codec::{Vec3, WireBuffer};
//!
//! let mut buf = WireBuffer::new();
//! buf.write(&Vec3::new(1.0, 2.0, 3.0)).write(&[7u32, 8, 9][..]);
//!
//! assert_eq!(buf.read::<Vec3>().unwrap(), Vec3::new(1.0, 2.0, 3.0));
//! assert_eq!(buf.read::<Vec<u32>>().unwrap(), vec![7, 8, 9]);
//! ```

mod buffer;
mod color;
mod geometry;

pub use buffer::{WireBuffer, DEFAULT_CAPACITY};
pub use color::{Rgb, Rgba, Rgba32};
pub use geometry::{Aabb, LineSegment, Mat4, Vec2, Vec3};

use crate::error::{Error, Result};

/// A value that can be appended to a [`WireBuffer`].
pub trait Encode {
    /// Append this value's encoding.
    fn encode(&self, buf: &mut WireBuffer);
}

/// A value that can be read back from a [`WireBuffer`].
pub trait Decode: Sized {
    /// Decode a value at the read cursor and advance past it.
    fn decode(buf: &mut WireBuffer) -> Result<Self>;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Encode for $ty {
                #[inline]
                fn encode(&self, buf: &mut WireBuffer) {
                    buf.put_slice(&self.to_le_bytes());
                }
            }

            impl Decode for $ty {
                #[inline]
                fn decode(buf: &mut WireBuffer) -> Result<Self> {
                    Ok(<$ty>::from_le_bytes(buf.take_array()?))
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Encode for bool {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.put_slice(&[u8::from(*self)]);
    }
}

impl Decode for bool {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(u8::decode(buf)? != 0)
    }
}

impl Encode for str {
    fn encode(&self, buf: &mut WireBuffer) {
        let length = (self.len() + 1) as u32;
        buf.write(&length);
        buf.put_slice(self.as_bytes());
        buf.put_slice(&[0]);
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut WireBuffer) {
        self.as_str().encode(buf);
    }
}

impl Decode for String {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        let length = u32::decode(buf)? as usize;
        let bytes = buf.take(length)?;
        // Stated length covers the terminator; drop it.
        let text = &bytes[..length.saturating_sub(1)];
        String::from_utf8(text.to_vec()).map_err(|_| Error::InvalidUtf8)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.write(&(self.len() as u32));
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut WireBuffer) {
        self.as_slice().encode(buf);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        let count = u32::decode(buf)? as usize;
        // Cap the preallocation by what the buffer could possibly hold.
        let mut items = Vec::with_capacity(count.min(buf.remaining()));
        for _ in 0..count {
            items.push(T::decode(buf)?);
        }
        Ok(items)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, buf: &mut WireBuffer) {
        (**self).encode(buf);
    }
}
