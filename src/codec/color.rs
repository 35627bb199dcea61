//! Color wire types.

use super::{Decode, Encode, WireBuffer};
use crate::error::Result;

/// RGB color with float channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// RGBA color with float channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(rgb: Rgb) -> Self {
        Self::new(rgb.r, rgb.g, rgb.b, 1.0)
    }
}

/// RGBA color packed into one `u32`: red in the lowest byte, alpha in the
/// highest, so the wire bytes read `r g b a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba32(pub u32);

impl Rgba32 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(u32::from_le_bytes([r, g, b, a]))
    }

    #[inline]
    pub const fn r(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

impl From<Rgba> for Rgba32 {
    fn from(c: Rgba) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba32::new(q(c.r), q(c.g), q(c.b), q(c.a))
    }
}

impl From<Rgba32> for Rgba {
    fn from(c: Rgba32) -> Self {
        let f = |v: u8| f32::from(v) / 255.0;
        Rgba::new(f(c.r()), f(c.g()), f(c.b()), f(c.a()))
    }
}

impl Encode for Rgb {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.write(&self.r).write(&self.g).write(&self.b);
    }
}

impl Decode for Rgb {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(Rgb::new(buf.read()?, buf.read()?, buf.read()?))
    }
}

impl Encode for Rgba {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.write(&self.r).write(&self.g).write(&self.b).write(&self.a);
    }
}

impl Decode for Rgba {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(Rgba::new(buf.read()?, buf.read()?, buf.read()?, buf.read()?))
    }
}

impl Encode for Rgba32 {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.write(&self.0);
    }
}

impl Decode for Rgba32 {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(Rgba32(buf.read()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba32_channel_extraction() {
        let c = Rgba32::new(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c.0, 0x4433_2211);
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (0x11, 0x22, 0x33, 0x44));

        let white = Rgba32(u32::MAX);
        assert_eq!((white.r(), white.g(), white.b(), white.a()), (255, 255, 255, 255));
    }

    #[test]
    fn test_rgba32_wire_bytes() {
        let mut buf = WireBuffer::new();
        buf.write(&Rgba32::new(1, 2, 3, 4));
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(buf.read::<Rgba32>().unwrap(), Rgba32::new(1, 2, 3, 4));
    }

    #[test]
    fn test_float_colors_roundtrip() {
        let mut buf = WireBuffer::new();
        buf.write(&Rgb::new(0.1, 0.2, 0.3))
            .write(&Rgba::new(1.0, 0.0, 0.5, 0.25));
        assert_eq!(buf.len(), 12 + 16);
        assert_eq!(buf.read::<Rgb>().unwrap(), Rgb::new(0.1, 0.2, 0.3));
        assert_eq!(buf.read::<Rgba>().unwrap(), Rgba::new(1.0, 0.0, 0.5, 0.25));
    }

    #[test]
    fn test_packing_quantizes_and_clamps() {
        let packed = Rgba32::from(Rgba::new(1.0, 0.0, 2.0, -1.0));
        assert_eq!((packed.r(), packed.g(), packed.b(), packed.a()), (255, 0, 255, 0));

        let back = Rgba::from(Rgba32::new(255, 0, 0, 255));
        assert_eq!(back, Rgba::new(1.0, 0.0, 0.0, 1.0));
    }
}
