//! Geometric wire types.

use super::{Decode, Encode, WireBuffer};
use crate::error::Result;

/// 2D vector, also used for normalized screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise minimum.
    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Check that no component is NaN or infinite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Axis-aligned bounding box.
///
/// [`Aabb::EMPTY`] is inverted (min at +inf, max at -inf) so that it is the
/// identity of [`Aabb::union`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
        max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// True when the box contains no point.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Smallest box containing both boxes. Empty boxes are ignored.
    pub fn union(&self, other: &Aabb) -> Aabb {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}

/// Line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineSegment {
    pub start: Vec3,
    pub end: Vec3,
}

impl LineSegment {
    pub const fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }
}

/// 4x4 matrix, column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub cols: [f32; 16],
}

impl Mat4 {
    #[rustfmt::skip]
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub const fn from_cols(cols: [f32; 16]) -> Self {
        Self { cols }
    }

    pub fn from_translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[12] = t.x;
        m.cols[13] = t.y;
        m.cols[14] = t.z;
        m
    }

    pub fn is_finite(&self) -> bool {
        self.cols.iter().all(|c| c.is_finite())
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}

impl Encode for Vec2 {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.write(&self.x).write(&self.y);
    }
}

impl Decode for Vec2 {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(Vec2::new(buf.read()?, buf.read()?))
    }
}

impl Encode for Vec3 {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.write(&self.x).write(&self.y).write(&self.z);
    }
}

impl Decode for Vec3 {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(Vec3::new(buf.read()?, buf.read()?, buf.read()?))
    }
}

impl Encode for Aabb {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.write(&self.min).write(&self.max);
    }
}

impl Decode for Aabb {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(Aabb::new(buf.read()?, buf.read()?))
    }
}

impl Encode for LineSegment {
    fn encode(&self, buf: &mut WireBuffer) {
        buf.write(&self.start).write(&self.end);
    }
}

impl Decode for LineSegment {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(LineSegment::new(buf.read()?, buf.read()?))
    }
}

impl Encode for Mat4 {
    fn encode(&self, buf: &mut WireBuffer) {
        for c in &self.cols {
            buf.write(c);
        }
    }
}

impl Decode for Mat4 {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        let mut cols = [0.0f32; 16];
        for c in cols.iter_mut() {
            *c = buf.read()?;
        }
        Ok(Mat4 { cols })
    }
}
