//! Argument checks and clamps used by the façade.
//!
//! Checks return [`Invalid`] with a human-readable reason; the façade logs
//! it and returns the operation's default instead of failing.

use std::fmt;
use std::ops::RangeInclusive;

use url::Url;

use super::materials::MaterialCatalog;
use crate::codec::{LineSegment, Mat4, Rgb, Rgba, Vec2, Vec3};

/// Opacity range; values outside are clamped.
pub const OPACITY_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Camera blend time range in seconds; values outside are clamped.
pub const BLEND_TIME_RANGE: RangeInclusive<f32> = 0.0..=10.0;

/// Camera speed range; values outside are clamped.
pub const SPEED_RANGE: RangeInclusive<f32> = 0.01..=100.0;

/// Largest accepted viewport edge in pixels.
pub const MAX_VIEWPORT_EDGE: u32 = 8192;

/// Highest pointer button index.
pub const MAX_POINTER_BUTTON: u8 = 4;

/// URL schemes accepted for remote resources.
pub const URL_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// Why an argument was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalid(pub String);

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type Check<T = ()> = std::result::Result<T, Invalid>;

fn invalid<T>(reason: impl Into<String>) -> Check<T> {
    Err(Invalid(reason.into()))
}

/// Clamp into an inclusive range; NaN becomes the lower bound.
pub fn clamp(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

pub fn non_empty<T>(name: &str, items: &[T]) -> Check {
    if items.is_empty() {
        return invalid(format!("{} must not be empty", name));
    }
    Ok(())
}

pub fn same_length<A, B>(left: (&str, &[A]), right: (&str, &[B])) -> Check {
    if left.1.len() != right.1.len() {
        return invalid(format!(
            "{} has {} elements but {} has {}",
            left.0,
            left.1.len(),
            right.0,
            right.1.len()
        ));
    }
    Ok(())
}

pub fn finite(name: &str, value: f32) -> Check {
    if !value.is_finite() {
        return invalid(format!("{} must be finite, got {}", name, value));
    }
    Ok(())
}

pub fn finite_vec3(name: &str, value: Vec3) -> Check {
    if !value.is_finite() {
        return invalid(format!("{} must be finite, got {:?}", name, value));
    }
    Ok(())
}

pub fn finite_segments(segments: &[LineSegment]) -> Check {
    match segments
        .iter()
        .position(|s| !s.start.is_finite() || !s.end.is_finite())
    {
        Some(i) => invalid(format!("segment {} has a non-finite endpoint", i)),
        None => Ok(()),
    }
}

pub fn finite_matrix(value: &Mat4) -> Check {
    if !value.is_finite() {
        return invalid("matrix must be finite");
    }
    Ok(())
}

/// Screen coordinates normalized to `[0, 1]` on both axes.
pub fn screen(point: Vec2) -> Check {
    let inside = |v: f32| (0.0..=1.0).contains(&v);
    if !inside(point.x) || !inside(point.y) {
        return invalid(format!(
            "screen point ({}, {}) is outside [0, 1]",
            point.x, point.y
        ));
    }
    Ok(())
}

fn unit_channels(name: &str, channels: &[f32]) -> Check {
    if channels.iter().any(|c| !(0.0..=1.0).contains(c)) {
        return invalid(format!("{} channels must be in [0, 1]", name));
    }
    Ok(())
}

pub fn rgb(name: &str, color: Rgb) -> Check {
    unit_channels(name, &[color.r, color.g, color.b])
}

pub fn rgba(name: &str, color: Rgba) -> Check {
    unit_channels(name, &[color.r, color.g, color.b, color.a])
}

/// Field of view in degrees, strictly between 0 and 180.
pub fn field_of_view(degrees: f32) -> Check {
    if !(degrees > 0.0 && degrees < 180.0) {
        return invalid(format!("field of view {} is outside (0, 180)", degrees));
    }
    Ok(())
}

pub fn viewport(width: u32, height: u32) -> Check {
    let ok = |edge: u32| (1..=MAX_VIEWPORT_EDGE).contains(&edge);
    if !ok(width) || !ok(height) {
        return invalid(format!(
            "viewport {}x{} is outside 1..={}",
            width, height, MAX_VIEWPORT_EDGE
        ));
    }
    Ok(())
}

pub fn pointer_button(button: u8) -> Check {
    if button > MAX_POINTER_BUTTON {
        return invalid(format!("unknown pointer button {}", button));
    }
    Ok(())
}

pub fn non_empty_text(name: &str, text: &str) -> Check {
    if text.is_empty() {
        return invalid(format!("{} must not be empty", name));
    }
    Ok(())
}

/// Every handle must be known to the catalog.
pub fn known_materials(catalog: &MaterialCatalog, handles: &[u32]) -> Check {
    match catalog.first_unknown(handles) {
        Some(handle) => invalid(format!("unknown material handle {}", handle)),
        None => Ok(()),
    }
}

/// Parse a resource locator, accepting only known schemes.
pub fn resource_url(locator: &str) -> Check<Url> {
    let url = match Url::parse(locator) {
        Ok(url) => url,
        Err(e) => return invalid(format!("{:?} is not a URL: {}", locator, e)),
    };
    if !URL_SCHEMES.contains(&url.scheme()) {
        return invalid(format!("unsupported URL scheme {:?}", url.scheme()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5, &OPACITY_RANGE), 1.0);
        assert_eq!(clamp(-0.5, &OPACITY_RANGE), 0.0);
        assert_eq!(clamp(0.3, &OPACITY_RANGE), 0.3);
        assert_eq!(clamp(f32::NAN, &OPACITY_RANGE), 0.0);
        assert_eq!(clamp(60.0, &BLEND_TIME_RANGE), 10.0);
        assert_eq!(clamp(0.0, &SPEED_RANGE), 0.01);
    }

    #[test]
    fn test_arrays() {
        assert!(non_empty::<u32>("ids", &[]).is_err());
        assert!(non_empty("ids", &[1]).is_ok());
        assert!(same_length(("ids", &[1, 2]), ("colors", &[3])).is_err());
        let err = same_length(("ids", &[1, 2]), ("colors", &[3])).unwrap_err();
        assert_eq!(err.to_string(), "ids has 2 elements but colors has 1");
        assert!(same_length(("ids", &[1]), ("colors", &[3])).is_ok());
    }

    #[test]
    fn test_screen() {
        assert!(screen(Vec2::new(0.0, 1.0)).is_ok());
        assert!(screen(Vec2::new(0.5, 0.5)).is_ok());
        assert!(screen(Vec2::new(1.01, 0.5)).is_err());
        assert!(screen(Vec2::new(0.5, -0.1)).is_err());
        assert!(screen(Vec2::new(f32::NAN, 0.5)).is_err());
    }

    #[test]
    fn test_camera_values() {
        assert!(field_of_view(60.0).is_ok());
        assert!(field_of_view(0.0).is_err());
        assert!(field_of_view(180.0).is_err());
        assert!(field_of_view(f32::NAN).is_err());
        assert!(finite_vec3("position", Vec3::new(f32::INFINITY, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_colors() {
        assert!(rgb("background", Rgb::new(0.0, 0.5, 1.0)).is_ok());
        assert!(rgb("background", Rgb::new(0.0, 1.5, 1.0)).is_err());
        assert!(rgba("text", Rgba::new(0.0, 0.0, 0.0, -1.0)).is_err());
    }

    #[test]
    fn test_viewport_and_buttons() {
        assert!(viewport(1920, 1080).is_ok());
        assert!(viewport(0, 1080).is_err());
        assert!(viewport(1920, MAX_VIEWPORT_EDGE + 1).is_err());
        assert!(pointer_button(0).is_ok());
        assert!(pointer_button(MAX_POINTER_BUTTON + 1).is_err());
    }

    #[test]
    fn test_segments_and_materials() {
        let ok = LineSegment::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let bad = LineSegment::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(finite_segments(&[ok]).is_ok());
        assert_eq!(
            finite_segments(&[ok, bad]).unwrap_err().to_string(),
            "segment 1 has a non-finite endpoint"
        );

        let catalog = MaterialCatalog::default();
        assert!(known_materials(&catalog, &[0, 1]).is_ok());
        assert!(known_materials(&catalog, &[0, 99]).is_err());
    }

    #[test]
    fn test_resource_url() {
        assert_eq!(
            resource_url("https://cdn.example.com/models/engine.glb")
                .unwrap()
                .host_str(),
            Some("cdn.example.com")
        );
        assert!(resource_url("file:///tmp/model.obj").is_ok());
        assert!(resource_url("not a url").is_err());
        assert!(resource_url("ftp://example.com/model.glb").is_err());
        assert!(resource_url("").is_err());
    }
}
