//! Canvas coordinate mapping between pixels and normalized positions.
//!
//! Overlays are stored in normalized coordinates, a fraction of the canvas
//! width and height, so a story authored on one screen size lands in the same
//! relative spot on any other.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A position expressed as a fraction of a canvas' width and height.
///
/// Both components are always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct NormalizedPoint {
    x: f64,
    y: f64,
}

impl NormalizedPoint {
    /// The center of the canvas.
    pub const CENTER: NormalizedPoint = NormalizedPoint { x: 0.5, y: 0.5 };

    /// Create a normalized point, clamping both components into `[0, 1]`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Build a point from components already known to be within `[0, 1]`.
    pub(crate) const fn from_unit(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

impl Default for NormalizedPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

impl From<(f64, f64)> for NormalizedPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<NormalizedPoint> for (f64, f64) {
    fn from(point: NormalizedPoint) -> Self {
        (point.x, point.y)
    }
}

/// Clamp a value into `[0, 1]`. NaN collapses to 0.
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Check whether a canvas rect has been measured with a usable size.
pub fn is_measured(rect: Rect) -> bool {
    let width = rect.width();
    let height = rect.height();
    rect.x0.is_finite()
        && rect.y0.is_finite()
        && width.is_finite()
        && height.is_finite()
        && width > 0.0
        && height > 0.0
}

/// Convert a pixel position to normalized coordinates relative to `rect`.
///
/// Returns `None` if the canvas is unmeasured or the pixel is not finite.
pub fn to_normalized(pixel: Point, rect: Rect) -> Option<NormalizedPoint> {
    if !is_measured(rect) || !pixel.x.is_finite() || !pixel.y.is_finite() {
        return None;
    }
    Some(NormalizedPoint::new(
        (pixel.x - rect.x0) / rect.width(),
        (pixel.y - rect.y0) / rect.height(),
    ))
}

/// Like [`to_normalized`], but keeps `previous` when the conversion is not possible.
pub fn to_normalized_or(pixel: Point, rect: Rect, previous: NormalizedPoint) -> NormalizedPoint {
    to_normalized(pixel, rect).unwrap_or(previous)
}

/// Convert normalized coordinates back to a pixel position within `rect`.
pub fn to_pixels(point: NormalizedPoint, rect: Rect) -> Point {
    Point::new(
        rect.x0 + point.x * rect.width(),
        rect.y0 + point.y * rect.height(),
    )
}

/// A measured drawing surface (authoring canvas or viewer).
///
/// Holds the most recent valid layout rect. Until one is measured, pixel to
/// normalized conversions are no-ops and projections are unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CanvasSurface {
    rect: Option<Rect>,
}

impl CanvasSurface {
    /// Create an unmeasured surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a layout measurement. An invalid rect clears the measurement.
    pub fn measure(&mut self, rect: Rect) {
        self.rect = is_measured(rect).then_some(rect);
    }

    /// The measured rect, if any.
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn is_measured(&self) -> bool {
        self.rect.is_some()
    }

    /// Convert a pixel to normalized coordinates, falling back to `previous`.
    pub fn to_normalized_or(&self, pixel: Point, previous: NormalizedPoint) -> NormalizedPoint {
        match self.rect {
            Some(rect) => to_normalized_or(pixel, rect, previous),
            None => previous,
        }
    }

    /// Convert normalized coordinates to a pixel, if the surface is measured.
    pub fn to_pixels(&self, point: NormalizedPoint) -> Option<Point> {
        self.rect.map(|rect| to_pixels(point, rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, x + w, y + h)
    }

    #[test]
    fn test_to_normalized_basic() {
        let point = to_normalized(Point::new(10.0, 10.0), rect(0.0, 0.0, 100.0, 200.0)).unwrap();
        assert!((point.x() - 0.10).abs() < 1e-12);
        assert!((point.y() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_to_normalized_with_offset_rect() {
        let point = to_normalized(Point::new(70.0, 120.0), rect(20.0, 20.0, 100.0, 200.0)).unwrap();
        assert!((point.x() - 0.5).abs() < 1e-12);
        assert!((point.y() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_to_normalized_clamps_outside_canvas() {
        let canvas = rect(0.0, 0.0, 100.0, 100.0);
        for pixel in [
            Point::new(-50.0, -1.0),
            Point::new(150.0, 1000.0),
            Point::new(-1e9, 1e9),
        ] {
            let point = to_normalized(pixel, canvas).unwrap();
            assert!((0.0..=1.0).contains(&point.x()));
            assert!((0.0..=1.0).contains(&point.y()));
        }
    }

    #[test]
    fn test_unmeasured_canvas_keeps_previous() {
        let previous = NormalizedPoint::new(0.3, 0.7);
        let zero = Rect::new(0.0, 0.0, 0.0, 0.0);
        let result = to_normalized_or(Point::new(10.0, 10.0), zero, previous);
        assert_eq!(result, previous);

        let flat = rect(0.0, 0.0, 100.0, 0.0);
        assert!(to_normalized(Point::new(10.0, 10.0), flat).is_none());
    }

    #[test]
    fn test_non_finite_pixel_is_ignored() {
        let canvas = rect(0.0, 0.0, 100.0, 100.0);
        assert!(to_normalized(Point::new(f64::NAN, 10.0), canvas).is_none());
        assert!(to_normalized(Point::new(10.0, f64::INFINITY), canvas).is_none());
    }

    #[test]
    fn test_roundtrip_conversion() {
        let canvas = rect(12.5, -40.0, 375.0, 667.0);
        for (x, y) in [(12.5, -40.0), (100.0, 200.0), (387.5, 627.0), (200.25, 0.125)] {
            let pixel = Point::new(x, y);
            let back = to_pixels(to_normalized(pixel, canvas).unwrap(), canvas);
            assert!((back.x - x).abs() < 1e-9);
            assert!((back.y - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normalized_point_clamps() {
        let point = NormalizedPoint::new(-0.5, 3.0);
        assert_eq!((point.x(), point.y()), (0.0, 1.0));
        let nan = NormalizedPoint::new(f64::NAN, 0.25);
        assert_eq!((nan.x(), nan.y()), (0.0, 0.25));
    }

    #[test]
    fn test_surface_measure() {
        let mut surface = CanvasSurface::new();
        assert!(!surface.is_measured());
        assert!(surface.to_pixels(NormalizedPoint::CENTER).is_none());

        surface.measure(rect(0.0, 0.0, 300.0, 600.0));
        let pixel = surface.to_pixels(NormalizedPoint::new(0.5, 0.2)).unwrap();
        assert!((pixel.x - 150.0).abs() < 1e-9);
        assert!((pixel.y - 120.0).abs() < 1e-9);

        surface.measure(Rect::ZERO);
        assert!(!surface.is_measured());
    }
}
