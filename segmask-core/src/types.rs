//! Geometry and color value types shared across the pipeline

use serde::{Deserialize, Serialize};

/// Axis-aligned box with floating point corners (x1, y1) - (x2, y2)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxF32 {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoxF32 {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from center/size form
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        let half_w = w / 2.0;
        let half_h = h / 2.0;
        Self {
            x1: cx - half_w,
            y1: cy - half_h,
            x2: cx + half_w,
            y2: cy + half_h,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// Clamp all corners into `[0, max_w] x [0, max_h]`
    pub fn clamp_to(&self, max_w: f32, max_h: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, max_w),
            y1: self.y1.clamp(0.0, max_h),
            x2: self.x2.clamp(0.0, max_w),
            y2: self.y2.clamp(0.0, max_h),
        }
    }

    /// Intersection over union. Degenerate or non-finite boxes yield 0.
    pub fn iou(&self, other: &BoxF32) -> f32 {
        if !self.is_finite() || !other.is_finite() {
            return 0.0;
        }

        let inter_x_min = self.x1.max(other.x1);
        let inter_y_min = self.y1.max(other.y1);
        let inter_x_max = self.x2.min(other.x2);
        let inter_y_max = self.y2.min(other.y2);

        if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
            return 0.0;
        }

        let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
        let union_area = self.area() + other.area() - inter_area;

        if union_area <= 0.0 || !union_area.is_finite() {
            return 0.0;
        }

        (inter_area / union_area).clamp(0.0, 1.0)
    }
}

/// Integer pixel box used for mask placement in output coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Returns a copy moved by `(dx, dy)`; the original is left untouched
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Whether any part of the box lies inside a `width x height` canvas
    pub fn intersects_canvas(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && self.right() > 0
            && self.bottom() > 0
            && (self.x as i64) < width as i64
            && (self.y as i64) < height as i64
    }
}

/// 8-bit straight (non-premultiplied) RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Color components multiplied by alpha, alpha unchanged
    pub fn premultiplied(&self) -> [u8; 4] {
        [
            mul_div_255(self.r, self.a),
            mul_div_255(self.g, self.a),
            mul_div_255(self.b, self.a),
            self.a,
        ]
    }

    /// Per-channel product with another color (tinting)
    pub fn modulate(&self, tint: Rgba) -> Rgba {
        Rgba {
            r: mul_div_255(self.r, tint.r),
            g: mul_div_255(self.g, tint.g),
            b: mul_div_255(self.b, tint.b),
            a: mul_div_255(self.a, tint.a),
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::WHITE
    }
}

/// Rounded `a * b / 255`
fn mul_div_255(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

/// Output raster pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Single channel, 8 bits
    Gray8,
    /// Four channels, 8 bits each, premultiplied alpha
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgba8 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_from_center() {
        let b = BoxF32::from_center(30.0, 30.0, 40.0, 40.0);
        assert_eq!(b, BoxF32::new(10.0, 10.0, 50.0, 50.0));
        assert_eq!(b.area(), 1600.0);
    }

    #[test]
    fn test_iou_identical() {
        let b = BoxF32::new(0.0, 0.0, 10.0, 10.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BoxF32::new(0.0, 0.0, 10.0, 10.0);
        let b = BoxF32::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoxF32::new(0.0, 0.0, 10.0, 10.0);
        let b = BoxF32::new(5.0, 0.0, 15.0, 10.0);
        // 50 / 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_nan() {
        let a = BoxF32::new(f32::NAN, 0.0, 10.0, 10.0);
        let b = BoxF32::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_bounding_box_translate_is_copy() {
        let b = BoundingBox::new(10, 20, 5, 5);
        let moved = b.translated(-15, 3);
        assert_eq!(moved, BoundingBox::new(-5, 23, 5, 5));
        assert_eq!(b, BoundingBox::new(10, 20, 5, 5));
    }

    #[test]
    fn test_bounding_box_canvas_intersection() {
        assert!(BoundingBox::new(-4, -4, 5, 5).intersects_canvas(10, 10));
        assert!(!BoundingBox::new(-5, -5, 5, 5).intersects_canvas(10, 10));
        assert!(!BoundingBox::new(10, 0, 5, 5).intersects_canvas(10, 10));
        assert!(!BoundingBox::new(0, 0, 0, 5).intersects_canvas(10, 10));
    }

    #[test]
    fn test_premultiplied() {
        let c = Rgba::new(255, 128, 0, 128);
        assert_eq!(c.premultiplied(), [128, 64, 0, 128]);
        assert_eq!(Rgba::WHITE.premultiplied(), [255, 255, 255, 255]);
    }

    #[test]
    fn test_modulate_white_is_identity() {
        let c = Rgba::new(12, 200, 99, 180);
        assert_eq!(c.modulate(Rgba::WHITE), c);
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::Gray8.bytes_per_pixel(), 1);
        assert_eq!(PixelFormat::Rgba8.bytes_per_pixel(), 4);
    }
}
