//! Conversions between the model input grid, the mask-embedding grid and the
//! original image grid. Everything here is a pure function.

use crate::models::ModelShape;
use segmask_core::{BoundingBox, BoxF32};
use serde::{Deserialize, Serialize};

/// Inclusive pixel rectangle on the mask-embedding grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRegion {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl MaskRegion {
    pub fn width(&self) -> u32 {
        if self.x1 < self.x0 {
            0
        } else {
            self.x1 - self.x0 + 1
        }
    }

    pub fn height(&self) -> u32 {
        if self.y1 < self.y0 {
            0
        } else {
            self.y1 - self.y0 + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// Corner box from the decoder's center/size channels
pub fn input_box_from_center(cx: f32, cy: f32, w: f32, h: f32) -> BoxF32 {
    BoxF32::from_center(cx, cy, w, h)
}

/// Scale a box from model-input units to original-image pixels, clamped to the image
pub fn input_to_image(b: &BoxF32, shape: &ModelShape, image_width: u32, image_height: u32) -> BoxF32 {
    let sx = image_width as f32 / shape.input_width as f32;
    let sy = image_height as f32 / shape.input_height as f32;
    BoxF32::new(b.x1 * sx, b.y1 * sy, b.x2 * sx, b.y2 * sy)
        .clamp_to(image_width as f32, image_height as f32)
}

/// Map a model-input box onto the mask grid.
///
/// Top-left is floored and bottom-right ceiled so partially covered boundary
/// cells are kept; both corners are then clamped to `[0, dim - 1]`.
pub fn input_to_mask_region(b: &BoxF32, shape: &ModelShape) -> MaskRegion {
    let (sx, sy) = shape.mask_scale();
    let max_x = shape.mask_width.saturating_sub(1) as f32;
    let max_y = shape.mask_height.saturating_sub(1) as f32;

    let clamp = |v: f32, max: f32| -> u32 {
        if v.is_nan() {
            0
        } else {
            v.clamp(0.0, max) as u32
        }
    };

    MaskRegion {
        x0: clamp((b.x1 * sx).floor(), max_x),
        y0: clamp((b.y1 * sy).floor(), max_y),
        x1: clamp((b.x2 * sx).ceil(), max_x),
        y1: clamp((b.y2 * sy).ceil(), max_y),
    }
}

/// Grow or shrink a box about its center, clamped to `[0, max_w] x [0, max_h]`
pub fn scale_about_center(b: &BoxF32, factor: f32, max_w: f32, max_h: f32) -> BoxF32 {
    let cx = (b.x1 + b.x2) / 2.0;
    let cy = (b.y1 + b.y2) / 2.0;
    BoxF32::from_center(cx, cy, b.width() * factor, b.height() * factor).clamp_to(max_w, max_h)
}

/// Integer pixel box covering `b`: floor top-left, ceil bottom-right, clamped to the image
pub fn to_pixel_box(b: &BoxF32, image_width: u32, image_height: u32) -> BoundingBox {
    if !b.is_finite() {
        return BoundingBox::default();
    }
    let x0 = b.x1.floor().clamp(0.0, image_width as f32) as u32;
    let y0 = b.y1.floor().clamp(0.0, image_height as f32) as u32;
    let x1 = b.x2.ceil().clamp(0.0, image_width as f32) as u32;
    let y1 = b.y2.ceil().clamp(0.0, image_height as f32) as u32;
    BoundingBox::new(
        x0 as i32,
        y0 as i32,
        x1.saturating_sub(x0),
        y1.saturating_sub(y0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> ModelShape {
        ModelShape::yolo_seg(640, 640, 80)
    }

    #[test]
    fn test_mask_region_floor_ceil() {
        let region = input_to_mask_region(&BoxF32::new(10.0, 10.0, 50.0, 50.0), &shape());
        assert_eq!(region, MaskRegion { x0: 2, y0: 2, x1: 13, y1: 13 });
        assert_eq!(region.width(), 12);
    }

    #[test]
    fn test_mask_region_clamped() {
        let region = input_to_mask_region(&BoxF32::new(-20.0, 600.0, 700.0, 900.0), &shape());
        assert_eq!(region, MaskRegion { x0: 0, y0: 150, x1: 159, y1: 159 });
    }

    #[test]
    fn test_mask_region_independent_axes() {
        let mut s = shape();
        s.input_height = 320;
        s.mask_height = 160;
        // y scale is 0.5, x scale 0.25
        let region = input_to_mask_region(&BoxF32::new(8.0, 8.0, 16.0, 16.0), &s);
        assert_eq!(region, MaskRegion { x0: 2, y0: 4, x1: 4, y1: 8 });
    }

    #[test]
    fn test_input_to_image() {
        let b = input_to_image(&BoxF32::new(10.0, 10.0, 50.0, 50.0), &shape(), 1280, 320);
        assert_eq!(b, BoxF32::new(20.0, 5.0, 100.0, 25.0));
    }

    #[test]
    fn test_input_to_image_clamps() {
        let b = input_to_image(&BoxF32::new(-10.0, 0.0, 700.0, 640.0), &shape(), 640, 640);
        assert_eq!(b, BoxF32::new(0.0, 0.0, 640.0, 640.0));
    }

    #[test]
    fn test_scale_about_center() {
        let b = scale_about_center(&BoxF32::new(10.0, 10.0, 30.0, 30.0), 2.0, 100.0, 100.0);
        assert_eq!(b, BoxF32::new(0.0, 0.0, 40.0, 40.0));
    }

    #[test]
    fn test_to_pixel_box() {
        let b = to_pixel_box(&BoxF32::new(1.5, 2.2, 10.1, 5.0), 100, 100);
        assert_eq!(b, BoundingBox::new(1, 2, 10, 3));
        let degenerate = to_pixel_box(&BoxF32::new(5.0, 5.0, 5.0, 5.0), 100, 100);
        assert!(degenerate.is_empty());
    }
}
