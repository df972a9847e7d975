//! Rasterizes packed object masks onto a single output canvas

use crate::packing::PackedMask;
use rayon::prelude::*;
use segmask_core::{BoundingBox, PixelFormat, Rgba};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Class palette, cycled by class index
const PALETTE: [Rgba; 20] = [
    Rgba::new(0xFF, 0x38, 0x38, 0xFF),
    Rgba::new(0xFF, 0x9D, 0x97, 0xFF),
    Rgba::new(0xFF, 0x70, 0x1F, 0xFF),
    Rgba::new(0xFF, 0xB2, 0x1D, 0xFF),
    Rgba::new(0xCF, 0xD2, 0x31, 0xFF),
    Rgba::new(0x48, 0xF9, 0x0A, 0xFF),
    Rgba::new(0x92, 0xCC, 0x17, 0xFF),
    Rgba::new(0x3D, 0xDB, 0x86, 0xFF),
    Rgba::new(0x1A, 0x93, 0x34, 0xFF),
    Rgba::new(0x00, 0xD4, 0xBB, 0xFF),
    Rgba::new(0x2C, 0x99, 0xA8, 0xFF),
    Rgba::new(0x00, 0xC2, 0xFF, 0xFF),
    Rgba::new(0x34, 0x45, 0x93, 0xFF),
    Rgba::new(0x64, 0x73, 0xFF, 0xFF),
    Rgba::new(0x00, 0x18, 0xEC, 0xFF),
    Rgba::new(0x84, 0x38, 0xFF, 0xFF),
    Rgba::new(0x52, 0x00, 0x85, 0xFF),
    Rgba::new(0xCB, 0x38, 0xFF, 0xFF),
    Rgba::new(0xFF, 0x95, 0xC8, 0xFF),
    Rgba::new(0xFF, 0x37, 0xC7, 0xFF),
];

/// Stable color for a class
pub fn default_color(class_index: usize) -> Rgba {
    PALETTE[class_index % PALETTE.len()]
}

/// Output raster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl Canvas {
    /// Zero-filled canvas
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0u8; len],
        }
    }

    /// Bytes of pixel `(x, y)`, `None` outside the canvas
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let start = (y as usize * self.width as usize + x as usize) * bpp;
        self.data.get(start..start + bpp)
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }
}

/// One object to draw: its mask, its base box and a composite-time translation
#[derive(Debug, Clone, Copy)]
pub struct CompositeLayer<'a> {
    pub mask: &'a PackedMask,
    pub bbox: BoundingBox,
    /// Falls back to white (then tinted) when unset
    pub color: Option<Rgba>,
    pub offset: (i32, i32),
}

/// Draws layers with max-alpha-wins overlap resolution
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    width: u32,
    height: u32,
    format: PixelFormat,
    tint: Rgba,
}

impl Compositor {
    pub fn new(width: u32, height: u32, format: PixelFormat, tint: Rgba) -> Self {
        Self {
            width,
            height,
            format,
            tint,
        }
    }

    /// Bytes written for a set bit of `layer`
    fn layer_pixel(&self, layer: &CompositeLayer<'_>) -> [u8; 4] {
        layer.color.unwrap_or(Rgba::WHITE).modulate(self.tint).premultiplied()
    }

    /// Sequential composite in layer order
    pub fn composite(&self, layers: &[CompositeLayer<'_>]) -> Canvas {
        let mut canvas = Canvas::new(self.width, self.height, self.format);
        let mut drawn = 0usize;
        for layer in layers {
            drawn += self.draw_rows(&mut canvas.data, 0, self.height, layer);
        }
        debug!("Composited {} layers, {} pixels written", layers.len(), drawn);
        canvas
    }

    /// Same result as [`Compositor::composite`], with the canvas split into disjoint
    /// row bands drawn concurrently. Each band replays every layer in order.
    pub fn composite_parallel(&self, layers: &[CompositeLayer<'_>], band_rows: u32) -> Canvas {
        let mut canvas = Canvas::new(self.width, self.height, self.format);
        if canvas.data.is_empty() || layers.is_empty() {
            return canvas;
        }

        let band_rows = band_rows.max(1);
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        canvas
            .data
            .par_chunks_mut(row_bytes * band_rows as usize)
            .enumerate()
            .for_each(|(band, chunk)| {
                let first = band as u32 * band_rows;
                let last = (first + band_rows).min(self.height);
                for layer in layers {
                    self.draw_rows(chunk, first, last, layer);
                }
            });
        canvas
    }

    /// Draw the part of `layer` falling in canvas rows `[first, last)`; `band` holds exactly
    /// those rows. Returns the number of pixels written.
    fn draw_rows(&self, band: &mut [u8], first: u32, last: u32, layer: &CompositeLayer<'_>) -> usize {
        let mask = layer.mask;
        if mask.is_empty() {
            return 0;
        }
        // Stride is the mask's own width, not the placement box's
        let placed = BoundingBox::new(layer.bbox.x, layer.bbox.y, mask.width(), mask.height())
            .translated(layer.offset.0, layer.offset.1);
        if !placed.intersects_canvas(self.width, self.height)
            || placed.bottom() <= first as i64
            || placed.y as i64 >= last as i64
        {
            return 0;
        }

        let px = self.layer_pixel(layer);
        let bpp = self.format.bytes_per_pixel();
        let width = self.width as i64;
        let mut written = 0;

        for (lx, ly) in mask.iter_set() {
            let cx = placed.x as i64 + lx as i64;
            let cy = placed.y as i64 + ly as i64;
            if cx < 0 || cx >= width || cy < first as i64 || cy >= last as i64 {
                continue;
            }
            let start = ((cy - first as i64) * width + cx) as usize * bpp;
            let Some(dst) = band.get_mut(start..start + bpp) else {
                continue;
            };

            match self.format {
                PixelFormat::Gray8 => {
                    if px[3] > dst[0] {
                        dst[0] = px[3];
                        written += 1;
                    }
                }
                PixelFormat::Rgba8 => {
                    if px[3] > dst[3] {
                        dst.copy_from_slice(&px);
                        written += 1;
                    }
                }
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_mask(w: u32, h: u32) -> PackedMask {
        let mut m = PackedMask::new(w, h);
        for y in 0..h {
            for x in 0..w {
                m.set(x, y);
            }
        }
        m
    }

    fn layer(mask: &PackedMask, x: i32, y: i32, color: Rgba) -> CompositeLayer<'_> {
        CompositeLayer {
            mask,
            bbox: BoundingBox::new(x, y, mask.width(), mask.height()),
            color: Some(color),
            offset: (0, 0),
        }
    }

    #[test]
    fn test_default_color_cycles() {
        assert_eq!(default_color(0), default_color(20));
        assert_ne!(default_color(0), default_color(1));
        assert_eq!(default_color(3).a, 255);
    }

    #[test]
    fn test_empty_layers_zero_canvas() {
        let c = Compositor::new(7, 5, PixelFormat::Rgba8, Rgba::WHITE);
        let canvas = c.composite(&[]);
        assert_eq!(canvas.data.len(), 7 * 5 * 4);
        assert!(canvas.is_blank());
        let gray = Compositor::new(7, 5, PixelFormat::Gray8, Rgba::WHITE).composite_parallel(&[], 2);
        assert_eq!(gray.data.len(), 35);
        assert!(gray.is_blank());
    }

    #[test]
    fn test_rgba_premultiplied_write() {
        let m = full_mask(1, 1);
        let c = Compositor::new(2, 2, PixelFormat::Rgba8, Rgba::WHITE);
        let canvas = c.composite(&[layer(&m, 1, 1, Rgba::new(255, 0, 100, 128))]);
        assert_eq!(canvas.pixel(1, 1), Some(&[128u8, 0, 50, 128][..]));
        assert_eq!(canvas.pixel(0, 0), Some(&[0u8, 0, 0, 0][..]));
    }

    #[test]
    fn test_max_alpha_wins_order_independent() {
        let m = full_mask(2, 2);
        let a = Rgba::new(255, 0, 0, 200);
        let b = Rgba::new(0, 0, 255, 180);
        let c = Compositor::new(4, 4, PixelFormat::Rgba8, Rgba::WHITE);

        let ab = c.composite(&[layer(&m, 0, 0, a), layer(&m, 1, 1, b)]);
        let ba = c.composite(&[layer(&m, 1, 1, b), layer(&m, 0, 0, a)]);
        assert_eq!(ab.pixel(1, 1), Some(&a.premultiplied()[..]));
        assert_eq!(ab, ba);
        // Non-overlapping part of B is still drawn
        assert_eq!(ab.pixel(2, 2), Some(&b.premultiplied()[..]));
    }

    #[test]
    fn test_gray_uses_alpha() {
        let m = full_mask(1, 1);
        let c = Compositor::new(1, 1, PixelFormat::Gray8, Rgba::WHITE);
        let canvas = c.composite(&[
            layer(&m, 0, 0, Rgba::new(10, 10, 10, 90)),
            layer(&m, 0, 0, Rgba::new(10, 10, 10, 60)),
        ]);
        assert_eq!(canvas.data, vec![90]);
    }

    #[test]
    fn test_tint_applies() {
        let m = full_mask(1, 1);
        let c = Compositor::new(1, 1, PixelFormat::Rgba8, Rgba::new(255, 0, 255, 255));
        let canvas = c.composite(&[CompositeLayer {
            mask: &m,
            bbox: BoundingBox::new(0, 0, 1, 1),
            color: None,
            offset: (0, 0),
        }]);
        assert_eq!(canvas.data, vec![255, 0, 255, 255]);
    }

    #[test]
    fn test_offset_and_partial_placement() {
        let m = full_mask(3, 3);
        let c = Compositor::new(4, 4, PixelFormat::Gray8, Rgba::WHITE);
        let canvas = c.composite(&[CompositeLayer {
            mask: &m,
            bbox: BoundingBox::new(0, 0, 3, 3),
            color: None,
            offset: (-2, 2),
        }]);
        // Visible: x in [0, 1), y in [2, 4)
        let set: Vec<usize> = canvas.data.iter().enumerate().filter(|(_, &v)| v > 0).map(|(i, _)| i).collect();
        assert_eq!(set, vec![8, 12]);
    }

    #[test]
    fn test_entirely_off_canvas() {
        let m = full_mask(3, 3);
        let c = Compositor::new(4, 4, PixelFormat::Rgba8, Rgba::WHITE);
        for (x, y) in [(-3, 0), (4, 0), (0, -3), (0, 4), (100, 100)] {
            let canvas = c.composite(&[layer(&m, x, y, Rgba::WHITE)]);
            assert!(canvas.is_blank());
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let m1 = full_mask(5, 7);
        let mut m2 = PackedMask::new(6, 4);
        m2.set(0, 0);
        m2.set(5, 3);
        m2.set(2, 1);
        let layers = [
            layer(&m1, -1, 2, Rgba::new(200, 10, 10, 150)),
            layer(&m2, 3, 4, Rgba::new(10, 200, 10, 220)),
            layer(&m1, 4, 6, Rgba::new(10, 10, 200, 150)),
        ];
        let c = Compositor::new(9, 11, PixelFormat::Rgba8, Rgba::WHITE);
        let seq = c.composite(&layers);
        for band in [1, 2, 3, 64] {
            assert_eq!(c.composite_parallel(&layers, band), seq);
        }
    }
}
