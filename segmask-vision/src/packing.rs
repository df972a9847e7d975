//! 1 bit per pixel mask storage

use crate::raster::GrayRaster;
use segmask_core::BoundingBox;
use serde::{Deserialize, Serialize};

/// Thresholded mask, row-major with stride equal to `width` (not byte padded).
/// Bit `i` lives in byte `i >> 3` at bit `i & 7`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedMask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl PackedMask {
    /// All-clear mask
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            bits: vec![0u8; (pixels + 7) / 8],
        }
    }

    /// Set bit `i` where `raster[i] / 255 > threshold`
    pub fn pack(raster: &GrayRaster, threshold: f32) -> Self {
        let mut mask = Self::new(raster.width(), raster.height());
        for (i, &value) in raster.as_slice().iter().enumerate() {
            if value as f32 / 255.0 > threshold {
                mask.bits[i >> 3] |= 1 << (i & 7);
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    #[inline]
    pub fn is_set(&self, i: usize) -> bool {
        i < self.len() && self.bits[i >> 3] & (1 << (i & 7)) != 0
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.is_set(y as usize * self.width as usize + x as usize)
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            let i = y as usize * self.width as usize + x as usize;
            self.bits[i >> 3] |= 1 << (i & 7);
        }
    }

    pub fn count_set(&self) -> usize {
        // Trailing bits of the last byte are never set
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Local `(x, y)` of every set bit in row-major order
    pub fn iter_set(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width as usize;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &byte)| byte != 0)
            .flat_map(move |(byte_idx, &byte)| {
                (0..8).filter_map(move |bit| {
                    if byte & (1 << bit) == 0 {
                        return None;
                    }
                    let i = byte_idx * 8 + bit;
                    Some(((i % width) as u32, (i / width) as u32))
                })
            })
    }

    /// Back to 0/255 bytes
    pub fn unpack(&self) -> GrayRaster {
        let data = (0..self.len()).map(|i| if self.is_set(i) { 255 } else { 0 }).collect();
        GrayRaster::from_vec(self.width, self.height, data).unwrap_or_else(GrayRaster::empty)
    }

    /// Re-stride this mask, placed at `bbox`, onto a zeroed `canvas_width x canvas_height` mask
    pub fn expand_to_canvas(&self, bbox: &BoundingBox, canvas_width: u32, canvas_height: u32) -> PackedMask {
        let mut out = PackedMask::new(canvas_width, canvas_height);
        for (x, y) in self.iter_set() {
            let cx = bbox.x as i64 + x as i64;
            let cy = bbox.y as i64 + y as i64;
            if cx >= 0 && cy >= 0 && cx < canvas_width as i64 && cy < canvas_height as i64 {
                out.set(cx as u32, cy as u32);
            }
        }
        out
    }
}
