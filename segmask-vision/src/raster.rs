//! Single channel 8-bit raster with bounds-checked strided access

use crate::geometry::MaskRegion;

/// Row-major byte raster, stride equals width
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayRaster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayRaster {
    /// Zero-filled raster
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    /// Wraps existing bytes; `None` when the length does not match
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Flat index of `(x, y)`, `None` outside the raster
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> Option<usize> {
        pixel_index(x as i64, y as i64, self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        self.index(x, y).map(|i| self.data[i])
    }

    /// Writes are dropped outside the raster
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = value;
        }
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.data[start..start + w]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &mut self.data[start..start + w]
    }

    /// Copy of the inclusive `region`, clipped to the raster
    pub fn crop(&self, region: &MaskRegion) -> GrayRaster {
        if region.is_empty() || self.is_empty() || region.x0 >= self.width || region.y0 >= self.height {
            return GrayRaster::empty();
        }
        let x1 = region.x1.min(self.width - 1);
        let y1 = region.y1.min(self.height - 1);
        let w = x1 - region.x0 + 1;
        let h = y1 - region.y0 + 1;

        let mut out = GrayRaster::new(w, h);
        for (dy, y) in (region.y0..=y1).enumerate() {
            let src = &self.row(y)[region.x0 as usize..=x1 as usize];
            out.row_mut(dy as u32).copy_from_slice(src);
        }
        out
    }
}

/// Flat index of `(x, y)` in a `width x height` row-major buffer, `None` when out of bounds
#[inline]
pub fn pixel_index(x: i64, y: i64, width: u32, height: u32) -> Option<usize> {
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return None;
    }
    Some(y as usize * width as usize + x as usize)
}
