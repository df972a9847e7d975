//! Crop-and-upsample of mask-grid rasters to full resolution boxes.
//!
//! Bilinear interpolation with half-pixel centers and edge clamping. The AVX2
//! path evaluates the same expressions in the same order as the scalar path,
//! eight output pixels at a time.

use crate::capability::SimdCapability;
use crate::geometry::MaskRegion;
use crate::raster::GrayRaster;
use segmask_core::ResampleMode;
use tracing::warn;

/// Source sample positions and weight for one output coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    i0: usize,
    i1: usize,
    weight: f32,
}

fn taps(src_len: u32, dst_len: u32) -> Vec<Tap> {
    let scale = src_len as f32 / dst_len as f32;
    let max = (src_len - 1) as f32;
    (0..dst_len)
        .map(|d| {
            let pos = ((d as f32 + 0.5) * scale - 0.5).clamp(0.0, max);
            let i0 = pos.floor() as usize;
            let i1 = (i0 + 1).min(src_len as usize - 1);
            Tap {
                i0,
                i1,
                weight: pos - i0 as f32,
            }
        })
        .collect()
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v + 0.5).clamp(0.0, 255.0) as u8
}

fn is_degenerate(src: &GrayRaster, width: u32, height: u32) -> bool {
    src.width() == 0 || src.height() == 0 || width == 0 || height == 0
}

/// Scalar bilinear resize
pub fn resize_bilinear_scalar(src: &GrayRaster, width: u32, height: u32) -> GrayRaster {
    if is_degenerate(src, width, height) {
        return GrayRaster::empty();
    }
    let x_taps = taps(src.width(), width);
    let y_taps = taps(src.height(), height);
    let mut out = GrayRaster::new(width, height);

    for (y, ty) in y_taps.iter().enumerate() {
        let row0 = src.row(ty.i0 as u32);
        let row1 = src.row(ty.i1 as u32);
        let dst = out.row_mut(y as u32);
        for (px, tx) in dst.iter_mut().zip(&x_taps) {
            *px = interpolate(row0, row1, tx, ty.weight);
        }
    }
    out
}

#[inline]
fn interpolate(row0: &[u8], row1: &[u8], tx: &Tap, wy: f32) -> u8 {
    let top = lerp(row0[tx.i0] as f32, row0[tx.i1] as f32, tx.weight);
    let bottom = lerp(row1[tx.i0] as f32, row1[tx.i1] as f32, tx.weight);
    to_byte(lerp(top, bottom, wy))
}

/// Vectorized bilinear resize; runs the scalar filter when the host lacks support
pub fn resize_bilinear_vectorized(
    src: &GrayRaster,
    width: u32,
    height: u32,
    capability: SimdCapability,
) -> GrayRaster {
    if is_degenerate(src, width, height) {
        return GrayRaster::empty();
    }

    #[cfg(target_arch = "x86_64")]
    {
        if capability.avx2() {
            // SAFETY: avx2 support was verified by SimdCapability::detect
            return unsafe { avx2::resize_bilinear(src, width, height) };
        }
    }

    let _ = capability;
    resize_bilinear_scalar(src, width, height)
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use super::{interpolate, taps, GrayRaster};
    use std::arch::x86_64::*;

    const LANES: usize = 8;

    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn resize_bilinear(src: &GrayRaster, width: u32, height: u32) -> GrayRaster {
        let x_taps = taps(src.width(), width);
        let y_taps = taps(src.height(), height);
        let src_w = src.width() as usize;

        // Gather works on 32-bit lanes; widen the source once
        let src_f: Vec<f32> = src.as_slice().iter().map(|&v| v as f32).collect();
        let idx0: Vec<i32> = x_taps.iter().map(|t| t.i0 as i32).collect();
        let idx1: Vec<i32> = x_taps.iter().map(|t| t.i1 as i32).collect();
        let wx: Vec<f32> = x_taps.iter().map(|t| t.weight).collect();

        let mut out = GrayRaster::new(width, height);
        let full = (width as usize / LANES) * LANES;
        let half = _mm256_set1_ps(0.5);
        let zero = _mm256_setzero_ps();
        let max = _mm256_set1_ps(255.0);

        for (y, ty) in y_taps.iter().enumerate() {
            let row0 = &src_f[ty.i0 * src_w..(ty.i0 + 1) * src_w];
            let row1 = &src_f[ty.i1 * src_w..(ty.i1 + 1) * src_w];
            let wy = _mm256_set1_ps(ty.weight);
            let mut lanes = [0i32; LANES];

            let dst = out.row_mut(y as u32);
            let mut x = 0;
            while x < full {
                let i0 = _mm256_loadu_si256(idx0[x..].as_ptr() as *const __m256i);
                let i1 = _mm256_loadu_si256(idx1[x..].as_ptr() as *const __m256i);
                let w = _mm256_loadu_ps(wx[x..].as_ptr());

                // Indices are bounded by taps() to [0, src_w)
                let a = _mm256_i32gather_ps::<4>(row0.as_ptr(), i0);
                let b = _mm256_i32gather_ps::<4>(row0.as_ptr(), i1);
                let c = _mm256_i32gather_ps::<4>(row1.as_ptr(), i0);
                let d = _mm256_i32gather_ps::<4>(row1.as_ptr(), i1);

                let top = _mm256_add_ps(a, _mm256_mul_ps(_mm256_sub_ps(b, a), w));
                let bottom = _mm256_add_ps(c, _mm256_mul_ps(_mm256_sub_ps(d, c), w));
                let v = _mm256_add_ps(top, _mm256_mul_ps(_mm256_sub_ps(bottom, top), wy));
                let v = _mm256_min_ps(_mm256_max_ps(_mm256_add_ps(v, half), zero), max);

                _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, _mm256_cvttps_epi32(v));
                for (px, &lane) in dst[x..x + LANES].iter_mut().zip(lanes.iter()) {
                    *px = lane as u8;
                }
                x += LANES;
            }

            let row0_u8 = src.row(ty.i0 as u32);
            let row1_u8 = src.row(ty.i1 as u32);
            for (px, tx) in dst[full..].iter_mut().zip(&x_taps[full..]) {
                *px = interpolate(row0_u8, row1_u8, tx, ty.weight);
            }
        }
        out
    }
}

/// Which implementation a [`Resampler`] runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplePath {
    Scalar,
    Vectorized,
}

/// Crops synthesized masks to their region and resizes them to box size
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    path: ResamplePath,
    capability: SimdCapability,
}

impl Resampler {
    pub fn new(mode: ResampleMode, capability: SimdCapability) -> Self {
        let path = match mode {
            ResampleMode::Scalar => ResamplePath::Scalar,
            ResampleMode::Auto if capability.has_vectorized_resample() => ResamplePath::Vectorized,
            ResampleMode::Auto => ResamplePath::Scalar,
            ResampleMode::Vectorized if capability.has_vectorized_resample() => ResamplePath::Vectorized,
            ResampleMode::Vectorized => {
                warn!("Vectorized resampling requested but unsupported on this host, using scalar");
                ResamplePath::Scalar
            }
        };
        Self { path, capability }
    }

    pub fn path(&self) -> ResamplePath {
        self.path
    }

    /// Resize a raster to `width x height`
    pub fn resize(&self, src: &GrayRaster, width: u32, height: u32) -> GrayRaster {
        match self.path {
            ResamplePath::Scalar => resize_bilinear_scalar(src, width, height),
            ResamplePath::Vectorized => resize_bilinear_vectorized(src, width, height, self.capability),
        }
    }

    /// Crop `raster` to `region` and upsample the crop to `width x height`
    pub fn resample(&self, raster: &GrayRaster, region: &MaskRegion, width: u32, height: u32) -> GrayRaster {
        if region.is_empty() || width == 0 || height == 0 {
            return GrayRaster::empty();
        }
        let crop = raster.crop(region);
        self.resize(&crop, width, height)
    }
}
