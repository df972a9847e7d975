//! Read-only views over the inference engine's flat output buffers

use crate::error::VisionError;
use crate::models::ModelShape;

/// Detection head output, channel-major: channel `c` of anchor `a` is at `c * anchors + a`
#[derive(Debug, Clone, Copy)]
pub struct DetectionTensor<'a> {
    data: &'a [f32],
    anchors: usize,
    channels: usize,
}

impl<'a> DetectionTensor<'a> {
    pub fn new(data: &'a [f32], anchors: usize, channels: usize) -> Result<Self, VisionError> {
        let expected = anchors
            .checked_mul(channels)
            .ok_or_else(|| VisionError::Shape("Detection shape would overflow".to_string()))?;
        if data.len() != expected {
            return Err(VisionError::Shape(format!(
                "detection tensor has {} values, expected {} ({} channels x {} anchors)",
                data.len(),
                expected,
                channels,
                anchors
            )));
        }
        Ok(Self { data, anchors, channels })
    }

    pub fn for_shape(data: &'a [f32], shape: &ModelShape) -> Result<Self, VisionError> {
        Self::new(data, shape.anchors, shape.detection_channels())
    }

    pub fn anchors(&self) -> usize {
        self.anchors
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat offset of `channel` for `anchor`
    #[inline]
    pub fn offset(&self, channel: usize, anchor: usize) -> usize {
        channel * self.anchors + anchor
    }

    /// Value at `(channel, anchor)`, `None` when outside the tensor
    #[inline]
    pub fn get(&self, channel: usize, anchor: usize) -> Option<f32> {
        if channel >= self.channels || anchor >= self.anchors {
            return None;
        }
        self.data.get(self.offset(channel, anchor)).copied()
    }

    /// Copies `len` consecutive channels starting at `first_channel` for one anchor
    pub fn gather(&self, anchor: usize, first_channel: usize, len: usize) -> Vec<f32> {
        (first_channel..first_channel + len)
            .map(|c| self.get(c, anchor).unwrap_or(0.0))
            .collect()
    }
}

/// Prototype planes: `channels` planes of `height x width`, plane-major
#[derive(Debug, Clone, Copy)]
pub struct MaskEmbeddingTensor<'a> {
    data: &'a [f32],
    channels: usize,
    width: usize,
    height: usize,
}

impl<'a> MaskEmbeddingTensor<'a> {
    pub fn new(
        data: &'a [f32],
        channels: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, VisionError> {
        let expected = channels
            .checked_mul(width)
            .and_then(|v| v.checked_mul(height))
            .ok_or_else(|| VisionError::Shape("Embedding shape would overflow".to_string()))?;
        if data.len() != expected {
            return Err(VisionError::Shape(format!(
                "mask embedding tensor has {} values, expected {} ({} x {} x {})",
                data.len(),
                expected,
                channels,
                height,
                width
            )));
        }
        Ok(Self { data, channels, width, height })
    }

    pub fn for_shape(data: &'a [f32], shape: &ModelShape) -> Result<Self, VisionError> {
        Self::new(
            data,
            shape.mask_channels,
            shape.mask_width as usize,
            shape.mask_height as usize,
        )
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn plane_len(&self) -> usize {
        self.width * self.height
    }

    /// One channel's full plane
    pub fn plane(&self, channel: usize) -> &'a [f32] {
        let len = self.plane_len();
        let start = channel * len;
        &self.data[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_channel_major_layout() {
        // 3 anchors, 2 channels: channel 0 = [0,1,2], channel 1 = [10,11,12]
        let data = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        let t = DetectionTensor::new(&data, 3, 2).unwrap();
        assert_eq!(t.get(0, 2), Some(2.0));
        assert_eq!(t.get(1, 0), Some(10.0));
        assert_eq!(t.get(2, 0), None);
        assert_eq!(t.get(0, 3), None);
        assert_eq!(t.gather(1, 0, 2), vec![1.0, 11.0]);
    }

    #[test]
    fn test_detection_length_mismatch() {
        let data = [0.0; 5];
        assert!(matches!(DetectionTensor::new(&data, 3, 2), Err(VisionError::Shape(_))));
    }

    #[test]
    fn test_empty_detection_tensor() {
        let t = DetectionTensor::new(&[], 0, 38).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.anchors(), 0);
    }

    #[test]
    fn test_embedding_planes() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let t = MaskEmbeddingTensor::new(&data, 3, 2, 2).unwrap();
        assert_eq!(t.plane(1), &[4.0, 5.0, 6.0, 7.0]);
        assert!(MaskEmbeddingTensor::new(&data, 2, 2, 2).is_err());
    }
}
