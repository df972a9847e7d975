//! Edge case tests for segmask-vision

use segmask_core::{BoundingBox, BoxF32, PipelineConfig, PixelFormat, Rgba};
use segmask_vision::geometry::input_to_mask_region;
use segmask_vision::{
    ClassNames, CompositeOptions, Compositor, GrayRaster, MaskRegion, ModelMetadata, ModelShape, ModelTask,
    PackedMask, SegmentationPipeline, SimdCapability, VisionError,
};

fn tiny_shape() -> ModelShape {
    ModelShape {
        input_width: 16,
        input_height: 16,
        num_classes: 1,
        mask_channels: 1,
        mask_width: 4,
        mask_height: 4,
        anchors: 1,
    }
}

#[test]
fn test_invalid_thresholds_fail_fast() {
    for (c, i, p) in [(-0.1, 0.5, 0.5), (0.5, 1.1, 0.5), (0.5, 0.5, f32::NAN)] {
        let mut config = PipelineConfig::default();
        config.thresholds.confidence = c;
        config.thresholds.iou = i;
        config.thresholds.pixel_confidence = p;
        let result = SegmentationPipeline::new(tiny_shape(), ClassNames::coco(), config, SimdCapability::scalar_only());
        assert!(result.is_err());
    }
}

#[test]
fn test_zero_shape_rejected() {
    let shape = ModelShape {
        anchors: 0,
        ..tiny_shape()
    };
    let result = SegmentationPipeline::new(shape, ClassNames::coco(), PipelineConfig::default(), SimdCapability::scalar_only());
    assert!(matches!(result, Err(VisionError::Config(_))));
}

#[test]
fn test_box_beyond_input_is_clamped() {
    // Box centered on the corner, half outside the input
    let det = [16.0, 16.0, 16.0, 16.0, 0.9, 1.0];
    let p = SegmentationPipeline::new(tiny_shape(), ClassNames::coco(), PipelineConfig::default(), SimdCapability::scalar_only())
        .unwrap();
    let results = p.process(&det, &[5.0; 16], 16, 16).unwrap();
    assert_eq!(results[0].bbox, BoundingBox::new(8, 8, 8, 8));
    assert_eq!(results[0].mask.as_ref().unwrap().count_set(), 64);
}

#[test]
fn test_region_at_grid_edge() {
    let region = input_to_mask_region(&BoxF32::new(15.0, 15.0, 16.0, 16.0), &tiny_shape());
    assert_eq!(region, MaskRegion { x0: 3, y0: 3, x1: 3, y1: 3 });
    let region = input_to_mask_region(&BoxF32::new(f32::NAN, 0.0, 4.0, 4.0), &tiny_shape());
    assert_eq!(region.x0, 0);
}

#[test]
fn test_composite_no_results() {
    let p = SegmentationPipeline::new(tiny_shape(), ClassNames::coco(), PipelineConfig::default(), SimdCapability::scalar_only())
        .unwrap();
    let canvas = p.composite(&[], &CompositeOptions::new(10, 3, PixelFormat::Rgba8));
    assert_eq!(canvas.data, vec![0u8; 120]);
}

#[test]
fn test_zero_sized_canvas() {
    let mut mask = PackedMask::new(2, 2);
    mask.set(0, 0);
    let layer = segmask_vision::CompositeLayer {
        mask: &mask,
        bbox: BoundingBox::new(0, 0, 2, 2),
        color: Some(Rgba::WHITE),
        offset: (0, 0),
    };
    let c = Compositor::new(0, 0, PixelFormat::Rgba8, Rgba::WHITE);
    assert!(c.composite(&[layer]).data.is_empty());
    assert!(c.composite_parallel(&[layer], 4).data.is_empty());
}

#[test]
fn test_extreme_offsets_do_not_panic() {
    let mut mask = PackedMask::new(3, 3);
    mask.set(1, 1);
    let c = Compositor::new(4, 4, PixelFormat::Gray8, Rgba::WHITE);
    for offset in [(i32::MAX, 0), (i32::MIN, i32::MIN), (0, i32::MAX)] {
        let layer = segmask_vision::CompositeLayer {
            mask: &mask,
            bbox: BoundingBox::new(1, 1, 3, 3),
            color: None,
            offset,
        };
        assert!(c.composite(&[layer]).is_blank());
    }
}

#[test]
fn test_pack_empty_raster() {
    let mask = PackedMask::pack(&GrayRaster::new(0, 5), 0.5);
    assert!(mask.is_empty());
    assert_eq!(mask.as_bytes().len(), 0);
}

#[test]
fn test_metadata_defaults() {
    let meta = ModelMetadata::from_pairs([("imgsz", "[480, 640]"), ("task", "segment")]).unwrap();
    assert_eq!(meta.task, Some(ModelTask::Segment));
    assert_eq!(meta.input_size, Some((640, 480)));
    assert_eq!(meta.class_names().len(), 80);
    let shape = meta.resolve_shape(32, 160, 120).unwrap();
    assert_eq!(shape.num_classes, 80);
    assert_eq!(shape.anchors, 80 * 60 + 40 * 30 + 20 * 15);
}

#[test]
fn test_metadata_without_imgsz() {
    let meta = ModelMetadata::from_pairs(Vec::<(String, String)>::new()).unwrap();
    assert!(matches!(meta.resolve_shape(32, 160, 160), Err(VisionError::Metadata(_))));
}

#[test]
fn test_metadata_rejects_huge_class_index() {
    let result = ModelMetadata::from_pairs([("names", "{18446744073709551615: 'x'}")]);
    assert!(matches!(result, Err(VisionError::Metadata(_))));
    let result = ModelMetadata::from_pairs([("names", "{0: 'a', 4294967296: 'b'}")]);
    assert!(matches!(result, Err(VisionError::Metadata(_))));
}
