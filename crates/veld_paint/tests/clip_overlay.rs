//! Integration tests for drawable-clip overlays against the realizers
//!
//! These tests verify that:
//! - Re-applying an identical overlay produces the same native clip state
//!   as applying it once
//! - Removing an overlay restores the pre-apply clip exactly
//! - The realized clip seen by a backend reflects the composed overlay

use std::sync::Arc;

use veld_core::{Bitmap, Rect, Region};
use veld_paint::{
    Canvas, CanvasOp, Gc, GdiRealizer, NativeOp, PaintTarget, QuartzRealizer, Realizer,
    XlibRealizer,
};

fn realized_clip_ops(realizer: &mut dyn Realizer, gc: &mut Gc, tag: u64) -> Vec<CanvasOp> {
    realizer.acquire();
    let target = PaintTarget::new(Rect::new(0, 0, 100, 100)).with_paint_tag(tag);
    realizer
        .update_canvas(gc, None, None, true, &target)
        .unwrap();
    let canvas: Canvas = realizer.release().unwrap();
    canvas
        .ops()
        .iter()
        .filter(|op| {
            matches!(
                op,
                CanvasOp::Native(NativeOp::Xlib(veld_paint::backends::XlibOp::SetClipRectangles { .. }))
                    | CanvasOp::Native(NativeOp::Xlib(
                        veld_paint::backends::XlibOp::SetClipMask { .. }
                    ))
                    | CanvasOp::Native(NativeOp::Gdi(veld_paint::backends::GdiOp::SelectClipRegion(_)))
                    | CanvasOp::Native(NativeOp::Gdi(
                        veld_paint::backends::GdiOp::IntersectClipRegion(_)
                    ))
                    | CanvasOp::Native(NativeOp::Quartz(veld_paint::backends::QuartzOp::ResetClip(_)))
                    | CanvasOp::Native(NativeOp::Quartz(
                        veld_paint::backends::QuartzOp::ClipToRects(_)
                    ))
                    | CanvasOp::Native(NativeOp::Quartz(
                        veld_paint::backends::QuartzOp::ClipToMask { .. }
                    ))
            )
        })
        .cloned()
        .collect()
}

fn all_realizers() -> Vec<Box<dyn Realizer>> {
    vec![
        Box::new(XlibRealizer::new()),
        Box::new(GdiRealizer::new()),
        Box::new(QuartzRealizer::new()),
    ]
}

#[test]
fn overlay_idempotence_produces_identical_native_clip() {
    for mut realizer in all_realizers() {
        let exposure = Region::from_rect(Rect::new(5, 5, 20, 20));

        let mut once = Gc::new();
        once.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 30, 30))));
        once.apply_drawable_clip(1, &exposure, 0, 0).unwrap();
        let ops_once = realized_clip_ops(realizer.as_mut(), &mut once, 1);

        let mut twice = Gc::new();
        twice.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 30, 30))));
        twice.apply_drawable_clip(1, &exposure, 0, 0).unwrap();
        twice.apply_drawable_clip(1, &exposure, 0, 0).unwrap();
        let ops_twice = realized_clip_ops(realizer.as_mut(), &mut twice, 1);

        assert_eq!(ops_once, ops_twice, "backend {}", realizer.backend());
    }
}

#[test]
fn overlay_remove_restores_region_exactly() {
    let mut region = Region::new();
    region.union_rect(&Rect::new(0, 0, 10, 10));
    region.union_rect(&Rect::new(20, 0, 10, 10));

    let mut gc = Gc::new();
    gc.set_clip_region(Some(region.clone()));

    gc.apply_drawable_clip(42, &Region::from_rect(Rect::new(5, 0, 10, 10)), 0, 0)
        .unwrap();
    gc.remove_drawable_clip();

    assert_eq!(gc.clip_region(), Some(&region));
}

#[test]
fn overlay_remove_restores_mask_reference() {
    let mask = Arc::new(Bitmap::solid(16, 16));
    let mut gc = Gc::new();
    gc.set_clip_mask(Some(mask.clone()));

    gc.apply_drawable_clip(42, &Region::from_rect(Rect::new(8, 8, 20, 20)), 0, 0)
        .unwrap();
    gc.remove_drawable_clip();

    assert!(Arc::ptr_eq(gc.clip_mask().unwrap(), &mask));
}

#[test]
fn overlay_composes_into_realized_clip() {
    let mut gc = Gc::new();
    gc.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 40, 40))));
    gc.apply_drawable_clip(3, &Region::from_rect(Rect::new(10, 10, 40, 40)), 0, 0)
        .unwrap();

    let mut realizer = XlibRealizer::new();
    let ops = realized_clip_ops(&mut realizer, &mut gc, 3);
    assert_eq!(
        ops,
        vec![CanvasOp::Native(NativeOp::Xlib(
            veld_paint::backends::XlibOp::SetClipRectangles {
                rects: vec![Rect::new(10, 10, 30, 30)],
            }
        ))]
    );
}

#[test]
fn user_clip_setter_drops_standing_overlay() {
    let mut gc = Gc::new();
    gc.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 40, 40))));
    gc.apply_drawable_clip(3, &Region::from_rect(Rect::new(10, 10, 10, 10)), 0, 0)
        .unwrap();

    // A fresh user clip is not composed with the stale overlay
    gc.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 5, 5))));
    assert_eq!(gc.applied_overlay_tag(), None);
    assert_eq!(
        gc.clip_region(),
        Some(&Region::from_rect(Rect::new(0, 0, 5, 5)))
    );
}
