//! Drawable-clip overlays
//!
//! An exposure (or any other drawable-imposed clip) is layered on top of
//! a graphics context's user clip without destroying it: the pre-overlay
//! clip is saved aside and restored exactly on removal. At most one
//! overlay is applied per context at a time; re-applying the same
//! tag+offset is a no-op, so repeated draws within one expose pay the
//! composition cost once.

use veld_core::{Point, Region, ResourceError};

use crate::values::{Clip, Gc};

/// The applied overlay plus what it replaced
#[derive(Clone, Debug)]
pub(crate) struct DrawableClip {
    tag: u64,
    offset: Point,
    saved: Clip,
}

impl Gc {
    /// The tag of the currently applied overlay, if any
    pub fn applied_overlay_tag(&self) -> Option<u64> {
        self.overlay.as_ref().map(|o| o.tag)
    }

    /// Layer a drawable-imposed clip over the user clip.
    ///
    /// `region` is in the drawable's coordinate space and is shifted by
    /// `offset_x`/`offset_y` before composition. Applying the same
    /// tag+offset twice is a no-op; a different tag or offset first
    /// restores the previous overlay.
    ///
    /// With a region clip (or no clip) set, composition is a region
    /// intersection. With a mask clip set, the mask is composited through
    /// the region, classified to avoid needless scratch allocation:
    /// a region covering the whole mask extent leaves the mask untouched,
    /// a disjoint region produces an empty clip, and only a true partial
    /// overlap pays for a scratch mask.
    pub fn apply_drawable_clip(
        &mut self,
        tag: u64,
        region: &Region,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<(), ResourceError> {
        let offset = Point::new(offset_x, offset_y);
        if let Some(overlay) = &self.overlay {
            if overlay.tag == tag && overlay.offset == offset {
                return Ok(());
            }
            self.remove_drawable_clip();
        }

        let mut shifted = region.clone();
        shifted.offset(offset_x, offset_y);

        let saved = self.clip().clone();
        let composed = match self.clip() {
            Clip::None => Clip::Region(shifted),
            Clip::Region(user) => {
                let mut intersection = user.clone();
                intersection.intersect(&shifted);
                Clip::Region(intersection)
            }
            Clip::Mask(mask) => {
                let extent = mask.extent_at(self.clip_origin());
                if shifted.contains_rect(&extent) {
                    // The region covers the whole mask; compositing would
                    // change nothing.
                    Clip::Mask(mask.clone())
                } else {
                    let mut overlap = shifted.clone();
                    overlap.intersect_rect(&extent);
                    if overlap.is_empty() {
                        Clip::Region(Region::new())
                    } else {
                        let scratch =
                            mask.composite_through_region(self.clip_origin(), &shifted);
                        Clip::Mask(std::sync::Arc::new(scratch))
                    }
                }
            }
        };

        self.replace_clip(composed);
        self.overlay = Some(DrawableClip { tag, offset, saved });
        self.mark_geometry_dirty();
        Ok(())
    }

    /// Remove the applied overlay, restoring the pre-overlay clip exactly:
    /// the same mask reference, or the region bit-for-bit.
    pub fn remove_drawable_clip(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            self.replace_clip(overlay.saved);
            self.mark_geometry_dirty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use veld_core::{Bitmap, Rect};

    #[test]
    fn test_apply_over_no_clip_installs_region() {
        let mut gc = Gc::new();
        let region = Region::from_rect(Rect::new(0, 0, 10, 10));
        gc.apply_drawable_clip(1, &region, 5, 0).unwrap();
        assert_eq!(
            gc.clip_region(),
            Some(&Region::from_rect(Rect::new(5, 0, 10, 10)))
        );

        gc.remove_drawable_clip();
        assert!(matches!(gc.clip(), Clip::None));
    }

    #[test]
    fn test_apply_intersects_user_region() {
        let mut gc = Gc::new();
        gc.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 10, 10))));

        let exposure = Region::from_rect(Rect::new(5, 5, 10, 10));
        gc.apply_drawable_clip(1, &exposure, 0, 0).unwrap();
        assert_eq!(
            gc.clip_region(),
            Some(&Region::from_rect(Rect::new(5, 5, 5, 5)))
        );
    }

    #[test]
    fn test_same_tag_and_offset_is_idempotent() {
        let mut gc = Gc::new();
        gc.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 10, 10))));

        let exposure = Region::from_rect(Rect::new(5, 5, 10, 10));
        gc.apply_drawable_clip(1, &exposure, 0, 0).unwrap();
        let after_first = gc.clip_region().cloned();

        gc.apply_drawable_clip(1, &exposure, 0, 0).unwrap();
        assert_eq!(gc.clip_region().cloned(), after_first);

        // A single removal restores the original user clip
        gc.remove_drawable_clip();
        assert_eq!(
            gc.clip_region(),
            Some(&Region::from_rect(Rect::new(0, 0, 10, 10)))
        );
    }

    #[test]
    fn test_new_tag_replaces_previous_overlay() {
        let mut gc = Gc::new();
        gc.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 20, 20))));

        gc.apply_drawable_clip(1, &Region::from_rect(Rect::new(0, 0, 10, 20)), 0, 0)
            .unwrap();
        gc.apply_drawable_clip(2, &Region::from_rect(Rect::new(10, 0, 10, 20)), 0, 0)
            .unwrap();

        // The second overlay composes against the restored user clip, not
        // the first overlay's result.
        assert_eq!(
            gc.clip_region(),
            Some(&Region::from_rect(Rect::new(10, 0, 10, 20)))
        );

        gc.remove_drawable_clip();
        assert_eq!(
            gc.clip_region(),
            Some(&Region::from_rect(Rect::new(0, 0, 20, 20)))
        );
    }

    #[test]
    fn test_restore_returns_identical_mask_reference() {
        let mut gc = Gc::new();
        let mask = Arc::new(Bitmap::solid(8, 8));
        gc.set_clip_mask(Some(mask.clone()));

        // Partial overlap forces a scratch composite
        gc.apply_drawable_clip(1, &Region::from_rect(Rect::new(4, 4, 10, 10)), 0, 0)
            .unwrap();
        let composed = gc.clip_mask().unwrap().clone();
        assert!(!Arc::ptr_eq(&composed, &mask));

        gc.remove_drawable_clip();
        assert!(Arc::ptr_eq(gc.clip_mask().unwrap(), &mask));
    }

    #[test]
    fn test_region_covering_mask_keeps_mask() {
        let mut gc = Gc::new();
        let mask = Arc::new(Bitmap::solid(8, 8));
        gc.set_clip_mask(Some(mask.clone()));

        gc.apply_drawable_clip(1, &Region::from_rect(Rect::new(-2, -2, 20, 20)), 0, 0)
            .unwrap();
        assert!(Arc::ptr_eq(gc.clip_mask().unwrap(), &mask));
    }

    #[test]
    fn test_disjoint_region_yields_empty_clip() {
        let mut gc = Gc::new();
        gc.set_clip_mask(Some(Arc::new(Bitmap::solid(8, 8))));

        gc.apply_drawable_clip(1, &Region::from_rect(Rect::new(100, 100, 10, 10)), 0, 0)
            .unwrap();
        match gc.clip() {
            Clip::Region(region) => assert!(region.is_empty()),
            other => panic!("expected empty region clip, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_overlap_composites_mask() {
        let mut gc = Gc::new();
        let mask = Arc::new(Bitmap::solid(8, 8));
        gc.set_clip_mask(Some(mask));
        gc.set_clip_origin(Point::new(0, 0));

        gc.apply_drawable_clip(1, &Region::from_rect(Rect::new(4, 0, 10, 10)), 0, 0)
            .unwrap();
        let composed = gc.clip_mask().unwrap();
        assert!(!composed.get(0, 0));
        assert!(composed.get(4, 0));
        assert!(composed.get(7, 7));
    }
}
