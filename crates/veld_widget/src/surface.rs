//! Native surface store
//!
//! Surfaces stand in for native windows. Each is owned by exactly one
//! widget; windowless widgets resolve their effective surface by walking
//! up the parent chain. The store records an ordered event trace, which
//! is how destruction ordering is observed.

use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};
use veld_core::{Bitmap, Point, Rect, Region, Size};
use veld_paint::PaintTarget;

new_key_type! {
    /// Unique identifier for a surface
    pub struct SurfaceId;
}

/// An ordered record of surface operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    Created(SurfaceId),
    Destroyed(SurfaceId),
    Shown(SurfaceId),
    Hidden(SurfaceId),
    Moved(SurfaceId, Point),
    Resized(SurfaceId, Size),
    ShapeApplied(SurfaceId),
    InputShapeApplied(SurfaceId),
}

#[derive(Debug, Default)]
struct Surface {
    /// Position within the parent surface
    position: Point,
    size: Size,
    visible: bool,
    invalid: Region,
    shape_mask: Option<Arc<Bitmap>>,
    input_shape_mask: Option<Arc<Bitmap>>,
}

/// The store of all live surfaces
#[derive(Debug, Default)]
pub struct SurfaceStore {
    surfaces: SlotMap<SurfaceId, Surface>,
    events: Vec<SurfaceEvent>,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, bounds: Rect) -> SurfaceId {
        let id = self.surfaces.insert(Surface {
            position: bounds.origin(),
            size: bounds.size(),
            ..Surface::default()
        });
        self.events.push(SurfaceEvent::Created(id));
        id
    }

    pub fn destroy(&mut self, id: SurfaceId) {
        if self.surfaces.remove(id).is_some() {
            self.events.push(SurfaceEvent::Destroyed(id));
        }
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(id)
    }

    pub fn show(&mut self, id: SurfaceId) {
        if let Some(surface) = self.surfaces.get_mut(id) {
            if !surface.visible {
                surface.visible = true;
                self.events.push(SurfaceEvent::Shown(id));
            }
        }
    }

    pub fn hide(&mut self, id: SurfaceId) {
        if let Some(surface) = self.surfaces.get_mut(id) {
            if surface.visible {
                surface.visible = false;
                self.events.push(SurfaceEvent::Hidden(id));
            }
        }
    }

    pub fn is_visible(&self, id: SurfaceId) -> bool {
        self.surfaces.get(id).map(|s| s.visible).unwrap_or(false)
    }

    pub fn position(&self, id: SurfaceId) -> Option<Point> {
        self.surfaces.get(id).map(|s| s.position)
    }

    pub fn size(&self, id: SurfaceId) -> Option<Size> {
        self.surfaces.get(id).map(|s| s.size)
    }

    pub fn set_geometry(&mut self, id: SurfaceId, bounds: Rect) {
        if let Some(surface) = self.surfaces.get_mut(id) {
            if surface.position != bounds.origin() {
                surface.position = bounds.origin();
                self.events.push(SurfaceEvent::Moved(id, bounds.origin()));
            }
            if surface.size != bounds.size() {
                surface.size = bounds.size();
                self.events.push(SurfaceEvent::Resized(id, bounds.size()));
            }
        }
    }

    /// Accumulate an invalid rect; repeated invalidation unions into the
    /// surface's pending region
    pub fn invalidate_rect(&mut self, id: SurfaceId, rect: Rect) {
        if let Some(surface) = self.surfaces.get_mut(id) {
            surface.invalid.union_rect(&rect);
        }
    }

    pub fn invalidate_region(&mut self, id: SurfaceId, region: &Region) {
        if let Some(surface) = self.surfaces.get_mut(id) {
            surface.invalid.union(region);
        }
    }

    pub fn invalid(&self, id: SurfaceId) -> Option<&Region> {
        self.surfaces.get(id).map(|s| &s.invalid)
    }

    pub fn take_invalid(&mut self, id: SurfaceId) -> Region {
        self.surfaces
            .get_mut(id)
            .map(|s| std::mem::take(&mut s.invalid))
            .unwrap_or_default()
    }

    pub fn set_shape_mask(&mut self, id: SurfaceId, mask: Option<Arc<Bitmap>>) {
        if let Some(surface) = self.surfaces.get_mut(id) {
            surface.shape_mask = mask;
            self.events.push(SurfaceEvent::ShapeApplied(id));
        }
    }

    pub fn set_input_shape_mask(&mut self, id: SurfaceId, mask: Option<Arc<Bitmap>>) {
        if let Some(surface) = self.surfaces.get_mut(id) {
            surface.input_shape_mask = mask;
            self.events.push(SurfaceEvent::InputShapeApplied(id));
        }
    }

    pub fn shape_mask(&self, id: SurfaceId) -> Option<&Arc<Bitmap>> {
        self.surfaces.get(id).and_then(|s| s.shape_mask.as_ref())
    }

    pub fn input_shape_mask(&self, id: SurfaceId) -> Option<&Arc<Bitmap>> {
        self.surfaces
            .get(id)
            .and_then(|s| s.input_shape_mask.as_ref())
    }

    /// Build the paint target for a drawing pass on this surface
    pub fn paint_target(&self, id: SurfaceId, paint_tag: u64) -> Option<PaintTarget> {
        self.surfaces.get(id).map(|surface| {
            let bounds = Rect::from_origin_size(Point::ZERO, surface.size);
            PaintTarget::new(bounds).with_paint_tag(paint_tag)
        })
    }

    /// The ordered event trace
    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_events_in_order() {
        let mut store = SurfaceStore::new();
        let id = store.create(Rect::new(10, 10, 50, 50));
        store.show(id);
        store.hide(id);
        store.destroy(id);

        assert_eq!(
            store.events(),
            &[
                SurfaceEvent::Created(id),
                SurfaceEvent::Shown(id),
                SurfaceEvent::Hidden(id),
                SurfaceEvent::Destroyed(id),
            ]
        );
        assert!(!store.contains(id));
    }

    #[test]
    fn test_repeated_show_records_once() {
        let mut store = SurfaceStore::new();
        let id = store.create(Rect::new(0, 0, 10, 10));
        store.show(id);
        store.show(id);
        let shows = store
            .events()
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::Shown(_)))
            .count();
        assert_eq!(shows, 1);
    }

    #[test]
    fn test_invalidation_accumulates() {
        let mut store = SurfaceStore::new();
        let id = store.create(Rect::new(0, 0, 100, 100));
        store.invalidate_rect(id, Rect::new(0, 0, 10, 10));
        store.invalidate_rect(id, Rect::new(0, 0, 10, 10));
        store.invalidate_rect(id, Rect::new(10, 0, 10, 10));

        let invalid = store.take_invalid(id);
        assert_eq!(invalid, Region::from_rect(Rect::new(0, 0, 20, 10)));
        assert!(store.take_invalid(id).is_empty());
    }
}
