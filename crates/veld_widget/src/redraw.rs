//! Redraw queueing and update processing
//!
//! Invalidation is keyed by native surface: a widget's queued damage is
//! translated from widget coordinates into its owning surface's space and
//! unioned into that surface's pending region, so repeated invalidation
//! stays bounded. Processing drains the queue surface by surface, layers
//! the damage onto the paint GC as a drawable-clip overlay, and emits the
//! expose signal.

use indexmap::IndexMap;
use veld_core::{Rect, Region};
use veld_paint::{Gc, PaintTarget};

use crate::surface::SurfaceId;
use crate::tree::{WidgetId, WidgetTree};

/// Pending damage, surface by surface in first-damage order
#[derive(Debug, Default)]
pub(crate) struct RedrawQueue {
    pending: IndexMap<SurfaceId, Region>,
}

impl RedrawQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, surface: SurfaceId, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.pending.entry(surface).or_default().union_rect(&rect);
    }

    pub(crate) fn take_all(&mut self) -> IndexMap<SurfaceId, Region> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn drop_surface(&mut self, surface: SurfaceId) {
        self.pending.shift_remove(&surface);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn pending_for(&self, surface: SurfaceId) -> Option<&Region> {
        self.pending.get(&surface)
    }
}

impl WidgetTree {
    /// Translate a widget-relative rect into (owning surface, surface
    /// coordinates). A windowed widget's content coordinates are its own
    /// surface's coordinates; a windowless widget's allocation places it
    /// directly in the owning surface's space.
    pub fn widget_area_on_surface(&self, id: WidgetId, rect: Rect) -> Option<(SurfaceId, Rect)> {
        if !self.is_realized(id) {
            return None;
        }
        if let Some(surface) = self.get(id).and_then(|w| w.surface()) {
            return Some((surface, rect));
        }
        let surface = self.effective_surface(id)?;
        let allocation = self.allocation(id);
        Some((surface, rect.offset(allocation.x, allocation.y)))
    }

    /// Queue a full redraw: the widget's allocation plus every
    /// descendant-owned surface lying within it. Used when content or
    /// size changed.
    pub fn queue_draw(&mut self, id: WidgetId) {
        if !self.contains(id) {
            return;
        }
        let allocation = self.allocation(id);
        let local = Rect::new(0, 0, allocation.width, allocation.height);
        if let Some((surface, rect)) = self.widget_area_on_surface(id, local) {
            self.redraw.add(surface, rect);
        }
        self.queue_descendant_surfaces(id);
    }

    /// Queue a redraw of part of the widget, in widget coordinates
    pub fn queue_draw_area(&mut self, id: WidgetId, rect: Rect) {
        if let Some((surface, rect)) = self.widget_area_on_surface(id, rect) {
            self.redraw.add(surface, rect);
        }
    }

    /// Queue a shallow redraw: only surfaces owned by this widget. Used
    /// when the widget merely moved and its rendering is position
    /// independent.
    pub fn queue_shallow_draw(&mut self, id: WidgetId) {
        if let Some(surface) = self.get(id).and_then(|w| w.surface()) {
            if let Some(size) = self.surfaces.size(surface) {
                self.redraw
                    .add(surface, Rect::new(0, 0, size.width, size.height));
            }
        }
    }

    /// Invalidate an allocation-space rect on the surface the widget's
    /// area occupies (the parent-side erase for moves and unmaps)
    pub(crate) fn invalidate_area_on_owner(&mut self, id: WidgetId, area: Rect) {
        let surface = if self.has_own_window(id) {
            self.parent(id).and_then(|p| self.effective_surface(p))
        } else {
            self.effective_surface(id)
        };
        if let Some(surface) = surface {
            self.redraw.add(surface, area);
        }
    }

    fn queue_descendant_surfaces(&mut self, id: WidgetId) {
        let children: Vec<_> = self.children(id).to_vec();
        for child in children {
            if let Some(surface) = self.get(child).and_then(|w| w.surface()) {
                if let Some(size) = self.surfaces.size(surface) {
                    self.redraw
                        .add(surface, Rect::new(0, 0, size.width, size.height));
                }
            }
            self.queue_descendant_surfaces(child);
        }
    }

    pub fn has_pending_redraws(&self) -> bool {
        !self.redraw.is_empty()
    }

    /// The pending damage for the surface a widget draws into
    pub fn pending_damage(&self, id: WidgetId) -> Option<&Region> {
        let surface = self.effective_surface(id)?;
        self.redraw.pending_for(surface)
    }

    /// Drain the redraw queue. For each damaged surface the damage is
    /// layered onto `gc` as a drawable-clip overlay (tagged per pass,
    /// so re-application within the pass is free), the owning widget
    /// gets its expose signal, and `paint` runs with the prepared GC.
    pub fn process_updates<F>(&mut self, gc: &mut Gc, mut paint: F)
    where
        F: FnMut(&mut WidgetTree, WidgetId, &PaintTarget, &Region, &mut Gc),
    {
        let pending = self.redraw.take_all();
        for (surface, region) in pending {
            if !self.surfaces.contains(surface) || !self.surfaces.is_visible(surface) {
                continue;
            }
            let Some(&owner) = self.surface_owner.get(&surface) else {
                continue;
            };
            let tag = self.next_paint_tag;
            self.next_paint_tag += 1;
            let Some(target) = self.surfaces.paint_target(surface, tag) else {
                continue;
            };

            if let Err(err) = gc.apply_drawable_clip(tag, &region, 0, 0) {
                tracing::warn!(error = %err, "skipping damaged surface, clip overlay failed");
                continue;
            }
            self.emit(owner, "expose-event");
            paint(self, owner, &target, &region, gc);
            gc.remove_drawable_clip();
        }
    }
}
