//! Widget lifecycle transitions
//!
//! The show/hide, realize/unrealize, and map/unmap cascades, plus
//! sensitivity propagation and parenting. Transitions are synchronous and
//! depth-first: realizing a widget fully realizes its ancestors before
//! its own hook runs, and unrealizing fully unrealizes all children
//! before the widget's own surface is destroyed. Calls whose
//! preconditions do not hold are warned and become no-ops.

use std::sync::Arc;

use veld_core::{Bitmap, Rect, Size};

use crate::flags::{StateType, WidgetFlags};
use crate::tree::{WidgetId, WidgetTree};

impl WidgetTree {
    // === Show / hide ===

    /// Mark the widget to be shown. Cascades to `map` when the parent is
    /// already mapped and the widget is child-visible.
    pub fn show(&mut self, id: WidgetId) {
        if !self.contains(id) || self.is_visible(id) {
            return;
        }
        self.set_flag(id, WidgetFlags::VISIBLE, true);
        self.emit(id, "show");
        self.notify(id, "visible");

        if !self.is_toplevel(id) {
            self.queue_resize(id);
        }
        if let Some(parent) = self.parent(id) {
            if self.is_mapped(parent)
                && self.has_flag(id, WidgetFlags::CHILD_VISIBLE)
                && !self.is_mapped(id)
            {
                self.map(id);
            }
        }
    }

    /// Recursively show this widget and all descendants, skipping
    /// subtrees that opted out with NO_SHOW_ALL
    pub fn show_all(&mut self, id: WidgetId) {
        if !self.contains(id) || self.has_flag(id, WidgetFlags::NO_SHOW_ALL) {
            return;
        }
        let children: Vec<_> = self.children(id).to_vec();
        for child in children {
            self.show_all(child);
        }
        self.show(id);
    }

    /// Hide the widget, unmapping it if needed. Hiding a toplevel first
    /// releases any focus or default held inside it.
    pub fn hide(&mut self, id: WidgetId) {
        if !self.contains(id) || !self.is_visible(id) {
            return;
        }
        if self.is_toplevel(id) {
            self.release_focus_within(id);
            self.release_default_within(id);
        }
        self.set_flag(id, WidgetFlags::VISIBLE, false);
        if self.is_mapped(id) {
            self.unmap(id);
        }
        self.emit(id, "hide");
        self.notify(id, "visible");
        if !self.is_toplevel(id) {
            self.queue_resize(id);
        }
    }

    // === Realize / unrealize ===

    /// Allocate native resources. Ancestors realize first; a non-toplevel
    /// without a parent cannot realize.
    pub fn realize(&mut self, id: WidgetId) {
        if !self.contains(id) || self.is_realized(id) {
            return;
        }
        let parent = self.parent(id);
        if parent.is_none() && !self.is_toplevel(id) {
            tracing::warn!(?id, "cannot realize a non-toplevel widget without a parent");
            return;
        }
        if let Some(parent) = parent {
            if !self.is_realized(parent) {
                self.realize(parent);
            }
        }

        self.set_flag(id, WidgetFlags::REALIZED, true);

        if self.has_own_window(id) {
            let allocation = self.allocation(id);
            let surface = self.surfaces.create(allocation);
            self.surface_owner.insert(surface, id);
            if let Some(widget) = self.widgets.get_mut(id) {
                widget.surface = Some(surface);
            }
        }

        self.with_hooks(id, |hooks, tree| hooks.realize(id, &tree.surfaces));

        // Settings queued before realization take effect now
        let pending_shape = self
            .widgets
            .get_mut(id)
            .and_then(|w| w.pending_shape_mask.take());
        let pending_input_shape = self
            .widgets
            .get_mut(id)
            .and_then(|w| w.pending_input_shape_mask.take());
        if let Some(surface) = self.widgets.get(id).and_then(|w| w.surface) {
            if let Some(mask) = pending_shape {
                self.surfaces.set_shape_mask(surface, Some(mask));
            }
            if let Some(mask) = pending_input_shape {
                self.surfaces.set_input_shape_mask(surface, Some(mask));
            }
        }

        self.emit(id, "realize");
    }

    /// Release native resources. All children unrealize before this
    /// widget's own surface is destroyed; children holding an inherited
    /// surface reference must let go before the owner tears it down.
    pub fn unrealize(&mut self, id: WidgetId) {
        if !self.contains(id) || !self.is_realized(id) {
            return;
        }
        if self.is_mapped(id) {
            self.unmap(id);
        }

        let children: Vec<_> = self.children(id).to_vec();
        for child in children {
            self.unrealize(child);
        }

        self.with_hooks(id, |hooks, tree| hooks.unrealize(id, &tree.surfaces));

        if let Some(surface) = self.widgets.get_mut(id).and_then(|w| w.surface.take()) {
            self.surface_owner.remove(&surface);
            self.redraw.drop_surface(surface);
            self.surfaces.destroy(surface);
        }
        self.set_flag(id, WidgetFlags::REALIZED, false);
        self.emit(id, "unrealize");
    }

    // === Map / unmap ===

    /// Make the realized widget's surface visible. Calling this on an
    /// invisible or non-child-visible widget is a programmer error.
    pub fn map(&mut self, id: WidgetId) {
        if !self.contains(id) {
            return;
        }
        if !self.is_visible(id) || !self.has_flag(id, WidgetFlags::CHILD_VISIBLE) {
            tracing::warn!(?id, "map called on a widget that is not visible");
            return;
        }
        if self.is_mapped(id) {
            return;
        }
        if !self.is_realized(id) {
            self.realize(id);
        }

        self.set_flag(id, WidgetFlags::MAPPED, true);
        self.with_hooks(id, |hooks, tree| hooks.map(id, &tree.surfaces));
        self.emit(id, "map");

        if let Some(surface) = self.widgets.get(id).and_then(|w| w.surface) {
            self.surfaces.show(surface);
        } else {
            // Draws into a shared surface: repaint the area it covers
            self.queue_draw(id);
        }

        // Map visible children the way a container's map handler would
        let children: Vec<_> = self.children(id).to_vec();
        for child in children {
            if self.is_visible(child)
                && self.has_flag(child, WidgetFlags::CHILD_VISIBLE)
                && !self.is_mapped(child)
            {
                self.map(child);
            }
        }
    }

    /// Hide the widget's surface. Children unmap first so the mapped
    /// invariants hold at every step.
    pub fn unmap(&mut self, id: WidgetId) {
        if !self.contains(id) || !self.is_mapped(id) {
            return;
        }

        let children: Vec<_> = self.children(id).to_vec();
        for child in children {
            self.unmap(child);
        }

        if let Some(surface) = self.widgets.get(id).and_then(|w| w.surface) {
            self.surfaces.hide(surface);
        } else {
            // Erase the area the widget occupied on the shared surface
            self.queue_draw(id);
        }
        self.set_flag(id, WidgetFlags::MAPPED, false);
        self.with_hooks(id, |hooks, tree| hooks.unmap(id, &tree.surfaces));
        self.emit(id, "unmap");
    }

    // === Parenting ===

    /// Attach `child` to `parent`, inheriting effective state and
    /// enforcing the realized/mapped invariants immediately: the child
    /// realizes if the parent is realized, and maps if the parent is
    /// mapped and the child is visible and child-visible.
    pub fn set_parent(&mut self, child: WidgetId, parent: WidgetId) {
        if !self.contains(child) || !self.contains(parent) {
            return;
        }
        if child == parent {
            tracing::warn!(?child, "cannot parent a widget to itself");
            return;
        }
        if self.parent(child).is_some() {
            tracing::warn!(?child, "widget already has a parent");
            return;
        }
        if self.is_toplevel(child) {
            tracing::warn!(?child, "cannot parent a toplevel widget");
            return;
        }

        if let Some(widget) = self.widgets.get_mut(child) {
            widget.parent = Some(parent);
        }
        if let Some(widget) = self.widgets.get_mut(parent) {
            widget.children.push(child);
        }

        if self.has_flag(parent, WidgetFlags::ANCHORED) {
            self.anchor_subtree(child, true);
        }
        self.emit(child, "parent-set");

        // Inherit effective sensitivity, then the parent's visual state
        // unless the parent sits in the base state
        let parent_effective = self.is_effectively_sensitive(parent);
        if let Some(widget) = self.widgets.get_mut(child) {
            widget.flags.set(WidgetFlags::PARENT_SENSITIVE, parent_effective);
        }
        self.propagate_state(child, false);

        let parent_state = self.widgets.get(parent).map(|w| w.state);
        if let Some(state) = parent_state {
            if state != StateType::Normal && state != StateType::Insensitive {
                let mut inherited = false;
                if let Some(widget) = self.widgets.get_mut(child) {
                    if widget.state == StateType::Normal {
                        widget.state = state;
                        inherited = true;
                    }
                }
                if inherited {
                    self.emit(child, "state-changed");
                }
            }
        }

        if self.is_realized(parent) {
            self.realize(child);
        }
        if self.is_mapped(parent)
            && self.is_visible(child)
            && self.has_flag(child, WidgetFlags::CHILD_VISIBLE)
        {
            self.map(child);
        }
        if self.is_visible(child) {
            self.queue_resize(child);
        }
    }

    /// Break the parent edge. The child unrealizes first, releasing any
    /// (possibly inherited) surface reference.
    pub fn unparent(&mut self, child: WidgetId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if self.is_realized(child) {
            self.unrealize(child);
        }
        if let Some(widget) = self.widgets.get_mut(parent) {
            widget.children.retain(|c| *c != child);
        }
        if let Some(widget) = self.widgets.get_mut(child) {
            widget.parent = None;
            widget.flags.insert(WidgetFlags::PARENT_SENSITIVE);
        }
        self.anchor_subtree(child, false);
        self.emit(child, "parent-set");
    }

    /// Destroy the widget and its whole subtree: children first, then
    /// unparent (breaking the parent edge), then release native
    /// resources and drop the record.
    pub fn destroy(&mut self, id: WidgetId) {
        if !self.contains(id) {
            return;
        }
        let children: Vec<_> = self.children(id).to_vec();
        for child in children {
            self.destroy(child);
        }
        self.hide(id);
        if self.parent(id).is_some() {
            self.unparent(id);
        } else {
            self.unrealize(id);
        }
        self.grab_stack.retain(|&w| w != id);
        self.resize_queue.retain(|&w| w != id);
        self.emit(id, "destroy");
        self.widgets.remove(id);
    }

    fn anchor_subtree(&mut self, id: WidgetId, anchored: bool) {
        self.set_flag(id, WidgetFlags::ANCHORED, anchored);
        let children: Vec<_> = self.children(id).to_vec();
        for child in children {
            self.anchor_subtree(child, anchored);
        }
    }

    // === Sensitivity ===

    /// Change the widget's own sensitivity and propagate the effective
    /// result down the tree. Propagation is gated by local change: a
    /// child whose effective sensitivity did not move does not re-visit
    /// its own children, except to realign saved states when coming back
    /// from insensitive.
    pub fn set_sensitive(&mut self, id: WidgetId, sensitive: bool) {
        if !self.contains(id) || self.has_flag(id, WidgetFlags::SENSITIVE) == sensitive {
            return;
        }
        self.set_flag(id, WidgetFlags::SENSITIVE, sensitive);
        self.notify(id, "sensitive");
        self.propagate_state(id, sensitive);
    }

    pub(crate) fn propagate_state(&mut self, id: WidgetId, restoring: bool) {
        let effective = self.is_effectively_sensitive(id);

        let mut state_changed = false;
        if let Some(widget) = self.widgets.get_mut(id) {
            if !effective {
                if widget.state != StateType::Insensitive {
                    widget.saved_state = widget.state;
                    widget.state = StateType::Insensitive;
                    state_changed = true;
                }
            } else if widget.state == StateType::Insensitive {
                widget.state = widget.saved_state;
                state_changed = true;
            }
        }

        if state_changed {
            if !effective {
                self.release_focus_within(id);
            }
            self.emit(id, "state-changed");
            if self.is_mapped(id) {
                self.queue_draw(id);
            }
        }

        let children: Vec<_> = self.children(id).to_vec();
        for child in children {
            let old_effective = self.is_effectively_sensitive(child);
            if let Some(widget) = self.widgets.get_mut(child) {
                widget.flags.set(WidgetFlags::PARENT_SENSITIVE, effective);
            }
            let new_effective = self.is_effectively_sensitive(child);
            let needs_realign = restoring
                && new_effective
                && self.widgets.get(child).map(|w| w.state) == Some(StateType::Insensitive);
            if old_effective != new_effective || needs_realign {
                self.propagate_state(child, restoring);
            }
        }
    }

    /// Set the widget's visual state. While the widget is insensitive
    /// the request lands in the saved state and takes effect when
    /// sensitivity returns.
    pub fn set_state(&mut self, id: WidgetId, state: StateType) {
        if state == StateType::Insensitive {
            tracing::warn!(?id, "insensitive state is driven by set_sensitive");
            return;
        }
        let Some(widget) = self.widgets.get_mut(id) else {
            return;
        };
        if widget.state == StateType::Insensitive {
            widget.saved_state = state;
            return;
        }
        if widget.state != state {
            widget.state = state;
            self.emit(id, "state-changed");
            if self.is_mapped(id) {
                self.queue_draw(id);
            }
        }
    }

    pub fn state(&self, id: WidgetId) -> StateType {
        self.widgets
            .get(id)
            .map(|w| w.state)
            .unwrap_or(StateType::Normal)
    }

    // === Focus and default ===

    /// Move keyboard focus to the widget. Requires CAN_FOCUS and
    /// effective sensitivity.
    pub fn grab_focus(&mut self, id: WidgetId) {
        if !self.contains(id) {
            return;
        }
        if !self.has_flag(id, WidgetFlags::CAN_FOCUS) {
            tracing::warn!(?id, "grab_focus on a widget that cannot accept focus");
            return;
        }
        if !self.is_effectively_sensitive(id) {
            tracing::warn!(?id, "grab_focus on an insensitive widget");
            return;
        }
        let toplevel = self.toplevel_of(id);
        let old_focus = self.widgets.get(toplevel).and_then(|w| w.focus_child);
        if old_focus == Some(id) {
            return;
        }
        if let Some(old) = old_focus {
            self.set_flag(old, WidgetFlags::HAS_FOCUS, false);
            self.emit(old, "focus-out");
        }
        if let Some(widget) = self.widgets.get_mut(toplevel) {
            widget.focus_child = Some(id);
        }
        self.set_flag(id, WidgetFlags::HAS_FOCUS, true);
        self.emit(id, "focus-in");
    }

    /// The focus widget of the toplevel this widget belongs to
    pub fn focus_widget(&self, id: WidgetId) -> Option<WidgetId> {
        self.widgets
            .get(self.toplevel_of(id))
            .and_then(|w| w.focus_child)
    }

    /// Make the widget its toplevel's default
    pub fn grab_default(&mut self, id: WidgetId) {
        if !self.has_flag(id, WidgetFlags::CAN_DEFAULT) {
            tracing::warn!(?id, "grab_default on a widget that cannot be default");
            return;
        }
        let toplevel = self.toplevel_of(id);
        let old = self.widgets.get(toplevel).and_then(|w| w.default_child);
        if let Some(old) = old {
            self.set_flag(old, WidgetFlags::HAS_DEFAULT, false);
        }
        if let Some(widget) = self.widgets.get_mut(toplevel) {
            widget.default_child = Some(id);
        }
        self.set_flag(id, WidgetFlags::HAS_DEFAULT, true);
    }

    /// Clear focus on `id`'s toplevel when the focus widget is `id` or
    /// one of its descendants
    pub(crate) fn release_focus_within(&mut self, id: WidgetId) {
        let toplevel = self.toplevel_of(id);
        let focus = self.widgets.get(toplevel).and_then(|w| w.focus_child);
        if let Some(focus) = focus {
            if self.is_ancestor_or_self(id, focus) {
                if let Some(widget) = self.widgets.get_mut(toplevel) {
                    widget.focus_child = None;
                }
                self.set_flag(focus, WidgetFlags::HAS_FOCUS, false);
                self.emit(focus, "focus-out");
            }
        }
    }

    pub(crate) fn release_default_within(&mut self, id: WidgetId) {
        let toplevel = self.toplevel_of(id);
        let default = self.widgets.get(toplevel).and_then(|w| w.default_child);
        if let Some(default) = default {
            if self.is_ancestor_or_self(id, default) {
                if let Some(widget) = self.widgets.get_mut(toplevel) {
                    widget.default_child = None;
                }
                self.set_flag(default, WidgetFlags::HAS_DEFAULT, false);
            }
        }
    }

    // === Misc setters ===

    /// Control whether the parent shows this child along with itself.
    /// Maps or unmaps immediately when the parent is already mapped.
    pub fn set_child_visible(&mut self, id: WidgetId, child_visible: bool) {
        if !self.contains(id) || self.is_toplevel(id) {
            return;
        }
        if self.has_flag(id, WidgetFlags::CHILD_VISIBLE) == child_visible {
            return;
        }
        if child_visible {
            self.set_flag(id, WidgetFlags::CHILD_VISIBLE, true);
            if let Some(parent) = self.parent(id) {
                if self.is_mapped(parent) && self.is_visible(id) && !self.is_mapped(id) {
                    self.map(id);
                }
            }
        } else {
            if self.is_mapped(id) {
                self.unmap(id);
            }
            self.set_flag(id, WidgetFlags::CHILD_VISIBLE, false);
        }
    }

    pub fn set_can_focus(&mut self, id: WidgetId, can_focus: bool) {
        self.set_flag(id, WidgetFlags::CAN_FOCUS, can_focus);
        if !can_focus && self.has_flag(id, WidgetFlags::HAS_FOCUS) {
            self.release_focus_within(id);
        }
        self.notify(id, "can-focus");
    }

    /// Queue a shape mask. Takes effect at realize time when called
    /// before realization.
    pub fn shape_combine_mask(&mut self, id: WidgetId, mask: Option<Arc<Bitmap>>) {
        if !self.contains(id) {
            return;
        }
        if let Some(surface) = self.widgets.get(id).and_then(|w| w.surface) {
            self.surfaces.set_shape_mask(surface, mask);
        } else if let Some(widget) = self.widgets.get_mut(id) {
            widget.pending_shape_mask = mask;
        }
    }

    pub fn input_shape_combine_mask(&mut self, id: WidgetId, mask: Option<Arc<Bitmap>>) {
        if !self.contains(id) {
            return;
        }
        if let Some(surface) = self.widgets.get(id).and_then(|w| w.surface) {
            self.surfaces.set_input_shape_mask(surface, mask);
        } else if let Some(widget) = self.widgets.get_mut(id) {
            widget.pending_input_shape_mask = mask;
        }
    }

    // === Size negotiation ===

    /// Ask the widget (via its hooks) how much space it wants
    pub fn size_request(&mut self, id: WidgetId) -> Size {
        let mut requested = Size::ZERO;
        self.with_hooks(id, |hooks, _| {
            requested = hooks.size_request(id);
        });
        if let Some(widget) = self.widgets.get_mut(id) {
            widget.requisition = requested;
        }
        requested
    }

    /// Assign the widget's allocation. A pure move triggers a shallow
    /// redraw (only surfaces owned by this widget); a size change
    /// invalidates the old and new areas in full.
    pub fn size_allocate(&mut self, id: WidgetId, allocation: Rect) {
        if !self.contains(id) {
            return;
        }
        let old = self.allocation(id);
        if let Some(widget) = self.widgets.get_mut(id) {
            widget.allocation = allocation;
        }

        if self.is_realized(id) {
            if let Some(surface) = self.widgets.get(id).and_then(|w| w.surface) {
                self.surfaces.set_geometry(surface, allocation);
            }
        }

        self.with_hooks(id, |hooks, _| hooks.size_allocate(id, allocation));
        self.emit(id, "size-allocate");

        let moved = old.origin() != allocation.origin();
        let resized = old.size() != allocation.size();
        if self.is_mapped(id) {
            if resized {
                self.invalidate_area_on_owner(id, old);
                self.queue_draw(id);
            } else if moved {
                self.invalidate_area_on_owner(id, old);
                self.queue_shallow_draw(id);
                self.invalidate_area_on_owner(id, allocation);
            }
        }
    }

    /// Mark the widget as needing renegotiation. The queue is drained by
    /// the application's layout pass.
    pub fn queue_resize(&mut self, id: WidgetId) {
        if !self.contains(id) {
            return;
        }
        if !self.resize_queue.contains(&id) {
            self.resize_queue.push(id);
        }
        if self.is_mapped(id) {
            self.queue_draw(id);
        }
    }

    pub fn pending_resizes(&self) -> &[WidgetId] {
        &self.resize_queue
    }

    pub fn clear_pending_resizes(&mut self) {
        self.resize_queue.clear();
    }
}
