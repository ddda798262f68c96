//! The widget arena
//!
//! Widgets live in a slotmap and are addressed by stable id: "parent" is
//! a non-owning id lookup, "children" an owned list in the parent, so the
//! tree carries back-references without cyclic ownership.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, Key, SlotMap};
use smallvec::SmallVec;
use veld_core::{Bitmap, Rect, SignalHub, Size};

use crate::flags::{StateType, WidgetFlags};
use crate::redraw::RedrawQueue;
use crate::surface::{SurfaceId, SurfaceStore};

new_key_type! {
    /// Unique identifier for a widget
    pub struct WidgetId;
}

/// Subclass hooks invoked during lifecycle transitions.
///
/// Hooks observe the surface store read-only; structural mutation happens
/// in the tree itself.
pub trait WidgetHooks: Send {
    fn realize(&mut self, _widget: WidgetId, _surfaces: &SurfaceStore) {}
    fn unrealize(&mut self, _widget: WidgetId, _surfaces: &SurfaceStore) {}
    fn map(&mut self, _widget: WidgetId, _surfaces: &SurfaceStore) {}
    fn unmap(&mut self, _widget: WidgetId, _surfaces: &SurfaceStore) {}
    fn size_request(&mut self, _widget: WidgetId) -> Size {
        Size::ZERO
    }
    fn size_allocate(&mut self, _widget: WidgetId, _allocation: Rect) {}
}

/// The default, do-nothing hooks
pub struct DefaultHooks;

impl WidgetHooks for DefaultHooks {}

/// One widget's record in the arena
pub struct Widget {
    pub(crate) flags: WidgetFlags,
    pub(crate) state: StateType,
    pub(crate) saved_state: StateType,
    pub(crate) parent: Option<WidgetId>,
    pub(crate) children: SmallVec<[WidgetId; 4]>,
    /// Owned surface; always `None` for NO_WINDOW widgets
    pub(crate) surface: Option<SurfaceId>,
    pub(crate) requisition: Size,
    pub(crate) allocation: Rect,
    /// Focus and default widgets, meaningful on toplevels
    pub(crate) focus_child: Option<WidgetId>,
    pub(crate) default_child: Option<WidgetId>,
    /// Shape masks queued before realization, re-applied by `realize`
    pub(crate) pending_shape_mask: Option<Arc<Bitmap>>,
    pub(crate) pending_input_shape_mask: Option<Arc<Bitmap>>,
    pub(crate) hooks: Option<Box<dyn WidgetHooks>>,
}

impl Widget {
    pub fn flags(&self) -> WidgetFlags {
        self.flags
    }

    pub fn state(&self) -> StateType {
        self.state
    }

    pub fn parent(&self) -> Option<WidgetId> {
        self.parent
    }

    pub fn children(&self) -> &[WidgetId] {
        &self.children
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    pub fn allocation(&self) -> Rect {
        self.allocation
    }

    pub fn requisition(&self) -> Size {
        self.requisition
    }
}

/// Configuration for a new widget
pub struct WidgetBuilder {
    flags: WidgetFlags,
    hooks: Box<dyn WidgetHooks>,
}

impl Default for WidgetBuilder {
    fn default() -> Self {
        Self {
            flags: WidgetFlags::initial() | WidgetFlags::NO_WINDOW,
            hooks: Box::new(DefaultHooks),
        }
    }
}

impl WidgetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make this widget a hierarchy root
    pub fn toplevel(mut self) -> Self {
        self.flags |= WidgetFlags::TOPLEVEL | WidgetFlags::ANCHORED;
        self
    }

    /// Give the widget its own native surface
    pub fn with_window(mut self) -> Self {
        self.flags.remove(WidgetFlags::NO_WINDOW);
        self
    }

    pub fn can_focus(mut self) -> Self {
        self.flags |= WidgetFlags::CAN_FOCUS;
        self
    }

    pub fn can_default(mut self) -> Self {
        self.flags |= WidgetFlags::CAN_DEFAULT;
        self
    }

    pub fn no_show_all(mut self) -> Self {
        self.flags |= WidgetFlags::NO_SHOW_ALL;
        self
    }

    pub fn app_paintable(mut self) -> Self {
        self.flags |= WidgetFlags::APP_PAINTABLE;
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn WidgetHooks>) -> Self {
        self.hooks = hooks;
        self
    }
}

/// The widget arena plus the stores lifecycle transitions drive
pub struct WidgetTree {
    pub(crate) widgets: SlotMap<WidgetId, Widget>,
    pub surfaces: SurfaceStore,
    pub signals: SignalHub,
    pub(crate) redraw: RedrawQueue,
    pub(crate) surface_owner: FxHashMap<SurfaceId, WidgetId>,
    pub(crate) grab_stack: Vec<WidgetId>,
    pub(crate) resize_queue: Vec<WidgetId>,
    pub(crate) next_paint_tag: u64,
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetTree {
    pub fn new() -> Self {
        Self {
            widgets: SlotMap::with_key(),
            surfaces: SurfaceStore::new(),
            signals: SignalHub::new(),
            redraw: RedrawQueue::new(),
            surface_owner: FxHashMap::default(),
            grab_stack: Vec::new(),
            resize_queue: Vec::new(),
            next_paint_tag: 1,
        }
    }

    /// Add a widget to the arena. Toplevels start anchored; everything
    /// else anchors when parented into a rooted hierarchy.
    pub fn create(&mut self, builder: WidgetBuilder) -> WidgetId {
        self.widgets.insert(Widget {
            flags: builder.flags,
            state: StateType::Normal,
            saved_state: StateType::Normal,
            parent: None,
            children: SmallVec::new(),
            surface: None,
            requisition: Size::ZERO,
            allocation: Rect::new(0, 0, 1, 1),
            focus_child: None,
            default_child: None,
            pending_shape_mask: None,
            pending_input_shape_mask: None,
            hooks: Some(builder.hooks),
        })
    }

    pub fn contains(&self, id: WidgetId) -> bool {
        self.widgets.contains_key(id)
    }

    pub fn get(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.get(id)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Numeric id used as the signal-hub target
    pub fn signal_target(id: WidgetId) -> u64 {
        id.data().as_ffi()
    }

    // === Flag helpers ===

    pub fn has_flag(&self, id: WidgetId, flag: WidgetFlags) -> bool {
        self.widgets
            .get(id)
            .map(|w| w.flags.contains(flag))
            .unwrap_or(false)
    }

    pub(crate) fn set_flag(&mut self, id: WidgetId, flag: WidgetFlags, on: bool) {
        if let Some(widget) = self.widgets.get_mut(id) {
            widget.flags.set(flag, on);
        }
    }

    pub fn is_toplevel(&self, id: WidgetId) -> bool {
        self.has_flag(id, WidgetFlags::TOPLEVEL)
    }

    pub fn is_realized(&self, id: WidgetId) -> bool {
        self.has_flag(id, WidgetFlags::REALIZED)
    }

    pub fn is_mapped(&self, id: WidgetId) -> bool {
        self.has_flag(id, WidgetFlags::MAPPED)
    }

    pub fn is_visible(&self, id: WidgetId) -> bool {
        self.has_flag(id, WidgetFlags::VISIBLE)
    }

    pub fn has_own_window(&self, id: WidgetId) -> bool {
        self.contains(id) && !self.has_flag(id, WidgetFlags::NO_WINDOW)
    }

    /// Both the widget and all its ancestors are sensitive
    pub fn is_effectively_sensitive(&self, id: WidgetId) -> bool {
        self.has_flag(id, WidgetFlags::SENSITIVE)
            && self.has_flag(id, WidgetFlags::PARENT_SENSITIVE)
    }

    // === Tree walking ===

    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.widgets.get(id).and_then(|w| w.parent)
    }

    pub fn children(&self, id: WidgetId) -> &[WidgetId] {
        self.widgets.get(id).map(|w| w.children()).unwrap_or(&[])
    }

    /// The root of the hierarchy this widget hangs off
    pub fn toplevel_of(&self, id: WidgetId) -> WidgetId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Whether `ancestor` is on `id`'s parent chain (or is `id` itself)
    pub fn is_ancestor_or_self(&self, ancestor: WidgetId, id: WidgetId) -> bool {
        let mut current = Some(id);
        while let Some(widget) = current {
            if widget == ancestor {
                return true;
            }
            current = self.parent(widget);
        }
        false
    }

    /// The surface this widget draws into: its own, or the nearest
    /// windowed ancestor's
    pub fn effective_surface(&self, id: WidgetId) -> Option<SurfaceId> {
        let mut current = Some(id);
        while let Some(widget) = current {
            if let Some(surface) = self.widgets.get(widget).and_then(|w| w.surface) {
                return Some(surface);
            }
            current = self.parent(widget);
        }
        None
    }

    pub fn allocation(&self, id: WidgetId) -> Rect {
        self.widgets
            .get(id)
            .map(|w| w.allocation)
            .unwrap_or(Rect::ZERO)
    }

    // === Hook plumbing ===

    /// Run a hook with the widget's hooks temporarily taken out of the
    /// arena, so the hook can observe the tree without aliasing it.
    pub(crate) fn with_hooks(&mut self, id: WidgetId, f: impl FnOnce(&mut dyn WidgetHooks, &Self)) {
        let Some(mut hooks) = self.widgets.get_mut(id).and_then(|w| w.hooks.take()) else {
            return;
        };
        f(hooks.as_mut(), self);
        if let Some(widget) = self.widgets.get_mut(id) {
            widget.hooks = Some(hooks);
        }
    }

    pub(crate) fn emit(&mut self, id: WidgetId, signal: &str) {
        self.signals.emit(Self::signal_target(id), signal);
    }

    pub(crate) fn notify(&mut self, id: WidgetId, property: &str) {
        self.signals.notify(Self::signal_target(id), property);
    }

    // === Invariant checking ===

    /// Verify the lifecycle invariants over the whole arena. Used by
    /// tests after every public transition; cheap enough to sprinkle.
    pub fn check_invariants(&self) {
        for (id, widget) in &self.widgets {
            let flags = widget.flags;
            if flags.contains(WidgetFlags::MAPPED) {
                assert!(
                    flags.contains(WidgetFlags::REALIZED),
                    "mapped widget must be realized"
                );
                assert!(
                    flags.contains(WidgetFlags::VISIBLE),
                    "mapped widget must be visible"
                );
                assert!(
                    flags.contains(WidgetFlags::CHILD_VISIBLE),
                    "mapped widget must be child-visible"
                );
                if let Some(parent) = widget.parent {
                    assert!(
                        self.is_mapped(parent),
                        "mapped widget must have a mapped parent"
                    );
                } else {
                    assert!(
                        flags.contains(WidgetFlags::TOPLEVEL),
                        "mapped orphan must be toplevel"
                    );
                }
            }
            if flags.contains(WidgetFlags::REALIZED) {
                if let Some(parent) = widget.parent {
                    assert!(
                        self.is_realized(parent),
                        "realized widget must have a realized parent"
                    );
                } else {
                    assert!(
                        flags.contains(WidgetFlags::TOPLEVEL),
                        "realized orphan must be toplevel"
                    );
                }
            }
            if flags.contains(WidgetFlags::HAS_FOCUS) {
                assert!(
                    flags.contains(WidgetFlags::CAN_FOCUS),
                    "focused widget must accept focus"
                );
            }
            // Surface ownership is single-owner and matches NO_WINDOW
            if let Some(surface) = widget.surface {
                assert!(
                    !flags.contains(WidgetFlags::NO_WINDOW),
                    "windowless widget must not own a surface"
                );
                assert_eq!(self.surface_owner.get(&surface), Some(&id));
            }
        }
    }
}
