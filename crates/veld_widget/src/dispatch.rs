//! Input dispatch and the grab stack
//!
//! Input events route to their target unless a grab is active: a grab
//! redirects events outside the grab widget's subtree to the grab holder.
//! Insensitive widgets drop input. Expose delivery lives with the redraw
//! queue; only pointer and key events are routed here.

use veld_core::Point;

use crate::flags::WidgetFlags;
use crate::tree::{WidgetId, WidgetTree};

/// Kinds of routable input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEventKind {
    ButtonPress { button: u8 },
    ButtonRelease { button: u8 },
    Motion,
    KeyPress { key: u32 },
    KeyRelease { key: u32 },
}

impl InputEventKind {
    fn signal(&self) -> &'static str {
        match self {
            InputEventKind::ButtonPress { .. } => "button-press-event",
            InputEventKind::ButtonRelease { .. } => "button-release-event",
            InputEventKind::Motion => "motion-notify-event",
            InputEventKind::KeyPress { .. } => "key-press-event",
            InputEventKind::KeyRelease { .. } => "key-release-event",
        }
    }
}

/// One input event in surface coordinates
#[derive(Clone, Copy, Debug)]
pub struct InputEvent {
    pub kind: InputEventKind,
    pub position: Point,
}

impl WidgetTree {
    /// Push a widget onto the grab stack. The newest grab wins; grabbing
    /// again moves the widget to the top.
    pub fn grab_add(&mut self, id: WidgetId) {
        if !self.contains(id) {
            return;
        }
        self.grab_stack.retain(|&w| w != id);
        self.grab_stack.push(id);
        self.set_flag(id, WidgetFlags::HAS_GRAB, true);
    }

    /// Remove a widget from the grab stack wherever it sits
    pub fn grab_remove(&mut self, id: WidgetId) {
        self.grab_stack.retain(|&w| w != id);
        self.set_flag(id, WidgetFlags::HAS_GRAB, false);
    }

    /// The widget currently holding the grab, if any
    pub fn grab_current(&self) -> Option<WidgetId> {
        self.grab_stack.last().copied()
    }

    /// Route an input event aimed at `target`. Returns the widget that
    /// received it, or `None` when the event was dropped (insensitive
    /// receiver or dead target).
    pub fn dispatch_input(&mut self, target: WidgetId, event: &InputEvent) -> Option<WidgetId> {
        if !self.contains(target) {
            return None;
        }
        let receiver = match self.grab_current() {
            Some(grab) if !self.is_ancestor_or_self(grab, target) => grab,
            _ => target,
        };
        if !self.is_effectively_sensitive(receiver) {
            tracing::trace!(?receiver, "input dropped by insensitive widget");
            return None;
        }
        self.emit(receiver, event.kind.signal());
        Some(receiver)
    }
}
