//! Widget flags and states

use bitflags::bitflags;

bitflags! {
    /// Per-widget boolean state
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WidgetFlags: u32 {
        /// The widget is a root of a hierarchy and has no parent
        const TOPLEVEL         = 1 << 0;
        /// The widget draws into an ancestor's surface instead of
        /// owning one
        const NO_WINDOW        = 1 << 1;
        /// Native resources are allocated
        const REALIZED         = 1 << 2;
        /// The widget's surface is (requested to be) shown on screen
        const MAPPED           = 1 << 3;
        /// The widget is meant to be shown
        const VISIBLE          = 1 << 4;
        const SENSITIVE        = 1 << 5;
        /// All ancestors are sensitive
        const PARENT_SENSITIVE = 1 << 6;
        const CAN_FOCUS        = 1 << 7;
        const HAS_FOCUS        = 1 << 8;
        const CAN_DEFAULT      = 1 << 9;
        const HAS_DEFAULT      = 1 << 10;
        /// The widget is in the grab stack
        const HAS_GRAB         = 1 << 11;
        /// The widget hangs (possibly indirectly) off a toplevel
        const ANCHORED         = 1 << 12;
        /// The application paints the widget's background itself
        const APP_PAINTABLE    = 1 << 13;
        const DOUBLE_BUFFERED  = 1 << 14;
        /// `show_all` does not descend into this widget
        const NO_SHOW_ALL      = 1 << 15;
        /// The parent shows this child when it shows itself
        const CHILD_VISIBLE    = 1 << 16;
    }
}

impl WidgetFlags {
    /// Flags a freshly constructed widget carries
    pub fn initial() -> Self {
        WidgetFlags::SENSITIVE
            | WidgetFlags::PARENT_SENSITIVE
            | WidgetFlags::CHILD_VISIBLE
            | WidgetFlags::DOUBLE_BUFFERED
    }
}

/// Visual widget state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateType {
    #[default]
    Normal,
    Active,
    Prelight,
    Selected,
    Insensitive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_flags() {
        let flags = WidgetFlags::initial();
        assert!(flags.contains(WidgetFlags::SENSITIVE | WidgetFlags::PARENT_SENSITIVE));
        assert!(flags.contains(WidgetFlags::CHILD_VISIBLE));
        assert!(!flags.contains(WidgetFlags::REALIZED));
        assert!(!flags.contains(WidgetFlags::VISIBLE));
    }
}
