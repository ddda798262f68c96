//! Backend realizers
//!
//! A realizer translates the abstract GC value store into native drawing
//! state immediately before each drawing primitive. The portable contract
//! is the *order* of the update and the session discipline; the native
//! ops themselves are backend-specific.

use std::sync::Arc;

use veld_core::{Bitmap, Color, ResourceError};

use crate::canvas::{Canvas, PaintTarget};
use crate::values::{Gc, ResolvedPaint};

/// Per-instance drawing-session state: `Idle` ⇄ `Prepared`.
///
/// At most one canvas is acquired at a time; re-acquiring while prepared
/// is a warned usage error and leaves the session untouched.
#[derive(Debug, Default)]
pub struct Session {
    canvas: Option<Canvas>,
}

impl Session {
    pub fn is_prepared(&self) -> bool {
        self.canvas.is_some()
    }

    pub(crate) fn take_canvas(&mut self) -> Option<Canvas> {
        self.canvas.take()
    }

    pub(crate) fn put_canvas(&mut self, canvas: Canvas) {
        self.canvas = Some(canvas);
    }

    pub(crate) fn canvas_mut(&mut self) -> Option<&mut Canvas> {
        self.canvas.as_mut()
    }
}

/// A backend realizer multiplexing the GC store onto one native API
pub trait Realizer {
    /// Backend name for diagnostics
    fn backend(&self) -> &'static str;

    fn session(&self) -> &Session;
    fn session_mut(&mut self) -> &mut Session;

    /// Program the paint source (solid color or repeating pattern) for
    /// the resolved fill. Pattern coordinate spaces are anchored so the
    /// tile/stipple origin maps to device (0,0) regardless of the
    /// canvas's current transform.
    fn program_paint(
        &mut self,
        canvas: &mut Canvas,
        paint: &ResolvedPaint,
        gc: &Gc,
    ) -> Result<(), ResourceError>;

    /// Program line attributes, dashes, and the remaining mode flags.
    /// Partial application is tolerated: a failing dash pattern must not
    /// block color or clip from applying.
    fn program_attributes(&mut self, canvas: &mut Canvas, gc: &Gc) -> Result<(), ResourceError>;

    /// Reset the canvas clip to the target's intrinsic clip, then
    /// intersect with the GC's user clip.
    fn program_clip(&mut self, canvas: &mut Canvas, gc: &Gc, target: &PaintTarget);

    /// Free per-session caches when the session ends
    fn end_session(&mut self) {}

    // === Session management ===

    /// Acquire the drawing canvas for a session (`Idle → Prepared`).
    /// Returns false (warned) when a canvas is already acquired.
    fn acquire(&mut self) -> bool {
        if self.session().is_prepared() {
            tracing::warn!(
                backend = self.backend(),
                "drawing session already acquired"
            );
            return false;
        }
        self.session_mut().put_canvas(Canvas::new());
        true
    }

    fn canvas_mut(&mut self) -> Option<&mut Canvas> {
        self.session_mut().canvas_mut()
    }

    /// End the session (`Prepared → Idle`), returning the canvas with its
    /// recorded op log. Per-session pattern caches are freed.
    fn release(&mut self) -> Option<Canvas> {
        let canvas = self.session_mut().take_canvas();
        if canvas.is_some() {
            self.end_session();
        }
        canvas
    }

    /// Program the canvas from the GC store. In order: remove any stale
    /// drawable-clip overlay (one whose tag is not the target's current
    /// paint tag), resolve the effective fill (degrading to solid when a
    /// pattern resource is missing), program the paint source and line
    /// attributes, and — only when `gc_changed` — reset and re-intersect
    /// the clip.
    fn update_canvas(
        &mut self,
        gc: &mut Gc,
        override_foreground: Option<Color>,
        override_stipple: Option<&Arc<Bitmap>>,
        gc_changed: bool,
        target: &PaintTarget,
    ) -> Result<(), ResourceError> {
        let Some(mut canvas) = self.session_mut().take_canvas() else {
            tracing::warn!(
                backend = self.backend(),
                "update_canvas called outside a drawing session"
            );
            return Ok(());
        };

        let result: Result<(), ResourceError> = (|| {
            if let Some(tag) = gc.applied_overlay_tag() {
                if target.paint_tag != Some(tag) {
                    gc.remove_drawable_clip();
                }
            }

            let paint = gc.resolve_fill(override_stipple, override_foreground);
            self.program_paint(&mut canvas, &paint, gc)?;
            self.program_attributes(&mut canvas, gc)?;

            if gc_changed {
                self.program_clip(&mut canvas, gc, target);
            }
            Ok(())
        })();

        self.session_mut().put_canvas(canvas);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::XlibRealizer;

    #[test]
    fn test_session_double_acquire_is_noop() {
        let mut realizer = XlibRealizer::new();
        assert!(realizer.acquire());
        assert!(realizer.session().is_prepared());

        // Second acquire warns and changes nothing
        assert!(!realizer.acquire());
        assert!(realizer.session().is_prepared());

        assert!(realizer.release().is_some());
        assert!(!realizer.session().is_prepared());

        // A new session can be acquired after release
        assert!(realizer.acquire());
    }

    #[test]
    fn test_update_without_session_is_noop() {
        let mut realizer = XlibRealizer::new();
        let mut gc = Gc::new();
        let target = PaintTarget::new(veld_core::Rect::new(0, 0, 10, 10));
        assert!(realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .is_ok());
    }
}
