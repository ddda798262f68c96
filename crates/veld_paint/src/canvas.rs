//! Recording canvases and paint targets
//!
//! A `Canvas` stands in for a native drawing context during one drawing
//! session. Realizers push backend-specific native ops into it; drawing
//! code pushes backend-independent primitives. The op log, with each
//! draw op snapshotting the transform in effect, is what tests observe.

use veld_core::{Rect, Region};

use crate::backends::{GdiOp, QuartzOp, XlibOp};
use crate::transform::Transform2D;

/// The surface a drawing session targets
#[derive(Clone, Debug, Default)]
pub struct PaintTarget {
    /// Surface bounds in its own coordinate space
    pub bounds: Rect,
    /// The surface's intrinsic clip (visible area minus child windows,
    /// in subwindow-clipping mode)
    pub intrinsic_clip: Region,
    /// Tag of the paint/expose pass currently in progress on this
    /// surface. A drawable-clip overlay with a different tag is stale.
    pub paint_tag: Option<u64>,
}

impl PaintTarget {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            intrinsic_clip: Region::from_rect(bounds),
            paint_tag: None,
        }
    }

    pub fn with_paint_tag(mut self, tag: u64) -> Self {
        self.paint_tag = Some(tag);
        self
    }
}

/// A backend-specific native state-programming op
#[derive(Clone, Debug, PartialEq)]
pub enum NativeOp {
    Xlib(XlibOp),
    Gdi(GdiOp),
    Quartz(QuartzOp),
}

/// One entry in a canvas's op log
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasOp {
    /// Native state programmed by a realizer
    Native(NativeOp),
    /// A glyph run drawn at a logical position
    DrawGlyphs {
        glyph_ids: Vec<u32>,
        x: f32,
        y: f32,
        transform: Transform2D,
    },
    /// An axis-aligned filled rectangle
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        transform: Transform2D,
    },
    /// A squiggly error underline under the given extent
    DrawErrorUnderline {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        transform: Transform2D,
    },
    /// An embedded shape placeholder drawn at a logical position
    DrawShape {
        shape_id: u32,
        x: f32,
        y: f32,
        transform: Transform2D,
    },
}

/// A recording drawing context for one session
#[derive(Debug, Default)]
pub struct Canvas {
    transform: Transform2D,
    ops: Vec<CanvasOp>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> Transform2D {
        self.transform
    }

    /// Replace the current transform
    pub fn set_transform(&mut self, transform: Transform2D) {
        self.transform = transform;
    }

    /// Compose a transform onto the current one
    pub fn concat(&mut self, transform: &Transform2D) {
        self.transform = self.transform.then(transform);
    }

    /// Shift the transform by an exact device-space delta, regardless of
    /// any scaling in effect
    pub fn device_offset(&mut self, dx: f32, dy: f32) {
        self.transform = self.transform.with_device_offset(dx, dy);
    }

    /// The recorded op log, oldest first
    pub fn ops(&self) -> &[CanvasOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<CanvasOp> {
        std::mem::take(&mut self.ops)
    }

    pub(crate) fn push_native(&mut self, op: NativeOp) {
        self.ops.push(CanvasOp::Native(op));
    }

    // === Drawing primitives ===

    pub fn draw_glyphs(&mut self, glyph_ids: Vec<u32>, x: f32, y: f32) {
        self.ops.push(CanvasOp::DrawGlyphs {
            glyph_ids,
            x,
            y,
            transform: self.transform,
        });
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(CanvasOp::FillRect {
            x,
            y,
            width,
            height,
            transform: self.transform,
        });
    }

    pub fn draw_error_underline(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(CanvasOp::DrawErrorUnderline {
            x,
            y,
            width,
            height,
            transform: self.transform,
        });
    }

    pub fn draw_shape(&mut self, shape_id: u32, x: f32, y: f32) {
        self.ops.push(CanvasOp::DrawShape {
            shape_id,
            x,
            y,
            transform: self.transform,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_ops_snapshot_transform() {
        let mut canvas = Canvas::new();
        canvas.set_transform(Transform2D::translate(10.0, 0.0));
        canvas.fill_rect(0.0, 0.0, 5.0, 5.0);
        canvas.set_transform(Transform2D::identity());
        canvas.fill_rect(0.0, 0.0, 5.0, 5.0);

        match (&canvas.ops()[0], &canvas.ops()[1]) {
            (
                CanvasOp::FillRect { transform: t0, .. },
                CanvasOp::FillRect { transform: t1, .. },
            ) => {
                assert_eq!(*t0, Transform2D::translate(10.0, 0.0));
                assert_eq!(*t1, Transform2D::identity());
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }
}
