//! Xlib-style realizer
//!
//! Models an X11 server-side graphics context: attributes are programmed
//! as GC field updates, patterns anchor at a server-maintained
//! tile/stipple origin, and the clip is a server-side rectangle list or
//! bitmap mask.

use std::sync::Arc;

use veld_core::{Bitmap, Color, Point, Rect, ResourceError};

use crate::canvas::{Canvas, NativeOp, PaintTarget};
use crate::realizer::{Realizer, Session};
use crate::values::{CapStyle, Fill, Gc, JoinStyle, LineStyle, ResolvedPaint, SubwindowMode};

/// A server GC field update
#[derive(Clone, Debug, PartialEq)]
pub enum XlibOp {
    SetForeground(Color),
    SetBackground(Color),
    SetFillStyle(Fill),
    SetTile(Arc<Bitmap>),
    SetStipple(Arc<Bitmap>),
    SetTsOrigin(Point),
    SetLineAttributes {
        width: i32,
        style: LineStyle,
        cap: CapStyle,
        join: JoinStyle,
    },
    SetDashes {
        offset: i32,
        dashes: Vec<i32>,
    },
    SetSubwindowMode(SubwindowMode),
    SetExposures(bool),
    SetClipRectangles {
        rects: Vec<Rect>,
    },
    SetClipMask {
        origin: Point,
        mask: Arc<Bitmap>,
    },
}

/// Realizer for the Xlib-style backend
#[derive(Debug, Default)]
pub struct XlibRealizer {
    session: Session,
}

impl XlibRealizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(canvas: &mut Canvas, op: XlibOp) {
        canvas.push_native(NativeOp::Xlib(op));
    }
}

impl Realizer for XlibRealizer {
    fn backend(&self) -> &'static str {
        "xlib"
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn program_paint(
        &mut self,
        canvas: &mut Canvas,
        paint: &ResolvedPaint,
        _gc: &Gc,
    ) -> Result<(), ResourceError> {
        match paint {
            ResolvedPaint::Solid { color } => {
                Self::push(canvas, XlibOp::SetFillStyle(Fill::Solid));
                Self::push(canvas, XlibOp::SetForeground(*color));
            }
            ResolvedPaint::Tiled { tile, origin } => {
                Self::push(canvas, XlibOp::SetFillStyle(Fill::Tiled));
                Self::push(canvas, XlibOp::SetTile(tile.clone()));
                Self::push(canvas, XlibOp::SetTsOrigin(*origin));
            }
            ResolvedPaint::Stippled {
                stipple,
                color,
                origin,
            } => {
                Self::push(canvas, XlibOp::SetFillStyle(Fill::Stippled));
                Self::push(canvas, XlibOp::SetStipple(stipple.clone()));
                Self::push(canvas, XlibOp::SetForeground(*color));
                Self::push(canvas, XlibOp::SetTsOrigin(*origin));
            }
            ResolvedPaint::OpaqueStippled {
                stipple,
                foreground,
                background,
                origin,
            } => {
                Self::push(canvas, XlibOp::SetFillStyle(Fill::OpaqueStippled));
                Self::push(canvas, XlibOp::SetStipple(stipple.clone()));
                Self::push(canvas, XlibOp::SetForeground(*foreground));
                Self::push(canvas, XlibOp::SetBackground(*background));
                Self::push(canvas, XlibOp::SetTsOrigin(*origin));
            }
        }
        Ok(())
    }

    fn program_attributes(&mut self, canvas: &mut Canvas, gc: &Gc) -> Result<(), ResourceError> {
        Self::push(
            canvas,
            XlibOp::SetLineAttributes {
                width: gc.line_width(),
                style: gc.line_style(),
                cap: gc.cap_style(),
                join: gc.join_style(),
            },
        );
        let (dashes, offset) = gc.dashes();
        if gc.line_style() != LineStyle::Solid && !dashes.is_empty() {
            Self::push(
                canvas,
                XlibOp::SetDashes {
                    offset,
                    dashes: dashes.to_vec(),
                },
            );
        }
        Self::push(canvas, XlibOp::SetSubwindowMode(gc.subwindow_mode()));
        Self::push(canvas, XlibOp::SetExposures(gc.graphics_exposures()));
        Ok(())
    }

    fn program_clip(&mut self, canvas: &mut Canvas, gc: &Gc, target: &PaintTarget) {
        match gc.clip() {
            crate::values::Clip::Mask(mask) => {
                // The server takes the mask directly; its origin places it
                // within the target.
                Self::push(
                    canvas,
                    XlibOp::SetClipMask {
                        origin: gc.clip_origin(),
                        mask: mask.clone(),
                    },
                );
            }
            crate::values::Clip::Region(region) => {
                // A GC holds a single rectangle list, so the intrinsic
                // clip is intersected client-side.
                let mut effective = region.clone();
                effective.offset(gc.clip_origin().x, gc.clip_origin().y);
                effective.intersect(&target.intrinsic_clip);
                Self::push(
                    canvas,
                    XlibOp::SetClipRectangles {
                        rects: effective.rects().to_vec(),
                    },
                );
            }
            crate::values::Clip::None => {
                Self::push(
                    canvas,
                    XlibOp::SetClipRectangles {
                        rects: target.intrinsic_clip.rects().to_vec(),
                    },
                );
            }
        }
    }
}
