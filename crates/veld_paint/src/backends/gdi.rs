//! GDI-style realizer
//!
//! Models a Win32 device context: paint is carried by pen and brush
//! objects selected into the DC, the brush origin anchors patterns, and
//! the clip is a device-space region. Legacy DCs cannot create custom
//! dash pens; that failure is reported per-op and degrades the line
//! style without blocking color or clip.

use veld_core::{Bitmap, Color, Point, Rect, ResourceError};

use std::sync::Arc;

use crate::canvas::{Canvas, NativeOp, PaintTarget};
use crate::realizer::{Realizer, Session};
use crate::values::{CapStyle, Clip, Gc, JoinStyle, LineStyle, ResolvedPaint};

/// A brush selected into the device context
#[derive(Clone, Debug, PartialEq)]
pub enum GdiBrush {
    Solid(Color),
    /// Full-color repeating pattern brush
    Tile(Arc<Bitmap>),
    /// Monochrome pattern brush; unset bits paint the background when one
    /// is given, and are transparent otherwise
    Stipple {
        bitmap: Arc<Bitmap>,
        foreground: Color,
        background: Option<Color>,
    },
}

/// A device-context programming op
#[derive(Clone, Debug, PartialEq)]
pub enum GdiOp {
    SelectBrush(GdiBrush),
    /// Pattern anchor in device space
    SetBrushOrigin(Point),
    SelectPen {
        width: i32,
        color: Color,
        dashes: Vec<i32>,
        cap: CapStyle,
        join: JoinStyle,
    },
    /// Pen creation failed for the requested line style; a solid pen is
    /// selected instead
    PenCreationFailed,
    SelectClipRegion(Vec<Rect>),
    IntersectClipRegion(Vec<Rect>),
}

/// Realizer for the GDI-style backend
#[derive(Debug)]
pub struct GdiRealizer {
    session: Session,
    dash_pens_supported: bool,
}

impl Default for GdiRealizer {
    fn default() -> Self {
        Self {
            session: Session::default(),
            dash_pens_supported: true,
        }
    }
}

impl GdiRealizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device context without custom dash pen support (legacy display
    /// drivers); dash pens degrade to solid pens there.
    pub fn without_dash_pens() -> Self {
        Self {
            session: Session::default(),
            dash_pens_supported: false,
        }
    }

    fn push(canvas: &mut Canvas, op: GdiOp) {
        canvas.push_native(NativeOp::Gdi(op));
    }
}

impl Realizer for GdiRealizer {
    fn backend(&self) -> &'static str {
        "gdi"
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
        let (brush, origin) = match paint {
            ResolvedPaint::Solid { color } => (GdiBrush::Solid(*color), None),
            ResolvedPaint::Tiled { tile, origin } => (GdiBrush::Tile(tile.clone()), Some(*origin)),
            ResolvedPaint::Stippled {
                stipple,
                color,
                origin,
            } => (
                GdiBrush::Stipple {
                    bitmap: stipple.clone(),
                    foreground: *color,
                    background: None,
                },
                Some(*origin),
            ),
            ResolvedPaint::OpaqueStippled {
                stipple,
                foreground,
                background,
                origin,
            } => (
                GdiBrush::Stipple {
                    bitmap: stipple.clone(),
                    foreground: *foreground,
                    background: Some(*background),
                },
                Some(*origin),
            ),
        };

        if let Some(origin) = origin {
            // Anchor the pattern at device (0,0) relative to the
            // tile/stipple origin, independent of the canvas transform.
            let (dx, dy) = canvas
                .transform()
                .apply(origin.x as f32, origin.y as f32);
            Self::push(
                canvas,
                GdiOp::SetBrushOrigin(Point::new(dx.round() as i32, dy.round() as i32)),
            );
        }
        Self::push(canvas, GdiOp::SelectBrush(brush));
        Ok(())
    }

    fn program_attributes(&mut self, canvas: &mut Canvas, gc: &Gc) -> Result<(), ResourceError> {
        let (dashes, _offset) = gc.dashes();
        let wants_dashes = gc.line_style() != LineStyle::Solid && !dashes.is_empty();

        if wants_dashes && !self.dash_pens_supported {
            // Reported per attempted op; the session continues with a
            // degraded solid pen.
            tracing::warn!(backend = self.backend(), "dash pen creation failed");
            Self::push(canvas, GdiOp::PenCreationFailed);
            Self::push(
                canvas,
                GdiOp::SelectPen {
                    width: gc.line_width(),
                    color: gc.foreground(),
                    dashes: Vec::new(),
                    cap: gc.cap_style(),
                    join: gc.join_style(),
                },
            );
            return Ok(());
        }

        Self::push(
            canvas,
            GdiOp::SelectPen {
                width: gc.line_width(),
                color: gc.foreground(),
                dashes: if wants_dashes { dashes.to_vec() } else { Vec::new() },
                cap: gc.cap_style(),
                join: gc.join_style(),
            },
        );
        Ok(())
    }

    fn program_clip(&mut self, canvas: &mut Canvas, gc: &Gc, target: &PaintTarget) {
        Self::push(
            canvas,
            GdiOp::SelectClipRegion(target.intrinsic_clip.rects().to_vec()),
        );
        match gc.clip() {
            Clip::Region(region) => {
                let mut translated = region.clone();
                translated.offset(gc.clip_origin().x, gc.clip_origin().y);
                Self::push(
                    canvas,
                    GdiOp::IntersectClipRegion(translated.rects().to_vec()),
                );
            }
            Clip::Mask(_) => {
                // No mask clip support in this backend; degrade to no
                // user clip rather than erroring.
                tracing::debug!(
                    backend = self.backend(),
                    "clip mask unsupported, drawing with intrinsic clip only"
                );
            }
            Clip::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasOp;
    use crate::values::Fill;
    use veld_core::Region;

    fn native_ops(canvas: &Canvas) -> Vec<GdiOp> {
        canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                CanvasOp::Native(NativeOp::Gdi(op)) => Some(op.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_dash_pen_failure_does_not_block_color_or_clip() {
        let mut realizer = GdiRealizer::without_dash_pens();
        let mut gc = Gc::new();
        gc.set_foreground(Color::WHITE);
        gc.set_line_attributes(2, LineStyle::OnOffDash, CapStyle::Butt, JoinStyle::Miter);
        gc.set_dashes(0, &[4, 2]);
        gc.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 10, 10))));

        realizer.acquire();
        let target = PaintTarget::new(Rect::new(0, 0, 100, 100));
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        let canvas = realizer.release().unwrap();

        let ops = native_ops(&canvas);
        assert!(ops.contains(&GdiOp::PenCreationFailed));
        // The degraded solid pen still carries the color
        assert!(ops.iter().any(|op| matches!(
            op,
            GdiOp::SelectPen { color, dashes, .. } if *color == Color::WHITE && dashes.is_empty()
        )));
        // And the clip still applies
        assert!(ops
            .iter()
            .any(|op| matches!(op, GdiOp::IntersectClipRegion(_))));
    }

    #[test]
    fn test_mask_clip_degrades_to_intrinsic_only() {
        let mut realizer = GdiRealizer::new();
        let mut gc = Gc::new();
        gc.set_clip_mask(Some(Arc::new(Bitmap::solid(4, 4))));

        realizer.acquire();
        let target = PaintTarget::new(Rect::new(0, 0, 100, 100));
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        let canvas = realizer.release().unwrap();

        let ops = native_ops(&canvas);
        assert!(ops
            .iter()
            .any(|op| matches!(op, GdiOp::SelectClipRegion(_))));
        assert!(!ops
            .iter()
            .any(|op| matches!(op, GdiOp::IntersectClipRegion(_))));
    }

    #[test]
    fn test_brush_origin_follows_canvas_transform() {
        let mut realizer = GdiRealizer::new();
        let mut gc = Gc::new();
        gc.set_fill(Fill::Tiled);
        gc.set_tile(Some(Arc::new(Bitmap::solid(8, 8))));
        gc.set_ts_origin(Point::new(3, 4));

        realizer.acquire();
        realizer
            .canvas_mut()
            .unwrap()
            .set_transform(crate::Transform2D::translate(10.0, 20.0));
        let target = PaintTarget::new(Rect::new(0, 0, 100, 100));
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        let canvas = realizer.release().unwrap();

        assert!(native_ops(&canvas)
            .contains(&GdiOp::SetBrushOrigin(Point::new(13, 24))));
    }
}
