//! Quartz-style realizer
//!
//! Models an immediate-mode context: fill/stroke colors and line state
//! are set directly on the context, patterns carry an explicit matrix,
//! and clipping composes by intersection. Patterns created during a
//! session are cached by bitmap identity and freed when the session ends.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use veld_core::{Bitmap, Color, Point, Rect, ResourceError};

use crate::canvas::{Canvas, NativeOp, PaintTarget};
use crate::realizer::{Realizer, Session};
use crate::transform::Transform2D;
use crate::values::{CapStyle, Clip, Gc, JoinStyle, LineStyle, ResolvedPaint};

/// A context-configuration op
#[derive(Clone, Debug, PartialEq)]
pub enum QuartzOp {
    SetFillColor(Color),
    SetStrokeColor(Color),
    /// A freshly built pattern, anchored by `matrix` so the pattern
    /// origin maps to device (0,0)
    SetFillPattern {
        id: u32,
        bitmap: Arc<Bitmap>,
        matrix: Transform2D,
        foreground: Option<Color>,
        background: Option<Color>,
    },
    /// A pattern reused from the per-session cache
    ReuseFillPattern {
        id: u32,
        matrix: Transform2D,
    },
    SetLineWidth(f32),
    SetLineCap(CapStyle),
    SetLineJoin(JoinStyle),
    SetLineDash {
        offset: f32,
        lengths: Vec<f32>,
    },
    ResetClip(Vec<Rect>),
    ClipToRects(Vec<Rect>),
    ClipToMask {
        origin: Point,
        mask: Arc<Bitmap>,
    },
}

/// Realizer for the Quartz-style backend
#[derive(Debug, Default)]
pub struct QuartzRealizer {
    session: Session,
    pattern_cache: FxHashMap<usize, u32>,
    next_pattern_id: u32,
}

impl QuartzRealizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(canvas: &mut Canvas, op: QuartzOp) {
        canvas.push_native(NativeOp::Quartz(op));
    }

    /// The pattern coordinate space is anchored so the tile/stipple
    /// origin lands at device (0,0) independent of the canvas transform.
    fn pattern_matrix(canvas: &Canvas, origin: Point) -> Transform2D {
        canvas
            .transform()
            .pre_translate(-(origin.x as f32), -(origin.y as f32))
    }

    fn program_pattern(
        &mut self,
        canvas: &mut Canvas,
        bitmap: &Arc<Bitmap>,
        origin: Point,
        foreground: Option<Color>,
        background: Option<Color>,
    ) {
        let matrix = Self::pattern_matrix(canvas, origin);
        let key = Arc::as_ptr(bitmap) as usize;
        if let Some(&id) = self.pattern_cache.get(&key) {
            Self::push(canvas, QuartzOp::ReuseFillPattern { id, matrix });
            return;
        }
        let id = self.next_pattern_id;
        self.next_pattern_id += 1;
        self.pattern_cache.insert(key, id);
        Self::push(
            canvas,
            QuartzOp::SetFillPattern {
                id,
                bitmap: bitmap.clone(),
                matrix,
                foreground,
                background,
            },
        );
    }
}

impl Realizer for QuartzRealizer {
    fn backend(&self) -> &'static str {
        "quartz"
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
                Self::push(canvas, QuartzOp::SetFillColor(*color));
                Self::push(canvas, QuartzOp::SetStrokeColor(*color));
            }
            ResolvedPaint::Tiled { tile, origin } => {
                self.program_pattern(canvas, tile, *origin, None, None);
            }
            ResolvedPaint::Stippled {
                stipple,
                color,
                origin,
            } => {
                self.program_pattern(canvas, stipple, *origin, Some(*color), None);
            }
            ResolvedPaint::OpaqueStippled {
                stipple,
                foreground,
                background,
                origin,
            } => {
                self.program_pattern(
                    canvas,
                    stipple,
                    *origin,
                    Some(*foreground),
                    Some(*background),
                );
            }
        }
        Ok(())
    }

    fn program_attributes(&mut self, canvas: &mut Canvas, gc: &Gc) -> Result<(), ResourceError> {
        Self::push(canvas, QuartzOp::SetLineWidth(gc.line_width().max(1) as f32));
        Self::push(canvas, QuartzOp::SetLineCap(gc.cap_style()));
        Self::push(canvas, QuartzOp::SetLineJoin(gc.join_style()));

        let (dashes, offset) = gc.dashes();
        if gc.line_style() != LineStyle::Solid && !dashes.is_empty() {
            Self::push(
                canvas,
                QuartzOp::SetLineDash {
                    offset: offset as f32,
                    lengths: dashes.iter().map(|&d| d as f32).collect(),
                },
            );
        }
        Ok(())
    }

    fn program_clip(&mut self, canvas: &mut Canvas, gc: &Gc, target: &PaintTarget) {
        Self::push(
            canvas,
            QuartzOp::ResetClip(target.intrinsic_clip.rects().to_vec()),
        );
        match gc.clip() {
            Clip::Region(region) => {
                let mut translated = region.clone();
                translated.offset(gc.clip_origin().x, gc.clip_origin().y);
                Self::push(canvas, QuartzOp::ClipToRects(translated.rects().to_vec()));
            }
            Clip::Mask(mask) => {
                Self::push(
                    canvas,
                    QuartzOp::ClipToMask {
                        origin: gc.clip_origin(),
                        mask: mask.clone(),
                    },
                );
            }
            Clip::None => {}
        }
    }

    fn end_session(&mut self) {
        self.pattern_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasOp;
    use crate::values::Fill;
    use veld_core::Region;

    fn native_ops(canvas: &Canvas) -> Vec<QuartzOp> {
        canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                CanvasOp::Native(NativeOp::Quartz(op)) => Some(op.clone()),
                _ => None,
            })
            .collect()
    }

    fn stippled_gc() -> Gc {
        let mut gc = Gc::new();
        gc.set_fill(Fill::Stippled);
        gc.set_stipple(Some(Arc::new(Bitmap::solid(8, 8))));
        gc
    }

    #[test]
    fn test_pattern_matrix_anchors_origin_to_device_zero() {
        let mut realizer = QuartzRealizer::new();
        let mut gc = stippled_gc();
        gc.set_ts_origin(Point::new(5, 7));

        realizer.acquire();
        realizer
            .canvas_mut()
            .unwrap()
            .set_transform(Transform2D::scale(2.0, 2.0));
        let target = PaintTarget::new(Rect::new(0, 0, 100, 100));
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        let canvas = realizer.release().unwrap();

        let matrix = native_ops(&canvas)
            .iter()
            .find_map(|op| match op {
                QuartzOp::SetFillPattern { matrix, .. } => Some(*matrix),
                _ => None,
            })
            .expect("pattern programmed");
        // transform ∘ translate(-5, -7): the origin maps to device (0,0)
        assert_eq!(matrix.apply(5.0, 7.0), (0.0, 0.0));
    }

    #[test]
    fn test_patterns_are_cached_within_a_session() {
        let mut realizer = QuartzRealizer::new();
        let mut gc = stippled_gc();
        let target = PaintTarget::new(Rect::new(0, 0, 100, 100));

        realizer.acquire();
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        realizer
            .update_canvas(&mut gc, None, None, false, &target)
            .unwrap();
        let canvas = realizer.release().unwrap();

        let ops = native_ops(&canvas);
        let created = ops
            .iter()
            .filter(|op| matches!(op, QuartzOp::SetFillPattern { .. }))
            .count();
        let reused = ops
            .iter()
            .filter(|op| matches!(op, QuartzOp::ReuseFillPattern { .. }))
            .count();
        assert_eq!(created, 1);
        assert_eq!(reused, 1);
    }

    #[test]
    fn test_pattern_cache_is_freed_on_release() {
        let mut realizer = QuartzRealizer::new();
        let mut gc = stippled_gc();
        let target = PaintTarget::new(Rect::new(0, 0, 100, 100));

        realizer.acquire();
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        realizer.release();

        // A new session rebuilds the pattern instead of reusing a stale
        // cache entry.
        realizer.acquire();
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        let canvas = realizer.release().unwrap();
        assert!(native_ops(&canvas)
            .iter()
            .any(|op| matches!(op, QuartzOp::SetFillPattern { .. })));
    }

    #[test]
    fn test_stale_overlay_removed_for_new_paint_tag() {
        let mut realizer = QuartzRealizer::new();
        let mut gc = Gc::new();
        gc.set_clip_region(Some(Region::from_rect(Rect::new(0, 0, 50, 50))));
        gc.apply_drawable_clip(7, &Region::from_rect(Rect::new(0, 0, 10, 10)), 0, 0)
            .unwrap();

        realizer.acquire();
        // A paint pass with a different tag: the overlay is stale
        let target = PaintTarget::new(Rect::new(0, 0, 100, 100)).with_paint_tag(8);
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        realizer.release();

        assert_eq!(gc.applied_overlay_tag(), None);
        assert_eq!(
            gc.clip_region(),
            Some(&Region::from_rect(Rect::new(0, 0, 50, 50)))
        );
    }

    #[test]
    fn test_current_overlay_survives_update() {
        let mut realizer = QuartzRealizer::new();
        let mut gc = Gc::new();
        gc.apply_drawable_clip(7, &Region::from_rect(Rect::new(0, 0, 10, 10)), 0, 0)
            .unwrap();

        realizer.acquire();
        let target = PaintTarget::new(Rect::new(0, 0, 100, 100)).with_paint_tag(7);
        realizer
            .update_canvas(&mut gc, None, None, true, &target)
            .unwrap();
        let canvas = realizer.release().unwrap();

        assert_eq!(gc.applied_overlay_tag(), Some(7));
        // The overlay's region participates in the programmed clip
        assert!(native_ops(&canvas)
            .contains(&QuartzOp::ClipToRects(vec![Rect::new(0, 0, 10, 10)])));
    }
}
