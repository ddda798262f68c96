//! GC-backed text renderer
//!
//! Implements the layout engine's render-part callbacks on top of a
//! graphics context and a backend realizer. One canvas is acquired
//! lazily per render pass and reused across all parts and glyphs; paint
//! state is reprogrammed only when the effective color or stipple for a
//! part actually differs from what was last realized.

use std::sync::Arc;

use veld_core::{Bitmap, Color};
use veld_paint::{Canvas, Gc, PaintTarget, Realizer, Transform2D};

use crate::attrs::{AttrValue, TextAttrKinds};
use crate::layout::{GlyphString, Layout, LayoutLine, TextRun};

/// The fixed near-white color embossed duplicates are drawn in
const EMBOSS_HIGHLIGHT: Color = Color::new(0.93, 0.93, 0.93, 1.0);

/// What is being drawn for a glyph run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPart {
    Foreground,
    Background,
    Underline,
    Strikethrough,
}

impl RenderPart {
    pub const ALL: [RenderPart; 4] = [
        RenderPart::Foreground,
        RenderPart::Background,
        RenderPart::Underline,
        RenderPart::Strikethrough,
    ];

    fn index(self) -> usize {
        match self {
            RenderPart::Foreground => 0,
            RenderPart::Background => 1,
            RenderPart::Underline => 2,
            RenderPart::Strikethrough => 3,
        }
    }
}

/// The (color, stipple) pair last programmed into the canvas
#[derive(Clone, Debug)]
struct Programmed {
    color: Option<Color>,
    stipple: Option<Arc<Bitmap>>,
}

impl Programmed {
    fn matches(&self, color: Option<Color>, stipple: &Option<Arc<Bitmap>>) -> bool {
        if self.color != color {
            return false;
        }
        match (&self.stipple, stipple) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Renders layout-engine output through a GC onto a backend realizer
pub struct GcTextRenderer<R: Realizer> {
    realizer: R,
    kinds: TextAttrKinds,
    target: Option<PaintTarget>,
    base_gc: Option<Gc>,

    active: bool,
    /// Engine-supplied transform, applied once per pass on first canvas
    /// acquisition
    matrix: Option<Transform2D>,
    /// `None` is the "no part yet" sentinel
    last_part: Option<RenderPart>,
    last_programmed: Option<Programmed>,
    /// Standing per-part override colors (e.g. selection highlight)
    override_colors: [Option<Color>; 4],
    part_stipples: [Option<Arc<Bitmap>>; 4],
    /// Parts whose paint must be reprogrammed on next access
    part_changed: [bool; 4],

    emboss: bool,
    emboss_color: Color,

    finished: Option<Canvas>,
}

impl<R: Realizer> GcTextRenderer<R> {
    pub fn new(realizer: R, kinds: TextAttrKinds) -> Self {
        Self {
            realizer,
            kinds,
            target: None,
            base_gc: None,
            active: false,
            matrix: None,
            last_part: None,
            last_programmed: None,
            override_colors: [None; 4],
            part_stipples: [None, None, None, None],
            part_changed: [false; 4],
            emboss: false,
            emboss_color: EMBOSS_HIGHLIGHT,
            finished: None,
        }
    }

    /// Set the surface drawn onto for subsequent passes
    pub fn set_target(&mut self, target: PaintTarget) {
        self.target = Some(target);
    }

    /// Set the base graphics context drawn with
    pub fn set_gc(&mut self, gc: Gc) {
        self.base_gc = Some(gc);
    }

    pub fn gc_mut(&mut self) -> Option<&mut Gc> {
        self.base_gc.as_mut()
    }

    /// Set or clear a standing override color for a part. Overrides
    /// survive across runs and are re-applied after each run's own
    /// attribute processing.
    pub fn set_override_color(&mut self, part: RenderPart, color: Option<Color>) {
        let idx = part.index();
        self.override_colors[idx] = color;
        self.part_changed[idx] = true;
    }

    /// The canvas released by the last completed pass
    pub fn take_finished_canvas(&mut self) -> Option<Canvas> {
        self.finished.take()
    }

    // === Render pass lifecycle ===

    /// Start a render pass. A missing target or base GC is a reported
    /// misconfiguration; the pass proceeds but draws nothing.
    pub fn begin(&mut self) {
        if self.target.is_none() || self.base_gc.is_none() {
            tracing::warn!("text render pass started without a target surface and base GC");
        }
        self.active = true;
        self.last_part = None;
        self.last_programmed = None;
    }

    /// End the pass: release the canvas and reset part tracking to the
    /// "no part yet" sentinel.
    pub fn end(&mut self) {
        if !self.active {
            tracing::warn!("text render pass ended without begin");
            return;
        }
        self.finished = self.realizer.release();
        self.active = false;
        self.last_part = None;
        self.last_programmed = None;
    }

    /// The engine reports that a part's attributes changed mid-pass;
    /// only the cached last-part sentinel is invalidated.
    pub fn part_changed(&mut self, _part: RenderPart) {
        self.last_part = None;
    }

    /// Scan a run's extra attributes for the custom kinds: the stipple
    /// applies uniformly to all four parts, and an emboss change forces
    /// foreground reprogramming. Standing override colors are re-applied
    /// after the engine's own default attribute processing.
    pub fn prepare_run(&mut self, run: &TextRun) {
        let mut stipple: Option<Arc<Bitmap>> = None;
        let mut embossed = false;
        let mut emboss_color = EMBOSS_HIGHLIGHT;

        for attr in &run.extra_attrs {
            if attr.kind == self.kinds.stipple {
                if let AttrValue::Stipple(bitmap) = &attr.value {
                    stipple = bitmap.clone();
                }
            } else if attr.kind == self.kinds.embossed {
                if let AttrValue::Bool(flag) = attr.value {
                    embossed = flag;
                }
            } else if attr.kind == self.kinds.emboss_color {
                if let AttrValue::Color(color) = attr.value {
                    emboss_color = color;
                }
            }
        }

        for idx in 0..4 {
            let same = match (&self.part_stipples[idx], &stipple) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if !same {
                self.part_stipples[idx] = stipple.clone();
                self.part_changed[idx] = true;
            }
        }

        if embossed != self.emboss || emboss_color != self.emboss_color {
            self.emboss = embossed;
            self.emboss_color = emboss_color;
            self.part_changed[RenderPart::Foreground.index()] = true;
        }

        for part in RenderPart::ALL {
            if self.override_colors[part.index()].is_some() {
                self.part_changed[part.index()] = true;
            }
        }
    }

    // === Paint programming ===

    /// Program the canvas for `color`/`stipple` if it differs from what
    /// was last realized. Returns false when the pass is inactive or
    /// misconfigured.
    fn program(&mut self, color: Option<Color>, stipple: Option<Arc<Bitmap>>) -> bool {
        if !self.active {
            tracing::warn!("draw call outside a render pass");
            return false;
        }
        let (Some(gc), Some(target)) = (self.base_gc.as_mut(), self.target.as_ref()) else {
            return false;
        };

        if !self.realizer.session().is_prepared() {
            if !self.realizer.acquire() {
                return false;
            }
            if let Some(matrix) = self.matrix {
                if let Some(canvas) = self.realizer.canvas_mut() {
                    canvas.set_transform(matrix);
                }
            }
        }

        if let Some(programmed) = &self.last_programmed {
            if programmed.matches(color, &stipple) {
                return true;
            }
        }

        let gc_changed = gc.dirty().any() || self.last_programmed.is_none();
        if let Err(err) = self.realizer.update_canvas(
            gc,
            color,
            stipple.as_ref(),
            gc_changed,
            target,
        ) {
            tracing::warn!(error = %err, "paint programming failed, draw aborted");
            return false;
        }
        gc.clear_dirty();
        self.last_programmed = Some(Programmed { color, stipple });
        true
    }

    /// Ensure paint state matches `part`, reprogramming only on part or
    /// attribute transitions.
    fn prepare_part(&mut self, part: RenderPart) -> bool {
        let idx = part.index();
        if self.last_part == Some(part) && !self.part_changed[idx] {
            // Same part, nothing changed: the canvas is already
            // programmed. Still requires an acquired session.
            if self.realizer.session().is_prepared() {
                return true;
            }
        }
        let color = self.override_colors[idx];
        let stipple = self.part_stipples[idx].clone();
        if !self.program(color, stipple) {
            return false;
        }
        self.last_part = Some(part);
        self.part_changed[idx] = false;
        true
    }

    // === Render-part callbacks ===

    /// Draw a glyph string with its origin at `(x, y)` on the baseline
    pub fn draw_glyphs(&mut self, x: f32, y: f32, glyphs: &GlyphString) {
        if !self.prepare_part(RenderPart::Foreground) {
            return;
        }
        self.with_emboss(RenderPart::Foreground, |canvas| {
            canvas.draw_glyphs(glyphs.glyph_ids(), x, y);
        });
    }

    /// Draw a filled rectangle for a part
    pub fn draw_rectangle(&mut self, part: RenderPart, x: f32, y: f32, width: f32, height: f32) {
        if !self.prepare_part(part) {
            return;
        }
        self.with_emboss(part, |canvas| {
            canvas.fill_rect(x, y, width, height);
        });
    }

    /// Draw the squiggly underline marking an error under the extent
    pub fn draw_error_underline(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if !self.prepare_part(RenderPart::Underline) {
            return;
        }
        self.with_emboss(RenderPart::Underline, |canvas| {
            canvas.draw_error_underline(x, y, width, height);
        });
    }

    /// Draw an embedded-object run's shape placeholder
    pub fn draw_shape(&mut self, shape_id: u32, x: f32, y: f32) {
        if !self.prepare_part(RenderPart::Foreground) {
            return;
        }
        self.with_emboss(RenderPart::Foreground, |canvas| {
            canvas.draw_shape(shape_id, x, y);
        });
    }

    /// Run a draw twice when embossing: first shifted by exactly one
    /// device pixel down-right in the emboss color, then normally. The
    /// shift adjusts the transform's translation components directly, so
    /// it is one device pixel regardless of any scaling in effect.
    fn with_emboss(&mut self, part: RenderPart, draw: impl Fn(&mut Canvas)) {
        if self.emboss {
            let emboss_color = self.emboss_color;
            let stipple = self.part_stipples[part.index()].clone();
            if self.program(Some(emboss_color), stipple.clone()) {
                if let Some(canvas) = self.realizer.canvas_mut() {
                    let saved = canvas.transform();
                    canvas.device_offset(1.0, 1.0);
                    draw(canvas);
                    canvas.set_transform(saved);
                }
            }
            // Back to the part's real paint
            let color = self.override_colors[part.index()];
            if !self.program(color, stipple) {
                return;
            }
        }
        if let Some(canvas) = self.realizer.canvas_mut() {
            draw(canvas);
        }
    }

    // === Layout entry points ===

    /// Draw a whole layout with its top-left corner at `(x, y)`
    pub fn draw_layout(&mut self, layout: &Layout, x: f32, y: f32) {
        self.matrix = layout.transform;
        self.begin();
        let mut top = y;
        for line in &layout.lines {
            self.draw_line_runs(line, x, top + line.baseline);
            top += line.height;
        }
        self.end();
    }

    /// Draw a single line with its baseline origin at `(x, y)`
    pub fn draw_layout_line(&mut self, line: &LayoutLine, x: f32, y: f32) {
        self.begin();
        self.draw_line_runs(line, x, y);
        self.end();
    }

    /// Draw a layout with temporary foreground/background overrides
    /// (e.g. selection highlight)
    pub fn draw_layout_with_colors(
        &mut self,
        layout: &Layout,
        x: f32,
        y: f32,
        foreground: Option<Color>,
        background: Option<Color>,
    ) {
        let saved_fg = self.override_colors[RenderPart::Foreground.index()];
        let saved_bg = self.override_colors[RenderPart::Background.index()];
        self.set_override_color(RenderPart::Foreground, foreground);
        self.set_override_color(RenderPart::Background, background);
        self.draw_layout(layout, x, y);
        self.set_override_color(RenderPart::Foreground, saved_fg);
        self.set_override_color(RenderPart::Background, saved_bg);
    }

    /// Draw a single line with temporary color overrides
    pub fn draw_layout_line_with_colors(
        &mut self,
        line: &LayoutLine,
        x: f32,
        y: f32,
        foreground: Option<Color>,
        background: Option<Color>,
    ) {
        let saved_fg = self.override_colors[RenderPart::Foreground.index()];
        let saved_bg = self.override_colors[RenderPart::Background.index()];
        self.set_override_color(RenderPart::Foreground, foreground);
        self.set_override_color(RenderPart::Background, background);
        self.draw_layout_line(line, x, y);
        self.set_override_color(RenderPart::Foreground, saved_fg);
        self.set_override_color(RenderPart::Background, saved_bg);
    }

    fn draw_line_runs(&mut self, line: &LayoutLine, x: f32, baseline: f32) {
        let mut cursor = x;
        for run in &line.runs {
            self.prepare_run(run);
            let width = run.glyphs.width();
            let run_baseline = baseline - run.rise;

            if self.override_colors[RenderPart::Background.index()].is_some() {
                self.draw_rectangle(
                    RenderPart::Background,
                    cursor,
                    baseline - line.baseline,
                    width,
                    line.height,
                );
            }

            match run.shape_id {
                Some(shape_id) => self.draw_shape(shape_id, cursor, run_baseline),
                None => self.draw_glyphs(cursor, run_baseline, &run.glyphs),
            }

            if run.underline {
                self.draw_rectangle(RenderPart::Underline, cursor, run_baseline + 1.0, width, 1.0);
            }
            if run.strikethrough {
                self.draw_rectangle(
                    RenderPart::Strikethrough,
                    cursor,
                    run_baseline - line.height * 0.3,
                    width,
                    1.0,
                );
            }
            cursor += width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{AttrRegistry, TextAttr};
    use crate::layout::Glyph;
    use veld_paint::backends::{XlibOp, XlibRealizer};
    use veld_paint::{CanvasOp, NativeOp};

    fn glyph(id: u32, advance: f32) -> Glyph {
        Glyph {
            id,
            x_offset: 0.0,
            y_offset: 0.0,
            advance,
        }
    }

    fn renderer_with_gc(foreground: Color) -> (GcTextRenderer<XlibRealizer>, TextAttrKinds) {
        let mut registry = AttrRegistry::new();
        let kinds = TextAttrKinds::register(&mut registry);
        let mut renderer = GcTextRenderer::new(XlibRealizer::new(), kinds);
        renderer.set_target(PaintTarget::new(veld_core::Rect::new(0, 0, 200, 100)));
        let mut gc = Gc::new();
        gc.set_foreground(foreground);
        renderer.set_gc(gc);
        (renderer, kinds)
    }

    fn line_with(run: TextRun) -> LayoutLine {
        LayoutLine {
            runs: vec![run],
            baseline: 10.0,
            height: 12.0,
        }
    }

    fn glyph_draws(canvas: &Canvas) -> Vec<(f32, f32, Transform2D)> {
        canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                CanvasOp::DrawGlyphs { x, y, transform, .. } => Some((*x, *y, *transform)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_emboss_draws_twice_with_device_offset() {
        let blue = Color::from_hex(0x336699);
        let (mut renderer, kinds) = renderer_with_gc(blue);

        let run = TextRun {
            glyphs: GlyphString::new(vec![glyph(1, 8.0)]),
            extra_attrs: vec![
                TextAttr::new(kinds.embossed, AttrValue::Bool(true)),
                TextAttr::new(kinds.emboss_color, AttrValue::Color(Color::WHITE)),
            ],
            ..Default::default()
        };
        renderer.draw_layout_line(&line_with(run), 10.0, 20.0);

        let canvas = renderer.take_finished_canvas().expect("canvas released");
        let draws = glyph_draws(&canvas);
        assert_eq!(draws.len(), 2);

        // First draw: shifted by exactly one device pixel
        assert_eq!(draws[0].0, 10.0);
        assert_eq!(draws[0].1, 20.0);
        assert_eq!(draws[0].2, Transform2D::identity().with_device_offset(1.0, 1.0));
        // Second draw: the original transform
        assert_eq!(draws[1].2, Transform2D::identity());

        // Emboss color programmed before the first draw, the run's real
        // foreground reprogrammed between the draws
        let ops = canvas.ops();
        let first_draw_idx = ops
            .iter()
            .position(|op| matches!(op, CanvasOp::DrawGlyphs { .. }))
            .unwrap();
        let second_draw_idx = ops
            .iter()
            .rposition(|op| matches!(op, CanvasOp::DrawGlyphs { .. }))
            .unwrap();
        let white = CanvasOp::Native(NativeOp::Xlib(XlibOp::SetForeground(Color::WHITE)));
        let real = CanvasOp::Native(NativeOp::Xlib(XlibOp::SetForeground(blue)));
        assert!(ops[..first_draw_idx].contains(&white));
        assert!(ops[first_draw_idx..second_draw_idx].contains(&real));
    }

    #[test]
    fn test_consecutive_same_attribute_runs_program_once() {
        let (mut renderer, _kinds) = renderer_with_gc(Color::BLACK);

        let line = LayoutLine {
            runs: vec![
                TextRun {
                    glyphs: GlyphString::new(vec![glyph(1, 8.0)]),
                    ..Default::default()
                },
                TextRun {
                    glyphs: GlyphString::new(vec![glyph(2, 8.0)]),
                    ..Default::default()
                },
            ],
            baseline: 10.0,
            height: 12.0,
        };
        renderer.draw_layout_line(&line, 0.0, 10.0);

        let canvas = renderer.take_finished_canvas().unwrap();
        let programs = canvas
            .ops()
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    CanvasOp::Native(NativeOp::Xlib(XlibOp::SetForeground(_)))
                )
            })
            .count();
        assert_eq!(programs, 1);
        assert_eq!(glyph_draws(&canvas).len(), 2);
    }

    #[test]
    fn test_run_stipple_applies_to_all_parts() {
        let (mut renderer, kinds) = renderer_with_gc(Color::BLACK);
        let stipple = Arc::new(Bitmap::solid(4, 4));

        let run = TextRun {
            glyphs: GlyphString::new(vec![glyph(1, 8.0)]),
            extra_attrs: vec![TextAttr::new(
                kinds.stipple,
                AttrValue::Stipple(Some(stipple.clone())),
            )],
            underline: true,
            ..Default::default()
        };
        renderer.draw_layout_line(&line_with(run), 0.0, 10.0);

        let canvas = renderer.take_finished_canvas().unwrap();
        // Both the glyph and underline draws happen under a stippled fill
        assert!(canvas.ops().iter().any(|op| matches!(
            op,
            CanvasOp::Native(NativeOp::Xlib(XlibOp::SetStipple(s))) if Arc::ptr_eq(s, &stipple)
        )));
        assert!(canvas
            .ops()
            .iter()
            .any(|op| matches!(op, CanvasOp::FillRect { .. })));
    }

    #[test]
    fn test_misconfigured_renderer_draws_nothing() {
        let mut registry = AttrRegistry::new();
        let kinds = TextAttrKinds::register(&mut registry);
        let mut renderer = GcTextRenderer::new(XlibRealizer::new(), kinds);
        // No target and no GC set

        let run = TextRun {
            glyphs: GlyphString::new(vec![glyph(1, 8.0)]),
            ..Default::default()
        };
        renderer.draw_layout_line(&line_with(run), 0.0, 10.0);
        assert!(renderer.take_finished_canvas().is_none());
    }

    #[test]
    fn test_override_colors_restored_after_colored_draw() {
        let (mut renderer, _kinds) = renderer_with_gc(Color::BLACK);

        let layout = Layout::single_line(line_with(TextRun {
            glyphs: GlyphString::new(vec![glyph(1, 8.0)]),
            ..Default::default()
        }));
        renderer.draw_layout_with_colors(
            &layout,
            0.0,
            0.0,
            Some(Color::WHITE),
            Some(Color::from_hex(0x224488)),
        );

        let canvas = renderer.take_finished_canvas().unwrap();
        // The selection background was drawn
        assert!(canvas
            .ops()
            .iter()
            .any(|op| matches!(op, CanvasOp::FillRect { .. })));

        // A later uncolored draw uses the GC's own foreground again
        renderer.draw_layout(&layout, 0.0, 0.0);
        let canvas = renderer.take_finished_canvas().unwrap();
        assert!(canvas.ops().iter().any(|op| matches!(
            op,
            CanvasOp::Native(NativeOp::Xlib(XlibOp::SetForeground(c))) if *c == Color::BLACK
        )));
    }

    #[test]
    fn test_layout_transform_applied_on_first_acquisition() {
        let (mut renderer, _kinds) = renderer_with_gc(Color::BLACK);

        let mut layout = Layout::single_line(line_with(TextRun {
            glyphs: GlyphString::new(vec![glyph(1, 8.0)]),
            ..Default::default()
        }));
        layout.transform = Some(Transform2D::scale(2.0, 2.0));
        renderer.draw_layout(&layout, 0.0, 0.0);

        let canvas = renderer.take_finished_canvas().unwrap();
        let draws = glyph_draws(&canvas);
        assert_eq!(draws[0].2, Transform2D::scale(2.0, 2.0));
    }
}
