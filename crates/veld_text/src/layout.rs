//! Layout-engine geometry
//!
//! The shaping engine is an external collaborator; these types model the
//! slice of its output the renderer consumes: positioned glyph strings,
//! runs with extra attributes, and lines with a baseline.

use veld_paint::Transform2D;

use crate::attrs::TextAttr;

/// One positioned glyph within a glyph string
#[derive(Clone, Copy, Debug)]
pub struct Glyph {
    pub id: u32,
    /// Offset from the string origin, in logical units
    pub x_offset: f32,
    pub y_offset: f32,
    pub advance: f32,
}

/// A shaped run of glyphs
#[derive(Clone, Debug, Default)]
pub struct GlyphString {
    pub glyphs: Vec<Glyph>,
}

impl GlyphString {
    pub fn new(glyphs: Vec<Glyph>) -> Self {
        Self { glyphs }
    }

    /// Total advance width in logical units
    pub fn width(&self) -> f32 {
        self.glyphs.iter().map(|g| g.advance).sum()
    }

    pub fn glyph_ids(&self) -> Vec<u32> {
        self.glyphs.iter().map(|g| g.id).collect()
    }
}

/// A run: a glyph string plus the attributes in effect over it
#[derive(Clone, Debug, Default)]
pub struct TextRun {
    pub glyphs: GlyphString,
    /// Engine-provided extra attributes (including the custom kinds)
    pub extra_attrs: Vec<TextAttr>,
    pub underline: bool,
    pub strikethrough: bool,
    /// Baseline shift in logical units
    pub rise: f32,
    /// An embedded-object run draws a shape instead of glyphs
    pub shape_id: Option<u32>,
}

/// A laid-out line
#[derive(Clone, Debug, Default)]
pub struct LayoutLine {
    pub runs: Vec<TextRun>,
    /// Baseline y position relative to the layout origin
    pub baseline: f32,
    pub height: f32,
}

/// A laid-out paragraph
#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub lines: Vec<LayoutLine>,
    /// A transform the engine wants applied before any drawing
    pub transform: Option<Transform2D>,
}

impl Layout {
    pub fn single_line(line: LayoutLine) -> Self {
        Self {
            lines: vec![line],
            transform: None,
        }
    }
}
