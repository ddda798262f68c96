//! Graphics-context value store
//!
//! A `Gc` bundles the drawing attributes applied when rendering onto a
//! surface: fill mode, colors, tile/stipple patterns, clip, and line
//! attributes. Attributes are mutated through setters or a masked
//! `set_values` batch; every mutation marks the store dirty so the next
//! backend realization knows what to reprogram.

use std::sync::Arc;

use bitflags::bitflags;
use smallvec::SmallVec;
use veld_core::{Bitmap, Color, Point, Region};

use crate::overlay::DrawableClip;

/// Fill mode for drawing primitives
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fill {
    /// Paint with the foreground color
    #[default]
    Solid,
    /// Paint with a repeating tile bitmap
    Tiled,
    /// Paint foreground through the stipple's set bits
    Stippled,
    /// Like `Stippled`, but unset bits paint the background color
    OpaqueStippled,
}

/// Line style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineStyle {
    #[default]
    Solid,
    OnOffDash,
    DoubleDash,
}

/// Line cap style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapStyle {
    NotLast,
    #[default]
    Butt,
    Round,
    Projecting,
}

/// Line join style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinStyle {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Whether drawing is clipped by child surfaces
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubwindowMode {
    #[default]
    ClipByChildren,
    IncludeInferiors,
}

bitflags! {
    /// Selects which fields of a [`GcValues`] a `set_values` call applies
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct GcValuesMask: u32 {
        const FOREGROUND    = 1 << 0;
        const BACKGROUND    = 1 << 1;
        const FILL          = 1 << 2;
        const TILE          = 1 << 3;
        const STIPPLE       = 1 << 4;
        const CLIP_MASK     = 1 << 5;
        const CLIP_X_ORIGIN = 1 << 6;
        const CLIP_Y_ORIGIN = 1 << 7;
        const TS_X_ORIGIN   = 1 << 8;
        const TS_Y_ORIGIN   = 1 << 9;
        const LINE_WIDTH    = 1 << 10;
        const LINE_STYLE    = 1 << 11;
        const CAP_STYLE     = 1 << 12;
        const JOIN_STYLE    = 1 << 13;
        const SUBWINDOW     = 1 << 14;
        const EXPOSURES     = 1 << 15;
    }
}

/// The full attribute bundle of a graphics context
#[derive(Clone, Debug)]
pub struct GcValues {
    pub foreground: Color,
    pub background: Color,
    pub fill: Fill,
    pub tile: Option<Arc<Bitmap>>,
    pub stipple: Option<Arc<Bitmap>>,
    pub clip_mask: Option<Arc<Bitmap>>,
    pub clip_origin: Point,
    pub ts_origin: Point,
    pub line_width: i32,
    pub line_style: LineStyle,
    pub cap_style: CapStyle,
    pub join_style: JoinStyle,
    pub subwindow_mode: SubwindowMode,
    pub graphics_exposures: bool,
}

impl Default for GcValues {
    fn default() -> Self {
        Self {
            foreground: Color::BLACK,
            background: Color::WHITE,
            fill: Fill::Solid,
            tile: None,
            stipple: None,
            clip_mask: None,
            clip_origin: Point::ZERO,
            ts_origin: Point::ZERO,
            line_width: 0,
            line_style: LineStyle::Solid,
            cap_style: CapStyle::Butt,
            join_style: JoinStyle::Miter,
            subwindow_mode: SubwindowMode::ClipByChildren,
            graphics_exposures: true,
        }
    }
}

/// The user-set clip of a graphics context
///
/// A mask and a region are never set simultaneously; assigning one clears
/// the other.
#[derive(Clone, Debug, Default)]
pub enum Clip {
    /// No clip: drawing affects the whole target
    #[default]
    None,
    /// Clip to the set bits of a bitmap positioned at the clip origin
    Mask(Arc<Bitmap>),
    /// Clip to a geometric region. An empty region clips everything away,
    /// which is distinct from no clip at all.
    Region(Region),
}

/// What the next backend realization must reprogram
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcDirty {
    /// Paint attributes changed; the effective fill must be re-derived
    pub attributes: bool,
    /// Only placement changed (clip shape/origin, pattern origin); native
    /// matrices and clips need reprogramming but not attribute
    /// re-derivation
    pub geometry: bool,
}

impl GcDirty {
    pub fn any(&self) -> bool {
        self.attributes || self.geometry
    }
}

/// The resolved, effective paint for one drawing operation
#[derive(Clone, Debug)]
pub enum ResolvedPaint {
    Solid {
        color: Color,
    },
    Tiled {
        tile: Arc<Bitmap>,
        origin: Point,
    },
    Stippled {
        stipple: Arc<Bitmap>,
        color: Color,
        origin: Point,
    },
    OpaqueStippled {
        stipple: Arc<Bitmap>,
        foreground: Color,
        background: Color,
        origin: Point,
    },
}

/// A graphics context: the value store plus clip and overlay state
#[derive(Clone, Debug, Default)]
pub struct Gc {
    values: GcValues,
    clip: Clip,
    dashes: SmallVec<[i32; 8]>,
    dash_offset: i32,
    dirty: GcDirty,
    pub(crate) overlay: Option<DrawableClip>,
}

impl Gc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial values, honoring `mask`
    pub fn with_values(values: &GcValues, mask: GcValuesMask) -> Self {
        let mut gc = Self::new();
        gc.set_values(values, mask);
        gc
    }

    // === Snapshot reads ===

    /// Snapshot of the current attributes. The clip mask is included; a
    /// clip region is queried through [`Gc::clip_region`] instead.
    pub fn values(&self) -> GcValues {
        let mut values = self.values.clone();
        values.clip_mask = match &self.clip {
            Clip::Mask(mask) => Some(mask.clone()),
            _ => None,
        };
        values
    }

    pub fn foreground(&self) -> Color {
        self.values.foreground
    }

    pub fn background(&self) -> Color {
        self.values.background
    }

    pub fn fill(&self) -> Fill {
        self.values.fill
    }

    pub fn clip_origin(&self) -> Point {
        self.values.clip_origin
    }

    pub fn ts_origin(&self) -> Point {
        self.values.ts_origin
    }

    pub fn line_width(&self) -> i32 {
        self.values.line_width
    }

    pub fn line_style(&self) -> LineStyle {
        self.values.line_style
    }

    pub fn cap_style(&self) -> CapStyle {
        self.values.cap_style
    }

    pub fn join_style(&self) -> JoinStyle {
        self.values.join_style
    }

    pub fn subwindow_mode(&self) -> SubwindowMode {
        self.values.subwindow_mode
    }

    pub fn graphics_exposures(&self) -> bool {
        self.values.graphics_exposures
    }

    pub fn dashes(&self) -> (&[i32], i32) {
        (&self.dashes, self.dash_offset)
    }

    /// The user clip (with any applied drawable-clip overlay composed in)
    pub fn clip(&self) -> &Clip {
        &self.clip
    }

    /// The clip region, `None` when unset or when a mask clip is set
    pub fn clip_region(&self) -> Option<&Region> {
        match &self.clip {
            Clip::Region(region) => Some(region),
            _ => None,
        }
    }

    /// The clip mask, `None` when unset or when a region clip is set
    pub fn clip_mask(&self) -> Option<&Arc<Bitmap>> {
        match &self.clip {
            Clip::Mask(mask) => Some(mask),
            _ => None,
        }
    }

    // === Masked batch update ===

    /// Apply only the fields flagged in `mask`, each independently.
    /// Setting a clip mask clears any clip region.
    pub fn set_values(&mut self, values: &GcValues, mask: GcValuesMask) {
        if mask.contains(GcValuesMask::FOREGROUND) {
            self.values.foreground = values.foreground;
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::BACKGROUND) {
            self.values.background = values.background;
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::FILL) {
            self.values.fill = values.fill;
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::TILE) {
            self.values.tile = values.tile.clone();
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::STIPPLE) {
            self.values.stipple = values.stipple.clone();
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::CLIP_MASK) {
            self.remove_drawable_clip();
            self.clip = match &values.clip_mask {
                Some(mask) => Clip::Mask(mask.clone()),
                None => Clip::None,
            };
            self.dirty.geometry = true;
        }
        if mask.contains(GcValuesMask::CLIP_X_ORIGIN) {
            self.values.clip_origin.x = values.clip_origin.x;
            self.dirty.geometry = true;
        }
        if mask.contains(GcValuesMask::CLIP_Y_ORIGIN) {
            self.values.clip_origin.y = values.clip_origin.y;
            self.dirty.geometry = true;
        }
        if mask.contains(GcValuesMask::TS_X_ORIGIN) {
            self.values.ts_origin.x = values.ts_origin.x;
            self.dirty.geometry = true;
        }
        if mask.contains(GcValuesMask::TS_Y_ORIGIN) {
            self.values.ts_origin.y = values.ts_origin.y;
            self.dirty.geometry = true;
        }
        if mask.contains(GcValuesMask::LINE_WIDTH) {
            self.values.line_width = values.line_width;
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::LINE_STYLE) {
            self.values.line_style = values.line_style;
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::CAP_STYLE) {
            self.values.cap_style = values.cap_style;
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::JOIN_STYLE) {
            self.values.join_style = values.join_style;
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::SUBWINDOW) {
            self.values.subwindow_mode = values.subwindow_mode;
            self.dirty.attributes = true;
        }
        if mask.contains(GcValuesMask::EXPOSURES) {
            self.values.graphics_exposures = values.graphics_exposures;
            self.dirty.attributes = true;
        }
    }

    // === Individual setters ===

    pub fn set_foreground(&mut self, color: Color) {
        self.values.foreground = color;
        self.dirty.attributes = true;
    }

    pub fn set_background(&mut self, color: Color) {
        self.values.background = color;
        self.dirty.attributes = true;
    }

    pub fn set_fill(&mut self, fill: Fill) {
        self.values.fill = fill;
        self.dirty.attributes = true;
    }

    pub fn set_tile(&mut self, tile: Option<Arc<Bitmap>>) {
        self.values.tile = tile;
        self.dirty.attributes = true;
    }

    pub fn set_stipple(&mut self, stipple: Option<Arc<Bitmap>>) {
        self.values.stipple = stipple;
        self.dirty.attributes = true;
    }

    /// Clip to the set bits of `mask`. Clears any clip region.
    pub fn set_clip_mask(&mut self, mask: Option<Arc<Bitmap>>) {
        self.remove_drawable_clip();
        self.clip = match mask {
            Some(mask) => Clip::Mask(mask),
            None => Clip::None,
        };
        self.dirty.geometry = true;
    }

    /// Clip to a region. Clears any clip mask.
    pub fn set_clip_region(&mut self, region: Option<Region>) {
        self.remove_drawable_clip();
        self.clip = match region {
            Some(region) => Clip::Region(region),
            None => Clip::None,
        };
        self.dirty.geometry = true;
    }

    /// Clip to a single rectangle. Clears any clip mask.
    pub fn set_clip_rectangle(&mut self, rect: veld_core::Rect) {
        self.set_clip_region(Some(Region::from_rect(rect)));
    }

    pub fn set_clip_origin(&mut self, origin: Point) {
        self.remove_drawable_clip();
        self.values.clip_origin = origin;
        self.dirty.geometry = true;
    }

    pub fn set_ts_origin(&mut self, origin: Point) {
        self.values.ts_origin = origin;
        self.dirty.geometry = true;
    }

    pub fn set_line_attributes(
        &mut self,
        line_width: i32,
        line_style: LineStyle,
        cap_style: CapStyle,
        join_style: JoinStyle,
    ) {
        self.values.line_width = line_width;
        self.values.line_style = line_style;
        self.values.cap_style = cap_style;
        self.values.join_style = join_style;
        self.dirty.attributes = true;
    }

    /// Set the dash pattern used by the dashed line styles. An empty dash
    /// list is a programmer error and leaves the pattern unchanged.
    pub fn set_dashes(&mut self, offset: i32, dashes: &[i32]) {
        if dashes.is_empty() || dashes.iter().any(|&d| d <= 0) {
            tracing::warn!("set_dashes requires a non-empty list of positive segment lengths");
            return;
        }
        self.dash_offset = offset;
        self.dashes = SmallVec::from_slice(dashes);
        self.dirty.attributes = true;
    }

    pub fn set_subwindow_mode(&mut self, mode: SubwindowMode) {
        self.values.subwindow_mode = mode;
        self.dirty.attributes = true;
    }

    pub fn set_exposures(&mut self, exposures: bool) {
        self.values.graphics_exposures = exposures;
        self.dirty.attributes = true;
    }

    // === Dirty bookkeeping ===

    pub fn dirty(&self) -> GcDirty {
        self.dirty
    }

    /// Clear dirty state after a realization has consumed it
    pub fn clear_dirty(&mut self) {
        self.dirty = GcDirty::default();
    }

    pub(crate) fn mark_geometry_dirty(&mut self) {
        self.dirty.geometry = true;
    }

    pub(crate) fn replace_clip(&mut self, clip: Clip) -> Clip {
        std::mem::replace(&mut self.clip, clip)
    }

    // === Fill resolution ===

    /// Resolve the effective paint for one operation.
    ///
    /// A per-call override stipple forces stippled fill for that
    /// operation. A fill mode whose pattern resource is missing (after
    /// considering the override) silently degrades to a solid fill;
    /// absence of a pattern is a visual simplification, never an error.
    pub fn resolve_fill(
        &self,
        override_stipple: Option<&Arc<Bitmap>>,
        override_foreground: Option<Color>,
    ) -> ResolvedPaint {
        let foreground = override_foreground.unwrap_or(self.values.foreground);
        let fill = if override_stipple.is_some() {
            Fill::Stippled
        } else {
            self.values.fill
        };
        match fill {
            Fill::Solid => ResolvedPaint::Solid { color: foreground },
            Fill::Tiled => match &self.values.tile {
                Some(tile) => ResolvedPaint::Tiled {
                    tile: tile.clone(),
                    origin: self.values.ts_origin,
                },
                None => ResolvedPaint::Solid { color: foreground },
            },
            Fill::Stippled => {
                match override_stipple.or(self.values.stipple.as_ref()) {
                    Some(stipple) => ResolvedPaint::Stippled {
                        stipple: stipple.clone(),
                        color: foreground,
                        origin: self.values.ts_origin,
                    },
                    None => ResolvedPaint::Solid { color: foreground },
                }
            }
            Fill::OpaqueStippled => {
                match override_stipple.or(self.values.stipple.as_ref()) {
                    Some(stipple) => ResolvedPaint::OpaqueStippled {
                        stipple: stipple.clone(),
                        foreground,
                        background: self.values.background,
                        origin: self.values.ts_origin,
                    },
                    None => ResolvedPaint::Solid { color: foreground },
                }
            }
        }
    }
}
