//! Veld Text Rendering Adapter
//!
//! Bridges a text-layout engine's abstract render parts (foreground,
//! background, underline, strikethrough) onto GC-based drawing. The
//! layout engine itself is an external collaborator; this crate models
//! only the geometry and per-run attributes the adapter consumes, and
//! adds the decoration attributes (stipple, embossing) the engine does
//! not know about.

pub mod attrs;
pub mod layout;
pub mod renderer;

pub use attrs::{AttrRegistry, AttrType, AttrValue, TextAttr, TextAttrKinds};
pub use layout::{Glyph, GlyphString, Layout, LayoutLine, TextRun};
pub use renderer::{GcTextRenderer, RenderPart};
