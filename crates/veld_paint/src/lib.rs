//! Veld Graphics-Context Abstraction
//!
//! A platform-independent bundle of drawing attributes (fill, clip,
//! tile/stipple, line style) multiplexed across incompatible native
//! backends:
//!
//! - **Value store**: masked attribute updates with snapshot reads
//! - **Drawable-clip overlay**: exposure clipping layered non-destructively
//!   over the user clip, with exact save/restore
//! - **Backend realizers**: translate the abstract store into native
//!   drawing state (server GC fields, GDI pens/brushes, or an
//!   immediate-mode context configuration) right before each primitive
//!
//! The native APIs themselves are opaque here; each realizer programs a
//! recording canvas whose op log doubles as the observable surface for
//! tests.

pub mod backends;
pub mod canvas;
pub mod overlay;
pub mod realizer;
pub mod transform;
pub mod values;

pub use backends::{GdiRealizer, QuartzRealizer, XlibRealizer};
pub use canvas::{Canvas, CanvasOp, NativeOp, PaintTarget};
pub use realizer::Realizer;
pub use transform::Transform2D;
pub use values::{
    CapStyle, Clip, Fill, Gc, GcDirty, GcValues, GcValuesMask, JoinStyle, LineStyle,
    ResolvedPaint, SubwindowMode,
};
