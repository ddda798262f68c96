//! Veld Widget Core
//!
//! The retained widget tree and its lifecycle state machine:
//!
//! - **Flags**: realized/mapped/visible/sensitive and friends, with the
//!   ordering invariants enforced on every transition
//! - **Lifecycle**: show/hide, realize/unrealize, map/unmap cascades,
//!   sensitivity propagation, parenting
//! - **Surfaces**: the native-surface store widgets realize onto
//! - **Redraw**: per-surface invalid-region accumulation and the update
//!   processing that drives expose painting
//! - **Dispatch**: input routing honoring the grab stack
//!
//! Widgets live in an arena and are addressed by id; the parent edge is
//! a non-owning id lookup while children are owned by their parent.

pub mod dispatch;
pub mod flags;
pub mod lifecycle;
pub mod redraw;
pub mod surface;
pub mod tree;

pub use dispatch::{InputEvent, InputEventKind};
pub use flags::{StateType, WidgetFlags};
pub use surface::{SurfaceEvent, SurfaceId, SurfaceStore};
pub use tree::{DefaultHooks, Widget, WidgetBuilder, WidgetHooks, WidgetId, WidgetTree};
