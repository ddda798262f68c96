//! Error types
//!
//! Only native-resource exhaustion is an error in this workspace.
//! Precondition violations are reported with `tracing::warn!` and the
//! offending call becomes a no-op; missing pattern resources degrade
//! silently to a solid fill.

use thiserror::Error;

/// Native resource exhaustion. Fatal for the current paint or realize
/// operation; earlier-succeeding attribute applications are not rolled
/// back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A scratch mask for clip compositing could not be allocated.
    #[error("scratch mask allocation failed ({width}x{height})")]
    ScratchMask { width: i32, height: i32 },

    /// The backend could not create a native pen for the current line
    /// attributes.
    #[error("native pen creation failed")]
    Pen,

    /// The backend could not create a native pattern from a tile or
    /// stipple bitmap.
    #[error("native pattern creation failed")]
    Pattern,

    /// The backend could not acquire a drawing canvas for the target
    /// surface.
    #[error("canvas acquisition failed")]
    Canvas,
}
