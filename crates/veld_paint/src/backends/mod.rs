//! Backend realizers
//!
//! One realizer per native windowing system. Each honors the portable
//! update contract with its own primitives: server-side GC fields for the
//! Xlib-style backend, pens and brushes for the GDI-style backend, and an
//! immediate-mode context configuration for the Quartz-style backend.

mod gdi;
mod quartz;
mod xlib;

pub use gdi::{GdiBrush, GdiOp, GdiRealizer};
pub use quartz::{QuartzOp, QuartzRealizer};
pub use xlib::{XlibOp, XlibRealizer};
