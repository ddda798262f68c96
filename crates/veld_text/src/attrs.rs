//! Extensible text attributes
//!
//! The layout engine carries per-run attributes keyed by registered type
//! ids. Three custom attribute kinds decorate rendering on top of the
//! engine's own set: a stipple bitmap, an embossed flag, and an emboss
//! color. Attribute values are cloneable (bitmap references are retained
//! by the clone) and compare by bitmap identity for stipples and by value
//! otherwise.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use veld_core::{Bitmap, Color};

/// A registered attribute type id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttrType(pub u32);

/// Registry of attribute types, keyed by name
///
/// Ids are allocated at registration; registering the same name twice
/// returns the existing id.
#[derive(Debug, Default)]
pub struct AttrRegistry {
    names: FxHashMap<String, AttrType>,
    next: u32,
}

impl AttrRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str) -> AttrType {
        if let Some(&existing) = self.names.get(name) {
            return existing;
        }
        let id = AttrType(self.next);
        self.next += 1;
        self.names.insert(name.to_owned(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<AttrType> {
        self.names.get(name).copied()
    }
}

/// An attribute value
#[derive(Clone, Debug)]
pub enum AttrValue {
    /// A shared stipple bitmap (or none, to clear an outer stipple)
    Stipple(Option<Arc<Bitmap>>),
    Bool(bool),
    Color(Color),
}

impl AttrValue {
    /// Equality as the attribute machinery defines it: bitmap identity
    /// for stipples, value equality otherwise
    pub fn matches(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::Stipple(a), AttrValue::Stipple(b)) => match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            },
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::Color(a), AttrValue::Color(b)) => a == b,
            _ => false,
        }
    }
}

/// One attribute attached to a text run
#[derive(Clone, Debug)]
pub struct TextAttr {
    pub kind: AttrType,
    pub value: AttrValue,
}

impl TextAttr {
    pub fn new(kind: AttrType, value: AttrValue) -> Self {
        Self { kind, value }
    }

    pub fn matches(&self, other: &TextAttr) -> bool {
        self.kind == other.kind && self.value.matches(&other.value)
    }
}

/// The custom attribute kinds the renderer understands
#[derive(Clone, Copy, Debug)]
pub struct TextAttrKinds {
    pub stipple: AttrType,
    pub embossed: AttrType,
    pub emboss_color: AttrType,
}

impl TextAttrKinds {
    /// Register the custom kinds with an attribute registry
    pub fn register(registry: &mut AttrRegistry) -> Self {
        Self {
            stipple: registry.register("veld-stipple"),
            embossed: registry.register("veld-embossed"),
            emboss_color: registry.register("veld-emboss-color"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_is_idempotent() {
        let mut registry = AttrRegistry::new();
        let a = registry.register("veld-stipple");
        let b = registry.register("veld-stipple");
        assert_eq!(a, b);
        assert_eq!(registry.lookup("veld-stipple"), Some(a));
        assert_eq!(registry.lookup("missing"), None);
    }

    #[test]
    fn test_stipple_compares_by_identity() {
        let a = Arc::new(Bitmap::solid(2, 2));
        let b = Arc::new(Bitmap::solid(2, 2));

        let va = AttrValue::Stipple(Some(a.clone()));
        // Content-equal but distinct allocations are not the same attr
        assert!(!va.matches(&AttrValue::Stipple(Some(b))));
        // A clone retains the same bitmap and matches
        assert!(va.matches(&va.clone()));
    }

    #[test]
    fn test_value_kinds_compare_by_value() {
        assert!(AttrValue::Bool(true).matches(&AttrValue::Bool(true)));
        assert!(!AttrValue::Bool(true).matches(&AttrValue::Bool(false)));
        assert!(AttrValue::Color(Color::WHITE).matches(&AttrValue::Color(Color::WHITE)));
        assert!(!AttrValue::Color(Color::WHITE).matches(&AttrValue::Bool(true)));
    }
}
