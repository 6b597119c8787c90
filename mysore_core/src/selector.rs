//! Selector interning.
//!
//! A selector is a small integer identity for a method name. Interning the
//! same name always yields the same selector, so method dispatch compares
//! integers instead of strings. The name-to-selector mapping persists for
//! the lifetime of the process.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::LazyLock;

/// An interned method-name identity.
///
/// Selectors compare equal by value iff the source names were equal. The
/// zero selector is never handed out, so `0` can serve as a "no selector"
/// sentinel in raw contexts.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Selector(u32);

impl Selector {
    /// The raw integer identity.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Reconstruct a selector from its raw identity.
    ///
    /// Meaningful only for values previously produced by [`intern`].
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match name_of(*self) {
            Some(name) => write!(f, "Selector({}: {name})", self.0),
            None => write!(f, "Selector({})", self.0),
        }
    }
}

/// Process-wide selector table.
///
/// Interning is monotone (selectors are dense, starting at 1) and
/// idempotent. A reverse table keeps the names for diagnostics.
pub struct SelectorTable {
    /// Name to selector.
    selectors: RwLock<FxHashMap<String, Selector>>,
    /// Selector (minus one) to name.
    names: RwLock<Vec<String>>,
}

impl SelectorTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            selectors: RwLock::new(FxHashMap::default()),
            names: RwLock::new(Vec::new()),
        }
    }

    /// Intern a method name, returning its selector.
    pub fn intern(&self, name: &str) -> Selector {
        // Fast path: already interned.
        {
            let selectors = self.selectors.read();
            if let Some(&sel) = selectors.get(name) {
                return sel;
            }
        }

        let mut selectors = self.selectors.write();
        // Double-check after acquiring the write lock.
        if let Some(&sel) = selectors.get(name) {
            return sel;
        }

        let mut names = self.names.write();
        names.push(name.to_owned());
        let sel = Selector(names.len() as u32);
        selectors.insert(name.to_owned(), sel);
        sel
    }

    /// Look up the name a selector was interned from.
    #[must_use]
    pub fn name_of(&self, sel: Selector) -> Option<String> {
        let names = self.names.read();
        names.get(sel.0.checked_sub(1)? as usize).cloned()
    }

    /// Number of interned selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// Whether no selector has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SelectorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorTable")
            .field("count", &self.len())
            .finish()
    }
}

/// The process-wide selector table.
static GLOBAL_SELECTORS: LazyLock<SelectorTable> = LazyLock::new(SelectorTable::new);

/// Intern a method name in the process-wide table.
#[inline]
pub fn intern(name: &str) -> Selector {
    GLOBAL_SELECTORS.intern(name)
}

/// Name a selector from the process-wide table was interned from.
#[inline]
#[must_use]
pub fn name_of(sel: Selector) -> Option<String> {
    GLOBAL_SELECTORS.name_of(sel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let table = SelectorTable::new();
        let a = table.intern("add");
        let b = table.intern("add");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_distinct_names_distinct_selectors() {
        let table = SelectorTable::new();
        let a = table.intern("add");
        let b = table.intern("sub");
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_selectors_are_monotone() {
        let table = SelectorTable::new();
        let a = table.intern("first");
        let b = table.intern("second");
        let c = table.intern("third");
        assert!(a.raw() < b.raw());
        assert!(b.raw() < c.raw());
    }

    #[test]
    fn test_selectors_start_at_one() {
        let table = SelectorTable::new();
        let sel = table.intern("anything");
        assert_eq!(sel.raw(), 1);
    }

    #[test]
    fn test_name_of_roundtrip() {
        let table = SelectorTable::new();
        let sel = table.intern("charAt");
        assert_eq!(table.name_of(sel).as_deref(), Some("charAt"));
    }

    #[test]
    fn test_name_of_unknown() {
        let table = SelectorTable::new();
        assert_eq!(table.name_of(Selector::from_raw(99)), None);
        assert_eq!(table.name_of(Selector::from_raw(0)), None);
    }

    #[test]
    fn test_global_intern() {
        let a = intern("global_sel_test");
        let b = intern("global_sel_test");
        assert_eq!(a, b);
        assert_eq!(name_of(a).as_deref(), Some("global_sel_test"));
    }

    #[test]
    fn test_empty_table() {
        let table = SelectorTable::new();
        assert!(table.is_empty());
        table.intern("x");
        assert!(!table.is_empty());
    }
}
