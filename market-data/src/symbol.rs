//! Process-wide symbol interning.
//!
//! Symbols are interned once (at feed configuration time) and passed around
//! as small `Copy` handles afterwards. The hot path only compares and hashes
//! a `u32`; resolving a handle back to its name takes a read lock on the
//! append-only name table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

/// Interned symbol handle.
///
/// Handles are indices into a process-wide, append-only table of names.
/// Equality and ordering are by handle; use [`Symbol::as_str`] for the
/// textual name (e.g. when building canonical pair keys).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

#[derive(Default)]
struct SymbolTable {
    names: Vec<&'static str>,
    index: HashMap<&'static str, u32>,
}

fn table() -> &'static RwLock<SymbolTable> {
    static TABLE: OnceLock<RwLock<SymbolTable>> = OnceLock::new();
    TABLE.get_or_init(Default::default)
}

impl Symbol {
    /// Interns a symbol name, returning its handle.
    ///
    /// Interning the same name twice returns the same handle. Names are
    /// leaked into the process-lifetime table; the set of symbols is
    /// expected to be small and fixed at startup.
    pub fn intern(name: &str) -> Symbol {
        let table = table();
        if let Some(&id) = table.read().unwrap().index.get(name) {
            return Symbol(id);
        }
        let mut guard = table.write().unwrap();
        // Re-check: another thread may have interned between the locks.
        if let Some(&id) = guard.index.get(name) {
            return Symbol(id);
        }
        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let id = guard.names.len() as u32;
        guard.names.push(name);
        guard.index.insert(name, id);
        Symbol(id)
    }

    /// Returns the symbol's name.
    #[inline]
    pub fn as_str(self) -> &'static str {
        table().read().unwrap().names[self.0 as usize]
    }

    /// Returns the raw handle index.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({} {:?})", self.0, self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let a = Symbol::intern("AAPL");
        let b = Symbol::intern("AAPL");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "AAPL");
    }

    #[test]
    fn test_distinct_names_distinct_handles() {
        let a = Symbol::intern("intern_test_x");
        let b = Symbol::intern("intern_test_y");
        assert_ne!(a, b);
        assert_ne!(a.index(), b.index());
        assert_eq!(b.as_str(), "intern_test_y");
    }

    #[test]
    fn test_concurrent_interning() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| Symbol::intern("intern_test_race")))
            .collect();
        let symbols: Vec<Symbol> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(symbols.windows(2).all(|w| w[0] == w[1]));
    }
}
