/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::gc::cell::{GcCell, GcPointer, Trace};
use crate::vm::Runtime;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct SymbolTable {
    pub(crate) symbols: DashMap<&'static str, u32>,
    pub(crate) ids: DashMap<u32, &'static str>,
    key: AtomicU32,
}

impl Drop for SymbolTable {
    fn drop(&mut self) {
        for entry in self.ids.iter_mut() {
            let key = entry.value();
            unsafe {
                let _ = Box::from_raw((*key) as *const _ as *mut str);
            }
        }
        self.symbols.clear();
        self.ids.clear();
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbols: DashMap::with_capacity(0),
            ids: DashMap::with_capacity(0),
            key: AtomicU32::new(128),
        }
    }

    pub fn description(&self, symbol: SymbolID) -> &'static str {
        *self.ids.get(&symbol.0).unwrap()
    }

    pub fn intern(&self, val: impl AsRef<str>) -> SymbolID {
        let string = val.as_ref();
        if let Some(key) = self.symbols.get(string) {
            return SymbolID(*key.value());
        }

        let string = Box::leak(string.to_string().into_boxed_str());
        let make_new_key = || self.key.fetch_add(1, Ordering::Relaxed);
        let key = *self
            .symbols
            .entry(string)
            .or_insert_with(make_new_key)
            .value();
        self.ids.insert(key, string);
        SymbolID(key)
    }

    /// Mint a fresh id that is never deduplicated, for keys created from JS
    /// Symbol primitives: two symbols with the same description stay distinct.
    pub fn make_symbol(&self, description: impl AsRef<str>) -> SymbolID {
        let key = self.key.fetch_add(1, Ordering::Relaxed);
        let string = Box::leak(description.as_ref().to_string().into_boxed_str());
        self.ids.insert(key, string);
        SymbolID(key)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct SymbolID(pub(crate) u32);

impl SymbolID {
    pub const PUBLIC_START: SymbolID = Self(128);
}

/// Property key.
///
/// `Index` is used whenever the key is known to be a uint32 array index so it
/// never touches the interner. `Sym` keys come from JS Symbol primitives and
/// are excluded from string-name enumeration.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Symbol {
    Key(SymbolID),
    Sym(SymbolID),
    Index(u32),
}

impl Symbol {
    pub fn is_index(self) -> bool {
        matches!(self, Self::Index(_))
    }

    pub fn get_index(self) -> u32 {
        match self {
            Self::Index(x) => x,
            _ => unreachable!(),
        }
    }

    pub fn is_key(self) -> bool {
        !self.is_index()
    }

    pub fn is_symbol(self) -> bool {
        matches!(self, Self::Sym(_))
    }

    /// The uint32 array index this key denotes, if its spelling is a
    /// canonical index ("0", "42", but not "007", "-1" or 2^32-1).
    pub fn array_index(self) -> Option<u32> {
        match self {
            Self::Index(index) => Some(index),
            Self::Key(id) => {
                let spelling = symbol_table().description(id);
                if spelling.len() > 1 && spelling.starts_with('0') {
                    return None;
                }
                match spelling.parse::<u32>() {
                    Ok(index) if index != u32::MAX => Some(index),
                    _ => None,
                }
            }
            Self::Sym(_) => None,
        }
    }

    /// Respell an index key as an interned named key; named keys pass through.
    pub fn to_named(self) -> Self {
        match self {
            Self::Index(index) => index.to_string().intern(),
            name => name,
        }
    }
}

unsafe impl Trace for Symbol {}
impl GcCell for Symbol {}

pub const DUMMY_SYMBOL: Symbol = Symbol::Key(SymbolID(0));

static SYMBOL_TABLE: Lazy<SymbolTable> = Lazy::new(SymbolTable::new);

pub fn symbol_table() -> &'static SymbolTable {
    &SYMBOL_TABLE
}

pub trait Internable {
    fn intern(&self) -> Symbol;
}

impl Internable for str {
    fn intern(&self) -> Symbol {
        Symbol::Key(symbol_table().intern(self))
    }
}

impl Internable for String {
    fn intern(&self) -> Symbol {
        Symbol::Key(symbol_table().intern(self))
    }
}

impl Internable for u32 {
    fn intern(&self) -> Symbol {
        Symbol::Index(*self)
    }
}

impl Internable for usize {
    fn intern(&self) -> Symbol {
        if *self as u32 as usize == *self {
            return (*self as u32).intern();
        }
        self.to_string().intern()
    }
}

/// Create a key backed by a fresh JS Symbol primitive.
pub fn make_symbol(description: impl AsRef<str>) -> Symbol {
    Symbol::Sym(symbol_table().make_symbol(description))
}

/// Heap cell wrapping a symbol key so it can travel as a value.
pub struct JsSymbol {
    pub(crate) sym: Symbol,
}

impl JsSymbol {
    pub fn new(rt: &mut Runtime, sym: Symbol) -> GcPointer<Self> {
        rt.heap().allocate(Self { sym })
    }

    pub fn symbol(&self) -> Symbol {
        self.sym
    }
}

unsafe impl Trace for JsSymbol {}
impl GcCell for JsSymbol {}

impl std::fmt::Display for SymbolID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", symbol_table().description(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        assert_eq!("foo".intern(), "foo".intern());
        assert_ne!("foo".intern(), "bar".intern());
    }

    #[test]
    fn index_spellings_parse() {
        assert_eq!("0".intern().array_index(), Some(0));
        assert_eq!("42".intern().array_index(), Some(42));
        assert_eq!("007".intern().array_index(), None);
        assert_eq!("-1".intern().array_index(), None);
        assert_eq!("4294967295".intern().array_index(), None);
        assert_eq!("4294967294".intern().array_index(), Some(4294967294));
        assert_eq!(Symbol::Index(3).array_index(), Some(3));
    }

    #[test]
    fn symbols_with_same_description_are_distinct() {
        let a = make_symbol("desc");
        let b = make_symbol("desc");
        assert_ne!(a, b);
        assert_eq!(a.array_index(), None);
    }

    #[test]
    fn respelling_reaches_the_interner() {
        assert_eq!(Symbol::Index(7).to_named(), "7".intern());
    }
}
