/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use std::ops::{Deref, DerefMut};

macro_rules! d {
    ($($name : ident = $val: expr),*) => {
        $(
            pub const $name : u32 = $val;
        )*
    }
}

d! {
    NONE = 0,
    WRITABLE = 1,
    ENUMERABLE = 2,
    CONFIGURABLE = 4,
    DATA = 8,
    ACCESSOR = 16,
    EMPTY = 32,
    UNDEF_WRITABLE = 64,
    UNDEF_ENUMERABLE = 128,
    UNDEF_CONFIGURABLE = 256,
    UNDEF_VALUE = 512,
    UNDEF_GETTER = 1024,
    UNDEF_SETTER = 2048,
    INTERNAL_SETTER = 4096,
    BUILTIN = 8192,
    HOST = 16384,

    // short options
    N = NONE,
    W = WRITABLE,
    E = ENUMERABLE,
    C = CONFIGURABLE
}

pub type Raw = u32;

pub const TYPE_MASK: Raw = DATA | ACCESSOR;
pub const DATA_ATTR_MASK: Raw = DATA | WRITABLE | ENUMERABLE | CONFIGURABLE;
pub const ACCESSOR_ATTR_MASK: Raw = ACCESSOR | ENUMERABLE | CONFIGURABLE;

pub const DEFAULT: Raw = UNDEF_WRITABLE
    | UNDEF_ENUMERABLE
    | UNDEF_CONFIGURABLE
    | UNDEF_VALUE
    | UNDEF_GETTER
    | UNDEF_SETTER;
pub const UNDEFS: Raw = EMPTY | DEFAULT;

pub fn remove_undefs(attrs: Raw) -> Raw {
    attrs & !UNDEFS
}

/// Attribute record as it appears in `defineProperty` requests: each of the
/// boolean attributes has a companion "absent" bit recording whether the
/// caller mentioned it at all.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttrExternal {
    pub raw: Raw,
}

impl AttrExternal {
    pub fn new(attrs: Option<Raw>) -> Self {
        Self {
            raw: attrs.unwrap_or(NONE),
        }
    }

    pub fn ty(&self) -> Raw {
        self.raw & TYPE_MASK
    }

    pub fn is_enumerable(&self) -> bool {
        (self.raw & ENUMERABLE) != 0
    }

    pub fn is_enumerable_absent(&self) -> bool {
        (self.raw & UNDEF_ENUMERABLE) != 0
    }

    pub fn set_enumerable(&mut self, val: bool) {
        if val {
            self.raw = (self.raw & !UNDEF_ENUMERABLE) | ENUMERABLE;
        } else {
            self.raw = (self.raw & !UNDEF_ENUMERABLE) & !ENUMERABLE;
        }
    }

    pub fn is_configurable(&self) -> bool {
        (self.raw & CONFIGURABLE) != 0
    }

    pub fn is_configurable_absent(&self) -> bool {
        (self.raw & UNDEF_CONFIGURABLE) != 0
    }

    pub fn set_configurable(&mut self, val: bool) {
        if val {
            self.raw = (self.raw & !UNDEF_CONFIGURABLE) | CONFIGURABLE;
        } else {
            self.raw = (self.raw & !UNDEF_CONFIGURABLE) & !CONFIGURABLE;
        }
    }

    pub fn is_writable(&self) -> bool {
        (self.raw & WRITABLE) != 0
    }

    pub fn is_writable_absent(&self) -> bool {
        (self.raw & UNDEF_WRITABLE) != 0
    }

    pub fn set_writable(&mut self, val: bool) {
        if val {
            self.raw = (self.raw & !UNDEF_WRITABLE) | WRITABLE;
        } else {
            self.raw = (self.raw & !UNDEF_WRITABLE) & !WRITABLE;
        }
    }

    pub fn is_accessor(&self) -> bool {
        (self.raw & ACCESSOR) != 0
    }

    pub fn set_accessor(&mut self) {
        self.raw &= !(DATA | WRITABLE);
        self.raw |= ACCESSOR;
    }

    pub fn is_data(&self) -> bool {
        (self.raw & DATA) != 0
    }

    pub fn set_data(&mut self) {
        self.raw &= !ACCESSOR;
        self.raw |= DATA;
    }

    pub fn is_internal_setter(&self) -> bool {
        (self.raw & INTERNAL_SETTER) != 0
    }

    pub fn is_builtin(&self) -> bool {
        (self.raw & BUILTIN) != 0
    }

    pub fn is_host(&self) -> bool {
        (self.raw & HOST) != 0
    }

    pub fn is_generic(&self) -> bool {
        (self.raw & (DATA | ACCESSOR | EMPTY)) == 0
    }

    pub fn is_empty(&self) -> bool {
        (self.raw & EMPTY) != 0
    }

    pub fn is_value_absent(&self) -> bool {
        (self.raw & UNDEF_VALUE) != 0
    }

    pub fn is_getter_absent(&self) -> bool {
        (self.raw & UNDEF_GETTER) != 0
    }

    pub fn is_setter_absent(&self) -> bool {
        (self.raw & UNDEF_SETTER) != 0
    }

    pub fn is_absent(&self) -> bool {
        self.is_configurable_absent() && self.is_enumerable_absent() && self.is_generic()
    }

    pub fn is_default(&self) -> bool {
        let def = CONFIGURABLE | ENUMERABLE | DATA | WRITABLE;
        (self.raw & def) == def
    }

    fn fill_enumerable_and_configurable(&mut self) {
        if self.is_configurable_absent() {
            self.raw &= !UNDEF_CONFIGURABLE;
        }
        if self.is_enumerable_absent() {
            self.raw &= !UNDEF_ENUMERABLE;
        }
    }
}

/// Attribute record as stored in a hidden class: every absent bit has been
/// resolved, so the raw value is directly comparable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttrSafe {
    pub attributes: AttrExternal,
}

impl AttrSafe {
    pub fn raw(&self) -> u32 {
        self.attributes.raw
    }

    pub fn new(attr: u32) -> Self {
        Self {
            attributes: AttrExternal::new(Some(remove_undefs(attr))),
        }
    }

    pub fn not_found() -> Self {
        Self {
            attributes: AttrExternal::new(None),
        }
    }

    pub fn is_simple_data(&self) -> bool {
        let value = DATA | WRITABLE;
        (self.raw() & value) == value && !self.is_host() && !self.is_internal_setter()
    }

    pub fn un_safe(attr: AttrExternal) -> Self {
        Self::new(attr.raw)
    }

    pub fn is_not_found(&self) -> bool {
        self.raw() == NONE
    }
}

impl Deref for AttrSafe {
    type Target = AttrExternal;
    fn deref(&self) -> &Self::Target {
        &self.attributes
    }
}

impl DerefMut for AttrSafe {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.attributes
    }
}

pub fn create_data(mut attrs: AttrExternal) -> AttrSafe {
    attrs.fill_enumerable_and_configurable();
    attrs.set_data();
    if attrs.is_writable_absent() {
        attrs.set_writable(false);
    }
    AttrSafe::new(attrs.raw)
}

pub fn create_accessor(mut attrs: AttrExternal) -> AttrSafe {
    attrs.fill_enumerable_and_configurable();
    attrs.set_accessor();
    AttrSafe::new(attrs.raw)
}

pub fn object_data() -> AttrSafe {
    create_data(AttrExternal::new(Some(
        WRITABLE | ENUMERABLE | CONFIGURABLE,
    )))
}

pub fn object_accessor() -> AttrSafe {
    create_accessor(AttrExternal::new(Some(ENUMERABLE | CONFIGURABLE)))
}

/// Descriptor synthesized for a name a host object's class does not own.
pub fn host_data() -> AttrSafe {
    AttrSafe::new(DATA | WRITABLE | HOST)
}

pub fn string_length() -> AttrSafe {
    create_data(AttrExternal::new(None))
}

pub fn string_indexed() -> AttrSafe {
    create_data(AttrExternal::new(Some(ENUMERABLE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_defaults_resolve_absent_bits() {
        let attrs = create_data(AttrExternal::new(None));
        assert!(attrs.is_data());
        assert!(!attrs.is_writable());
        assert!(!attrs.is_enumerable());
        assert!(!attrs.is_configurable());
        assert_eq!(attrs.raw() & UNDEFS, 0);
    }

    #[test]
    fn accessor_drops_writable() {
        let mut ext = AttrExternal::new(Some(WRITABLE | ENUMERABLE));
        ext.set_accessor();
        assert!(!ext.is_writable());
        assert!(ext.is_accessor());
        assert!(!ext.is_data());
    }

    #[test]
    fn mention_bits_cleared_by_set() {
        let mut ext = AttrExternal::new(Some(DEFAULT));
        assert!(ext.is_writable_absent());
        ext.set_writable(true);
        assert!(!ext.is_writable_absent());
        assert!(ext.is_writable());
        ext.set_writable(false);
        assert!(!ext.is_writable());
    }

    #[test]
    fn host_descriptor_is_writable_data() {
        let attrs = host_data();
        assert!(attrs.is_host());
        assert!(attrs.is_data());
        assert!(attrs.is_writable());
        assert!(!attrs.is_simple_data());
    }
}
