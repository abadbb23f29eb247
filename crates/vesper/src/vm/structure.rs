/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{attributes::*, object::JsObject, symbol_table::*, Runtime};
use crate::gc::cell::{GcCell, GcPointer, Trace, Tracer, WeakRef};
use std::collections::HashMap;

/// Objects with the same property keys in the same order share a *structure*
/// (their hidden class).
///
/// ```js
/// let a = {x: 1, y: 2};
/// let b = {x: 3, y: 4};  // same structure as a
/// ```
///
/// A structure maps property keys to slot offsets and attributes. Adding,
/// updating or deleting a property produces a *new* structure; shared
/// structures record their transitions so the same insertion sequence lands
/// on the same structure, which is what makes `object.slots + offset` loads
/// cacheable at call sites. Structures that stop being shareable (deletes,
/// attribute rewrites, too many transitions) become *unique*: object-private
/// dictionaries that call sites must not cache.
pub struct Structure {
    pub(crate) transitions: TransitionsTable,
    pub(crate) table: Option<GcPointer<TargetTable>>,
    /// Singly linked list of freed slot offsets, reused before growing.
    pub(crate) deleted: DeletedEntryHolder,
    pub(crate) added: (Symbol, MapEntry),
    pub(crate) previous: Option<GcPointer<Structure>>,
    pub(crate) prototype: Option<GcPointer<JsObject>>,
    pub(crate) calculated_size: u32,
    pub(crate) transit_count: u32,
    /// Some named key of this shape spells a uint32 array index.
    pub(crate) index_named: bool,
    pub(crate) for_in_cache: Option<GcPointer<ForInCache>>,
}

#[derive(Copy, Clone)]
pub struct MapEntry {
    pub offset: u32,
    pub attrs: AttrSafe,
}

impl MapEntry {
    pub fn not_found() -> Self {
        Self {
            offset: u32::MAX,
            attrs: AttrSafe::not_found(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.attrs.is_not_found()
    }
}

unsafe impl Trace for MapEntry {}
impl GcCell for MapEntry {}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionKey {
    pub name: Symbol,
    pub attrs: u32,
}

unsafe impl Trace for TransitionKey {}
impl GcCell for TransitionKey {}

pub enum Transition {
    None,
    Pair(TransitionKey, WeakRef<Structure>),
    Table(Option<GcPointer<Table>>),
}

pub struct TransitionsTable {
    pub var: Transition,
    pub enabled: bool,
    pub unique: bool,
    pub indexed: bool,
}

pub type Table = HashMap<TransitionKey, WeakRef<Structure>>;

impl TransitionsTable {
    pub fn new(enabled: bool, indexed: bool) -> Self {
        Self {
            var: Transition::None,
            unique: false,
            indexed,
            enabled,
        }
    }

    pub fn set_indexed(&mut self, indexed: bool) {
        self.indexed = indexed;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn is_enabled_unique_transition(&self) -> bool {
        self.unique
    }

    pub fn enable_unique_transition(&mut self) {
        self.unique = true;
    }

    pub fn insert(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        attrs: AttrSafe,
        map: GcPointer<Structure>,
    ) {
        let key = TransitionKey {
            name,
            attrs: attrs.raw(),
        };
        if let Transition::Pair(old_key, old_map) = &self.var {
            let (old_key, old_map) = (*old_key, *old_map);
            let mut table = rt.heap().allocate(HashMap::new());
            table.insert(old_key, old_map);
            self.var = Transition::Table(Some(table));
        }
        if let Transition::Table(Some(ref mut table)) = self.var {
            let weak = rt.heap().make_weak(map);
            table.insert(key, weak);
        } else {
            let weak = rt.heap().make_weak(map);
            self.var = Transition::Pair(key, weak);
        }
    }

    pub fn find(&self, name: Symbol, attrs: AttrSafe) -> Option<GcPointer<Structure>> {
        let key = TransitionKey {
            name,
            attrs: attrs.raw(),
        };
        match &self.var {
            Transition::Table(Some(table)) => table.get(&key).and_then(|x| x.upgrade()),
            Transition::Pair(k, map) if *k == key => map.upgrade(),
            _ => None,
        }
    }
}

unsafe impl Trace for TransitionsTable {
    fn trace(&self, tracer: &mut dyn Tracer) {
        match &self.var {
            Transition::Pair(_, x) => x.trace(tracer),
            Transition::Table(table) => table.trace(tracer),
            Transition::None => (),
        }
    }
}

#[derive(Clone)]
pub struct DeletedEntryHolder {
    pub entry: Option<GcPointer<DeletedEntry>>,
    pub size: u32,
}

impl DeletedEntryHolder {
    pub fn push(&mut self, rt: &mut Runtime, offset: u32) {
        let entry = rt.heap().allocate(DeletedEntry {
            prev: self.entry,
            offset,
        });
        self.entry = Some(entry);
        self.size += 1;
    }

    pub fn pop(&mut self) -> u32 {
        let head = self.entry.as_ref().expect("no deleted entry to reuse");
        let result = head.offset;
        self.entry = head.prev;
        self.size -= 1;
        result
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn empty(&self) -> bool {
        self.size == 0
    }
}

pub type TargetTable = HashMap<Symbol, MapEntry>;

pub struct DeletedEntry {
    pub prev: Option<GcPointer<DeletedEntry>>,
    pub offset: u32,
}

unsafe impl Trace for DeletedEntry {
    fn trace(&self, tracer: &mut dyn Tracer) {
        self.prev.trace(tracer)
    }
}
impl GcCell for DeletedEntry {}

unsafe impl Trace for DeletedEntryHolder {
    fn trace(&self, tracer: &mut dyn Tracer) {
        self.entry.trace(tracer);
    }
}

/// Cached for-in name list: the shapes of the receiver's prototype chain at
/// build time, followed by the deduplicated enumerable names. Valid while
/// every prototype still has its recorded shape.
pub struct ForInCache {
    pub(crate) prefix: Vec<GcPointer<Structure>>,
    pub(crate) names: Vec<Symbol>,
}

impl ForInCache {
    pub fn names(&self) -> &[Symbol] {
        &self.names
    }

    pub fn prototype_shapes(&self) -> &[GcPointer<Structure>] {
        &self.prefix
    }
}

unsafe impl Trace for ForInCache {
    fn trace(&self, visitor: &mut dyn Tracer) {
        self.prefix.trace(visitor);
    }
}
impl GcCell for ForInCache {}

impl GcCell for Structure {}
unsafe impl Trace for Structure {
    fn trace(&self, tracer: &mut dyn Tracer) {
        self.transitions.trace(tracer);
        self.table.trace(tracer);
        self.prototype.trace(tracer);
        self.deleted.entry.trace(tracer);
        self.previous.trace(tracer);
        self.for_in_cache.trace(tracer);
    }
}

impl Structure {
    fn ctor(rt: &mut Runtime, previous: GcPointer<Self>, unique: bool) -> GcPointer<Self> {
        let mut this = rt.heap().allocate(Structure {
            prototype: previous.prototype,
            previous: Some(previous),
            table: if unique && previous.is_unique() {
                previous.table
            } else {
                None
            },
            transitions: TransitionsTable::new(!unique, previous.transitions.is_indexed()),
            deleted: previous.deleted.clone(),
            added: (DUMMY_SYMBOL, MapEntry::not_found()),
            calculated_size: previous.get_slots_size() as _,
            transit_count: 0,
            index_named: previous.index_named,
            for_in_cache: None,
        });
        this.calculated_size = this.get_slots_size() as _;
        assert!(this.previous.is_some());
        this
    }

    fn ctor1(
        rt: &mut Runtime,
        prototype: Option<GcPointer<JsObject>>,
        unique: bool,
        indexed: bool,
    ) -> GcPointer<Self> {
        rt.heap().allocate(Structure {
            prototype,
            previous: None,
            table: None,
            transitions: TransitionsTable::new(!unique, indexed),
            deleted: DeletedEntryHolder {
                entry: None,
                size: 0,
            },
            added: (DUMMY_SYMBOL, MapEntry::not_found()),
            calculated_size: 0,
            transit_count: 0,
            index_named: false,
            for_in_cache: None,
        })
    }

    pub fn new(rt: &mut Runtime, previous: GcPointer<Self>) -> GcPointer<Structure> {
        Self::ctor(rt, previous, false)
    }

    pub fn new_unique(rt: &mut Runtime, previous: GcPointer<Self>) -> GcPointer<Structure> {
        Self::ctor(rt, previous, true)
    }

    pub fn new_indexed(
        rt: &mut Runtime,
        prototype: Option<GcPointer<JsObject>>,
        indexed: bool,
    ) -> GcPointer<Self> {
        Self::ctor1(rt, prototype, false, indexed)
    }

    pub fn new_unique_indexed(
        rt: &mut Runtime,
        prototype: Option<GcPointer<JsObject>>,
        indexed: bool,
    ) -> GcPointer<Self> {
        Self::ctor1(rt, prototype, true, indexed)
    }
}

impl Structure {
    pub fn is_indexed(&self) -> bool {
        self.transitions.is_indexed()
    }

    pub fn is_unique(&self) -> bool {
        !self.transitions.is_enabled()
    }

    /// Shared-shape structures may be recorded in inline caches and for-in
    /// caches; unique (dictionary) ones never are.
    pub fn is_shaped(&self) -> bool {
        !self.is_unique()
    }

    pub fn has_index_like_properties(&self) -> bool {
        self.index_named
    }

    pub fn prototype(&self) -> Option<&GcPointer<JsObject>> {
        self.prototype.as_ref()
    }

    pub fn get_slots_size(&self) -> usize {
        if let Some(table) = self.table.as_ref() {
            table.len() + self.deleted.size as usize
        } else {
            self.calculated_size as _
        }
    }

    pub fn storage_capacity(&self) -> usize {
        let size = self.get_slots_size();
        if size == 0 {
            0
        } else if size < 8 {
            8
        } else {
            fn clp2(number: usize) -> usize {
                let x = number - 1;
                let x = x | (x >> 1);
                let x = x | (x >> 2);
                let x = x | (x >> 4);
                let x = x | (x >> 8);
                let x = x | (x >> 16);
                x + 1
            }
            clp2(size)
        }
    }

    pub fn is_adding_map(&self) -> bool {
        self.added.0 != DUMMY_SYMBOL
    }

    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }

    pub fn for_in_cache(&self) -> Option<GcPointer<ForInCache>> {
        self.for_in_cache
    }
}

impl GcPointer<Structure> {
    pub fn allocate_table(&mut self, rt: &mut Runtime) {
        let mut stack: Vec<GcPointer<Structure>> = Vec::with_capacity(8);

        if self.is_adding_map() {
            stack.push(*self);
        }

        let mut current = self.previous;
        loop {
            match current {
                Some(cur) => {
                    if cur.has_table() {
                        let cloned = (**cur.table.as_ref().unwrap()).clone();
                        self.table = Some(rt.heap().allocate(cloned));
                        break;
                    } else if cur.is_adding_map() {
                        stack.push(cur);
                    }
                    current = cur.previous;
                }
                None => {
                    self.table = Some(rt.heap().allocate(HashMap::new()));
                    break;
                }
            }
        }
        let mut table = *self.table.as_ref().unwrap();
        for it in stack.iter().rev() {
            table.insert(it.added.0, it.added.1);
        }
        self.previous = None;
    }

    pub fn allocate_table_if_needed(&mut self, rt: &mut Runtime) -> bool {
        if !self.has_table() {
            if self.previous.is_none() {
                return false;
            }
            self.allocate_table(rt);
        }
        true
    }

    pub fn get(&mut self, rt: &mut Runtime, name: Symbol) -> MapEntry {
        if !self.has_table() {
            if self.previous.is_none() {
                return MapEntry::not_found();
            }
            if self.is_adding_map() && self.added.0 == name {
                return self.added.1;
            }
            self.allocate_table(rt);
        }
        self.table
            .as_ref()
            .unwrap()
            .get(&name)
            .copied()
            .unwrap_or_else(MapEntry::not_found)
    }

    fn delete(&mut self, rt: &mut Runtime, name: Symbol) {
        let it = self
            .table
            .as_mut()
            .unwrap()
            .remove(&name)
            .expect("deleting property absent from shape");
        self.deleted.push(rt, it.offset);
    }

    fn change_attributes(&mut self, name: Symbol, attributes: AttrSafe) {
        let it = self
            .table
            .as_mut()
            .unwrap()
            .get_mut(&name)
            .expect("changing attributes of property absent from shape");
        it.attrs = attributes;
    }

    pub fn delete_property_transition(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
    ) -> GcPointer<Structure> {
        let mut map = Structure::new_unique(rt, *self);
        if !map.has_table() {
            map.allocate_table(rt);
        }
        map.for_in_cache = None;
        map.delete(rt, name);
        map
    }

    pub fn change_attributes_transition(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        attributes: AttrSafe,
    ) -> GcPointer<Structure> {
        let mut map = Structure::new_unique(rt, *self);
        if !map.has_table() {
            map.allocate_table(rt);
        }
        map.for_in_cache = None;
        map.change_attributes(name, attributes);
        map
    }

    pub fn change_indexed_transition(&mut self, rt: &mut Runtime) -> GcPointer<Structure> {
        if self.is_unique() {
            let mut map = if self.transitions.is_enabled_unique_transition() {
                Structure::new_unique(rt, *self)
            } else {
                *self
            };
            map.transitions.set_indexed(true);
            map
        } else {
            let mut map = Structure::new_unique(rt, *self);
            map.change_indexed_transition(rt)
        }
    }

    pub fn change_prototype_transition(
        &mut self,
        rt: &mut Runtime,
        prototype: Option<GcPointer<JsObject>>,
    ) -> GcPointer<Structure> {
        if self.is_unique() {
            let mut map = if self.transitions.is_enabled_unique_transition() {
                Structure::new_unique(rt, *self)
            } else {
                *self
            };
            map.prototype = prototype;
            map
        } else {
            let mut map = Structure::new_unique(rt, *self);
            map.change_prototype_transition(rt, prototype)
        }
    }

    pub fn change_extensible_transition(&mut self, rt: &mut Runtime) -> GcPointer<Structure> {
        Structure::new_unique(rt, *self)
    }

    /// Seal support: a unique structure whose every property has lost its
    /// configurable bit.
    pub fn make_all_non_configurable(&mut self, rt: &mut Runtime) -> GcPointer<Structure> {
        self.change_all_attributes(rt, |attrs| {
            attrs.set_configurable(false);
        })
    }

    /// Freeze support: non-configurable, and data properties lose writable.
    pub fn make_all_read_only(&mut self, rt: &mut Runtime) -> GcPointer<Structure> {
        self.change_all_attributes(rt, |attrs| {
            attrs.set_configurable(false);
            if attrs.is_data() {
                attrs.set_writable(false);
            }
        })
    }

    fn change_all_attributes(
        &mut self,
        rt: &mut Runtime,
        update: impl Fn(&mut AttrSafe),
    ) -> GcPointer<Structure> {
        let mut map = Structure::new_unique(rt, *self);
        if !map.has_table() && !map.allocate_table_if_needed(rt) {
            return map;
        }
        map.for_in_cache = None;
        let mut table = *map.table.as_ref().unwrap();
        for entry in table.values_mut() {
            update(&mut entry.attrs);
        }
        map
    }

    pub fn are_all_non_configurable(&mut self, rt: &mut Runtime) -> bool {
        self.check_all_attributes(rt, |attrs| !attrs.is_configurable())
    }

    pub fn are_all_read_only(&mut self, rt: &mut Runtime) -> bool {
        self.check_all_attributes(rt, |attrs| {
            !attrs.is_configurable() && (!attrs.is_data() || !attrs.is_writable())
        })
    }

    fn check_all_attributes(&mut self, rt: &mut Runtime, check: impl Fn(&AttrSafe) -> bool) -> bool {
        if !self.allocate_table_if_needed(rt) {
            return true;
        }
        self.table
            .as_ref()
            .unwrap()
            .values()
            .all(|entry| check(&entry.attrs))
    }

    pub fn get_own_property_names(
        &mut self,
        rt: &mut Runtime,
        include: bool,
        mut collector: impl FnMut(Symbol, u32),
    ) {
        if self.allocate_table_if_needed(rt) {
            for entry in self.table.as_ref().unwrap().iter() {
                if include || entry.1.attrs.is_enumerable() {
                    collector(*entry.0, entry.1.offset);
                }
            }
        }
    }

    pub fn add_property_transition(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        attributes: AttrSafe,
        offset: &mut u32,
    ) -> GcPointer<Structure> {
        let mut entry = MapEntry {
            offset: 0,
            attrs: attributes,
        };
        let index_named = name.array_index().is_some();

        if self.is_unique() {
            if !self.has_table() {
                self.allocate_table(rt);
            }
            let mut map = if self.transitions.is_enabled_unique_transition() {
                Structure::new_unique(rt, *self)
            } else {
                *self
            };
            entry.offset = if !map.deleted.empty() {
                map.deleted.pop()
            } else {
                map.get_slots_size() as _
            };
            map.table.as_mut().unwrap().insert(name, entry);
            map.index_named |= index_named;
            map.for_in_cache = None;
            *offset = entry.offset;
            return map;
        }

        // existing transition check
        if let Some(map) = self.transitions.find(name, attributes) {
            assert!(map.is_adding_map());
            *offset = map.added.1.offset;
            return map;
        }
        if self.transit_count > 64 {
            // stop shape churn, go dictionary
            let mut map = Structure::new_unique(rt, *self);
            return map.add_property_transition(rt, name, attributes, offset);
        }

        let mut map = Structure::new(rt, *self);
        if !map.deleted.empty() {
            let slot = map.deleted.pop();
            map.added = (name, MapEntry {
                offset: slot,
                attrs: attributes,
            });
            map.calculated_size = self.get_slots_size() as _;
        } else {
            map.added = (name, MapEntry {
                offset: self.get_slots_size() as _,
                attrs: attributes,
            });
            map.calculated_size = self.get_slots_size() as u32 + 1;
        }
        map.index_named |= index_named;
        map.transit_count = self.transit_count + 1;
        self.transitions.insert(rt, name, attributes, map);
        *offset = map.added.1.offset;
        assert!(map.get_slots_size() as u32 > map.added.1.offset);
        map
    }

    pub fn change_prototype_with_no_transition(
        &mut self,
        prototype: GcPointer<JsObject>,
    ) -> Self {
        self.prototype = Some(prototype);
        *self
    }

    pub fn set_for_in_cache(&mut self, cache: GcPointer<ForInCache>) {
        self.for_in_cache = Some(cache);
    }

    pub fn clear_for_in_cache(&mut self) {
        self.for_in_cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RuntimeOptions;

    #[test]
    fn same_insertion_order_shares_structure() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let mut root = Structure::new_indexed(&mut rt, None, false);
        let mut offset = 0;
        let a1 = root.add_property_transition(&mut rt, "a".intern(), object_data(), &mut offset);
        assert_eq!(offset, 0);
        let a2 = root.add_property_transition(&mut rt, "a".intern(), object_data(), &mut offset);
        assert!(GcPointer::ptr_eq(&a1, &a2));
        let mut a1 = a1;
        let b1 = a1.add_property_transition(&mut rt, "b".intern(), object_data(), &mut offset);
        assert_eq!(offset, 1);
        assert!(b1.is_shaped());
    }

    #[test]
    fn delete_goes_unique_and_reuses_slots() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let mut root = Structure::new_indexed(&mut rt, None, false);
        let mut offset = 0;
        let mut s = root.add_property_transition(&mut rt, "a".intern(), object_data(), &mut offset);
        let mut s = s.add_property_transition(&mut rt, "b".intern(), object_data(), &mut offset);
        let mut s = s.delete_property_transition(&mut rt, "a".intern());
        assert!(s.is_unique());
        assert!(s.get(&mut rt, "a".intern()).is_not_found());
        let mut offset = u32::MAX;
        let mut s = s.add_property_transition(&mut rt, "c".intern(), object_data(), &mut offset);
        assert_eq!(offset, 0, "freed slot is reused");
        assert!(!s.get(&mut rt, "b".intern()).is_not_found());
    }

    #[test]
    fn index_like_names_are_tracked() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let mut root = Structure::new_indexed(&mut rt, None, false);
        let mut offset = 0;
        let mut s = root.add_property_transition(&mut rt, "x".intern(), object_data(), &mut offset);
        assert!(!s.has_index_like_properties());
        let s2 = s.add_property_transition(&mut rt, "3".intern(), object_data(), &mut offset);
        assert!(s2.has_index_like_properties());
    }

    #[test]
    fn storage_capacity_grows_in_powers_of_two() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let mut s = Structure::new_indexed(&mut rt, None, false);
        assert_eq!(s.storage_capacity(), 0);
        let mut offset = 0;
        for i in 0..9 {
            s = s.add_property_transition(
                &mut rt,
                format!("p{}", i).intern(),
                object_data(),
                &mut offset,
            );
        }
        assert_eq!(s.get_slots_size(), 9);
        assert_eq!(s.storage_capacity(), 16);
    }
}
