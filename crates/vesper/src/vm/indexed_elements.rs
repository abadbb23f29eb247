/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use std::collections::HashMap;

use crate::gc::cell::{GcPointer, Trace, Tracer};

use super::{
    array_storage::ArrayStorage, attributes::object_data, property_descriptor::StoredSlot,
    value::JsValue, Runtime,
};

const FLAG_DENSE: u32 = 1;
const FLAG_WRITABLE: u32 = 2;

/// Elements above this index never enter the dense vector.
pub const MAX_VECTOR_SIZE: usize = 1024 << 6;

pub type SparseArrayMap = HashMap<u32, StoredSlot>;
pub type DenseArrayMap = ArrayStorage;

/// Mode used by the seal/freeze scans over a subclass's indexed range.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IndexedCheckMode {
    NonConfigurable,
    ReadOnly,
}

/// Integer-indexed backing store. Elements live in a dense vector while they
/// keep default attributes; a define with non-default attributes demotes the
/// store to a sparse map whose entries carry their own attribute records.
pub struct IndexedElements {
    pub(crate) map: Option<GcPointer<SparseArrayMap>>,
    pub(crate) vector: GcPointer<DenseArrayMap>,
    pub(crate) length: u32,
    pub(crate) flags: u32,
}

impl IndexedElements {
    pub fn new(rt: &mut Runtime) -> Self {
        Self {
            length: 0,
            flags: FLAG_DENSE | FLAG_WRITABLE,
            vector: ArrayStorage::new(rt.heap(), 0),
            map: None,
        }
    }

    pub fn make_sparse(&mut self, rt: &mut Runtime) {
        self.flags &= !FLAG_DENSE;
        let mut sparse = self.ensure_map(rt);
        for i in 0..self.vector.size() {
            if !self.vector.at(i).is_empty() {
                sparse.insert(i, StoredSlot::new_raw(*self.vector.at(i), object_data()));
            }
        }
        for i in 0..self.vector.size() {
            *self.vector.at_mut(i) = JsValue::encode_empty_value();
        }
    }

    pub fn make_dense(&mut self) {
        self.flags |= FLAG_DENSE;
        self.map = None;
    }

    pub fn ensure_map(&mut self, rt: &mut Runtime) -> GcPointer<SparseArrayMap> {
        match self.map.as_ref() {
            Some(map) => *map,
            None => {
                let map = rt.heap().allocate(HashMap::with_capacity(8));
                self.map = Some(map);
                map
            }
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn set_length(&mut self, len: u32) {
        self.length = len;
    }

    pub fn dense(&self) -> bool {
        (self.flags & FLAG_DENSE) != 0
    }

    pub fn sparse(&self) -> bool {
        !self.dense()
    }

    pub fn writable(&self) -> bool {
        (self.flags & FLAG_WRITABLE) != 0
    }

    pub fn make_readonly(&mut self) {
        self.flags &= !FLAG_WRITABLE;
    }
}

unsafe impl Trace for IndexedElements {
    fn trace(&self, visitor: &mut dyn Tracer) {
        self.vector.trace(visitor);
        self.map.trace(visitor);
    }
}
