/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::value::JsValue;
use super::Runtime;
use crate::gc::cell::{GcCell, GcPointer, Trace, Tracer};
use crate::gc::Heap;
use std::mem::size_of;

/// A GC-managed resizable vector of values. Used for the property slots of
/// objects and for dense indexed element storage. The payload lives directly
/// after the header, sized by `capacity` at allocation time; growth allocates
/// a fresh cell and repoints the owner.
#[repr(C)]
pub struct ArrayStorage {
    pub(crate) size: u32,
    pub(crate) capacity: u32,
    pub(crate) data: [JsValue; 0],
}

impl ArrayStorage {
    pub fn max_elements() -> usize {
        (u32::MAX as usize - 8) / size_of::<JsValue>()
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn new(heap: &mut Heap, capacity: u32) -> GcPointer<Self> {
        heap.allocate(Self {
            capacity,
            size: 0,
            data: [],
        })
    }

    pub fn with_size(rt: &mut Runtime, size: u32, capacity: u32) -> GcPointer<Self> {
        let mut this = Self::new(rt.heap(), capacity);
        this.resize_within_capacity(size);
        this
    }

    pub fn data(&self) -> *const JsValue {
        self.data.as_ptr()
    }

    pub fn data_mut(&mut self) -> *mut JsValue {
        self.data.as_mut_ptr()
    }

    pub fn as_slice(&self) -> &[JsValue] {
        unsafe { std::slice::from_raw_parts(self.data(), self.size as _) }
    }

    pub fn as_slice_mut(&mut self) -> &mut [JsValue] {
        unsafe { std::slice::from_raw_parts_mut(self.data_mut(), self.size as _) }
    }

    pub fn at(&self, index: u32) -> &JsValue {
        assert!(index < self.size(), "index out of range");
        unsafe { &*self.data().add(index as _) }
    }

    pub fn at_mut(&mut self, index: u32) -> &mut JsValue {
        assert!(index < self.size(), "index out of range");
        unsafe { &mut *self.data_mut().add(index as _) }
    }
}

impl GcPointer<ArrayStorage> {
    pub fn resize_within_capacity(&mut self, new_size: u32) {
        assert!(
            new_size <= self.capacity(),
            "resize_within_capacity beyond capacity"
        );
        let sz = self.size();
        unsafe {
            if new_size > sz {
                JsValue::fill(
                    self.data_mut().add(sz as _),
                    self.data_mut().add(new_size as _),
                    JsValue::encode_empty_value(),
                );
            }
        }
        self.size = new_size;
    }

    pub fn ensure_capacity(&mut self, heap: &mut Heap, capacity: u32) {
        assert!(
            capacity as usize <= ArrayStorage::max_elements(),
            "capacity overflows 32-bit storage"
        );
        if capacity <= self.capacity() {
            return;
        }
        let size = self.size();
        unsafe {
            self.reallocate_to_larger(heap, capacity, size);
        }
    }

    pub fn resize(&mut self, heap: &mut Heap, new_size: u32) {
        if new_size <= self.capacity() {
            self.resize_within_capacity(new_size);
            return;
        }
        let mut capacity = std::cmp::max(self.capacity().saturating_mul(2), new_size);
        if capacity as usize > ArrayStorage::max_elements() {
            capacity = ArrayStorage::max_elements() as u32;
        }
        assert!(new_size <= capacity, "resize beyond maximum storage");
        unsafe {
            self.reallocate_to_larger(heap, capacity, new_size);
        }
    }

    unsafe fn reallocate_to_larger(&mut self, heap: &mut Heap, capacity: u32, new_size: u32) {
        assert!(capacity > self.capacity());
        let mut result = ArrayStorage::new(heap, capacity);
        let copy_size = std::cmp::min(self.size(), new_size);
        {
            let from = self.data_mut();
            let to = result.data_mut();
            JsValue::uninit_copy(from, from.add(copy_size as _), to);
        }
        JsValue::fill(
            result.data_mut().add(copy_size as _),
            result.data_mut().add(new_size as _),
            JsValue::encode_empty_value(),
        );
        result.size = new_size;
        *self = result;
    }
}

unsafe impl Trace for ArrayStorage {
    fn trace(&self, visitor: &mut dyn Tracer) {
        for value in self.as_slice().iter() {
            value.trace(visitor);
        }
    }
}

impl GcCell for ArrayStorage {
    fn compute_size(&self) -> usize {
        (self.capacity as usize * size_of::<JsValue>()) + size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RuntimeOptions;

    #[test]
    fn growth_preserves_values_and_fills_empty() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let mut storage = ArrayStorage::with_size(&mut rt, 2, 2);
        *storage.at_mut(0) = JsValue::new(1i32);
        *storage.at_mut(1) = JsValue::new(2i32);
        storage.resize(rt.heap(), 9);
        assert_eq!(storage.size(), 9);
        assert!(storage.capacity() >= 9);
        assert_eq!(storage.at(0).get_int32(), 1);
        assert_eq!(storage.at(1).get_int32(), 2);
        for i in 2..9 {
            assert!(storage.at(i).is_empty());
        }
    }

    #[test]
    fn ensure_capacity_keeps_size() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let mut storage = ArrayStorage::with_size(&mut rt, 3, 4);
        storage.ensure_capacity(rt.heap(), 32);
        assert_eq!(storage.size(), 3);
        assert!(storage.capacity() >= 32);
    }
}
