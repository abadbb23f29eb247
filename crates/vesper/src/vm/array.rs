/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{
    attributes::*,
    class::JsClassMethodTable,
    error::{JsRangeError, JsTypeError},
    indexed_elements::{IndexedCheckMode, MAX_VECTOR_SIZE},
    object::{EnumerationMode, JsObject},
    property_descriptor::PropertyDescriptor,
    slot::Slot,
    string::JsString,
    symbol_table::{Internable, Symbol},
    value::JsValue,
    Runtime,
};
use crate::define_jsclass;
use crate::gc::cell::GcPointer;
use crate::letroot;

pub struct JsArray;

define_jsclass!(JsArray, Array);

#[allow(non_snake_case)]
impl JsArray {
    pub fn new(rt: &mut Runtime, length: u32) -> GcPointer<JsObject> {
        let stack = rt.shadowstack();
        letroot!(structure = stack, rt.global_data().array_structure.unwrap());
        let mut arr = JsObject::new(rt, &structure, Self::get_class());
        arr.indexed.set_length(length);
        arr
    }

    pub fn from_slice(rt: &mut Runtime, slice: &[JsValue]) -> GcPointer<JsObject> {
        let stack = rt.shadowstack();
        letroot!(this = stack, Self::new(rt, slice.len() as _));
        for (i, value) in slice.iter().enumerate() {
            let _ = this.put(rt, Symbol::Index(i as _), *value, false);
        }
        *this
    }

    /// `length` reads as a virtual own property whose writability mirrors the
    /// element store.
    pub fn GetOwnNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> bool {
        if name == "length".intern() {
            let attrs = if obj.indexed.writable() {
                create_data(AttrExternal::new(Some(W | INTERNAL_SETTER)))
            } else {
                create_data(AttrExternal::new(Some(INTERNAL_SETTER)))
            };
            slot.set_1(
                JsValue::new(obj.indexed.length() as f64),
                attrs,
                Some(obj.as_dyn()),
            );
            return true;
        }
        JsObject::GetOwnNonIndexedPropertySlotMethod(obj, rt, name, slot)
    }

    /// Writes and defines of `length` route to the length state machine
    /// instead of a slot.
    pub fn DefineOwnNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        desc: &PropertyDescriptor,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if name == "length".intern() {
            return obj.define_length_property(rt, desc, throwable);
        }
        JsObject::DefineOwnNonIndexedPropertySlotMethod(obj, rt, name, desc, slot, throwable)
    }

    pub fn DeleteNonIndexedMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if name == "length".intern() {
            if throwable {
                let msg = JsString::new(rt, "cannot delete 'length'");
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        JsObject::DeleteNonIndexedMethod(obj, rt, name, throwable)
    }

    pub fn GetOwnPropertyNamesMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        collector: &mut dyn FnMut(Symbol, u32),
        mode: EnumerationMode,
    ) {
        if mode == EnumerationMode::IncludeNotEnumerable {
            collector("length".intern(), u32::MAX);
        }
        JsObject::GetOwnPropertyNamesMethod(obj, rt, collector, mode)
    }

    pub fn CheckAllOwnIndexedMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        mode: IndexedCheckMode,
    ) -> bool {
        if mode == IndexedCheckMode::ReadOnly && obj.indexed.writable() {
            return false;
        }
        JsObject::CheckAllOwnIndexedMethod(obj, rt, mode)
    }
}

impl GcPointer<JsObject> {
    fn change_length_writable(
        &mut self,
        rt: &mut Runtime,
        writable: bool,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if !writable {
            self.indexed.make_readonly();
        } else if !self.indexed.writable() {
            if throwable {
                let msg = JsString::new(
                    rt,
                    "changing [[Writable]] of unconfigurable property not allowed",
                );
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// 15.4.5.1 `[[DefineOwnProperty]]` for `"length"`.
    pub(crate) fn define_length_property(
        &mut self,
        rt: &mut Runtime,
        desc: &PropertyDescriptor,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if desc.is_configurable() {
            if throwable {
                let msg = JsString::new(
                    rt,
                    "changing [[Configurable]] of unconfigurable property not allowed",
                );
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        if desc.is_enumerable() {
            if throwable {
                let msg = JsString::new(
                    rt,
                    "changing [[Enumerable]] of unconfigurable property not allowed",
                );
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        if desc.is_accessor() {
            if throwable {
                let msg = JsString::new(
                    rt,
                    "changing description of unconfigurable property not allowed",
                );
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        if desc.is_value_absent() {
            if !desc.is_writable_absent() {
                return self.change_length_writable(rt, desc.is_writable(), throwable);
            }
            return Ok(true);
        }

        let new_len_double = desc.value().to_number(rt)?;
        let new_len = new_len_double as u32;
        if new_len as f64 != new_len_double {
            let msg = JsString::new(rt, "invalid array length");
            return Err(JsValue::new(JsRangeError::new(rt, msg, None)));
        }

        let old_len = self.indexed.length();
        if new_len == old_len {
            if !desc.is_writable_absent() {
                return self.change_length_writable(rt, desc.is_writable(), throwable);
            }
            return Ok(true);
        }
        if !self.indexed.writable() {
            if throwable {
                let msg = JsString::new(rt, "'length' is not writable");
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        let succeeded = self.set_array_length(rt, new_len, throwable)?;
        if !desc.is_writable_absent() {
            return self.change_length_writable(rt, desc.is_writable(), throwable);
        }
        Ok(succeeded)
    }

    fn set_array_length(
        &mut self,
        rt: &mut Runtime,
        len: u32,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if len == u32::MAX {
            let msg = JsString::new(rt, "out of memory for array elements");
            return Err(JsValue::new(JsRangeError::new(rt, msg, None)));
        }
        let mut old = self.indexed.length();
        if len >= old {
            self.indexed.set_length(len);
            return Ok(true);
        }

        if self.indexed.dense() {
            if (len as usize) <= MAX_VECTOR_SIZE && self.indexed.vector.size() > len {
                let stack = rt.shadowstack();
                letroot!(vector = stack, self.indexed.vector);
                vector.mut_handle().resize(rt.heap(), len);
                self.indexed.vector = *vector;
            }
            self.indexed.set_length(len);
            return Ok(true);
        }

        // sparse shrink: walk down deleting, stopping at the first
        // non-configurable element
        if (old - len) < (1 << 24) {
            while len < old {
                old -= 1;
                if !self.delete_indexed_internal(rt, old, false)? {
                    self.indexed.set_length(old + 1);
                    if throwable {
                        let msg = JsString::new(rt, "failed to shrink array");
                        return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                    }
                    return Ok(false);
                }
            }
            self.indexed.set_length(len);
            return Ok(true);
        }

        // huge sparse range: visit only the elements that exist
        let mut indexes = Vec::new();
        {
            let mut collector = |name: Symbol, _: u32| {
                if let Symbol::Index(index) = name {
                    if index >= len {
                        indexes.push(index);
                    }
                }
            };
            self.collect_own_property_names(
                rt,
                &mut collector,
                EnumerationMode::IncludeNotEnumerable,
            );
        }
        indexes.sort_unstable();
        for index in indexes.into_iter().rev() {
            if !self.delete_indexed_internal(rt, index, false)? {
                self.indexed.set_length(index + 1);
                if throwable {
                    let msg = JsString::new(rt, "failed to shrink array");
                    return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                }
                return Ok(false);
            }
        }
        self.indexed.set_length(len);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RuntimeOptions;
    use crate::vm::property_descriptor::DataDescriptor;

    #[test]
    fn element_store_grows_length() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(arr = stack, JsArray::new(&mut rt, 0));
        arr.put(&mut rt, Symbol::Index(3), JsValue::new(7i32), false)
            .unwrap();
        let len = arr.get(&mut rt, "length".intern()).unwrap();
        assert_eq!(len.get_number() as u32, 4);
        let names = arr.get_own_property_names(&mut rt, EnumerationMode::IncludeNotEnumerable);
        assert_eq!(names.len(), 2);
        assert_eq!(names[0], Symbol::Index(3));
        assert_eq!(names[1], "length".intern());
    }

    #[test]
    fn length_write_shrinks_elements() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(arr = stack, JsArray::new(&mut rt, 0));
        for i in 0..5u32 {
            arr.put(&mut rt, Symbol::Index(i), JsValue::new(i), false)
                .unwrap();
        }
        arr.put(&mut rt, "length".intern(), JsValue::new(2i32), false)
            .unwrap();
        assert_eq!(arr.get(&mut rt, "length".intern()).unwrap().get_number() as u32, 2);
        assert!(arr.get(&mut rt, Symbol::Index(3)).unwrap().is_undefined());
        assert_eq!(arr.get(&mut rt, Symbol::Index(1)).unwrap().get_number() as u32, 1);
    }

    #[test]
    fn shrink_stops_at_non_configurable_element() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(arr = stack, JsArray::new(&mut rt, 0));
        for i in 0..5u32 {
            arr.put(&mut rt, Symbol::Index(i), JsValue::new(i), false)
                .unwrap();
        }
        // pin element 2
        let pinned = DataDescriptor::new(JsValue::new(2i32), W | E);
        assert!(arr
            .define_own_property(&mut rt, Symbol::Index(2), &pinned, false)
            .unwrap());
        arr.put(&mut rt, "length".intern(), JsValue::new(0i32), false)
            .unwrap();
        // deletion walked down to the pinned element and stopped above it
        assert_eq!(arr.get(&mut rt, "length".intern()).unwrap().get_number() as u32, 3);
        assert_eq!(arr.get(&mut rt, Symbol::Index(2)).unwrap().get_number() as u32, 2);
        assert!(arr.get(&mut rt, Symbol::Index(4)).unwrap().is_undefined());
    }

    #[test]
    fn readonly_length_rejects_growth() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(arr = stack, JsArray::new(&mut rt, 0));
        arr.put(&mut rt, Symbol::Index(0), JsValue::new(1i32), false)
            .unwrap();
        let freeze_len = PropertyDescriptor::data_descriptor(
            JsValue::new(1i32),
            UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE,
        );
        assert!(arr
            .define_own_property(&mut rt, "length".intern(), &freeze_len, false)
            .unwrap());
        let err = arr.put(&mut rt, Symbol::Index(5), JsValue::new(9i32), true);
        assert!(err.is_err());
        assert_eq!(arr.get(&mut rt, "length".intern()).unwrap().get_number() as u32, 1);
    }
}
