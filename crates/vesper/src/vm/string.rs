/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{
    attributes::*,
    class::JsClassMethodTable,
    indexed_elements::IndexedCheckMode,
    object::{EnumerationMode, JsObject},
    slot::Slot,
    symbol_table::{Internable, Symbol},
    value::JsValue,
    Runtime,
};
use crate::define_jsclass;
use crate::gc::cell::{GcCell, GcPointer, Trace, Tracer};
use crate::letroot;
use std::mem::ManuallyDrop;

#[repr(C)]
pub struct JsString {
    pub(crate) string: String,
}

impl JsString {
    pub fn new(rt: &mut Runtime, value: impl AsRef<str>) -> GcPointer<Self> {
        rt.heap().allocate(Self {
            string: value.as_ref().to_owned(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.string
    }

    pub fn is_empty(&self) -> bool {
        self.string.is_empty()
    }

    pub fn len(&self) -> u32 {
        self.string.chars().count() as _
    }
}

unsafe impl Trace for JsString {}
impl GcCell for JsString {}

/// String wrapper object: its characters surface as read-only enumerable
/// indexed properties, plus a non-writable `length`.
pub struct JsStringObject {
    pub value: GcPointer<JsString>,
}

fn drop_string_object(obj: &mut JsObject) {
    unsafe {
        ManuallyDrop::drop(obj.data::<JsStringObject>());
    }
}

fn trace_string_object(obj: &JsObject, visitor: &mut dyn Tracer) {
    obj.data::<JsStringObject>().value.trace(visitor);
}

fn string_object_size() -> usize {
    std::mem::size_of::<JsStringObject>()
}

define_jsclass!(
    JsStringObject,
    String,
    Some(drop_string_object),
    Some(trace_string_object),
    Some(string_object_size),
    None,
    true
);

#[allow(non_snake_case)]
impl JsStringObject {
    pub fn new(rt: &mut Runtime, value: GcPointer<JsString>) -> GcPointer<JsObject> {
        let stack = rt.shadowstack();
        letroot!(value = stack, value);
        letroot!(
            structure = stack,
            rt.global_data().string_structure.unwrap()
        );
        let mut obj = JsObject::new(rt, &structure, Self::get_class());
        unsafe {
            obj.write_data(JsStringObject { value: *value });
        }
        obj
    }

    fn value_of(obj: &GcPointer<JsObject>) -> GcPointer<JsString> {
        obj.data::<JsStringObject>().value
    }

    pub fn GetOwnIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> bool {
        let value = Self::value_of(obj);
        if index < value.len() {
            let ch = value.as_str().chars().nth(index as usize).unwrap();
            let s = JsString::new(rt, ch.to_string());
            slot.set_1(JsValue::new(s), string_indexed(), Some(obj.as_dyn()));
            return true;
        }
        JsObject::GetOwnIndexedPropertySlotMethod(obj, rt, index, slot)
    }

    pub fn GetOwnNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> bool {
        if name == "length".intern() {
            let value = Self::value_of(obj);
            slot.set_1(
                JsValue::new(value.len() as f64),
                string_length(),
                Some(obj.as_dyn()),
            );
            return true;
        }
        JsObject::GetOwnNonIndexedPropertySlotMethod(obj, rt, name, slot)
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
        let value = Self::value_of(obj);
        for i in 0..value.len() {
            collector(Symbol::Index(i), i);
        }
        JsObject::GetOwnPropertyNamesMethod(obj, rt, collector, mode)
    }

    pub fn DeleteIndexedMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        index: u32,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        let value = Self::value_of(obj);
        if index < value.len() {
            if throwable {
                let msg = JsString::new(rt, "cannot delete string character");
                return Err(JsValue::new(super::error::JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        JsObject::DeleteIndexedMethod(obj, rt, index, throwable)
    }

    pub fn CheckAllOwnIndexedMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        mode: IndexedCheckMode,
    ) -> bool {
        // Characters are data properties without writable or configurable.
        JsObject::CheckAllOwnIndexedMethod(obj, rt, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RuntimeOptions;
    use crate::vm::property_descriptor::DataDescriptor;

    #[test]
    fn characters_read_as_indexed_properties() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(s = stack, JsString::new(&mut rt, "hi"));
        letroot!(obj = stack, JsStringObject::new(&mut rt, *s));
        let ch = obj.get(&mut rt, Symbol::Index(0)).unwrap();
        assert!(ch.is_jsstring());
        let len = obj.get(&mut rt, "length".intern()).unwrap();
        assert_eq!(len.get_number() as u32, 2);
        assert!(obj.get(&mut rt, Symbol::Index(2)).unwrap().is_undefined());
    }

    #[test]
    fn characters_reject_redefinition() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(s = stack, JsString::new(&mut rt, "str"));
        letroot!(obj = stack, JsStringObject::new(&mut rt, *s));
        let desc = DataDescriptor::new(JsValue::new(0i32), W | E | C);
        let result = obj.define_own_property(&mut rt, Symbol::Index(0), &desc, false);
        assert_eq!(result.unwrap(), false);
        // writing a character is silently dropped in sloppy mode
        assert!(obj
            .put(&mut rt, Symbol::Index(0), JsValue::new(9i32), false)
            .is_ok());
        assert!(obj.get(&mut rt, Symbol::Index(0)).unwrap().is_jsstring());
    }

    #[test]
    fn delete_of_character_fails() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(s = stack, JsString::new(&mut rt, "x"));
        letroot!(obj = stack, JsStringObject::new(&mut rt, *s));
        assert_eq!(obj.delete(&mut rt, Symbol::Index(0), false).unwrap(), false);
        assert!(obj.delete(&mut rt, Symbol::Index(5), false).unwrap());
    }
}
