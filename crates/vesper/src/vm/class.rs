/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{
    indexed_elements::IndexedCheckMode,
    method_table::MethodTable,
    object::{EnumerationMode, JsObject},
    property_descriptor::PropertyDescriptor,
    slot::Slot,
    symbol_table::Symbol,
    value::JsValue,
    Runtime,
};
use crate::gc::cell::{GcPointer, Tracer};

/// Static description of an object class: its name, virtual method table, and
/// hooks for classes that carry a payload behind the object header.
pub struct Class {
    /// Class name, `Object.prototype.toString` style.
    pub name: &'static str,
    /// Virtual dispatch table.
    pub method_table: MethodTable,
    /// Marks GC pointers held in the class payload.
    pub trace: Option<fn(&JsObject, &mut dyn Tracer)>,
    /// Drops the class payload when the cell dies.
    pub drop: Option<fn(&mut JsObject)>,
    /// Extra bytes to reserve after the object header for the payload.
    pub additional_size: Option<fn() -> usize>,
    /// Installs the real properties of a lazily initialized object.
    pub lazy_init: Option<fn(&mut GcPointer<JsObject>, &mut Runtime)>,
    /// True when the class overrides the own-indexed hooks, so the generic
    /// paths must not assume the default element representation.
    pub exotic_indexed: bool,
}

/// Define an object class. The short form takes the type and the class name;
/// the long form adds the payload hooks.
#[macro_export]
macro_rules! define_jsclass {
    ($class: ident, $name: ident) => {
        $crate::define_jsclass!($class, $name, None, None, None, None, false);
    };
    ($class: ident, $name: ident, $fin: expr, $trace: expr, $size: expr, $lazy: expr, $exotic: expr) => {
        impl $crate::vm::class::JsClassMethodTable for $class {}
        impl $class {
            pub fn get_class() -> &'static $crate::vm::class::Class {
                static CLASS: $crate::vm::class::Class = $crate::vm::class::Class {
                    name: stringify!($name),
                    method_table: $crate::js_method_table!($class),
                    drop: $fin,
                    trace: $trace,
                    additional_size: $size,
                    lazy_init: $lazy,
                    exotic_indexed: $exotic,
                };
                &CLASS
            }
        }
    };
}

pub trait JsClass {
    fn class() -> &'static Class;
}

/// Default method-table entries; a class overrides an operation by shadowing
/// the associated function with an inherent one of the same name.
#[allow(non_snake_case)]
pub trait JsClassMethodTable {
    fn GetNonIndexedSlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> Result<JsValue, JsValue> {
        JsObject::GetNonIndexedSlotMethod(obj, rt, name, slot)
    }

    fn GetIndexedSlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> Result<JsValue, JsValue> {
        JsObject::GetIndexedSlotMethod(obj, rt, index, slot)
    }

    fn GetNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> bool {
        JsObject::GetNonIndexedPropertySlotMethod(obj, rt, name, slot)
    }

    fn GetIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> bool {
        JsObject::GetIndexedPropertySlotMethod(obj, rt, index, slot)
    }

    fn GetOwnNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> bool {
        JsObject::GetOwnNonIndexedPropertySlotMethod(obj, rt, name, slot)
    }

    fn GetOwnIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> bool {
        JsObject::GetOwnIndexedPropertySlotMethod(obj, rt, index, slot)
    }

    fn PutNonIndexedSlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        val: JsValue,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<(), JsValue> {
        JsObject::PutNonIndexedSlotMethod(obj, rt, name, val, slot, throwable)
    }

    fn PutIndexedSlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        index: u32,
        val: JsValue,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<(), JsValue> {
        JsObject::PutIndexedSlotMethod(obj, rt, index, val, slot, throwable)
    }

    fn DeleteNonIndexedMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        JsObject::DeleteNonIndexedMethod(obj, rt, name, throwable)
    }

    fn DeleteIndexedMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        index: u32,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        JsObject::DeleteIndexedMethod(obj, rt, index, throwable)
    }

    fn DefineOwnNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        name: Symbol,
        desc: &PropertyDescriptor,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        JsObject::DefineOwnNonIndexedPropertySlotMethod(obj, rt, name, desc, slot, throwable)
    }

    fn DefineOwnIndexedPropertySlotMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        index: u32,
        desc: &PropertyDescriptor,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        JsObject::DefineOwnIndexedPropertySlotMethod(obj, rt, index, desc, slot, throwable)
    }

    fn GetPropertyNamesMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        collector: &mut dyn FnMut(Symbol, u32),
        mode: EnumerationMode,
    ) {
        JsObject::GetPropertyNamesMethod(obj, rt, collector, mode)
    }

    fn GetOwnPropertyNamesMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        collector: &mut dyn FnMut(Symbol, u32),
        mode: EnumerationMode,
    ) {
        JsObject::GetOwnPropertyNamesMethod(obj, rt, collector, mode)
    }

    fn CheckAllOwnIndexedMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        mode: IndexedCheckMode,
    ) -> bool {
        JsObject::CheckAllOwnIndexedMethod(obj, rt, mode)
    }
}
