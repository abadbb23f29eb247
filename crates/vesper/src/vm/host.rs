/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
//! Host objects: named property access delegates to embedder callbacks.
use super::{
    class::JsClassMethodTable,
    object::{EnumerationMode, JsObject, OBJ_FLAG_FAST_INDEX, OBJ_FLAG_HOST},
    slot::Slot,
    symbol_table::Symbol,
    value::JsValue,
    Runtime,
};
use crate::define_jsclass;
use crate::gc::cell::{GcPointer, Trace, Tracer};
use crate::letroot;
use std::mem::ManuallyDrop;

/// Embedder callbacks backing a host object. Names the object's class does
/// not own route through these; the reported name set is treated as
/// unordered.
pub trait HostObjectDelegate: Trace {
    fn host_get(&mut self, rt: &mut Runtime, name: Symbol) -> Result<JsValue, JsValue>;
    fn host_set(&mut self, rt: &mut Runtime, name: Symbol, value: JsValue)
        -> Result<(), JsValue>;
    fn host_own_names(&mut self, rt: &mut Runtime) -> Vec<Symbol>;
}

pub struct JsHostObject {
    pub(crate) delegate: Box<dyn HostObjectDelegate>,
}

fn drop_host_object(obj: &mut JsObject) {
    unsafe {
        ManuallyDrop::drop(obj.data::<JsHostObject>());
    }
}

fn trace_host_object(obj: &JsObject, visitor: &mut dyn Tracer) {
    (*obj.data::<JsHostObject>()).delegate.trace(visitor);
}

fn host_object_size() -> usize {
    std::mem::size_of::<JsHostObject>()
}

define_jsclass!(
    JsHostObject,
    HostObject,
    Some(drop_host_object),
    Some(trace_host_object),
    Some(host_object_size),
    None,
    true
);

#[allow(non_snake_case)]
impl JsHostObject {
    pub fn new(
        rt: &mut Runtime,
        prototype: Option<GcPointer<JsObject>>,
        delegate: Box<dyn HostObjectDelegate>,
    ) -> GcPointer<JsObject> {
        let stack = rt.shadowstack();
        letroot!(structure = stack, rt.structure_for_prototype(prototype));
        let mut obj = JsObject::new(rt, &structure, Self::get_class());
        obj.flags |= OBJ_FLAG_HOST;
        obj.flags &= !OBJ_FLAG_FAST_INDEX;
        unsafe {
            obj.write_data(JsHostObject { delegate });
        }
        obj
    }

    /// Class names first, then delegate names not shadowed by the class.
    pub fn GetOwnPropertyNamesMethod(
        obj: &mut GcPointer<JsObject>,
        rt: &mut Runtime,
        collector: &mut dyn FnMut(Symbol, u32),
        mode: EnumerationMode,
    ) {
        JsObject::GetOwnPropertyNamesMethod(obj, rt, collector, mode);
        let names = {
            let host = obj.data::<JsHostObject>();
            host.delegate.host_own_names(rt)
        };
        for name in names {
            if obj.structure.get(rt, name).is_not_found() {
                collector(name, u32::MAX);
            }
        }
    }

    /// Host objects own no indexed range; indexed keys are respelled to
    /// named symbols before dispatch.
    pub fn GetOwnIndexedPropertySlotMethod(
        _obj: &mut GcPointer<JsObject>,
        _rt: &mut Runtime,
        _index: u32,
        _slot: &mut Slot,
    ) -> bool {
        false
    }
}

impl GcPointer<JsObject> {
    pub fn is_host_object(&self) -> bool {
        (self.flags & OBJ_FLAG_HOST) != 0
    }

    pub(crate) fn host_delegate_get(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
    ) -> Result<JsValue, JsValue> {
        assert!(self.is_host_object());
        let host = self.data::<JsHostObject>();
        host.delegate.host_get(rt, name)
    }

    pub(crate) fn host_delegate_set(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        value: JsValue,
    ) -> Result<(), JsValue> {
        assert!(self.is_host_object());
        let host = self.data::<JsHostObject>();
        host.delegate.host_set(rt, name, value)
    }
}
