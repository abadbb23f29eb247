/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{
    attributes::*,
    class::JsClassMethodTable,
    object::JsObject,
    property_descriptor::DataDescriptor,
    string::JsString,
    structure::Structure,
    symbol_table::Internable,
    value::JsValue,
    Runtime,
};
use crate::define_jsclass;
use crate::gc::cell::GcPointer;
use crate::letroot;

pub struct JsError;
pub struct JsTypeError;
pub struct JsReferenceError;
pub struct JsRangeError;

define_jsclass!(JsError, Error);
define_jsclass!(JsTypeError, TypeError);
define_jsclass!(JsReferenceError, ReferenceError);
define_jsclass!(JsRangeError, RangeError);

fn new_error_with(
    rt: &mut Runtime,
    class: &'static super::class::Class,
    shape: GcPointer<Structure>,
    message: GcPointer<JsString>,
) -> GcPointer<JsObject> {
    let stack = rt.shadowstack();
    letroot!(shape = stack, shape);
    letroot!(obj = stack, JsObject::new(rt, &shape, class));
    let name = JsString::new(rt, class.name);
    let _ = obj.define_own_property(
        rt,
        "name".intern(),
        &*DataDescriptor::new(JsValue::new(name), W | C),
        false,
    );
    if !message.as_str().is_empty() {
        let _ = obj.define_own_property(
            rt,
            "message".intern(),
            &*DataDescriptor::new(JsValue::new(message), W | C),
            false,
        );
    }
    *obj
}

impl JsError {
    pub fn new(
        rt: &mut Runtime,
        message: GcPointer<JsString>,
        structure: Option<GcPointer<Structure>>,
    ) -> GcPointer<JsObject> {
        let shape = structure.unwrap_or_else(|| rt.global_data().error_structure.unwrap());
        new_error_with(rt, Self::get_class(), shape, message)
    }
}

impl JsTypeError {
    pub fn new(
        rt: &mut Runtime,
        message: GcPointer<JsString>,
        structure: Option<GcPointer<Structure>>,
    ) -> GcPointer<JsObject> {
        let shape = structure.unwrap_or_else(|| rt.global_data().type_error_structure.unwrap());
        new_error_with(rt, Self::get_class(), shape, message)
    }
}

impl JsReferenceError {
    pub fn new(
        rt: &mut Runtime,
        message: GcPointer<JsString>,
        structure: Option<GcPointer<Structure>>,
    ) -> GcPointer<JsObject> {
        let shape =
            structure.unwrap_or_else(|| rt.global_data().reference_error_structure.unwrap());
        new_error_with(rt, Self::get_class(), shape, message)
    }
}

impl JsRangeError {
    pub fn new(
        rt: &mut Runtime,
        message: GcPointer<JsString>,
        structure: Option<GcPointer<Structure>>,
    ) -> GcPointer<JsObject> {
        let shape = structure.unwrap_or_else(|| rt.global_data().range_error_structure.unwrap());
        new_error_with(rt, Self::get_class(), shape, message)
    }
}
