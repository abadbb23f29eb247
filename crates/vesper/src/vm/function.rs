/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
//! The one callable kind the object core needs: native functions, which back
//! accessor getters/setters and host callbacks.
use super::{
    arguments::Arguments,
    class::JsClassMethodTable,
    object::JsObject,
    value::JsValue,
    Runtime,
};
use crate::define_jsclass;
use crate::gc::cell::GcPointer;
use std::mem::ManuallyDrop;

pub type NativeFunction = fn(&mut Runtime, &mut Arguments) -> Result<JsValue, JsValue>;

pub struct JsNativeFunction {
    pub(crate) func: NativeFunction,
}

fn drop_native_function(obj: &mut JsObject) {
    unsafe {
        ManuallyDrop::drop(obj.data::<JsNativeFunction>());
    }
}

fn native_function_size() -> usize {
    std::mem::size_of::<JsNativeFunction>()
}

define_jsclass!(
    JsNativeFunction,
    Function,
    Some(drop_native_function),
    None,
    Some(native_function_size),
    None,
    false
);

impl JsNativeFunction {
    pub fn new(rt: &mut Runtime, func: NativeFunction) -> GcPointer<JsObject> {
        let stack = rt.shadowstack();
        crate::letroot!(
            structure = stack,
            rt.global_data().function_structure.unwrap()
        );
        let mut obj = JsObject::new(rt, &structure, Self::get_class());
        obj.set_callable(true);
        unsafe {
            obj.write_data(JsNativeFunction { func });
        }
        obj
    }

    pub fn call(&self, rt: &mut Runtime, args: &mut Arguments) -> Result<JsValue, JsValue> {
        (self.func)(rt, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::letroot;
    use crate::options::RuntimeOptions;

    fn forty_two(_rt: &mut Runtime, _args: &mut Arguments) -> Result<JsValue, JsValue> {
        Ok(JsValue::new(42i32))
    }

    #[test]
    fn native_functions_are_callable_objects() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(f = stack, JsNativeFunction::new(&mut rt, forty_two));
        assert!(JsValue::new(*f).is_callable());
        let mut tmp: [JsValue; 0] = [];
        letroot!(
            args = stack,
            Arguments::new(JsValue::encode_undefined_value(), &mut tmp)
        );
        let result = f.as_function().call(&mut rt, &mut args).unwrap();
        assert_eq!(result.get_int32(), 42);
    }
}
