/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::value::JsValue;
use crate::gc::cell::{Trace, Tracer};

/// Arguments to a callable: the `this` binding plus a borrowed value buffer.
/// Callers root an `Arguments` on the shadow stack for the duration of the
/// call.
pub struct Arguments<'a> {
    pub this: JsValue,
    pub values: &'a mut [JsValue],
}

impl<'a> Arguments<'a> {
    pub fn new(this: JsValue, args: &'a mut [JsValue]) -> Self {
        Self { this, values: args }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Argument at `index`, or undefined when out of range.
    pub fn at(&self, index: usize) -> JsValue {
        if index < self.size() {
            self.values[index]
        } else {
            JsValue::encode_undefined_value()
        }
    }

    pub fn at_mut(&mut self, index: usize) -> &mut JsValue {
        assert!(index < self.size(), "out of bounds argument");
        &mut self.values[index]
    }
}

unsafe impl Trace for Arguments<'_> {
    fn trace(&self, tracer: &mut dyn Tracer) {
        self.this.trace(tracer);
        for value in self.values.iter() {
            value.trace(tracer);
        }
    }
}
