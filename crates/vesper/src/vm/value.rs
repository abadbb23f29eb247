/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::gc::cell::{GcCell, GcPointer, Trace, Tracer};
use crate::vm::object::JsObject;
use crate::vm::string::JsString;
use crate::vm::Runtime;

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        // NaN boxing relies on pointers fitting in the 48-bit payload.
    } else {
        compile_error!("only 64-bit targets are supported");
    }
}

pub type TagKind = u32;

pub const FIRST_TAG: TagKind = 0xfff9;
pub const LAST_TAG: TagKind = 0xffff;
pub const EMPTY_INVALID_TAG: u32 = FIRST_TAG;
pub const UNDEFINED_NULL_TAG: u32 = FIRST_TAG + 1;
pub const BOOL_TAG: u32 = FIRST_TAG + 2;
pub const INT32_TAG: u32 = FIRST_TAG + 3;
pub const OBJECT_TAG: u32 = FIRST_TAG + 4;

/// A NaN-boxed encoded value.
///
/// Doubles occupy the canonical f64 space; everything else lives in the
/// otherwise-unused quiet-NaN tag range with a 48-bit payload.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct JsValue(u64);

impl JsValue {
    pub const NUM_TAG_EXP_BITS: u32 = 16;
    pub const NUM_DATA_BITS: u32 = 64 - Self::NUM_TAG_EXP_BITS;
    pub const DATA_MASK: u64 = (1 << Self::NUM_DATA_BITS as u64) - 1;

    #[inline]
    pub const fn from_raw(x: u64) -> Self {
        Self(x)
    }

    #[inline]
    pub const fn get_raw(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn get_tag(&self) -> TagKind {
        (self.0 >> Self::NUM_DATA_BITS as u64) as u32
    }

    #[inline]
    const fn internal_new(val: u64, tag: TagKind) -> Self {
        Self(val | ((tag as u64) << Self::NUM_DATA_BITS))
    }

    #[inline]
    pub fn encode_object_value<T: GcCell + ?Sized>(val: GcPointer<T>) -> Self {
        Self::internal_new(
            unsafe { std::mem::transmute::<_, usize>(val) } as u64,
            OBJECT_TAG,
        )
    }

    #[inline]
    pub const fn encode_bool_value(val: bool) -> Self {
        Self::internal_new(val as u64, BOOL_TAG)
    }

    #[inline]
    pub fn encode_int32(x: i32) -> Self {
        Self::internal_new(x as u32 as u64, INT32_TAG)
    }

    #[inline]
    pub const fn encode_undefined_value() -> Self {
        Self::internal_new(0, UNDEFINED_NULL_TAG)
    }

    #[inline]
    pub const fn encode_null_value() -> Self {
        Self::internal_new(1, UNDEFINED_NULL_TAG)
    }

    #[inline]
    pub const fn encode_empty_value() -> Self {
        Self::internal_new(0, EMPTY_INVALID_TAG)
    }

    #[inline]
    pub fn encode_f64_value(x: f64) -> Self {
        Self::from_raw(x.to_bits())
    }

    #[inline]
    pub const fn encode_nan_value() -> Self {
        Self::from_raw(0x7ff8_0000_0000_0000)
    }

    #[inline]
    pub fn encode_untrusted_f64_value(val: f64) -> Self {
        // Arbitrary NaN payloads would collide with the tag space.
        if val.is_nan() {
            return Self::encode_nan_value();
        }
        Self::encode_f64_value(val)
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.0 == Self::encode_undefined_value().0
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == Self::encode_null_value().0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == Self::encode_empty_value().0
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        self.get_tag() == BOOL_TAG
    }

    #[inline]
    pub fn is_int32(&self) -> bool {
        self.get_tag() == INT32_TAG
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        self.get_tag() == OBJECT_TAG
    }

    #[inline]
    pub fn is_double(&self) -> bool {
        self.0 < ((FIRST_TAG as u64) << Self::NUM_DATA_BITS as u64)
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        self.is_double() || self.is_int32()
    }

    #[inline]
    pub fn get_bool(&self) -> bool {
        assert!(self.is_bool());
        (self.0 & 0x1) != 0
    }

    #[inline]
    pub fn get_int32(&self) -> i32 {
        assert!(self.is_int32());
        self.0 as u32 as i32
    }

    #[inline]
    pub fn get_double(&self) -> f64 {
        assert!(self.is_double());
        f64::from_bits(self.0)
    }

    /// Number value; int32 payloads widen to f64.
    #[inline]
    pub fn get_number(&self) -> f64 {
        if self.is_int32() {
            return self.get_int32() as f64;
        }
        self.get_double()
    }

    #[inline]
    pub fn get_object(&self) -> GcPointer<dyn GcCell> {
        assert!(self.is_object());
        unsafe {
            std::mem::transmute::<usize, GcPointer<dyn GcCell>>((self.0 & Self::DATA_MASK) as usize)
        }
    }

    #[inline]
    pub fn is_jsobject(&self) -> bool {
        self.is_object() && self.get_object().is::<JsObject>()
    }

    #[inline]
    pub fn get_jsobject(&self) -> GcPointer<JsObject> {
        assert!(self.is_jsobject());
        unsafe { self.get_object().downcast_unchecked() }
    }

    #[inline]
    pub fn is_jsstring(&self) -> bool {
        self.is_object() && self.get_object().is::<JsString>()
    }

    #[inline]
    pub fn is_callable(&self) -> bool {
        self.is_jsobject() && self.get_jsobject().is_callable()
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_object() || self.is_jsstring()
    }

    pub fn new<T: Into<Self>>(x: T) -> Self {
        x.into()
    }

    /// SameValue: NaN equals NaN, +0 and -0 are distinct, strings compare by
    /// content, everything else by identity.
    pub fn same_value(x: JsValue, y: JsValue) -> bool {
        if x.is_number() {
            if !y.is_number() {
                return false;
            }
            let a = x.get_number();
            let b = y.get_number();
            if a.is_nan() && b.is_nan() {
                return true;
            }
            return a.to_bits() == b.to_bits();
        }
        if x.is_jsstring() && y.is_jsstring() {
            return unsafe {
                x.get_object().downcast_unchecked::<JsString>().as_str()
                    == y.get_object().downcast_unchecked::<JsString>().as_str()
            };
        }
        x.get_raw() == y.get_raw()
    }

    pub fn to_number(self, rt: &mut Runtime) -> Result<f64, JsValue> {
        if self.is_number() {
            return Ok(self.get_number());
        }
        if self.is_bool() {
            return Ok(self.get_bool() as i32 as f64);
        }
        if self.is_undefined() {
            return Ok(f64::NAN);
        }
        if self.is_null() {
            return Ok(0.0);
        }
        if self.is_jsstring() {
            let s = unsafe { self.get_object().downcast_unchecked::<JsString>() };
            let trimmed = s.as_str().trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            if let Ok(n) = trimmed.parse::<f64>() {
                return Ok(n);
            }
            return Ok(f64::NAN);
        }
        Err(JsValue::new(
            rt.new_type_error("cannot convert value to number"),
        ))
    }

    #[inline]
    pub unsafe fn fill(start: *mut Self, end: *mut Self, fill: JsValue) {
        let mut cur = start;
        while cur != end {
            cur.write(fill);
            cur = cur.add(1);
        }
    }

    #[inline]
    pub unsafe fn uninit_copy(
        mut first: *mut Self,
        last: *mut Self,
        mut result: *mut JsValue,
    ) -> *mut JsValue {
        while first != last {
            result.write(first.read());
            first = first.add(1);
            result = result.add(1);
        }
        result
    }
}

unsafe impl Trace for JsValue {
    fn trace(&self, visitor: &mut dyn Tracer) {
        if self.is_object() {
            visitor.visit(self.get_object());
        }
    }
}

impl From<f64> for JsValue {
    fn from(x: f64) -> Self {
        Self::encode_untrusted_f64_value(x)
    }
}

impl From<i32> for JsValue {
    fn from(x: i32) -> Self {
        Self::encode_int32(x)
    }
}

impl From<u32> for JsValue {
    fn from(x: u32) -> Self {
        if x <= i32::MAX as u32 {
            return Self::encode_int32(x as i32);
        }
        Self::encode_f64_value(x as f64)
    }
}

impl From<bool> for JsValue {
    fn from(x: bool) -> Self {
        Self::encode_bool_value(x)
    }
}

impl<T: GcCell + ?Sized> From<GcPointer<T>> for JsValue {
    fn from(x: GcPointer<T>) -> Self {
        Self::encode_object_value(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_encodings_are_distinct() {
        let values = [
            JsValue::encode_undefined_value(),
            JsValue::encode_null_value(),
            JsValue::encode_empty_value(),
            JsValue::encode_bool_value(false),
            JsValue::encode_bool_value(true),
            JsValue::encode_int32(0),
        ];
        for (i, a) in values.iter().enumerate() {
            for (j, b) in values.iter().enumerate() {
                assert_eq!(i == j, a.get_raw() == b.get_raw());
            }
        }
    }

    #[test]
    fn doubles_round_trip() {
        for x in [0.0f64, -0.0, 1.5, -13.25, 1e300].iter() {
            let v = JsValue::new(*x);
            assert!(v.is_double());
            assert_eq!(v.get_double().to_bits(), x.to_bits());
        }
        assert!(JsValue::new(f64::NAN).get_double().is_nan());
    }

    #[test]
    fn same_value_number_semantics() {
        assert!(JsValue::same_value(
            JsValue::new(f64::NAN),
            JsValue::new(f64::NAN)
        ));
        assert!(!JsValue::same_value(JsValue::new(0.0), JsValue::new(-0.0)));
        assert!(JsValue::same_value(JsValue::new(3i32), JsValue::new(3.0)));
        assert!(!JsValue::same_value(
            JsValue::new(1i32),
            JsValue::encode_bool_value(true)
        ));
    }
}
