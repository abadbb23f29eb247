/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{arguments::Arguments, attributes::*, value::JsValue, Runtime};
use crate::gc::cell::{GcCell, GcPointer, Trace, Tracer};
use crate::letroot;
use std::ops::{Deref, DerefMut};

#[derive(Clone, Copy)]
pub union PropertyLayout {
    data: JsValue,
    accessors: (JsValue, JsValue), // getter, setter
}

/// A property descriptor as handed to `defineProperty`: attributes with
/// mention bits plus either a value or a getter/setter pair.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PropertyDescriptor {
    pub attrs: AttrExternal,
    pub value: PropertyLayout,
}

impl Deref for PropertyDescriptor {
    type Target = AttrExternal;
    fn deref(&self) -> &Self::Target {
        &self.attrs
    }
}

impl DerefMut for PropertyDescriptor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.attrs
    }
}

impl PropertyDescriptor {
    pub fn data_descriptor(val: JsValue, attrs: u32) -> Self {
        Self {
            attrs: AttrExternal::new(Some(attrs | DATA | UNDEF_GETTER | UNDEF_SETTER)),
            value: PropertyLayout { data: val },
        }
    }

    pub fn accessor_descriptor(getter: JsValue, setter: JsValue, attrs: u32) -> Self {
        Self {
            attrs: AttrExternal::new(Some(attrs | ACCESSOR | UNDEF_VALUE | UNDEF_WRITABLE)),
            value: PropertyLayout {
                accessors: (getter, setter),
            },
        }
    }

    pub fn accessor_getter(getter: JsValue, attrs: u32) -> Self {
        Self {
            attrs: AttrExternal::new(Some(
                attrs | ACCESSOR | UNDEF_VALUE | UNDEF_SETTER | UNDEF_WRITABLE,
            )),
            value: PropertyLayout {
                accessors: (getter, JsValue::encode_undefined_value()),
            },
        }
    }

    pub fn accessor_setter(setter: JsValue, attrs: u32) -> Self {
        Self {
            attrs: AttrExternal::new(Some(
                attrs | ACCESSOR | UNDEF_VALUE | UNDEF_GETTER | UNDEF_WRITABLE,
            )),
            value: PropertyLayout {
                accessors: (JsValue::encode_undefined_value(), setter),
            },
        }
    }

    pub fn generic(attrs: u32) -> Self {
        Self {
            attrs: AttrExternal::new(Some(
                attrs | UNDEF_VALUE | UNDEF_GETTER | UNDEF_SETTER | UNDEF_WRITABLE,
            )),
            value: PropertyLayout {
                data: JsValue::encode_empty_value(),
            },
        }
    }

    pub fn new_val(val: JsValue, attrs: AttrSafe) -> Self {
        Self {
            attrs: AttrExternal::new(Some(attrs.raw())),
            value: PropertyLayout { data: val },
        }
    }

    pub fn value(&self) -> JsValue {
        unsafe { self.value.data }
    }

    pub fn getter(&self) -> JsValue {
        unsafe { self.value.accessors.0 }
    }

    pub fn setter(&self) -> JsValue {
        unsafe { self.value.accessors.1 }
    }
}

pub struct DataDescriptor {
    pub parent: PropertyDescriptor,
}

impl Deref for DataDescriptor {
    type Target = PropertyDescriptor;
    fn deref(&self) -> &Self::Target {
        &self.parent
    }
}

impl DerefMut for DataDescriptor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parent
    }
}

impl DataDescriptor {
    pub fn new(val: JsValue, attrs: u32) -> Self {
        Self {
            parent: PropertyDescriptor::data_descriptor(val, attrs),
        }
    }

    pub fn value(&self) -> JsValue {
        unsafe { self.value.data }
    }
}

pub struct AccessorDescriptor {
    pub parent: PropertyDescriptor,
}

impl Deref for AccessorDescriptor {
    type Target = PropertyDescriptor;
    fn deref(&self) -> &Self::Target {
        &self.parent
    }
}

impl DerefMut for AccessorDescriptor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parent
    }
}

impl AccessorDescriptor {
    pub fn new(get: JsValue, set: JsValue, attrs: u32) -> Self {
        Self {
            parent: PropertyDescriptor::accessor_descriptor(get, set, attrs),
        }
    }

    pub fn get(&self) -> JsValue {
        unsafe { self.value.accessors.0 }
    }

    pub fn set(&self) -> JsValue {
        unsafe { self.value.accessors.1 }
    }
}

pub struct GenericDescriptor {
    pub parent: PropertyDescriptor,
}

impl Deref for GenericDescriptor {
    type Target = PropertyDescriptor;
    fn deref(&self) -> &Self::Target {
        &self.parent
    }
}

impl DerefMut for GenericDescriptor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parent
    }
}

impl GenericDescriptor {
    pub fn new(attrs: u32) -> Self {
        Self {
            parent: PropertyDescriptor::generic(attrs),
        }
    }
}

/// A resolved property: its value and fully resolved attributes. This is what
/// lives in sparse indexed maps and what descriptor lookups produce.
#[derive(Clone, Copy)]
pub struct StoredSlot {
    pub(crate) value: JsValue,
    pub(crate) attributes: AttrSafe,
}

unsafe impl Trace for StoredSlot {
    fn trace(&self, visitor: &mut dyn Tracer) {
        self.value.trace(visitor);
    }
}

impl GcCell for StoredSlot {}

impl StoredSlot {
    pub fn value(&self) -> JsValue {
        self.value
    }

    pub fn set_value(&mut self, val: JsValue) {
        self.value = val;
    }

    pub fn attributes(&self) -> AttrSafe {
        self.attributes
    }

    pub fn set_attributes(&mut self, attrs: AttrSafe) {
        self.attributes = attrs;
    }

    pub fn set(&mut self, value: JsValue, attrs: AttrSafe) {
        self.value = value;
        self.attributes = attrs;
    }

    pub fn empty() -> Self {
        Self {
            value: JsValue::encode_empty_value(),
            attributes: object_data(),
        }
    }

    pub fn new_raw(value: JsValue, attributes: AttrSafe) -> Self {
        Self { value, attributes }
    }

    pub fn accessor(&self) -> GcPointer<Accessor> {
        assert!(self.attributes.is_accessor());
        unsafe { self.value.get_object().downcast_unchecked() }
    }

    pub fn to_descriptor(&self) -> PropertyDescriptor {
        if self.attributes().is_data() {
            return PropertyDescriptor::data_descriptor(self.value, self.attributes().raw());
        }
        let accessor = self.accessor();
        PropertyDescriptor::accessor_descriptor(
            accessor.getter(),
            accessor.setter(),
            self.attributes.raw(),
        )
    }

    pub fn get(&self, rt: &mut Runtime, this_binding: JsValue) -> Result<JsValue, JsValue> {
        if self.attributes.is_data() {
            return Ok(self.value);
        }
        assert!(self.attributes.is_accessor());
        self.accessor().invoke_getter(rt, this_binding)
    }

    /// ECMA262 8.12.9 `[[DefineOwnProperty]]`, steps 5 and onward: can `desc`
    /// be applied over the current property? `returned` carries the outcome
    /// `[[DefineOwnProperty]]` reports; the `Ok` value says whether the
    /// caller still has a slot write to perform.
    pub fn is_defined_property_accepted(
        &self,
        rt: &mut Runtime,
        desc: &PropertyDescriptor,
        throwable: bool,
        returned: &mut bool,
    ) -> Result<bool, JsValue> {
        macro_rules! reject {
            ($str: expr) => {{
                *returned = false;
                if throwable {
                    return Err(JsValue::new(rt.new_type_error($str)));
                }
                return Ok(false);
            }};
        }

        if desc.is_absent() {
            *returned = true;
            return Ok(false);
        }
        if self.merge_with_no_effect(desc) {
            *returned = true;
            return Ok(false);
        }
        if !self.attributes().is_configurable() {
            if desc.is_configurable() {
                reject!("changing [[Configurable]] of unconfigurable property not allowed");
            }
            if !desc.is_enumerable_absent()
                && self.attributes().is_enumerable() != desc.is_enumerable()
            {
                reject!("changing [[Enumerable]] of unconfigurable property not allowed");
            }
        }
        if desc.is_generic() {
            // only enumerable/configurable mentioned, checked above
        } else if self.attributes().is_data() != desc.is_data() {
            if !self.attributes().is_configurable() {
                reject!("changing descriptor type of unconfigurable property not allowed");
            }
        } else if self.attributes().is_data() {
            if !self.attributes().is_configurable() && !self.attributes().is_writable() {
                if desc.is_writable() {
                    reject!("changing [[Writable]] of unconfigurable property not allowed");
                }
                if !desc.is_value_absent() && !JsValue::same_value(self.value, desc.value()) {
                    reject!("changing [[Value]] of readonly property not allowed");
                }
            }
        } else if !self.attributes().is_configurable() {
            let lhs = self.accessor();
            let rhs = AccessorDescriptor { parent: *desc };
            if (!rhs.is_setter_absent() && !JsValue::same_value(lhs.setter(), rhs.set()))
                || (!rhs.is_getter_absent() && !JsValue::same_value(lhs.getter(), rhs.get()))
            {
                reject!("changing [[Set]] or [[Get]] of unconfigurable property not allowed");
            }
        }
        *returned = true;
        Ok(true)
    }

    /// True when merging `desc` into the current property would change
    /// nothing (every mentioned attribute and value half already matches).
    pub fn merge_with_no_effect(&self, desc: &PropertyDescriptor) -> bool {
        if !desc.is_configurable_absent()
            && desc.is_configurable() != self.attributes().is_configurable()
        {
            return false;
        }
        if !desc.is_enumerable_absent() && desc.is_enumerable() != self.attributes().is_enumerable()
        {
            return false;
        }
        if desc.ty() != self.attributes().ty() {
            return false;
        }
        if desc.is_data() {
            let data = DataDescriptor { parent: *desc };
            if !data.is_writable_absent() && data.is_writable() != self.attributes().is_writable() {
                return false;
            }
            if data.is_value_absent() {
                return true;
            }
            JsValue::same_value(data.value(), self.value)
        } else if desc.is_accessor() {
            let ac = self.accessor();
            let accs = AccessorDescriptor { parent: *desc };
            (accs.is_getter_absent() || JsValue::same_value(accs.get(), ac.getter()))
                && (accs.is_setter_absent() || JsValue::same_value(accs.set(), ac.setter()))
        } else {
            true
        }
    }

    /// Apply `desc` over the current property. Accessor halves that are not
    /// mentioned keep their current callables; the stored accessor cell is
    /// mutated in place.
    pub fn merge(&mut self, rt: &mut Runtime, desc: &PropertyDescriptor) {
        let mut attr = AttrExternal::new(Some(self.attributes().raw()));
        if !desc.is_configurable_absent() {
            attr.set_configurable(desc.is_configurable());
        }
        if !desc.is_enumerable_absent() {
            attr.set_enumerable(desc.is_enumerable());
        }
        if desc.is_generic() {
            self.attributes = AttrSafe::un_safe(attr);
            return;
        }

        if desc.is_data() {
            attr.set_data();
            let data = DataDescriptor { parent: *desc };
            if !data.is_value_absent() {
                self.value = data.value();
            } else if !self.attributes().is_data() {
                // accessor -> data with no value mentioned
                self.value = JsValue::encode_undefined_value();
            }
            if !data.is_writable_absent() {
                attr.set_writable(data.is_writable());
            } else if !self.attributes().is_data() {
                attr.set_writable(false);
            }
            self.attributes = AttrSafe::un_safe(attr);
        } else {
            attr.set_accessor();
            let accs = AccessorDescriptor { parent: *desc };
            let mut ac = if self.attributes().is_accessor() {
                self.accessor()
            } else {
                let ac = Accessor::new(
                    rt,
                    JsValue::encode_undefined_value(),
                    JsValue::encode_undefined_value(),
                );
                self.value = JsValue::encode_object_value(ac);
                ac
            };
            if !accs.is_getter_absent() {
                ac.set_getter(accs.get());
            }
            if !accs.is_setter_absent() {
                ac.set_setter(accs.set());
            }
            self.attributes = AttrSafe::un_safe(attr);
        }
    }

    /// Build a stored slot for a brand-new property from a descriptor,
    /// resolving every absent attribute to its default.
    pub fn new(rt: &mut Runtime, desc: &PropertyDescriptor) -> Self {
        let mut this = Self {
            value: JsValue::encode_undefined_value(),
            attributes: AttrSafe::not_found(),
        };
        // auxiliary dispatch bits ride along unchanged
        let mut attributes = AttrExternal::new(Some(desc.attrs.raw & (BUILTIN | INTERNAL_SETTER)));
        attributes.set_configurable(desc.is_configurable());
        attributes.set_enumerable(desc.is_enumerable());
        if desc.is_data() {
            let data = DataDescriptor { parent: *desc };
            if !data.is_value_absent() {
                this.value = data.value();
            }
            attributes.set_writable(data.is_writable());
            this.attributes = create_data(attributes);
        } else if desc.is_accessor() {
            let ac = AccessorDescriptor { parent: *desc };
            let accessor = Accessor::new(rt, ac.get(), ac.set());
            this.value = JsValue::encode_object_value(accessor);
            this.attributes = create_accessor(attributes);
        } else {
            this.attributes = create_data(attributes);
        }
        this
    }
}

/// Heap cell holding a getter/setter pair. An undefined half is absent.
pub struct Accessor {
    pub(crate) getter: JsValue,
    pub(crate) setter: JsValue,
}

impl Accessor {
    pub fn new(rt: &mut Runtime, getter: JsValue, setter: JsValue) -> GcPointer<Self> {
        rt.heap().allocate(Self { getter, setter })
    }

    pub fn getter(&self) -> JsValue {
        self.getter
    }

    pub fn setter(&self) -> JsValue {
        self.setter
    }

    pub fn set_getter(&mut self, val: JsValue) {
        self.getter = val;
    }

    pub fn set_setter(&mut self, val: JsValue) {
        self.setter = val;
    }

    pub fn invoke_getter(&self, rt: &mut Runtime, this_binding: JsValue) -> Result<JsValue, JsValue> {
        if self.getter().is_callable() {
            let stack = rt.shadowstack();
            let mut tmp: [JsValue; 0] = [];
            letroot!(args = stack, Arguments::new(this_binding, &mut tmp));
            let func = self.getter().get_jsobject();
            func.as_function().call(rt, &mut args)
        } else {
            Ok(JsValue::encode_undefined_value())
        }
    }

    pub fn invoke_setter(
        &self,
        rt: &mut Runtime,
        this_binding: JsValue,
        value: JsValue,
    ) -> Result<JsValue, JsValue> {
        if self.setter().is_callable() {
            let stack = rt.shadowstack();
            let mut tmp = [value];
            letroot!(args = stack, Arguments::new(this_binding, &mut tmp));
            let func = self.setter().get_jsobject();
            func.as_function().call(rt, &mut args)
        } else {
            Ok(JsValue::encode_undefined_value())
        }
    }
}

impl GcCell for Accessor {}

unsafe impl Trace for Accessor {
    fn trace(&self, visitor: &mut dyn Tracer) {
        self.getter.trace(visitor);
        self.setter.trace(visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RuntimeOptions;

    fn stored(rt: &mut Runtime, value: JsValue, attrs: u32) -> StoredSlot {
        StoredSlot::new(rt, &*DataDescriptor::new(value, attrs))
    }

    #[test]
    fn redefining_readonly_value_is_rejected() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let slot = stored(&mut rt, JsValue::new(1i32), E);
        let update = DataDescriptor::new(JsValue::new(2i32), UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE);
        let mut returned = false;
        assert!(slot
            .is_defined_property_accepted(&mut rt, &update, false, &mut returned)
            .unwrap()
            == false);
        assert!(!returned);
    }

    #[test]
    fn redefining_same_value_is_a_no_op() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let slot = stored(&mut rt, JsValue::new(1i32), E);
        let update = DataDescriptor::new(JsValue::new(1i32), UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE);
        let mut returned = false;
        let need_set = slot
            .is_defined_property_accepted(&mut rt, &update, true, &mut returned)
            .unwrap();
        assert!(!need_set);
        assert!(returned);
    }

    #[test]
    fn nan_values_compare_same() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let slot = stored(&mut rt, JsValue::new(f64::NAN), E);
        let update = DataDescriptor::new(JsValue::new(f64::NAN), UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE);
        assert!(slot.merge_with_no_effect(&update));
        let zero = stored(&mut rt, JsValue::new(0.0), E);
        let negzero = DataDescriptor::new(JsValue::new(-0.0), UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE);
        assert!(!zero.merge_with_no_effect(&negzero));
    }

    #[test]
    fn nonconfigurable_type_flip_is_rejected() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let slot = stored(&mut rt, JsValue::new(1i32), W | E);
        let update = PropertyDescriptor::accessor_descriptor(
            JsValue::encode_undefined_value(),
            JsValue::encode_undefined_value(),
            N,
        );
        let mut returned = true;
        assert!(!slot
            .is_defined_property_accepted(&mut rt, &update, false, &mut returned)
            .unwrap());
        assert!(!returned);
    }

    #[test]
    fn merge_keeps_unmentioned_accessor_half() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let marker = JsValue::new(42i32);
        let mut slot = StoredSlot::new(
            &mut rt,
            &PropertyDescriptor::accessor_descriptor(marker, marker, E | C),
        );
        let update = PropertyDescriptor::accessor_setter(JsValue::new(7i32), E | C);
        slot.merge(&mut rt, &update);
        let ac = slot.accessor();
        assert!(JsValue::same_value(ac.getter(), marker));
        assert!(JsValue::same_value(ac.setter(), JsValue::new(7i32)));
    }

    #[test]
    fn data_to_accessor_conversion_drops_writable() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let mut slot = stored(&mut rt, JsValue::new(1i32), W | E | C);
        let update = PropertyDescriptor::accessor_descriptor(
            JsValue::encode_undefined_value(),
            JsValue::encode_undefined_value(),
            E | C,
        );
        slot.merge(&mut rt, &update);
        assert!(slot.attributes().is_accessor());
        assert!(!slot.attributes().is_writable());
        // and back: writable resets to false unless mentioned
        let back = DataDescriptor::new(JsValue::new(3i32), UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE);
        slot.merge(&mut rt, &back);
        assert!(slot.attributes().is_data());
        assert!(!slot.attributes().is_writable());
        assert!(JsValue::same_value(slot.value(), JsValue::new(3i32)));
    }
}
