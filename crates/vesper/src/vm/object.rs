/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{
    array_storage::ArrayStorage,
    attributes::*,
    class::{Class, JsClass, JsClassMethodTable},
    error::*,
    indexed_elements::{IndexedCheckMode, IndexedElements, MAX_VECTOR_SIZE},
    property_descriptor::{DataDescriptor, PropertyDescriptor, StoredSlot},
    slot::*,
    string::JsString,
    structure::{ForInCache, Structure},
    symbol_table::Symbol,
    value::JsValue,
    Runtime,
};
use crate::define_jsclass;
use crate::gc::cell::{GcCell, GcPointer, Trace, Tracer};
use crate::letroot;
use std::collections::HashSet;
use std::mem::ManuallyDrop;

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum EnumerationMode {
    Default,
    IncludeNotEnumerable,
}

pub const OBJ_FLAG_EXTENSIBLE: u32 = 0x01;
pub const OBJ_FLAG_CALLABLE: u32 = 0x02;
pub const OBJ_FLAG_SEALED: u32 = 0x04;
pub const OBJ_FLAG_FROZEN: u32 = 0x08;
pub const OBJ_FLAG_HOST: u32 = 0x10;
pub const OBJ_FLAG_LAZY: u32 = 0x20;
/// No named property of this object spells a uint32 index, so computed
/// accesses may go straight to indexed storage.
pub const OBJ_FLAG_FAST_INDEX: u32 = 0x40;

pub type FixedStorage = GcPointer<ArrayStorage>;

#[repr(C)]
pub struct JsObject {
    pub(crate) class: &'static Class,
    pub(crate) structure: GcPointer<Structure>,
    pub(crate) slots: FixedStorage,
    pub(crate) indexed: IndexedElements,
    pub(crate) flags: u32,
    pub(crate) object_id: u32,
    pub(crate) object_data_start: [usize; 0],
}

impl JsObject {
    pub fn direct(&self, n: usize) -> &JsValue {
        self.slots.at(n as _)
    }

    pub fn direct_mut(&mut self, n: usize) -> &mut JsValue {
        self.slots.at_mut(n as _)
    }

    pub fn class(&self) -> &'static Class {
        self.class
    }

    pub fn is_class(&self, cls: &Class) -> bool {
        std::ptr::eq(self.class, cls)
    }

    pub fn structure(&self) -> GcPointer<Structure> {
        self.structure
    }

    pub fn prototype(&self) -> Option<&GcPointer<JsObject>> {
        self.structure.prototype()
    }

    pub fn is_extensible(&self) -> bool {
        (self.flags & OBJ_FLAG_EXTENSIBLE) != 0
    }

    pub fn is_callable(&self) -> bool {
        (self.flags & OBJ_FLAG_CALLABLE) != 0
    }

    pub fn set_callable(&mut self, val: bool) {
        if val {
            self.flags |= OBJ_FLAG_CALLABLE;
        } else {
            self.flags &= !OBJ_FLAG_CALLABLE;
        }
    }

    /// Class payload stored behind the object header.
    #[allow(clippy::mut_from_ref)]
    pub fn data<T>(&self) -> &mut ManuallyDrop<T> {
        unsafe { &mut *(self.object_data_start.as_ptr() as *mut ManuallyDrop<T>) }
    }

    /// # Safety
    /// The payload region must be sized for `T` by the class's
    /// `additional_size` hook, and must not have been initialized yet.
    pub unsafe fn write_data<T>(&mut self, value: T) {
        (self.object_data_start.as_ptr() as *mut ManuallyDrop<T>).write(ManuallyDrop::new(value));
    }

    pub fn as_function(&self) -> &super::function::JsNativeFunction {
        assert!(self.is_class(super::function::JsNativeFunction::get_class()));
        &*self.data::<super::function::JsNativeFunction>()
    }
}

pub fn object_size_with_additional(cls: &Class) -> usize {
    std::mem::size_of::<JsObject>()
        + match cls.additional_size {
            Some(size) => size(),
            None => 0,
        }
}

fn is_absent_descriptor(desc: &PropertyDescriptor) -> bool {
    if !desc.is_enumerable() && !desc.is_enumerable_absent() {
        return false;
    }
    if !desc.is_configurable() && !desc.is_configurable_absent() {
        return false;
    }
    if desc.is_accessor() {
        return false;
    }
    if desc.is_data() {
        let data = DataDescriptor { parent: *desc };
        return data.is_writable() || data.is_writable_absent();
    }
    true
}

unsafe impl Trace for JsObject {
    fn trace(&self, visitor: &mut dyn Tracer) {
        self.structure.trace(visitor);
        self.slots.trace(visitor);
        self.indexed.trace(visitor);
        if let Some(trace) = self.class.trace {
            trace(self, visitor);
        }
    }
}

impl GcCell for JsObject {
    fn compute_size(&self) -> usize {
        object_size_with_additional(self.class)
    }
}

impl Drop for JsObject {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.class.drop {
            drop_fn(self);
        }
    }
}

define_jsclass!(JsObject, Object);

impl JsClass for JsObject {
    fn class() -> &'static Class {
        Self::get_class()
    }
}

#[allow(non_snake_case)]
impl JsObject {
    /// Run a lazy object's initializer, at most once.
    pub(crate) fn force_initialize(obj: &mut GcPointer<Self>, rt: &mut Runtime) {
        if (obj.flags & OBJ_FLAG_LAZY) == 0 {
            return;
        }
        obj.flags &= !OBJ_FLAG_LAZY;
        if let Some(init) = obj.class.lazy_init {
            init(obj, rt);
        }
    }

    /// Produce the resolved value for a slot hit, routing host descriptors
    /// through the owner's delegate.
    fn read_slot(
        rt: &mut Runtime,
        this: JsValue,
        name: Symbol,
        slot: &mut Slot,
    ) -> Result<JsValue, JsValue> {
        if slot.attributes().is_host() {
            if let Some(base) = *slot.base() {
                if let Some(mut owner) = base.downcast::<JsObject>() {
                    return owner.host_delegate_get(rt, name);
                }
            }
        }
        slot.get(rt, this)
    }

    pub fn GetNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> bool {
        let stack = rt.shadowstack();
        letroot!(cur = stack, *obj);
        loop {
            if cur.get_own_non_indexed_property_slot(rt, name, slot) {
                break true;
            }
            match cur.prototype() {
                Some(proto) => *cur = *proto,
                None => break false,
            }
        }
    }

    pub fn GetOwnNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> bool {
        let entry = obj.structure.get(rt, name);
        if !entry.is_not_found() {
            slot.set_woffset(
                *obj.direct(entry.offset as _),
                entry.attrs,
                Some(obj.as_dyn()),
                entry.offset,
            );
            if obj.structure.is_unique() || rt.options().disable_ic {
                slot.make_uncacheable();
            }
            return true;
        }
        if (obj.flags & OBJ_FLAG_LAZY) != 0 {
            Self::force_initialize(obj, rt);
            let entry = obj.structure.get(rt, name);
            if !entry.is_not_found() {
                slot.set_woffset(
                    *obj.direct(entry.offset as _),
                    entry.attrs,
                    Some(obj.as_dyn()),
                    entry.offset,
                );
                if obj.structure.is_unique() || rt.options().disable_ic {
                    slot.make_uncacheable();
                }
                return true;
            }
        }
        if (obj.flags & OBJ_FLAG_HOST) != 0 {
            slot.set_1(JsValue::encode_empty_value(), host_data(), Some(obj.as_dyn()));
            return true;
        }
        false
    }

    pub fn GetOwnIndexedPropertySlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> bool {
        // A named property may spell this index; it shadows element storage.
        if obj.structure.has_index_like_properties() {
            let name = Symbol::Index(index).to_named();
            let entry = obj.structure.get(rt, name);
            if !entry.is_not_found() {
                slot.set_woffset(
                    *obj.direct(entry.offset as _),
                    entry.attrs,
                    Some(obj.as_dyn()),
                    entry.offset,
                );
                slot.make_uncacheable();
                return true;
            }
        }
        if obj.indexed.dense() && index < obj.indexed.vector.size() {
            let value = *obj.indexed.vector.at(index);
            if value.is_empty() {
                return false;
            }
            slot.set_1(value, object_data(), Some(obj.as_dyn()));
            return true;
        }
        if let Some(map) = obj.indexed.map.as_ref() {
            if index < obj.indexed.length() {
                if let Some(it) = map.get(&index) {
                    slot.set_from_slot(it, Some(obj.as_dyn()));
                    return true;
                }
            }
        }
        false
    }

    pub fn GetIndexedPropertySlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> bool {
        let stack = rt.shadowstack();
        letroot!(cur = stack, *obj);
        loop {
            if cur.get_own_indexed_property_slot(rt, index, slot) {
                break true;
            }
            match cur.prototype() {
                Some(proto) => *cur = *proto,
                None => break false,
            }
        }
    }

    pub fn GetNonIndexedSlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> Result<JsValue, JsValue> {
        if obj.get_non_indexed_property_slot(rt, name, slot) {
            return Self::read_slot(rt, JsValue::new(*obj), name, slot);
        }
        Ok(JsValue::encode_undefined_value())
    }

    pub fn GetIndexedSlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> Result<JsValue, JsValue> {
        if obj.get_indexed_property_slot(rt, index, slot) {
            return Self::read_slot(rt, JsValue::new(*obj), Symbol::Index(index), slot);
        }
        Ok(JsValue::encode_undefined_value())
    }

    pub fn PutNonIndexedSlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        name: Symbol,
        val: JsValue,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<(), JsValue> {
        let stack = rt.shadowstack();
        if obj.get_non_indexed_property_slot(rt, name, slot) {
            if slot.attributes().is_accessor() {
                letroot!(ac = stack, slot.accessor());
                if !ac.setter().is_callable() {
                    if throwable {
                        let desc = rt.description(name);
                        let msg = JsString::new(
                            rt,
                            format!("property '{}' has a getter but no setter", desc),
                        );
                        return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                    }
                    return Ok(());
                }
                return ac.invoke_setter(rt, JsValue::new(*obj), val).map(|_| ());
            }
            if !slot.attributes().is_writable() {
                if slot.attributes().is_builtin() {
                    let desc = rt.description(name);
                    if rt.options().freeze_builtins_fatal_on_override {
                        panic!("attempt to override read-only builtin '{}'", desc);
                    }
                    if throwable {
                        let msg = JsString::new(
                            rt,
                            format!("cannot override read-only builtin '{}'", desc),
                        );
                        return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                    }
                    return Ok(());
                }
                if throwable {
                    let desc = rt.description(name);
                    let msg =
                        JsString::new(rt, format!("cannot assign to read-only property '{}'", desc));
                    return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                }
                return Ok(());
            }
            if let Some(base) = *slot.base() {
                if GcPointer::ptr_eq(&base, obj) {
                    if slot.attributes().is_host() {
                        return obj.host_delegate_set(rt, name, val);
                    }
                    obj.define_own_non_indexed_property_slot(
                        rt,
                        name,
                        &*DataDescriptor::new(
                            val,
                            UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE,
                        ),
                        slot,
                        throwable,
                    )?;
                    return Ok(());
                }
            }
            // inherited writable data property: shadow it below
        }
        if !obj.is_extensible() {
            if throwable {
                let msg = JsString::new(rt, "cannot add property to non-extensible object");
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(());
        }
        obj.define_own_non_indexed_property_slot(
            rt,
            name,
            &*DataDescriptor::new(val, W | E | C),
            slot,
            throwable,
        )?;
        Ok(())
    }

    pub fn PutIndexedSlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        index: u32,
        val: JsValue,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<(), JsValue> {
        if index < MAX_VECTOR_SIZE as u32
            && (obj.flags & OBJ_FLAG_FAST_INDEX) != 0
            && obj.indexed.dense()
            && obj.indexed.writable()
            && !obj.class.exotic_indexed
            && obj
                .prototype()
                .map(|proto| !proto.has_indexed_property())
                .unwrap_or(true)
        {
            slot.mark_put_result(PutResultType::IndexedOptimized, index);
            obj.define_own_indexed_value_dense_internal(rt, index, val, false);
            return Ok(());
        }
        let stack = rt.shadowstack();
        if obj.get_indexed_property_slot(rt, index, slot) {
            if slot.attributes().is_accessor() {
                letroot!(ac = stack, slot.accessor());
                if !ac.setter().is_callable() {
                    if throwable {
                        let msg = JsString::new(rt, "element has a getter but no setter");
                        return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                    }
                    return Ok(());
                }
                return ac.invoke_setter(rt, JsValue::new(*obj), val).map(|_| ());
            }
            if !slot.attributes().is_writable() {
                if throwable {
                    let msg = JsString::new(rt, "cannot assign to read-only element");
                    return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                }
                return Ok(());
            }
            if let Some(base) = *slot.base() {
                if GcPointer::ptr_eq(&base, obj) {
                    obj.define_own_indexed_property_slot(
                        rt,
                        index,
                        &*DataDescriptor::new(
                            val,
                            UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE,
                        ),
                        slot,
                        throwable,
                    )?;
                    return Ok(());
                }
            }
        }
        if !obj.is_extensible() {
            if throwable {
                let msg = JsString::new(rt, "cannot add property to non-extensible object");
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(());
        }
        obj.define_own_indexed_property_slot(
            rt,
            index,
            &*DataDescriptor::new(val, W | E | C),
            slot,
            throwable,
        )?;
        Ok(())
    }

    pub fn DeleteNonIndexedMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        name: Symbol,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        let mut slot = Slot::new();
        if !obj.get_own_property_slot(rt, name, &mut slot) {
            return Ok(true);
        }
        if slot.attributes().is_host() {
            // synthesized descriptor; the class stores nothing to remove
            return Ok(true);
        }
        if !slot.attributes().is_configurable() {
            if throwable {
                let desc = rt.description(name);
                let msg = JsString::new(
                    rt,
                    format!("cannot delete non-configurable property '{}'", desc),
                );
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        let offset = if slot.has_offset() {
            slot.offset()
        } else {
            let entry = obj.structure.get(rt, name);
            if entry.is_not_found() {
                return Ok(true);
            }
            entry.offset
        };
        // release the reference before the shape changes
        *obj.direct_mut(offset as _) = JsValue::encode_empty_value();
        let s = obj.structure.delete_property_transition(rt, name);
        obj.structure = s;
        rt.heap().write_barrier(*obj);
        Ok(true)
    }

    pub fn DeleteIndexedMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        index: u32,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if obj.structure.has_index_like_properties() {
            let name = Symbol::Index(index).to_named();
            if !obj.structure.get(rt, name).is_not_found() {
                if !(obj.class.method_table.DeleteNonIndexed)(obj, rt, name, throwable)? {
                    return Ok(false);
                }
            }
        }
        if obj.class.exotic_indexed {
            let mut slot = Slot::new();
            if !(obj.class.method_table.GetOwnIndexedPropertySlot)(obj, rt, index, &mut slot) {
                return Ok(true);
            }
            if !slot.attributes().is_configurable() {
                if throwable {
                    let msg = JsString::new(rt, "cannot delete non-configurable property");
                    return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                }
                return Ok(false);
            }
        }
        obj.delete_indexed_internal(rt, index, throwable)
    }

    /// 8.12.9 `[[DefineOwnProperty]]` for named keys.
    pub fn DefineOwnNonIndexedPropertySlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        name: Symbol,
        desc: &PropertyDescriptor,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if !slot.is_used() {
            obj.get_own_property_slot(rt, name, slot);
        }

        if !slot.is_not_found() && !slot.attributes().is_host() {
            if let Some(base) = *slot.base() {
                if GcPointer::ptr_eq(&base, obj) {
                    let mut returned = false;
                    if slot.is_defined_property_accepted(rt, desc, throwable, &mut returned)? {
                        if slot.has_offset() {
                            let old = slot.attributes();
                            slot.merge(rt, desc);
                            if old != slot.attributes() {
                                let new_structure = obj.structure.change_attributes_transition(
                                    rt,
                                    name,
                                    slot.attributes(),
                                );
                                obj.structure = new_structure;
                                rt.heap().write_barrier(*obj);
                            }
                            *obj.direct_mut(slot.offset() as _) = slot.value();
                            slot.mark_put_result(PutResultType::Replace, slot.offset());
                        } else {
                            // reported by the class without backing storage;
                            // materialize it as a real slot
                            slot.merge(rt, desc);
                            let attributes = slot.attributes();
                            let value = slot.value();
                            Self::add_own_property(obj, rt, name, attributes, value, slot);
                        }
                    }
                    return Ok(returned);
                }
            }
        }

        if !obj.is_extensible() {
            if throwable {
                let msg = JsString::new(rt, "cannot define property on non-extensible object");
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }

        let stored = StoredSlot::new(rt, desc);
        Self::add_own_property(obj, rt, name, stored.attributes(), stored.value(), slot);
        Ok(true)
    }

    /// Grow the shape and slot storage with a brand-new property.
    fn add_own_property(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        name: Symbol,
        attributes: AttrSafe,
        value: JsValue,
        slot: &mut Slot,
    ) {
        let stack = rt.shadowstack();
        let mut offset = 0;
        let s = obj
            .structure
            .add_property_transition(rt, name, attributes, &mut offset);
        obj.structure = s;
        rt.heap().write_barrier(*obj);
        let capacity = obj.structure.storage_capacity();
        letroot!(slots = stack, obj.slots);
        slots.mut_handle().resize(rt.heap(), capacity as _);
        obj.slots = *slots;
        *obj.direct_mut(offset as _) = value;
        if name.array_index().is_some() {
            obj.flags &= !OBJ_FLAG_FAST_INDEX;
        }
        slot.mark_put_result(PutResultType::New, offset);
        slot.base = Some(obj.as_dyn());
    }

    pub fn DefineOwnIndexedPropertySlotMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        index: u32,
        desc: &PropertyDescriptor,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if obj.structure.has_index_like_properties() {
            // The index already lives as a named property; update it there.
            let name = Symbol::Index(index).to_named();
            if !obj.structure.get(rt, name).is_not_found() {
                let mut named_slot = Slot::new();
                return obj.define_own_non_indexed_property_slot(
                    rt,
                    name,
                    desc,
                    &mut named_slot,
                    throwable,
                );
            }
        }
        if obj.class.exotic_indexed {
            // e.g. a string object's characters:
            //   var str = new String('str');
            //   Object.defineProperty(str, '0', { value: 0 });
            // must run the acceptance check against the character slot.
            if !slot.is_used() {
                obj.get_own_indexed_property_slot(rt, index, slot);
            }
            if !slot.is_not_found() {
                if let Some(base) = *slot.base() {
                    if GcPointer::ptr_eq(&base, obj) {
                        let mut returned = false;
                        if !slot.is_defined_property_accepted(rt, desc, throwable, &mut returned)? {
                            return Ok(returned);
                        }
                    }
                }
            }
        }
        obj.define_own_indexed_property_internal(rt, index, desc, throwable)
    }

    pub fn GetPropertyNamesMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        collector: &mut dyn FnMut(Symbol, u32),
        mode: EnumerationMode,
    ) {
        obj.collect_own_property_names(rt, collector, mode);
        let mut proto = obj.prototype().copied();
        while let Some(mut cur) = proto {
            cur.collect_own_property_names(rt, collector, mode);
            proto = cur.prototype().copied();
        }
    }

    pub fn GetOwnPropertyNamesMethod(
        obj: &mut GcPointer<Self>,
        rt: &mut Runtime,
        collector: &mut dyn FnMut(Symbol, u32),
        mode: EnumerationMode,
    ) {
        if obj.indexed.dense() {
            for index in 0..obj.indexed.vector.size() {
                if !obj.indexed.vector.at(index).is_empty() {
                    collector(Symbol::Index(index), u32::MAX);
                }
            }
        }
        if let Some(map) = obj.indexed.map.as_ref() {
            for (index, stored) in map.iter() {
                if mode == EnumerationMode::IncludeNotEnumerable
                    || stored.attributes().is_enumerable()
                {
                    collector(Symbol::Index(*index), u32::MAX);
                }
            }
        }
        obj.structure.get_own_property_names(
            rt,
            mode == EnumerationMode::IncludeNotEnumerable,
            |name, offset| collector(name, offset),
        );
    }

    pub fn CheckAllOwnIndexedMethod(
        obj: &mut GcPointer<Self>,
        _rt: &mut Runtime,
        mode: IndexedCheckMode,
    ) -> bool {
        if obj.indexed.dense() {
            // live dense elements are writable and configurable by definition
            for index in 0..obj.indexed.vector.size() {
                if !obj.indexed.vector.at(index).is_empty() {
                    return false;
                }
            }
        }
        if let Some(map) = obj.indexed.map.as_ref() {
            for stored in map.values() {
                let attrs = stored.attributes();
                if attrs.is_configurable() {
                    return false;
                }
                if mode == IndexedCheckMode::ReadOnly && attrs.is_data() && attrs.is_writable() {
                    return false;
                }
            }
        }
        true
    }

    /// Create a new object with the supplied shape and class.
    pub fn new(
        rt: &mut Runtime,
        structure: &GcPointer<Structure>,
        class: &'static Class,
    ) -> GcPointer<Self> {
        let stack = rt.shadowstack();
        let init = IndexedElements::new(rt);
        letroot!(
            storage = stack,
            ArrayStorage::with_size(
                rt,
                structure.storage_capacity() as _,
                structure.storage_capacity() as _,
            )
        );
        let this = Self {
            structure: *structure,
            class,
            slots: *storage,
            indexed: init,
            flags: OBJ_FLAG_EXTENSIBLE | OBJ_FLAG_FAST_INDEX,
            object_id: 0,
            object_data_start: [],
        };
        rt.heap().allocate(this)
    }

    /// Create a plain empty object on the default object prototype.
    pub fn new_empty(rt: &mut Runtime) -> GcPointer<Self> {
        let stack = rt.shadowstack();
        letroot!(
            structure = stack,
            rt.global_data().empty_object_struct.unwrap()
        );
        Self::new(rt, &structure, Self::get_class())
    }

    /// Create a plain object on an arbitrary prototype; the shape comes from
    /// the runtime's prototype-keyed registry.
    pub fn new_with_prototype(
        rt: &mut Runtime,
        prototype: Option<GcPointer<JsObject>>,
    ) -> GcPointer<Self> {
        let stack = rt.shadowstack();
        letroot!(structure = stack, rt.structure_for_prototype(prototype));
        Self::new(rt, &structure, Self::get_class())
    }

    /// Like [new_with_prototype](Self::new_with_prototype) with slot storage
    /// pre-sized for `capacity` properties.
    pub fn new_with_hint(
        rt: &mut Runtime,
        prototype: Option<GcPointer<JsObject>>,
        capacity: u32,
    ) -> GcPointer<Self> {
        let stack = rt.shadowstack();
        letroot!(obj = stack, Self::new_with_prototype(rt, prototype));
        letroot!(slots = stack, obj.slots);
        slots.mut_handle().ensure_capacity(rt.heap(), capacity);
        obj.slots = *slots;
        *obj
    }
}

impl GcPointer<JsObject> {
    pub fn get_own_property_slot(&mut self, rt: &mut Runtime, name: Symbol, slot: &mut Slot) -> bool {
        match name {
            Symbol::Index(index) => self.get_own_indexed_property_slot(rt, index, slot),
            name => self.get_own_non_indexed_property_slot(rt, name, slot),
        }
    }

    pub fn get_property_slot(&mut self, rt: &mut Runtime, name: Symbol, slot: &mut Slot) -> bool {
        match name {
            Symbol::Index(index) if !self.is_host_object() => {
                self.get_indexed_property_slot(rt, index, slot)
            }
            name => self.get_non_indexed_property_slot(rt, name.to_named(), slot),
        }
    }

    pub fn get_non_indexed_property_slot(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> bool {
        (self.class.method_table.GetNonIndexedPropertySlot)(self, rt, name, slot)
    }

    pub fn get_indexed_property_slot(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> bool {
        (self.class.method_table.GetIndexedPropertySlot)(self, rt, index, slot)
    }

    pub fn get_own_non_indexed_property_slot(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> bool {
        (self.class.method_table.GetOwnNonIndexedPropertySlot)(self, rt, name, slot)
    }

    pub fn get_own_indexed_property_slot(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> bool {
        (self.class.method_table.GetOwnIndexedPropertySlot)(self, rt, index, slot)
    }

    pub fn get_non_indexed_slot(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> Result<JsValue, JsValue> {
        (self.class.method_table.GetNonIndexedSlot)(self, rt, name, slot)
    }

    pub fn get_indexed_slot(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        slot: &mut Slot,
    ) -> Result<JsValue, JsValue> {
        (self.class.method_table.GetIndexedSlot)(self, rt, index, slot)
    }

    pub fn get_slot(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        slot: &mut Slot,
    ) -> Result<JsValue, JsValue> {
        match name {
            Symbol::Index(index) if !self.is_host_object() => self.get_indexed_slot(rt, index, slot),
            name => self.get_non_indexed_slot(rt, name.to_named(), slot),
        }
    }

    pub fn get(&mut self, rt: &mut Runtime, name: Symbol) -> Result<JsValue, JsValue> {
        let mut slot = Slot::new();
        self.get_slot(rt, name, &mut slot)
    }

    /// Like [get](Self::get), but a missing property is a ReferenceError.
    pub fn get_required(&mut self, rt: &mut Runtime, name: Symbol) -> Result<JsValue, JsValue> {
        let mut slot = Slot::new();
        if !self.get_property_slot(rt, name, &mut slot) {
            let desc = rt.description(name);
            let msg = JsString::new(rt, format!("'{}' is not defined", desc));
            return Err(JsValue::new(JsReferenceError::new(rt, msg, None)));
        }
        JsObject::read_slot(rt, JsValue::new(*self), name, &mut slot)
    }

    /// Named read that honors index-like spellings: `"0"` and `0` address the
    /// same element.
    pub fn get_named_or_indexed(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
    ) -> Result<JsValue, JsValue> {
        if !self.is_host_object() {
            if let Some(index) = name.array_index() {
                return self.get(rt, Symbol::Index(index));
            }
        }
        self.get(rt, name)
    }

    pub fn has_property(&mut self, rt: &mut Runtime, name: Symbol) -> bool {
        let mut slot = Slot::new();
        self.get_property_slot(rt, name, &mut slot)
    }

    pub fn has_own_property(&mut self, rt: &mut Runtime, name: Symbol) -> bool {
        let mut slot = Slot::new();
        match name {
            Symbol::Index(index) if !self.is_host_object() => {
                self.get_own_indexed_property_slot(rt, index, &mut slot)
            }
            name => self.get_own_non_indexed_property_slot(rt, name.to_named(), &mut slot),
        }
    }

    pub fn has_named_or_indexed(&mut self, rt: &mut Runtime, name: Symbol) -> bool {
        if !self.is_host_object() {
            if let Some(index) = name.array_index() {
                return self.has_property(rt, Symbol::Index(index));
            }
        }
        self.has_property(rt, name)
    }

    pub fn put_non_indexed_slot(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        val: JsValue,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<(), JsValue> {
        (self.class.method_table.PutNonIndexedSlot)(self, rt, name, val, slot, throwable)
    }

    pub fn put_indexed_slot(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        val: JsValue,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<(), JsValue> {
        (self.class.method_table.PutIndexedSlot)(self, rt, index, val, slot, throwable)
    }

    pub fn put_slot(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        val: JsValue,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<(), JsValue> {
        match name {
            Symbol::Index(index) if !self.is_host_object() => {
                self.put_indexed_slot(rt, index, val, slot, throwable)
            }
            name => self.put_non_indexed_slot(rt, name.to_named(), val, slot, throwable),
        }
    }

    pub fn put(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        val: JsValue,
        throwable: bool,
    ) -> Result<(), JsValue> {
        let mut slot = Slot::new();
        self.put_slot(rt, name, val, &mut slot, throwable)
    }

    /// Like [put](Self::put), but writing a property that does not resolve
    /// anywhere on the chain is a ReferenceError.
    pub fn put_required(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        val: JsValue,
        throwable: bool,
    ) -> Result<(), JsValue> {
        let mut probe = Slot::new();
        if !self.get_property_slot(rt, name, &mut probe) {
            let desc = rt.description(name);
            let msg = JsString::new(rt, format!("'{}' is not defined", desc));
            return Err(JsValue::new(JsReferenceError::new(rt, msg, None)));
        }
        let mut slot = Slot::new();
        self.put_slot(rt, name, val, &mut slot, throwable)
    }

    pub fn put_named_or_indexed(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        val: JsValue,
        throwable: bool,
    ) -> Result<(), JsValue> {
        if !self.is_host_object() {
            if let Some(index) = name.array_index() {
                return self.put(rt, Symbol::Index(index), val, throwable);
            }
        }
        self.put(rt, name, val, throwable)
    }

    pub fn delete_non_indexed(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        (self.class.method_table.DeleteNonIndexed)(self, rt, name, throwable)
    }

    pub fn delete_indexed(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        (self.class.method_table.DeleteIndexed)(self, rt, index, throwable)
    }

    /// Own-only delete. Index-like spellings delete both the named twin and
    /// the element.
    pub fn delete(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        match name {
            Symbol::Index(index) if !self.is_host_object() => {
                self.delete_indexed(rt, index, throwable)
            }
            name => {
                let name = name.to_named();
                if !self.is_host_object() {
                    if let Some(index) = name.array_index() {
                        return self.delete_indexed(rt, index, throwable);
                    }
                }
                self.delete_non_indexed(rt, name, throwable)
            }
        }
    }

    pub(crate) fn delete_indexed_internal(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if self.indexed.length() <= index {
            return Ok(true);
        }
        if self.indexed.dense() {
            if index < self.indexed.vector.size() {
                *self.indexed.vector.at_mut(index) = JsValue::encode_empty_value();
                return Ok(true);
            }
            if index < MAX_VECTOR_SIZE as u32 {
                return Ok(true);
            }
        }
        let mut map = match self.indexed.map {
            Some(map) => map,
            None => return Ok(true),
        };
        let configurable = match map.get(&index) {
            Some(entry) => entry.attributes().is_configurable(),
            None => return Ok(true),
        };
        if !configurable {
            if throwable {
                let msg = JsString::new(rt, "cannot delete non-configurable property");
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        map.remove(&index);
        if map.is_empty() {
            self.indexed.make_dense();
        }
        Ok(true)
    }

    fn define_own_indexed_value_dense_internal(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        val: JsValue,
        absent: bool,
    ) {
        let value = if absent {
            JsValue::encode_undefined_value()
        } else {
            val
        };
        // length first, element storage second
        if index >= self.indexed.length() {
            self.indexed.set_length(index + 1);
        }
        if index < self.indexed.vector.size() {
            *self.indexed.vector.at_mut(index) = value;
            return;
        }
        if !self.structure.is_indexed() {
            let s = self.structure.change_indexed_transition(rt);
            self.structure = s;
            rt.heap().write_barrier(*self);
        }
        let stack = rt.shadowstack();
        letroot!(vector = stack, self.indexed.vector);
        vector.mut_handle().resize(rt.heap(), index + 1);
        self.indexed.vector = *vector;
        *self.indexed.vector.at_mut(index) = value;
    }

    pub fn define_own_indexed_property_internal(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        desc: &PropertyDescriptor,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        if index >= self.indexed.length() && !self.indexed.writable() {
            if throwable {
                let msg = JsString::new(
                    rt,
                    "adding an element to an array whose length is not writable",
                );
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }

        if self.indexed.dense() {
            if desc.is_default() {
                if index < MAX_VECTOR_SIZE as u32 {
                    if !self.is_extensible() && !self.has_own_element(index) {
                        if throwable {
                            let msg = JsString::new(rt, "object not extensible");
                            return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                        }
                        return Ok(false);
                    }
                    self.define_own_indexed_value_dense_internal(
                        rt,
                        index,
                        desc.value(),
                        desc.is_value_absent(),
                    );
                    return Ok(true);
                }
            } else {
                if is_absent_descriptor(desc)
                    && index < self.indexed.vector.size()
                    && !self.indexed.vector.at(index).is_empty()
                {
                    if !desc.is_value_absent() {
                        *self.indexed.vector.at_mut(index) = desc.value();
                    }
                    return Ok(true);
                }
                if index < MAX_VECTOR_SIZE as u32 {
                    self.indexed.make_sparse(rt);
                }
            }
        }

        let mut sparse = self.indexed.ensure_map(rt);
        if let Some(current) = sparse.get(&index).copied() {
            let mut returned = false;
            if current.is_defined_property_accepted(rt, desc, throwable, &mut returned)? {
                let mut merged = current;
                merged.merge(rt, desc);
                sparse.insert(index, merged);
            }
            return Ok(returned);
        }
        if !self.is_extensible() {
            if throwable {
                let msg = JsString::new(rt, "object not extensible");
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        if !self.structure.is_indexed() {
            let s = self.structure.change_indexed_transition(rt);
            self.structure = s;
            rt.heap().write_barrier(*self);
        }
        if index >= self.indexed.length() {
            self.indexed.set_length(index + 1);
        }
        let stored = StoredSlot::new(rt, desc);
        sparse.insert(index, stored);
        Ok(true)
    }

    fn has_own_element(&mut self, index: u32) -> bool {
        if self.indexed.dense() {
            return index < self.indexed.vector.size()
                && !self.indexed.vector.at(index).is_empty();
        }
        self.indexed
            .map
            .as_ref()
            .map(|map| map.contains_key(&index))
            .unwrap_or(false)
    }

    pub fn define_own_non_indexed_property_slot(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        desc: &PropertyDescriptor,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        (self.class.method_table.DefineOwnNonIndexedPropertySlot)(
            self, rt, name, desc, slot, throwable,
        )
    }

    pub fn define_own_indexed_property_slot(
        &mut self,
        rt: &mut Runtime,
        index: u32,
        desc: &PropertyDescriptor,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        (self.class.method_table.DefineOwnIndexedPropertySlot)(self, rt, index, desc, slot, throwable)
    }

    pub fn define_own_property_slot(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        desc: &PropertyDescriptor,
        slot: &mut Slot,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        match name {
            Symbol::Index(index) if !self.is_host_object() => {
                self.define_own_indexed_property_slot(rt, index, desc, slot, throwable)
            }
            name => {
                let name = name.to_named();
                if !self.is_host_object() {
                    if let Some(index) = name.array_index() {
                        return self.define_own_indexed_property_slot(
                            rt, index, desc, slot, throwable,
                        );
                    }
                }
                self.define_own_non_indexed_property_slot(rt, name, desc, slot, throwable)
            }
        }
    }

    pub fn define_own_property(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        desc: &PropertyDescriptor,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        let mut slot = Slot::new();
        self.define_own_property_slot(rt, name, desc, &mut slot, throwable)
    }

    /// Install a property the object is known not to have yet, bypassing the
    /// extensibility check. Used by initializers that populate objects the
    /// embedder has already locked down.
    pub fn define_new_own_property(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
        desc: &PropertyDescriptor,
    ) {
        debug_assert!(
            self.structure.get(rt, name).is_not_found(),
            "property already present"
        );
        let stored = StoredSlot::new(rt, desc);
        let mut slot = Slot::new();
        JsObject::add_own_property(self, rt, name, stored.attributes(), stored.value(), &mut slot);
    }

    pub fn get_own_property(
        &mut self,
        rt: &mut Runtime,
        name: Symbol,
    ) -> Option<PropertyDescriptor> {
        let mut slot = Slot::new();
        if self.get_own_property_slot(rt, name, &mut slot) {
            return Some(slot.to_descriptor());
        }
        None
    }

    pub fn get_property(&mut self, rt: &mut Runtime, name: Symbol) -> PropertyDescriptor {
        let mut slot = Slot::new();
        if self.get_property_slot(rt, name, &mut slot) {
            return slot.to_descriptor();
        }
        PropertyDescriptor::new_val(JsValue::encode_empty_value(), AttrSafe::not_found())
    }

    pub fn has_indexed_property(&self) -> bool {
        let mut obj = *self;
        loop {
            if obj.structure.is_indexed() {
                return true;
            }
            match obj.prototype() {
                Some(proto) => obj = *proto,
                None => break false,
            }
        }
    }

    pub(crate) fn collect_own_property_names(
        &mut self,
        rt: &mut Runtime,
        collector: &mut dyn FnMut(Symbol, u32),
        mode: EnumerationMode,
    ) {
        (self.class.method_table.GetOwnPropertyNames)(self, rt, collector, mode)
    }

    pub(crate) fn collect_property_names(
        &mut self,
        rt: &mut Runtime,
        collector: &mut dyn FnMut(Symbol, u32),
        mode: EnumerationMode,
    ) {
        (self.class.method_table.GetPropertyNames)(self, rt, collector, mode)
    }

    /// Own keys in specification order: integer indexes first (ascending,
    /// with index-spelled named keys merged in), then named keys in slot
    /// order, then host names.
    pub fn get_own_property_names(&mut self, rt: &mut Runtime, mode: EnumerationMode) -> Vec<Symbol> {
        JsObject::force_initialize(self, rt);
        let mut indexed: Vec<(u32, Symbol)> = Vec::new();
        let mut named: Vec<(u32, Symbol)> = Vec::new();
        {
            let mut collector = |name: Symbol, offset: u32| match name {
                Symbol::Index(index) => indexed.push((index, name)),
                Symbol::Sym(_) => {}
                name => {
                    if let Some(index) = name.array_index() {
                        indexed.push((index, name));
                    } else {
                        named.push((offset, name));
                    }
                }
            };
            self.collect_own_property_names(rt, &mut collector, mode);
        }
        indexed.sort_by_key(|entry| entry.0);
        named.sort_by_key(|entry| entry.0);
        indexed
            .into_iter()
            .map(|entry| entry.1)
            .chain(named.into_iter().map(|entry| entry.1))
            .collect()
    }

    /// Own keys created from JS Symbol primitives.
    pub fn get_own_property_symbols(&mut self, rt: &mut Runtime) -> Vec<Symbol> {
        JsObject::force_initialize(self, rt);
        let mut symbols = Vec::new();
        {
            let mut collector = |name: Symbol, _: u32| {
                if name.is_symbol() {
                    symbols.push(name);
                }
            };
            self.collect_own_property_names(rt, &mut collector, EnumerationMode::IncludeNotEnumerable);
        }
        symbols
    }

    fn for_in_cache_valid(&mut self, cache: &GcPointer<ForInCache>) -> bool {
        let mut i = 0;
        let mut proto = self.prototype().copied();
        while let Some(cur) = proto {
            if i >= cache.prototype_shapes().len()
                || !GcPointer::ptr_eq(&cur.structure(), &cache.prototype_shapes()[i])
            {
                return false;
            }
            i += 1;
            proto = cur.prototype().copied();
        }
        i == cache.prototype_shapes().len()
    }

    /// Enumerable names of the whole chain for for-in, deduplicated with
    /// number/string index equivalence. The result is shared: while every
    /// prototype keeps its shape, repeated calls return the same cell.
    pub fn get_for_in_property_names(&mut self, rt: &mut Runtime) -> GcPointer<ForInCache> {
        JsObject::force_initialize(self, rt);
        if let Some(cache) = self.structure.for_in_cache() {
            if self.for_in_cache_valid(&cache) {
                return cache;
            }
            self.structure.clear_for_in_cache();
        }

        let mut prefix: Vec<GcPointer<Structure>> = Vec::new();
        let mut names: Vec<Symbol> = Vec::new();
        let mut seen: HashSet<Symbol> = HashSet::new();
        let mut cacheable = self.structure.is_shaped();
        let mut own_count = 0usize;

        let mut cur = *self;
        let mut is_receiver = true;
        loop {
            if !is_receiver {
                prefix.push(cur.structure());
            }
            cacheable &= cur.structure.is_shaped();
            let keys = cur.get_own_property_names(rt, EnumerationMode::Default);
            for name in keys {
                if name.is_symbol() {
                    continue;
                }
                let canonical = match name.array_index() {
                    Some(index) => Symbol::Index(index),
                    None => name,
                };
                if seen.insert(canonical) {
                    names.push(name);
                }
            }
            if is_receiver {
                own_count = names.len();
                is_receiver = false;
            }
            match cur.prototype().copied() {
                Some(proto) => cur = proto,
                None => break,
            }
        }

        let cache = rt.heap().allocate(ForInCache { prefix, names });
        if cacheable
            && own_count > 0
            && cache.prototype_shapes().len() + cache.names().len() <= 4 * own_count
        {
            self.structure.set_for_in_cache(cache);
            rt.heap().write_barrier(self.structure());
        }
        cache
    }

    fn change_extensible(&mut self, rt: &mut Runtime, val: bool) {
        if val {
            self.flags |= OBJ_FLAG_EXTENSIBLE;
        } else {
            self.flags &= !OBJ_FLAG_EXTENSIBLE;
        }
        let s = self.structure.change_extensible_transition(rt);
        self.structure = s;
        rt.heap().write_barrier(*self);
        self.indexed.make_sparse(rt);
    }

    pub fn prevent_extensions(&mut self, rt: &mut Runtime) {
        if self.is_extensible() {
            self.change_extensible(rt, false);
        }
    }

    pub fn seal(&mut self, rt: &mut Runtime) -> Result<bool, JsValue> {
        if (self.flags & OBJ_FLAG_SEALED) != 0 {
            return Ok(true);
        }
        JsObject::force_initialize(self, rt);
        self.change_extensible(rt, false);
        if let Some(mut map) = self.indexed.map {
            for stored in map.values_mut() {
                let mut attrs = stored.attributes();
                attrs.set_configurable(false);
                stored.set_attributes(attrs);
            }
        }
        let s = self.structure.make_all_non_configurable(rt);
        self.structure = s;
        rt.heap().write_barrier(*self);
        self.flags |= OBJ_FLAG_SEALED;
        Ok(true)
    }

    pub fn freeze(&mut self, rt: &mut Runtime) -> Result<bool, JsValue> {
        if (self.flags & OBJ_FLAG_FROZEN) != 0 {
            return Ok(true);
        }
        JsObject::force_initialize(self, rt);
        self.change_extensible(rt, false);
        if let Some(mut map) = self.indexed.map {
            for stored in map.values_mut() {
                let mut attrs = stored.attributes();
                attrs.set_configurable(false);
                if attrs.is_data() {
                    attrs.set_writable(false);
                }
                stored.set_attributes(attrs);
            }
        }
        self.indexed.make_readonly();
        let s = self.structure.make_all_read_only(rt);
        self.structure = s;
        rt.heap().write_barrier(*self);
        self.flags |= OBJ_FLAG_SEALED | OBJ_FLAG_FROZEN;
        Ok(true)
    }

    pub fn is_sealed(&mut self, rt: &mut Runtime) -> bool {
        if (self.flags & OBJ_FLAG_SEALED) != 0 {
            return true;
        }
        if self.is_extensible() {
            return false;
        }
        if !self.structure.are_all_non_configurable(rt) {
            return false;
        }
        if !(self.class.method_table.CheckAllOwnIndexed)(self, rt, IndexedCheckMode::NonConfigurable)
        {
            return false;
        }
        self.flags |= OBJ_FLAG_SEALED;
        true
    }

    pub fn is_frozen(&mut self, rt: &mut Runtime) -> bool {
        if (self.flags & OBJ_FLAG_FROZEN) != 0 {
            return true;
        }
        if self.is_extensible() {
            return false;
        }
        if !self.structure.are_all_read_only(rt) {
            return false;
        }
        if !(self.class.method_table.CheckAllOwnIndexed)(self, rt, IndexedCheckMode::ReadOnly) {
            return false;
        }
        self.flags |= OBJ_FLAG_SEALED | OBJ_FLAG_FROZEN;
        true
    }

    /// `[[SetPrototypeOf]]`: requires extensibility and refuses to create a
    /// prototype cycle.
    pub fn set_prototype(
        &mut self,
        rt: &mut Runtime,
        new_prototype: Option<GcPointer<JsObject>>,
        throwable: bool,
    ) -> Result<bool, JsValue> {
        let same = match (self.prototype(), new_prototype.as_ref()) {
            (Some(a), Some(b)) => GcPointer::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return Ok(true);
        }
        if !self.is_extensible() {
            if throwable {
                let msg = JsString::new(rt, "cannot change prototype of non-extensible object");
                return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
            }
            return Ok(false);
        }
        let mut cur = new_prototype;
        while let Some(proto) = cur {
            if GcPointer::ptr_eq(&proto, self) {
                if throwable {
                    let msg = JsString::new(rt, "prototype chain would form a cycle");
                    return Err(JsValue::new(JsTypeError::new(rt, msg, None)));
                }
                return Ok(false);
            }
            cur = proto.prototype().copied();
        }
        let s = self.structure.change_prototype_transition(rt, new_prototype);
        self.structure = s;
        rt.heap().write_barrier(*self);
        Ok(true)
    }

    /// Stable nonzero identity, assigned on first request.
    pub fn object_id(&mut self, rt: &mut Runtime) -> u32 {
        if self.object_id == 0 {
            self.object_id = rt.next_object_id();
        }
        self.object_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RuntimeOptions;
    use crate::vm::arguments::Arguments;
    use crate::vm::function::JsNativeFunction;
    use crate::vm::host::{HostObjectDelegate, JsHostObject};
    use crate::vm::property_descriptor::AccessorDescriptor;
    use crate::vm::symbol_table::{make_symbol, Internable};

    #[test]
    fn test_put_get() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));

        object
            .put(&mut rt, "key".intern(), JsValue::new(42.4242), false)
            .unwrap();
        rt.heap().gc();
        let val = object.get(&mut rt, "key".intern()).unwrap();
        assert!(val.is_number());
        assert_eq!(val.get_number(), 42.4242);
    }

    #[test]
    fn test_indexed_put_get() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        for i in 0..10000u32 {
            object
                .put(&mut rt, Symbol::Index(i), JsValue::new(i), false)
                .unwrap();
        }
        rt.heap().gc();
        for i in 0..10000u32 {
            let val = object.get(&mut rt, Symbol::Index(i)).unwrap();
            assert_eq!(val.get_number() as u32, i);
        }
        // far beyond the dense vector limit
        object
            .put(&mut rt, Symbol::Index((1024 << 6) + 1), JsValue::new(42.42), false)
            .unwrap();
        rt.heap().gc();
        let val = object
            .get(&mut rt, Symbol::Index((1024 << 6) + 1))
            .unwrap();
        assert_eq!(val.get_number(), 42.42);
        assert_eq!(object.get(&mut rt, Symbol::Index(9999)).unwrap().get_number() as u32, 9999);
    }

    #[test]
    fn overwrite_keeps_enumeration_order() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        object.put(&mut rt, "a".intern(), JsValue::new(1i32), false).unwrap();
        object.put(&mut rt, "b".intern(), JsValue::new(2i32), false).unwrap();
        object.put(&mut rt, "a".intern(), JsValue::new(3i32), false).unwrap();
        let names = object.get_own_property_names(&mut rt, EnumerationMode::Default);
        assert_eq!(names, vec!["a".intern(), "b".intern()]);
        assert_eq!(object.get(&mut rt, "a".intern()).unwrap().get_int32(), 3);
    }

    #[test]
    fn redefine_non_configurable_follows_8_12_9() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        let initial = DataDescriptor::new(JsValue::new(1i32), E);
        assert!(object
            .define_own_property(&mut rt, "x".intern(), &initial, true)
            .unwrap());
        let change = DataDescriptor::new(
            JsValue::new(2i32),
            UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE,
        );
        assert!(object
            .define_own_property(&mut rt, "x".intern(), &change, true)
            .is_err());
        assert_eq!(
            object
                .define_own_property(&mut rt, "x".intern(), &change, false)
                .unwrap(),
            false
        );
        let same = DataDescriptor::new(
            JsValue::new(1i32),
            UNDEF_ENUMERABLE | UNDEF_CONFIGURABLE | UNDEF_WRITABLE,
        );
        assert!(object
            .define_own_property(&mut rt, "x".intern(), &same, true)
            .unwrap());
        assert_eq!(object.get(&mut rt, "x".intern()).unwrap().get_int32(), 1);
    }

    #[test]
    fn prototype_chain_reads_and_shadowing() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        letroot!(parent = stack, JsObject::new_empty(&mut rt));
        object.put(&mut rt, "a".intern(), JsValue::new(1i32), false).unwrap();
        assert!(object.set_prototype(&mut rt, Some(*parent), true).unwrap());
        parent.put(&mut rt, "b".intern(), JsValue::new(2i32), false).unwrap();

        assert_eq!(object.get(&mut rt, "b".intern()).unwrap().get_int32(), 2);
        // deleting an inherited property touches only the receiver
        assert!(object.delete(&mut rt, "b".intern(), false).unwrap());
        assert_eq!(object.get(&mut rt, "b".intern()).unwrap().get_int32(), 2);
        // shadowing write lands on the receiver
        object.put(&mut rt, "b".intern(), JsValue::new(9i32), false).unwrap();
        assert_eq!(object.get(&mut rt, "b".intern()).unwrap().get_int32(), 9);
        assert_eq!(parent.get(&mut rt, "b".intern()).unwrap().get_int32(), 2);
    }

    #[test]
    fn prototype_cycle_is_rejected() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(a = stack, JsObject::new_empty(&mut rt));
        letroot!(b = stack, JsObject::new_empty(&mut rt));
        assert!(b.set_prototype(&mut rt, Some(*a), true).unwrap());
        let before = a.prototype().copied();
        assert!(a.set_prototype(&mut rt, Some(*b), true).is_err());
        let after = a.prototype().copied();
        assert_eq!(before.is_some(), after.is_some());
        if let (Some(before), Some(after)) = (before, after) {
            assert!(GcPointer::ptr_eq(&before, &after));
        }
        let a_ptr = *a;
        assert!(a.set_prototype(&mut rt, Some(a_ptr), true).is_err());
    }

    #[test]
    fn accessors_invoke_getter_and_setter() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));

        fn getter(rt: &mut Runtime, args: &mut Arguments) -> Result<JsValue, JsValue> {
            let mut this = args.this.get_jsobject();
            this.get(rt, "backing".intern())
        }
        fn setter(rt: &mut Runtime, args: &mut Arguments) -> Result<JsValue, JsValue> {
            let mut this = args.this.get_jsobject();
            let value = args.at(0);
            this.put(rt, "backing".intern(), value, false)?;
            Ok(JsValue::encode_undefined_value())
        }

        letroot!(get = stack, JsNativeFunction::new(&mut rt, getter));
        letroot!(set = stack, JsNativeFunction::new(&mut rt, setter));
        let desc = AccessorDescriptor::new(JsValue::new(*get), JsValue::new(*set), E | C);
        assert!(object
            .define_own_property(&mut rt, "x".intern(), &desc, true)
            .unwrap());
        object.put(&mut rt, "x".intern(), JsValue::new(5i32), true).unwrap();
        assert_eq!(object.get(&mut rt, "x".intern()).unwrap().get_int32(), 5);
        assert_eq!(object.get(&mut rt, "backing".intern()).unwrap().get_int32(), 5);
    }

    #[test]
    fn getter_only_accessor_rejects_put() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        fn getter(_rt: &mut Runtime, _args: &mut Arguments) -> Result<JsValue, JsValue> {
            Ok(JsValue::new(1i32))
        }
        letroot!(get = stack, JsNativeFunction::new(&mut rt, getter));
        let desc = PropertyDescriptor::accessor_getter(JsValue::new(*get), E | C);
        assert!(object
            .define_own_property(&mut rt, "x".intern(), &desc, true)
            .unwrap());
        assert!(object
            .put(&mut rt, "x".intern(), JsValue::new(2i32), true)
            .is_err());
        assert!(object
            .put(&mut rt, "x".intern(), JsValue::new(2i32), false)
            .is_ok());
        assert_eq!(object.get(&mut rt, "x".intern()).unwrap().get_int32(), 1);
    }

    #[test]
    fn seal_and_freeze() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        object.put(&mut rt, "a".intern(), JsValue::new(1i32), false).unwrap();
        object.seal(&mut rt).unwrap();
        assert!(object.is_sealed(&mut rt));
        assert!(!object.is_frozen(&mut rt));
        // prevent_extensions after seal is a no-op
        object.prevent_extensions(&mut rt);
        assert!(object.is_sealed(&mut rt));
        // new properties are rejected
        assert!(object
            .put(&mut rt, "b".intern(), JsValue::new(2i32), true)
            .is_err());
        assert!(!object.has_own_property(&mut rt, "b".intern()));
        // existing data properties remain writable while only sealed
        object.put(&mut rt, "a".intern(), JsValue::new(3i32), true).unwrap();
        assert_eq!(object.get(&mut rt, "a".intern()).unwrap().get_int32(), 3);
        // delete is rejected
        assert_eq!(object.delete(&mut rt, "a".intern(), false).unwrap(), false);

        object.freeze(&mut rt).unwrap();
        assert!(object.is_frozen(&mut rt));
        assert!(object
            .put(&mut rt, "a".intern(), JsValue::new(4i32), true)
            .is_err());
        assert_eq!(object.get(&mut rt, "a".intern()).unwrap().get_int32(), 3);
        let desc = object.get_own_property(&mut rt, "a".intern()).unwrap();
        assert!(!desc.is_configurable());
        assert!(!desc.is_writable());
    }

    #[test]
    fn sealed_scan_promotes_flag() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        let pinned = DataDescriptor::new(JsValue::new(1i32), W | E);
        assert!(object
            .define_own_property(&mut rt, "a".intern(), &pinned, true)
            .unwrap());
        object.prevent_extensions(&mut rt);
        // never called seal(), but every property is non-configurable
        assert!(object.is_sealed(&mut rt));
        assert!(!object.is_frozen(&mut rt));
    }

    #[test]
    fn required_access_raises_reference_errors() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        assert!(object.get_required(&mut rt, "missing".intern()).is_err());
        assert!(object
            .put_required(&mut rt, "missing".intern(), JsValue::new(1i32), false)
            .is_err());
        object.put(&mut rt, "present".intern(), JsValue::new(1i32), false).unwrap();
        assert_eq!(
            object
                .get_required(&mut rt, "present".intern())
                .unwrap()
                .get_int32(),
            1
        );
        object
            .put_required(&mut rt, "present".intern(), JsValue::new(2i32), false)
            .unwrap();
        assert_eq!(object.get(&mut rt, "present".intern()).unwrap().get_int32(), 2);
    }

    #[test]
    fn named_and_computed_index_spellings_agree() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        object
            .put(&mut rt, Symbol::Index(0), JsValue::new(10i32), false)
            .unwrap();
        assert_eq!(
            object
                .get_named_or_indexed(&mut rt, "0".intern())
                .unwrap()
                .get_int32(),
            10
        );
        assert!(object.has_named_or_indexed(&mut rt, "0".intern()));
        assert!(!object.has_own_property(&mut rt, "0".intern()));
        object
            .put_named_or_indexed(&mut rt, "0".intern(), JsValue::new(11i32), false)
            .unwrap();
        assert_eq!(
            object.get(&mut rt, Symbol::Index(0)).unwrap().get_int32(),
            11
        );
    }

    #[test]
    fn index_like_named_property_disables_fast_index() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        assert!((object.flags & OBJ_FLAG_FAST_INDEX) != 0);
        // a *named* put with an index spelling lands in named storage
        object
            .put_non_indexed_slot(
                &mut rt,
                "7".intern(),
                JsValue::new(1i32),
                &mut Slot::new(),
                false,
            )
            .unwrap();
        assert!((object.flags & OBJ_FLAG_FAST_INDEX) == 0);
        assert!(object.structure.has_index_like_properties());
        // computed access now routes through the named alias
        assert_eq!(object.get(&mut rt, Symbol::Index(7)).unwrap().get_int32(), 1);
        object
            .put(&mut rt, Symbol::Index(7), JsValue::new(2i32), false)
            .unwrap();
        assert_eq!(
            object
                .get_named_or_indexed(&mut rt, "7".intern())
                .unwrap()
                .get_int32(),
            2
        );
        // and the twin is gone after a single delete
        assert!(object.delete(&mut rt, Symbol::Index(7), false).unwrap());
        assert!(!object.has_property(&mut rt, Symbol::Index(7)));
        assert!(!object.has_property(&mut rt, "7".intern()));
    }

    #[test]
    fn define_with_attributes_demotes_element() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        object
            .put(&mut rt, Symbol::Index(0), JsValue::new(1i32), false)
            .unwrap();
        assert!(object.indexed.dense());
        let hidden = DataDescriptor::new(JsValue::new(1i32), W | C);
        assert!(object
            .define_own_property(&mut rt, Symbol::Index(0), &hidden, true)
            .unwrap());
        assert!(object.indexed.sparse());
        let names = object.get_own_property_names(&mut rt, EnumerationMode::Default);
        assert!(names.is_empty(), "non-enumerable element is skipped");
        let all = object.get_own_property_names(&mut rt, EnumerationMode::IncludeNotEnumerable);
        assert_eq!(all, vec![Symbol::Index(0)]);
    }

    #[test]
    fn enumeration_merges_index_spelled_names() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        object.put(&mut rt, "b".intern(), JsValue::new(1i32), false).unwrap();
        object
            .put(&mut rt, Symbol::Index(2), JsValue::new(2i32), false)
            .unwrap();
        // named put with index spelling: merged into the index run
        object
            .put_non_indexed_slot(
                &mut rt,
                "0".intern(),
                JsValue::new(0i32),
                &mut Slot::new(),
                false,
            )
            .unwrap();
        let names = object.get_own_property_names(&mut rt, EnumerationMode::Default);
        assert_eq!(names, vec!["0".intern(), Symbol::Index(2), "b".intern()]);
    }

    #[test]
    fn symbol_keys_are_separate() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        let sym = make_symbol("hidden");
        object.put(&mut rt, sym, JsValue::new(1i32), false).unwrap();
        object.put(&mut rt, "visible".intern(), JsValue::new(2i32), false).unwrap();
        let names = object.get_own_property_names(&mut rt, EnumerationMode::IncludeNotEnumerable);
        assert_eq!(names, vec!["visible".intern()]);
        let symbols = object.get_own_property_symbols(&mut rt);
        assert_eq!(symbols, vec![sym]);
        assert_eq!(object.get(&mut rt, sym).unwrap().get_int32(), 1);
    }

    #[test]
    fn object_id_is_stable_and_nonzero() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(a = stack, JsObject::new_empty(&mut rt));
        letroot!(b = stack, JsObject::new_empty(&mut rt));
        let id_a = a.object_id(&mut rt);
        let id_b = b.object_id(&mut rt);
        assert_ne!(id_a, 0);
        assert_ne!(id_b, 0);
        assert_ne!(id_a, id_b);
        assert_eq!(a.object_id(&mut rt), id_a);
    }

    #[test]
    fn inline_cache_export_on_plain_hits() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        object.put(&mut rt, "x".intern(), JsValue::new(1i32), false).unwrap();
        let mut slot = Slot::new();
        assert!(object.get_own_property_slot(&mut rt, "x".intern(), &mut slot));
        let (shape, offset) = slot.load_cache().expect("plain data hit is cacheable");
        assert!(GcPointer::ptr_eq(&shape, &object.structure()));
        assert_eq!(offset, 0);
        // dictionary-mode objects are not cacheable
        object.delete(&mut rt, "x".intern(), false).unwrap();
        object.put(&mut rt, "y".intern(), JsValue::new(2i32), false).unwrap();
        let mut slot = Slot::new();
        assert!(object.get_own_property_slot(&mut rt, "y".intern(), &mut slot));
        assert!(slot.load_cache().is_none());
    }

    #[test]
    fn disable_ic_option_suppresses_cache() {
        let mut rt = Runtime::new(RuntimeOptions::default().with_disable_ic(true));
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        object.put(&mut rt, "x".intern(), JsValue::new(1i32), false).unwrap();
        let mut slot = Slot::new();
        assert!(object.get_own_property_slot(&mut rt, "x".intern(), &mut slot));
        assert!(slot.load_cache().is_none());
    }

    #[test]
    fn for_in_names_cache_and_invalidate() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(proto = stack, JsObject::new_empty(&mut rt));
        proto.put(&mut rt, "inherited".intern(), JsValue::new(1i32), false).unwrap();
        letroot!(object = stack, JsObject::new_with_prototype(&mut rt, Some(*proto)));
        object.put(&mut rt, "own".intern(), JsValue::new(2i32), false).unwrap();

        let first = object.get_for_in_property_names(&mut rt);
        assert_eq!(first.names(), &["own".intern(), "inherited".intern()]);
        let second = object.get_for_in_property_names(&mut rt);
        assert!(GcPointer::ptr_eq(&first, &second), "cache hit returns the shared cell");

        // a prototype shape change invalidates the cache on the next query
        proto.put(&mut rt, "more".intern(), JsValue::new(3i32), false).unwrap();
        let third = object.get_for_in_property_names(&mut rt);
        assert!(!GcPointer::ptr_eq(&second, &third));
        assert_eq!(
            third.names(),
            &["own".intern(), "inherited".intern(), "more".intern()]
        );
    }

    #[test]
    fn for_in_deduplicates_shadowed_names() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(proto = stack, JsObject::new_empty(&mut rt));
        proto.put(&mut rt, "x".intern(), JsValue::new(1i32), false).unwrap();
        proto
            .put(&mut rt, Symbol::Index(0), JsValue::new(1i32), false)
            .unwrap();
        letroot!(object = stack, JsObject::new_with_prototype(&mut rt, Some(*proto)));
        object.put(&mut rt, "x".intern(), JsValue::new(2i32), false).unwrap();
        object
            .put(&mut rt, Symbol::Index(0), JsValue::new(2i32), false)
            .unwrap();
        let names = object.get_for_in_property_names(&mut rt);
        assert_eq!(names.names(), &[Symbol::Index(0), "x".intern()]);
    }

    struct RecordingDelegate {
        values: Vec<(Symbol, JsValue)>,
    }

    unsafe impl Trace for RecordingDelegate {
        fn trace(&self, visitor: &mut dyn Tracer) {
            for (_, value) in self.values.iter() {
                value.trace(visitor);
            }
        }
    }

    impl HostObjectDelegate for RecordingDelegate {
        fn host_get(&mut self, _rt: &mut Runtime, name: Symbol) -> Result<JsValue, JsValue> {
            if name == "answer".intern() {
                return Ok(JsValue::new(42i32));
            }
            for (key, value) in self.values.iter() {
                if *key == name {
                    return Ok(*value);
                }
            }
            Ok(JsValue::encode_undefined_value())
        }
        fn host_set(
            &mut self,
            _rt: &mut Runtime,
            name: Symbol,
            value: JsValue,
        ) -> Result<(), JsValue> {
            self.values.push((name, value));
            Ok(())
        }
        fn host_own_names(&mut self, _rt: &mut Runtime) -> Vec<Symbol> {
            vec!["answer".intern(), "real".intern()]
        }
    }

    #[test]
    fn host_object_routes_through_delegate() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        let delegate = Box::new(RecordingDelegate { values: Vec::new() });
        letroot!(object = stack, JsHostObject::new(&mut rt, None, delegate));

        // a property the class owns bypasses the delegate
        object.define_new_own_property(
            &mut rt,
            "real".intern(),
            &*DataDescriptor::new(JsValue::new(1i32), W | E | C),
        );
        assert_eq!(object.get(&mut rt, "real".intern()).unwrap().get_int32(), 1);

        // unknown names route through the delegate, reads and writes alike
        assert_eq!(
            object.get(&mut rt, "answer".intern()).unwrap().get_int32(),
            42
        );
        object
            .put(&mut rt, "later".intern(), JsValue::new(7i32), false)
            .unwrap();
        assert_eq!(object.get(&mut rt, "later".intern()).unwrap().get_int32(), 7);
        // indexed keys respell to named symbols on host objects
        object
            .put(&mut rt, Symbol::Index(3), JsValue::new(8i32), false)
            .unwrap();
        assert_eq!(object.get(&mut rt, Symbol::Index(3)).unwrap().get_int32(), 8);

        // enumeration merges delegate names after class names, deduplicated
        let names =
            object.get_own_property_names(&mut rt, EnumerationMode::IncludeNotEnumerable);
        assert_eq!(names, vec!["real".intern(), "answer".intern()]);
        // resolution reports delegate-backed names as present
        assert!(object.has_own_property(&mut rt, "whatever".intern()));
    }

    struct LazyPayload;

    fn lazy_init(obj: &mut GcPointer<JsObject>, rt: &mut Runtime) {
        obj.define_new_own_property(
            rt,
            "installed".intern(),
            &*DataDescriptor::new(JsValue::new(123i32), W | E | C),
        );
    }

    fn drop_lazy(_obj: &mut JsObject) {}

    crate::define_jsclass!(
        LazyPayload,
        Lazy,
        Some(drop_lazy),
        None,
        None,
        Some(lazy_init),
        false
    );

    #[test]
    fn lazy_objects_initialize_once_on_first_miss() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(structure = stack, rt.structure_for_prototype(None));
        letroot!(object = stack, JsObject::new(&mut rt, &structure, LazyPayload::get_class()));
        object.flags |= OBJ_FLAG_LAZY;

        assert_eq!(
            object
                .get(&mut rt, "installed".intern())
                .unwrap()
                .get_int32(),
            123
        );
        assert!((object.flags & OBJ_FLAG_LAZY) == 0);
        // enumeration also sees the installed properties
        let names = object.get_own_property_names(&mut rt, EnumerationMode::Default);
        assert_eq!(names, vec!["installed".intern()]);
    }

    #[test]
    fn builtin_override_raises_descriptive_error() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        let method = DataDescriptor::new(JsValue::new(1i32), E | BUILTIN);
        assert!(object
            .define_own_property(&mut rt, "toFixed".intern(), &method, true)
            .unwrap());
        let err = object
            .put(&mut rt, "toFixed".intern(), JsValue::new(2i32), true)
            .unwrap_err();
        assert!(err.is_jsobject());
        let mut error = err.get_jsobject();
        let message = error.get(&mut rt, "message".intern()).unwrap();
        assert!(message.is_jsstring());
        let text = unsafe {
            message
                .get_object()
                .downcast_unchecked::<JsString>()
                .as_str()
                .to_owned()
        };
        assert!(text.contains("toFixed"));
        // silent mode drops the write
        object
            .put(&mut rt, "toFixed".intern(), JsValue::new(2i32), false)
            .unwrap();
        assert_eq!(object.get(&mut rt, "toFixed".intern()).unwrap().get_int32(), 1);
    }

    #[test]
    fn non_extensible_rejects_new_properties() {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let stack = rt.shadowstack();
        letroot!(object = stack, JsObject::new_empty(&mut rt));
        object.prevent_extensions(&mut rt);
        assert!(object
            .put(&mut rt, "a".intern(), JsValue::new(1i32), true)
            .is_err());
        let desc = DataDescriptor::new(JsValue::new(1i32), W | E | C);
        assert!(object
            .define_own_property(&mut rt, "a".intern(), &desc, true)
            .is_err());
        // the internal-force path still installs
        object.define_new_own_property(&mut rt, "forced".intern(), &desc);
        assert_eq!(object.get(&mut rt, "forced".intern()).unwrap().get_int32(), 1);
    }
}
