/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::gc::cell::{GcPointer, Trace, Tracer};
use crate::gc::shadowstack::ShadowStack;
use crate::gc::{mark_sweep::MarkSweep, Heap, SimpleMarkingConstraint};
use crate::options::RuntimeOptions;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

pub mod arguments;
pub mod array;
pub mod array_storage;
pub mod attributes;
pub mod class;
pub mod error;
pub mod function;
pub mod host;
pub mod indexed_elements;
pub mod method_table;
pub mod object;
pub mod property_descriptor;
pub mod slot;
pub mod string;
pub mod structure;
pub mod symbol_table;
pub mod value;

use self::error::{JsRangeError, JsReferenceError, JsTypeError};
use self::object::JsObject;
use self::string::JsString;
use self::structure::Structure;
use self::symbol_table::{symbol_table, Symbol};

/// Baseline shapes and prototypes shared by every object the runtime makes.
#[derive(Default)]
pub struct GlobalData {
    pub(crate) object_prototype: Option<GcPointer<JsObject>>,
    pub(crate) empty_object_struct: Option<GcPointer<Structure>>,
    pub(crate) function_structure: Option<GcPointer<Structure>>,
    pub(crate) array_structure: Option<GcPointer<Structure>>,
    pub(crate) string_structure: Option<GcPointer<Structure>>,
    pub(crate) error_structure: Option<GcPointer<Structure>>,
    pub(crate) type_error_structure: Option<GcPointer<Structure>>,
    pub(crate) reference_error_structure: Option<GcPointer<Structure>>,
    pub(crate) range_error_structure: Option<GcPointer<Structure>>,
    /// Shapes for objects created on an arbitrary prototype, keyed by the
    /// prototype cell.
    pub(crate) structure_registry: HashMap<usize, GcPointer<Structure>>,
}

impl GlobalData {
    pub fn get_object_prototype(&self) -> GcPointer<JsObject> {
        self.object_prototype.unwrap()
    }
}

unsafe impl Trace for GlobalData {
    fn trace(&self, visitor: &mut dyn Tracer) {
        self.object_prototype.trace(visitor);
        self.empty_object_struct.trace(visitor);
        self.function_structure.trace(visitor);
        self.array_structure.trace(visitor);
        self.string_structure.trace(visitor);
        self.error_structure.trace(visitor);
        self.type_error_structure.trace(visitor);
        self.reference_error_structure.trace(visitor);
        self.range_error_structure.trace(visitor);
        self.structure_registry.trace(visitor);
    }
}

/// The runtime instance: heap, shadow stack, shared shapes, identity counter.
pub struct Runtime {
    pub(crate) gc: Heap,
    pub(crate) shadowstack: ShadowStack,
    pub(crate) global_data: GlobalData,
    pub(crate) options: RuntimeOptions,
    pub(crate) object_id_counter: u32,
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Box<Runtime> {
        let heap = Heap::new(MarkSweep::new(&options));
        let mut this = Box::new(Runtime {
            gc: heap,
            shadowstack: ShadowStack::new(),
            global_data: GlobalData::default(),
            options,
            object_id_counter: 1,
        });
        let rt = &mut *this as *mut Runtime;
        this.gc.add_constraint(SimpleMarkingConstraint::new(
            "mark runtime roots",
            move |visitor| {
                let rt = unsafe { &mut *rt };
                rt.global_data.trace(visitor);
                rt.shadowstack.trace(visitor);
            },
        ));

        this.gc.defer();
        let proto_structure = Structure::new_indexed(&mut this, None, false);
        let proto = JsObject::new(&mut this, &proto_structure, JsObject::get_class());
        this.global_data.object_prototype = Some(proto);
        this.global_data.empty_object_struct =
            Some(Structure::new_indexed(&mut this, Some(proto), false));
        this.global_data.function_structure =
            Some(Structure::new_indexed(&mut this, Some(proto), false));
        this.global_data.array_structure =
            Some(Structure::new_indexed(&mut this, Some(proto), true));
        this.global_data.string_structure =
            Some(Structure::new_indexed(&mut this, Some(proto), false));
        this.global_data.error_structure =
            Some(Structure::new_indexed(&mut this, Some(proto), false));
        this.global_data.type_error_structure =
            Some(Structure::new_indexed(&mut this, Some(proto), false));
        this.global_data.reference_error_structure =
            Some(Structure::new_indexed(&mut this, Some(proto), false));
        this.global_data.range_error_structure =
            Some(Structure::new_indexed(&mut this, Some(proto), false));
        this.gc.undefer();
        this
    }

    pub fn heap(&mut self) -> &mut Heap {
        &mut self.gc
    }

    /// Shadow stack for rooting locals. The returned reference is detached
    /// from the runtime borrow so rooted scopes can keep using the runtime.
    pub fn shadowstack<'a>(&self) -> &'a ShadowStack {
        unsafe { std::mem::transmute(&self.shadowstack) }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn global_data(&self) -> &GlobalData {
        &self.global_data
    }

    /// Next stable object identity. Zero marks "unassigned", so a wrapped
    /// counter shifts down by one to skip it.
    pub fn next_object_id(&mut self) -> u32 {
        let id = self.object_id_counter;
        self.object_id_counter = self.object_id_counter.wrapping_add(1);
        if id == 0 {
            return u32::MAX;
        }
        id
    }

    /// The shared shape for plain objects created on `prototype`. Objects
    /// made through the factory with the same prototype start on the same
    /// shape so their property accesses stay cacheable together.
    pub fn structure_for_prototype(
        &mut self,
        prototype: Option<GcPointer<JsObject>>,
    ) -> GcPointer<Structure> {
        let key = match prototype.as_ref() {
            Some(proto) => proto.base.as_ptr() as usize,
            None => 0,
        };
        if let Some(structure) = self.global_data.structure_registry.get(&key) {
            return *structure;
        }
        let structure = Structure::new_indexed(self, prototype, false);
        self.global_data.structure_registry.insert(key, structure);
        structure
    }

    /// Human-readable spelling of a property key, for diagnostics.
    pub fn description(&self, sym: Symbol) -> String {
        match sym {
            Symbol::Key(id) | Symbol::Sym(id) => symbol_table().description(id).to_owned(),
            Symbol::Index(index) => index.to_string(),
        }
    }

    pub fn new_type_error(&mut self, msg: impl AsRef<str>) -> GcPointer<JsObject> {
        let msg = JsString::new(self, msg);
        JsTypeError::new(self, msg, None)
    }

    pub fn new_reference_error(&mut self, msg: impl AsRef<str>) -> GcPointer<JsObject> {
        let msg = JsString::new(self, msg);
        JsReferenceError::new(self, msg, None)
    }

    pub fn new_range_error(&mut self, msg: impl AsRef<str>) -> GcPointer<JsObject> {
        let msg = JsString::new(self, msg);
        JsRangeError::new(self, msg, None)
    }
}

/// Unchecked alias to a runtime, for callbacks that re-enter the VM.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct RuntimeRef(pub(crate) *mut Runtime);

impl Deref for RuntimeRef {
    type Target = Runtime;
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.0 }
    }
}

impl DerefMut for RuntimeRef {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.0 }
    }
}
