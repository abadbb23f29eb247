/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
//! Object model and property-access core of the vesper JavaScript virtual
//! machine: shaped objects, the property descriptor machinery, named and
//! indexed access engines, enumeration, and extensibility control, on top of
//! a garbage-collected heap with an explicit rooting protocol.
#![allow(dead_code)]
#![allow(
    clippy::collapsible_if,
    clippy::collapsible_else_if,
    clippy::mut_from_ref,
    clippy::missing_safety_doc,
    clippy::new_without_default,
    clippy::too_many_arguments
)]

#[doc(hidden)]
pub use mopa;

#[macro_use]
pub mod gc;
#[macro_use]
pub mod vm;
pub mod options;

pub mod prelude {
    pub use crate::gc::cell::{GcCell, GcPointer, Trace, Tracer, WeakRef};
    pub use crate::gc::shadowstack::ShadowStack;
    pub use crate::gc::Heap;
    pub use crate::letroot;
    pub use crate::options::RuntimeOptions;
    pub use crate::vm::arguments::Arguments;
    pub use crate::vm::array::JsArray;
    pub use crate::vm::attributes::*;
    pub use crate::vm::error::*;
    pub use crate::vm::function::{JsNativeFunction, NativeFunction};
    pub use crate::vm::host::{HostObjectDelegate, JsHostObject};
    pub use crate::vm::object::{EnumerationMode, JsObject};
    pub use crate::vm::property_descriptor::*;
    pub use crate::vm::slot::{PutResultType, Slot};
    pub use crate::vm::string::{JsString, JsStringObject};
    pub use crate::vm::structure::{ForInCache, Structure};
    pub use crate::vm::symbol_table::{make_symbol, Internable, Symbol};
    pub use crate::vm::value::JsValue;
    pub use crate::vm::Runtime;
}
