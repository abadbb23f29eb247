/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::gc::cell::*;
use std::{any::TypeId, marker::PhantomData, mem::size_of, ptr::NonNull};

#[macro_use]
pub mod shadowstack;
pub mod cell;
pub mod mark_sweep;

pub trait MarkingConstraint {
    fn name(&self) -> &str {
        "<anonymous>"
    }
    fn execute(&mut self, marking: &mut dyn Tracer);
}

pub struct SimpleMarkingConstraint {
    name: String,
    exec: Box<dyn FnMut(&mut dyn Tracer)>,
}

impl SimpleMarkingConstraint {
    pub fn new(name: &str, exec: impl FnMut(&mut dyn Tracer) + 'static) -> Self {
        Self {
            name: name.to_owned(),
            exec: Box::new(exec),
        }
    }
}

impl MarkingConstraint for SimpleMarkingConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, marking: &mut dyn Tracer) {
        (self.exec)(marking);
    }
}

pub struct GcStats {
    pub allocated: usize,
    pub threshold: usize,
}

/// Garbage collector API the heap facade dispatches through.
///
/// # Implementation notes
/// - `allocate` *must not* start a collection cycle; callers rely on cell
///   addresses staying valid until the next explicit `gc`/`collect_if_necessary`.
/// - Constraints registered with `add_constraint` are the root set.
pub trait GarbageCollector {
    fn allocate(
        &mut self,
        size: usize,
        vtable: usize,
        type_id: TypeId,
    ) -> Option<NonNull<GcPointerBase>>;
    fn gc(&mut self);
    fn collect_if_necessary(&mut self);
    fn defer(&mut self);
    fn undefer(&mut self);
    fn stats(&self) -> GcStats;
    fn add_constraint(&mut self, constraint: Box<dyn MarkingConstraint>);
    fn make_weak_slot(&mut self, base: *mut GcPointerBase) -> *mut WeakSlot;
}

pub struct Heap {
    pub(crate) gc: Box<dyn GarbageCollector>,
}

impl Heap {
    pub fn new(gc: impl GarbageCollector + 'static) -> Self {
        Self { gc: Box::new(gc) }
    }

    #[inline]
    pub fn allocate<T: GcCell>(&mut self, value: T) -> GcPointer<T> {
        let size = value.compute_size() + size_of::<GcPointerBase>();
        let vtable = vtable_of(&value);
        let base = self
            .gc
            .allocate(size, vtable, TypeId::of::<T>())
            .expect("heap allocation failed");
        unsafe {
            (*base.as_ptr()).data::<T>().write(value);
            GcPointer {
                base,
                marker: PhantomData,
            }
        }
    }

    /// Record a store of `cell` into an owning field of another cell.
    ///
    /// The present collector is neither moving nor incremental, so this is a
    /// hook; every owning-field store still routes through it so a collector
    /// with a real barrier can be dropped in.
    #[inline]
    pub fn write_barrier<T: GcCell + ?Sized>(&mut self, cell: GcPointer<T>) {
        let _ = cell;
    }

    pub fn make_weak<T: GcCell>(&mut self, p: GcPointer<T>) -> WeakRef<T> {
        let slot = self.gc.make_weak_slot(p.base.as_ptr());
        unsafe {
            WeakRef {
                inner: NonNull::new_unchecked(slot),
                marker: PhantomData,
            }
        }
    }

    pub fn gc(&mut self) {
        self.gc.gc();
    }

    pub fn collect_if_necessary(&mut self) {
        self.gc.collect_if_necessary();
    }

    pub fn defer(&mut self) {
        self.gc.defer();
    }

    pub fn undefer(&mut self) {
        self.gc.undefer();
    }

    pub fn stats(&self) -> GcStats {
        self.gc.stats()
    }

    pub fn add_constraint(&mut self, constraint: impl MarkingConstraint + 'static) {
        self.gc.add_constraint(Box::new(constraint));
    }
}
