//! Shadow stack used for rooting heap cells held in locals.
//!
//! The collector cannot see the machine stack, so any value that owns GC
//! pointers and lives across an allocation point must be registered here.
//! Roots form a singly linked list of stack entries; pushing is a couple of
//! stores and popping happens automatically when the `Rooted` guard drops,
//! on every exit path. Rooting inside a loop body bounds the list to one
//! entry per live iteration.
use crate::gc::cell::{Trace, Tracer};
use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::ptr::null_mut;

pub struct ShadowStack {
    #[doc(hidden)]
    pub head: Cell<*mut RawShadowStackEntry>,
}

impl ShadowStack {
    pub fn new() -> Self {
        Self {
            head: Cell::new(null_mut()),
        }
    }
}

#[repr(C)]
pub struct RawShadowStackEntry {
    stack: *mut ShadowStack,
    prev: *mut RawShadowStackEntry,
    /// Vtable of the rooted value's `Trace` implementation; the value itself
    /// starts right after this header.
    vtable: usize,
    data_start: [u8; 0],
}

impl RawShadowStackEntry {
    /// # Safety
    /// The entry must have been constructed by `letroot!` so the vtable and
    /// trailing value agree.
    pub unsafe fn get_dyn(&self) -> &dyn Trace {
        std::mem::transmute(mopa::TraitObject {
            data: self.data_start.as_ptr() as *mut (),
            vtable: self.vtable as _,
        })
    }
}

unsafe impl Trace for ShadowStack {
    fn trace(&self, visitor: &mut dyn Tracer) {
        unsafe {
            let mut head = self.head.get();
            while !head.is_null() {
                let next = (*head).prev;
                (*head).get_dyn().trace(visitor);
                head = next;
            }
        }
    }
}

#[repr(C)]
pub struct RootedInternal<'a, T: Trace> {
    pub stack: &'a ShadowStack,
    pub prev: *mut RawShadowStackEntry,
    pub vtable: usize,
    pub value: T,
}

impl<'a, T: Trace> RootedInternal<'a, T> {
    /// # Safety
    /// Only `letroot!` is allowed to build these; the entry is linked into
    /// the shadow stack and must stay pinned until dropped.
    #[inline]
    pub unsafe fn construct(
        stack: &'a ShadowStack,
        prev: *mut RawShadowStackEntry,
        vtable: usize,
        value: T,
    ) -> Self {
        Self {
            stack,
            prev,
            vtable,
            value,
        }
    }
}

impl<T: Trace> Drop for RootedInternal<'_, T> {
    fn drop(&mut self) {
        self.stack.head.set(self.prev);
    }
}

/// Rooted value on the stack. Non-copyable; derefs to the rooted value.
pub struct Rooted<'a, 'b, T: Trace> {
    #[doc(hidden)]
    pinned: Pin<&'a mut RootedInternal<'b, T>>,
}

impl<'a, 'b, T: Trace> Rooted<'a, 'b, T> {
    /// # Safety
    /// Part of the `letroot!` expansion, not for direct use.
    pub unsafe fn construct(pin: Pin<&'a mut RootedInternal<'b, T>>) -> Self {
        Self { pinned: pin }
    }

    pub fn mut_handle(&mut self) -> HandleMut<'_, T> {
        HandleMut { value: &mut **self }
    }

    pub fn handle(&self) -> Handle<'_, T> {
        Handle { value: &**self }
    }
}

impl<'a, T: Trace> Deref for Rooted<'a, '_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.pinned.value
    }
}

impl<'a, T: Trace> DerefMut for Rooted<'a, '_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe {
            &mut std::mem::transmute_copy::<_, &mut RootedInternal<T>>(&mut self.pinned).value
        }
    }
}

/// Shared reference to a rooted value.
pub struct Handle<'a, T: Trace> {
    value: &'a T,
}

pub struct HandleMut<'a, T: Trace> {
    value: &'a mut T,
}

impl<T: Trace> Deref for Handle<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.value
    }
}

impl<T: Trace> Deref for HandleMut<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.value
    }
}

impl<T: Trace> DerefMut for HandleMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value
    }
}

/// Root a value on the shadow stack for the rest of the enclosing scope.
///
/// Does not heap allocate: the value is placed on the machine stack and a
/// pointer to it is pushed onto the shadow stack. The binding is a
/// [Rooted](Rooted) that derefs to the value.
#[macro_export]
macro_rules! letroot {
    ($name: ident = $stack: expr, $value: expr) => {
        let stack: &$crate::gc::shadowstack::ShadowStack = &$stack;
        let value = $value;
        let mut $name = unsafe {
            $crate::gc::shadowstack::RootedInternal::<_>::construct(
                stack,
                stack.head.get(),
                std::mem::transmute::<_, $crate::mopa::TraitObject>(
                    &value as &dyn $crate::gc::cell::Trace,
                )
                .vtable as usize,
                value,
            )
        };
        stack.head.set(unsafe { std::mem::transmute(&mut $name) });
        let mut $name =
            unsafe { $crate::gc::shadowstack::Rooted::construct(std::pin::Pin::new(&mut $name)) };
    };
}
