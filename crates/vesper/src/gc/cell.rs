/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use mopa::mopafy;
use std::{
    any::TypeId,
    cell::Cell,
    collections::HashMap,
    marker::PhantomData,
    mem::size_of,
    ptr::NonNull,
};

/// Mark colors stored in the cell header. Freshly allocated cells are white;
/// marking turns reachable cells grey then black; sweeping frees whatever is
/// still white and resets survivors.
pub const CELL_WHITE: u8 = 0;
pub const CELL_GREY: u8 = 1;
pub const CELL_BLACK: u8 = 2;

/// Visitor used by the collector while marking. `Trace` implementations feed
/// every reachable cell into it.
pub trait Tracer {
    fn visit(&mut self, cell: GcPointer<dyn GcCell>);
    fn visit_weak(&mut self, slot: *const WeakSlot);
}

/// Indicates that a type can be traced by the garbage collector.
///
/// # Safety
/// An implementation must report every field that owns or may own a GC
/// pointer. A missed field is unreachable to the collector and will be
/// freed under the tracer's feet.
pub unsafe trait Trace {
    fn trace(&self, visitor: &mut dyn Tracer) {
        let _ = visitor;
    }
}

/// A type that can be allocated on the GC heap and handed to the JavaScript
/// environment.
pub trait GcCell: mopa::Any + Trace {
    /// Used when a cell carries trailing storage, i.e. slot vectors.
    fn compute_size(&self) -> usize {
        std::mem::size_of_val(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

mopafy!(GcCell);

/// Header placed in front of every heap cell: the `dyn GcCell` vtable for the
/// payload, its `TypeId` for checked downcasts, and the mark byte.
#[repr(C)]
pub struct GcPointerBase {
    vtable: usize,
    type_id: TypeId,
    state: Cell<u8>,
}

impl GcPointerBase {
    pub fn new(vtable: usize, type_id: TypeId) -> Self {
        Self {
            vtable,
            type_id,
            state: Cell::new(CELL_WHITE),
        }
    }

    pub fn state(&self) -> u8 {
        self.state.get()
    }

    pub fn set_state(&self, from: u8, to: u8) -> bool {
        if self.state.get() == from {
            self.state.set(to);
            return true;
        }
        false
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn data<T>(&self) -> *mut T {
        unsafe {
            (self as *const Self as *mut u8)
                .add(size_of::<Self>())
                .cast()
        }
    }

    pub fn get_dyn(&self) -> &dyn GcCell {
        unsafe {
            std::mem::transmute(mopa::TraitObject {
                data: self.data::<u8>() as _,
                vtable: self.vtable as _,
            })
        }
    }

    pub fn allocation_size(&self) -> usize {
        self.get_dyn().compute_size() + size_of::<Self>()
    }
}

pub fn vtable_of<T: GcCell>(x: &T) -> usize {
    unsafe { std::mem::transmute::<_, mopa::TraitObject>(x as *const T as *const dyn GcCell).vtable as usize }
}

/// A garbage collected pointer to a heap cell.
///
/// The pointer itself is a single machine word; the payload's vtable lives in
/// the cell header, so `GcPointer<dyn GcCell>` is as thin as `GcPointer<T>`.
#[repr(transparent)]
pub struct GcPointer<T: ?Sized> {
    pub(crate) base: NonNull<GcPointerBase>,
    pub(crate) marker: PhantomData<T>,
}

impl<T: GcCell + ?Sized> GcPointer<T> {
    pub fn ptr_eq<U: GcCell + ?Sized>(this: &Self, other: &GcPointer<U>) -> bool {
        this.base == other.base
    }

    #[inline]
    pub fn as_dyn(self) -> GcPointer<dyn GcCell> {
        GcPointer {
            base: self.base,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn is<U: GcCell>(self) -> bool {
        unsafe { (*self.base.as_ptr()).type_id == TypeId::of::<U>() }
    }

    #[inline]
    pub fn get_dyn(&self) -> &dyn GcCell {
        unsafe { (*self.base.as_ptr()).get_dyn() }
    }

    /// # Safety
    /// The caller must know the payload really is a `U`.
    #[inline]
    pub unsafe fn downcast_unchecked<U: GcCell>(self) -> GcPointer<U> {
        GcPointer {
            base: self.base,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn downcast<U: GcCell>(self) -> Option<GcPointer<U>> {
        if !self.is::<U>() {
            None
        } else {
            Some(unsafe { self.downcast_unchecked() })
        }
    }
}

impl<T: ?Sized> Copy for GcPointer<T> {}
impl<T: ?Sized> Clone for GcPointer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: GcCell> std::ops::Deref for GcPointer<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        unsafe { &*(*self.base.as_ptr()).data::<T>() }
    }
}

impl<T: GcCell> std::ops::DerefMut for GcPointer<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *(*self.base.as_ptr()).data::<T>() }
    }
}

impl<T: GcCell + ?Sized> PartialEq for GcPointer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}
impl<T: GcCell + ?Sized> Eq for GcPointer<T> {}

impl<T: GcCell> std::fmt::Pointer for GcPointer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:p}", self.base)
    }
}

unsafe impl<T: GcCell + ?Sized> Trace for GcPointer<T> {
    fn trace(&self, visitor: &mut dyn Tracer) {
        visitor.visit(self.as_dyn());
    }
}

impl<T: GcCell + ?Sized> GcCell for GcPointer<T> {}

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum WeakState {
    Free,
    Unmarked,
    Mark,
}

/// Collector-owned slot a weak reference points through. The target is nulled
/// when a cycle finds it dead.
pub struct WeakSlot {
    pub(crate) value: *mut GcPointerBase,
    pub(crate) state: WeakState,
}

/// Weak reference to a heap cell. Upgrading fails after the target is swept.
#[repr(transparent)]
pub struct WeakRef<T: GcCell> {
    pub(crate) inner: NonNull<WeakSlot>,
    pub(crate) marker: PhantomData<T>,
}

impl<T: GcCell> WeakRef<T> {
    pub fn upgrade(&self) -> Option<GcPointer<T>> {
        unsafe {
            let slot = self.inner.as_ref();
            if slot.value.is_null() {
                return None;
            }
            Some(GcPointer {
                base: NonNull::new_unchecked(slot.value),
                marker: PhantomData,
            })
        }
    }
}

impl<T: GcCell> Copy for WeakRef<T> {}
impl<T: GcCell> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

unsafe impl<T: GcCell> Trace for WeakRef<T> {
    fn trace(&self, visitor: &mut dyn Tracer) {
        visitor.visit_weak(self.inner.as_ptr());
    }
}

macro_rules! impl_prim {
    ($($t: ty)*) => {
        $(
            unsafe impl Trace for $t {}
            impl GcCell for $t {}
        )*
    };
}

impl_prim!(String bool f32 f64 u8 i8 u16 i16 u32 i32 u64 i64 usize isize);

unsafe impl<T: Trace> Trace for Vec<T> {
    fn trace(&self, visitor: &mut dyn Tracer) {
        for value in self.iter() {
            value.trace(visitor);
        }
    }
}

impl<T: Trace + 'static> GcCell for Vec<T> {}

unsafe impl<T: Trace> Trace for Option<T> {
    fn trace(&self, visitor: &mut dyn Tracer) {
        if let Some(value) = self {
            value.trace(visitor);
        }
    }
}

unsafe impl<K: Trace, V: Trace> Trace for HashMap<K, V> {
    fn trace(&self, visitor: &mut dyn Tracer) {
        for (key, value) in self.iter() {
            key.trace(visitor);
            value.trace(visitor);
        }
    }
}

impl<K: Trace + 'static, V: Trace + 'static> GcCell for HashMap<K, V> {}

unsafe impl<A: Trace, B: Trace> Trace for (A, B) {
    fn trace(&self, visitor: &mut dyn Tracer) {
        self.0.trace(visitor);
        self.1.trace(visitor);
    }
}
