/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
//! Non-moving mark-sweep collector over libc::malloc. Simple and predictable;
//! the rest of the crate only talks to it through [GarbageCollector], so a
//! fancier collector can be swapped in behind the same rooting protocol.

use super::*;
use crate::options::RuntimeOptions;
use std::ptr::null_mut;

pub struct MarkSweep {
    allocations: Vec<*mut GcPointerBase>,
    weak_slots: Vec<Box<WeakSlot>>,
    constraints: Vec<Box<dyn MarkingConstraint>>,
    allocated: usize,
    threshold: usize,
    defers: usize,
    verbose: bool,
}

impl MarkSweep {
    pub fn new(options: &RuntimeOptions) -> Self {
        Self {
            allocations: Vec::with_capacity(256),
            weak_slots: Vec::new(),
            constraints: Vec::new(),
            allocated: 0,
            threshold: options.heap_threshold,
            defers: 0,
            verbose: options.verbose_gc,
        }
    }

    fn collect(&mut self) {
        if self.defers > 0 {
            return;
        }
        let before = self.allocated;
        {
            let mut marker = Marker {
                queue: Vec::with_capacity(64),
                gc: self,
            };
            marker.run();
        }
        self.update_weak_slots();
        let mut allocated = self.allocated;
        self.allocations.retain(|pointer| unsafe {
            let base = &**pointer;
            if base.set_state(CELL_BLACK, CELL_WHITE) {
                true
            } else {
                allocated -= base.allocation_size();
                std::ptr::drop_in_place(base.get_dyn() as *const dyn GcCell as *mut dyn GcCell);
                libc::free(*pointer as *mut _);
                false
            }
        });
        self.allocated = allocated;
        if self.allocated > self.threshold {
            self.threshold = (self.allocated as f64 * 1.5) as usize;
        }
        if self.verbose {
            eprintln!(
                "gc: {} -> {} bytes live, next threshold {}",
                before, self.allocated, self.threshold
            );
        }
    }

    fn update_weak_slots(&mut self) {
        for slot in self.weak_slots.iter_mut() {
            match slot.state {
                WeakState::Free => {}
                WeakState::Unmarked => {
                    // Nothing traced this slot during the cycle; recycle it.
                    slot.value = null_mut();
                    slot.state = WeakState::Free;
                }
                WeakState::Mark => {
                    if !slot.value.is_null() {
                        unsafe {
                            if (*slot.value).state() == CELL_WHITE {
                                slot.value = null_mut();
                            }
                        }
                    }
                    slot.state = WeakState::Unmarked;
                }
            }
        }
    }
}

struct Marker<'a> {
    gc: &'a mut MarkSweep,
    queue: Vec<*mut GcPointerBase>,
}

impl<'a> Marker<'a> {
    fn run(&mut self) {
        let mut constraints = std::mem::replace(&mut self.gc.constraints, Vec::new());
        for constraint in constraints.iter_mut() {
            constraint.execute(self);
        }
        std::mem::swap(&mut self.gc.constraints, &mut constraints);

        while let Some(ptr) = self.queue.pop() {
            unsafe {
                assert!((*ptr).set_state(CELL_GREY, CELL_BLACK));
                (*ptr).get_dyn().trace(self);
            }
        }
    }
}

impl Tracer for Marker<'_> {
    fn visit(&mut self, cell: GcPointer<dyn GcCell>) {
        let p = cell.base.as_ptr();
        unsafe {
            if (*p).set_state(CELL_WHITE, CELL_GREY) {
                self.queue.push(p);
            }
        }
    }

    fn visit_weak(&mut self, slot: *const WeakSlot) {
        unsafe {
            let slot = &mut *(slot as *mut WeakSlot);
            slot.state = WeakState::Mark;
        }
    }
}

impl GarbageCollector for MarkSweep {
    fn allocate(
        &mut self,
        size: usize,
        vtable: usize,
        type_id: TypeId,
    ) -> Option<NonNull<GcPointerBase>> {
        unsafe {
            let memory = libc::malloc(size).cast::<GcPointerBase>();
            if memory.is_null() {
                return None;
            }
            memory.write(GcPointerBase::new(vtable, type_id));
            self.allocated += size;
            self.allocations.push(memory);
            Some(NonNull::new_unchecked(memory))
        }
    }

    fn gc(&mut self) {
        self.collect();
    }

    fn collect_if_necessary(&mut self) {
        if self.allocated > self.threshold {
            self.collect();
        }
    }

    fn defer(&mut self) {
        self.defers += 1;
    }

    fn undefer(&mut self) {
        self.defers = self
            .defers
            .checked_sub(1)
            .expect("undefer without matching defer");
    }

    fn stats(&self) -> GcStats {
        GcStats {
            allocated: self.allocated,
            threshold: self.threshold,
        }
    }

    fn add_constraint(&mut self, constraint: Box<dyn MarkingConstraint>) {
        self.constraints.push(constraint);
    }

    fn make_weak_slot(&mut self, base: *mut GcPointerBase) -> *mut WeakSlot {
        for slot in self.weak_slots.iter_mut() {
            if slot.state == WeakState::Free {
                slot.value = base;
                slot.state = WeakState::Unmarked;
                return &mut **slot as *mut WeakSlot;
            }
        }
        self.weak_slots.push(Box::new(WeakSlot {
            value: base,
            state: WeakState::Unmarked,
        }));
        let slot = self.weak_slots.last_mut().unwrap();
        &mut **slot as *mut WeakSlot
    }
}

impl Drop for MarkSweep {
    fn drop(&mut self) {
        for pointer in self.allocations.iter() {
            unsafe {
                std::ptr::drop_in_place(
                    (**pointer).get_dyn() as *const dyn GcCell as *mut dyn GcCell,
                );
                libc::free(*pointer as *mut _);
            }
        }
        self.allocations.clear();
    }
}
