//! Growable buffers carved out of an allocator
//!
//! [`ScratchScope`] takes the exclusive borrow of an allocator for as long as
//! any [`ScratchVec`] built from it is alive, so the allocator cannot be
//! cleared underneath them. Superseded blocks are returned as buffers grow
//! and drop, in no particular order: use an allocator that accepts frees in
//! any order (linear, free list, heap), not the stack allocator.

use std::cell::{Cell, RefCell};
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use super::Allocator;

const MIN_CAPACITY: usize = 16;

/// Exclusive lease on an allocator shared by several scratch buffers
pub struct ScratchScope<'a> {
    allocator: RefCell<&'a mut dyn Allocator>,
    spills: Cell<usize>,
}

impl<'a> ScratchScope<'a> {
    /// Lease `allocator` until the scope is dropped
    pub fn new(allocator: &'a mut dyn Allocator) -> Self {
        Self {
            allocator: RefCell::new(allocator),
            spills: Cell::new(0),
        }
    }

    /// Buffers that outgrew the allocator and moved to the heap
    pub fn spills(&self) -> usize {
        self.spills.get()
    }

    /// Empty buffer; nothing is allocated until the first push
    pub fn vec<T: Copy>(&self) -> ScratchVec<'_, 'a, T> {
        ScratchVec {
            scope: self,
            storage: Storage::Arena {
                ptr: NonNull::dangling(),
                capacity: 0,
            },
            len: 0,
        }
    }

    /// Buffer with room for `capacity` elements when the allocator can hold them
    pub fn vec_with_capacity<T: Copy>(&self, capacity: usize) -> ScratchVec<'_, 'a, T> {
        let mut vec = self.vec();
        if capacity > 0 {
            vec.grow_to(capacity);
        }
        vec
    }

    fn allocate_array<T>(&self, capacity: usize) -> Option<NonNull<T>> {
        let size = mem::size_of::<T>().checked_mul(capacity)?;
        self.allocator
            .borrow_mut()
            .allocate(size, mem::align_of::<T>())
            .map(NonNull::cast)
    }

    fn deallocate<T>(&self, block: NonNull<T>) {
        self.allocator.borrow_mut().deallocate(Some(block.cast()));
    }
}

impl std::fmt::Debug for ScratchScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let allocator = self.allocator.borrow();
        f.debug_struct("ScratchScope")
            .field("used_memory", &allocator.used_memory())
            .field("size", &allocator.size())
            .field("spills", &self.spills.get())
            .finish()
    }
}

enum Storage<T> {
    Arena { ptr: NonNull<T>, capacity: usize },
    /// The allocator ran out; the rest of the buffer's life is on the heap
    Heap(Vec<T>),
}

/// `Vec`-like buffer of `Copy` values living in a [`ScratchScope`]
///
/// Grows by doubling inside the allocator. When the allocator is exhausted
/// the contents move to a heap `Vec`, so pushes never fail.
pub struct ScratchVec<'s, 'a, T: Copy> {
    scope: &'s ScratchScope<'a>,
    storage: Storage<T>,
    len: usize,
}

impl<T: Copy> ScratchVec<'_, '_, T> {
    /// Append a value
    pub fn push(&mut self, value: T) {
        if let Storage::Arena { capacity, .. } = self.storage {
            if self.len == capacity {
                self.grow_to((capacity * 2).max(MIN_CAPACITY));
            }
        }

        match &mut self.storage {
            Storage::Arena { ptr, .. } => {
                // SAFETY: `grow_to` guarantees `len < capacity` for arena storage.
                unsafe { ptr.as_ptr().add(self.len).write(value) };
            }
            Storage::Heap(vec) => vec.push(value),
        }
        self.len += 1;
    }

    /// Remove every element, keeping the capacity
    pub fn clear(&mut self) {
        if let Storage::Heap(vec) = &mut self.storage {
            vec.clear();
        }
        self.len = 0;
    }

    /// Whether the buffer had to leave the allocator
    pub fn is_spilled(&self) -> bool {
        matches!(self.storage, Storage::Heap(_))
    }

    fn grow_to(&mut self, capacity: usize) {
        let Storage::Arena { ptr: old, .. } = self.storage else {
            return;
        };

        let block = if mem::size_of::<T>() == 0 {
            None
        } else {
            self.scope.allocate_array::<T>(capacity)
        };
        match block {
            Some(new) => {
                // SAFETY: `new` holds at least `capacity > len` elements and
                // never overlaps the previous block, whose first `len`
                // elements are initialised.
                unsafe { ptr::copy_nonoverlapping(old.as_ptr(), new.as_ptr(), self.len) };
                self.release_block();
                self.storage = Storage::Arena { ptr: new, capacity };
            }
            None => {
                log::debug!(
                    "Scratch buffer of {} elements spilled to the heap",
                    capacity
                );
                self.scope.spills.set(self.scope.spills.get() + 1);
                let mut vec = Vec::with_capacity(capacity);
                vec.extend_from_slice(self);
                self.release_block();
                self.storage = Storage::Heap(vec);
            }
        }
    }

    /// Hand the current arena block back to the allocator
    fn release_block(&mut self) {
        if let Storage::Arena { ptr, capacity } = self.storage {
            if capacity > 0 {
                self.scope.deallocate(ptr);
                self.storage = Storage::Arena {
                    ptr: NonNull::dangling(),
                    capacity: 0,
                };
            }
        }
    }
}

impl<T: Copy> Drop for ScratchVec<'_, '_, T> {
    fn drop(&mut self) {
        self.release_block();
    }
}

impl<T: Copy> Deref for ScratchVec<'_, '_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match &self.storage {
            // SAFETY: the first `len` elements are initialised and the block
            // stays valid while the scope holds the allocator.
            Storage::Arena { ptr, .. } => unsafe { slice::from_raw_parts(ptr.as_ptr(), self.len) },
            Storage::Heap(vec) => vec,
        }
    }
}

impl<T: Copy> DerefMut for ScratchVec<'_, '_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        match &mut self.storage {
            // SAFETY: as in `deref`, and `&mut self` makes the access unique.
            Storage::Arena { ptr, .. } => unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), self.len) },
            Storage::Heap(vec) => vec,
        }
    }
}

impl<T: Copy> Extend<T> for ScratchVec<'_, '_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T: Copy + std::fmt::Debug> std::fmt::Debug for ScratchVec<'_, '_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
