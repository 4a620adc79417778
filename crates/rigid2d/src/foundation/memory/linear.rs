//! Bump allocator

use std::ptr::NonNull;

use super::{align_forward_adjustment, is_valid_request, Allocator, Arena};

/// Linear (bump) allocator
///
/// Individual deallocation is a no-op; memory is reclaimed all at once with
/// [`LinearAllocator::clear`]. Suited to per-frame scratch data.
#[derive(Debug)]
pub struct LinearAllocator {
    arena: Arena,
    offset: usize,
    allocations: usize,
}

impl LinearAllocator {
    /// Create a linear allocator over a fresh arena of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            arena: Arena::new(size),
            offset: 0,
            allocations: 0,
        }
    }

    /// Rewind the cursor to the root and reset the allocation counter
    pub fn clear(&mut self) {
        self.offset = 0;
        self.allocations = 0;
    }

    /// Bytes still available before alignment padding
    pub fn remaining(&self) -> usize {
        self.arena.len() - self.offset
    }
}

impl Allocator for LinearAllocator {
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        if !is_valid_request(size, alignment) {
            return None;
        }

        let adjustment = align_forward_adjustment(self.arena.address_of(self.offset), alignment);
        let start = self.offset + adjustment;
        let end = start.checked_add(size)?;
        if end > self.arena.len() {
            log::debug!(
                "LinearAllocator exhausted: requested {} bytes, {} remaining",
                size,
                self.remaining()
            );
            return None;
        }

        let ptr = self.arena.ptr_at(start)?;
        self.offset = end;
        self.allocations += 1;
        Some(ptr)
    }

    fn deallocate(&mut self, _ptr: Option<NonNull<u8>>) {
        // Bulk reset only, see `clear`
    }

    fn root(&self) -> *const u8 {
        self.arena.base().as_ptr()
    }

    fn current(&self) -> *const u8 {
        self.arena.base().as_ptr().wrapping_add(self.offset)
    }

    fn size(&self) -> usize {
        self.arena.len()
    }

    fn used_memory(&self) -> usize {
        self.offset
    }

    fn allocations(&self) -> usize {
        self.allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_allocations_fit_third_fails() {
        let mut allocator = LinearAllocator::new(8);

        let first = allocator.allocate(4, 4).expect("first allocation");
        let second = allocator.allocate(4, 4).expect("second allocation");
        assert_eq!(second.as_ptr() as usize - first.as_ptr() as usize, 4);

        assert!(allocator.allocate(4, 4).is_none());
        assert_eq!(allocator.allocations(), 2);
        assert_eq!(allocator.used_memory(), 8);
    }

    #[test]
    fn test_alignment_padding() {
        let mut allocator = LinearAllocator::new(64);

        let byte = allocator.allocate(1, 1).unwrap();
        let aligned = allocator.allocate(8, 8).unwrap();
        assert_eq!(aligned.as_ptr() as usize % 8, 0);
        assert_eq!(aligned.as_ptr() as usize - byte.as_ptr() as usize, 8);
        assert_eq!(allocator.used_memory(), 16);
    }

    #[test]
    fn test_deallocate_is_noop_and_clear_resets() {
        let mut allocator = LinearAllocator::new(32);
        let ptr = allocator.allocate(16, 4).unwrap();

        allocator.deallocate(Some(ptr));
        assert_eq!(allocator.used_memory(), 16);
        assert_eq!(allocator.allocations(), 1);

        allocator.clear();
        assert_eq!(allocator.used_memory(), 0);
        assert_eq!(allocator.allocations(), 0);
        assert_eq!(allocator.current(), allocator.root());

        let again = allocator.allocate(16, 4).unwrap();
        assert_eq!(again, ptr);
    }

    #[test]
    fn test_rejects_invalid_requests() {
        let mut allocator = LinearAllocator::new(32);
        assert!(allocator.allocate(0, 4).is_none());
        assert!(allocator.allocate(4, 3).is_none());
        assert!(allocator.allocate(64, 4).is_none());
        assert_eq!(allocator.allocations(), 0);
    }
}
