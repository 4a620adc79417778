//! System allocator wrapper

use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;

use super::Allocator;

/// Thin wrapper over the global system allocator
///
/// `allocate(size, alignment)` reserves `size * alignment` bytes aligned to
/// `alignment`. The layout of every live block is remembered so it can be
/// returned on `deallocate`; blocks still live on drop are released.
#[derive(Debug, Default)]
pub struct HeapAllocator {
    live: HashMap<usize, Layout>,
    used_memory: usize,
    last: Option<NonNull<u8>>,
}

impl HeapAllocator {
    /// Create an empty heap allocator
    pub fn new() -> Self {
        Self::default()
    }
}

impl Allocator for HeapAllocator {
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let bytes = size.checked_mul(alignment)?;
        let layout = Layout::from_size_align(bytes, alignment).ok()?;
        if layout.size() == 0 {
            return None;
        }

        // SAFETY: layout has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) })?;
        self.live.insert(ptr.as_ptr() as usize, layout);
        self.used_memory += layout.size();
        self.last = Some(ptr);
        Some(ptr)
    }

    fn deallocate(&mut self, ptr: Option<NonNull<u8>>) {
        let Some(ptr) = ptr else {
            return;
        };
        match self.live.remove(&(ptr.as_ptr() as usize)) {
            Some(layout) => {
                // SAFETY: ptr was returned by `alloc::alloc` with this layout and
                // has not been freed since (it was still in `live`).
                unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
                self.used_memory -= layout.size();
                if self.last == Some(ptr) {
                    self.last = None;
                }
            }
            None => log::warn!("HeapAllocator::deallocate with unknown pointer {:p}", ptr),
        }
    }

    fn root(&self) -> *const u8 {
        std::ptr::null()
    }

    fn current(&self) -> *const u8 {
        self.last.map_or(std::ptr::null(), |ptr| ptr.as_ptr().cast_const())
    }

    fn size(&self) -> usize {
        self.used_memory
    }

    fn used_memory(&self) -> usize {
        self.used_memory
    }

    fn allocations(&self) -> usize {
        self.live.len()
    }
}

impl Drop for HeapAllocator {
    fn drop(&mut self) {
        for (address, layout) in self.live.drain() {
            // SAFETY: every entry in `live` is an outstanding block obtained
            // from `alloc::alloc` with the recorded layout.
            unsafe { alloc::dealloc(address as *mut u8, layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_returns_none() {
        let mut heap = HeapAllocator::new();
        assert!(heap.allocate(0, 8).is_none());
        assert_eq!(heap.allocations(), 0);
    }

    #[test]
    fn test_requests_size_times_alignment() {
        let mut heap = HeapAllocator::new();
        let ptr = heap.allocate(4, 8).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 8, 0);
        assert_eq!(heap.used_memory(), 32);
        assert_eq!(heap.allocations(), 1);

        heap.deallocate(Some(ptr));
        assert_eq!(heap.used_memory(), 0);
        assert_eq!(heap.allocations(), 0);
    }

    #[test]
    fn test_live_blocks_released_on_drop() {
        let mut heap = HeapAllocator::new();
        for _ in 0..8 {
            heap.allocate(16, 4).unwrap();
        }
        assert_eq!(heap.allocations(), 8);
        drop(heap);
    }
}
