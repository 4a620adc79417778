//! Memory management utilities
//!
//! Raw-memory providers with distinct allocation disciplines. Every allocator
//! implements [`Allocator`]; exhaustion is reported by returning `None`, never
//! by panicking.
//!
//! - [`LinearAllocator`] - bump allocation, bulk reset only
//! - [`StackAllocator`] - LIFO allocation with markers
//! - [`FreeListAllocator`] - general purpose, blocks can be freed in any order
//! - [`ProxyAllocator`] - instrumentation decorator around another allocator
//! - [`HeapAllocator`] - thin wrapper over the system allocator
//!
//! [`ScratchScope`] and [`ScratchVec`] build growable buffers on top of any of
//! them; the world uses them for its per-frame pair bookkeeping.

mod arena;
mod free_list;
mod heap;
mod linear;
mod proxy;
mod scratch;
mod stack;

use std::ptr::NonNull;

pub use arena::Arena;
pub use free_list::FreeListAllocator;
pub use heap::HeapAllocator;
pub use linear::LinearAllocator;
pub use proxy::{AllocationEvent, ProxyAllocator, ProxyStats};
pub use scratch::{ScratchScope, ScratchVec};
pub use stack::{StackAllocator, StackMarker};

/// Common contract for all allocation strategies
pub trait Allocator {
    /// Allocate `size` bytes aligned to `alignment` (a power of two)
    ///
    /// Returns `None` when the request cannot be satisfied.
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>>;

    /// Return memory to the allocator
    ///
    /// The meaning of `None` depends on the strategy; the stack allocator
    /// treats it as "pop the most recent allocation".
    fn deallocate(&mut self, ptr: Option<NonNull<u8>>);

    /// Start of the managed region (null when there is no single region)
    fn root(&self) -> *const u8;

    /// Current allocation cursor
    fn current(&self) -> *const u8;

    /// Total bytes managed by this allocator
    fn size(&self) -> usize;

    /// Bytes currently in use, including alignment padding and headers
    fn used_memory(&self) -> usize;

    /// Number of allocations as tracked by the strategy
    fn allocations(&self) -> usize;
}

impl<A: Allocator + ?Sized> Allocator for &mut A {
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        (**self).allocate(size, alignment)
    }

    fn deallocate(&mut self, ptr: Option<NonNull<u8>>) {
        (**self).deallocate(ptr);
    }

    fn root(&self) -> *const u8 {
        (**self).root()
    }

    fn current(&self) -> *const u8 {
        (**self).current()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn used_memory(&self) -> usize {
        (**self).used_memory()
    }

    fn allocations(&self) -> usize {
        (**self).allocations()
    }
}

impl<A: Allocator + ?Sized> Allocator for Box<A> {
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        (**self).allocate(size, alignment)
    }

    fn deallocate(&mut self, ptr: Option<NonNull<u8>>) {
        (**self).deallocate(ptr);
    }

    fn root(&self) -> *const u8 {
        (**self).root()
    }

    fn current(&self) -> *const u8 {
        (**self).current()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn used_memory(&self) -> usize {
        (**self).used_memory()
    }

    fn allocations(&self) -> usize {
        (**self).allocations()
    }
}

/// Bytes needed to move `address` forward to the next multiple of `alignment`
#[inline]
pub fn align_forward_adjustment(address: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    let adjustment = alignment - (address & (alignment - 1));
    if adjustment == alignment {
        0
    } else {
        adjustment
    }
}

/// Like [`align_forward_adjustment`], but leaves room for a header of
/// `header_size` bytes in front of the aligned address
pub fn align_forward_adjustment_with_header(
    address: usize,
    alignment: usize,
    header_size: usize,
) -> usize {
    let mut adjustment = align_forward_adjustment(address, alignment);
    if adjustment < header_size {
        let needed = header_size - adjustment;
        // Grow by whole alignment steps until the header fits
        adjustment += alignment * needed.div_ceil(alignment);
    }
    adjustment
}

/// Shared validation for allocation requests
#[inline]
fn is_valid_request(size: usize, alignment: usize) -> bool {
    size > 0 && alignment.is_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_forward_adjustment() {
        assert_eq!(align_forward_adjustment(0, 4), 0);
        assert_eq!(align_forward_adjustment(1, 4), 3);
        assert_eq!(align_forward_adjustment(4, 4), 0);
        assert_eq!(align_forward_adjustment(13, 8), 3);
    }

    #[test]
    fn test_align_forward_with_header() {
        // Already aligned, needs a full 16 byte header
        assert_eq!(align_forward_adjustment_with_header(64, 8, 16), 16);
        // 3 bytes to alignment, header of 8 pushes one more step of 8
        assert_eq!(align_forward_adjustment_with_header(13, 8, 8), 11);
        // Header smaller than natural adjustment
        assert_eq!(align_forward_adjustment_with_header(1, 16, 8), 15);
    }

    #[test]
    fn test_request_validation() {
        assert!(is_valid_request(4, 4));
        assert!(!is_valid_request(0, 4));
        assert!(!is_valid_request(4, 3));
        assert!(!is_valid_request(4, 0));
    }
}
