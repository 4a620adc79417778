//! Contiguous memory region owned by a single allocator

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of every arena base address
const ARENA_ALIGNMENT: usize = 16;

const WORD: usize = std::mem::size_of::<usize>();

/// Memory arena for grouped allocations
///
/// Owns one block obtained from the system allocator for its whole lifetime
/// and frees it on drop. Allocators hand out pointers into the block and keep
/// their bookkeeping words inside it through [`Arena::read_word`] and
/// [`Arena::write_word`].
pub struct Arena {
    base: NonNull<u8>,
    layout: Layout,
}

impl Arena {
    /// Reserve `size` bytes; the base address is 16-byte aligned
    pub fn new(size: usize) -> Self {
        let layout = match Layout::from_size_align(size, ARENA_ALIGNMENT) {
            Ok(layout) => layout,
            Err(_) => {
                log::error!("Arena size {} exceeds the addressable range", size);
                Layout::new::<()>()
            }
        };

        if layout.size() == 0 {
            return Self {
                base: NonNull::dangling(),
                layout,
            };
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        log::trace!("Arena reserved {} bytes at {:p}", size, base);

        Self { base, layout }
    }

    /// Base address of the region
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Size of the region in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Whether the region is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Pointer to `offset` bytes past the base, if it lies inside the region
    ///
    /// `offset == len()` is accepted and yields the one-past-the-end pointer.
    #[inline]
    pub fn ptr_at(&self, offset: usize) -> Option<NonNull<u8>> {
        if offset > self.len() {
            return None;
        }
        NonNull::new(self.base.as_ptr().wrapping_add(offset))
    }

    /// Offset of `ptr` from the base, if it points inside the region
    #[inline]
    pub fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let address = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        if address < base || address >= base + self.len() {
            return None;
        }
        Some(address - base)
    }

    /// Absolute address of `offset`, used for alignment math
    #[inline]
    pub fn address_of(&self, offset: usize) -> usize {
        self.base.as_ptr() as usize + offset
    }

    /// Read a bookkeeping word stored at `offset`
    pub fn read_word(&self, offset: usize) -> Option<usize> {
        let bytes = self.bytes(offset, WORD)?;
        let mut word = [0u8; WORD];
        word.copy_from_slice(bytes);
        Some(usize::from_ne_bytes(word))
    }

    /// Write a bookkeeping word at `offset`; returns false when out of range
    pub fn write_word(&mut self, offset: usize, value: usize) -> bool {
        match self.bytes_mut(offset, WORD) {
            Some(bytes) => {
                bytes.copy_from_slice(&value.to_ne_bytes());
                true
            }
            None => false,
        }
    }

    fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        if offset.checked_add(len)? > self.len() {
            return None;
        }
        // SAFETY: the range was checked against the region, which was zeroed
        // on allocation.
        Some(unsafe { std::slice::from_raw_parts(self.base.as_ptr().add(offset), len) })
    }

    fn bytes_mut(&mut self, offset: usize, len: usize) -> Option<&mut [u8]> {
        if offset.checked_add(len)? > self.len() {
            return None;
        }
        // SAFETY: the range was checked against the allocated region and we
        // hold the only mutable borrow of the arena.
        Some(unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr().add(offset), len) })
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: base was returned by `alloc::alloc_zeroed` with this layout.
            unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
        }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("base", &self.base)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_alignment_and_bounds() {
        let arena = Arena::new(64);
        assert_eq!(arena.len(), 64);
        assert_eq!(arena.base().as_ptr() as usize % ARENA_ALIGNMENT, 0);
        assert!(arena.ptr_at(64).is_some());
        assert!(arena.ptr_at(65).is_none());
    }

    #[test]
    fn test_word_round_trip_and_range_check() {
        let mut arena = Arena::new(32);
        assert!(arena.write_word(8, 0xDEAD_BEEF));
        assert_eq!(arena.read_word(8), Some(0xDEAD_BEEF));
        assert!(!arena.write_word(32 - WORD + 1, 1));
        assert_eq!(arena.read_word(32), None);
    }

    #[test]
    fn test_offset_of() {
        let arena = Arena::new(16);
        let inside = arena.ptr_at(5).unwrap();
        assert_eq!(arena.offset_of(inside), Some(5));
        let end = arena.ptr_at(16).unwrap();
        assert_eq!(arena.offset_of(end), None);
    }

    #[test]
    fn test_empty_arena() {
        let arena = Arena::new(0);
        assert!(arena.is_empty());
        assert_eq!(arena.read_word(0), None);
    }
}
