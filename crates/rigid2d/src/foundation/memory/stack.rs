//! LIFO allocator with markers

use std::ptr::NonNull;

use super::{align_forward_adjustment_with_header, is_valid_request, Allocator, Arena};

const WORD: usize = std::mem::size_of::<usize>();

/// Header stored in front of every allocation: previous top, previous last
/// allocation start (+1, zero meaning none)
const HEADER_SIZE: usize = 2 * WORD;

/// Position in a [`StackAllocator`] that can be rewound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StackMarker(usize);

/// Stack allocator for temporary allocations
///
/// Allocations are released in reverse order: `deallocate(None)` pops the
/// most recent one, `deallocate(Some(ptr))` rewinds to just before `ptr`,
/// and [`StackAllocator::free_to_marker`] rewinds to a saved [`StackMarker`].
#[derive(Debug)]
pub struct StackAllocator {
    arena: Arena,
    top: usize,
    last: Option<usize>,
    allocations: usize,
}

impl StackAllocator {
    /// Create a stack allocator over a fresh arena of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            arena: Arena::new(size),
            top: 0,
            last: None,
            allocations: 0,
        }
    }

    /// Current top of the stack
    pub fn marker(&self) -> StackMarker {
        StackMarker(self.top)
    }

    /// Release everything allocated after `marker` was taken
    pub fn free_to_marker(&mut self, marker: StackMarker) {
        if marker.0 > self.top {
            log::warn!("StackAllocator marker {} is above the top {}", marker.0, self.top);
            return;
        }
        self.top = marker.0;
        while let Some(last) = self.last {
            if last < self.top {
                break;
            }
            self.last = self.read_previous_last(last);
        }
    }

    /// Release everything
    pub fn clear(&mut self) {
        self.top = 0;
        self.last = None;
        self.allocations = 0;
    }

    fn header_offset(start: usize) -> usize {
        start - HEADER_SIZE
    }

    fn read_previous_top(&self, start: usize) -> usize {
        self.arena.read_word(Self::header_offset(start)).unwrap_or(0)
    }

    fn read_previous_last(&self, start: usize) -> Option<usize> {
        match self.arena.read_word(Self::header_offset(start) + WORD) {
            Some(0) | None => None,
            Some(encoded) => Some(encoded - 1),
        }
    }

    fn is_live_allocation(&self, start: usize) -> bool {
        let mut cursor = self.last;
        while let Some(candidate) = cursor {
            if candidate == start {
                return true;
            }
            cursor = self.read_previous_last(candidate);
        }
        false
    }

    fn rewind_to_allocation(&mut self, start: usize) {
        self.top = self.read_previous_top(start);
        self.last = self.read_previous_last(start);
    }
}

impl Allocator for StackAllocator {
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        if !is_valid_request(size, alignment) {
            return None;
        }

        let adjustment = align_forward_adjustment_with_header(
            self.arena.address_of(self.top),
            alignment,
            HEADER_SIZE,
        );
        let start = self.top + adjustment;
        let end = start.checked_add(size)?;
        if end > self.arena.len() {
            log::debug!(
                "StackAllocator exhausted: requested {} bytes at top {} of {}",
                size,
                self.top,
                self.arena.len()
            );
            return None;
        }

        let header = Self::header_offset(start);
        let previous_last = self.last.map_or(0, |last| last + 1);
        if !self.arena.write_word(header, self.top) || !self.arena.write_word(header + WORD, previous_last) {
            return None;
        }

        let ptr = self.arena.ptr_at(start)?;
        self.top = end;
        self.last = Some(start);
        self.allocations += 1;
        Some(ptr)
    }

    fn deallocate(&mut self, ptr: Option<NonNull<u8>>) {
        match ptr {
            None => match self.last {
                Some(last) => self.rewind_to_allocation(last),
                None => log::debug!("StackAllocator pop on an empty stack"),
            },
            Some(ptr) => match self.arena.offset_of(ptr) {
                Some(start) if self.is_live_allocation(start) => self.rewind_to_allocation(start),
                _ => log::warn!("StackAllocator::deallocate with unknown pointer {:p}", ptr),
            },
        }
    }

    fn root(&self) -> *const u8 {
        self.arena.base().as_ptr()
    }

    fn current(&self) -> *const u8 {
        self.arena.base().as_ptr().wrapping_add(self.top)
    }

    fn size(&self) -> usize {
        self.arena.len()
    }

    fn used_memory(&self) -> usize {
        self.top
    }

    fn allocations(&self) -> usize {
        self.allocations
    }
}
