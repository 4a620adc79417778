//! General-purpose allocator over a fixed arena

use std::ptr::NonNull;

use super::{align_forward_adjustment_with_header, is_valid_request, Allocator, Arena};

const WORD: usize = std::mem::size_of::<usize>();

/// Header stored in front of every live block: block size, alignment adjustment
const HEADER_SIZE: usize = 2 * WORD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FreeBlock {
    offset: usize,
    size: usize,
}

/// Free-list allocator
///
/// Blocks can be released in any order. Free regions are kept sorted by
/// address and merged with their neighbours on release, allocation is first
/// fit. Unlike the linear and stack allocators, [`Allocator::allocations`]
/// only counts blocks that are currently live.
#[derive(Debug)]
pub struct FreeListAllocator {
    arena: Arena,
    free_blocks: Vec<FreeBlock>,
    used_memory: usize,
    allocations: usize,
}

impl FreeListAllocator {
    /// Create a free-list allocator over a fresh arena of `size` bytes
    pub fn new(size: usize) -> Self {
        let free_blocks = if size > 0 {
            vec![FreeBlock { offset: 0, size }]
        } else {
            Vec::new()
        };

        Self {
            arena: Arena::new(size),
            free_blocks,
            used_memory: 0,
            allocations: 0,
        }
    }

    /// Number of disjoint free regions (1 when nothing is allocated)
    pub fn free_block_count(&self) -> usize {
        self.free_blocks.len()
    }

    /// Size of the largest free region
    pub fn largest_free_block(&self) -> usize {
        self.free_blocks.iter().map(|block| block.size).max().unwrap_or(0)
    }

    fn release(&mut self, start: usize) {
        if start < HEADER_SIZE {
            log::warn!("FreeListAllocator::deallocate with pointer inside the first header");
            return;
        }
        let header = start - HEADER_SIZE;
        let (Some(size), Some(adjustment)) =
            (self.arena.read_word(header), self.arena.read_word(header + WORD))
        else {
            return;
        };

        if adjustment > start || size == 0 {
            log::warn!("FreeListAllocator::deallocate with corrupt header at offset {}", start);
            return;
        }
        let block_start = start - adjustment;
        let block_end = block_start + size;
        if block_end > self.arena.len() {
            log::warn!("FreeListAllocator::deallocate with corrupt header at offset {}", start);
            return;
        }

        let index = self.free_blocks.partition_point(|block| block.offset <= block_start);

        if index > 0 {
            let previous = self.free_blocks[index - 1];
            if previous.offset + previous.size > block_start {
                log::warn!("FreeListAllocator double free at offset {}", start);
                return;
            }
        }
        if let Some(next) = self.free_blocks.get(index) {
            if block_end > next.offset {
                log::warn!("FreeListAllocator double free at offset {}", start);
                return;
            }
        }

        self.free_blocks.insert(index, FreeBlock { offset: block_start, size });

        // Merge with the following block
        if index + 1 < self.free_blocks.len()
            && self.free_blocks[index].offset + self.free_blocks[index].size
                == self.free_blocks[index + 1].offset
        {
            self.free_blocks[index].size += self.free_blocks[index + 1].size;
            self.free_blocks.remove(index + 1);
        }

        // Merge with the preceding block
        if index > 0
            && self.free_blocks[index - 1].offset + self.free_blocks[index - 1].size
                == self.free_blocks[index].offset
        {
            self.free_blocks[index - 1].size += self.free_blocks[index].size;
            self.free_blocks.remove(index);
        }

        self.used_memory -= size;
        self.allocations -= 1;
    }
}

impl Allocator for FreeListAllocator {
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        if !is_valid_request(size, alignment) {
            return None;
        }

        for index in 0..self.free_blocks.len() {
            let block = self.free_blocks[index];
            let adjustment = align_forward_adjustment_with_header(
                self.arena.address_of(block.offset),
                alignment,
                HEADER_SIZE,
            );
            let Some(mut total) = adjustment.checked_add(size) else {
                continue;
            };
            if total > block.size {
                continue;
            }

            // A remainder too small to hold a header is handed out as padding
            if block.size - total <= HEADER_SIZE {
                total = block.size;
                self.free_blocks.remove(index);
            } else {
                self.free_blocks[index] = FreeBlock {
                    offset: block.offset + total,
                    size: block.size - total,
                };
            }

            let start = block.offset + adjustment;
            let header = start - HEADER_SIZE;
            self.arena.write_word(header, total);
            self.arena.write_word(header + WORD, adjustment);

            self.used_memory += total;
            self.allocations += 1;
            return self.arena.ptr_at(start);
        }

        log::debug!(
            "FreeListAllocator exhausted: requested {} bytes, largest free block {}",
            size,
            self.largest_free_block()
        );
        None
    }

    fn deallocate(&mut self, ptr: Option<NonNull<u8>>) {
        let Some(ptr) = ptr else {
            log::debug!("FreeListAllocator::deallocate(None) ignored");
            return;
        };
        match self.arena.offset_of(ptr) {
            Some(start) => self.release(start),
            None => log::warn!("FreeListAllocator::deallocate with foreign pointer {:p}", ptr),
        }
    }

    fn root(&self) -> *const u8 {
        self.arena.base().as_ptr()
    }

    fn current(&self) -> *const u8 {
        let offset = self
            .free_blocks
            .first()
            .map_or(self.arena.len(), |block| block.offset);
        self.arena.base().as_ptr().wrapping_add(offset)
    }

    fn size(&self) -> usize {
        self.arena.len()
    }

    fn used_memory(&self) -> usize {
        self.used_memory
    }

    fn allocations(&self) -> usize {
        self.allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freed_block_is_reused() {
        let mut allocator = FreeListAllocator::new(1024);

        let a = allocator.allocate(64, 8).unwrap();
        let b = allocator.allocate(64, 8).unwrap();
        let c = allocator.allocate(64, 8).unwrap();
        assert_eq!(allocator.allocations(), 3);
        assert!(a.as_ptr() < b.as_ptr() && b.as_ptr() < c.as_ptr());

        allocator.deallocate(Some(b));
        assert_eq!(allocator.allocations(), 2);

        let d = allocator.allocate(64, 8).unwrap();
        assert_eq!(d, b);
        assert_eq!(allocator.allocations(), 3);
    }

    #[test]
    fn test_release_in_any_order_coalesces() {
        let mut allocator = FreeListAllocator::new(512);

        let blocks: Vec<_> = (0..4).map(|_| allocator.allocate(32, 16).unwrap()).collect();
        assert!(allocator.used_memory() > 0);

        allocator.deallocate(Some(blocks[1]));
        allocator.deallocate(Some(blocks[3]));
        allocator.deallocate(Some(blocks[0]));
        allocator.deallocate(Some(blocks[2]));

        assert_eq!(allocator.allocations(), 0);
        assert_eq!(allocator.used_memory(), 0);
        assert_eq!(allocator.free_block_count(), 1);
        assert_eq!(allocator.largest_free_block(), 512);
    }

    #[test]
    fn test_alignment_is_honoured() {
        let mut allocator = FreeListAllocator::new(512);
        allocator.allocate(3, 1).unwrap();
        let aligned = allocator.allocate(16, 32).unwrap();
        assert_eq!(aligned.as_ptr() as usize % 32, 0);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut allocator = FreeListAllocator::new(64);
        assert!(allocator.allocate(128, 8).is_none());

        let ptr = allocator.allocate(40, 8).unwrap();
        assert!(allocator.allocate(40, 8).is_none());

        allocator.deallocate(Some(ptr));
        assert!(allocator.allocate(40, 8).is_some());
    }

    #[test]
    fn test_double_free_is_ignored() {
        let mut allocator = FreeListAllocator::new(256);
        let a = allocator.allocate(32, 8).unwrap();
        allocator.allocate(32, 8).unwrap();

        allocator.deallocate(Some(a));
        allocator.deallocate(Some(a));
        assert_eq!(allocator.allocations(), 1);
    }
}
