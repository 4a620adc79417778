//! Generation-checked handles and the slot pool behind them
//!
//! A [`Ref`] is an index into a [`Pool`] plus the generation the slot had
//! when the handle was issued. Destroying a slot bumps its generation, so
//! every handle issued before that point stops resolving even after the slot
//! is reused.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::{PhysicsError, Result};

/// Default number of slots added when a pool runs out of free slots
pub const POOL_GROWTH: usize = 16;

/// Marker types that name the store a [`Ref`] belongs to
pub trait RefTag {
    /// Store name used in error messages
    const KIND: &'static str;
}

/// Typed generational handle
pub struct Ref<Tag> {
    /// Slot index in the owning pool
    pub index: u32,
    /// Generation of the slot when the handle was issued
    pub generation: u32,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Tag> Ref<Tag> {
    /// Build a handle from its raw parts
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _tag: PhantomData,
        }
    }
}

// Manual impls: derives would put bounds on `Tag`.
impl<Tag> Clone for Ref<Tag> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Tag> Copy for Ref<Tag> {}

impl<Tag> PartialEq for Ref<Tag> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<Tag> Eq for Ref<Tag> {}

impl<Tag> Hash for Ref<Tag> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<Tag> PartialOrd for Ref<Tag> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<Tag> Ord for Ref<Tag> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<Tag: RefTag> fmt::Debug for Ref<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Ref({}v{})", Tag::KIND, self.index, self.generation)
    }
}

/// Lifecycle hooks a pooled element must provide
pub trait Slot: Default {
    /// Whether the slot can be handed out by [`Pool::create`]
    fn is_free(&self) -> bool;

    /// Bring a free slot into use
    fn acquire(&mut self);

    /// Return the slot to the free state, resetting its contents
    fn release(&mut self);
}

/// Dense slot array with a parallel generation array
///
/// Slots are never removed; they are released and their generation bumped.
pub struct Pool<T: Slot, Tag: RefTag> {
    slots: Vec<T>,
    generations: Vec<u32>,
    /// Slots handed out by `create` and not yet destroyed
    issued: Vec<bool>,
    growth: usize,
    _tag: PhantomData<fn() -> Tag>,
}

impl<T: Slot, Tag: RefTag> Pool<T, Tag> {
    /// Create an empty pool growing by [`POOL_GROWTH`] slots at a time
    pub fn new() -> Self {
        Self::with_growth(POOL_GROWTH)
    }

    /// Create an empty pool growing by `growth` slots at a time
    pub fn with_growth(growth: usize) -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            issued: Vec::new(),
            growth: growth.max(1),
            _tag: PhantomData,
        }
    }

    /// Acquire the first free slot, growing the pool if there is none
    pub fn create(&mut self) -> Ref<Tag> {
        let index = match self.slots.iter().position(|slot| slot.is_free()) {
            Some(index) => index,
            None => {
                let index = self.slots.len();
                let new_len = index + self.growth;
                self.slots.resize_with(new_len, T::default);
                self.generations.resize(new_len, 0);
                self.issued.resize(new_len, false);
                log::debug!("{} pool grew to {} slots", Tag::KIND, new_len);
                index
            }
        };

        if self.issued[index] {
            // Vacated by overwriting the element rather than through `destroy`
            log::warn!("{} slot {} was freed without being destroyed", Tag::KIND, index);
            self.generations[index] = self.generations[index].wrapping_add(1);
        }
        self.issued[index] = true;
        self.slots[index].acquire();
        Ref::new(to_u32(index), self.generations[index])
    }

    /// Release the slot behind `handle` and invalidate every handle to it
    pub fn destroy(&mut self, handle: Ref<Tag>) -> Result<()> {
        let index = self.check(handle)?;
        self.slots[index].release();
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.issued[index] = false;
        Ok(())
    }

    /// Shared access to a live slot
    pub fn get(&self, handle: Ref<Tag>) -> Result<&T> {
        let index = self.check(handle)?;
        Ok(&self.slots[index])
    }

    /// Mutable access to a live slot
    pub fn get_mut(&mut self, handle: Ref<Tag>) -> Result<&mut T> {
        let index = self.check(handle)?;
        Ok(&mut self.slots[index])
    }

    /// Mutable access to two distinct slots at once
    ///
    /// Returns `None` for the same slot twice.
    pub fn get_pair_mut(&mut self, a: Ref<Tag>, b: Ref<Tag>) -> Result<Option<(&mut T, &mut T)>> {
        let ia = self.check(a)?;
        let ib = self.check(b)?;
        if ia == ib {
            return Ok(None);
        }

        let (low, high, swapped) = if ia < ib { (ia, ib, false) } else { (ib, ia, true) };
        let (head, tail) = self.slots.split_at_mut(high);
        let first = &mut head[low];
        let second = &mut tail[0];
        Ok(Some(if swapped { (second, first) } else { (first, second) }))
    }

    /// Whether `handle` still resolves to a live slot
    pub fn is_valid(&self, handle: Ref<Tag>) -> bool {
        self.check(handle).is_ok()
    }

    /// Total number of slots, free or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool has no slots at all
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots currently in use
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_free()).count()
    }

    /// Handle and element for every slot in use
    pub fn iter(&self) -> impl Iterator<Item = (Ref<Tag>, &T)> + '_ {
        self.slots
            .iter()
            .zip(&self.generations)
            .enumerate()
            .filter(|(_, (slot, _))| !slot.is_free())
            .map(|(index, (slot, &generation))| (Ref::new(to_u32(index), generation), slot))
    }

    /// Handle and mutable element for every slot in use
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Ref<Tag>, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .zip(&self.generations)
            .enumerate()
            .filter(|(_, (slot, _))| !slot.is_free())
            .map(|(index, (slot, &generation))| (Ref::new(to_u32(index), generation), slot))
    }

    /// Handles of every slot in use, in index order
    pub fn refs(&self) -> Vec<Ref<Tag>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    fn check(&self, handle: Ref<Tag>) -> Result<usize> {
        let index = handle.index as usize;
        match self.generations.get(index) {
            Some(&generation)
                if generation == handle.generation && !self.slots[index].is_free() =>
            {
                Ok(index)
            }
            _ => Err(PhysicsError::InvalidReference {
                kind: Tag::KIND,
                index: handle.index,
                generation: handle.generation,
            }),
        }
    }
}

impl<T: Slot, Tag: RefTag> Default for Pool<T, Tag> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Slot + fmt::Debug, Tag: RefTag> fmt::Debug for Pool<T, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("kind", &Tag::KIND)
            .field("len", &self.slots.len())
            .field("live", &self.live_count())
            .finish()
    }
}

#[inline]
fn to_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
