//! Generational slot table backing opaque handles
//!
//! A raw handle packs a slot index (low half of the word, offset by one so
//! zero is never issued) and the slot's generation (high half). Releasing a
//! slot bumps its generation, so a stale handle never resolves to whatever
//! reuses the slot later.

use std::num::NonZeroUsize;

use crate::{Error, Result};

const INDEX_BITS: u32 = usize::BITS / 2;
const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: usize = usize::MAX >> INDEX_BITS;

/// Largest number of slots the index half of a handle can address
pub const MAX_SLOTS: usize = INDEX_MASK - 1;

/// Opaque token issued by a [`Registry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
    /// Wrap a raw value received from a caller, `None` for zero
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// Raw value as handed to callers
    pub fn into_raw(self) -> usize {
        self.0.get()
    }

    fn new(index: usize, generation: usize) -> Self {
        let raw = ((generation & GENERATION_MASK) << INDEX_BITS) | (index + 1);
        // index + 1 >= 1, so raw is never zero
        Self(NonZeroUsize::new(raw).unwrap_or(NonZeroUsize::MIN))
    }

    fn index(self) -> usize {
        // Forged values with a zero index wrap to an out-of-range slot
        (self.0.get() & INDEX_MASK).wrapping_sub(1)
    }

    fn generation(self) -> usize {
        self.0.get() >> INDEX_BITS
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: usize,
    value: Option<T>,
}

/// Table of owned resources addressed by [`Handle`]
#[derive(Debug)]
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    live: usize,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Take ownership of `value` and issue a fresh handle for it
    pub fn insert(&mut self, value: T) -> Result<Handle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                if self.slots.len() >= MAX_SLOTS {
                    return Err(Error::RegistryFull(self.live));
                }
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.value = Some(value);
        self.live += 1;
        Ok(Handle::new(index, slot.generation))
    }

    /// Resolve a handle to its live value
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation & GENERATION_MASK != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Clear the slot and hand the value back, `None` if the handle is stale
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let index = handle.index();
        let slot = self.slots.get_mut(index)?;
        if slot.generation & GENERATION_MASK != handle.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1) & GENERATION_MASK;
        self.free.push(index);
        self.live -= 1;
        Some(value)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
