//! Ordered, index-addressable entity storage.
//!
//! Every entity category (textures, objects, physics objects, parallax layers)
//! lives in its own [`Arena`]. Ids are slot numbers handed out in insertion
//! order and are never reused or compacted, so an id cached anywhere else in
//! the engine stays valid until that exact entity is removed.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed index into an [`Arena<T>`].
pub struct Id<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub(crate) fn from_index(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Slot number of this id (useful for debugging and logging).
    pub fn index(self) -> usize {
        self.index
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index)
    }
}

/// Growable slot storage with stable ids.
///
/// - `insert` always appends, so ids grow monotonically
/// - `remove` leaves a tombstone instead of shifting later entries
/// - iteration visits live entries in id order
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Arena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Append a value and return its id.
    pub fn insert(&mut self, value: T) -> Id<T> {
        let id = Id::from_index(self.slots.len());
        self.slots.push(Some(value));
        self.live += 1;
        id
    }

    /// Remove and return the value stored under `id`, if it is still alive.
    pub fn remove(&mut self, id: Id<T>) -> Option<T> {
        let value = self.slots.get_mut(id.index())?.take()?;
        self.live -= 1;
        Some(value)
    }

    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Check whether `id` refers to a live entry.
    pub fn contains(&self, id: Id<T>) -> bool {
        self.get(id).is_some()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|value| (Id::from_index(i), value)))
    }

    /// Iterate mutably over live entries in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Id<T>, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|value| (Id::from_index(i), value)))
    }

    /// Ids of all live entries, in order.
    pub fn ids(&self) -> Vec<Id<T>> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Map every live id to its position among the live entries.
    ///
    /// Tombstones are skipped, so the positions are dense (`0..len()`). This
    /// is the index space used when the arena is written out.
    pub fn position_map(&self) -> HashMap<Id<T>, usize> {
        self.iter()
            .enumerate()
            .map(|(position, (id, _))| (id, position))
            .collect()
    }

    /// Remove every entry, returning the live values in id order.
    ///
    /// Id numbering restarts at zero afterwards.
    pub fn drain(&mut self) -> Vec<T> {
        self.live = 0;
        self.slots.drain(..).flatten().collect()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.live = 0;
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
