//! Growable slot arena with free-list reuse.
//!
//! The arena owns every tree node and hands out stable indices: a slot's
//! index stays valid until that slot is explicitly removed, no matter how
//! many inserts or removes happen around it. Freed slots go onto an
//! intrusive free list and are reused LIFO, so a long-lived tree churning
//! through inserts and erases settles into a fixed footprint.
//!
//! ```text
//! slots:  [ Occupied(a) | Vacant ──┐ | Occupied(b) | Vacant ──► NIL ]
//!                        ▲         │                ▲
//! free:  ────────────────┘         └────────────────┘
//! ```

use crate::index::TreeIndex;

enum Slot<T, Idx: TreeIndex> {
    Occupied(T),
    /// Free slot, linking to the next free slot (or `NIL`).
    Vacant(Idx),
}

/// A growable pool of slots addressed by [`TreeIndex`].
///
/// Insert returns the slot's index; remove frees the slot for reuse.
/// All operations are O(1).
///
/// # Example
///
/// ```
/// use redwood::Arena;
///
/// let mut arena: Arena<&str> = Arena::new();
/// let a = arena.insert("first");
/// let b = arena.insert("second");
///
/// assert_eq!(arena.get(a), Some(&"first"));
/// assert_eq!(arena.remove(a), Some("first"));
/// assert_eq!(arena.get(a), None);
///
/// // The freed slot is reused.
/// let c = arena.insert("third");
/// assert_eq!(c, a);
/// assert_eq!(arena.get(b), Some(&"second"));
/// ```
pub struct Arena<T, Idx: TreeIndex = u32> {
    slots: Vec<Slot<T, Idx>>,
    /// Head of the intrusive free list.
    free: Idx,
    /// Number of occupied slots.
    len: usize,
}

impl<T, Idx: TreeIndex> Arena<T, Idx> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Idx::NIL,
            len: 0,
        }
    }

    /// Creates an empty arena with room for `capacity` slots before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Idx::NIL,
            len: 0,
        }
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slots are occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots the arena can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Reserves room for at least `additional` more slots.
    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
    }

    /// Inserts a value, returning its stable index.
    ///
    /// Reuses the most recently freed slot if one exists, otherwise
    /// appends a new slot (growing the backing storage if needed).
    pub fn insert(&mut self, value: T) -> Idx {
        self.len += 1;
        if self.free.is_nil() {
            let idx = Idx::from_usize(self.slots.len());
            self.slots.push(Slot::Occupied(value));
            idx
        } else {
            let idx = self.free;
            match core::mem::replace(&mut self.slots[idx.as_usize()], Slot::Occupied(value)) {
                Slot::Vacant(next) => self.free = next,
                Slot::Occupied(_) => unreachable!("free list points at occupied slot"),
            }
            idx
        }
    }

    /// Removes and returns the value at `idx`, freeing the slot for reuse.
    ///
    /// Returns `None` if the slot is vacant or out of bounds.
    pub fn remove(&mut self, idx: Idx) -> Option<T> {
        let slot = self.slots.get_mut(idx.as_usize())?;
        if matches!(slot, Slot::Vacant(_)) {
            return None;
        }
        match core::mem::replace(slot, Slot::Vacant(self.free)) {
            Slot::Occupied(value) => {
                self.free = idx;
                self.len -= 1;
                Some(value)
            }
            Slot::Vacant(_) => unreachable!(),
        }
    }

    /// Returns a reference to the value at `idx`, if the slot is occupied.
    #[inline]
    pub fn get(&self, idx: Idx) -> Option<&T> {
        match self.slots.get(idx.as_usize()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value at `idx`, if the slot is occupied.
    #[inline]
    pub fn get_mut(&mut self, idx: Idx) -> Option<&mut T> {
        match self.slots.get_mut(idx.as_usize()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns mutable references to two distinct occupied slots.
    ///
    /// # Panics
    ///
    /// Panics if `a == b` or either slot is vacant.
    pub fn get2_mut(&mut self, a: Idx, b: Idx) -> (&mut T, &mut T) {
        assert_ne!(a, b, "get2_mut requires distinct indices");
        let (a_pos, b_pos) = (a.as_usize(), b.as_usize());
        let (lo, hi) = if a_pos < b_pos {
            (a_pos, b_pos)
        } else {
            (b_pos, a_pos)
        };
        let (head, tail) = self.slots.split_at_mut(hi);
        let lo_ref = match &mut head[lo] {
            Slot::Occupied(value) => value,
            Slot::Vacant(_) => panic!("get2_mut on vacant slot"),
        };
        let hi_ref = match &mut tail[0] {
            Slot::Occupied(value) => value,
            Slot::Vacant(_) => panic!("get2_mut on vacant slot"),
        };
        if a_pos < b_pos {
            (lo_ref, hi_ref)
        } else {
            (hi_ref, lo_ref)
        }
    }

    /// Returns `true` if the slot at `idx` is occupied.
    #[inline]
    pub fn contains(&self, idx: Idx) -> bool {
        matches!(self.slots.get(idx.as_usize()), Some(Slot::Occupied(_)))
    }

    /// Removes all values, keeping the allocated storage.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free = Idx::NIL;
        self.len = 0;
    }
}

impl<T, Idx: TreeIndex> Default for Arena<T, Idx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: core::fmt::Debug, Idx: TreeIndex> core::fmt::Debug for Arena<T, Idx> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("len", &self.len)
            .field("capacity", &self.slots.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut arena: Arena<u64> = Arena::new();
        assert!(arena.is_empty());

        let a = arena.insert(10);
        let b = arena.insert(20);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&10));
        assert_eq!(arena.get(b), Some(&20));

        assert_eq!(arena.remove(a), Some(10));
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.len(), 1);

        // Double remove is a no-op.
        assert_eq!(arena.remove(a), None);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn freed_slots_reused_lifo() {
        let mut arena: Arena<u64> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let _c = arena.insert(3);

        arena.remove(a);
        arena.remove(b);

        // Most recently freed slot comes back first.
        assert_eq!(arena.insert(4), b);
        assert_eq!(arena.insert(5), a);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut arena: Arena<String> = Arena::new();
        let idx = arena.insert("hello".into());
        *arena.get_mut(idx).unwrap() = "world".into();
        assert_eq!(arena.get(idx), Some(&"world".to_string()));
    }

    #[test]
    fn get2_mut_distinct() {
        let mut arena: Arena<u64> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let (ra, rb) = arena.get2_mut(a, b);
        core::mem::swap(ra, rb);
        assert_eq!(arena.get(a), Some(&2));
        assert_eq!(arena.get(b), Some(&1));

        // Order of arguments does not matter.
        let (rb, ra) = arena.get2_mut(b, a);
        core::mem::swap(ra, rb);
        assert_eq!(arena.get(a), Some(&1));
    }

    #[test]
    fn contains_and_clear() {
        let mut arena: Arena<u64> = Arena::new();
        let a = arena.insert(1);
        assert!(arena.contains(a));
        assert!(!arena.contains(u32::NIL));

        arena.clear();
        assert!(!arena.contains(a));
        assert!(arena.is_empty());

        // Usable after clear.
        let b = arena.insert(2);
        assert_eq!(arena.get(b), Some(&2));
    }

    #[test]
    fn u16_index() {
        let mut arena: Arena<u64, u16> = Arena::new();
        let idx = arena.insert(99);
        assert_eq!(idx, 0u16);
        assert_eq!(arena.get(idx), Some(&99));
    }
}
