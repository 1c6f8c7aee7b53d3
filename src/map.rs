//! Ordered map facade over the tree engine.

use core::fmt;
use core::ops::Index;

use crate::compare::{Compare, NaturalOrder};
use crate::error::Error;
use crate::index::TreeIndex;
use crate::tree::{Cursor, Iter, IterMut, RbTree, RejectDuplicates};

/// An ordered map of unique keys, backed by [`RbTree`].
///
/// Keys are unique: inserting an existing key returns the existing element
/// untouched (use [`insert_or_assign`](Self::insert_or_assign) or the
/// [`entry`](Self::entry) API to overwrite). Iteration yields entries in
/// ascending key order; `first`/`last` are O(1).
///
/// # Example
///
/// ```
/// use redwood::TreeMap;
///
/// let mut map = TreeMap::new();
/// map.insert("b", 2);
/// map.insert("a", 1);
/// map.insert("c", 3);
///
/// assert_eq!(map.get(&"b"), Some(&2));
/// assert_eq!(map.first(), Some((&"a", &1)));
///
/// let keys: Vec<_> = map.keys().copied().collect();
/// assert_eq!(keys, vec!["a", "b", "c"]);
/// ```
pub struct TreeMap<K, V, C = NaturalOrder, Idx = u32>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    tree: RbTree<K, V, RejectDuplicates, C, Idx>,
}

// Constructors pin the comparator and index defaults so bare `TreeMap::new()`
// infers; `with_comparator` pins only the index. Other index widths go
// through the engine directly.
impl<K: Ord, V> TreeMap<K, V> {
    /// Creates an empty map ordered by the keys' natural order.
    pub fn new() -> Self {
        Self {
            tree: RbTree::new(),
        }
    }

    /// Creates an empty map with room for `capacity` entries before the
    /// backing arena grows.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: RbTree::with_capacity(capacity),
        }
    }
}

impl<K, V, C: Compare<K>> TreeMap<K, V, C> {
    /// Creates an empty map ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            tree: RbTree::with_comparator(cmp),
        }
    }
}

impl<K, V, C, Idx> TreeMap<K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the map has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Removes all entries, keeping the allocated storage.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Exchanges the contents of two maps in O(1).
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Returns the value for `key`, or `None` if absent. O(log n).
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(self.tree.find(key)).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value for `key`. O(log n).
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let cursor = self.tree.find(key);
        self.tree.get_mut(cursor).map(|(_, v)| v)
    }

    /// Returns the stored key-value pair for `key`. O(log n).
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.tree.get(self.tree.find(key))
    }

    /// Checked access: the value for `key`, or [`Error::MissingKey`].
    pub fn at(&self, key: &K) -> Result<&V, Error> {
        self.get(key).ok_or(Error::MissingKey)
    }

    /// Checked mutable access: the value for `key`, or [`Error::MissingKey`].
    pub fn at_mut(&mut self, key: &K) -> Result<&mut V, Error> {
        self.get_mut(key).ok_or(Error::MissingKey)
    }

    /// Returns `true` if the map contains `key`. O(log n).
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    /// The entry with the smallest key, or `None` if empty. O(1).
    #[inline]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.tree.first()
    }

    /// The entry with the largest key, or `None` if empty. O(1).
    #[inline]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tree.last()
    }

    /// Cursor at the first entry with key `>= key`, or the end cursor.
    pub fn lower_bound(&self, key: &K) -> Cursor<Idx> {
        self.tree.lower_bound(key)
    }

    /// Cursor at the first entry with key `> key`, or the end cursor.
    pub fn upper_bound(&self, key: &K) -> Cursor<Idx> {
        self.tree.upper_bound(key)
    }

    /// Shared access to the underlying tree engine, for cursor-based walks.
    #[inline]
    pub fn as_tree(&self) -> &RbTree<K, V, RejectDuplicates, C, Idx> {
        &self.tree
    }

    // ========================================================================
    // Insert / remove
    // ========================================================================

    /// Inserts a key-value pair.
    ///
    /// Returns the element's cursor and whether a new entry was created.
    /// An existing key is left untouched and the new value is dropped.
    pub fn insert(&mut self, key: K, value: V) -> (Cursor<Idx>, bool) {
        self.tree.insert(key, value)
    }

    /// Inserts or overwrites, returning the previous value if the key was
    /// already present.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Option<V> {
        let cursor = self.tree.find(&key);
        match self.tree.get_mut(cursor) {
            Some((_, slot)) => Some(core::mem::replace(slot, value)),
            None => {
                self.tree.insert(key, value);
                None
            }
        }
    }

    /// Removes the entry for `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.tree.remove_key(key).map(|(_, v)| v)
    }

    /// Removes the entry for `key`, returning the stored pair.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.tree.remove_key(key)
    }

    /// Removes the entry at `cursor`.
    ///
    /// Fails with [`Error::InvalidCursor`] for the end cursor, a foreign
    /// cursor, or a cursor whose entry was already removed.
    pub fn remove_at(&mut self, cursor: Cursor<Idx>) -> Result<(K, V), Error> {
        self.tree.remove(cursor)
    }

    /// Removes and returns the entry with the smallest key.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first()
    }

    /// Removes and returns the entry with the largest key.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last()
    }

    /// Moves entries out of `other` into `self`.
    ///
    /// Only keys absent from `self` are moved; colliding keys stay behind
    /// in `other` with their values.
    pub fn merge(&mut self, other: &mut Self) {
        self.tree.merge(&mut other.tree);
    }

    // ========================================================================
    // Entry API
    // ========================================================================

    /// In-place view of the entry for `key`, occupied or vacant.
    ///
    /// ```
    /// use redwood::TreeMap;
    ///
    /// let mut counts: TreeMap<&str, u32> = TreeMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *counts.entry(word).or_insert(0) += 1;
    /// }
    /// assert_eq!(counts.get(&"a"), Some(&2));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, C, Idx> {
        let cursor = self.tree.find(&key);
        if cursor.is_end() {
            Entry::Vacant(VacantEntry { map: self, key })
        } else {
            Entry::Occupied(OccupiedEntry { map: self, cursor })
        }
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Double-ended iterator over `(&K, &V)` in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V, RejectDuplicates, C, Idx> {
        self.tree.iter()
    }

    /// Iterator over `(&K, &mut V)` in ascending key order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, RejectDuplicates, C, Idx> {
        self.tree.iter_mut()
    }

    /// Iterator over the keys in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V, C, Idx> {
        Keys { inner: self.iter() }
    }

    /// Iterator over the values, ordered by key.
    pub fn values(&self) -> Values<'_, K, V, C, Idx> {
        Values { inner: self.iter() }
    }

    /// Iterator over mutable values, ordered by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, C, Idx> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

// ============================================================================
// Entry types
// ============================================================================

/// A view into a single map entry, returned by [`TreeMap::entry`].
pub enum Entry<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, C, Idx>),
    /// The key is absent.
    Vacant(VacantEntry<'a, K, V, C, Idx>),
}

/// A view into an occupied map entry.
pub struct OccupiedEntry<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    map: &'a mut TreeMap<K, V, C, Idx>,
    cursor: Cursor<Idx>,
}

/// A view into a vacant map entry, holding the key that was looked up.
pub struct VacantEntry<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    map: &'a mut TreeMap<K, V, C, Idx>,
    key: K,
}

impl<'a, K, V, C, Idx> Entry<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// The key this entry was looked up with.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    /// Applies `f` to the value if the entry is occupied.
    pub fn and_modify<F: FnOnce(&mut V)>(self, f: F) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            vacant => vacant,
        }
    }

    /// Inserts `default` if vacant; returns a mutable reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts `default()` if vacant; returns a mutable reference to the
    /// value. The closure only runs when the entry is vacant.
    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Inserts `V::default()` if vacant; returns a mutable reference.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

impl<'a, K, V, C, Idx> OccupiedEntry<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// The entry's key.
    pub fn key(&self) -> &K {
        self.map.tree.get(self.cursor).expect("invalid index").0
    }

    /// Shared reference to the value.
    pub fn get(&self) -> &V {
        self.map.tree.get(self.cursor).expect("invalid index").1
    }

    /// Mutable reference to the value, bounded by the entry's borrow.
    pub fn get_mut(&mut self) -> &mut V {
        self.map.tree.get_mut(self.cursor).expect("invalid index").1
    }

    /// Mutable reference to the value, consuming the entry to extend the
    /// borrow to the map's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        self.map.tree.get_mut(self.cursor).expect("invalid index").1
    }

    /// Replaces the value, returning the previous one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry, returning its value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry, returning the stored pair.
    pub fn remove_entry(self) -> (K, V) {
        self.map.tree.remove(self.cursor).expect("invalid index")
    }
}

impl<'a, K, V, C, Idx> VacantEntry<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// The key that was looked up.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key back out of the entry.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value, returning a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let (cursor, _) = self.map.tree.insert(self.key, value);
        self.map.tree.get_mut(cursor).expect("invalid index").1
    }
}

// ============================================================================
// Iterator wrappers
// ============================================================================

/// Iterator over map keys in ascending order.
pub struct Keys<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    inner: Iter<'a, K, V, RejectDuplicates, C, Idx>,
}

impl<'a, K, V, C, Idx> Iterator for Keys<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, C, Idx> DoubleEndedIterator for Keys<'_, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V, C, Idx> ExactSizeIterator for Keys<'_, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

/// Iterator over map values, ordered by key.
pub struct Values<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    inner: Iter<'a, K, V, RejectDuplicates, C, Idx>,
}

impl<'a, K, V, C, Idx> Iterator for Values<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, C, Idx> DoubleEndedIterator for Values<'_, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, C, Idx> ExactSizeIterator for Values<'_, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

/// Iterator over mutable map values, ordered by key.
pub struct ValuesMut<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    inner: IterMut<'a, K, V, RejectDuplicates, C, Idx>,
}

impl<'a, K, V, C, Idx> Iterator for ValuesMut<'a, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, C, Idx> ExactSizeIterator for ValuesMut<'_, K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

// ============================================================================
// Standard trait impls
// ============================================================================

impl<K, V, C, Idx> Default for TreeMap<K, V, C, Idx>
where
    C: Compare<K> + Default,
    Idx: TreeIndex,
{
    fn default() -> Self {
        Self {
            tree: RbTree::default(),
        }
    }
}

impl<K, V, C, Idx> Clone for TreeMap<K, V, C, Idx>
where
    K: Clone,
    V: Clone,
    C: Compare<K> + Clone,
    Idx: TreeIndex,
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K, V, C, Idx> fmt::Debug for TreeMap<K, V, C, Idx>
where
    K: fmt::Debug,
    V: fmt::Debug,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C, Idx> PartialEq for TreeMap<K, V, C, Idx>
where
    K: PartialEq,
    V: PartialEq,
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// Equality is the in-order entry sequence, so two maps built in
    /// different insertion orders compare equal.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K, V, C, Idx> Index<&K> for TreeMap<K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is absent. Use [`TreeMap::at`] for a fallible
    /// lookup.
    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<K, V, C, Idx> Extend<(K, V)> for TreeMap<K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.tree.extend(iter);
    }
}

impl<K, V, C, Idx> FromIterator<(K, V)> for TreeMap<K, V, C, Idx>
where
    C: Compare<K> + Default,
    Idx: TreeIndex,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tree: RbTree::from_iter(iter),
        }
    }
}

impl<K, V, C, Idx> IntoIterator for TreeMap<K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = (K, V);
    type IntoIter = crate::tree::IntoIter<K, V, RejectDuplicates, C, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.into_iter()
    }
}

impl<'a, K, V, C, Idx> IntoIterator for &'a TreeMap<K, V, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, RejectDuplicates, C, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
