//! Ordered set facade over the tree engine.

use core::fmt;
use core::iter::FusedIterator;

use crate::compare::{Compare, NaturalOrder};
use crate::error::Error;
use crate::index::TreeIndex;
use crate::tree::{Cursor, Iter, RbTree, RejectDuplicates};

/// An ordered set of unique keys, backed by [`RbTree`] with a `()` payload.
///
/// Inserting an existing key is a no-op that reports `false`. Iteration
/// yields keys in ascending order; `first`/`last` are O(1).
///
/// # Example
///
/// ```
/// use redwood::TreeSet;
///
/// let mut set = TreeSet::new();
/// assert!(set.insert(3));
/// assert!(set.insert(1));
/// assert!(!set.insert(3));
///
/// assert!(set.contains(&1));
/// assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
/// ```
pub struct TreeSet<K, C = NaturalOrder, Idx = u32>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    tree: RbTree<K, (), RejectDuplicates, C, Idx>,
}

// Constructors pin the comparator and index defaults so bare `TreeSet::new()`
// infers; `with_comparator` pins only the index.
impl<K: Ord> TreeSet<K> {
    /// Creates an empty set ordered by the keys' natural order.
    pub fn new() -> Self {
        Self {
            tree: RbTree::new(),
        }
    }

    /// Creates an empty set with room for `capacity` keys before the
    /// backing arena grows.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: RbTree::with_capacity(capacity),
        }
    }
}

impl<K, C: Compare<K>> TreeSet<K, C> {
    /// Creates an empty set ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            tree: RbTree::with_comparator(cmp),
        }
    }
}

impl<K, C, Idx> TreeSet<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// Returns the number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the set has no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Removes all keys, keeping the allocated storage.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Exchanges the contents of two sets in O(1).
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Returns `true` if the set contains `key`. O(log n).
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    /// Returns the stored key equal to `key`, if any. Useful when the
    /// comparator treats distinct values as equal.
    pub fn get(&self, key: &K) -> Option<&K> {
        self.tree.get(self.tree.find(key)).map(|(k, _)| k)
    }

    /// Cursor at the key equal to `key`, or the end cursor.
    pub fn find(&self, key: &K) -> Cursor<Idx> {
        self.tree.find(key)
    }

    /// The smallest key, or `None` if empty. O(1).
    pub fn first(&self) -> Option<&K> {
        self.tree.first().map(|(k, _)| k)
    }

    /// The largest key, or `None` if empty. O(1).
    pub fn last(&self) -> Option<&K> {
        self.tree.last().map(|(k, _)| k)
    }

    /// Cursor at the first key `>= key`, or the end cursor.
    pub fn lower_bound(&self, key: &K) -> Cursor<Idx> {
        self.tree.lower_bound(key)
    }

    /// Cursor at the first key `> key`, or the end cursor.
    pub fn upper_bound(&self, key: &K) -> Cursor<Idx> {
        self.tree.upper_bound(key)
    }

    /// Shared access to the underlying tree engine, for cursor-based walks.
    #[inline]
    pub fn as_tree(&self) -> &RbTree<K, (), RejectDuplicates, C, Idx> {
        &self.tree
    }

    // ========================================================================
    // Insert / remove
    // ========================================================================

    /// Inserts a key. Returns `true` if the key was absent; an existing
    /// key is left untouched and the argument is dropped.
    pub fn insert(&mut self, key: K) -> bool {
        self.tree.insert(key, ()).1
    }

    /// Removes `key`, reporting whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.tree.remove_key(key).is_some()
    }

    /// Removes `key` and returns the stored key, if present.
    pub fn take(&mut self, key: &K) -> Option<K> {
        self.tree.remove_key(key).map(|(k, ())| k)
    }

    /// Removes the key at `cursor`.
    ///
    /// Fails with [`Error::InvalidCursor`] for the end cursor, a foreign
    /// cursor, or a cursor whose key was already removed.
    pub fn remove_at(&mut self, cursor: Cursor<Idx>) -> Result<K, Error> {
        self.tree.remove(cursor).map(|(k, ())| k)
    }

    /// Removes and returns the smallest key.
    pub fn pop_first(&mut self) -> Option<K> {
        self.tree.pop_first().map(|(k, ())| k)
    }

    /// Removes and returns the largest key.
    pub fn pop_last(&mut self) -> Option<K> {
        self.tree.pop_last().map(|(k, ())| k)
    }

    /// Moves keys out of `other` into `self`.
    ///
    /// Only keys absent from `self` are moved; colliding keys stay behind
    /// in `other`.
    pub fn merge(&mut self, other: &mut Self) {
        self.tree.merge(&mut other.tree);
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Double-ended iterator over the keys in ascending order.
    pub fn iter(&self) -> SetIter<'_, K, C, Idx> {
        SetIter {
            inner: self.tree.iter(),
        }
    }
}

/// Double-ended iterator over set keys in ascending order.
pub struct SetIter<'a, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    inner: Iter<'a, K, (), RejectDuplicates, C, Idx>,
}

impl<'a, K, C, Idx> Iterator for SetIter<'a, K, C, Idx>
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

impl<K, C, Idx> DoubleEndedIterator for SetIter<'_, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, C, Idx> ExactSizeIterator for SetIter<'_, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

impl<K, C, Idx> FusedIterator for SetIter<'_, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

/// Owning iterator draining the set in ascending order.
pub struct SetIntoIter<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    inner: crate::tree::IntoIter<K, (), RejectDuplicates, C, Idx>,
}

impl<K, C, Idx> Iterator for SetIntoIter<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, ())| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, C, Idx> DoubleEndedIterator for SetIntoIter<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, ())| k)
    }
}

impl<K, C, Idx> ExactSizeIterator for SetIntoIter<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

// ============================================================================
// Standard trait impls
// ============================================================================

impl<K, C, Idx> Default for TreeSet<K, C, Idx>
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

impl<K, C, Idx> Clone for TreeSet<K, C, Idx>
where
    K: Clone,
    C: Compare<K> + Clone,
    Idx: TreeIndex,
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K, C, Idx> fmt::Debug for TreeSet<K, C, Idx>
where
    K: fmt::Debug,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, C, Idx> PartialEq for TreeSet<K, C, Idx>
where
    K: PartialEq,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K, C, Idx> Extend<K> for TreeSet<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K, C, Idx> FromIterator<K> for TreeSet<K, C, Idx>
where
    C: Compare<K> + Default,
    Idx: TreeIndex,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<K, C, Idx> IntoIterator for TreeSet<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = K;
    type IntoIter = SetIntoIter<K, C, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        SetIntoIter {
            inner: self.tree.into_iter(),
        }
    }
}

impl<'a, K, C, Idx> IntoIterator for &'a TreeSet<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = &'a K;
    type IntoIter = SetIter<'a, K, C, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
