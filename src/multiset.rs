//! Ordered multiset facade over the tree engine.

use core::fmt;
use core::iter::FusedIterator;

use crate::compare::{Compare, NaturalOrder};
use crate::error::Error;
use crate::index::TreeIndex;
use crate::tree::{AllowDuplicates, Cursor, Iter, Range, RbTree};

/// An ordered multiset, backed by [`RbTree`] with duplicates allowed.
///
/// Equal keys form a contiguous run in iteration order, and within a run
/// elements keep their insertion order (new duplicates append to the right
/// of the run).
///
/// # Example
///
/// ```
/// use redwood::TreeMultiset;
///
/// let mut bag = TreeMultiset::new();
/// bag.insert(2);
/// bag.insert(1);
/// bag.insert(2);
///
/// assert_eq!(bag.len(), 3);
/// assert_eq!(bag.count(&2), 2);
/// assert_eq!(bag.iter().copied().collect::<Vec<_>>(), vec![1, 2, 2]);
/// ```
pub struct TreeMultiset<K, C = NaturalOrder, Idx = u32>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    tree: RbTree<K, (), AllowDuplicates, C, Idx>,
}

// Constructors pin the comparator and index defaults so bare
// `TreeMultiset::new()` infers; `with_comparator` pins only the index.
impl<K: Ord> TreeMultiset<K> {
    /// Creates an empty multiset ordered by the keys' natural order.
    pub fn new() -> Self {
        Self {
            tree: RbTree::new(),
        }
    }

    /// Creates an empty multiset with room for `capacity` keys before the
    /// backing arena grows.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: RbTree::with_capacity(capacity),
        }
    }
}

impl<K, C: Compare<K>> TreeMultiset<K, C> {
    /// Creates an empty multiset ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            tree: RbTree::with_comparator(cmp),
        }
    }
}

impl<K, C, Idx> TreeMultiset<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// Returns the number of keys, duplicates counted.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the multiset has no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Removes all keys, keeping the allocated storage.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Exchanges the contents of two multisets in O(1).
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Returns `true` if at least one key equal to `key` exists. O(log n).
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    /// Number of keys equal to `key`. O(log n + count).
    pub fn count(&self, key: &K) -> usize {
        self.tree.count(key)
    }

    /// Cursor at some key equal to `key`, or the end cursor. Use
    /// [`lower_bound`](Self::lower_bound) for the leftmost of an equal run.
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

    /// Iterator over the contiguous run of keys equal to `key`: the window
    /// `[lower_bound, upper_bound)`.
    pub fn equal_range(&self, key: &K) -> EqualRange<'_, K, C, Idx> {
        EqualRange {
            inner: self.tree.range(self.lower_bound(key), self.upper_bound(key)),
        }
    }

    /// Shared access to the underlying tree engine, for cursor-based walks.
    #[inline]
    pub fn as_tree(&self) -> &RbTree<K, (), AllowDuplicates, C, Idx> {
        &self.tree
    }

    // ========================================================================
    // Insert / remove
    // ========================================================================

    /// Inserts a key, always succeeding. A duplicate lands to the right of
    /// its equal predecessors. Returns the new element's cursor.
    pub fn insert(&mut self, key: K) -> Cursor<Idx> {
        self.tree.insert(key, ()).0
    }

    /// Removes one key equal to `key`, reporting whether one existed.
    pub fn remove_one(&mut self, key: &K) -> bool {
        self.tree.remove_key(key).is_some()
    }

    /// Removes every key equal to `key`, returning how many were removed.
    pub fn remove_all(&mut self, key: &K) -> usize {
        let mut removed = 0;
        while self.tree.remove_key(key).is_some() {
            removed += 1;
        }
        removed
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

    /// Moves every key out of `other` into `self`, duplicates included.
    /// `other` is left empty.
    pub fn merge(&mut self, other: &mut Self) {
        self.tree.merge(&mut other.tree);
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Double-ended iterator over the keys in ascending order. Equal keys
    /// appear in insertion order.
    pub fn iter(&self) -> MultisetIter<'_, K, C, Idx> {
        MultisetIter {
            inner: self.tree.iter(),
        }
    }
}

/// Double-ended iterator over multiset keys in ascending order.
pub struct MultisetIter<'a, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    inner: Iter<'a, K, (), AllowDuplicates, C, Idx>,
}

impl<'a, K, C, Idx> Iterator for MultisetIter<'a, K, C, Idx>
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

impl<K, C, Idx> DoubleEndedIterator for MultisetIter<'_, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, C, Idx> ExactSizeIterator for MultisetIter<'_, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

impl<K, C, Idx> FusedIterator for MultisetIter<'_, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

/// Iterator over the keys of one equal run, from
/// [`TreeMultiset::equal_range`].
pub struct EqualRange<'a, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    inner: Range<'a, K, (), AllowDuplicates, C, Idx>,
}

impl<'a, K, C, Idx> Iterator for EqualRange<'a, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

impl<K, C, Idx> FusedIterator for EqualRange<'_, K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

/// Owning iterator draining the multiset in ascending order.
pub struct MultisetIntoIter<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    inner: crate::tree::IntoIter<K, (), AllowDuplicates, C, Idx>,
}

impl<K, C, Idx> Iterator for MultisetIntoIter<K, C, Idx>
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

impl<K, C, Idx> DoubleEndedIterator for MultisetIntoIter<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, ())| k)
    }
}

impl<K, C, Idx> ExactSizeIterator for MultisetIntoIter<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
}

// ============================================================================
// Standard trait impls
// ============================================================================

impl<K, C, Idx> Default for TreeMultiset<K, C, Idx>
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

impl<K, C, Idx> Clone for TreeMultiset<K, C, Idx>
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

impl<K, C, Idx> fmt::Debug for TreeMultiset<K, C, Idx>
where
    K: fmt::Debug,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, C, Idx> PartialEq for TreeMultiset<K, C, Idx>
where
    K: PartialEq,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K, C, Idx> Extend<K> for TreeMultiset<K, C, Idx>
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

impl<K, C, Idx> FromIterator<K> for TreeMultiset<K, C, Idx>
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

impl<K, C, Idx> IntoIterator for TreeMultiset<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = K;
    type IntoIter = MultisetIntoIter<K, C, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        MultisetIntoIter {
            inner: self.tree.into_iter(),
        }
    }
}

impl<'a, K, C, Idx> IntoIterator for &'a TreeMultiset<K, C, Idx>
where
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = &'a K;
    type IntoIter = MultisetIter<'a, K, C, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
