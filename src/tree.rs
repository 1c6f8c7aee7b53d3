//! Red-black tree engine backed by arena storage.
//!
//! One generic engine serves all three facade containers. The uniqueness
//! policy ([`RejectDuplicates`] / [`AllowDuplicates`]) and the ordering
//! relation ([`Compare`]) are injected as type parameters; the facades are
//! thin compositions over this type, never subclasses of each other.
//!
//! # Design
//!
//! Nodes live in an [`Arena`] and reference each other by index. `Idx::NIL`
//! terminates every leaf and is the universal end cursor; the tree keeps
//! cached `min`/`max` indices so `first()`, `last()`, and iteration setup
//! are O(1) without a descent.
//!
//! ```text
//!                 root ──► 40(B)
//!                         ╱      ╲
//!                    20(R)        60(B)
//!                   ╱     ╲           ╲
//!              10(B)       30(B)       70(R)
//!              ╱  ╲        ╱  ╲        ╱  ╲
//!            NIL  NIL    NIL  NIL    NIL  NIL
//!
//!  min ──► 10        max ──► 70
//! ```
//!
//! The coloring invariants (black root, no red-red edge, equal black-height
//! on every root-to-NIL path) bound the height to O(log n), so insert,
//! erase, and every lookup are worst-case logarithmic.
//!
//! # Cursors
//!
//! A [`Cursor`] is a copyable position: a slot index plus a stamp of the
//! owning tree. Cursors stay valid across unrelated mutations (slots are
//! stable) and are invalidated only for the element actually erased.
//! Removal through the end cursor, a cursor from another tree, or a cursor
//! whose slot was already freed is rejected with
//! [`Error::InvalidCursor`](crate::Error::InvalidCursor).

use core::cmp::Ordering;
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::arena::Arena;
use crate::compare::{Compare, NaturalOrder};
use crate::error::Error;
use crate::index::TreeIndex;

// ============================================================================
// Policy
// ============================================================================

/// Uniqueness policy: what `insert` does when it meets an equal key.
///
/// Injected into [`RbTree`] as a zero-sized type parameter so one engine
/// serves map, set, and multiset.
pub trait DuplicatePolicy {
    /// `true` if equal keys may coexist in the tree.
    const ALLOW_DUPLICATES: bool;
}

/// Inserting an existing key returns the existing element and `false`;
/// the tree is not mutated. Policy of [`TreeMap`](crate::TreeMap) and
/// [`TreeSet`](crate::TreeSet).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RejectDuplicates;

/// Equal keys are appended to the right of their equal predecessors, so an
/// equal-key run is contiguous and preserves insertion order. Policy of
/// [`TreeMultiset`](crate::TreeMultiset).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllowDuplicates;

impl DuplicatePolicy for RejectDuplicates {
    const ALLOW_DUPLICATES: bool = false;
}

impl DuplicatePolicy for AllowDuplicates {
    const ALLOW_DUPLICATES: bool = true;
}

// ============================================================================
// Node
// ============================================================================

/// Node color for the balancing invariants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// A tree node: entry plus three structural links.
#[derive(Clone, Debug)]
pub(crate) struct RbNode<K, V, Idx: TreeIndex> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) color: Color,
    pub(crate) parent: Idx,
    pub(crate) left: Idx,
    pub(crate) right: Idx,
}

impl<K, V, Idx: TreeIndex> RbNode<K, V, Idx> {
    /// New nodes enter the tree red, unlinked.
    #[inline]
    fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            color: Color::Red,
            parent: Idx::NIL,
            left: Idx::NIL,
            right: Idx::NIL,
        }
    }
}

// ============================================================================
// Cursor
// ============================================================================

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

#[inline]
fn next_tree_id() -> u64 {
    NEXT_TREE_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// A copyable position in a tree.
///
/// The end cursor (`is_end() == true`) is one past the maximum element;
/// decrementing it yields the maximum. A cursor is stamped with the identity
/// of the tree that produced it, so a cursor handed to the wrong tree is
/// detected rather than dereferenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor<Idx: TreeIndex = u32> {
    idx: Idx,
    tree: u64,
}

impl<Idx: TreeIndex> Cursor<Idx> {
    /// Returns `true` if this is the end (one-past-maximum) position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.idx.is_nil()
    }
}

// ============================================================================
// RbTree
// ============================================================================

/// The red-black tree engine.
///
/// # Type Parameters
///
/// - `K`: key type (no `Ord` bound; ordering comes from `C`)
/// - `V`: payload type (`()` for the set facades)
/// - `P`: uniqueness policy, [`RejectDuplicates`] or [`AllowDuplicates`]
/// - `C`: ordering relation, defaults to [`NaturalOrder`]
/// - `Idx`: link index type, defaults to `u32`
///
/// # Example
///
/// ```
/// use redwood::{RbTree, RejectDuplicates};
///
/// let mut tree: RbTree<u64, &str, RejectDuplicates> = RbTree::new();
///
/// let (_, inserted) = tree.insert(10, "ten");
/// assert!(inserted);
/// let (existing, inserted) = tree.insert(10, "TEN");
/// assert!(!inserted);
/// assert_eq!(tree.get(existing), Some((&10, &"ten")));
/// ```
pub struct RbTree<K, V, P, C = NaturalOrder, Idx = u32>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    arena: Arena<RbNode<K, V, Idx>, Idx>,
    root: Idx,
    /// Cached minimum data node, `NIL` when empty.
    min: Idx,
    /// Cached maximum data node, `NIL` when empty.
    max: Idx,
    cmp: C,
    /// Identity stamp carried by cursors for foreign-cursor detection.
    id: u64,
    _policy: PhantomData<P>,
}

impl<K, V, P, C, Idx> RbTree<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    /// Creates an empty tree with the default comparator.
    pub fn new() -> Self
    where
        C: Default,
    {
        Self::with_comparator(C::default())
    }

    /// Creates an empty tree ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            arena: Arena::new(),
            root: Idx::NIL,
            min: Idx::NIL,
            max: Idx::NIL,
            cmp,
            id: next_tree_id(),
            _policy: PhantomData,
        }
    }

    /// Creates an empty tree with room for `capacity` nodes before the
    /// arena grows.
    pub fn with_capacity(capacity: usize) -> Self
    where
        C: Default,
    {
        let mut tree = Self::new();
        tree.arena.reserve(capacity);
        tree
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` if the tree has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Returns the number of nodes the arena can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Reserves room for at least `additional` more nodes.
    pub fn reserve(&mut self, additional: usize) {
        self.arena.reserve(additional);
    }

    /// Removes all elements, keeping the allocated storage.
    ///
    /// Iterative: the arena is drained directly, no tree walk.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = Idx::NIL;
        self.min = Idx::NIL;
        self.max = Idx::NIL;
    }

    /// Exchanges the contents of two trees in O(1).
    ///
    /// Identity stamps travel with the nodes, so existing cursors keep
    /// resolving against whichever tree now holds their element.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    // ========================================================================
    // Node access helpers
    // ========================================================================

    #[inline]
    fn node(&self, idx: Idx) -> &RbNode<K, V, Idx> {
        self.arena.get(idx).expect("invalid index")
    }

    #[inline]
    fn node_mut(&mut self, idx: Idx) -> &mut RbNode<K, V, Idx> {
        self.arena.get_mut(idx).expect("invalid index")
    }

    #[inline]
    fn parent(&self, idx: Idx) -> Idx {
        self.node(idx).parent
    }

    #[inline]
    fn left(&self, idx: Idx) -> Idx {
        self.node(idx).left
    }

    #[inline]
    fn right(&self, idx: Idx) -> Idx {
        self.node(idx).right
    }

    /// Color of a possibly-NIL position. NIL leaves are black.
    #[inline]
    fn color(&self, idx: Idx) -> Color {
        if idx.is_nil() {
            Color::Black
        } else {
            self.node(idx).color
        }
    }

    #[inline]
    fn set_color(&mut self, idx: Idx, color: Color) {
        self.node_mut(idx).color = color;
    }

    /// Leftmost node of the subtree at `idx` (`NIL` in, `NIL` out).
    fn min_in(&self, mut idx: Idx) -> Idx {
        if idx.is_nil() {
            return idx;
        }
        while !self.left(idx).is_nil() {
            idx = self.left(idx);
        }
        idx
    }

    /// Rightmost node of the subtree at `idx` (`NIL` in, `NIL` out).
    fn max_in(&self, mut idx: Idx) -> Idx {
        if idx.is_nil() {
            return idx;
        }
        while !self.right(idx).is_nil() {
            idx = self.right(idx);
        }
        idx
    }

    #[inline]
    fn cursor(&self, idx: Idx) -> Cursor<Idx> {
        Cursor {
            idx,
            tree: self.id,
        }
    }

    // ========================================================================
    // Cursors
    // ========================================================================

    /// Cursor at the minimum element, or the end cursor if empty. O(1).
    #[inline]
    pub fn cursor_front(&self) -> Cursor<Idx> {
        self.cursor(self.min)
    }

    /// Cursor at the maximum element, or the end cursor if empty. O(1).
    #[inline]
    pub fn cursor_back(&self) -> Cursor<Idx> {
        self.cursor(self.max)
    }

    /// The end cursor: one past the maximum element.
    #[inline]
    pub fn end(&self) -> Cursor<Idx> {
        self.cursor(Idx::NIL)
    }

    /// Returns the element at `cursor`, or `None` for the end cursor, a
    /// freed slot, or a cursor from another tree.
    #[inline]
    pub fn get(&self, cursor: Cursor<Idx>) -> Option<(&K, &V)> {
        if cursor.tree != self.id {
            return None;
        }
        let node = self.arena.get(cursor.idx)?;
        Some((&node.key, &node.value))
    }

    /// Like [`get`](Self::get) with a mutable payload reference. Keys stay
    /// shared: mutating a key would break the ordering invariant.
    #[inline]
    pub fn get_mut(&mut self, cursor: Cursor<Idx>) -> Option<(&K, &mut V)> {
        if cursor.tree != self.id {
            return None;
        }
        let node = self.arena.get_mut(cursor.idx)?;
        Some((&node.key, &mut node.value))
    }

    /// The key at `cursor`, or `None` for the end cursor, a freed slot, or
    /// a cursor from another tree.
    #[inline]
    pub fn key(&self, cursor: Cursor<Idx>) -> Option<&K> {
        self.get(cursor).map(|(k, _)| k)
    }

    /// In-order successor. `next` of the maximum is the end cursor; `next`
    /// of the end cursor (or of an invalid cursor) stays at the end.
    pub fn next(&self, cursor: Cursor<Idx>) -> Cursor<Idx> {
        if cursor.tree != self.id || !self.arena.contains(cursor.idx) {
            return self.end();
        }
        self.cursor(self.successor(cursor.idx))
    }

    /// In-order predecessor. `prev` of the end cursor is the maximum
    /// element (O(1) via the cache); `prev` of the minimum is the end
    /// cursor.
    pub fn prev(&self, cursor: Cursor<Idx>) -> Cursor<Idx> {
        if cursor.tree != self.id {
            return self.end();
        }
        if cursor.idx.is_nil() {
            return self.cursor(self.max);
        }
        if !self.arena.contains(cursor.idx) {
            return self.end();
        }
        self.cursor(self.predecessor(cursor.idx))
    }

    /// Canonical parent-chain successor: leftmost of the right subtree if
    /// one exists, otherwise the first ancestor reached via a left-child
    /// step.
    fn successor(&self, idx: Idx) -> Idx {
        let right = self.right(idx);
        if !right.is_nil() {
            return self.min_in(right);
        }
        let mut node = idx;
        let mut parent = self.parent(node);
        while !parent.is_nil() && node == self.right(parent) {
            node = parent;
            parent = self.parent(parent);
        }
        parent
    }

    /// Mirror image of [`successor`](Self::successor).
    fn predecessor(&self, idx: Idx) -> Idx {
        let left = self.left(idx);
        if !left.is_nil() {
            return self.max_in(left);
        }
        let mut node = idx;
        let mut parent = self.parent(node);
        while !parent.is_nil() && node == self.left(parent) {
            node = parent;
            parent = self.parent(parent);
        }
        parent
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Finds an element with the given key, or the end cursor. O(log n).
    ///
    /// Under [`AllowDuplicates`] this returns whichever element of the
    /// equal run the descent meets first; use
    /// [`lower_bound`](Self::lower_bound) for the leftmost.
    pub fn find(&self, key: &K) -> Cursor<Idx> {
        let mut current = self.root;
        while !current.is_nil() {
            match self.cmp.compare(key, &self.node(current).key) {
                Ordering::Less => current = self.node(current).left,
                Ordering::Greater => current = self.node(current).right,
                Ordering::Equal => return self.cursor(current),
            }
        }
        self.end()
    }

    /// Returns `true` if an element with the given key exists. O(log n).
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        !self.find(key).is_end()
    }

    /// First element with key `>= key`, or the end cursor. O(log n).
    pub fn lower_bound(&self, key: &K) -> Cursor<Idx> {
        let mut current = self.root;
        let mut result = Idx::NIL;
        while !current.is_nil() {
            if self.cmp.compare(&self.node(current).key, key) != Ordering::Less {
                result = current;
                current = self.node(current).left;
            } else {
                current = self.node(current).right;
            }
        }
        self.cursor(result)
    }

    /// First element with key `> key`, or the end cursor. O(log n).
    pub fn upper_bound(&self, key: &K) -> Cursor<Idx> {
        let mut current = self.root;
        let mut result = Idx::NIL;
        while !current.is_nil() {
            if self.cmp.compare(&self.node(current).key, key) == Ordering::Greater {
                result = current;
                current = self.node(current).left;
            } else {
                current = self.node(current).right;
            }
        }
        self.cursor(result)
    }

    /// Number of elements equal to `key`: the length of the contiguous
    /// equal-key run. O(log n + count).
    pub fn count(&self, key: &K) -> usize {
        let mut cur = self.lower_bound(key).idx;
        let end = self.upper_bound(key).idx;
        let mut n = 0;
        while cur != end {
            n += 1;
            cur = self.successor(cur);
        }
        n
    }

    /// The minimum element, or `None` if empty. O(1).
    #[inline]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.get(self.cursor_front())
    }

    /// The maximum element, or `None` if empty. O(1).
    #[inline]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.get(self.cursor_back())
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Inserts an element.
    ///
    /// Under [`RejectDuplicates`], meeting an equal key stops the descent
    /// and returns `(existing, false)` without touching the tree; the new
    /// entry is dropped. Under [`AllowDuplicates`] the new element always
    /// lands to the right of its equal predecessors and the result is
    /// `(new, true)`.
    ///
    /// O(log n) with amortized O(1) rotations.
    pub fn insert(&mut self, key: K, value: V) -> (Cursor<Idx>, bool) {
        // Descend to the attachment point.
        let mut current = self.root;
        let mut parent = Idx::NIL;
        let mut go_left = false;
        while !current.is_nil() {
            parent = current;
            match self.cmp.compare(&key, &self.node(current).key) {
                Ordering::Less => {
                    current = self.node(current).left;
                    go_left = true;
                }
                Ordering::Equal if !P::ALLOW_DUPLICATES => {
                    return (self.cursor(current), false);
                }
                _ => {
                    current = self.node(current).right;
                    go_left = false;
                }
            }
        }

        // Link the new red node.
        let idx = self.arena.insert(RbNode::new(key, value));
        self.node_mut(idx).parent = parent;
        if parent.is_nil() {
            self.root = idx;
        } else if go_left {
            self.node_mut(parent).left = idx;
        } else {
            self.node_mut(parent).right = idx;
        }

        self.refresh_extremes_after_link(idx);
        self.fix_after_insert(idx);
        (self.cursor(idx), true)
    }

    /// Updates the min/max cache for a freshly linked node.
    fn refresh_extremes_after_link(&mut self, idx: Idx) {
        if self.min.is_nil() {
            self.min = idx;
            self.max = idx;
            return;
        }
        if self.cmp.compare(&self.node(idx).key, &self.node(self.min).key) == Ordering::Less {
            self.min = idx;
        }
        // `>=` so the newest of an equal run is the cached maximum,
        // matching the duplicate run's right-append order.
        if self.cmp.compare(&self.node(idx).key, &self.node(self.max).key) != Ordering::Less {
            self.max = idx;
        }
    }

    /// Restores the coloring invariants after linking `node` (red).
    ///
    /// Walks up while the parent is red: a red uncle means recolor and
    /// continue from the grandparent; a black uncle means one or two
    /// rotations terminate the walk.
    fn fix_after_insert(&mut self, mut node: Idx) {
        while node != self.root && self.color(self.parent(node)) == Color::Red {
            let mut parent = self.parent(node);
            // Parent is red, so it is not the root and has a parent.
            let grandparent = self.parent(parent);
            let uncle = if parent == self.left(grandparent) {
                self.right(grandparent)
            } else {
                self.left(grandparent)
            };

            if self.color(uncle) == Color::Red {
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                node = grandparent;
            } else {
                // Straighten a zig-zag before the terminal rotation.
                if node == self.right(parent) && parent == self.left(grandparent) {
                    self.rotate_left(parent);
                    mem::swap(&mut node, &mut parent);
                } else if node == self.left(parent) && parent == self.right(grandparent) {
                    self.rotate_right(parent);
                    mem::swap(&mut node, &mut parent);
                }
                if node == self.left(parent) {
                    self.rotate_right(grandparent);
                } else {
                    self.rotate_left(grandparent);
                }
                self.set_color(parent, Color::Black);
                self.set_color(grandparent, Color::Red);
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    // ========================================================================
    // Remove
    // ========================================================================

    /// Removes the element at `cursor` and returns its entry.
    ///
    /// Fails with [`Error::InvalidCursor`] for the end cursor, a cursor
    /// from another tree, or a cursor whose slot was already freed. The
    /// tree is untouched on failure.
    pub fn remove(&mut self, cursor: Cursor<Idx>) -> Result<(K, V), Error> {
        if cursor.tree != self.id || !self.arena.contains(cursor.idx) {
            return Err(Error::InvalidCursor);
        }
        let mut target = cursor.idx;

        // Two children: exchange entries with the in-order predecessor
        // (rightmost of the left subtree) so the physical removal happens
        // at a position with at most one child.
        if !self.left(target).is_nil() && !self.right(target).is_nil() {
            let pred = self.max_in(self.left(target));
            self.swap_entries(target, pred);
            target = pred;
        }

        // Exactly one child: the target is black and the child is a red
        // leaf. Splice the child into the target's structural position
        // (recolored black) and free the target's own slot, so the slot
        // that dies is the one holding the erased entry.
        let (left, right) = (self.left(target), self.right(target));
        if left.is_nil() != right.is_nil() {
            let child = if left.is_nil() { right } else { left };
            let parent = self.parent(target);
            self.node_mut(child).parent = parent;
            self.node_mut(child).color = Color::Black;
            if parent.is_nil() {
                self.root = child;
            } else if self.left(parent) == target {
                self.node_mut(parent).left = child;
            } else {
                self.node_mut(parent).right = child;
            }
            if self.min == target {
                self.min = self.min_in(self.root);
            }
            if self.max == target {
                self.max = self.max_in(self.root);
            }
            let node = self.arena.remove(target).expect("invalid index");
            return Ok((node.key, node.value));
        }

        // Leaf. Removing a black leaf leaves a double-black deficiency;
        // resolve it while the node is still linked.
        if self.node(target).color == Color::Black {
            self.fix_before_remove(target);
        }

        // Unlink and free.
        let parent = self.parent(target);
        if parent.is_nil() {
            // Sole remaining node: degenerate to the empty state.
            self.root = Idx::NIL;
            self.min = Idx::NIL;
            self.max = Idx::NIL;
        } else {
            if self.left(parent) == target {
                self.node_mut(parent).left = Idx::NIL;
            } else {
                self.node_mut(parent).right = Idx::NIL;
            }
            if self.min == target {
                self.min = self.min_in(self.root);
            }
            if self.max == target {
                self.max = self.max_in(self.root);
            }
        }
        let node = self.arena.remove(target).expect("invalid index");
        Ok((node.key, node.value))
    }

    /// Removes one element with the given key, or `None` if absent.
    pub fn remove_key(&mut self, key: &K) -> Option<(K, V)> {
        let cursor = self.find(key);
        if cursor.is_end() {
            return None;
        }
        Some(self.remove(cursor).expect("invalid index"))
    }

    /// Removes and returns the minimum element.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let cursor = self.cursor_front();
        if cursor.is_end() {
            return None;
        }
        Some(self.remove(cursor).expect("invalid index"))
    }

    /// Removes and returns the maximum element.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let cursor = self.cursor_back();
        if cursor.is_end() {
            return None;
        }
        Some(self.remove(cursor).expect("invalid index"))
    }

    /// Exchanges the entries of two slots, leaving structure and colors in
    /// place.
    fn swap_entries(&mut self, a: Idx, b: Idx) {
        let (na, nb) = self.arena.get2_mut(a, b);
        mem::swap(&mut na.key, &mut nb.key);
        mem::swap(&mut na.value, &mut nb.value);
    }

    /// Double-black fixup, run on a still-linked black leaf about to be
    /// removed.
    ///
    /// Walks up from the deficient position: a red sibling is rotated
    /// black-side-in and re-examined; an all-black sibling absorbs one
    /// black by turning red (terminating if the parent was red, else
    /// propagating the deficiency up); a sibling with a usable red child
    /// terminates with one or two rotations.
    fn fix_before_remove(&mut self, mut node: Idx) {
        let mut parent = self.parent(node);
        while node != self.root && self.color(node) == Color::Black {
            if node == self.left(parent) {
                let mut sibling = self.right(parent);
                if self.color(sibling) == Color::Red {
                    self.set_color(parent, Color::Red);
                    self.set_color(sibling, Color::Black);
                    self.rotate_left(parent);
                    sibling = self.right(parent);
                }
                if self.color(self.left(sibling)) == Color::Black
                    && self.color(self.right(sibling)) == Color::Black
                {
                    self.set_color(sibling, Color::Red);
                    if self.color(parent) == Color::Red {
                        self.set_color(parent, Color::Black);
                        break;
                    }
                    node = parent;
                    parent = self.parent(node);
                } else {
                    if self.color(self.right(sibling)) == Color::Black {
                        // Near child is red: rotate it into the far slot.
                        self.set_color(sibling, Color::Red);
                        let near = self.left(sibling);
                        self.set_color(near, Color::Black);
                        self.rotate_right(sibling);
                        sibling = self.right(parent);
                    }
                    let parent_color = self.color(parent);
                    self.set_color(sibling, parent_color);
                    self.set_color(parent, Color::Black);
                    let far = self.right(sibling);
                    self.set_color(far, Color::Black);
                    self.rotate_left(parent);
                    break;
                }
            } else {
                let mut sibling = self.left(parent);
                if self.color(sibling) == Color::Red {
                    self.set_color(parent, Color::Red);
                    self.set_color(sibling, Color::Black);
                    self.rotate_right(parent);
                    sibling = self.left(parent);
                }
                if self.color(self.left(sibling)) == Color::Black
                    && self.color(self.right(sibling)) == Color::Black
                {
                    self.set_color(sibling, Color::Red);
                    if self.color(parent) == Color::Red {
                        self.set_color(parent, Color::Black);
                        break;
                    }
                    node = parent;
                    parent = self.parent(node);
                } else {
                    if self.color(self.left(sibling)) == Color::Black {
                        self.set_color(sibling, Color::Red);
                        let near = self.right(sibling);
                        self.set_color(near, Color::Black);
                        self.rotate_left(sibling);
                        sibling = self.left(parent);
                    }
                    let parent_color = self.color(parent);
                    self.set_color(sibling, parent_color);
                    self.set_color(parent, Color::Black);
                    let far = self.left(sibling);
                    self.set_color(far, Color::Black);
                    self.rotate_right(parent);
                    break;
                }
            }
        }
    }

    // ========================================================================
    // Rotations
    // ========================================================================

    /// Left rotation at `node`: the right child takes its place. Preserves
    /// the in-order sequence.
    fn rotate_left(&mut self, node: Idx) {
        let pivot = self.right(node);
        let pivot_left = self.left(pivot);
        self.node_mut(node).right = pivot_left;
        if !pivot_left.is_nil() {
            self.node_mut(pivot_left).parent = node;
        }
        let parent = self.parent(node);
        self.node_mut(pivot).parent = parent;
        if parent.is_nil() {
            self.root = pivot;
        } else if self.left(parent) == node {
            self.node_mut(parent).left = pivot;
        } else {
            self.node_mut(parent).right = pivot;
        }
        self.node_mut(pivot).left = node;
        self.node_mut(node).parent = pivot;
    }

    /// Mirror image of [`rotate_left`](Self::rotate_left).
    fn rotate_right(&mut self, node: Idx) {
        let pivot = self.left(node);
        let pivot_right = self.right(pivot);
        self.node_mut(node).left = pivot_right;
        if !pivot_right.is_nil() {
            self.node_mut(pivot_right).parent = node;
        }
        let parent = self.parent(node);
        self.node_mut(pivot).parent = parent;
        if parent.is_nil() {
            self.root = pivot;
        } else if self.left(parent) == node {
            self.node_mut(parent).left = pivot;
        } else {
            self.node_mut(parent).right = pivot;
        }
        self.node_mut(pivot).right = node;
        self.node_mut(node).parent = pivot;
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Moves elements out of `other` into `self`.
    ///
    /// Under [`RejectDuplicates`], only keys absent from `self` are moved;
    /// colliding keys stay behind, so `other` is only partially drained.
    /// Under [`AllowDuplicates`] every element is moved and `other` is left
    /// empty. Entries are moved, never cloned; each relocation re-runs the
    /// insertion fixup since color and position cannot carry over.
    pub fn merge(&mut self, other: &mut Self) {
        if P::ALLOW_DUPLICATES {
            while let Some((key, value)) = other.pop_first() {
                self.insert(key, value);
            }
            return;
        }
        let mut cursor = other.cursor_front();
        while !cursor.is_end() {
            let next = other.next(cursor);
            let absent = {
                let (key, _) = other.get(cursor).expect("invalid index");
                !self.contains(key)
            };
            if absent {
                let (key, value) = other.remove(cursor).expect("invalid index");
                self.insert(key, value);
            }
            cursor = next;
        }
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Double-ended iterator over the elements in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V, P, C, Idx> {
        Iter {
            tree: self,
            front: self.min,
            back: self.max,
            remaining: self.len(),
        }
    }

    /// Forward iterator with mutable payload references, ascending order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, P, C, Idx> {
        IterMut {
            front: self.min,
            remaining: self.len(),
            tree: self,
        }
    }

    /// Iterator over the half-open cursor window `[from, to)`.
    ///
    /// Both cursors must come from this tree; a foreign cursor on either
    /// end yields an empty range.
    pub fn range(&self, from: Cursor<Idx>, to: Cursor<Idx>) -> Range<'_, K, V, P, C, Idx> {
        let (front, to) = if from.tree == self.id && to.tree == self.id {
            (from.idx, to.idx)
        } else {
            (Idx::NIL, Idx::NIL)
        };
        Range {
            tree: self,
            front,
            to,
        }
    }

    // ========================================================================
    // Invariant checking (test builds only)
    // ========================================================================

    /// Asserts every structural invariant: black root, no red-red edge,
    /// equal black-heights, consistent parent links, sorted in-order walk,
    /// exact size and min/max caches.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        if self.root.is_nil() {
            assert_eq!(self.len(), 0);
            assert!(self.min.is_nil() && self.max.is_nil());
            return;
        }
        assert_eq!(self.color(self.root), Color::Black, "root must be black");
        assert!(self.parent(self.root).is_nil());

        let mut stack = vec![(self.root, 0usize)];
        let mut nil_black_height = None;
        let mut count = 0usize;
        while let Some((idx, mut black_height)) = stack.pop() {
            count += 1;
            let node = self.node(idx);
            if node.color == Color::Black {
                black_height += 1;
            }
            if node.color == Color::Red {
                assert_ne!(self.color(node.left), Color::Red, "red-red edge");
                assert_ne!(self.color(node.right), Color::Red, "red-red edge");
            }
            for child in [node.left, node.right] {
                if child.is_nil() {
                    match nil_black_height {
                        None => nil_black_height = Some(black_height),
                        Some(expected) => {
                            assert_eq!(black_height, expected, "black-height mismatch")
                        }
                    }
                } else {
                    assert_eq!(self.parent(child), idx, "parent link mismatch");
                    stack.push((child, black_height));
                }
            }
        }
        assert_eq!(count, self.len(), "size does not match node count");

        let mut walked = 0usize;
        let mut prev: Option<Idx> = None;
        let mut current = self.min;
        while !current.is_nil() {
            if let Some(p) = prev {
                assert_ne!(
                    self.cmp.compare(&self.node(p).key, &self.node(current).key),
                    Ordering::Greater,
                    "in-order regression"
                );
            }
            prev = Some(current);
            walked += 1;
            current = self.successor(current);
        }
        assert_eq!(walked, self.len(), "in-order walk count mismatch");
        assert_eq!(self.min, self.min_in(self.root), "stale min cache");
        assert_eq!(self.max, self.max_in(self.root), "stale max cache");
    }
}

// ============================================================================
// Standard trait impls
// ============================================================================

impl<K, V, P, C, Idx> Default for RbTree<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K> + Default,
    Idx: TreeIndex,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P, C, Idx> Clone for RbTree<K, V, P, C, Idx>
where
    K: Clone,
    V: Clone,
    P: DuplicatePolicy,
    C: Compare<K> + Clone,
    Idx: TreeIndex,
{
    /// Deep copy: an independent node graph with the same shape and colors.
    /// Iterative (explicit work stack), no recursion.
    fn clone(&self) -> Self {
        let mut copy = Self::with_comparator(self.cmp.clone());
        copy.arena.reserve(self.len());
        if self.root.is_nil() {
            return copy;
        }
        let mut stack = vec![(self.root, Idx::NIL, false)];
        while let Some((src, dst_parent, is_left)) = stack.pop() {
            let node = self.node(src);
            let dst = copy.arena.insert(RbNode {
                key: node.key.clone(),
                value: node.value.clone(),
                color: node.color,
                parent: dst_parent,
                left: Idx::NIL,
                right: Idx::NIL,
            });
            if dst_parent.is_nil() {
                copy.root = dst;
            } else if is_left {
                copy.node_mut(dst_parent).left = dst;
            } else {
                copy.node_mut(dst_parent).right = dst;
            }
            if !node.left.is_nil() {
                stack.push((node.left, dst, true));
            }
            if !node.right.is_nil() {
                stack.push((node.right, dst, false));
            }
        }
        copy.min = copy.min_in(copy.root);
        copy.max = copy.max_in(copy.root);
        copy
    }
}

impl<K, V, P, C, Idx> fmt::Debug for RbTree<K, V, P, C, Idx>
where
    K: fmt::Debug,
    V: fmt::Debug,
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, P, C, Idx> Extend<(K, V)> for RbTree<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, P, C, Idx> FromIterator<(K, V)> for RbTree<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K> + Default,
    Idx: TreeIndex,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

// ============================================================================
// Iterators
// ============================================================================

/// Double-ended iterator over `(&K, &V)` in ascending key order.
pub struct Iter<'a, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    tree: &'a RbTree<K, V, P, C, Idx>,
    front: Idx,
    back: Idx,
    remaining: usize,
}

impl<'a, K, V, P, C, Idx> Iterator for Iter<'a, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.tree.node(self.front);
        self.remaining -= 1;
        if self.remaining > 0 {
            self.front = self.tree.successor(self.front);
        }
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, P, C, Idx> DoubleEndedIterator for Iter<'_, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.tree.node(self.back);
        self.remaining -= 1;
        if self.remaining > 0 {
            self.back = self.tree.predecessor(self.back);
        }
        Some((&node.key, &node.value))
    }
}

impl<K, V, P, C, Idx> ExactSizeIterator for Iter<'_, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
}

impl<K, V, P, C, Idx> FusedIterator for Iter<'_, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
}

impl<K, V, P, C, Idx> Clone for Iter<'_, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

/// Forward iterator over `(&K, &mut V)` in ascending key order.
pub struct IterMut<'a, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    tree: &'a mut RbTree<K, V, P, C, Idx>,
    front: Idx,
    remaining: usize,
}

impl<'a, K: 'a, V: 'a, P, C, Idx> Iterator for IterMut<'a, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.front;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.front = self.tree.successor(idx);
        }
        // Safety: each slot is visited exactly once (front advances before
        // the reference escapes), the arena lives for 'a, and the yielded
        // references cannot mutate tree structure. This works around the
        // borrow checker's inability to track per-slot disjointness.
        let node: &'a mut RbNode<K, V, Idx> =
            unsafe { &mut *(self.tree.arena.get_mut(idx).expect("invalid index") as *mut _) };
        Some((&node.key, &mut node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, P, C, Idx> ExactSizeIterator for IterMut<'_, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
}

impl<K, V, P, C, Idx> FusedIterator for IterMut<'_, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
}

/// Iterator over a half-open cursor window `[from, to)`.
pub struct Range<'a, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    tree: &'a RbTree<K, V, P, C, Idx>,
    front: Idx,
    to: Idx,
}

impl<'a, K, V, P, C, Idx> Iterator for Range<'a, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front.is_nil() || self.front == self.to {
            return None;
        }
        let node = self.tree.node(self.front);
        self.front = self.tree.successor(self.front);
        Some((&node.key, &node.value))
    }
}

impl<K, V, P, C, Idx> FusedIterator for Range<'_, K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
}

/// Owning iterator draining the tree in ascending key order.
pub struct IntoIter<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    tree: RbTree<K, V, P, C, Idx>,
}

impl<K, V, P, C, Idx> Iterator for IntoIter<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<K, V, P, C, Idx> DoubleEndedIterator for IntoIter<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.tree.pop_last()
    }
}

impl<K, V, P, C, Idx> ExactSizeIterator for IntoIter<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
}

impl<K, V, P, C, Idx> IntoIterator for RbTree<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, P, C, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { tree: self }
    }
}

impl<'a, K, V, P, C, Idx> IntoIterator for &'a RbTree<K, V, P, C, Idx>
where
    P: DuplicatePolicy,
    C: Compare<K>,
    Idx: TreeIndex,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P, C, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    type UniqueTree = RbTree<u64, u64, RejectDuplicates>;
    type MultiTree = RbTree<u64, u64, AllowDuplicates>;

    fn make_rng() -> SmallRng {
        SmallRng::seed_from_u64(12345)
    }

    fn keys_of<P: DuplicatePolicy>(tree: &RbTree<u64, u64, P>) -> Vec<u64> {
        tree.iter().map(|(k, _)| *k).collect()
    }

    // ========================================================================
    // Basic operations
    // ========================================================================

    #[test]
    fn new_is_empty() {
        let tree = UniqueTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.first(), None);
        assert_eq!(tree.last(), None);
        assert!(tree.cursor_front().is_end());
        tree.check_invariants();
    }

    #[test]
    fn insert_single() {
        let mut tree = UniqueTree::new();
        let (cursor, inserted) = tree.insert(10, 100);
        assert!(inserted);
        assert!(!cursor.is_end());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(cursor), Some((&10, &100)));
        assert_eq!(tree.first(), Some((&10, &100)));
        assert_eq!(tree.last(), Some((&10, &100)));
        tree.check_invariants();
    }

    #[test]
    fn unique_insert_rejects_duplicate() {
        let mut tree = UniqueTree::new();
        let (first, inserted) = tree.insert(10, 100);
        assert!(inserted);
        let (existing, inserted) = tree.insert(10, 999);
        assert!(!inserted);
        assert_eq!(existing, first);
        assert_eq!(tree.len(), 1);
        // The rejected entry did not overwrite.
        assert_eq!(tree.get(existing), Some((&10, &100)));
        tree.check_invariants();
    }

    #[test]
    fn duplicate_insert_appends() {
        let mut tree = MultiTree::new();
        let (_, a) = tree.insert(10, 1);
        let (_, b) = tree.insert(10, 2);
        let (_, c) = tree.insert(10, 3);
        assert!(a && b && c);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.count(&10), 3);
        // Equal keys keep insertion order (new elements land to the right).
        let values: Vec<u64> = tree.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 2, 3]);
        tree.check_invariants();
    }

    #[test]
    fn sorted_iteration() {
        let mut tree = UniqueTree::new();
        for k in [5u64, 3, 8, 1, 4, 7, 9, 2, 6, 0] {
            tree.insert(k, k * 10);
            tree.check_invariants();
        }
        assert_eq!(keys_of(&tree), (0..10).collect::<Vec<_>>());
        let descending: Vec<u64> = tree.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(descending, (0..10).rev().collect::<Vec<_>>());
    }

    #[test]
    fn find_and_contains() {
        let mut tree = UniqueTree::new();
        for k in [20u64, 10, 30] {
            tree.insert(k, 0);
        }
        assert!(!tree.find(&10).is_end());
        assert!(tree.find(&15).is_end());
        assert!(tree.contains(&30));
        assert!(!tree.contains(&31));
    }

    #[test]
    fn bounds() {
        let mut tree = UniqueTree::new();
        for k in [10u64, 20, 30, 40] {
            tree.insert(k, 0);
        }
        assert_eq!(tree.get(tree.lower_bound(&20)).unwrap().0, &20);
        assert_eq!(tree.get(tree.lower_bound(&25)).unwrap().0, &30);
        assert_eq!(tree.get(tree.upper_bound(&20)).unwrap().0, &30);
        assert_eq!(tree.get(tree.upper_bound(&5)).unwrap().0, &10);
        assert!(tree.lower_bound(&41).is_end());
        assert!(tree.upper_bound(&40).is_end());
    }

    #[test]
    fn bounds_on_empty() {
        let tree = UniqueTree::new();
        assert!(tree.lower_bound(&1).is_end());
        assert!(tree.upper_bound(&1).is_end());
    }

    // ========================================================================
    // Cursors
    // ========================================================================

    #[test]
    fn cursor_walk_forward_and_back() {
        let mut tree = UniqueTree::new();
        for k in [2u64, 1, 3] {
            tree.insert(k, 0);
        }
        let mut cursor = tree.cursor_front();
        assert_eq!(tree.get(cursor).unwrap().0, &1);
        cursor = tree.next(cursor);
        assert_eq!(tree.get(cursor).unwrap().0, &2);
        cursor = tree.next(cursor);
        assert_eq!(tree.get(cursor).unwrap().0, &3);
        cursor = tree.next(cursor);
        assert!(cursor.is_end());

        // Decrementing the end cursor yields the maximum.
        cursor = tree.prev(cursor);
        assert_eq!(tree.get(cursor).unwrap().0, &3);
        cursor = tree.prev(cursor);
        cursor = tree.prev(cursor);
        assert_eq!(tree.get(cursor).unwrap().0, &1);
        assert!(tree.prev(cursor).is_end());
    }

    #[test]
    fn foreign_cursor_rejected() {
        let mut a = UniqueTree::new();
        let mut b = UniqueTree::new();
        let (cursor, _) = a.insert(1, 1);
        b.insert(1, 1);

        assert_eq!(b.get(cursor), None);
        assert_eq!(b.remove(cursor), Err(Error::InvalidCursor));
        assert_eq!(b.len(), 1);
        // The rightful owner still accepts it.
        assert_eq!(a.remove(cursor), Ok((1, 1)));
    }

    #[test]
    fn remove_end_cursor_rejected() {
        let mut tree = UniqueTree::new();
        tree.insert(1, 1);
        let end = tree.end();
        assert_eq!(tree.remove(end), Err(Error::InvalidCursor));
        assert_eq!(tree.len(), 1);
        tree.check_invariants();
    }

    #[test]
    fn stale_cursor_rejected() {
        let mut tree = UniqueTree::new();
        let (cursor, _) = tree.insert(1, 1);
        tree.insert(2, 2);
        assert_eq!(tree.remove(cursor), Ok((1, 1)));
        assert_eq!(tree.remove(cursor), Err(Error::InvalidCursor));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn one_child_removal_keeps_survivor_cursor() {
        // Removing a black node with a single red child frees the removed
        // node's own slot. The promoted child's cursor must stay valid and
        // the removed cursor must stay dead.
        let mut tree = UniqueTree::new();
        let (c1, _) = tree.insert(1, 10);
        let (c2, _) = tree.insert(2, 20);
        assert_eq!(tree.remove(c1), Ok((1, 10)));
        assert_eq!(tree.remove(c1), Err(Error::InvalidCursor));
        assert_eq!(tree.get(c2), Some((&2, &20)));
        assert_eq!(tree.len(), 1);
        tree.check_invariants();
        assert_eq!(tree.remove(c2), Ok((2, 20)));
        assert!(tree.is_empty());
    }

    #[test]
    fn unrelated_cursors_survive_mutation() {
        let mut tree = UniqueTree::new();
        let (c5, _) = tree.insert(5, 50);
        for k in 0..20u64 {
            tree.insert(k, k);
        }
        for k in 10..20u64 {
            tree.remove_key(&k);
        }
        // Slot indices are stable: the old cursor still resolves.
        assert_eq!(tree.get(c5), Some((&5, &50)));
    }

    // ========================================================================
    // Remove
    // ========================================================================

    #[test]
    fn remove_leaf_and_internal() {
        let mut tree = UniqueTree::new();
        for k in [50u64, 30, 70, 20, 40, 60, 80] {
            tree.insert(k, k);
        }
        // Leaf.
        assert_eq!(tree.remove(tree.find(&20)), Ok((20, 20)));
        tree.check_invariants();
        // Node with two children.
        assert_eq!(tree.remove(tree.find(&30)), Ok((30, 30)));
        tree.check_invariants();
        // Root.
        assert_eq!(tree.remove(tree.find(&50)), Ok((50, 50)));
        tree.check_invariants();
        assert_eq!(keys_of(&tree), vec![40, 60, 70, 80]);
    }

    #[test]
    fn remove_sole_node_resets_to_empty() {
        let mut tree = UniqueTree::new();
        tree.insert(1, 1);
        assert_eq!(tree.remove(tree.cursor_front()), Ok((1, 1)));
        assert!(tree.is_empty());
        assert!(tree.cursor_front().is_end());
        assert!(tree.cursor_back().is_end());
        tree.check_invariants();
        // Reusable after emptying.
        tree.insert(2, 2);
        assert_eq!(tree.len(), 1);
        tree.check_invariants();
    }

    #[test]
    fn erase_begin_until_empty() {
        let mut tree = UniqueTree::new();
        for k in 0..64u64 {
            tree.insert(k, k);
        }
        let mut expected = 0u64;
        while !tree.is_empty() {
            let (k, _) = tree.remove(tree.cursor_front()).unwrap();
            assert_eq!(k, expected);
            expected += 1;
            tree.check_invariants();
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn remove_updates_extreme_caches() {
        let mut tree = UniqueTree::new();
        for k in [10u64, 5, 15] {
            tree.insert(k, 0);
        }
        tree.remove(tree.find(&5)).unwrap();
        assert_eq!(tree.first().unwrap().0, &10);
        tree.remove(tree.find(&15)).unwrap();
        assert_eq!(tree.last().unwrap().0, &10);
        tree.check_invariants();
    }

    #[test]
    fn pop_first_and_last() {
        let mut tree = UniqueTree::new();
        for k in [2u64, 1, 3] {
            tree.insert(k, k * 10);
        }
        assert_eq!(tree.pop_first(), Some((1, 10)));
        assert_eq!(tree.pop_last(), Some((3, 30)));
        assert_eq!(tree.pop_first(), Some((2, 20)));
        assert_eq!(tree.pop_first(), None);
        assert_eq!(tree.pop_last(), None);
    }

    #[test]
    fn multiset_remove_one_of_run() {
        let mut tree = MultiTree::new();
        for (k, v) in [(1u64, 0u64), (2, 0), (2, 1), (3, 0), (3, 1), (3, 2)] {
            tree.insert(k, v);
        }
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.count(&2), 2);
        assert_eq!(tree.count(&3), 3);

        let removed = tree.remove(tree.find(&3)).unwrap();
        assert_eq!(removed.0, 3);
        assert_eq!(tree.count(&3), 2);
        assert_eq!(tree.count(&2), 2);
        assert_eq!(tree.count(&1), 1);
        tree.check_invariants();
    }

    // ========================================================================
    // Merge
    // ========================================================================

    #[test]
    fn merge_unique_keeps_collisions_in_source() {
        let mut dst = UniqueTree::new();
        let mut src = UniqueTree::new();
        for k in [1u64, 2, 3] {
            dst.insert(k, k);
        }
        for k in [3u64, 4, 5] {
            src.insert(k, k * 100);
        }
        dst.merge(&mut src);

        // Destination size = sum - collisions; source keeps only the collision.
        assert_eq!(dst.len(), 5);
        assert_eq!(src.len(), 1);
        assert_eq!(keys_of(&dst), vec![1, 2, 3, 4, 5]);
        assert_eq!(keys_of(&src), vec![3]);
        // The colliding key kept the destination's value.
        assert_eq!(dst.get(dst.find(&3)), Some((&3, &3)));
        dst.check_invariants();
        src.check_invariants();
    }

    #[test]
    fn merge_duplicates_drains_source() {
        let mut dst = MultiTree::new();
        let mut src = MultiTree::new();
        for k in [1u64, 2, 2] {
            dst.insert(k, 0);
        }
        for k in [2u64, 3] {
            src.insert(k, 1);
        }
        dst.merge(&mut src);
        assert_eq!(dst.len(), 5);
        assert!(src.is_empty());
        assert_eq!(keys_of(&dst), vec![1, 2, 2, 2, 3]);
        assert_eq!(dst.count(&2), 3);
        dst.check_invariants();
        src.check_invariants();
    }

    #[test]
    fn merge_into_empty() {
        let mut dst = UniqueTree::new();
        let mut src = UniqueTree::new();
        for k in 0..10u64 {
            src.insert(k, k);
        }
        dst.merge(&mut src);
        assert_eq!(dst.len(), 10);
        assert!(src.is_empty());
        dst.check_invariants();
    }

    #[test]
    fn merge_drains_one_child_source() {
        // Draining walk over the source caches the successor before each
        // removal; a root whose only child is that successor must not
        // invalidate the cached cursor.
        let mut dst = UniqueTree::new();
        let mut src = UniqueTree::new();
        src.insert(10, 10);
        src.insert(20, 20);
        dst.merge(&mut src);
        assert_eq!(keys_of(&dst), vec![10, 20]);
        assert!(src.is_empty());
        dst.check_invariants();
        src.check_invariants();
    }

    // ========================================================================
    // Clone / move / swap / clear
    // ========================================================================

    #[test]
    fn clone_is_deep_and_identical() {
        let mut tree = UniqueTree::new();
        let mut rng = make_rng();
        for _ in 0..200 {
            tree.insert(rng.random_range(0..1000), rng.random());
        }
        let copy = tree.clone();
        copy.check_invariants();
        assert_eq!(
            tree.iter().collect::<Vec<_>>(),
            copy.iter().collect::<Vec<_>>()
        );

        // Mutating the copy leaves the original untouched.
        let mut copy = copy;
        let n = copy.len();
        copy.pop_first();
        assert_eq!(copy.len(), n - 1);
        assert_eq!(tree.len(), n);
        tree.check_invariants();
    }

    #[test]
    fn take_leaves_valid_empty_tree() {
        let mut tree = UniqueTree::new();
        for k in 0..10u64 {
            tree.insert(k, k);
        }
        let moved = mem::take(&mut tree);
        assert_eq!(moved.len(), 10);
        assert_eq!(tree.len(), 0);
        assert!(tree.cursor_front().is_end());
        tree.check_invariants();
        // The emptied tree is fully usable.
        tree.insert(99, 99);
        assert_eq!(tree.len(), 1);
        tree.check_invariants();
    }

    #[test]
    fn swap_exchanges_contents_and_keeps_cursors() {
        let mut a = UniqueTree::new();
        let mut b = UniqueTree::new();
        let (cursor, _) = a.insert(1, 10);
        b.insert(2, 20);
        b.insert(3, 30);

        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        // The cursor follows its node into the other tree object.
        assert_eq!(b.get(cursor), Some((&1, &10)));
        assert_eq!(a.get(cursor), None);
        a.check_invariants();
        b.check_invariants();
    }

    #[test]
    fn clear_then_reuse() {
        let mut tree = UniqueTree::new();
        for k in 0..100u64 {
            tree.insert(k, k);
        }
        tree.clear();
        assert!(tree.is_empty());
        tree.check_invariants();
        tree.insert(1, 1);
        assert_eq!(tree.len(), 1);
        tree.check_invariants();
    }

    // ========================================================================
    // Iterators
    // ========================================================================

    #[test]
    fn iter_mut_updates_values() {
        let mut tree = UniqueTree::new();
        for k in 0..10u64 {
            tree.insert(k, 0);
        }
        for (k, v) in tree.iter_mut() {
            *v = k * 2;
        }
        for (k, v) in tree.iter() {
            assert_eq!(*v, k * 2);
        }
        tree.check_invariants();
    }

    #[test]
    fn iter_meets_in_middle() {
        let mut tree = UniqueTree::new();
        for k in 0..5u64 {
            tree.insert(k, 0);
        }
        let mut iter = tree.iter();
        assert_eq!(iter.next().unwrap().0, &0);
        assert_eq!(iter.next_back().unwrap().0, &4);
        assert_eq!(iter.next().unwrap().0, &1);
        assert_eq!(iter.next_back().unwrap().0, &3);
        assert_eq!(iter.next().unwrap().0, &2);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn range_window() {
        let mut tree = MultiTree::new();
        for k in [1u64, 2, 2, 3, 4] {
            tree.insert(k, 0);
        }
        let keys: Vec<u64> = tree
            .range(tree.lower_bound(&2), tree.upper_bound(&2))
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(keys, vec![2, 2]);

        // Empty window.
        assert_eq!(
            tree.range(tree.lower_bound(&5), tree.upper_bound(&5)).count(),
            0
        );
    }

    #[test]
    fn range_rejects_foreign_cursors() {
        let mut tree = MultiTree::new();
        for k in [1u64, 2, 3] {
            tree.insert(k, 0);
        }
        let other = MultiTree::new();
        // A cursor from another tree on either end empties the window.
        assert_eq!(tree.range(other.end(), tree.end()).count(), 0);
        assert_eq!(tree.range(tree.cursor_front(), other.end()).count(), 0);
        assert_eq!(tree.range(tree.cursor_front(), tree.end()).count(), 3);
    }

    #[test]
    fn into_iter_drains_in_order() {
        let mut tree = UniqueTree::new();
        for k in [3u64, 1, 2] {
            tree.insert(k, k * 10);
        }
        let pairs: Vec<(u64, u64)> = tree.into_iter().collect();
        assert_eq!(pairs, vec![(1, 10), (2, 20), (3, 30)]);
    }

    #[test]
    fn custom_comparator_orders_descents() {
        let reverse = |a: &u64, b: &u64| b.cmp(a);
        let mut tree: RbTree<u64, (), RejectDuplicates, _> = RbTree::with_comparator(reverse);
        for k in [1u64, 3, 2] {
            tree.insert(k, ());
        }
        let keys: Vec<u64> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![3, 2, 1]);
        assert_eq!(tree.first().unwrap().0, &3);
        tree.check_invariants();
    }

    // ========================================================================
    // Randomized invariant checks
    // ========================================================================

    #[test]
    fn fuzz_unique_insert_remove() {
        let mut tree = UniqueTree::new();
        let mut shadow = std::collections::BTreeMap::new();
        let mut rng = make_rng();

        for _ in 0..2_000 {
            let key = rng.random_range(0..256u64);
            if rng.random_bool(0.6) {
                let value = rng.random();
                // The tree rejects re-inserts without overwriting, so only
                // mirror into the shadow map when the key is new.
                let expected_new = !shadow.contains_key(&key);
                if expected_new {
                    shadow.insert(key, value);
                }
                let (_, inserted) = tree.insert(key, value);
                assert_eq!(inserted, expected_new);
            } else {
                let removed = tree.remove_key(&key).map(|(k, _)| k);
                assert_eq!(removed, shadow.remove(&key).map(|_| key));
            }
            tree.check_invariants();
            assert_eq!(tree.len(), shadow.len());
        }
        assert_eq!(keys_of(&tree), shadow.keys().copied().collect::<Vec<_>>());
    }

    #[test]
    fn fuzz_multiset_insert_remove() {
        let mut tree = MultiTree::new();
        let mut shadow: Vec<u64> = Vec::new();
        let mut rng = make_rng();

        for _ in 0..2_000 {
            let key = rng.random_range(0..64u64);
            if rng.random_bool(0.6) {
                let (_, inserted) = tree.insert(key, 0);
                assert!(inserted);
                shadow.push(key);
                shadow.sort_unstable();
            } else if let Some(pos) = shadow.iter().position(|&k| k == key) {
                shadow.remove(pos);
                assert_eq!(tree.remove(tree.find(&key)).unwrap().0, key);
            } else {
                assert!(tree.find(&key).is_end());
            }
            tree.check_invariants();
            assert_eq!(tree.len(), shadow.len());
        }
        assert_eq!(keys_of(&tree), shadow);
    }

    #[test]
    fn fuzz_sequential_and_reverse_fills() {
        // Degenerate insertion orders stress the rebalancing paths.
        let mut ascending = UniqueTree::new();
        for k in 0..512u64 {
            ascending.insert(k, k);
            ascending.check_invariants();
        }
        let mut descending = UniqueTree::new();
        for k in (0..512u64).rev() {
            descending.insert(k, k);
            descending.check_invariants();
        }
        assert_eq!(keys_of(&ascending), keys_of(&descending));
    }
}

#[cfg(test)]
mod bench_rbtree {
    use super::*;
    use hdrhistogram::Histogram;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[inline]
    fn rdtscp() -> u64 {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            core::arch::x86_64::__rdtscp(&mut 0)
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            std::time::Instant::now().elapsed().as_nanos() as u64
        }
    }

    fn print_histogram(name: &str, hist: &Histogram<u64>) {
        println!(
            "{:24} p50: {:4} cycles | p99: {:4} cycles | p999: {:5} cycles | min: {:4} | max: {:5}",
            name,
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.99),
            hist.value_at_quantile(0.999),
            hist.min(),
            hist.max(),
        );
    }

    type BenchTree = RbTree<u64, u64, RejectDuplicates>;

    const WARMUP: usize = 10_000;
    const ITERATIONS: usize = 100_000;

    fn make_rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    #[test]
    #[ignore]
    fn bench_insert_random() {
        let mut hist = Histogram::<u64>::new(3).unwrap();
        let mut rng = make_rng(99999);

        for _round in 0..10 {
            let mut tree = BenchTree::with_capacity(ITERATIONS / 10 + WARMUP);
            for _ in 0..WARMUP / 10 {
                tree.insert(rng.random(), 0);
            }
            for _ in 0..ITERATIONS / 10 {
                let key = rng.random();
                let start = rdtscp();
                std::hint::black_box(tree.insert(key, 0));
                let elapsed = rdtscp() - start;
                hist.record(elapsed).unwrap();
            }
        }
        print_histogram("insert_random", &hist);
    }

    #[test]
    #[ignore]
    fn bench_find_hit() {
        let mut tree = BenchTree::with_capacity(10_000);
        let mut rng = make_rng(99999);
        let mut hist = Histogram::<u64>::new(3).unwrap();

        for i in 0..10_000u64 {
            tree.insert(i * 2, i);
        }
        let keys: Vec<u64> = (0..ITERATIONS)
            .map(|_| rng.random_range(0..10_000u64) * 2)
            .collect();

        for key in keys.iter().take(WARMUP) {
            std::hint::black_box(tree.find(key));
        }
        for key in &keys {
            let start = rdtscp();
            std::hint::black_box(tree.find(key));
            let elapsed = rdtscp() - start;
            hist.record(elapsed).unwrap();
        }
        print_histogram("find_hit", &hist);
    }

    #[test]
    #[ignore]
    fn bench_pop_first() {
        let mut hist = Histogram::<u64>::new(3).unwrap();

        for round in 0..10 {
            let mut tree = BenchTree::with_capacity(ITERATIONS / 10);
            let mut rng = make_rng(12345 + round);
            for _ in 0..ITERATIONS / 10 {
                tree.insert(rng.random(), 0);
            }
            while !tree.is_empty() {
                let start = rdtscp();
                std::hint::black_box(tree.pop_first());
                let elapsed = rdtscp() - start;
                hist.record(elapsed).unwrap();
            }
        }
        print_histogram("pop_first", &hist);
    }

    #[test]
    #[ignore]
    fn bench_rbtree_all() {
        println!("\n=== RbTree Benchmarks ===");
        println!(
            "Run with: cargo test --release bench_rbtree::bench_rbtree_all -- --ignored --nocapture\n"
        );
        bench_insert_random();
        bench_find_hit();
        bench_pop_first();
    }
}
