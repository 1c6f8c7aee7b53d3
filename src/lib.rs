//! Arena-backed ordered containers: red-black tree map, set, and multiset.
//!
//! One balanced-tree engine serves three container facades. The key insight:
//! separate storage from structure, and make variation points (uniqueness,
//! ordering) injected types instead of separate implementations.
//!
//! # Design Philosophy
//!
//! Traditional tree implementations allocate a node per element and link
//! them with pointers:
//!
//! ```text
//! BTreeMap<K,V>   - allocates on insert, no stable element handles
//! Box-per-node RB - pointer chasing, poor cache locality
//! ```
//!
//! This crate keeps every node in a growable [`Arena`] and links them by
//! index:
//!
//! ```text
//! Arena<RbNode>   - owns nodes, stable indices, free-list reuse
//! RbTree          - coordinates indices, caches min/max
//! Map/Set/Multiset - thin facades composing the engine
//! ```
//!
//! Benefits:
//! - **Stable cursors**: an element's index never moves, so a [`Cursor`]
//!   survives unrelated inserts and erases
//! - **Settled footprint**: freed slots are reused LIFO, so steady-state
//!   churn stops allocating
//! - **Compact links**: a `u32` index is half a pointer; `NIL` is the
//!   integer MAX, not an `Option` discriminant
//! - **One engine**: map, set, and multiset differ only in payload type and
//!   the [`DuplicatePolicy`] type parameter
//!
//! # Quick Start
//!
//! ```
//! use redwood::{TreeMap, TreeMultiset, TreeSet};
//!
//! let mut map = TreeMap::new();
//! map.insert("b", 2);
//! map.insert("a", 1);
//! assert_eq!(map.first(), Some((&"a", &1)));
//!
//! let mut set = TreeSet::new();
//! assert!(set.insert(7));
//! assert!(!set.insert(7));
//!
//! let mut bag = TreeMultiset::new();
//! bag.insert(7);
//! bag.insert(7);
//! assert_eq!(bag.count(&7), 2);
//! ```
//!
//! # Containers
//!
//! | Container | Duplicates | Payload | Insert reports |
//! |-----------|------------|---------|----------------|
//! | [`TreeMap`] | rejected | `V` | `(Cursor, bool)` |
//! | [`TreeSet`] | rejected | none | `bool` |
//! | [`TreeMultiset`] | allowed | none | `Cursor` |
//!
//! All three share the same complexity envelope: O(log n) insert, erase,
//! and lookup; O(1) `first`/`last` via cached extremes; O(1) amortized
//! iterator step.
//!
//! # Custom Ordering
//!
//! Every container takes a [`Compare`] instance; the default
//! [`NaturalOrder`] delegates to `Ord`, and any
//! `Fn(&K, &K) -> Ordering` closure works:
//!
//! ```
//! use redwood::TreeSet;
//!
//! let mut set = TreeSet::with_comparator(|a: &i32, b: &i32| b.cmp(a));
//! set.extend([1, 2, 3]);
//! assert_eq!(set.first(), Some(&3));
//! ```

#![warn(missing_docs)]

pub mod arena;
pub mod compare;
pub mod error;
pub mod index;
pub mod map;
pub mod multiset;
pub mod set;
pub mod tree;

pub use arena::Arena;
pub use compare::{Compare, NaturalOrder};
pub use error::Error;
pub use index::TreeIndex;
pub use map::{Entry, Keys, OccupiedEntry, TreeMap, VacantEntry, Values, ValuesMut};
pub use multiset::{EqualRange, MultisetIntoIter, MultisetIter, TreeMultiset};
pub use set::{SetIntoIter, SetIter, TreeSet};
pub use tree::{
    AllowDuplicates, Cursor, DuplicatePolicy, IntoIter, Iter, IterMut, Range, RbTree,
    RejectDuplicates,
};
