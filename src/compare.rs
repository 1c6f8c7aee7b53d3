//! Injected ordering relation.
//!
//! The tree engine never calls `Ord` directly; every descent goes through a
//! [`Compare`] instance carried by the tree. The default, [`NaturalOrder`],
//! delegates to `Ord`, and any `Fn(&K, &K) -> Ordering` closure works for
//! keys without a natural order (or with a non-natural one).

use core::cmp::Ordering;

/// An ordering relation over keys of type `K`.
///
/// Implementations must be total and consistent: for the lifetime of a tree,
/// comparing the same two keys must always yield the same result.
///
/// # Example
///
/// ```
/// use redwood::TreeSet;
///
/// // Reverse ordering via a closure comparator.
/// let mut set = TreeSet::with_comparator(|a: &u32, b: &u32| b.cmp(a));
/// set.insert(1);
/// set.insert(3);
/// set.insert(2);
///
/// let descending: Vec<_> = set.iter().copied().collect();
/// assert_eq!(descending, vec![3, 2, 1]);
/// ```
pub trait Compare<K> {
    /// Compares two keys.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// The natural `Ord`-based ordering. Default comparator for all containers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord> Compare<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K, F> Compare<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order() {
        assert_eq!(NaturalOrder.compare(&1, &2), Ordering::Less);
        assert_eq!(NaturalOrder.compare(&2, &2), Ordering::Equal);
        assert_eq!(NaturalOrder.compare(&3, &2), Ordering::Greater);
    }

    #[test]
    fn closure_comparator() {
        let reverse = |a: &u32, b: &u32| b.cmp(a);
        assert_eq!(reverse.compare(&1, &2), Ordering::Greater);
        assert_eq!(reverse.compare(&2, &1), Ordering::Less);
    }
}
