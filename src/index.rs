//! Sentinel-index trait for tree links.
//!
//! Tree nodes reference each other by index into an [`Arena`](crate::Arena)
//! rather than by pointer. A reserved sentinel value (`NIL`, the integer MAX)
//! stands in for "no child" and doubles as the universal end-of-sequence
//! marker, so links cost a bare integer instead of an `Option<Idx>`.

/// A copyable index type with a reserved `NIL` sentinel.
///
/// Implemented for the unsigned integer types. Smaller index types shrink
/// node size (three links per node) at the cost of addressable capacity:
/// `u16` tops out at 65_535 nodes, `u32` at ~4 billion.
///
/// # Example
///
/// ```
/// use redwood::TreeIndex;
///
/// let idx: u32 = 5;
/// assert!(!idx.is_nil());
/// assert!(u32::NIL.is_nil());
/// ```
pub trait TreeIndex: Copy + Eq + core::fmt::Debug {
    /// Sentinel value representing "no node" / the end marker.
    ///
    /// For integer types this is `MAX`, which is therefore never a valid
    /// slot index.
    const NIL: Self;

    /// Creates an index from a `usize` slot position.
    fn from_usize(val: usize) -> Self;

    /// Returns the index as a `usize` slot position.
    fn as_usize(self) -> usize;

    /// Returns `true` if this is the sentinel value.
    #[inline]
    fn is_nil(self) -> bool {
        self == Self::NIL
    }
}

macro_rules! impl_tree_index {
    ($($ty:ty),*) => {
        $(
            impl TreeIndex for $ty {
                const NIL: Self = <$ty>::MAX;

                #[inline]
                fn from_usize(val: usize) -> Self {
                    debug_assert!(val < <$ty>::MAX as usize);
                    val as $ty
                }

                #[inline]
                fn as_usize(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

impl_tree_index!(u16, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_max() {
        assert_eq!(u16::NIL, u16::MAX);
        assert_eq!(u32::NIL, u32::MAX);
        assert_eq!(u64::NIL, u64::MAX);
        assert_eq!(usize::NIL, usize::MAX);
    }

    #[test]
    fn roundtrip() {
        for i in [0usize, 1, 7, 1000, u16::MAX as usize - 1] {
            let idx = u32::from_usize(i);
            assert_eq!(idx.as_usize(), i);
            assert!(!idx.is_nil());
        }
    }
}
