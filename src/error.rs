//! Container error types.

/// Error returned by fallible container operations.
///
/// Lookups are never errors: an absent key is a normal result (`None`,
/// `false`, or the end cursor). Errors are reserved for misuse that must be
/// rejected rather than silently absorbed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// `TreeMap::at` was called with a key the map does not contain.
    MissingKey,
    /// A removal was attempted through the end cursor, a cursor stamped by
    /// a different tree, or a cursor whose slot has already been freed.
    InvalidCursor,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::MissingKey => write!(f, "key not found"),
            Error::InvalidCursor => write!(f, "cursor does not reference a live element of this tree"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Error::MissingKey.to_string(), "key not found");
        assert!(Error::InvalidCursor.to_string().contains("cursor"));
    }
}
