//! Configuration options for encoding and decoding.
//!
//! - [`StorageOptions`]: limits and policies shared by both directions
//! - [`DuplicateKeys`]: what the decoder does when a key repeats in a section
//!
//! ## Examples
//!
//! ```rust
//! use portable_storage::{from_slice_with_options, DuplicateKeys, StorageOptions, Value};
//!
//! let options = StorageOptions::new()
//!     .with_max_depth(16)
//!     .with_duplicate_keys(DuplicateKeys::Reject);
//!
//! let bytes = [
//!     0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01, // header
//!     0x08, // two entries
//!     0x01, b'a', 0x08, 0x01, // a = 1
//!     0x01, b'a', 0x08, 0x02, // a = 2
//! ];
//! assert!(from_slice_with_options::<Value>(&bytes, options).is_err());
//! ```

/// Nesting limit applied when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Policy for a key that appears more than once in one decoded section.
///
/// The format itself does not forbid duplicates, so the choice belongs to
/// the reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DuplicateKeys {
    /// The last occurrence replaces earlier ones; the key keeps its first position.
    #[default]
    LastWins,
    /// Later occurrences are decoded and then discarded.
    FirstWins,
    /// A repeated key fails the decode with [`Error::DuplicateKey`](crate::Error::DuplicateKey).
    Reject,
}

/// Configuration options for the portable storage codec.
///
/// # Examples
///
/// ```rust
/// use portable_storage::StorageOptions;
///
/// let options = StorageOptions::new();
/// assert_eq!(options.max_depth, 100);
/// assert!(!options.compact_integers);
/// ```
#[derive(Clone, Debug)]
pub struct StorageOptions {
    /// Deepest nesting of sections and arrays, counting the root section as 1.
    pub max_depth: usize,
    pub duplicate_keys: DuplicateKeys,
    /// Write serde integers with auto-width instead of their declared width.
    pub compact_integers: bool,
    /// Accept bytes after the root section instead of failing.
    pub allow_trailing_bytes: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        StorageOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            duplicate_keys: DuplicateKeys::default(),
            compact_integers: false,
            allow_trailing_bytes: false,
        }
    }
}

impl StorageOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the nesting limit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::StorageOptions;
    ///
    /// let options = StorageOptions::new().with_max_depth(8);
    /// assert_eq!(options.max_depth, 8);
    /// ```
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeys) -> Self {
        self.duplicate_keys = policy;
        self
    }

    /// Makes the serde layer pick the smallest integer width for each value
    /// rather than the width of its Rust type.
    ///
    /// Values beyond the 32-bit auto-width range keep a 64-bit type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::{to_vec_with_options, StorageOptions};
    /// use std::collections::BTreeMap;
    ///
    /// let map = BTreeMap::from([("n", 1u64)]);
    /// let compact = to_vec_with_options(&map, StorageOptions::new().with_compact_integers(true)).unwrap();
    /// let declared = to_vec_with_options(&map, StorageOptions::new()).unwrap();
    /// assert_eq!(declared.len() - compact.len(), 7);
    /// ```
    #[must_use]
    pub fn with_compact_integers(mut self, compact: bool) -> Self {
        self.compact_integers = compact;
        self
    }

    #[must_use]
    pub fn with_trailing_bytes(mut self, allow: bool) -> Self {
        self.allow_trailing_bytes = allow;
        self
    }
}
