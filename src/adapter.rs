//! ValueAdapter: the value copy/release capability a table is built with.
//!
//! The table never stores caller memory. `set` asks the adapter for an
//! owned duplicate, and every displaced value (overwrite, removal, table
//! drop) goes back through the adapter exactly once. Expressing the pair
//! as one trait makes "can copy" and "can release" a single compile-time
//! contract instead of two function pointers that could disagree.

use core::fmt;
use core::marker::PhantomData;

/// Duplication failure reported by [`ValueAdapter::duplicate`].
///
/// Recoverable: the operation that requested the copy fails without
/// mutating the table, and the caller may retry or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyError;

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("value duplication failed")
    }
}

impl std::error::Error for CopyError {}

/// Copy/release contract for values stored in a [`ChainTable`].
///
/// [`ChainTable`]: crate::ChainTable
pub trait ValueAdapter {
    type Value;

    /// Produce an owned duplicate of `value`, or fail with [`CopyError`].
    ///
    /// Must not partially mutate shared state on failure, and must not
    /// reenter the table that invoked it.
    fn duplicate(&self, value: &Self::Value) -> Result<Self::Value, CopyError>;

    /// Release an owned value. Must not fail; invoked exactly once per
    /// distinct owned value when that value is replaced, removed, or the
    /// table is dropped. Must not reenter the table that invoked it.
    fn release(&self, value: Self::Value);
}

/// Adapter for plainly cloneable values: duplication is `Clone` (never
/// fails), release is `Drop`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloneAdapter<V> {
    _pd: PhantomData<fn() -> V>,
}

impl<V> CloneAdapter<V> {
    pub fn new() -> Self {
        Self { _pd: PhantomData }
    }
}

impl<V: Clone> ValueAdapter for CloneAdapter<V> {
    type Value = V;

    fn duplicate(&self, value: &V) -> Result<V, CopyError> {
        Ok(value.clone())
    }

    fn release(&self, value: V) {
        drop(value);
    }
}
