//! Debug-only reentrancy check.
//!
//! Table methods call into adapter code (`duplicate`, `release`) while the
//! chain structure may be transiently inconsistent, so adapter code must
//! not call back into the same table. In debug builds this check panics on
//! nested entry; in release builds it compiles to a zero-cost no-op.
//!
//! The embedded `PhantomData<*mut ()>` also keeps any containing struct
//! `!Send`/`!Sync`, in line with the single-threaded contract.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table reentrancy tracker. Guard public entry-points with
/// `let _g = self.reentrancy.enter();`.
#[derive(Debug)]
pub(crate) struct ReentrancyCheck {
    #[cfg(debug_assertions)]
    entered: Cell<bool>,
    _nosend: PhantomData<*mut ()>,
}

impl ReentrancyCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            entered: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Enter a guarded section. In debug builds, panics if the section is
    /// already entered.
    #[inline]
    pub(crate) fn enter(&self) -> EnterGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.entered.get(),
                "reentrancy detected: adapter code called back into the table"
            );
            self.entered.set(true);
            return EnterGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            EnterGuard { _z: PhantomData }
        }
    }
}

/// RAII guard returned by [`ReentrancyCheck::enter`].
pub(crate) struct EnterGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a ReentrancyCheck,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for EnterGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.entered.get());
            self.owner.entered.set(false);
        }
    }
}
