//! chain-hashtable: a fixed-capacity, string-keyed hash table with
//! separately-chained buckets and adapter-managed value ownership.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small associative container whose hashing, collision
//!   chaining, and ownership discipline are the deliverable itself, not
//!   delegated to a general-purpose map.
//! - Pieces:
//!   - ChainTable<V, A>: the table. A fixed array of bucket heads, each
//!     heading a singly-linked chain of nodes kept in strictly ascending
//!     key order. Nodes live in a slotmap arena and link by generational
//!     key, so every node has exactly one owner and teardown is a drain.
//!   - ValueAdapter: the value copy/release capability. `set` stores an
//!     owned duplicate produced by the adapter (duplication may fail);
//!     overwrite, removal, and drop route the displaced value back
//!     through the adapter exactly once.
//!   - hash: djb2 over the key bytes, reduced modulo the bucket count.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by design (no atomics).
//! - Capacity is fixed at construction; there is no rehashing or resize.
//!   Bucket chains grow instead, and the sorted order gives ordered-walk
//!   early exit on negative lookups.
//! - Keys are copied on insert (`Box<str>`); caller memory is never
//!   retained or mutated.
//! - Duplicate keys update in place; `len` counts distinct live keys.
//!
//! Failure boundaries
//! - `ValueAdapter::duplicate` is the only fallible step of `set`. It
//!   runs before any structural mutation, so a failed copy leaves the
//!   table exactly as it was: on fresh insert no node is allocated, on
//!   overwrite the old value stays installed (copy-then-swap).
//! - `ValueAdapter::release` must not fail and must not reenter the
//!   table; a debug-only reentrancy guard panics on nested entry.
//!
//! Hashing invariants
//! - djb2 is deterministic and unseeded. Adversarial key sets can
//!   degrade a bucket to one long chain; with a fixed capacity this is
//!   an accepted trade-off.
//!
//! Notes and non-goals
//! - No iteration or enumeration API.
//! - No serialization.
//! - Only string keys; no custom hasher injection.
//! - Callers needing concurrent access must provide external mutual
//!   exclusion; the table itself is not thread-safe.

mod adapter;
mod chain_table;
mod chain_table_proptest;
mod hash;
mod reentrancy;

// Public surface
pub use adapter::{CloneAdapter, CopyError, ValueAdapter};
pub use chain_table::{ChainTable, CreateError};
