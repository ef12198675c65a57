//! ChainTable: fixed-capacity buckets over a slotmap arena of chain nodes.

use crate::adapter::{CloneAdapter, CopyError, ValueAdapter};
use crate::hash;
use crate::reentrancy::ReentrancyCheck;
use core::cmp::Ordering;
use core::fmt;
use core::mem;
use slotmap::{DefaultKey, SlotMap};

/// One link in a bucket's chain. Nodes are owned by the arena; `next`
/// links by generational key, so a stale link can never alias a reused
/// slot.
#[derive(Debug)]
struct Node<V> {
    key: Box<str>,
    value: V,
    next: Option<DefaultKey>,
}

/// Construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateError {
    /// The requested bucket count was zero.
    ZeroCapacity,
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateError::ZeroCapacity => f.write_str("table capacity must be at least 1"),
        }
    }
}

impl std::error::Error for CreateError {}

/// A string-keyed hash table with a fixed number of buckets.
///
/// Each bucket heads a singly-linked chain of entries kept in strictly
/// ascending key order, so lookups walk only as far as the key's sort
/// position. Values are owned duplicates produced by the table's
/// [`ValueAdapter`]; displaced values go back through the adapter exactly
/// once, on overwrite, removal, or drop.
///
/// Capacity never changes after construction. There is no rehashing:
/// chains grow under load instead.
pub struct ChainTable<V, A = CloneAdapter<V>>
where
    A: ValueAdapter<Value = V>,
{
    buckets: Box<[Option<DefaultKey>]>,
    nodes: SlotMap<DefaultKey, Node<V>>, // arena storage using generational keys
    len: usize,
    adapter: A,
    reentrancy: ReentrancyCheck,
}

impl<V: Clone> ChainTable<V, CloneAdapter<V>> {
    /// Table over plainly cloneable values.
    pub fn new(capacity: usize) -> Result<Self, CreateError> {
        Self::with_adapter(capacity, CloneAdapter::new())
    }
}

impl<V, A> ChainTable<V, A>
where
    A: ValueAdapter<Value = V>,
{
    /// Table with `capacity` buckets and the given value adapter. The
    /// adapter is part of the table's identity: every duplicate and
    /// release for the table's lifetime goes through it.
    pub fn with_adapter(capacity: usize, adapter: A) -> Result<Self, CreateError> {
        if capacity < 1 {
            return Err(CreateError::ZeroCapacity);
        }
        Ok(Self {
            buckets: vec![None; capacity].into_boxed_slice(),
            nodes: SlotMap::new(),
            len: 0,
            adapter,
            reentrancy: ReentrancyCheck::new(),
        })
    }

    /// Number of buckets, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `key` with an owned duplicate of `value`, or overwrite the
    /// value already stored under `key`.
    ///
    /// Overwrite is copy-then-swap: the new duplicate is produced first,
    /// and only on success is the old value released. On [`CopyError`]
    /// the table is untouched: an existing entry keeps its old value, and
    /// a fresh insert allocates nothing.
    pub fn set(&mut self, key: &str, value: &V) -> Result<(), CopyError> {
        let _g = self.reentrancy.enter();
        let bucket = hash::bucket_index(key, self.buckets.len());

        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            match self.nodes[k].key.as_ref().cmp(key) {
                Ordering::Less => {
                    prev = Some(k);
                    cur = self.nodes[k].next;
                }
                Ordering::Equal => {
                    let fresh = self.adapter.duplicate(value)?;
                    let old = mem::replace(&mut self.nodes[k].value, fresh);
                    self.adapter.release(old);
                    return Ok(());
                }
                // Chain is sorted: `key` belongs right here.
                Ordering::Greater => break,
            }
        }

        // Duplicate before touching the arena, so a failed copy leaves no
        // partially constructed node behind.
        let owned = self.adapter.duplicate(value)?;
        let node = self.nodes.insert(Node {
            key: Box::from(key),
            value: owned,
            next: cur,
        });
        match prev {
            Some(p) => self.nodes[p].next = Some(node),
            None => self.buckets[bucket] = Some(node),
        }
        self.len += 1;
        Ok(())
    }

    /// Borrowed view of the value stored under `key`, if present. The
    /// table keeps ownership; the borrow ends before any mutating call.
    pub fn get(&self, key: &str) -> Option<&V> {
        let _g = self.reentrancy.enter();
        self.locate(key).map(|k| &self.nodes[k].value)
    }

    pub fn contains(&self, key: &str) -> bool {
        let _g = self.reentrancy.enter();
        self.locate(key).is_some()
    }

    /// Remove the entry stored under `key`, releasing its value through
    /// the adapter. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) {
        let _g = self.reentrancy.enter();
        let bucket = hash::bucket_index(key, self.buckets.len());

        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            match self.nodes[k].key.as_ref().cmp(key) {
                Ordering::Less => {
                    prev = Some(k);
                    cur = self.nodes[k].next;
                }
                Ordering::Equal => {
                    // `k` came off a live chain link, so the arena holds it.
                    let Some(node) = self.nodes.remove(k) else {
                        debug_assert!(false, "chain link to vacated slot");
                        return;
                    };
                    // Unlink before releasing user-owned memory.
                    match prev {
                        Some(p) => self.nodes[p].next = node.next,
                        None => self.buckets[bucket] = node.next,
                    }
                    self.len -= 1;
                    self.adapter.release(node.value);
                    return;
                }
                Ordering::Greater => return,
            }
        }
    }

    /// Ordered walk of the key's bucket: stop at the first chain key that
    /// sorts after `key`, since the chain is kept ascending.
    fn locate(&self, key: &str) -> Option<DefaultKey> {
        let mut cur = self.buckets[hash::bucket_index(key, self.buckets.len())];
        while let Some(k) = cur {
            match self.nodes[k].key.as_ref().cmp(key) {
                Ordering::Less => cur = self.nodes[k].next,
                Ordering::Equal => return Some(k),
                Ordering::Greater => return None,
            }
        }
        None
    }
}

impl<V, A> Drop for ChainTable<V, A>
where
    A: ValueAdapter<Value = V>,
{
    fn drop(&mut self) {
        let _g = self.reentrancy.enter();
        // Reset counters and heads before draining, so a bug that observes
        // the table mid-teardown sees it empty rather than dangling.
        self.len = 0;
        self.buckets.fill(None);
        for (_, node) in self.nodes.drain() {
            self.adapter.release(node.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Collect a bucket's chain keys in link order.
    fn chain_keys<V, A: ValueAdapter<Value = V>>(t: &ChainTable<V, A>, bucket: usize) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = t.buckets[bucket];
        while let Some(k) = cur {
            out.push(t.nodes[k].key.to_string());
            cur = t.nodes[k].next;
        }
        out
    }

    /// Invariant: with one bucket, every key shares a chain and the chain
    /// stays strictly ascending whatever the insertion order.
    #[test]
    fn single_bucket_chain_stays_sorted() {
        let mut t: ChainTable<i32> = ChainTable::new(1).unwrap();
        for (i, key) in ["mango", "apple", "zebra", "kiwi", "banana"].iter().enumerate() {
            t.set(key, &(i as i32)).unwrap();
        }
        let keys = chain_keys(&t, 0);
        assert_eq!(keys, ["apple", "banana", "kiwi", "mango", "zebra"]);
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted);
        assert_eq!(t.len(), 5);
    }

    /// Invariant: splicing works at head, middle, and tail of a chain.
    #[test]
    fn splice_at_head_middle_tail() {
        let mut t: ChainTable<i32> = ChainTable::new(1).unwrap();
        t.set("m", &1).unwrap();
        t.set("a", &2).unwrap(); // head
        assert_eq!(chain_keys(&t, 0), ["a", "m"]);
        t.set("z", &3).unwrap(); // tail
        assert_eq!(chain_keys(&t, 0), ["a", "m", "z"]);
        t.set("f", &4).unwrap(); // middle
        assert_eq!(chain_keys(&t, 0), ["a", "f", "m", "z"]);
        assert_eq!(t.len(), 4);
    }

    /// Invariant: removal relinks correctly at every chain position and
    /// `len` tracks the arena's live count.
    #[test]
    fn remove_relinks_head_middle_tail() {
        let mut t: ChainTable<i32> = ChainTable::new(1).unwrap();
        for key in ["a", "f", "m", "z"] {
            t.set(key, &0).unwrap();
        }

        t.remove("f"); // middle
        assert_eq!(chain_keys(&t, 0), ["a", "m", "z"]);
        t.remove("a"); // head
        assert_eq!(chain_keys(&t, 0), ["m", "z"]);
        t.remove("z"); // tail
        assert_eq!(chain_keys(&t, 0), ["m"]);

        assert_eq!(t.len(), 1);
        assert_eq!(t.len(), t.nodes.len());
        assert!(t.contains("m"));
        for gone in ["a", "f", "z"] {
            assert!(!t.contains(gone));
            assert!(t.get(gone).is_none());
        }
    }

    /// Invariant: the ordered walk exits early on negative lookups, so a
    /// probe key sorting before the whole chain is absent without a full
    /// scan (behaviorally: absent keys around, between, and past live
    /// keys all miss).
    #[test]
    fn negative_lookup_at_every_sort_position() {
        let mut t: ChainTable<i32> = ChainTable::new(1).unwrap();
        t.set("bb", &1).unwrap();
        t.set("dd", &2).unwrap();
        t.set("ff", &3).unwrap();
        for miss in ["aa", "cc", "ee", "gg"] {
            assert!(!t.contains(miss));
            assert!(t.get(miss).is_none());
        }
        for hit in ["bb", "dd", "ff"] {
            assert!(t.contains(hit));
        }
    }

    /// Invariant: zero capacity is rejected with no partial table.
    #[test]
    fn zero_capacity_rejected() {
        match ChainTable::<i32>::new(0) {
            Err(CreateError::ZeroCapacity) => {}
            Ok(_) => panic!("expected ZeroCapacity"),
        }
    }

    /// Invariant: overwrite updates in place; `len` and chain shape are
    /// unchanged by the second `set` of the same key.
    #[test]
    fn overwrite_in_place() {
        let mut t: ChainTable<String> = ChainTable::new(4).unwrap();
        t.set("k", &"v1".to_string()).unwrap();
        t.set("k", &"v2".to_string()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("k").map(String::as_str), Some("v2"));
        assert_eq!(t.nodes.len(), 1);
    }

    /// Invariant: the empty key is an ordinary key.
    #[test]
    fn empty_key_is_ordinary() {
        let mut t: ChainTable<i32> = ChainTable::new(3).unwrap();
        t.set("", &7).unwrap();
        assert!(t.contains(""));
        assert_eq!(t.get(""), Some(&7));
        t.remove("");
        assert!(!t.contains(""));
        assert_eq!(t.len(), 0);
    }

    // Adapter that counts duplicates/releases and fails on demand.
    struct CountingAdapter {
        duplicates: Rc<Cell<usize>>,
        releases: Rc<Cell<usize>>,
        fail_next: Rc<Cell<bool>>,
    }

    impl CountingAdapter {
        fn with_counters() -> (Self, Rc<Cell<usize>>, Rc<Cell<usize>>, Rc<Cell<bool>>) {
            let duplicates = Rc::new(Cell::new(0));
            let releases = Rc::new(Cell::new(0));
            let fail_next = Rc::new(Cell::new(false));
            let adapter = CountingAdapter {
                duplicates: duplicates.clone(),
                releases: releases.clone(),
                fail_next: fail_next.clone(),
            };
            (adapter, duplicates, releases, fail_next)
        }
    }

    impl ValueAdapter for CountingAdapter {
        type Value = String;
        fn duplicate(&self, value: &String) -> Result<String, CopyError> {
            if self.fail_next.replace(false) {
                return Err(CopyError);
            }
            self.duplicates.set(self.duplicates.get() + 1);
            Ok(value.clone())
        }
        fn release(&self, value: String) {
            self.releases.set(self.releases.get() + 1);
            drop(value);
        }
    }

    /// Invariant: a failed duplicate on the overwrite path leaves the old
    /// value installed (copy-then-swap), and on the insert path leaves
    /// the table unchanged with nothing to release later.
    #[test]
    fn failed_copy_leaves_table_intact() {
        let (adapter, duplicates, releases, fail_next) = CountingAdapter::with_counters();
        let mut t = ChainTable::with_adapter(2, adapter).unwrap();

        t.set("k", &"old".to_string()).unwrap();

        // Overwrite path: the entry keeps its old value.
        fail_next.set(true);
        match t.set("k", &"new".to_string()) {
            Err(CopyError) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(t.get("k").map(String::as_str), Some("old"));
        assert_eq!(t.len(), 1);
        assert_eq!(releases.get(), 0, "old value must not be released on failure");

        // Insert path: no node allocated, count unchanged.
        fail_next.set(true);
        assert!(t.set("other", &"x".to_string()).is_err());
        assert!(!t.contains("other"));
        assert_eq!(t.len(), 1);
        assert_eq!(t.nodes.len(), 1);

        drop(t);
        assert_eq!(duplicates.get(), 1);
        assert_eq!(releases.get(), 1, "drop releases each live value exactly once");
    }

    /// Invariant: every displaced value is released exactly once across
    /// overwrite, removal, and drop; duplicates minus releases equals the
    /// live entry count at all times.
    #[test]
    fn release_accounting_across_lifecycle() {
        let (adapter, duplicates, releases, _fail) = CountingAdapter::with_counters();
        let mut t = ChainTable::with_adapter(2, adapter).unwrap();

        t.set("a", &"1".to_string()).unwrap();
        t.set("b", &"2".to_string()).unwrap();
        t.set("a", &"3".to_string()).unwrap(); // overwrite releases one
        assert_eq!(duplicates.get(), 3);
        assert_eq!(releases.get(), 1);
        assert_eq!(duplicates.get() - releases.get(), t.len());

        t.remove("b");
        assert_eq!(releases.get(), 2);
        assert_eq!(duplicates.get() - releases.get(), t.len());

        t.remove("missing"); // no-op, no release
        assert_eq!(releases.get(), 2);

        drop(t);
        assert_eq!(duplicates.get(), 3);
        assert_eq!(releases.get(), 3);
    }

    /// Invariant: every chain link resolves to a live arena slot after a
    /// churn of inserts, overwrites, and removals, and the links account
    /// for exactly `len` nodes. A link to a vacated slot would panic the
    /// walk here.
    #[test]
    fn chain_links_stay_live_after_churn() {
        let mut t: ChainTable<i32> = ChainTable::new(3).unwrap();
        for round in 0..4 {
            for (i, k) in ["a", "bb", "ccc", "dddd", "e", "ff"].iter().enumerate() {
                t.set(k, &(round * 10 + i as i32)).unwrap();
            }
            t.remove("ccc");
            t.remove("a");
            t.remove("absent");
        }

        let mut reachable = 0;
        for bucket in 0..t.capacity() {
            let mut cur = t.buckets[bucket];
            while let Some(k) = cur {
                let node = t.nodes.get(k).expect("chain link must resolve");
                reachable += 1;
                cur = node.next;
            }
        }
        assert_eq!(reachable, t.len());
        assert_eq!(t.nodes.len(), t.len());
    }
}
