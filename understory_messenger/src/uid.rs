// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unique identifiers and their allocators.
//!
//! Every object, sender and notifier in a session is addressed by a [`Uid`].
//! UIDs are handed out by a [`UidAllocator`] (single-threaded) or a
//! [`SharedUidAllocator`] (atomic), both of which start at `1` and only ever
//! increment, so a UID is never reused within a process.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// An opaque, process-unique identifier.
///
/// `Uid(0)` is the [`Uid::INVALID`] sentinel and is never produced by an
/// allocator. It is also the [`Default`] value, which makes it a convenient
/// placeholder for objects whose identity is assigned later.
///
/// ```rust
/// use understory_messenger::{Uid, UidAllocator};
///
/// let mut uids = UidAllocator::new();
/// let a = uids.next();
/// let b = uids.next();
/// assert!(a.is_valid());
/// assert!(a < b);
/// assert!(!Uid::default().is_valid());
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Uid(u64);

impl Uid {
    /// The sentinel for "no identity".
    pub const INVALID: Self = Self(0);

    /// Wraps a raw value.
    ///
    /// This is intended for values that crossed a boundary (settings files,
    /// test fixtures). Fresh identities should come from an allocator.
    #[must_use]
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` unless this is [`Uid::INVALID`].
    #[must_use]
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Uid").field(&self.0).finish()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.0)
    }
}

impl From<Uid> for u64 {
    #[inline]
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

/// Hands out strictly increasing [`Uid`]s for a single-threaded session.
///
/// The allocator is the sole owner of the "next value" counter. It never
/// wraps: exhausting the `u64` space panics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UidAllocator {
    next: u64,
    start: u64,
}

impl Default for UidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl UidAllocator {
    /// Creates an allocator whose first UID is `Uid(1)`.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an allocator whose first UID is `Uid(first)`.
    ///
    /// `first == 0` is clamped to `1` so the sentinel is never produced.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        let first = if first == 0 { 1 } else { first };
        Self {
            next: first,
            start: first,
        }
    }

    /// Returns a fresh UID, strictly greater than every UID returned before.
    ///
    /// # Panics
    ///
    /// Panics if the `u64` space is exhausted.
    #[allow(
        clippy::should_implement_trait,
        reason = "an allocator is not an iterator; it never ends"
    )]
    pub fn next(&mut self) -> Uid {
        let uid = Uid(self.next);
        self.next = self
            .next
            .checked_add(1)
            .unwrap_or_else(|| panic!("UID space exhausted"));
        uid
    }

    /// Returns the UID the next call to [`next`](Self::next) will produce.
    #[must_use]
    #[inline]
    pub const fn peek(&self) -> Uid {
        Uid(self.next)
    }

    /// Returns how many UIDs this allocator has handed out.
    #[must_use]
    #[inline]
    pub const fn allocated(&self) -> u64 {
        self.next - self.start
    }
}

/// An atomic [`UidAllocator`] for sessions that allocate from several threads.
///
/// Numbering follows the same rules: the first UID is `Uid(1)` (or the
/// clamped seed), values strictly increase in allocation order and the
/// sentinel is never produced.
#[derive(Debug)]
pub struct SharedUidAllocator {
    next: AtomicU64,
}

impl Default for SharedUidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedUidAllocator {
    /// Creates an allocator whose first UID is `Uid(1)`.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an allocator whose first UID is `Uid(first)` (`0` is clamped to `1`).
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        let first = if first == 0 { 1 } else { first };
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Returns a fresh UID.
    ///
    /// # Panics
    ///
    /// Panics if the `u64` space is exhausted.
    pub fn next(&self) -> Uid {
        // The counter stays parked at `u64::MAX` once exhausted; it never wraps.
        let raw = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .unwrap_or_else(|_| panic!("UID space exhausted"));
        Uid(raw)
    }

    /// Returns the UID the next call to [`next`](Self::next) would produce.
    #[must_use]
    pub fn peek(&self) -> Uid {
        Uid(self.next.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::vec::Vec;

    #[test]
    fn allocator_starts_at_one_and_increments() {
        let mut uids = UidAllocator::new();
        assert_eq!(uids.peek(), Uid::new(1));
        assert_eq!(uids.next(), Uid::new(1));
        assert_eq!(uids.next(), Uid::new(2));
        assert_eq!(uids.allocated(), 2);
    }

    #[test]
    fn many_allocations_are_distinct_and_valid() {
        let mut uids = UidAllocator::new();
        let all: Vec<Uid> = (0..1000).map(|_| uids.next()).collect();
        assert!(all.iter().all(|u| u.is_valid()));
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn seed_of_zero_never_yields_sentinel() {
        let mut uids = UidAllocator::starting_at(0);
        assert_eq!(uids.next(), Uid::new(1));

        let shared = SharedUidAllocator::starting_at(0);
        assert_eq!(shared.next(), Uid::new(1));
    }

    #[test]
    fn seeded_allocator_counts_from_seed() {
        let mut uids = UidAllocator::starting_at(500);
        uids.next();
        uids.next();
        assert_eq!(uids.peek(), Uid::new(502));
        assert_eq!(uids.allocated(), 2);
    }

    #[test]
    #[should_panic(expected = "UID space exhausted")]
    fn exhaustion_panics_instead_of_wrapping() {
        let mut uids = UidAllocator::starting_at(u64::MAX);
        let _ = uids.next();
    }

    #[test]
    fn shared_allocator_matches_plain_numbering() {
        let shared = SharedUidAllocator::new();
        assert_eq!(shared.next(), Uid::new(1));
        assert_eq!(shared.next(), Uid::new(2));
        assert_eq!(shared.peek(), Uid::new(3));
    }

    #[test]
    fn uid_formatting() {
        assert_eq!(format!("{:?}", Uid::new(7)), "Uid(7)");
        assert_eq!(format!("{}", Uid::new(7)), "Uid(7)");
        assert_eq!(Uid::default(), Uid::INVALID);
    }
}
