// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dispatch engine: three subscription indexes and a fail-fast fan-out.
//!
//! ## Storage
//!
//! Notifiers live in an arena owned by the [`Messenger`], keyed by their
//! [`Uid`]. The three indexes (by sender, by event kind, catch-all) store
//! only UIDs, so removing a notifier can never leave a dangling reference
//! behind: a stale UID in an index resolves to "absent" and is skipped.
//!
//! ## Dispatch order
//!
//! [`Messenger::publish`] visits, in this order:
//!
//! 1. the bucket of the sender UID,
//! 2. the bucket of the exact event kind,
//! 3. the catch-all bucket.
//!
//! Within a bucket, notifiers run in registration order. A notifier
//! subscribed to several matching buckets (or several times to one bucket)
//! runs once per subscription. Disabled notifiers are skipped but keep their
//! subscriptions. The first failing notifier aborts the dispatch.
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_messenger::{Event, EventKind, Messenger, NotifyError};
//!
//! let log: Rc<RefCell<Vec<&str>>> = Rc::default();
//! let mut bus = Messenger::new();
//! let button = bus.next_uid();
//!
//! let a = Rc::clone(&log);
//! bus.subscribe_sender(button, move |_: &Messenger, _: &Event| -> Result<(), NotifyError> {
//!     a.borrow_mut().push("sender");
//!     Ok(())
//! });
//! let b = Rc::clone(&log);
//! bus.subscribe_event_kind(EventKind::CLICKED, move |_: &Messenger, _: &Event| -> Result<(), NotifyError> {
//!     b.borrow_mut().push("kind");
//!     Ok(())
//! });
//! let c = Rc::clone(&log);
//! bus.subscribe_catch_all(move |_: &Messenger, _: &Event| -> Result<(), NotifyError> {
//!     c.borrow_mut().push("all");
//!     Ok(())
//! });
//!
//! bus.publish(button, EventKind::CLICKED, 0, 0).unwrap();
//! assert_eq!(*log.borrow(), ["sender", "kind", "all"]);
//! ```

use alloc::boxed::Box;
use core::cell::Cell;
use core::fmt;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::{Bucket, DispatchError, MessengerError, NotifyError};
use crate::event::{Event, EventKind};
use crate::notifier::Notifier;
use crate::uid::{Uid, UidAllocator};

/// Subscriptions of one bucket, in registration order. Duplicates are kept.
type Subscribers = SmallVec<[Uid; 4]>;

struct Slot {
    notifier: Box<dyn Notifier>,
    enabled: bool,
}

/// A UID-addressed publish/subscribe bus.
///
/// The messenger is single-threaded: registration takes `&mut self`, while
/// [`publish`](Self::publish) takes `&self` so notifiers can publish
/// follow-up events re-entrantly. Cycles between notifiers are not detected
/// unless a nesting limit is set with [`set_max_depth`](Self::set_max_depth).
///
/// The messenger also owns the session's [`UidAllocator`]; use
/// [`next_uid`](Self::next_uid) for objects that share the UID space with
/// notifiers.
pub struct Messenger {
    uids: UidAllocator,
    enabled: bool,
    max_depth: Option<usize>,
    depth: Cell<usize>,
    notifiers: HashMap<Uid, Slot>,
    /// UIDs ahead of the allocator that are held outside the arena.
    reserved: HashSet<Uid>,
    by_sender: HashMap<Uid, Subscribers>,
    by_kind: HashMap<EventKind, Subscribers>,
    catch_all: Subscribers,
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("next_uid", &self.uids.peek())
            .field("enabled", &self.enabled)
            .field("max_depth", &self.max_depth)
            .field("notifiers", &self.notifiers.len())
            .field("reserved", &self.reserved.len())
            .field("senders", &self.by_sender.len())
            .field("kinds", &self.by_kind.len())
            .field("catch_all", &self.catch_all.len())
            .finish_non_exhaustive()
    }
}

impl Default for Messenger {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the nesting counter when a publish frame unwinds or returns.
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl Messenger {
    /// Creates an enabled messenger with a fresh [`UidAllocator`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_allocator(UidAllocator::new())
    }

    /// Creates an enabled messenger that allocates from `uids`.
    #[must_use]
    pub fn with_allocator(uids: UidAllocator) -> Self {
        Self {
            uids,
            enabled: true,
            max_depth: None,
            depth: Cell::new(0),
            notifiers: HashMap::new(),
            reserved: HashSet::new(),
            by_sender: HashMap::new(),
            by_kind: HashMap::new(),
            catch_all: Subscribers::new(),
        }
    }

    /// Allocates a fresh UID from the session allocator.
    ///
    /// UIDs held by stored notifiers or passed to
    /// [`reserve_uid`](Self::reserve_uid) are skipped.
    pub fn next_uid(&mut self) -> Uid {
        self.fresh_uid()
    }

    /// Marks `uid` as taken by something outside the notifier arena, such as
    /// an object adopted with a pre-assigned UID.
    ///
    /// Later allocations skip it. Returns `false` for [`Uid::INVALID`] and for
    /// UIDs the allocator has already passed, which need no reservation.
    pub fn reserve_uid(&mut self, uid: Uid) -> bool {
        if !uid.is_valid() || uid < self.uids.peek() {
            return false;
        }
        self.reserved.insert(uid)
    }

    /// Whether `uid` is reserved and not yet passed by the allocator.
    #[must_use]
    pub fn is_reserved(&self, uid: Uid) -> bool {
        self.reserved.contains(&uid)
    }

    /// Returns the session allocator.
    #[must_use]
    pub fn uids(&self) -> &UidAllocator {
        &self.uids
    }

    /// Turns dispatch on or off. A disabled messenger drops every publish.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether [`publish`](Self::publish) dispatches at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Limits how deeply [`publish`](Self::publish) may nest through
    /// re-entrant notifiers.
    ///
    /// With `Some(n)`, a publish that would be the `n + 1`-th nested frame
    /// fails with [`NotifyError::DepthExceeded`]. `None` (the default)
    /// imposes no limit.
    pub fn set_max_depth(&mut self, max_depth: Option<usize>) {
        self.max_depth = max_depth;
    }

    /// The configured nesting limit.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Number of [`publish`](Self::publish) frames currently running.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Stores a notifier under a freshly allocated UID and returns it.
    ///
    /// The notifier starts enabled and unsubscribed.
    pub fn add_notifier<N: Notifier + 'static>(&mut self, notifier: N) -> Uid {
        let uid = self.fresh_uid();
        self.insert_slot(uid, Box::new(notifier));
        uid
    }

    /// Stores a notifier under a UID the caller already owns, such as the UID
    /// of the object the notifier forwards to.
    ///
    /// Fails with [`MessengerError::InvalidNotifier`] for [`Uid::INVALID`] and
    /// with [`MessengerError::DuplicateNotifier`] if the UID is taken.
    pub fn add_notifier_with_uid<N: Notifier + 'static>(
        &mut self,
        uid: Uid,
        notifier: N,
    ) -> Result<Uid, MessengerError> {
        if !uid.is_valid() {
            return Err(MessengerError::InvalidNotifier(uid));
        }
        if self.notifiers.contains_key(&uid) {
            return Err(MessengerError::DuplicateNotifier(uid));
        }
        self.insert_slot(uid, Box::new(notifier));
        Ok(uid)
    }

    /// Removes a notifier from the arena and from every index.
    ///
    /// Returns `None` if no notifier was stored under `uid`.
    pub fn remove_notifier(&mut self, uid: Uid) -> Option<Box<dyn Notifier>> {
        let slot = self.notifiers.remove(&uid)?;
        self.by_sender.retain(|_, subs| {
            subs.retain(|s| *s != uid);
            !subs.is_empty()
        });
        self.by_kind.retain(|_, subs| {
            subs.retain(|s| *s != uid);
            !subs.is_empty()
        });
        self.catch_all.retain(|s| *s != uid);
        debug!(notifier = %uid, "removed notifier");
        Some(slot.notifier)
    }

    /// Returns `true` if a notifier is stored under `uid`.
    #[must_use]
    pub fn contains_notifier(&self, uid: Uid) -> bool {
        self.notifiers.contains_key(&uid)
    }

    /// Returns the notifier stored under `uid`.
    #[must_use]
    pub fn notifier(&self, uid: Uid) -> Option<&dyn Notifier> {
        self.notifiers.get(&uid).map(|slot| &*slot.notifier)
    }

    /// Number of notifiers in the arena.
    #[must_use]
    pub fn notifier_count(&self) -> usize {
        self.notifiers.len()
    }

    /// Enables or mutes a notifier without touching its subscriptions.
    pub fn set_notifier_enabled(&mut self, uid: Uid, enabled: bool) -> Result<(), MessengerError> {
        let slot = self
            .notifiers
            .get_mut(&uid)
            .ok_or(MessengerError::InvalidNotifier(uid))?;
        slot.enabled = enabled;
        Ok(())
    }

    /// Whether the notifier under `uid` is invoked, or `None` if there is none.
    #[must_use]
    pub fn is_notifier_enabled(&self, uid: Uid) -> Option<bool> {
        self.notifiers.get(&uid).map(|slot| slot.enabled)
    }

    /// Subscribes a stored notifier to events raised by `sender`.
    ///
    /// Returns the notifier's UID. Subscribing twice yields two invocations
    /// per matching event.
    pub fn register_sender_subscriber(
        &mut self,
        sender: Uid,
        notifier: Uid,
    ) -> Result<Uid, MessengerError> {
        self.check_notifier(notifier)?;
        self.push_sender(sender, notifier);
        Ok(notifier)
    }

    /// Subscribes a stored notifier to events of exactly `kind`.
    pub fn register_event_kind_subscriber(
        &mut self,
        kind: EventKind,
        notifier: Uid,
    ) -> Result<Uid, MessengerError> {
        self.check_notifier(notifier)?;
        self.push_kind(kind, notifier);
        Ok(notifier)
    }

    /// Subscribes a stored notifier to every event.
    pub fn register_catch_all_subscriber(&mut self, notifier: Uid) -> Result<Uid, MessengerError> {
        self.check_notifier(notifier)?;
        self.push_catch_all(notifier);
        Ok(notifier)
    }

    /// Stores `notifier` and subscribes it to `sender` in one step.
    pub fn subscribe_sender<N: Notifier + 'static>(&mut self, sender: Uid, notifier: N) -> Uid {
        let uid = self.add_notifier(notifier);
        self.push_sender(sender, uid);
        uid
    }

    /// Stores `notifier` and subscribes it to `kind` in one step.
    pub fn subscribe_event_kind<N: Notifier + 'static>(
        &mut self,
        kind: EventKind,
        notifier: N,
    ) -> Uid {
        let uid = self.add_notifier(notifier);
        self.push_kind(kind, uid);
        uid
    }

    /// Stores `notifier` and subscribes it to every event in one step.
    pub fn subscribe_catch_all<N: Notifier + 'static>(&mut self, notifier: N) -> Uid {
        let uid = self.add_notifier(notifier);
        self.push_catch_all(uid);
        uid
    }

    /// Removes every subscription of `notifier` to `sender`.
    ///
    /// The notifier itself stays stored. Fails with
    /// [`MessengerError::NotSubscribed`] if there was none.
    pub fn unregister_sender_subscriber(
        &mut self,
        sender: Uid,
        notifier: Uid,
    ) -> Result<(), MessengerError> {
        let removed = self
            .by_sender
            .get_mut(&sender)
            .is_some_and(|subs| remove_all(subs, notifier));
        if !removed {
            return Err(MessengerError::NotSubscribed {
                notifier,
                bucket: Bucket::Sender(sender),
            });
        }
        if self.by_sender.get(&sender).is_some_and(|s| s.is_empty()) {
            self.by_sender.remove(&sender);
        }
        debug!(notifier = %notifier, sender = %sender, "unregistered sender subscriber");
        Ok(())
    }

    /// Removes every subscription of `notifier` to `kind`.
    pub fn unregister_event_kind_subscriber(
        &mut self,
        kind: EventKind,
        notifier: Uid,
    ) -> Result<(), MessengerError> {
        let removed = self
            .by_kind
            .get_mut(&kind)
            .is_some_and(|subs| remove_all(subs, notifier));
        if !removed {
            return Err(MessengerError::NotSubscribed {
                notifier,
                bucket: Bucket::EventKind(kind),
            });
        }
        if self.by_kind.get(&kind).is_some_and(|s| s.is_empty()) {
            self.by_kind.remove(&kind);
        }
        debug!(notifier = %notifier, kind = ?kind, "unregistered event kind subscriber");
        Ok(())
    }

    /// Removes every catch-all subscription of `notifier`.
    pub fn unregister_catch_all_subscriber(&mut self, notifier: Uid) -> Result<(), MessengerError> {
        if !remove_all(&mut self.catch_all, notifier) {
            return Err(MessengerError::NotSubscribed {
                notifier,
                bucket: Bucket::CatchAll,
            });
        }
        debug!(notifier = %notifier, "unregistered catch-all subscriber");
        Ok(())
    }

    /// Drops the whole bucket of `sender`, returning how many subscriptions
    /// it held. Used when the sender itself goes away.
    ///
    /// The subscribed notifiers stay stored; callers that own them remove
    /// them with [`remove_notifier`](Self::remove_notifier).
    pub fn forget_sender(&mut self, sender: Uid) -> usize {
        self.by_sender
            .remove(&sender)
            .map_or(0, |subs| subs.len())
    }

    /// The notifiers subscribed to `sender`, in registration order.
    #[must_use]
    pub fn subscribers_for_sender(&self, sender: Uid) -> &[Uid] {
        self.by_sender.get(&sender).map_or(&[][..], |subs| subs.as_slice())
    }

    /// Whether `notifier` appears in any of the three indexes.
    #[must_use]
    pub fn is_subscribed(&self, notifier: Uid) -> bool {
        self.catch_all.contains(&notifier)
            || self.by_sender.values().any(|subs| subs.contains(&notifier))
            || self.by_kind.values().any(|subs| subs.contains(&notifier))
    }

    /// Number of subscriptions to `sender` (duplicates included).
    #[must_use]
    pub fn subscriber_count_for_sender(&self, sender: Uid) -> usize {
        self.by_sender.get(&sender).map_or(0, |subs| subs.len())
    }

    /// Number of subscriptions to `kind` (duplicates included).
    #[must_use]
    pub fn subscriber_count_for_event_kind(&self, kind: EventKind) -> usize {
        self.by_kind.get(&kind).map_or(0, |subs| subs.len())
    }

    /// Number of catch-all subscriptions (duplicates included).
    #[must_use]
    pub fn catch_all_count(&self) -> usize {
        self.catch_all.len()
    }

    /// Clears all three indexes.
    ///
    /// Stored notifiers and the UID allocator are left untouched, so
    /// notifiers can be subscribed again without being re-added.
    pub fn reset(&mut self) {
        self.by_sender.clear();
        self.by_kind.clear();
        self.catch_all.clear();
        debug!("messenger reset");
    }

    /// Routes one event to every matching, enabled subscription.
    ///
    /// Does nothing if the messenger is disabled. Otherwise visits the sender
    /// bucket, then the kind bucket, then the catch-all bucket, each in
    /// registration order, and stops at the first notifier that fails.
    ///
    /// A notifier may call `publish` again; that nested dispatch runs to
    /// completion before the outer one continues. If a nesting limit is set
    /// and would be exceeded, the nested call fails with a [`DispatchError`]
    /// whose `notifier` is [`Uid::INVALID`] and whose source is
    /// [`NotifyError::DepthExceeded`].
    pub fn publish(
        &self,
        sender: Uid,
        kind: EventKind,
        info1: i32,
        info2: i32,
    ) -> Result<(), DispatchError> {
        if !self.enabled {
            trace!(sender = %sender, kind = ?kind, "messenger disabled; event dropped");
            return Ok(());
        }
        let event = Event::new(sender, kind, info1, info2);
        let _guard = self.enter(&event)?;
        trace!(sender = %sender, kind = ?kind, info1, info2, depth = self.depth.get(), "publish");

        if let Some(subs) = self.by_sender.get(&sender) {
            self.dispatch(subs, &event)?;
        }
        if let Some(subs) = self.by_kind.get(&kind) {
            self.dispatch(subs, &event)?;
        }
        self.dispatch(&self.catch_all, &event)
    }

    fn enter(&self, event: &Event) -> Result<DepthGuard<'_>, DispatchError> {
        let depth = self.depth.get();
        if let Some(limit) = self.max_depth
            && depth >= limit
        {
            return Err(DispatchError {
                notifier: Uid::INVALID,
                sender: event.sender,
                kind: event.kind,
                source: NotifyError::DepthExceeded { limit },
            });
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard(&self.depth))
    }

    fn dispatch(&self, subs: &[Uid], event: &Event) -> Result<(), DispatchError> {
        for &uid in subs {
            let Some(slot) = self.notifiers.get(&uid) else {
                trace!(notifier = %uid, "skipping stale subscription");
                continue;
            };
            if !slot.enabled {
                continue;
            }
            slot.notifier
                .notify(self, event)
                .map_err(|source| DispatchError {
                    notifier: uid,
                    sender: event.sender,
                    kind: event.kind,
                    source,
                })?;
        }
        Ok(())
    }

    fn fresh_uid(&mut self) -> Uid {
        // Caller-supplied UIDs may sit ahead of the allocator.
        loop {
            let uid = self.uids.next();
            // Once passed, a reservation can never be hit again.
            let reserved = self.reserved.remove(&uid);
            if !reserved && !self.notifiers.contains_key(&uid) {
                return uid;
            }
        }
    }

    fn insert_slot(&mut self, uid: Uid, notifier: Box<dyn Notifier>) {
        self.notifiers.insert(
            uid,
            Slot {
                notifier,
                enabled: true,
            },
        );
        debug!(notifier = %uid, "added notifier");
    }

    fn check_notifier(&self, notifier: Uid) -> Result<(), MessengerError> {
        if notifier.is_valid() && self.notifiers.contains_key(&notifier) {
            Ok(())
        } else {
            Err(MessengerError::InvalidNotifier(notifier))
        }
    }

    fn push_sender(&mut self, sender: Uid, notifier: Uid) {
        self.by_sender.entry(sender).or_default().push(notifier);
        debug!(notifier = %notifier, sender = %sender, "registered sender subscriber");
    }

    fn push_kind(&mut self, kind: EventKind, notifier: Uid) {
        self.by_kind.entry(kind).or_default().push(notifier);
        debug!(notifier = %notifier, kind = ?kind, "registered event kind subscriber");
    }

    fn push_catch_all(&mut self, notifier: Uid) {
        self.catch_all.push(notifier);
        debug!(notifier = %notifier, "registered catch-all subscriber");
    }
}

/// Removes every occurrence of `uid`, returning whether any was present.
fn remove_all(subs: &mut Subscribers, uid: Uid) -> bool {
    let before = subs.len();
    subs.retain(|s| *s != uid);
    subs.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<(&'static str, Event)>>>;

    fn recorder(log: &Log, tag: &'static str) -> impl Notifier + 'static {
        let log = Rc::clone(log);
        move |_: &Messenger, ev: &Event| -> Result<(), NotifyError> {
            log.borrow_mut().push((tag, *ev));
            Ok(())
        }
    }

    fn tags(log: &Log) -> Vec<&'static str> {
        log.borrow().iter().map(|(t, _)| *t).collect()
    }

    #[test]
    fn sender_then_kind_then_catch_all() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let sender = Uid::new(10);

        bus.subscribe_catch_all(recorder(&log, "all"));
        bus.subscribe_event_kind(EventKind::CLICKED, recorder(&log, "kind"));
        bus.subscribe_sender(sender, recorder(&log, "sender"));

        bus.publish(sender, EventKind::CLICKED, 1, 2).unwrap();
        assert_eq!(tags(&log), ["sender", "kind", "all"]);
        assert!(
            log.borrow()
                .iter()
                .all(|(_, ev)| *ev == Event::new(sender, EventKind::CLICKED, 1, 2))
        );
    }

    #[test]
    fn non_matching_buckets_are_not_visited() {
        let log = Log::default();
        let mut bus = Messenger::new();
        bus.subscribe_sender(Uid::new(1), recorder(&log, "one"));
        bus.subscribe_event_kind(EventKind::CHANGED, recorder(&log, "changed"));

        bus.publish(Uid::new(2), EventKind::CLICKED, 0, 0).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn kind_routing_is_exact() {
        let log = Log::default();
        let mut bus = Messenger::new();
        bus.subscribe_event_kind(EventKind::CLICKED, recorder(&log, "clicked"));

        bus.publish(Uid::new(1), EventKind::CLICKED | EventKind::CHANGED, 0, 0)
            .unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn duplicates_are_invoked_per_subscription() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let sender = Uid::new(3);
        let n = bus.subscribe_sender(sender, recorder(&log, "n"));
        bus.register_sender_subscriber(sender, n).unwrap();
        bus.register_event_kind_subscriber(EventKind::CLOSING, n)
            .unwrap();
        bus.register_catch_all_subscriber(n).unwrap();

        bus.publish(sender, EventKind::CLOSING, 0, 0).unwrap();
        assert_eq!(tags(&log), ["n", "n", "n", "n"]);
        assert_eq!(bus.subscriber_count_for_sender(sender), 2);
    }

    #[test]
    fn disabled_notifier_is_skipped_but_kept() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let sender = Uid::new(5);
        let n = bus.subscribe_sender(sender, recorder(&log, "n"));

        bus.set_notifier_enabled(n, false).unwrap();
        bus.publish(sender, EventKind::CLICKED, 0, 0).unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(bus.subscriber_count_for_sender(sender), 1);
        assert_eq!(bus.is_notifier_enabled(n), Some(false));

        bus.set_notifier_enabled(n, true).unwrap();
        bus.publish(sender, EventKind::CLICKED, 0, 0).unwrap();
        assert_eq!(tags(&log), ["n"]);
    }

    #[test]
    fn disabled_messenger_drops_events() {
        let log = Log::default();
        let mut bus = Messenger::new();
        bus.subscribe_catch_all(recorder(&log, "all"));
        bus.set_enabled(false);
        bus.publish(Uid::new(1), EventKind::SHOWN, 0, 0).unwrap();
        assert!(log.borrow().is_empty());
        assert!(!bus.is_enabled());
    }

    #[test]
    fn first_failure_stops_the_fan_out() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let sender = Uid::new(7);
        bus.subscribe_sender(sender, recorder(&log, "before"));
        let failing = bus.subscribe_sender(
            sender,
            |_: &Messenger, _: &Event| -> Result<(), NotifyError> {
                Err(NotifyError::rejected("nope"))
            },
        );
        bus.subscribe_sender(sender, recorder(&log, "after"));
        bus.subscribe_catch_all(recorder(&log, "all"));

        let err = bus.publish(sender, EventKind::CLICKED, 0, 0).unwrap_err();
        assert_eq!(err.notifier, failing);
        assert_eq!(err.sender, sender);
        assert_eq!(err.kind(), ErrorKind::PropagatedFailure);
        assert_eq!(tags(&log), ["before"]);
        assert_eq!(bus.depth(), 0);
    }

    #[test]
    fn registering_unknown_notifier_is_invalid() {
        let mut bus = Messenger::new();
        let err = bus
            .register_sender_subscriber(Uid::new(1), Uid::new(99))
            .unwrap_err();
        assert_eq!(err, MessengerError::InvalidNotifier(Uid::new(99)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            bus.register_catch_all_subscriber(Uid::INVALID),
            Err(MessengerError::InvalidNotifier(Uid::INVALID))
        );
        assert_eq!(bus.subscriber_count_for_sender(Uid::new(1)), 0);
    }

    #[test]
    fn adopting_a_uid_checks_validity_and_uniqueness() {
        let log = Log::default();
        let mut bus = Messenger::new();
        assert_eq!(
            bus.add_notifier_with_uid(Uid::INVALID, recorder(&log, "x")),
            Err(MessengerError::InvalidNotifier(Uid::INVALID))
        );
        let uid = Uid::new(2);
        assert_eq!(bus.add_notifier_with_uid(uid, recorder(&log, "x")), Ok(uid));
        assert_eq!(
            bus.add_notifier_with_uid(uid, recorder(&log, "y")),
            Err(MessengerError::DuplicateNotifier(uid))
        );

        // The allocator skips UIDs that were adopted ahead of it.
        let first = bus.add_notifier(recorder(&log, "a"));
        let second = bus.add_notifier(recorder(&log, "b"));
        assert_eq!(first, Uid::new(1));
        assert_eq!(second, Uid::new(3));
    }

    #[test]
    fn unregister_removes_every_occurrence() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let sender = Uid::new(4);
        let n = bus.subscribe_sender(sender, recorder(&log, "n"));
        bus.register_sender_subscriber(sender, n).unwrap();

        bus.unregister_sender_subscriber(sender, n).unwrap();
        assert_eq!(bus.subscriber_count_for_sender(sender), 0);
        assert_eq!(
            bus.unregister_sender_subscriber(sender, n),
            Err(MessengerError::NotSubscribed {
                notifier: n,
                bucket: Bucket::Sender(sender),
            })
        );
        assert!(bus.contains_notifier(n));
    }

    #[test]
    fn unregister_kind_and_catch_all() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let n = bus.subscribe_event_kind(EventKind::HIDDEN, recorder(&log, "n"));
        bus.register_catch_all_subscriber(n).unwrap();

        bus.unregister_event_kind_subscriber(EventKind::HIDDEN, n)
            .unwrap();
        bus.unregister_catch_all_subscriber(n).unwrap();
        assert_eq!(bus.subscriber_count_for_event_kind(EventKind::HIDDEN), 0);
        assert_eq!(bus.catch_all_count(), 0);
        assert_eq!(
            bus.unregister_catch_all_subscriber(n).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn removed_notifier_leaves_no_subscriptions() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let sender = Uid::new(8);
        let n = bus.subscribe_sender(sender, recorder(&log, "n"));
        bus.register_event_kind_subscriber(EventKind::MOVED, n)
            .unwrap();
        bus.register_catch_all_subscriber(n).unwrap();

        assert!(bus.remove_notifier(n).is_some());
        assert!(bus.remove_notifier(n).is_none());
        assert_eq!(bus.subscriber_count_for_sender(sender), 0);
        assert_eq!(bus.subscriber_count_for_event_kind(EventKind::MOVED), 0);
        assert_eq!(bus.catch_all_count(), 0);
        bus.publish(sender, EventKind::MOVED, 0, 0).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn reset_clears_indexes_but_keeps_notifiers_and_counter() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let n = bus.subscribe_sender(Uid::new(1), recorder(&log, "n"));
        bus.register_catch_all_subscriber(n).unwrap();
        let next = bus.uids().peek();

        bus.reset();
        assert_eq!(bus.subscriber_count_for_sender(Uid::new(1)), 0);
        assert_eq!(bus.catch_all_count(), 0);
        assert!(bus.contains_notifier(n));
        assert_eq!(bus.uids().peek(), next);

        bus.register_catch_all_subscriber(n).unwrap();
        bus.publish(Uid::new(1), EventKind::CLICKED, 0, 0).unwrap();
        assert_eq!(tags(&log), ["n"]);
    }

    #[test]
    fn allocation_skips_reserved_uids() {
        let log = Log::default();
        let mut bus = Messenger::new();
        assert!(bus.reserve_uid(Uid::new(1)));
        assert!(bus.reserve_uid(Uid::new(3)));
        assert!(!bus.reserve_uid(Uid::INVALID));

        assert_eq!(bus.add_notifier(recorder(&log, "a")), Uid::new(2));
        assert_eq!(bus.next_uid(), Uid::new(4));
        // Passed reservations are dropped.
        assert!(!bus.is_reserved(Uid::new(1)));
        assert!(!bus.is_reserved(Uid::new(3)));
        assert!(!bus.reserve_uid(Uid::new(3)));
    }

    #[test]
    fn subscription_introspection() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let sender = Uid::new(50);
        let a = bus.subscribe_sender(sender, recorder(&log, "a"));
        let b = bus.add_notifier(recorder(&log, "b"));
        assert_eq!(bus.subscribers_for_sender(sender), [a]);
        assert!(bus.subscribers_for_sender(Uid::new(51)).is_empty());
        assert!(bus.is_subscribed(a));
        assert!(!bus.is_subscribed(b));
        bus.register_event_kind_subscriber(EventKind::SHOWN, b)
            .unwrap();
        assert!(bus.is_subscribed(b));
    }

    #[test]
    fn forget_sender_drops_its_bucket() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let sender = Uid::new(2);
        bus.subscribe_sender(sender, recorder(&log, "a"));
        bus.subscribe_sender(sender, recorder(&log, "b"));
        assert_eq!(bus.forget_sender(sender), 2);
        assert_eq!(bus.forget_sender(sender), 0);
        assert_eq!(bus.notifier_count(), 2);
    }

    #[test]
    fn nested_publish_runs_depth_first() {
        let log = Log::default();
        let mut bus = Messenger::new();
        let outer = Uid::new(100);
        let inner = Uid::new(200);

        let inner_log = Rc::clone(&log);
        bus.subscribe_sender(
            outer,
            move |bus: &Messenger, ev: &Event| -> Result<(), NotifyError> {
                inner_log.borrow_mut().push(("outer", *ev));
                bus.publish(inner, EventKind::CHANGED, ev.info1 + 1, 0)?;
                Ok(())
            },
        );
        bus.subscribe_sender(inner, recorder(&log, "inner"));
        bus.subscribe_catch_all(recorder(&log, "all"));

        bus.publish(outer, EventKind::CLICKED, 0, 0).unwrap();
        assert_eq!(tags(&log), ["outer", "inner", "all", "all"]);
        assert_eq!(log.borrow()[3].1.sender, outer);
    }

    #[test]
    fn depth_limit_stops_runaway_recursion() {
        let mut bus = Messenger::new();
        bus.set_max_depth(Some(3));
        let sender = Uid::new(1);
        bus.subscribe_sender(
            sender,
            move |bus: &Messenger, ev: &Event| -> Result<(), NotifyError> {
                bus.publish(ev.sender, ev.kind, 0, 0)?;
                Ok(())
            },
        );

        let err = bus.publish(sender, EventKind::CLICKED, 0, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoopDetected);
        let innermost = err.innermost();
        assert_eq!(innermost.notifier, Uid::INVALID);
        assert!(matches!(
            innermost.source,
            NotifyError::DepthExceeded { limit: 3 }
        ));
        assert_eq!(bus.depth(), 0);
    }
}
