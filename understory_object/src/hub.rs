// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The UI root: one messenger, one object arena and one event filter.

use alloc::string::String;
use alloc::vec::Vec;

use tracing::{debug, trace};
use understory_messenger::{DispatchError, EventFilter, EventKind, Messenger, Notifier, Uid};

use crate::error::{HubError, ObjectError};
use crate::tree::{ObjectNode, ObjectTree};

/// Ties a [`Messenger`], an [`ObjectTree`] and an [`EventFilter`] together.
///
/// The hub is what a toolkit's application object holds. It hands out UIDs
/// from the messenger's allocator so objects and notifiers share one UID
/// space, consults the filter before publishing, and tears objects down in
/// the required order: bus subscriptions first, then the arena.
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_messenger::{Event, EventFilter, EventKind, Messenger, NotifyError};
/// use understory_object::Hub;
///
/// let mut filter = EventFilter::new();
/// filter.disable(EventKind::MOVED);
/// let mut hub = Hub::with_filter(filter);
///
/// let button = hub.create_object("ok_button").unwrap();
/// let clicks = Rc::new(Cell::new(0));
/// let seen = Rc::clone(&clicks);
/// hub.messenger_mut().subscribe_sender(button, move |_: &Messenger, _: &Event| -> Result<(), NotifyError> {
///     seen.set(seen.get() + 1);
///     Ok(())
/// });
///
/// assert!(hub.emit(button, EventKind::CLICKED, 0, 0).unwrap());
/// assert!(!hub.emit(button, EventKind::MOVED, 0, 0).unwrap());
/// assert_eq!(clicks.get(), 1);
///
/// hub.destroy_object(button).unwrap();
/// assert_eq!(hub.messenger().subscriber_count_for_sender(button), 0);
/// ```
#[derive(Debug, Default)]
pub struct Hub {
    messenger: Messenger,
    objects: ObjectTree,
    filter: EventFilter,
}

impl Hub {
    /// Creates a hub with a fresh messenger, an empty arena and an
    /// all-enabled filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hub with the given filter.
    #[must_use]
    pub fn with_filter(filter: EventFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Creates a hub around existing parts.
    ///
    /// Every object UID is reserved in the messenger so that later notifier
    /// allocations cannot collide with it.
    #[must_use]
    pub fn from_parts(mut messenger: Messenger, objects: ObjectTree, filter: EventFilter) -> Self {
        for node in objects.iter() {
            messenger.reserve_uid(node.uid());
        }
        Self {
            messenger,
            objects,
            filter,
        }
    }

    /// The messenger.
    #[must_use]
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// The messenger, for registration.
    pub fn messenger_mut(&mut self) -> &mut Messenger {
        &mut self.messenger
    }

    /// The object arena.
    #[must_use]
    pub fn objects(&self) -> &ObjectTree {
        &self.objects
    }

    /// The object arena, for relation updates.
    ///
    /// New objects should enter through [`create_object`](Self::create_object)
    /// or [`adopt_object`](Self::adopt_object), which keep object and notifier
    /// UIDs apart.
    pub fn objects_mut(&mut self) -> &mut ObjectTree {
        &mut self.objects
    }

    /// The event filter.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// The event filter, for toggling kinds at runtime.
    pub fn filter_mut(&mut self) -> &mut EventFilter {
        &mut self.filter
    }

    /// Creates an unattached object with a fresh UID.
    pub fn create_object(&mut self, unique_name: impl Into<String>) -> Result<Uid, ObjectError> {
        let uid = self.fresh_object_uid();
        self.objects.insert(ObjectNode::new(unique_name).with_uid(uid))
    }

    /// Inserts a pre-built node, assigning a fresh UID if it has none.
    ///
    /// A pre-assigned UID is reserved in the messenger, so notifiers added
    /// later never receive it.
    pub fn adopt_object(&mut self, mut node: ObjectNode) -> Result<Uid, ObjectError> {
        if !node.uid().is_valid() {
            node.set_uid(self.fresh_object_uid());
        } else if self.messenger.contains_notifier(node.uid()) {
            return Err(ObjectError::DuplicateUid(node.uid()));
        }
        let uid = self.objects.insert(node)?;
        self.messenger.reserve_uid(uid);
        Ok(uid)
    }

    /// Stores `notifier` in the messenger under the UID of `object`.
    ///
    /// This is how an object receives routed events through its own handler.
    /// The notifier is removed again when the object is destroyed.
    pub fn attach_notifier<N: Notifier + 'static>(
        &mut self,
        object: Uid,
        notifier: N,
    ) -> Result<Uid, HubError> {
        if !self.objects.contains(object) {
            return Err(ObjectError::NotFound(object).into());
        }
        Ok(self.messenger.add_notifier_with_uid(object, notifier)?)
    }

    /// Publishes an event unless the filter rejects its kind.
    ///
    /// Returns whether the event was published.
    pub fn emit(
        &self,
        sender: Uid,
        kind: EventKind,
        info1: i32,
        info2: i32,
    ) -> Result<bool, DispatchError> {
        self.emit_with(sender, kind, || (info1, info2))
    }

    /// Like [`emit`](Self::emit), but only builds the payload when the filter
    /// lets the event through.
    pub fn emit_with(
        &self,
        sender: Uid,
        kind: EventKind,
        payload: impl FnOnce() -> (i32, i32),
    ) -> Result<bool, DispatchError> {
        if !self.filter.is_enabled(kind) {
            trace!(sender = %sender, kind = ?kind, "event filtered out");
            return Ok(false);
        }
        let (info1, info2) = payload();
        self.messenger.publish(sender, kind, info1, info2)?;
        Ok(true)
    }

    /// Destroys an object and everything it contains.
    ///
    /// Each doomed UID loses its notifier and its sender bucket in the
    /// messenger before the arena runs [`ObjectTree::destroy`], so no event
    /// can reach a half-destroyed object. Standalone notifiers (ones not
    /// stored under an object's UID) that were only subscribed to doomed
    /// senders are removed as well. Returns the removed UIDs.
    pub fn destroy_object(&mut self, uid: Uid) -> Result<Vec<Uid>, ObjectError> {
        if !self.objects.contains(uid) {
            return Err(ObjectError::NotFound(uid));
        }
        let mut orphans = Vec::new();
        for doomed in self.objects.subtree(uid) {
            let had_notifier = self.messenger.remove_notifier(doomed).is_some();
            orphans.extend_from_slice(self.messenger.subscribers_for_sender(doomed));
            let subscriptions = self.messenger.forget_sender(doomed);
            if had_notifier || subscriptions > 0 {
                debug!(object = %doomed, had_notifier, subscriptions, "deregistered object");
            }
        }
        let removed = self.objects.destroy(uid)?;
        for orphan in orphans {
            if !self.objects.contains(orphan)
                && !self.messenger.is_subscribed(orphan)
                && self.messenger.remove_notifier(orphan).is_some()
            {
                debug!(notifier = %orphan, "pruned notifier of destroyed sender");
            }
        }
        Ok(removed)
    }

    fn fresh_object_uid(&mut self) -> Uid {
        // Adopted nodes may carry UIDs ahead of the allocator.
        loop {
            let uid = self.messenger.next_uid();
            if !self.objects.contains(uid) && !self.messenger.contains_notifier(uid) {
                return uid;
            }
        }
    }
}
