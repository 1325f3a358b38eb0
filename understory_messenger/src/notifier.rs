// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The receiver capability and the stock relay notifier.
//!
//! Anything implementing [`Notifier`] can be stored in a
//! [`Messenger`](crate::Messenger) and subscribed to senders, kinds or the
//! catch-all bucket. Closures with the matching signature are notifiers, which
//! is the usual way for an object to forward routed events to its own handler:
//!
//! ```rust
//! use core::cell::Cell;
//! use std::rc::Rc;
//! use understory_messenger::{Event, EventKind, Messenger, NotifyError, Uid};
//!
//! let clicks = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&clicks);
//!
//! let mut bus = Messenger::new();
//! let button = bus.next_uid();
//! bus.subscribe_sender(button, move |_: &Messenger, ev: &Event| {
//!     if ev.kind == EventKind::CLICKED {
//!         seen.set(seen.get() + 1);
//!     }
//!     Ok::<(), NotifyError>(())
//! });
//!
//! bus.publish(button, EventKind::CLICKED, 0, 0).unwrap();
//! assert_eq!(clicks.get(), 1);
//! ```

use crate::error::NotifyError;
use crate::event::Event;
use crate::messenger::Messenger;
use crate::uid::Uid;

/// Something that can be told "sender X raised event Y with payload (a, b)".
///
/// `notify` receives the messenger that is dispatching so that it can publish
/// follow-up events re-entrantly. The messenger is borrowed shared for the
/// whole dispatch, so subscriptions cannot change while a notifier runs.
///
/// Whether a notifier is invoked at all is controlled by the messenger
/// ([`Messenger::set_notifier_enabled`]); a disabled notifier stays
/// subscribed but is skipped.
pub trait Notifier {
    /// Receives one routed event.
    ///
    /// Returning an error aborts the rest of the current dispatch; the error
    /// surfaces from [`Messenger::publish`] wrapped in a
    /// [`DispatchError`](crate::DispatchError).
    fn notify(&self, bus: &Messenger, event: &Event) -> Result<(), NotifyError>;
}

impl<F> Notifier for F
where
    F: Fn(&Messenger, &Event) -> Result<(), NotifyError>,
{
    #[inline]
    fn notify(&self, bus: &Messenger, event: &Event) -> Result<(), NotifyError> {
        self(bus, event)
    }
}

/// Republishes every event it receives under a different sender UID.
///
/// A relay lets an outer composite present the events of one of its parts as
/// its own: subscribe the relay to the part and set `target` to the
/// composite's UID.
///
/// With loop protection on (the default), an incoming event whose sender is
/// already `target` fails with [`NotifyError::LoopDetected`] instead of being
/// republished to itself. With protection off the relay republishes
/// unconditionally; longer cycles through several notifiers are never
/// detected by the relay.
#[derive(Debug)]
pub struct RelayNotifier {
    target: Uid,
    loop_protection: bool,
    uid: Uid,
}

impl RelayNotifier {
    /// Creates a relay that republishes under `target`, with loop protection on.
    #[must_use]
    pub fn new(target: Uid) -> Self {
        Self {
            target,
            loop_protection: true,
            uid: Uid::INVALID,
        }
    }

    /// Turns loop protection on or off.
    #[must_use]
    pub fn with_loop_protection(mut self, enabled: bool) -> Self {
        self.loop_protection = enabled;
        self
    }

    /// Records the relay's own UID so that loop errors can name it.
    ///
    /// [`Messenger::add_notifier`] stores notifiers by UID but cannot reach
    /// into them; callers that want the UID reported set it here.
    #[must_use]
    pub fn with_uid(mut self, uid: Uid) -> Self {
        self.uid = uid;
        self
    }

    /// The UID events are republished under.
    #[must_use]
    pub fn target(&self) -> Uid {
        self.target
    }

    /// Whether self-loops are refused.
    #[must_use]
    pub fn loop_protection(&self) -> bool {
        self.loop_protection
    }
}

impl Notifier for RelayNotifier {
    fn notify(&self, bus: &Messenger, event: &Event) -> Result<(), NotifyError> {
        if self.loop_protection && event.sender == self.target {
            return Err(NotifyError::LoopDetected {
                relay: self.uid,
                sender: event.sender,
            });
        }
        bus.publish(self.target, event.kind, event.info1, event.info2)?;
        Ok(())
    }
}
