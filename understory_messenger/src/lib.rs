// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_messenger --heading-base-level=0

//! Understory Messenger: a UID-addressed publish/subscribe bus for UI toolkits.
//!
//! ## Overview
//!
//! Widgets raise events by publishing `(sender, kind, info1, info2)`; anything
//! that wants to react registers a [`Notifier`]. The [`Messenger`] decouples
//! the two with three independent subscription indexes:
//!
//! - **by sender**: "tell me whatever this widget raises",
//! - **by event kind**: "tell me about every click",
//! - **catch-all**: "tell me everything".
//!
//! A published event is fanned out to the sender bucket, then the kind bucket,
//! then the catch-all bucket, synchronously and depth-first. The messenger
//! never interprets payloads; it only routes them.
//!
//! ## Identity
//!
//! Every sender, object and notifier is addressed by a [`Uid`] handed out by a
//! [`UidAllocator`]. UIDs only ever increase and are never reused, and
//! [`Uid::INVALID`] is never allocated. A [`Messenger`] owns the allocator of
//! its session so notifiers and objects share one UID space.
//!
//! ## Filtering
//!
//! [`EventFilter`] is an allow-list of [`EventKind`]s that emitters may consult
//! before building an event at all. It is advisory: the messenger does not
//! consult it. `understory_object::Hub` wires the two together.
//!
//! ## Errors
//!
//! Receivers return [`NotifyError`]. The first failure aborts the current
//! dispatch and surfaces from [`Messenger::publish`] as a [`DispatchError`]
//! naming the failing notifier. Every error type maps onto a coarse
//! [`ErrorKind`].
//!
//! ## Minimal example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_messenger::{Event, EventKind, Messenger, NotifyError, RelayNotifier};
//!
//! let mut bus = Messenger::new();
//! let line_edit = bus.next_uid();
//! let form = bus.next_uid();
//!
//! // The form re-raises its part's events as its own.
//! bus.subscribe_sender(line_edit, RelayNotifier::new(form));
//!
//! let seen: Rc<RefCell<Vec<Event>>> = Rc::default();
//! let sink = Rc::clone(&seen);
//! bus.subscribe_sender(form, move |_: &Messenger, ev: &Event| -> Result<(), NotifyError> {
//!     sink.borrow_mut().push(*ev);
//!     Ok(())
//! });
//!
//! bus.publish(line_edit, EventKind::TEXT_CHANGED, 5, 0).unwrap();
//! assert_eq!(seen.borrow()[0].sender, form);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod event;
mod filter;
mod messenger;
mod notifier;
mod uid;

pub use error::{Bucket, DispatchError, ErrorKind, MessengerError, NotifyError};
pub use event::{Event, EventKind};
pub use filter::EventFilter;
pub use messenger::Messenger;
pub use notifier::{Notifier, RelayNotifier};
pub use uid::{SharedUidAllocator, Uid, UidAllocator};
