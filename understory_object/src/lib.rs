// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_object --heading-base-level=0

//! Understory Object: a UID-keyed ownership arena for UI objects.
//!
//! ## Overview
//!
//! Widgets and dialogs form a graph: containers own their children, and
//! composite widgets own internal parts that should be cleaned up through the
//! composite rather than through the plain containment tree. This crate models
//! that graph as an arena:
//!
//! - [`ObjectNode`]: a UID, an alias, a unique name, a child set, and two
//!   back-references (`parent` and `owner`), all stored as [`Uid`]s.
//! - [`ObjectTree`]: the arena. Every relation update goes through it, with
//!   cycle checks governed by [`CycleHandling`].
//! - [`Hub`]: the UI root, combining an [`ObjectTree`] with an
//!   [`understory_messenger::Messenger`] and an
//!   [`understory_messenger::EventFilter`].
//!
//! Because relations are UIDs rather than pointers, a relation that outlives
//! its target resolves to `None` instead of dangling.
//!
//! ## Teardown
//!
//! Destroying an object must detach it from the bus before it leaves the
//! arena. [`Hub::destroy_object`] removes the notifier and the sender bucket
//! of every doomed UID, then calls [`ObjectTree::destroy`], which applies the
//! owner-first detach rule to each of them. Standalone notifiers left without
//! any subscription are dropped afterwards.
//!
//! ## Minimal example
//!
//! ```rust
//! use understory_object::Hub;
//!
//! let mut hub = Hub::new();
//! let dialog = hub.create_object("settings_dialog").unwrap();
//! let ok = hub.create_object("ok_button").unwrap();
//! hub.objects_mut().add_child_object(dialog, ok).unwrap();
//! hub.objects_mut().set_alias(ok, "OK").unwrap();
//!
//! assert_eq!(hub.objects().find_child_by_alias(dialog, "OK"), Some(ok));
//! assert_eq!(hub.destroy_object(dialog).unwrap().len(), 2);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod hub;
mod tree;

pub use error::{HubError, ObjectError};
pub use hub::Hub;
pub use tree::{CycleHandling, ObjectNode, ObjectTree};

pub use understory_messenger::Uid;
