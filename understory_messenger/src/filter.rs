// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Allow-list of event kinds consulted by emitters before publishing.
//!
//! The filter is policy, not routing: it answers "is this category of event
//! interesting at all" so an emitter can skip building a payload. The
//! [`Messenger`](crate::Messenger) never consults it.

use alloc::vec::Vec;

use crate::event::EventKind;

/// One enabled/disabled switch per [`EventKind`].
///
/// The filter is a plain value owned by whatever builds the UI root
/// (see `understory_object::Hub`), rather than process-wide state. A fresh
/// filter enables every kind. Mutation is in place, so every reader holding
/// a reference observes the live switches.
///
/// ```rust
/// use understory_messenger::{EventFilter, EventKind};
///
/// let mut filter = EventFilter::new();
/// filter.disable(EventKind::MOVED | EventKind::RESIZED);
/// assert!(!filter.is_enabled(EventKind::MOVED));
/// assert!(filter.is_enabled(EventKind::CLICKED));
/// assert_eq!(filter.disabled_kinds(), vec![EventKind::MOVED, EventKind::RESIZED]);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventFilter {
    enabled: EventKind,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFilter {
    /// Creates a filter with every kind enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: EventKind::all(),
        }
    }

    /// Creates a filter with every kind disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            enabled: EventKind::empty(),
        }
    }

    /// Enables every known bit of `kind`; unknown bits are ignored.
    pub fn enable(&mut self, kind: EventKind) {
        self.enabled.insert(kind & EventKind::all());
    }

    /// Disables every known bit of `kind`; unknown bits are ignored.
    pub fn disable(&mut self, kind: EventKind) {
        self.enabled.remove(kind & EventKind::all());
    }

    /// Enables or disables every known bit of `kind`.
    pub fn set(&mut self, kind: EventKind, enabled: bool) {
        if enabled {
            self.enable(kind);
        } else {
            self.disable(kind);
        }
    }

    /// Enables every kind.
    pub fn enable_all(&mut self) {
        self.enabled = EventKind::all();
    }

    /// Disables every kind.
    pub fn disable_all(&mut self) {
        self.enabled = EventKind::empty();
    }

    /// Returns `true` if every known bit of `kind` is enabled.
    ///
    /// A kind with no known bits is never enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: EventKind) -> bool {
        let known = kind & EventKind::all();
        !known.is_empty() && self.enabled.contains(known)
    }

    /// Returns the enabled kinds, one entry per single-bit kind, in bit order.
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<EventKind> {
        EventKind::all()
            .iter()
            .filter(|k| self.enabled.contains(*k))
            .collect()
    }

    /// Returns the disabled kinds, one entry per single-bit kind, in bit order.
    #[must_use]
    pub fn disabled_kinds(&self) -> Vec<EventKind> {
        EventKind::all()
            .iter()
            .filter(|k| !self.enabled.contains(*k))
            .collect()
    }
}
