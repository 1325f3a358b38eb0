// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event kinds and the event tuple handed to notifiers.

use core::fmt;

use crate::uid::Uid;

bitflags::bitflags! {
    /// The closed set of UI event kinds routed by a [`Messenger`](crate::Messenger).
    ///
    /// Each kind is a single bit so that policy layers such as
    /// [`EventFilter`](crate::EventFilter) can treat a bitwise-OR of kinds as
    /// "every one of these". Routing itself is keyed by the exact value passed to
    /// [`Messenger::publish`](crate::Messenger::publish).
    ///
    /// Values crossing a boundary should go through [`EventKind::from_raw`],
    /// which maps anything unrecognized to [`EventKind::UNKNOWN_EVENT`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EventKind: u32 {
        /// A button or item was clicked.
        const CLICKED           = 1 << 0;
        /// A button or item was double-clicked.
        const DOUBLE_CLICKED    = 1 << 1;
        /// A value changed.
        const CHANGED           = 1 << 2;
        /// Content was cleared.
        const CLEARED           = 1 << 3;
        /// A window or dialog is about to close.
        const CLOSING           = 1 << 4;
        /// The sender was destroyed.
        const DESTROYED         = 1 << 5;
        /// A key was pressed while the sender had focus.
        const KEY_PRESSED       = 1 << 6;
        /// The current selection changed.
        const SELECTION_CHANGED = 1 << 7;
        /// A tri-state or mode changed.
        const STATE_CHANGED     = 1 << 8;
        /// Editable text changed.
        const TEXT_CHANGED      = 1 << 9;
        /// A checkable item became checked.
        const TOGGLED_CHECKED   = 1 << 10;
        /// A checkable item became unchecked.
        const TOGGLED_UNCHECKED = 1 << 11;
        /// An item was activated (Enter or double-click).
        const ACTIVATED         = 1 << 12;
        /// A dialog was accepted.
        const ACCEPTED          = 1 << 13;
        /// A dialog was rejected.
        const REJECTED          = 1 << 14;
        /// The sender gained keyboard focus.
        const FOCUS_IN          = 1 << 15;
        /// The sender lost keyboard focus.
        const FOCUS_OUT         = 1 << 16;
        /// The sender moved.
        const MOVED             = 1 << 17;
        /// The sender was resized.
        const RESIZED           = 1 << 18;
        /// The sender became visible.
        const SHOWN             = 1 << 19;
        /// The sender became hidden.
        const HIDDEN            = 1 << 20;
        /// The sender's content scrolled.
        const SCROLLED          = 1 << 21;
        /// Fallback for values that did not map to a known kind.
        const UNKNOWN_EVENT     = 1 << 31;
    }
}

impl EventKind {
    /// Maps a raw value received from outside the process to a kind.
    ///
    /// A value made only of known bits passes through unchanged; zero or any
    /// unknown bit yields [`EventKind::UNKNOWN_EVENT`].
    ///
    /// ```rust
    /// use understory_messenger::EventKind;
    ///
    /// assert_eq!(EventKind::from_raw(1), EventKind::CLICKED);
    /// assert_eq!(EventKind::from_raw(0), EventKind::UNKNOWN_EVENT);
    /// assert_eq!(EventKind::from_raw(1 << 25), EventKind::UNKNOWN_EVENT);
    /// ```
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match Self::from_bits(raw) {
            Some(kind) if !kind.is_empty() => kind,
            _ => Self::UNKNOWN_EVENT,
        }
    }

    /// Returns the flag name of a single-bit kind, or `None` for composites.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        self.iter_names()
            .find(|(_, flag)| *flag == self)
            .map(|(name, _)| name)
    }
}

/// One routed event: "sender raised kind with payload (info1, info2)".
///
/// The messenger never interprets the payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Event {
    /// UID of the object that raised the event.
    pub sender: Uid,
    /// What happened.
    pub kind: EventKind,
    /// First payload value.
    pub info1: i32,
    /// Second payload value.
    pub info2: i32,
}

impl Event {
    /// Creates an event.
    #[must_use]
    pub const fn new(sender: Uid, kind: EventKind, info1: i32, info2: i32) -> Self {
        Self {
            sender,
            kind,
            info1,
            info2,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.name() {
            Some(name) => write!(f, "{name}")?,
            None => write!(f, "{:?}", self.kind)?,
        }
        write!(f, " from {} ({}, {})", self.sender, self.info1, self.info2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn from_raw_passes_known_composites_through() {
        let bits = (EventKind::CLICKED | EventKind::CHANGED).bits();
        assert_eq!(
            EventKind::from_raw(bits),
            EventKind::CLICKED | EventKind::CHANGED
        );
    }

    #[test]
    fn from_raw_rejects_mixed_known_and_unknown_bits() {
        let bits = EventKind::CLICKED.bits() | (1 << 27);
        assert_eq!(EventKind::from_raw(bits), EventKind::UNKNOWN_EVENT);
    }

    #[test]
    fn names_only_for_single_kinds() {
        assert_eq!(EventKind::TEXT_CHANGED.name(), Some("TEXT_CHANGED"));
        assert_eq!(EventKind::UNKNOWN_EVENT.name(), Some("UNKNOWN_EVENT"));
        assert_eq!((EventKind::SHOWN | EventKind::HIDDEN).name(), None);
        assert_eq!(EventKind::empty().name(), None);
    }

    #[test]
    fn event_display_names_kind_and_sender() {
        let ev = Event::new(Uid::new(4), EventKind::CLICKED, 1, -2);
        assert_eq!(format!("{ev}"), "CLICKED from Uid(4) (1, -2)");
    }
}
