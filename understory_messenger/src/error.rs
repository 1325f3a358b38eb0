// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for registration and dispatch.

use alloc::boxed::Box;
use alloc::string::String;

use thiserror::Error;

use crate::event::EventKind;
use crate::uid::Uid;

/// Coarse classification shared by every error in the messaging core.
///
/// Callers that only need to decide how to present a failure (for example a
/// top-level error dialog) can match on this instead of the concrete enums.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A missing, invalid or duplicate identity was supplied.
    InvalidArgument,
    /// Something that was expected to be registered was not.
    NotFound,
    /// A relay or the re-entrancy limit stopped an event from looping.
    LoopDetected,
    /// A receiver failed inside [`Messenger::publish`](crate::Messenger::publish).
    PropagatedFailure,
}

/// Which subscription index an operation addressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Subscriptions keyed by sender UID.
    Sender(Uid),
    /// Subscriptions keyed by event kind.
    EventKind(EventKind),
    /// Subscriptions that see every event.
    CatchAll,
}

/// Errors returned by [`Messenger`](crate::Messenger) registration calls.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MessengerError {
    /// The notifier handle is invalid or no notifier is stored under it.
    #[error("no notifier is stored under {0}")]
    InvalidNotifier(Uid),
    /// A notifier is already stored under this UID.
    #[error("a notifier is already stored under {0}")]
    DuplicateNotifier(Uid),
    /// The notifier is not subscribed to the addressed bucket.
    #[error("notifier {notifier} is not subscribed to {bucket:?}")]
    NotSubscribed {
        /// The notifier that was to be removed.
        notifier: Uid,
        /// The bucket it was expected in.
        bucket: Bucket,
    },
}

impl MessengerError {
    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidNotifier(_) | Self::DuplicateNotifier(_) => ErrorKind::InvalidArgument,
            Self::NotSubscribed { .. } => ErrorKind::NotFound,
        }
    }
}

/// Errors a [`Notifier`](crate::Notifier) may return from `notify`.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A relay was asked to republish an event under the UID that raised it.
    #[error("relay {relay} would republish an event from {sender} to itself")]
    LoopDetected {
        /// UID of the relay notifier.
        relay: Uid,
        /// The incoming sender, equal to the relay's target.
        sender: Uid,
    },
    /// Nested publishing went deeper than the messenger allows.
    #[error("publish nesting exceeded the limit of {limit}")]
    DepthExceeded {
        /// The configured maximum depth.
        limit: usize,
    },
    /// A nested [`Messenger::publish`](crate::Messenger::publish) failed.
    #[error(transparent)]
    Dispatch(#[from] Box<DispatchError>),
    /// The receiver refused the event.
    #[error("{0}")]
    Rejected(String),
}

impl NotifyError {
    /// Convenience constructor for receiver-defined failures.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LoopDetected { .. } | Self::DepthExceeded { .. } => ErrorKind::LoopDetected,
            Self::Dispatch(inner) => inner.source.kind(),
            Self::Rejected(_) => ErrorKind::PropagatedFailure,
        }
    }
}

impl From<DispatchError> for NotifyError {
    fn from(err: DispatchError) -> Self {
        Self::Dispatch(Box::new(err))
    }
}

/// A receiver failure, tagged with where it happened.
///
/// [`Messenger::publish`](crate::Messenger::publish) stops at the first failing
/// notifier and returns this error; no later notifier is invoked.
#[derive(Debug, Error)]
#[error("raised from Messenger::publish: notifier {notifier} failed on {kind:?} from {sender}")]
pub struct DispatchError {
    /// The notifier whose `notify` failed.
    pub notifier: Uid,
    /// The sender of the event being dispatched.
    pub sender: Uid,
    /// The kind of the event being dispatched.
    pub kind: EventKind,
    /// What the notifier returned.
    #[source]
    pub source: NotifyError,
}

impl DispatchError {
    /// Returns the classification of the innermost receiver failure.
    ///
    /// A failure that arrived through one or more relays keeps the kind of the
    /// original error; a plain receiver failure is
    /// [`ErrorKind::PropagatedFailure`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Walks through nested relays to the innermost dispatch failure.
    #[must_use]
    pub fn innermost(&self) -> &Self {
        let mut current = self;
        while let NotifyError::Dispatch(inner) = &current.source {
            current = inner;
        }
        current
    }
}
