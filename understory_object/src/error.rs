// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the object arena and the hub.

use thiserror::Error;
use understory_messenger::{ErrorKind, MessengerError, Uid};

/// Errors returned by [`ObjectTree`](crate::ObjectTree) operations.
///
/// These are programmer errors: the tree is left unchanged whenever one is
/// returned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// The node still carries [`Uid::INVALID`].
    #[error("object has no valid UID")]
    InvalidUid,
    /// Another node is already stored under this UID.
    #[error("an object is already stored under {0}")]
    DuplicateUid(Uid),
    /// The child is already a member of the parent's child set.
    #[error("{child} is already a child of {parent}")]
    DuplicateChild {
        /// The parent whose child set was addressed.
        parent: Uid,
        /// The child that was to be added.
        child: Uid,
    },
    /// No node is stored under this UID.
    #[error("no object is stored under {0}")]
    NotFound(Uid),
    /// The child is not a member of the parent's child set.
    #[error("{child} is not a child of {parent}")]
    NotAChild {
        /// The parent whose child set was addressed.
        parent: Uid,
        /// The child that was to be removed.
        child: Uid,
    },
    /// The relation would make a node its own ancestor.
    #[error("linking {node} under {ancestor} would create a cycle")]
    WouldCycle {
        /// The node whose parent or owner was being set.
        node: Uid,
        /// The proposed parent or owner.
        ancestor: Uid,
    },
}

impl ObjectError {
    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUid
            | Self::DuplicateUid(_)
            | Self::DuplicateChild { .. }
            | Self::WouldCycle { .. } => ErrorKind::InvalidArgument,
            Self::NotFound(_) | Self::NotAChild { .. } => ErrorKind::NotFound,
        }
    }
}

/// Errors returned by [`Hub`](crate::Hub) calls that touch both the arena and
/// the messenger.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HubError {
    /// The object arena refused the operation.
    #[error(transparent)]
    Object(#[from] ObjectError),
    /// The messenger refused the operation.
    #[error(transparent)]
    Messenger(#[from] MessengerError),
}

impl HubError {
    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Object(err) => err.kind(),
            Self::Messenger(err) => err.kind(),
        }
    }
}
