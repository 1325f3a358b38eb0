// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The object arena: owner/parent/child relations keyed by [`Uid`].
//!
//! ## Relations
//!
//! Every [`ObjectNode`] has three independent relations:
//!
//! - `children`: the set of nodes it contains (owned; destroyed with it),
//! - `parent`: a back-reference to the node that contains it,
//! - `owner`: a back-reference used by composite widgets so that tearing down
//!   one of their internal parts is routed through the composite itself.
//!
//! All relations are stored as UIDs. A UID whose node has been destroyed
//! simply resolves to `None` through [`ObjectTree::get`].
//!
//! ## Destruction
//!
//! [`ObjectTree::destroy`] detaches before removing:
//!
//! - if the node has an owner, and that owner has a parent, the *owner* is
//!   removed from its parent's child set;
//! - otherwise, if the node has a parent, the node is removed from it.
//!
//! The owner route takes precedence even when a parent is also set. Composite
//! widgets rely on this ordering for their teardown.
//!
//! ```rust
//! use understory_messenger::Uid;
//! use understory_object::{ObjectNode, ObjectTree};
//!
//! let mut tree = ObjectTree::new();
//! let window = tree.insert(ObjectNode::new("window").with_uid(Uid::new(1))).unwrap();
//! let combo = tree.insert(ObjectNode::new("combo").with_uid(Uid::new(2))).unwrap();
//! let popup = tree.insert(ObjectNode::new("combo.popup").with_uid(Uid::new(3))).unwrap();
//!
//! tree.add_child_object(window, combo).unwrap();
//! tree.set_owner(popup, Some(combo)).unwrap();
//!
//! // Destroying the part detaches the composite from the window.
//! tree.destroy(popup).unwrap();
//! assert_eq!(tree.get(window).unwrap().child_count(), 0);
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};
use understory_messenger::Uid;

use crate::error::ObjectError;

/// How relation updates treat a link that would make a node its own ancestor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum CycleHandling {
    /// Refuse the update with [`ObjectError::WouldCycle`].
    #[default]
    Error,
    /// Leave the relation unchanged and report success.
    Ignore,
    /// Skip the check and apply the update.
    ///
    /// Traversals stay bounded, but a cyclic graph makes `destroy` and
    /// ancestor queries stop at the first repeated node.
    Allow,
}

/// One object in the arena.
///
/// Nodes are built unattached and handed to [`ObjectTree::insert`]; after
/// that, relations change only through the tree so that both ends stay
/// consistent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectNode {
    uid: Uid,
    alias: String,
    unique_name: String,
    parent: Option<Uid>,
    owner: Option<Uid>,
    children: HashSet<Uid>,
}

impl ObjectNode {
    /// Creates an unattached node with [`Uid::INVALID`] and an empty alias.
    #[must_use]
    pub fn new(unique_name: impl Into<String>) -> Self {
        Self {
            uid: Uid::INVALID,
            alias: String::new(),
            unique_name: unique_name.into(),
            parent: None,
            owner: None,
            children: HashSet::new(),
        }
    }

    /// Sets the UID, replacing the placeholder.
    #[must_use]
    pub fn with_uid(mut self, uid: Uid) -> Self {
        self.uid = uid;
        self
    }

    /// Sets the display alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Sets the UID of a node that has not been inserted yet.
    pub fn set_uid(&mut self, uid: Uid) {
        self.uid = uid;
    }

    /// Sets the display alias.
    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
    }

    /// The node's UID.
    #[must_use]
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// The display alias.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The unique (programmatic) name.
    #[must_use]
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// The containing node, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Uid> {
        self.parent
    }

    /// The composite this node belongs to, if any.
    #[must_use]
    pub fn owner(&self) -> Option<Uid> {
        self.owner
    }

    /// The child set, in no particular order.
    pub fn children(&self) -> impl Iterator<Item = Uid> + '_ {
        self.children.iter().copied()
    }

    /// Number of members in the child set.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether `child` is a member of the child set.
    #[must_use]
    pub fn has_child(&self, child: Uid) -> bool {
        self.children.contains(&child)
    }
}

/// Arena of [`ObjectNode`]s addressed by UID.
#[derive(Clone, Debug, Default)]
pub struct ObjectTree {
    nodes: HashMap<Uid, ObjectNode>,
    cycles: CycleHandling,
}

impl ObjectTree {
    /// Creates an empty tree that refuses cyclic relations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tree with the given cycle policy.
    #[must_use]
    pub fn with_cycle_handling(cycles: CycleHandling) -> Self {
        Self {
            nodes: HashMap::new(),
            cycles,
        }
    }

    /// The active cycle policy.
    #[must_use]
    pub fn cycle_handling(&self) -> CycleHandling {
        self.cycles
    }

    /// Stores an unattached node.
    ///
    /// Fails with [`ObjectError::InvalidUid`] if the node still carries the
    /// placeholder UID and with [`ObjectError::DuplicateUid`] if the UID is
    /// taken.
    pub fn insert(&mut self, node: ObjectNode) -> Result<Uid, ObjectError> {
        let uid = node.uid;
        if !uid.is_valid() {
            return Err(ObjectError::InvalidUid);
        }
        if self.nodes.contains_key(&uid) {
            return Err(ObjectError::DuplicateUid(uid));
        }
        debug!(object = %uid, name = %node.unique_name, "inserted object");
        self.nodes.insert(uid, node);
        Ok(uid)
    }

    /// Returns the node stored under `uid`.
    #[must_use]
    pub fn get(&self, uid: Uid) -> Option<&ObjectNode> {
        self.nodes.get(&uid)
    }

    /// Whether a node is stored under `uid`.
    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        self.nodes.contains_key(&uid)
    }

    /// Number of stored nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over every stored node, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectNode> + '_ {
        self.nodes.values()
    }

    /// Sets the display alias of a stored node.
    pub fn set_alias(&mut self, uid: Uid, alias: impl Into<String>) -> Result<(), ObjectError> {
        self.node_mut(uid)?.alias = alias.into();
        Ok(())
    }

    /// Finds a node by its unique name.
    #[must_use]
    pub fn find_by_unique_name(&self, name: &str) -> Option<Uid> {
        self.nodes
            .values()
            .find(|n| n.unique_name == name)
            .map(|n| n.uid)
    }

    /// Finds a live member of `parent`'s child set by alias.
    #[must_use]
    pub fn find_child_by_alias(&self, parent: Uid, alias: &str) -> Option<Uid> {
        self.nodes
            .get(&parent)?
            .children
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .find(|n| n.alias == alias)
            .map(|n| n.uid)
    }

    /// Adds `child` to `parent`'s child set and points `child.parent` at `parent`.
    ///
    /// Fails with [`ObjectError::DuplicateChild`] if `child` is already a
    /// member, leaving the set unchanged. Membership moves: if `child` was
    /// contained by another node, it leaves that node's child set.
    pub fn add_child_object(&mut self, parent: Uid, child: Uid) -> Result<(), ObjectError> {
        let previous = self.node(child)?.parent;
        if self.node(parent)?.children.contains(&child) {
            return Err(ObjectError::DuplicateChild { parent, child });
        }
        if !self.admit(child, parent, ObjectNode::parent)? {
            return Ok(());
        }
        if let Some(previous) = previous
            && let Some(old) = self.nodes.get_mut(&previous)
            && old.children.remove(&child)
        {
            debug!(parent = %previous, child = %child, "moved child object");
        }
        self.node_mut(parent)?.children.insert(child);
        self.node_mut(child)?.parent = Some(parent);
        debug!(parent = %parent, child = %child, "added child object");
        Ok(())
    }

    /// Removes `child` from `parent`'s child set.
    ///
    /// Fails with [`ObjectError::NotAChild`] if it is not a member. The
    /// child's parent reference is cleared when it pointed at `parent`.
    pub fn remove_child_object(&mut self, parent: Uid, child: Uid) -> Result<(), ObjectError> {
        if !self.node_mut(parent)?.children.remove(&child) {
            return Err(ObjectError::NotAChild { parent, child });
        }
        self.clear_parent_if(child, parent);
        debug!(parent = %parent, child = %child, "removed child object");
        Ok(())
    }

    /// Overwrites the parent reference of `node` (last write wins).
    ///
    /// Child sets are not touched; use [`add_child_object`](Self::add_child_object)
    /// to register membership.
    pub fn set_parent_object(&mut self, node: Uid, parent: Option<Uid>) -> Result<(), ObjectError> {
        self.node(node)?;
        if let Some(parent) = parent {
            self.node(parent)?;
            if !self.admit(node, parent, ObjectNode::parent)? {
                return Ok(());
            }
        }
        self.node_mut(node)?.parent = parent;
        Ok(())
    }

    /// Overwrites the owner reference of `node` (last write wins).
    pub fn set_owner(&mut self, node: Uid, owner: Option<Uid>) -> Result<(), ObjectError> {
        self.node(node)?;
        if let Some(owner) = owner {
            self.node(owner)?;
            if !self.admit(node, owner, ObjectNode::owner)? {
                return Ok(());
            }
        }
        self.node_mut(node)?.owner = owner;
        Ok(())
    }

    /// Whether `ancestor` is reached from `node` by following parent links.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: Uid, node: Uid) -> bool {
        let start = self.nodes.get(&node).and_then(ObjectNode::parent);
        start.is_some_and(|p| self.reaches(p, ancestor, ObjectNode::parent))
    }

    /// Lists `uid` followed by every node reachable through child sets.
    ///
    /// This is exactly what [`destroy`](Self::destroy) would remove. Returns an
    /// empty list if `uid` is not stored.
    #[must_use]
    pub fn subtree(&self, uid: Uid) -> Vec<Uid> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(&uid) {
            return out;
        }
        let mut seen = HashSet::new();
        let mut stack = Vec::from([uid]);
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            stack.extend(node.children.iter().copied());
        }
        out
    }

    /// Detaches `uid` and removes it together with its descendants.
    ///
    /// Detaching is owner-first: if the node has an owner and that owner has
    /// a parent, the owner is removed from that parent's child set; only a
    /// node without an owner is removed from its own parent. A detach target
    /// that no longer lists the expected member is skipped, so several parts
    /// of one composite can be destroyed in any order.
    ///
    /// Every removed descendant gets the same detach step after `uid`, so a
    /// part whose composite lives elsewhere in the tree still detaches that
    /// composite.
    ///
    /// Returns the removed UIDs, `uid` first.
    pub fn destroy(&mut self, uid: Uid) -> Result<Vec<Uid>, ObjectError> {
        self.node(uid)?;
        let doomed = self.subtree(uid);
        for &gone in &doomed {
            self.detach_for_destroy(gone);
        }
        for gone in &doomed {
            self.nodes.remove(gone);
        }
        debug!(object = %uid, removed = doomed.len(), "destroyed object");
        Ok(doomed)
    }

    fn detach_for_destroy(&mut self, uid: Uid) {
        let Some(node) = self.nodes.get(&uid) else {
            return;
        };
        match (node.owner, node.parent) {
            (Some(owner), _) => {
                if let Some(grandparent) = self.nodes.get(&owner).and_then(ObjectNode::parent) {
                    self.detach(grandparent, owner);
                }
            }
            (None, Some(parent)) => self.detach(parent, uid),
            (None, None) => {}
        }
    }

    fn detach(&mut self, parent: Uid, member: Uid) {
        let removed = self
            .nodes
            .get_mut(&parent)
            .is_some_and(|p| p.children.remove(&member));
        if removed {
            self.clear_parent_if(member, parent);
        } else {
            warn!(parent = %parent, member = %member, "detach target does not list member");
        }
    }

    fn clear_parent_if(&mut self, node: Uid, parent: Uid) {
        if let Some(n) = self.nodes.get_mut(&node)
            && n.parent == Some(parent)
        {
            n.parent = None;
        }
    }

    /// Decides whether linking `node` under `ancestor` may proceed.
    fn admit(
        &self,
        node: Uid,
        ancestor: Uid,
        link: fn(&ObjectNode) -> Option<Uid>,
    ) -> Result<bool, ObjectError> {
        if self.cycles == CycleHandling::Allow || !self.reaches(ancestor, node, link) {
            return Ok(true);
        }
        match self.cycles {
            CycleHandling::Error => Err(ObjectError::WouldCycle { node, ancestor }),
            CycleHandling::Ignore | CycleHandling::Allow => {
                debug!(node = %node, ancestor = %ancestor, "ignored cyclic link");
                Ok(false)
            }
        }
    }

    /// Follows `link` from `start` (inclusive) looking for `target`.
    fn reaches(&self, start: Uid, target: Uid, link: fn(&ObjectNode) -> Option<Uid>) -> bool {
        let mut current = Some(start);
        // Bounded so that graphs built under `Allow` cannot spin forever.
        for _ in 0..=self.nodes.len() {
            let Some(uid) = current else {
                return false;
            };
            if uid == target {
                return true;
            }
            current = self.nodes.get(&uid).and_then(link);
        }
        false
    }

    fn node(&self, uid: Uid) -> Result<&ObjectNode, ObjectError> {
        self.nodes.get(&uid).ok_or(ObjectError::NotFound(uid))
    }

    fn node_mut(&mut self, uid: Uid) -> Result<&mut ObjectNode, ObjectError> {
        self.nodes.get_mut(&uid).ok_or(ObjectError::NotFound(uid))
    }
}
