// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Deferral of validations while a node is invisible, detached, or blocked by a
//! transition or an external operation.
//!
//! Sizes measured during a transition are wrong, so validating then would cache
//! garbage. Instead of blocking, a deferred validation registers a one-shot
//! continuation keyed on the blocking condition, and returns `false`. When the host
//! reports that the condition cleared, the continuation calls
//! [`ComponentMut::validate_layout`] again, which re-checks everything from the top:
//! the node may have become invisible in the meantime, or may have been validated
//! by another pass already.

use std::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{info_span, trace};

use crate::app::LayoutRoot;
use crate::core::{ComponentMut, LayoutError, OperationId, OperationOutcome, SurfaceId};

type Waiters = SmallVec<[SurfaceId; 4]>;

/// What keeps a validation from running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Blocker {
    /// The node is invisible or detached. No retry is registered: whoever makes the node
    /// visible again invalidates it.
    Hidden,
    /// A transition runs on the given node.
    Transition(SurfaceId),
    /// The given operation hasn't settled.
    Operation(OperationId),
}

/// The pending continuations of deferred validations.
#[derive(Default)]
pub(crate) struct Deferrals {
    transitions: HashMap<SurfaceId, Waiters>,
    operations: HashMap<OperationId, Waiters>,
}

impl Deferrals {
    fn register(&mut self, blocker: Blocker, waiter: SurfaceId) {
        let waiters = match blocker {
            Blocker::Hidden => return,
            Blocker::Transition(node) => self.transitions.entry(node).or_default(),
            Blocker::Operation(op) => self.operations.entry(op).or_default(),
        };
        // A single retry is enough: the second one would return immediately.
        if !waiters.contains(&waiter) {
            waiters.push(waiter);
        }
    }

    pub(crate) fn transition_waiters(&self, node: SurfaceId) -> &[SurfaceId] {
        self.transitions
            .get(&node)
            .map(|waiters| waiters.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn operation_waiters(&self, op: OperationId) -> &[SurfaceId] {
        self.operations
            .get(&op)
            .map(|waiters| waiters.as_slice())
            .unwrap_or_default()
    }

    /// Drops the transition retries keyed on nodes for which `keep` returns `false`.
    pub(crate) fn retain_transitions(&mut self, mut keep: impl FnMut(SurfaceId) -> bool) {
        self.transitions.retain(|&node, _| keep(node));
    }

    /// Drops every continuation of `waiter`.
    pub(crate) fn remove_waiter(&mut self, waiter: SurfaceId) {
        for waiters in self.transitions.values_mut() {
            waiters.retain(|&mut id| id != waiter);
        }
        for waiters in self.operations.values_mut() {
            waiters.retain(|&mut id| id != waiter);
        }
        self.transitions.retain(|_, waiters| !waiters.is_empty());
        self.operations.retain(|_, waiters| !waiters.is_empty());
    }
}

impl fmt::Debug for Deferrals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferrals")
            .field("transitions", &self.transitions.len())
            .field("operations", &self.operations.len())
            .finish()
    }
}

// --- MARK: CHECK
/// Finds what blocks the validation of `id`, if anything.
///
/// Checks the node itself, then its ancestors up to the top of the surface, stopping at the
/// first blocking ancestor. The ancestor scan is skipped if the parent component is being
/// laid out: its own validation already scanned the same ancestors in this pass.
pub(crate) fn find_blocker(root: &LayoutRoot, id: SurfaceId) -> Option<Blocker> {
    let surface = &*root.surface;
    if !surface.is_attached(id) || !surface.is_visible(id) {
        return Some(Blocker::Hidden);
    }
    if surface.has_transition(id) {
        return Some(Blocker::Transition(id));
    }
    if let Some(op) = surface.pending_operation(id) {
        return Some(Blocker::Operation(op));
    }

    let parent_layouting = root
        .parent_of(id)
        .and_then(|parent| root.components.get(&parent))
        .is_some_and(|parent| parent.layouting);
    if parent_layouting {
        return None;
    }

    let mut ancestor = surface.parent(id);
    while let Some(node) = ancestor {
        if !surface.is_visible(node) {
            return Some(Blocker::Hidden);
        }
        if surface.has_transition(node) {
            return Some(Blocker::Transition(node));
        }
        if let Some(op) = surface.pending_operation(node) {
            return Some(Blocker::Operation(op));
        }
        ancestor = surface.parent(node);
    }
    None
}

/// Returns `true` if `id` can be validated now.
///
/// Otherwise, registers a retry when the blocker is a transition or an operation.
pub(crate) fn check_validation_possible(root: &mut LayoutRoot, id: SurfaceId) -> bool {
    let Some(blocker) = find_blocker(root, id) else {
        return true;
    };
    if root.trace.defer {
        trace!(surface = id.trace(), ?blocker, "Deferring validation");
    }
    root.deferrals.register(blocker, id);
    false
}

// --- MARK: RETRY
pub(crate) fn run_transition_ended(
    root: &mut LayoutRoot,
    node: SurfaceId,
) -> Result<(), LayoutError> {
    let Some(waiters) = root.deferrals.transitions.remove(&node) else {
        return Ok(());
    };
    let _span = info_span!("transition_ended", node = node.trace()).entered();
    retry_validation(root, waiters)
}

pub(crate) fn run_operation_completed(
    root: &mut LayoutRoot,
    op: OperationId,
    outcome: OperationOutcome,
) -> Result<(), LayoutError> {
    let Some(waiters) = root.deferrals.operations.remove(&op) else {
        return Ok(());
    };
    let _span = info_span!("operation_completed", %op, ?outcome).entered();
    retry_validation(root, waiters)
}

fn retry_validation(root: &mut LayoutRoot, waiters: Waiters) -> Result<(), LayoutError> {
    let mut result = Ok(());
    for id in waiters {
        if !root.components.contains_key(&id) {
            continue;
        }
        if root.trace.defer {
            trace!(surface = id.trace(), "Retrying deferred validation");
        }
        match (ComponentMut { root: &mut *root, id }).validate_layout() {
            // Nothing left to do for the next pass.
            Ok(true) => root.validator.remove(id),
            Ok(false) => {}
            Err(err) => {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
    }
    result
}
