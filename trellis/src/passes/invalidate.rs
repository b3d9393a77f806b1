// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Bottom-up invalidation, and registration of components in the pending set.

use tracing::{info_span, trace};

use crate::app::{LayoutRoot, LayoutSignal};
use crate::core::SurfaceId;
use crate::debug_panic;

// --- MARK: INVALIDATE TREE
/// Invalidates `id` and every ancestor component up to the nearest validate root.
///
/// The walk includes the validate root itself, and stops at the top of the tree if there
/// is none. The last invalidated component is registered for the next pass.
pub(crate) fn run_invalidate_tree(root: &mut LayoutRoot, id: SurfaceId) {
    let _span = root
        .trace
        .invalidate
        .then(|| info_span!("invalidate_tree", source = id.trace()).entered());

    if !root.components.contains_key(&id) {
        debug_panic!("Cannot invalidate tree of {id}: no component installed");
        return;
    }

    let source = id;
    let mut current = id;
    let validate_root = loop {
        // `parent_of` only yields installed components.
        let Some(component) = root.components.get_mut(&current) else {
            break current;
        };
        component.invalidate(Some(source));
        if component.is_validate_root() {
            break current;
        }
        match root.parent_of(current) {
            Some(parent) => current = parent,
            None => break current,
        }
    };

    if root.trace.invalidate {
        trace!(validate_root = validate_root.trace(), "Invalidated tree");
    }
    register_invalid(root, validate_root);
}

// --- MARK: REGISTER
/// Adds `id` to the pending set of the validator, keeping containment order,
/// and requests a pass if none is scheduled.
pub(crate) fn register_invalid(root: &mut LayoutRoot, id: SurfaceId) {
    if !root.validator.is_pending(id) {
        // Components are grouped by hierarchy: an ancestor must be validated before its
        // descendants, so it goes right before the first pending descendant.
        let position = root
            .validator
            .invalid_components
            .iter()
            .position(|&pending| root.is_descendant_of(pending, id))
            .unwrap_or(root.validator.invalid_components.len());
        root.validator.invalid_components.insert(position, id);
    }
    schedule_validation(root);
}

fn schedule_validation(root: &mut LayoutRoot) {
    if root.validator.validation_scheduled {
        return;
    }
    root.validator.validation_scheduled = true;
    root.emit_signal(LayoutSignal::ValidationRequested);
}
