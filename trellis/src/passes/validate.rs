// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! The validation pass, which lays out the pending components top-down.
//! Most of the logic for this pass happens in [`LayoutAlgorithm::layout`] implementations,
//! which validate the children they resize.
//!
//! [`LayoutAlgorithm::layout`]: crate::core::LayoutAlgorithm::layout

use tracing::{debug, info_span, trace};

use crate::app::LayoutRoot;
use crate::core::{ComponentMut, LayoutError};

// --- MARK: ROOT
/// Validates the pending components in order, then runs the post-validate functions.
pub(crate) fn run_validate_pass(root: &mut LayoutRoot) -> Result<(), LayoutError> {
    let _span = info_span!("validate").entered();
    root.validator.validation_scheduled = false;

    root.drop_destroyed_components();

    // Layouts may invalidate other components during the pass, which changes the pending list.
    let pending = root.validator.invalid_components.clone();
    trace!(count = pending.len(), "Validating pending components");
    for id in pending {
        if !root.components.contains_key(&id) {
            continue;
        }
        let validated = ComponentMut { root: &mut *root, id }.validate_layout()?;
        if validated {
            root.validator.remove(id);
        } else if root.trace.validate {
            trace!(surface = id.trace(), "Validation deferred, keeping component pending");
        }
    }

    let post_validate_fns = std::mem::take(&mut root.validator.post_validate_fns);
    if !post_validate_fns.is_empty() {
        debug!(count = post_validate_fns.len(), "Running post-validate functions");
    }
    for f in post_validate_fns {
        f(root);
    }
    Ok(())
}
