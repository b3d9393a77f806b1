// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;
use std::fmt;

use crate::app::LayoutRoot;
use crate::core::SurfaceId;

/// A function run once at the end of the next validation pass.
pub type PostValidateFn = Box<dyn FnOnce(&mut LayoutRoot)>;

/// The dirty-set of one [`LayoutRoot`].
///
/// The validator keeps the components which owe a validation: usually validate roots
/// (or top-level components) reached by a tree invalidation. It guarantees that:
///
/// - Invalidations are coalesced: any number of them between two passes schedule a
///   single pass, signalled with [`LayoutSignal::ValidationRequested`].
/// - The pending list is ordered by containment: a component is always placed before its
///   pending descendants, so a pass validates ancestors first.
/// - Components that could not be validated (invisible, detached, animating) stay pending.
///
/// The operations are exposed on [`LayoutRoot`]: [`invalidate_tree`], [`invalidate`]
/// and [`validate`].
///
/// [`LayoutSignal::ValidationRequested`]: crate::app::LayoutSignal::ValidationRequested
/// [`invalidate_tree`]: LayoutRoot::invalidate_tree
/// [`invalidate`]: LayoutRoot::invalidate
/// [`validate`]: LayoutRoot::validate
#[derive(Default)]
pub struct LayoutValidator {
    pub(crate) invalid_components: Vec<SurfaceId>,
    pub(crate) validation_scheduled: bool,
    pub(crate) post_validate_fns: VecDeque<PostValidateFn>,
}

impl LayoutValidator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The components waiting for the next pass, in validation order.
    pub fn invalid_components(&self) -> &[SurfaceId] {
        &self.invalid_components
    }

    /// Returns `true` if `id` is waiting for the next pass.
    pub fn is_pending(&self, id: SurfaceId) -> bool {
        self.invalid_components.contains(&id)
    }

    /// Returns `true` if a pass has been requested and hasn't run yet.
    pub fn is_validation_scheduled(&self) -> bool {
        self.validation_scheduled
    }

    /// The number of functions queued with [`LayoutRoot::schedule_post_validate`].
    pub fn post_validate_count(&self) -> usize {
        self.post_validate_fns.len()
    }

    pub(crate) fn remove(&mut self, id: SurfaceId) {
        self.invalid_components.retain(|&pending| pending != id);
    }
}

impl fmt::Debug for LayoutValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutValidator")
            .field("invalid_components", &self.invalid_components)
            .field("validation_scheduled", &self.validation_scheduled)
            .field("post_validate_fns", &self.post_validate_fns.len())
            .finish()
    }
}
