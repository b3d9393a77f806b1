// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use hashbrown::HashMap;
use tracing::{debug, info_span};

use crate::app::{LayoutValidator, PassTracing};
use crate::core::{
    ComponentMut, HtmlComponent, LayoutError, OperationId, OperationOutcome, Surface,
    SurfaceChildren, SurfaceId,
};
use crate::passes::defer::{Deferrals, run_operation_completed, run_transition_ended};
use crate::passes::invalidate::{register_invalid, run_invalidate_tree};
use crate::passes::validate::run_validate_pass;

/// The layout context of one independent UI root.
///
/// It owns:
/// - the rendered [`Surface`] (shared with the host however the host likes),
/// - the side table linking surface nodes to their [`HtmlComponent`],
/// - the [`LayoutValidator`] holding the components owed a validation,
/// - the continuations of deferred validations.
///
/// Several roots can coexist without interacting with each other.
///
/// The host is expected to:
/// - call [`validate`](Self::validate) (or
///   [`run_scheduled_validation`](Self::run_scheduled_validation)) at its next opportunity
///   after it received [`LayoutSignal::ValidationRequested`];
/// - call [`transition_ended`](Self::transition_ended) and
///   [`operation_completed`](Self::operation_completed) when the blocking conditions reported
///   by its surface clear.
pub struct LayoutRoot {
    pub(crate) surface: Box<dyn Surface>,
    pub(crate) components: HashMap<SurfaceId, HtmlComponent>,
    pub(crate) validator: LayoutValidator,
    pub(crate) deferrals: Deferrals,
    pub(crate) trace: PassTracing,
    /// Sink for signals to be processed by the host.
    pub(crate) signal_sink: Box<dyn FnMut(LayoutSignal)>,
}

/// Options for creating a [`LayoutRoot`].
#[derive(Clone, Debug)]
pub struct LayoutRootOptions {
    /// Which operations emit a span per component.
    ///
    /// Defaults to the value of the `TRELLIS_TRACE_PASSES` environment variable.
    pub trace: PassTracing,
}

impl Default for LayoutRootOptions {
    fn default() -> Self {
        Self {
            trace: PassTracing::from_env(),
        }
    }
}

/// Objects emitted by the [`LayoutRoot`] to request external actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutSignal {
    /// Components were invalidated and a validation pass should run at the next opportunity.
    ///
    /// Emitted once per pass, however many invalidations happen before it runs.
    ValidationRequested,
}

impl LayoutRoot {
    /// Creates a root for the given surface.
    ///
    /// `signal_sink` receives the [`LayoutSignal`]s emitted by this root.
    pub fn new(
        surface: impl Surface + 'static,
        options: LayoutRootOptions,
        signal_sink: impl FnMut(LayoutSignal) + 'static,
    ) -> Self {
        let LayoutRootOptions { trace } = options;
        Self {
            surface: Box::new(surface),
            components: HashMap::new(),
            validator: LayoutValidator::new(),
            deferrals: Deferrals::default(),
            trace,
            signal_sink: Box::new(signal_sink),
        }
    }

    // --- MARK: COMPONENTS

    /// Creates a component for the surface node `id` and links them.
    ///
    /// An existing component of that node is replaced.
    pub fn install(&mut self, id: SurfaceId) -> ComponentMut<'_> {
        if self.components.contains_key(&id) {
            debug!(surface = id.trace(), "Replacing installed component");
            self.forget(id);
        }
        self.components.insert(id, HtmlComponent::new(id));
        ComponentMut { root: self, id }
    }

    /// Removes the component of the surface node `id`, if any.
    ///
    /// The component is also removed from the pending set and from all deferred retries.
    pub fn uninstall(&mut self, id: SurfaceId) -> Option<HtmlComponent> {
        let component = self.components.remove(&id)?;
        self.forget(id);
        Some(component)
    }

    fn forget(&mut self, id: SurfaceId) {
        self.validator.remove(id);
        self.deferrals.remove_waiter(id);
    }

    /// Drops the components whose node the surface doesn't contain anymore, and the
    /// retries waiting on a transition of such a node.
    ///
    /// A destroyed node never reports the end of its transition, so those would leak.
    pub(crate) fn drop_destroyed_components(&mut self) {
        let destroyed: Vec<SurfaceId> = self
            .components
            .keys()
            .copied()
            .filter(|&id| !self.surface.contains(id))
            .collect();
        for id in destroyed {
            debug!(surface = id.trace(), "Dropping component of destroyed node");
            self.components.remove(&id);
            self.forget(id);
        }
        let surface = &self.surface;
        self.deferrals.retain_transitions(|node| surface.contains(node));
    }

    /// Returns the component of the surface node `id`, or `None` if there is none.
    pub fn get(&self, id: SurfaceId) -> Option<&HtmlComponent> {
        self.components.get(&id)
    }

    /// Returns a handle to the component of the surface node `id`.
    ///
    /// # Errors
    ///
    /// [`LayoutError::NotInstalled`] if the node has no component.
    pub fn component_mut(&mut self, id: SurfaceId) -> Result<ComponentMut<'_>, LayoutError> {
        if !self.components.contains_key(&id) {
            return Err(LayoutError::NotInstalled { surface: id });
        }
        Ok(ComponentMut { root: self, id })
    }

    /// Returns `true` if the surface node `id` has a component.
    pub fn is_installed(&self, id: SurfaceId) -> bool {
        self.components.contains_key(&id)
    }

    /// The number of installed components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Read access to the surface.
    pub fn surface(&self) -> &dyn Surface {
        &*self.surface
    }

    /// Write access to the surface.
    ///
    /// Changing the surface doesn't invalidate anything by itself.
    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    // --- MARK: CONTAINMENT

    /// Returns the component of the nearest ancestor node that has one.
    ///
    /// This is resolved on every call by walking the surface. It returns `None` for
    /// components at the top of the tree and for detached nodes.
    pub fn parent_of(&self, id: SurfaceId) -> Option<SurfaceId> {
        let mut node = self.surface.parent(id);
        while let Some(current) = node {
            if self.components.contains_key(&current) {
                return Some(current);
            }
            node = self.surface.parent(current);
        }
        None
    }

    /// Returns `true` if the component `ancestor` manages a node containing `id`.
    pub fn is_descendant_of(&self, id: SurfaceId, ancestor: SurfaceId) -> bool {
        if !self.components.contains_key(&ancestor) {
            return false;
        }
        let mut node = self.surface.parent(id);
        while let Some(current) = node {
            if current == ancestor {
                return true;
            }
            node = self.surface.parent(current);
        }
        false
    }

    /// Returns the components whose [parent](Self::parent_of) is `id`, in document order.
    pub fn child_components(&self, id: SurfaceId) -> SurfaceChildren {
        let mut result = SurfaceChildren::new();
        let mut stack: SurfaceChildren = self.surface.children(id).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if self.components.contains_key(&node) {
                result.push(node);
            } else {
                stack.extend(self.surface.children(node).into_iter().rev());
            }
        }
        result
    }

    // --- MARK: VALIDATOR

    /// The dirty-set of this root.
    pub fn validator(&self) -> &LayoutValidator {
        &self.validator
    }

    /// Invalidates `id` and its ancestors up to the nearest validate root (included),
    /// and registers the last invalidated component for the next pass.
    pub fn invalidate_tree(&mut self, id: SurfaceId) {
        run_invalidate_tree(self, id);
    }

    /// Registers exactly `id` for the next pass, without walking its ancestors.
    ///
    /// This doesn't invalidate the component itself.
    pub fn invalidate(&mut self, id: SurfaceId) {
        register_invalid(self, id);
    }

    /// Runs a validation pass over the pending components, ancestors first.
    ///
    /// Components that cannot be validated yet stay pending. Functions queued with
    /// [`schedule_post_validate`](Self::schedule_post_validate) run at the end of the pass.
    ///
    /// # Errors
    ///
    /// [`LayoutError::MissingLayout`] if a component has no algorithm. The rest of the pass is
    /// skipped and the remaining components stay pending.
    pub fn validate(&mut self) -> Result<(), LayoutError> {
        run_validate_pass(self)
    }

    /// Runs [`validate`](Self::validate) if a pass has been requested since the last one.
    ///
    /// Returns whether a pass ran.
    pub fn run_scheduled_validation(&mut self) -> Result<bool, LayoutError> {
        if !self.validator.validation_scheduled {
            return Ok(false);
        }
        self.validate()?;
        Ok(true)
    }

    /// Queues `f` to run at the end of the next validation pass.
    pub fn schedule_post_validate(&mut self, f: impl FnOnce(&mut Self) + 'static) {
        self.validator.post_validate_fns.push_back(Box::new(f));
    }

    /// Removes pending components below `container` whose nodes have been detached.
    ///
    /// Hosts call this after removing a part of the surface, so the pending set
    /// doesn't keep components that won't be validated again. Components of destroyed
    /// nodes are dropped altogether.
    pub fn cleanup_invalid_components(&mut self, container: SurfaceId) {
        let _span =
            info_span!("cleanup_invalid_components", container = container.trace()).entered();
        self.drop_destroyed_components();
        let pending = std::mem::take(&mut self.validator.invalid_components);
        let kept = pending
            .into_iter()
            .filter(|&id| {
                let remove =
                    self.surface_descends_from(id, container) && !self.surface.is_attached(id);
                if remove {
                    debug!(surface = id.trace(), "Dropping detached pending component");
                }
                !remove
            })
            .collect();
        self.validator.invalid_components = kept;
    }

    fn surface_descends_from(&self, id: SurfaceId, container: SurfaceId) -> bool {
        let mut node = self.surface.parent(id);
        while let Some(current) = node {
            if current == container {
                return true;
            }
            node = self.surface.parent(current);
        }
        false
    }

    // --- MARK: DEFERRALS

    /// Reports that the transition running on the surface node `id` has ended.
    ///
    /// Every validation deferred because of that transition is retried once.
    ///
    /// # Errors
    ///
    /// The first error returned by a retried validation. All retries are attempted.
    pub fn transition_ended(&mut self, id: SurfaceId) -> Result<(), LayoutError> {
        run_transition_ended(self, id)
    }

    /// Reports that the external operation `op` has settled.
    ///
    /// Every validation deferred because of that operation is retried once,
    /// whatever the `outcome`.
    ///
    /// # Errors
    ///
    /// The first error returned by a retried validation. All retries are attempted.
    pub fn operation_completed(
        &mut self,
        op: OperationId,
        outcome: OperationOutcome,
    ) -> Result<(), LayoutError> {
        run_operation_completed(self, op, outcome)
    }

    /// The components waiting for the transition on `id` to end.
    pub fn waiting_on_transition(&self, id: SurfaceId) -> &[SurfaceId] {
        self.deferrals.transition_waiters(id)
    }

    /// The components waiting for the operation `op` to settle.
    pub fn waiting_on_operation(&self, op: OperationId) -> &[SurfaceId] {
        self.deferrals.operation_waiters(op)
    }

    // --- MARK: SIGNALS

    /// Sends a signal to the host.
    pub(crate) fn emit_signal(&mut self, signal: LayoutSignal) {
        (self.signal_sink)(signal);
    }
}

impl fmt::Debug for LayoutRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutRoot")
            .field("components", &self.components.len())
            .field("validator", &self.validator)
            .field("deferrals", &self.deferrals)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}
