// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Rect, Size};

use crate::app::{
    LayoutRoot, LayoutRootOptions, LayoutSignal, PassTracing, try_init_test_tracing,
};
use crate::core::{
    ComponentMut, HtmlComponent, LayoutAlgorithm, LayoutError, OperationOutcome, Surface,
    SurfaceId,
};
use crate::testing::TestSurface;

/// A safe headless environment to test layout validity.
///
/// `TestHarness` bundles a [`LayoutRoot`] with the [`TestSurface`] it lays out,
/// and collects the [`LayoutSignal`]s the root emits.
///
/// Nothing runs on its own: like a host that never yields to its event loop, the test
/// decides when a requested validation pass runs, with [`validate`](Self::validate),
/// and when blocking conditions clear, with [`end_transition`](Self::end_transition)
/// and [`complete_operation`](Self::complete_operation).
///
/// ```
/// use trellis::kurbo::Rect;
/// use trellis::testing::{FixedLayout, StackLayout, TestHarness};
///
/// let mut harness = TestHarness::new();
/// let panel = harness.add_component(harness.document(), StackLayout::new());
/// let field = harness.add_component(panel, FixedLayout::new(80., 20.));
/// harness.set_bounds(panel, Rect::new(0., 0., 100., 100.));
///
/// harness.component_mut(field).invalidate_layout_tree(true);
/// assert!(harness.take_validation_requested());
/// harness.validate();
/// assert!(harness.get(field).is_valid());
/// ```
pub struct TestHarness {
    surface: TestSurface,
    root: LayoutRoot,
    signals: Rc<RefCell<Vec<LayoutSignal>>>,
}

impl TestHarness {
    /// Builds a harness with an empty surface.
    ///
    /// Pass tracing is fully enabled, so that traced code paths are exercised too.
    pub fn new() -> Self {
        Self::with_options(LayoutRootOptions {
            trace: PassTracing::unit(true),
        })
    }

    /// Builds a harness with the given root options.
    pub fn with_options(options: LayoutRootOptions) -> Self {
        let _ = try_init_test_tracing();

        let surface = TestSurface::new();
        let signals = Rc::new(RefCell::new(Vec::new()));
        let root = {
            let signals = signals.clone();
            LayoutRoot::new(surface.clone(), options, move |signal| {
                signals.borrow_mut().push(signal);
            })
        };
        Self {
            surface,
            root,
            signals,
        }
    }

    // --- MARK: SURFACE

    /// The surface, to inspect or mutate nodes directly.
    pub fn surface(&self) -> &TestSurface {
        &self.surface
    }

    /// The document node of the surface.
    pub fn document(&self) -> SurfaceId {
        self.surface.document()
    }

    /// Creates a node under `parent` and installs a component with the given algorithm.
    pub fn add_component(
        &mut self,
        parent: SurfaceId,
        layout: impl LayoutAlgorithm + 'static,
    ) -> SurfaceId {
        let id = self.surface.create_child(parent);
        self.root.install(id).set_layout(layout);
        id
    }

    /// Sets the bounds of a node directly, without touching its component.
    pub fn set_bounds(&mut self, id: SurfaceId, bounds: Rect) {
        self.surface.set_bounds(id, bounds);
    }

    /// The current size of a node.
    pub fn size(&self, id: SurfaceId) -> Size {
        self.surface.size(id, true)
    }

    /// The current bounds of a node.
    pub fn bounds(&self, id: SurfaceId) -> Rect {
        self.surface.bounds(id)
    }

    // --- MARK: ROOT

    /// The layout root.
    pub fn root(&self) -> &LayoutRoot {
        &self.root
    }

    /// Mutable access to the layout root.
    pub fn root_mut(&mut self) -> &mut LayoutRoot {
        &mut self.root
    }

    /// The component of `id`.
    ///
    /// # Panics
    ///
    /// If `id` has no component.
    #[track_caller]
    pub fn get(&self, id: SurfaceId) -> &HtmlComponent {
        self.root
            .get(id)
            .unwrap_or_else(|| panic!("no component installed for {id}"))
    }

    /// A handle to the component of `id`.
    ///
    /// # Panics
    ///
    /// If `id` has no component.
    #[track_caller]
    pub fn component_mut(&mut self, id: SurfaceId) -> ComponentMut<'_> {
        self.root
            .component_mut(id)
            .unwrap_or_else(|err| panic!("cannot access component: {err}"))
    }

    /// The pending components, in validation order.
    pub fn pending(&self) -> Vec<SurfaceId> {
        self.root.validator().invalid_components().to_vec()
    }

    /// Runs a validation pass.
    ///
    /// # Panics
    ///
    /// If the pass fails.
    #[track_caller]
    pub fn validate(&mut self) {
        if let Err(err) = self.root.validate() {
            panic!("validation pass failed: {err}");
        }
    }

    /// Runs a validation pass, returning its result.
    pub fn try_validate(&mut self) -> Result<(), LayoutError> {
        self.root.validate()
    }

    // --- MARK: SIGNALS

    /// Drains the signals emitted so far.
    pub fn take_signals(&mut self) -> Vec<LayoutSignal> {
        std::mem::take(&mut *self.signals.borrow_mut())
    }

    /// Drains the signals emitted so far, returning whether a validation was requested.
    pub fn take_validation_requested(&mut self) -> bool {
        self.take_signals()
            .iter()
            .any(|signal| *signal == LayoutSignal::ValidationRequested)
    }

    // --- MARK: DEFERRALS

    /// Clears the transition mark of `id` and reports it to the root, like a host would
    /// at the end of an animation.
    #[track_caller]
    pub fn end_transition(&mut self, id: SurfaceId) {
        self.surface.end_transition(id);
        if let Err(err) = self.root.transition_ended(id) {
            panic!("retrying deferred validations failed: {err}");
        }
    }

    /// Clears the operation mark of `id` and reports the operation as settled.
    ///
    /// Does nothing if `id` wasn't waiting on an operation.
    #[track_caller]
    pub fn complete_operation(&mut self, id: SurfaceId, outcome: OperationOutcome) {
        let Some(op) = self.surface.clear_operation(id) else {
            return;
        };
        if let Err(err) = self.root.operation_completed(op, outcome) {
            panic!("retrying deferred validations failed: {err}");
        }
    }
}

impl std::fmt::Debug for TestHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHarness")
            .field("root", &self.root)
            .field("signals", &self.signals.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
