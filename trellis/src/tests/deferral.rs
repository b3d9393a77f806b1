// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use assert_matches::assert_matches;

use crate::core::{
    ComponentMut, LayoutAlgorithm, LayoutError, NullLayout, OperationOutcome, PrefSizeOptions,
    SurfaceId,
};
use crate::kurbo::Size;
use crate::testing::{FixedLayout, Record, Recording, TestHarness, TestLayoutExt, TestSurface};

/// Starts a transition on `node` during its layout, then validates the children.
struct StartsTransition {
    surface: TestSurface,
    node: SurfaceId,
}

impl LayoutAlgorithm for StartsTransition {
    fn preferred_layout_size(
        &self,
        _ctx: &mut ComponentMut<'_>,
        _hints: &PrefSizeOptions,
    ) -> Result<Size, LayoutError> {
        Ok(Size::ZERO)
    }

    fn layout(&self, ctx: &mut ComponentMut<'_>) -> Result<(), LayoutError> {
        self.surface.start_transition(self.node);
        for child in ctx.children() {
            ctx.component_mut(child)?.validate_layout()?;
        }
        Ok(())
    }
}

/// Builds `document > wrapper > field`, where only `field` has a component.
fn wrapped_field(recording: &Recording) -> (TestHarness, SurfaceId, SurfaceId) {
    let mut harness = TestHarness::new();
    let wrapper = harness.surface().create_child(harness.document());
    let field = harness.add_component(wrapper, FixedLayout::new(10., 10.).record(recording));
    (harness, wrapper, field)
}

#[test]
fn hidden_node_defers_without_retry() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    harness.surface().set_visible(wrapper, false);

    assert_eq!(harness.component_mut(field).validate_layout(), Ok(false));
    assert!(!harness.get(field).is_valid());
    assert!(harness.root().waiting_on_transition(wrapper).is_empty());
    assert!(harness.root().waiting_on_transition(field).is_empty());

    harness.surface().set_visible(wrapper, true);
    assert_eq!(harness.component_mut(field).validate_layout(), Ok(true));
    assert!(harness.get(field).is_valid());
}

#[test]
fn detached_node_defers() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    harness.surface().detach(wrapper);

    assert_eq!(harness.component_mut(field).validate_layout(), Ok(false));
    assert!(recording.is_empty());
}

#[test]
fn transition_end_retries_validation() {
    let recording = Recording::default();
    let mut harness = TestHarness::new();
    let panel = harness.add_component(
        harness.document(),
        FixedLayout::new(10., 10.).record(&recording),
    );
    harness.surface().start_transition(panel);

    assert_eq!(harness.component_mut(panel).validate_layout(), Ok(false));
    assert!(!harness.get(panel).is_valid());
    assert_eq!(harness.root().waiting_on_transition(panel), &[panel]);
    assert!(recording.is_empty());

    harness.end_transition(panel);
    assert!(harness.get(panel).is_valid());
    assert!(harness.root().waiting_on_transition(panel).is_empty());
    assert_eq!(recording.drain(), vec![Record::Layout(panel)]);
}

#[test]
fn ancestor_transition_defers_once() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    harness.surface().start_transition(wrapper);

    assert_eq!(harness.component_mut(field).validate_layout(), Ok(false));
    assert_eq!(harness.component_mut(field).validate_layout(), Ok(false));
    assert_eq!(harness.root().waiting_on_transition(wrapper), &[field]);

    harness.end_transition(wrapper);
    assert!(harness.get(field).is_valid());
    assert_eq!(recording.drain(), vec![Record::Layout(field)]);
}

#[test]
fn operation_retries_even_when_aborted() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    let op = harness.surface().start_operation(wrapper);

    assert_eq!(harness.component_mut(field).validate_layout(), Ok(false));
    assert_eq!(harness.root().waiting_on_operation(op), &[field]);

    harness.complete_operation(wrapper, OperationOutcome::Aborted);
    assert!(harness.get(field).is_valid());
    assert!(harness.root().waiting_on_operation(op).is_empty());
}

#[test]
fn nearest_blocking_ancestor_wins() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    let outer = harness.surface().create_child(harness.document());
    harness.surface().append(outer, wrapper);
    let op = harness.surface().start_operation(outer);
    harness.surface().start_transition(wrapper);

    assert_eq!(harness.component_mut(field).validate_layout(), Ok(false));
    assert_eq!(harness.root().waiting_on_transition(wrapper), &[field]);
    assert!(harness.root().waiting_on_operation(op).is_empty());

    // The operation still blocks the retry, which then waits on the operation.
    harness.end_transition(wrapper);
    assert!(!harness.get(field).is_valid());
    assert_eq!(harness.root().waiting_on_operation(op), &[field]);

    harness.complete_operation(outer, OperationOutcome::Completed);
    assert!(harness.get(field).is_valid());
}

#[test]
fn retry_of_hidden_component_gives_up() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    harness.surface().start_transition(wrapper);
    harness.component_mut(field).validate_layout().unwrap();

    harness.surface().set_visible(field, false);
    harness.end_transition(wrapper);
    assert!(!harness.get(field).is_valid());
    assert!(harness.root().waiting_on_transition(wrapper).is_empty());
    assert!(recording.is_empty());
}

#[test]
fn retry_of_valid_component_is_a_no_op() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    harness.surface().start_transition(wrapper);
    harness.component_mut(field).validate_layout().unwrap();

    // Validated meanwhile, before the host reported the end of the transition.
    harness.surface().end_transition(wrapper);
    assert_eq!(harness.component_mut(field).validate_layout(), Ok(true));
    harness.root_mut().transition_ended(wrapper).unwrap();
    assert_eq!(recording.drain(), vec![Record::Layout(field)]);
}

#[test]
fn uninstall_drops_retries() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    harness.surface().start_transition(wrapper);
    harness.component_mut(field).validate_layout().unwrap();

    harness.root_mut().uninstall(field);
    assert!(harness.root().waiting_on_transition(wrapper).is_empty());
    harness.end_transition(wrapper);
    assert!(recording.is_empty());
}

#[test]
fn retry_removes_component_from_pending_set() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    harness.component_mut(field).invalidate_layout_tree(true);
    harness.surface().start_transition(wrapper);

    harness.validate();
    assert_eq!(harness.pending(), vec![field]);
    assert_eq!(harness.root().waiting_on_transition(wrapper), &[field]);

    harness.end_transition(wrapper);
    assert!(harness.get(field).is_valid());
    assert!(harness.pending().is_empty());
}

#[test]
fn ancestors_are_not_rechecked_during_parent_layout() {
    let recording = Recording::default();
    let mut harness = TestHarness::new();
    let outer = harness.surface().create_child(harness.document());
    let panel = harness.add_component(
        outer,
        StartsTransition {
            surface: harness.surface().clone(),
            node: outer,
        },
    );
    let field = harness.add_component(panel, NullLayout.record(&recording));

    // The parent checked the ancestors before the transition started.
    assert_eq!(harness.component_mut(panel).validate_layout(), Ok(true));
    assert!(harness.get(field).is_valid());

    // Outside of the parent's layout, they are checked.
    assert_eq!(harness.component_mut(field).revalidate_layout(), Ok(false));
    assert_eq!(harness.root().waiting_on_transition(outer), &[field]);
}

#[test]
fn destroyed_node_drops_its_retries() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    harness.surface().start_transition(wrapper);
    assert_eq!(harness.component_mut(field).validate_layout(), Ok(false));
    assert_eq!(harness.root().waiting_on_transition(wrapper), &[field]);

    harness.surface().remove(wrapper);
    harness.validate();
    assert!(harness.root().waiting_on_transition(wrapper).is_empty());
    assert!(!harness.root().is_installed(field));
    assert!(recording.is_empty());
}

#[test]
fn retries_report_first_error() {
    let recording = Recording::default();
    let (mut harness, wrapper, field) = wrapped_field(&recording);
    let other = harness.add_component(wrapper, FixedLayout::new(10., 10.));
    harness.surface().start_transition(wrapper);
    harness.component_mut(field).validate_layout().unwrap();
    harness.component_mut(other).validate_layout().unwrap();
    harness.component_mut(field).remove_layout();

    harness.surface().end_transition(wrapper);
    assert_matches!(
        harness.root_mut().transition_ended(wrapper),
        Err(LayoutError::MissingLayout { surface }) if surface == field
    );
    // Later waiters are still retried.
    assert!(harness.get(other).is_valid());
    assert!(harness.root().waiting_on_transition(wrapper).is_empty());
}
