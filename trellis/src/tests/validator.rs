// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::rc::Rc;

use crate::app::LayoutSignal;
use crate::core::{NullLayout, SurfaceId};
use crate::testing::{Record, Recording, TestHarness, TestLayoutExt};

/// Builds `document > a > b > c`, all with a recorded [`NullLayout`].
fn three_levels(recording: &Recording) -> (TestHarness, [SurfaceId; 3]) {
    let mut harness = TestHarness::new();
    let a = harness.add_component(harness.document(), NullLayout.record(recording));
    let b = harness.add_component(a, NullLayout.record(recording));
    let c = harness.add_component(b, NullLayout.record(recording));
    (harness, [a, b, c])
}

fn layouts(recording: &Recording) -> Vec<SurfaceId> {
    recording
        .drain()
        .into_iter()
        .filter_map(|record| match record {
            Record::Layout(id) => Some(id),
            _ => None,
        })
        .collect()
}

#[test]
fn invalidate_tree_walks_to_the_top() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);

    harness.component_mut(c).invalidate_layout_tree(true);
    assert_eq!(harness.pending(), vec![a]);
    for id in [a, b, c] {
        assert!(!harness.get(id).is_valid());
    }
    // The source is forwarded to every algorithm on the way.
    assert_eq!(recording.drain(), vec![Record::Invalidate(Some(c)); 3]);
}

#[test]
fn validation_is_top_down() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);

    harness.component_mut(c).invalidate_layout_tree(false);
    harness.component_mut(b).invalidate_layout_tree(false);
    harness.component_mut(a).invalidate_layout_tree(false);
    assert_eq!(harness.pending(), vec![a, b, c]);

    harness.validate();
    assert_eq!(layouts(&recording), vec![a, b, c]);
    assert!(harness.pending().is_empty());
    for id in [a, b, c] {
        assert!(harness.get(id).is_valid());
    }
}

#[test]
fn pending_set_keeps_containment_order() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);
    let other = harness.add_component(harness.document(), NullLayout);

    harness.root_mut().invalidate(c);
    harness.root_mut().invalidate(other);
    harness.root_mut().invalidate(a);
    harness.root_mut().invalidate(c);
    harness.root_mut().invalidate(b);
    assert_eq!(harness.pending(), vec![a, b, c, other]);
    assert!(harness.root().validator().is_pending(other));
}

#[test]
fn validate_root_contains_invalidation() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);
    harness.component_mut(b).set_validate_root(true);
    harness.component_mut(a).invalidate_layout_tree(true);
    harness.validate();
    recording.clear();

    harness.component_mut(c).invalidate_layout_tree(true);
    assert_eq!(harness.pending(), vec![b]);
    assert!(harness.get(a).is_valid());
    assert!(!harness.get(b).is_valid());
    assert!(!harness.get(c).is_valid());

    harness.validate();
    assert_eq!(layouts(&recording), vec![b, c]);
}

#[test]
fn validation_requests_are_coalesced() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);

    harness.component_mut(c).invalidate_layout_tree(true);
    harness.component_mut(b).invalidate_layout_tree(true);
    harness.component_mut(c).invalidate_layout_tree(false);
    assert_eq!(harness.take_signals(), vec![LayoutSignal::ValidationRequested]);
    assert!(harness.root().validator().is_validation_scheduled());

    harness.validate();
    assert!(!harness.root().validator().is_validation_scheduled());
    // Each component is laid out once per pass.
    assert_eq!(layouts(&recording), vec![a, b, c]);

    harness.component_mut(c).invalidate_layout_tree(true);
    assert_eq!(harness.take_signals(), vec![LayoutSignal::ValidationRequested]);
}

#[test]
fn run_scheduled_validation_only_when_requested() {
    let recording = Recording::default();
    let (mut harness, [_, _, c]) = three_levels(&recording);

    assert_eq!(harness.root_mut().run_scheduled_validation(), Ok(false));
    harness.component_mut(c).invalidate_layout_tree(true);
    assert_eq!(harness.root_mut().run_scheduled_validation(), Ok(true));
    assert!(harness.get(c).is_valid());
    assert_eq!(harness.root_mut().run_scheduled_validation(), Ok(false));
}

#[test]
fn deferred_components_stay_pending() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);
    let other = harness.add_component(harness.document(), NullLayout);
    harness.component_mut(c).invalidate_layout_tree(true);
    harness.component_mut(other).invalidate_layout_tree(true);
    harness.surface().set_visible(a, false);

    harness.validate();
    assert_eq!(harness.pending(), vec![a]);
    assert!(harness.get(other).is_valid());
    assert!(!harness.get(b).is_valid());

    harness.surface().set_visible(a, true);
    harness.validate();
    assert!(harness.pending().is_empty());
    assert!(harness.get(c).is_valid());
}

#[test]
fn destroyed_surfaces_are_pruned() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);
    harness.component_mut(c).invalidate_layout_tree(false);
    harness.component_mut(b).invalidate_layout_tree(false);
    assert_eq!(harness.pending(), vec![b, c]);

    harness.surface().remove(b);
    // Until the next pass, the leftover component is inert.
    let mut c_mut = harness.component_mut(c);
    assert_eq!(c_mut.validate_layout(), Ok(false));
    assert_eq!(c_mut.parent(), None);
    assert!(!c_mut.is_descendant_of(a));

    harness.validate();
    assert!(harness.pending().is_empty());
    assert!(layouts(&recording).is_empty());
    assert!(harness.root().get(b).is_none());
    assert!(harness.root().get(c).is_none());
    assert_eq!(harness.root().component_count(), 1);
}

#[test]
fn destroyed_nodes_release_their_components() {
    let mut harness = TestHarness::new();
    let document = harness.document();
    let panels: Vec<SurfaceId> = (0..100)
        .map(|_| harness.add_component(document, NullLayout))
        .collect();
    for &panel in &panels {
        harness.component_mut(panel).invalidate_layout_tree(true);
    }
    for &panel in &panels {
        harness.surface().remove(panel);
    }

    harness.validate();
    assert_eq!(harness.root().component_count(), 0);
    assert!(harness.pending().is_empty());
}

#[test]
fn cleanup_drops_components_of_destroyed_nodes() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);
    harness.surface().remove(b);

    harness.root_mut().cleanup_invalid_components(a);
    assert!(harness.root().get(b).is_none());
    assert!(harness.root().get(c).is_none());
    assert!(harness.root().is_installed(a));
}

#[test]
fn uninstalled_components_are_pruned() {
    let recording = Recording::default();
    let (mut harness, [a, _, c]) = three_levels(&recording);
    harness.component_mut(c).invalidate_layout_tree(false);
    harness.root_mut().invalidate(a);
    harness.root_mut().uninstall(a);

    assert_eq!(harness.pending(), vec![c]);
    harness.validate();
    assert!(harness.get(c).is_valid());
}

#[test]
fn post_validate_functions_run_in_order() {
    let recording = Recording::default();
    let (mut harness, [_, _, c]) = three_levels(&recording);
    let calls = Rc::new(RefCell::new(Vec::new()));

    for index in 0..3 {
        let calls = calls.clone();
        harness.root_mut().schedule_post_validate(move |root| {
            calls
                .borrow_mut()
                .push((index, root.get(c).is_some_and(|c| c.is_valid())));
        });
    }
    assert_eq!(harness.root().validator().post_validate_count(), 3);

    harness.component_mut(c).invalidate_layout_tree(true);
    harness.validate();
    assert_eq!(*calls.borrow(), vec![(0, true), (1, true), (2, true)]);
    assert_eq!(harness.root().validator().post_validate_count(), 0);

    // They only run once.
    harness.validate();
    assert_eq!(calls.borrow().len(), 3);
}

#[test]
fn post_validate_function_can_invalidate() {
    let recording = Recording::default();
    let (mut harness, [a, _, c]) = three_levels(&recording);

    harness.root_mut().schedule_post_validate(move |root| {
        if let Ok(mut c) = root.component_mut(c) {
            c.invalidate_layout_tree(true);
        }
    });
    harness.validate();
    assert_eq!(harness.pending(), vec![a]);
    assert!(harness.take_validation_requested());
}

#[test]
fn cleanup_drops_detached_descendants() {
    let recording = Recording::default();
    let (mut harness, [a, b, c]) = three_levels(&recording);
    let other = harness.add_component(harness.document(), NullLayout);
    harness.component_mut(c).invalidate_layout_tree(false);
    harness.component_mut(other).invalidate_layout_tree(false);
    harness.surface().detach(b);

    // Only descendants of the container are considered.
    harness.root_mut().cleanup_invalid_components(other);
    assert_eq!(harness.pending(), vec![c, other]);
    harness.root_mut().cleanup_invalid_components(b);
    assert_eq!(harness.pending(), vec![other]);

    // Attached descendants stay.
    harness.surface().append(a, b);
    harness.component_mut(c).invalidate_layout_tree(false);
    harness.root_mut().cleanup_invalid_components(b);
    assert_eq!(harness.pending(), vec![other, c]);
}
