// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Helper algorithms for writing tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use kurbo::Size;

use crate::core::{ComponentMut, LayoutAlgorithm, LayoutError, PrefSizeOptions, SurfaceId};

/// A wrapper algorithm that records each time one of its methods is called.
///
/// Its intent is to let you observe when Trellis runs an algorithm in a test.
///
/// Make one like this:
///
/// ```
/// use trellis::kurbo::Size;
/// use trellis::testing::{FixedLayout, Record, Recording, TestHarness, TestLayoutExt};
/// use assert_matches::assert_matches;
///
/// let recording = Recording::default();
/// let mut harness = TestHarness::new();
/// let layout = FixedLayout::new(50., 20.).record(&recording);
/// let panel = harness.add_component(harness.document(), layout);
///
/// harness.component_mut(panel).set_size(Size::new(50., 20.)).unwrap();
/// assert_matches!(recording.next(), Some(Record::Invalidate(None)));
/// assert_matches!(recording.next(), Some(Record::Layout(id)) if id == panel);
/// ```
#[derive(Debug)]
pub struct RecordingLayout<L> {
    recording: Recording,
    inner: L,
}

/// A recording of algorithm method calls.
///
/// Internally stores a queue of [`Records`](Record).
#[derive(Debug, Clone, Default)]
pub struct Recording(Rc<RefCell<VecDeque<Record>>>);

/// A recording of a method call on an algorithm.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Preferred size. Records the hints the algorithm received and the size it returned.
    PrefSize(PrefSizeOptions, Size),
    /// Layout of the given component.
    Layout(SurfaceId),
    /// Invalidation, with its source.
    Invalidate(Option<SurfaceId>),
}

impl Recording {
    /// True if no calls have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// The number of calls in the recording.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Clear recorded calls.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Returns the next call in the recording, if one exists.
    ///
    /// This consumes the call.
    pub fn next(&self) -> Option<Record> {
        self.0.borrow_mut().pop_front()
    }

    /// Returns a vec of calls drained from the recording.
    pub fn drain(&self) -> Vec<Record> {
        self.0.borrow_mut().drain(..).collect()
    }

    /// The number of [`Record::Layout`] calls recorded, without consuming anything.
    pub fn layout_count(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|record| matches!(record, Record::Layout(_)))
            .count()
    }

    /// The number of [`Record::PrefSize`] calls recorded, without consuming anything.
    pub fn pref_size_count(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|record| matches!(record, Record::PrefSize(..)))
            .count()
    }

    fn push(&self, record: Record) {
        self.0.borrow_mut().push_back(record);
    }
}

impl<L: LayoutAlgorithm> RecordingLayout<L> {
    /// Wrap an algorithm in a `RecordingLayout` that records all method calls.
    pub fn new(inner: L, recording: &Recording) -> Self {
        Self {
            inner,
            recording: recording.clone(),
        }
    }
}

impl<L: LayoutAlgorithm> LayoutAlgorithm for RecordingLayout<L> {
    fn preferred_layout_size(
        &self,
        ctx: &mut ComponentMut<'_>,
        hints: &PrefSizeOptions,
    ) -> Result<Size, LayoutError> {
        let size = self.inner.preferred_layout_size(ctx, hints)?;
        self.recording.push(Record::PrefSize(*hints, size));
        Ok(size)
    }

    fn layout(&self, ctx: &mut ComponentMut<'_>) -> Result<(), LayoutError> {
        self.recording.push(Record::Layout(ctx.id()));
        self.inner.layout(ctx)
    }

    fn invalidate(&self, source: Option<SurfaceId>) {
        self.recording.push(Record::Invalidate(source));
        self.inner.invalidate(source);
    }

    fn css_class(&self) -> Option<&str> {
        self.inner.css_class()
    }

    fn short_type_name(&self) -> &'static str {
        self.inner.short_type_name()
    }
}

/// An algorithm with a fixed preferred size, which ignores hints and children.
#[derive(Clone, Copy, Debug)]
pub struct FixedLayout {
    size: Size,
    css_class: Option<&'static str>,
}

impl FixedLayout {
    /// Create an algorithm whose preferred size is always `width` by `height`.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Size::new(width, height),
            css_class: None,
        }
    }

    /// Builder-style method to set the class applied on installation.
    pub fn with_css_class(mut self, class: &'static str) -> Self {
        self.css_class = Some(class);
        self
    }
}

impl LayoutAlgorithm for FixedLayout {
    fn preferred_layout_size(
        &self,
        _ctx: &mut ComponentMut<'_>,
        _hints: &PrefSizeOptions,
    ) -> Result<Size, LayoutError> {
        Ok(self.size)
    }

    fn layout(&self, _ctx: &mut ComponentMut<'_>) -> Result<(), LayoutError> {
        Ok(())
    }

    fn css_class(&self) -> Option<&str> {
        self.css_class
    }
}

/// An algorithm that always fails with [`LayoutError::MissingLayout`] for its component.
///
/// Stands in for an algorithm error.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingLayout;

impl LayoutAlgorithm for FailingLayout {
    fn preferred_layout_size(
        &self,
        ctx: &mut ComponentMut<'_>,
        _hints: &PrefSizeOptions,
    ) -> Result<Size, LayoutError> {
        Err(LayoutError::MissingLayout { surface: ctx.id() })
    }

    fn layout(&self, ctx: &mut ComponentMut<'_>) -> Result<(), LayoutError> {
        Err(LayoutError::MissingLayout { surface: ctx.id() })
    }
}
