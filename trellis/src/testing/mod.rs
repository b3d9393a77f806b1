// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Helper tools for writing unit tests.

mod harness;
mod recorder;
mod stack_layout;
mod test_surface;

pub use harness::TestHarness;
pub use recorder::{FailingLayout, FixedLayout, Record, Recording, RecordingLayout};
pub use stack_layout::StackLayout;
pub use test_surface::TestSurface;

use crate::core::LayoutAlgorithm;

/// External trait implemented for all algorithms.
///
/// Implements helper methods useful for unit testing.
pub trait TestLayoutExt: LayoutAlgorithm + Sized + 'static {
    /// Wrap this algorithm in a [`RecordingLayout`] that records all method calls.
    fn record(self, recording: &Recording) -> RecordingLayout<Self> {
        RecordingLayout::new(self, recording)
    }
}

impl<L: LayoutAlgorithm + 'static> TestLayoutExt for L {}
