// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Trellis is the layout validity engine of a retained-mode UI toolkit.
//!
//! Widgets are backed by nodes of a rendered [`Surface`][core::Surface], and each
//! node that needs programmatic layout gets an [`HtmlComponent`][core::HtmlComponent].
//! Trellis does not know how to arrange anything by itself: arrangement math lives in
//! [`LayoutAlgorithm`][core::LayoutAlgorithm] implementations supplied by widgets.
//! What Trellis provides is the protocol all such algorithms obey:
//!
//! - Invalidation happens bottom-up. When a component changes, it and its ancestors up to
//!   the nearest validate root are marked invalid, and their preferred-size caches are purged.
//! - Validation happens top-down. The [`LayoutValidator`][app::LayoutValidator] coalesces
//!   all invalidations into a single pass which lays out the outermost dirty components
//!   first; their algorithms assign sizes to children, which validates the children in turn.
//! - Preferred sizes are cached per component, keyed by the hints the caller passed.
//! - Validation is deferred while a node is invisible, detached, or under a running
//!   transition or external operation. In the last two cases a retry is registered and
//!   fires once the host reports that the blocking condition has cleared.
//!
//! The entry point is [`LayoutRoot`][app::LayoutRoot]: one per independent UI root.
//! Components are manipulated through [`ComponentMut`][core::ComponentMut] handles.
//!
//! ```
//! use trellis::app::{LayoutRoot, LayoutRootOptions};
//! use trellis::kurbo::Size;
//! use trellis::testing::TestSurface;
//!
//! let surface = TestSurface::new();
//! let body = surface.document();
//! let panel = surface.create_child(body);
//!
//! let mut root = LayoutRoot::new(surface.clone(), LayoutRootOptions::default(), |_| {});
//! root.install(panel);
//!
//! let mut panel = root.component_mut(panel).unwrap();
//! panel.set_size(Size::new(200., 100.)).unwrap();
//! assert!(panel.state().is_valid());
//! ```
//!
//! # Environment variables
//!
//! - `RUST_LOG`: filter used by [`try_init_tracing`][app::try_init_tracing].
//! - `TRELLIS_TRACE_PASSES`: enables per-component spans for the listed passes.
//!   See [`PassTracing`][app::PassTracing].

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use kurbo;

#[macro_use]
pub mod util;

mod passes;

pub mod app;
pub mod core;
pub mod testing;

#[cfg(test)]
mod tests;
