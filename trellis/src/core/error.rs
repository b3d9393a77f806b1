// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::core::SurfaceId;

/// Errors reported by component operations.
///
/// These all indicate a programming error in the caller. Deferred validation
/// is not an error: it is reported as `Ok(false)`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The component has no layout algorithm.
    #[error("component {surface} has no layout algorithm")]
    MissingLayout {
        /// The node the component manages.
        surface: SurfaceId,
    },
    /// The surface node has no component installed.
    #[error("surface node {surface} has no component installed")]
    NotInstalled {
        /// The node which was looked up.
        surface: SurfaceId,
    },
}
