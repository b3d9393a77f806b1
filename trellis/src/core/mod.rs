// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Basic types and traits Trellis is built on.

mod component;
mod component_mut;
mod error;
mod layout;
mod pref_size_cache;
mod surface;

pub use component::HtmlComponent;
pub use component_mut::ComponentMut;
pub use error::LayoutError;
pub use layout::{LayoutAlgorithm, LayoutData, NullLayout, PrefSizeOptions};
pub use pref_size_cache::PrefSizeKey;
pub use surface::{OperationId, OperationOutcome, Surface, SurfaceChildren, SurfaceId};

pub(crate) use pref_size_cache::PrefSizeCache;
