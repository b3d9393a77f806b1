// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::any::type_name;

use kurbo::Size;

use crate::core::{ComponentMut, LayoutError, SurfaceId};

/// Options of [`ComponentMut::pref_size`].
///
/// A `bool` converts into options with only [`include_margin`](Self::include_margin) set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrefSizeOptions {
    /// Whether to include the margin in the returned size. Defaults to `false`.
    pub include_margin: bool,
    /// Available width, margin included unless [`remove_margin_from_hints`](Self::remove_margin_from_hints)
    /// is false. Margin and insets are removed before the hint reaches the algorithm.
    pub width_hint: Option<f64>,
    /// Available height. See [`width_hint`](Self::width_hint).
    pub height_hint: Option<f64>,
    /// Whether to remove the margin from the hints. Defaults to `true`.
    pub remove_margin_from_hints: bool,
    /// Whether to remove the insets (padding and border) from the hints. Defaults to `true`.
    pub remove_insets_from_hints: bool,
    /// If true, only the preferred width is needed.
    /// Whether this has an effect depends on the algorithm.
    pub width_only: bool,
}

impl Default for PrefSizeOptions {
    fn default() -> Self {
        Self {
            include_margin: false,
            width_hint: None,
            height_hint: None,
            remove_margin_from_hints: true,
            remove_insets_from_hints: true,
            width_only: false,
        }
    }
}

impl PrefSizeOptions {
    /// Options with the given width hint.
    pub fn with_width_hint(width: f64) -> Self {
        Self {
            width_hint: Some(width),
            ..Self::default()
        }
    }

    /// Options with the given height hint.
    pub fn with_height_hint(height: f64) -> Self {
        Self {
            height_hint: Some(height),
            ..Self::default()
        }
    }

    /// Builder-style method to set both hints.
    pub fn hints(mut self, width: Option<f64>, height: Option<f64>) -> Self {
        self.width_hint = width;
        self.height_hint = height;
        self
    }
}

impl From<bool> for PrefSizeOptions {
    fn from(include_margin: bool) -> Self {
        Self {
            include_margin,
            ..Self::default()
        }
    }
}

/// The arrangement logic of one component.
///
/// Algorithms are supplied by widgets. Trellis only decides *when* they run:
/// [`layout`](Self::layout) is called from a validation, and
/// [`preferred_layout_size`](Self::preferred_layout_size) on a cache miss in
/// [`ComponentMut::pref_size`].
///
/// Methods take `&self` because an algorithm may be re-entered while it runs,
/// for instance when `layout` asks its own component for its preferred size.
/// Algorithms that memoize anything should use interior mutability and drop
/// their memo in [`invalidate`](Self::invalidate).
pub trait LayoutAlgorithm {
    /// Computes the preferred size of the component's content.
    ///
    /// `hints` have already been adjusted by the component: margin and insets are removed
    /// and the values are clamped into the styling's min and max size.
    /// The result must include insets; it will be clamped by the caller.
    fn preferred_layout_size(
        &self,
        ctx: &mut ComponentMut<'_>,
        hints: &PrefSizeOptions,
    ) -> Result<Size, LayoutError>;

    /// Lays out the children of the component.
    ///
    /// Implementations typically compute child bounds and assign them with
    /// [`ComponentMut::set_bounds`], which validates each child in turn.
    fn layout(&self, ctx: &mut ComponentMut<'_>) -> Result<(), LayoutError>;

    /// Called whenever the component is invalidated.
    ///
    /// `source` is the component the invalidation originated from. It is always set
    /// when the invalidation comes from a tree invalidation.
    fn invalidate(&self, source: Option<SurfaceId>) {
        let _ = source;
    }

    /// A style class applied to the surface node once, when the algorithm is installed.
    fn css_class(&self) -> Option<&str> {
        None
    }

    /// Get the (abridged) type name of the algorithm, for logs.
    fn short_type_name(&self) -> &'static str {
        let name = type_name::<Self>();
        name.split('<')
            .next()
            .unwrap_or(name)
            .split("::")
            .last()
            .unwrap_or(name)
    }
}

/// Widget-owned data consulted by a component.
///
/// Opaque to Trellis except for [`is_validate_root`](Self::is_validate_root).
pub trait LayoutData {
    /// Whether the component should act as a validate root.
    fn is_validate_root(&self) -> bool {
        false
    }
}

/// The default algorithm: leaves arrangement to styling.
///
/// Its preferred size is the [natural size](crate::core::Surface::natural_size) of the node,
/// and its layout pass only validates the nearest descendant components in place.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLayout;

impl LayoutAlgorithm for NullLayout {
    fn preferred_layout_size(
        &self,
        ctx: &mut ComponentMut<'_>,
        hints: &PrefSizeOptions,
    ) -> Result<Size, LayoutError> {
        Ok(ctx
            .surface()
            .natural_size(ctx.id(), hints.width_hint, hints.height_hint))
    }

    fn layout(&self, ctx: &mut ComponentMut<'_>) -> Result<(), LayoutError> {
        for child in ctx.children() {
            ctx.component_mut(child)?.validate_layout()?;
        }
        Ok(())
    }
}
