// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::rc::Rc;

use kurbo::Size;

use crate::core::{LayoutAlgorithm, LayoutData, NullLayout, PrefSizeCache, PrefSizeKey, SurfaceId};

/// Layout bookkeeping for one node of the rendered surface.
///
/// A component is responsible for laying out its child components using its
/// [`LayoutAlgorithm`]. The algorithm computes sizes and positions of the children and
/// assigns them with [`set_size`] or [`set_bounds`]; children whose size changes become
/// invalid and lay out their own children. Layout therefore happens top-down.
///
/// When a component changes in a way that affects its size (e.g. it becomes visible),
/// it may affect every ancestor too, so the whole ancestor chain up to the next
/// validate root is invalidated with [`invalidate_layout_tree`]. Invalidation happens bottom-up.
///
/// This struct only holds state. Operations go through a [`ComponentMut`],
/// obtained from [`LayoutRoot::component_mut`].
///
/// [`set_size`]: crate::core::ComponentMut::set_size
/// [`set_bounds`]: crate::core::ComponentMut::set_bounds
/// [`invalidate_layout_tree`]: crate::core::ComponentMut::invalidate_layout_tree
/// [`ComponentMut`]: crate::core::ComponentMut
/// [`LayoutRoot::component_mut`]: crate::app::LayoutRoot::component_mut
pub struct HtmlComponent {
    pub(crate) surface: SurfaceId,
    pub(crate) layout: Option<Rc<dyn LayoutAlgorithm>>,
    pub(crate) layout_data: Option<Rc<dyn LayoutData>>,

    /// False means a validation pass is owed.
    pub(crate) valid: bool,
    /// The component has been laid out at least once. Invalidation doesn't reset this.
    pub(crate) layouted: bool,
    /// The algorithm's `layout` is currently running.
    pub(crate) layouting: bool,
    pub(crate) validate_root: bool,

    /// Temporarily disables invalidation, e.g. while the component is modified during layout.
    pub(crate) suppress_invalidate: bool,
    /// Temporarily disables validation. Invalidation still works.
    ///
    /// Whoever sets this is responsible for validating again once it is cleared.
    pub(crate) suppress_validate: bool,

    /// Set to false if styling sizes the node, in which case sizes are not assigned to it.
    pub(crate) pixel_based_sizing: bool,
    pub(crate) scrollable: bool,

    /// The exact size at the end of the last successful validation.
    pub(crate) size_cached: Option<Size>,
    pub(crate) pref_size_cache: PrefSizeCache,
}

impl HtmlComponent {
    pub(crate) fn new(surface: SurfaceId) -> Self {
        Self {
            surface,
            layout: Some(Rc::new(NullLayout)),
            layout_data: None,
            valid: false,
            layouted: false,
            layouting: false,
            validate_root: false,
            suppress_invalidate: false,
            suppress_validate: false,
            pixel_based_sizing: true,
            scrollable: false,
            size_cached: None,
            pref_size_cache: PrefSizeCache::new(),
        }
    }

    /// Marks the component invalid, purges its cache and notifies its algorithm.
    ///
    /// This doesn't touch the validator: see [`ComponentMut::invalidate_layout_tree`].
    ///
    /// [`ComponentMut::invalidate_layout_tree`]: crate::core::ComponentMut::invalidate_layout_tree
    pub(crate) fn invalidate(&mut self, source: Option<SurfaceId>) {
        self.valid = false;
        self.pref_size_cache.clear();
        if let Some(layout) = &self.layout {
            layout.invalidate(source);
        }
    }

    /// The surface node this component manages.
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Whether the layout is up to date.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the component has been laid out at least once.
    pub fn is_layouted(&self) -> bool {
        self.layouted
    }

    /// Whether the component's algorithm is currently laying it out.
    pub fn is_layouting(&self) -> bool {
        self.layouting
    }

    /// Whether invalidation of this component is currently suppressed.
    pub fn is_invalidate_suppressed(&self) -> bool {
        self.suppress_invalidate
    }

    /// Whether validation of this component is currently suppressed.
    pub fn is_validate_suppressed(&self) -> bool {
        self.suppress_validate
    }

    /// Whether sizes are assigned to the surface node.
    pub fn is_pixel_based_sizing(&self) -> bool {
        self.pixel_based_sizing
    }

    /// Whether the component's content may overflow vertically.
    pub fn is_scrollable(&self) -> bool {
        self.scrollable
    }

    /// Returns `true` if the component has a layout algorithm.
    pub fn has_layout(&self) -> bool {
        self.layout.is_some()
    }

    /// The component's layout algorithm.
    pub fn layout(&self) -> Option<&Rc<dyn LayoutAlgorithm>> {
        self.layout.as_ref()
    }

    /// The widget's layout data, if any.
    pub fn layout_data(&self) -> Option<&Rc<dyn LayoutData>> {
        self.layout_data.as_ref()
    }

    /// Marks the upper end of a tree invalidation.
    ///
    /// A component is a validate root if its size doesn't depend on the visibility or
    /// bounds of its children. For example, hiding the label of a form field only
    /// requires the field's container to be laid out again, not the whole form.
    pub fn is_validate_root(&self) -> bool {
        self.validate_root
            || self
                .layout_data
                .as_ref()
                .is_some_and(|data| data.is_validate_root())
    }

    /// The exact size at the end of the last successful validation.
    pub fn size_cached(&self) -> Option<Size> {
        self.size_cached
    }

    /// The number of entries in the preferred-size cache.
    pub fn pref_size_cache_len(&self) -> usize {
        self.pref_size_cache.len()
    }

    /// Returns `true` if a preferred size is cached for `key`.
    pub fn has_cached_pref_size(&self, key: &PrefSizeKey) -> bool {
        self.pref_size_cache.keys().any(|k| k == key)
    }
}

impl fmt::Debug for HtmlComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlComponent")
            .field("surface", &self.surface)
            .field(
                "layout",
                &self.layout.as_ref().map(|layout| layout.short_type_name()),
            )
            .field("has_layout_data", &self.layout_data.is_some())
            .field("valid", &self.valid)
            .field("layouted", &self.layouted)
            .field("layouting", &self.layouting)
            .field("validate_root", &self.validate_root)
            .field("suppress_invalidate", &self.suppress_invalidate)
            .field("suppress_validate", &self.suppress_validate)
            .field("pixel_based_sizing", &self.pixel_based_sizing)
            .field("scrollable", &self.scrollable)
            .field("size_cached", &self.size_cached)
            .field("pref_size_cache", &self.pref_size_cache)
            .finish()
    }
}
