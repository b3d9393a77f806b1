// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::rc::Rc;

use kurbo::{Insets, Point, Rect, Size};
use tracing::trace;

use crate::app::LayoutRoot;
use crate::core::{
    HtmlComponent, LayoutAlgorithm, LayoutData, LayoutError, PrefSizeKey, PrefSizeOptions,
    Surface, SurfaceChildren, SurfaceId,
};
use crate::passes::defer::check_validation_possible;
use crate::passes::enter_span_if;
use crate::passes::invalidate::{register_invalid, run_invalidate_tree};
use crate::passes::validate::run_validate_pass;
use crate::util::{add_insets, clamp_size};

/// A mutable handle to an installed [`HtmlComponent`].
///
/// This is how widgets and layout algorithms operate on components. The handle
/// borrows the whole [`LayoutRoot`], because most operations reach beyond the component:
/// validation consults ancestors, tree invalidation walks them, and algorithms lay out
/// child components through [`component_mut`](Self::component_mut).
///
/// # Panics
///
/// Methods panic if the component is uninstalled while the handle exists, which only a
/// post-validate function run from a nested [`validate_layout_tree`](Self::validate_layout_tree)
/// can do.
pub struct ComponentMut<'a> {
    pub(crate) root: &'a mut LayoutRoot,
    pub(crate) id: SurfaceId,
}

// --- MARK: STATE
impl ComponentMut<'_> {
    /// The surface node this component manages.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// The state of the component.
    pub fn state(&self) -> &HtmlComponent {
        &self.root.components[&self.id]
    }

    fn state_mut(&mut self) -> &mut HtmlComponent {
        self.root
            .components
            .get_mut(&self.id)
            .unwrap_or_else(|| panic!("component {} was uninstalled during use", self.id))
    }

    /// Read access to the surface.
    pub fn surface(&self) -> &dyn Surface {
        &*self.root.surface
    }

    /// Write access to the surface.
    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        &mut *self.root.surface
    }

    /// Returns a handle to another component of the same root, typically a child.
    ///
    /// # Errors
    ///
    /// [`LayoutError::NotInstalled`] if `id` has no component.
    pub fn component_mut(&mut self, id: SurfaceId) -> Result<ComponentMut<'_>, LayoutError> {
        self.root.component_mut(id)
    }

    /// The component of the nearest ancestor node that has one.
    ///
    /// See [`LayoutRoot::parent_of`].
    pub fn parent(&self) -> Option<SurfaceId> {
        self.root.parent_of(self.id)
    }

    /// Returns `true` if the component `ancestor` contains this one.
    pub fn is_descendant_of(&self, ancestor: SurfaceId) -> bool {
        self.root.is_descendant_of(self.id, ancestor)
    }

    /// The nearest descendant components, in document order.
    pub fn children(&self) -> SurfaceChildren {
        self.root.child_components(self.id)
    }

    /// Sets the layout algorithm.
    ///
    /// If the algorithm has a [`css_class`](LayoutAlgorithm::css_class), it is applied
    /// to the node.
    pub fn set_layout(&mut self, layout: impl LayoutAlgorithm + 'static) {
        self.set_layout_rc(Rc::new(layout));
    }

    /// Sets a shared layout algorithm. See [`set_layout`](Self::set_layout).
    pub fn set_layout_rc(&mut self, layout: Rc<dyn LayoutAlgorithm>) {
        if let Some(class) = layout.css_class() {
            self.root.surface.add_class(self.id, class);
        }
        self.state_mut().layout = Some(layout);
    }

    /// Removes the layout algorithm, returning it.
    ///
    /// Validating or measuring the component fails until a new one is set.
    pub fn remove_layout(&mut self) -> Option<Rc<dyn LayoutAlgorithm>> {
        self.state_mut().layout.take()
    }

    /// Sets or clears the widget's layout data.
    pub fn set_layout_data(&mut self, layout_data: Option<Rc<dyn LayoutData>>) {
        self.state_mut().layout_data = layout_data;
    }

    /// Marks this component as a validate root or not.
    ///
    /// See [`HtmlComponent::is_validate_root`].
    pub fn set_validate_root(&mut self, validate_root: bool) {
        self.state_mut().validate_root = validate_root;
    }

    /// Whether this component is a validate root.
    pub fn is_validate_root(&self) -> bool {
        self.state().is_validate_root()
    }

    /// Sets whether sizes are assigned to the node.
    ///
    /// Set this to false if the node sizes itself with styling:
    /// [`set_size`](Self::set_size) will still validate the component,
    /// but won't resize the node.
    pub fn set_pixel_based_sizing(&mut self, pixel_based_sizing: bool) {
        self.state_mut().pixel_based_sizing = pixel_based_sizing;
    }

    /// Sets whether the content may overflow vertically.
    ///
    /// See [`available_size`](Self::available_size).
    pub fn set_scrollable(&mut self, scrollable: bool) {
        self.state_mut().scrollable = scrollable;
    }

    /// Disables or re-enables invalidation.
    ///
    /// Prefer [`with_invalidate_suppressed`](Self::with_invalidate_suppressed),
    /// which can't forget to re-enable it.
    pub fn set_suppress_invalidate(&mut self, suppress: bool) {
        self.state_mut().suppress_invalidate = suppress;
    }

    /// Disables or re-enables validation.
    ///
    /// The caller is responsible for validating again once it is re-enabled, if needed.
    pub fn set_suppress_validate(&mut self, suppress: bool) {
        self.state_mut().suppress_validate = suppress;
    }

    /// Runs `f` with tree invalidation of this component disabled.
    ///
    /// Lets a widget modify itself during its own layout without invalidating its ancestors
    /// over and over. The previous value of the flag is restored afterwards.
    pub fn with_invalidate_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.state_mut().suppress_invalidate, true);
        let result = f(self);
        self.state_mut().suppress_invalidate = previous;
        result
    }

    /// Runs `f` with validation of this component disabled.
    ///
    /// The previous value of the flag is restored afterwards. If the component was
    /// invalidated meanwhile, it's up to the caller to validate it again.
    pub fn with_validate_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.state_mut().suppress_validate, true);
        let result = f(self);
        self.state_mut().suppress_validate = previous;
        result
    }
}

// --- MARK: VALIDITY
impl ComponentMut<'_> {
    /// Marks the component invalid and clears its preferred-size cache.
    ///
    /// The algorithm is notified through [`LayoutAlgorithm::invalidate`].
    /// `source` is the component the invalidation originated from, if known.
    ///
    /// This is purely local: neither the ancestors nor the validator are told.
    /// Use [`invalidate_layout_tree`](Self::invalidate_layout_tree) for that.
    pub fn invalidate_layout(&mut self, source: Option<SurfaceId>) {
        if self.root.trace.invalidate {
            trace!(surface = self.id.trace(), "Invalidating layout");
        }
        self.state_mut().invalidate(source);
    }

    /// Lays out the children of this component, if it is invalid.
    ///
    /// Returns `Ok(true)` if the component is valid afterwards. Returns `Ok(false)` if the
    /// validation couldn't run: validation is suppressed, the component is already being laid
    /// out, or its node is invisible, detached, or blocked by a transition or operation on
    /// itself or an ancestor. In the last two cases the validation is retried automatically
    /// once the blocking condition clears.
    ///
    /// # Errors
    ///
    /// [`LayoutError::MissingLayout`] if the component has no algorithm, or any error returned
    /// by the algorithm. The component stays invalid.
    pub fn validate_layout(&mut self) -> Result<bool, LayoutError> {
        let id = self.id;
        let state = self.state();
        let Some(layout) = state.layout.clone() else {
            return Err(LayoutError::MissingLayout { surface: id });
        };
        if state.valid {
            return Ok(true);
        }
        if state.suppress_validate || state.layouting {
            return Ok(false);
        }
        if !check_validation_possible(self.root, id) {
            return Ok(false);
        }

        let _span = enter_span_if(self.root.trace.validate, "validate", id);
        if self.root.trace.validate {
            trace!(layout = layout.short_type_name(), "Running layout");
        }
        self.state_mut().layouting = true;
        let result = layout.layout(self);
        self.state_mut().layouting = false;
        result?;

        // Saved for later use, also when sizes aren't assigned by pixel_based_sizing.
        let size = self.root.surface.size(id, true);
        let state = self.state_mut();
        state.layouted = true;
        state.size_cached = Some(size);
        state.valid = true;
        Ok(true)
    }

    /// Performs [`invalidate_layout`](Self::invalidate_layout) then
    /// [`validate_layout`](Self::validate_layout).
    pub fn revalidate_layout(&mut self) -> Result<bool, LayoutError> {
        self.invalidate_layout(None);
        self.validate_layout()
    }

    /// Invalidates this component and schedules a validation pass.
    ///
    /// If `invalidate_parents` is true (the usual case), the ancestors are invalidated too,
    /// up to the nearest validate root. Otherwise, only this component is invalidated
    /// and registered.
    ///
    /// The caller doesn't need to validate: the [`LayoutRoot`] requests a pass with
    /// [`LayoutSignal::ValidationRequested`](crate::app::LayoutSignal::ValidationRequested).
    /// Does nothing while invalidation is suppressed.
    pub fn invalidate_layout_tree(&mut self, invalidate_parents: bool) {
        if self.state().suppress_invalidate {
            return;
        }
        if invalidate_parents {
            // Calls invalidate_layout on this component too.
            run_invalidate_tree(self.root, self.id);
        } else {
            self.invalidate_layout(None);
            register_invalid(self.root, self.id);
        }
    }

    /// Runs a validation pass on the whole [`LayoutRoot`].
    ///
    /// Does nothing while validation of this component is suppressed.
    pub fn validate_layout_tree(&mut self) -> Result<(), LayoutError> {
        if self.state().suppress_validate {
            return Ok(());
        }
        run_validate_pass(self.root)
    }

    /// Performs [`invalidate_layout_tree`](Self::invalidate_layout_tree) then
    /// [`validate_layout_tree`](Self::validate_layout_tree).
    ///
    /// Does nothing while invalidation is suppressed.
    pub fn revalidate_layout_tree(&mut self, invalidate_parents: bool) -> Result<(), LayoutError> {
        if self.state().suppress_invalidate {
            return Ok(());
        }
        self.invalidate_layout_tree(invalidate_parents);
        self.validate_layout_tree()
    }
}

// --- MARK: PREF SIZE
impl ComponentMut<'_> {
    /// Returns the preferred size of the component, insets included, margin excluded
    /// unless [`include_margin`](PrefSizeOptions::include_margin) is set.
    ///
    /// Accepts [`PrefSizeOptions`] or a `bool` meaning `include_margin`.
    ///
    /// The result is cached until the component is invalidated, keyed by the hints as
    /// passed by the caller. An invisible component has a preferred size of zero.
    ///
    /// # Errors
    ///
    /// [`LayoutError::MissingLayout`] if the component has no algorithm, or any error
    /// returned by the algorithm.
    pub fn pref_size(&mut self, options: impl Into<PrefSizeOptions>) -> Result<Size, LayoutError> {
        let id = self.id;
        if !self.root.surface.is_visible(id) {
            return Ok(Size::ZERO);
        }
        let options = options.into();
        let Some(layout) = self.state().layout.clone() else {
            return Err(LayoutError::MissingLayout { surface: id });
        };

        let trace = self.root.trace.pref_size;
        let key = PrefSizeKey::new(&options);
        if let Some(cached) = self.state_mut().pref_size_cache.get(&key) {
            if trace {
                trace!(surface = id.trace(), ?key, %cached, "Preferred size from cache");
            }
            return Ok(self.with_margin(cached, options.include_margin));
        }

        let _span = enter_span_if(trace, "pref_size", id);
        let min_size = self.css_min_size();
        let max_size = self.css_max_size();
        let mut hints = PrefSizeOptions {
            width_hint: options.width_hint,
            height_hint: options.height_hint,
            width_only: options.width_only,
            ..PrefSizeOptions::default()
        };
        if supplied(options.width_hint).is_some() || supplied(options.height_hint).is_some() {
            self.adjust_size_hints(&options, &mut hints, min_size, max_size);
        }

        let pref_size = layout.preferred_layout_size(self, &hints)?;
        let pref_size = clamp_size(pref_size, min_size, max_size);
        self.state_mut().pref_size_cache.insert(key, pref_size);
        if trace {
            trace!(?key, ?hints, %pref_size, "Computed preferred size");
        }
        Ok(self.with_margin(pref_size, options.include_margin))
    }

    /// Removes margin and insets from the hints, so that the algorithm doesn't need to.
    ///
    /// A hint of zero means "no constraint" and is passed on unchanged.
    ///
    /// The order matters, because border-box sizing is expected: the margin is removed
    /// first, then the hint is clamped into the styling's min and max size (which include
    /// insets), and finally the insets are removed.
    fn adjust_size_hints(
        &self,
        options: &PrefSizeOptions,
        hints: &mut PrefSizeOptions,
        min_size: Size,
        max_size: Size,
    ) {
        let margins = if options.remove_margin_from_hints {
            self.margins()
        } else {
            Insets::ZERO
        };
        let insets = if options.remove_insets_from_hints {
            self.insets()
        } else {
            Insets::ZERO
        };
        if let Some(width) = supplied(options.width_hint) {
            let width = (width - margins.x_value())
                .max(min_size.width)
                .min(max_size.width);
            hints.width_hint = Some(width - insets.x_value());
        }
        if let Some(height) = supplied(options.height_hint) {
            let height = (height - margins.y_value())
                .max(min_size.height)
                .min(max_size.height);
            hints.height_hint = Some(height - insets.y_value());
        }
    }

    fn with_margin(&self, size: Size, include_margin: bool) -> Size {
        if include_margin {
            add_insets(size, self.margins())
        } else {
            size
        }
    }

    /// The current size, with the height grown to the preferred height if the component
    /// is [scrollable](Self::set_scrollable).
    ///
    /// The width is always the current width, because there is no horizontal scrolling.
    /// Insets are included, margin is not.
    pub fn available_size(&mut self, exact: bool) -> Result<Size, LayoutError> {
        let mut size = self.size(exact);
        if self.state().scrollable {
            // The width of this component is used as hint, so its margin must stay.
            let pref_size = self.pref_size(PrefSizeOptions {
                width_hint: Some(size.width),
                remove_margin_from_hints: false,
                ..PrefSizeOptions::default()
            })?;
            if pref_size.height > size.height {
                size.height = pref_size.height;
            }
        }
        Ok(size)
    }
}

// --- MARK: GEOMETRY
impl ComponentMut<'_> {
    /// The size of the node, insets included.
    pub fn size(&self, exact: bool) -> Size {
        self.root.surface.size(self.id, exact)
    }

    /// Sets the size of the node, insets included, then validates the component.
    ///
    /// The component is invalidated first if the size differs from the size at its last
    /// validation. Does nothing if the node is invisible or detached, because sizes read
    /// then would be wrong and would end up in the preferred-size cache.
    pub fn set_size(&mut self, size: Size) -> Result<(), LayoutError> {
        if !self.is_attached_and_visible() {
            return Ok(());
        }
        if self.state().size_cached != Some(size) {
            self.invalidate_layout(None);
        }
        if self.state().pixel_based_sizing {
            self.root.surface.set_size(self.id, size);
        }
        self.validate_layout()?;
        Ok(())
    }

    /// The bounds of the node relative to its parent.
    pub fn bounds(&self) -> Rect {
        self.root.surface.bounds(self.id)
    }

    /// Sets the bounds of the node, then validates the component.
    ///
    /// Same rules as [`set_size`](Self::set_size).
    pub fn set_bounds(&mut self, bounds: Rect) -> Result<(), LayoutError> {
        if !self.is_attached_and_visible() {
            return Ok(());
        }
        if self.state().size_cached != Some(bounds.size()) {
            self.invalidate_layout(None);
        }
        if self.state().pixel_based_sizing {
            self.root.surface.set_bounds(self.id, bounds);
        }
        self.validate_layout()?;
        Ok(())
    }

    /// Sets the component to its preferred size.
    pub fn pack(&mut self) -> Result<(), LayoutError> {
        let pref_size = self.pref_size(false)?;
        self.set_size(pref_size)
    }

    /// The position of the node relative to its parent.
    pub fn location(&self) -> Point {
        self.root.surface.location(self.id)
    }

    /// Moves the node. This doesn't affect validity.
    pub fn set_location(&mut self, location: Point) {
        self.root.surface.set_location(self.id, location);
    }

    /// Padding and border of the node.
    pub fn insets(&self) -> Insets {
        self.root.surface.insets(self.id)
    }

    /// Margin of the node.
    pub fn margins(&self) -> Insets {
        self.root.surface.margins(self.id)
    }

    /// Border of the node.
    pub fn borders(&self) -> Insets {
        self.root.surface.borders(self.id)
    }

    /// The minimum size imposed by styling.
    pub fn css_min_size(&self) -> Size {
        self.root.surface.css_min_size(self.id)
    }

    /// The maximum size imposed by styling.
    pub fn css_max_size(&self) -> Size {
        self.root.surface.css_max_size(self.id)
    }

    /// Whether the node is connected to a live document.
    pub fn is_attached(&self) -> bool {
        self.root.surface.is_attached(self.id)
    }

    /// Whether the node is rendered.
    pub fn is_visible(&self) -> bool {
        self.root.surface.is_visible(self.id)
    }

    /// Whether the node is attached and rendered.
    pub fn is_attached_and_visible(&self) -> bool {
        self.is_attached() && self.is_visible()
    }

    /// A short description of the node, for logs.
    pub fn debug(&self) -> String {
        self.root.surface.debug_name(self.id)
    }
}

impl std::fmt::Debug for ComponentMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentMut")
            .field("id", &self.id)
            .field("state", &self.root.components.get(&self.id))
            .finish_non_exhaustive()
    }
}

/// The hint, if it constrains the size.
fn supplied(hint: Option<f64>) -> Option<f64> {
    hint.filter(|hint| *hint != 0.)
}
