// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use kurbo::{Insets, Point, Rect, Size};
use smallvec::SmallVec;
use tracing::field::DisplayValue;

/// A unique identifier for a node of the rendered surface.
///
/// Components are keyed by the id of the node they manage, so a `SurfaceId`
/// is also how a component is addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(NonZeroU64);

/// A unique identifier for an asynchronous operation attached to a surface node.
///
/// While a node (or one of its ancestors) carries an operation marker, its
/// descendants' layout is not validated. See [`Surface::pending_operation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(NonZeroU64);

/// How an external operation ended.
///
/// Deferred validations are retried in both cases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The operation ran to completion.
    Completed,
    /// The operation was cancelled or failed.
    Aborted,
}

/// The small list type used for child ids.
pub type SurfaceChildren = SmallVec<[SurfaceId; 16]>;

impl SurfaceId {
    /// Allocates a new, unique `SurfaceId`.
    ///
    /// Hosts which already have stable node ids can use [`SurfaceId::from_raw`] instead.
    pub fn next() -> Self {
        static SURFACE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = SURFACE_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        match NonZeroU64::new(id) {
            Some(id) => Self(id),
            // The counter starts at 1 and would have to wrap around to reach 0.
            None => unreachable!(),
        }
    }

    /// Creates a `SurfaceId` from a host-provided raw value.
    pub const fn from_raw(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Returns the integer value of the `SurfaceId`.
    pub fn to_raw(self) -> u64 {
        self.0.into()
    }

    /// A serialized representation of the `SurfaceId` for debugging purposes.
    pub fn trace(self) -> DisplayValue<Self> {
        tracing::field::display(self)
    }
}

impl Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OperationId {
    /// Allocates a new, unique `OperationId`.
    pub fn next() -> Self {
        static OPERATION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = OPERATION_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        match NonZeroU64::new(id) {
            Some(id) => Self(id),
            None => unreachable!(),
        }
    }

    /// Returns the integer value of the `OperationId`.
    pub fn to_raw(self) -> u64 {
        self.0.into()
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// Read and write access to the rendered surface.
///
/// This is the boundary between Trellis and whatever actually displays widgets
/// (a DOM, a scene graph, a test double). Trellis treats every method as given:
/// it never caches their results beyond what [`HtmlComponent`] documents.
///
/// All sizes include insets (padding and border) and exclude margins.
/// A node that doesn't exist anymore must behave like a detached node.
///
/// [`HtmlComponent`]: crate::core::HtmlComponent
pub trait Surface {
    /// Returns `true` if the node exists (it may still be detached).
    fn contains(&self, id: SurfaceId) -> bool;

    /// The containing node, or `None` for a top-level or detached node.
    fn parent(&self, id: SurfaceId) -> Option<SurfaceId>;

    /// The direct children of the node, in document order.
    fn children(&self, id: SurfaceId) -> SurfaceChildren;

    /// Returns `true` if the node is connected to a live document.
    fn is_attached(&self, id: SurfaceId) -> bool;

    /// Returns `true` if the node is rendered, which implies all its ancestors are too.
    fn is_visible(&self, id: SurfaceId) -> bool;

    /// The current size of the node.
    ///
    /// If `exact` is false, the host may round to whole pixels.
    fn size(&self, id: SurfaceId, exact: bool) -> Size;

    /// Assigns the size of the node.
    fn set_size(&mut self, id: SurfaceId, size: Size);

    /// The bounds of the node relative to its parent.
    fn bounds(&self, id: SurfaceId) -> Rect;

    /// Assigns the bounds of the node relative to its parent.
    fn set_bounds(&mut self, id: SurfaceId, bounds: Rect);

    /// The position of the node relative to its parent, as assigned by [`Self::set_location`].
    fn location(&self, id: SurfaceId) -> Point {
        self.bounds(id).origin()
    }

    /// Moves the node without resizing it.
    fn set_location(&mut self, id: SurfaceId, location: Point) {
        let size = self.bounds(id).size();
        self.set_bounds(id, Rect::from_origin_size(location, size));
    }

    /// Outer spacing of the node.
    fn margins(&self, id: SurfaceId) -> Insets;

    /// Border widths of the node.
    fn borders(&self, id: SurfaceId) -> Insets;

    /// Padding plus border of the node.
    fn insets(&self, id: SurfaceId) -> Insets;

    /// The minimum size imposed by styling.
    fn css_min_size(&self, _id: SurfaceId) -> Size {
        Size::ZERO
    }

    /// The maximum size imposed by styling.
    fn css_max_size(&self, _id: SurfaceId) -> Size {
        Size::new(f64::INFINITY, f64::INFINITY)
    }

    /// The size the node would naturally take if sized by styling alone.
    ///
    /// Used by [`NullLayout`](crate::core::NullLayout).
    fn natural_size(
        &self,
        id: SurfaceId,
        _width_hint: Option<f64>,
        _height_hint: Option<f64>,
    ) -> Size {
        self.size(id, true)
    }

    /// Returns `true` while a visual transition runs on this node.
    ///
    /// The host must call [`LayoutRoot::transition_ended`] once it stops.
    ///
    /// [`LayoutRoot::transition_ended`]: crate::app::LayoutRoot::transition_ended
    fn has_transition(&self, _id: SurfaceId) -> bool {
        false
    }

    /// The external operation this node is waiting on, if any.
    ///
    /// The host must call [`LayoutRoot::operation_completed`] once it settles.
    ///
    /// [`LayoutRoot::operation_completed`]: crate::app::LayoutRoot::operation_completed
    fn pending_operation(&self, _id: SurfaceId) -> Option<OperationId> {
        None
    }

    /// Applies a style class to the node.
    fn add_class(&mut self, _id: SurfaceId, _class: &str) {}

    /// A short human readable description of the node, for logs.
    fn debug_name(&self, id: SurfaceId) -> String {
        id.to_string()
    }
}
