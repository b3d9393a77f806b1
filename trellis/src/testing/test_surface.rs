// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use kurbo::{Insets, Rect, Size};

use crate::core::{OperationId, Surface, SurfaceChildren, SurfaceId};

/// An in-memory stand-in for a rendered document.
///
/// Nodes have a parent, bounds, margins, borders and padding, an optional natural size,
/// and can be hidden, detached, removed, or marked as running a transition or waiting on
/// an operation.
///
/// Clones share the same tree, so a test can keep one clone to drive the surface while the
/// [`LayoutRoot`](crate::app::LayoutRoot) owns another.
///
/// Unknown ids behave like removed nodes: detached, invisible and zero-sized.
#[derive(Clone, Debug)]
pub struct TestSurface {
    tree: Rc<RefCell<Tree>>,
}

#[derive(Debug)]
struct Tree {
    document: SurfaceId,
    nodes: HashMap<SurfaceId, Node>,
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<SurfaceId>,
    children: SurfaceChildren,
    visible: bool,
    bounds: Rect,
    margins: Insets,
    borders: Insets,
    padding: Insets,
    min_size: Size,
    max_size: Size,
    natural_size: Option<Size>,
    transition: bool,
    operation: Option<OperationId>,
    classes: Vec<String>,
    name: Option<String>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            parent: None,
            children: SurfaceChildren::new(),
            visible: true,
            bounds: Rect::ZERO,
            margins: Insets::ZERO,
            borders: Insets::ZERO,
            padding: Insets::ZERO,
            min_size: Size::ZERO,
            max_size: Size::new(f64::INFINITY, f64::INFINITY),
            natural_size: None,
            transition: false,
            operation: None,
            classes: Vec::new(),
            name: None,
        }
    }
}

impl Default for TestSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSurface {
    /// Creates a surface holding only a document node.
    pub fn new() -> Self {
        let document = SurfaceId::next();
        let mut nodes = HashMap::new();
        nodes.insert(
            document,
            Node {
                name: Some("document".into()),
                ..Node::default()
            },
        );
        Self {
            tree: Rc::new(RefCell::new(Tree { document, nodes })),
        }
    }

    /// The document node. Nodes are attached if the document contains them.
    pub fn document(&self) -> SurfaceId {
        self.tree.borrow().document
    }

    /// Creates a node and appends it to `parent`.
    #[track_caller]
    pub fn create_child(&self, parent: SurfaceId) -> SurfaceId {
        let id = self.create_detached();
        self.append(parent, id);
        id
    }

    /// Creates a node without a parent.
    pub fn create_detached(&self) -> SurfaceId {
        let id = SurfaceId::next();
        self.tree.borrow_mut().nodes.insert(id, Node::default());
        id
    }

    /// Moves `child` to the end of the children of `parent`.
    #[track_caller]
    pub fn append(&self, parent: SurfaceId, child: SurfaceId) {
        self.detach(child);
        let mut tree = self.tree.borrow_mut();
        assert!(tree.nodes.contains_key(&parent), "unknown parent {parent}");
        tree.node_mut(child).parent = Some(parent);
        tree.node_mut(parent).children.push(child);
    }

    /// Disconnects `id` from its parent. The node and its descendants stay usable.
    pub fn detach(&self, id: SurfaceId) {
        let mut tree = self.tree.borrow_mut();
        let Some(parent) = tree.nodes.get_mut(&id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = tree.nodes.get_mut(&parent) {
            parent.children.retain(|child| *child != id);
        }
    }

    /// Destroys `id` and its descendants.
    pub fn remove(&self, id: SurfaceId) {
        self.detach(id);
        let mut tree = self.tree.borrow_mut();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = tree.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
    }

    /// Shows or hides `id` and, implicitly, its descendants.
    pub fn set_visible(&self, id: SurfaceId, visible: bool) {
        self.tree.borrow_mut().node_mut(id).visible = visible;
    }

    /// Marks `id` as running a transition.
    pub fn start_transition(&self, id: SurfaceId) {
        self.tree.borrow_mut().node_mut(id).transition = true;
    }

    /// Clears the transition mark of `id`.
    ///
    /// This doesn't notify any root; see [`TestHarness::end_transition`](super::TestHarness::end_transition).
    pub fn end_transition(&self, id: SurfaceId) {
        self.tree.borrow_mut().node_mut(id).transition = false;
    }

    /// Marks `id` as waiting on a new operation, and returns it.
    pub fn start_operation(&self, id: SurfaceId) -> OperationId {
        let op = OperationId::next();
        self.tree.borrow_mut().node_mut(id).operation = Some(op);
        op
    }

    /// Clears the operation mark of `id`, returning the operation it had.
    pub fn clear_operation(&self, id: SurfaceId) -> Option<OperationId> {
        self.tree.borrow_mut().node_mut(id).operation.take()
    }

    /// Sets the margin of `id`.
    pub fn set_margins(&self, id: SurfaceId, margins: impl Into<Insets>) {
        self.tree.borrow_mut().node_mut(id).margins = margins.into();
    }

    /// Sets the border widths of `id`.
    pub fn set_borders(&self, id: SurfaceId, borders: impl Into<Insets>) {
        self.tree.borrow_mut().node_mut(id).borders = borders.into();
    }

    /// Sets the padding of `id`.
    pub fn set_padding(&self, id: SurfaceId, padding: impl Into<Insets>) {
        self.tree.borrow_mut().node_mut(id).padding = padding.into();
    }

    /// Sets the minimum size imposed by styling.
    pub fn set_css_min_size(&self, id: SurfaceId, size: Size) {
        self.tree.borrow_mut().node_mut(id).min_size = size;
    }

    /// Sets the maximum size imposed by styling.
    pub fn set_css_max_size(&self, id: SurfaceId, size: Size) {
        self.tree.borrow_mut().node_mut(id).max_size = size;
    }

    /// Sets the size [`Surface::natural_size`] returns, instead of the current size.
    pub fn set_natural_size(&self, id: SurfaceId, size: Size) {
        self.tree.borrow_mut().node_mut(id).natural_size = Some(size);
    }

    /// Names `id` in logs.
    pub fn set_debug_name(&self, id: SurfaceId, name: impl Into<String>) {
        self.tree.borrow_mut().node_mut(id).name = Some(name.into());
    }

    /// The classes applied to `id` with [`Surface::add_class`].
    pub fn classes(&self, id: SurfaceId) -> Vec<String> {
        self.read(id, Vec::new(), |node| node.classes.clone())
    }

    fn read<R>(&self, id: SurfaceId, default: R, f: impl FnOnce(&Node) -> R) -> R {
        self.tree.borrow().nodes.get(&id).map_or(default, f)
    }

    fn write(&self, id: SurfaceId, f: impl FnOnce(&mut Node)) {
        if let Some(node) = self.tree.borrow_mut().nodes.get_mut(&id) {
            f(node);
        }
    }
}

impl Tree {
    #[track_caller]
    fn node_mut(&mut self, id: SurfaceId) -> &mut Node {
        self.nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("unknown surface node {id}"))
    }
}

impl Surface for TestSurface {
    fn contains(&self, id: SurfaceId) -> bool {
        self.tree.borrow().nodes.contains_key(&id)
    }

    fn parent(&self, id: SurfaceId) -> Option<SurfaceId> {
        self.read(id, None, |node| node.parent)
    }

    fn children(&self, id: SurfaceId) -> SurfaceChildren {
        self.read(id, SurfaceChildren::new(), |node| node.children.clone())
    }

    fn is_attached(&self, id: SurfaceId) -> bool {
        let tree = self.tree.borrow();
        let mut current = id;
        loop {
            if current == tree.document {
                return true;
            }
            match tree.nodes.get(&current).and_then(|node| node.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn is_visible(&self, id: SurfaceId) -> bool {
        let tree = self.tree.borrow();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| tree.nodes.get(&id)) {
            if !node.visible {
                return false;
            }
            current = node.parent;
        }
        // Unknown nodes are never visible.
        tree.nodes.contains_key(&id)
    }

    fn size(&self, id: SurfaceId, exact: bool) -> Size {
        let size = self.read(id, Size::ZERO, |node| node.bounds.size());
        if exact { size } else { size.round() }
    }

    fn set_size(&mut self, id: SurfaceId, size: Size) {
        self.write(id, |node| {
            node.bounds = Rect::from_origin_size(node.bounds.origin(), size);
        });
    }

    fn bounds(&self, id: SurfaceId) -> Rect {
        self.read(id, Rect::ZERO, |node| node.bounds)
    }

    fn set_bounds(&mut self, id: SurfaceId, bounds: Rect) {
        self.write(id, |node| node.bounds = bounds);
    }

    fn margins(&self, id: SurfaceId) -> Insets {
        self.read(id, Insets::ZERO, |node| node.margins)
    }

    fn borders(&self, id: SurfaceId) -> Insets {
        self.read(id, Insets::ZERO, |node| node.borders)
    }

    fn insets(&self, id: SurfaceId) -> Insets {
        self.read(id, Insets::ZERO, |node| {
            let Node {
                borders, padding, ..
            } = node;
            Insets::new(
                borders.x0 + padding.x0,
                borders.y0 + padding.y0,
                borders.x1 + padding.x1,
                borders.y1 + padding.y1,
            )
        })
    }

    fn css_min_size(&self, id: SurfaceId) -> Size {
        self.read(id, Size::ZERO, |node| node.min_size)
    }

    fn css_max_size(&self, id: SurfaceId) -> Size {
        self.read(id, Size::new(f64::INFINITY, f64::INFINITY), |node| {
            node.max_size
        })
    }

    fn natural_size(
        &self,
        id: SurfaceId,
        _width_hint: Option<f64>,
        _height_hint: Option<f64>,
    ) -> Size {
        self.read(id, Size::ZERO, |node| {
            node.natural_size.unwrap_or(node.bounds.size())
        })
    }

    fn has_transition(&self, id: SurfaceId) -> bool {
        self.read(id, false, |node| node.transition)
    }

    fn pending_operation(&self, id: SurfaceId) -> Option<OperationId> {
        self.read(id, None, |node| node.operation)
    }

    fn add_class(&mut self, id: SurfaceId, class: &str) {
        self.write(id, |node| {
            if !node.classes.iter().any(|existing| existing == class) {
                node.classes.push(class.to_owned());
            }
        });
    }

    fn debug_name(&self, id: SurfaceId) -> String {
        self.read(id, format!("{id} (removed)"), |node| match &node.name {
            Some(name) => format!("{id} {name}"),
            None => id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_follows_the_document() {
        let surface = TestSurface::new();
        let panel = surface.create_child(surface.document());
        let field = surface.create_child(panel);
        assert!(surface.is_attached(field));

        surface.detach(panel);
        assert!(!surface.is_attached(field));
        assert!(surface.contains(field));
        assert_eq!(surface.parent(field), Some(panel));

        surface.append(surface.document(), panel);
        assert!(surface.is_attached(field));
    }

    #[test]
    fn visibility_is_inherited() {
        let surface = TestSurface::new();
        let panel = surface.create_child(surface.document());
        let field = surface.create_child(panel);

        surface.set_visible(panel, false);
        assert!(!surface.is_visible(field));
        surface.set_visible(panel, true);
        assert!(surface.is_visible(field));
    }

    #[test]
    fn removed_nodes_are_unknown() {
        let surface = TestSurface::new();
        let panel = surface.create_child(surface.document());
        let field = surface.create_child(panel);

        surface.remove(panel);
        assert!(!surface.contains(field));
        assert!(!surface.is_visible(field));
        assert!(!surface.is_attached(field));
        assert!(surface.children(surface.document()).is_empty());
    }

    #[test]
    fn insets_add_borders_and_padding() {
        let mut surface = TestSurface::new();
        let panel = surface.create_child(surface.document());
        surface.set_borders(panel, 1.);
        surface.set_padding(panel, Insets::new(2., 3., 4., 5.));
        assert_eq!(surface.insets(panel), Insets::new(3., 4., 5., 6.));

        surface.set_size(panel, Size::new(10.4, 10.6));
        assert_eq!(surface.size(panel, false), Size::new(10., 11.));
    }
}
