//! Render Tree
//! An arena of nodes standing in for the page being displayed, so exports can
//! locate, clone and mount subtrees the same way they would in a browser DOM.
//!
//! Nodes are stored in a `Vec<Option<Node>>`; removed slots become `None` and
//! are never reused, so a `NodeId` never silently points at a different node.
//!
//! Layout is a simple block flow: containers stack their flow children
//! vertically inside a padding, `Fixed` children are pinned to the parent's
//! bottom-right corner and `Cover` children fill the parent box. Units are
//! logical pixels; rasterizers multiply by the pixel ratio.

use crate::charts::DisplayOptions;
use crate::data::VisualizationData;
use image::RgbaImage;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub type NodeId = usize;

/// Padding inside block containers.
pub const BLOCK_PADDING: u32 = 16;
/// Vertical gap between flow children.
pub const FLOW_GAP: u32 = 8;
pub const HEADING_HEIGHT: u32 = 34;
pub const LINE_HEIGHT: u32 = 20;
pub const BADGE_HEIGHT: u32 = 28;
/// Approximate advance of one character of body text.
pub const CHAR_WIDTH: u32 = 7;

#[derive(Debug, Clone)]
pub enum ImageState {
    Pending,
    Ready(Arc<RgbaImage>),
    Failed,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Body,
    Block,
    /// Borderless block used to host export clones.
    Container,
    Heading(String),
    Text(String),
    Visualization {
        data: Box<VisualizationData>,
        options: DisplayOptions,
    },
    Image {
        source: PathBuf,
        width: u32,
        height: u32,
        state: ImageState,
    },
    Badge(String),
    Overlay(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Flow,
    /// Pinned to the parent's bottom-right corner.
    Fixed { right: u32, bottom: u32 },
    /// Fills the parent box.
    Cover,
    /// Laid out normally but placed outside the visible viewport.
    Offscreen { left: i32, top: i32 },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub element_id: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub position: Position,
    /// Explicit width; inherits the parent's content width when `None`.
    pub width: Option<u32>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            element_id: None,
            attributes: BTreeMap::new(),
            position: Position::Flow,
            width: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.element_id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Box computed for one node, relative to the layout root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutBox {
    pub node: NodeId,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    body: NodeId,
    viewport_width: u32,
}

impl Document {
    pub fn new(viewport_width: u32) -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeKind::Body))],
            body: 0,
            viewport_width,
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Add a detached node.
    pub fn create(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(Node {
            parent: None,
            children: Vec::new(),
            ..node
        }));
        self.nodes.len() - 1
    }

    /// Attach `child` as the last child of `parent`, detaching it first if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || self.get(parent).is_none() || self.get(child).is_none() {
            return false;
        }
        if self.ancestors(parent).contains(&child) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        true
    }

    /// Create `node` and append it to `parent` in one step.
    pub fn append(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.create(node);
        self.append_child(parent, id);
        id
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
    }

    /// Remove a node and its whole subtree. The body cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.body || self.get(id).is_none() {
            return false;
        }
        self.detach(id);
        for node in self.descendants(id) {
            self.nodes[node] = None;
        }
        true
    }

    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(p) = current {
            out.push(p);
            current = self.get(p).and_then(|n| n.parent);
        }
        out
    }

    /// True when the node is reachable from the body.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.body || self.ancestors(id).last() == Some(&self.body)
    }

    /// Pre-order list of `root` and everything below it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            out.push(id);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// First attached node (document order) carrying `element_id`.
    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.body).into_iter().find(|&id| {
            self.get(id)
                .and_then(|n| n.element_id.as_deref())
                .is_some_and(|e| e == element_id)
        })
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    /// All nodes under `root` (inclusive) carrying attribute `name`.
    pub fn query_attribute_all(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.attribute(id, name).is_some())
            .collect()
    }

    pub fn query_attribute(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.query_attribute_all(root, name).into_iter().next()
    }

    /// Copy `root` and its subtree into fresh, detached nodes.
    pub fn deep_clone(&mut self, root: NodeId) -> Option<NodeId> {
        let node = self.get(root)?.clone();
        let copy = self.create(node.clone());
        for child in node.children {
            if let Some(child_copy) = self.deep_clone(child) {
                self.append_child(copy, child_copy);
            }
        }
        Some(copy)
    }

    /// Compute boxes for `root` and its visible subtree, painting order.
    pub fn layout(&self, root: NodeId) -> Vec<LayoutBox> {
        let width = self
            .get(root)
            .and_then(|n| n.width)
            .unwrap_or(self.viewport_width);
        let mut out = Vec::new();
        self.layout_node(root, 0, 0, width, &mut out);
        out
    }

    /// Outer size of the laid-out root.
    #[cfg(test)]
    pub fn layout_size(&self, root: NodeId) -> (u32, u32) {
        self.layout(root)
            .first()
            .map(|b| (b.width, b.height))
            .unwrap_or((0, 0))
    }

    fn intrinsic_height(&self, node: &Node, width: u32) -> u32 {
        match &node.kind {
            NodeKind::Heading(_) => HEADING_HEIGHT,
            NodeKind::Text(text) => {
                let lines = super::raster::wrap_text(text, (width / CHAR_WIDTH) as usize).len();
                lines as u32 * LINE_HEIGHT + 4
            }
            NodeKind::Visualization { options, .. } => options.height.max(0.0).round() as u32,
            NodeKind::Image {
                width: w, height: h, ..
            } => {
                if *w > width && *w > 0 {
                    (*h as u64 * width as u64 / *w as u64) as u32
                } else {
                    *h
                }
            }
            NodeKind::Badge(_) => BADGE_HEIGHT,
            NodeKind::Overlay(_) | NodeKind::Body | NodeKind::Block | NodeKind::Container => 0,
        }
    }

    fn intrinsic_width(&self, node: &Node, available: u32) -> u32 {
        let natural = match &node.kind {
            NodeKind::Badge(label) => label.chars().count() as u32 * CHAR_WIDTH + 24,
            NodeKind::Image { width, .. } => *width,
            _ => available,
        };
        node.width.unwrap_or(natural).min(available.max(1))
    }

    fn layout_node(&self, id: NodeId, x: i32, y: i32, width: u32, out: &mut Vec<LayoutBox>) -> u32 {
        let Some(node) = self.get(id) else { return 0 };
        let slot = out.len();
        out.push(LayoutBox {
            node: id,
            x,
            y,
            width,
            height: 0,
        });

        let height = match node.kind {
            NodeKind::Body | NodeKind::Block | NodeKind::Container => {
                let pad = if matches!(node.kind, NodeKind::Body) { 0 } else { BLOCK_PADDING };
                let inner = width.saturating_sub(2 * pad);
                let mut cursor = y + pad as i32;
                let mut placed = 0;
                for &child in &node.children {
                    let Some(c) = self.get(child) else { continue };
                    if c.position != Position::Flow {
                        continue;
                    }
                    if placed > 0 {
                        cursor += FLOW_GAP as i32;
                    }
                    let child_width = c.width.unwrap_or(inner).min(inner.max(1));
                    cursor += self.layout_node(child, x + pad as i32, cursor, child_width, out) as i32;
                    placed += 1;
                }
                (cursor - y) as u32 + pad
            }
            _ => self.intrinsic_height(node, width),
        };
        out[slot].height = height;

        // Out-of-flow children paint above the flow content.
        for &child in &node.children {
            let Some(c) = self.get(child) else { continue };
            match c.position {
                Position::Flow | Position::Offscreen { .. } => {}
                Position::Fixed { right, bottom } => {
                    let w = self.intrinsic_width(c, width);
                    let h = self.intrinsic_height(c, w);
                    let cx = x + width as i32 - right as i32 - w as i32;
                    let cy = y + height as i32 - bottom as i32 - h as i32;
                    self.layout_node(child, cx, cy, w, out);
                }
                Position::Cover => {
                    let cover = out.len();
                    self.layout_node(child, x, y, width, out);
                    out[cover].height = height;
                }
            }
        }
        height
    }
}
