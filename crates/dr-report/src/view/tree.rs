//! Arena tree representing the dashboard view.

use image::RgbaImage;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// The view shared between pipeline components on one event loop.
pub type SharedView = Rc<RefCell<ViewTree>>;

/// Index of a node in its [`ViewTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inline style declarations of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap(BTreeMap<String, String>);

impl StyleMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a `px` length such as `"450px"`.
    pub fn pixels(&self, key: &str) -> Option<u32> {
        let value = self.get(key)?.trim();
        let number = value.strip_suffix("px").unwrap_or(value).trim();
        number.parse::<f32>().ok().filter(|v| *v >= 0.0).map(|v| v.round() as u32)
    }

    fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StyleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Structural query against a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Tag(&'static str),
    Class(&'static str),
    Attr(&'static str),
    AttrEq(&'static str, &'static str),
}

/// One element of the view.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub tag: String,
    pub classes: BTreeSet<String>,
    pub attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    pub canvas: Option<RgbaImage>,
    style: StyleMap,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ViewNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            classes: BTreeSet::new(),
            attrs: BTreeMap::new(),
            text: None,
            canvas: None,
            style: StyleMap::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_style(mut self, key: &str, value: &str) -> Self {
        self.style.set(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_canvas(mut self, canvas: RgbaImage) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn style(&self) -> &StyleMap {
        &self.style
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn matches(&self, selector: Selector) -> bool {
        match selector {
            Selector::Tag(tag) => self.tag.eq_ignore_ascii_case(tag),
            Selector::Class(class) => self.has_class(class),
            Selector::Attr(name) => self.attrs.contains_key(name),
            Selector::AttrEq(name, value) => self.attr(name) == Some(value),
        }
    }
}

/// Arena of view nodes rooted at a single attached root.
#[derive(Debug, Clone)]
pub struct ViewTree {
    nodes: Vec<ViewNode>,
    root: NodeId,
    style_writes: u64,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    /// Create a tree with an empty `body` root.
    pub fn new() -> Self {
        Self::with_root(ViewNode::new("body"))
    }

    pub fn with_root(mut root: ViewNode) -> Self {
        root.parent = None;
        root.children.clear();
        Self {
            nodes: vec![root],
            root: NodeId(0),
            style_writes: 0,
        }
    }

    pub fn into_shared(self) -> SharedView {
        Rc::new(RefCell::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever created, attached or not.
    ///
    /// Detached nodes keep their slots, so every capture clone made during a
    /// run stays counted here for the life of the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &ViewNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ViewNode {
        &mut self.nodes[id.0]
    }

    /// Append `node` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, mut node: ViewNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Attach a detached subtree under `parent`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Remove `id` and its subtree from the live view.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.nodes[node.0].parent;
        }
        false
    }

    /// `id` followed by its descendants, in document order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Descendants of `id`, in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut nodes = self.subtree(id);
        nodes.remove(0);
        nodes
    }

    pub fn matches(&self, id: NodeId, selector: Selector) -> bool {
        self.nodes[id.0].matches(selector)
    }

    /// Every node in the subtree of `scope` (inclusive) matching `selector`.
    pub fn find_all(&self, scope: NodeId, selector: Selector) -> Vec<NodeId> {
        self.subtree(scope)
            .into_iter()
            .filter(|id| self.matches(*id, selector))
            .collect()
    }

    pub fn find_first(&self, scope: NodeId, selector: Selector) -> Option<NodeId> {
        self.subtree(scope)
            .into_iter()
            .find(|id| self.matches(*id, selector))
    }

    /// Nearest node matching `selector`, starting at `id` and walking up.
    pub fn closest(&self, id: NodeId, selector: Selector) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.matches(node, selector) {
                return Some(node);
            }
            current = self.nodes[node.0].parent;
        }
        None
    }

    /// Whitespace-joined text of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        self.subtree(id)
            .into_iter()
            .filter_map(|n| self.nodes[n.0].text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn style(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0].style.get(key)
    }

    pub fn set_style(&mut self, id: NodeId, key: &str, value: &str) {
        self.style_writes += 1;
        self.nodes[id.0].style.set(key, value);
    }

    pub fn remove_style(&mut self, id: NodeId, key: &str) {
        self.style_writes += 1;
        self.nodes[id.0].style.remove(key);
    }

    /// Set or remove attribute `name` depending on `value`.
    pub fn put_attr(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        let attrs = &mut self.nodes[id.0].attrs;
        match value {
            Some(value) => {
                attrs.insert(name.to_string(), value.to_string());
            }
            None => {
                attrs.remove(name);
            }
        }
    }

    /// Set or remove a declaration depending on `value`.
    pub fn put_style(&mut self, id: NodeId, key: &str, value: Option<&str>) {
        match value {
            Some(value) => self.set_style(id, key, value),
            None => self.remove_style(id, key),
        }
    }

    /// Number of inline-style writes since the tree was built.
    pub fn style_writes(&self) -> u64 {
        self.style_writes
    }

    /// Inline styles of every attached node.
    pub fn styles(&self) -> BTreeMap<NodeId, StyleMap> {
        self.subtree(self.root)
            .into_iter()
            .map(|id| (id, self.nodes[id.0].style.clone()))
            .collect()
    }

    /// Structurally copy the subtree at `id` into a new detached subtree.
    ///
    /// Canvas buffers are not carried over: each cloned canvas is blank with
    /// the original's dimensions. Returns the clone root and the
    /// `(original, clone)` pairing in document order.
    pub fn deep_clone(&mut self, id: NodeId) -> (NodeId, Vec<(NodeId, NodeId)>) {
        let mut pairs = Vec::new();
        let clone_root = self.clone_node(id, None, &mut pairs);
        (clone_root, pairs)
    }

    fn clone_node(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        pairs: &mut Vec<(NodeId, NodeId)>,
    ) -> NodeId {
        let source = &self.nodes[id.0];
        let copy = ViewNode {
            tag: source.tag.clone(),
            classes: source.classes.clone(),
            attrs: source.attrs.clone(),
            text: source.text.clone(),
            canvas: source
                .canvas
                .as_ref()
                .map(|c| RgbaImage::new(c.width(), c.height())),
            style: source.style.clone(),
            parent,
            children: Vec::new(),
        };
        let children = source.children.clone();

        let copy_id = NodeId(self.nodes.len());
        self.nodes.push(copy);
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(copy_id);
        }
        pairs.push((id, copy_id));
        for child in children {
            self.clone_node(child, Some(copy_id), pairs);
        }
        copy_id
    }
}
