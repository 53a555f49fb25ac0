//! Arena-backed syntax tree view.
//!
//! A [`SyntaxTree`] owns every node of one parse in a single `Vec`; nodes are
//! linked by index (parent, first child, next sibling), and [`SyntaxNode`] is a
//! cheap `Copy` handle borrowing the tree. The tree never holds the document
//! bytes: callers pass the source slice to [`SyntaxNode::bytes`].

use crate::error::{Result, SplitterError};
use std::fmt;
use std::ops::Range;

/// Index of a node inside its [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Most nodes one tree can hold; ids are `u32`
const MAX_NODES: usize = u32::MAX as usize;

impl NodeId {
    /// Callers keep `index < MAX_NODES`; larger indices saturate
    fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed classification of syntax nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Named grammar rule (`function_item`, `paragraph`, ...)
    Named,
    /// Anonymous token (punctuation, keywords)
    Anonymous,
    /// Error-recovery span; always a leaf
    Error,
    /// Zero-width token inserted by error recovery
    Missing,
    /// Synthesised node covering bytes the grammar root did not span
    Implicit,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    name: &'static str,
    start: usize,
    end: usize,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

/// Parsed syntax tree for one document
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    source_len: usize,
}

impl SyntaxTree {
    /// Root node; always spans `[0, source_len)`
    #[must_use]
    pub fn root(&self) -> SyntaxNode<'_> {
        self.node(self.root)
    }

    /// Handle for a node id
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        assert!(id.index() < self.nodes.len(), "node id out of range");
        SyntaxNode { tree: self, id }
    }

    /// Number of nodes in the arena
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Length of the document this tree was built for
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    /// Pre-order traversal from the root
    pub fn descendants(&self) -> Descendants<'_> {
        self.root().descendants()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// Borrowed handle to one node of a [`SyntaxTree`]
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    #[must_use]
    pub const fn id(self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn kind(self) -> NodeKind {
        self.data().kind
    }

    /// Grammar-specific node name, e.g. `function_item`
    #[must_use]
    pub fn kind_name(self) -> &'static str {
        self.data().name
    }

    #[must_use]
    pub fn start(self) -> usize {
        self.data().start
    }

    #[must_use]
    pub fn end(self) -> usize {
        self.data().end
    }

    #[must_use]
    pub fn byte_range(self) -> Range<usize> {
        self.start()..self.end()
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.end() - self.start()
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.start() == self.end()
    }

    /// A node without children; error nodes are always leaves
    #[must_use]
    pub fn is_leaf(self) -> bool {
        self.data().first_child.is_none() || self.is_error()
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self.kind() == NodeKind::Error
    }

    #[must_use]
    pub fn parent(self) -> Option<SyntaxNode<'t>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    #[must_use]
    pub fn first_child(self) -> Option<SyntaxNode<'t>> {
        self.data().first_child.map(|id| self.tree.node(id))
    }

    #[must_use]
    pub fn next_sibling(self) -> Option<SyntaxNode<'t>> {
        self.data().next_sibling.map(|id| self.tree.node(id))
    }

    /// Ordered children
    pub fn children(self) -> Children<'t> {
        Children {
            next: self.first_child(),
        }
    }

    #[must_use]
    pub fn child_count(self) -> usize {
        self.children().count()
    }

    /// Distance from the root (the root has depth 0)
    #[must_use]
    pub fn depth(self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(node) = current {
            depth += 1;
            current = node.parent();
        }
        depth
    }

    /// Pre-order traversal of this node and everything below it
    pub fn descendants(self) -> Descendants<'t> {
        Descendants {
            root: self.id,
            next: Some(self),
        }
    }

    /// Bytes of the source covered by this node
    #[must_use]
    pub fn bytes<'s>(self, source: &'s [u8]) -> &'s [u8] {
        &source[self.byte_range()]
    }

    fn data(self) -> &'t NodeData {
        self.tree.data(self.id)
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}..{})",
            self.kind_name(),
            self.start(),
            self.end()
        )
    }
}

/// Iterator over the children of a node
pub struct Children<'t> {
    next: Option<SyntaxNode<'t>>,
}

impl<'t> Iterator for Children<'t> {
    type Item = SyntaxNode<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next_sibling();
        Some(node)
    }
}

/// Pre-order iterator bounded to one subtree
pub struct Descendants<'t> {
    root: NodeId,
    next: Option<SyntaxNode<'t>>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = SyntaxNode<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.first_child().or_else(|| {
            let mut current = node;
            loop {
                if current.id == self.root {
                    return None;
                }
                if let Some(sibling) = current.next_sibling() {
                    return Some(sibling);
                }
                current = current.parent()?;
            }
        });
        Some(node)
    }
}

/// Incremental, pre-order construction of a [`SyntaxTree`]
///
/// ```
/// use code_splitter::{NodeKind, TreeBuilder};
///
/// let source = b"let x = 1;";
/// let mut builder = TreeBuilder::new();
/// builder.start_node(NodeKind::Named, "statement", 0, 10);
/// builder.leaf(NodeKind::Anonymous, "let", 0, 3);
/// builder.leaf(NodeKind::Named, "identifier", 4, 5);
/// builder.finish_node();
/// let tree = builder.build(source.len()).unwrap();
/// assert_eq!(tree.root().child_count(), 2);
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    /// Open nodes with the last child linked so far
    open: Vec<(NodeId, Option<NodeId>)>,
    root: Option<NodeId>,
    error: Option<String>,
    node_limit: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            open: Vec::new(),
            root: None,
            error: None,
            node_limit: MAX_NODES,
        }
    }
}

impl TreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity.min(MAX_NODES)),
            ..Self::default()
        }
    }

    #[cfg(test)]
    fn with_node_limit(mut self, node_limit: usize) -> Self {
        self.node_limit = node_limit.min(MAX_NODES);
        self
    }

    /// Open a node under the currently open node
    pub fn start_node(
        &mut self,
        kind: NodeKind,
        name: &'static str,
        start: usize,
        end: usize,
    ) -> NodeId {
        let id = self.push(kind, name, start, end);
        self.open.push((id, None));
        id
    }

    /// Close the most recently opened node
    pub fn finish_node(&mut self) {
        if self.open.pop().is_none() && self.error.is_none() {
            self.error = Some("finish_node called without an open node".to_string());
        }
    }

    /// Add a childless node under the currently open node
    pub fn leaf(&mut self, kind: NodeKind, name: &'static str, start: usize, end: usize) -> NodeId {
        self.push(kind, name, start, end)
    }

    fn push(&mut self, kind: NodeKind, name: &'static str, start: usize, end: usize) -> NodeId {
        if self.nodes.len() >= self.node_limit && self.error.is_none() {
            self.error = Some(format!("more than {} nodes", self.node_limit));
        }
        let id = NodeId::new(self.nodes.len());
        let parent = self.open.last().map(|(parent, _)| *parent);

        match self.open.last_mut() {
            Some((parent_id, last_child)) => {
                match *last_child {
                    Some(prev) => self.nodes[prev.index()].next_sibling = Some(id),
                    None => self.nodes[parent_id.index()].first_child = Some(id),
                }
                *last_child = Some(id);
            }
            None if self.root.is_none() => self.root = Some(id),
            None => {
                if self.error.is_none() {
                    self.error = Some(format!("second root node `{name}` at {start}..{end}"));
                }
            }
        }

        self.nodes.push(NodeData {
            kind,
            name,
            start,
            end,
            parent,
            first_child: None,
            next_sibling: None,
        });
        id
    }

    /// Validate the collected nodes and produce a tree spanning `[0, source_len)`
    ///
    /// Leading and trailing bytes the root does not cover are attached to an
    /// implicit `document` root as `trivia` leaves.
    pub fn build(mut self, source_len: usize) -> Result<SyntaxTree> {
        if let Some(error) = self.error.take() {
            return Err(SplitterError::parse(format!("malformed syntax tree: {error}")));
        }
        if !self.open.is_empty() {
            return Err(SplitterError::parse(format!(
                "malformed syntax tree: {} node(s) left open",
                self.open.len()
            )));
        }
        let Some(root) = self.root else {
            return Err(SplitterError::parse("malformed syntax tree: no root node"));
        };

        self.validate(source_len)?;

        let (root_start, root_end) = {
            let data = &self.nodes[root.index()];
            (data.start, data.end)
        };
        let root = if root_start == 0 && root_end == source_len {
            root
        } else {
            // Wrapping adds a `document` node and up to two `trivia` leaves.
            if self.nodes.len() + 3 > self.node_limit {
                return Err(SplitterError::parse(format!(
                    "malformed syntax tree: more than {} nodes",
                    self.node_limit
                )));
            }
            self.wrap_root(root, root_start, root_end, source_len)
        };

        Ok(SyntaxTree {
            nodes: self.nodes,
            root,
            source_len,
        })
    }

    fn validate(&self, source_len: usize) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if node.start > node.end || node.end > source_len {
                return Err(SplitterError::parse(format!(
                    "malformed syntax tree: `{}` spans {}..{} outside a {source_len} byte document",
                    node.name, node.start, node.end
                )));
            }

            let mut cursor = node.start;
            let mut child = node.first_child;
            while let Some(id) = child {
                let data = &self.nodes[id.index()];
                if data.start < cursor || data.end > node.end {
                    return Err(SplitterError::parse(format!(
                        "malformed syntax tree: child `{}` {}..{} overlaps or escapes `{}` (node {index})",
                        data.name, data.start, data.end, node.name
                    )));
                }
                cursor = data.end;
                child = data.next_sibling;
            }
        }
        Ok(())
    }

    fn wrap_root(
        &mut self,
        root: NodeId,
        root_start: usize,
        root_end: usize,
        source_len: usize,
    ) -> NodeId {
        let document = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData {
            kind: NodeKind::Implicit,
            name: "document",
            start: 0,
            end: source_len,
            parent: None,
            first_child: None,
            next_sibling: None,
        });

        let mut children = Vec::with_capacity(3);
        if root_start > 0 {
            children.push(self.implicit_leaf(document, 0, root_start));
        }
        children.push(root);
        if root_end < source_len {
            children.push(self.implicit_leaf(document, root_end, source_len));
        }

        self.nodes[root.index()].parent = Some(document);
        self.nodes[document.index()].first_child = children.first().copied();
        for pair in children.windows(2) {
            self.nodes[pair[0].index()].next_sibling = Some(pair[1]);
        }
        document
    }

    fn implicit_leaf(&mut self, parent: NodeId, start: usize, end: usize) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData {
            kind: NodeKind::Implicit,
            name: "trivia",
            start,
            end,
            parent: Some(parent),
            first_child: None,
            next_sibling: None,
        });
        id
    }
}
