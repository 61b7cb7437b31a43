//! The concrete syntax tree produced by a parse.
//!
//! Nodes live in a single arena owned by the [Cst] and reference their
//! children by [NodeId]. Every node spans a `[pos, end)` byte range of the
//! parsed input.

use std::ops::Range;

use crate::ll::{NameMap, NodeKind};

/// A wrapper type for referencing a node in a [Cst] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    span: Range<usize>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn pos(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Accumulates nodes bottom-up while a parse runs.
#[derive(Debug, Default)]
pub(crate) struct CstBuilder {
    nodes: Vec<Node>,
}

impl CstBuilder {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push_node_mut(
        &mut self,
        kind: NodeKind,
        span: Range<usize>,
        children: Vec<NodeId>,
    ) -> NodeId {
        self.nodes.push(Node {
            kind,
            span,
            children,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn finish(self, root: NodeId) -> Cst {
        Cst {
            nodes: self.nodes,
            root,
        }
    }
}

/// Decides, per node, whether a walk descends into the node's children.
pub trait Visitor {
    fn visit(&mut self, cst: &Cst, node: NodeId) -> bool;
}

impl<F> Visitor for F
where
    F: FnMut(&Cst, NodeId) -> bool,
{
    fn visit(&mut self, cst: &Cst, node: NodeId) -> bool {
        (self)(cst, node)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cst {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Cst {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Range<usize> {
        self.node(id).span()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Returns the bytes of `input` covered by a node.
    pub fn text<'i>(&self, id: NodeId, input: &'i [u8]) -> &'i [u8] {
        &input[self.node(id).span.clone()]
    }

    /// The number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks the tree depth-first from the root in child order.
    pub fn walk<V: Visitor>(&self, visitor: &mut V) {
        self.walk_from(self.root, visitor)
    }

    /// Walks the subtree rooted at `start`, `start` included.
    pub fn walk_from<V: Visitor>(&self, start: NodeId, visitor: &mut V) {
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            if visitor.visit(self, id) {
                stack.extend(self.children(id).iter().rev());
            }
        }
    }

    /// Iterates the leaves of the tree in input order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut leaves = vec![];
        self.walk(&mut |cst: &Cst, id| {
            if cst.node(id).is_leaf() {
                leaves.push(id);
            }
            true
        });

        leaves.into_iter()
    }

    /// Outputs an indented rendering of the tree with node names and the
    /// text each literal leaf matched.
    pub fn human_readable_format(&self, names: &NameMap, input: &[u8]) -> String {
        let mut lines = vec![];
        let mut stack = vec![(self.root, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id);
            let name = names.name_of(node.kind);
            let line = match node.kind {
                NodeKind::Literal => format!(
                    "{:indent$}{} {:?} [{}, {})",
                    "",
                    name,
                    String::from_utf8_lossy(self.text(id, input)),
                    node.pos(),
                    node.end(),
                    indent = depth * 2
                ),
                _ => format!(
                    "{:indent$}{} [{}, {})",
                    "",
                    name,
                    node.pos(),
                    node.end(),
                    indent = depth * 2
                ),
            };
            lines.push(line);

            stack.extend(node.children.iter().rev().map(|child| (*child, depth + 1)));
        }

        lines.join("\n")
    }
}
