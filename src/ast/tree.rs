//! Arena storage for a parsed query.

use super::node::{NodeId, NodeKind};
use super::Span;

/// One node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Non-owning back-reference; `None` only for the root.
    pub parent: Option<NodeId>,
}

/// A parsed query: the source text plus every node, owned root-to-leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionTree {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl ExpressionTree {
    /// The `JpqlExpression` node every other node descends from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The full query text the tree was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of nodes, virtual and recovery nodes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `id` belongs to another tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Byte range of the node in [`source`](Self::source).
    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span.clone()
    }

    /// `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Direct children in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// The parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// All nodes below `id` (inclusive) in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// The exact source text the node was parsed from.
    pub fn text(&self, id: NodeId) -> &str {
        self.source.get(self.span(id)).unwrap_or("")
    }

    /// The node's text with insignificant whitespace collapsed.
    ///
    /// Runs of whitespace outside string literals become a single space, so
    /// `e . name` and `e.name` differ but `a   =  b` reads `a = b`.
    pub fn to_parsed_text(&self, id: NodeId) -> String {
        normalize_whitespace(self.text(id))
    }

    /// Every node with its id, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }
}

/// Collapses whitespace runs outside single-quoted strings and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut pending_space = false;
    for ch in text.chars() {
        if !in_string && ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if ch == '\'' {
            in_string = !in_string;
        }
        out.push(ch);
    }
    out
}

/// Builds a tree bottom-up: children are pushed before their parent.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and adopts its children.
    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span.clone()
    }

    /// Replaces a node's kind without changing its children's ownership.
    ///
    /// Used when later context changes the meaning of an already built node,
    /// e.g. a path followed by `IS EMPTY` is collection-valued.
    pub fn retag(&mut self, id: NodeId, kind: NodeKind) {
        debug_assert_eq!(self.nodes[id.index()].kind.children(), kind.children());
        self.nodes[id.index()].kind = kind;
    }

    pub fn finish(self, source: &str, root: NodeId) -> ExpressionTree {
        ExpressionTree {
            source: source.to_string(),
            nodes: self.nodes,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::ComparisonOperator;

    fn comparison_tree() -> ExpressionTree {
        let source = "e.salary  >   1000";
        let mut builder = TreeBuilder::new();
        let var = builder.push(
            NodeKind::IdentificationVariable {
                name: "e".into(),
                is_virtual: false,
                virtual_path: None,
            },
            0..1,
        );
        let path = builder.push(
            NodeKind::StateFieldPath {
                root: var,
                segments: vec![crate::ast::Spanned::new("salary".into(), 2..8)],
                ends_with_dot: false,
            },
            0..8,
        );
        let number = builder.push(NodeKind::NumericLiteral { text: "1000".into() }, 14..18);
        let cmp = builder.push(
            NodeKind::Comparison {
                left: path,
                operator: ComparisonOperator::Gt,
                right: number,
            },
            0..18,
        );
        builder.finish(source, cmp)
    }

    #[test]
    fn parents_are_set_on_push() {
        let tree = comparison_tree();
        let root = tree.root();
        let children = tree.children(root);
        assert_eq!(children.len(), 2);
        for child in &children {
            assert_eq!(tree.parent(*child), Some(root));
        }
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn ancestors_walk_to_root() {
        let tree = comparison_tree();
        let var = NodeId(0);
        let chain: Vec<_> = tree.ancestors(var).collect();
        assert_eq!(chain, vec![NodeId(1), NodeId(3)]);
    }

    #[test]
    fn text_and_parsed_text() {
        let tree = comparison_tree();
        assert_eq!(tree.text(tree.root()), "e.salary  >   1000");
        assert_eq!(tree.to_parsed_text(tree.root()), "e.salary > 1000");
        assert_eq!(tree.text(NodeId(1)), "e.salary");
    }

    #[test]
    fn descendants_pre_order() {
        let tree = comparison_tree();
        assert_eq!(
            tree.descendants(tree.root()),
            vec![NodeId(3), NodeId(1), NodeId(0), NodeId(2)]
        );
    }

    #[test]
    fn whitespace_inside_strings_is_kept() {
        assert_eq!(normalize_whitespace("  a =   'x   y'  "), "a = 'x   y'");
        assert_eq!(normalize_whitespace("\tSELECT\n e"), "SELECT e");
    }
}
