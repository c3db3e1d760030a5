//! Read-only tree traversal.
//!
//! Node kinds form a closed enum, so a visitor is a single `visit_node` method
//! that matches on [`NodeKind`] and calls [`walk`] for the kinds it does not
//! handle itself.

use std::ops::ControlFlow;

use super::{ExpressionTree, NodeId};

/// Shared type alias for visitor traversal methods.
pub type VisitResult<B> = ControlFlow<B>;

pub trait Visit {
    type Break;

    fn visit_node(&mut self, tree: &ExpressionTree, id: NodeId) -> VisitResult<Self::Break> {
        walk(self, tree, id)
    }
}

/// Visits every child of `id` in source order.
pub fn walk<V: Visit + ?Sized>(
    visitor: &mut V,
    tree: &ExpressionTree,
    id: NodeId,
) -> VisitResult<V::Break> {
    for child in tree.children(id) {
        visitor.visit_node(tree, child)?;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;

    use super::*;
    use crate::ast::NodeKind;
    use crate::grammar::rules::QL_STATEMENT;
    use crate::parse;

    #[derive(Default)]
    struct PathCounter {
        count: usize,
    }

    impl Visit for PathCounter {
        type Break = ();

        fn visit_node(&mut self, tree: &ExpressionTree, id: NodeId) -> ControlFlow<()> {
            if tree.kind(id).is_path() {
                self.count += 1;
            }
            walk(self, tree, id)
        }
    }

    struct FirstParameter;

    impl Visit for FirstParameter {
        type Break = NodeId;

        fn visit_node(&mut self, tree: &ExpressionTree, id: NodeId) -> ControlFlow<NodeId> {
            if let NodeKind::InputParameter { .. } = tree.kind(id) {
                return ControlFlow::Break(id);
            }
            walk(self, tree, id)
        }
    }

    #[test]
    fn visitor_counts_paths() {
        let output = parse(
            "SELECT e.name FROM Employee e WHERE e.salary > 10 AND e.address.city = 'X'",
            QL_STATEMENT,
        )
        .unwrap();
        let mut visitor = PathCounter::default();
        let flow = visitor.visit_node(&output.tree, output.tree.root());
        assert!(flow.is_continue());
        assert_eq!(visitor.count, 3);
    }

    #[test]
    fn visitor_breaks_early() {
        let output = parse("SELECT e FROM Employee e WHERE e.id = :id OR e.id = ?2", QL_STATEMENT)
            .unwrap();
        let flow = FirstParameter.visit_node(&output.tree, output.tree.root());
        let ControlFlow::Break(id) = flow else {
            panic!("expected a parameter");
        };
        assert_eq!(output.tree.text(id), ":id");
    }
}
