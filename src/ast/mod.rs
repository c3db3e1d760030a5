//! Expression tree for parsed JPQL.
//!
//! The tree is an arena ([`ExpressionTree`]) of [`Node`]s. Ownership flows from
//! the root to the leaves through the child ids embedded in each [`NodeKind`];
//! the `parent` field of a node is a read-only back-reference used for upward
//! scans.

mod node;
mod span;
mod tree;
pub mod visit;

pub use node::{
    AggregateFunction, ComparisonOperator, DateTimeKind, JoinType, KeywordLiteralKind, NodeId,
    NodeKind, NullOrdering, Ordering, Quantifier, TrimSpecification,
};
pub use span::{Span, Spanned, cover};
pub use tree::{ExpressionTree, Node, TreeBuilder, normalize_whitespace};
pub use visit::{Visit, walk};
