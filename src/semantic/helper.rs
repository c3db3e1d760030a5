//! The contract between the semantic validator and its query context.
//!
//! The validator walks the tree and decides which rule applies where; the
//! helper answers questions about declarations, scopes and the metamodel.
//! [`JpqlQueryContext`](super::JpqlQueryContext) is the default helper.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use super::metamodel::{ManagedType, Mapping, TypeInfo};
use crate::ast::NodeId;

/// Which FROM-clause form introduced a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// `Employee e`
    Range,
    /// `e.projects p` in a subquery's FROM clause.
    Derived,
    /// `IN(e.projects) p`
    Collection,
    /// A declaration the parser could not read.
    Unknown,
}

/// A `JOIN` inside a range declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDeclaration {
    pub node: NodeId,
    /// The association path (or `TREAT` expression).
    pub path: NodeId,
    pub variable: Option<SmolStr>,
    pub variable_node: Option<NodeId>,
}

/// One FROM-clause entry (or the range of an UPDATE/DELETE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    /// The declaration node itself.
    pub node: NodeId,
    /// The abstract schema name, or the path of a derived or collection
    /// declaration.
    pub base: NodeId,
    /// Entity name of a range declaration.
    pub entity_name: Option<SmolStr>,
    pub variable: Option<SmolStr>,
    pub variable_node: Option<NodeId>,
    pub joins: Vec<JoinDeclaration>,
}

impl Declaration {
    pub fn is_range(&self) -> bool {
        self.kind == DeclarationKind::Range
    }

    /// True for range, derived and collection declarations.
    pub fn is_known_kind(&self) -> bool {
        self.kind != DeclarationKind::Unknown
    }

    /// Whether the declaration's own variable is `name`, ignoring case.
    pub fn declares_variable(&self, name: &str) -> bool {
        same_variable(self.variable.as_deref(), name)
    }

    /// Whether this declaration or one of its joins binds `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.declares_variable(name) || self.joins.iter().any(|join| join.declares(name))
    }
}

impl JoinDeclaration {
    /// Whether the join's variable is `name`, ignoring case.
    pub fn declares(&self, name: &str) -> bool {
        same_variable(self.variable.as_deref(), name)
    }
}

fn same_variable(variable: Option<&str>, name: &str) -> bool {
    variable.is_some_and(|variable| variable.eq_ignore_ascii_case(name))
}

/// Declared identification variables keyed by upper-cased name.
///
/// Iteration is ordered by key so problem lists are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredVariables {
    entries: BTreeMap<String, Vec<NodeId>>,
}

impl DeclaredVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, node: NodeId) {
        self.entries
            .entry(name.to_uppercase())
            .or_default()
            .push(node);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_uppercase())
    }

    /// Names declared more than once, with every declaring node.
    pub fn duplicates(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.entries
            .iter()
            .filter(|(_, nodes)| nodes.len() > 1)
            .map(|(name, nodes)| (name.as_str(), nodes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Questions the validator asks while walking a query.
///
/// A helper tracks a stack of scopes: the statement being validated and the
/// subqueries entered so far. Lookups by variable name search the innermost
/// scope first and then every enclosing one; [`declarations`] and the local
/// collection only see the innermost scope.
///
/// [`declarations`]: SemanticValidatorHelper::declarations
pub trait SemanticValidatorHelper {
    /// Finds an entity by its abstract schema name.
    fn entity_named(&self, name: &str) -> Option<&ManagedType>;

    /// The managed type an identification variable ranges over.
    fn managed_type(&self, variable: &str) -> Option<&ManagedType>;

    fn mapping_named<'m>(&'m self, managed: &'m ManagedType, field: &str) -> Option<&'m Mapping>;

    /// Resolves a path (or a variable bound to one) to its last mapping.
    fn resolve_mapping(&self, path: NodeId) -> Option<&Mapping>;

    /// Resolves `field` against the type of `variable`.
    fn resolve_mapping_named(&self, variable: &str, field: &str) -> Option<&Mapping>;

    fn mapping_type(&self, mapping: &Mapping) -> Option<&TypeInfo>;

    /// The entity or embeddable a relationship or embedded mapping points to.
    fn mapping_managed_type(&self, mapping: &Mapping) -> Option<&ManagedType>;

    /// The type a path denotes when it has no mapping of its own.
    ///
    /// A fully qualified enum constant resolves to its enum; a path whose last
    /// field is unmapped resolves to the type that owns it.
    fn path_type(&self, path: NodeId) -> Option<&TypeInfo>;

    /// True when `name` is bound to the elements of a collection.
    fn is_collection_identification_variable(&self, name: &str) -> bool;

    /// Declarations of the innermost scope, in source order.
    fn declarations(&self) -> &[Declaration];

    /// Variable of an alias-less UPDATE or DELETE, when one encloses the
    /// current scope.
    fn virtual_identification_variable(&self) -> Option<&str>;

    /// True while a subquery scope is active.
    fn is_subquery(&self) -> bool;

    fn collect_local_declaration_identification_variables(&self, out: &mut DeclaredVariables);

    fn collect_all_declaration_identification_variables(&self, out: &mut DeclaredVariables);

    fn new_subquery_context(&mut self, subquery: NodeId);

    fn dispose_subquery_context(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_variables_are_case_insensitive() {
        let mut declared = DeclaredVariables::new();
        declared.insert("emp", NodeId(1));
        assert!(declared.contains("EMP"));
        assert!(declared.contains("Emp"));
        assert!(!declared.contains("e"));
        assert_eq!(declared.len(), 1);
    }

    #[test]
    fn duplicates_keep_every_occurrence() {
        let mut declared = DeclaredVariables::new();
        declared.insert("e", NodeId(3));
        declared.insert("d", NodeId(5));
        declared.insert("E", NodeId(9));
        let duplicates: Vec<_> = declared.duplicates().collect();
        assert_eq!(duplicates, vec![("E", &[NodeId(3), NodeId(9)][..])]);
    }

    #[test]
    fn declaration_declares_join_variables() {
        let declaration = Declaration {
            kind: DeclarationKind::Range,
            node: NodeId(0),
            base: NodeId(1),
            entity_name: Some("Employee".into()),
            variable: Some("e".into()),
            variable_node: Some(NodeId(2)),
            joins: vec![JoinDeclaration {
                node: NodeId(6),
                path: NodeId(4),
                variable: Some("p".into()),
                variable_node: Some(NodeId(5)),
            }],
        };
        assert!(declaration.declares("E"));
        assert!(declaration.declares("p"));
        assert!(!declaration.declares("x"));
        assert!(declaration.declares_variable("e"));
        assert!(!declaration.declares_variable("p"));
        assert!(declaration.joins[0].declares("P"));
        assert!(declaration.is_range());
        assert!(declaration.is_known_kind());
    }
}
