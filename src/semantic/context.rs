//! Default [`SemanticValidatorHelper`]: declarations read from the tree,
//! types resolved through a [`Metamodel`].

use smol_str::SmolStr;
use tracing::trace;

use super::helper::{
    Declaration, DeclarationKind, DeclaredVariables, JoinDeclaration, SemanticValidatorHelper,
};
use super::metamodel::{ManagedType, Mapping, Metamodel, TypeInfo};
use crate::ast::{ExpressionTree, NodeId, NodeKind, Spanned};

/// Guards variable resolution against declarations that refer to each other
/// (`JOIN a.b a`).
const MAX_RESOLUTION_DEPTH: usize = 32;

/// The declarations of one statement or subquery.
#[derive(Debug, Clone)]
struct Scope {
    statement: NodeId,
    declarations: Vec<Declaration>,
    result_variables: Vec<(SmolStr, NodeId)>,
}

impl Scope {
    fn collect(tree: &ExpressionTree, statement: NodeId) -> Self {
        let mut scope = Scope {
            statement,
            declarations: Vec::new(),
            result_variables: Vec::new(),
        };

        match tree.kind(statement) {
            NodeKind::SelectStatement { select, from, .. }
            | NodeKind::SimpleSelectStatement { select, from, .. } => {
                if let Some(from) = from {
                    if let NodeKind::FromClause { declarations }
                    | NodeKind::SimpleFromClause { declarations } = tree.kind(*from)
                    {
                        scope.declarations = declarations
                            .iter()
                            .map(|id| declaration(tree, *id))
                            .collect();
                    }
                }
                if let NodeKind::SelectClause { items, .. } = tree.kind(*select) {
                    for item in items {
                        if let NodeKind::ResultVariable { variable, .. } = tree.kind(*item) {
                            if let Some(name) = variable_name(tree, Some(*variable)) {
                                scope.result_variables.push((name, *variable));
                            }
                        }
                    }
                }
            }
            NodeKind::UpdateStatement { update: clause, .. }
            | NodeKind::DeleteStatement { delete: clause, .. } => {
                if let NodeKind::UpdateClause { range, .. } | NodeKind::DeleteClause { range } =
                    tree.kind(*clause)
                {
                    scope.declarations.push(range_declaration(tree, *range, *range));
                }
            }
            _ => {}
        }
        scope
    }

    fn collect_variables(&self, out: &mut DeclaredVariables) {
        for declaration in &self.declarations {
            if let (Some(name), Some(node)) = (&declaration.variable, declaration.variable_node) {
                out.insert(name, node);
            }
            for join in &declaration.joins {
                if let (Some(name), Some(node)) = (&join.variable, join.variable_node) {
                    out.insert(name, node);
                }
            }
        }
        for (name, node) in &self.result_variables {
            out.insert(name, *node);
        }
    }
}

fn variable_name(tree: &ExpressionTree, variable: Option<NodeId>) -> Option<SmolStr> {
    match tree.kind(variable?) {
        NodeKind::IdentificationVariable { name, .. } => Some(name.clone()),
        _ => None,
    }
}

fn declaration(tree: &ExpressionTree, id: NodeId) -> Declaration {
    match tree.kind(id) {
        NodeKind::IdentificationVariableDeclaration { range, joins } => {
            let mut declaration = range_declaration(tree, *range, id);
            declaration.joins = joins
                .iter()
                .filter_map(|join| match tree.kind(*join) {
                    NodeKind::Join { path, variable, .. } => Some(JoinDeclaration {
                        node: *join,
                        path: *path,
                        variable: variable_name(tree, *variable),
                        variable_node: *variable,
                    }),
                    _ => None,
                })
                .collect();
            declaration
        }
        NodeKind::CollectionMemberDeclaration { path, variable, .. } => Declaration {
            kind: DeclarationKind::Collection,
            node: id,
            base: *path,
            entity_name: None,
            variable: variable_name(tree, *variable),
            variable_node: *variable,
            joins: Vec::new(),
        },
        _ => unknown_declaration(id),
    }
}

fn range_declaration(tree: &ExpressionTree, range: NodeId, node: NodeId) -> Declaration {
    let NodeKind::RangeVariableDeclaration { root, variable, .. } = tree.kind(range) else {
        return unknown_declaration(node);
    };
    let (kind, entity_name) = match tree.kind(*root) {
        NodeKind::AbstractSchemaName { name } => (DeclarationKind::Range, Some(name.clone())),
        kind if kind.is_path() => (DeclarationKind::Derived, None),
        _ => (DeclarationKind::Unknown, None),
    };
    Declaration {
        kind,
        node,
        base: *root,
        entity_name,
        variable: variable_name(tree, *variable),
        variable_node: *variable,
        joins: Vec::new(),
    }
}

fn unknown_declaration(node: NodeId) -> Declaration {
    Declaration {
        kind: DeclarationKind::Unknown,
        node,
        base: node,
        entity_name: None,
        variable: None,
        variable_node: None,
        joins: Vec::new(),
    }
}

/// What a variable name is bound to.
enum Binding {
    Entity(SmolStr),
    Path { path: NodeId, collection_member: bool },
}

/// Query context backed by a [`Metamodel`].
///
/// Created once per validation run. The outermost scope is the statement
/// under the tree's root; subquery scopes are pushed and popped by the
/// validator.
pub struct JpqlQueryContext<'a> {
    tree: &'a ExpressionTree,
    metamodel: &'a dyn Metamodel,
    scopes: Vec<Scope>,
}

impl<'a> JpqlQueryContext<'a> {
    pub fn new(tree: &'a ExpressionTree, metamodel: &'a dyn Metamodel) -> Self {
        let statement = match tree.kind(tree.root()) {
            NodeKind::JpqlExpression {
                statement: Some(statement),
                ..
            } => *statement,
            _ => tree.root(),
        };
        Self {
            tree,
            metamodel,
            scopes: vec![Scope::collect(tree, statement)],
        }
    }

    pub fn tree(&self) -> &'a ExpressionTree {
        self.tree
    }

    pub fn metamodel(&self) -> &'a dyn Metamodel {
        self.metamodel
    }

    /// Number of active scopes; 1 outside any subquery.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn binding(&self, name: &str) -> Option<Binding> {
        for scope in self.scopes.iter().rev() {
            for declaration in scope.declarations.iter().filter(|d| d.declares(name)) {
                if declaration.declares_variable(name) {
                    return match declaration.kind {
                        DeclarationKind::Range => {
                            declaration.entity_name.clone().map(Binding::Entity)
                        }
                        DeclarationKind::Derived => Some(Binding::Path {
                            path: declaration.base,
                            collection_member: false,
                        }),
                        DeclarationKind::Collection => Some(Binding::Path {
                            path: declaration.base,
                            collection_member: true,
                        }),
                        DeclarationKind::Unknown => None,
                    };
                }
                if let Some(join) = declaration.joins.iter().find(|join| join.declares(name)) {
                    return Some(Binding::Path {
                        path: join.path,
                        collection_member: false,
                    });
                }
            }
        }
        None
    }

    fn variable_type(&self, name: &str, depth: usize) -> Option<&'a ManagedType> {
        if depth > MAX_RESOLUTION_DEPTH {
            return None;
        }
        match self.binding(name)? {
            Binding::Entity(entity) => self.metamodel.entity_named(&entity).or_else(|| {
                // `FROM projects p` in a subquery of an alias-less UPDATE or
                // DELETE ranges over a field of the virtual variable.
                let virtual_variable = self.virtual_identification_variable()?;
                let owner = self.variable_type(virtual_variable, depth + 1)?;
                let mapping = self.metamodel.mapping_named(owner, &entity)?;
                self.metamodel.managed_type_for(&mapping.type_name)
            }),
            Binding::Path { path, .. } => self.expression_type(path, depth + 1),
        }
    }

    /// The managed type denoted by a variable, path, `TREAT` or `VALUE`.
    fn expression_type(&self, id: NodeId, depth: usize) -> Option<&'a ManagedType> {
        if depth > MAX_RESOLUTION_DEPTH {
            return None;
        }
        match self.tree.kind(id) {
            NodeKind::IdentificationVariable {
                virtual_path: Some(path),
                ..
            } => self.expression_type(*path, depth + 1),
            NodeKind::IdentificationVariable { name, .. } => self.variable_type(name, depth + 1),
            NodeKind::StateFieldPath { .. } | NodeKind::CollectionValuedPath { .. } => {
                let mapping = self.path_mapping(id, depth + 1)?;
                self.metamodel.managed_type_for(&mapping.type_name)
            }
            NodeKind::Treat { entity_type, .. } => match self.tree.kind(*entity_type) {
                NodeKind::EntityTypeLiteral { name } => self.metamodel.entity_named(name),
                _ => None,
            },
            NodeKind::Value { expression } => self.expression_type(*expression, depth + 1),
            _ => None,
        }
    }

    fn path_parts(&self, id: NodeId) -> Option<(NodeId, &'a [Spanned<SmolStr>])> {
        let tree: &'a ExpressionTree = self.tree;
        match tree.kind(id) {
            NodeKind::StateFieldPath { root, segments, .. }
            | NodeKind::CollectionValuedPath { root, segments, .. } => {
                Some((*root, segments.as_slice()))
            }
            _ => None,
        }
    }

    /// Walks `root.a.b.c` field by field; `None` as soon as a step is unknown.
    fn path_mapping(&self, id: NodeId, depth: usize) -> Option<&'a Mapping> {
        let (root, segments) = self.path_parts(id)?;
        let (last, init) = segments.split_last()?;
        let mut owner = self.expression_type(root, depth + 1)?;
        for segment in init {
            let mapping = self.metamodel.mapping_named(owner, &segment.node)?;
            owner = self.metamodel.managed_type_for(&mapping.type_name)?;
        }
        self.metamodel.mapping_named(owner, &last.node)
    }

    fn mapping_of(&self, id: NodeId, depth: usize) -> Option<&'a Mapping> {
        if depth > MAX_RESOLUTION_DEPTH {
            return None;
        }
        match self.tree.kind(id) {
            NodeKind::StateFieldPath { .. } | NodeKind::CollectionValuedPath { .. } => {
                self.path_mapping(id, depth + 1)
            }
            NodeKind::IdentificationVariable {
                virtual_path: Some(path),
                ..
            } => self.mapping_of(*path, depth + 1),
            NodeKind::IdentificationVariable { name, .. } => match self.binding(name)? {
                Binding::Path { path, .. } => self.mapping_of(path, depth + 1),
                Binding::Entity(_) => None,
            },
            NodeKind::Treat { path, .. } | NodeKind::Value { expression: path } => {
                self.mapping_of(*path, depth + 1)
            }
            _ => None,
        }
    }
}

impl SemanticValidatorHelper for JpqlQueryContext<'_> {
    fn entity_named(&self, name: &str) -> Option<&ManagedType> {
        self.metamodel.entity_named(name)
    }

    fn managed_type(&self, variable: &str) -> Option<&ManagedType> {
        self.variable_type(variable, 0)
    }

    fn mapping_named<'m>(&'m self, managed: &'m ManagedType, field: &str) -> Option<&'m Mapping> {
        self.metamodel.mapping_named(managed, field)
    }

    fn resolve_mapping(&self, path: NodeId) -> Option<&Mapping> {
        self.mapping_of(path, 0)
    }

    fn resolve_mapping_named(&self, variable: &str, field: &str) -> Option<&Mapping> {
        let managed = self.variable_type(variable, 0)?;
        self.metamodel.mapping_named(managed, field)
    }

    fn mapping_type(&self, mapping: &Mapping) -> Option<&TypeInfo> {
        self.metamodel.type_named(&mapping.type_name)
    }

    fn mapping_managed_type(&self, mapping: &Mapping) -> Option<&ManagedType> {
        self.metamodel.managed_type_for(&mapping.type_name)
    }

    fn path_type(&self, path: NodeId) -> Option<&TypeInfo> {
        if let Some(mapping) = self.mapping_of(path, 0) {
            return self.metamodel.type_named(&mapping.type_name);
        }

        let (root, segments) = self.path_parts(path)?;
        let (_, init) = segments.split_last()?;

        // `com.acme.Level.SENIOR`: everything before the last segment names a type.
        if let NodeKind::IdentificationVariable {
            name,
            is_virtual: false,
            ..
        } = self.tree.kind(root)
        {
            let mut qualified = name.to_string();
            for segment in init {
                qualified.push('.');
                qualified.push_str(&segment.node);
            }
            if let Some(info) = self.metamodel.type_named(&qualified) {
                return Some(info);
            }
        }

        let mut owner = self.expression_type(root, 0)?;
        for segment in init {
            let mapping = self.metamodel.mapping_named(owner, &segment.node)?;
            owner = self.metamodel.managed_type_for(&mapping.type_name)?;
        }
        self.metamodel.type_named(&owner.type_name)
    }

    fn is_collection_identification_variable(&self, name: &str) -> bool {
        match self.binding(name) {
            Some(Binding::Path {
                collection_member: true,
                ..
            }) => true,
            Some(Binding::Path { path, .. }) => self
                .mapping_of(path, 0)
                .is_some_and(|mapping| mapping.is_collection()),
            _ => false,
        }
    }

    fn declarations(&self) -> &[Declaration] {
        self.scopes
            .last()
            .map(|scope| scope.declarations.as_slice())
            .unwrap_or(&[])
    }

    fn virtual_identification_variable(&self) -> Option<&str> {
        let scope = self.scopes.first()?;
        scope.declarations.iter().find_map(|declaration| {
            let node = declaration.variable_node?;
            match self.tree.kind(node) {
                NodeKind::IdentificationVariable {
                    name,
                    is_virtual: true,
                    ..
                } => Some(name.as_str()),
                _ => None,
            }
        })
    }

    fn is_subquery(&self) -> bool {
        self.scopes.len() > 1
    }

    fn collect_local_declaration_identification_variables(&self, out: &mut DeclaredVariables) {
        if let Some(scope) = self.scopes.last() {
            scope.collect_variables(out);
        }
    }

    fn collect_all_declaration_identification_variables(&self, out: &mut DeclaredVariables) {
        for scope in &self.scopes {
            scope.collect_variables(out);
        }
    }

    fn new_subquery_context(&mut self, subquery: NodeId) {
        let scope = Scope::collect(self.tree, subquery);
        trace!(
            subquery = %subquery,
            declarations = scope.declarations.len(),
            depth = self.scopes.len() + 1,
            "entering subquery scope"
        );
        self.scopes.push(scope);
    }

    fn dispose_subquery_context(&mut self) {
        if self.scopes.len() > 1 {
            if let Some(scope) = self.scopes.pop() {
                trace!(subquery = %scope.statement, depth = self.scopes.len(), "left subquery scope");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::rules::QL_STATEMENT;
    use crate::parse;
    use crate::semantic::metamodel::{InMemoryMetamodel, MappingKind};

    fn model() -> InMemoryMetamodel {
        InMemoryMetamodel::new()
            .with_managed_type(
                ManagedType::entity("Employee", "com.acme.Employee")
                    .with_mapping("id", MappingKind::Id, "long")
                    .with_basic("name", "java.lang.String")
                    .with_mapping("level", MappingKind::Basic, "com.acme.Level")
                    .with_mapping("address", MappingKind::Embedded, "com.acme.Address")
                    .with_mapping("manager", MappingKind::ManyToOne, "com.acme.Employee")
                    .with_mapping("projects", MappingKind::OneToMany, "com.acme.Project"),
            )
            .with_managed_type(
                ManagedType::embeddable("com.acme.Address").with_basic("city", "java.lang.String"),
            )
            .with_managed_type(
                ManagedType::entity("Project", "com.acme.Project")
                    .with_basic("name", "java.lang.String"),
            )
            .with_enum("com.acme.Level", ["JUNIOR", "SENIOR"])
    }

    fn find_path(tree: &ExpressionTree, text: &str) -> NodeId {
        tree.nodes()
            .find(|(id, node)| node.kind.is_path() && tree.text(*id) == text)
            .map(|(id, _)| id)
            .unwrap_or_else(|| panic!("no path `{text}`"))
    }

    #[test]
    fn declarations_in_source_order() {
        let model = model();
        let output = parse(
            "SELECT e FROM Employee e JOIN e.projects p, IN(e.projects) q",
            QL_STATEMENT,
        )
        .unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        let declarations = context.declarations();
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].kind, DeclarationKind::Range);
        assert_eq!(declarations[0].entity_name.as_deref(), Some("Employee"));
        assert_eq!(declarations[0].joins.len(), 1);
        assert_eq!(declarations[0].joins[0].variable.as_deref(), Some("p"));
        assert_eq!(declarations[1].kind, DeclarationKind::Collection);
        assert_eq!(declarations[1].variable.as_deref(), Some("q"));
    }

    #[test]
    fn variables_resolve_through_joins() {
        let model = model();
        let output = parse("SELECT p FROM Employee e JOIN e.projects p", QL_STATEMENT).unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        assert_eq!(context.managed_type("E").map(|m| m.name.as_str()), Some("Employee"));
        assert_eq!(context.managed_type("p").map(|m| m.name.as_str()), Some("Project"));
        assert!(context.managed_type("x").is_none());
        assert!(context.is_collection_identification_variable("p"));
        assert!(!context.is_collection_identification_variable("e"));
    }

    #[test]
    fn paths_resolve_through_embeddables() {
        let model = model();
        let output = parse(
            "SELECT e FROM Employee e WHERE e.address.city = 'x'",
            QL_STATEMENT,
        )
        .unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        let path = find_path(&output.tree, "e.address.city");
        let mapping = context.resolve_mapping(path).unwrap();
        assert_eq!(mapping.name, "city");
        assert_eq!(mapping.kind, MappingKind::Basic);
    }

    #[test]
    fn qualified_enum_constant_has_enum_type() {
        let model = model();
        let output = parse(
            "SELECT e FROM Employee e WHERE e.level = com.acme.Level.SENIOR",
            QL_STATEMENT,
        )
        .unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        let path = find_path(&output.tree, "com.acme.Level.SENIOR");
        assert!(context.resolve_mapping(path).is_none());
        let info = context.path_type(path).unwrap();
        assert!(info.is_enum());
        assert_eq!(info.name, "com.acme.Level");
    }

    #[test]
    fn unmapped_field_resolves_to_owner_type() {
        let model = model();
        let output = parse("SELECT e FROM Employee e WHERE e.salary = 1", QL_STATEMENT).unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        let path = find_path(&output.tree, "e.salary");
        assert_eq!(
            context.path_type(path).map(|t| t.name.as_str()),
            Some("com.acme.Employee")
        );

        let output = parse("SELECT e FROM Employee e WHERE x.salary = 1", QL_STATEMENT).unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        assert!(context.path_type(find_path(&output.tree, "x.salary")).is_none());
    }

    #[test]
    fn subquery_scopes_stack() {
        let model = model();
        let output = parse(
            "SELECT e FROM Employee e WHERE EXISTS (SELECT p FROM Project p)",
            QL_STATEMENT,
        )
        .unwrap();
        let subquery = output
            .tree
            .nodes()
            .find(|(_, node)| matches!(node.kind, NodeKind::SimpleSelectStatement { .. }))
            .map(|(id, _)| id)
            .unwrap();

        let mut context = JpqlQueryContext::new(&output.tree, &model);
        assert!(!context.is_subquery());
        context.new_subquery_context(subquery);
        assert!(context.is_subquery());
        assert_eq!(context.declarations()[0].variable.as_deref(), Some("p"));

        let mut local = DeclaredVariables::new();
        context.collect_local_declaration_identification_variables(&mut local);
        assert!(local.contains("p") && !local.contains("e"));
        let mut all = DeclaredVariables::new();
        context.collect_all_declaration_identification_variables(&mut all);
        assert!(all.contains("p") && all.contains("e"));
        assert!(context.managed_type("e").is_some());

        context.dispose_subquery_context();
        context.dispose_subquery_context();
        assert_eq!(context.depth(), 1);
        assert_eq!(context.declarations()[0].variable.as_deref(), Some("e"));
    }

    #[test]
    fn alias_less_update_has_virtual_variable() {
        let model = model();
        let output = parse("UPDATE Employee SET name = 'x'", QL_STATEMENT).unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        assert_eq!(context.virtual_identification_variable(), Some("employee"));
        assert_eq!(
            context.managed_type("employee").map(|m| m.name.as_str()),
            Some("Employee")
        );

        let output = parse("UPDATE Employee e SET e.name = 'x'", QL_STATEMENT).unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        assert_eq!(context.virtual_identification_variable(), None);
    }

    #[test]
    fn result_variables_are_declared() {
        let model = model();
        let output = parse("SELECT e.name AS n FROM Employee e ORDER BY n", QL_STATEMENT).unwrap();
        let context = JpqlQueryContext::new(&output.tree, &model);
        let mut local = DeclaredVariables::new();
        context.collect_local_declaration_identification_variables(&mut local);
        assert!(local.contains("N"));
        assert!(local.contains("e"));
    }
}
