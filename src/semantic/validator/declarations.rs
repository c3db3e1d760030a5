//! Scoping rules: FROM-clause order, declared and used identification
//! variables, abstract schema names and subquery scopes.

use smol_str::SmolStr;

use super::SemanticValidator;
use crate::ast::{ExpressionTree, NodeId, NodeKind, Span};
use crate::diag::ProblemKey;
use crate::semantic::helper::{Declaration, DeclaredVariables, SemanticValidatorHelper};

impl<H: SemanticValidatorHelper> SemanticValidator<'_, H> {
    // ========================================================================
    // FROM clause
    // ========================================================================

    /// Every join path and every derived or collection-member path must start
    /// at a variable declared to its left.
    pub(super) fn validate_declaration_order(&mut self, from_clause: NodeId) {
        let tree = self.tree;
        let mut misplaced: Vec<(SmolStr, Span)> = Vec::new();
        {
            let declarations = self.helper.declarations();
            for (index, declaration) in declarations.iter().enumerate() {
                if declaration.is_range() {
                    for (join_index, join) in declaration.joins.iter().enumerate() {
                        if let Some((name, span)) = path_root_variable(tree, join.path) {
                            if is_declared_after(&name, index, Some(join_index), declarations) {
                                misplaced.push((name, span));
                            }
                        }
                    }
                } else if let Some((name, span)) = path_root_variable(tree, declaration.base) {
                    if is_declared_after(&name, index, None, declarations) {
                        misplaced.push((name, span));
                    }
                }
            }
        }

        for (name, span) in misplaced {
            self.problem_span(
                ProblemKey::IdentificationVariableWrongOrder,
                from_clause,
                span,
                [name],
            );
        }
    }

    pub(super) fn validate_range_root(&mut self, root: NodeId) {
        match self.tree.kind(root) {
            NodeKind::AbstractSchemaName { .. } => self.visit(root),
            kind if kind.is_path() => {
                self.validate_collection_valued_path(root, false);
            }
            _ => self.visit(root),
        }
    }

    pub(super) fn validate_join(
        &mut self,
        path: NodeId,
        variable: Option<NodeId>,
        on: Option<NodeId>,
    ) {
        let association = match self.tree.kind(path) {
            NodeKind::Treat {
                path: association,
                entity_type,
                ..
            } => {
                self.visit(*entity_type);
                *association
            }
            _ => path,
        };
        self.validate_collection_valued_path(association, false);
        self.visit_declared_variable(variable);
        if let Some(on) = on {
            self.visit(on);
        }
    }

    /// Visits the variable a declaration introduces without recording a use.
    pub(super) fn visit_declared_variable(&mut self, variable: Option<NodeId>) {
        let Some(variable) = variable else {
            return;
        };
        let register = std::mem::replace(&mut self.register_variables, false);
        self.visit(variable);
        self.register_variables = register;
    }

    pub(super) fn validate_abstract_schema_name(&mut self, id: NodeId, name: &str) {
        if self.helper.entity_named(name).is_some() {
            return;
        }

        // Inside a subquery of an alias-less UPDATE or DELETE, the name may be
        // a field of the statement's virtual variable.
        if self.helper.is_subquery() {
            let lookup = self.helper.virtual_identification_variable().map(|variable| {
                match self.helper.resolve_mapping_named(variable, name) {
                    None => Some(ProblemKey::StateFieldPathNotResolvable),
                    Some(mapping) if !mapping.is_relationship() => {
                        Some(ProblemKey::PathNotRelationshipMapping)
                    }
                    Some(_) => None,
                }
            });
            if let Some(problem) = lookup {
                if let Some(key) = problem {
                    self.problem_at(key, id);
                }
                return;
            }
        }

        self.problem_at(ProblemKey::AbstractSchemaNameInvalid, id);
    }

    // ========================================================================
    // Identification variables
    // ========================================================================

    pub(super) fn validate_identification_variable(&mut self, id: NodeId) {
        let NodeKind::IdentificationVariable {
            name,
            is_virtual,
            virtual_path,
        } = self.tree.kind(id)
        else {
            return;
        };

        if *is_virtual {
            if let Some(path) = virtual_path {
                self.visit(*path);
            }
            return;
        }

        if !self.register_variables {
            return;
        }
        // `TYPE(e) = LargeProject` names an entity, not a variable.
        if self.is_comparing_entity_type_literal(id) && self.helper.entity_named(name).is_some() {
            return;
        }
        self.record_used(id);
    }

    pub(super) fn record_used(&mut self, id: NodeId) {
        if !self.used.contains(&id) {
            self.used.push(id);
        }
    }

    /// True when `id` is an operand of a comparison, looking through any
    /// enclosing parentheses.
    fn is_comparing_entity_type_literal(&self, id: NodeId) -> bool {
        for ancestor in self.tree.ancestors(id) {
            match self.tree.kind(ancestor) {
                NodeKind::SubExpression { .. } => continue,
                NodeKind::Comparison { .. } => return true,
                _ => return false,
            }
        }
        false
    }

    /// Reports duplicates in the current scope and every variable in `used`
    /// no visible scope declares.
    pub(super) fn validate_identification_variables(&mut self, used: &[NodeId]) {
        let mut local = DeclaredVariables::new();
        self.helper
            .collect_local_declaration_identification_variables(&mut local);
        for (_, nodes) in local.duplicates() {
            for node in nodes {
                let name = variable_text(self.tree, *node);
                self.problem_span(
                    ProblemKey::IdentificationVariableDuplicate,
                    *node,
                    self.tree.span(*node),
                    [name],
                );
            }
        }

        let mut all = DeclaredVariables::new();
        self.helper
            .collect_all_declaration_identification_variables(&mut all);
        let tree = self.tree;
        let undeclared = used
            .iter()
            .copied()
            .filter(|id| !all.contains(&variable_text(tree, *id)));
        for id in undeclared {
            let name = variable_text(self.tree, id);
            self.problem_span(
                ProblemKey::IdentificationVariableNotDeclared,
                id,
                self.tree.span(id),
                [name],
            );
        }
    }

    // ========================================================================
    // Subqueries
    // ========================================================================

    /// Validates a subquery in its own scope. Variables first used inside it
    /// are checked there and do not leak into the enclosing scope; uses of
    /// the enclosing query are left for its own check.
    pub(super) fn validate_subquery(&mut self, id: NodeId) {
        let outer_used = self.used.clone();
        self.helper.new_subquery_context(id);
        self.visit_children(id);
        let inner_used: Vec<NodeId> = self
            .used
            .iter()
            .copied()
            .filter(|used| !outer_used.contains(used))
            .collect();
        self.validate_identification_variables(&inner_used);
        self.helper.dispose_subquery_context();
        self.used.retain(|used| outer_used.contains(used));
    }
}

/// The identification variable a path (or `TREAT`, `KEY`, `VALUE`, `ENTRY`)
/// starts from, with its span.
pub(super) fn path_root_variable(tree: &ExpressionTree, id: NodeId) -> Option<(SmolStr, Span)> {
    match tree.kind(id) {
        NodeKind::IdentificationVariable {
            name,
            is_virtual: false,
            ..
        } => Some((name.clone(), tree.span(id))),
        NodeKind::StateFieldPath { root, .. } | NodeKind::CollectionValuedPath { root, .. } => {
            path_root_variable(tree, *root)
        }
        NodeKind::Treat { path, .. } => path_root_variable(tree, *path),
        NodeKind::Key { expression }
        | NodeKind::Value { expression }
        | NodeKind::Entry { expression } => path_root_variable(tree, *expression),
        _ => None,
    }
}

/// Scans left to right from declaration `index`: later declarations by their
/// variable, joins of the current declaration after `join_index`, and every
/// join of later declarations.
///
/// A declaration of unknown kind ends the scan.
fn is_declared_after(
    name: &str,
    index: usize,
    join_index: Option<usize>,
    declarations: &[Declaration],
) -> bool {
    for (position, declaration) in declarations.iter().enumerate().skip(index) {
        let first_join = if position == index {
            join_index.map_or(0, |join_index| join_index + 1)
        } else {
            if !declaration.is_known_kind() {
                return false;
            }
            if declaration.declares_variable(name) {
                return true;
            }
            0
        };
        if declaration.joins.iter().skip(first_join).any(|join| join.declares(name)) {
            return true;
        }
    }
    false
}

fn variable_text(tree: &ExpressionTree, id: NodeId) -> String {
    match tree.kind(id) {
        NodeKind::IdentificationVariable { name, .. } => name.to_string(),
        _ => tree.to_parsed_text(id),
    }
}
