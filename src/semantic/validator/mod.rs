//! Semantic validator for parsed JPQL.
//!
//! One traversal of the expression tree checks scoping (declaration order,
//! duplicates, undeclared variables) and typing (paths, function arguments,
//! UPDATE targets) against a [`SemanticValidatorHelper`]. Problems are
//! accumulated; nothing in a malformed tree stops the walk.
//!
//! The rules are grouped by concern:
//! - `declarations`: FROM clauses, identification variables, subquery scopes
//! - `paths`: state-field, collection-valued and UPDATE item paths
//! - `operands`: arithmetic, comparison and function arguments

mod declarations;
mod operands;
mod paths;

use tracing::{debug, warn};

use super::helper::SemanticValidatorHelper;
use crate::ast::{ExpressionTree, NodeId, NodeKind, Span};
use crate::diag::{Problem, ProblemKey};
use crate::parser::ParserConfig;

/// Configuration for parsing and semantic validation.
/// Limits and switches for one validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Parser cap on nested parentheses, functions and subqueries.
    pub max_nesting_depth: usize,

    /// Also validate the new-value side of `SET` items.
    pub validate_update_values: bool,

    /// Deepest node the validator descends into. `AND`/`OR` chains are walked
    /// flat and do not count against it.
    pub max_traversal_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 128,
            validate_update_values: true,
            max_traversal_depth: 512,
        }
    }
}

impl ValidationConfig {
    /// Sets the parser's nesting cap used by [`validate`](crate::validate).
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Turns checking of `SET` item values on or off.
    pub fn with_update_value_validation(mut self, enabled: bool) -> Self {
        self.validate_update_values = enabled;
        self
    }

    /// Sets the depth past which the validator reports
    /// [`ProblemKey::TraversalTooDeep`] instead of descending.
    pub fn with_max_traversal_depth(mut self, depth: usize) -> Self {
        self.max_traversal_depth = depth;
        self
    }

    /// The parser limits implied by this configuration.
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig::default().with_max_nesting_depth(self.max_nesting_depth)
    }
}

/// Validates one parsed query.
///
/// A validator is a per-run value: the used-variable list, the registration
/// flag and the problem list all live here, so validating queries in parallel
/// only needs one validator per query.
pub struct SemanticValidator<'t, H> {
    pub(super) tree: &'t ExpressionTree,
    pub(super) helper: H,
    pub(super) config: ValidationConfig,
    pub(super) problems: Vec<Problem>,
    /// Identification variable references seen so far, in visit order.
    pub(super) used: Vec<NodeId>,
    /// Off while visiting the variable a declaration introduces.
    pub(super) register_variables: bool,
    depth: usize,
    depth_exceeded: bool,
}

impl<'t, H: SemanticValidatorHelper> SemanticValidator<'t, H> {
    /// Creates a validator with the default configuration.
    pub fn new(tree: &'t ExpressionTree, helper: H) -> Self {
        Self {
            tree,
            helper,
            config: ValidationConfig::default(),
            problems: Vec::new(),
            used: Vec::new(),
            register_variables: true,
            depth: 0,
            depth_exceeded: false,
        }
    }

    /// Replaces the default [`ValidationConfig`].
    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    /// Walks the whole tree and returns the semantic problems in visit order.
    pub fn validate(mut self) -> Vec<Problem> {
        let root = self.tree.root();
        self.visit(root);
        debug!(
            nodes = self.tree.len(),
            problems = self.problems.len(),
            "semantic validation finished"
        );
        self.problems
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Visits `id` one level deeper. Past the traversal cap the branch is
    /// skipped and reported once as [`ProblemKey::TraversalTooDeep`].
    pub(super) fn visit(&mut self, id: NodeId) {
        if self.depth >= self.config.max_traversal_depth {
            if !self.depth_exceeded {
                warn!(
                    max_depth = self.config.max_traversal_depth,
                    "expression tree too deep, skipping the rest of the branch"
                );
                self.depth_exceeded = true;
                let max_depth = self.config.max_traversal_depth.to_string();
                self.problem_span(ProblemKey::TraversalTooDeep, id, self.tree.span(id), [max_depth]);
            }
            return;
        }
        self.depth += 1;
        self.visit_kind(id);
        self.depth -= 1;
    }

    pub(super) fn visit_children(&mut self, id: NodeId) {
        for child in self.tree.children(id) {
            self.visit(child);
        }
    }

    /// `a AND b OR c ...` nests to the left, one node per operator. The left
    /// spine is unrolled so a long flat chain costs one level, and the
    /// operands are still visited in source order.
    fn visit_logical_chain(&mut self, id: NodeId) {
        let tree = self.tree;
        let mut rights = Vec::new();
        let mut current = id;
        while let NodeKind::And { left, right } | NodeKind::Or { left, right } = tree.kind(current) {
            rights.push(*right);
            current = *left;
        }
        self.visit(current);
        for right in rights.into_iter().rev() {
            self.visit(right);
        }
    }

    fn visit_kind(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::JpqlExpression { statement, .. } => {
                if let Some(statement) = statement {
                    self.visit(*statement);
                    if is_statement(tree.kind(*statement)) {
                        let used = self.used.clone();
                        self.validate_identification_variables(&used);
                    }
                }
            }
            NodeKind::SimpleSelectStatement { .. } => {
                if tree.parent(id) == Some(tree.root()) {
                    self.visit_children(id);
                } else {
                    self.validate_subquery(id);
                }
            }
            NodeKind::FromClause { .. } | NodeKind::SimpleFromClause { .. } => {
                self.validate_declaration_order(id);
                self.visit_children(id);
            }
            NodeKind::RangeVariableDeclaration { root, variable, .. } => {
                self.validate_range_root(*root);
                self.visit_declared_variable(*variable);
            }
            NodeKind::CollectionMemberDeclaration { path, variable, .. } => {
                self.validate_collection_valued_path(*path, true);
                self.visit_declared_variable(*variable);
            }
            NodeKind::Join {
                path, variable, on, ..
            } => self.validate_join(*path, *variable, *on),
            NodeKind::AbstractSchemaName { name } => self.validate_abstract_schema_name(id, name),
            NodeKind::IdentificationVariable { .. } => self.validate_identification_variable(id),
            NodeKind::ResultVariable {
                expression,
                variable,
                ..
            } => {
                self.visit(*expression);
                self.visit_declared_variable(Some(*variable));
            }
            NodeKind::EntityTypeLiteral { name } => self.validate_entity_type_literal(id, name),
            NodeKind::UpdateItem { path, value } => {
                self.validate_update_item(*path);
                if self.config.validate_update_values {
                    self.visit(*value);
                }
            }

            NodeKind::Comparison {
                left,
                operator,
                right,
            } => {
                if operator.is_ordering() {
                    self.validate_operands(*left, *right);
                } else {
                    self.visit(*left);
                    self.visit(*right);
                }
            }
            NodeKind::Addition { left, right }
            | NodeKind::Subtraction { left, right }
            | NodeKind::Multiplication { left, right }
            | NodeKind::Division { left, right } => {
                self.validate_operands(*left, *right);
            }
            NodeKind::ArithmeticFactor { expression, .. }
            | NodeKind::Abs { expression }
            | NodeKind::Sqrt { expression }
            | NodeKind::Length { expression }
            | NodeKind::Lower { expression }
            | NodeKind::Upper { expression } => {
                self.validate_basic_operand(*expression);
            }
            NodeKind::Aggregate {
                function,
                expression,
                ..
            } => self.validate_aggregate(*function, *expression),
            NodeKind::Concat { arguments } => {
                for argument in arguments {
                    self.validate_basic_operand(*argument);
                }
            }
            NodeKind::Trim {
                character, string, ..
            } => {
                if let Some(character) = character {
                    self.visit(*character);
                }
                self.validate_basic_operand(*string);
            }
            NodeKind::Like {
                expression,
                pattern,
                escape,
                ..
            } => {
                self.validate_basic_operand(*expression);
                self.visit(*pattern);
                if let Some(escape) = escape {
                    self.visit(*escape);
                }
            }
            NodeKind::Mod { first, second } => {
                self.validate_basic_operand(*first);
                self.visit(*second);
            }
            NodeKind::Locate {
                first,
                second,
                third,
            }
            | NodeKind::Substring {
                first,
                second,
                third,
            } => {
                self.validate_basic_operand(*first);
                self.visit(*second);
                if let Some(third) = third {
                    self.visit(*third);
                }
            }
            NodeKind::Size { expression } | NodeKind::EmptyCollectionComparison { expression, .. } => {
                self.validate_collection_valued_path(*expression, true);
            }
            NodeKind::CollectionMember {
                entity, collection, ..
            } => {
                self.visit(*entity);
                self.validate_collection_valued_path(*collection, true);
            }
            NodeKind::Index { expression } => self.validate_index(*expression),

            NodeKind::OrderByItem { expression, .. } => {
                self.validate_basic_operand(*expression);
            }
            NodeKind::And { .. } | NodeKind::Or { .. } => self.visit_logical_chain(id),

            NodeKind::StateFieldPath { .. } => {
                self.validate_state_field_path(id, true);
            }
            NodeKind::CollectionValuedPath { root, .. } => self.visit(*root),

            NodeKind::SelectStatement { .. }
            | NodeKind::UpdateStatement { .. }
            | NodeKind::DeleteStatement { .. }
            | NodeKind::SelectClause { .. }
            | NodeKind::SimpleSelectClause { .. }
            | NodeKind::WhereClause { .. }
            | NodeKind::HavingClause { .. }
            | NodeKind::GroupByClause { .. }
            | NodeKind::OrderByClause { .. }
            | NodeKind::UpdateClause { .. }
            | NodeKind::DeleteClause { .. }
            | NodeKind::OnClause { .. }
            | NodeKind::IdentificationVariableDeclaration { .. }
            | NodeKind::ConstructorExpression { .. }
            | NodeKind::ObjectExpression { .. }
            | NodeKind::SubExpression { .. }
            | NodeKind::Not { .. }
            | NodeKind::Between { .. }
            | NodeKind::In { .. }
            | NodeKind::NullComparison { .. }
            | NodeKind::Exists { .. }
            | NodeKind::AllOrAny { .. }
            | NodeKind::Key { .. }
            | NodeKind::Value { .. }
            | NodeKind::Entry { .. }
            | NodeKind::Type { .. }
            | NodeKind::Coalesce { .. }
            | NodeKind::NullIf { .. }
            | NodeKind::Case { .. }
            | NodeKind::When { .. }
            | NodeKind::Treat { .. }
            | NodeKind::Function { .. } => self.visit_children(id),

            NodeKind::NumericLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::KeywordLiteral { .. }
            | NodeKind::DateTime { .. }
            | NodeKind::InputParameter { .. }
            | NodeKind::Unknown { .. }
            | NodeKind::Bad => {}
        }
    }

    // ========================================================================
    // Problems
    // ========================================================================

    /// Records a problem spanning `node`, with the node's parsed text as the
    /// only argument.
    pub(super) fn problem_at(&mut self, key: ProblemKey, node: NodeId) {
        let argument = self.tree.to_parsed_text(node);
        self.problem_span(key, node, self.tree.span(node), [argument]);
    }

    pub(super) fn problem_span<I, S>(&mut self, key: ProblemKey, anchor: NodeId, span: Span, arguments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut problem = Problem::new(key, span).with_anchor(anchor);
        for argument in arguments {
            problem = problem.with_argument(argument);
        }
        self.problems.push(problem);
    }
}

fn is_statement(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::SelectStatement { .. }
            | NodeKind::SimpleSelectStatement { .. }
            | NodeKind::UpdateStatement { .. }
            | NodeKind::DeleteStatement { .. }
    )
}
