//! The closed set of JPQL expression node kinds.
//!
//! Children are referenced by [`NodeId`] into the owning
//! [`ExpressionTree`](super::ExpressionTree). Optional grammar parts are
//! `Option`s and comma-separated lists are `Vec`s, so every kind has a fixed
//! shape and [`NodeKind::children`] can list them in source order.

use super::Spanned;
use smol_str::SmolStr;
use std::fmt;

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOperator {
    /// `<`, `<=`, `>` and `>=` require orderable (basic) operands.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            ComparisonOperator::Lt
                | ComparisonOperator::LtEq
                | ComparisonOperator::Gt
                | ComparisonOperator::GtEq
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::NotEq => "<>",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::LtEq => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Join,
    InnerJoin,
    LeftJoin,
    LeftOuterJoin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ordering {
    #[default]
    Default,
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullOrdering {
    #[default]
    Default,
    NullsFirst,
    NullsLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Avg,
    Sum,
    Min,
    Max,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrimSpecification {
    #[default]
    Default,
    Leading,
    Trailing,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordLiteralKind {
    True,
    False,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    All,
    Any,
    Some,
}

/// A JPQL expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    // ------------------------------------------------------------------
    // Root and statements
    // ------------------------------------------------------------------
    /// Root of every tree. `unknown` holds text left over after the statement.
    JpqlExpression {
        statement: Option<NodeId>,
        unknown: Option<NodeId>,
    },
    SelectStatement {
        select: NodeId,
        from: Option<NodeId>,
        where_clause: Option<NodeId>,
        group_by: Option<NodeId>,
        having: Option<NodeId>,
        order_by: Option<NodeId>,
    },
    /// A subquery.
    SimpleSelectStatement {
        select: NodeId,
        from: Option<NodeId>,
        where_clause: Option<NodeId>,
        group_by: Option<NodeId>,
        having: Option<NodeId>,
    },
    UpdateStatement {
        update: NodeId,
        where_clause: Option<NodeId>,
    },
    DeleteStatement {
        delete: NodeId,
        where_clause: Option<NodeId>,
    },

    // ------------------------------------------------------------------
    // Clauses
    // ------------------------------------------------------------------
    SelectClause {
        distinct: bool,
        items: Vec<NodeId>,
    },
    SimpleSelectClause {
        distinct: bool,
        items: Vec<NodeId>,
    },
    FromClause {
        declarations: Vec<NodeId>,
    },
    SimpleFromClause {
        declarations: Vec<NodeId>,
    },
    WhereClause {
        condition: NodeId,
    },
    HavingClause {
        condition: NodeId,
    },
    GroupByClause {
        items: Vec<NodeId>,
    },
    OrderByClause {
        items: Vec<NodeId>,
    },
    OrderByItem {
        expression: NodeId,
        ordering: Ordering,
        nulls: NullOrdering,
    },
    UpdateClause {
        range: NodeId,
        items: Vec<NodeId>,
    },
    UpdateItem {
        path: NodeId,
        value: NodeId,
    },
    DeleteClause {
        range: NodeId,
    },
    OnClause {
        condition: NodeId,
    },

    // ------------------------------------------------------------------
    // Declarations and names
    // ------------------------------------------------------------------
    IdentificationVariableDeclaration {
        range: NodeId,
        joins: Vec<NodeId>,
    },
    /// `Employee e`, or in a subquery the derived form `e.projects p`.
    RangeVariableDeclaration {
        root: NodeId,
        has_as: bool,
        variable: Option<NodeId>,
    },
    /// `IN(e.projects) p`
    CollectionMemberDeclaration {
        path: NodeId,
        has_as: bool,
        variable: Option<NodeId>,
    },
    Join {
        join_type: JoinType,
        fetch: bool,
        path: NodeId,
        has_as: bool,
        variable: Option<NodeId>,
        on: Option<NodeId>,
    },
    AbstractSchemaName {
        name: SmolStr,
    },
    /// A variable reference or declaration.
    ///
    /// Virtual variables are synthesized for UPDATE/DELETE statements without an
    /// alias; when one stands for a bare field name, `virtual_path` holds the
    /// state-field path it abbreviates.
    IdentificationVariable {
        name: SmolStr,
        is_virtual: bool,
        virtual_path: Option<NodeId>,
    },
    ResultVariable {
        expression: NodeId,
        has_as: bool,
        variable: NodeId,
    },
    EntityTypeLiteral {
        name: SmolStr,
    },

    // ------------------------------------------------------------------
    // Select helpers
    // ------------------------------------------------------------------
    ConstructorExpression {
        class_name: SmolStr,
        arguments: Vec<NodeId>,
    },
    ObjectExpression {
        variable: NodeId,
    },
    SubExpression {
        expression: NodeId,
    },

    // ------------------------------------------------------------------
    // Conditions
    // ------------------------------------------------------------------
    And {
        left: NodeId,
        right: NodeId,
    },
    Or {
        left: NodeId,
        right: NodeId,
    },
    Not {
        expression: NodeId,
    },
    Comparison {
        left: NodeId,
        operator: ComparisonOperator,
        right: NodeId,
    },
    Between {
        expression: NodeId,
        not: bool,
        lower: NodeId,
        upper: NodeId,
    },
    Like {
        expression: NodeId,
        not: bool,
        pattern: NodeId,
        escape: Option<NodeId>,
    },
    In {
        expression: NodeId,
        not: bool,
        items: Vec<NodeId>,
    },
    NullComparison {
        expression: NodeId,
        not: bool,
    },
    EmptyCollectionComparison {
        expression: NodeId,
        not: bool,
    },
    CollectionMember {
        entity: NodeId,
        not: bool,
        of: bool,
        collection: NodeId,
    },
    Exists {
        not: bool,
        subquery: NodeId,
    },
    AllOrAny {
        quantifier: Quantifier,
        subquery: NodeId,
    },

    // ------------------------------------------------------------------
    // Arithmetic
    // ------------------------------------------------------------------
    Addition {
        left: NodeId,
        right: NodeId,
    },
    Subtraction {
        left: NodeId,
        right: NodeId,
    },
    Multiplication {
        left: NodeId,
        right: NodeId,
    },
    Division {
        left: NodeId,
        right: NodeId,
    },
    /// Unary `+x` / `-x`.
    ArithmeticFactor {
        negative: bool,
        expression: NodeId,
    },

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------
    Abs {
        expression: NodeId,
    },
    Sqrt {
        expression: NodeId,
    },
    Length {
        expression: NodeId,
    },
    Lower {
        expression: NodeId,
    },
    Upper {
        expression: NodeId,
    },
    Size {
        expression: NodeId,
    },
    Index {
        expression: NodeId,
    },
    Key {
        expression: NodeId,
    },
    Value {
        expression: NodeId,
    },
    Entry {
        expression: NodeId,
    },
    Type {
        expression: NodeId,
    },
    Mod {
        first: NodeId,
        second: NodeId,
    },
    Locate {
        first: NodeId,
        second: NodeId,
        third: Option<NodeId>,
    },
    Substring {
        first: NodeId,
        second: NodeId,
        third: Option<NodeId>,
    },
    Concat {
        arguments: Vec<NodeId>,
    },
    Trim {
        specification: TrimSpecification,
        character: Option<NodeId>,
        has_from: bool,
        string: NodeId,
    },
    Aggregate {
        function: AggregateFunction,
        distinct: bool,
        expression: NodeId,
    },
    Coalesce {
        arguments: Vec<NodeId>,
    },
    NullIf {
        first: NodeId,
        second: NodeId,
    },
    Case {
        operand: Option<NodeId>,
        whens: Vec<NodeId>,
        otherwise: NodeId,
    },
    When {
        condition: NodeId,
        result: NodeId,
    },
    Treat {
        path: NodeId,
        has_as: bool,
        entity_type: NodeId,
    },
    Function {
        name: SmolStr,
        arguments: Vec<NodeId>,
    },

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------
    /// `root.segment.segment`, where `root` is an identification variable or
    /// a `KEY`/`VALUE`/`TREAT` expression.
    StateFieldPath {
        root: NodeId,
        segments: Vec<Spanned<SmolStr>>,
        ends_with_dot: bool,
    },
    CollectionValuedPath {
        root: NodeId,
        segments: Vec<Spanned<SmolStr>>,
        ends_with_dot: bool,
    },

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------
    NumericLiteral {
        text: SmolStr,
    },
    StringLiteral {
        value: SmolStr,
    },
    KeywordLiteral {
        literal: KeywordLiteralKind,
    },
    DateTime {
        kind: DateTimeKind,
    },
    InputParameter {
        name: SmolStr,
        positional: bool,
    },

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------
    /// Text the parser could not place in the grammar.
    Unknown {
        text: SmolStr,
    },
    /// A required expression that is missing.
    Bad,
}

impl NodeKind {
    /// Returns the child nodes in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut push = |id: &NodeId| out.push(*id);
        match self {
            NodeKind::JpqlExpression { statement, unknown } => {
                statement.iter().chain(unknown.iter()).for_each(&mut push);
            }
            NodeKind::SelectStatement {
                select,
                from,
                where_clause,
                group_by,
                having,
                order_by,
            } => {
                push(select);
                from.iter()
                    .chain(where_clause.iter())
                    .chain(group_by.iter())
                    .chain(having.iter())
                    .chain(order_by.iter())
                    .for_each(&mut push);
            }
            NodeKind::SimpleSelectStatement {
                select,
                from,
                where_clause,
                group_by,
                having,
            } => {
                push(select);
                from.iter()
                    .chain(where_clause.iter())
                    .chain(group_by.iter())
                    .chain(having.iter())
                    .for_each(&mut push);
            }
            NodeKind::UpdateStatement {
                update: clause,
                where_clause,
            }
            | NodeKind::DeleteStatement {
                delete: clause,
                where_clause,
            } => {
                push(clause);
                where_clause.iter().for_each(&mut push);
            }
            NodeKind::SelectClause { items, .. }
            | NodeKind::SimpleSelectClause { items, .. }
            | NodeKind::GroupByClause { items }
            | NodeKind::OrderByClause { items } => items.iter().for_each(&mut push),
            NodeKind::FromClause { declarations } | NodeKind::SimpleFromClause { declarations } => {
                declarations.iter().for_each(&mut push)
            }
            NodeKind::WhereClause { condition }
            | NodeKind::HavingClause { condition }
            | NodeKind::OnClause { condition } => push(condition),
            NodeKind::OrderByItem { expression, .. } => push(expression),
            NodeKind::UpdateClause { range, items } => {
                push(range);
                items.iter().for_each(&mut push);
            }
            NodeKind::UpdateItem { path, value } => {
                push(path);
                push(value);
            }
            NodeKind::DeleteClause { range } => push(range),
            NodeKind::IdentificationVariableDeclaration { range, joins } => {
                push(range);
                joins.iter().for_each(&mut push);
            }
            NodeKind::RangeVariableDeclaration { root: first, variable, .. }
            | NodeKind::CollectionMemberDeclaration { path: first, variable, .. } => {
                push(first);
                variable.iter().for_each(&mut push);
            }
            NodeKind::Join {
                path, variable, on, ..
            } => {
                push(path);
                variable.iter().chain(on.iter()).for_each(&mut push);
            }
            NodeKind::IdentificationVariable { virtual_path, .. } => {
                virtual_path.iter().for_each(&mut push)
            }
            NodeKind::ResultVariable {
                expression,
                variable,
                ..
            } => {
                push(expression);
                push(variable);
            }
            NodeKind::ConstructorExpression { arguments, .. }
            | NodeKind::Concat { arguments }
            | NodeKind::Coalesce { arguments }
            | NodeKind::Function { arguments, .. } => arguments.iter().for_each(&mut push),
            NodeKind::ObjectExpression { variable } => push(variable),
            NodeKind::SubExpression { expression }
            | NodeKind::Not { expression }
            | NodeKind::NullComparison { expression, .. }
            | NodeKind::EmptyCollectionComparison { expression, .. }
            | NodeKind::ArithmeticFactor { expression, .. }
            | NodeKind::Abs { expression }
            | NodeKind::Sqrt { expression }
            | NodeKind::Length { expression }
            | NodeKind::Lower { expression }
            | NodeKind::Upper { expression }
            | NodeKind::Size { expression }
            | NodeKind::Index { expression }
            | NodeKind::Key { expression }
            | NodeKind::Value { expression }
            | NodeKind::Entry { expression }
            | NodeKind::Type { expression }
            | NodeKind::Aggregate { expression, .. } => push(expression),
            NodeKind::And { left, right }
            | NodeKind::Or { left, right }
            | NodeKind::Comparison { left, right, .. }
            | NodeKind::Addition { left, right }
            | NodeKind::Subtraction { left, right }
            | NodeKind::Multiplication { left, right }
            | NodeKind::Division { left, right }
            | NodeKind::Mod {
                first: left,
                second: right,
            }
            | NodeKind::NullIf {
                first: left,
                second: right,
            }
            | NodeKind::When {
                condition: left,
                result: right,
            } => {
                push(left);
                push(right);
            }
            NodeKind::Between {
                expression,
                lower,
                upper,
                ..
            } => {
                push(expression);
                push(lower);
                push(upper);
            }
            NodeKind::Like {
                expression,
                pattern,
                escape,
                ..
            } => {
                push(expression);
                push(pattern);
                escape.iter().for_each(&mut push);
            }
            NodeKind::In {
                expression, items, ..
            } => {
                push(expression);
                items.iter().for_each(&mut push);
            }
            NodeKind::CollectionMember {
                entity, collection, ..
            } => {
                push(entity);
                push(collection);
            }
            NodeKind::Exists { subquery, .. } | NodeKind::AllOrAny { subquery, .. } => {
                push(subquery)
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
                push(first);
                push(second);
                third.iter().for_each(&mut push);
            }
            NodeKind::Trim {
                character, string, ..
            } => {
                character.iter().for_each(&mut push);
                push(string);
            }
            NodeKind::Case {
                operand,
                whens,
                otherwise,
            } => {
                operand.iter().chain(whens.iter()).for_each(&mut push);
                push(otherwise);
            }
            NodeKind::Treat {
                path, entity_type, ..
            } => {
                push(path);
                push(entity_type);
            }
            NodeKind::StateFieldPath { root, .. } | NodeKind::CollectionValuedPath { root, .. } => {
                push(root)
            }
            NodeKind::AbstractSchemaName { .. }
            | NodeKind::EntityTypeLiteral { .. }
            | NodeKind::NumericLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::KeywordLiteral { .. }
            | NodeKind::DateTime { .. }
            | NodeKind::InputParameter { .. }
            | NodeKind::Unknown { .. }
            | NodeKind::Bad => {}
        }
        out
    }

    /// Short name of the kind, used in tracing output and problem arguments.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::JpqlExpression { .. } => "jpql_expression",
            NodeKind::SelectStatement { .. } => "select_statement",
            NodeKind::SimpleSelectStatement { .. } => "simple_select_statement",
            NodeKind::UpdateStatement { .. } => "update_statement",
            NodeKind::DeleteStatement { .. } => "delete_statement",
            NodeKind::SelectClause { .. } => "select_clause",
            NodeKind::SimpleSelectClause { .. } => "simple_select_clause",
            NodeKind::FromClause { .. } => "from_clause",
            NodeKind::SimpleFromClause { .. } => "simple_from_clause",
            NodeKind::WhereClause { .. } => "where_clause",
            NodeKind::HavingClause { .. } => "having_clause",
            NodeKind::GroupByClause { .. } => "group_by_clause",
            NodeKind::OrderByClause { .. } => "order_by_clause",
            NodeKind::OrderByItem { .. } => "order_by_item",
            NodeKind::UpdateClause { .. } => "update_clause",
            NodeKind::UpdateItem { .. } => "update_item",
            NodeKind::DeleteClause { .. } => "delete_clause",
            NodeKind::OnClause { .. } => "on_clause",
            NodeKind::IdentificationVariableDeclaration { .. } => {
                "identification_variable_declaration"
            }
            NodeKind::RangeVariableDeclaration { .. } => "range_variable_declaration",
            NodeKind::CollectionMemberDeclaration { .. } => "collection_member_declaration",
            NodeKind::Join { .. } => "join",
            NodeKind::AbstractSchemaName { .. } => "abstract_schema_name",
            NodeKind::IdentificationVariable { .. } => "identification_variable",
            NodeKind::ResultVariable { .. } => "result_variable",
            NodeKind::EntityTypeLiteral { .. } => "entity_type_literal",
            NodeKind::ConstructorExpression { .. } => "constructor_expression",
            NodeKind::ObjectExpression { .. } => "object_expression",
            NodeKind::SubExpression { .. } => "sub_expression",
            NodeKind::And { .. } => "and",
            NodeKind::Or { .. } => "or",
            NodeKind::Not { .. } => "not",
            NodeKind::Comparison { .. } => "comparison",
            NodeKind::Between { .. } => "between",
            NodeKind::Like { .. } => "like",
            NodeKind::In { .. } => "in",
            NodeKind::NullComparison { .. } => "null_comparison",
            NodeKind::EmptyCollectionComparison { .. } => "empty_collection_comparison",
            NodeKind::CollectionMember { .. } => "collection_member",
            NodeKind::Exists { .. } => "exists",
            NodeKind::AllOrAny { .. } => "all_or_any",
            NodeKind::Addition { .. } => "addition",
            NodeKind::Subtraction { .. } => "subtraction",
            NodeKind::Multiplication { .. } => "multiplication",
            NodeKind::Division { .. } => "division",
            NodeKind::ArithmeticFactor { .. } => "arithmetic_factor",
            NodeKind::Abs { .. } => "abs",
            NodeKind::Sqrt { .. } => "sqrt",
            NodeKind::Length { .. } => "length",
            NodeKind::Lower { .. } => "lower",
            NodeKind::Upper { .. } => "upper",
            NodeKind::Size { .. } => "size",
            NodeKind::Index { .. } => "index",
            NodeKind::Key { .. } => "key",
            NodeKind::Value { .. } => "value",
            NodeKind::Entry { .. } => "entry",
            NodeKind::Type { .. } => "type",
            NodeKind::Mod { .. } => "mod",
            NodeKind::Locate { .. } => "locate",
            NodeKind::Substring { .. } => "substring",
            NodeKind::Concat { .. } => "concat",
            NodeKind::Trim { .. } => "trim",
            NodeKind::Aggregate { .. } => "aggregate",
            NodeKind::Coalesce { .. } => "coalesce",
            NodeKind::NullIf { .. } => "nullif",
            NodeKind::Case { .. } => "case",
            NodeKind::When { .. } => "when",
            NodeKind::Treat { .. } => "treat",
            NodeKind::Function { .. } => "function",
            NodeKind::StateFieldPath { .. } => "state_field_path",
            NodeKind::CollectionValuedPath { .. } => "collection_valued_path",
            NodeKind::NumericLiteral { .. } => "numeric_literal",
            NodeKind::StringLiteral { .. } => "string_literal",
            NodeKind::KeywordLiteral { .. } => "keyword_literal",
            NodeKind::DateTime { .. } => "date_time",
            NodeKind::InputParameter { .. } => "input_parameter",
            NodeKind::Unknown { .. } => "unknown",
            NodeKind::Bad => "bad",
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(
            self,
            NodeKind::StateFieldPath { .. } | NodeKind::CollectionValuedPath { .. }
        )
    }
}
