//! Problem model shared by the lexer, the parser and the semantic validator.
//!
//! A [`Problem`] is a plain value: a stable message key, its arguments and the
//! byte range of the offending text. Nothing in the pipeline throws on bad query
//! text; problems are accumulated and handed back to the caller, who can render
//! them through miette with [`problems_to_reports`].

use crate::ast::{NodeId, Span};
use miette::{Diagnostic, LabeledSpan, Report, Severity};
use std::fmt;

/// Whether a problem was found while reading the text or while typing the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemCategory {
    /// The text could not be read as JPQL (lexing or grammar).
    Syntax,
    /// The tree is well formed but violates a scoping or typing rule.
    Semantic,
}

impl fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemCategory::Syntax => write!(f, "syntax"),
            ProblemCategory::Semantic => write!(f, "semantic"),
        }
    }
}

/// Every problem the front end can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKey {
    // Lexical
    InvalidCharacter,
    UnterminatedString,

    // Grammar
    UnknownExpression,
    MissingExpression,
    MissingClause,
    ExpectedToken,
    ExpressionNotAllowed,
    MissingIdentificationVariable,
    InvalidStatement,
    NestingTooDeep,

    // Scoping
    IdentificationVariableNotDeclared,
    IdentificationVariableDuplicate,
    IdentificationVariableWrongOrder,

    // Path typing
    StateFieldPathAssociationField,
    StateFieldPathCollectionType,
    StateFieldPathNoMapping,
    StateFieldPathNotResolvable,
    StateFieldPathInvalidEnumConstant,
    CollectionValuedPathNotResolvable,
    CollectionValuedPathNotCollectionType,

    // Names
    AbstractSchemaNameInvalid,
    PathNotRelationshipMapping,
    EntityTypeLiteralNotResolvable,
    IndexWrongVariable,

    // UPDATE ... SET
    UpdateItemRelationshipPathExpression,

    // Limits
    TraversalTooDeep,
}

impl ProblemKey {
    /// Stable dotted key, suitable for message bundles and for asserting in tests.
    pub fn message_key(self) -> &'static str {
        match self {
            ProblemKey::InvalidCharacter => "syntax.invalid_character",
            ProblemKey::UnterminatedString => "syntax.unterminated_string",
            ProblemKey::UnknownExpression => "syntax.unknown_expression",
            ProblemKey::MissingExpression => "syntax.missing_expression",
            ProblemKey::MissingClause => "syntax.missing_clause",
            ProblemKey::ExpectedToken => "syntax.expected_token",
            ProblemKey::ExpressionNotAllowed => "syntax.expression_not_allowed",
            ProblemKey::MissingIdentificationVariable => {
                "syntax.missing_identification_variable"
            }
            ProblemKey::InvalidStatement => "syntax.invalid_statement",
            ProblemKey::NestingTooDeep => "syntax.nesting_too_deep",
            ProblemKey::IdentificationVariableNotDeclared => "identification_variable.not_declared",
            ProblemKey::IdentificationVariableDuplicate => "identification_variable.duplicate",
            ProblemKey::IdentificationVariableWrongOrder => {
                "identification_variable.wrong_declaration_order"
            }
            ProblemKey::StateFieldPathAssociationField => "state_field_path.association_field",
            ProblemKey::StateFieldPathCollectionType => "state_field_path.collection_type",
            ProblemKey::StateFieldPathNoMapping => "state_field_path.no_mapping",
            ProblemKey::StateFieldPathNotResolvable => "state_field_path.not_resolvable",
            ProblemKey::StateFieldPathInvalidEnumConstant => {
                "state_field_path.invalid_enum_constant"
            }
            ProblemKey::CollectionValuedPathNotResolvable => "collection_valued_path.not_resolvable",
            ProblemKey::CollectionValuedPathNotCollectionType => {
                "collection_valued_path.not_collection_type"
            }
            ProblemKey::AbstractSchemaNameInvalid => "abstract_schema_name.invalid",
            ProblemKey::PathNotRelationshipMapping => "path.not_relationship_mapping",
            ProblemKey::EntityTypeLiteralNotResolvable => "entity_type_literal.not_resolvable",
            ProblemKey::IndexWrongVariable => "index.wrong_variable",
            ProblemKey::UpdateItemRelationshipPathExpression => {
                "update_item.relationship_path_expression"
            }
            ProblemKey::TraversalTooDeep => "semantic.traversal_too_deep",
        }
    }

    /// Returns the phase that reports this key.
    pub fn category(self) -> ProblemCategory {
        match self {
            ProblemKey::InvalidCharacter
            | ProblemKey::UnterminatedString
            | ProblemKey::UnknownExpression
            | ProblemKey::MissingExpression
            | ProblemKey::MissingClause
            | ProblemKey::ExpectedToken
            | ProblemKey::ExpressionNotAllowed
            | ProblemKey::MissingIdentificationVariable
            | ProblemKey::InvalidStatement
            | ProblemKey::NestingTooDeep => ProblemCategory::Syntax,
            _ => ProblemCategory::Semantic,
        }
    }

    /// Message template; `{0}`, `{1}` are replaced by the problem arguments.
    fn template(self) -> &'static str {
        match self {
            ProblemKey::InvalidCharacter => "invalid character '{0}'",
            ProblemKey::UnterminatedString => "string literal is not terminated",
            ProblemKey::UnknownExpression => "'{0}' is not a valid expression",
            ProblemKey::MissingExpression => "missing {0}",
            ProblemKey::MissingClause => "the {0} clause is missing",
            ProblemKey::ExpectedToken => "expected {0}",
            ProblemKey::ExpressionNotAllowed => "'{0}' is not allowed in {1}",
            ProblemKey::MissingIdentificationVariable => "an identification variable is missing",
            ProblemKey::InvalidStatement => "a query must start with SELECT, UPDATE or DELETE",
            ProblemKey::NestingTooDeep => "the query is nested more than {0} levels deep",
            ProblemKey::IdentificationVariableNotDeclared => {
                "the identification variable '{0}' is not declared in the FROM clause"
            }
            ProblemKey::IdentificationVariableDuplicate => {
                "the identification variable '{0}' is declared more than once"
            }
            ProblemKey::IdentificationVariableWrongOrder => {
                "the identification variable '{0}' is used before it is declared"
            }
            ProblemKey::StateFieldPathAssociationField => {
                "'{0}' navigates to an association, which is not allowed here"
            }
            ProblemKey::StateFieldPathCollectionType => {
                "'{0}' resolves to a collection, which is not allowed here"
            }
            ProblemKey::StateFieldPathNoMapping => "'{0}' does not resolve to a mapped field",
            ProblemKey::StateFieldPathNotResolvable => "'{0}' cannot be resolved",
            ProblemKey::StateFieldPathInvalidEnumConstant => {
                "'{0}' is not a constant of the enum {1}"
            }
            ProblemKey::CollectionValuedPathNotResolvable => "'{0}' cannot be resolved",
            ProblemKey::CollectionValuedPathNotCollectionType => {
                "'{0}' does not resolve to a collection-valued field"
            }
            ProblemKey::AbstractSchemaNameInvalid => "'{0}' is not a known entity",
            ProblemKey::PathNotRelationshipMapping => "'{0}' is not a relationship",
            ProblemKey::EntityTypeLiteralNotResolvable => "'{0}' is not a known entity type",
            ProblemKey::IndexWrongVariable => {
                "INDEX requires a collection identification variable, found '{0}'"
            }
            ProblemKey::UpdateItemRelationshipPathExpression => {
                "'{0}' is not an updatable path; only embedded fields may be traversed"
            }
            ProblemKey::TraversalTooDeep => {
                "the expression is nested more than {0} levels deep and was not validated"
            }
        }
    }
}

impl fmt::Display for ProblemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message_key())
    }
}

/// One diagnostic produced while reading or validating a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Problem {
    /// What went wrong.
    pub key: ProblemKey,
    /// Values substituted into the message.
    pub arguments: Vec<String>,
    /// Start byte offset in the query text.
    pub start: usize,
    /// End byte offset in the query text (exclusive).
    pub end: usize,
    /// The tree node the problem is attached to, if one exists.
    pub anchor: Option<NodeId>,
}

impl Problem {
    /// Creates a problem over `span` with no anchor node.
    pub fn new(key: ProblemKey, span: Span) -> Self {
        Self {
            key,
            arguments: Vec::new(),
            start: span.start,
            end: span.end,
            anchor: None,
        }
    }

    /// Attaches the problem to a tree node.
    pub fn with_anchor(mut self, node: NodeId) -> Self {
        self.anchor = Some(node);
        self
    }

    /// Appends a message argument.
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn span(&self) -> Span {
        self.start..self.end
    }

    pub fn category(&self) -> ProblemCategory {
        self.key.category()
    }

    /// Renders the message template with the problem's arguments.
    pub fn message(&self) -> String {
        let mut message = self.key.template().to_string();
        for (index, argument) in self.arguments.iter().enumerate() {
            message = message.replace(&format!("{{{index}}}"), argument);
        }
        message
    }

    /// Converts this problem into a miette report over `source`.
    pub fn to_report(&self, source: &SourceFile) -> Report {
        let diagnostic = build_diagnostic(self, source);
        match source.name() {
            Some(name) => Report::new(diagnostic)
                .with_source_code(miette::NamedSource::new(name, source.content().to_string())),
            None => Report::new(diagnostic).with_source_code(source.content().to_string()),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}: {}", self.key, self.start, self.end, self.message())
    }
}

/// Query text wrapper used when rendering problems.
///
/// Spans are clamped against the content so a problem can never point past
/// the end of the text it is rendered over.
#[derive(Debug, Clone)]
pub struct SourceFile {
    content: String,
    name: Option<String>,
}

impl SourceFile {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            name: None,
        }
    }

    /// Creates a source with a display name (a named query, a file, ...).
    pub fn with_name(content: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            name: Some(name.into()),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Clamps a span to valid bounds within this source.
    pub fn clamp_span(&self, span: &Span) -> Span {
        let len = self.content.len();
        let start = span.start.min(len);
        let end = span.end.min(len).max(start);
        start..end
    }
}

/// Converts problems to miette reports, preserving their order.
pub fn problems_to_reports(problems: &[Problem], source: &SourceFile) -> Vec<Report> {
    problems
        .iter()
        .map(|problem| problem.to_report(source))
        .collect()
}

fn build_diagnostic(problem: &Problem, source: &SourceFile) -> ProblemDiagnostic {
    let span = source.clamp_span(&problem.span());
    let label = LabeledSpan::new_primary_with_span(
        Some(problem.category().to_string()),
        (span.start, span.end - span.start),
    );

    ProblemDiagnostic {
        message: problem.message(),
        code: problem.key.message_key(),
        label,
    }
}

#[derive(Debug)]
struct ProblemDiagnostic {
    message: String,
    code: &'static str,
    label: LabeledSpan,
}

impl fmt::Display for ProblemDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProblemDiagnostic {}

impl Diagnostic for ProblemDiagnostic {
    fn severity(&self) -> Option<Severity> {
        Some(Severity::Error)
    }

    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(self.label.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_display() {
        assert_eq!(ProblemCategory::Syntax.to_string(), "syntax");
        assert_eq!(ProblemCategory::Semantic.to_string(), "semantic");
    }

    #[test]
    fn keys_split_by_phase() {
        assert_eq!(ProblemKey::UnknownExpression.category(), ProblemCategory::Syntax);
        assert_eq!(ProblemKey::NestingTooDeep.category(), ProblemCategory::Syntax);
        assert_eq!(ProblemKey::TraversalTooDeep.category(), ProblemCategory::Semantic);
        assert_eq!(
            ProblemKey::StateFieldPathAssociationField.category(),
            ProblemCategory::Semantic
        );
        assert_eq!(
            ProblemKey::IdentificationVariableDuplicate.category(),
            ProblemCategory::Semantic
        );
    }

    #[test]
    fn message_substitutes_arguments() {
        let problem = Problem::new(ProblemKey::StateFieldPathInvalidEnumConstant, 10..12)
            .with_argument("XX")
            .with_argument("com.acme.Level");
        assert_eq!(
            problem.message(),
            "'XX' is not a constant of the enum com.acme.Level"
        );
        assert_eq!(problem.span(), 10..12);
    }

    #[test]
    fn display_includes_key_and_offsets() {
        let problem =
            Problem::new(ProblemKey::IdentificationVariableNotDeclared, 7..8).with_argument("e");
        let text = problem.to_string();
        assert!(text.starts_with("identification_variable.not_declared at 7..8"));
    }

    #[test]
    fn clamp_span_out_of_bounds() {
        let source = SourceFile::new("SELECT");
        assert_eq!(source.clamp_span(&(4..100)), 4..6);
        assert_eq!(source.clamp_span(&(50..60)), 6..6);
    }

    #[test]
    fn report_conversion_keeps_code() {
        let source = SourceFile::with_name("SELECT e FROM Employee e", "q1");
        let problem = Problem::new(ProblemKey::AbstractSchemaNameInvalid, 14..22)
            .with_argument("Employee");
        let report = problem.to_report(&source);
        let code = report.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("abstract_schema_name.invalid"));
        assert_eq!(report.to_string(), "'Employee' is not a known entity");
    }

    #[test]
    fn reports_preserve_order() {
        let source = SourceFile::new("SELECT x FROM");
        let problems = vec![
            Problem::new(ProblemKey::MissingClause, 13..13).with_argument("FROM"),
            Problem::new(ProblemKey::IdentificationVariableNotDeclared, 7..8).with_argument("x"),
        ];
        let reports = problems_to_reports(&problems, &source);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].to_string(), "the FROM clause is missing");
    }
}
