//! JPQL parser and semantic validator with rich diagnostics.
//!
//! The crate reads Java Persistence Query Language text into an
//! [`ExpressionTree`], reporting syntax problems with exact offsets and
//! recovering from malformed input, then validates the tree against a
//! persistence [`Metamodel`](semantic::Metamodel). Problems are plain values
//! that render through miette.
//!
//! # Example
//!
//! ```
//! use jpql_parser::grammar::rules::QL_STATEMENT;
//! use jpql_parser::semantic::{InMemoryMetamodel, ManagedType, MappingKind};
//! use jpql_parser::validate;
//!
//! let model = InMemoryMetamodel::new().with_managed_type(
//!     ManagedType::entity("Employee", "com.acme.Employee")
//!         .with_mapping("salary", MappingKind::Basic, "long")
//!         .with_mapping("manager", MappingKind::ManyToOne, "com.acme.Employee"),
//! );
//!
//! let outcome = validate("SELECT e FROM Employee e WHERE e.salary > 1000", QL_STATEMENT, &model)
//!     .expect("grammar rule is registered");
//! assert!(outcome.is_success());
//!
//! let outcome = validate("SELECT e FROM Employee e WHERE e.manager > 1000", QL_STATEMENT, &model)
//!     .expect("grammar rule is registered");
//! assert_eq!(
//!     outcome.problems[0].key.message_key(),
//!     "state_field_path.association_field"
//! );
//! ```

pub mod ast;
pub mod diag;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod semantic;

use tracing::debug;

pub use ast::{ExpressionTree, NodeId, NodeKind, Span, Spanned};
pub use diag::{Problem, ProblemCategory, ProblemKey, SourceFile, problems_to_reports};
pub use grammar::{GrammarError, JpqlGrammar};
pub use lexer::token::{Token, TokenKind};
pub use lexer::{LexerResult, tokenize};
pub use parser::{ParseOutput, ParseResult, ParserConfig, parse, parse_with_config};
pub use semantic::{JpqlQueryContext, Metamodel, SemanticValidator, ValidationConfig};

/// A parsed query together with every syntax and semantic problem found.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub tree: ExpressionTree,
    /// Syntax problems (lexical first) followed by semantic problems.
    pub problems: Vec<Problem>,
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn syntax_problems(&self) -> impl Iterator<Item = &Problem> {
        self.problems
            .iter()
            .filter(|problem| problem.category() == ProblemCategory::Syntax)
    }

    pub fn semantic_problems(&self) -> impl Iterator<Item = &Problem> {
        self.problems
            .iter()
            .filter(|problem| problem.category() == ProblemCategory::Semantic)
    }

    /// Renders every problem as a miette report over the query text.
    pub fn to_reports(&self) -> Vec<miette::Report> {
        problems_to_reports(&self.problems, &SourceFile::new(self.tree.source()))
    }
}

/// Parses `source` from `start_rule` and validates it against `metamodel`.
///
/// Only an unregistered `start_rule` is an error; everything wrong with the
/// query text itself is reported in [`ValidationOutcome::problems`].
pub fn validate(
    source: &str,
    start_rule: &str,
    metamodel: &dyn Metamodel,
) -> ParseResult<ValidationOutcome> {
    validate_with_config(source, start_rule, metamodel, &ValidationConfig::default())
}

/// [`validate`] with explicit limits.
pub fn validate_with_config(
    source: &str,
    start_rule: &str,
    metamodel: &dyn Metamodel,
    config: &ValidationConfig,
) -> ParseResult<ValidationOutcome> {
    debug!(rule = start_rule, length = source.len(), "validating query");

    let ParseOutput { tree, mut problems } =
        parse_with_config(source, start_rule, &config.parser_config())?;

    let context = JpqlQueryContext::new(&tree, metamodel);
    let mut semantic = SemanticValidator::new(&tree, context)
        .with_config(config.clone())
        .validate();
    problems.append(&mut semantic);

    debug!(
        rule = start_rule,
        problems = problems.len(),
        "validated query"
    );
    Ok(ValidationOutcome { tree, problems })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::rules::{CONDITIONAL_EXPRESSION, QL_STATEMENT};
    use crate::semantic::{InMemoryMetamodel, ManagedType};

    fn model() -> InMemoryMetamodel {
        InMemoryMetamodel::new().with_managed_type(
            ManagedType::entity("Employee", "com.acme.Employee").with_basic("name", "java.lang.String"),
        )
    }

    #[test]
    fn public_api_accessible() {
        let _span: Span = 0..5;
        let _spanned = Spanned::new(42, 0..5);
        let _config = ValidationConfig::default();
    }

    #[test]
    fn outcome_splits_problems_by_category() {
        let outcome = validate("SELECT x FROM Employee e WHERE", QL_STATEMENT, &model()).unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.syntax_problems().count() >= 1);
        assert_eq!(
            outcome
                .semantic_problems()
                .map(|p| p.key)
                .collect::<Vec<_>>(),
            vec![ProblemKey::IdentificationVariableNotDeclared]
        );
        assert_eq!(outcome.to_reports().len(), outcome.problems.len());
    }

    #[test]
    fn syntax_problems_come_first() {
        let outcome = validate("SELECT x FROM Employee e WHERE", QL_STATEMENT, &model()).unwrap();
        let first_semantic = outcome
            .problems
            .iter()
            .position(|p| p.category() == ProblemCategory::Semantic)
            .unwrap();
        assert!(outcome.problems[..first_semantic]
            .iter()
            .all(|p| p.category() == ProblemCategory::Syntax));
    }

    #[test]
    fn fragments_skip_the_scope_check() {
        let outcome = validate("x = 'x'", CONDITIONAL_EXPRESSION, &model()).unwrap();
        assert!(outcome.is_success(), "{:?}", outcome.problems);
    }

    #[test]
    fn unknown_rule_is_an_error() {
        assert!(matches!(
            validate("SELECT e FROM Employee e", "nope", &model()),
            Err(GrammarError::UnknownRule { .. })
        ));
    }
}
