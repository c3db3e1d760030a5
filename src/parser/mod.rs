//! Grammar-guided recursive-descent parser for JPQL.
//!
//! The parser consumes the lexer's tokens and builds an [`ExpressionTree`].
//! Whenever it reaches a position where an expression can start, it asks the
//! [`JpqlGrammar`] which factory the current rule binds to the current token,
//! so the set of expressions allowed at each position lives in the grammar
//! registry rather than in the parser.
//!
//! Malformed text never aborts the parse. Missing pieces become `Bad` nodes,
//! stray text becomes `Unknown` nodes, and each recovery records a syntax
//! [`Problem`].

mod base;
mod expression;
mod function;
mod recovery;
mod statement;

pub use base::{Expectation, TokenStream};

use crate::ast::{ExpressionTree, NodeId, NodeKind, Span, TreeBuilder};
use crate::diag::{Problem, ProblemKey};
use crate::grammar::{FactoryKind, GrammarError, JpqlGrammar, Trigger, rules};
use crate::lexer::token::{Keyword, Token, TokenKind};
use crate::lexer::tokenize;
use smol_str::SmolStr;
use tracing::debug;

/// Result type for parser operations. Only configuration errors are `Err`.
pub type ParseResult<T> = Result<T, GrammarError>;

/// Parser limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum nesting of parentheses, functions, subqueries and `NOT`s.
    pub max_nesting_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 128,
        }
    }
}

impl ParserConfig {
    /// Sets [`max_nesting_depth`](Self::max_nesting_depth).
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

/// A parsed query and its syntax problems (lexical problems first).
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub tree: ExpressionTree,
    pub problems: Vec<Problem>,
}

/// Parses `source` starting from the grammar rule `start_rule`.
pub fn parse(source: &str, start_rule: &str) -> ParseResult<ParseOutput> {
    parse_with_config(source, start_rule, &ParserConfig::default())
}

/// Parses with explicit limits, using the shared JPQL grammar.
pub fn parse_with_config(
    source: &str,
    start_rule: &str,
    config: &ParserConfig,
) -> ParseResult<ParseOutput> {
    let grammar = JpqlGrammar::shared()?;
    let lexed = tokenize(source);
    let mut output = Parser::new(source, &lexed.tokens, grammar)
        .with_config(config.clone())
        .parse(start_rule)?;

    let mut problems = lexed.problems;
    problems.append(&mut output.problems);
    output.problems = problems;
    Ok(output)
}

/// JPQL parser over one token slice.
pub struct Parser<'a> {
    source: &'a str,
    stream: TokenStream<'a>,
    grammar: &'a JpqlGrammar,
    config: ParserConfig,
    builder: TreeBuilder,
    problems: Vec<Problem>,
    depth: usize,
    /// Name of the implicit variable of an alias-less UPDATE or DELETE.
    virtual_variable: Option<SmolStr>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: &'a [Token], grammar: &'a JpqlGrammar) -> Self {
        Self {
            source,
            stream: TokenStream::new(source, tokens),
            grammar,
            config: ParserConfig::default(),
            builder: TreeBuilder::new(),
            problems: Vec::new(),
            depth: 0,
            virtual_variable: None,
        }
    }

    /// Replaces the default [`ParserConfig`].
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses the whole token slice from `start_rule`.
    ///
    /// An unregistered `start_rule` is a configuration error. Anything else,
    /// however malformed, produces a tree rooted at a `JpqlExpression`.
    pub fn parse(mut self, start_rule: &str) -> ParseResult<ParseOutput> {
        self.grammar.lookup(start_rule)?;

        let statement = match start_rule {
            rules::QL_STATEMENT | rules::SUBQUERY => self.parse_statement(start_rule)?,
            fragment => Some(self.parse_conditional(fragment)?),
        };
        let unknown = self.parse_trailing_text();

        let root = self.builder.push(
            NodeKind::JpqlExpression { statement, unknown },
            0..self.source.len(),
        );
        for problem in &mut self.problems {
            if problem.anchor.is_none() {
                problem.anchor = Some(root);
            }
        }

        debug!(
            rule = start_rule,
            length = self.source.len(),
            problems = self.problems.len(),
            "parsed query"
        );

        Ok(ParseOutput {
            tree: self.builder.finish(self.source, root),
            problems: self.problems,
        })
    }

    /// Parses a statement through the rule's statement factories.
    fn parse_statement(&mut self, rule: &str) -> ParseResult<Option<NodeId>> {
        let factory = match Trigger::of(self.stream.kind()) {
            Some(trigger) => self.grammar.dispatch(rule, trigger)?,
            None => None,
        };

        let statement = match factory {
            Some(FactoryKind::SelectStatement) => self.parse_select_statement()?,
            Some(FactoryKind::SimpleSelectStatement) => self.parse_simple_select()?,
            Some(FactoryKind::UpdateStatement) => self.parse_update_statement()?,
            Some(FactoryKind::DeleteStatement) => self.parse_delete_statement()?,
            _ => {
                let end = self.source.trim_end().len();
                let start = self.stream.current_start().min(end);
                self.problems
                    .push(Problem::new(ProblemKey::InvalidStatement, start..end));
                return Ok(None);
            }
        };
        Ok(Some(statement))
    }

    // ------------------------------------------------------------------
    // Shared node helpers
    // ------------------------------------------------------------------

    fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.builder.push(kind, span)
    }

    /// Pushes a node spanning from `start` to the last consumed token.
    fn push_from(&mut self, kind: NodeKind, start: usize) -> NodeId {
        let span = self.span_from(start);
        self.builder.push(kind, span)
    }

    /// Span from `start` to the end of the last consumed token.
    fn span_from(&self, start: usize) -> Span {
        start..self.stream.previous_end().max(start)
    }

    /// Start offset of an already built node.
    fn start_of(&self, id: NodeId) -> usize {
        self.builder.span(id).start
    }

    fn record(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    /// Consumes `kind` or records an "expected" problem. Returns `true` on match.
    fn expect(&mut self, kind: TokenKind) -> bool {
        match self.stream.expect(kind) {
            Ok(_) => true,
            Err(problem) => {
                self.record(problem);
                false
            }
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> bool {
        match self.stream.expect_keyword(keyword) {
            Ok(_) => true,
            Err(problem) => {
                self.record(problem);
                false
            }
        }
    }

    /// Runs `f` one nesting level deeper, or skips the nested text when the
    /// configured depth is exceeded.
    fn nested<F>(&mut self, f: F) -> ParseResult<NodeId>
    where
        F: FnOnce(&mut Self) -> ParseResult<NodeId>,
    {
        if self.depth >= self.config.max_nesting_depth {
            return Ok(self.skip_too_deep());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(output: &ParseOutput) -> NodeId {
        match output.tree.kind(output.tree.root()) {
            NodeKind::JpqlExpression {
                statement: Some(statement),
                ..
            } => *statement,
            other => panic!("expected a statement, found {other:?}"),
        }
    }

    #[test]
    fn parses_select_statement() {
        let output = parse("SELECT e FROM Employee e", rules::QL_STATEMENT).unwrap();
        assert!(output.problems.is_empty(), "{:?}", output.problems);
        let id = statement(&output);
        assert!(matches!(
            output.tree.kind(id),
            NodeKind::SelectStatement { from: Some(_), .. }
        ));
        assert_eq!(output.tree.text(id), "SELECT e FROM Employee e");
    }

    #[test]
    fn unknown_start_rule_is_fatal() {
        let err = parse("SELECT e FROM Employee e", "no_such_rule").unwrap_err();
        assert_eq!(
            err,
            GrammarError::UnknownRule {
                id: "no_such_rule".into()
            }
        );
    }

    #[test]
    fn non_statement_text_is_kept() {
        let output = parse("hello world", rules::QL_STATEMENT).unwrap();
        assert_eq!(output.problems[0].key, ProblemKey::InvalidStatement);
        let NodeKind::JpqlExpression { statement, unknown } = output.tree.kind(output.tree.root())
        else {
            panic!("root must be a JpqlExpression");
        };
        assert!(statement.is_none());
        let unknown = unknown.expect("trailing text node");
        assert_eq!(output.tree.text(unknown), "hello world");
    }

    #[test]
    fn empty_query_reports_invalid_statement() {
        let output = parse("   ", rules::QL_STATEMENT).unwrap();
        assert_eq!(output.problems.len(), 1);
        assert_eq!(output.problems[0].key, ProblemKey::InvalidStatement);
    }

    #[test]
    fn fragment_from_conditional_rule() {
        let output = parse("e.salary > 10 AND e.name = 'x'", rules::CONDITIONAL_EXPRESSION)
            .unwrap();
        assert!(output.problems.is_empty());
        assert!(matches!(
            output.tree.kind(statement(&output)),
            NodeKind::And { .. }
        ));
    }

    #[test]
    fn lexer_problems_come_first() {
        let output = parse("SELECT e FROM Employee e WHERE e.name = 'abc", rules::QL_STATEMENT)
            .unwrap();
        assert_eq!(output.problems[0].key, ProblemKey::UnterminatedString);
    }

    #[test]
    fn problems_are_anchored() {
        let output = parse("SELECT FROM Employee e", rules::QL_STATEMENT).unwrap();
        assert!(!output.problems.is_empty());
        assert!(output.problems.iter().all(|p| p.anchor.is_some()));
    }

    #[test]
    fn config_builder() {
        let config = ParserConfig::default().with_max_nesting_depth(4);
        assert_eq!(config.max_nesting_depth, 4);
        assert_eq!(ParserConfig::default().max_nesting_depth, 128);
    }
}
