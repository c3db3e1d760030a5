//! Grammar registry: the BNF-like rule table that drives the parser.
//!
//! A [`QueryBnf`] names the sub-rules it accepts and the expression factories
//! it owns. An [`ExpressionFactory`] binds the tokens that can introduce an
//! expression (its triggers) to the kind of node the parser builds for it.
//!
//! The registry is assembled once with [`GrammarBuilder`], verified, and then
//! frozen into a [`JpqlGrammar`]. Every rule's dispatch table is resolved
//! transitively at build time, so parsing never walks the rule graph.

pub mod rules;

use crate::lexer::token::{Keyword, TokenKind};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::trace;

/// A configuration error in the grammar registry.
///
/// These are setup defects, never caused by query text, so they are returned
/// as `Err` instead of being recorded as problems.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
pub enum GrammarError {
    #[error("grammar rule '{id}' is not registered")]
    #[diagnostic(code(grammar::unknown_rule))]
    UnknownRule { id: String },

    #[error("expression factory '{id}' referenced by rule '{rule}' is not registered")]
    #[diagnostic(code(grammar::unknown_factory))]
    UnknownFactory { id: String, rule: String },

    #[error("grammar rule '{id}' is registered twice")]
    #[diagnostic(code(grammar::duplicate_rule))]
    DuplicateRule { id: String },

    #[error("expression factory '{id}' is registered twice")]
    #[diagnostic(code(grammar::duplicate_factory))]
    DuplicateFactory { id: String },
}

/// What kind of token can start an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Keyword(Keyword),
    Identifier,
    NumericLiteral,
    StringLiteral,
    InputParameter,
    OpenParen,
}

impl Trigger {
    /// Classifies a token; punctuation other than `(` never starts an expression.
    pub fn of(kind: &TokenKind) -> Option<Trigger> {
        match kind {
            TokenKind::Keyword(keyword) => Some(Trigger::Keyword(*keyword)),
            TokenKind::Identifier(_) => Some(Trigger::Identifier),
            TokenKind::IntegerLiteral(_) | TokenKind::DecimalLiteral(_) => {
                Some(Trigger::NumericLiteral)
            }
            TokenKind::StringLiteral(_) => Some(Trigger::StringLiteral),
            TokenKind::PositionalParameter(_) | TokenKind::NamedParameter(_) => {
                Some(Trigger::InputParameter)
            }
            TokenKind::LParen => Some(Trigger::OpenParen),
            _ => None,
        }
    }
}

/// The node constructor a factory stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryKind {
    SelectStatement,
    UpdateStatement,
    DeleteStatement,
    SimpleSelectStatement,
    SubExpression,
    PathExpression,
    NumericLiteral,
    StringLiteral,
    KeywordLiteral,
    InputParameter,
    DateTime,
    Abs,
    Sqrt,
    Mod,
    Length,
    Locate,
    Size,
    Index,
    Concat,
    Substring,
    Trim,
    Lower,
    Upper,
    Aggregate,
    Case,
    Coalesce,
    NullIf,
    Type,
    Treat,
    Key,
    Value,
    Entry,
    Function,
    Exists,
    AllOrAny,
    Object,
    Constructor,
}

/// Binds trigger tokens to a node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionFactory {
    pub id: &'static str,
    pub kind: FactoryKind,
    pub triggers: Vec<Trigger>,
}

impl ExpressionFactory {
    pub fn new(id: &'static str, kind: FactoryKind, triggers: &[Trigger]) -> Self {
        Self {
            id,
            kind,
            triggers: triggers.to_vec(),
        }
    }

    /// Shorthand for a factory introduced by keywords only.
    pub fn keywords(id: &'static str, kind: FactoryKind, keywords: &[Keyword]) -> Self {
        Self {
            id,
            kind,
            triggers: keywords.iter().copied().map(Trigger::Keyword).collect(),
        }
    }
}

/// A production rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBnf {
    pub id: &'static str,
    /// Rules whose expressions are also accepted here, in priority order.
    pub children: Vec<&'static str>,
    /// Factories owned directly by this rule.
    pub factories: Vec<&'static str>,
}

impl QueryBnf {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            children: Vec::new(),
            factories: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: &[&'static str]) -> Self {
        self.children.extend_from_slice(children);
        self
    }

    pub fn with_factories(mut self, factories: &[&'static str]) -> Self {
        self.factories.extend_from_slice(factories);
        self
    }
}

/// Collects rules and factories, then verifies and freezes them.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<QueryBnf>,
    factories: Vec<ExpressionFactory>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule. Ids must be unique.
    pub fn register(&mut self, rule: QueryBnf) -> Result<&mut Self, GrammarError> {
        if self.rules.iter().any(|existing| existing.id == rule.id) {
            return Err(GrammarError::DuplicateRule {
                id: rule.id.to_string(),
            });
        }
        trace!(rule = rule.id, "registering grammar rule");
        self.rules.push(rule);
        Ok(self)
    }

    /// Registers an expression factory. Ids must be unique.
    pub fn register_factory(
        &mut self,
        factory: ExpressionFactory,
    ) -> Result<&mut Self, GrammarError> {
        if self.factories.iter().any(|existing| existing.id == factory.id) {
            return Err(GrammarError::DuplicateFactory {
                id: factory.id.to_string(),
            });
        }
        self.factories.push(factory);
        Ok(self)
    }

    /// Verifies every reference and resolves per-rule dispatch tables.
    ///
    /// Rules may reference each other in any order and may form cycles; a rule
    /// or factory id that was never registered is reported here.
    pub fn build(self) -> Result<JpqlGrammar, GrammarError> {
        let rules: HashMap<&'static str, QueryBnf> =
            self.rules.into_iter().map(|rule| (rule.id, rule)).collect();
        let factories: HashMap<&'static str, ExpressionFactory> = self
            .factories
            .into_iter()
            .map(|factory| (factory.id, factory))
            .collect();

        for rule in rules.values() {
            for child in &rule.children {
                if !rules.contains_key(child) {
                    return Err(GrammarError::UnknownRule {
                        id: child.to_string(),
                    });
                }
            }
            for factory in &rule.factories {
                if !factories.contains_key(factory) {
                    return Err(GrammarError::UnknownFactory {
                        id: factory.to_string(),
                        rule: rule.id.to_string(),
                    });
                }
            }
        }

        let mut dispatch = HashMap::with_capacity(rules.len());
        for id in rules.keys() {
            let mut table = HashMap::new();
            let mut visited = HashSet::new();
            collect_dispatch(*id, &rules, &factories, &mut visited, &mut table);
            dispatch.insert(*id, table);
        }

        // Global keyword index, used to recognise a keyword expression that is
        // valid JPQL but not allowed at the current position.
        let mut keyword_index = HashMap::new();
        let mut ordered: Vec<&ExpressionFactory> = factories.values().collect();
        ordered.sort_by_key(|factory| factory.id);
        for factory in ordered {
            for trigger in &factory.triggers {
                if let Trigger::Keyword(keyword) = trigger {
                    keyword_index.entry(*keyword).or_insert(factory.kind);
                }
            }
        }

        Ok(JpqlGrammar {
            rules,
            factories,
            dispatch,
            keyword_index,
        })
    }
}

fn collect_dispatch(
    id: &'static str,
    rules: &HashMap<&'static str, QueryBnf>,
    factories: &HashMap<&'static str, ExpressionFactory>,
    visited: &mut HashSet<&'static str>,
    table: &mut HashMap<Trigger, FactoryKind>,
) {
    if !visited.insert(id) {
        return;
    }
    let Some(rule) = rules.get(id) else {
        return;
    };
    for factory_id in &rule.factories {
        if let Some(factory) = factories.get(factory_id) {
            for trigger in &factory.triggers {
                table.entry(*trigger).or_insert(factory.kind);
            }
        }
    }
    for child in &rule.children {
        collect_dispatch(*child, rules, factories, visited, table);
    }
}

/// The frozen, read-only grammar registry.
#[derive(Debug)]
pub struct JpqlGrammar {
    rules: HashMap<&'static str, QueryBnf>,
    factories: HashMap<&'static str, ExpressionFactory>,
    dispatch: HashMap<&'static str, HashMap<Trigger, FactoryKind>>,
    keyword_index: HashMap<Keyword, FactoryKind>,
}

static SHARED: OnceLock<Result<JpqlGrammar, GrammarError>> = OnceLock::new();

impl JpqlGrammar {
    /// The process-wide JPQL grammar, built on first use.
    pub fn shared() -> Result<&'static JpqlGrammar, GrammarError> {
        SHARED
            .get_or_init(rules::jpql_grammar)
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Looks up a rule by id.
    pub fn lookup(&self, id: &str) -> Result<&QueryBnf, GrammarError> {
        self.rules.get(id).ok_or_else(|| GrammarError::UnknownRule { id: id.to_string() })
    }

    /// Looks up a factory by id.
    pub fn factory(&self, id: &str) -> Result<&ExpressionFactory, GrammarError> {
        self.factories.get(id).ok_or_else(|| GrammarError::UnknownFactory {
            id: id.to_string(),
            rule: String::new(),
        })
    }

    /// Returns the factory `rule` uses for an expression starting with `trigger`.
    pub fn dispatch(&self, rule: &str, trigger: Trigger) -> Result<Option<FactoryKind>, GrammarError> {
        let table = self
            .dispatch
            .get(rule)
            .ok_or_else(|| GrammarError::UnknownRule { id: rule.to_string() })?;
        Ok(table.get(&trigger).copied())
    }

    /// Finds the factory any rule binds to `keyword`.
    pub fn factory_for_keyword(&self, keyword: Keyword) -> Option<FactoryKind> {
        self.keyword_index.get(&keyword).copied()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> GrammarBuilder {
        let mut builder = GrammarBuilder::new();
        builder
            .register_factory(ExpressionFactory::new(
                "number",
                FactoryKind::NumericLiteral,
                &[Trigger::NumericLiteral],
            ))
            .unwrap();
        builder
            .register_factory(ExpressionFactory::keywords("abs", FactoryKind::Abs, &[Keyword::Abs]))
            .unwrap();
        builder
            .register(QueryBnf::new("literal").with_factories(&["number"]))
            .unwrap();
        // Self-reference: recursive productions must be tolerated.
        builder
            .register(
                QueryBnf::new("arith")
                    .with_children(&["literal", "arith"])
                    .with_factories(&["abs"]),
            )
            .unwrap();
        builder
    }

    #[test]
    fn dispatch_resolves_through_children() {
        let grammar = tiny().build().unwrap();
        assert_eq!(
            grammar.dispatch("arith", Trigger::NumericLiteral).unwrap(),
            Some(FactoryKind::NumericLiteral)
        );
        assert_eq!(
            grammar.dispatch("arith", Trigger::Keyword(Keyword::Abs)).unwrap(),
            Some(FactoryKind::Abs)
        );
        assert_eq!(
            grammar.dispatch("literal", Trigger::Keyword(Keyword::Abs)).unwrap(),
            None
        );
    }

    #[test]
    fn lookup_unknown_rule_fails() {
        let grammar = tiny().build().unwrap();
        assert!(grammar.lookup("literal").is_ok());
        assert_eq!(
            grammar.lookup("nope").unwrap_err(),
            GrammarError::UnknownRule { id: "nope".into() }
        );
        assert!(grammar.dispatch("nope", Trigger::Identifier).is_err());
    }

    #[test]
    fn duplicate_rule_rejected() {
        let mut builder = tiny();
        let err = builder.register(QueryBnf::new("literal")).unwrap_err();
        assert_eq!(err, GrammarError::DuplicateRule { id: "literal".into() });
    }

    #[test]
    fn dangling_child_is_fatal() {
        let mut builder = tiny();
        builder
            .register(QueryBnf::new("broken").with_children(&["missing"]))
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            GrammarError::UnknownRule { id: "missing".into() }
        );
    }

    #[test]
    fn dangling_factory_is_fatal() {
        let mut builder = tiny();
        builder
            .register(QueryBnf::new("broken").with_factories(&["ghost"]))
            .unwrap();
        assert!(matches!(
            builder.build(),
            Err(GrammarError::UnknownFactory { .. })
        ));
    }

    #[test]
    fn keyword_index_is_global() {
        let grammar = tiny().build().unwrap();
        assert_eq!(grammar.factory_for_keyword(Keyword::Abs), Some(FactoryKind::Abs));
        assert_eq!(grammar.factory_for_keyword(Keyword::Select), None);
    }

    #[test]
    fn trigger_classification() {
        assert_eq!(Trigger::of(&TokenKind::LParen), Some(Trigger::OpenParen));
        assert_eq!(
            Trigger::of(&TokenKind::DecimalLiteral("1.5".into())),
            Some(Trigger::NumericLiteral)
        );
        assert_eq!(Trigger::of(&TokenKind::Comma), None);
    }
}
