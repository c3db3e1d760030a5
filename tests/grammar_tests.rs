//! The shared grammar registry as seen by callers of the parser.

use jpql_parser::grammar::rules::{self, CONDITIONAL_EXPRESSION, QL_STATEMENT, SUBQUERY};
use jpql_parser::grammar::{
    ExpressionFactory, FactoryKind, GrammarBuilder, QueryBnf, Trigger,
};
use jpql_parser::lexer::token::Keyword;
use jpql_parser::{GrammarError, JpqlGrammar, parse};

const PUBLIC_RULES: &[&str] = &[
    rules::QL_STATEMENT,
    rules::SUBQUERY,
    rules::CONDITIONAL_EXPRESSION,
    rules::SCALAR_EXPRESSION,
    rules::SELECT_EXPRESSION,
    rules::SIMPLE_SELECT_EXPRESSION,
    rules::COMPARISON_EXPRESSION_RIGHT,
    rules::LITERAL,
    rules::INPUT_PARAMETER,
    rules::PATH_EXPRESSION,
    rules::FUNCTIONS_RETURNING_NUMERICS,
    rules::FUNCTIONS_RETURNING_STRINGS,
    rules::FUNCTIONS_RETURNING_DATETIME,
    rules::AGGREGATE_EXPRESSION,
    rules::CASE_EXPRESSION,
    rules::TYPE_EXPRESSION,
    rules::QUALIFIED_IDENTIFICATION_VARIABLE,
    rules::TREAT_EXPRESSION,
    rules::FUNCTION_EXPRESSION,
    rules::SUB_EXPRESSION,
    rules::GROUP_BY_ITEM,
    rules::ORDER_BY_ITEM,
    rules::IN_ITEM,
    rules::NEW_VALUE,
    rules::CONSTRUCTOR_ITEM,
    rules::JOIN_ASSOCIATION_PATH,
];

#[test]
fn every_public_rule_is_registered() {
    let grammar = JpqlGrammar::shared().unwrap();
    for rule in PUBLIC_RULES {
        let bnf = grammar.lookup(rule).unwrap();
        assert_eq!(bnf.id, *rule);
    }
    assert_eq!(grammar.rule_count(), PUBLIC_RULES.len());
}

#[test]
fn statements_dispatch_on_their_first_keyword() {
    let grammar = JpqlGrammar::shared().unwrap();
    let cases = [
        (QL_STATEMENT, Keyword::Select, Some(FactoryKind::SelectStatement)),
        (QL_STATEMENT, Keyword::Update, Some(FactoryKind::UpdateStatement)),
        (QL_STATEMENT, Keyword::Delete, Some(FactoryKind::DeleteStatement)),
        (QL_STATEMENT, Keyword::Where, None),
        (SUBQUERY, Keyword::Select, Some(FactoryKind::SimpleSelectStatement)),
        (SUBQUERY, Keyword::Update, None),
    ];
    for (rule, keyword, expected) in cases {
        assert_eq!(
            grammar.dispatch(rule, Trigger::Keyword(keyword)).unwrap(),
            expected,
            "{rule} on {keyword:?}"
        );
    }
}

#[test]
fn conditions_reach_every_scalar_factory() {
    let grammar = JpqlGrammar::shared().unwrap();
    let cases = [
        (Trigger::Identifier, FactoryKind::PathExpression),
        (Trigger::NumericLiteral, FactoryKind::NumericLiteral),
        (Trigger::StringLiteral, FactoryKind::StringLiteral),
        (Trigger::InputParameter, FactoryKind::InputParameter),
        (Trigger::OpenParen, FactoryKind::SubExpression),
        (Trigger::Keyword(Keyword::Upper), FactoryKind::Upper),
        (Trigger::Keyword(Keyword::Count), FactoryKind::Aggregate),
        (Trigger::Keyword(Keyword::Coalesce), FactoryKind::Coalesce),
        (Trigger::Keyword(Keyword::Exists), FactoryKind::Exists),
    ];
    for (trigger, expected) in cases {
        assert_eq!(
            grammar.dispatch(CONDITIONAL_EXPRESSION, trigger).unwrap(),
            Some(expected),
            "{trigger:?}"
        );
    }
}

#[test]
fn unknown_start_rule_is_an_error_not_a_problem() {
    let err = parse("SELECT e FROM Employee e", "no_such_rule").unwrap_err();
    assert_eq!(err, GrammarError::UnknownRule { id: "no_such_rule".into() });
    assert_eq!(err.to_string(), "grammar rule 'no_such_rule' is not registered");
}

#[test]
fn custom_grammars_are_verified_when_built() {
    let mut builder = GrammarBuilder::new();
    builder
        .register_factory(ExpressionFactory::new(
            "string",
            FactoryKind::StringLiteral,
            &[Trigger::StringLiteral],
        ))
        .unwrap();
    let err = builder
        .register_factory(ExpressionFactory::new(
            "string",
            FactoryKind::StringLiteral,
            &[Trigger::StringLiteral],
        ))
        .unwrap_err();
    assert_eq!(err, GrammarError::DuplicateFactory { id: "string".into() });

    builder
        .register(QueryBnf::new("text").with_factories(&["string", "number"]))
        .unwrap();
    let err = builder.build().unwrap_err();
    assert_eq!(
        err,
        GrammarError::UnknownFactory {
            id: "number".into(),
            rule: "text".into(),
        }
    );
    assert_eq!(
        err.to_string(),
        "expression factory 'number' referenced by rule 'text' is not registered"
    );
}

#[test]
fn custom_grammar_dispatches_its_own_rules() {
    let mut builder = GrammarBuilder::new();
    builder
        .register_factory(ExpressionFactory::keywords("lower", FactoryKind::Lower, &[Keyword::Lower]))
        .unwrap();
    builder
        .register(QueryBnf::new("strings").with_factories(&["lower"]))
        .unwrap();
    builder
        .register(QueryBnf::new("top").with_children(&["strings"]))
        .unwrap();
    let grammar = builder.build().unwrap();

    assert_eq!(
        grammar.dispatch("top", Trigger::Keyword(Keyword::Lower)).unwrap(),
        Some(FactoryKind::Lower)
    );
    assert_eq!(grammar.dispatch("top", Trigger::Identifier).unwrap(), None);
    assert!(grammar.factory("lower").is_ok());
    assert!(grammar.lookup(QL_STATEMENT).is_err());
}
