//! The JPA 2.1 JPQL grammar.
//!
//! Rule ids are public so callers can parse a fragment from any rule.

use super::{ExpressionFactory, FactoryKind, GrammarBuilder, GrammarError, JpqlGrammar, QueryBnf, Trigger};
use crate::lexer::token::Keyword;

// ============================================================================
// Rule identifiers
// ============================================================================

pub const QL_STATEMENT: &str = "ql_statement";
pub const SUBQUERY: &str = "subquery";
pub const CONDITIONAL_EXPRESSION: &str = "conditional_expression";
pub const SCALAR_EXPRESSION: &str = "scalar_expression";
pub const SELECT_EXPRESSION: &str = "select_expression";
pub const SIMPLE_SELECT_EXPRESSION: &str = "simple_select_expression";
pub const COMPARISON_EXPRESSION_RIGHT: &str = "comparison_expression_right";
pub const LITERAL: &str = "literal";
pub const INPUT_PARAMETER: &str = "input_parameter";
pub const PATH_EXPRESSION: &str = "path_expression";
pub const FUNCTIONS_RETURNING_NUMERICS: &str = "functions_returning_numerics";
pub const FUNCTIONS_RETURNING_STRINGS: &str = "functions_returning_strings";
pub const FUNCTIONS_RETURNING_DATETIME: &str = "functions_returning_datetime";
pub const AGGREGATE_EXPRESSION: &str = "aggregate_expression";
pub const CASE_EXPRESSION: &str = "case_expression";
pub const TYPE_EXPRESSION: &str = "type_expression";
pub const QUALIFIED_IDENTIFICATION_VARIABLE: &str = "qualified_identification_variable";
pub const TREAT_EXPRESSION: &str = "treat_expression";
pub const FUNCTION_EXPRESSION: &str = "function_expression";
pub const SUB_EXPRESSION: &str = "sub_expression";
pub const GROUP_BY_ITEM: &str = "group_by_item";
pub const ORDER_BY_ITEM: &str = "order_by_item";
pub const IN_ITEM: &str = "in_item";
pub const NEW_VALUE: &str = "new_value";
pub const CONSTRUCTOR_ITEM: &str = "constructor_item";
pub const JOIN_ASSOCIATION_PATH: &str = "join_association_path";

// ============================================================================
// Factory identifiers
// ============================================================================

const SELECT_STATEMENT: &str = "select_statement";
const UPDATE_STATEMENT: &str = "update_statement";
const DELETE_STATEMENT: &str = "delete_statement";
const SIMPLE_SELECT_STATEMENT: &str = "simple_select_statement";
const SUB_EXPRESSION_FACTORY: &str = "sub_expression_factory";
const PATH_FACTORY: &str = "path_or_variable";
const NUMERIC_LITERAL: &str = "numeric_literal";
const STRING_LITERAL: &str = "string_literal";
const KEYWORD_LITERAL: &str = "keyword_literal";
const INPUT_PARAMETER_FACTORY: &str = "input_parameter_factory";
const DATE_TIME: &str = "date_time";
const ABS: &str = "abs";
const SQRT: &str = "sqrt";
const MOD: &str = "mod";
const LENGTH: &str = "length";
const LOCATE: &str = "locate";
const SIZE: &str = "size";
const INDEX: &str = "index";
const CONCAT: &str = "concat";
const SUBSTRING: &str = "substring";
const TRIM: &str = "trim";
const LOWER: &str = "lower";
const UPPER: &str = "upper";
const AGGREGATE: &str = "aggregate";
const CASE: &str = "case";
const COALESCE: &str = "coalesce";
const NULLIF: &str = "nullif";
const TYPE: &str = "type";
const TREAT: &str = "treat";
const KEY: &str = "key";
const VALUE: &str = "value";
const ENTRY: &str = "entry";
const FUNCTION: &str = "function";
const EXISTS: &str = "exists";
const ALL_OR_ANY: &str = "all_or_any";
const OBJECT: &str = "object";
const CONSTRUCTOR: &str = "constructor";

fn factories() -> Vec<ExpressionFactory> {
    use FactoryKind as F;
    vec![
        ExpressionFactory::keywords(SELECT_STATEMENT, F::SelectStatement, &[Keyword::Select]),
        ExpressionFactory::keywords(UPDATE_STATEMENT, F::UpdateStatement, &[Keyword::Update]),
        ExpressionFactory::keywords(DELETE_STATEMENT, F::DeleteStatement, &[Keyword::Delete]),
        ExpressionFactory::keywords(
            SIMPLE_SELECT_STATEMENT,
            F::SimpleSelectStatement,
            &[Keyword::Select],
        ),
        ExpressionFactory::new(SUB_EXPRESSION_FACTORY, F::SubExpression, &[Trigger::OpenParen]),
        ExpressionFactory::new(PATH_FACTORY, F::PathExpression, &[Trigger::Identifier]),
        ExpressionFactory::new(NUMERIC_LITERAL, F::NumericLiteral, &[Trigger::NumericLiteral]),
        ExpressionFactory::new(STRING_LITERAL, F::StringLiteral, &[Trigger::StringLiteral]),
        ExpressionFactory::keywords(
            KEYWORD_LITERAL,
            F::KeywordLiteral,
            &[Keyword::True, Keyword::False, Keyword::Null],
        ),
        ExpressionFactory::new(INPUT_PARAMETER_FACTORY, F::InputParameter, &[Trigger::InputParameter]),
        ExpressionFactory::keywords(
            DATE_TIME,
            F::DateTime,
            &[Keyword::CurrentDate, Keyword::CurrentTime, Keyword::CurrentTimestamp],
        ),
        ExpressionFactory::keywords(ABS, F::Abs, &[Keyword::Abs]),
        ExpressionFactory::keywords(SQRT, F::Sqrt, &[Keyword::Sqrt]),
        ExpressionFactory::keywords(MOD, F::Mod, &[Keyword::Mod]),
        ExpressionFactory::keywords(LENGTH, F::Length, &[Keyword::Length]),
        ExpressionFactory::keywords(LOCATE, F::Locate, &[Keyword::Locate]),
        ExpressionFactory::keywords(SIZE, F::Size, &[Keyword::Size]),
        ExpressionFactory::keywords(INDEX, F::Index, &[Keyword::Index]),
        ExpressionFactory::keywords(CONCAT, F::Concat, &[Keyword::Concat]),
        ExpressionFactory::keywords(SUBSTRING, F::Substring, &[Keyword::Substring]),
        ExpressionFactory::keywords(TRIM, F::Trim, &[Keyword::Trim]),
        ExpressionFactory::keywords(LOWER, F::Lower, &[Keyword::Lower]),
        ExpressionFactory::keywords(UPPER, F::Upper, &[Keyword::Upper]),
        ExpressionFactory::keywords(
            AGGREGATE,
            F::Aggregate,
            &[Keyword::Avg, Keyword::Sum, Keyword::Min, Keyword::Max, Keyword::Count],
        ),
        ExpressionFactory::keywords(CASE, F::Case, &[Keyword::Case]),
        ExpressionFactory::keywords(COALESCE, F::Coalesce, &[Keyword::Coalesce]),
        ExpressionFactory::keywords(NULLIF, F::NullIf, &[Keyword::Nullif]),
        ExpressionFactory::keywords(TYPE, F::Type, &[Keyword::Type]),
        ExpressionFactory::keywords(TREAT, F::Treat, &[Keyword::Treat]),
        ExpressionFactory::keywords(KEY, F::Key, &[Keyword::Key]),
        ExpressionFactory::keywords(VALUE, F::Value, &[Keyword::Value]),
        ExpressionFactory::keywords(ENTRY, F::Entry, &[Keyword::Entry]),
        ExpressionFactory::keywords(FUNCTION, F::Function, &[Keyword::Function]),
        ExpressionFactory::keywords(EXISTS, F::Exists, &[Keyword::Exists]),
        ExpressionFactory::keywords(
            ALL_OR_ANY,
            F::AllOrAny,
            &[Keyword::All, Keyword::Any, Keyword::Some],
        ),
        ExpressionFactory::keywords(OBJECT, F::Object, &[Keyword::Object]),
        ExpressionFactory::keywords(CONSTRUCTOR, F::Constructor, &[Keyword::New]),
    ]
}

fn productions() -> Vec<QueryBnf> {
    vec![
        // Leaves
        QueryBnf::new(LITERAL).with_factories(&[NUMERIC_LITERAL, STRING_LITERAL, KEYWORD_LITERAL]),
        QueryBnf::new(INPUT_PARAMETER).with_factories(&[INPUT_PARAMETER_FACTORY]),
        QueryBnf::new(PATH_EXPRESSION).with_factories(&[PATH_FACTORY]),
        QueryBnf::new(FUNCTIONS_RETURNING_NUMERICS)
            .with_factories(&[ABS, SQRT, MOD, LENGTH, LOCATE, SIZE, INDEX]),
        QueryBnf::new(FUNCTIONS_RETURNING_STRINGS)
            .with_factories(&[CONCAT, SUBSTRING, TRIM, LOWER, UPPER]),
        QueryBnf::new(FUNCTIONS_RETURNING_DATETIME).with_factories(&[DATE_TIME]),
        QueryBnf::new(AGGREGATE_EXPRESSION).with_factories(&[AGGREGATE]),
        QueryBnf::new(CASE_EXPRESSION).with_factories(&[CASE, COALESCE, NULLIF]),
        QueryBnf::new(TYPE_EXPRESSION).with_factories(&[TYPE]),
        QueryBnf::new(QUALIFIED_IDENTIFICATION_VARIABLE).with_factories(&[KEY, VALUE]),
        QueryBnf::new(TREAT_EXPRESSION).with_factories(&[TREAT]),
        QueryBnf::new(FUNCTION_EXPRESSION).with_factories(&[FUNCTION]),
        QueryBnf::new(SUB_EXPRESSION).with_factories(&[SUB_EXPRESSION_FACTORY]),
        // Composites
        QueryBnf::new(SCALAR_EXPRESSION).with_children(&[
            LITERAL,
            INPUT_PARAMETER,
            PATH_EXPRESSION,
            FUNCTIONS_RETURNING_NUMERICS,
            FUNCTIONS_RETURNING_STRINGS,
            FUNCTIONS_RETURNING_DATETIME,
            AGGREGATE_EXPRESSION,
            CASE_EXPRESSION,
            TYPE_EXPRESSION,
            QUALIFIED_IDENTIFICATION_VARIABLE,
            FUNCTION_EXPRESSION,
            SUB_EXPRESSION,
        ]),
        QueryBnf::new(CONDITIONAL_EXPRESSION)
            .with_children(&[SCALAR_EXPRESSION])
            .with_factories(&[EXISTS]),
        QueryBnf::new(SELECT_EXPRESSION)
            .with_children(&[SCALAR_EXPRESSION])
            .with_factories(&[OBJECT, CONSTRUCTOR, ENTRY]),
        QueryBnf::new(SIMPLE_SELECT_EXPRESSION).with_children(&[SCALAR_EXPRESSION]),
        QueryBnf::new(CONSTRUCTOR_ITEM).with_children(&[SCALAR_EXPRESSION]),
        QueryBnf::new(COMPARISON_EXPRESSION_RIGHT)
            .with_children(&[SCALAR_EXPRESSION])
            .with_factories(&[ALL_OR_ANY]),
        QueryBnf::new(GROUP_BY_ITEM).with_children(&[PATH_EXPRESSION, QUALIFIED_IDENTIFICATION_VARIABLE]),
        QueryBnf::new(ORDER_BY_ITEM).with_children(&[SCALAR_EXPRESSION]),
        QueryBnf::new(IN_ITEM).with_children(&[LITERAL, INPUT_PARAMETER, PATH_EXPRESSION, SUB_EXPRESSION]),
        QueryBnf::new(NEW_VALUE).with_children(&[SCALAR_EXPRESSION]),
        QueryBnf::new(JOIN_ASSOCIATION_PATH).with_children(&[PATH_EXPRESSION, TREAT_EXPRESSION]),
        // Statements
        QueryBnf::new(SUBQUERY).with_factories(&[SIMPLE_SELECT_STATEMENT]),
        QueryBnf::new(QL_STATEMENT).with_factories(&[SELECT_STATEMENT, UPDATE_STATEMENT, DELETE_STATEMENT]),
    ]
}

/// Builds the default JPQL grammar.
pub fn jpql_grammar() -> Result<JpqlGrammar, GrammarError> {
    let mut builder = GrammarBuilder::new();
    for factory in factories() {
        builder.register_factory(factory)?;
    }
    for rule in productions() {
        builder.register(rule)?;
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grammar_builds() {
        let grammar = jpql_grammar().unwrap();
        assert!(grammar.rule_count() >= 25);
        assert!(grammar.lookup(QL_STATEMENT).is_ok());
        assert!(grammar.lookup(CONDITIONAL_EXPRESSION).is_ok());
    }

    #[test]
    fn exists_only_in_conditions() {
        let grammar = jpql_grammar().unwrap();
        let exists = Trigger::Keyword(Keyword::Exists);
        assert_eq!(
            grammar.dispatch(CONDITIONAL_EXPRESSION, exists).unwrap(),
            Some(FactoryKind::Exists)
        );
        assert_eq!(grammar.dispatch(SCALAR_EXPRESSION, exists).unwrap(), None);
    }

    #[test]
    fn object_only_in_select() {
        let grammar = jpql_grammar().unwrap();
        let object = Trigger::Keyword(Keyword::Object);
        assert_eq!(
            grammar.dispatch(SELECT_EXPRESSION, object).unwrap(),
            Some(FactoryKind::Object)
        );
        assert_eq!(grammar.dispatch(CONDITIONAL_EXPRESSION, object).unwrap(), None);
        assert_eq!(grammar.factory_for_keyword(Keyword::Object), Some(FactoryKind::Object));
    }

    #[test]
    fn statement_dispatch() {
        let grammar = jpql_grammar().unwrap();
        assert_eq!(
            grammar.dispatch(QL_STATEMENT, Trigger::Keyword(Keyword::Delete)).unwrap(),
            Some(FactoryKind::DeleteStatement)
        );
        assert_eq!(
            grammar.dispatch(SUBQUERY, Trigger::Keyword(Keyword::Select)).unwrap(),
            Some(FactoryKind::SimpleSelectStatement)
        );
    }

    #[test]
    fn shared_grammar_is_reused() {
        let first = JpqlGrammar::shared().unwrap();
        let second = JpqlGrammar::shared().unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
