//! Conditional, arithmetic and primary expressions.
//!
//! Precedence, loosest first: `OR`, `AND`, `NOT`, simple conditions
//! (comparison, `BETWEEN`, `LIKE`, `IN`, `IS`, `MEMBER OF`), `+ -`, `* /`,
//! unary sign, primary. Primaries are chosen by the grammar: the rule passed
//! down decides which factory an opening token selects.

use super::{ParseResult, Parser};
use crate::ast::{ComparisonOperator, KeywordLiteralKind, NodeId, NodeKind, DateTimeKind, Span, Spanned};
use crate::diag::{Problem, ProblemKey};
use crate::grammar::{FactoryKind, Trigger, rules};
use crate::lexer::token::{Keyword, TokenKind};
use smol_str::SmolStr;

fn comparison_operator(kind: &TokenKind) -> Option<ComparisonOperator> {
    match kind {
        TokenKind::Eq => Some(ComparisonOperator::Eq),
        TokenKind::NotEq => Some(ComparisonOperator::NotEq),
        TokenKind::Lt => Some(ComparisonOperator::Lt),
        TokenKind::LtEq => Some(ComparisonOperator::LtEq),
        TokenKind::Gt => Some(ComparisonOperator::Gt),
        TokenKind::GtEq => Some(ComparisonOperator::GtEq),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    // ========================================================================
    // Conditions
    // ========================================================================

    /// Parses `cond {OR cond}`; `rule` selects the allowed primaries.
    pub(super) fn parse_conditional(&mut self, rule: &str) -> ParseResult<NodeId> {
        let mut left = self.parse_and(rule)?;
        let start = self.start_of(left);
        while self.stream.consume_keyword(Keyword::Or).is_some() {
            let right = self.parse_and(rule)?;
            left = self.push_from(NodeKind::Or { left, right }, start);
        }
        Ok(left)
    }

    fn parse_and(&mut self, rule: &str) -> ParseResult<NodeId> {
        let mut left = self.parse_not(rule)?;
        let start = self.start_of(left);
        while self.stream.consume_keyword(Keyword::And).is_some() {
            let right = self.parse_not(rule)?;
            left = self.push_from(NodeKind::And { left, right }, start);
        }
        Ok(left)
    }

    fn parse_not(&mut self, rule: &str) -> ParseResult<NodeId> {
        if !self.stream.check_keyword(Keyword::Not) {
            return self.parse_simple_condition(rule);
        }
        self.nested(|p| {
            let start = p.stream.current_start();
            p.stream.advance();
            if p.stream.consume_keyword(Keyword::Exists).is_some() {
                let subquery = p.parse_paren_subquery()?;
                return Ok(p.push_from(NodeKind::Exists { not: true, subquery }, start));
            }
            let expression = p.parse_not(rule)?;
            Ok(p.push_from(NodeKind::Not { expression }, start))
        })
    }

    fn parse_simple_condition(&mut self, rule: &str) -> ParseResult<NodeId> {
        let left = self.parse_arithmetic(rule)?;
        let start = self.start_of(left);

        if let Some(operator) = comparison_operator(self.stream.kind()) {
            self.stream.advance();
            let right = self.parse_arithmetic(rules::COMPARISON_EXPRESSION_RIGHT)?;
            return Ok(self.push_from(
                NodeKind::Comparison {
                    left,
                    operator,
                    right,
                },
                start,
            ));
        }

        let negated = self.stream.check_keyword(Keyword::Not)
            && matches!(
                self.stream.peek().kind.keyword(),
                Some(Keyword::Between | Keyword::Like | Keyword::In | Keyword::Member)
            );
        if negated {
            self.stream.advance();
        }

        let kind = match self.stream.kind().keyword() {
            Some(Keyword::Between) => {
                self.stream.advance();
                let lower = self.parse_arithmetic(rules::SCALAR_EXPRESSION)?;
                self.expect_keyword(Keyword::And);
                let upper = self.parse_arithmetic(rules::SCALAR_EXPRESSION)?;
                NodeKind::Between {
                    expression: left,
                    not: negated,
                    lower,
                    upper,
                }
            }
            Some(Keyword::Like) => {
                self.stream.advance();
                let pattern = self.parse_arithmetic(rules::SCALAR_EXPRESSION)?;
                let escape = match self.stream.consume_keyword(Keyword::Escape) {
                    Some(_) => Some(self.parse_arithmetic(rules::SCALAR_EXPRESSION)?),
                    None => None,
                };
                NodeKind::Like {
                    expression: left,
                    not: negated,
                    pattern,
                    escape,
                }
            }
            Some(Keyword::In) => {
                self.stream.advance();
                let items = self.parse_in_items(left)?;
                NodeKind::In {
                    expression: left,
                    not: negated,
                    items,
                }
            }
            Some(Keyword::Member) => {
                self.stream.advance();
                let of = self.stream.consume_keyword(Keyword::Of).is_some();
                let collection = self.parse_arithmetic(rules::PATH_EXPRESSION)?;
                let collection = self.as_collection_path(collection);
                NodeKind::CollectionMember {
                    entity: left,
                    not: negated,
                    of,
                    collection,
                }
            }
            Some(Keyword::Is) => {
                self.stream.advance();
                let not = self.stream.consume_keyword(Keyword::Not).is_some();
                if self.stream.consume_keyword(Keyword::Empty).is_some() {
                    let expression = self.as_collection_path(left);
                    NodeKind::EmptyCollectionComparison { expression, not }
                } else {
                    if self.stream.consume_keyword(Keyword::Null).is_none() {
                        let problem = self
                            .stream
                            .problem_here(ProblemKey::ExpectedToken)
                            .with_argument("NULL or EMPTY");
                        self.record(problem);
                    }
                    NodeKind::NullComparison {
                        expression: left,
                        not,
                    }
                }
            }
            _ => return Ok(left),
        };
        Ok(self.push_from(kind, start))
    }

    /// Items of `IN`: a single parameter, a subquery or a parenthesised list.
    fn parse_in_items(&mut self, left: NodeId) -> ParseResult<Vec<NodeId>> {
        if matches!(
            self.stream.kind(),
            TokenKind::PositionalParameter(_) | TokenKind::NamedParameter(_)
        ) {
            return Ok(vec![self.parse_primary(rules::IN_ITEM)?]);
        }
        if !self.expect(TokenKind::LParen) {
            return Ok(vec![self.missing_expression("IN items")]);
        }
        if self.stream.check_keyword(Keyword::Select) {
            let subquery = self.nested(|p| p.parse_simple_select())?;
            self.expect(TokenKind::RParen);
            return Ok(vec![subquery]);
        }

        // TYPE(e) IN (A, B) lists entity names.
        let entity_types = matches!(self.builder.kind(left), NodeKind::Type { .. });
        let mut items = Vec::new();
        loop {
            let item = match self.stream.identifier() {
                Some(name) if entity_types => self.entity_type_literal(name),
                _ => self.parse_arithmetic(rules::IN_ITEM)?,
            };
            items.push(item);
            if !self.stream.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen);
        Ok(items)
    }

    /// Consumes the current identifier as an entity type literal.
    pub(super) fn entity_type_literal(&mut self, name: SmolStr) -> NodeId {
        let span = self.stream.current().span.clone();
        self.stream.advance();
        self.push(NodeKind::EntityTypeLiteral { name }, span)
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Parses `term {(+|-) term}`. Operands after the first are scalar.
    pub(super) fn parse_arithmetic(&mut self, rule: &str) -> ParseResult<NodeId> {
        let mut left = self.parse_term(rule)?;
        let start = self.start_of(left);
        loop {
            let addition = match self.stream.kind() {
                TokenKind::Plus => true,
                TokenKind::Minus => false,
                _ => break,
            };
            self.stream.advance();
            let right = self.parse_term(rules::SCALAR_EXPRESSION)?;
            let kind = if addition {
                NodeKind::Addition { left, right }
            } else {
                NodeKind::Subtraction { left, right }
            };
            left = self.push_from(kind, start);
        }
        Ok(left)
    }

    fn parse_term(&mut self, rule: &str) -> ParseResult<NodeId> {
        let mut left = self.parse_factor(rule)?;
        let start = self.start_of(left);
        loop {
            let multiplication = match self.stream.kind() {
                TokenKind::Star => true,
                TokenKind::Slash => false,
                _ => break,
            };
            self.stream.advance();
            let right = self.parse_factor(rules::SCALAR_EXPRESSION)?;
            let kind = if multiplication {
                NodeKind::Multiplication { left, right }
            } else {
                NodeKind::Division { left, right }
            };
            left = self.push_from(kind, start);
        }
        Ok(left)
    }

    fn parse_factor(&mut self, rule: &str) -> ParseResult<NodeId> {
        let negative = match self.stream.kind() {
            TokenKind::Minus => true,
            TokenKind::Plus => false,
            _ => return self.parse_primary(rule),
        };
        self.nested(|p| {
            let start = p.stream.current_start();
            p.stream.advance();
            let expression = p.parse_factor(rules::SCALAR_EXPRESSION)?;
            Ok(p.push_from(
                NodeKind::ArithmeticFactor {
                    negative,
                    expression,
                },
                start,
            ))
        })
    }

    // ========================================================================
    // Primaries
    // ========================================================================

    /// Parses one primary through the factory `rule` binds to the current token.
    pub(super) fn parse_primary(&mut self, rule: &str) -> ParseResult<NodeId> {
        let trigger = match self.stream.kind() {
            TokenKind::Keyword(keyword)
                if !keyword.is_reserved() && self.stream.peek().kind != TokenKind::LParen =>
            {
                Some(Trigger::Identifier)
            }
            other => Trigger::of(other),
        };
        let Some(trigger) = trigger else {
            return Ok(self.missing_expression(rule));
        };

        if let Some(factory) = self.grammar.dispatch(rule, trigger)? {
            return self.build(factory);
        }

        match trigger {
            Trigger::Keyword(keyword) => match self.grammar.factory_for_keyword(keyword) {
                // Known elsewhere in the grammar: parse it and report the misplacement.
                Some(factory) => {
                    let problem = self
                        .stream
                        .problem_here(ProblemKey::ExpressionNotAllowed)
                        .with_argument(self.stream.current_text())
                        .with_argument(rule);
                    let id = self.build(factory)?;
                    self.record(problem.with_anchor(id));
                    Ok(id)
                }
                None => Ok(self.missing_expression(rule)),
            },
            _ => Ok(self.unknown_token()),
        }
    }

    fn build(&mut self, factory: FactoryKind) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let kind = match factory {
            FactoryKind::SelectStatement | FactoryKind::SimpleSelectStatement => {
                return self.nested(|p| p.parse_simple_select());
            }
            FactoryKind::UpdateStatement | FactoryKind::DeleteStatement => {
                return Ok(self.unknown_token());
            }
            FactoryKind::SubExpression => return self.nested(|p| p.parse_sub_expression()),
            FactoryKind::PathExpression => return Ok(self.parse_path_or_variable()),
            FactoryKind::NumericLiteral => NodeKind::NumericLiteral {
                text: SmolStr::new(self.stream.current_text()),
            },
            FactoryKind::StringLiteral => NodeKind::StringLiteral {
                value: match self.stream.kind() {
                    TokenKind::StringLiteral(value) => value.clone(),
                    _ => SmolStr::default(),
                },
            },
            FactoryKind::KeywordLiteral => NodeKind::KeywordLiteral {
                literal: match self.stream.kind().keyword() {
                    Some(Keyword::True) => KeywordLiteralKind::True,
                    Some(Keyword::False) => KeywordLiteralKind::False,
                    _ => KeywordLiteralKind::Null,
                },
            },
            FactoryKind::InputParameter => match self.stream.kind() {
                TokenKind::PositionalParameter(name) => NodeKind::InputParameter {
                    name: name.clone(),
                    positional: true,
                },
                TokenKind::NamedParameter(name) => NodeKind::InputParameter {
                    name: name.clone(),
                    positional: false,
                },
                _ => return Ok(self.unknown_token()),
            },
            FactoryKind::DateTime => NodeKind::DateTime {
                kind: match self.stream.kind().keyword() {
                    Some(Keyword::CurrentTime) => DateTimeKind::CurrentTime,
                    Some(Keyword::CurrentTimestamp) => DateTimeKind::CurrentTimestamp,
                    _ => DateTimeKind::CurrentDate,
                },
            },
            function => return self.nested(|p| p.parse_function(function)),
        };
        self.stream.advance();
        Ok(self.push_from(kind, start))
    }

    /// `( conditional )` or `( subquery )`.
    fn parse_sub_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        self.stream.advance();
        let expression = if self.stream.check_keyword(Keyword::Select) {
            self.parse_simple_select()?
        } else {
            self.parse_conditional(rules::CONDITIONAL_EXPRESSION)?
        };
        self.expect(TokenKind::RParen);
        Ok(self.push_from(NodeKind::SubExpression { expression }, start))
    }

    // ========================================================================
    // Paths and variables
    // ========================================================================

    /// `v`, `v.a.b`, or in virtual mode a bare field name.
    fn parse_path_or_variable(&mut self) -> NodeId {
        let name_span = self.stream.current().span.clone();
        let name = SmolStr::new(self.stream.current_text());
        self.stream.advance();
        let (segments, ends_with_dot) = self.parse_segments();

        if let Some(virtual_name) = self.virtual_variable.clone() {
            if !name.eq_ignore_ascii_case(&virtual_name) {
                let bare = segments.is_empty() && !ends_with_dot;
                let field = Spanned::new(name.clone(), name_span.clone());
                let path = self.push_virtual_path(virtual_name, field, segments, ends_with_dot);
                if !bare {
                    return path;
                }
                return self.push(
                    NodeKind::IdentificationVariable {
                        name,
                        is_virtual: true,
                        virtual_path: Some(path),
                    },
                    name_span,
                );
            }
        }

        let start = name_span.start;
        let variable = self.push_variable(name, name_span);
        if segments.is_empty() && !ends_with_dot {
            return variable;
        }
        self.push_from(
            NodeKind::StateFieldPath {
                root: variable,
                segments,
                ends_with_dot,
            },
            start,
        )
    }

    /// Reads `.segment` pairs. The flag is set when the text ends with a dot.
    pub(super) fn parse_segments(&mut self) -> (Vec<Spanned<SmolStr>>, bool) {
        let mut segments = Vec::new();
        while self.stream.consume(&TokenKind::Dot) {
            match self.stream.path_segment() {
                Some(segment) => {
                    segments.push(Spanned::new(segment, self.stream.current().span.clone()));
                    self.stream.advance();
                }
                None => return (segments, true),
            }
        }
        (segments, false)
    }

    /// Continues `KEY(m)`, `VALUE(m)` or `TREAT(..)` with `.segments`.
    pub(super) fn continue_path(&mut self, root: NodeId, start: usize) -> NodeId {
        if !self.stream.check(&TokenKind::Dot) {
            return root;
        }
        let (segments, ends_with_dot) = self.parse_segments();
        self.push_from(
            NodeKind::StateFieldPath {
                root,
                segments,
                ends_with_dot,
            },
            start,
        )
    }

    pub(super) fn push_variable(&mut self, name: SmolStr, span: Span) -> NodeId {
        self.push(
            NodeKind::IdentificationVariable {
                name,
                is_virtual: false,
                virtual_path: None,
            },
            span,
        )
    }

    /// A path rooted at the zero-width virtual variable, `field` first.
    pub(super) fn push_virtual_path(
        &mut self,
        virtual_name: SmolStr,
        field: Spanned<SmolStr>,
        mut segments: Vec<Spanned<SmolStr>>,
        ends_with_dot: bool,
    ) -> NodeId {
        let start = field.span.start;
        let root = self.push(
            NodeKind::IdentificationVariable {
                name: virtual_name,
                is_virtual: true,
                virtual_path: None,
            },
            start..start,
        );
        segments.insert(0, field);
        self.push_from(
            NodeKind::StateFieldPath {
                root,
                segments,
                ends_with_dot,
            },
            start,
        )
    }

    /// Records a problem for a required identification variable.
    pub(super) fn missing_variable(&mut self) {
        let at = self.stream.previous_end();
        self.record(Problem::new(ProblemKey::MissingIdentificationVariable, at..at));
    }
}
