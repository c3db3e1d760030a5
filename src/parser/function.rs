//! Function-like expressions: built-in functions, aggregates, `CASE`,
//! `TREAT`, `NEW`, and the subquery operators `EXISTS` and `ALL`/`ANY`/`SOME`.

use super::{ParseResult, Parser};
use crate::ast::{AggregateFunction, NodeId, NodeKind, Quantifier, TrimSpecification};
use crate::diag::ProblemKey;
use crate::grammar::{FactoryKind, rules};
use crate::lexer::token::{Keyword, TokenKind};
use smol_str::SmolStr;

impl<'a> Parser<'a> {
    /// Parses the function introduced by the current keyword.
    pub(super) fn parse_function(&mut self, factory: FactoryKind) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let keyword = self.stream.kind().keyword();
        self.stream.advance();

        let kind = match factory {
            FactoryKind::Abs => NodeKind::Abs {
                expression: self.in_parens(Self::scalar)?,
            },
            FactoryKind::Sqrt => NodeKind::Sqrt {
                expression: self.in_parens(Self::scalar)?,
            },
            FactoryKind::Length => NodeKind::Length {
                expression: self.in_parens(Self::scalar)?,
            },
            FactoryKind::Lower => NodeKind::Lower {
                expression: self.in_parens(Self::scalar)?,
            },
            FactoryKind::Upper => NodeKind::Upper {
                expression: self.in_parens(Self::scalar)?,
            },
            FactoryKind::Size => {
                let expression = self.in_parens(Self::scalar)?;
                NodeKind::Size {
                    expression: self.as_collection_path(expression),
                }
            }
            FactoryKind::Index => NodeKind::Index {
                expression: self.in_parens(Self::path)?,
            },
            FactoryKind::Entry => NodeKind::Entry {
                expression: self.in_parens(Self::path)?,
            },
            FactoryKind::Type => NodeKind::Type {
                expression: self.in_parens(|p| p.parse_primary(rules::SCALAR_EXPRESSION))?,
            },
            FactoryKind::Key => {
                let expression = self.in_parens(Self::path)?;
                let key = self.push_from(NodeKind::Key { expression }, start);
                return Ok(self.continue_path(key, start));
            }
            FactoryKind::Value => {
                let expression = self.in_parens(Self::path)?;
                let value = self.push_from(NodeKind::Value { expression }, start);
                return Ok(self.continue_path(value, start));
            }
            FactoryKind::Mod => {
                let (first, second) = self.in_parens(|p| {
                    let first = p.scalar()?;
                    p.expect(TokenKind::Comma);
                    Ok((first, p.scalar()?))
                })?;
                NodeKind::Mod { first, second }
            }
            FactoryKind::Locate | FactoryKind::Substring => {
                let (first, second, third) = self.in_parens(|p| {
                    let first = p.scalar()?;
                    p.expect(TokenKind::Comma);
                    let second = p.scalar()?;
                    let third = if p.stream.consume(&TokenKind::Comma) {
                        Some(p.scalar()?)
                    } else {
                        None
                    };
                    Ok((first, second, third))
                })?;
                if factory == FactoryKind::Locate {
                    NodeKind::Locate {
                        first,
                        second,
                        third,
                    }
                } else {
                    NodeKind::Substring {
                        first,
                        second,
                        third,
                    }
                }
            }
            FactoryKind::Concat => NodeKind::Concat {
                arguments: self.in_parens(|p| p.scalar_list(rules::SCALAR_EXPRESSION))?,
            },
            FactoryKind::Coalesce => NodeKind::Coalesce {
                arguments: self.in_parens(|p| p.scalar_list(rules::SCALAR_EXPRESSION))?,
            },
            FactoryKind::NullIf => {
                let (first, second) = self.in_parens(|p| {
                    let first = p.scalar()?;
                    p.expect(TokenKind::Comma);
                    Ok((first, p.scalar()?))
                })?;
                NodeKind::NullIf { first, second }
            }
            FactoryKind::Trim => self.in_parens(Self::trim_arguments)?,
            FactoryKind::Aggregate => {
                let function = match keyword {
                    Some(Keyword::Avg) => AggregateFunction::Avg,
                    Some(Keyword::Sum) => AggregateFunction::Sum,
                    Some(Keyword::Min) => AggregateFunction::Min,
                    Some(Keyword::Max) => AggregateFunction::Max,
                    _ => AggregateFunction::Count,
                };
                let (distinct, expression) = self.in_parens(|p| {
                    let distinct = p.stream.consume_keyword(Keyword::Distinct).is_some();
                    Ok((distinct, p.scalar()?))
                })?;
                NodeKind::Aggregate {
                    function,
                    distinct,
                    expression,
                }
            }
            FactoryKind::Case => self.case_body()?,
            FactoryKind::Treat => {
                let (path, has_as, entity_type) = self.in_parens(|p| {
                    let path = p.path()?;
                    let path = p.as_collection_path(path);
                    let has_as = p.stream.consume_keyword(Keyword::As).is_some();
                    let entity_type = match p.stream.identifier() {
                        Some(name) => p.entity_type_literal(name),
                        None => p.missing_expression("entity type"),
                    };
                    Ok((path, has_as, entity_type))
                })?;
                let treat = self.push_from(
                    NodeKind::Treat {
                        path,
                        has_as,
                        entity_type,
                    },
                    start,
                );
                return Ok(self.continue_path(treat, start));
            }
            FactoryKind::Function => {
                let (name, arguments) = self.in_parens(|p| {
                    let name = match p.stream.kind() {
                        TokenKind::StringLiteral(name) => {
                            let name = name.clone();
                            p.stream.advance();
                            name
                        }
                        _ => {
                            let problem = p
                                .stream
                                .problem_here(ProblemKey::ExpectedToken)
                                .with_argument("function name");
                            p.record(problem);
                            SmolStr::default()
                        }
                    };
                    let arguments = if p.stream.consume(&TokenKind::Comma) {
                        p.scalar_list(rules::SCALAR_EXPRESSION)?
                    } else {
                        Vec::new()
                    };
                    Ok((name, arguments))
                })?;
                NodeKind::Function { name, arguments }
            }
            FactoryKind::Object => NodeKind::ObjectExpression {
                variable: self.in_parens(Self::path)?,
            },
            FactoryKind::Constructor => self.constructor_body()?,
            FactoryKind::Exists => NodeKind::Exists {
                not: false,
                subquery: self.parse_paren_subquery()?,
            },
            FactoryKind::AllOrAny => NodeKind::AllOrAny {
                quantifier: match keyword {
                    Some(Keyword::All) => Quantifier::All,
                    Some(Keyword::Any) => Quantifier::Any,
                    _ => Quantifier::Some,
                },
                subquery: self.parse_paren_subquery()?,
            },
            _ => return Ok(self.missing_expression("function")),
        };
        Ok(self.push_from(kind, start))
    }

    /// `( SELECT ... )`
    pub(super) fn parse_paren_subquery(&mut self) -> ParseResult<NodeId> {
        self.in_parens(|p| {
            if p.stream.check_keyword(Keyword::Select) {
                p.parse_simple_select()
            } else {
                Ok(p.missing_expression("subquery"))
            }
        })
    }

    fn in_parens<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.expect(TokenKind::LParen);
        let value = f(self)?;
        self.expect(TokenKind::RParen);
        Ok(value)
    }

    fn scalar(&mut self) -> ParseResult<NodeId> {
        self.parse_arithmetic(rules::SCALAR_EXPRESSION)
    }

    fn path(&mut self) -> ParseResult<NodeId> {
        self.parse_primary(rules::PATH_EXPRESSION)
    }

    fn scalar_list(&mut self, rule: &str) -> ParseResult<Vec<NodeId>> {
        let mut items = vec![self.parse_arithmetic(rule)?];
        while self.stream.consume(&TokenKind::Comma) {
            items.push(self.parse_arithmetic(rule)?);
        }
        Ok(items)
    }

    /// `[LEADING|TRAILING|BOTH] [char] [FROM] string`
    fn trim_arguments(&mut self) -> ParseResult<NodeKind> {
        let specification = match self.stream.kind().keyword() {
            Some(Keyword::Leading) => TrimSpecification::Leading,
            Some(Keyword::Trailing) => TrimSpecification::Trailing,
            Some(Keyword::Both) => TrimSpecification::Both,
            _ => TrimSpecification::Default,
        };
        if specification != TrimSpecification::Default {
            self.stream.advance();
        }
        let character = if !self.stream.check_keyword(Keyword::From)
            && self.stream.peek().kind.is_keyword(Keyword::From)
        {
            Some(self.parse_primary(rules::SCALAR_EXPRESSION)?)
        } else {
            None
        };
        let has_from = self.stream.consume_keyword(Keyword::From).is_some();
        let string = self.scalar()?;
        Ok(NodeKind::Trim {
            specification,
            character,
            has_from,
            string,
        })
    }

    /// `[operand] WHEN c THEN r {WHEN ..} ELSE r END`
    fn case_body(&mut self) -> ParseResult<NodeKind> {
        let operand = if self.stream.check_keyword(Keyword::When) {
            None
        } else {
            Some(self.scalar()?)
        };

        let mut whens = Vec::new();
        while self.stream.check_keyword(Keyword::When) {
            let start = self.stream.current_start();
            self.stream.advance();
            let condition = self.parse_conditional(rules::CONDITIONAL_EXPRESSION)?;
            self.expect_keyword(Keyword::Then);
            let result = self.scalar()?;
            whens.push(self.push_from(NodeKind::When { condition, result }, start));
        }
        if whens.is_empty() {
            self.expect_keyword(Keyword::When);
        }

        self.expect_keyword(Keyword::Else);
        let otherwise = self.scalar()?;
        self.expect_keyword(Keyword::End);
        Ok(NodeKind::Case {
            operand,
            whens,
            otherwise,
        })
    }

    /// `NEW com.acme.Dto(items)`
    fn constructor_body(&mut self) -> ParseResult<NodeKind> {
        let mut class_name = String::new();
        match self.stream.identifier() {
            Some(first) => {
                class_name.push_str(&first);
                self.stream.advance();
                let (segments, _) = self.parse_segments();
                for segment in segments {
                    class_name.push('.');
                    class_name.push_str(&segment.node);
                }
            }
            None => {
                let problem = self
                    .stream
                    .problem_here(ProblemKey::ExpectedToken)
                    .with_argument("class name");
                self.record(problem);
            }
        }
        let arguments = self.in_parens(|p| p.scalar_list(rules::CONSTRUCTOR_ITEM))?;
        Ok(NodeKind::ConstructorExpression {
            class_name: SmolStr::new(class_name),
            arguments,
        })
    }
}
