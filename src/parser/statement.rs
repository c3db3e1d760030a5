//! Statements and clauses: SELECT, subqueries, UPDATE, DELETE.

use super::{ParseResult, Parser};
use crate::ast::{JoinType, NodeId, NodeKind, NullOrdering, Ordering, Spanned};
use crate::diag::{Problem, ProblemKey};
use crate::grammar::rules;
use crate::lexer::token::{Keyword, TokenKind};
use smol_str::SmolStr;

impl<'a> Parser<'a> {
    // ========================================================================
    // Statements
    // ========================================================================

    pub(super) fn parse_select_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let select = self.parse_select_clause(false)?;
        let from = self.parse_from_clause(false)?;
        let where_clause = self.parse_where_clause()?;
        let group_by = self.parse_group_by_clause()?;
        let having = self.parse_having_clause()?;
        let order_by = self.parse_order_by_clause()?;
        Ok(self.push_from(
            NodeKind::SelectStatement {
                select,
                from,
                where_clause,
                group_by,
                having,
                order_by,
            },
            start,
        ))
    }

    /// A subquery. Bare field names are never virtual inside one.
    pub(super) fn parse_simple_select(&mut self) -> ParseResult<NodeId> {
        let outer_virtual = self.virtual_variable.take();
        let result = self.parse_simple_select_body();
        self.virtual_variable = outer_virtual;
        result
    }

    fn parse_simple_select_body(&mut self) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let select = self.parse_select_clause(true)?;
        let from = self.parse_from_clause(true)?;
        let where_clause = self.parse_where_clause()?;
        let group_by = self.parse_group_by_clause()?;
        let having = self.parse_having_clause()?;
        Ok(self.push_from(
            NodeKind::SimpleSelectStatement {
                select,
                from,
                where_clause,
                group_by,
                having,
            },
            start,
        ))
    }

    pub(super) fn parse_update_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let outer_virtual = self.virtual_variable.take();
        self.stream.advance();

        let range = self.parse_range_declaration(true)?;
        let mut items = Vec::new();
        if self.stream.consume_keyword(Keyword::Set).is_some() {
            loop {
                items.push(self.parse_update_item()?);
                if !self.stream.consume(&TokenKind::Comma) {
                    break;
                }
            }
        } else {
            self.missing_clause("SET");
        }
        let update = self.push_from(NodeKind::UpdateClause { range, items }, start);
        let where_clause = self.parse_where_clause()?;

        self.virtual_variable = outer_virtual;
        Ok(self.push_from(
            NodeKind::UpdateStatement {
                update,
                where_clause,
            },
            start,
        ))
    }

    pub(super) fn parse_delete_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let outer_virtual = self.virtual_variable.take();
        self.stream.advance();

        self.expect_keyword(Keyword::From);
        let range = self.parse_range_declaration(true)?;
        let delete = self.push_from(NodeKind::DeleteClause { range }, start);
        let where_clause = self.parse_where_clause()?;

        self.virtual_variable = outer_virtual;
        Ok(self.push_from(
            NodeKind::DeleteStatement {
                delete,
                where_clause,
            },
            start,
        ))
    }

    // ========================================================================
    // SELECT and FROM
    // ========================================================================

    fn parse_select_clause(&mut self, simple: bool) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        self.expect_keyword(Keyword::Select);
        let distinct = self.stream.consume_keyword(Keyword::Distinct).is_some();

        let mut items = Vec::new();
        loop {
            let item = if simple {
                self.parse_arithmetic(rules::SIMPLE_SELECT_EXPRESSION)?
            } else {
                self.parse_select_item()?
            };
            items.push(item);
            if !self.stream.consume(&TokenKind::Comma) {
                break;
            }
        }

        let kind = if simple {
            NodeKind::SimpleSelectClause { distinct, items }
        } else {
            NodeKind::SelectClause { distinct, items }
        };
        Ok(self.push_from(kind, start))
    }

    /// A select expression, optionally named by `[AS] result_variable`.
    fn parse_select_item(&mut self) -> ParseResult<NodeId> {
        let expression = self.parse_arithmetic(rules::SELECT_EXPRESSION)?;
        let start = self.start_of(expression);
        let has_as = self.stream.consume_keyword(Keyword::As).is_some();
        if !has_as && !matches!(self.stream.kind(), TokenKind::Identifier(_)) {
            return Ok(expression);
        }
        let variable = match self.parse_variable_name() {
            Some(variable) => variable,
            None => self.missing_expression("result variable"),
        };
        Ok(self.push_from(
            NodeKind::ResultVariable {
                expression,
                has_as,
                variable,
            },
            start,
        ))
    }

    fn parse_from_clause(&mut self, simple: bool) -> ParseResult<Option<NodeId>> {
        let start = self.stream.current_start();
        if self.stream.consume_keyword(Keyword::From).is_none() {
            self.missing_clause("FROM");
            return Ok(None);
        }

        let mut declarations = Vec::new();
        loop {
            declarations.push(self.parse_declaration()?);
            if !self.stream.consume(&TokenKind::Comma) {
                break;
            }
        }

        let kind = if simple {
            NodeKind::SimpleFromClause { declarations }
        } else {
            NodeKind::FromClause { declarations }
        };
        Ok(Some(self.push_from(kind, start)))
    }

    fn parse_declaration(&mut self) -> ParseResult<NodeId> {
        if self.stream.check_keyword(Keyword::In) {
            return self.parse_collection_member_declaration();
        }
        let start = self.stream.current_start();
        let range = self.parse_range_declaration(false)?;
        let mut joins = Vec::new();
        while matches!(
            self.stream.kind().keyword(),
            Some(Keyword::Join | Keyword::Left | Keyword::Inner)
        ) {
            joins.push(self.parse_join()?);
        }
        Ok(self.push_from(
            NodeKind::IdentificationVariableDeclaration { range, joins },
            start,
        ))
    }

    /// `Entity [AS] v`, or the derived `v.path [AS] w` of a subquery.
    ///
    /// With `allow_virtual`, a missing variable is synthesized from the entity
    /// name and bare field names in the rest of the statement refer to it.
    fn parse_range_declaration(&mut self, allow_virtual: bool) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let mut entity_name = None;
        let root = match self.stream.identifier() {
            Some(name) => {
                let span = self.stream.current().span.clone();
                self.stream.advance();
                if self.stream.check(&TokenKind::Dot) {
                    let variable = self.push_variable(name, span);
                    let (segments, ends_with_dot) = self.parse_segments();
                    self.push_from(
                        NodeKind::CollectionValuedPath {
                            root: variable,
                            segments,
                            ends_with_dot,
                        },
                        start,
                    )
                } else {
                    entity_name = Some(name.clone());
                    self.push(NodeKind::AbstractSchemaName { name }, span)
                }
            }
            None => self.missing_expression("abstract schema name"),
        };

        let has_as = self.stream.consume_keyword(Keyword::As).is_some();
        let variable = if self.stream.identifier().is_some() {
            self.parse_variable_name()
        } else {
            match entity_name {
                Some(entity) if allow_virtual && !has_as => {
                    let name = SmolStr::new(entity.to_lowercase());
                    let at = self.stream.previous_end();
                    self.virtual_variable = Some(name.clone());
                    Some(self.push(
                        NodeKind::IdentificationVariable {
                            name,
                            is_virtual: true,
                            virtual_path: None,
                        },
                        at..at,
                    ))
                }
                _ => {
                    self.missing_variable();
                    None
                }
            }
        };

        Ok(self.push_from(
            NodeKind::RangeVariableDeclaration {
                root,
                has_as,
                variable,
            },
            start,
        ))
    }

    /// `IN(path) [AS] v`
    fn parse_collection_member_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        self.stream.advance();
        self.expect(TokenKind::LParen);
        let path = self.parse_primary(rules::PATH_EXPRESSION)?;
        let path = self.as_collection_path(path);
        self.expect(TokenKind::RParen);

        let has_as = self.stream.consume_keyword(Keyword::As).is_some();
        let variable = self.parse_variable_name();
        if variable.is_none() {
            self.missing_variable();
        }
        Ok(self.push_from(
            NodeKind::CollectionMemberDeclaration {
                path,
                has_as,
                variable,
            },
            start,
        ))
    }

    /// `[LEFT [OUTER] | INNER] JOIN [FETCH] path [[AS] v] [ON cond]`
    fn parse_join(&mut self) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let join_type = if self.stream.consume_keyword(Keyword::Left).is_some() {
            if self.stream.consume_keyword(Keyword::Outer).is_some() {
                JoinType::LeftOuterJoin
            } else {
                JoinType::LeftJoin
            }
        } else if self.stream.consume_keyword(Keyword::Inner).is_some() {
            JoinType::InnerJoin
        } else {
            JoinType::Join
        };
        self.expect_keyword(Keyword::Join);
        let fetch = self.stream.consume_keyword(Keyword::Fetch).is_some();

        let path = self.parse_primary(rules::JOIN_ASSOCIATION_PATH)?;
        let association = match self.builder.kind(path) {
            NodeKind::Treat { path: inner, .. } => *inner,
            _ => path,
        };
        self.as_collection_path(association);

        let has_as = self.stream.consume_keyword(Keyword::As).is_some();
        let variable = self.parse_variable_name();
        if variable.is_none() && (has_as || !fetch) {
            self.missing_variable();
        }

        let on = if self.stream.check_keyword(Keyword::On) {
            let on_start = self.stream.current_start();
            self.stream.advance();
            let condition = self.parse_conditional(rules::CONDITIONAL_EXPRESSION)?;
            Some(self.push_from(NodeKind::OnClause { condition }, on_start))
        } else {
            None
        };

        Ok(self.push_from(
            NodeKind::Join {
                join_type,
                fetch,
                path,
                has_as,
                variable,
                on,
            },
            start,
        ))
    }

    /// Declares a variable named by the current token, if it can name one.
    fn parse_variable_name(&mut self) -> Option<NodeId> {
        let name = self.stream.identifier()?;
        let span = self.stream.current().span.clone();
        self.stream.advance();
        Some(self.push_variable(name, span))
    }

    // ========================================================================
    // WHERE, GROUP BY, HAVING, ORDER BY
    // ========================================================================

    fn parse_where_clause(&mut self) -> ParseResult<Option<NodeId>> {
        self.parse_condition_clause(Keyword::Where, |condition| NodeKind::WhereClause {
            condition,
        })
    }

    fn parse_having_clause(&mut self) -> ParseResult<Option<NodeId>> {
        self.parse_condition_clause(Keyword::Having, |condition| NodeKind::HavingClause {
            condition,
        })
    }

    fn parse_condition_clause(
        &mut self,
        keyword: Keyword,
        make: fn(NodeId) -> NodeKind,
    ) -> ParseResult<Option<NodeId>> {
        let start = self.stream.current_start();
        if self.stream.consume_keyword(keyword).is_none() {
            return Ok(None);
        }
        let condition = self.parse_conditional(rules::CONDITIONAL_EXPRESSION)?;
        Ok(Some(self.push_from(make(condition), start)))
    }

    fn parse_group_by_clause(&mut self) -> ParseResult<Option<NodeId>> {
        let start = self.stream.current_start();
        if self.stream.consume_keyword(Keyword::Group).is_none() {
            return Ok(None);
        }
        self.expect_keyword(Keyword::By);
        let mut items = Vec::new();
        loop {
            items.push(self.parse_arithmetic(rules::GROUP_BY_ITEM)?);
            if !self.stream.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(Some(self.push_from(NodeKind::GroupByClause { items }, start)))
    }

    fn parse_order_by_clause(&mut self) -> ParseResult<Option<NodeId>> {
        let start = self.stream.current_start();
        if self.stream.consume_keyword(Keyword::Order).is_none() {
            return Ok(None);
        }
        self.expect_keyword(Keyword::By);
        let mut items = Vec::new();
        loop {
            items.push(self.parse_order_by_item()?);
            if !self.stream.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(Some(self.push_from(NodeKind::OrderByClause { items }, start)))
    }

    fn parse_order_by_item(&mut self) -> ParseResult<NodeId> {
        let expression = self.parse_arithmetic(rules::ORDER_BY_ITEM)?;
        let start = self.start_of(expression);
        let ordering = if self.stream.consume_keyword(Keyword::Asc).is_some() {
            Ordering::Asc
        } else if self.stream.consume_keyword(Keyword::Desc).is_some() {
            Ordering::Desc
        } else {
            Ordering::Default
        };

        let mut nulls = NullOrdering::Default;
        if self.stream.consume_keyword(Keyword::Nulls).is_some() {
            if self.stream.consume_keyword(Keyword::First).is_some() {
                nulls = NullOrdering::NullsFirst;
            } else if self.stream.consume_keyword(Keyword::Last).is_some() {
                nulls = NullOrdering::NullsLast;
            } else {
                let problem = self
                    .stream
                    .problem_here(ProblemKey::ExpectedToken)
                    .with_argument("FIRST or LAST");
                self.record(problem);
            }
        }

        Ok(self.push_from(
            NodeKind::OrderByItem {
                expression,
                ordering,
                nulls,
            },
            start,
        ))
    }

    // ========================================================================
    // UPDATE ... SET
    // ========================================================================

    fn parse_update_item(&mut self) -> ParseResult<NodeId> {
        let start = self.stream.current_start();
        let path = self.parse_update_path();
        self.expect(TokenKind::Eq);
        let value = self.parse_arithmetic(rules::NEW_VALUE)?;
        Ok(self.push_from(NodeKind::UpdateItem { path, value }, start))
    }

    /// The target of a `SET` item; always a state-field path.
    fn parse_update_path(&mut self) -> NodeId {
        let Some(name) = self.stream.identifier() else {
            return self.missing_expression("update item");
        };
        let name_span = self.stream.current().span.clone();
        self.stream.advance();
        let (segments, ends_with_dot) = self.parse_segments();

        if let Some(virtual_name) = self.virtual_variable.clone() {
            if !name.eq_ignore_ascii_case(&virtual_name) {
                let field = Spanned::new(name, name_span);
                return self.push_virtual_path(virtual_name, field, segments, ends_with_dot);
            }
        }

        let start = name_span.start;
        let root = self.push_variable(name, name_span);
        self.push_from(
            NodeKind::StateFieldPath {
                root,
                segments,
                ends_with_dot,
            },
            start,
        )
    }

    fn missing_clause(&mut self, clause: &str) {
        let at = self.stream.previous_end();
        self.record(Problem::new(ProblemKey::MissingClause, at..at).with_argument(clause));
    }
}
