//! Error recovery: turning text the grammar cannot place into tree nodes.

use super::Parser;
use crate::ast::{NodeId, NodeKind};
use crate::diag::{Problem, ProblemKey};
use crate::lexer::token::TokenKind;
use smol_str::SmolStr;
use tracing::warn;

impl<'a> Parser<'a> {
    /// Wraps everything left after the statement into one `Unknown` node.
    pub(super) fn parse_trailing_text(&mut self) -> Option<NodeId> {
        if self.stream.is_eof() {
            return None;
        }
        let start = self.stream.current_start();
        let end = self.source.trim_end().len().max(start);
        let text = SmolStr::new(&self.source[start..end]);
        while !self.stream.is_eof() {
            self.stream.advance();
        }

        let id = self.push(NodeKind::Unknown { text: text.clone() }, start..end);
        self.record(
            Problem::new(ProblemKey::UnknownExpression, start..end)
                .with_anchor(id)
                .with_argument(text),
        );
        Some(id)
    }

    /// Skips a construct nested beyond the configured depth.
    ///
    /// Consumes up to the `)` that closes the enclosing level, or to EOF.
    pub(super) fn skip_too_deep(&mut self) -> NodeId {
        let max = self.config.max_nesting_depth;
        warn!(max_depth = max, "query nesting exceeds the configured depth");

        let start = self.stream.current_start();
        let mut level = 0usize;
        loop {
            match self.stream.kind() {
                TokenKind::Eof => break,
                TokenKind::LParen => level += 1,
                TokenKind::RParen if level == 0 => break,
                TokenKind::RParen => level -= 1,
                _ => {}
            }
            self.stream.advance();
        }
        let span = self.span_from(start);
        let text = SmolStr::new(self.source.get(span.clone()).unwrap_or(""));
        let id = self.push(NodeKind::Unknown { text }, span.clone());
        self.record(
            Problem::new(ProblemKey::NestingTooDeep, span)
                .with_anchor(id)
                .with_argument(max.to_string()),
        );
        id
    }

    /// A zero-width `Bad` node where an expression was required.
    pub(super) fn missing_expression(&mut self, what: &str) -> NodeId {
        let at = self.stream.previous_end();
        let id = self.push(NodeKind::Bad, at..at);
        self.record(
            Problem::new(ProblemKey::MissingExpression, at..at)
                .with_anchor(id)
                .with_argument(what),
        );
        id
    }

    /// Consumes the current token as an `Unknown` leaf.
    pub(super) fn unknown_token(&mut self) -> NodeId {
        let span = self.stream.current().span.clone();
        let text = SmolStr::new(self.stream.current_text());
        self.stream.advance();
        let id = self.push(NodeKind::Unknown { text: text.clone() }, span.clone());
        self.record(
            Problem::new(ProblemKey::UnknownExpression, span)
                .with_anchor(id)
                .with_argument(text),
        );
        id
    }

    /// Re-reads a state-field path as collection-valued.
    ///
    /// Only the grammar position tells the two apart, so callers that expect
    /// a collection (`SIZE`, `IS EMPTY`, `MEMBER OF`, joins) retag what the
    /// primary parser produced.
    pub(super) fn as_collection_path(&mut self, id: NodeId) -> NodeId {
        if let NodeKind::StateFieldPath {
            root,
            segments,
            ends_with_dot,
        } = self.builder.kind(id)
        {
            let kind = NodeKind::CollectionValuedPath {
                root: *root,
                segments: segments.clone(),
                ends_with_dot: *ends_with_dot,
            };
            self.builder.retag(id, kind);
        }
        id
    }
}
