//! Token stream navigation shared by every parser module.

use crate::ast::Span;
use crate::diag::{Problem, ProblemKey};
use crate::lexer::token::{Keyword, Token, TokenKind};
use smol_str::SmolStr;

/// Outcome of expecting a specific token: its span, or the problem to record.
pub type Expectation = Result<Span, Problem>;

static EOF: Token = Token {
    kind: TokenKind::Eof,
    span: 0..0,
};

/// Cursor over a lexed token slice. The slice always ends with EOF.
pub struct TokenStream<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    /// Returns the current token, or EOF past the end.
    pub fn current(&self) -> &'a Token {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    pub fn kind(&self) -> &'a TokenKind {
        &self.current().kind
    }

    /// Returns the token `n` positions ahead without consuming anything.
    pub fn peek_nth(&self, n: usize) -> &'a Token {
        self.tokens
            .get(self.pos + n)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    pub fn peek(&self) -> &'a Token {
        self.peek_nth(1)
    }

    /// Advances to the next token. Does nothing at EOF.
    pub fn advance(&mut self) {
        if self.pos < self.tokens.len().saturating_sub(1) {
            self.pos += 1;
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    pub fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        self.kind().is_keyword(keyword)
    }

    /// Consumes the current token if it matches `kind`.
    pub fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes `keyword` and returns its span.
    pub fn consume_keyword(&mut self, keyword: Keyword) -> Option<Span> {
        if self.check_keyword(keyword) {
            let span = self.current().span.clone();
            self.advance();
            Some(span)
        } else {
            None
        }
    }

    /// Expects a specific token kind and returns its span.
    ///
    /// On mismatch nothing is consumed and the problem is returned for the
    /// caller to record.
    pub fn expect(&mut self, kind: TokenKind) -> Expectation {
        if self.check(&kind) {
            let span = self.current().span.clone();
            self.advance();
            Ok(span)
        } else {
            Err(self.problem_here(ProblemKey::ExpectedToken).with_argument(kind.to_string()))
        }
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> Expectation {
        self.consume_keyword(keyword).ok_or_else(|| {
            self.problem_here(ProblemKey::ExpectedToken)
                .with_argument(keyword.as_str())
        })
    }

    /// Creates a problem over the current token, or at the end of the text.
    pub fn problem_here(&self, key: ProblemKey) -> Problem {
        Problem::new(key, self.current().span.clone())
    }

    /// The identifier text of the current token when it can name something.
    ///
    /// Accepts identifiers and keywords that are not reserved, so `size`,
    /// `first` or `value` can still be used as names.
    pub fn identifier(&self) -> Option<SmolStr> {
        match self.kind() {
            TokenKind::Identifier(name) => Some(name.clone()),
            TokenKind::Keyword(keyword)
                if !keyword.is_reserved() && !self.peek().kind.eq(&TokenKind::LParen) =>
            {
                Some(SmolStr::new(self.current_text()))
            }
            _ => None,
        }
    }

    /// Like [`identifier`](Self::identifier), but any keyword is accepted.
    ///
    /// Path segments after a dot are never keywords: `e.order`, `e.type`.
    pub fn path_segment(&self) -> Option<SmolStr> {
        match self.kind() {
            TokenKind::Identifier(name) => Some(name.clone()),
            TokenKind::Keyword(_) => Some(SmolStr::new(self.current_text())),
            _ => None,
        }
    }

    /// The current token exactly as written.
    pub fn current_text(&self) -> &'a str {
        self.current().slice(self.source)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Sets the position in the token stream (used for backtracking).
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len().saturating_sub(1));
    }

    /// Returns the span of the previous token (useful after consuming a token).
    pub fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span.clone()
        } else {
            let start = self.current().span.start;
            start..start
        }
    }

    /// End offset of the last consumed token.
    pub fn previous_end(&self) -> usize {
        self.previous_span().end
    }

    /// Start offset of the current token.
    pub fn current_start(&self) -> usize {
        self.current().span.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn navigation_and_lookahead() {
        let source = "SELECT e FROM";
        let result = tokenize(source);
        let mut stream = TokenStream::new(source, &result.tokens);

        assert!(stream.check_keyword(Keyword::Select));
        assert_eq!(stream.peek().kind, TokenKind::Identifier("e".into()));
        assert_eq!(stream.peek_nth(2).kind, TokenKind::Keyword(Keyword::From));

        stream.advance();
        assert_eq!(stream.identifier().as_deref(), Some("e"));
        assert_eq!(stream.previous_span(), 0..6);
    }

    #[test]
    fn expect_failure_keeps_position() {
        let source = "e )";
        let result = tokenize(source);
        let mut stream = TokenStream::new(source, &result.tokens);

        let problem = stream.expect(TokenKind::LParen).unwrap_err();
        assert_eq!(problem.key, ProblemKey::ExpectedToken);
        assert_eq!(problem.arguments, vec!["'('".to_string()]);
        assert_eq!(problem.span(), 0..1);
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn stays_at_eof() {
        let source = "a";
        let result = tokenize(source);
        let mut stream = TokenStream::new(source, &result.tokens);
        stream.advance();
        stream.advance();
        stream.advance();
        assert!(stream.is_eof());
        assert_eq!(stream.current().span, 1..1);
    }

    #[test]
    fn function_keyword_as_identifier() {
        let source = "size = 3";
        let result = tokenize(source);
        let stream = TokenStream::new(source, &result.tokens);
        assert_eq!(stream.identifier().as_deref(), Some("size"));

        let source = "SIZE(e.projects)";
        let result = tokenize(source);
        let stream = TokenStream::new(source, &result.tokens);
        assert_eq!(stream.identifier(), None);
    }

    #[test]
    fn keywords_are_path_segments() {
        let source = "order";
        let result = tokenize(source);
        let stream = TokenStream::new(source, &result.tokens);
        assert_eq!(stream.identifier(), None);
        assert_eq!(stream.path_segment().as_deref(), Some("order"));
    }
}
