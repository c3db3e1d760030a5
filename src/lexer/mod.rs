//! Lexical analysis for JPQL.
//!
//! Scanning is driven by a logos automaton; this module turns its raw output
//! into [`Token`]s, classifies words as keywords or identifiers, and records
//! lexical problems without stopping. The token list always ends with an EOF
//! token positioned at the end of the text.

pub mod keywords;
pub mod token;

use crate::diag::{Problem, ProblemKey};
use logos::Logos;
use smol_str::SmolStr;
use token::{Token, TokenKind};

/// Result of lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerResult {
    /// The tokens produced, including an EOF token at the end.
    pub tokens: Vec<Token>,
    /// Lexical problems encountered during scanning.
    pub problems: Vec<Problem>,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Word,

    #[regex(r"[0-9]+[lL]?")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fFdD]?")]
    #[regex(r"[0-9]+[fFdD]")]
    Decimal,

    #[regex(r"'([^']|'')*'")]
    String,

    #[regex(r"\?[0-9]+")]
    PositionalParameter,

    #[regex(r":[A-Za-z_$][A-Za-z0-9_$]*")]
    NamedParameter,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token("<>")]
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
}

/// A lexical analyzer for JPQL query text.
pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    problems: Vec<Problem>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Tokenizes the source text, consuming the lexer.
    pub fn tokenize(mut self) -> LexerResult {
        let mut raw = RawToken::lexer(self.source);

        while let Some(result) = raw.next() {
            let span = raw.span();
            let text = raw.slice();
            match result {
                Ok(kind) => {
                    let kind = self.classify(kind, text);
                    self.tokens.push(Token::new(kind, span));
                }
                Err(()) if self.source[span.start..].starts_with('\'') => {
                    // An opening quote with no partner swallows the rest of the text.
                    self.problems.push(Problem::new(
                        ProblemKey::UnterminatedString,
                        span.start..self.source.len(),
                    ));
                    break;
                }
                Err(()) => {
                    let problem = Problem::new(ProblemKey::InvalidCharacter, span)
                        .with_argument(text);
                    self.problems.push(problem);
                }
            }
        }

        let eof = self.source.len();
        self.tokens.push(Token::new(TokenKind::Eof, eof..eof));

        LexerResult {
            tokens: self.tokens,
            problems: self.problems,
        }
    }

    fn classify(&self, kind: RawToken, text: &str) -> TokenKind {
        match kind {
            RawToken::Word => match keywords::lookup_keyword(text) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier(SmolStr::new(text)),
            },
            RawToken::Integer => TokenKind::IntegerLiteral(SmolStr::new(text)),
            RawToken::Decimal => TokenKind::DecimalLiteral(SmolStr::new(text)),
            RawToken::String => {
                let inner = &text[1..text.len() - 1];
                TokenKind::StringLiteral(SmolStr::new(inner.replace("''", "'")))
            }
            RawToken::PositionalParameter => TokenKind::PositionalParameter(SmolStr::new(&text[1..])),
            RawToken::NamedParameter => TokenKind::NamedParameter(SmolStr::new(&text[1..])),
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Eq => TokenKind::Eq,
            RawToken::NotEq => TokenKind::NotEq,
            RawToken::Lt => TokenKind::Lt,
            RawToken::LtEq => TokenKind::LtEq,
            RawToken::Gt => TokenKind::Gt,
            RawToken::GtEq => TokenKind::GtEq,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
        }
    }
}

/// Convenience function to tokenize source text.
pub fn tokenize(source: &str) -> LexerResult {
    Lexer::new(source).tokenize()
}
