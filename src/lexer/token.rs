//! Token types produced by the JPQL lexer.

use crate::ast::Span;
use smol_str::SmolStr;
use std::fmt;

/// JPQL keywords. Recognition is case-insensitive (see [`super::keywords`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Keyword {
    // Statements and clauses
    Select,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Nulls,
    First,
    Last,
    Update,
    Set,
    Delete,
    Distinct,
    As,
    Join,
    Left,
    Outer,
    Inner,
    Fetch,
    On,
    In,

    // Conditions
    And,
    Or,
    Not,
    Between,
    Like,
    Escape,
    Is,
    Null,
    Empty,
    Member,
    Of,
    Exists,
    All,
    Any,
    Some,
    True,
    False,

    // Select expressions
    Object,
    New,
    Case,
    When,
    Then,
    Else,
    End,
    Coalesce,
    Nullif,

    // Functions
    Type,
    Treat,
    Key,
    Value,
    Entry,
    Index,
    Size,
    Abs,
    Sqrt,
    Mod,
    Length,
    Locate,
    Concat,
    Substring,
    Trim,
    Leading,
    Trailing,
    Both,
    Lower,
    Upper,
    Avg,
    Sum,
    Min,
    Max,
    Count,
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
    Function,
}

impl Keyword {
    /// Canonical upper-case spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Group => "GROUP",
            Keyword::By => "BY",
            Keyword::Having => "HAVING",
            Keyword::Order => "ORDER",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Nulls => "NULLS",
            Keyword::First => "FIRST",
            Keyword::Last => "LAST",
            Keyword::Update => "UPDATE",
            Keyword::Set => "SET",
            Keyword::Delete => "DELETE",
            Keyword::Distinct => "DISTINCT",
            Keyword::As => "AS",
            Keyword::Join => "JOIN",
            Keyword::Left => "LEFT",
            Keyword::Outer => "OUTER",
            Keyword::Inner => "INNER",
            Keyword::Fetch => "FETCH",
            Keyword::On => "ON",
            Keyword::In => "IN",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Between => "BETWEEN",
            Keyword::Like => "LIKE",
            Keyword::Escape => "ESCAPE",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::Empty => "EMPTY",
            Keyword::Member => "MEMBER",
            Keyword::Of => "OF",
            Keyword::Exists => "EXISTS",
            Keyword::All => "ALL",
            Keyword::Any => "ANY",
            Keyword::Some => "SOME",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Object => "OBJECT",
            Keyword::New => "NEW",
            Keyword::Case => "CASE",
            Keyword::When => "WHEN",
            Keyword::Then => "THEN",
            Keyword::Else => "ELSE",
            Keyword::End => "END",
            Keyword::Coalesce => "COALESCE",
            Keyword::Nullif => "NULLIF",
            Keyword::Type => "TYPE",
            Keyword::Treat => "TREAT",
            Keyword::Key => "KEY",
            Keyword::Value => "VALUE",
            Keyword::Entry => "ENTRY",
            Keyword::Index => "INDEX",
            Keyword::Size => "SIZE",
            Keyword::Abs => "ABS",
            Keyword::Sqrt => "SQRT",
            Keyword::Mod => "MOD",
            Keyword::Length => "LENGTH",
            Keyword::Locate => "LOCATE",
            Keyword::Concat => "CONCAT",
            Keyword::Substring => "SUBSTRING",
            Keyword::Trim => "TRIM",
            Keyword::Leading => "LEADING",
            Keyword::Trailing => "TRAILING",
            Keyword::Both => "BOTH",
            Keyword::Lower => "LOWER",
            Keyword::Upper => "UPPER",
            Keyword::Avg => "AVG",
            Keyword::Sum => "SUM",
            Keyword::Min => "MIN",
            Keyword::Max => "MAX",
            Keyword::Count => "COUNT",
            Keyword::CurrentDate => "CURRENT_DATE",
            Keyword::CurrentTime => "CURRENT_TIME",
            Keyword::CurrentTimestamp => "CURRENT_TIMESTAMP",
            Keyword::Function => "FUNCTION",
        }
    }

    /// Keywords that only act as keywords when followed by `(`.
    ///
    /// Outside of that position they are read as ordinary identifiers, so an
    /// entity may declare a field called `size` or `type`.
    pub fn is_function_name(self) -> bool {
        matches!(
            self,
            Keyword::Type
                | Keyword::Treat
                | Keyword::Key
                | Keyword::Value
                | Keyword::Entry
                | Keyword::Index
                | Keyword::Size
                | Keyword::Abs
                | Keyword::Sqrt
                | Keyword::Mod
                | Keyword::Length
                | Keyword::Locate
                | Keyword::Concat
                | Keyword::Substring
                | Keyword::Trim
                | Keyword::Lower
                | Keyword::Upper
                | Keyword::Avg
                | Keyword::Sum
                | Keyword::Min
                | Keyword::Max
                | Keyword::Count
                | Keyword::Coalesce
                | Keyword::Nullif
                | Keyword::Function
                | Keyword::Object
        )
    }

    /// Returns `true` if the word can never be an identification variable.
    pub fn is_reserved(self) -> bool {
        !matches!(
            self,
            Keyword::First | Keyword::Last | Keyword::Nulls | Keyword::Leading
                | Keyword::Trailing
                | Keyword::Both
        ) && !self.is_function_name()
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a lexical token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(SmolStr),

    // Literals
    IntegerLiteral(SmolStr),
    DecimalLiteral(SmolStr),
    /// Unquoted string value with `''` collapsed to `'`.
    StringLiteral(SmolStr),

    // Parameters, stored without the `?` / `:` prefix
    PositionalParameter(SmolStr),
    NamedParameter(SmolStr),

    // Punctuation and operators
    LParen,
    RParen,
    Comma,
    Dot,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,

    Eof,
}

impl TokenKind {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == keyword)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            TokenKind::Keyword(k) => Some(*k),
            _ => None,
        }
    }

    /// Returns `true` for the comparison operators `= <> < <= > >=`.
    pub fn is_comparison_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::LtEq
                | TokenKind::Gt
                | TokenKind::GtEq
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::IntegerLiteral(_)
                | TokenKind::DecimalLiteral(_)
                | TokenKind::StringLiteral(_)
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "{k}"),
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::IntegerLiteral(v) | TokenKind::DecimalLiteral(v) => write!(f, "{v}"),
            TokenKind::StringLiteral(v) => write!(f, "'{v}'"),
            TokenKind::PositionalParameter(v) => write!(f, "?{v}"),
            TokenKind::NamedParameter(v) => write!(f, ":{v}"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::NotEq => write!(f, "'<>'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::LtEq => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::GtEq => write!(f, "'>='"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Eof => write!(f, "end of query"),
        }
    }
}

/// A token with its location in the query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns the exact source text of this token.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.span.clone()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_keywords_are_not_reserved() {
        assert!(Keyword::Size.is_function_name());
        assert!(!Keyword::Size.is_reserved());
        assert!(!Keyword::First.is_reserved());
        assert!(Keyword::Select.is_reserved());
        assert!(Keyword::Member.is_reserved());
    }

    #[test]
    fn token_kind_helpers() {
        let kind = TokenKind::Keyword(Keyword::Where);
        assert!(kind.is_keyword(Keyword::Where));
        assert_eq!(kind.keyword(), Some(Keyword::Where));
        assert!(TokenKind::LtEq.is_comparison_operator());
        assert!(!TokenKind::Plus.is_comparison_operator());
        assert!(TokenKind::StringLiteral("x".into()).is_literal());
    }

    #[test]
    fn display_forms() {
        assert_eq!(TokenKind::Keyword(Keyword::CurrentDate).to_string(), "CURRENT_DATE");
        assert_eq!(TokenKind::NamedParameter("id".into()).to_string(), ":id");
        assert_eq!(TokenKind::Eof.to_string(), "end of query");
    }

    #[test]
    fn token_slice() {
        let token = Token::new(TokenKind::Keyword(Keyword::Select), 0..6);
        assert_eq!(token.slice("SELECT e"), "SELECT");
        assert_eq!(Token::new(TokenKind::Eof, 20..20).slice("x"), "");
    }
}
