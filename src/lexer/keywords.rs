//! Keyword recognition for JPQL.
//!
//! JPQL keywords are case-insensitive.

use super::token::Keyword;

/// Looks up a keyword by name (case-insensitive).
pub fn lookup_keyword(name: &str) -> Option<Keyword> {
    match name.to_ascii_uppercase().as_str() {
        // Statements and clauses
        "SELECT" => Some(Keyword::Select),
        "FROM" => Some(Keyword::From),
        "WHERE" => Some(Keyword::Where),
        "GROUP" => Some(Keyword::Group),
        "BY" => Some(Keyword::By),
        "HAVING" => Some(Keyword::Having),
        "ORDER" => Some(Keyword::Order),
        "ASC" => Some(Keyword::Asc),
        "DESC" => Some(Keyword::Desc),
        "NULLS" => Some(Keyword::Nulls),
        "FIRST" => Some(Keyword::First),
        "LAST" => Some(Keyword::Last),
        "UPDATE" => Some(Keyword::Update),
        "SET" => Some(Keyword::Set),
        "DELETE" => Some(Keyword::Delete),
        "DISTINCT" => Some(Keyword::Distinct),
        "AS" => Some(Keyword::As),
        "JOIN" => Some(Keyword::Join),
        "LEFT" => Some(Keyword::Left),
        "OUTER" => Some(Keyword::Outer),
        "INNER" => Some(Keyword::Inner),
        "FETCH" => Some(Keyword::Fetch),
        "ON" => Some(Keyword::On),
        "IN" => Some(Keyword::In),

        // Conditions
        "AND" => Some(Keyword::And),
        "OR" => Some(Keyword::Or),
        "NOT" => Some(Keyword::Not),
        "BETWEEN" => Some(Keyword::Between),
        "LIKE" => Some(Keyword::Like),
        "ESCAPE" => Some(Keyword::Escape),
        "IS" => Some(Keyword::Is),
        "NULL" => Some(Keyword::Null),
        "EMPTY" => Some(Keyword::Empty),
        "MEMBER" => Some(Keyword::Member),
        "OF" => Some(Keyword::Of),
        "EXISTS" => Some(Keyword::Exists),
        "ALL" => Some(Keyword::All),
        "ANY" => Some(Keyword::Any),
        "SOME" => Some(Keyword::Some),
        "TRUE" => Some(Keyword::True),
        "FALSE" => Some(Keyword::False),

        // Select expressions
        "OBJECT" => Some(Keyword::Object),
        "NEW" => Some(Keyword::New),
        "CASE" => Some(Keyword::Case),
        "WHEN" => Some(Keyword::When),
        "THEN" => Some(Keyword::Then),
        "ELSE" => Some(Keyword::Else),
        "END" => Some(Keyword::End),
        "COALESCE" => Some(Keyword::Coalesce),
        "NULLIF" => Some(Keyword::Nullif),

        // Functions
        "TYPE" => Some(Keyword::Type),
        "TREAT" => Some(Keyword::Treat),
        "KEY" => Some(Keyword::Key),
        "VALUE" => Some(Keyword::Value),
        "ENTRY" => Some(Keyword::Entry),
        "INDEX" => Some(Keyword::Index),
        "SIZE" => Some(Keyword::Size),
        "ABS" => Some(Keyword::Abs),
        "SQRT" => Some(Keyword::Sqrt),
        "MOD" => Some(Keyword::Mod),
        "LENGTH" => Some(Keyword::Length),
        "LOCATE" => Some(Keyword::Locate),
        "CONCAT" => Some(Keyword::Concat),
        "SUBSTRING" => Some(Keyword::Substring),
        "TRIM" => Some(Keyword::Trim),
        "LEADING" => Some(Keyword::Leading),
        "TRAILING" => Some(Keyword::Trailing),
        "BOTH" => Some(Keyword::Both),
        "LOWER" => Some(Keyword::Lower),
        "UPPER" => Some(Keyword::Upper),
        "AVG" => Some(Keyword::Avg),
        "SUM" => Some(Keyword::Sum),
        "MIN" => Some(Keyword::Min),
        "MAX" => Some(Keyword::Max),
        "COUNT" => Some(Keyword::Count),
        "CURRENT_DATE" => Some(Keyword::CurrentDate),
        "CURRENT_TIME" => Some(Keyword::CurrentTime),
        "CURRENT_TIMESTAMP" => Some(Keyword::CurrentTimestamp),
        "FUNCTION" => Some(Keyword::Function),

        _ => None,
    }
}

/// Checks if a string is a keyword (case-insensitive).
pub fn is_keyword(name: &str) -> bool {
    lookup_keyword(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup_keyword("SELECT"), Some(Keyword::Select));
        assert_eq!(lookup_keyword("select"), Some(Keyword::Select));
        assert_eq!(lookup_keyword("SeLeCt"), Some(Keyword::Select));
    }

    #[test]
    fn lookup_datetime_keywords() {
        assert_eq!(lookup_keyword("current_date"), Some(Keyword::CurrentDate));
        assert_eq!(lookup_keyword("CURRENT_TIMESTAMP"), Some(Keyword::CurrentTimestamp));
    }

    #[test]
    fn lookup_non_keyword() {
        assert_eq!(lookup_keyword("Employee"), None);
        assert_eq!(lookup_keyword("salary"), None);
        assert_eq!(lookup_keyword("_x"), None);
    }

    #[test]
    fn every_keyword_round_trips() {
        for name in ["MEMBER", "NULLIF", "TRAILING", "ENTRY", "FUNCTION", "SOME"] {
            let keyword = lookup_keyword(name);
            assert_eq!(keyword.map(|k| k.as_str()), Some(name));
        }
        assert!(is_keyword("between"));
        assert!(!is_keyword("department"));
    }
}
