//! SQL text generation.
//!
//! Rendering only reads parameter indices; `indices` assigns them
//! beforehand, in the same left-to-right order the placeholders appear.

mod indices;
mod render;

pub(crate) use indices::AssignIndices;

/// Trait for converting AST nodes and queries to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

/// Words that must be quoted when used as identifiers.
pub const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "check", "collate", "column",
    "constraint", "create", "cross", "default", "delete", "desc", "distinct", "drop", "else",
    "end", "except", "exists", "foreign", "from", "full", "group", "having", "in", "index",
    "inner", "insert", "intersect", "into", "is", "join", "key", "left", "like", "limit", "natural",
    "not", "null", "nulls", "offset", "on", "or", "order", "primary", "references", "right",
    "select", "set", "table", "then", "union", "unique", "update", "using", "values", "when",
    "where",
];

/// Quote an identifier if it is a reserved word or contains special chars.
///
/// The name is treated as one part: a dot is quoted, not split on.
pub fn escape_identifier(name: &str) -> String {
    let lower = name.to_lowercase();
    let needs_escaping = name.is_empty()
        || RESERVED_WORDS.contains(&lower.as_str())
        || name.chars().any(|c| !c.is_alphanumeric() && c != '_')
        || name.chars().next().map(|c| c.is_numeric()).unwrap_or(false);

    if needs_escaping {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("users"), "users");
        assert_eq!(escape_identifier("order"), "\"order\"");
        assert_eq!(escape_identifier("Order"), "\"Order\"");
        assert_eq!(escape_identifier("first name"), "\"first name\"");
        assert_eq!(escape_identifier("1col"), "\"1col\"");
        assert_eq!(escape_identifier("t.group"), "\"t.group\"");
        assert_eq!(escape_identifier(""), "\"\"");
        assert_eq!(escape_identifier("_private2"), "_private2");
        assert_eq!(escape_identifier("a\"b"), "\"a\"\"b\"");
    }
}
