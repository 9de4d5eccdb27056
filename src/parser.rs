//! Text filters and orderings, parsed with nom.
//!
//! Used by the command-line tool to turn `--where` and `--order` arguments
//! into typed expressions against a loaded table. Column names are resolved
//! after parsing, so an unknown column is reported as such rather than as a
//! syntax error.
//!
//! # Syntax
//!
//! ```text
//! filter  := or
//! or      := and ("or" and)*
//! and     := term ("and" term)*
//! term    := "(" or ")" | column "is" ["not"] "null"
//!          | column "like" string | column op literal
//! op      := = | == | != | <> | < | > | <= | >=
//! literal := null | true | false | number | 'string'
//!
//! order   := column [asc|desc] [nulls first|last] ("," ...)*
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while1},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{map, map_res, not, opt, recognize, value},
    multi::{fold_many0, many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::ast::{ComparisonOp, Expr, Filter, Nulls, Order, OrderBy};
use crate::error::{TqlError, TqlResult};
use crate::row::SqlValue;
use crate::schema::Table;

/// Parse a filter expression and resolve its columns against `table`.
///
/// ```rust,ignore
/// let filter = parse_filter(&users, "age >= 18 and name like 'A%'")?;
/// ```
pub fn parse_filter(table: &Table, input: &str) -> TqlResult<Filter> {
    let raw = parse_complete(input, or_expr)?;
    resolve_filter(table, raw)
}

/// Parse a comma separated ordering and resolve its columns against `table`.
pub fn parse_order(table: &Table, input: &str) -> TqlResult<OrderBy> {
    let terms = parse_complete(
        input,
        separated_list1(delimited(multispace0, char(','), multispace0), order_term),
    )?;

    let mut order: Option<OrderBy> = None;
    for term in terms {
        let column = table.column::<SqlValue>(term.column)?;
        let mut next = match term.order {
            Order::Asc => column.asc(),
            Order::Desc => column.desc(),
        };
        next = match term.nulls {
            Nulls::First => next.nulls_first(),
            Nulls::Last => next.nulls_last(),
            Nulls::None => next,
        };
        order = Some(match order {
            Some(order) => order.then(next),
            None => next,
        });
    }
    order.ok_or_else(|| TqlError::parse(0, "Empty ordering"))
}

fn parse_complete<'a, T>(
    input: &'a str,
    parser: impl FnMut(&'a str) -> IResult<&'a str, T>,
) -> TqlResult<T> {
    let mut parser = delimited(multispace0, parser, multispace0);
    match parser(input) {
        Ok(("", parsed)) => Ok(parsed),
        Ok((remaining, _)) => Err(TqlError::parse(
            input.len() - remaining.len(),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let position = input.len() - e.input.len();
            let near = if e.input.is_empty() {
                "end of input".to_string()
            } else {
                format!("'{}'", e.input)
            };
            Err(TqlError::parse(position, format!("Unexpected {}", near)))
        }
        Err(nom::Err::Incomplete(_)) => {
            Err(TqlError::parse(input.len(), "Unexpected end of input"))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RawFilter<'a> {
    Compare {
        column: &'a str,
        op: ComparisonOp,
        value: SqlValue,
    },
    Like {
        column: &'a str,
        pattern: String,
    },
    IsNull {
        column: &'a str,
        negated: bool,
    },
    And(Box<RawFilter<'a>>, Box<RawFilter<'a>>),
    Or(Box<RawFilter<'a>>, Box<RawFilter<'a>>),
}

fn resolve_filter(table: &Table, raw: RawFilter<'_>) -> TqlResult<Filter> {
    Ok(match raw {
        RawFilter::Compare { column, op, value } => {
            table.column::<SqlValue>(column)?.compare(op, value)
        }
        RawFilter::Like { column, pattern } => table.column::<SqlValue>(column)?.like(pattern),
        RawFilter::IsNull { column, negated } => {
            let column = table.column::<SqlValue>(column)?;
            if negated {
                column.is_not_null()
            } else {
                column.is_null()
            }
        }
        RawFilter::And(left, right) => {
            resolve_filter(table, *left)?.and(resolve_filter(table, *right)?)
        }
        RawFilter::Or(left, right) => {
            resolve_filter(table, *left)?.or(resolve_filter(table, *right)?)
        }
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A case-insensitive keyword not followed by more identifier characters.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_ident_char)))
}

/// Bare or double-quoted column name.
fn identifier(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), is_not("\""), char('"')),
        take_while1(is_ident_char),
    ))(input)
}

fn or_expr(input: &str) -> IResult<&str, RawFilter<'_>> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("or"), multispace0),
        and_expr,
    ))(input)?;
    let filter = rest
        .into_iter()
        .fold(first, |acc, next| RawFilter::Or(Box::new(acc), Box::new(next)));
    Ok((input, filter))
}

fn and_expr(input: &str) -> IResult<&str, RawFilter<'_>> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("and"), multispace0),
        term,
    ))(input)?;
    let filter = rest
        .into_iter()
        .fold(first, |acc, next| RawFilter::And(Box::new(acc), Box::new(next)));
    Ok((input, filter))
}

fn term(input: &str) -> IResult<&str, RawFilter<'_>> {
    alt((
        delimited(
            pair(char('('), multispace0),
            or_expr,
            pair(multispace0, char(')')),
        ),
        predicate,
    ))(input)
}

fn predicate(input: &str) -> IResult<&str, RawFilter<'_>> {
    let (input, column) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    alt((
        map(
            tuple((
                keyword("is"),
                opt(preceded(multispace1, keyword("not"))),
                preceded(multispace1, keyword("null")),
            )),
            move |(_, negation, _)| RawFilter::IsNull {
                column,
                negated: negation.is_some(),
            },
        ),
        map(
            preceded(pair(keyword("like"), multispace0), quoted_string),
            move |pattern| RawFilter::Like { column, pattern },
        ),
        map(
            pair(terminated(comparison_op, multispace0), literal),
            move |(op, value)| RawFilter::Compare { column, op, value },
        ),
    ))(input)
}

fn comparison_op(input: &str) -> IResult<&str, ComparisonOp> {
    alt((
        value(ComparisonOp::Ge, tag(">=")),
        value(ComparisonOp::Le, tag("<=")),
        value(ComparisonOp::Ne, tag("!=")),
        value(ComparisonOp::Ne, tag("<>")),
        value(ComparisonOp::Eq, tag("==")),
        value(ComparisonOp::Eq, tag("=")),
        value(ComparisonOp::Gt, tag(">")),
        value(ComparisonOp::Lt, tag("<")),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, SqlValue> {
    alt((
        value(SqlValue::Null, keyword("null")),
        value(SqlValue::Integer(1), keyword("true")),
        value(SqlValue::Integer(0), keyword("false")),
        number,
        map(quoted_string, SqlValue::Text),
    ))(input)
}

fn number(input: &str) -> IResult<&str, SqlValue> {
    alt((
        map_res(
            recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
            |s: &str| s.parse::<f64>().map(SqlValue::Real),
        ),
        map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            s.parse::<i64>().map(SqlValue::Integer)
        }),
    ))(input)
}

/// Single-quoted string; `''` is an escaped quote.
fn quoted_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        fold_many0(
            alt((is_not("'"), value("'", tag("''")))),
            String::new,
            |mut acc, part| {
                acc.push_str(part);
                acc
            },
        ),
        char('\''),
    )(input)
}

struct RawOrder<'a> {
    column: &'a str,
    order: Order,
    nulls: Nulls,
}

fn order_term(input: &str) -> IResult<&str, RawOrder<'_>> {
    let (input, column) = identifier(input)?;
    let (input, order) = opt(preceded(
        multispace1,
        alt((
            value(Order::Asc, keyword("asc")),
            value(Order::Desc, keyword("desc")),
        )),
    ))(input)?;
    let (input, nulls) = opt(preceded(
        tuple((multispace1, keyword("nulls"), multispace1)),
        alt((
            value(Nulls::First, keyword("first")),
            value(Nulls::Last, keyword("last")),
        )),
    ))(input)?;
    Ok((
        input,
        RawOrder {
            column,
            order: order.unwrap_or_default(),
            nulls: nulls.unwrap_or_default(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Database;
    use pretty_assertions::assert_eq;

    fn raw(input: &str) -> RawFilter<'_> {
        parse_complete(input, or_expr).unwrap()
    }

    fn table(db: &Database) -> Table {
        db.execute_batch("CREATE TABLE t (a INTEGER, b TEXT, c REAL)")
            .unwrap();
        db.table("t").unwrap()
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            raw("a >= 10"),
            RawFilter::Compare {
                column: "a",
                op: ComparisonOp::Ge,
                value: SqlValue::Integer(10),
            }
        );
        assert_eq!(
            raw("c<-1.5"),
            RawFilter::Compare {
                column: "c",
                op: ComparisonOp::Lt,
                value: SqlValue::Real(-1.5),
            }
        );
    }

    #[test]
    fn test_literals() {
        let value_of = |input: &str| match raw(input) {
            RawFilter::Compare { value, .. } => value,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(value_of("b = 'it''s'"), SqlValue::Text("it's".to_string()));
        assert_eq!(value_of("a = TRUE"), SqlValue::Integer(1));
        assert_eq!(value_of("a != null"), SqlValue::Null);
    }

    #[test]
    fn test_is_null_and_like() {
        assert_eq!(
            raw("b IS NOT NULL"),
            RawFilter::IsNull {
                column: "b",
                negated: true,
            }
        );
        assert_eq!(
            raw("b like 'x%'"),
            RawFilter::Like {
                column: "b",
                pattern: "x%".to_string(),
            }
        );
    }

    #[test]
    fn test_and_binds_tighter() {
        let db = Database::open_in_memory().unwrap();
        let t = table(&db);
        let filter = parse_filter(&t, "a = 1 or a = 2 and b = 'x'").unwrap();
        let sql = t.select_all().unwrap().filter(filter).unwrap().sql();
        assert_eq!(
            sql,
            "SELECT t.a, t.b, t.c FROM t WHERE (t.a = ?1 OR (t.a = ?2 AND t.b = ?3))"
        );
    }

    #[test]
    fn test_parentheses() {
        let db = Database::open_in_memory().unwrap();
        let t = table(&db);
        let filter = parse_filter(&t, "(a = 1 or a = 2) and b is null").unwrap();
        let sql = t.select_all().unwrap().filter(filter).unwrap().sql();
        assert_eq!(
            sql,
            "SELECT t.a, t.b, t.c FROM t WHERE ((t.a = ?1 OR t.a = ?2) AND t.b IS NULL)"
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        // `order_id` must not be split into `or` + `der_id`.
        assert!(matches!(
            parse_complete("a = 1 order_id = 2", or_expr),
            Err(TqlError::Parse { position: 6, .. })
        ));
    }

    #[test]
    fn test_unknown_column() {
        let db = Database::open_in_memory().unwrap();
        let t = table(&db);
        assert!(matches!(
            parse_filter(&t, "missing = 1"),
            Err(TqlError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_syntax_error_position() {
        let db = Database::open_in_memory().unwrap();
        let t = table(&db);
        let err = parse_filter(&t, "a = 1 and").unwrap_err();
        assert!(matches!(err, TqlError::Parse { position: 6, .. }));
    }

    #[test]
    fn test_order() {
        let db = Database::open_in_memory().unwrap();
        let t = table(&db);
        let order = parse_order(&t, "a desc nulls last, b").unwrap();
        let sql = t.select_all().unwrap().order_by(order).unwrap().sql();
        assert_eq!(
            sql,
            "SELECT t.a, t.b, t.c FROM t ORDER BY t.a DESC NULLS LAST, t.b ASC"
        );
    }
}
