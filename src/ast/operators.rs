//! Operator and keyword enums.

use std::fmt;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ComparisonOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
            ComparisonOp::Le => "<=",
            ComparisonOp::Ge => ">=",
        }
    }

    /// Form used against the NULL literal, if there is one.
    pub(crate) fn null_form(self) -> Option<&'static str> {
        match self {
            ComparisonOp::Eq => Some("IS NULL"),
            ComparisonOp::Ne => Some("IS NOT NULL"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Placement of NULLs in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nulls {
    #[default]
    None,
    First,
    Last,
}

impl Nulls {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Nulls::None => None,
            Nulls::First => Some("NULLS FIRST"),
            Nulls::Last => Some("NULLS LAST"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Cross,
    Left,
    Right,
    Full,
    Inner,
    NaturalLeft,
    NaturalRight,
    NaturalFull,
    NaturalInner,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::NaturalLeft => "NATURAL LEFT JOIN",
            JoinKind::NaturalRight => "NATURAL RIGHT JOIN",
            JoinKind::NaturalFull => "NATURAL FULL JOIN",
            JoinKind::NaturalInner => "NATURAL INNER JOIN",
        }
    }

    /// Natural joins take no ON or USING constraint.
    pub fn is_natural(self) -> bool {
        matches!(
            self,
            JoinKind::NaturalLeft
                | JoinKind::NaturalRight
                | JoinKind::NaturalFull
                | JoinKind::NaturalInner
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl UnionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnionOp::Union => "UNION",
            UnionOp::UnionAll => "UNION ALL",
            UnionOp::Intersect => "INTERSECT",
            UnionOp::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    Total,
}

impl AggregateFn {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
            AggregateFn::Avg => "AVG",
            AggregateFn::Total => "TOTAL",
        }
    }
}

macro_rules! display_as_str {
    ($($t:ty),+) => {
        $(
            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

display_as_str!(ComparisonOp, LogicalOp, Order, JoinKind, UnionOp, AggregateFn);
