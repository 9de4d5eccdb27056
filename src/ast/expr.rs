//! Expression tree nodes.
//!
//! Every node can report the columns, and through them the tables, it
//! touches. Queries use that to reject expressions that reach outside their
//! relation before any SQL is generated.

use std::collections::BTreeSet;
use std::ops::{Add, BitAnd, BitOr};

use rusqlite::Statement;

use crate::ast::column::{ColumnRef, TableId, first_out_of_scope};
use crate::ast::operators::{AggregateFn, ComparisonOp, LogicalOp, Nulls, Order};
use crate::ast::param::Param;
use crate::bind::BindParameters;
use crate::error::TqlResult;

/// Aggregate function applied to a column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub func: AggregateFn,
    pub column: ColumnRef,
    pub distinct: bool,
}

/// Something that can appear in a result column list or an ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultExpr {
    Column(ColumnRef),
    Aggregate(AggregateExpr),
}

impl ResultExpr {
    pub fn column(&self) -> &ColumnRef {
        match self {
            ResultExpr::Column(column) => column,
            ResultExpr::Aggregate(aggregate) => &aggregate.column,
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug)]
pub enum CompareValue {
    Param(Param),
    /// The NULL literal; consumes no parameter index.
    Null,
}

/// A boolean predicate.
#[derive(Debug)]
pub enum Filter {
    /// `expr op ?N`, or `?N op expr` when `value_first` is set.
    Comparison {
        op: ComparisonOp,
        expr: ResultExpr,
        value: CompareValue,
        value_first: bool,
    },
    /// `left op right` between two columns.
    Columns {
        op: ComparisonOp,
        left: ColumnRef,
        right: ColumnRef,
    },
    Like {
        column: ColumnRef,
        pattern: Param,
    },
    Logical {
        op: LogicalOp,
        left: Box<Filter>,
        right: Box<Filter>,
    },
}

impl Filter {
    pub fn and(self, other: Filter) -> Filter {
        Filter::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Filter) -> Filter {
        Filter::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Every column referenced, left to right.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Filter::Comparison { expr, .. } => out.push(expr.column()),
            Filter::Columns { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Filter::Like { column, .. } => out.push(column),
            Filter::Logical { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
        }
    }

    pub fn tables(&self) -> BTreeSet<TableId> {
        self.columns().into_iter().map(|c| c.table).collect()
    }

    /// True if every table this filter references is in `tables`.
    pub fn contains_tables(&self, tables: &[TableId]) -> bool {
        first_out_of_scope(tables, self.columns()).is_none()
    }

    /// Bindable leaves in placeholder order.
    pub fn params(&self) -> Vec<&Param> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params<'a>(&'a self, out: &mut Vec<&'a Param>) {
        match self {
            Filter::Comparison {
                value: CompareValue::Param(param),
                ..
            } => out.push(param),
            Filter::Like { pattern, .. } => out.push(pattern),
            Filter::Logical { left, right, .. } => {
                left.collect_params(out);
                right.collect_params(out);
            }
            _ => {}
        }
    }

    pub(crate) fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut out = Vec::new();
        self.collect_params_mut(&mut out);
        out
    }

    fn collect_params_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Param>) {
        match self {
            Filter::Comparison {
                value: CompareValue::Param(param),
                ..
            } => out.push(param),
            Filter::Like { pattern, .. } => out.push(pattern),
            Filter::Logical { left, right, .. } => {
                left.collect_params_mut(out);
                right.collect_params_mut(out);
            }
            _ => {}
        }
    }

    pub(crate) fn bind(&self, stmt: &mut Statement<'_>, which: BindParameters) -> TqlResult<()> {
        for param in self.params() {
            param.bind(stmt, which)?;
        }
        Ok(())
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(rhs)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(rhs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub expr: ResultExpr,
    pub order: Order,
    pub nulls: Nulls,
}

/// One or more ordering terms, applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub(crate) terms: Vec<OrderTerm>,
}

impl OrderBy {
    pub(crate) fn single(expr: ResultExpr, order: Order) -> Self {
        Self {
            terms: vec![OrderTerm {
                expr,
                order,
                nulls: Nulls::None,
            }],
        }
    }

    pub fn terms(&self) -> &[OrderTerm] {
        &self.terms
    }

    /// Append the terms of `other`.
    pub fn then(mut self, other: OrderBy) -> Self {
        self.terms.extend(other.terms);
        self
    }

    /// Put NULLs first for the last term.
    pub fn nulls_first(self) -> Self {
        self.with_nulls(Nulls::First)
    }

    /// Put NULLs last for the last term.
    pub fn nulls_last(self) -> Self {
        self.with_nulls(Nulls::Last)
    }

    fn with_nulls(mut self, nulls: Nulls) -> Self {
        if let Some(term) = self.terms.last_mut() {
            term.nulls = nulls;
        }
        self
    }

    pub fn columns(&self) -> Vec<&ColumnRef> {
        self.terms.iter().map(|t| t.expr.column()).collect()
    }
}

impl Add for OrderBy {
    type Output = OrderBy;

    fn add(self, rhs: OrderBy) -> OrderBy {
        self.then(rhs)
    }
}
