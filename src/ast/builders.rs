//! Fluent constructors for expression nodes.
//!
//! ```ignore
//! let filter = col1.ge(10) & col3.like("a%") | col2.is_null();
//! let order = col1.desc().nulls_last() + col2.asc();
//! ```

use std::marker::PhantomData;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::ast::column::{Column, ColumnRef};
use crate::ast::expr::{AggregateExpr, CompareValue, Filter, OrderBy, ResultExpr};
use crate::ast::operators::{AggregateFn, ComparisonOp, Order};
use crate::ast::param::Param;
use crate::bind::{Blob, Dynamic, Null, Text};
use crate::row::{FromColumn, FromRow, SqlValue};

/// A value that may be compared against an expression of type `V`.
///
/// Fixed values are captured when the filter is built. `Dynamic` slots are
/// sampled each time dynamic parameters are bound. `Null` renders the SQL
/// NULL literal.
pub trait Operand<V> {
    fn into_compare(self) -> CompareValue;
}

impl<V> Operand<V> for Null {
    fn into_compare(self) -> CompareValue {
        CompareValue::Null
    }
}

macro_rules! operands {
    ($col:ty: $($val:ty),+) => {
        $(
            impl Operand<$col> for $val {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::fixed(self))
                }
            }

            impl Operand<Option<$col>> for $val {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::fixed(self))
                }
            }

            impl Operand<Option<$col>> for Option<$val> {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::fixed(self))
                }
            }

            impl Operand<$col> for Dynamic<$val> {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::dynamic(&self))
                }
            }

            impl Operand<$col> for &Dynamic<$val> {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::dynamic(self))
                }
            }

            impl Operand<Option<$col>> for Dynamic<$val> {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::dynamic(&self))
                }
            }

            impl Operand<Option<$col>> for &Dynamic<$val> {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::dynamic(self))
                }
            }
        )+
    };
}

operands!(i8: i8);
operands!(i16: i8, i16, u8);
operands!(i32: i8, i16, i32, u8, u16);
operands!(i64: i8, i16, i32, i64, u8, u16, u32);
operands!(isize: isize);
operands!(u8: u8);
operands!(u16: u8, u16);
operands!(u32: u8, u16, u32);
operands!(u64: u8, u16, u32, u64);
operands!(usize: usize);
operands!(f32: f32);
operands!(f64: f32, f64);
operands!(bool: bool);
operands!(String: String);
operands!(Vec<u8>: Vec<u8>);
operands!(NaiveDate: NaiveDate);
operands!(NaiveDateTime: NaiveDateTime);
operands!(DateTime<Utc>: DateTime<Utc>);

macro_rules! borrowed_operands {
    ($col:ty: $($val:ty => $owned:expr),+) => {
        $(
            impl Operand<$col> for $val {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::fixed($owned(self)))
                }
            }

            impl Operand<Option<$col>> for $val {
                fn into_compare(self) -> CompareValue {
                    CompareValue::Param(Param::fixed($owned(self)))
                }
            }
        )+
    };
}

borrowed_operands!(String: &str => str::to_owned, &String => String::clone);
borrowed_operands!(Vec<u8>: &[u8] => <[u8]>::to_vec);

impl Operand<String> for Text<'static> {
    fn into_compare(self) -> CompareValue {
        CompareValue::Param(Param::fixed(self))
    }
}

impl Operand<Vec<u8>> for Blob<'static> {
    fn into_compare(self) -> CompareValue {
        CompareValue::Param(Param::fixed(self))
    }
}

impl Operand<SqlValue> for SqlValue {
    fn into_compare(self) -> CompareValue {
        match self {
            SqlValue::Null => CompareValue::Null,
            value => CompareValue::Param(Param::fixed(value)),
        }
    }
}

impl Operand<SqlValue> for Dynamic<SqlValue> {
    fn into_compare(self) -> CompareValue {
        CompareValue::Param(Param::dynamic(&self))
    }
}

/// An expression with a value of type `V`: a column or an aggregate.
pub trait Expr<V> {
    fn expr(&self) -> ResultExpr;

    fn compare(&self, op: ComparisonOp, value: impl Operand<V>) -> Filter {
        Filter::Comparison {
            op,
            expr: self.expr(),
            value: value.into_compare(),
            value_first: false,
        }
    }

    /// Like `compare`, rendered with the value on the left: `?N op expr`.
    fn compare_rev(&self, value: impl Operand<V>, op: ComparisonOp) -> Filter {
        Filter::Comparison {
            op,
            expr: self.expr(),
            value: value.into_compare(),
            value_first: true,
        }
    }

    fn eq(&self, value: impl Operand<V>) -> Filter {
        self.compare(ComparisonOp::Eq, value)
    }

    fn ne(&self, value: impl Operand<V>) -> Filter {
        self.compare(ComparisonOp::Ne, value)
    }

    fn lt(&self, value: impl Operand<V>) -> Filter {
        self.compare(ComparisonOp::Lt, value)
    }

    fn gt(&self, value: impl Operand<V>) -> Filter {
        self.compare(ComparisonOp::Gt, value)
    }

    fn le(&self, value: impl Operand<V>) -> Filter {
        self.compare(ComparisonOp::Le, value)
    }

    fn ge(&self, value: impl Operand<V>) -> Filter {
        self.compare(ComparisonOp::Ge, value)
    }

    fn is_null(&self) -> Filter {
        self.compare(ComparisonOp::Eq, Null)
    }

    fn is_not_null(&self) -> Filter {
        self.compare(ComparisonOp::Ne, Null)
    }

    fn asc(&self) -> OrderBy {
        OrderBy::single(self.expr(), Order::Asc)
    }

    fn desc(&self) -> OrderBy {
        OrderBy::single(self.expr(), Order::Desc)
    }
}

impl<V> Expr<V> for Column<V> {
    fn expr(&self) -> ResultExpr {
        ResultExpr::Column(self.column.clone())
    }
}

impl<V> Column<V> {
    /// Compare against another column of the same type.
    pub fn compare_col(&self, op: ComparisonOp, other: &Column<V>) -> Filter {
        Filter::Columns {
            op,
            left: self.column.clone(),
            right: other.column.clone(),
        }
    }

    pub fn eq_col(&self, other: &Column<V>) -> Filter {
        self.compare_col(ComparisonOp::Eq, other)
    }
}

/// Value types that support `LIKE`.
pub trait Likeable {}

impl Likeable for String {}
impl Likeable for Option<String> {}
impl Likeable for SqlValue {}

/// A `LIKE` pattern, fixed or dynamic.
pub trait LikePattern {
    fn into_param(self) -> Param;
}

impl LikePattern for &str {
    fn into_param(self) -> Param {
        Param::fixed(self.to_owned())
    }
}

impl LikePattern for String {
    fn into_param(self) -> Param {
        Param::fixed(self)
    }
}

impl LikePattern for Text<'static> {
    fn into_param(self) -> Param {
        Param::fixed(self)
    }
}

impl LikePattern for Dynamic<String> {
    fn into_param(self) -> Param {
        Param::dynamic(&self)
    }
}

impl LikePattern for &Dynamic<String> {
    fn into_param(self) -> Param {
        Param::dynamic(self)
    }
}

impl<V: Likeable> Column<V> {
    pub fn like(&self, pattern: impl LikePattern) -> Filter {
        Filter::Like {
            column: self.column.clone(),
            pattern: pattern.into_param(),
        }
    }
}

/// An aggregate over a column, with result type `V`.
pub struct Aggregate<V> {
    inner: AggregateExpr,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Aggregate<V> {
    fn new<C>(func: AggregateFn, column: &Column<C>) -> Self {
        Self {
            inner: AggregateExpr {
                func,
                column: column.column.clone(),
                distinct: false,
            },
            _marker: PhantomData,
        }
    }

    /// Aggregate over distinct values only.
    pub fn distinct(mut self) -> Self {
        self.inner.distinct = true;
        self
    }
}

impl<V> Clone for Aggregate<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V> Expr<V> for Aggregate<V> {
    fn expr(&self) -> ResultExpr {
        ResultExpr::Aggregate(self.inner.clone())
    }
}

pub fn count<C>(column: &Column<C>) -> Aggregate<i64> {
    Aggregate::new(AggregateFn::Count, column)
}

pub fn sum<C>(column: &Column<C>) -> Aggregate<C> {
    Aggregate::new(AggregateFn::Sum, column)
}

pub fn min<C>(column: &Column<C>) -> Aggregate<C> {
    Aggregate::new(AggregateFn::Min, column)
}

pub fn max<C>(column: &Column<C>) -> Aggregate<C> {
    Aggregate::new(AggregateFn::Max, column)
}

pub fn avg<C>(column: &Column<C>) -> Aggregate<f64> {
    Aggregate::new(AggregateFn::Avg, column)
}

pub fn total<C>(column: &Column<C>) -> Aggregate<f64> {
    Aggregate::new(AggregateFn::Total, column)
}

/// A list of plain columns: GROUP BY, USING, INSERT and UPDATE targets.
pub trait ColumnList {
    fn column_refs(&self) -> Vec<ColumnRef>;
}

impl<V> ColumnList for Column<V> {
    fn column_refs(&self) -> Vec<ColumnRef> {
        vec![self.column.clone()]
    }
}

impl<V> ColumnList for [Column<V>] {
    fn column_refs(&self) -> Vec<ColumnRef> {
        self.iter().map(|c| c.column.clone()).collect()
    }
}

impl<V> ColumnList for Vec<Column<V>> {
    fn column_refs(&self) -> Vec<ColumnRef> {
        self.as_slice().column_refs()
    }
}

impl<T: ColumnList + ?Sized> ColumnList for &T {
    fn column_refs(&self) -> Vec<ColumnRef> {
        (**self).column_refs()
    }
}

macro_rules! tuple_column_list {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: ColumnList),+> ColumnList for ($($name,)+) {
            fn column_refs(&self) -> Vec<ColumnRef> {
                let mut out = Vec::new();
                $(out.extend(self.$idx.column_refs());)+
                out
            }
        }
    };
}

tuple_column_list!(A 0);
tuple_column_list!(A 0, B 1);
tuple_column_list!(A 0, B 1, C 2);
tuple_column_list!(A 0, B 1, C 2, D 3);
tuple_column_list!(A 0, B 1, C 2, D 3, E 4);
tuple_column_list!(A 0, B 1, C 2, D 3, E 4, F 5);
tuple_column_list!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
tuple_column_list!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

/// One result column and the type it decodes to.
pub trait ResultColumn {
    type Value: FromColumn;

    fn result_expr(&self) -> ResultExpr;
}

impl<V: FromColumn> ResultColumn for Column<V> {
    type Value = V;

    fn result_expr(&self) -> ResultExpr {
        self.expr()
    }
}

impl<V: FromColumn> ResultColumn for Aggregate<V> {
    type Value = V;

    fn result_expr(&self) -> ResultExpr {
        self.expr()
    }
}

impl<T: ResultColumn + ?Sized> ResultColumn for &T {
    type Value = T::Value;

    fn result_expr(&self) -> ResultExpr {
        (**self).result_expr()
    }
}

/// The column list of a SELECT and the row type it produces.
pub trait ResultColumns {
    type Row: FromRow;

    fn result_exprs(&self) -> Vec<ResultExpr>;
}

impl ResultColumns for Vec<Column<SqlValue>> {
    type Row = Vec<SqlValue>;

    fn result_exprs(&self) -> Vec<ResultExpr> {
        self.iter().map(|c| c.expr()).collect()
    }
}

macro_rules! tuple_result_columns {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: ResultColumn),+> ResultColumns for ($($name,)+) {
            type Row = ($($name::Value,)+);

            fn result_exprs(&self) -> Vec<ResultExpr> {
                vec![$(self.$idx.result_expr()),+]
            }
        }
    };
}

tuple_result_columns!(A 0);
tuple_result_columns!(A 0, B 1);
tuple_result_columns!(A 0, B 1, C 2);
tuple_result_columns!(A 0, B 1, C 2, D 3);
tuple_result_columns!(A 0, B 1, C 2, D 3, E 4);
tuple_result_columns!(A 0, B 1, C 2, D 3, E 4, F 5);
tuple_result_columns!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
tuple_result_columns!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
tuple_result_columns!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8);
tuple_result_columns!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9);
