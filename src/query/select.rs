use rusqlite::Row;

use crate::ast::{ColumnList, ColumnRef, Filter, OrderBy, Param, ResultExpr, TableId, UnionOp};
use crate::bind::FIRST_BIND_INDEX;
use crate::compiler;
use crate::error::{TqlError, TqlResult};
use crate::query::{Relation, Slot, check_scope};
use crate::row::FromRow;
use crate::schema::Database;
use crate::statement::{SelectOneStatement, SelectStatement};
use crate::transpiler::{AssignIndices, ToSql};

/// `LIMIT n OFFSET m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub limit: u64,
    pub offset: u64,
}

impl Limit {
    /// The largest limit or offset SQLite accepts.
    pub const MAX: u64 = i64::MAX as u64;

    pub fn new(limit: u64, offset: u64) -> TqlResult<Self> {
        for (clause, value) in [("limit", limit), ("offset", offset)] {
            if value > Self::MAX {
                return Err(TqlError::LimitOutOfRange { clause, value });
            }
        }
        Ok(Self { limit, offset })
    }
}

pub(crate) struct Union<R> {
    pub(crate) op: UnionOp,
    pub(crate) query: Box<SelectQuery<R>>,
}

pub(crate) type Decode<R> = fn(&Row<'_>) -> TqlResult<R>;

pub(crate) fn decode_into<T: FromRow, R: From<T>>(row: &Row<'_>) -> TqlResult<R> {
    T::from_row(row).map(R::from)
}

/// A SELECT producing rows of type `R`.
///
/// ```ignore
/// let mut stmt = table
///     .select((&id, &name))?
///     .filter(id.ge(10))?
///     .order_by(name.asc())?
///     .limit(5)?
///     .compile(&db)?;
/// ```
pub struct SelectQuery<R> {
    pub(crate) relation: Relation,
    pub(crate) columns: Vec<ResultExpr>,
    pub(crate) filter: Slot<Filter>,
    pub(crate) group_by: Slot<Vec<ColumnRef>>,
    pub(crate) having: Slot<Filter>,
    pub(crate) union: Slot<Union<R>>,
    pub(crate) order_by: Slot<OrderBy>,
    pub(crate) limit: Slot<Limit>,
    decode: Decode<R>,
}

impl<R> SelectQuery<R> {
    pub(crate) fn new(
        relation: Relation,
        columns: Vec<ResultExpr>,
        decode: Decode<R>,
    ) -> TqlResult<Self> {
        check_scope("select", &relation.tables(), columns.iter().map(ResultExpr::column))?;
        Ok(Self {
            relation,
            columns,
            filter: Slot::new("where"),
            group_by: Slot::new("group by"),
            having: Slot::new("having"),
            union: Slot::new("union"),
            order_by: Slot::new("order by"),
            limit: Slot::new("limit"),
            decode,
        })
    }

    pub fn tables(&self) -> Vec<TableId> {
        self.relation.tables()
    }

    /// WHERE.
    pub fn filter(mut self, filter: Filter) -> TqlResult<Self> {
        check_scope(self.filter.clause(), &self.tables(), filter.columns())?;
        self.filter.fill(filter)?;
        Ok(self)
    }

    pub fn group_by(mut self, columns: impl ColumnList) -> TqlResult<Self> {
        let columns = columns.column_refs();
        check_scope(self.group_by.clause(), &self.tables(), &columns)?;
        self.group_by.fill(columns)?;
        Ok(self)
    }

    /// HAVING; requires GROUP BY.
    pub fn having(mut self, filter: Filter) -> TqlResult<Self> {
        if !self.group_by.is_filled() {
            return Err(TqlError::HavingWithoutGroupBy);
        }
        check_scope(self.having.clause(), &self.tables(), filter.columns())?;
        self.having.fill(filter)?;
        Ok(self)
    }

    pub fn order_by(mut self, order: OrderBy) -> TqlResult<Self> {
        check_scope(self.order_by.clause(), &self.tables(), order.columns())?;
        self.order_by.fill(order)?;
        Ok(self)
    }

    pub fn limit_offset(mut self, limit: u64, offset: u64) -> TqlResult<Self> {
        self.limit.fill(Limit::new(limit, offset)?)?;
        Ok(self)
    }

    pub fn limit(self, limit: u64) -> TqlResult<Self> {
        self.limit_offset(limit, 0)
    }

    /// Combine with another query of the same row type. The other query
    /// may not be ordered or limited; nest calls to chain more than two.
    pub fn unions(mut self, op: UnionOp, other: SelectQuery<R>) -> TqlResult<Self> {
        if other.order_by.is_filled() || other.limit.is_filled() {
            return Err(TqlError::InvalidUnion(
                "the other query must not have an order by or limit".to_string(),
            ));
        }
        self.union.fill(Union {
            op,
            query: Box::new(other),
        })?;
        Ok(self)
    }

    /// Filters in placeholder order: joins, WHERE, HAVING, then unions.
    pub(crate) fn filters(&self) -> Vec<&Filter> {
        let mut filters = self.relation.filters();
        filters.extend(self.filter.get());
        filters.extend(self.having.get());
        if let Some(union) = self.union.get() {
            filters.extend(union.query.filters());
        }
        filters
    }

    pub(crate) fn filters_mut(&mut self) -> Vec<&mut Filter> {
        let mut filters = self.relation.filters_mut();
        filters.extend(self.filter.get_mut());
        filters.extend(self.having.get_mut());
        if let Some(union) = self.union.get_mut() {
            filters.extend(union.query.filters_mut());
        }
        filters
    }

    fn into_filters(self, out: &mut Vec<Filter>) {
        self.relation.into_filters(out);
        out.extend(self.filter.into_inner());
        out.extend(self.having.into_inner());
        if let Some(union) = self.union.into_inner() {
            union.query.into_filters(out);
        }
    }

    /// Bindable values in placeholder order.
    pub fn parameters(&self) -> Vec<&Param> {
        self.filters().into_iter().flat_map(Filter::params).collect()
    }

    /// Assign parameter indices and render the statement.
    pub fn sql(&mut self) -> String {
        let mut next = FIRST_BIND_INDEX;
        self.assign_indices(&mut next);
        self.to_sql()
    }

    pub fn compile(mut self, db: &Database) -> TqlResult<SelectStatement<'_, R>> {
        let sql = self.sql();
        let decode = self.decode;
        let mut filters = Vec::new();
        self.into_filters(&mut filters);
        let compiled = compiler::compile(db, sql, filters)?;
        Ok(SelectStatement::new(compiled, decode))
    }

    /// Compile for exactly-one-row retrieval.
    pub fn compile_one(self, db: &Database) -> TqlResult<SelectOneStatement<'_, R>> {
        Ok(SelectOneStatement::new(self.compile(db)?))
    }
}
