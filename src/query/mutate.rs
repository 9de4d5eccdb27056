use crate::ast::{ColumnRef, Filter, OrderBy, Param};
use crate::bind::FIRST_BIND_INDEX;
use crate::compiler;
use crate::error::TqlResult;
use crate::query::{Limit, Slot, check_scope};
use crate::schema::{Database, Table};
use crate::statement::{CountStatement, DeleteStatement, InsertStatement, UpdateStatement};
use crate::transpiler::{AssignIndices, ToSql};

/// `INSERT INTO t (cols) VALUES (?1, ...)`, or `DEFAULT VALUES`.
#[derive(Debug)]
pub struct InsertQuery {
    pub(crate) table: Table,
    pub(crate) columns: Vec<ColumnRef>,
}

impl InsertQuery {
    pub(crate) fn new(table: Table, columns: Vec<ColumnRef>) -> TqlResult<Self> {
        check_scope("insert", &[table.id()], &columns)?;
        Ok(Self { table, columns })
    }

    pub fn sql(&self) -> String {
        self.to_sql()
    }

    pub fn compile(self, db: &Database) -> TqlResult<InsertStatement<'_>> {
        let compiled = compiler::compile(db, self.sql(), Vec::new())?;
        Ok(InsertStatement::new(compiled, db, self.columns.len()))
    }
}

/// `UPDATE t SET (cols) = (?1, ...) [WHERE] [ORDER BY] [LIMIT]`.
///
/// New values take the first parameter indices; WHERE parameters follow.
#[derive(Debug)]
pub struct UpdateQuery {
    pub(crate) table: Table,
    pub(crate) columns: Vec<ColumnRef>,
    pub(crate) filter: Slot<Filter>,
    pub(crate) order_by: Slot<OrderBy>,
    pub(crate) limit: Slot<Limit>,
}

impl UpdateQuery {
    pub(crate) fn new(table: Table, columns: Vec<ColumnRef>) -> TqlResult<Self> {
        check_scope("update", &[table.id()], &columns)?;
        Ok(Self {
            table,
            columns,
            filter: Slot::new("where"),
            order_by: Slot::new("order by"),
            limit: Slot::new("limit"),
        })
    }

    pub fn filter(mut self, filter: Filter) -> TqlResult<Self> {
        check_scope(self.filter.clause(), &[self.table.id()], filter.columns())?;
        self.filter.fill(filter)?;
        Ok(self)
    }

    /// Needs an engine built with row-limited UPDATE support to execute.
    pub fn order_by(mut self, order: OrderBy) -> TqlResult<Self> {
        check_scope(self.order_by.clause(), &[self.table.id()], order.columns())?;
        self.order_by.fill(order)?;
        Ok(self)
    }

    /// Needs an engine built with row-limited UPDATE support to execute.
    pub fn limit_offset(mut self, limit: u64, offset: u64) -> TqlResult<Self> {
        self.limit.fill(Limit::new(limit, offset)?)?;
        Ok(self)
    }

    pub fn limit(self, limit: u64) -> TqlResult<Self> {
        self.limit_offset(limit, 0)
    }

    pub fn parameters(&self) -> Vec<&Param> {
        self.filter.get().map(Filter::params).unwrap_or_default()
    }

    pub fn sql(&mut self) -> String {
        let mut next = FIRST_BIND_INDEX;
        self.assign_indices(&mut next);
        self.to_sql()
    }

    pub fn compile(mut self, db: &Database) -> TqlResult<UpdateStatement<'_>> {
        let sql = self.sql();
        let arity = self.columns.len();
        let filters = self.filter.into_inner().into_iter().collect();
        let compiled = compiler::compile(db, sql, filters)?;
        Ok(UpdateStatement::new(compiled, arity))
    }
}

/// `DELETE FROM t [WHERE] [ORDER BY] [LIMIT]`.
#[derive(Debug)]
pub struct DeleteQuery {
    pub(crate) table: Table,
    pub(crate) filter: Slot<Filter>,
    pub(crate) order_by: Slot<OrderBy>,
    pub(crate) limit: Slot<Limit>,
}

impl DeleteQuery {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table,
            filter: Slot::new("where"),
            order_by: Slot::new("order by"),
            limit: Slot::new("limit"),
        }
    }

    pub fn filter(mut self, filter: Filter) -> TqlResult<Self> {
        check_scope(self.filter.clause(), &[self.table.id()], filter.columns())?;
        self.filter.fill(filter)?;
        Ok(self)
    }

    /// Needs an engine built with row-limited DELETE support to execute.
    pub fn order_by(mut self, order: OrderBy) -> TqlResult<Self> {
        check_scope(self.order_by.clause(), &[self.table.id()], order.columns())?;
        self.order_by.fill(order)?;
        Ok(self)
    }

    /// Needs an engine built with row-limited DELETE support to execute.
    pub fn limit_offset(mut self, limit: u64, offset: u64) -> TqlResult<Self> {
        self.limit.fill(Limit::new(limit, offset)?)?;
        Ok(self)
    }

    pub fn limit(self, limit: u64) -> TqlResult<Self> {
        self.limit_offset(limit, 0)
    }

    pub fn parameters(&self) -> Vec<&Param> {
        self.filter.get().map(Filter::params).unwrap_or_default()
    }

    pub fn sql(&mut self) -> String {
        let mut next = FIRST_BIND_INDEX;
        self.assign_indices(&mut next);
        self.to_sql()
    }

    pub fn compile(mut self, db: &Database) -> TqlResult<DeleteStatement<'_>> {
        let sql = self.sql();
        let filters = self.filter.into_inner().into_iter().collect();
        Ok(DeleteStatement::new(compiler::compile(db, sql, filters)?))
    }
}

/// `SELECT COUNT(*) FROM t [WHERE]`.
#[derive(Debug)]
pub struct CountQuery {
    pub(crate) table: Table,
    pub(crate) filter: Slot<Filter>,
}

impl CountQuery {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table,
            filter: Slot::new("where"),
        }
    }

    pub fn filter(mut self, filter: Filter) -> TqlResult<Self> {
        check_scope(self.filter.clause(), &[self.table.id()], filter.columns())?;
        self.filter.fill(filter)?;
        Ok(self)
    }

    pub fn parameters(&self) -> Vec<&Param> {
        self.filter.get().map(Filter::params).unwrap_or_default()
    }

    pub fn sql(&mut self) -> String {
        let mut next = FIRST_BIND_INDEX;
        self.assign_indices(&mut next);
        self.to_sql()
    }

    pub fn compile(mut self, db: &Database) -> TqlResult<CountStatement<'_>> {
        let sql = self.sql();
        let filters = self.filter.into_inner().into_iter().collect();
        Ok(CountStatement::new(compiler::compile(db, sql, filters)?))
    }
}
