//! Compiled statements and result iteration.
//!
//! A compiled statement owns its prepared handle and the filters whose
//! parameters it references. Parameters are bound explicitly with
//! [`BindParameters`]; nothing is bound at compile time. Re-binding only the
//! dynamic parameters and re-running is the intended way to reuse a
//! statement.
//!
//! ```rust,ignore
//! let min_id = Dynamic::new(20);
//! let mut stmt = t.select((&id, &name))?.filter(id.ge(&min_id))?.compile(&db)?;
//! stmt.bind(BindParameters::ALL)?;
//! let first: Vec<_> = stmt.fetch_all()?;
//!
//! min_id.set(30);
//! stmt.bind(BindParameters::DYNAMIC)?;
//! let second: Vec<_> = stmt.fetch_all()?;
//! ```

use rusqlite::{Rows, Statement};
use tracing::{trace, warn};

use crate::ast::Filter;
use crate::bind::{BindParameters, BindRow, FIRST_BIND_INDEX};
use crate::error::{TqlError, TqlResult};
use crate::query::Decode;
use crate::schema::Database;

fn step_error(sql: &str, source: rusqlite::Error) -> TqlError {
    warn!(sql, error = %source, "step failed, statement reset");
    TqlError::Step {
        sql: sql.to_string(),
        source,
    }
}

/// A prepared statement paired with the filters it binds from.
#[derive(Debug)]
pub struct CompiledStatement<'db> {
    stmt: Statement<'db>,
    sql: String,
    filters: Vec<Filter>,
}

impl<'db> CompiledStatement<'db> {
    pub(crate) fn new(stmt: Statement<'db>, sql: String, filters: Vec<Filter>) -> Self {
        Self { stmt, sql, filters }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of `?N` placeholders the engine sees.
    pub fn parameter_count(&self) -> usize {
        self.stmt.parameter_count()
    }

    pub fn dynamic_count(&self) -> usize {
        self.filters
            .iter()
            .flat_map(Filter::params)
            .filter(|p| p.is_dynamic())
            .count()
    }

    /// Bind the selected kinds of filter parameters. Dynamic parameters are
    /// sampled now.
    pub fn bind(&mut self, which: BindParameters) -> TqlResult<()> {
        for filter in &self.filters {
            filter.bind(&mut self.stmt, which)?;
        }
        Ok(())
    }

    /// Run to completion; the number of changed rows.
    fn execute(&mut self) -> TqlResult<usize> {
        trace!(sql = %self.sql, "step");
        self.stmt
            .raw_execute()
            .map_err(|source| step_error(&self.sql, source))
    }

    fn bind_row(&mut self, expected: usize, values: &impl BindRow) -> TqlResult<()> {
        if values.len() != expected {
            return Err(TqlError::ArityMismatch {
                expected,
                got: values.len(),
            });
        }
        values.bind_row(&mut self.stmt, FIRST_BIND_INDEX)
    }
}

/// Where a [`RowIter`] is in its traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    NotStarted,
    HasRow,
    Exhausted,
}

/// Forward, single-pass cursor over a select's rows.
///
/// The next row is fetched one step ahead so that the final row is followed
/// immediately by the statement being reset. A step failure ends the
/// iteration with an error item.
pub struct RowIter<'s, R> {
    rows: Rows<'s>,
    sql: &'s str,
    decode: Decode<R>,
    state: IterState,
    current: Option<TqlResult<R>>,
}

impl<R> RowIter<'_, R> {
    fn advance(&mut self) -> TqlResult<()> {
        trace!(sql = self.sql, "step");
        match self.rows.next() {
            Ok(Some(row)) => {
                self.current = Some((self.decode)(row));
                self.state = IterState::HasRow;
                Ok(())
            }
            Ok(None) => {
                self.current = None;
                self.state = IterState::Exhausted;
                Ok(())
            }
            Err(source) => {
                self.current = None;
                self.state = IterState::Exhausted;
                Err(step_error(self.sql, source))
            }
        }
    }

    pub fn state(&self) -> IterState {
        self.state
    }

    /// The row the next call to `next` will yield.
    pub fn peek(&self) -> Option<&TqlResult<R>> {
        self.current.as_ref()
    }

    /// Abandon the traversal and reset the statement for another run.
    pub fn reset(self) {
        trace!(sql = self.sql, "reset");
    }
}

impl<R> Iterator for RowIter<'_, R> {
    type Item = TqlResult<R>;

    fn next(&mut self) -> Option<TqlResult<R>> {
        let item = self.current.take()?;
        if self.state == IterState::HasRow {
            if let Err(err) = self.advance() {
                self.current = Some(Err(err));
            }
        }
        Some(item)
    }
}

/// A compiled SELECT yielding rows of type `R`.
pub struct SelectStatement<'db, R> {
    compiled: CompiledStatement<'db>,
    decode: Decode<R>,
}

impl<'db, R> SelectStatement<'db, R> {
    pub(crate) fn new(compiled: CompiledStatement<'db>, decode: Decode<R>) -> Self {
        Self { compiled, decode }
    }

    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }

    pub fn compiled(&self) -> &CompiledStatement<'db> {
        &self.compiled
    }

    pub fn bind(&mut self, which: BindParameters) -> TqlResult<()> {
        self.compiled.bind(which)
    }

    /// Start a traversal. The first step happens here, so an engine error
    /// on the first row is returned directly.
    pub fn begin(&mut self) -> TqlResult<RowIter<'_, R>> {
        let CompiledStatement { stmt, sql, .. } = &mut self.compiled;
        let mut rows = RowIter {
            rows: stmt.raw_query(),
            sql: sql.as_str(),
            decode: self.decode,
            state: IterState::NotStarted,
            current: None,
        };
        rows.advance()?;
        Ok(rows)
    }

    /// Every row of one traversal.
    pub fn fetch_all(&mut self) -> TqlResult<Vec<R>> {
        self.begin()?.collect()
    }
}

/// A compiled SELECT expected to match exactly one row.
pub struct SelectOneStatement<'db, R> {
    inner: SelectStatement<'db, R>,
}

impl<'db, R> SelectOneStatement<'db, R> {
    pub(crate) fn new(inner: SelectStatement<'db, R>) -> Self {
        Self { inner }
    }

    pub fn sql(&self) -> &str {
        self.inner.sql()
    }

    pub fn bind(&mut self, which: BindParameters) -> TqlResult<()> {
        self.inner.bind(which)
    }

    /// The single matching row; [`TqlError::NoResult`] or
    /// [`TqlError::MultipleResults`] otherwise.
    pub fn get(&mut self) -> TqlResult<R> {
        let mut rows = self.inner.begin()?;
        let first = match rows.next() {
            Some(row) => row?,
            None => return Err(TqlError::NoResult),
        };
        if rows.state() == IterState::HasRow {
            return Err(TqlError::MultipleResults);
        }
        if let Some(Err(err)) = rows.next() {
            return Err(err);
        }
        Ok(first)
    }
}

/// A compiled INSERT; each `execute` inserts one row.
pub struct InsertStatement<'db> {
    compiled: CompiledStatement<'db>,
    db: &'db Database,
    arity: usize,
}

impl<'db> InsertStatement<'db> {
    pub(crate) fn new(compiled: CompiledStatement<'db>, db: &'db Database, arity: usize) -> Self {
        Self {
            compiled,
            db,
            arity,
        }
    }

    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }

    /// Insert one row of values, in column order. Pass `()` for
    /// `DEFAULT VALUES`.
    pub fn execute(&mut self, values: impl BindRow) -> TqlResult<usize> {
        self.compiled.bind_row(self.arity, &values)?;
        self.compiled.execute()
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.db.connection().last_insert_rowid()
    }
}

/// A compiled UPDATE. SET values are passed per execution; WHERE
/// parameters are bound with [`UpdateStatement::bind`].
pub struct UpdateStatement<'db> {
    compiled: CompiledStatement<'db>,
    arity: usize,
}

impl<'db> UpdateStatement<'db> {
    pub(crate) fn new(compiled: CompiledStatement<'db>, arity: usize) -> Self {
        Self { compiled, arity }
    }

    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }

    pub fn bind(&mut self, which: BindParameters) -> TqlResult<()> {
        self.compiled.bind(which)
    }

    pub fn execute(&mut self, values: impl BindRow) -> TqlResult<usize> {
        self.compiled.bind_row(self.arity, &values)?;
        self.compiled.execute()
    }
}

pub struct DeleteStatement<'db> {
    compiled: CompiledStatement<'db>,
}

impl<'db> DeleteStatement<'db> {
    pub(crate) fn new(compiled: CompiledStatement<'db>) -> Self {
        Self { compiled }
    }

    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }

    pub fn bind(&mut self, which: BindParameters) -> TqlResult<()> {
        self.compiled.bind(which)
    }

    pub fn execute(&mut self) -> TqlResult<usize> {
        self.compiled.execute()
    }
}

pub struct CountStatement<'db> {
    compiled: CompiledStatement<'db>,
}

impl<'db> CountStatement<'db> {
    pub(crate) fn new(compiled: CompiledStatement<'db>) -> Self {
        Self { compiled }
    }

    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }

    pub fn bind(&mut self, which: BindParameters) -> TqlResult<()> {
        self.compiled.bind(which)
    }

    pub fn execute(&mut self) -> TqlResult<i64> {
        let CompiledStatement { stmt, sql, .. } = &mut self.compiled;
        trace!(sql = %sql, "step");
        let mut rows = stmt.raw_query();
        let count = match rows.next() {
            Ok(Some(row)) => row.get::<_, i64>(0)?,
            Ok(None) => return Err(TqlError::NoResult),
            Err(source) => return Err(step_error(sql, source)),
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::bind::Dynamic;
    use pretty_assertions::assert_eq;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT);
             INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, 'c');",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_iterator_states() {
        let db = db();
        let t = db.table("t").unwrap();
        let id = t.column::<i64>("id").unwrap();
        let mut stmt = t
            .select((&id,))
            .unwrap()
            .order_by(id.asc())
            .unwrap()
            .compile(&db)
            .unwrap();

        let mut rows = stmt.begin().unwrap();
        assert_eq!(rows.state(), IterState::HasRow);
        assert_eq!(rows.next().unwrap().unwrap(), (1,));
        assert_eq!(rows.next().unwrap().unwrap(), (2,));
        assert_eq!(rows.next().unwrap().unwrap(), (3,));
        assert_eq!(rows.state(), IterState::Exhausted);
        assert!(rows.next().is_none());
        drop(rows);

        // Re-armed without an explicit reset.
        assert_eq!(stmt.fetch_all().unwrap().len(), 3);
    }

    #[test]
    fn test_reset_mid_traversal() {
        let db = db();
        let t = db.table("t").unwrap();
        let id = t.column::<i64>("id").unwrap();
        let mut stmt = t.select((&id,)).unwrap().compile(&db).unwrap();

        let mut rows = stmt.begin().unwrap();
        rows.next();
        rows.reset();
        assert_eq!(stmt.fetch_all().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_result() {
        let db = db();
        let t = db.table("t").unwrap();
        let id = t.column::<i64>("id").unwrap();
        let mut stmt = t
            .select((&id,))
            .unwrap()
            .filter(id.gt(100))
            .unwrap()
            .compile(&db)
            .unwrap();
        stmt.bind(BindParameters::ALL).unwrap();
        let rows = stmt.begin().unwrap();
        assert_eq!(rows.state(), IterState::Exhausted);
        assert_eq!(rows.count(), 0);
    }

    #[test]
    fn test_dynamic_count() {
        let db = db();
        let t = db.table("t").unwrap();
        let id = t.column::<i64>("id").unwrap();
        let low = Dynamic::new(1i64);
        let stmt = t
            .select((&id,))
            .unwrap()
            .filter(id.ge(&low) & id.lt(3))
            .unwrap()
            .compile(&db)
            .unwrap();
        assert_eq!(stmt.compiled().parameter_count(), 2);
        assert_eq!(stmt.compiled().dynamic_count(), 1);
    }

    #[test]
    fn test_arity_mismatch() {
        let db = db();
        let t = db.table("t").unwrap();
        let id = t.column::<i64>("id").unwrap();
        let name = t.column::<String>("name").unwrap();
        let mut insert = t.insert((&id, &name)).unwrap().compile(&db).unwrap();
        let err = insert.execute((4i64,)).unwrap_err();
        assert!(matches!(err, TqlError::ArityMismatch { expected: 2, got: 1 }));
    }
}
