//! Turns generated SQL into prepared statements.

use rusqlite::Statement;
use tracing::debug;

use crate::ast::Filter;
use crate::error::{TqlError, TqlResult};
use crate::schema::Database;
use crate::statement::CompiledStatement;

pub(crate) fn prepare<'db>(db: &'db Database, sql: &str) -> TqlResult<Statement<'db>> {
    debug!(sql, "prepare");
    db.connection()
        .prepare(sql)
        .map_err(|source| TqlError::Prepare {
            sql: sql.to_string(),
            source,
        })
}

/// Prepare `sql` and take ownership of the filters whose parameters it
/// references. Indices must already be assigned.
pub(crate) fn compile(
    db: &Database,
    sql: String,
    filters: Vec<Filter>,
) -> TqlResult<CompiledStatement<'_>> {
    let stmt = prepare(db, &sql)?;
    let compiled = CompiledStatement::new(stmt, sql, filters);
    debug!(
        parameters = compiled.parameter_count(),
        dynamic = compiled.dynamic_count(),
        "compiled"
    );
    Ok(compiled)
}
