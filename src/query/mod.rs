//! Query builders.
//!
//! Each builder is a value that is moved through its clause methods. Every
//! clause is checked against the tables of the query's relation and may be
//! set once; violations are reported before any SQL is generated.

mod join;
mod mutate;
mod select;
mod slot;

pub use join::{Join, JoinConstraint, Relation};
pub use mutate::{CountQuery, DeleteQuery, InsertQuery, UpdateQuery};
pub use select::{Limit, SelectQuery};

pub(crate) use select::{Decode, decode_into};
pub(crate) use slot::Slot;

use crate::ast::column::first_out_of_scope;
use crate::ast::{ColumnRef, TableId};
use crate::error::{TqlError, TqlResult};

/// Fail if any column belongs to a table outside `scope`.
pub(crate) fn check_scope<'a>(
    clause: &'static str,
    scope: &[TableId],
    columns: impl IntoIterator<Item = &'a ColumnRef>,
) -> TqlResult<()> {
    match first_out_of_scope(scope, columns) {
        Some(column) => Err(TqlError::TableNotInScope {
            clause,
            table: column.table_name.to_string(),
        }),
        None => Ok(()),
    }
}
