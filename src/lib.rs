//! # tql
//!
//! Typed query construction for SQLite.
//!
//! Queries are built from typed column handles obtained from a loaded
//! table. Every clause is checked against the tables the query actually
//! ranges over before any SQL is generated, parameters are numbered in
//! placeholder order, and compiled statements can be re-bound and re-run
//! without recompiling.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use tql::prelude::*;
//!
//! let db = Database::open_in_memory()?;
//! db.execute_batch("CREATE TABLE users (id INTEGER, name TEXT)")?;
//!
//! let users = db.table("users")?;
//! let id = users.column::<i64>("id")?;
//! let name = users.column::<String>("name")?;
//!
//! let mut insert = users.insert((&id, &name))?.compile(&db)?;
//! insert.execute((1i64, "ada"))?;
//!
//! let wanted = Dynamic::new(1i64);
//! let mut select = users
//!     .select((&name,))?
//!     .filter(id.eq(&wanted))?
//!     .compile(&db)?;
//! // => "SELECT users.name FROM users WHERE users.id = ?1"
//! select.bind(BindParameters::ALL)?;
//! let rows: Vec<(String,)> = select.fetch_all()?;
//! ```
//!
//! ## Pipeline
//!
//! | Stage       | Module         | Output                        |
//! |-------------|----------------|-------------------------------|
//! | Schema      | [`schema`]     | tables and typed columns      |
//! | Expressions | [`ast`]        | filters, orderings            |
//! | Builders    | [`query`]      | validated queries             |
//! | Text        | [`transpiler`] | indexed SQL                   |
//! | Runtime     | [`statement`]  | bound, iterable statements    |

pub mod ast;
pub mod bind;
mod compiler;
pub mod config;
pub mod error;
pub mod parser;
pub mod query;
pub mod row;
pub mod schema;
pub mod statement;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::{
        Aggregate, Column, ColumnList, ColumnRef, ComparisonOp, Expr, Filter, JoinKind, Nulls,
        Order, OrderBy, Param, ResultColumns, SqlType, TableId, UnionOp, ValueType, avg, count,
        max, min, sum, total,
    };
    pub use crate::bind::{BindParameters, BindRow, Blob, Dynamic, Null, Text, ToBind};
    pub use crate::error::{TqlError, TqlResult};
    pub use crate::parser::{parse_filter, parse_order};
    pub use crate::query::{
        CountQuery, DeleteQuery, InsertQuery, Join, Limit, SelectQuery, UpdateQuery,
    };
    pub use crate::row::{FromColumn, FromRow, SqlValue};
    pub use crate::schema::{Database, Table};
    pub use crate::statement::{
        CountStatement, DeleteStatement, InsertStatement, IterState, RowIter,
        SelectOneStatement, SelectStatement, UpdateStatement,
    };
    pub use crate::transpiler::ToSql;
}
