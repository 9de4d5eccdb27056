//! Database handle and table schemas.
//!
//! A [`Table`] is loaded from the database's own catalog, so columns can
//! only be obtained for names and types that actually exist. Every query
//! starts from a table.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use rusqlite::Connection;
use tracing::debug;

use crate::ast::{
    Column, ColumnList, ColumnRef, JoinKind, ResultColumns, SqlType, TableId, ValueType,
};
use crate::error::{TqlError, TqlResult};
use crate::query::{
    CountQuery, DeleteQuery, InsertQuery, Join, Relation, SelectQuery, UpdateQuery,
};
use crate::row::{FromRow, SqlValue};

/// An open SQLite database.
///
/// # Example
///
/// ```rust,ignore
/// let db = Database::open("app.db")?;
/// let users = db.table("users")?;
/// let id = users.column::<i64>("id")?;
/// ```
pub struct Database {
    conn: Connection,
    tables: RefCell<HashMap<String, Table>>,
    // Identities outlive cached schemas, so handles stay valid across reloads.
    ids: RefCell<HashMap<String, TableId>>,
}

impl Database {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> TqlResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening database");
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> TqlResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            tables: RefCell::new(HashMap::new()),
            ids: RefCell::new(HashMap::new()),
        }
    }

    /// The underlying connection (escape hatch).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run one or more raw statements, e.g. a schema script.
    ///
    /// Cached column lists are dropped since the script may alter them.
    /// Table identities are kept, so columns obtained earlier still belong
    /// to the table of the same name.
    pub fn execute_batch(&self, sql: &str) -> TqlResult<()> {
        self.conn.execute_batch(sql)?;
        self.tables.borrow_mut().clear();
        Ok(())
    }

    /// User tables, by name.
    pub fn table_names(&self) -> TqlResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Load a table's schema. Repeated calls return the same table identity.
    pub fn table(&self, name: &str) -> TqlResult<Table> {
        if let Some(table) = self.tables.borrow().get(name) {
            return Ok(table.clone());
        }

        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([name], |row| {
                let name: String = row.get(0)?;
                let declared: String = row.get(1)?;
                Ok(ColumnDef {
                    value_type: ValueType::from_declared(&declared),
                    name: name.into(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(TqlError::TableNotFound(name.to_string()));
        }
        debug!(table = name, columns = columns.len(), "loaded table schema");

        let id = *self
            .ids
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(TableId::next);
        let table = Table(Rc::new(TableDef {
            id,
            name: name.into(),
            columns,
        }));
        self.tables
            .borrow_mut()
            .insert(name.to_string(), table.clone());
        Ok(table)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

/// One column of a loaded table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: Rc<str>,
    pub value_type: ValueType,
}

#[derive(Debug)]
struct TableDef {
    id: TableId,
    name: Rc<str>,
    columns: Vec<ColumnDef>,
}

/// A table of a [`Database`]. Cheap to clone; clones share identity.
#[derive(Debug, Clone)]
pub struct Table(Rc<TableDef>);

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Table {}

/// Ways of naming a column: by position or by name.
pub trait ColumnKey {
    fn position_in(&self, columns: &[ColumnDef]) -> Option<usize>;
    fn describe(&self) -> String;
}

impl ColumnKey for usize {
    fn position_in(&self, columns: &[ColumnDef]) -> Option<usize> {
        (*self < columns.len()).then_some(*self)
    }

    fn describe(&self) -> String {
        format!("#{}", self)
    }
}

impl ColumnKey for &str {
    fn position_in(&self, columns: &[ColumnDef]) -> Option<usize> {
        columns.iter().position(|c| &*c.name == *self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl ColumnKey for String {
    fn position_in(&self, columns: &[ColumnDef]) -> Option<usize> {
        self.as_str().position_in(columns)
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl Table {
    pub fn id(&self) -> TableId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.0.columns
    }

    pub fn column_count(&self) -> usize {
        self.0.columns.len()
    }

    /// A typed handle to one column.
    ///
    /// Fails if the column does not exist or its declared type cannot hold
    /// `V`. Columns without a declared type accept any `V`.
    pub fn column<V: SqlType>(&self, key: impl ColumnKey) -> TqlResult<Column<V>> {
        let position = key
            .position_in(&self.0.columns)
            .ok_or_else(|| TqlError::ColumnNotFound {
                table: self.name().to_string(),
                column: key.describe(),
            })?;
        let def = &self.0.columns[position];
        if !V::accepts(def.value_type) {
            return Err(TqlError::TypeMismatch {
                table: self.name().to_string(),
                column: def.name.to_string(),
                expected: V::VALUE_TYPE.name(),
                declared: def.value_type.name(),
            });
        }
        Ok(Column::new(self.column_ref(position)))
    }

    /// Every column, untyped, in declaration order.
    pub fn all_columns(&self) -> Vec<Column<SqlValue>> {
        (0..self.column_count())
            .map(|position| Column::new(self.column_ref(position)))
            .collect()
    }

    fn column_ref(&self, position: usize) -> ColumnRef {
        let def = &self.0.columns[position];
        ColumnRef {
            table: self.0.id,
            table_name: self.0.name.clone(),
            position,
            name: def.name.clone(),
            value_type: def.value_type,
        }
    }

    pub fn select<C: ResultColumns>(&self, columns: C) -> TqlResult<SelectQuery<C::Row>> {
        SelectQuery::new(
            Relation::Table(self.clone()),
            columns.result_exprs(),
            <C::Row as FromRow>::from_row,
        )
    }

    /// Select into any type constructible from the row tuple.
    pub fn select_as<R, C>(&self, columns: C) -> TqlResult<SelectQuery<R>>
    where
        C: ResultColumns,
        R: From<C::Row>,
    {
        SelectQuery::new(
            Relation::Table(self.clone()),
            columns.result_exprs(),
            crate::query::decode_into::<C::Row, R>,
        )
    }

    /// `SELECT` every column, decoded as untyped values.
    pub fn select_all(&self) -> TqlResult<SelectQuery<Vec<SqlValue>>> {
        self.select(self.all_columns())
    }

    pub fn insert(&self, columns: impl ColumnList) -> TqlResult<InsertQuery> {
        InsertQuery::new(self.clone(), columns.column_refs())
    }

    /// `INSERT ... DEFAULT VALUES`.
    pub fn insert_default(&self) -> InsertQuery {
        InsertQuery {
            table: self.clone(),
            columns: Vec::new(),
        }
    }

    pub fn update(&self, columns: impl ColumnList) -> TqlResult<UpdateQuery> {
        UpdateQuery::new(self.clone(), columns.column_refs())
    }

    pub fn delete(&self) -> DeleteQuery {
        DeleteQuery::new(self.clone())
    }

    pub fn count(&self) -> CountQuery {
        CountQuery::new(self.clone())
    }

    pub fn join(&self, kind: JoinKind, other: &Table) -> Join {
        Join::new(kind, Relation::Table(self.clone()), other.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL, avatar BLOB, extra);
             CREATE TABLE posts (id INTEGER, user_id INTEGER, body VARCHAR(200));",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_load_table() {
        let db = db();
        let users = db.table("users").unwrap();
        assert_eq!(users.name(), "users");
        assert_eq!(users.column_count(), 5);
        let types: Vec<ValueType> = users.columns().iter().map(|c| c.value_type).collect();
        assert_eq!(
            types,
            vec![
                ValueType::Integer,
                ValueType::Text,
                ValueType::Real,
                ValueType::Blob,
                ValueType::Null,
            ]
        );
    }

    #[test]
    fn test_table_identity_is_cached() {
        let db = db();
        let a = db.table("users").unwrap();
        let b = db.table("users").unwrap();
        let posts = db.table("posts").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, posts);
    }

    #[test]
    fn test_identity_survives_batch() {
        let db = db();
        let users = db.table("users").unwrap();
        let name = users.column::<String>("name").unwrap();

        db.execute_batch("INSERT INTO users (name) VALUES ('ada')")
            .unwrap();
        let reloaded = db.table("users").unwrap();
        assert_eq!(reloaded, users);
        assert_eq!(reloaded.id(), name.table());

        let mut stmt = reloaded
            .select((&name,))
            .unwrap()
            .compile(&db)
            .unwrap();
        assert_eq!(stmt.fetch_all().unwrap(), vec![("ada".to_string(),)]);
    }

    #[test]
    fn test_altered_table_keeps_identity() {
        let db = db();
        let posts = db.table("posts").unwrap();
        db.execute_batch("ALTER TABLE posts ADD COLUMN title TEXT")
            .unwrap();
        let altered = db.table("posts").unwrap();
        assert_eq!(altered, posts);
        assert_eq!(altered.column_count(), 4);
        assert_eq!(posts.column_count(), 3);
    }

    #[test]
    fn test_missing_table() {
        let db = db();
        assert!(matches!(db.table("nope"), Err(TqlError::TableNotFound(_))));
    }

    #[test]
    fn test_table_names() {
        let db = db();
        assert_eq!(db.table_names().unwrap(), vec!["posts", "users"]);
    }

    #[test]
    fn test_column_lookup() {
        let db = db();
        let users = db.table("users").unwrap();

        let name = users.column::<String>("name").unwrap();
        assert_eq!(name.column_ref().position(), 1);
        let score = users.column::<Option<f64>>(2usize).unwrap();
        assert_eq!(score.name(), "score");
        // Untyped columns take anything.
        users.column::<i64>("extra").unwrap();
        users.column::<Vec<u8>>("extra").unwrap();

        assert!(matches!(
            users.column::<i64>("missing"),
            Err(TqlError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            users.column::<i64>(9usize),
            Err(TqlError::ColumnNotFound { .. })
        ));
        let err = users.column::<i64>("name").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column users.name is declared text but was requested as integer"
        );
    }
}
