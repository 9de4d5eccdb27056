//! Typed column references.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::bind::BlobElement;
use crate::transpiler::escape_identifier;

/// Identity of a loaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u64);

impl TableId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Primitive type tag of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Real,
    Text,
    Blob,
    /// No declared type; accepts any value.
    Null,
}

impl ValueType {
    /// Map a declared SQL type to a tag using SQLite's affinity rules.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            ValueType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ValueType::Text
        } else if upper.contains("BLOB") {
            ValueType::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ValueType::Real
        } else {
            ValueType::Null
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Integer => "integer",
            ValueType::Real => "real",
            ValueType::Text => "text",
            ValueType::Blob => "blob",
            ValueType::Null => "null",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust types that may be used as a column's value type.
pub trait SqlType {
    const VALUE_TYPE: ValueType;

    /// Whether a column declared as `declared` can hold this type.
    fn accepts(declared: ValueType) -> bool {
        declared == ValueType::Null || declared == Self::VALUE_TYPE
    }
}

macro_rules! sql_type {
    ($tag:ident: $($t:ty),+) => {
        $(
            impl SqlType for $t {
                const VALUE_TYPE: ValueType = ValueType::$tag;
            }
        )+
    };
}

sql_type!(Integer: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, bool);
sql_type!(Real: f32, f64);
sql_type!(Text: String, NaiveDate, NaiveDateTime, DateTime<Utc>);

impl<T: BlobElement> SqlType for Vec<T> {
    const VALUE_TYPE: ValueType = ValueType::Blob;
}

impl<T: BlobElement, const N: usize> SqlType for [T; N] {
    const VALUE_TYPE: ValueType = ValueType::Blob;
}

impl<T: SqlType> SqlType for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;

    fn accepts(declared: ValueType) -> bool {
        T::accepts(declared)
    }
}

/// Untyped reference to a column of a specific table.
///
/// Two references are equal when they point at the same position of the
/// same table.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    pub(crate) table: TableId,
    pub(crate) table_name: Rc<str>,
    pub(crate) position: usize,
    pub(crate) name: Rc<str>,
    pub(crate) value_type: ValueType,
}

impl ColumnRef {
    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// `table.column`, quoted where needed.
    pub fn qualified(&self) -> String {
        format!(
            "{}.{}",
            escape_identifier(&self.table_name),
            escape_identifier(&self.name)
        )
    }
}

/// The first column whose table is not in `scope`.
pub(crate) fn first_out_of_scope<'a>(
    scope: &[TableId],
    columns: impl IntoIterator<Item = &'a ColumnRef>,
) -> Option<&'a ColumnRef> {
    columns.into_iter().find(|column| !scope.contains(&column.table))
}

impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.position == other.position
    }
}

impl Eq for ColumnRef {}

/// A column whose values are of type `V`.
pub struct Column<V> {
    pub(crate) column: ColumnRef,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Column<V> {
    pub(crate) fn new(column: ColumnRef) -> Self {
        Self {
            column,
            _marker: PhantomData,
        }
    }

    pub fn column_ref(&self) -> &ColumnRef {
        &self.column
    }

    pub fn name(&self) -> &str {
        self.column.name()
    }

    pub fn table(&self) -> TableId {
        self.column.table
    }
}

impl<V> Clone for Column<V> {
    fn clone(&self) -> Self {
        Self::new(self.column.clone())
    }
}

impl<V> fmt::Debug for Column<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.column.qualified()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity() {
        assert_eq!(ValueType::from_declared("INTEGER"), ValueType::Integer);
        assert_eq!(ValueType::from_declared("bigint"), ValueType::Integer);
        assert_eq!(ValueType::from_declared("VARCHAR(20)"), ValueType::Text);
        assert_eq!(ValueType::from_declared("DOUBLE PRECISION"), ValueType::Real);
        assert_eq!(ValueType::from_declared("BLOB"), ValueType::Blob);
        assert_eq!(ValueType::from_declared(""), ValueType::Null);
        assert_eq!(ValueType::from_declared("DATE"), ValueType::Null);
    }

    #[test]
    fn test_sql_type_accepts() {
        assert!(i64::accepts(ValueType::Integer));
        assert!(!i64::accepts(ValueType::Text));
        assert!(String::accepts(ValueType::Null));
        assert!(Option::<f64>::accepts(ValueType::Real));
        assert!(Vec::<u32>::accepts(ValueType::Blob));
    }
}
