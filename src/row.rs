//! Decoding result columns back into Rust values.
//!
//! The conversions mirror SQLite's own column accessors: NULL reads as zero,
//! an empty string or an empty blob, numbers read from text are parsed, and
//! 32-bit targets take the 64-bit value truncated to its low bits. Blobs are
//! size-checked against the target.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::ValueRef;
use serde::Serialize;

use crate::ast::column::{SqlType, ValueType};
use crate::bind::{BindValue, Blob, BlobElement, DATETIME_FORMAT, DATE_FORMAT, Text, ToBind};
use crate::error::{TqlError, TqlResult};

/// Decode one result column.
pub trait FromColumn: Sized {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self>;
}

/// Decode a whole result row.
pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> TqlResult<Self>;
}

fn column_int64(value: ValueRef<'_>) -> i64 {
    match value {
        ValueRef::Integer(v) => v,
        ValueRef::Real(v) => v as i64,
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0),
        ValueRef::Null | ValueRef::Blob(_) => 0,
    }
}

fn column_int32(value: ValueRef<'_>) -> i32 {
    column_int64(value) as i32
}

fn column_double(value: ValueRef<'_>) -> f64 {
    match value {
        ValueRef::Real(v) => v,
        ValueRef::Integer(v) => v as f64,
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0.0),
        ValueRef::Null | ValueRef::Blob(_) => 0.0,
    }
}

fn column_text(value: ValueRef<'_>, index: usize) -> TqlResult<String> {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|e| TqlError::decode(index, e.to_string())),
        ValueRef::Integer(v) => Ok(v.to_string()),
        ValueRef::Real(v) => Ok(v.to_string()),
        ValueRef::Null => Ok(String::new()),
    }
}

fn column_bytes(value: ValueRef<'_>, index: usize) -> TqlResult<&[u8]> {
    match value {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(bytes),
        ValueRef::Null => Ok(&[]),
        other => Err(TqlError::decode(
            index,
            format!("expected blob, found {:?}", other.data_type()),
        )),
    }
}

macro_rules! from_int32 {
    ($($t:ty),+) => {
        $(
            impl FromColumn for $t {
                fn from_column(value: ValueRef<'_>, _index: usize) -> TqlResult<Self> {
                    Ok(column_int32(value) as $t)
                }
            }
        )+
    };
}

from_int32!(i8, i16, i32, u8, u16, u32);

macro_rules! from_int64 {
    ($($t:ty),+) => {
        $(
            impl FromColumn for $t {
                fn from_column(value: ValueRef<'_>, _index: usize) -> TqlResult<Self> {
                    Ok(column_int64(value) as $t)
                }
            }
        )+
    };
}

from_int64!(i64, u64, isize, usize);

impl FromColumn for bool {
    fn from_column(value: ValueRef<'_>, _index: usize) -> TqlResult<Self> {
        Ok(column_int32(value) != 0)
    }
}

impl FromColumn for f64 {
    fn from_column(value: ValueRef<'_>, _index: usize) -> TqlResult<Self> {
        Ok(column_double(value))
    }
}

impl FromColumn for f32 {
    fn from_column(value: ValueRef<'_>, _index: usize) -> TqlResult<Self> {
        Ok(column_double(value) as f32)
    }
}

impl FromColumn for String {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self> {
        column_text(value, index)
    }
}

impl<T: BlobElement> FromColumn for Vec<T> {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self> {
        let bytes = column_bytes(value, index)?;
        if bytes.len() % T::SIZE != 0 {
            return Err(TqlError::BlobAlignment {
                size: bytes.len(),
                element: T::SIZE,
            });
        }
        Ok(T::decode_slice(bytes))
    }
}

impl<T: BlobElement, const N: usize> FromColumn for [T; N] {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self> {
        let bytes = column_bytes(value, index)?;
        let expected = N * T::SIZE;
        if bytes.len() != expected {
            return Err(TqlError::BlobSize {
                expected,
                actual: bytes.len(),
            });
        }
        <[T; N]>::try_from(T::decode_slice(bytes)).map_err(|_| TqlError::BlobSize {
            expected,
            actual: bytes.len(),
        })
    }
}

impl<T: FromColumn> FromColumn for Option<T> {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self> {
        match value {
            ValueRef::Null => Ok(None),
            other => T::from_column(other, index).map(Some),
        }
    }
}

impl FromColumn for NaiveDate {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self> {
        let text = column_text(value, index)?;
        NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map_err(|e| TqlError::decode(index, format!("'{}': {}", text, e)))
    }
}

impl FromColumn for NaiveDateTime {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self> {
        let text = column_text(value, index)?;
        NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
            .map_err(|e| TqlError::decode(index, format!("'{}': {}", text, e)))
    }
}

impl FromColumn for DateTime<Utc> {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self> {
        let text = column_text(value, index)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| TqlError::decode(index, format!("'{}': {}", text, e)))
    }
}

/// A column value of whatever type the engine returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            SqlValue::Null => ValueType::Null,
            SqlValue::Integer(_) => ValueType::Integer,
            SqlValue::Real(_) => ValueType::Real,
            SqlValue::Text(_) => ValueType::Text,
            SqlValue::Blob(_) => ValueType::Blob,
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(v) => write!(f, "{}", v),
            SqlValue::Real(v) => write!(f, "{}", v),
            SqlValue::Text(v) => write!(f, "{}", v),
            SqlValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl SqlType for SqlValue {
    const VALUE_TYPE: ValueType = ValueType::Null;

    fn accepts(_declared: ValueType) -> bool {
        true
    }
}

impl FromColumn for SqlValue {
    fn from_column(value: ValueRef<'_>, index: usize) -> TqlResult<Self> {
        Ok(match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(v) => SqlValue::Integer(v),
            ValueRef::Real(v) => SqlValue::Real(v),
            ValueRef::Text(_) => SqlValue::Text(column_text(value, index)?),
            ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
        })
    }
}

impl ToBind for SqlValue {
    fn to_bind(&self) -> BindValue<'_> {
        match self {
            SqlValue::Null => BindValue::Null,
            SqlValue::Integer(v) => BindValue::Int64(*v),
            SqlValue::Real(v) => BindValue::Double(*v),
            SqlValue::Text(v) => BindValue::Text(Text::Transient(v)),
            SqlValue::Blob(v) => BindValue::Blob(Blob::Transient(v)),
        }
    }
}

impl FromRow for Vec<SqlValue> {
    fn from_row(row: &Row<'_>) -> TqlResult<Self> {
        let count = row.as_ref().column_count();
        (0..count)
            .map(|i| SqlValue::from_column(row.get_ref(i)?, i))
            .collect()
    }
}

macro_rules! tuple_from_row {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: FromColumn),+> FromRow for ($($name,)+) {
            fn from_row(row: &Row<'_>) -> TqlResult<Self> {
                Ok(($($name::from_column(row.get_ref($idx)?, $idx)?,)+))
            }
        }
    };
}

tuple_from_row!(A 0);
tuple_from_row!(A 0, B 1);
tuple_from_row!(A 0, B 1, C 2);
tuple_from_row!(A 0, B 1, C 2, D 3);
tuple_from_row!(A 0, B 1, C 2, D 3, E 4);
tuple_from_row!(A 0, B 1, C 2, D 3, E 4, F 5);
tuple_from_row!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
tuple_from_row!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
tuple_from_row!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8);
tuple_from_row!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths() {
        assert_eq!(i64::from_column(ValueRef::Integer(1 << 40), 0).unwrap(), 1 << 40);
        assert_eq!(i32::from_column(ValueRef::Integer((1 << 32) + 5), 0).unwrap(), 5);
        assert_eq!(u32::from_column(ValueRef::Integer(-1), 0).unwrap(), u32::MAX);
        assert_eq!(u64::from_column(ValueRef::Integer(-1), 0).unwrap(), u64::MAX);
        assert!(bool::from_column(ValueRef::Integer(2), 0).unwrap());
    }

    #[test]
    fn test_null_defaults() {
        assert_eq!(i64::from_column(ValueRef::Null, 0).unwrap(), 0);
        assert_eq!(String::from_column(ValueRef::Null, 0).unwrap(), "");
        assert_eq!(Option::<i64>::from_column(ValueRef::Null, 0).unwrap(), None);
        assert!(Vec::<u32>::from_column(ValueRef::Null, 0).unwrap().is_empty());
    }

    #[test]
    fn test_text_conversions() {
        assert_eq!(String::from_column(ValueRef::Integer(42), 0).unwrap(), "42");
        assert_eq!(f64::from_column(ValueRef::Text(b"2.5"), 0).unwrap(), 2.5);
        assert!(String::from_column(ValueRef::Text(&[0xff, 0xfe]), 3).is_err());
    }

    #[test]
    fn test_fixed_blob_size() {
        let bytes = [1u8, 0, 0, 0, 2, 0, 0, 0];
        let value: [u32; 2] = FromColumn::from_column(ValueRef::Blob(&bytes), 0).unwrap();
        assert_eq!(value, [1, 2]);

        let err = <[u32; 3]>::from_column(ValueRef::Blob(&bytes), 0).unwrap_err();
        assert!(matches!(err, TqlError::BlobSize { expected: 12, actual: 8 }));
    }

    #[test]
    fn test_vector_blob_alignment() {
        let err = Vec::<u32>::from_column(ValueRef::Blob(&[1, 2, 3, 4, 5, 6]), 0).unwrap_err();
        assert!(matches!(err, TqlError::BlobAlignment { size: 6, element: 4 }));
        assert!(Vec::<u32>::from_column(ValueRef::Integer(1), 1).is_err());
    }

    #[test]
    fn test_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let BindValue::Text(text) = date.to_bind() else {
            panic!("dates bind as text");
        };
        let decoded = NaiveDate::from_column(ValueRef::Text(text.as_str().as_bytes()), 0).unwrap();
        assert_eq!(decoded, date);
    }

    #[test]
    fn test_sql_value_json() {
        let row = vec![SqlValue::Integer(1), SqlValue::Text("a".into()), SqlValue::Null];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[1,"a",null]"#);
    }
}
