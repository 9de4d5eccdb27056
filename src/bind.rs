//! Binding runtime.
//!
//! Caller values are turned into one of the few primitives SQLite accepts
//! for a parameter: 32-bit integer, 64-bit integer, double, NULL, text or
//! blob. Text and blob payloads carry their ownership contract explicitly:
//!
//! | Variant     | Contract                                                 |
//! |-------------|----------------------------------------------------------|
//! | `Owned`     | buffer is moved into the bind call and dropped after it  |
//! | `Static`    | buffer lives for the whole program                       |
//! | `Transient` | buffer is borrowed for the duration of the bind call     |
//!
//! rusqlite binds every text and blob with `SQLITE_TRANSIENT`, so SQLite
//! takes its own copy of the payload whatever the variant, `Static`
//! included. The variants decide only who owns the buffer up to the bind
//! call. A stored `Owned` payload is lent as `Transient` rather than
//! cloned.
//!
//! Integers of 32 bits or fewer use the 32-bit path, wider ones the 64-bit
//! path. Unsigned values are bit-reinterpreted as the signed type of the same
//! width, so `u64::MAX` is stored as `-1` and decodes back to `u64::MAX`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::ops::BitOr;
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Statement;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use tracing::trace;

use crate::error::{TqlError, TqlResult};

/// Index of the first parameter placeholder.
pub const FIRST_BIND_INDEX: usize = 1;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Text payload with its ownership variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Text<'a> {
    Owned(String),
    Static(&'static str),
    Transient(&'a str),
}

impl Text<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            Text::Owned(s) => s,
            Text::Static(s) => s,
            Text::Transient(s) => s,
        }
    }
}

/// Blob payload with its ownership variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Blob<'a> {
    Owned(Vec<u8>),
    Static(&'static [u8]),
    Transient(&'a [u8]),
}

impl Blob<'_> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Blob::Owned(b) => b,
            Blob::Static(b) => b,
            Blob::Transient(b) => b,
        }
    }
}

/// A primitive parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue<'a> {
    Int32(i32),
    Int64(i64),
    Double(f64),
    Null,
    Text(Text<'a>),
    Blob(Blob<'a>),
}

impl BindValue<'_> {
    /// Short name of the primitive, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BindValue::Int32(_) => "int32",
            BindValue::Int64(_) => "int64",
            BindValue::Double(_) => "double",
            BindValue::Null => "null",
            BindValue::Text(Text::Owned(_)) => "text(owned)",
            BindValue::Text(Text::Static(_)) => "text(static)",
            BindValue::Text(Text::Transient(_)) => "text(transient)",
            BindValue::Blob(Blob::Owned(_)) => "blob(owned)",
            BindValue::Blob(Blob::Static(_)) => "blob(static)",
            BindValue::Blob(Blob::Transient(_)) => "blob(transient)",
        }
    }
}

impl fmt::Display for BindValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindValue::Int32(v) => write!(f, "{}", v),
            BindValue::Int64(v) => write!(f, "{}", v),
            BindValue::Double(v) => write!(f, "{}", v),
            BindValue::Null => write!(f, "NULL"),
            BindValue::Text(t) => write!(f, "'{}'", t.as_str()),
            BindValue::Blob(b) => write!(f, "<{} bytes>", b.as_bytes().len()),
        }
    }
}

impl<'a> BindValue<'a> {
    /// The value as handed to rusqlite. Owned payloads are moved, not
    /// copied.
    pub(crate) fn into_output(self) -> ToSqlOutput<'a> {
        match self {
            BindValue::Int32(v) => ToSqlOutput::Owned(Value::Integer(i64::from(v))),
            BindValue::Int64(v) => ToSqlOutput::Owned(Value::Integer(v)),
            BindValue::Double(v) => ToSqlOutput::Owned(Value::Real(v)),
            BindValue::Null => ToSqlOutput::Owned(Value::Null),
            BindValue::Text(Text::Owned(s)) => ToSqlOutput::Owned(Value::Text(s)),
            BindValue::Text(Text::Static(s)) => {
                ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))
            }
            BindValue::Text(Text::Transient(s)) => {
                ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))
            }
            BindValue::Blob(Blob::Owned(b)) => ToSqlOutput::Owned(Value::Blob(b)),
            BindValue::Blob(Blob::Static(b)) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            BindValue::Blob(Blob::Transient(b)) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        }
    }
}

/// Bind a single primitive at a one-based parameter index.
pub(crate) fn bind_value(
    stmt: &mut Statement<'_>,
    index: usize,
    value: BindValue<'_>,
) -> TqlResult<()> {
    trace!(index, kind = value.kind(), "bind");
    stmt.raw_bind_parameter(index, value.into_output())
        .map_err(|source| TqlError::Bind { index, source })
}

/// Conversion of a caller value into a bind primitive.
pub trait ToBind {
    fn to_bind(&self) -> BindValue<'_>;
}

macro_rules! bind_int32 {
    ($($t:ty),+) => {
        $(
            impl ToBind for $t {
                fn to_bind(&self) -> BindValue<'_> {
                    BindValue::Int32(i32::from(*self))
                }
            }
        )+
    };
}

bind_int32!(i8, i16, i32, u8, u16, bool);

impl ToBind for u32 {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Int32(*self as i32)
    }
}

impl ToBind for i64 {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Int64(*self)
    }
}

macro_rules! bind_int64_cast {
    ($($t:ty),+) => {
        $(
            impl ToBind for $t {
                fn to_bind(&self) -> BindValue<'_> {
                    BindValue::Int64(*self as i64)
                }
            }
        )+
    };
}

bind_int64_cast!(u64, isize, usize);

impl ToBind for f32 {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Double(f64::from(*self))
    }
}

impl ToBind for f64 {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Double(*self)
    }
}

impl ToBind for str {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Text(Text::Transient(self))
    }
}

impl ToBind for String {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Text(Text::Transient(self))
    }
}

/// A stored owned buffer is lent for the bind, so binding it repeatedly
/// never reallocates.
impl ToBind for Text<'_> {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Text(match self {
            Text::Owned(s) => Text::Transient(s.as_str()),
            Text::Static(s) => Text::Static(*s),
            Text::Transient(s) => Text::Transient(*s),
        })
    }
}

impl ToBind for Blob<'_> {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Blob(match self {
            Blob::Owned(b) => Blob::Transient(b.as_slice()),
            Blob::Static(b) => Blob::Static(*b),
            Blob::Transient(b) => Blob::Transient(*b),
        })
    }
}

/// A fixed-width value that can be packed into a blob.
///
/// Elements are stored little-endian and back to back.
pub trait BlobElement: Copy + 'static {
    const SIZE: usize;

    fn write(self, out: &mut Vec<u8>);

    /// Decode one element from exactly `SIZE` bytes.
    fn read(bytes: &[u8]) -> Self;

    fn encode_slice(values: &[Self]) -> Cow<'_, [u8]> {
        let mut out = Vec::with_capacity(values.len() * Self::SIZE);
        for value in values {
            value.write(&mut out);
        }
        Cow::Owned(out)
    }

    fn decode_slice(bytes: &[u8]) -> Vec<Self> {
        bytes.chunks_exact(Self::SIZE).map(Self::read).collect()
    }
}

impl BlobElement for u8 {
    const SIZE: usize = 1;

    fn write(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn encode_slice(values: &[Self]) -> Cow<'_, [u8]> {
        Cow::Borrowed(values)
    }

    fn decode_slice(bytes: &[u8]) -> Vec<Self> {
        bytes.to_vec()
    }
}

macro_rules! blob_element {
    ($($t:ty),+) => {
        $(
            impl BlobElement for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn write(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }
            }
        )+
    };
}

blob_element!(i8, i16, u16, i32, u32, i64, u64, f32, f64);

fn blob_of<T: BlobElement>(values: &[T]) -> BindValue<'_> {
    BindValue::Blob(match T::encode_slice(values) {
        Cow::Borrowed(bytes) => Blob::Transient(bytes),
        Cow::Owned(bytes) => Blob::Owned(bytes),
    })
}

impl<T: BlobElement> ToBind for [T] {
    fn to_bind(&self) -> BindValue<'_> {
        blob_of(self)
    }
}

impl<T: BlobElement> ToBind for Vec<T> {
    fn to_bind(&self) -> BindValue<'_> {
        blob_of(self)
    }
}

impl<T: BlobElement, const N: usize> ToBind for [T; N] {
    fn to_bind(&self) -> BindValue<'_> {
        blob_of(self)
    }
}

impl<T: ToBind> ToBind for Option<T> {
    fn to_bind(&self) -> BindValue<'_> {
        match self {
            Some(value) => value.to_bind(),
            None => BindValue::Null,
        }
    }
}

impl<T: ToBind + ?Sized> ToBind for &T {
    fn to_bind(&self) -> BindValue<'_> {
        (**self).to_bind()
    }
}

impl<T: ToBind + ?Sized> ToBind for Box<T> {
    fn to_bind(&self) -> BindValue<'_> {
        (**self).to_bind()
    }
}

/// The SQL NULL literal.
///
/// Compared with `eq`/`ne` it renders `IS NULL`/`IS NOT NULL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Null;

impl ToBind for Null {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Null
    }
}

impl ToBind for NaiveDate {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Text(Text::Owned(self.format(DATE_FORMAT).to_string()))
    }
}

impl ToBind for NaiveDateTime {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Text(Text::Owned(self.format(DATETIME_FORMAT).to_string()))
    }
}

impl ToBind for DateTime<Utc> {
    fn to_bind(&self) -> BindValue<'_> {
        BindValue::Text(Text::Owned(self.to_rfc3339()))
    }
}

/// A re-bindable parameter location.
///
/// Clones share the same slot. The value is sampled every time dynamic
/// parameters are bound; an empty slot binds NULL.
///
/// ```
/// use tql::bind::Dynamic;
///
/// let id = Dynamic::new(20);
/// let alias = id.clone();
/// alias.set(30);
/// assert_eq!(id.get(), Some(30));
/// ```
pub struct Dynamic<T>(Rc<RefCell<Option<T>>>);

impl<T> Dynamic<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(Some(value))))
    }

    /// A slot that binds NULL until set.
    pub fn empty() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = Some(value);
    }

    pub fn clear(&self) {
        *self.0.borrow_mut() = None;
    }

    /// Replace the current value, returning the previous one.
    pub fn replace(&self, value: Option<T>) -> Option<T> {
        std::mem::replace(&mut *self.0.borrow_mut(), value)
    }
}

impl<T: Clone> Dynamic<T> {
    pub fn get(&self) -> Option<T> {
        self.0.borrow().clone()
    }
}

impl<T: ToBind + 'static> Dynamic<T> {
    pub(crate) fn source(&self) -> Rc<dyn DynamicSource> {
        self.0.clone()
    }
}

impl<T> Clone for Dynamic<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Dynamic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dynamic").field(&*self.0.borrow()).finish()
    }
}

impl<T: Default> Default for Dynamic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Type-erased view of a dynamic slot.
pub(crate) trait DynamicSource {
    fn with_current(&self, f: &mut dyn FnMut(BindValue<'_>) -> TqlResult<()>) -> TqlResult<()>;
}

impl<T: ToBind> DynamicSource for RefCell<Option<T>> {
    fn with_current(&self, f: &mut dyn FnMut(BindValue<'_>) -> TqlResult<()>) -> TqlResult<()> {
        let current = self.borrow();
        match current.as_ref() {
            Some(value) => f(value.to_bind()),
            None => f(BindValue::Null),
        }
    }
}

/// Which parameters a bind call touches.
///
/// ```
/// use tql::bind::BindParameters;
///
/// let both = BindParameters::FIXED | BindParameters::DYNAMIC;
/// assert_eq!(both, BindParameters::ALL);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindParameters(u8);

impl BindParameters {
    pub const NONE: Self = Self(0);
    pub const FIXED: Self = Self(1);
    pub const DYNAMIC: Self = Self(2);
    pub const ALL: Self = Self(3);

    pub fn fixed(self) -> bool {
        self.0 & Self::FIXED.0 != 0
    }

    pub fn dynamic(self) -> bool {
        self.0 & Self::DYNAMIC.0 != 0
    }
}

impl BitOr for BindParameters {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A row of values for INSERT and UPDATE, bound positionally.
pub trait BindRow {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bind_row(&self, stmt: &mut Statement<'_>, first: usize) -> TqlResult<()>;
}

impl BindRow for () {
    fn len(&self) -> usize {
        0
    }

    fn bind_row(&self, _stmt: &mut Statement<'_>, _first: usize) -> TqlResult<()> {
        Ok(())
    }
}

impl<T: ToBind> BindRow for [T] {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn bind_row(&self, stmt: &mut Statement<'_>, first: usize) -> TqlResult<()> {
        for (offset, value) in self.iter().enumerate() {
            bind_value(stmt, first + offset, value.to_bind())?;
        }
        Ok(())
    }
}

impl<T: ToBind> BindRow for Vec<T> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn bind_row(&self, stmt: &mut Statement<'_>, first: usize) -> TqlResult<()> {
        self.as_slice().bind_row(stmt, first)
    }
}

impl<T: BindRow + ?Sized> BindRow for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn bind_row(&self, stmt: &mut Statement<'_>, first: usize) -> TqlResult<()> {
        (**self).bind_row(stmt, first)
    }
}

macro_rules! tuple_bind_row {
    ($len:expr; $($name:ident $idx:tt),+) => {
        impl<$($name: ToBind),+> BindRow for ($($name,)+) {
            fn len(&self) -> usize {
                $len
            }

            fn bind_row(&self, stmt: &mut Statement<'_>, first: usize) -> TqlResult<()> {
                $(bind_value(stmt, first + $idx, self.$idx.to_bind())?;)+
                Ok(())
            }
        }
    };
}

tuple_bind_row!(1; A 0);
tuple_bind_row!(2; A 0, B 1);
tuple_bind_row!(3; A 0, B 1, C 2);
tuple_bind_row!(4; A 0, B 1, C 2, D 3);
tuple_bind_row!(5; A 0, B 1, C 2, D 3, E 4);
tuple_bind_row!(6; A 0, B 1, C 2, D 3, E 4, F 5);
tuple_bind_row!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
tuple_bind_row!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
tuple_bind_row!(9; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8);
tuple_bind_row!(10; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9);
