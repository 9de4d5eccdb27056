//! Bindable leaves.

use std::fmt;
use std::rc::Rc;

use rusqlite::Statement;

use crate::bind::{BindParameters, Dynamic, DynamicSource, ToBind, bind_value};
use crate::error::TqlResult;

enum ParamSource {
    Fixed(Box<dyn ToBind>),
    Dynamic(Rc<dyn DynamicSource>),
}

/// A value destined for a `?N` placeholder.
///
/// The index is 0 until the query assigns positions.
pub struct Param {
    source: ParamSource,
    index: usize,
}

impl Param {
    pub(crate) fn fixed<T: ToBind + 'static>(value: T) -> Self {
        Self {
            source: ParamSource::Fixed(Box::new(value)),
            index: 0,
        }
    }

    pub(crate) fn dynamic<T: ToBind + 'static>(slot: &Dynamic<T>) -> Self {
        Self {
            source: ParamSource::Dynamic(slot.source()),
            index: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, ParamSource::Dynamic(_))
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Bind this parameter if `which` selects its kind.
    pub(crate) fn bind(&self, stmt: &mut Statement<'_>, which: BindParameters) -> TqlResult<()> {
        match &self.source {
            ParamSource::Fixed(value) if which.fixed() => {
                bind_value(stmt, self.index, value.to_bind())
            }
            ParamSource::Dynamic(slot) if which.dynamic() => {
                let index = self.index;
                slot.with_current(&mut |value| bind_value(stmt, index, value))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ParamSource::Fixed(value) => write!(f, "{}", value.to_bind()),
            ParamSource::Dynamic(slot) => {
                let mut current = String::new();
                let _ = slot.with_current(&mut |value| {
                    current = value.to_string();
                    Ok(())
                });
                write!(f, "dynamic({})", current)
            }
        }
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("index", &self.index)
            .field("value", &self.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_display() {
        let fixed = Param::fixed(String::from("abc"));
        assert_eq!(fixed.to_string(), "'abc'");
        assert!(!fixed.is_dynamic());

        let slot = Dynamic::new(5i64);
        let dynamic = Param::dynamic(&slot);
        slot.set(9);
        assert_eq!(dynamic.to_string(), "dynamic(9)");
        assert!(dynamic.is_dynamic());
        assert_eq!(dynamic.index(), 0);
    }
}
