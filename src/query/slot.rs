use crate::error::{TqlError, TqlResult};

/// An at-most-once clause holder.
#[derive(Debug)]
pub(crate) struct Slot<T> {
    clause: &'static str,
    value: Option<T>,
}

impl<T> Slot<T> {
    pub(crate) fn new(clause: &'static str) -> Self {
        Self {
            clause,
            value: None,
        }
    }

    pub(crate) fn clause(&self) -> &'static str {
        self.clause
    }

    /// Fill the slot; a second fill is rejected.
    pub(crate) fn fill(&mut self, value: T) -> TqlResult<()> {
        if self.value.is_some() {
            return Err(TqlError::ClauseAlreadySet {
                clause: self.clause,
            });
        }
        self.value = Some(value);
        Ok(())
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    pub(crate) fn into_inner(self) -> Option<T> {
        self.value
    }
}
