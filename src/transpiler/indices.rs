//! Parameter index assignment.
//!
//! Indices are handed out in the order placeholders appear in the rendered
//! text, so they must be assigned before rendering. Assigning twice yields
//! the same indices.

use crate::ast::Filter;
use crate::query::{CountQuery, DeleteQuery, SelectQuery, UpdateQuery};

pub(crate) trait AssignIndices {
    fn assign_indices(&mut self, next: &mut usize);
}

impl AssignIndices for Filter {
    fn assign_indices(&mut self, next: &mut usize) {
        for param in self.params_mut() {
            param.set_index(*next);
            *next += 1;
        }
    }
}

impl<R> AssignIndices for SelectQuery<R> {
    fn assign_indices(&mut self, next: &mut usize) {
        for filter in self.filters_mut() {
            filter.assign_indices(next);
        }
    }
}

impl AssignIndices for UpdateQuery {
    fn assign_indices(&mut self, next: &mut usize) {
        // SET values occupy the leading indices.
        *next += self.columns.len();
        if let Some(filter) = self.filter.get_mut() {
            filter.assign_indices(next);
        }
    }
}

impl AssignIndices for DeleteQuery {
    fn assign_indices(&mut self, next: &mut usize) {
        if let Some(filter) = self.filter.get_mut() {
            filter.assign_indices(next);
        }
    }
}

impl AssignIndices for CountQuery {
    fn assign_indices(&mut self, next: &mut usize) {
        if let Some(filter) = self.filter.get_mut() {
            filter.assign_indices(next);
        }
    }
}
