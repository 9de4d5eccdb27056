use crate::ast::{ColumnList, ColumnRef, Filter, JoinKind, ResultColumns, TableId};
use crate::error::{TqlError, TqlResult};
use crate::query::select::{SelectQuery, decode_into};
use crate::query::{Slot, check_scope};
use crate::row::FromRow;
use crate::schema::Table;

/// The FROM part of a SELECT: a table or a chain of joins.
#[derive(Debug)]
pub enum Relation {
    Table(Table),
    Join(Box<Join>),
}

impl Relation {
    /// Tables in scope, left to right.
    pub fn tables(&self) -> Vec<TableId> {
        match self {
            Relation::Table(table) => vec![table.id()],
            Relation::Join(join) => join.tables(),
        }
    }

    /// The table at the right end of the relation.
    pub(crate) fn rightmost(&self) -> &Table {
        match self {
            Relation::Table(table) => table,
            Relation::Join(join) => &join.right,
        }
    }

    /// ON filters, innermost join first.
    pub(crate) fn filters(&self) -> Vec<&Filter> {
        match self {
            Relation::Table(_) => Vec::new(),
            Relation::Join(join) => join.filters(),
        }
    }

    pub(crate) fn filters_mut(&mut self) -> Vec<&mut Filter> {
        match self {
            Relation::Table(_) => Vec::new(),
            Relation::Join(join) => join.filters_mut(),
        }
    }

    pub(crate) fn into_filters(self, out: &mut Vec<Filter>) {
        if let Relation::Join(join) = self {
            let join = *join;
            join.left.into_filters(out);
            if let Some(JoinConstraint::On(filter)) = join.constraint.into_inner() {
                out.push(filter);
            }
        }
    }
}

#[derive(Debug)]
pub enum JoinConstraint {
    On(Filter),
    Using(Vec<ColumnRef>),
}

/// `left KIND JOIN right [ON ... | USING (...)]`.
#[derive(Debug)]
pub struct Join {
    pub(crate) kind: JoinKind,
    pub(crate) left: Relation,
    pub(crate) right: Table,
    pub(crate) constraint: Slot<JoinConstraint>,
}

impl Join {
    pub(crate) fn new(kind: JoinKind, left: Relation, right: Table) -> Self {
        Self {
            kind,
            left,
            right,
            constraint: Slot::new("join constraint"),
        }
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn tables(&self) -> Vec<TableId> {
        let mut tables = self.left.tables();
        tables.push(self.right.id());
        tables
    }

    /// Constrain the join with an ON expression over the joined tables.
    pub fn on(mut self, filter: Filter) -> TqlResult<Self> {
        if self.kind.is_natural() {
            return Err(TqlError::InvalidJoinConstraint(format!(
                "{} does not take an ON clause",
                self.kind
            )));
        }
        check_scope("on", &self.tables(), filter.columns())?;
        self.constraint.fill(JoinConstraint::On(filter))?;
        Ok(self)
    }

    /// Constrain the join with USING. The columns must be distinct and come
    /// either all from the table directly left of the join or all from the
    /// joined table.
    pub fn using(mut self, columns: impl ColumnList) -> TqlResult<Self> {
        if self.kind.is_natural() {
            return Err(TqlError::InvalidJoinConstraint(format!(
                "{} does not take a USING clause",
                self.kind
            )));
        }
        let columns = columns.column_refs();
        if columns.is_empty() {
            return Err(TqlError::InvalidJoinConstraint(
                "USING needs at least one column".to_string(),
            ));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(TqlError::InvalidJoinConstraint(format!(
                    "duplicate column '{}' in USING",
                    column.name
                )));
            }
        }
        let left = self.left.rightmost().id();
        let right = self.right.id();
        let all_from = |table: TableId| columns.iter().all(|c| c.table == table);
        if !all_from(left) && !all_from(right) {
            return Err(TqlError::InvalidJoinConstraint(format!(
                "USING columns must all belong to {} or all to {}",
                self.left.rightmost().name(),
                self.right.name()
            )));
        }
        self.constraint.fill(JoinConstraint::Using(columns))?;
        Ok(self)
    }

    /// Extend the chain with another table.
    pub fn join(self, kind: JoinKind, table: &Table) -> Join {
        Join::new(kind, Relation::Join(Box::new(self)), table.clone())
    }

    pub fn select<C: ResultColumns>(self, columns: C) -> TqlResult<SelectQuery<C::Row>> {
        SelectQuery::new(
            Relation::Join(Box::new(self)),
            columns.result_exprs(),
            <C::Row as FromRow>::from_row,
        )
    }

    /// Select into any type constructible from the row tuple.
    pub fn select_as<R, C>(self, columns: C) -> TqlResult<SelectQuery<R>>
    where
        C: ResultColumns,
        R: From<C::Row>,
    {
        SelectQuery::new(
            Relation::Join(Box::new(self)),
            columns.result_exprs(),
            decode_into::<C::Row, R>,
        )
    }

    fn filters(&self) -> Vec<&Filter> {
        let mut filters = self.left.filters();
        if let Some(JoinConstraint::On(filter)) = self.constraint.get() {
            filters.push(filter);
        }
        filters
    }

    fn filters_mut(&mut self) -> Vec<&mut Filter> {
        let mut filters = self.left.filters_mut();
        if let Some(JoinConstraint::On(filter)) = self.constraint.get_mut() {
            filters.push(filter);
        }
        filters
    }
}
