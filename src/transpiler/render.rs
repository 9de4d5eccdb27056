//! One rendering rule per node and statement kind.

use crate::ast::{
    AggregateExpr, ColumnRef, CompareValue, Filter, OrderBy, OrderTerm, ResultExpr,
};
use crate::query::{
    CountQuery, DeleteQuery, InsertQuery, Join, JoinConstraint, Limit, Relation, SelectQuery,
    Slot, UpdateQuery,
};
use crate::schema::Table;
use crate::transpiler::{ToSql, escape_identifier};

impl ToSql for ColumnRef {
    fn to_sql(&self) -> String {
        self.qualified()
    }
}

impl ToSql for AggregateExpr {
    fn to_sql(&self) -> String {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        format!("{}({}{})", self.func, distinct, self.column.to_sql())
    }
}

impl ToSql for ResultExpr {
    fn to_sql(&self) -> String {
        match self {
            ResultExpr::Column(column) => column.to_sql(),
            ResultExpr::Aggregate(aggregate) => aggregate.to_sql(),
        }
    }
}

impl ToSql for Filter {
    fn to_sql(&self) -> String {
        match self {
            Filter::Comparison {
                op,
                expr,
                value: CompareValue::Param(param),
                value_first,
            } => {
                if *value_first {
                    format!("?{} {} {}", param.index(), op, expr.to_sql())
                } else {
                    format!("{} {} ?{}", expr.to_sql(), op, param.index())
                }
            }
            Filter::Comparison {
                op,
                expr,
                value: CompareValue::Null,
                value_first,
            } => match op.null_form() {
                Some(form) => format!("{} {}", expr.to_sql(), form),
                None if *value_first => format!("NULL {} {}", op, expr.to_sql()),
                None => format!("{} {} NULL", expr.to_sql(), op),
            },
            Filter::Columns { op, left, right } => {
                format!("{} {} {}", left.to_sql(), op, right.to_sql())
            }
            Filter::Like { column, pattern } => {
                format!("{} LIKE ?{}", column.to_sql(), pattern.index())
            }
            Filter::Logical { op, left, right } => {
                format!("({} {} {})", left.to_sql(), op, right.to_sql())
            }
        }
    }
}

impl ToSql for OrderTerm {
    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.expr.to_sql(), self.order);
        if let Some(nulls) = self.nulls.as_str() {
            sql.push(' ');
            sql.push_str(nulls);
        }
        sql
    }
}

impl ToSql for OrderBy {
    fn to_sql(&self) -> String {
        let terms: Vec<String> = self.terms.iter().map(|t| t.to_sql()).collect();
        terms.join(", ")
    }
}

impl ToSql for Limit {
    fn to_sql(&self) -> String {
        format!("LIMIT {} OFFSET {}", self.limit, self.offset)
    }
}

impl ToSql for Table {
    fn to_sql(&self) -> String {
        escape_identifier(self.name())
    }
}

impl ToSql for Join {
    fn to_sql(&self) -> String {
        let mut sql = format!(
            "{} {} {}",
            self.left.to_sql(),
            self.kind,
            self.right.to_sql()
        );
        match self.constraint.get() {
            Some(JoinConstraint::On(filter)) => {
                sql.push_str(" ON ");
                sql.push_str(&filter.to_sql());
            }
            Some(JoinConstraint::Using(columns)) => {
                sql.push_str(" USING (");
                sql.push_str(&bare_names(columns));
                sql.push(')');
            }
            None => {}
        }
        sql
    }
}

impl ToSql for Relation {
    fn to_sql(&self) -> String {
        match self {
            Relation::Table(table) => table.to_sql(),
            Relation::Join(join) => join.to_sql(),
        }
    }
}

/// Column names without their table, for INSERT, UPDATE and USING lists.
fn bare_names(columns: &[ColumnRef]) -> String {
    columns
        .iter()
        .map(|c| escape_identifier(c.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_clause<T: ToSql>(sql: &mut String, keyword: &str, slot: &Slot<T>) {
    if let Some(value) = slot.get() {
        sql.push(' ');
        sql.push_str(keyword);
        sql.push_str(&value.to_sql());
    }
}

impl<R> ToSql for SelectQuery<R> {
    fn to_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.to_sql()).collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            self.relation.to_sql()
        );
        push_clause(&mut sql, "WHERE ", &self.filter);
        if let Some(groups) = self.group_by.get() {
            let groups: Vec<String> = groups.iter().map(|c| c.to_sql()).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&groups.join(", "));
        }
        push_clause(&mut sql, "HAVING ", &self.having);
        if let Some(union) = self.union.get() {
            sql.push(' ');
            sql.push_str(union.op.as_str());
            sql.push(' ');
            sql.push_str(&union.query.to_sql());
        }
        push_clause(&mut sql, "ORDER BY ", &self.order_by);
        push_clause(&mut sql, "", &self.limit);
        sql
    }
}

impl ToSql for InsertQuery {
    fn to_sql(&self) -> String {
        if self.columns.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES", self.table.to_sql());
        }
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table.to_sql(),
            bare_names(&self.columns),
            placeholders(crate::bind::FIRST_BIND_INDEX, self.columns.len())
        )
    }
}

impl ToSql for UpdateQuery {
    fn to_sql(&self) -> String {
        let mut sql = format!(
            "UPDATE {} SET ({}) = ({})",
            self.table.to_sql(),
            bare_names(&self.columns),
            placeholders(crate::bind::FIRST_BIND_INDEX, self.columns.len())
        );
        push_clause(&mut sql, "WHERE ", &self.filter);
        push_clause(&mut sql, "ORDER BY ", &self.order_by);
        push_clause(&mut sql, "", &self.limit);
        sql
    }
}

impl ToSql for DeleteQuery {
    fn to_sql(&self) -> String {
        let mut sql = format!("DELETE FROM {}", self.table.to_sql());
        push_clause(&mut sql, "WHERE ", &self.filter);
        push_clause(&mut sql, "ORDER BY ", &self.order_by);
        push_clause(&mut sql, "", &self.limit);
        sql
    }
}

impl ToSql for CountQuery {
    fn to_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table.to_sql());
        push_clause(&mut sql, "WHERE ", &self.filter);
        sql
    }
}
