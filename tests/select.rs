use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use tql::prelude::*;

fn setup() -> Database {
    let db = Database::open_in_memory().expect("open");
    db.execute_batch("CREATE TABLE t (col1 INTEGER, col2 REAL, col3 TEXT)")
        .expect("schema");
    {
        let t = db.table("t").unwrap();
        let col1 = t.column::<i32>("col1").unwrap();
        let col2 = t.column::<f64>("col2").unwrap();
        let col3 = t.column::<String>("col3").unwrap();
        let mut insert = t
            .insert((&col1, &col2, &col3))
            .unwrap()
            .compile(&db)
            .expect("compile insert");
        insert.execute((10, 20.0, "abc")).unwrap();
        insert.execute((20, 40.5, "def")).unwrap();
        insert.execute((30, 80.2, "ghi")).unwrap();
    }
    db
}

#[test]
fn test_dynamic_rebind() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();
    let col2 = t.column::<f64>("col2").unwrap();
    let col3 = t.column::<String>("col3").unwrap();

    let key = Dynamic::new(20i32);
    let mut stmt = t
        .select((&col1, &col2, &col3))
        .unwrap()
        .filter(col1.eq(&key))
        .unwrap()
        .compile(&db)
        .expect("compile");
    assert_eq!(
        stmt.sql(),
        "SELECT t.col1, t.col2, t.col3 FROM t WHERE t.col1 = ?1"
    );

    stmt.bind(BindParameters::DYNAMIC).unwrap();
    assert_eq!(
        stmt.fetch_all().unwrap(),
        vec![(20, 40.5, "def".to_string())]
    );

    key.set(30);
    stmt.bind(BindParameters::DYNAMIC).unwrap();
    assert_eq!(
        stmt.fetch_all().unwrap(),
        vec![(30, 80.2, "ghi".to_string())]
    );
}

#[test]
fn test_fixed_and_dynamic_bound_separately() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();

    let lower = Dynamic::new(0i32);
    let mut stmt = t
        .select((&col1,))
        .unwrap()
        .filter(col1.gt(&lower) & col1.lt(25))
        .unwrap()
        .order_by(col1.asc())
        .unwrap()
        .compile(&db)
        .unwrap();
    stmt.bind(BindParameters::ALL).unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), vec![(10,), (20,)]);

    // Rebinding only fixed parameters leaves the old dynamic value in place.
    lower.set(15);
    stmt.bind(BindParameters::FIXED).unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), vec![(10,), (20,)]);

    stmt.bind(BindParameters::DYNAMIC).unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), vec![(20,)]);

    // An empty slot binds NULL, which matches nothing.
    lower.clear();
    stmt.bind(BindParameters::DYNAMIC).unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), Vec::<(i32,)>::new());
}

#[test]
fn test_unbound_parameters_are_null() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();
    let mut stmt = t
        .select((&col1,))
        .unwrap()
        .filter(col1.eq(10))
        .unwrap()
        .compile(&db)
        .unwrap();
    assert!(stmt.fetch_all().unwrap().is_empty());
    stmt.bind(BindParameters::NONE).unwrap();
    assert!(stmt.fetch_all().unwrap().is_empty());
    stmt.bind(BindParameters::FIXED).unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), vec![(10,)]);
}

#[test]
fn test_order_limit_offset() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i64>("col1").unwrap();
    let mut query = t
        .select((&col1,))
        .unwrap()
        .order_by(col1.desc())
        .unwrap()
        .limit_offset(2, 1)
        .unwrap();
    assert_eq!(
        query.sql(),
        "SELECT t.col1 FROM t ORDER BY t.col1 DESC LIMIT 2 OFFSET 1"
    );
    let mut stmt = query.compile(&db).unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), vec![(20,), (10,)]);
}

#[test]
fn test_select_one() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();
    let col3 = t.column::<String>("col3").unwrap();

    let mut one = t
        .select((&col3,))
        .unwrap()
        .filter(col1.eq(20))
        .unwrap()
        .compile_one(&db)
        .unwrap();
    one.bind(BindParameters::ALL).unwrap();
    assert_eq!(one.get().unwrap(), ("def".to_string(),));
    // Reusable after a successful get.
    assert_eq!(one.get().unwrap(), ("def".to_string(),));

    let mut none = t
        .select((&col3,))
        .unwrap()
        .filter(col1.gt(100))
        .unwrap()
        .compile_one(&db)
        .unwrap();
    none.bind(BindParameters::ALL).unwrap();
    let err = none.get().unwrap_err();
    assert!(matches!(err, TqlError::NoResult));
    assert_eq!(err.to_string(), "Select returned no result");

    let mut many = t
        .select((&col3,))
        .unwrap()
        .filter(col1.gt(0))
        .unwrap()
        .compile_one(&db)
        .unwrap();
    many.bind(BindParameters::ALL).unwrap();
    let err = many.get().unwrap_err();
    assert!(matches!(err, TqlError::MultipleResults));
    assert_eq!(err.to_string(), "More than one result returned");
}

#[test]
fn test_null_comparisons() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<Option<i32>>("col1").unwrap();
    let col3 = t.column::<Option<String>>("col3").unwrap();

    let mut insert = t.insert((&col1, &col3)).unwrap().compile(&db).unwrap();
    insert.execute((40, Option::<String>::None)).unwrap();

    let mut query = t
        .select((&col1, &col3))
        .unwrap()
        .filter(col3.is_null() | col1.lt(Null))
        .unwrap();
    assert_eq!(
        query.sql(),
        "SELECT t.col1, t.col3 FROM t WHERE (t.col3 IS NULL OR t.col1 < NULL)"
    );
    assert!(query.parameters().is_empty());

    let mut stmt = query.compile(&db).unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), vec![(Some(40), None)]);
}

#[test]
fn test_like_and_reversed_compare() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();
    let col3 = t.column::<String>("col3").unwrap();

    let mut stmt = t
        .select((&col3,))
        .unwrap()
        .filter(col3.like("%h%") | col1.compare_rev(15, ComparisonOp::Gt))
        .unwrap()
        .order_by(col3.asc())
        .unwrap()
        .compile(&db)
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT t.col3 FROM t WHERE (t.col3 LIKE ?1 OR ?2 > t.col1) ORDER BY t.col3 ASC"
    );
    stmt.bind(BindParameters::ALL).unwrap();
    assert_eq!(
        stmt.fetch_all().unwrap(),
        vec![("abc".to_string(),), ("ghi".to_string(),)]
    );
}

#[test]
fn test_select_all_untyped() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();
    let mut stmt = t
        .select_all()
        .unwrap()
        .filter(col1.eq(10))
        .unwrap()
        .compile(&db)
        .unwrap();
    stmt.bind(BindParameters::ALL).unwrap();
    assert_eq!(
        stmt.fetch_all().unwrap(),
        vec![vec![
            SqlValue::Integer(10),
            SqlValue::Real(20.0),
            SqlValue::Text("abc".to_string()),
        ]]
    );
}

#[derive(Debug, PartialEq)]
struct Entry {
    key: i32,
    label: String,
}

impl From<(i32, String)> for Entry {
    fn from((key, label): (i32, String)) -> Self {
        Self { key, label }
    }
}

#[test]
fn test_select_as() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();
    let col3 = t.column::<String>("col3").unwrap();
    let mut stmt = t
        .select_as::<Entry, _>((&col1, &col3))
        .unwrap()
        .order_by(col1.asc())
        .unwrap()
        .limit(1)
        .unwrap()
        .compile(&db)
        .unwrap();
    assert_eq!(
        stmt.fetch_all().unwrap(),
        vec![Entry {
            key: 10,
            label: "abc".to_string(),
        }]
    );
}

#[test]
fn test_group_by_having() {
    let db = Database::open_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE sales (region TEXT, amount INTEGER);
         INSERT INTO sales VALUES ('north', 10), ('north', 20), ('south', 5);",
    )
    .unwrap();
    let sales = db.table("sales").unwrap();
    let region = sales.column::<String>("region").unwrap();
    let amount = sales.column::<i64>("amount").unwrap();

    let mut query = sales
        .select((&region, count(&amount), sum(&amount)))
        .unwrap()
        .group_by(&region)
        .unwrap()
        .having(sum(&amount).gt(10))
        .unwrap();
    assert_eq!(
        query.sql(),
        "SELECT sales.region, COUNT(sales.amount), SUM(sales.amount) FROM sales \
         GROUP BY sales.region HAVING SUM(sales.amount) > ?1"
    );
    let mut stmt = query.compile(&db).unwrap();
    stmt.bind(BindParameters::ALL).unwrap();
    assert_eq!(
        stmt.fetch_all().unwrap(),
        vec![("north".to_string(), 2, 30)]
    );
}

#[test]
fn test_distinct_aggregate() {
    let db = Database::open_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE visits (page TEXT);
         INSERT INTO visits VALUES ('a'), ('a'), ('b');",
    )
    .unwrap();
    let visits = db.table("visits").unwrap();
    let page = visits.column::<String>("page").unwrap();

    let mut one = visits
        .select((count(&page).distinct(),))
        .unwrap()
        .compile_one(&db)
        .unwrap();
    assert_eq!(one.sql(), "SELECT COUNT(DISTINCT visits.page) FROM visits");
    assert_eq!(one.get().unwrap(), (2,));
}

#[test]
fn test_union() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();

    let low = t.select((&col1,)).unwrap().filter(col1.lt(15)).unwrap();
    let high = t.select((&col1,)).unwrap().filter(col1.gt(25)).unwrap();
    let mut query = low.unions(UnionOp::Union, high).unwrap();
    assert_eq!(
        query.sql(),
        "SELECT t.col1 FROM t WHERE t.col1 < ?1 UNION SELECT t.col1 FROM t WHERE t.col1 > ?2"
    );

    let mut stmt = query.compile(&db).unwrap();
    stmt.bind(BindParameters::ALL).unwrap();
    let mut rows = stmt.fetch_all().unwrap();
    rows.sort();
    assert_eq!(rows, vec![(10,), (30,)]);
}

#[test]
fn test_iteration_can_be_abandoned() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();
    let mut stmt = t
        .select((&col1,))
        .unwrap()
        .order_by(col1.asc())
        .unwrap()
        .compile(&db)
        .unwrap();

    let first = stmt.begin().unwrap().next().unwrap().unwrap();
    assert_eq!(first, (10,));

    let rows: Vec<(i32,)> = stmt.begin().unwrap().map(Result::unwrap).collect();
    assert_eq!(rows, vec![(10,), (20,), (30,)]);
}

#[test]
fn test_limit_out_of_range() {
    let db = setup();
    let t = db.table("t").unwrap();
    let col1 = t.column::<i32>("col1").unwrap();

    let err = t.select((&col1,)).unwrap().limit(u64::MAX).err().unwrap();
    assert!(err.is_construction());
    assert!(matches!(
        err,
        TqlError::LimitOutOfRange {
            clause: "limit",
            value: u64::MAX
        }
    ));

    let err = t
        .select((&col1,))
        .unwrap()
        .limit_offset(1, Limit::MAX + 1)
        .err()
        .unwrap();
    assert!(matches!(err, TqlError::LimitOutOfRange { clause: "offset", .. }));

    let mut stmt = t
        .select((&col1,))
        .unwrap()
        .order_by(col1.asc())
        .unwrap()
        .limit_offset(Limit::MAX, 1)
        .unwrap()
        .compile(&db)
        .unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), vec![(20,), (30,)]);
}

#[test]
fn test_step_error_mid_iteration() {
    let db = Database::open_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE n (id INTEGER, v INTEGER);
         INSERT INTO n VALUES (1, 5), (2, -9223372036854775808), (3, 7);
         CREATE VIEW nv AS SELECT id, abs(v) AS a FROM n;",
    )
    .unwrap();
    let nv = db.table("nv").unwrap();
    let id = nv.column::<i64>("id").unwrap();
    let a = nv.column::<i64>("a").unwrap();

    let upper = Dynamic::new(3i64);
    let mut stmt = nv
        .select((&id, &a))
        .unwrap()
        .filter(id.lt(&upper))
        .unwrap()
        .compile(&db)
        .unwrap();
    stmt.bind(BindParameters::DYNAMIC).unwrap();

    {
        let mut rows = stmt.begin().unwrap();
        assert_eq!(rows.next().unwrap().unwrap(), (1, 5));
        // abs() of the smallest integer overflows on the second row.
        let err = rows.next().unwrap().unwrap_err();
        assert!(matches!(err, TqlError::Step { .. }));
        assert_eq!(rows.state(), IterState::Exhausted);
        assert!(rows.next().is_none());
    }

    upper.set(2);
    stmt.bind(BindParameters::DYNAMIC).unwrap();
    assert_eq!(stmt.fetch_all().unwrap(), vec![(1, 5)]);
}

#[test]
fn test_filter_tables() {
    let db = Database::open_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE users (id INTEGER, name TEXT);
         CREATE TABLE posts (id INTEGER, user_id INTEGER);",
    )
    .unwrap();
    let users = db.table("users").unwrap();
    let posts = db.table("posts").unwrap();
    let name = users.column::<String>("name").unwrap();
    let user_id = users.column::<i64>("id").unwrap();
    let author = posts.column::<i64>("user_id").unwrap();

    let local = name.like("a%");
    assert_eq!(local.tables(), BTreeSet::from([users.id()]));
    assert!(local.contains_tables(&[users.id()]));
    assert!(!local.contains_tables(&[posts.id()]));

    let across = name.eq("ada") & author.eq_col(&user_id);
    assert_eq!(across.tables(), BTreeSet::from([users.id(), posts.id()]));
    assert!(!across.contains_tables(&[users.id()]));
    assert!(across.contains_tables(&[posts.id(), users.id()]));

    // A query rejects the same filter its relation does not cover.
    let err = users.select((&name,)).unwrap().filter(across).err().unwrap();
    assert!(matches!(err, TqlError::TableNotInScope { .. }));
}

#[test]
fn test_select_all_ordering() {
    let db = Database::open_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE o (col0 INTEGER, col1 INTEGER);
         INSERT INTO o VALUES (0, 0), (1, -1), (2, -2);",
    )
    .unwrap();
    let o = db.table("o").unwrap();
    let col0 = o.column::<i64>("col0").unwrap();
    let col1 = o.column::<i64>("col1").unwrap();
    let row = |a: i64, b: i64| vec![SqlValue::Integer(a), SqlValue::Integer(b)];

    let mut ascending = o
        .select_all()
        .unwrap()
        .order_by(col0.asc())
        .unwrap()
        .compile(&db)
        .unwrap();
    assert_eq!(
        ascending.sql(),
        "SELECT o.col0, o.col1 FROM o ORDER BY o.col0 ASC"
    );
    assert_eq!(
        ascending.fetch_all().unwrap(),
        vec![row(0, 0), row(1, -1), row(2, -2)]
    );

    let mut descending = o
        .select_all()
        .unwrap()
        .order_by(col0.desc())
        .unwrap()
        .compile(&db)
        .unwrap();
    assert_eq!(
        descending.fetch_all().unwrap(),
        vec![row(2, -2), row(1, -1), row(0, 0)]
    );

    let mut by_second = o
        .select_all()
        .unwrap()
        .order_by(col1.asc())
        .unwrap()
        .compile(&db)
        .unwrap();
    assert_eq!(
        by_second.fetch_all().unwrap(),
        vec![row(2, -2), row(1, -1), row(0, 0)]
    );
}
