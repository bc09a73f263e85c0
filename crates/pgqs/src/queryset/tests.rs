use super::*;
use crate::column::F;
use crate::model::{FieldDef, ForeignKey};
use crate::q;
use crate::record::Record;
use crate::value::Value;
use crate::window::Window;

fn table(name: &str) -> Arc<TableDef> {
    Arc::new(
        TableDef::new(
            name,
            [
                FieldDef::serial("id"),
                FieldDef::new("name", "TEXT").not_null(),
                FieldDef::new("status", "TEXT").default_value("draft"),
                FieldDef::new("note", "TEXT"),
            ],
        )
        .unwrap(),
    )
}

fn books() -> Arc<TableDef> {
    Arc::new(
        TableDef::new(
            "books",
            [
                FieldDef::serial("id"),
                FieldDef::new("name", "TEXT").not_null(),
                FieldDef::new("status", "TEXT"),
                FieldDef::new("created_at", "TIMESTAMPTZ"),
                FieldDef::new("author_id", "INTEGER").references(ForeignKey::to("authors")),
            ],
        )
        .unwrap(),
    )
}

fn t() -> QuerySet {
    QuerySet::new(table("t"))
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn select_filter_order_limit() {
    let built = QuerySet::new(books())
        .select(["id", "name"])
        .filter(q!(status = "published"))
        .order_by(["-created_at"])
        .limit(10)
        .to_sql()
        .unwrap();

    assert_eq!(
        built.sql,
        "SELECT books.id, books.name FROM books WHERE (books.status = $1) \
         ORDER BY books.created_at DESC LIMIT 10"
    );
    assert_eq!(built.params, vec![text("published")]);
}

#[test]
fn default_select_is_star() {
    assert_eq!(t().to_sql().unwrap().sql, "SELECT * FROM t");
}

#[test]
fn or_filter_numbers_left_to_right() {
    let built = t()
        .filter(q!(status = "a") | Q::lookup("id__gte", 4))
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT * FROM t WHERE ((t.status = $1) OR (t.id >= $2))"
    );
    assert_eq!(built.params, vec![text("a"), Value::Int(4)]);
}

#[test]
fn separate_filters_are_anded() {
    let built = t()
        .filter(q!(status = "a"))
        .filter(q!(id__lt = 9))
        .filter("t.note IS NOT NULL")
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT * FROM t WHERE (t.status = $1) AND (t.id < $2) AND (t.note IS NOT NULL)"
    );
}

#[test]
fn empty_top_level_filter_is_skipped() {
    let built = t().filter(Q::new()).to_sql().unwrap();
    assert_eq!(built.sql, "SELECT * FROM t");
    assert!(built.params.is_empty());
}

#[test]
fn exclude_negates() {
    let built = t().exclude(q!(status = "gone")).to_sql().unwrap();
    assert_eq!(built.sql, "SELECT * FROM t WHERE (NOT (t.status = $1))");
}

#[test]
fn compiling_is_deterministic() {
    let qs = t().filter(q!(name__icontains = "x", id__in = [1, 2, 3]));
    let a = qs.to_sql().unwrap();
    let b = qs.to_sql().unwrap();
    assert_eq!(a, b);
    assert_eq!(
        a.sql,
        "SELECT * FROM t WHERE ((t.name ILIKE $1) AND (t.id IN ($2, $3, $4)))"
    );
    assert_eq!(a.params[0], text("%x%"));
}

#[test]
fn chaining_leaves_source_untouched() {
    let base = t().filter(q!(status = "a"));
    let before = base.to_sql().unwrap();

    let narrowed = base.clone().filter(q!(id = 1)).order_by(["name"]).limit(3);
    let other = base.clone().for_update(false, false);

    assert_eq!(base.to_sql().unwrap(), before);
    assert_eq!(
        narrowed.to_sql().unwrap().sql,
        "SELECT * FROM t WHERE (t.status = $1) AND (t.id = $2) ORDER BY t.name ASC LIMIT 3"
    );
    assert_eq!(
        other.to_sql().unwrap().sql,
        "SELECT * FROM t WHERE (t.status = $1) FOR UPDATE"
    );
}

#[test]
fn clause_order_does_not_depend_on_call_order() {
    let a = t()
        .for_update(false, true)
        .offset(20)
        .limit(5)
        .order_by(["name"])
        .filter(q!(id = 1));
    let b = t()
        .filter(q!(id = 1))
        .order_by(["name"])
        .limit(5)
        .offset(20)
        .for_update(false, true);

    let built = a.to_sql().unwrap();
    assert_eq!(built, b.to_sql().unwrap());
    assert_eq!(
        built.sql,
        "SELECT * FROM t WHERE (t.id = $1) ORDER BY t.name ASC LIMIT 5 OFFSET 20 FOR UPDATE SKIP LOCKED"
    );
}

#[test]
fn every_clause_renders_in_fixed_order() {
    let initial = || Expression::new("SELECT id FROM t WHERE id = ?", [1]).unwrap();
    let recursive = "SELECT t.id FROM t JOIN tree ON t.note = tree.id";
    let having = || Expression::new("COUNT(*) > ?", [2]).unwrap();

    let a = t()
        .with_recursive("tree", initial(), recursive)
        .unwrap()
        .filter(q!(status = "a"))
        .select(["status", "COUNT(*)"])
        .group_by(["status"])
        .having([having()])
        .window("w", ["status"], ["-id"])
        .order_by(["status"])
        .limit(5)
        .for_update(false, false);
    let b = t()
        .for_update(false, false)
        .limit(5)
        .order_by(["status"])
        .window("w", ["status"], ["-id"])
        .having([having()])
        .group_by(["status"])
        .select(["status", "COUNT(*)"])
        .filter(q!(status = "a"))
        .with_recursive("tree", initial(), recursive)
        .unwrap();

    let built = a.to_sql().unwrap();
    assert_eq!(built, b.to_sql().unwrap());
    assert_eq!(
        built.sql,
        "WITH RECURSIVE tree AS (SELECT id FROM t WHERE id = $1 UNION ALL \
         SELECT t.id FROM t JOIN tree ON t.note = tree.id) \
         SELECT t.status, COUNT(*) FROM t WHERE (t.status = $2) \
         GROUP BY t.status HAVING (COUNT(*) > $3) \
         WINDOW w AS (PARTITION BY t.status ORDER BY t.id DESC) \
         ORDER BY t.status ASC LIMIT 5 FOR UPDATE"
    );
    assert_eq!(built.params, vec![Value::Int(1), text("a"), Value::Int(2)]);
}

#[test]
fn locking_modes() {
    assert_eq!(
        t().for_update(true, true).to_sql().unwrap().sql,
        "SELECT * FROM t FOR UPDATE NOWAIT"
    );
    assert_eq!(
        t().for_share(false, false).to_sql().unwrap().sql,
        "SELECT * FROM t FOR SHARE"
    );
    assert_eq!(
        t().for_share(true, false).for_update(false, false).to_sql().unwrap().sql,
        "SELECT * FROM t FOR UPDATE"
    );
}

#[test]
fn select_distinct_and_values_list() {
    assert_eq!(
        t().select_distinct(["status"]).to_sql().unwrap().sql,
        "SELECT DISTINCT t.status FROM t"
    );
    // A later plain select drops DISTINCT.
    assert_eq!(
        t().select_distinct(["status"]).select(["id"]).to_sql().unwrap().sql,
        "SELECT t.id FROM t"
    );

    let flat = t().values_list(["name"], true).unwrap();
    assert_eq!(flat.to_sql().unwrap().sql, "SELECT t.name FROM t");

    let err = t().values_list(["name", "status"], true).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn annotate_numbers_select_before_where() {
    let built = t()
        .filter(q!(id = 1))
        .annotate([("bumped", F::new("id") + 5)])
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT *, (id + $1) AS bumped FROM t WHERE (t.id = $2)"
    );
    assert_eq!(built.params, vec![Value::Int(5), Value::Int(1)]);
}

#[test]
fn annotate_rejects_bad_alias() {
    let err = t()
        .annotate([("two words", F::new("id"))])
        .to_sql()
        .unwrap_err();
    assert!(err.is_compilation());
}

#[test]
fn select_related_adds_related_columns() {
    let qs = QuerySet::new(books()).select_related(["author_id"]).unwrap();
    assert_eq!(qs.to_sql().unwrap().sql, "SELECT *, authors.* FROM books");

    let err = QuerySet::new(books()).select_related(["name"]).unwrap_err();
    assert!(err.is_configuration());
    let err = QuerySet::new(books()).select_related(["missing"]).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn joins() {
    let built = QuerySet::new(books())
        .join("authors", "authors.id = books.author_id", JoinType::Left)
        .cross_join("tags")
        .join("shelves", "ignored", JoinType::Cross)
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT * FROM books LEFT JOIN authors ON authors.id = books.author_id \
         CROSS JOIN tags CROSS JOIN shelves"
    );
}

#[test]
fn join_condition_params_come_before_where() {
    let on = Expression::new("authors.id = books.author_id AND authors.active = ?", [true]).unwrap();
    let built = QuerySet::new(books())
        .filter(q!(status = "x"))
        .join("authors", on, JoinType::Inner)
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT * FROM books INNER JOIN authors ON authors.id = books.author_id AND authors.active = $1 \
         WHERE (books.status = $2)"
    );
    assert_eq!(built.params, vec![Value::Bool(true), text("x")]);
}

#[test]
fn group_by_and_having() {
    let having = Expression::new("COUNT(*) > ?", [5]).unwrap();
    let built = t()
        .select(["status", "COUNT(*)"])
        .filter(q!(note__isnull = false))
        .group_by(["status"])
        .having([having])
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT t.status, COUNT(*) FROM t WHERE (t.note IS NOT NULL) \
         GROUP BY t.status HAVING (COUNT(*) > $1)"
    );
    assert_eq!(built.params, vec![Value::Int(5)]);
}

#[test]
fn window_clause() {
    let built = t()
        .annotate([("rn", F::new("id").row_number().over_window("w"))])
        .window("w", ["status"], ["-id"])
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT *, (ROW_NUMBER() OVER w) AS rn FROM t \
         WINDOW w AS (PARTITION BY t.status ORDER BY t.id DESC)"
    );

    let named = Window::new("w2")
        .order_by(["id"])
        .frame(("UNBOUNDED PRECEDING", "CURRENT ROW"));
    let built = t().named_window(named).to_sql().unwrap();
    assert_eq!(
        built.sql,
        "SELECT * FROM t WINDOW w2 AS (ORDER BY id ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
    );
}

#[test]
fn recursive_cte() {
    let initial = Expression::new("SELECT id FROM t WHERE id = ?", [1]).unwrap();
    let built = t()
        .with_recursive(
            "tree",
            initial,
            "SELECT t.id FROM t JOIN tree ON t.parent_id = tree.id",
        )
        .unwrap()
        .filter(q!(id__gt = 0))
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "WITH RECURSIVE tree AS (SELECT id FROM t WHERE id = $1 UNION ALL \
         SELECT t.id FROM t JOIN tree ON t.parent_id = tree.id) \
         SELECT * FROM t WHERE (t.id > $2)"
    );
    assert_eq!(built.params, vec![Value::Int(1), Value::Int(0)]);

    let err = t().with_recursive("bad name", "SELECT 1", "SELECT 2").unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn compound_numbering_continues_on_the_right() {
    let a = t().filter(q!(status = "a"));
    let b = t().filter(q!(status = "b"));
    let built = a.union(b, true).to_sql().unwrap();
    assert_eq!(
        built.sql,
        "(SELECT * FROM t WHERE (t.status = $1)) UNION ALL (SELECT * FROM t WHERE (t.status = $2))"
    );
    assert_eq!(built.params, vec![text("a"), text("b")]);

    assert_eq!(
        t().intersect(t(), false).to_sql().unwrap().sql,
        "(SELECT * FROM t) INTERSECT (SELECT * FROM t)"
    );
    assert_eq!(
        t().except(t(), true).to_sql().unwrap().sql,
        "(SELECT * FROM t) EXCEPT ALL (SELECT * FROM t)"
    );
}

#[test]
fn subquery_in_filter() {
    let authors = QuerySet::new(Arc::new(
        TableDef::new("authors", [FieldDef::serial("id"), FieldDef::new("name", "TEXT")]).unwrap(),
    ));
    let inner = authors.select(["id"]).filter(q!(name = "x"));

    let built = QuerySet::new(books())
        .filter(q!(status = "p"))
        .filter(q!(author_id__in = inner.to_expression().unwrap()))
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT * FROM books WHERE (books.status = $1) AND \
         (books.author_id IN (SELECT authors.id FROM authors WHERE (authors.name = $2)))"
    );
    assert_eq!(built.params, vec![text("p"), text("x")]);

    let aliased = inner.subquery("a").unwrap();
    assert_eq!(
        aliased.to_sql(),
        "(SELECT authors.id FROM authors WHERE (authors.name = $1)) AS a"
    );
}

#[test]
fn subquery_in_select_list() {
    let authors = QuerySet::new(Arc::new(
        TableDef::new("authors", [FieldDef::serial("id"), FieldDef::new("name", "TEXT")]).unwrap(),
    ));
    let sub = authors
        .select(["id"])
        .filter(q!(name = "x"))
        .subquery("a")
        .unwrap();

    let built = QuerySet::new(books())
        .filter(q!(status = "p"))
        .select(["id"])
        .select_expr(sub.clone())
        .to_sql()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT books.id, (SELECT authors.id FROM authors WHERE (authors.name = $1)) AS a \
         FROM books WHERE (books.status = $2)"
    );
    assert_eq!(built.params, vec![text("x"), text("p")]);

    // Appends to the default `*` like annotate does.
    assert_eq!(
        QuerySet::new(books()).select_expr(sub).to_sql().unwrap().sql,
        "SELECT *, (SELECT authors.id FROM authors WHERE (authors.name = $1)) AS a FROM books"
    );
}

#[test]
fn count_and_exists() {
    let qs = t().filter(q!(status = "a")).order_by(["-id"]).limit(4);
    assert_eq!(
        qs.compile_count().unwrap().sql,
        "SELECT COUNT(*) FROM (SELECT * FROM t WHERE (t.status = $1) ORDER BY t.id DESC LIMIT 4) AS sub"
    );
    assert_eq!(
        qs.compile_exists().unwrap().sql,
        "SELECT 1 FROM t WHERE (t.status = $1) LIMIT 1"
    );

    assert_eq!(
        t().filter(q!(status = "a")).order_by(["-id"]).compile_count().unwrap().sql,
        "SELECT COUNT(*) FROM t WHERE (t.status = $1)"
    );

    let distinct = t().select_distinct(["status"]).order_by(["status"]);
    assert_eq!(
        distinct.compile_count().unwrap().sql,
        "SELECT COUNT(*) FROM (SELECT DISTINCT t.status FROM t) AS sub"
    );

    let compound = t().filter(q!(id = 1)).union(t().filter(q!(id = 2)), false);
    let built = compound.compile_count().unwrap();
    assert_eq!(
        built.sql,
        "SELECT COUNT(*) FROM ((SELECT * FROM t WHERE (t.id = $1)) UNION \
         (SELECT * FROM t WHERE (t.id = $2))) AS sub"
    );
    assert_eq!(built.params.len(), 2);
    assert_eq!(
        compound.compile_exists().unwrap().sql,
        "SELECT 1 FROM ((SELECT * FROM t WHERE (t.id = $1)) UNION \
         (SELECT * FROM t WHERE (t.id = $2))) AS sub LIMIT 1"
    );
}

#[test]
fn count_drops_row_locks() {
    let built = t()
        .filter(q!(id = 1))
        .for_update(true, false)
        .compile_count()
        .unwrap();
    assert_eq!(built.sql, "SELECT COUNT(*) FROM t WHERE (t.id = $1)");
    assert_eq!(built.params, vec![Value::Int(1)]);

    let sliced = t().filter(q!(id = 1)).limit(3).for_share(false, true);
    assert_eq!(
        sliced.compile_count().unwrap().sql,
        "SELECT COUNT(*) FROM (SELECT * FROM t WHERE (t.id = $1) LIMIT 3) AS sub"
    );

    let distinct = t().select_distinct(["status"]).for_update(false, false);
    assert_eq!(
        distinct.compile_count().unwrap().sql,
        "SELECT COUNT(*) FROM (SELECT DISTINCT t.status FROM t) AS sub"
    );

    // exists keeps the lock.
    assert_eq!(
        t().for_update(false, true).compile_exists().unwrap().sql,
        "SELECT 1 FROM t LIMIT 1 FOR UPDATE SKIP LOCKED"
    );
}

#[test]
fn count_drops_related_columns() {
    let qs = QuerySet::new(books()).select_related(["author_id"]).unwrap();
    assert_eq!(qs.compile_count().unwrap().sql, "SELECT COUNT(*) FROM books");
}

#[test]
fn update_numbers_set_before_where() {
    let built = t()
        .filter(q!(id = 5))
        .compile_update([("name", "x")])
        .unwrap();
    assert_eq!(built.sql, "UPDATE t SET name = $1 WHERE (t.id = $2)");
    assert_eq!(built.params, vec![text("x"), Value::Int(5)]);
}

#[test]
fn update_with_column_and_expression_values() {
    let built = t()
        .filter(q!(status = "a"))
        .compile_update([
            ("id", Operand::from(F::new("id") + 1)),
            ("note", Operand::from(F::new("name"))),
            ("status", Operand::from("b")),
        ])
        .unwrap();
    assert_eq!(
        built.sql,
        "UPDATE t SET id = id + $1, note = name, status = $2 WHERE (t.status = $3)"
    );
    assert_eq!(built.params, vec![Value::Int(1), text("b"), text("a")]);
}

#[test]
fn update_errors() {
    let err = t().compile_update([("bad col", 1)]).unwrap_err();
    assert!(err.is_configuration());

    let err = t().compile_update(Vec::<(&str, i32)>::new()).unwrap_err();
    assert!(err.is_configuration());

    let err = t().union(t(), false).compile_update([("name", "x")]).unwrap_err();
    assert!(err.is_compilation());
}

#[test]
fn delete() {
    let built = t().filter(q!(status = "gone")).compile_delete().unwrap();
    assert_eq!(built.sql, "DELETE FROM t WHERE (t.status = $1)");

    assert_eq!(t().compile_delete().unwrap().sql, "DELETE FROM t");

    let err = t().union(t(), false).compile_delete().unwrap_err();
    assert!(err.is_compilation());
}

#[test]
fn explain() {
    let qs = t().filter(q!(id = 1));
    let built = qs
        .compile_explain(ExplainOptions::new().analyze().buffers())
        .unwrap();
    assert_eq!(
        built.sql,
        "EXPLAIN (ANALYZE, BUFFERS) SELECT * FROM t WHERE (t.id = $1)"
    );
    assert_eq!(built.params, vec![Value::Int(1)]);

    assert_eq!(
        qs.compile_explain(ExplainOptions::default()).unwrap().sql,
        "EXPLAIN SELECT * FROM t WHERE (t.id = $1)"
    );
}

#[test]
fn bulk_create_groups() {
    let rows = [
        Record::new().set("name", "a"),
        Record::new().set("name", "b").set("status", "live").set("note", "n"),
    ];
    let (sql, groups) = t().compile_bulk_create(&rows).unwrap();
    assert_eq!(sql, "INSERT INTO t (name, status, note) VALUES ($1, $2, $3)");
    assert_eq!(
        groups,
        vec![
            vec![text("a"), text("draft"), Value::Null],
            vec![text("b"), text("live"), text("n")],
        ]
    );
}

#[test]
fn bulk_create_errors() {
    let err = t()
        .compile_bulk_create(&[Record::new().set("status", "x")])
        .unwrap_err();
    assert!(err.is_configuration());

    let err = t()
        .compile_bulk_create(&[Record::new().set("name", "a").set("color", "red")])
        .unwrap_err();
    assert!(err.is_configuration());
}
