use cache_sql_middleware::prelude::*;
use cache_sql_middleware::test_utils::{ScriptedDriver, ScriptedResult, scripted_connection};

const PAGE_TWO: &str = "select *, %vid from (select top all id, email from users where active = ? \
order by id asc) where %vid between 3 and 4";

fn page_driver() -> ScriptedDriver {
    ScriptedDriver::new().on(
        PAGE_TWO,
        ScriptedResult::new(&["id", "email", "%vid"])
            .row(vec![RowValues::Int(3), RowValues::Text("c@x".into()), RowValues::Int(3)])
            .row(vec![RowValues::Int(4), RowValues::Text("d@x".into()), RowValues::Int(4)]),
    )
}

#[test]
fn second_page_runs_as_a_vid_window() -> Result<(), Box<dyn std::error::Error>> {
    let driver = page_driver();
    let conn = scripted_connection(&driver, CacheOptions::default())?;

    let page = SelectQuery::table("users")
        .select(["id", "email"])
        .where_eq("active", true)
        .order_by("id")
        .for_page(2, 2);
    assert_eq!(page.to_sql(conn.grammar()), PAGE_TWO);

    let rows = conn.select_query(&page)?;
    assert_eq!(rows.len(), 2);
    let ids: Vec<i64> = rows
        .iter()
        .filter_map(|row| row.get("id").and_then(RowValues::as_int).copied())
        .collect();
    assert_eq!(ids, vec![3, 4]);
    assert_eq!(
        driver.executed(),
        vec![(PAGE_TWO.to_string(), vec![RowValues::Bool(true)])]
    );
    Ok(())
}

#[test]
fn first_page_uses_top() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let conn = scripted_connection(&driver, CacheOptions::default())?;
    let page = SelectQuery::table("users").latest("created_at").for_page(1, 10);
    assert_eq!(
        page.to_sql(conn.grammar()),
        "select top 10 * from users order by created_at desc"
    );
    assert!(conn.select_query(&page)?.is_empty());
    Ok(())
}

#[test]
fn distinct_survives_the_window() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let conn = scripted_connection(&driver, CacheOptions::default())?;
    let query = SelectQuery::table("orders")
        .select(["customer_id"])
        .distinct()
        .skip(20);
    assert_eq!(
        query.to_sql(conn.grammar()),
        "select *, %vid from (select distinct top all customer_id from orders order by 1) \
where %vid >= 21"
    );
    Ok(())
}

#[test]
fn bindings_reach_the_native_call_in_clause_order() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let conn = scripted_connection(&driver, CacheOptions::default())?;
    let query = SelectQuery::table("users")
        .where_in("role", ["admin", "owner"])
        .where_between("age", 18, 65)
        .take(5);
    conn.select_query(&query)?;

    let (sql, params) = driver.executed().remove(0);
    assert_eq!(
        sql,
        "select top 5 * from users where role in (?, ?) and age between ? and ?"
    );
    assert_eq!(
        params,
        vec![
            RowValues::Text("admin".into()),
            RowValues::Text("owner".into()),
            RowValues::Int(18),
            RowValues::Int(65),
        ]
    );
    Ok(())
}

#[test]
fn insert_get_id_reads_back_the_newest_row() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new()
        .on("insert into users (email) values ( ? )", ScriptedResult::affected(1))
        .on(
            "select top 1 * from users order by id desc",
            ScriptedResult::new(&["ID", "email"])
                .row(vec![RowValues::Text("42".into()), RowValues::Text("n@x".into())]),
        );
    let conn = scripted_connection(&driver, CacheOptions::default())?;

    let id = conn.insert_get_id(
        "insert into users (email) values ( :email )",
        &[(ParamKey::named("email"), RowValues::Text("n@x".into()))],
        "users",
        None,
    )?;
    assert_eq!(id, RowValues::Int(42));
    Ok(())
}
