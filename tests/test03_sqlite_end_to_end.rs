#![cfg(feature = "sqlite")]

use cache_sql_middleware::prelude::*;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn open(dir: &TempDir, options: CacheOptions) -> Result<Connection, CacheDbError> {
    let path = dir.path().join("e2e.db");
    let endpoint = format!(
        "Driver={{sqlite}};Server=localhost;PORT=0;DATABASE={}",
        path.display()
    );
    Connection::connect(&SqliteDriver::new(), &endpoint, &Credentials::default(), options)
}

fn seed(conn: &Connection) -> Result<(), CacheDbError> {
    conn.exec("CREATE TABLE Users (ID INTEGER PRIMARY KEY, UserName TEXT NOT NULL, Note TEXT)")?;
    conn.query("INSERT INTO Users (ID, UserName, Note) VALUES ( :id, :name, :note )")
        .bind("id", 1)
        .bind("name", "alice")
        .bind("note", "")
        .dml()?;
    conn.query("INSERT INTO Users (ID, UserName, Note) VALUES ( :id, :name, :note )")
        .bind("id", 2)
        .bind("name", "bob")
        .bind("note", RowValues::Null)
        .dml()?;
    Ok(())
}

fn count_users(conn: &Connection) -> Result<i64, CacheDbError> {
    let row = conn
        .query("SELECT COUNT(*) AS n FROM Users")
        .fetch_mode(FetchMode::Assoc)
        .first()?;
    Ok(row
        .and_then(|row| row.get("n").and_then(RowValues::as_int).copied())
        .unwrap_or(-1))
}

#[test]
fn named_parameters_and_fetch_modes() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let options = CacheOptions::builder().lowercase_names(true).finish();
    let conn = open(&dir, options)?;
    seed(&conn)?;

    let rows = conn
        .query("SELECT ID, UserName FROM Users WHERE UserName = :name")
        .bind("name", "bob")
        .fetch_mode(FetchMode::Both)
        .fetch_all()?;
    assert_eq!(rows.len(), 1);
    let both = rows[0].as_both().expect("both shape");
    assert_eq!(both.get(0_usize), Some(&RowValues::Int(2)));
    assert_eq!(both.get("id"), Some(&RowValues::Int(2)));
    assert_eq!(both.get(1_usize), both.get("username"));

    let record = conn
        .query("SELECT UserName FROM Users WHERE ID = :id")
        .bind("id", 1)
        .first()?
        .expect("one row");
    assert!(record.as_record().is_some());
    assert_eq!(record.field_names(), vec!["username"]);
    assert_eq!(record.get("username"), Some(&RowValues::Text("alice".into())));
    Ok(())
}

#[test]
fn null_policies_shape_values() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let conn = open(&dir, CacheOptions::default())?;
    seed(&conn)?;

    let mut stmt = conn.prepare("SELECT Note FROM Users ORDER BY ID");
    stmt.execute()?;
    let natural: Vec<RowValues> = stmt
        .fetch_all(FetchMode::Assoc)?
        .iter()
        .filter_map(|row| row.get("Note").cloned())
        .collect();
    assert_eq!(natural, vec![RowValues::Text(String::new()), RowValues::Null]);

    let dir = TempDir::new()?;
    let options = CacheOptions::builder().empty_string_to_null(true).finish();
    let conn = open(&dir, options)?;
    seed(&conn)?;
    let result = conn.query("SELECT Note FROM Users ORDER BY ID").select()?;
    assert!(result.iter().all(|row| row.get("Note") == Some(&RowValues::Null)));

    let dir = TempDir::new()?;
    let options = CacheOptions::builder().null_to_string(true).finish();
    let conn = open(&dir, options)?;
    seed(&conn)?;
    let result = conn.query("SELECT Note FROM Users ORDER BY ID").select()?;
    assert!(
        result
            .iter()
            .all(|row| row.get("Note") == Some(&RowValues::Text(String::new())))
    );
    Ok(())
}

#[test]
fn rollback_discards_and_commit_keeps() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let mut conn = open(&dir, CacheOptions::default())?;
    seed(&conn)?;

    conn.begin()?;
    conn.exec("DELETE FROM Users")?;
    assert_eq!(count_users(&conn)?, 0);
    assert!(conn.rollback()?);
    assert_eq!(count_users(&conn)?, 2);
    assert_eq!(conn.tx_state(), TxState::AutoCommit);

    conn.begin()?;
    conn.query("INSERT INTO Users (ID, UserName) VALUES ( :id, :name )")
        .bind("id", 3)
        .bind("name", "carol")
        .dml()?;
    assert!(conn.commit()?);
    assert_eq!(count_users(&conn)?, 3);
    Ok(())
}

#[test]
fn commit_after_a_failed_statement_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let mut conn = open(&dir, CacheOptions::default())?;
    seed(&conn)?;

    conn.begin()?;
    conn.query("INSERT INTO Users (ID, UserName) VALUES ( :id, :name )")
        .bind("id", 3)
        .bind("name", "carol")
        .dml()?;
    let duplicate = conn
        .query("INSERT INTO Users (ID, UserName) VALUES ( :id, :name )")
        .bind("id", 1)
        .bind("name", "again")
        .dml()
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Execute);
    assert_eq!(duplicate.diagnostic().map(|d| d.sqlstate.as_str()), Some("23000"));

    assert!(conn.commit()?);
    assert_eq!(count_users(&conn)?, 2);
    Ok(())
}

#[test]
fn batch_runs_each_statement() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let conn = open(&dir, CacheOptions::default())?;
    seed(&conn)?;

    let affected = conn
        .query("UPDATE Users SET Note = 'x;y' WHERE ID = 1; DELETE FROM Users WHERE ID = 2;")
        .batch()?;
    assert_eq!(affected, 2);
    assert_eq!(count_users(&conn)?, 1);
    Ok(())
}

#[test]
fn bad_sql_is_a_prepare_error() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let conn = open(&dir, CacheOptions::default())?;
    let err = conn.exec("SELEC nonsense").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Prepare);
    assert!(!err.message().contains('\n'));
    Ok(())
}
