use decapscan_core::db::migrations::latest_version;
use decapscan_core::db::{open_db, open_db_in_memory, open_existing_db, DbError};
use decapscan_core::{
    read_history_file, write_history_file, AnalysisError, AnalysisOptions, AnalysisService,
    EntityKind, HistoryRepoError, HistoryRepository, SqliteHistoryRepository, Transaction,
    TrackedNode,
};
use rusqlite::Connection;

fn sample_history() -> Vec<Transaction> {
    vec![
        Transaction::new("0")
            .with_date(123)
            .with_author("<author>")
            .add_unit("Main.java", |unit| unit.child(EntityKind::Variable, "version"))
            .add_unit("Test.java", |unit| unit),
        Transaction::new("1")
            .remove_node("Test.java")
            .add_child("Main.java", EntityKind::Function, "getVersion()", |f| {
                f.with_modifiers(["public"])
            }),
        Transaction::new("2").edit_modifiers(
            "Main.java:getVersion()",
            ["final"],
            Vec::<String>::new(),
        ),
    ]
}

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert!(SqliteHistoryRepository::try_new(&conn).is_ok());
}

#[test]
fn edits_table_stores_kind_and_payload_only() {
    let conn = open_db_in_memory().unwrap();
    let mut stmt = conn.prepare("PRAGMA table_info(edits);").unwrap();
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get("name"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(columns, vec!["tx_seq", "ordinal", "kind", "payload"]);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn open_existing_db_requires_persisted_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");

    let err = open_existing_db(&path).unwrap_err();
    assert!(matches!(err, DbError::MissingDatabase(ref missing) if *missing == path));
    assert!(!path.exists());
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteHistoryRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        HistoryRepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn append_and_load_preserves_order_and_metadata() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteHistoryRepository::try_new(&conn).unwrap();

    for transaction in sample_history() {
        repo.append_transaction(&transaction).unwrap();
    }

    assert_eq!(repo.transaction_count().unwrap(), 3);
    assert_eq!(repo.load_history().unwrap(), sample_history());
}

#[test]
fn duplicate_transaction_id_is_rejected_without_partial_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteHistoryRepository::try_new(&conn).unwrap();
    repo.append_transaction(&sample_history()[0]).unwrap();

    let err = repo
        .append_transaction(&Transaction::new("0").remove_node("Main.java"))
        .unwrap_err();
    assert!(matches!(err, HistoryRepoError::DuplicateTransaction(id) if id == "0"));
    assert_eq!(repo.load_history().unwrap(), vec![sample_history()[0].clone()]);
}

#[test]
fn corrupted_payload_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteHistoryRepository::try_new(&conn).unwrap();
    repo.append_transaction(&sample_history()[0]).unwrap();

    conn.execute("UPDATE edits SET payload = '{\"edit\":42}';", [])
        .unwrap();

    let err = repo.load_history().unwrap_err();
    assert!(matches!(err, HistoryRepoError::InvalidData(_)));
}

#[test]
fn clear_removes_all_transactions() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteHistoryRepository::try_new(&conn).unwrap();
    for transaction in sample_history() {
        repo.append_transaction(&transaction).unwrap();
    }

    repo.clear().unwrap();
    assert_eq!(repo.transaction_count().unwrap(), 0);
    assert!(repo.load_history().unwrap().is_empty());
}

#[test]
fn import_with_duplicate_id_stores_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = AnalysisService::new(SqliteHistoryRepository::try_new(&conn).unwrap());
    let history = sample_history();

    let err = service
        .import(&[history[0].clone(), history[1].clone(), history[0].clone()])
        .unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::Repo(HistoryRepoError::DuplicateTransaction(ref id)) if id == "0"
    ));
    let repo = SqliteHistoryRepository::try_new(&conn).unwrap();
    assert_eq!(repo.transaction_count().unwrap(), 0);
}

#[test]
fn failed_replace_keeps_previous_history() {
    let conn = open_db_in_memory().unwrap();
    let service = AnalysisService::new(SqliteHistoryRepository::try_new(&conn).unwrap());
    service.import(&sample_history()).unwrap();

    let broken = [
        Transaction::new("x").add_unit("X.java", |unit| unit),
        Transaction::new("x").remove_node("X.java"),
    ];
    let err = service.replace_history(&broken).unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::Repo(HistoryRepoError::DuplicateTransaction(_))
    ));
    assert_eq!(service.history().unwrap(), sample_history());
}

#[test]
fn replace_swaps_history_in_one_step() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteHistoryRepository::try_new(&conn).unwrap();
    repo.append_history(&sample_history(), false).unwrap();

    let replacement = vec![Transaction::new("0").add_unit("Other.java", |unit| unit)];
    assert_eq!(repo.append_history(&replacement, true).unwrap(), 1);
    assert_eq!(repo.load_history().unwrap(), replacement);
}

#[test]
fn service_runs_analysis_over_persisted_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");

    {
        let conn = open_db(&path).unwrap();
        let service = AnalysisService::new(SqliteHistoryRepository::try_new(&conn).unwrap());
        assert_eq!(service.import(&sample_history()).unwrap(), 3);
    }

    let conn = open_existing_db(&path).unwrap();
    let service = AnalysisService::new(SqliteHistoryRepository::try_new(&conn).unwrap());
    let report = service.run(&AnalysisOptions::default()).unwrap();

    assert_eq!(report.transactions_processed, 3);
    assert_eq!(report.last_transaction_id.as_deref(), Some("2"));
    let decapsulated = report.decapsulated();
    assert_eq!(decapsulated.len(), 1);
    assert_eq!(
        decapsulated[0].accessors(),
        &[TrackedNode::new("Main.java:getVersion()", "1")]
    );
}

#[test]
fn service_surfaces_invalid_history() {
    let conn = open_db_in_memory().unwrap();
    let service = AnalysisService::new(SqliteHistoryRepository::try_new(&conn).unwrap());
    service
        .import(&[Transaction::new("0").remove_node("Ghost.java")])
        .unwrap();

    let err = service.run(&AnalysisOptions::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidHistory(_)));
}

#[test]
fn history_file_round_trips_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("history.json");
    write_history_file(&file, &sample_history()).unwrap();

    let conn = open_db_in_memory().unwrap();
    let service = AnalysisService::new(SqliteHistoryRepository::try_new(&conn).unwrap());
    service.import(&read_history_file(&file).unwrap()).unwrap();

    assert_eq!(service.history().unwrap(), sample_history());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}
