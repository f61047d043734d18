use std::fs;

use adpulse_client::setup::ensure_initialized_at;
use rusqlite::Connection;
use tempfile::tempdir;

fn table_exists(connection: &Connection, table_name: &str) -> bool {
    connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table_name],
            |_row| Ok(true),
        )
        .unwrap_or(false)
}

fn meta_value(connection: &Connection, key: &str) -> Option<String> {
    connection
        .query_row(
            "SELECT value FROM internal_meta WHERE key = ?1 LIMIT 1",
            [key],
            |row| row.get::<_, String>(0),
        )
        .ok()
}

fn user_version(connection: &Connection) -> Option<i64> {
    connection
        .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .ok()
}

#[test]
fn setup_creates_local_store_at_home_override() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("adpulse-home");

        let context = ensure_initialized_at(&home);
        assert!(context.is_ok());
        if let Ok(setup_context) = context {
            assert!(setup_context.db_path.ends_with("local-store.db"));
            assert_eq!(setup_context.schema_version, "v1");
            assert_eq!(setup_context.key_count, 0);
            assert!(home.join("local-store.db").exists());
        }
    }
}

#[test]
fn setup_is_idempotent_for_existing_store() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("adpulse-home");

        let first = ensure_initialized_at(&home);
        assert!(first.is_ok());
        let second = ensure_initialized_at(&home);
        assert!(second.is_ok());

        if let (Ok(first_context), Ok(second_context)) = (first, second) {
            assert_eq!(first_context.db_path, second_context.db_path);
            assert_eq!(first_context.schema_version, second_context.schema_version);

            let connection = Connection::open(&second_context.db_path);
            assert!(connection.is_ok());
            if let Ok(conn) = connection {
                assert_eq!(user_version(&conn), Some(1));
                assert!(table_exists(&conn, "local_kv"));
                assert!(table_exists(&conn, "internal_meta"));
            }
        }
    }
}

#[test]
fn setup_counts_existing_keys() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("adpulse-home");
        let context = ensure_initialized_at(&home);
        assert!(context.is_ok());
        if let Ok(setup_context) = context {
            let connection = Connection::open(&setup_context.db_path);
            assert!(connection.is_ok());
            if let Ok(conn) = connection {
                let inserted = conn.execute(
                    "INSERT INTO local_kv (key, value, updated_at) VALUES ('store_clients', '[]', '0')",
                    [],
                );
                assert!(inserted.is_ok());
            }
        }

        let reopened = ensure_initialized_at(&home);
        assert!(reopened.is_ok());
        if let Ok(setup_context) = reopened {
            assert_eq!(setup_context.key_count, 1);
        }
    }
}

#[test]
fn setup_restores_missing_meta_key() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("adpulse-home");

        let context = ensure_initialized_at(&home);
        assert!(context.is_ok());
        if let Ok(setup_context) = context {
            let connection = Connection::open(&setup_context.db_path);
            assert!(connection.is_ok());
            if let Ok(conn) = connection {
                let deleted =
                    conn.execute("DELETE FROM internal_meta WHERE key = ?1", ["key_namespace"]);
                assert!(deleted.is_ok());
            }

            let repaired = ensure_initialized_at(&home);
            assert!(repaired.is_ok());

            let verify_connection = Connection::open(&setup_context.db_path);
            assert!(verify_connection.is_ok());
            if let Ok(conn) = verify_connection {
                assert_eq!(meta_value(&conn, "key_namespace"), Some("store_".to_string()));
            }
        }
    }
}

#[test]
fn setup_fails_when_meta_value_drifted() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("adpulse-home");

        let context = ensure_initialized_at(&home);
        assert!(context.is_ok());
        if let Ok(setup_context) = context {
            let connection = Connection::open(&setup_context.db_path);
            assert!(connection.is_ok());
            if let Ok(conn) = connection {
                let updated = conn.execute(
                    "UPDATE internal_meta SET value = 'v9' WHERE key = 'schema_version'",
                    [],
                );
                assert!(updated.is_ok());
            }

            let failed = ensure_initialized_at(&home);
            assert!(failed.is_err());
            if let Err(error) = failed {
                assert_eq!(error.code, "local_store_corrupt");
            }
        }
    }
}

#[test]
fn setup_fails_when_kv_table_missing() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("adpulse-home");

        let context = ensure_initialized_at(&home);
        assert!(context.is_ok());
        if let Ok(setup_context) = context {
            let connection = Connection::open(&setup_context.db_path);
            assert!(connection.is_ok());
            if let Ok(conn) = connection {
                let dropped = conn.execute_batch("DROP TABLE local_kv;");
                assert!(dropped.is_ok());
            }

            let failed = ensure_initialized_at(&home);
            assert!(failed.is_err());
            if let Err(error) = failed {
                assert_eq!(error.code, "local_store_corrupt");
            }
        }
    }
}

#[test]
fn setup_maps_locked_database_to_local_store_locked() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("adpulse-home");

        let context = ensure_initialized_at(&home);
        assert!(context.is_ok());
        if let Ok(setup_context) = context {
            let connection = Connection::open(&setup_context.db_path);
            assert!(connection.is_ok());
            if let Ok(conn) = connection {
                let begin_lock = conn.execute_batch("BEGIN EXCLUSIVE;");
                assert!(begin_lock.is_ok());

                let locked_error = ensure_initialized_at(&home);
                assert!(locked_error.is_err());
                if let Err(error) = locked_error {
                    assert_eq!(error.code, "local_store_locked");
                }

                let rollback = conn.execute_batch("ROLLBACK;");
                assert!(rollback.is_ok());
            }
        }
    }
}

#[test]
fn setup_maps_corrupt_database_to_local_store_corrupt() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("adpulse-home");
        let create_home = fs::create_dir_all(&home);
        assert!(create_home.is_ok());

        let write_file = fs::write(home.join("local-store.db"), "not-a-sqlite-database");
        assert!(write_file.is_ok());

        let result = ensure_initialized_at(&home);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "local_store_corrupt");
        }
    }
}
