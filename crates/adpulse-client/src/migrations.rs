use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

const LOCAL_STORE_SQL: &str = include_str!("migrations/0001_local_store.sql");

pub const REQUIRED_META_KEYS: [(&str, &str); 2] =
    [("schema_version", "v1"), ("key_namespace", "store_")];

pub const EXPECTED_USER_VERSION: i64 = 1;

pub fn run_pending(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    let migrations = Migrations::new(vec![M::up(LOCAL_STORE_SQL)]);
    migrations.to_latest(conn)
}
