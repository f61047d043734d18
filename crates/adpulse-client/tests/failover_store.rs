use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use adpulse_client::connection::ConnectionStatus;
use adpulse_client::model::Client;
use adpulse_client::repository::Repository;
use adpulse_client::store::{
    Backend, BackendError, DbCredentials, FailoverStore, KvBackend, LocalStore, RemoteKv,
    RemoteStatus, tables,
};
use serde_json::{Value, json};
use tempfile::tempdir;

/// In-memory remote whose map and failure switch stay visible to the test.
#[derive(Clone, Default)]
struct SharedRemote {
    values: Rc<RefCell<BTreeMap<String, Value>>>,
    down: Rc<RefCell<bool>>,
}

impl SharedRemote {
    fn check(&self) -> Result<(), BackendError> {
        if *self.down.borrow() {
            return Err(BackendError::Connect("connection refused".to_string()));
        }
        Ok(())
    }
}

impl KvBackend for SharedRemote {
    fn name(&self) -> Backend {
        Backend::Remote
    }

    fn get(&mut self, key: &str) -> Result<Option<Value>, BackendError> {
        self.check()?;
        Ok(self.values.borrow().get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &Value) -> Result<(), BackendError> {
        self.check()?;
        self.values.borrow_mut().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        self.check()?;
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

impl RemoteKv for SharedRemote {
    fn endpoint(&self) -> String {
        "memory://remote".to_string()
    }

    fn status(&mut self) -> Result<RemoteStatus, BackendError> {
        self.check()?;
        Ok(RemoteStatus {
            connected: true,
            error: None,
        })
    }

    fn set_credentials(&mut self, _credentials: &DbCredentials) -> Result<(), BackendError> {
        self.check()
    }
}

/// Reports a healthy database but fails every key operation.
struct AlwaysFailingRemote;

impl KvBackend for AlwaysFailingRemote {
    fn name(&self) -> Backend {
        Backend::Remote
    }

    fn get(&mut self, _key: &str) -> Result<Option<Value>, BackendError> {
        Err(BackendError::Timeout("request timed out".to_string()))
    }

    fn put(&mut self, _key: &str, _value: &Value) -> Result<(), BackendError> {
        Err(BackendError::Timeout("request timed out".to_string()))
    }

    fn delete(&mut self, _key: &str) -> Result<(), BackendError> {
        Err(BackendError::Timeout("request timed out".to_string()))
    }
}

impl RemoteKv for AlwaysFailingRemote {
    fn endpoint(&self) -> String {
        "memory://failing".to_string()
    }

    fn status(&mut self) -> Result<RemoteStatus, BackendError> {
        Ok(RemoteStatus {
            connected: true,
            error: None,
        })
    }

    fn set_credentials(&mut self, _credentials: &DbCredentials) -> Result<(), BackendError> {
        Ok(())
    }
}

fn acme() -> Vec<Client> {
    vec![Client {
        id: "client_1".to_string(),
        name: "Acme".to_string(),
        user_id: String::new(),
        ads_account_name: Some("act_1".to_string()),
    }]
}

fn credentials() -> DbCredentials {
    DbCredentials {
        host: "db.internal".to_string(),
        database: "adpulse".to_string(),
        user: "reporting".to_string(),
        password: "secret".to_string(),
    }
}

#[test]
fn failing_remote_is_transparent_to_callers() {
    let local = LocalStore::open_in_memory();
    assert!(local.is_ok());
    if let Ok(local) = local {
        let mut store = FailoverStore::new(Box::new(AlwaysFailingRemote), local);
        assert!(store.connect(None).is_ok());
        assert!(store.connection_state().is_reachable());

        let mut repository = Repository::new(&mut store);
        let saved = repository.save_clients(&acme());
        assert_eq!(saved.ok(), Some(Backend::Local));
        assert_eq!(repository.clients().ok(), Some(acme()));

        assert_eq!(store.connection_state().status(), ConnectionStatus::Unreachable);
        assert!(
            store
                .connection_state()
                .last_error()
                .is_some_and(|error| error.contains("timed out"))
        );
    }
}

#[test]
fn session_stays_local_until_reconnect() {
    let local = LocalStore::open_in_memory();
    assert!(local.is_ok());
    if let Ok(local) = local {
        let remote = SharedRemote::default();
        let mut store = FailoverStore::new(Box::new(remote.clone()), local);
        assert!(store.connect(None).is_ok());

        assert_eq!(store.put(tables::CLIENTS, &acme()).ok(), Some(Backend::Remote));
        assert!(remote.values.borrow().contains_key(tables::CLIENTS));

        *remote.down.borrow_mut() = true;
        assert_eq!(
            store.put(tables::USERS, &json!([])).ok(),
            Some(Backend::Local)
        );

        // The remote is back, but nothing is sent there until an explicit connect.
        *remote.down.borrow_mut() = false;
        assert_eq!(
            store.put(tables::IMPORT_HISTORY, &json!([])).ok(),
            Some(Backend::Local)
        );
        assert!(!remote.values.borrow().contains_key(tables::IMPORT_HISTORY));

        assert!(store.connect(None).is_ok());
        assert_eq!(
            store.put(tables::IMPORT_HISTORY, &json!([])).ok(),
            Some(Backend::Remote)
        );
    }
}

#[test]
fn failed_connect_records_the_error() {
    let local = LocalStore::open_in_memory();
    assert!(local.is_ok());
    if let Ok(local) = local {
        let remote = SharedRemote::default();
        *remote.down.borrow_mut() = true;
        let mut store = FailoverStore::new(Box::new(remote.clone()), local);

        let failed = store.connect(Some(&credentials()));
        assert!(failed.is_err());
        if let Err(error) = failed {
            assert_eq!(error.code, "remote_connect_failed");
        }
        assert_eq!(store.connection_state().status(), ConnectionStatus::Unreachable);
        assert!(store.connection_state().last_error().is_some());
    }
}

#[test]
fn accepted_credentials_are_reused_without_reaching_the_remote() {
    let local = LocalStore::open_in_memory();
    assert!(local.is_ok());
    if let Ok(local) = local {
        let remote = SharedRemote::default();
        let mut store = FailoverStore::new(Box::new(remote.clone()), local);
        assert!(store.connect(Some(&credentials())).is_ok());

        let stored = store.get::<Option<DbCredentials>>(tables::DB_CREDENTIALS, None);
        assert_eq!(stored.ok(), Some(Some(credentials())));
        assert!(!remote.values.borrow().contains_key(tables::DB_CREDENTIALS));
    }
}

#[test]
fn malformed_stored_value_reads_as_default() {
    let local = LocalStore::open_in_memory();
    assert!(local.is_ok());
    if let Ok(local) = local {
        let remote = SharedRemote::default();
        remote
            .values
            .borrow_mut()
            .insert(tables::CLIENTS.to_string(), json!({"not": "a list"}));
        let mut store = FailoverStore::new(Box::new(remote), local);
        assert!(store.connect(None).is_ok());

        let clients = Repository::new(&mut store).clients();
        assert_eq!(clients.ok(), Some(Vec::new()));
        assert!(store.connection_state().is_reachable());
    }
}

#[test]
fn clear_keeps_config_and_reset_removes_everything() {
    let local = LocalStore::open_in_memory();
    assert!(local.is_ok());
    if let Ok(local) = local {
        let mut store = FailoverStore::new(Box::new(SharedRemote::default()), local);
        let mut repository = Repository::new(&mut store);
        assert!(repository.save_clients(&acme()).is_ok());
        assert!(
            repository
                .store()
                .put(tables::CONFIG, &json!({"accessToken": "t", "apiVersion": "v19.0"}))
                .is_ok()
        );
        assert!(
            repository
                .store()
                .put("analysis_cache_0123456789abcdef", &json!({"trends": []}))
                .is_ok()
        );

        let cleared = store.clear_all_data();
        assert!(cleared.is_ok());
        if let Ok(summary) = cleared {
            assert_eq!(summary.analysis_cache_entries, 1);
            assert!(summary.cleared_tables.contains(&tables::CLIENTS.to_string()));
        }
        assert_eq!(Repository::new(&mut store).clients().ok(), Some(Vec::new()));
        let config = store.get::<Option<Value>>(tables::CONFIG, None);
        assert!(config.is_ok_and(|value| value.is_some()));

        assert!(store.factory_reset().is_ok());
        let config = store.get::<Option<Value>>(tables::CONFIG, None);
        assert!(config.is_ok_and(|value| value.is_none()));
    }
}

#[test]
fn local_capacity_errors_name_the_table_and_keep_earlier_writes() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp) = temp {
        let local = LocalStore::open(&temp.path().join("tiny.db"), None);
        assert!(local.is_ok());
        let Ok(local) = local else {
            return;
        };
        let mut store = FailoverStore::new(Box::new(AlwaysFailingRemote), local);
        assert!(store.put(tables::CLIENTS, &acme()).is_ok());

        let pages = store.local().set_max_pages(1);
        assert!(pages.is_ok());

        let large = json!({ "blob": "x".repeat(256 * 1024) });
        let result = store.put(tables::PERFORMANCE_DATA, &large);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "capacity_exceeded");
            assert_eq!(
                error.data.as_ref().and_then(|data| data["table"].as_str()),
                Some(tables::PERFORMANCE_DATA)
            );
        }

        assert_eq!(Repository::new(&mut store).clients().ok(), Some(acme()));
    }
}
