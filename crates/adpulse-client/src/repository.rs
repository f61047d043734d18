//! Typed accessors over [`FailoverStore`]. One entity per key, defaults on absence.

use crate::model::{AdsApiConfig, Client, FingerprintLedger, ImportBatch, PerformanceData, User};
use crate::store::{Backend, FailoverStore, tables};
use crate::ClientResult;

pub struct Repository<'a> {
    store: &'a mut FailoverStore,
}

impl<'a> Repository<'a> {
    pub fn new(store: &'a mut FailoverStore) -> Self {
        Self { store }
    }

    pub fn store(&mut self) -> &mut FailoverStore {
        &mut *self.store
    }

    pub fn users(&mut self) -> ClientResult<Vec<User>> {
        self.store.get(tables::USERS, Vec::new())
    }

    pub fn save_users(&mut self, users: &[User]) -> ClientResult<Backend> {
        self.store.put(tables::USERS, users)
    }

    pub fn clients(&mut self) -> ClientResult<Vec<Client>> {
        self.store.get(tables::CLIENTS, Vec::new())
    }

    pub fn save_clients(&mut self, clients: &[Client]) -> ClientResult<Backend> {
        self.store.put(tables::CLIENTS, clients)
    }

    pub fn performance_data(&mut self) -> ClientResult<PerformanceData> {
        self.store
            .get(tables::PERFORMANCE_DATA, PerformanceData::new())
    }

    pub fn save_performance_data(&mut self, data: &PerformanceData) -> ClientResult<Backend> {
        self.store.put(tables::PERFORMANCE_DATA, data)
    }

    /// Most recent first.
    pub fn import_history(&mut self) -> ClientResult<Vec<ImportBatch>> {
        self.store.get(tables::IMPORT_HISTORY, Vec::new())
    }

    pub fn save_import_history(&mut self, history: &[ImportBatch]) -> ClientResult<Backend> {
        self.store.put(tables::IMPORT_HISTORY, history)
    }

    pub fn logged_in_user(&mut self) -> ClientResult<Option<User>> {
        self.store.get(tables::LOGGED_IN_USER, None)
    }

    pub fn save_logged_in_user(&mut self, user: Option<&User>) -> ClientResult<Backend> {
        self.store.put(tables::LOGGED_IN_USER, &user)
    }

    pub fn ads_api_config(&mut self) -> ClientResult<Option<AdsApiConfig>> {
        self.store.get(tables::CONFIG, None)
    }

    pub fn save_ads_api_config(&mut self, config: &AdsApiConfig) -> ClientResult<Backend> {
        self.store.put(tables::CONFIG, config)
    }

    pub fn processed_fingerprints(&mut self) -> ClientResult<FingerprintLedger> {
        self.store
            .get(tables::PROCESSED_FINGERPRINTS, FingerprintLedger::default())
    }

    pub fn save_processed_fingerprints(
        &mut self,
        ledger: &FingerprintLedger,
    ) -> ClientResult<Backend> {
        self.store.put(tables::PROCESSED_FINGERPRINTS, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::Repository;
    use crate::model::{Client, User, UserRole};
    use crate::store::{DisabledRemote, FailoverStore, LocalStore};

    fn offline_store() -> Option<FailoverStore> {
        LocalStore::open_in_memory()
            .ok()
            .map(|local| FailoverStore::new(Box::new(DisabledRemote), local))
    }

    #[test]
    fn absent_entities_read_as_defaults() {
        let store = offline_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let mut repository = Repository::new(&mut store);
            assert_eq!(repository.clients().ok(), Some(Vec::new()));
            assert_eq!(repository.logged_in_user().ok(), Some(None));
            assert_eq!(repository.ads_api_config().ok(), Some(None));
            assert!(
                repository
                    .processed_fingerprints()
                    .map(|ledger| ledger.is_empty())
                    .unwrap_or(false)
            );
        }
    }

    #[test]
    fn saved_entities_read_back() {
        let store = offline_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let mut repository = Repository::new(&mut store);
            let clients = vec![Client {
                id: "c1".to_string(),
                name: "Acme".to_string(),
                user_id: "u1".to_string(),
                ads_account_name: Some("Acme Ads".to_string()),
            }];
            assert!(repository.save_clients(&clients).is_ok());
            assert_eq!(repository.clients().ok(), Some(clients));

            let user = User {
                id: "u1".to_string(),
                username: "ana".to_string(),
                role: UserRole::Admin,
            };
            assert!(repository.save_users(std::slice::from_ref(&user)).is_ok());
            assert_eq!(repository.users().ok(), Some(vec![user.clone()]));

            assert!(repository.save_logged_in_user(Some(&user)).is_ok());
            assert_eq!(repository.logged_in_user().ok(), Some(Some(user)));
            assert!(repository.save_logged_in_user(None).is_ok());
            assert_eq!(repository.logged_in_user().ok(), Some(None));
        }
    }
}
