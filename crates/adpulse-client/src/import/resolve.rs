use crate::model::Client;

/// Matches a record's account name to a client: first by ads account, then by display
/// name, both case-insensitive.
pub(crate) struct ClientResolver<'a> {
    clients: &'a [Client],
    forced: Option<&'a Client>,
}

impl<'a> ClientResolver<'a> {
    pub(crate) fn new(clients: &'a [Client]) -> Self {
        Self {
            clients,
            forced: None,
        }
    }

    /// Every record resolves to `client`, whatever its account name says.
    pub(crate) fn forced(clients: &'a [Client], client: &'a Client) -> Self {
        Self {
            clients,
            forced: Some(client),
        }
    }

    pub(crate) fn resolve(&self, account_name: Option<&str>) -> Option<&'a Client> {
        if let Some(client) = self.forced {
            return Some(client);
        }

        let wanted = account_name?.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        self.clients
            .iter()
            .find(|client| {
                client
                    .ads_account_name
                    .as_deref()
                    .is_some_and(|account| account.trim().to_lowercase() == wanted)
            })
            .or_else(|| {
                self.clients
                    .iter()
                    .find(|client| client.name.trim().to_lowercase() == wanted)
            })
    }
}
