//! Dashboard entities as they are stored. Field names are camelCase on the wire so
//! payloads already held by the remote service keep deserializing.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ads_account_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSource {
    Manual,
    Meta,
}

impl ImportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Meta => "meta",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub unique_id: String,
    pub client_id: String,
    pub source: ImportSource,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub campaign_name: String,
    #[serde(default)]
    pub ad_set_name: String,
    pub ad_name: String,
    pub day: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub purchases: u64,
    #[serde(default)]
    pub purchase_value: f64,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub reach: u64,
    #[serde(default)]
    pub link_clicks: u64,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub thru_plays: u64,
    #[serde(default)]
    pub video_average_play_time: f64,
}

/// Client id to that client's records, in arrival order.
pub type PerformanceData = BTreeMap<String, Vec<PerformanceRecord>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoData {
    #[serde(rename = "type")]
    pub kind: ImportSource,
    pub keys: Vec<String>,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: String,
    pub timestamp: String,
    pub source: ImportSource,
    pub file_name: String,
    pub client_name: String,
    pub description: String,
    pub file_hash: String,
    pub undo_data: UndoData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverted_at: Option<String>,
}

impl ImportBatch {
    pub fn is_reverted(&self) -> bool {
        self.reverted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsApiConfig {
    pub access_token: String,
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

pub const DEFAULT_ADS_API_VERSION: &str = "v19.0";

/// Per-client fingerprint ledger: client id to the fingerprints merged for it.
///
/// Stored as nested maps with a `true` marker to match the existing payload shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintLedger(BTreeMap<String, BTreeMap<String, bool>>);

impl FingerprintLedger {
    pub fn contains(&self, client_id: &str, fingerprint: &str) -> bool {
        self.0
            .get(client_id)
            .and_then(|entries| entries.get(fingerprint))
            .copied()
            .unwrap_or(false)
    }

    pub fn insert(&mut self, client_id: &str, fingerprint: &str) {
        self.0
            .entry(client_id.to_string())
            .or_default()
            .insert(fingerprint.to_string(), true);
    }

    pub fn remove(&mut self, client_id: &str, fingerprint: &str) -> bool {
        let Some(entries) = self.0.get_mut(client_id) else {
            return false;
        };
        let removed = entries.remove(fingerprint).is_some();
        if entries.is_empty() {
            self.0.remove(client_id);
        }
        removed
    }

    pub fn fingerprints(&self, client_id: &str) -> BTreeSet<String> {
        self.0
            .get(client_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, present)| **present)
                    .map(|(fingerprint, _)| fingerprint.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, client_id: &str) -> usize {
        self.fingerprints(client_id).len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|entries| entries.is_empty())
    }
}
