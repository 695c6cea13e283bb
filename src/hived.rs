//! Small typed facade over a hived node's `database_api`.

use crate::api::{CONDENSER_API, DATABASE_API};
use crate::client::JsonRpcClient;
use crate::{Result, Settings};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Subset of the dynamic global properties most callers need. Everything
/// else the node sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u64,
    pub head_block_id: String,
    pub time: String,
    #[serde(default)]
    pub last_irreversible_block_num: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Version {
    pub blockchain_version: String,
    pub hive_revision: String,
    pub fc_revision: String,
    pub chain_id: String,
    #[serde(default)]
    pub node_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Serialize)]
struct FindAccountsParams<'a> {
    accounts: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    delayed_votes_active: Option<bool>,
}

#[derive(Deserialize)]
struct FindAccountsResult {
    accounts: Vec<Account>,
}

#[derive(Debug, Clone)]
pub struct HivedClient {
    client: JsonRpcClient,
}

impl HivedClient {
    pub fn new(client: JsonRpcClient) -> Self {
        Self { client }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(JsonRpcClient::from_settings(settings)?))
    }

    pub fn client(&self) -> &JsonRpcClient {
        &self.client
    }

    pub async fn get_dynamic_global_properties(&self) -> Result<DynamicGlobalProperties> {
        self.client
            .invoke(&DATABASE_API.qualified("get_dynamic_global_properties"), &json!({}))
            .await
    }

    pub async fn get_version(&self) -> Result<Version> {
        self.client
            .invoke(&DATABASE_API.qualified("get_version"), &json!({}))
            .await
    }

    /// The node configuration, left untyped: its keys depend on the build.
    pub async fn get_config(&self) -> Result<Value> {
        self.client
            .invoke(&DATABASE_API.qualified("get_config"), &json!({}))
            .await
    }

    pub async fn find_accounts(&self, names: &[&str]) -> Result<Vec<Account>> {
        let params = FindAccountsParams {
            accounts: names,
            delayed_votes_active: None,
        };
        let found: FindAccountsResult = self
            .client
            .invoke(&DATABASE_API.qualified("find_accounts"), &params)
            .await?;
        Ok(found.accounts)
    }

    /// A block by number; `None` when the node does not have it yet.
    pub async fn get_block(&self, block_num: u64) -> Result<Option<Value>> {
        self.client
            .invoke(&CONDENSER_API.qualified("get_block"), &json!([block_num]))
            .await
    }
}
