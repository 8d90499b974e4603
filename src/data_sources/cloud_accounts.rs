//! `prismacloud_cloud_accounts`: every onboarded cloud account, for discovery.
//!
//! Nothing here owns a binding. The state gets the fixed id
//! [`CLOUD_ACCOUNTS_ID`] so the orchestrator has something to key it by.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::client::Client;
use crate::error::ProviderError;
use crate::resource::{DataSourceHandler, ProviderMeta, StateWriter};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::state::ResourceData;

/// Fixed identifier of the data source state.
pub const CLOUD_ACCOUNTS_ID: &str = "cloud_accounts";

/// Enough of a cloud account to identify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAccountSummary {
    /// Display name.
    pub name: String,
    /// `aws`, `azure`, `gcp`, ...
    pub cloud_type: String,
    /// The provider-side account id.
    pub account_id: String,
}

/// Fetch every cloud account, in the order the API returns them.
pub async fn list_cloud_accounts(client: &dyn Client) -> Result<Vec<CloudAccountSummary>, ProviderError> {
    Ok(client.cloud_accounts().names().await?)
}

/// The cloud accounts data source.
pub struct CloudAccounts {
    schema: Arc<Schema>,
}

impl CloudAccounts {
    /// Type name registered with the orchestrator.
    pub const TYPE_NAME: &'static str = "prismacloud_cloud_accounts";

    /// Create the data source.
    pub fn new() -> Self {
        Self {
            schema: Arc::new(Self::build_schema()),
        }
    }

    fn build_schema() -> Schema {
        let account = AttributeType::object([
            ("name", AttributeType::String),
            ("cloud_type", AttributeType::String),
            ("account_id", AttributeType::String),
        ]);
        Schema::v0()
            .with_description("Cloud accounts")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "accounts",
                Attribute::new(AttributeType::list(account), AttributeFlags::computed())
                    .with_description("List of accounts"),
            )
    }
}

impl Default for CloudAccounts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSourceHandler for CloudAccounts {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    #[instrument(skip_all, fields(data_source_type = CloudAccounts::TYPE_NAME))]
    async fn read(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic> {
        let items = match list_cloud_accounts(meta.client.as_ref()).await {
            Ok(items) => items,
            Err(err) => {
                error!(error = %err, "Listing cloud accounts failed");
                return vec![err.into()];
            },
        };

        data.set_id(CLOUD_ACCOUNTS_ID);
        let accounts: Vec<_> = items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "cloud_type": item.cloud_type,
                    "account_id": item.account_id,
                })
            })
            .collect();

        info!(count = accounts.len(), "Listed cloud accounts");
        let mut writer = StateWriter::new(data);
        writer.set("accounts", &accounts);
        writer.finish()
    }
}
