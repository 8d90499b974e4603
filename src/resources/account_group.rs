//! `prismacloud_account_group`: a named collection of onboarded cloud accounts.

use serde::{Deserialize, Serialize};

use crate::client::{Client, EntityApi};
use crate::error::ProviderError;
use crate::resource::{Entity, ResourceKind, StateWriter};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::state::ResourceData;

/// An account group as the API represents it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountGroup {
    /// Assigned by Prisma Cloud on create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Unique group name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Member cloud account ids.
    #[serde(default)]
    pub account_ids: Vec<String>,
    /// Server maintained.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_modified_by: String,
    /// Server maintained, epoch millis.
    #[serde(default)]
    pub last_modified_ts: i64,
}

impl Entity for AccountGroup {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// The account group resource kind.
pub struct AccountGroupResource;

impl ResourceKind for AccountGroupResource {
    type Entity = AccountGroup;

    const TYPE_NAME: &'static str = "prismacloud_account_group";
    const DISPLAY_NAME: &'static str = "account group";

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Account group")
            .with_attribute("id", Attribute::computed_string().with_description("Account group id"))
            .with_attribute("name", Attribute::required_string().with_description("Group name"))
            .with_attribute("description", Attribute::optional_string().with_description("Description"))
            .with_attribute(
                "account_ids",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                )
                .with_description("Cloud account ids in this group"),
            )
            .with_attribute(
                "last_modified_by",
                Attribute::computed_string().with_description("Last modified by"),
            )
            .with_attribute(
                "last_modified_ts",
                Attribute::computed_int64().with_description("Last modified timestamp"),
            )
    }

    fn api(client: &dyn Client) -> &dyn EntityApi<AccountGroup> {
        client.account_groups()
    }

    fn parse(data: &ResourceData) -> Result<AccountGroup, ProviderError> {
        let account_ids = data
            .get_list("account_ids")
            .iter()
            .enumerate()
            .map(|(i, value)| {
                value.as_str().map(str::to_string).ok_or_else(|| {
                    ProviderError::programming(format!("account_ids.{}: expected a string, got {}", i, value))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AccountGroup {
            name: data.get_str("name").to_string(),
            description: data.get_str("description").to_string(),
            account_ids,
            ..Default::default()
        })
    }

    fn save(data: &mut ResourceData, group: &AccountGroup) -> Vec<Diagnostic> {
        let mut writer = StateWriter::new(data);
        writer
            .set("name", &group.name)
            .set("description", &group.description)
            .set("account_ids", &group.account_ids)
            .set("last_modified_by", &group.last_modified_by)
            .set("last_modified_ts", &group.last_modified_ts);
        writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn data(state: Value) -> ResourceData {
        ResourceData::from_state(Arc::new(AccountGroupResource::schema()), state).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let group = AccountGroup {
            id: "ag-1".into(),
            name: "prod".into(),
            description: "production accounts".into(),
            account_ids: vec!["111".into(), "222".into()],
            last_modified_by: "admin".into(),
            last_modified_ts: 10,
        };

        let mut state = data(json!({"id": "ag-1"}));
        assert!(AccountGroupResource::save(&mut state, &group).is_empty());

        let parsed = AccountGroupResource::parse(&state).unwrap();
        assert_eq!(parsed.name, group.name);
        assert_eq!(parsed.description, group.description);
        assert_eq!(parsed.account_ids, group.account_ids);
        assert!(parsed.id.is_empty());
        assert!(parsed.last_modified_by.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_string_account_id() {
        let err = AccountGroupResource::parse(&data(json!({"name": "g", "account_ids": [1]})))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Programming(_)));
    }

    #[test]
    fn test_wire_format() {
        let wire = serde_json::to_value(AccountGroup {
            name: "prod".into(),
            account_ids: vec!["111".into()],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(wire["accountIds"][0], "111");
        assert!(wire.get("id").is_none());
    }
}
