//! `prismacloud_permission_group`: a named set of feature grants that roles
//! can be attached to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::client::{Client, EntityApi};
use crate::error::ProviderError;
use crate::resource::{Entity, ResourceKind, StateWriter};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema};
use crate::state::ResourceData;

/// The kind of a permission group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionGroupType {
    /// Shipped with the tenant.
    Default,
    /// Defined by a user.
    Custom,
    /// Reserved for Prisma Cloud itself.
    Internal,
}

impl PermissionGroupType {
    /// Every accepted value, in wire form.
    pub const ALL: [&'static str; 3] = ["Default", "Custom", "Internal"];

    /// The wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Custom => "Custom",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for PermissionGroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionGroupType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Default" => Ok(Self::Default),
            "Custom" => Ok(Self::Custom),
            "Internal" => Ok(Self::Internal),
            other => Err(ProviderError::Validation(format!(
                "permission_group_type must be one of [{}], got {:?}",
                Self::ALL.join(", "),
                other
            ))),
        }
    }
}

/// Which operations a feature grant allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Operations {
    /// Grant create.
    #[serde(default)]
    pub create: bool,
    /// Grant read.
    #[serde(default)]
    pub read: bool,
    /// Grant update.
    #[serde(default)]
    pub update: bool,
    /// Grant delete.
    #[serde(default)]
    pub delete: bool,
}

/// A single feature grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// The feature, e.g. `alerts`.
    pub feature_name: String,
    /// The granted operations.
    pub operations: Operations,
}

/// A role attached to the group. Maintained by Prisma Cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedRole {
    /// Role identifier.
    pub role_id: String,
    /// Role name.
    pub name: String,
}

/// A permission group as the API represents it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGroup {
    /// Assigned by Prisma Cloud on create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Unique group name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Group kind.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub permission_group_type: Option<PermissionGroupType>,
    /// Who last changed the group. Server maintained.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_modified_by: String,
    /// When the group last changed, in epoch millis. Server maintained.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_modified_ts: i64,
    /// Whether roles using the group may be scoped to account groups.
    #[serde(default)]
    pub accept_account_groups: bool,
    /// Whether roles using the group may be scoped to resource lists.
    #[serde(default)]
    pub accept_resource_lists: bool,
    /// Whether roles using the group may be scoped to code repositories.
    #[serde(default)]
    pub accept_code_repositories: bool,
    /// Set for user-defined groups.
    #[serde(default)]
    pub custom: bool,
    /// Roles using the group. Server maintained.
    #[serde(default)]
    pub associated_roles: Vec<AssociatedRole>,
    /// Feature grants, in declaration order.
    #[serde(default)]
    pub features: Vec<Feature>,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl Entity for PermissionGroup {
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

/// The permission group resource kind.
pub struct PermissionGroupResource;

impl ResourceKind for PermissionGroupResource {
    type Entity = PermissionGroup;

    const TYPE_NAME: &'static str = "prismacloud_permission_group";
    const DISPLAY_NAME: &'static str = "permission group";

    fn schema() -> Schema {
        let operations = Block::new()
            .with_attribute("create", Attribute::optional_bool().with_description("Create operation"))
            .with_attribute("read", Attribute::optional_bool().with_description("Read operation"))
            .with_attribute("update", Attribute::optional_bool().with_description("Update operation"))
            .with_attribute("delete", Attribute::optional_bool().with_description("Delete operation"));

        let feature = Block::new()
            .with_attribute(
                "feature_name",
                Attribute::required_string().with_description("Feature name"),
            )
            .with_block("operations", NestedBlock::single(operations).with_min_items(1));

        let role = AttributeType::object([
            ("role_id", AttributeType::String),
            ("name", AttributeType::String),
        ]);

        Schema::v0()
            .with_description("Permission group")
            .with_attribute("id", Attribute::computed_string().with_description("Permission group id"))
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Name of the permission group"),
            )
            .with_attribute("description", Attribute::optional_string().with_description("Description"))
            .with_attribute(
                "permission_group_type",
                Attribute::optional_string()
                    .with_description("Permission group type")
                    .with_allowed_values(PermissionGroupType::ALL),
            )
            .with_attribute(
                "last_modified_by",
                Attribute::computed_string().with_description("Last modified by"),
            )
            .with_attribute(
                "last_modified_ts",
                Attribute::computed_int64().with_description("Last modified timestamp"),
            )
            .with_attribute(
                "associated_roles",
                Attribute::new(AttributeType::list(role), AttributeFlags::computed())
                    .with_description("Associated permission roles"),
            )
            .with_attribute(
                "accept_account_groups",
                Attribute::optional_bool().with_description("Accept account groups"),
            )
            .with_attribute(
                "accept_resource_lists",
                Attribute::optional_bool().with_description("Accept resource lists"),
            )
            .with_attribute(
                "accept_code_repositories",
                Attribute::optional_bool().with_description("Accept code repositories"),
            )
            .with_attribute("custom", Attribute::optional_bool().with_description("Custom"))
            .with_block("features", NestedBlock::list(feature).with_min_items(1))
    }

    fn api(client: &dyn Client) -> &dyn EntityApi<PermissionGroup> {
        client.permission_groups()
    }

    fn parse(data: &ResourceData) -> Result<PermissionGroup, ProviderError> {
        let features = data
            .get_list("features")
            .iter()
            .enumerate()
            .map(|(i, value)| parse_feature(i, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PermissionGroup {
            name: data.get_str("name").to_string(),
            description: data.get_str("description").to_string(),
            permission_group_type: data
                .get_opt_str("permission_group_type")
                .map(str::parse)
                .transpose()?,
            accept_account_groups: data.get_bool("accept_account_groups"),
            accept_resource_lists: data.get_bool("accept_resource_lists"),
            accept_code_repositories: data.get_bool("accept_code_repositories"),
            custom: data.get_bool("custom"),
            features,
            ..Default::default()
        })
    }

    fn save(data: &mut ResourceData, group: &PermissionGroup) -> Vec<Diagnostic> {
        let roles: Vec<Value> = group
            .associated_roles
            .iter()
            .map(|role| json!({"role_id": role.role_id, "name": role.name}))
            .collect();
        let features: Vec<Value> = group.features.iter().map(feature_to_state).collect();

        let mut writer = StateWriter::new(data);
        writer
            .set("name", &group.name)
            .set("description", &group.description)
            .set("last_modified_by", &group.last_modified_by)
            .set("last_modified_ts", &group.last_modified_ts)
            .set(
                "permission_group_type",
                &group.permission_group_type.map(|t| t.as_str()),
            )
            .set("accept_account_groups", &group.accept_account_groups)
            .set("accept_resource_lists", &group.accept_resource_lists)
            .set("associated_roles", &roles)
            .set("accept_code_repositories", &group.accept_code_repositories)
            .set("custom", &group.custom)
            .set("features", &features);
        writer.finish()
    }
}

fn feature_to_state(feature: &Feature) -> Value {
    json!({
        "feature_name": feature.feature_name,
        "operations": {
            "create": feature.operations.create,
            "read": feature.operations.read,
            "update": feature.operations.update,
            "delete": feature.operations.delete,
        },
    })
}

fn parse_feature(index: usize, value: &Value) -> Result<Feature, ProviderError> {
    let path = format!("features.{}", index);
    let feature = value
        .as_object()
        .ok_or_else(|| ProviderError::programming(format!("{}: expected an object, got {}", path, value)))?;

    let feature_name = feature
        .get("feature_name")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::programming(format!("{}: missing feature_name", path)))?;

    let operations = match feature.get("operations") {
        Some(Value::Object(ops)) => ops,
        Some(Value::Array(items)) if items.len() == 1 => items[0].as_object().ok_or_else(|| {
            ProviderError::programming(format!("{}.operations: expected an object", path))
        })?,
        other => {
            return Err(ProviderError::programming(format!(
                "{}.operations: expected a single block, got {}",
                path,
                other.map_or_else(|| "nothing".to_string(), Value::to_string)
            )))
        },
    };

    Ok(Feature {
        feature_name: feature_name.to_string(),
        operations: Operations {
            create: operation_flag(&path, operations, "create")?,
            read: operation_flag(&path, operations, "read")?,
            update: operation_flag(&path, operations, "update")?,
            delete: operation_flag(&path, operations, "delete")?,
        },
    })
}

fn operation_flag(path: &str, operations: &Map<String, Value>, key: &str) -> Result<bool, ProviderError> {
    match operations.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(ProviderError::programming(format!(
            "{}.operations.{}: expected a bool, got {}",
            path, key, other
        ))),
    }
}
