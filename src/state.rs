//! The attribute-tree state container handed between the orchestrator and a
//! reconciler.
//!
//! [`ResourceData`] pairs the identifier binding (the remote id, empty until
//! the first successful create) with the attribute values of one resource
//! instance. Reads go through zero-value getters so translators never have to
//! care whether an optional attribute was set; writes are type-checked against
//! the schema the container was built with.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::Schema;
use crate::validation::check_value;

/// The key under which the binding appears in the serialized state tree.
pub const ID_KEY: &str = "id";

/// State of a single resource or data source instance.
#[derive(Debug, Clone)]
pub struct ResourceData {
    id: String,
    attributes: Map<String, Value>,
    schema: Arc<Schema>,
}

impl ResourceData {
    /// Create an empty container with no binding.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            id: String::new(),
            attributes: Map::new(),
            schema,
        }
    }

    /// Build a container from a state tree.
    ///
    /// A string `id` key becomes the binding; every other key is kept as an
    /// attribute. `null` yields an empty container.
    pub fn from_state(schema: Arc<Schema>, state: Value) -> Result<Self, ProviderError> {
        let mut attributes = match state {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProviderError::Validation(format!(
                    "expected state to be an object, got {}",
                    other
                )))
            },
        };
        let id = match attributes.remove(ID_KEY) {
            Some(Value::String(id)) => id,
            Some(Value::Null) | None => String::new(),
            Some(other) => {
                return Err(ProviderError::Validation(format!(
                    "expected '{}' to be a string, got {}",
                    ID_KEY, other
                )))
            },
        };
        Ok(Self {
            id,
            attributes,
            schema,
        })
    }

    /// Build a container holding nothing but a binding, as used by import.
    pub fn from_id(schema: Arc<Schema>, id: impl Into<String>) -> Self {
        let mut data = Self::new(schema);
        data.set_id(id);
        data
    }

    /// The schema this container validates writes against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The bound remote identifier, empty when unbound.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether a remote identifier is bound.
    pub fn is_bound(&self) -> bool {
        !self.id.is_empty()
    }

    /// Bind a remote identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Drop the binding. The resource no longer exists as far as this
    /// process knows.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Raw access to an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    /// A string attribute, or `""` when unset.
    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// A string attribute, or `None` when unset or empty.
    pub fn get_opt_str(&self, key: &str) -> Option<&str> {
        Some(self.get_str(key)).filter(|s| !s.is_empty())
    }

    /// A boolean attribute, or `false` when unset.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or_default()
    }

    /// An integer attribute, or `0` when unset.
    pub fn get_i64(&self, key: &str) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or_default()
    }

    /// A list attribute or list block, or an empty slice when unset.
    pub fn get_list(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Write an attribute.
    ///
    /// The value is serialized and checked against the schema; on failure the
    /// previous value is kept and the error describes what went wrong.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), ProviderError> {
        if key == ID_KEY {
            return Err(ProviderError::programming(
                "the id is a binding, use set_id instead",
            ));
        }
        let value = serde_json::to_value(value)?;
        if let Some(diagnostic) = check_value(&self.schema.block, key, &value).into_iter().next() {
            let detail = diagnostic.detail.unwrap_or_default();
            return Err(ProviderError::Validation(format!(
                "{}: {}",
                diagnostic.summary, detail
            )));
        }
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    /// The serialized state tree, or `None` when no binding exists.
    pub fn to_state(&self) -> Option<Value> {
        if !self.is_bound() {
            return None;
        }
        let mut map = self.attributes.clone();
        map.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        Some(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::v0()
                .with_attribute("id", Attribute::computed_string())
                .with_attribute("name", Attribute::required_string())
                .with_attribute("custom", Attribute::optional_bool())
                .with_attribute("last_modified_ts", Attribute::computed_int64())
                .with_attribute(
                    "account_ids",
                    Attribute::new(
                        crate::schema::AttributeType::list(crate::schema::AttributeType::String),
                        crate::schema::AttributeFlags::optional(),
                    ),
                ),
        )
    }

    #[test]
    fn test_from_state_extracts_binding() {
        let data = ResourceData::from_state(
            schema(),
            json!({"id": "pg-1", "name": "grp1", "custom": true}),
        )
        .unwrap();

        assert_eq!(data.id(), "pg-1");
        assert!(data.is_bound());
        assert_eq!(data.get_str("name"), "grp1");
        assert!(data.get_bool("custom"));
        assert!(data.get("id").is_none());
    }

    #[test]
    fn test_zero_value_getters() {
        let data = ResourceData::from_state(schema(), json!({"name": null})).unwrap();
        assert!(!data.is_bound());
        assert_eq!(data.get_str("name"), "");
        assert_eq!(data.get_opt_str("name"), None);
        assert!(!data.get_bool("custom"));
        assert_eq!(data.get_i64("last_modified_ts"), 0);
        assert!(data.get_list("account_ids").is_empty());
    }

    #[test]
    fn test_from_state_rejects_non_object() {
        assert!(ResourceData::from_state(schema(), json!([1, 2])).is_err());
        assert!(ResourceData::from_state(schema(), json!({"id": 7})).is_err());
    }

    #[test]
    fn test_set_type_checks() {
        let mut data = ResourceData::new(schema());
        data.set("name", "grp1").unwrap();
        data.set("last_modified_ts", &1700000000000_i64).unwrap();
        data.set("account_ids", &vec!["a", "b"]).unwrap();

        let err = data.set("custom", "yes").unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(!data.get_bool("custom"));

        assert!(data.set("unknown", &1).is_err());
        assert!(matches!(
            data.set("id", "x").unwrap_err(),
            ProviderError::Programming(_)
        ));
    }

    #[test]
    fn test_to_state_requires_binding() {
        let mut data = ResourceData::new(schema());
        data.set("name", "grp1").unwrap();
        assert!(data.to_state().is_none());

        data.set_id("pg-1");
        let state = data.to_state().unwrap();
        assert_eq!(state["id"], "pg-1");
        assert_eq!(state["name"], "grp1");

        data.clear_id();
        assert!(data.to_state().is_none());
    }

    #[test]
    fn test_from_id() {
        let data = ResourceData::from_id(schema(), "pg-9");
        assert_eq!(data.id(), "pg-9");
        assert_eq!(data.get_str("name"), "");
    }
}
