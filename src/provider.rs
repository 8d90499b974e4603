//! The entry points the orchestrator calls.
//!
//! [`PrismaCloudProvider`] owns the shared client session and dispatches every
//! lifecycle call to the handler registered for the resource or data source
//! type. Inputs and outputs are plain JSON state trees; failures come back as
//! diagnostics, never as panics or transport errors.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use prismacloud_provider::testing::{assert_no_errors, InMemoryPrismaCloud};
//! use prismacloud_provider::PrismaCloudProvider;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let provider = PrismaCloudProvider::new(Arc::new(InMemoryPrismaCloud::new()));
//! assert_no_errors(&provider.configure(json!({})).await);
//!
//! let created = provider
//!     .create(
//!         "prismacloud_permission_group",
//!         json!({
//!             "name": "grp1",
//!             "permission_group_type": "Custom",
//!             "features": [{"feature_name": "alerts", "operations": {"read": true}}]
//!         }),
//!     )
//!     .await;
//! assert_no_errors(&created.diagnostics);
//! assert!(created.id().is_some());
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::client::Client;
use crate::config::ProviderConfig;
use crate::data_sources::CloudAccounts;
use crate::error::ProviderError;
use crate::locks::{BindingGuard, BindingLocks};
use crate::logging;
use crate::poll::Poller;
use crate::resource::{DataSourceHandler, ProviderMeta, Reconciler, ResourceHandler};
use crate::resources::{AccountGroupResource, PermissionGroupResource};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::state::ResourceData;
use crate::types::{ProviderMetadata, ResourceResponse};
use crate::validation::{validate, validate_config};

/// The Prisma Cloud provider.
pub struct PrismaCloudProvider {
    client: Arc<dyn Client>,
    config: RwLock<ProviderConfig>,
    resources: HashMap<&'static str, Arc<dyn ResourceHandler>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSourceHandler>>,
    locks: BindingLocks,
    shutdown: CancellationToken,
}

impl PrismaCloudProvider {
    /// Create the provider on top of an authenticated session.
    pub fn new(client: Arc<dyn Client>) -> Self {
        let mut provider = Self {
            client,
            config: RwLock::new(ProviderConfig::default()),
            resources: HashMap::new(),
            data_sources: HashMap::new(),
            locks: BindingLocks::new(),
            shutdown: CancellationToken::new(),
        };
        provider.register_resource(Reconciler::<PermissionGroupResource>::new());
        provider.register_resource(Reconciler::<AccountGroupResource>::new());
        provider.register_data_source(CloudAccounts::new());
        provider
    }

    /// Replace the active configuration without going through [`configure`](Self::configure).
    pub fn with_config(self, config: ProviderConfig) -> Self {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        self
    }

    fn register_resource(&mut self, handler: impl ResourceHandler + 'static) {
        self.resources.insert(handler.type_name(), Arc::new(handler));
    }

    fn register_data_source(&mut self, handler: impl DataSourceHandler + 'static) {
        self.data_sources.insert(handler.type_name(), Arc::new(handler));
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> ProviderConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Schemas of the provider block, every resource and every data source.
    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: ProviderConfig::schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, handler)| (name.to_string(), (*handler.schema()).clone()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, handler)| (name.to_string(), (*handler.schema()).clone()))
                .collect(),
        }
    }

    /// Registered type names.
    pub fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.resources.keys().map(|s| s.to_string()).collect();
        let mut data_sources: Vec<String> =
            self.data_sources.keys().map(|s| s.to_string()).collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Check the provider block without applying it.
    pub fn validate_provider_config(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validate(&ProviderConfig::schema(), config);
        if !has_errors(&diagnostics) {
            if let Err(err) = ProviderConfig::from_value(config.clone()) {
                diagnostics.push(err.into());
            }
        }
        diagnostics
    }

    /// Apply the provider block.
    #[instrument(skip_all)]
    pub async fn configure(&self, config: Value) -> Vec<Diagnostic> {
        debug!("Configure called");
        let diagnostics = validate(&ProviderConfig::schema(), &config);
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
            return diagnostics;
        }

        let config = match ProviderConfig::from_value(config) {
            Ok(config) => config,
            Err(err) => {
                error!(error = %err, "Configure failed");
                return vec![err.into()];
            },
        };

        if logging::try_init_logging_with_default(config.log_level.as_deref()) {
            debug!("Installed log subscriber");
        }

        info!(
            interval = ?config.retry.interval,
            max_wait = ?config.retry.max_wait,
            "Configure completed successfully"
        );
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        diagnostics
    }

    /// Abort every in-flight wait. Creates issued afterwards are refused before
    /// any remote call.
    pub async fn stop(&self) {
        info!("Stop called");
        self.shutdown.cancel();
    }

    fn meta(&self) -> ProviderMeta {
        let poller = Poller::new(self.config().retry).with_cancellation(self.shutdown.child_token());
        ProviderMeta::new(Arc::clone(&self.client), poller)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn ResourceHandler>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(
        &self,
        data_source_type: &str,
    ) -> Result<&Arc<dyn DataSourceHandler>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    async fn lock(&self, resource_type: &str, data: &ResourceData) -> BindingGuard {
        let key = if data.is_bound() {
            BindingLocks::id_key(resource_type, data.id())
        } else {
            BindingLocks::name_key(resource_type, data.get_str("name"))
        };
        self.locks.lock(key).await
    }

    /// Check what the user wrote for a resource.
    pub fn validate_resource_config(&self, resource_type: &str, config: &Value) -> Vec<Diagnostic> {
        match self.resource(resource_type) {
            Ok(handler) => validate_config(&handler.schema(), config),
            Err(err) => vec![err.into()],
        }
    }

    /// Create the remote object described by `planned`.
    #[instrument(skip(self, planned))]
    pub async fn create(&self, resource_type: &str, planned: Value) -> ResourceResponse {
        info!("Create called");
        let handler = match self.resource(resource_type) {
            Ok(handler) => handler,
            Err(err) => return failed(err),
        };

        if self.shutdown.is_cancelled() {
            return failed(ProviderError::Cancelled("provider is stopping".to_string()));
        }

        let diagnostics = validate(&handler.schema(), &planned);
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "Planned state is invalid");
            return ResourceResponse::from_diagnostics(diagnostics);
        }

        let mut data = match ResourceData::from_state(handler.schema(), planned) {
            Ok(data) => data,
            Err(err) => return failed(err),
        };
        data.clear_id();

        let _guard = self.lock(resource_type, &data).await;
        let diagnostics = handler.create(&self.meta(), &mut data).await;
        finish("Create", data.to_state(), diagnostics)
    }

    /// Refresh `current` from the remote object.
    ///
    /// `state: None` in the response means the object no longer exists.
    #[instrument(skip(self, current))]
    pub async fn read(&self, resource_type: &str, current: Value) -> ResourceResponse {
        debug!("Read called");
        let handler = match self.resource(resource_type) {
            Ok(handler) => handler,
            Err(err) => return failed(err),
        };

        let mut data = match ResourceData::from_state(handler.schema(), current) {
            Ok(data) => data,
            Err(err) => return failed(err),
        };

        let _guard = self.lock(resource_type, &data).await;
        let diagnostics = handler.read(&self.meta(), &mut data).await;
        finish("Read", data.to_state(), diagnostics)
    }

    /// Push `planned` to the object bound in `prior`.
    ///
    /// On failure the prior state is returned unchanged.
    #[instrument(skip(self, prior, planned))]
    pub async fn update(&self, resource_type: &str, prior: Value, planned: Value) -> ResourceResponse {
        info!("Update called");
        let handler = match self.resource(resource_type) {
            Ok(handler) => handler,
            Err(err) => return failed(err),
        };

        let diagnostics = validate(&handler.schema(), &planned);
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "Planned state is invalid");
            return ResourceResponse::from_diagnostics(diagnostics);
        }

        let (prior, mut data) = match (
            ResourceData::from_state(handler.schema(), prior),
            ResourceData::from_state(handler.schema(), planned),
        ) {
            (Ok(prior), Ok(planned)) => (prior, planned),
            (Err(err), _) | (_, Err(err)) => return failed(err),
        };
        if !data.is_bound() {
            data.set_id(prior.id());
        } else if prior.is_bound() && prior.id() != data.id() {
            return failed(ProviderError::Validation(format!(
                "planned id {} does not match prior id {}",
                data.id(),
                prior.id()
            )));
        }

        let _guard = self.lock(resource_type, &data).await;
        let diagnostics = handler.update(&self.meta(), &mut data).await;
        if has_errors(&diagnostics) {
            return finish("Update", prior.to_state(), diagnostics);
        }
        finish("Update", data.to_state(), diagnostics)
    }

    /// Delete the object bound in `current`. Deleting an object that is
    /// already gone succeeds.
    #[instrument(skip(self, current))]
    pub async fn delete(&self, resource_type: &str, current: Value) -> ResourceResponse {
        info!("Delete called");
        let handler = match self.resource(resource_type) {
            Ok(handler) => handler,
            Err(err) => return failed(err),
        };

        let mut data = match ResourceData::from_state(handler.schema(), current) {
            Ok(data) => data,
            Err(err) => return failed(err),
        };

        let _guard = self.lock(resource_type, &data).await;
        let diagnostics = handler.delete(&self.meta(), &mut data).await;
        finish("Delete", data.to_state(), diagnostics)
    }

    /// Bring an existing remote object under management from its id alone.
    #[instrument(skip(self))]
    pub async fn import_resource(&self, resource_type: &str, id: &str) -> ResourceResponse {
        info!("ImportResourceState called");
        let handler = match self.resource(resource_type) {
            Ok(handler) => handler,
            Err(err) => return failed(err),
        };

        let mut data = ResourceData::from_id(handler.schema(), id);
        let _guard = self.lock(resource_type, &data).await;
        let mut diagnostics = handler.read(&self.meta(), &mut data).await;
        if !has_errors(&diagnostics) && !data.is_bound() {
            let err = ProviderError::NotFound(format!("cannot import {} {}", resource_type, id));
            diagnostics.push(err.into());
        }
        finish("ImportResourceState", data.to_state(), diagnostics)
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Check what the user wrote for a data source.
    pub fn validate_data_source_config(&self, data_source_type: &str, config: &Value) -> Vec<Diagnostic> {
        match self.data_source(data_source_type) {
            Ok(handler) => validate_config(&handler.schema(), config),
            Err(err) => vec![err.into()],
        }
    }

    /// Run a lookup.
    #[instrument(skip(self, config))]
    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> ResourceResponse {
        debug!("ReadDataSource called");
        let handler = match self.data_source(data_source_type) {
            Ok(handler) => handler,
            Err(err) => return failed(err),
        };

        let diagnostics = validate(&handler.schema(), &config);
        if has_errors(&diagnostics) {
            return ResourceResponse::from_diagnostics(diagnostics);
        }

        let mut data = ResourceData::new(handler.schema());
        let diagnostics = handler.read(&self.meta(), &mut data).await;
        finish("ReadDataSource", data.to_state(), diagnostics)
    }
}

fn failed(err: ProviderError) -> ResourceResponse {
    error!(error = %err, "Request rejected");
    ResourceResponse::error(err.into())
}

fn finish(operation: &str, state: Option<Value>, diagnostics: Vec<Diagnostic>) -> ResourceResponse {
    if has_errors(&diagnostics) {
        warn!(diagnostics = diagnostics.len(), "{} completed with errors", operation);
    } else {
        debug!(bound = state.is_some(), "{} completed successfully", operation);
    }
    ResourceResponse::new(state, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::testing::{
        assert_error_contains, assert_has_errors, assert_no_errors, fast_poll_config,
        InMemoryPrismaCloud,
    };
    use serde_json::json;
    use std::time::Duration;

    const PG: &str = "prismacloud_permission_group";

    fn setup(backend: &Arc<InMemoryPrismaCloud>) -> PrismaCloudProvider {
        PrismaCloudProvider::new(backend.clone()).with_config(ProviderConfig {
            retry: fast_poll_config(Duration::from_millis(500)),
            log_level: None,
        })
    }

    fn grp1() -> Value {
        json!({
            "name": "grp1",
            "description": "first group",
            "permission_group_type": "Custom",
            "accept_account_groups": true,
            "features": [
                {"feature_name": "alerts", "operations": {"read": true, "create": true}},
                {"feature_name": "policies", "operations": {"read": true}},
                {"feature_name": "compliance", "operations": {"update": true}}
            ]
        })
    }

    #[test]
    fn test_metadata_lists_everything() {
        let provider = PrismaCloudProvider::new(Arc::new(InMemoryPrismaCloud::new()));
        let metadata = provider.metadata();
        assert_eq!(
            metadata.resources,
            vec!["prismacloud_account_group", "prismacloud_permission_group"]
        );
        assert_eq!(metadata.data_sources, vec!["prismacloud_cloud_accounts"]);

        let schema = provider.schema();
        assert!(schema.resources[PG].block.blocks.contains_key("features"));
        assert!(schema.provider.block.blocks.contains_key("retry"));
    }

    #[tokio::test]
    async fn test_configure_applies_retry_settings() {
        let provider = PrismaCloudProvider::new(Arc::new(InMemoryPrismaCloud::new()));
        let diagnostics = provider
            .configure(json!({"username": "u", "retry": {"interval_ms": 5, "max_wait_ms": 100}}))
            .await;
        assert_no_errors(&diagnostics);
        assert_eq!(provider.config().retry.interval, Duration::from_millis(5));
        assert_eq!(provider.config().retry.max_wait, Duration::from_millis(100));

        let diagnostics = provider.configure(json!({"retry": {"max_attempts": "many"}})).await;
        assert_has_errors(&diagnostics);
        assert_eq!(provider.config().retry.max_wait, Duration::from_millis(100));

        assert_has_errors(&provider.validate_provider_config(&json!({"retry": {"backoff_multiplier": 0.1}})));
    }

    #[test]
    fn test_validate_resource_config() {
        let provider = PrismaCloudProvider::new(Arc::new(InMemoryPrismaCloud::new()));
        assert_no_errors(&provider.validate_resource_config(PG, &grp1()));

        let mut config = grp1();
        config["last_modified_by"] = json!("me");
        assert_error_contains(&provider.validate_resource_config(PG, &config), "read-only");

        let mut config = grp1();
        config["permission_group_type"] = json!("Superuser");
        assert_has_errors(&provider.validate_resource_config(PG, &config));

        assert_error_contains(
            &provider.validate_resource_config("prismacloud_nope", &json!({})),
            "Unknown resource type",
        );
        assert_no_errors(&provider.validate_data_source_config("prismacloud_cloud_accounts", &json!({})));
    }

    #[tokio::test]
    async fn test_create_with_immediate_visibility() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let response = provider.create(PG, grp1()).await;
        assert_no_errors(&response.diagnostics);
        let state = response.state.unwrap();
        assert!(!state["id"].as_str().unwrap().is_empty());
        assert_eq!(backend.permission_groups.calls().identify, 1);
        assert_eq!(backend.permission_groups.calls().create, 1);
    }

    #[tokio::test]
    async fn test_create_waits_for_name_then_id() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        backend.permission_groups.set_lag(2, 1);
        let provider = setup(&backend);

        let response = provider.create(PG, grp1()).await;
        assert_no_errors(&response.diagnostics);
        assert!(response.id().is_some());

        let calls = backend.permission_groups.calls();
        assert_eq!(calls.create, 1);
        assert_eq!(calls.identify, 3);
        // Two polled gets (one not yet visible) plus the final read.
        assert_eq!(calls.get, 3);
    }

    #[tokio::test]
    async fn test_create_times_out_without_binding() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        backend.permission_groups.never_visible();
        let provider = PrismaCloudProvider::new(backend.clone()).with_config(ProviderConfig {
            retry: fast_poll_config(Duration::from_millis(30)),
            log_level: None,
        });

        let response = provider.create(PG, grp1()).await;
        assert_error_contains(&response.diagnostics, "Deadline exceeded");
        assert!(response.state.is_none());
        // The object was created remotely even though the wait gave up.
        assert_eq!(backend.permission_groups.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejected_is_not_retried_or_bound() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        backend.permission_groups.fail_next_create(ClientError::Rejected {
            status: 400,
            message: "invalid feature".to_string(),
        });
        let provider = setup(&backend);

        let response = provider.create(PG, grp1()).await;
        assert_error_contains(&response.diagnostics, "invalid feature");
        assert!(response.state.is_none());

        let calls = backend.permission_groups.calls();
        assert_eq!(calls.create, 1);
        assert_eq!(calls.identify, 0);
        assert_eq!(calls.get, 0);
        assert!(backend.permission_groups.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_extreme_backoff_uses_cap() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        backend.permission_groups.set_lag(1, 0);
        let provider = PrismaCloudProvider::new(backend.clone());
        assert_no_errors(
            &provider
                .configure(json!({"retry": {
                    "interval_ms": 1,
                    "max_interval_ms": 2,
                    "max_wait_ms": 500,
                    "backoff_multiplier": 1e300
                }}))
                .await,
        );

        let response = provider.create(PG, grp1()).await;
        assert_no_errors(&response.diagnostics);
        assert!(response.id().is_some());
        assert_eq!(backend.permission_groups.calls().identify, 2);
    }

    #[tokio::test]
    async fn test_create_then_read_preserves_features() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let created = provider.create(PG, grp1()).await.state.unwrap();
        let read = provider.read(PG, created.clone()).await;
        assert_no_errors(&read.diagnostics);
        let state = read.state.unwrap();

        let features = state["features"].as_array().unwrap();
        let names: Vec<_> = features.iter().map(|f| f["feature_name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["alerts", "policies", "compliance"]);
        assert_eq!(features[0]["operations"]["create"], true);
        assert_eq!(features[0]["operations"]["delete"], false);
        assert_eq!(features[2]["operations"]["update"], true);
        assert_eq!(features[2]["operations"]["read"], false);

        assert_eq!(state["name"], "grp1");
        assert_eq!(state["permission_group_type"], "Custom");
        assert_eq!(state["accept_account_groups"], true);
        assert_eq!(state["last_modified_by"], "tester");
        assert!(state["last_modified_ts"].as_i64().unwrap() > 0);
        assert_eq!(state, created);
    }

    #[tokio::test]
    async fn test_update_description_only() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let prior = provider.create(PG, grp1()).await.state.unwrap();
        let mut planned = prior.clone();
        planned["description"] = json!("second");

        let response = provider.update(PG, prior.clone(), planned).await;
        assert_no_errors(&response.diagnostics);
        let state = response.state.unwrap();
        assert_eq!(state["description"], "second");
        assert_eq!(state["id"], prior["id"]);
        assert_eq!(state["features"], prior["features"]);
        assert_eq!(state["name"], prior["name"]);
        assert_eq!(state["permission_group_type"], prior["permission_group_type"]);

        let calls = backend.permission_groups.calls();
        assert_eq!(calls.update, 1);
        assert_eq!(calls.create, 1);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_prior_state() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let prior = provider.create(PG, grp1()).await.state.unwrap();
        backend.permission_groups.fail_next_update(ClientError::Rejected {
            status: 400,
            message: "name in use".into(),
        });

        let mut planned = prior.clone();
        planned["name"] = json!("grp2");
        let response = provider.update(PG, prior.clone(), planned).await;
        assert_error_contains(&response.diagnostics, "name in use");
        assert_eq!(response.state, Some(prior));
    }

    #[tokio::test]
    async fn test_delete_twice_is_success() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let state = provider.create(PG, grp1()).await.state.unwrap();

        let first = provider.delete(PG, state.clone()).await;
        assert_no_errors(&first.diagnostics);
        assert!(first.state.is_none());
        assert!(backend.permission_groups.is_empty());

        let second = provider.delete(PG, state).await;
        assert_no_errors(&second.diagnostics);
        assert!(second.state.is_none());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_binding() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let state = provider.create(PG, grp1()).await.state.unwrap();
        backend
            .permission_groups
            .fail_next_delete(ClientError::Transport("connection reset".into()));

        let response = provider.delete(PG, state.clone()).await;
        assert_has_errors(&response.diagnostics);
        assert_eq!(response.id(), state["id"].as_str());
    }

    #[tokio::test]
    async fn test_read_after_remote_delete_clears_binding() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let state = provider.create(PG, grp1()).await.state.unwrap();
        backend.permission_groups.remove(state["id"].as_str().unwrap());

        let response = provider.read(PG, state).await;
        assert!(response.diagnostics.is_empty());
        assert!(response.state.is_none());
    }

    #[tokio::test]
    async fn test_read_transport_error_keeps_binding() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let state = provider.create(PG, grp1()).await.state.unwrap();
        backend
            .permission_groups
            .fail_next_get(ClientError::Transport("timeout".into()));

        let response = provider.read(PG, state.clone()).await;
        assert_error_contains(&response.diagnostics, "timeout");
        assert_eq!(response.state, Some(state));
    }

    #[tokio::test]
    async fn test_import_by_id() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let created = provider.create(PG, grp1()).await.state.unwrap();
        let id = created["id"].as_str().unwrap();

        let imported = provider.import_resource(PG, id).await;
        assert_no_errors(&imported.diagnostics);
        assert_eq!(imported.state, Some(created));

        let missing = provider.import_resource(PG, "pg-missing").await;
        assert_error_contains(&missing.diagnostics, "Resource not found");
        assert!(missing.state.is_none());
    }

    #[tokio::test]
    async fn test_invalid_planned_state_makes_no_remote_call() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let response = provider.create(PG, json!({"name": "grp1", "permission_group_type": "Custom"})).await;
        assert_has_errors(&response.diagnostics);
        assert_eq!(backend.permission_groups.calls().create, 0);
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let provider = setup(&Arc::new(InMemoryPrismaCloud::new()));
        let response = provider.read("prismacloud_nope", json!({"id": "x"})).await;
        assert_error_contains(&response.diagnostics, "Unknown resource type");

        let response = provider.read_data_source("prismacloud_nope", json!({})).await;
        assert_has_errors(&response.diagnostics);
    }

    #[tokio::test]
    async fn test_account_group_lifecycle() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);
        let kind = "prismacloud_account_group";

        let created = provider
            .create(kind, json!({"name": "prod", "account_ids": ["111", "222"]}))
            .await;
        assert_no_errors(&created.diagnostics);
        let state = created.state.unwrap();
        assert_eq!(state["account_ids"], json!(["111", "222"]));

        let mut planned = state.clone();
        planned["account_ids"] = json!(["111"]);
        let updated = provider.update(kind, state, planned).await.state.unwrap();
        assert_eq!(updated["account_ids"], json!(["111"]));

        assert!(provider.delete(kind, updated).await.state.is_none());
        assert!(backend.account_groups.is_empty());
    }

    #[tokio::test]
    async fn test_cloud_accounts_in_backend_order() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        backend.add_cloud_account("prod-aws", "aws", "111");
        backend.add_cloud_account("dev-gcp", "gcp", "proj-2");
        backend.add_cloud_account("ci-azure", "azure", "sub-3");
        let provider = setup(&backend);

        let response = provider
            .read_data_source("prismacloud_cloud_accounts", json!({}))
            .await;
        assert_no_errors(&response.diagnostics);
        let state = response.state.unwrap();
        assert_eq!(state["id"], "cloud_accounts");
        let names: Vec<_> = state["accounts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["prod-aws", "dev-gcp", "ci-azure"]);
        assert_eq!(state["accounts"][1]["cloud_type"], "gcp");
    }

    #[tokio::test]
    async fn test_cloud_accounts_empty_and_failing() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = setup(&backend);

        let response = provider
            .read_data_source("prismacloud_cloud_accounts", json!({}))
            .await;
        assert_no_errors(&response.diagnostics);
        assert_eq!(response.state.unwrap()["accounts"], json!([]));

        backend.fail_next_cloud_accounts(ClientError::Rejected {
            status: 401,
            message: "token expired".into(),
        });
        let response = provider
            .read_data_source("prismacloud_cloud_accounts", json!({}))
            .await;
        assert_error_contains(&response.diagnostics, "token expired");
        assert!(response.state.is_none());
    }

    #[tokio::test]
    async fn test_stop_cancels_waits() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        backend.permission_groups.never_visible();
        let provider = Arc::new(PrismaCloudProvider::new(backend.clone()).with_config(
            ProviderConfig {
                retry: fast_poll_config(Duration::from_secs(600)),
                log_level: None,
            },
        ));

        let pending = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.create(PG, grp1()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        provider.stop().await;

        let response = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .unwrap()
            .unwrap();
        assert_error_contains(&response.diagnostics, "Cancelled");

        let creates = backend.permission_groups.calls().create;
        let late = provider.create(PG, grp1()).await;
        assert_error_contains(&late.diagnostics, "stopping");
        assert_eq!(backend.permission_groups.calls().create, creates);
    }

    #[tokio::test]
    async fn test_concurrent_creates_of_same_name_are_serialized() {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        backend.permission_groups.set_lag(1, 1);
        let provider = Arc::new(setup(&backend));

        let a = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.create(PG, grp1()).await })
        };
        let b = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.create(PG, grp1()).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        // The fake rejects duplicate names, so exactly one create can win.
        let errors = [&a, &b].iter().filter(|r| r.has_errors()).count();
        assert_eq!(errors, 1);
        assert_eq!(backend.permission_groups.calls().create, 2);
        assert_eq!(backend.permission_groups.len(), 1);
    }
}
