//! The reconciliation loop shared by every resource kind.
//!
//! A resource kind only describes itself ([`ResourceKind`]): its schema, which
//! client endpoints it uses, and how to translate between [`ResourceData`] and
//! its entity. [`Reconciler`] drives the lifecycle on top of that:
//!
//! | Operation | Remote calls | Binding |
//! |-----------|--------------|---------|
//! | create | create, poll identify(name), poll get(id), get | set once the entity is readable |
//! | read | get | cleared if the entity is gone |
//! | update | update, get | unchanged (cleared if gone on re-read) |
//! | delete | delete | cleared, also when already gone |
//!
//! Fatal errors become error diagnostics and leave the binding as it was.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{Client, EntityApi};
use crate::error::ProviderError;
use crate::poll::Poller;
use crate::schema::{Diagnostic, Schema};
use crate::state::ResourceData;

/// Per-call context: the shared client session and the poller to use.
#[derive(Clone)]
pub struct ProviderMeta {
    /// The authenticated session.
    pub client: Arc<dyn Client>,
    /// Poller configured from the provider block.
    pub poller: Poller,
}

impl ProviderMeta {
    /// Bundle a client with a poller.
    pub fn new(client: Arc<dyn Client>, poller: Poller) -> Self {
        Self { client, poller }
    }
}

/// A remote object with a server-assigned identifier and a human name.
pub trait Entity: Clone + Send + Sync + 'static {
    /// The remote identifier, empty before creation.
    fn id(&self) -> &str;

    /// The human-assigned name, usable as a lookup key before the id is known.
    fn name(&self) -> &str;

    /// Attach an identifier (used before update).
    fn set_id(&mut self, id: String);
}

/// Everything the reconciler needs to know about one kind of resource.
pub trait ResourceKind: Send + Sync + 'static {
    /// The remote entity.
    type Entity: Entity;

    /// Type name registered with the orchestrator.
    const TYPE_NAME: &'static str;

    /// Human-readable kind, used in logs and wait descriptions.
    const DISPLAY_NAME: &'static str;

    /// The persisted-state schema.
    fn schema() -> Schema;

    /// The endpoints for this kind.
    fn api(client: &dyn Client) -> &dyn EntityApi<Self::Entity>;

    /// Build the entity from desired state. Read-only attributes are ignored.
    fn parse(data: &ResourceData) -> Result<Self::Entity, ProviderError>;

    /// Write the entity into state. Returns warnings for attributes that could
    /// not be written.
    fn save(data: &mut ResourceData, entity: &Self::Entity) -> Vec<Diagnostic>;
}

/// Collects attribute writes, downgrading failures to warnings.
pub struct StateWriter<'a> {
    data: &'a mut ResourceData,
    warnings: Vec<Diagnostic>,
}

impl<'a> StateWriter<'a> {
    /// Start writing into `data`.
    pub fn new(data: &'a mut ResourceData) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    /// Write one attribute.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> &mut Self {
        if let Err(err) = self.data.set(key, value) {
            warn!(attribute = key, id = %self.data.id(), error = %err, "Error setting attribute");
            self.warnings.push(
                Diagnostic::warning(format!("Error setting '{}'", key))
                    .with_detail(err.to_string())
                    .with_attribute(key),
            );
        }
        self
    }

    /// The warnings produced so far.
    pub fn finish(self) -> Vec<Diagnostic> {
        self.warnings
    }
}

/// Lifecycle entry points for one resource type, independent of its entity.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The type name this handler serves.
    fn type_name(&self) -> &'static str;

    /// The schema used for state containers of this type.
    fn schema(&self) -> Arc<Schema>;

    /// Create the remote object and fill `data` from it.
    async fn create(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic>;

    /// Refresh `data` from the remote object.
    async fn read(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic>;

    /// Push `data` to the remote object, then refresh it.
    async fn update(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic>;

    /// Delete the remote object.
    async fn delete(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic>;
}

/// Read-only lookups that never own a binding.
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    /// The type name this handler serves.
    fn type_name(&self) -> &'static str;

    /// The schema of the produced state.
    fn schema(&self) -> Arc<Schema>;

    /// Fill a fresh state container.
    async fn read(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic>;
}

/// Drives the create/read/update/delete lifecycle for resource kind `K`.
///
/// The reconciler keeps no state between calls; everything is derived from the
/// binding in [`ResourceData`] and from the remote API.
pub struct Reconciler<K> {
    schema: Arc<Schema>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Reconciler<K> {
    /// Create the reconciler for `K`.
    pub fn new() -> Self {
        Self {
            schema: Arc::new(K::schema()),
            _kind: PhantomData,
        }
    }

    /// A fresh, unbound state container for this kind.
    pub fn new_data(&self) -> ResourceData {
        ResourceData::new(Arc::clone(&self.schema))
    }

    async fn try_create(
        &self,
        meta: &ProviderMeta,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let entity = K::parse(data)?;
        let api = K::api(meta.client.as_ref());

        api.create(&entity).await?;
        info!(name = entity.name(), "Created {}", K::DISPLAY_NAME);

        let what = format!("{} {:?} to be listed by name", K::DISPLAY_NAME, entity.name());
        let id = meta
            .poller
            .until_visible(&what, || api.identify(entity.name()))
            .await?;

        let what = format!("{} {} to be readable", K::DISPLAY_NAME, id);
        meta.poller
            .until_visible(&what, || api.get(&id))
            .await?;

        debug!(name = entity.name(), id = %id, "Resolved identifier");
        data.set_id(id);
        self.try_read(meta, data).await
    }

    async fn try_read(
        &self,
        meta: &ProviderMeta,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        if !data.is_bound() {
            debug!("No identifier bound, nothing to read");
            return Ok(Vec::new());
        }

        match K::api(meta.client.as_ref()).get(data.id()).await {
            Ok(entity) => Ok(K::save(data, &entity)),
            Err(err) if err.is_not_found() => {
                warn!(id = %data.id(), error = %err, "{} is gone, removing from state", K::DISPLAY_NAME);
                data.clear_id();
                Ok(Vec::new())
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn try_update(
        &self,
        meta: &ProviderMeta,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        if !data.is_bound() {
            return Err(ProviderError::programming(format!(
                "cannot update a {} without an identifier",
                K::DISPLAY_NAME
            )));
        }

        let mut entity = K::parse(data)?;
        entity.set_id(data.id().to_string());

        K::api(meta.client.as_ref()).update(&entity).await?;
        info!(id = %data.id(), "Updated {}", K::DISPLAY_NAME);

        self.try_read(meta, data).await
    }

    async fn try_delete(
        &self,
        meta: &ProviderMeta,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        if !data.is_bound() {
            return Err(ProviderError::programming(format!(
                "cannot delete a {} without an identifier",
                K::DISPLAY_NAME
            )));
        }

        match K::api(meta.client.as_ref()).delete(data.id()).await {
            Ok(()) => info!(id = %data.id(), "Deleted {}", K::DISPLAY_NAME),
            Err(err) if err.is_not_found() => {
                debug!(id = %data.id(), "{} already gone", K::DISPLAY_NAME)
            },
            Err(err) => return Err(err.into()),
        }

        data.clear_id();
        Ok(Vec::new())
    }
}

impl<K: ResourceKind> Default for Reconciler<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn into_diagnostics(op: &str, result: Result<Vec<Diagnostic>, ProviderError>) -> Vec<Diagnostic> {
    match result {
        Ok(diagnostics) => diagnostics,
        Err(err) => {
            error!(operation = op, error = %err, "Operation failed");
            vec![err.into()]
        },
    }
}

#[async_trait]
impl<K: ResourceKind> ResourceHandler for Reconciler<K> {
    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    #[instrument(skip_all, fields(resource_type = K::TYPE_NAME))]
    async fn create(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic> {
        into_diagnostics("create", self.try_create(meta, data).await)
    }

    #[instrument(skip_all, fields(resource_type = K::TYPE_NAME, id = %data.id()))]
    async fn read(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic> {
        into_diagnostics("read", self.try_read(meta, data).await)
    }

    #[instrument(skip_all, fields(resource_type = K::TYPE_NAME, id = %data.id()))]
    async fn update(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic> {
        into_diagnostics("update", self.try_update(meta, data).await)
    }

    #[instrument(skip_all, fields(resource_type = K::TYPE_NAME, id = %data.id()))]
    async fn delete(&self, meta: &ProviderMeta, data: &mut ResourceData) -> Vec<Diagnostic> {
        into_diagnostics("delete", self.try_delete(meta, data).await)
    }
}
