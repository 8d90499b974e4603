//! Testing utilities.
//!
//! [`InMemoryPrismaCloud`] is a [`Client`] backed by in-process tables. It can
//! simulate the eventual consistency of the real API (a new object is missing
//! from name lookups and gets for a configurable number of probes) and inject
//! one-shot failures. [`ProviderTester`] drives a [`PrismaCloudProvider`]
//! through whole lifecycles and turns error diagnostics into `Err`.
//!
//! # Example
//!
//! ```
//! use prismacloud_provider::testing::ProviderTester;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let (tester, backend) = ProviderTester::in_memory();
//! backend.permission_groups.set_lag(1, 1);
//!
//! let state = tester
//!     .lifecycle_create(
//!         "prismacloud_permission_group",
//!         json!({
//!             "name": "grp1",
//!             "features": [{"feature_name": "alerts", "operations": {"read": true}}]
//!         }),
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(state["name"], "grp1");
//! # });
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{Client, ClientError, CloudAccountApi, EntityApi};
use crate::config::{PollConfig, ProviderConfig};
use crate::data_sources::CloudAccountSummary;
use crate::provider::PrismaCloudProvider;
use crate::resource::Entity;
use crate::resources::{AccountGroup, PermissionGroup};
use crate::schema::{Diagnostic, DiagnosticSeverity};
use crate::types::ResourceResponse;

/// A config suitable for tests: millisecond delays, short budget.
pub fn fast_poll_config(max_wait: Duration) -> PollConfig {
    PollConfig::default()
        .with_interval(Duration::from_millis(1))
        .with_max_wait(max_wait)
}

/// Author recorded on every write to the fake backend.
pub const FAKE_AUTHOR: &str = "tester";

const FAKE_EPOCH_MS: i64 = 1_700_000_000_000;

/// Entities the fake backend can store.
pub trait FakeEntity: Entity {
    /// Record who changed the entity and when.
    fn stamp(&mut self, author: &str, ts: i64);
}

impl FakeEntity for PermissionGroup {
    fn stamp(&mut self, author: &str, ts: i64) {
        self.last_modified_by = author.to_string();
        self.last_modified_ts = ts;
    }
}

impl FakeEntity for AccountGroup {
    fn stamp(&mut self, author: &str, ts: i64) {
        self.last_modified_by = author.to_string();
        self.last_modified_ts = ts;
    }
}

/// How many times each endpoint of a table was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `create` calls, including rejected ones.
    pub create: u32,
    /// `get` calls.
    pub get: u32,
    /// `update` calls.
    pub update: u32,
    /// `delete` calls.
    pub delete: u32,
    /// `identify` calls.
    pub identify: u32,
}

const NEVER: u32 = u32::MAX;

struct Record<E> {
    entity: E,
    identify_misses: u32,
    get_misses: u32,
}

#[derive(Default)]
struct Failures {
    create: Option<ClientError>,
    get: Option<ClientError>,
    update: Option<ClientError>,
    delete: Option<ClientError>,
}

struct Table<E> {
    records: Vec<Record<E>>,
    next_id: u64,
    clock: i64,
    identify_lag: u32,
    get_lag: u32,
    calls: CallCounts,
    failures: Failures,
}

impl<E: FakeEntity> Table<E> {
    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.entity.id() == id)
    }

    fn name_taken(&self, name: &str, except: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.entity.name() == name && r.entity.id() != except)
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        FAKE_EPOCH_MS + self.clock
    }
}

/// Consume one pending miss. Returns true while the record is still invisible.
fn miss(counter: &mut u32) -> bool {
    match *counter {
        0 => false,
        NEVER => true,
        _ => {
            *counter -= 1;
            true
        },
    }
}

/// One in-memory entity table with per-record visibility lag.
///
/// Lag settings apply to records created after they are set. Seeded records
/// are visible at once.
pub struct FakeTable<E> {
    prefix: &'static str,
    inner: Mutex<Table<E>>,
}

impl<E: FakeEntity> FakeTable<E> {
    /// Create an empty table; ids are `<prefix>-<n>`.
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            inner: Mutex::new(Table {
                records: Vec::new(),
                next_id: 1,
                clock: 0,
                identify_lag: 0,
                get_lag: 0,
                calls: CallCounts::default(),
                failures: Failures::default(),
            }),
        }
    }

    fn table(&self) -> MutexGuard<'_, Table<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// New records miss `identify` lookups `identify_misses` times and `get`
    /// lookups `get_misses` times before they show up.
    pub fn set_lag(&self, identify_misses: u32, get_misses: u32) {
        let mut table = self.table();
        table.identify_lag = identify_misses;
        table.get_lag = get_misses;
    }

    /// New records never become visible to `identify` or `get`.
    pub fn never_visible(&self) {
        self.set_lag(NEVER, NEVER);
    }

    /// Store `entity` as if created long ago. Returns its id.
    pub fn seed(&self, mut entity: E) -> String {
        let mut table = self.table();
        let id = format!("{}-{}", self.prefix, table.next_id);
        table.next_id += 1;
        entity.set_id(id.clone());
        let ts = table.tick();
        entity.stamp(FAKE_AUTHOR, ts);
        table.records.push(Record {
            entity,
            identify_misses: 0,
            get_misses: 0,
        });
        id
    }

    /// Delete behind the provider's back. Returns whether the record existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut table = self.table();
        match table.position(id) {
            Some(pos) => {
                table.records.remove(pos);
                true
            },
            None => false,
        }
    }

    /// The stored entity, ignoring visibility lag.
    pub fn snapshot(&self, id: &str) -> Option<E> {
        let table = self.table();
        table.position(id).map(|pos| table.records[pos].entity.clone())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.table().records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call counters so far.
    pub fn calls(&self) -> CallCounts {
        self.table().calls
    }

    /// Fail the next `create` with `err`.
    pub fn fail_next_create(&self, err: ClientError) {
        self.table().failures.create = Some(err);
    }

    /// Fail the next `get` with `err`.
    pub fn fail_next_get(&self, err: ClientError) {
        self.table().failures.get = Some(err);
    }

    /// Fail the next `update` with `err`.
    pub fn fail_next_update(&self, err: ClientError) {
        self.table().failures.update = Some(err);
    }

    /// Fail the next `delete` with `err`.
    pub fn fail_next_delete(&self, err: ClientError) {
        self.table().failures.delete = Some(err);
    }
}

#[async_trait]
impl<E: FakeEntity> EntityApi<E> for FakeTable<E> {
    async fn create(&self, entity: &E) -> Result<(), ClientError> {
        let mut table = self.table();
        table.calls.create += 1;
        if let Some(err) = table.failures.create.take() {
            return Err(err);
        }
        if table.name_taken(entity.name(), "") {
            return Err(ClientError::Rejected {
                status: 409,
                message: format!("duplicate name {}", entity.name()),
            });
        }

        let mut entity = entity.clone();
        let id = format!("{}-{}", self.prefix, table.next_id);
        table.next_id += 1;
        entity.set_id(id);
        let ts = table.tick();
        entity.stamp(FAKE_AUTHOR, ts);
        let (identify_misses, get_misses) = (table.identify_lag, table.get_lag);
        table.records.push(Record {
            entity,
            identify_misses,
            get_misses,
        });
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<E, ClientError> {
        let mut table = self.table();
        table.calls.get += 1;
        if let Some(err) = table.failures.get.take() {
            return Err(err);
        }
        let pos = table
            .position(id)
            .ok_or_else(|| ClientError::InvalidId(id.to_string()))?;
        let record = &mut table.records[pos];
        if miss(&mut record.get_misses) {
            return Err(ClientError::InvalidId(id.to_string()));
        }
        Ok(record.entity.clone())
    }

    async fn update(&self, entity: &E) -> Result<(), ClientError> {
        let mut table = self.table();
        table.calls.update += 1;
        if let Some(err) = table.failures.update.take() {
            return Err(err);
        }
        let pos = table
            .position(entity.id())
            .ok_or_else(|| ClientError::InvalidId(entity.id().to_string()))?;
        if table.name_taken(entity.name(), entity.id()) {
            return Err(ClientError::Rejected {
                status: 409,
                message: format!("duplicate name {}", entity.name()),
            });
        }
        let mut entity = entity.clone();
        let ts = table.tick();
        entity.stamp(FAKE_AUTHOR, ts);
        table.records[pos].entity = entity;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let mut table = self.table();
        table.calls.delete += 1;
        if let Some(err) = table.failures.delete.take() {
            return Err(err);
        }
        let pos = table
            .position(id)
            .ok_or_else(|| ClientError::ObjectNotFound(id.to_string()))?;
        table.records.remove(pos);
        Ok(())
    }

    async fn identify(&self, name: &str) -> Result<String, ClientError> {
        let mut table = self.table();
        table.calls.identify += 1;
        let record = table
            .records
            .iter_mut()
            .find(|r| r.entity.name() == name)
            .ok_or_else(|| ClientError::ObjectNotFound(name.to_string()))?;
        if miss(&mut record.identify_misses) {
            return Err(ClientError::ObjectNotFound(name.to_string()));
        }
        Ok(record.entity.id().to_string())
    }
}

#[derive(Default)]
struct FakeCloudAccounts {
    accounts: Mutex<Vec<CloudAccountSummary>>,
    failure: Mutex<Option<ClientError>>,
}

#[async_trait]
impl CloudAccountApi for FakeCloudAccounts {
    async fn names(&self) -> Result<Vec<CloudAccountSummary>, ClientError> {
        if let Some(err) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(err);
        }
        Ok(self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// An in-memory Prisma Cloud tenant.
pub struct InMemoryPrismaCloud {
    /// Permission groups.
    pub permission_groups: FakeTable<PermissionGroup>,
    /// Account groups.
    pub account_groups: FakeTable<AccountGroup>,
    cloud_accounts: FakeCloudAccounts,
}

impl InMemoryPrismaCloud {
    /// An empty tenant where every change is visible at once.
    pub fn new() -> Self {
        Self {
            permission_groups: FakeTable::new("pg"),
            account_groups: FakeTable::new("ag"),
            cloud_accounts: FakeCloudAccounts::default(),
        }
    }

    /// Onboard a cloud account. Listing returns accounts in insertion order.
    pub fn add_cloud_account(&self, name: &str, cloud_type: &str, account_id: &str) {
        self.cloud_accounts
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CloudAccountSummary {
                name: name.to_string(),
                cloud_type: cloud_type.to_string(),
                account_id: account_id.to_string(),
            });
    }

    /// Fail the next cloud account listing with `err`.
    pub fn fail_next_cloud_accounts(&self, err: ClientError) {
        *self
            .cloud_accounts
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
    }
}

impl Default for InMemoryPrismaCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl Client for InMemoryPrismaCloud {
    fn permission_groups(&self) -> &dyn EntityApi<PermissionGroup> {
        &self.permission_groups
    }

    fn account_groups(&self) -> &dyn EntityApi<AccountGroup> {
        &self.account_groups
    }

    fn cloud_accounts(&self) -> &dyn CloudAccountApi {
        &self.cloud_accounts
    }
}

/// A test harness around [`PrismaCloudProvider`].
pub struct ProviderTester {
    provider: PrismaCloudProvider,
}

impl ProviderTester {
    /// Create a new tester for the given provider.
    pub fn new(provider: PrismaCloudProvider) -> Self {
        Self { provider }
    }

    /// A tester over a fresh [`InMemoryPrismaCloud`], polling every
    /// millisecond for up to two seconds.
    pub fn in_memory() -> (Self, Arc<InMemoryPrismaCloud>) {
        let backend = Arc::new(InMemoryPrismaCloud::new());
        let provider = PrismaCloudProvider::new(backend.clone()).with_config(ProviderConfig {
            retry: fast_poll_config(Duration::from_secs(2)),
            log_level: None,
        });
        (Self::new(provider), backend)
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &PrismaCloudProvider {
        &self.provider
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Configure the provider.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.configure(config).await)
    }

    /// Validate a resource configuration.
    pub fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.validate_resource_config(resource_type, &config))
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Create a new resource and return its state.
    pub async fn create(&self, resource_type: &str, planned: Value) -> Result<Value, TestError> {
        bound(self.provider.create(resource_type, planned).await)
    }

    /// Read a resource. `Ok(None)` means it no longer exists.
    pub async fn read(&self, resource_type: &str, current: Value) -> Result<Option<Value>, TestError> {
        let response = self.provider.read(resource_type, current).await;
        check_diagnostics(response.diagnostics)?;
        Ok(response.state)
    }

    /// Update a resource and return its new state.
    pub async fn update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, TestError> {
        bound(self.provider.update(resource_type, prior, planned).await)
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.delete(resource_type, current).await.diagnostics)
    }

    /// Import an existing resource by id.
    pub async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Value, TestError> {
        bound(self.provider.import_resource(resource_type, id).await)
    }

    /// Read a data source.
    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, TestError> {
        bound(self.provider.read_data_source(data_source_type, config).await)
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Create, then read back. Returns the state after the read.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, TestError> {
        let created = self.create(resource_type, config).await?;
        self.read(resource_type, created)
            .await?
            .ok_or_else(|| TestError::NoState(format!("{} vanished after create", resource_type)))
    }

    /// Update, then read back. Returns the state after the read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, TestError> {
        let updated = self.update(resource_type, prior, planned).await?;
        self.read(resource_type, updated)
            .await?
            .ok_or_else(|| TestError::NoState(format!("{} vanished after update", resource_type)))
    }

    /// Create → read → update → read → delete, then check the object is gone.
    ///
    /// `changes` is merged over the created state to form the update plan.
    /// Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        config: Value,
        changes: Value,
    ) -> Result<Value, TestError> {
        let created = self.lifecycle_create(resource_type, config).await?;

        let mut planned = created.clone();
        if let (Value::Object(planned), Value::Object(changes)) = (&mut planned, changes) {
            planned.extend(changes);
        }
        let updated = self.lifecycle_update(resource_type, created, planned).await?;

        self.delete(resource_type, updated.clone()).await?;
        if self.read(resource_type, updated.clone()).await?.is_some() {
            return Err(TestError::NoState(format!(
                "{} still readable after delete",
                resource_type
            )));
        }
        Ok(updated)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation succeeded but the state did not match expectations.
    NoState(String),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::NoState(msg) => write!(f, "Unexpected state: {}", msg),
        }
    }
}

impl std::error::Error for TestError {}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

fn bound(response: ResourceResponse) -> Result<Value, TestError> {
    check_diagnostics(response.diagnostics)?;
    response
        .state
        .ok_or_else(|| TestError::NoState("no state returned".to_string()))
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn group(name: &str) -> PermissionGroup {
        PermissionGroup {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fake_lag_counts_down_per_record() {
        let table = FakeTable::<PermissionGroup>::new("pg");
        table.set_lag(2, 1);
        assert_ok!(table.create(&group("grp1")).await);

        assert_err!(table.identify("grp1").await);
        assert_err!(table.identify("grp1").await);
        let id = assert_ok!(table.identify("grp1").await);
        assert_eq!(id, "pg-1");

        assert!(assert_err!(table.get(&id).await).is_not_found());
        let stored = assert_ok!(table.get(&id).await);
        assert_eq!(stored.last_modified_by, FAKE_AUTHOR);
        assert!(stored.last_modified_ts > FAKE_EPOCH_MS);

        let calls = table.calls();
        assert_eq!((calls.create, calls.identify, calls.get), (1, 3, 2));
    }

    #[tokio::test]
    async fn test_fake_never_visible() {
        let table = FakeTable::<PermissionGroup>::new("pg");
        table.never_visible();
        assert_ok!(table.create(&group("grp1")).await);
        for _ in 0..5 {
            assert_err!(table.identify("grp1").await);
        }
        assert!(table.snapshot("pg-1").is_some());
    }

    #[tokio::test]
    async fn test_fake_rejects_duplicate_names() {
        let table = FakeTable::<PermissionGroup>::new("pg");
        table.seed(group("grp1"));
        let id = table.seed(group("grp2"));

        let err = assert_err!(table.create(&group("grp1")).await);
        assert!(matches!(err, ClientError::Rejected { status: 409, .. }));

        let mut renamed = group("grp1");
        renamed.id = id;
        assert_err!(table.update(&renamed).await);
    }

    #[tokio::test]
    async fn test_fake_not_found_shapes() {
        let table = FakeTable::<AccountGroup>::new("ag");
        assert_eq!(
            assert_err!(table.get("ag-9").await),
            ClientError::InvalidId("ag-9".into())
        );
        assert_eq!(
            assert_err!(table.delete("ag-9").await),
            ClientError::ObjectNotFound("ag-9".into())
        );
    }

    #[tokio::test]
    async fn test_fake_one_shot_failures() {
        let table = FakeTable::<PermissionGroup>::new("pg");
        let id = table.seed(group("grp1"));
        table.fail_next_get(ClientError::Transport("reset".into()));

        assert_err!(table.get(&id).await);
        assert_ok!(table.get(&id).await);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_crud() {
        let (tester, backend) = ProviderTester::in_memory();
        backend.permission_groups.set_lag(1, 2);

        let updated = tester
            .lifecycle_crud(
                "prismacloud_permission_group",
                json!({
                    "name": "grp1",
                    "description": "first",
                    "features": [{"feature_name": "alerts", "operations": {"read": true}}]
                }),
                json!({"description": "second"}),
            )
            .await
            .unwrap();

        assert_eq!(updated["description"], "second");
        assert!(backend.permission_groups.is_empty());
    }

    #[tokio::test]
    async fn test_tester_import_and_data_source() {
        let (tester, backend) = ProviderTester::in_memory();
        let id = backend.account_groups.seed(AccountGroup {
            name: "prod".into(),
            account_ids: vec!["111".into()],
            ..Default::default()
        });
        backend.add_cloud_account("prod-aws", "aws", "111");

        let state = tester
            .import_resource("prismacloud_account_group", &id)
            .await
            .unwrap();
        assert_eq!(state["name"], "prod");
        assert_eq!(state["account_ids"], json!(["111"]));

        let accounts = tester
            .read_data_source("prismacloud_cloud_accounts", json!({}))
            .await
            .unwrap();
        assert_eq!(accounts["accounts"][0]["account_id"], "111");
    }

    #[tokio::test]
    async fn test_tester_surfaces_diagnostics() {
        let (tester, _backend) = ProviderTester::in_memory();
        let err = tester
            .create("prismacloud_permission_group", json!({"name": "grp1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Diagnostics(_)));
        assert!(tester.configure(json!({"retry": {"max_attempts": 0}})).await.is_err());
        assert!(tester
            .validate_resource_config("prismacloud_account_group", json!({"name": "prod"}))
            .is_ok());
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_has_errors() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_has_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid configuration value")];
        assert_error_contains(&diagnostics, "Invalid");
        assert_error_contains(&diagnostics, "configuration");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("field1"));
        assert!(display.contains("More info"));
    }
}
