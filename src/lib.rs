//! Prisma Cloud provider
//!
//! This crate reconciles declared Prisma Cloud objects (permission groups,
//! account groups) with the live tenant and exposes read-only lookups (cloud
//! accounts). An orchestrator hands it JSON state trees; it answers with new
//! state trees and diagnostics.
//!
//! # Overview
//!
//! - **Client contract** ([`client`]): the remote API as async traits. The
//!   session (authentication, transport) lives outside this crate.
//! - **State** ([`state`], [`schema`], [`validation`]): schema-checked attribute
//!   trees with an identifier binding.
//! - **Translation** ([`resources`]): per-kind conversion between state and the
//!   API's entities.
//! - **Polling** ([`poll`]): bounded waits for the API's eventual consistency.
//! - **Reconciliation** ([`resource`]): the create/read/update/delete loop shared
//!   by every kind.
//! - **Lookups** ([`data_sources`]): listing onboarded cloud accounts.
//! - **Entry points** ([`provider`]): dispatch by type name, per-binding
//!   serialisation, configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use prismacloud_provider::{init_logging, PrismaCloudProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     init_logging();
//!     let provider = PrismaCloudProvider::new(Arc::new(my_session()));
//!     provider.configure(json!({"retry": {"max_wait_ms": 60000}})).await;
//!
//!     let created = provider
//!         .create("prismacloud_permission_group", json!({
//!             "name": "grp1",
//!             "features": [{"feature_name": "alerts", "operations": {"read": true}}]
//!         }))
//!         .await;
//!     println!("{:?}", created.state);
//! }
//! ```
//!
//! # Lifecycle semantics
//!
//! - A create is only reported once the new object can be found by name and
//!   read by id. Giving up leaves the object unmanaged and says so.
//! - A read that finds the object gone returns no state and no error.
//! - Deleting an object that is already gone succeeds.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod locks;
pub mod logging;
pub mod poll;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod state;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{Client, ClientError};
pub use config::{PollConfig, ProviderConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use poll::Poller;
pub use provider::PrismaCloudProvider;
pub use resource::{Reconciler, ResourceKind};
pub use schema::ProviderSchema;
pub use state::ResourceData;
pub use types::{ProviderMetadata, ResourceResponse};
pub use validation::{is_valid, validate, validate_config};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
