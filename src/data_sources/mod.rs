//! Read-only data sources.

pub mod cloud_accounts;

pub use cloud_accounts::{list_cloud_accounts, CloudAccountSummary, CloudAccounts};
