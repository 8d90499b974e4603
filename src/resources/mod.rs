//! Managed resource kinds.

pub mod account_group;
pub mod permission_group;

pub use account_group::{AccountGroup, AccountGroupResource};
pub use permission_group::{
    AssociatedRole, Feature, Operations, PermissionGroup, PermissionGroupResource,
    PermissionGroupType,
};
