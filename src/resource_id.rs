//! # ARM Resource Ids
//!
//! Positional parsing of Azure Resource Manager ids such as
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.KeyVault/vaults/{name}`.
//!
//! Empty segments (leading slash, doubled slashes) are dropped before
//! indexing. Ids that are too short fail with
//! [`SyncError::MalformedResourceId`] instead of yielding a wrong value.

use crate::constants::{RESOURCE_GROUP_SEGMENT, VAULT_NAME_SEGMENT};
use crate::error::SyncError;

/// Return the non-empty `/`-delimited segment at `index`
///
/// # Errors
/// Returns [`SyncError::MalformedResourceId`] when the id has fewer than
/// `index + 1` segments.
pub fn segment(id: &str, index: usize) -> Result<&str, SyncError> {
    let segments: Vec<&str> = id.split('/').filter(|s| !s.is_empty()).collect();
    segments
        .get(index)
        .copied()
        .ok_or_else(|| SyncError::MalformedResourceId {
            id: id.to_string(),
            index,
            segments: segments.len(),
        })
}

/// Vault name of a Key Vault resource id
///
/// # Errors
/// Returns [`SyncError::MalformedResourceId`] for ids with fewer than 8 segments.
pub fn vault_name(id: &str) -> Result<&str, SyncError> {
    segment(id, VAULT_NAME_SEGMENT)
}

/// Resource group of any resource-group scoped ARM id
///
/// # Errors
/// Returns [`SyncError::MalformedResourceId`] for ids with fewer than 4 segments.
pub fn resource_group_name(id: &str) -> Result<&str, SyncError> {
    segment(id, RESOURCE_GROUP_SEGMENT)
}
