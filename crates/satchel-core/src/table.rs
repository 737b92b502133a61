//! Naming rules shared by the relational stores

use crate::{Error, Result};

/// Default table for relational stores
pub const DEFAULT_TABLE: &str = "satchel_sessions";

/// Namespace used when a store is opened without one
pub const DEFAULT_SESSION_NAME: &str = "SATCHEL_SESSION";

/// Maximum namespace length, matching the width of the `name` column
pub const MAX_NAMESPACE_LEN: usize = 255;

// PostgreSQL truncates identifiers beyond this
const MAX_TABLE_NAME_LEN: usize = 63;

/// Validate a table name before it is spliced into SQL
///
/// Table names cannot be bound as parameters, so only plain identifiers
/// (`[A-Za-z_][A-Za-z0-9_]*`) are accepted.
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();

    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || table.len() > MAX_TABLE_NAME_LEN {
        return Err(Error::Config(format!(
            "invalid table name {:?}: expected an identifier of at most {} characters",
            table, MAX_TABLE_NAME_LEN
        )));
    }

    Ok(())
}

/// Resolve the namespace passed to `open`, falling back to the default
pub fn resolve_namespace(namespace: &str) -> Result<String> {
    if namespace.is_empty() {
        return Ok(DEFAULT_SESSION_NAME.to_string());
    }

    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(Error::StorageUnavailable(format!(
            "namespace is {} bytes, maximum is {}",
            namespace.len(),
            MAX_NAMESPACE_LEN
        )));
    }

    Ok(namespace.to_string())
}
