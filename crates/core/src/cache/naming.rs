//! Store naming: `<prefix>-v<version>`.

/// Build the store name for a given prefix and version tag.
pub fn store_name(prefix: &str, version: &str) -> String {
    format!("{prefix}-v{version}")
}

/// Whether `name` is the store owned by `current`.
///
/// Activation evicts every store for which this returns false; the match is
/// exact so `greenmap-v1` never shadows `greenmap-v10`.
pub fn is_current(name: &str, current: &str) -> bool {
    name == current
}
