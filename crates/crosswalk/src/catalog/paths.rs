//! Parsing for `@`-separated catalog fields.

use crate::error::{CrosswalkError, Result};

use super::TableId;

/// Parse a path specification into an ordered chain of table ids.
///
/// Accepts both the multi-step form `"1@4@2"` and the bare single-step form
/// `"3"`. Anything else is a configuration error, surfaced at load time
/// rather than swallowed during resolution.
pub fn parse_path(spec: &str) -> Result<Vec<TableId>> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(CrosswalkError::Config("Empty path specification".to_string()));
    }

    spec.split('@')
        .map(|segment| {
            let segment = segment.trim();
            segment.parse::<TableId>().map_err(|_| {
                CrosswalkError::Config(format!(
                    "Invalid path segment '{}' in path '{}': expected a table id",
                    segment, spec
                ))
            })
        })
        .collect()
}

/// Parse an `@`-separated column list; an empty cell means no columns.
pub fn parse_columns(spec: &str) -> Vec<String> {
    spec.split('@')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Parse the two-column `key@value` pair a table translates between.
pub fn parse_key_value_pair(spec: &str) -> Result<(String, String)> {
    let columns = parse_columns(spec);
    match columns.as_slice() {
        [key, value] => Ok((key.clone(), value.clone())),
        _ => Err(CrosswalkError::Config(format!(
            "Invalid key-value pair '{}': expected exactly two '@'-separated columns",
            spec
        ))),
    }
}

/// Parse an updatable flag cell. Spreadsheet exports vary, so accept the
/// usual boolean spellings.
pub fn parse_flag(spec: &str) -> bool {
    matches!(
        spec.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}
