//! CLI command implementations.

pub mod inspect;
pub mod pending;

use crudsync_store::{load_snapshot, CrudState};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// A snapshot read without knowing the entity, draft or query types.
pub type Snapshot = CrudState<Value, Value, Value>;

/// Loads a snapshot file, failing with a readable message if it is absent.
pub fn load(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No snapshot found at {:?}", path).into());
    }
    let state = load_snapshot(path)?;
    debug!(path = %path.display(), "snapshot loaded");
    Ok(state)
}

/// Prints `report` as pretty JSON, or with `text` for any other format.
pub fn print<R: serde::Serialize>(
    report: &R,
    format: &str,
    text: impl FnOnce(&R),
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        _ => text(report),
    }
    Ok(())
}
