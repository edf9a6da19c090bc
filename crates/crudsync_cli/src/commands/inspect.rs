//! Inspect command implementation.

use super::Snapshot;
use serde::Serialize;
use std::path::Path;

/// Snapshot summary.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Snapshot path.
    pub path: String,
    /// Number of entities in the store.
    pub entity_count: usize,
    /// Entities with an unconfirmed local change.
    pub modified_count: usize,
    /// Entities with a write in flight.
    pub busy_count: usize,
    /// Entities whose last write failed.
    pub error_count: usize,
    /// Number of query slots with recorded parameters.
    pub query_count: usize,
    /// Number of editor slots with a post status.
    pub editor_count: usize,
    /// Query slot details (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<QuerySlot>>,
}

/// One query slot.
#[derive(Debug, Serialize)]
pub struct QuerySlot {
    /// Slot name.
    pub slot: String,
    /// Ids in result order.
    pub ids: Vec<String>,
    /// Ids not present in the store.
    pub unresolved: usize,
    /// Selected ids.
    pub selected: Vec<String>,
    /// A fetch was in flight when the snapshot was taken.
    pub loading: bool,
    /// Last fetch error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_queries: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let state = super::load(path)?;
    let result = summarize(&path.display().to_string(), &state, show_queries);
    super::print(&result, format, print_text_output)
}

/// Builds the summary of `state`.
pub fn summarize(path: &str, state: &Snapshot, show_queries: bool) -> InspectResult {
    let statuses = state.all_entity_status();

    let queries = show_queries.then(|| {
        state
            .all_queries()
            .keys()
            .map(|slot| {
                let result = state.results(slot).cloned().unwrap_or_default();
                QuerySlot {
                    slot: slot.clone(),
                    unresolved: result
                        .ids
                        .iter()
                        .filter(|id| !state.contains_entity(id))
                        .count(),
                    ids: result.ids,
                    selected: state.selected_list(slot),
                    loading: result.loading,
                    error: result.error,
                }
            })
            .collect()
    });

    InspectResult {
        path: path.to_string(),
        entity_count: state.entities().len(),
        modified_count: statuses.values().filter(|s| s.modified).count(),
        busy_count: statuses.values().filter(|s| s.busy).count(),
        error_count: statuses.values().filter(|s| s.error.is_some()).count(),
        query_count: state.all_queries().len(),
        editor_count: state.all_post_status().len(),
        queries,
    }
}

fn print_text_output(result: &InspectResult) {
    println!("crudsync Snapshot Inspection");
    println!("============================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Entities:");
    println!("  Stored:   {}", result.entity_count);
    println!("  Modified: {}", result.modified_count);
    println!("  Busy:     {}", result.busy_count);
    println!("  Errored:  {}", result.error_count);
    println!();
    println!("Queries: {}", result.query_count);
    println!("Editors: {}", result.editor_count);

    if let Some(queries) = &result.queries {
        println!();
        println!("Query slots:");
        for q in queries {
            let mut flags = Vec::new();
            if q.loading {
                flags.push("loading".to_string());
            }
            if q.unresolved > 0 {
                flags.push(format!("{} unresolved", q.unresolved));
            }
            if let Some(error) = &q.error {
                flags.push(format!("error: {error}"));
            }
            println!(
                "  [{}] {} ids, {} selected{}",
                display_slot(&q.slot),
                q.ids.len(),
                q.selected.len(),
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", flags.join(", "))
                }
            );
        }
    }
}

/// Shows the empty default slot name readably.
pub(crate) fn display_slot(slot: &str) -> &str {
    if slot.is_empty() {
        "<default>"
    } else {
        slot
    }
}
