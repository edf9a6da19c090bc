//! Pending command implementation.

use super::inspect::display_slot;
use super::Snapshot;
use serde::Serialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Work a reconciliation pass would pick up.
#[derive(Debug, Serialize)]
pub struct PendingResult {
    /// Modified entities, pushed on the next pass.
    pub writes: Vec<PendingWrite>,
    /// Failed posts with a retry deadline.
    pub retries: Vec<PendingRetry>,
    /// Failed posts that will not be resubmitted.
    pub failed_posts: Vec<PendingRetry>,
}

/// A modified entity.
#[derive(Debug, Serialize)]
pub struct PendingWrite {
    /// Entity id.
    pub id: String,
    /// A write was in flight when the snapshot was taken.
    pub busy: bool,
    /// Last write error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Last write status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// A failed post.
#[derive(Debug, Serialize)]
pub struct PendingRetry {
    /// Editor slot.
    pub editor: String,
    /// Retry deadline in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<u64>,
    /// The deadline has passed.
    pub due: bool,
    /// Last insert error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Last insert status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Runs the pending command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let state = super::load(path)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let result = collect(&state, now);
    super::print(&result, format, |r| print_text_output(r, now))
}

/// Collects pending work from `state`, judging retry deadlines against `now`.
pub fn collect(state: &Snapshot, now: u64) -> PendingResult {
    let writes = state
        .all_entity_status()
        .iter()
        .filter(|(_, status)| status.modified)
        .map(|(id, status)| PendingWrite {
            id: id.clone(),
            busy: status.busy,
            error: status.error.clone(),
            status: status.status,
        })
        .collect();

    let (retries, failed_posts) = state
        .all_post_status()
        .iter()
        .filter(|(_, status)| status.draft.is_some())
        .map(|(editor, status)| PendingRetry {
            editor: editor.clone(),
            retry_at: status.retry_at,
            due: status.is_retry_due(now),
            error: status.error.clone(),
            status: status.status,
        })
        .partition(|retry| retry.retry_at.is_some());

    PendingResult {
        writes,
        retries,
        failed_posts,
    }
}

fn print_text_output(result: &PendingResult, now: u64) {
    println!("Modified entities: {}", result.writes.len());
    for write in &result.writes {
        let mut line = format!("  {}", write.id);
        if write.busy {
            line.push_str(" (busy)");
        }
        if let Some(error) = &write.error {
            line.push_str(&format!(" last error: {error}"));
        }
        if let Some(status) = write.status {
            line.push_str(&format!(" [{status}]"));
        }
        println!("{line}");
    }

    println!();
    println!("Scheduled retries: {}", result.retries.len());
    for retry in &result.retries {
        let when = match retry.retry_at {
            Some(at) if at > now => format!("in {}s", (at - now).div_ceil(1000)),
            _ => "due".to_string(),
        };
        println!(
            "  [{}] {} ({})",
            display_slot(&retry.editor),
            when,
            retry.error.as_deref().unwrap_or("no error recorded")
        );
    }

    if !result.failed_posts.is_empty() {
        println!();
        println!("Failed posts without retry: {}", result.failed_posts.len());
        for post in &result.failed_posts {
            println!(
                "  [{}] {}",
                display_slot(&post.editor),
                post.error.as_deref().unwrap_or("no error recorded")
            );
        }
    }
}
