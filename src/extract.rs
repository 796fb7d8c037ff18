//! Structured-state extraction
//!
//! The director persona ends its prose with a fenced ```json block carrying
//! the updated brand boxes. Model output is untrusted: the fence may be
//! missing, truncated or filled with invalid JSON, so extraction is
//! best-effort with an explicit failure mode — the caller still surfaces the
//! raw text, it just skips the aggregate update.

use serde_json::Value;
use tracing::debug;

use crate::models::BrandIdentity;

/// A successfully extracted turn update.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    /// The partial brand document to merge.
    pub update: Value,
    /// Markdown report prose preceding the block, when it looks like one.
    pub report: Option<String>,
}

/// Scan completed director output for its trailing structured block.
/// Returns `None` when no parseable JSON object can be located.
pub fn extract_update(text: &str) -> Option<StateUpdate> {
    let (update, block_start) = fenced_block(text)
        .or_else(|| brace_span(text))
        .and_then(|(span, start)| {
            let value: Value = serde_json::from_str(span).ok()?;
            value.is_object().then_some((value, start))
        })?;

    let report = narrative_report(&text[..block_start]);
    Some(StateUpdate { update, report })
}

/// Merge a turn's director output into the aggregate. Returns `true` when a
/// structured update was found and merged; `false` leaves the aggregate
/// exactly as it was.
pub fn apply_update(aggregate: &mut BrandIdentity, text: &str) -> bool {
    let Some(state) = extract_update(text) else {
        debug!("no structured block found in director output");
        return false;
    };

    if let Err(e) = aggregate.merge_update(&state.update) {
        debug!(error = %e, "structured block did not merge");
        return false;
    }

    if state.report.is_some() {
        aggregate.report = state.report;
    }
    true
}

/// Content of the last ```json fence, with the fence's start offset.
fn fenced_block(text: &str) -> Option<(&str, usize)> {
    let open = text.rfind("```json")?;
    let body_start = open + "```json".len();
    let close_rel = text[body_start..].find("```")?;
    let span = text[body_start..body_start + close_rel].trim();
    Some((span, open))
}

/// Fallback when the model forgot the fence: first `{` through last `}`.
fn brace_span(text: &str) -> Option<(&str, usize)> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some((&text[start..=end], start))
}

fn narrative_report(prose: &str) -> Option<String> {
    let trimmed = prose.trim();
    let has_headings = trimmed
        .lines()
        .any(|line| line.trim_start().starts_with('#'));
    (has_headings && !trimmed.is_empty()).then(|| trimmed.to_string())
}
