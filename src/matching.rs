//! Best-effort matching of live windows against saved records
//!
//! No stable window identity survives an app restart, so a live window is
//! paired with a saved record by heuristic, in strict priority order:
//! exact (index and title), then title alone when the live title is
//! non-empty, then index alone. Callers that get `None` fall back to the
//! app's first saved record; most apps have one dominant window and an
//! imperfect guess beats leaving it unmanaged.

use crate::types::WindowAssignment;

pub fn best_match<'a>(
    saved: &'a [WindowAssignment],
    live_index: usize,
    live_title: &str,
) -> Option<&'a WindowAssignment> {
    if let Some(exact) = saved
        .iter()
        .find(|w| w.window_index == live_index && w.window_title == live_title)
    {
        return Some(exact);
    }

    if !live_title.is_empty()
        && let Some(by_title) = saved.iter().find(|w| w.window_title == live_title)
    {
        return Some(by_title);
    }

    saved.iter().find(|w| w.window_index == live_index)
}
