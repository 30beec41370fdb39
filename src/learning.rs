//! Learning loop
//!
//! On each tick, snapshots every regular app's windows, classifies each by
//! monitor and space, and commits a changed snapshot wholesale. The loop
//! holds no timer of its own; the daemon ticks it and routes pause/resume
//! control messages from the restore coordinator, so learning never records
//! a layout while a restore is pending or settling.

use anyhow::Result;
use tracing::{debug, info, trace};

use crate::persistence::AssignmentStore;
use crate::platform::{LiveWindow, Platform, RunningApp, SpaceSource, windows_with_fallback};
use crate::spaces::SpaceDirectory;
use crate::topology::{Topology, flip_to_window_coords};
use crate::types::{AppAssignment, WindowAssignment};

/// Control messages routed from the restore coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    Pause,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Learning is paused; the tick did no work at all
    Paused,
    /// Fewer than two monitors; nothing worth learning
    TooFewMonitors,
    Completed { apps_seen: usize, committed: usize },
}

pub struct LearningLoop {
    paused: bool,
    min_window_dimension: f64,
}

impl LearningLoop {
    pub fn new(min_window_dimension: f64) -> Self {
        Self { paused: false, min_window_dimension }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn apply(&mut self, msg: ControlMsg) {
        let paused = matches!(msg, ControlMsg::Pause);
        if paused != self.paused {
            info!(paused = paused, "learning loop control");
        }
        self.paused = paused;
    }

    /// One observation pass. Skips entirely (no partial work) when paused
    /// or when fewer than two monitors are connected.
    pub fn tick(&mut self, platform: &Platform, store: &mut AssignmentStore) -> Result<TickOutcome> {
        if self.paused {
            trace!("tick skipped: paused");
            return Ok(TickOutcome::Paused);
        }

        let frames = platform.screens.list_monitors()?;
        let topology = Topology::resolve(&flip_to_window_coords(&frames));
        if topology.monitor_count() < 2 {
            trace!(monitors = topology.monitor_count(), "tick skipped: single monitor");
            return Ok(TickOutcome::TooFewMonitors);
        }

        let directory = SpaceDirectory::new(platform.spaces.spaces_by_display()?, &topology);
        let apps = platform.processes.list_regular_apps()?;
        let mut committed = 0;

        for app in &apps {
            let windows = match windows_with_fallback(platform, app.pid) {
                Ok(windows) => windows,
                Err(e) => {
                    debug!(bundle = %app.bundle_id, error = %e, "window enumeration failed, skipping app");
                    continue;
                }
            };

            // Apps with no valid windows this tick keep their existing record
            let Some(candidate) = observe_app(
                app,
                &windows,
                &topology,
                &directory,
                platform.spaces.as_ref(),
                self.min_window_dimension,
            ) else {
                continue;
            };

            let changed = match store.database().get(&app.bundle_id) {
                None => true,
                Some(prior) => assignment_changed(prior, &candidate),
            };
            if changed {
                debug!(
                    bundle = %candidate.bundle_identifier,
                    windows = candidate.windows.len(),
                    primary_monitor = candidate.primary_monitor_index,
                    "layout changed, committing"
                );
                store.upsert(candidate)?;
                committed += 1;
            }
        }

        Ok(TickOutcome::Completed { apps_seen: apps.len(), committed })
    }
}

/// Classify an app's windows into a candidate assignment, or `None` when no
/// window passes the visibility filter
fn observe_app(
    app: &RunningApp,
    windows: &[LiveWindow],
    topology: &Topology,
    directory: &SpaceDirectory,
    spaces: &dyn SpaceSource,
    min_dimension: f64,
) -> Option<AppAssignment> {
    let mut observations = Vec::new();

    for (discovery_index, window) in windows.iter().enumerate() {
        if window.frame.width <= min_dimension || window.frame.height <= min_dimension {
            continue;
        }
        // A center outside every monitor means the window is mid-animation
        // or offscreen; skip it this tick
        let Some(monitor_index) = topology.index_of(window.frame.center()) else {
            continue;
        };
        let space_index = window
            .window_id
            .and_then(|id| spaces.spaces_of(id).ok())
            .and_then(|ids| ids.first().copied())
            .and_then(|id| directory.locate(id))
            .map(|(_, index)| index)
            .unwrap_or(0);

        observations.push(WindowAssignment {
            window_title: window.title.clone(),
            window_index: discovery_index,
            monitor_index,
            space_index,
        });
    }

    if observations.is_empty() {
        return None;
    }

    Some(AppAssignment {
        bundle_identifier: app.bundle_id.clone(),
        app_name: app.name.clone(),
        primary_monitor_index: elect_primary_monitor(&observations, topology.monitor_count()),
        windows: observations,
    })
}

/// Monitor with the most windows; equal counts resolve to the lowest index
fn elect_primary_monitor(windows: &[WindowAssignment], monitor_count: usize) -> usize {
    let mut counts = vec![0usize; monitor_count];
    for w in windows {
        if let Some(count) = counts.get_mut(w.monitor_index) {
            *count += 1;
        }
    }
    counts
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// A snapshot differs when the primary monitor moved, the window count
/// changed, or any window matched by index sits on a different monitor or
/// space. Title changes alone do not count.
fn assignment_changed(prior: &AppAssignment, candidate: &AppAssignment) -> bool {
    if prior.primary_monitor_index != candidate.primary_monitor_index {
        return true;
    }
    if prior.windows.len() != candidate.windows.len() {
        return true;
    }
    for window in &candidate.windows {
        if let Some(old) = prior
            .windows
            .iter()
            .find(|w| w.window_index == window.window_index)
            && (old.monitor_index != window.monitor_index || old.space_index != window.space_index)
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock;
    use crate::types::{MoveHandle, Rect, SpaceId, WindowId};

    fn store() -> (AssignmentStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = AssignmentStore::load(dir.path().join("assignments.json"));
        (store, dir)
    }

    fn window(x: f64, y: f64, title: &str, id: u64) -> LiveWindow {
        LiveWindow {
            frame: Rect::new(x, y, 800.0, 600.0),
            title: title.to_string(),
            window_id: Some(WindowId(id)),
            move_handle: Some(MoveHandle(id)),
        }
    }

    fn editor_app(state: &std::rc::Rc<std::cell::RefCell<mock::MockState>>) {
        let mut s = state.borrow_mut();
        s.apps = vec![RunningApp {
            bundle_id: "com.example.editor".to_string(),
            name: "Editor".to_string(),
            pid: 100,
        }];
        // One window on each monitor; the right one sits on that display's
        // second space
        s.primary_windows.insert(
            100,
            vec![window(100.0, 100.0, "Notes", 1), window(2100.0, 100.0, "Todo", 2)],
        );
        s.window_spaces.insert(WindowId(1), vec![SpaceId(1)]);
        s.window_spaces.insert(WindowId(2), vec![SpaceId(12)]);
    }

    #[test]
    fn test_paused_tick_does_nothing() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        editor_app(&state);
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        learning.apply(ControlMsg::Pause);
        assert_eq!(learning.tick(&platform, &mut store).unwrap(), TickOutcome::Paused);
        assert!(store.database().is_empty());
    }

    #[test]
    fn test_single_monitor_skips_tick() {
        let (platform, state) = mock::platform();
        state.borrow_mut().monitors = vec![Rect::new(0.0, 0.0, 1920.0, 1080.0)];
        editor_app(&state);
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        assert_eq!(learning.tick(&platform, &mut store).unwrap(), TickOutcome::TooFewMonitors);
        assert!(store.database().is_empty());
    }

    #[test]
    fn test_learns_monitor_and_space_for_each_window() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        editor_app(&state);
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        let outcome = learning.tick(&platform, &mut store).unwrap();
        assert_eq!(outcome, TickOutcome::Completed { apps_seen: 1, committed: 1 });

        let saved = store.database().get("com.example.editor").unwrap();
        assert_eq!(saved.app_name, "Editor");
        assert_eq!(saved.windows.len(), 2);
        assert_eq!(saved.windows[0].monitor_index, 0);
        assert_eq!(saved.windows[0].space_index, 0);
        assert_eq!(saved.windows[1].monitor_index, 1);
        assert_eq!(saved.windows[1].space_index, 1);
        // One window per monitor: tie elects the lowest index
        assert_eq!(saved.primary_monitor_index, 0);
    }

    #[test]
    fn test_second_identical_tick_commits_nothing() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        editor_app(&state);
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        learning.tick(&platform, &mut store).unwrap();
        let outcome = learning.tick(&platform, &mut store).unwrap();
        assert_eq!(outcome, TickOutcome::Completed { apps_seen: 1, committed: 0 });
    }

    #[test]
    fn test_window_move_across_monitors_commits() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        editor_app(&state);
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        learning.tick(&platform, &mut store).unwrap();

        // Drag the first window onto the right monitor
        state.borrow_mut().primary_windows.get_mut(&100).unwrap()[0].frame.x = 2500.0;
        let outcome = learning.tick(&platform, &mut store).unwrap();
        assert_eq!(outcome, TickOutcome::Completed { apps_seen: 1, committed: 1 });

        let saved = store.database().get("com.example.editor").unwrap();
        assert_eq!(saved.windows[0].monitor_index, 1);
        assert_eq!(saved.primary_monitor_index, 1);
    }

    #[test]
    fn test_title_change_alone_does_not_commit() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        editor_app(&state);
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        learning.tick(&platform, &mut store).unwrap();

        state.borrow_mut().primary_windows.get_mut(&100).unwrap()[0].title = "Renamed".to_string();
        let outcome = learning.tick(&platform, &mut store).unwrap();
        assert_eq!(outcome, TickOutcome::Completed { apps_seen: 1, committed: 0 });
    }

    #[test]
    fn test_empty_observation_keeps_existing_record() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        editor_app(&state);
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        learning.tick(&platform, &mut store).unwrap();

        // All windows shrink below the visibility threshold
        for w in state.borrow_mut().primary_windows.get_mut(&100).unwrap() {
            w.frame.width = 10.0;
            w.frame.height = 10.0;
        }
        learning.tick(&platform, &mut store).unwrap();
        assert_eq!(store.database().get("com.example.editor").unwrap().windows.len(), 2);
    }

    #[test]
    fn test_fallback_channel_used_when_primary_blocked() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        {
            let mut s = state.borrow_mut();
            s.apps = vec![RunningApp {
                bundle_id: "com.example.stubborn".to_string(),
                name: "Stubborn".to_string(),
                pid: 200,
            }];
            s.primary_blocked.push(200);
            s.fallback_windows.insert(
                200,
                vec![LiveWindow {
                    frame: Rect::new(2000.0, 200.0, 640.0, 480.0),
                    title: "Stubborn".to_string(),
                    window_id: Some(WindowId(9)),
                    move_handle: None,
                }],
            );
            s.window_spaces.insert(WindowId(9), vec![SpaceId(11)]);
        }
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        learning.tick(&platform, &mut store).unwrap();
        let saved = store.database().get("com.example.stubborn").unwrap();
        assert_eq!(saved.windows[0].monitor_index, 1);
        assert_eq!(saved.windows[0].space_index, 0);
    }

    #[test]
    fn test_both_channels_blocked_skips_app() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        {
            let mut s = state.borrow_mut();
            s.apps = vec![RunningApp {
                bundle_id: "com.example.opaque".to_string(),
                name: "Opaque".to_string(),
                pid: 300,
            }];
            s.primary_blocked.push(300);
            s.fallback_blocked.push(300);
        }
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        let outcome = learning.tick(&platform, &mut store).unwrap();
        assert_eq!(outcome, TickOutcome::Completed { apps_seen: 1, committed: 0 });
        assert!(store.database().is_empty());
    }

    #[test]
    fn test_unresolved_space_defaults_to_zero() {
        let (platform, state) = mock::platform();
        mock::dual_monitor_state(&state);
        {
            let mut s = state.borrow_mut();
            s.apps = vec![RunningApp {
                bundle_id: "com.example.nospace".to_string(),
                name: "NoSpace".to_string(),
                pid: 400,
            }];
            // No window id at all: space membership cannot be queried
            s.primary_windows.insert(
                400,
                vec![LiveWindow {
                    frame: Rect::new(100.0, 100.0, 800.0, 600.0),
                    title: "Main".to_string(),
                    window_id: None,
                    move_handle: Some(MoveHandle(4)),
                }],
            );
        }
        let (mut store, _dir) = store();

        let mut learning = LearningLoop::new(50.0);
        learning.tick(&platform, &mut store).unwrap();
        assert_eq!(
            store.database().get("com.example.nospace").unwrap().windows[0].space_index,
            0
        );
    }

    #[test]
    fn test_elect_primary_monitor_plurality_and_tie() {
        let w = |monitor_index| WindowAssignment {
            window_title: String::new(),
            window_index: 0,
            monitor_index,
            space_index: 0,
        };
        assert_eq!(elect_primary_monitor(&[w(1), w(1), w(0)], 2), 1);
        assert_eq!(elect_primary_monitor(&[w(1), w(0)], 2), 0);
        assert_eq!(elect_primary_monitor(&[w(1)], 2), 1);
    }
}
