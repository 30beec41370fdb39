//! Restore coordination
//!
//! The coordinator arbitrates between learning and restoring: a topology
//! change pauses learning immediately, the event is debounced, and once the
//! signal settles the user chooses between restoring the saved layout and
//! adopting the current one. The machine emits `Action` values instead of
//! touching timers or the learning loop itself; the daemon owns both and
//! applies the actions, which keeps every transition replayable in tests.
//!
//! States: Idle → DebouncePending → AwaitingUserChoice → Restoring → Idle.
//! A pending debounce or settle timer is cancelled outright whenever a new
//! topology event or an explicit restore request supersedes it.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::matching::best_match;
use crate::platform::{Platform, RestoreChoice, windows_with_fallback};
use crate::spaces::SpaceDirectory;
use crate::topology::{Topology, flip_to_window_coords};
use crate::types::{AssignmentDatabase, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    DebouncePending,
    AwaitingUserChoice,
    Restoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Debounce,
    Settle,
}

/// Side effects for the daemon to apply, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Route Pause to the learning loop
    Pause,
    /// Route Resume to the learning loop
    Resume,
    /// (Re)start a timer, replacing any pending one of the same kind
    StartTimer(TimerKind, Duration),
    CancelTimer(TimerKind),
    /// Present the restore-or-learn choice to the user
    Prompt,
    /// Execute the restore procedure
    RunRestore,
}

pub struct RestoreCoordinator {
    phase: Phase,
    debounce: Duration,
    settle: Duration,
}

impl RestoreCoordinator {
    pub fn new(debounce: Duration, settle: Duration) -> Self {
        Self { phase: Phase::Idle, debounce, settle }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// A display-topology-change event. Pauses learning before anything
    /// else so the scrambled intermediate layout is never recorded; repeat
    /// events reset the debounce rather than stacking timers.
    pub fn on_topology_changed(&mut self) -> Vec<Action> {
        debug!(phase = ?self.phase, "topology change event");
        self.phase = Phase::DebouncePending;
        vec![
            Action::Pause,
            Action::CancelTimer(TimerKind::Settle),
            Action::StartTimer(TimerKind::Debounce, self.debounce),
        ]
    }

    /// Debounce elapsed: prompt if there is anything to restore onto,
    /// otherwise resume learning the current layout
    pub fn on_debounce_fired(&mut self, monitor_count: usize, has_assignments: bool) -> Vec<Action> {
        if self.phase != Phase::DebouncePending {
            debug!(phase = ?self.phase, "stale debounce fire ignored");
            return Vec::new();
        }
        if monitor_count < 2 || !has_assignments {
            info!(
                monitors = monitor_count,
                has_assignments = has_assignments,
                "topology settled, nothing to restore"
            );
            self.phase = Phase::Idle;
            return vec![Action::Resume];
        }
        self.phase = Phase::AwaitingUserChoice;
        vec![Action::Prompt]
    }

    pub fn on_choice(&mut self, choice: RestoreChoice) -> Vec<Action> {
        if self.phase != Phase::AwaitingUserChoice {
            debug!(phase = ?self.phase, "choice outside prompt flow ignored");
            return Vec::new();
        }
        match choice {
            RestoreChoice::Restore => {
                self.phase = Phase::Restoring;
                vec![Action::RunRestore]
            }
            // The user prefers the current layout: resume immediately so
            // the next tick adopts it as the new baseline
            RestoreChoice::LearnCurrent => {
                self.phase = Phase::Idle;
                vec![Action::Resume]
            }
        }
    }

    /// Restore finished: hold learning paused for the settle window so
    /// still-animating moves are not recorded as user-intended positions
    pub fn on_restore_complete(&mut self) -> Vec<Action> {
        self.phase = Phase::Idle;
        vec![Action::StartTimer(TimerKind::Settle, self.settle)]
    }

    pub fn on_settle_fired(&mut self) -> Vec<Action> {
        vec![Action::Resume]
    }

    /// User-invoked restore outside the debounce flow. Supersedes any
    /// pending debounce; follows the same settle-then-resume tail.
    pub fn on_manual_restore(&mut self) -> Vec<Action> {
        if self.phase == Phase::Restoring {
            return Vec::new();
        }
        self.phase = Phase::Restoring;
        vec![
            Action::CancelTimer(TimerKind::Debounce),
            Action::CancelTimer(TimerKind::Settle),
            Action::Pause,
            Action::RunRestore,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub windows_moved: usize,
    pub spaces_changed: usize,
    pub apps_skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Restoring onto a single monitor would pile everything up; aborted
    /// without touching anything
    SkippedSingleMonitor,
    Completed(RestoreReport),
}

/// Replay saved assignments onto live windows.
///
/// Per window: find its best saved record (falling back to the app's first
/// record when no rule matches), reposition it onto the saved monitor when
/// it sits elsewhere, then put it on the saved space with the index clamped
/// to the spaces that actually exist there. A saved monitor index past the
/// current topology is not clamped; that window is left as-is.
pub fn execute(
    platform: &Platform,
    database: &AssignmentDatabase,
    min_dimension: f64,
) -> Result<RestoreOutcome> {
    let frames = platform.screens.list_monitors()?;
    let topology = Topology::resolve(&flip_to_window_coords(&frames));
    if topology.monitor_count() < 2 {
        info!(monitors = topology.monitor_count(), "restore skipped: single monitor");
        return Ok(RestoreOutcome::SkippedSingleMonitor);
    }

    let directory = SpaceDirectory::new(platform.spaces.spaces_by_display()?, &topology);
    let running = platform.processes.list_regular_apps()?;
    let running: HashMap<&str, i32> = running
        .iter()
        .map(|app| (app.bundle_id.as_str(), app.pid))
        .collect();

    let mut report = RestoreReport::default();

    for saved in database.assignments.values() {
        let Some(&pid) = running.get(saved.bundle_identifier.as_str()) else {
            debug!(bundle = %saved.bundle_identifier, "app not running, skipping");
            report.apps_skipped += 1;
            continue;
        };
        let windows = match windows_with_fallback(platform, pid) {
            Ok(windows) => windows,
            Err(e) => {
                debug!(bundle = %saved.bundle_identifier, error = %e, "window enumeration failed, skipping app");
                report.apps_skipped += 1;
                continue;
            }
        };

        for (discovery_index, window) in windows.iter().enumerate() {
            if window.frame.width <= min_dimension || window.frame.height <= min_dimension {
                continue;
            }
            let Some(target) = best_match(&saved.windows, discovery_index, &window.title)
                .or_else(|| saved.windows.first())
            else {
                continue;
            };

            // Out-of-range saved monitor: the lookup fails and the window
            // stays where it is
            let Some(target_frame) = topology.geometry_of(target.monitor_index) else {
                debug!(
                    bundle = %saved.bundle_identifier,
                    monitor = target.monitor_index,
                    "saved monitor no longer present, leaving window"
                );
                continue;
            };

            let current_monitor = topology.index_of(window.frame.center());
            if current_monitor != Some(target.monitor_index)
                && let Some(handle) = window.move_handle
            {
                let center = target_frame.center();
                let origin = Point::new(
                    center.x - window.frame.width / 2.0,
                    center.y - window.frame.height / 2.0,
                );
                match platform.mover.set_position(handle, origin) {
                    Ok(()) => report.windows_moved += 1,
                    Err(e) => {
                        warn!(bundle = %saved.bundle_identifier, error = %e, "window reposition failed");
                    }
                }
            }

            // Space placement happens even when the window could not be
            // repositioned; the fallback channel can still change spaces
            let space_count = directory.space_count(target.monitor_index);
            if space_count == 0 {
                continue;
            }
            let clamped = target.space_index.min(space_count - 1);
            let Some(space) = directory.space_id(target.monitor_index, clamped) else {
                continue;
            };
            let Some(window_id) = window.window_id else {
                continue;
            };
            match directory.ensure_window_on(platform.spaces.as_ref(), window_id, space) {
                Ok(true) => report.spaces_changed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(bundle = %saved.bundle_identifier, error = %e, "space move failed");
                }
            }
        }
    }

    Ok(RestoreOutcome::Completed(report))
}
