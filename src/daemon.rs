//! Top-level assembly and event loop
//!
//! One thread drives everything: external events (topology changes, manual
//! restore requests) arrive on an mpsc channel, timers live in the
//! scheduler, and each is handled to completion before the next. The
//! daemon owns the learning loop and the restore coordinator and routes
//! between them; neither holds a reference to the other.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, trace, warn};

use crate::config::Settings;
use crate::learning::{ControlMsg, LearningLoop, TickOutcome};
use crate::persistence::AssignmentStore;
use crate::platform::Platform;
use crate::restore::{self, Action, RestoreCoordinator, RestoreOutcome, TimerKind};
use crate::scheduler::{Scheduler, TimerToken};

/// External inputs fed to the daemon by the embedding shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The display topology changed (dock, undock, sleep, wake)
    TopologyChanged,
    /// User asked for a restore outside the debounce flow
    RestoreRequested,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    LearnTick,
    Debounce,
    Settle,
    PermissionRecheck,
}

const RESTORE_PROMPT: &str = "Display layout changed. Restore saved window positions?";

pub struct Daemon {
    platform: Platform,
    store: AssignmentStore,
    settings: Settings,
    learning: LearningLoop,
    coordinator: RestoreCoordinator,
    scheduler: Scheduler<TimerEvent>,
    debounce_token: Option<TimerToken>,
    settle_token: Option<TimerToken>,
}

impl Daemon {
    pub fn new(platform: Platform, store: AssignmentStore, settings: Settings) -> Self {
        let learning = LearningLoop::new(settings.min_window_dimension);
        let coordinator = RestoreCoordinator::new(settings.debounce(), settings.settle());
        Self {
            platform,
            store,
            settings,
            learning,
            coordinator,
            scheduler: Scheduler::new(),
            debounce_token: None,
            settle_token: None,
        }
    }

    /// Startup work: authorization check and the immediate first learn tick
    pub fn start(&mut self) {
        if !self.platform.permissions.is_authorized() {
            warn!("window introspection not authorized, requesting");
            self.platform.permissions.request_authorization();
            self.scheduler
                .schedule_after(self.settings.permission_recheck(), TimerEvent::PermissionRecheck);
        }
        info!(
            saved_apps = self.store.database().len(),
            learn_interval_secs = self.settings.learn_interval_secs,
            "daemon starting"
        );
        self.fire(TimerEvent::LearnTick);
    }

    /// Blocking real-time loop. External events are always handled before
    /// due timers, so a topology-change pause lands before any learning
    /// tick due at the same instant.
    pub fn run(mut self, events: Receiver<EngineEvent>) -> Result<()> {
        let epoch = Instant::now();
        self.start();
        loop {
            let timeout = self
                .scheduler
                .next_deadline()
                .map(|deadline| deadline.saturating_sub(epoch.elapsed()))
                .unwrap_or(Duration::from_secs(60));
            match events.recv_timeout(timeout) {
                Ok(EngineEvent::Shutdown) => {
                    info!("shutdown requested");
                    return Ok(());
                }
                Ok(event) => self.handle_event(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("event channel closed, stopping");
                    return Ok(());
                }
            }
            self.advance_to(epoch.elapsed());
        }
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::TopologyChanged => {
                let actions = self.coordinator.on_topology_changed();
                self.apply_actions(actions);
            }
            EngineEvent::RestoreRequested => {
                let actions = self.coordinator.on_manual_restore();
                self.apply_actions(actions);
            }
            EngineEvent::Shutdown => {}
        }
    }

    /// Move virtual time forward and fire every due timer
    pub fn advance_to(&mut self, now: Duration) {
        for event in self.scheduler.advance_to(now) {
            self.fire(event);
        }
    }

    fn fire(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::LearnTick => {
                match self.learning.tick(&self.platform, &mut self.store) {
                    Ok(TickOutcome::Completed { apps_seen, committed }) if committed > 0 => {
                        info!(apps_seen = apps_seen, committed = committed, "learning tick committed changes");
                    }
                    Ok(outcome) => trace!(outcome = ?outcome, "learning tick"),
                    Err(e) => warn!(error = %e, "learning tick failed"),
                }
                // Fixed cadence regardless of tick outcome
                self.scheduler
                    .schedule_after(self.settings.learn_interval(), TimerEvent::LearnTick);
            }
            TimerEvent::Debounce => {
                self.debounce_token = None;
                let monitor_count = self.current_monitor_count();
                let has_assignments = !self.store.database().is_empty();
                let actions = self.coordinator.on_debounce_fired(monitor_count, has_assignments);
                self.apply_actions(actions);
            }
            TimerEvent::Settle => {
                self.settle_token = None;
                let actions = self.coordinator.on_settle_fired();
                self.apply_actions(actions);
            }
            TimerEvent::PermissionRecheck => {
                if self.platform.permissions.is_authorized() {
                    info!("authorization granted");
                } else {
                    warn!("still not authorized, requesting again");
                    self.platform.permissions.request_authorization();
                    self.scheduler
                        .schedule_after(self.settings.permission_recheck(), TimerEvent::PermissionRecheck);
                }
            }
        }
    }

    fn current_monitor_count(&self) -> usize {
        match self.platform.screens.list_monitors() {
            Ok(frames) => frames.len(),
            Err(e) => {
                warn!(error = %e, "monitor enumeration failed");
                0
            }
        }
    }

    fn apply_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Pause => self.learning.apply(ControlMsg::Pause),
                Action::Resume => self.learning.apply(ControlMsg::Resume),
                Action::StartTimer(kind, delay) => {
                    self.cancel_timer(kind);
                    let event = match kind {
                        TimerKind::Debounce => TimerEvent::Debounce,
                        TimerKind::Settle => TimerEvent::Settle,
                    };
                    let token = self.scheduler.schedule_after(delay, event);
                    match kind {
                        TimerKind::Debounce => self.debounce_token = Some(token),
                        TimerKind::Settle => self.settle_token = Some(token),
                    }
                }
                Action::CancelTimer(kind) => self.cancel_timer(kind),
                Action::Prompt => {
                    let choice = self.platform.presenter.confirm_restore(RESTORE_PROMPT);
                    debug!(choice = ?choice, "user answered restore prompt");
                    let actions = self.coordinator.on_choice(choice);
                    self.apply_actions(actions);
                }
                Action::RunRestore => {
                    match restore::execute(
                        &self.platform,
                        self.store.database(),
                        self.settings.min_window_dimension,
                    ) {
                        Ok(RestoreOutcome::Completed(report)) => {
                            info!(
                                windows_moved = report.windows_moved,
                                spaces_changed = report.spaces_changed,
                                apps_skipped = report.apps_skipped,
                                "restore complete"
                            );
                        }
                        Ok(RestoreOutcome::SkippedSingleMonitor) => {}
                        Err(e) => warn!(error = %e, "restore failed"),
                    }
                    let actions = self.coordinator.on_restore_complete();
                    self.apply_actions(actions);
                }
            }
        }
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        let token = match kind {
            TimerKind::Debounce => self.debounce_token.take(),
            TimerKind::Settle => self.settle_token.take(),
        };
        if let Some(token) = token {
            self.scheduler.cancel(token);
        }
    }
}
