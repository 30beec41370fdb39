//! Capability interfaces onto the operating system
//!
//! The engine never talks to the OS directly; the shell that embeds it
//! supplies an implementation of each trait here. Everything is synchronous
//! and called from the single daemon thread.

use anyhow::Result;
use tracing::debug;

use crate::types::{MoveHandle, Point, Rect, SpaceId, WindowId};

/// A regular-activation (non-background) running application
#[derive(Debug, Clone)]
pub struct RunningApp {
    pub bundle_id: String,
    pub name: String,
    pub pid: i32,
}

/// One window as observed through an introspection channel.
///
/// The primary channel yields a `move_handle`; the fallback channel is
/// read-only and never does. `window_id` is the space source's identifier
/// for the window and is always present on the fallback channel, while the
/// primary channel supplies it only when the binding can correlate one.
#[derive(Debug, Clone)]
pub struct LiveWindow {
    /// Frame in window coordinates (top-left origin)
    pub frame: Rect,
    pub title: String,
    pub window_id: Option<WindowId>,
    pub move_handle: Option<MoveHandle>,
}

pub trait ScreenSource {
    /// Monitor frames in Cartesian screen coordinates (bottom-left origin).
    /// The first frame is the monitor containing the global origin.
    fn list_monitors(&self) -> Result<Vec<Rect>>;
}

pub trait ProcessSource {
    fn list_regular_apps(&self) -> Result<Vec<RunningApp>>;
}

/// Primary per-app window introspection. May fail for a single app; some
/// applications actively refuse it.
pub trait WindowSource {
    fn windows_of(&self, pid: i32) -> Result<Vec<LiveWindow>>;
}

/// Secondary, coarser enumeration used when the primary channel is blocked.
/// Layer-filtered to normal windows; read-only.
pub trait FallbackWindowSource {
    fn windows_of(&self, pid: i32) -> Result<Vec<LiveWindow>>;
}

pub trait WindowMover {
    fn set_position(&self, handle: MoveHandle, to: Point) -> Result<()>;
}

pub trait SpaceSource {
    /// Space IDs per display, in the screen source's display order
    fn spaces_by_display(&self) -> Result<Vec<Vec<SpaceId>>>;

    /// Every space the window currently belongs to. More than one is
    /// legitimate ("all desktops" windows).
    fn spaces_of(&self, window: WindowId) -> Result<Vec<SpaceId>>;

    /// Detach the window from every space it occupies, then attach it to
    /// the target space.
    fn move_to_space(&self, window: WindowId, to: SpaceId) -> Result<()>;
}

pub trait PermissionGate {
    fn is_authorized(&self) -> bool;
    fn request_authorization(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreChoice {
    Restore,
    LearnCurrent,
}

pub trait Presenter {
    /// Blocking binary choice shown to the user
    fn confirm_restore(&self, prompt: &str) -> RestoreChoice;
}

/// All collaborator capabilities, assembled by the embedding shell
pub struct Platform {
    pub screens: Box<dyn ScreenSource>,
    pub processes: Box<dyn ProcessSource>,
    pub windows: Box<dyn WindowSource>,
    pub fallback_windows: Box<dyn FallbackWindowSource>,
    pub mover: Box<dyn WindowMover>,
    pub spaces: Box<dyn SpaceSource>,
    pub permissions: Box<dyn PermissionGate>,
    pub presenter: Box<dyn Presenter>,
}

/// Enumerate an app's windows, falling back to the coarse channel when the
/// primary one is blocked for this app. Errors only when both channels fail.
pub fn windows_with_fallback(platform: &Platform, pid: i32) -> Result<Vec<LiveWindow>> {
    match platform.windows.windows_of(pid) {
        Ok(windows) => Ok(windows),
        Err(primary_err) => {
            debug!(pid = pid, error = %primary_err, "primary window channel blocked, trying fallback");
            platform.fallback_windows.windows_of(pid)
        }
    }
}
