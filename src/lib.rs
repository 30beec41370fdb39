#![forbid(unsafe_code)]

//! Keeps application windows pinned to a monitor and virtual desktop.
//!
//! The OS scrambles window placement whenever the display topology changes
//! (docking, undocking, sleep/wake). This crate runs a learn-then-restore
//! reconciliation loop: a polling learner records where windows sit, and a
//! debounced coordinator offers to move them back after the topology
//! settles. Windows carry no identity that survives an app restart, so
//! restoration matches them heuristically by title and discovery order.
//!
//! All OS access goes through the capability traits in [`platform`]; the
//! embedding shell supplies the real bindings and feeds
//! [`daemon::EngineEvent`]s into [`daemon::Daemon::run`].

pub mod config;
pub mod constants;
pub mod daemon;
pub mod learning;
pub mod matching;
pub mod persistence;
pub mod platform;
pub mod restore;
pub mod scheduler;
pub mod spaces;
pub mod topology;
pub mod types;
