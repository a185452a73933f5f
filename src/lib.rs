//! Market-intelligence dashboard for home-builder sales teams.
//!
//! The agent run's canonical state lives in [`tracker`]; [`poller`] gives
//! callers a near-real-time view of it; [`backend`] is the seam between
//! the front end and either the in-process demo backend or a remote
//! server hosting the same surface.

pub mod backend;
pub mod cli;
pub mod error;
pub mod model;
#[cfg(feature = "tui")]
mod orchestrator;
pub mod poller;
pub mod server;
pub mod store;
mod text_summary;
pub mod tracker;
#[cfg(feature = "tui")]
mod tui;
