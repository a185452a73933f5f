//! Application-level orchestration utilities.
//!
//! This module owns the polling loop and backend access on behalf of the
//! TUI: it translates UI commands into backend calls and forwards status
//! and data updates back to the presentation layer, which never touches
//! the backend directly.

mod controller;

pub(crate) use controller::{run_controller, MarketData, UiCommand, UiEvent};
