//! Productivity tracker that watches the focused window, keeps a per-window activity log and
//! nudges the user with desktop notifications when focus drifts. The log is periodically
//! summarized by a language model and shown as a terminal dashboard.

pub mod analyze;
pub mod cli;
pub mod config;
pub mod fs;
pub mod notify;
pub mod report;
pub mod tracker;
pub mod utils;
pub mod window_api;
