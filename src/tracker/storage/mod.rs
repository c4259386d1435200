//! Storage is organized through [activity_log::JsonActivityLogStore].
//! The basic idea is:
//!   - There is a single JSON document with one aggregate per window.
//!   - Every finished dwell is merged into its aggregate and the whole document is rewritten.
//!   - Missing or corrupt documents are treated as empty.

pub mod activity_log;
pub mod entities;
