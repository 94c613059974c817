//! Candidate pipeline actions: hire, reject, assign, delete and bulk status.

pub mod actions;
pub mod handlers;
