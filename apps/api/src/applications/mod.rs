//! Application review: approve, reject and bulk status.

pub mod actions;
pub mod handlers;
