//! Command implementations: scan, reverse, classify, inspect, verify.

pub mod classify;
pub mod inspect;
pub mod reverse;
pub mod scan;
pub mod verify;
