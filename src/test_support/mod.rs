//! Shared helpers for in-crate unit tests.

pub mod pdf;
pub mod socket_guard;
