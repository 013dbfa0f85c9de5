//! Shared helpers for integration tests: socket guard and forum page fixtures.

#![allow(dead_code)]

pub mod forum;
pub mod socket_guard;
