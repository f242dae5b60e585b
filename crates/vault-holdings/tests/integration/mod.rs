//! Shared helpers for vault-holdings integration tests.

pub mod common;
