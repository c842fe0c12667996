//! Shared utilities.
//!
//! Content hashing plus the scripted command runner used by tests.

pub mod hash;

#[cfg(test)]
pub mod testutil;
