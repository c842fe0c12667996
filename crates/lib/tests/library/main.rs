//! Integration tests for blockbuild-lib's public API.

mod bundle_tests;
#[cfg(unix)]
mod shell_tests;
