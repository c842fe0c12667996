//! blockbuild-lib: incremental build orchestration for a set of gradle modules.
//!
//! Each run compares every module's current commit with the one recorded by
//! the previous published run, rebuilds only what changed, and publishes a
//! self-describing bundle:
//! - `hashes.txt`: SHA-256 digest of every staged file
//! - `commits.txt`: the commit each module was built from
//! - `info.txt`: run summary
//! - `out.tar.gz`: the whole staging directory, restored at the start of the next run
//!
//! The [`pipeline::Pipeline`] drives a run; every external tool is invoked
//! through an [`exec::CommandRunner`].

pub mod archive;
pub mod build;
pub mod config;
pub mod consts;
pub mod decision;
pub mod directive;
pub mod exec;
pub mod fetch;
pub mod layout;
pub mod lookup;
pub mod manifest;
pub mod pipeline;
pub mod publish;
pub mod sign;
pub mod util;
pub mod vcs;
