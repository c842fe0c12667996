//! Names shared across the pipeline.

pub const APP_NAME: &str = "blockbuild";

/// Staging directory holding everything that gets published.
pub const OUT_DIR: &str = "out";
/// Scratch directory for downloads, key material and the bundle in progress.
pub const TMP_DIR: &str = "tmp";
/// Checked-out module sources, one subdirectory per module.
pub const MODS_DIR: &str = "mods";
/// Maven-style repository inside the staging directory.
pub const MAVEN_DIR: &str = "mvn";
/// Exported public keys inside the staging directory.
pub const KEYS_DIR: &str = "gpg";

pub const HASHES_FILE: &str = "hashes.txt";
pub const COMMITS_FILE: &str = "commits.txt";
pub const INFO_FILE: &str = "info.txt";
pub const BUNDLE_FILE: &str = "out.tar.gz";

/// Filename prefixes of the manifest family, removed before each run.
pub const MANIFEST_PREFIXES: &[&str] = &[HASHES_FILE, COMMITS_FILE, INFO_FILE];

pub const SIGNATURE_SUFFIX: &str = ".sig";
pub const EPHEMERAL_SIGNATURE_SUFFIX: &str = ".tmp.sig";

/// Commit recorded for a module whose hash could not be computed and has no prior record.
pub const UNKNOWN_COMMIT: &str = "unknown";

/// Repository id passed to manual maven deploys.
pub const MAVEN_REPOSITORY_ID: &str = "blockbuild";
