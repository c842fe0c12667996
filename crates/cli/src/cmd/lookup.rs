//! Implementation of the `blockbuild lookup` command.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use blockbuild_lib::config::Config;
use blockbuild_lib::consts::HASHES_FILE;
use blockbuild_lib::fetch::RemoteState;
use blockbuild_lib::lookup::lookup;
use blockbuild_lib::manifest::HashManifest;

/// Print the packwiz descriptor for `path`, reading the published hash manifest
/// from `hashes` if given and from the configured host otherwise.
pub fn cmd_lookup(config: &Config, path: &str, hashes: Option<&Path>) -> Result<()> {
  let text = match hashes {
    Some(file) => fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?,
    None => {
      let remote = RemoteState::new(&config.host).context("Failed to create HTTP client")?;
      let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
      match rt.block_on(remote.fetch_text(HASHES_FILE))? {
        Some(text) => text,
        None => bail!("No {} published at {}", HASHES_FILE, remote.url_for(HASHES_FILE)),
      }
    }
  };

  let manifest = HashManifest::parse(&text);
  let Some(descriptor) = lookup(&manifest, &config.host, path) else {
    bail!("{} is not listed in {}", path, HASHES_FILE);
  };

  print!("{}", descriptor.to_toml().context("Failed to render descriptor")?);
  Ok(())
}
