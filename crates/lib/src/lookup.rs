//! Resolve a published file to a packwiz download descriptor.

use serde::Serialize;

use crate::manifest::HashManifest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
  pub name: String,
  pub filename: String,
  pub side: String,
  pub download: Download,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
  pub url: String,
  #[serde(rename = "hash-format")]
  pub hash_format: String,
  pub hash: String,
}

impl Descriptor {
  pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
    toml::to_string(self)
  }
}

/// Find `path` in a published hash manifest and describe where to download it.
pub fn lookup(hashes: &HashManifest, host: &str, path: &str) -> Option<Descriptor> {
  let path = path.trim_start_matches("./");
  let record = hashes.get(path)?;

  let filename = path.rsplit('/').next().unwrap_or(path).to_string();
  let name = filename.strip_suffix(".jar").unwrap_or(&filename).to_string();
  let host = host.trim_end_matches('/');

  Some(Descriptor {
    name,
    filename,
    side: "both".to_string(),
    download: Download {
      url: format!("{}/{}", host, path),
      hash_format: "sha256".to_string(),
      hash: record.digest.0.clone(),
    },
  })
}
