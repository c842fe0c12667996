//! Remote state from the previous run.
//!
//! The previous run published its `hashes.txt`, `commits.txt` and `out.tar.gz`
//! under the configured host. Any non-success response means "no previous
//! run" and is never an error; transport failures are.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::consts::{APP_NAME, COMMITS_FILE, HASHES_FILE};
use crate::manifest::{CommitManifest, HashManifest};

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to build http client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("fetch failed for {url}: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Read-only view of the previous run's published output.
#[derive(Debug, Clone)]
pub struct RemoteState {
  client: reqwest::Client,
  base_url: String,
}

impl RemoteState {
  pub fn new(base_url: &str) -> Result<Self, FetchError> {
    let client = reqwest::Client::builder()
      .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(FetchError::Client)?;

    let base_url = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };

    Ok(Self { client, base_url })
  }

  pub fn url_for(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path.trim_start_matches('/'))
  }

  /// Fetch a resource's bytes. `None` when the host has no such resource.
  pub async fn fetch_bytes(&self, path: &str) -> Result<Option<Vec<u8>>, FetchError> {
    let url = self.url_for(path);
    debug!(url = %url, "fetching previous artifact");

    let to_err = |source| FetchError::Request { url: url.clone(), source };

    let response = self.client.get(&url).send().await.map_err(to_err)?;
    if !response.status().is_success() {
      info!(url = %url, status = %response.status(), "no previous artifact");
      return Ok(None);
    }

    let bytes = response.bytes().await.map_err(to_err)?;
    Ok(Some(bytes.to_vec()))
  }

  pub async fn fetch_text(&self, path: &str) -> Result<Option<String>, FetchError> {
    Ok(
      self
        .fetch_bytes(path)
        .await?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
    )
  }

  /// Download a resource to `dest`. Returns whether it existed.
  pub async fn download(&self, path: &str, dest: &Path) -> Result<bool, FetchError> {
    let Some(bytes) = self.fetch_bytes(path).await? else {
      return Ok(false);
    };

    let to_err = |source| FetchError::Write {
      path: dest.to_path_buf(),
      source,
    };

    let mut file = fs::File::create(dest).await.map_err(to_err)?;
    file.write_all(&bytes).await.map_err(to_err)?;
    file.flush().await.map_err(to_err)?;

    info!(path = ?dest, size = bytes.len(), "download complete");
    Ok(true)
  }
}

/// Manifests published by the previous run.
#[derive(Debug, Clone, Default)]
pub struct PriorState {
  /// Informational only; rebuild decisions use commits.
  pub hashes: Option<HashManifest>,
  pub commits: CommitManifest,
}

impl PriorState {
  pub async fn load(remote: &RemoteState) -> Result<Self, FetchError> {
    let hashes = remote.fetch_text(HASHES_FILE).await?.map(|text| HashManifest::parse(&text));
    let commits = remote
      .fetch_text(COMMITS_FILE)
      .await?
      .map(|text| CommitManifest::parse(&text))
      .unwrap_or_default();

    debug!(
      hashes = hashes.as_ref().map(|h| h.len()).unwrap_or(0),
      commits = commits.len(),
      "loaded previous run state"
    );

    Ok(Self { hashes, commits })
  }
}
