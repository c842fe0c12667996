//! A published bundle restored into a fresh workspace must reproduce the
//! previous run's artifacts exactly, minus its manifests.

use std::fs;

use blockbuild_lib::archive;
use blockbuild_lib::consts::{COMMITS_FILE, HASHES_FILE};
use blockbuild_lib::layout::Layout;
use blockbuild_lib::lookup::lookup;
use blockbuild_lib::manifest::{self, CommitManifest, HashManifest};
use tempfile::tempdir;

fn publish(layout: &Layout) -> HashManifest {
  let out = layout.out_dir();
  fs::create_dir_all(layout.module_out_dir("alpha")).unwrap();
  fs::create_dir_all(layout.maven_dir().join("com/example/alpha/1.0")).unwrap();
  fs::write(layout.module_out_dir("alpha").join("alpha-1.0.jar"), "alpha").unwrap();
  fs::write(layout.maven_dir().join("com/example/alpha/1.0/alpha-1.0.pom"), "<project/>").unwrap();

  let hashes = HashManifest::generate(&out).unwrap();
  manifest::write_file(&out, HASHES_FILE, &hashes.to_string()).unwrap();

  let mut commits = CommitManifest::new();
  commits.push("alpha", "h1");
  manifest::write_file(&out, COMMITS_FILE, &commits.to_string()).unwrap();

  archive::pack(&out, &layout.tmp_dir()).unwrap();
  hashes
}

#[test]
fn restored_bundle_reproduces_artifacts() {
  let first = tempdir().unwrap();
  let previous = Layout::new(first.path());
  previous.prepare().unwrap();
  let published = publish(&previous);

  let second = tempdir().unwrap();
  let next = Layout::new(second.path());
  next.prepare().unwrap();
  archive::unpack(&previous.out_dir().join("out.tar.gz"), &next.out_dir()).unwrap();

  let removed = manifest::clean_previous(&next.out_dir()).unwrap();
  assert_eq!(removed.len(), 2);
  assert!(!next.out_dir().join(HASHES_FILE).exists());

  assert_eq!(HashManifest::generate(&next.out_dir()).unwrap(), published);
  assert!(published.mismatches(&next.out_dir()).is_empty());
}

#[test]
fn published_manifest_parses_back() {
  let temp = tempdir().unwrap();
  let layout = Layout::new(temp.path());
  layout.prepare().unwrap();
  let published = publish(&layout);

  let text = fs::read_to_string(layout.out_dir().join(HASHES_FILE)).unwrap();
  assert_eq!(HashManifest::parse(&text), published);

  let commits = CommitManifest::parse(&fs::read_to_string(layout.out_dir().join(COMMITS_FILE)).unwrap());
  assert_eq!(commits.prior_for("alpha"), Some("h1"));

  let descriptor = lookup(&published, "https://builds.example.com/", "alpha/alpha-1.0.jar").unwrap();
  assert_eq!(
    descriptor.download.hash,
    published.get("alpha/alpha-1.0.jar").unwrap().digest.to_string()
  );
}
