//! Every workspace crate must take its version from the workspace.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn read_toml(path: &Path) -> toml::Value {
    std::fs::read_to_string(path).unwrap().parse().unwrap()
}

#[test]
fn all_crates_use_workspace_version() {
    let root = workspace_root();
    let doc = read_toml(&root.join("Cargo.toml"));
    let members = doc["workspace"]["members"].as_array().unwrap();
    assert!(!members.is_empty());

    for member in members {
        let member = member.as_str().unwrap();
        let manifest = read_toml(&root.join(member).join("Cargo.toml"));
        let uses_workspace = manifest["package"]["version"]
            .as_table()
            .and_then(|t| t.get("workspace"))
            .and_then(|v| v.as_bool())
            == Some(true);
        assert!(uses_workspace, "{member} must set version.workspace = true");
    }
}

#[test]
fn package_version_matches_workspace() {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    let version = doc["workspace"]["package"]["version"].as_str().unwrap();
    assert_eq!(env!("CARGO_PKG_VERSION"), version);
}

#[test]
fn internal_dependency_versions_match_workspace() {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    let version = doc["workspace"]["package"]["version"].as_str().unwrap();
    let deps = doc["workspace"]["dependencies"].as_table().unwrap();
    for name in ["elig-core", "elig-pipeline"] {
        assert_eq!(deps[name]["version"].as_str(), Some(version), "{name}");
    }
}
