#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write an executable `rg` stand-in running `body` under `/bin/sh`.
///
/// Inside the script `$root` holds the last argument (the search root).
pub fn fake_rg(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("rg");
    let script = format!("#!/bin/sh\nfor root; do :; done\n{}\n", body);
    fs::write(&path, script).unwrap();

    let mut permissions = fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).unwrap();
    path
}

/// Temporary tree with a tool directory and a search root holding `files`.
pub struct Workspace {
    pub temp: TempDir,
    pub root: PathBuf,
    pub bin: PathBuf,
}

impl Workspace {
    pub fn new(files: &[&str]) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let bin = temp.path().join("bin");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&bin).unwrap();

        for file in files {
            let path = root.join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, b"content").unwrap();
        }

        Self { temp, root, bin }
    }

    pub fn tool(&self, body: &str) -> PathBuf {
        fake_rg(&self.bin, body)
    }
}
