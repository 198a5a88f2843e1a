#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway tickoff data directory.
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn record_path(&self, user: &str) -> PathBuf {
        self.dir
            .path()
            .join("store")
            .join(format!("todos_{user}.json"))
    }

    pub fn read_record(&self, user: &str) -> Value {
        let raw = fs::read_to_string(self.record_path(user)).expect("read record");
        serde_json::from_str(&raw).expect("record json")
    }

    pub fn write_record(&self, user: &str, contents: &str) {
        let path = self.record_path(user);
        fs::create_dir_all(path.parent().expect("store dir")).expect("create store dir");
        fs::write(path, contents).expect("write record");
    }

    pub fn write_config(&self, contents: &str) {
        fs::write(self.dir.path().join("config.toml"), contents).expect("write config");
    }

    /// `tickoff` pointed at this data dir with a clean environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = tickoff_cmd();
        cmd.env("TICKOFF_DATA_DIR", self.dir.path());
        cmd
    }

    /// Run with `--json`, assert success, and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }
}

pub fn tickoff_cmd() -> Command {
    let mut cmd = Command::cargo_bin("tickoff").expect("binary");
    cmd.env_remove("TICKOFF_USER")
        .env_remove("TICKOFF_DATA_DIR")
        .env_remove("RUST_LOG");
    cmd
}
