#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;
use url::Url;

/// Isolated home directory plus a file store, both removed on drop.
pub struct Sandbox {
    dir: TempDir,
    pub store_url: String,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("home")).unwrap();
        let store_url = Url::from_directory_path(dir.path().join("store"))
            .expect("Failed to convert path to file URL")
            .to_string();
        Self { dir, store_url }
    }

    pub fn home(&self) -> std::path::PathBuf {
        self.dir.path().join("home")
    }

    pub fn store_path(&self) -> std::path::PathBuf {
        self.dir.path().join("store")
    }

    /// Run against this sandbox's store via `TESSERA_STORE`.
    pub fn run(&self, args: &[&str]) -> Output {
        run_cli_with_env(args, &self.home(), Some(&self.store_url))
    }

    /// Run with only the saved profile to select the store.
    pub fn run_with_profile(&self, args: &[&str]) -> Output {
        run_cli_with_env(args, &self.home(), None)
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Record ids printed by a `read`, in order.
    pub fn read_ids(&self, args: &[&str]) -> Vec<String> {
        self.run_success(args)
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter_map(|record| record["id"].as_str().map(str::to_string))
            .collect()
    }
}

/// Run the CLI binary with a custom HOME for isolated profile storage.
pub fn run_cli_with_env(args: &[&str], home: &Path, store_url: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tessera"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("TESSERA_STORE");
    cmd.env_remove("TESSERA_PROJECT");
    cmd.env_remove("TESSERA_TOKEN");
    cmd.env_remove("RUST_LOG");
    if let Some(url) = store_url {
        cmd.env("TESSERA_STORE", url);
    }
    cmd.output().expect("Failed to execute CLI")
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}
