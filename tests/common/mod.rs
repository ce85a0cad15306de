#![allow(dead_code, unreachable_pub)]

use assert_fs::fixture::{ChildPath, FileWriteStr, PathChild};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn prune_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_next-prune"))
}

/// Run the binary in `dir` with the given args and return the raw output.
pub fn run_prune(dir: impl AsRef<Path>, args: &[&str]) -> Output {
    Command::new(prune_bin())
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to spawn next-prune")
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub struct TestContext {
    temp_dir: ChildPath,

    // To keep the directory alive
    #[allow(dead_code)]
    _root: assert_fs::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let root = assert_fs::TempDir::new().expect("Failed to create test root directory");
        let temp_dir = root.child("project");

        fs_err::create_dir_all(&temp_dir).expect("Failed to create test working directory");

        Self {
            temp_dir,
            _root: root,
        }
    }

    /// Get the working directory for the test context
    pub fn work_dir(&self) -> &ChildPath {
        &self.temp_dir
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.temp_dir.join(rel)
    }

    /// Write a text file, creating parent directories as needed.
    pub fn write_file(&self, rel: &str, content: &str) {
        let file = self.temp_dir.child(rel);
        if let Some(parent) = file.path().parent() {
            fs_err::create_dir_all(parent).ok();
        }
        file.write_str(content).expect("Failed to write test file");
    }

    /// Create a directory containing one file of `bytes` zero bytes, so
    /// the tree has something measurable to reclaim.
    pub fn fill_dir(&self, rel: &str, bytes: usize) {
        let dir = self.temp_dir.join(rel);
        fs_err::create_dir_all(&dir).expect("Failed to create artifact dir");
        fs_err::write(dir.join("payload.bin"), vec![0u8; bytes])
            .expect("Failed to write artifact payload");
    }

    /// A minimal npm-workspaces manifest at the project root.
    pub fn write_workspaces_manifest(&self, patterns: &[&str]) {
        let list = patterns
            .iter()
            .map(|p| format!("\"{p}\""))
            .collect::<Vec<_>>()
            .join(", ");
        self.write_file("package.json", &format!(r#"{{"workspaces": [{list}]}}"#));
    }

    /// A workspace member: a directory with a package.json.
    pub fn add_workspace(&self, rel: &str) {
        self.write_file(&format!("{rel}/package.json"), r#"{"name": "member"}"#);
    }

    pub fn run(&self, args: &[&str]) -> Output {
        run_prune(&self.temp_dir, args)
    }
}
