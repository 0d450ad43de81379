#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// Mixed English/Arabic roster with three dynamic columns.
pub const ROSTER_CSV: &str = "\
Name,ID,Department,Status,End Date,Bonus,Remote,Review Date,Shift
Ali,E-1,IT,,,500,yes,2024-03-01,night
Sara,,Finance,,2001-06-30,1200,no,,day
Omar,E-3,IT,Active,2001-06-30,,yes,,night
,E-4,HR,,,10,no,,day
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Settings directory used by CLI invocations in this workspace.
    pub fn settings_dir(&self) -> PathBuf {
        self.temp_dir.path().join("settings")
    }

    /// The binary under test, pointed at this workspace's settings directory.
    pub fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::cargo_bin("hr-sheet").expect("binary exists");
        cmd.current_dir(self.path())
            .env("RUST_LOG", "off")
            .arg(subcommand);
        if subcommand == "fields" {
            cmd.arg("--settings-dir").arg(self.settings_dir());
        }
        cmd
    }

    /// Appends the shared source arguments for loading `input`.
    pub fn source_args(&self, input: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.display().to_string(),
            "--settings-dir".to_string(),
            self.settings_dir().display().to_string(),
        ]
    }
}
