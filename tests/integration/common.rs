//! Shared helpers: fake external tools and a preconfigured command.

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fullupdate_cli::test_utils::WorkdirFixture;

/// Fake `make_full_update.sh`: writes the sorted file list of `$2` into `$1`.
///
/// Fails if `MAR` is not exported, as the real script needs it.
pub const LISTING_BUILD_TOOL: &str = r#"#!/bin/sh
set -e
[ -n "$MAR" ] || { echo "MAR is not set" >&2; exit 9; }
( cd "$2" && find . -type f | sort ) > "$1"
"#;

/// Fake build tool that always fails.
pub const FAILING_BUILD_TOOL: &str = "#!/bin/sh\necho 'packaging exploded' >&2\nexit 2\n";

/// Fake build tool that never finishes in time.
pub const SLOW_BUILD_TOOL: &str = "#!/bin/sh\n(sleep 2; echo late > \"$1\") &\nwait\n";

/// Directory of fake tools for one test.
pub struct FakeTools {
    dir: tempfile::TempDir,
}

impl FakeTools {
    /// Creates a fake `mar` plus a build tool with the given script body.
    ///
    /// The fake `mar` appends `SIGNED:<cert name>` to the input and logs its
    /// arguments to `mar.log`.
    pub fn new(build_tool: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("mar.log");
        let mar = format!(
            "#!/bin/sh\necho \"$@\" >> '{}'\n{{ cat \"$8\"; printf 'SIGNED:%s' \"$6\"; }} > \"$9\"\n",
            log.display()
        );
        write_script(&dir.path().join("mar"), &mar);
        write_script(&dir.path().join("make_full_update.sh"), build_tool);
        Self { dir }
    }

    pub fn mar(&self) -> PathBuf {
        self.dir.path().join("mar")
    }

    pub fn build_tool(&self) -> PathBuf {
        self.dir.path().join("make_full_update.sh")
    }

    /// Lines logged by the fake `mar`; empty if it never ran.
    pub fn mar_invocations(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("mar.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A `fullupdate` command with the six positionals filled in from `fixture`,
/// using `tools`, with a clean environment for logging and config.
pub fn fullupdate(fixture: &WorkdirFixture, tools: &FakeTools) -> Command {
    let mut cmd = Command::cargo_bin("fullupdate").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("FULLUPDATE_CONFIG")
        .env("FULLUPDATE_NO_PROGRESS", "1")
        .env("MAR", tools.mar())
        .env("FULLUPDATE_CONTAINER_TOOL", tools.build_tool())
        .arg("app")
        .arg(fixture.root())
        .arg("update")
        .arg(fixture.certificate_dir())
        .arg("release")
        .arg("https://example.org/builds/");
    cmd
}
