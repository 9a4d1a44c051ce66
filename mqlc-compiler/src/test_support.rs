//! Fake compilers and scratch directories for unit tests

use mqlc_core::domain::job::SourceUpload;
use mqlc_core::domain::strategy::Platform;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cleanup::CleanupRegistry;
use crate::config::{COMPILER_EXECUTABLE, CompilerConfig};
use crate::files;
use crate::orchestrator::JobOrchestrator;

/// Shell bodies standing in for the compiler
///
/// Each body sees the compiler arguments and picks the output path from the
/// `/out:` argument.
pub mod scripts {
    pub const WRITES_ARTIFACT: &str = r#"echo "Result: 0 errors, 0 warnings"
printf 'EX5-binary' > "$out""#;

    pub const WRITES_ARTIFACT_EXITS_NONZERO: &str = r#"printf 'EX5-binary' > "$out"
echo "warning: exit code is noise" >&2
exit 1"#;

    pub const WRITES_NOTHING: &str = r#"echo "nothing to see"
exit 0"#;

    pub const TOUCHES_MARKER: &str = r#"touch "$(dirname "$0")/spawned"
printf 'EX5-binary' > "$out""#;

    pub const HANGS: &str = r#"echo "still compiling"
exec sleep 30"#;

    /// Writes the artifact unless the source mentions `BROKEN`
    pub const FAILS_ON_BROKEN: &str = r#"if grep -q BROKEN "$src"; then
  echo "1 error" >&2
  exit 1
fi
printf 'EX5-binary' > "$out""#;

    /// Writes the artifact, a second late when the source mentions `SLOW`
    pub const SLEEPS_ON_SLOW: &str = r#"if grep -q SLOW "$src"; then
  sleep 1
fi
printf 'EX5-binary' > "$out""#;
}

const PRELUDE: &str = r#"#!/bin/sh
src=""
out=""
prev=""
for arg in "$@"; do
  case "$arg" in
    /out:*) out="${arg#/out:}" ;;
  esac
  if [ "$prev" = "/compile" ]; then
    src="$arg"
  fi
  prev="$arg"
done
"#;

/// Scratch root holding `bin/`, `uploads/` and `compiled/`
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// File the `TOUCHES_MARKER` script creates when it runs
    pub fn marker(&self) -> PathBuf {
        self.root().join("bin").join("spawned")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("compiled")
    }

    /// Entries left in the output directory
    pub fn output_entries(&self) -> usize {
        std::fs::read_dir(self.output_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Linux config rooted in this workspace; the compiler does not exist yet
    pub fn config(&self) -> CompilerConfig {
        let mut config = CompilerConfig::new(self.root().join("mt5"), Platform::Linux);
        config.output_dir = self.output_dir();
        config.compile_timeout = Duration::from_secs(10);
        config.fallback_timeout = Duration::from_secs(5);
        config
    }

    /// Config running `body` through `sh`, i.e. the Emulation strategy
    pub fn emulated_config(&self, body: &str) -> CompilerConfig {
        let script = self.write_script("fake-compiler.sh", body, false);
        let mut config = self.config();
        config.compiler_path = script;
        config.emulator = "sh".to_string();
        config
    }

    pub fn emulated_orchestrator(&self, body: &str, fallback_enabled: bool) -> JobOrchestrator {
        let mut config = self.emulated_config(body);
        config.fallback_enabled = fallback_enabled;
        JobOrchestrator::new(Arc::new(config), Arc::new(CleanupRegistry::new()))
    }

    /// Orchestrator executing an executable script named like the real compiler
    pub fn mock_orchestrator(&self, body: &str) -> JobOrchestrator {
        let mut config = self.config();
        config.compiler_path = self.write_script(COMPILER_EXECUTABLE, body, true);
        JobOrchestrator::new(Arc::new(config), Arc::new(CleanupRegistry::new()))
    }

    /// Stages `contents` the way the server does and returns the upload
    pub fn upload(&self, name: &str, contents: &str) -> SourceUpload {
        let path = self
            .root()
            .join("uploads")
            .join(files::unique_filename(name));
        std::fs::write(&path, contents).unwrap();
        SourceUpload::new(path, name.to_string())
    }

    fn write_script(&self, name: &str, body: &str, executable: bool) -> PathBuf {
        let path = self.root().join("bin").join(name);
        let contents = format!("{}{}\n", PRELUDE, body);
        if !executable {
            std::fs::write(&path, contents).unwrap();
            return path;
        }

        // A sibling test forking while this process holds the file open for
        // writing keeps it busy (ETXTBSY) once exec'd; `cp` writes the final
        // inode from its own process instead.
        let draft = self.root().join(format!("{}.draft", name));
        std::fs::write(&draft, contents).unwrap();
        let status = std::process::Command::new("cp")
            .arg(&draft)
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success(), "cp failed for {}", path.display());
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::remove_file(&draft).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executable_scripts_run_while_siblings_fork() {
        let workers: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let ws = Workspace::new();
                    let script = ws.write_script(&format!("tool-{}", i), "exit 0", true);
                    let status = std::process::Command::new(&script).status().unwrap();
                    assert!(status.success());
                    assert!(!ws.root().join(format!("tool-{}.draft", i)).exists());
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
    }
}
