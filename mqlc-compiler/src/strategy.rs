//! Strategy selection
//!
//! Picks how the external compiler is invoked and builds the matching command
//! line. Selection is a pure function of the configured compiler path and the
//! platform; a missing executable only shows up later as a spawn failure.

use mqlc_core::domain::strategy::{CompilerStrategy, Platform};
use std::ffi::OsString;
use std::path::Path;

use crate::config::{COMPILER_EXECUTABLE, CompilerConfig};

/// Program and argument vector for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Whether the path names the MetaEditor executable itself
pub fn names_target_executable(compiler_path: &Path) -> bool {
    compiler_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.eq_ignore_ascii_case(COMPILER_EXECUTABLE))
        .unwrap_or(false)
}

/// Selects the invocation strategy
///
/// | path names target executable | platform   | strategy  |
/// |------------------------------|------------|-----------|
/// | any                          | native     | Native    |
/// | yes                          | non-native | Mock      |
/// | no                           | non-native | Emulation |
pub fn select(compiler_path: &Path, platform: Platform) -> CompilerStrategy {
    if platform.is_native() {
        CompilerStrategy::Native
    } else if names_target_executable(compiler_path) {
        CompilerStrategy::Mock
    } else {
        CompilerStrategy::Emulation
    }
}

/// Builds the command line for `strategy`
///
/// Every strategy passes the source path and requests `output` explicitly.
pub fn command_line(
    strategy: CompilerStrategy,
    config: &CompilerConfig,
    source: &Path,
    output: &Path,
) -> CommandLine {
    let compile_args = |with_log: bool| {
        let mut args: Vec<OsString> = vec!["/compile".into(), source.as_os_str().to_owned()];
        if with_log {
            args.push("/log".into());
        }
        let mut out = OsString::from("/out:");
        out.push(output.as_os_str());
        args.push(out);
        args
    };

    match strategy {
        CompilerStrategy::Mock => CommandLine {
            program: config.compiler_path.as_os_str().to_owned(),
            args: compile_args(false),
        },
        CompilerStrategy::Emulation => {
            let mut args = vec![config.compiler_path.as_os_str().to_owned()];
            args.extend(compile_args(true));
            CommandLine {
                program: OsString::from(&config.emulator),
                args,
            }
        }
        CompilerStrategy::Native => CommandLine {
            program: config.compiler_path.as_os_str().to_owned(),
            args: compile_args(true),
        },
    }
}
