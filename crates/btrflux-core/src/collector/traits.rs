//! Abstractions over the host the collector reads from.

use std::io;
use std::path::Path;
use std::process::Command;

/// File-system access used for mount enumeration.
///
/// Production uses [`RealFs`]; tests substitute an in-memory mock so the
/// collector can be exercised without a live btrfs host.
pub trait FileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Reads from the real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Executes external commands and captures their standard output.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String>;
}

/// Runs commands on the host via `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealRunner;

impl CommandRunner for RealRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let output = Command::new(program).args(args).output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{} {} exited with {}: {}",
                program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
