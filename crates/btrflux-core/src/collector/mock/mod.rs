//! In-memory host doubles for collector tests.

pub mod scenarios;

use crate::collector::traits::{CommandRunner, FileSystem};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// In-memory file system keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, String>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

/// Command runner returning canned output per exact argument vector.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    outputs: HashMap<String, String>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(
        mut self,
        program: &str,
        args: &[&str],
        stdout: impl Into<String>,
    ) -> Self {
        self.outputs.insert(Self::key(program, args), stdout.into());
        self
    }

    fn key(program: &str, args: &[&str]) -> String {
        let mut key = program.to_string();
        for arg in args {
            key.push(' ');
            key.push_str(arg);
        }
        key
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        self.outputs
            .get(&Self::key(program, args))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, Self::key(program, args))
            })
    }
}
