//! Host-level collection orchestration.
//!
//! Discovers btrfs mounts, invokes the `btrfs` tool once per output
//! family per mount, and funnels each output through its template
//! pipeline into the configured sink. Host access goes through the
//! [`FileSystem`] and [`CommandRunner`] traits so the whole pass is
//! testable against canned data.

pub mod device_stats;
pub mod filesystem_usage;
pub mod mock;
pub mod mounts;
pub mod scrub_status;
pub mod traits;

use crate::emit::PointSink;
use crate::textfsm::{Template, TemplateError};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub use traits::{CommandRunner, FileSystem, RealFs, RealRunner};

pub const BTRFS_PROGRAM: &str = "btrfs";
pub const DEFAULT_MOUNTS_PATH: &str = "/proc/self/mounts";

/// The three `btrfs` output families collected per mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    DeviceStats,
    FilesystemUsage,
    ScrubStatus,
}

impl Family {
    pub const ALL: [Family; 3] = [
        Family::DeviceStats,
        Family::FilesystemUsage,
        Family::ScrubStatus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::DeviceStats => "device stats",
            Self::FilesystemUsage => "filesystem usage",
            Self::ScrubStatus => "scrub status",
        }
    }

    pub fn command_args(self, mount: &str) -> Vec<&str> {
        match self {
            Self::DeviceStats => vec!["device", "stats", mount],
            Self::FilesystemUsage => vec!["filesystem", "usage", "--raw", mount],
            Self::ScrubStatus => vec!["scrub", "status", "-d", mount],
        }
    }

    /// Exit code for a failed command execution in this family.
    pub fn exec_exit_code(self) -> i32 {
        match self {
            Self::DeviceStats => 2,
            Self::FilesystemUsage => 4,
            Self::ScrubStatus => 6,
        }
    }

    /// Exit code for a failed parse or emit stage in this family.
    pub fn parse_exit_code(self) -> i32 {
        match self {
            Self::DeviceStats => 3,
            Self::FilesystemUsage => 5,
            Self::ScrubStatus => 7,
        }
    }
}

/// Fatal failure of one collection stage.
#[derive(Debug)]
pub enum CollectError {
    Mounts(io::Error),
    Template {
        family: Family,
        source: TemplateError,
    },
    Exec {
        family: Family,
        mount: String,
        source: io::Error,
    },
    Emit {
        family: Family,
        mount: String,
        source: io::Error,
    },
}

impl CollectError {
    /// Process exit code for this failure, one distinct small integer
    /// per failing stage.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Mounts(_) => 1,
            Self::Template { family, .. } => family.parse_exit_code(),
            Self::Exec { family, .. } => family.exec_exit_code(),
            Self::Emit { family, .. } => family.parse_exit_code(),
        }
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mounts(e) => write!(f, "failed to enumerate btrfs mounts: {}", e),
            Self::Template { family, source } => {
                write!(f, "failed to load {} template: {}", family.name(), source)
            }
            Self::Exec {
                family,
                mount,
                source,
            } => write!(
                f,
                "failed to run {} for {}: {}",
                family.name(),
                mount,
                source
            ),
            Self::Emit {
                family,
                mount,
                source,
            } => write!(
                f,
                "failed to emit {} points for {}: {}",
                family.name(),
                mount,
                source
            ),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Mounts(e) => Some(e),
            Self::Template { source, .. } => Some(source),
            Self::Exec { source, .. } => Some(source),
            Self::Emit { source, .. } => Some(source),
        }
    }
}

/// Template file locations, one per output family.
#[derive(Debug, Clone)]
pub struct TemplatePaths {
    pub device_stats: PathBuf,
    pub filesystem_usage: PathBuf,
    pub scrub_status: PathBuf,
}

impl Default for TemplatePaths {
    fn default() -> Self {
        Self {
            device_stats: PathBuf::from("./btrfs_device_stats_template.txt"),
            filesystem_usage: PathBuf::from("./btrfs_filesystem_usage_template.txt"),
            scrub_status: PathBuf::from("./btrfs_scrub_status_template.txt"),
        }
    }
}

/// The three compiled templates, shared with tokenizer threads.
pub struct TemplateSet {
    pub device_stats: Arc<Template>,
    pub filesystem_usage: Arc<Template>,
    pub scrub_status: Arc<Template>,
}

impl TemplateSet {
    pub fn load(paths: &TemplatePaths) -> Result<Self, CollectError> {
        let load_one = |family: Family, path: &Path| {
            Template::load(path)
                .map(Arc::new)
                .map_err(|source| CollectError::Template { family, source })
        };
        Ok(Self {
            device_stats: load_one(Family::DeviceStats, &paths.device_stats)?,
            filesystem_usage: load_one(Family::FilesystemUsage, &paths.filesystem_usage)?,
            scrub_status: load_one(Family::ScrubStatus, &paths.scrub_status)?,
        })
    }
}

/// Outcome of one full collection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectSummary {
    pub mounts: usize,
    pub points: usize,
}

/// Runs the full collection pass over every discovered btrfs mount.
pub struct BtrfsCollector<F: FileSystem, R: CommandRunner> {
    fs: F,
    runner: R,
    templates: TemplateSet,
    mounts_path: PathBuf,
}

impl<F: FileSystem, R: CommandRunner> BtrfsCollector<F, R> {
    pub fn new(fs: F, runner: R, templates: TemplateSet) -> Self {
        Self {
            fs,
            runner,
            templates,
            mounts_path: PathBuf::from(DEFAULT_MOUNTS_PATH),
        }
    }

    pub fn with_mounts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mounts_path = path.into();
        self
    }

    /// Reads the mounts table and returns deduplicated btrfs mount points.
    pub fn discover_mounts(&self) -> Result<Vec<String>, CollectError> {
        let content = self
            .fs
            .read_to_string(&self.mounts_path)
            .map_err(CollectError::Mounts)?;
        Ok(mounts::parse_btrfs_mounts(&content))
    }

    /// Collects all three output families for every btrfs mount,
    /// emitting points into `sink` as they are assembled.
    pub fn collect(&self, sink: &mut dyn PointSink) -> Result<CollectSummary, CollectError> {
        let mounts = self.discover_mounts()?;
        let mut points = 0;

        for mount in &mounts {
            debug!(mount, "collecting btrfs metrics");
            for family in Family::ALL {
                points += self.collect_family(family, mount, sink)?;
            }
        }

        info!(mounts = mounts.len(), points, "collection pass complete");
        Ok(CollectSummary {
            mounts: mounts.len(),
            points,
        })
    }

    fn collect_family(
        &self,
        family: Family,
        mount: &str,
        sink: &mut dyn PointSink,
    ) -> Result<usize, CollectError> {
        let args = family.command_args(mount);
        let output =
            self.runner
                .run(BTRFS_PROGRAM, &args)
                .map_err(|source| CollectError::Exec {
                    family,
                    mount: mount.to_string(),
                    source,
                })?;

        let result = match family {
            Family::DeviceStats => device_stats::parse_device_stats(
                mount,
                &output,
                &self.templates.device_stats,
                sink,
            ),
            Family::FilesystemUsage => filesystem_usage::parse_filesystem_usage(
                mount,
                &output,
                &self.templates.filesystem_usage,
                sink,
            ),
            Family::ScrubStatus => scrub_status::parse_scrub_status(
                mount,
                &output,
                &self.templates.scrub_status,
                sink,
            ),
        };
        result.map_err(|source| CollectError::Emit {
            family,
            mount: mount.to_string(),
            source,
        })
    }
}
