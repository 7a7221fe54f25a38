//! btrflux - btrfs health metrics collector.
//!
//! Discovers btrfs mounts, runs the btrfs tool per mount, and prints
//! one metric point per line to stdout in InfluxDB line protocol or
//! JSON. Logs go to stderr so the point stream stays clean.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use btrflux_core::collector::{
    BtrfsCollector, RealFs, RealRunner, TemplatePaths, TemplateSet,
};
use btrflux_core::emit::{JsonSink, LineProtocolSink, PointSink};

/// btrfs health metrics collector.
#[derive(Parser)]
#[command(name = "btrflux", about = "btrfs health metrics collector", version)]
struct Args {
    /// Template file for `btrfs device stats` output.
    #[arg(long, default_value = "./btrfs_device_stats_template.txt")]
    device_stats_template: PathBuf,

    /// Template file for `btrfs filesystem usage` output.
    #[arg(long, default_value = "./btrfs_filesystem_usage_template.txt")]
    filesystem_usage_template: PathBuf,

    /// Template file for `btrfs scrub status` output.
    #[arg(long, default_value = "./btrfs_scrub_status_template.txt")]
    scrub_status_template: PathBuf,

    /// Mounts table to scan for btrfs filesystems (for testing/mocking).
    #[arg(long, default_value = "/proc/self/mounts")]
    mounts_path: PathBuf,

    /// Output format for metric points.
    #[arg(short, long, value_enum, default_value_t = Format::Influx)]
    format: Format,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// InfluxDB line protocol, one point per line.
    Influx,
    /// One JSON object per line.
    Json,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs are written to stderr; stdout is reserved for metric points.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("btrflux={}", level).parse().unwrap())
        .add_directive(format!("btrflux_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("btrflux {} starting", env!("CARGO_PKG_VERSION"));

    let paths = TemplatePaths {
        device_stats: args.device_stats_template,
        filesystem_usage: args.filesystem_usage_template,
        scrub_status: args.scrub_status_template,
    };
    let templates = match TemplateSet::load(&paths) {
        Ok(templates) => templates,
        Err(e) => {
            error!("{}", e);
            process::exit(e.exit_code());
        }
    };

    let collector = BtrfsCollector::new(RealFs, RealRunner, templates)
        .with_mounts_path(args.mounts_path);

    let stdout = std::io::stdout().lock();
    let mut sink: Box<dyn PointSink> = match args.format {
        Format::Influx => Box::new(LineProtocolSink::new(stdout)),
        Format::Json => Box::new(JsonSink::new(stdout)),
    };

    match collector.collect(sink.as_mut()) {
        Ok(summary) => {
            info!(
                "Collected {} points from {} mounts",
                summary.points, summary.mounts
            );
        }
        Err(e) => {
            error!("{}", e);
            process::exit(e.exit_code());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }
}
