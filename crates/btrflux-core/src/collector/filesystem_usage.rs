//! Collection pass for `btrfs filesystem usage --raw`.

use crate::emit::PointSink;
use crate::point::{MetricPoint, now_timestamp_ns};
use crate::record::{
    FilesystemAspectDeviceRecord, FilesystemAspectSummaryRecord, FilesystemOverallRecord,
    UsageVariant, classify_usage_row,
};
use crate::textfsm::{Row, Template, spawn_rows};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// Tokenizes one command output and emits overall, per-aspect and
/// per-device points.
///
/// Rows with no populated anchor column are discarded silently; rows
/// that classify but fail coercion are logged and skipped.
pub fn parse_filesystem_usage(
    mount: &str,
    output: &str,
    template: &Arc<Template>,
    sink: &mut dyn PointSink,
) -> io::Result<usize> {
    let timestamp_ns = now_timestamp_ns();
    let rows = spawn_rows(Arc::clone(template), output.to_string());
    let mut emitted = 0;

    for row in rows {
        let Some(variant) = classify_usage_row(&row) else {
            continue;
        };
        match assemble(variant, &row, mount, timestamp_ns) {
            Ok(point) => {
                sink.emit(point)?;
                emitted += 1;
            }
            Err(e) => warn!(mount, error = %e, "skipping filesystem usage row"),
        }
    }

    Ok(emitted)
}

fn assemble(
    variant: UsageVariant,
    row: &Row,
    mount: &str,
    timestamp_ns: i64,
) -> Result<MetricPoint, crate::coerce::CoerceError> {
    Ok(match variant {
        UsageVariant::Overall => {
            FilesystemOverallRecord::from_row(row)?.into_point(mount, timestamp_ns)
        }
        UsageVariant::AspectSummary => {
            FilesystemAspectSummaryRecord::from_row(row)?.into_point(mount, timestamp_ns)
        }
        UsageVariant::AspectDevice => {
            FilesystemAspectDeviceRecord::from_row(row)?.into_point(mount, timestamp_ns)
        }
    })
}
