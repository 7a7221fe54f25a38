//! Collection pass for `btrfs scrub status -d`.

use crate::emit::PointSink;
use crate::point::now_timestamp_ns;
use crate::record::{ScrubStatusRecord, scrub_col};
use crate::textfsm::{Template, spawn_rows};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// Tokenizes one command output and emits one point per scrubbed device.
///
/// All points from one invocation share a single timestamp. A row whose
/// device anchor is empty terminates consumption; a row that fails
/// coercion is logged and skipped.
pub fn parse_scrub_status(
    mount: &str,
    output: &str,
    template: &Arc<Template>,
    sink: &mut dyn PointSink,
) -> io::Result<usize> {
    let timestamp_ns = now_timestamp_ns();
    let rows = spawn_rows(Arc::clone(template), output.to_string());
    let mut emitted = 0;

    for row in rows {
        if row.field(scrub_col::DEVICE).is_empty() {
            break;
        }
        match ScrubStatusRecord::from_row(&row) {
            Ok(record) => {
                sink.emit(record.into_point(mount, timestamp_ns))?;
                emitted += 1;
            }
            Err(e) => warn!(mount, error = %e, "skipping scrub status row"),
        }
    }

    Ok(emitted)
}
