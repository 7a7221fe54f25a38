//! Collection pass for `btrfs device stats`.

use crate::emit::PointSink;
use crate::point::now_timestamp_ns;
use crate::record::{DeviceErrorRecord, device_col};
use crate::textfsm::{Template, spawn_rows};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// Tokenizes one command output and emits one point per device.
///
/// All points from one invocation share a single timestamp. A row whose
/// device anchor is empty terminates consumption; a row that fails
/// coercion is logged and skipped.
pub fn parse_device_stats(
    mount: &str,
    output: &str,
    template: &Arc<Template>,
    sink: &mut dyn PointSink,
) -> io::Result<usize> {
    let timestamp_ns = now_timestamp_ns();
    let rows = spawn_rows(Arc::clone(template), output.to_string());
    let mut emitted = 0;

    for row in rows {
        if row.field(device_col::DEVICE).is_empty() {
            break;
        }
        match DeviceErrorRecord::from_row(&row) {
            Ok(record) => {
                sink.emit(record.into_point(mount, timestamp_ns))?;
                emitted += 1;
            }
            Err(e) => warn!(mount, error = %e, "skipping device stats row"),
        }
    }

    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::VecSink;
    use crate::point::FieldValue;

    const TEMPLATE: &str = include_str!("../../../../btrfs_device_stats_template.txt");

    const OUTPUT: &str = "\
[/dev/sda].write_io_errs    0
[/dev/sda].read_io_errs     0
[/dev/sda].flush_io_errs    0
[/dev/sda].corruption_errs  0
[/dev/sda].generation_errs  0
[/dev/sdb].write_io_errs    2
[/dev/sdb].read_io_errs     1
[/dev/sdb].flush_io_errs    0
[/dev/sdb].corruption_errs  3
[/dev/sdb].generation_errs  0
";

    #[test]
    fn test_parse_device_stats_output() {
        let template = Arc::new(Template::parse(TEMPLATE).unwrap());
        let mut sink = VecSink::new();
        let emitted = parse_device_stats("/data", OUTPUT, &template, &mut sink).unwrap();

        assert_eq!(emitted, 2);
        let first = &sink.points[0];
        assert_eq!(first.measurement, "btrfs_device_errors");
        assert_eq!(first.tags["mount"], "/data");
        assert_eq!(first.tags["device"], "/dev/sda");
        assert_eq!(first.fields["write_io_errors"], FieldValue::Integer(0));

        let second = &sink.points[1];
        assert_eq!(second.tags["device"], "/dev/sdb");
        assert_eq!(second.fields["write_io_errors"], FieldValue::Integer(2));
        assert_eq!(second.fields["read_io_errors"], FieldValue::Integer(1));
        assert_eq!(second.fields["corruption_io_errors"], FieldValue::Integer(3));

        // Points from one invocation share one timestamp.
        assert_eq!(first.timestamp_ns, second.timestamp_ns);
    }

    #[test]
    fn test_empty_output_emits_nothing() {
        let template = Arc::new(Template::parse(TEMPLATE).unwrap());
        let mut sink = VecSink::new();
        let emitted = parse_device_stats("/data", "", &template, &mut sink).unwrap();
        assert_eq!(emitted, 0);
        assert!(sink.points.is_empty());
    }

    #[test]
    fn test_bad_counter_row_is_skipped() {
        let template = Arc::new(Template::parse(TEMPLATE).unwrap());
        let output = OUTPUT.replace("[/dev/sda].write_io_errs    0", "");
        let mut sink = VecSink::new();
        // sda now lacks the line that carries its device name, so its
        // record is suppressed and only sdb survives.
        let emitted = parse_device_stats("/data", &output, &template, &mut sink).unwrap();
        assert_eq!(emitted, 1);
        assert_eq!(sink.points[0].tags["device"], "/dev/sdb");
    }
}
