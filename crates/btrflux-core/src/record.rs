//! Row classification and typed record construction.
//!
//! Each output family has a fixed column layout produced by its shipped
//! template. Rows from the filesystem-usage family encode one of three
//! variants, told apart by which anchor column is populated; the other
//! two families have a single variant each.

use crate::coerce::{
    self, CoerceError, ScrubStatus, coerce_bytes, coerce_f64, coerce_hms, coerce_i64,
    coerce_opt_i64, coerce_rate,
};
use crate::point::MetricPoint;
use crate::textfsm::Row;
use chrono::TimeZone;

pub const DEVICE_ERRORS_MEASUREMENT: &str = "btrfs_device_errors";
pub const FILESYSTEM_MEASUREMENT: &str = "btrfs_filesystem";
pub const SCRUB_MEASUREMENT: &str = "btrfs_scrub";

/// Column indices for the device-stats template.
pub mod device_col {
    pub const DEVICE: usize = 0;
    pub const WRITE_IO: usize = 1;
    pub const READ_IO: usize = 2;
    pub const FLUSH_IO: usize = 3;
    pub const CORRUPTION_IO: usize = 4;
    pub const GENERATION_IO: usize = 5;
}

/// Column indices for the filesystem-usage template.
pub mod usage_col {
    pub const SIZE: usize = 0;
    pub const ALLOCATED: usize = 1;
    pub const UNALLOCATED: usize = 2;
    pub const MISSING: usize = 3;
    pub const USED: usize = 4;
    pub const FREE_ESTIMATED: usize = 5;
    pub const FREE_ESTIMATED_MIN: usize = 6;
    pub const DATA_RATIO: usize = 7;
    pub const METADATA_RATIO: usize = 8;
    pub const GLOBAL_RESERVE: usize = 9;
    pub const GLOBAL_RESERVE_USED: usize = 10;
    pub const ASPECT: usize = 11;
    pub const TYPE: usize = 12;
    pub const ASPECT_SIZE: usize = 13;
    pub const ASPECT_USED: usize = 14;
    pub const ASPECT_USED_PERCENT: usize = 15;
    pub const ASPECT_DEVICE: usize = 16;
    pub const ASPECT_DEVICE_SIZE: usize = 17;
}

/// Column indices for the scrub-status template.
pub mod scrub_col {
    pub const DEVICE: usize = 0;
    pub const DEVICE_ID: usize = 1;
    pub const STARTED: usize = 2;
    pub const STATUS: usize = 3;
    pub const DURATION: usize = 4;
    pub const TOTAL: usize = 5;
    pub const RATE: usize = 6;
    pub const READ_ERRS: usize = 7;
    pub const SUPER_ERRS: usize = 8;
    pub const VERIFY_ERRS: usize = 9;
    pub const CSUM_ERRS: usize = 10;
    pub const CORRECTED: usize = 11;
    pub const UNCORRECTABLE: usize = 12;
    pub const UNVERIFIED: usize = 13;
}

/// The three record variants a filesystem-usage row can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageVariant {
    Overall,
    AspectSummary,
    AspectDevice,
}

/// Decides which variant a usage row encodes, by anchor column.
///
/// Anchors are checked in a fixed order so a row carrying both overall
/// totals and a leftover filldown aspect still classifies as overall.
/// Rows with no populated anchor return `None` and are discarded.
pub fn classify_usage_row(row: &Row) -> Option<UsageVariant> {
    if !row.field(usage_col::SIZE).is_empty() {
        Some(UsageVariant::Overall)
    } else if !row.field(usage_col::TYPE).is_empty() {
        Some(UsageVariant::AspectSummary)
    } else if !row.field(usage_col::ASPECT_DEVICE).is_empty() {
        Some(UsageVariant::AspectDevice)
    } else {
        None
    }
}

/// Per-device error counters from `btrfs device stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceErrorRecord {
    pub device: String,
    pub write_io_errors: i64,
    pub read_io_errors: i64,
    pub flush_io_errors: i64,
    pub corruption_io_errors: i64,
    pub generation_io_errors: i64,
}

impl DeviceErrorRecord {
    pub fn from_row(row: &Row) -> Result<Self, CoerceError> {
        Ok(Self {
            device: row.field(device_col::DEVICE).to_string(),
            write_io_errors: coerce_i64("write_io_errors", row.field(device_col::WRITE_IO))?,
            read_io_errors: coerce_i64("read_io_errors", row.field(device_col::READ_IO))?,
            flush_io_errors: coerce_i64("flush_io_errors", row.field(device_col::FLUSH_IO))?,
            corruption_io_errors: coerce_i64(
                "corruption_io_errors",
                row.field(device_col::CORRUPTION_IO),
            )?,
            generation_io_errors: coerce_i64(
                "generation_io_errors",
                row.field(device_col::GENERATION_IO),
            )?,
        })
    }

    pub fn into_point(self, mount: &str, timestamp_ns: i64) -> MetricPoint {
        MetricPoint::new(DEVICE_ERRORS_MEASUREMENT, timestamp_ns)
            .tag("mount", mount)
            .tag("device", &self.device)
            .field("write_io_errors", self.write_io_errors)
            .field("read_io_errors", self.read_io_errors)
            .field("flush_io_errors", self.flush_io_errors)
            .field("corruption_io_errors", self.corruption_io_errors)
            .field("generation_io_errors", self.generation_io_errors)
    }
}

/// Whole-filesystem totals from the header of `btrfs filesystem usage`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilesystemOverallRecord {
    pub size: i64,
    pub allocated: i64,
    pub unallocated: i64,
    pub missing: i64,
    pub used: i64,
    pub free_estimated: i64,
    pub free_estimated_min: i64,
    pub data_ratio: f64,
    pub metadata_ratio: f64,
    pub global_reserve: i64,
    pub global_reserve_used: i64,
}

impl FilesystemOverallRecord {
    pub fn from_row(row: &Row) -> Result<Self, CoerceError> {
        Ok(Self {
            size: coerce_i64("filesystem_size", row.field(usage_col::SIZE))?,
            allocated: coerce_i64("filesystem_allocated", row.field(usage_col::ALLOCATED))?,
            unallocated: coerce_i64("filesystem_unallocated", row.field(usage_col::UNALLOCATED))?,
            missing: coerce_i64("filesystem_missing", row.field(usage_col::MISSING))?,
            used: coerce_i64("filesystem_used", row.field(usage_col::USED))?,
            free_estimated: coerce_i64(
                "filesystem_free_estimated",
                row.field(usage_col::FREE_ESTIMATED),
            )?,
            free_estimated_min: coerce_i64(
                "filesystem_free_estimated_min",
                row.field(usage_col::FREE_ESTIMATED_MIN),
            )?,
            data_ratio: coerce_f64("filesystem_data_ratio", row.field(usage_col::DATA_RATIO))?,
            metadata_ratio: coerce_f64(
                "filesystem_metadata_ratio",
                row.field(usage_col::METADATA_RATIO),
            )?,
            global_reserve: coerce_i64(
                "filesystem_global_reserve",
                row.field(usage_col::GLOBAL_RESERVE),
            )?,
            global_reserve_used: coerce_i64(
                "filesystem_global_reserve_used",
                row.field(usage_col::GLOBAL_RESERVE_USED),
            )?,
        })
    }

    pub fn into_point(self, mount: &str, timestamp_ns: i64) -> MetricPoint {
        MetricPoint::new(FILESYSTEM_MEASUREMENT, timestamp_ns)
            .tag("mount", mount)
            .tag("aspect", "Overall")
            .field("filesystem_size", self.size)
            .field("filesystem_allocated", self.allocated)
            .field("filesystem_unallocated", self.unallocated)
            .field("filesystem_missing", self.missing)
            .field("filesystem_used", self.used)
            .field("filesystem_free_estimated", self.free_estimated)
            .field("filesystem_free_estimated_min", self.free_estimated_min)
            .field("filesystem_data_ratio", self.data_ratio)
            .field("filesystem_metadata_ratio", self.metadata_ratio)
            .field("filesystem_global_reserve", self.global_reserve)
            .field("filesystem_global_reserve_used", self.global_reserve_used)
    }
}

/// Per-aspect (Data/Metadata/System) summary line.
#[derive(Debug, Clone, PartialEq)]
pub struct FilesystemAspectSummaryRecord {
    pub aspect: String,
    pub profile: String,
    pub size: i64,
    pub used: i64,
    pub used_percent: f64,
}

impl FilesystemAspectSummaryRecord {
    pub fn from_row(row: &Row) -> Result<Self, CoerceError> {
        Ok(Self {
            aspect: row.field(usage_col::ASPECT).to_string(),
            profile: row.field(usage_col::TYPE).to_string(),
            size: coerce_i64("filesystem_size", row.field(usage_col::ASPECT_SIZE))?,
            used: coerce_i64("filesystem_used", row.field(usage_col::ASPECT_USED))?,
            used_percent: coerce_f64(
                "filesystem_used_percent",
                row.field(usage_col::ASPECT_USED_PERCENT),
            )?,
        })
    }

    pub fn into_point(self, mount: &str, timestamp_ns: i64) -> MetricPoint {
        MetricPoint::new(FILESYSTEM_MEASUREMENT, timestamp_ns)
            .tag("mount", mount)
            .tag("aspect", &self.aspect)
            .tag("type", &self.profile)
            .field("filesystem_size", self.size)
            .field("filesystem_used", self.used)
            .field("filesystem_used_percent", self.used_percent)
    }
}

/// Per-device allocation line within an aspect section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemAspectDeviceRecord {
    pub aspect: String,
    pub device: String,
    pub device_size: i64,
}

impl FilesystemAspectDeviceRecord {
    pub fn from_row(row: &Row) -> Result<Self, CoerceError> {
        Ok(Self {
            aspect: row.field(usage_col::ASPECT).to_string(),
            device: row.field(usage_col::ASPECT_DEVICE).to_string(),
            device_size: coerce_i64("device_size", row.field(usage_col::ASPECT_DEVICE_SIZE))?,
        })
    }

    pub fn into_point(self, mount: &str, timestamp_ns: i64) -> MetricPoint {
        MetricPoint::new(FILESYSTEM_MEASUREMENT, timestamp_ns)
            .tag("mount", mount)
            .tag("aspect", &self.aspect)
            .tag("device", &self.device)
            .field("device_size", self.device_size)
    }
}

/// Per-device scrub state from `btrfs scrub status -d`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubStatusRecord {
    pub device: String,
    pub device_id: String,
    pub start: i64,
    pub status: ScrubStatus,
    pub duration_secs: i64,
    pub total_bytes: i64,
    pub rate_bytes_per_sec: i64,
    pub read_errors: i64,
    pub super_errors: i64,
    pub verify_errors: i64,
    pub checksum_errors: i64,
    pub corrected_errors: i64,
    pub uncorrectable_errors: i64,
    pub unverified_errors: i64,
}

impl ScrubStatusRecord {
    pub fn from_row(row: &Row) -> Result<Self, CoerceError> {
        Self::from_row_in(row, &chrono::Local)
    }

    /// Timezone-injectable variant of [`ScrubStatusRecord::from_row`].
    ///
    /// The error-counter block is optional as a whole: when every counter
    /// column is empty the block is absent and all seven coerce to zero.
    /// Once any counter is present, the four summary counters stay
    /// independently optional while corrected/uncorrectable/unverified
    /// become mandatory.
    pub fn from_row_in<Tz: TimeZone>(row: &Row, tz: &Tz) -> Result<Self, CoerceError> {
        let counters = scrub_col::READ_ERRS..=scrub_col::UNVERIFIED;
        let block_present = counters.into_iter().any(|col| !row.field(col).is_empty());

        let (
            read_errors,
            super_errors,
            verify_errors,
            checksum_errors,
            corrected_errors,
            uncorrectable_errors,
            unverified_errors,
        ) = if block_present {
            (
                coerce_opt_i64("read_errors", row.field(scrub_col::READ_ERRS))?,
                coerce_opt_i64("super_errors", row.field(scrub_col::SUPER_ERRS))?,
                coerce_opt_i64("verify_errors", row.field(scrub_col::VERIFY_ERRS))?,
                coerce_opt_i64("checksum_errors", row.field(scrub_col::CSUM_ERRS))?,
                coerce_i64("corrected_errors", row.field(scrub_col::CORRECTED))?,
                coerce_i64("uncorrectable_errors", row.field(scrub_col::UNCORRECTABLE))?,
                coerce_i64("unverified_errors", row.field(scrub_col::UNVERIFIED))?,
            )
        } else {
            (0, 0, 0, 0, 0, 0, 0)
        };

        Ok(Self {
            device: row.field(scrub_col::DEVICE).to_string(),
            device_id: row.field(scrub_col::DEVICE_ID).to_string(),
            start: coerce::coerce_scrub_time_in("start", row.field(scrub_col::STARTED), tz)?,
            status: ScrubStatus::from_word(row.field(scrub_col::STATUS)),
            duration_secs: coerce_hms("duration", row.field(scrub_col::DURATION))?,
            total_bytes: coerce_bytes("total", row.field(scrub_col::TOTAL))?,
            rate_bytes_per_sec: coerce_rate("rate", row.field(scrub_col::RATE))?,
            read_errors,
            super_errors,
            verify_errors,
            checksum_errors,
            corrected_errors,
            uncorrectable_errors,
            unverified_errors,
        })
    }

    pub fn into_point(self, mount: &str, timestamp_ns: i64) -> MetricPoint {
        MetricPoint::new(SCRUB_MEASUREMENT, timestamp_ns)
            .tag("mount", mount)
            .tag("device", &self.device)
            .tag("device_id", &self.device_id)
            .field("start", self.start)
            .field("status", self.status.code())
            .field("duration", self.duration_secs)
            .field("total", self.total_bytes)
            .field("rate", self.rate_bytes_per_sec)
            .field("read_errors", self.read_errors)
            .field("super_errors", self.super_errors)
            .field("verify_errors", self.verify_errors)
            .field("checksum_errors", self.checksum_errors)
            .field("corrected_errors", self.corrected_errors)
            .field("uncorrectable_errors", self.uncorrectable_errors)
            .field("unverified_errors", self.unverified_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::FieldValue;
    use chrono::Utc;

    fn usage_row(populated: &[(usize, &str)]) -> Row {
        let mut fields = vec![String::new(); 18];
        for (idx, value) in populated {
            fields[*idx] = value.to_string();
        }
        Row::new(fields)
    }

    #[test]
    fn test_classify_overall_wins_over_stale_filldown() {
        let row = usage_row(&[(usage_col::SIZE, "1000"), (usage_col::ASPECT, "Data")]);
        assert_eq!(classify_usage_row(&row), Some(UsageVariant::Overall));
    }

    #[test]
    fn test_classify_aspect_summary() {
        let row = usage_row(&[
            (usage_col::ASPECT, "Data"),
            (usage_col::TYPE, "single"),
            (usage_col::ASPECT_SIZE, "8"),
        ]);
        assert_eq!(classify_usage_row(&row), Some(UsageVariant::AspectSummary));
    }

    #[test]
    fn test_classify_aspect_device() {
        let row = usage_row(&[
            (usage_col::ASPECT, "Data"),
            (usage_col::ASPECT_DEVICE, "/dev/sda"),
            (usage_col::ASPECT_DEVICE_SIZE, "8"),
        ]);
        assert_eq!(classify_usage_row(&row), Some(UsageVariant::AspectDevice));
    }

    #[test]
    fn test_classify_no_anchor_is_discarded() {
        let row = usage_row(&[(usage_col::ASPECT, "Data")]);
        assert_eq!(classify_usage_row(&row), None);
    }

    #[test]
    fn test_device_error_record_end_to_end() {
        let row = Row::from(vec!["sda", "0", "0", "0", "0", "0"]);
        let record = DeviceErrorRecord::from_row(&row).unwrap();
        let point = record.into_point("/data", 77);
        assert_eq!(point.measurement, DEVICE_ERRORS_MEASUREMENT);
        assert_eq!(point.tags["mount"], "/data");
        assert_eq!(point.tags["device"], "sda");
        for name in [
            "write_io_errors",
            "read_io_errors",
            "flush_io_errors",
            "corruption_io_errors",
            "generation_io_errors",
        ] {
            assert_eq!(point.fields[name], FieldValue::Integer(0));
        }
        assert_eq!(point.timestamp_ns, 77);
    }

    #[test]
    fn test_device_error_record_rejects_bad_counter() {
        let row = Row::from(vec!["sda", "0", "x", "0", "0", "0"]);
        let err = DeviceErrorRecord::from_row(&row).unwrap_err();
        assert_eq!(err.field, "read_io_errors");
    }

    #[test]
    fn test_overall_record() {
        let row = usage_row(&[
            (usage_col::SIZE, "10737418240"),
            (usage_col::ALLOCATED, "2155872256"),
            (usage_col::UNALLOCATED, "8581545984"),
            (usage_col::MISSING, "0"),
            (usage_col::USED, "196608"),
            (usage_col::FREE_ESTIMATED, "8589934592"),
            (usage_col::FREE_ESTIMATED_MIN, "8589934592"),
            (usage_col::DATA_RATIO, "1.00"),
            (usage_col::METADATA_RATIO, "2.00"),
            (usage_col::GLOBAL_RESERVE, "3407872"),
            (usage_col::GLOBAL_RESERVE_USED, "0"),
        ]);
        let point = FilesystemOverallRecord::from_row(&row)
            .unwrap()
            .into_point("/data", 1);
        assert_eq!(point.tags["aspect"], "Overall");
        assert_eq!(
            point.fields["filesystem_size"],
            FieldValue::Integer(10_737_418_240)
        );
        assert_eq!(
            point.fields["filesystem_metadata_ratio"],
            FieldValue::Float(2.0)
        );
        assert_eq!(point.fields.len(), 11);
    }

    #[test]
    fn test_aspect_summary_record() {
        let row = usage_row(&[
            (usage_col::ASPECT, "Metadata"),
            (usage_col::TYPE, "DUP"),
            (usage_col::ASPECT_SIZE, "1073741824"),
            (usage_col::ASPECT_USED, "114688"),
            (usage_col::ASPECT_USED_PERCENT, "0.01"),
        ]);
        let point = FilesystemAspectSummaryRecord::from_row(&row)
            .unwrap()
            .into_point("/data", 1);
        assert_eq!(point.tags["aspect"], "Metadata");
        assert_eq!(point.tags["type"], "DUP");
        assert_eq!(
            point.fields["filesystem_used_percent"],
            FieldValue::Float(0.01)
        );
    }

    #[test]
    fn test_aspect_device_record() {
        let row = usage_row(&[
            (usage_col::ASPECT, "Data"),
            (usage_col::ASPECT_DEVICE, "/dev/sda"),
            (usage_col::ASPECT_DEVICE_SIZE, "8589934592"),
        ]);
        let point = FilesystemAspectDeviceRecord::from_row(&row)
            .unwrap()
            .into_point("/data", 1);
        assert_eq!(point.tags["device"], "/dev/sda");
        assert_eq!(
            point.fields["device_size"],
            FieldValue::Integer(8_589_934_592)
        );
    }

    fn scrub_row(counters: [&str; 7]) -> Row {
        let mut fields = vec![
            "/dev/sda".to_string(),
            "1".to_string(),
            "Mon Jan  2 15:04:05 2006".to_string(),
            "finished".to_string(),
            "0:05:00".to_string(),
            "2.21MiB".to_string(),
            "452.38KiB/s".to_string(),
        ];
        fields.extend(counters.iter().map(|s| s.to_string()));
        Row::new(fields)
    }

    #[test]
    fn test_scrub_record_full_counter_block() {
        let row = scrub_row(["1", "2", "3", "5", "5", "0", "0"]);
        let record = ScrubStatusRecord::from_row_in(&row, &Utc).unwrap();
        assert_eq!(record.start, 1_136_214_245);
        assert_eq!(record.status, ScrubStatus::Finished);
        assert_eq!(record.duration_secs, 300);
        assert_eq!(record.total_bytes, 2_317_353);
        assert_eq!(record.rate_bytes_per_sec, 463_237);
        assert_eq!(record.read_errors, 1);
        assert_eq!(record.checksum_errors, 5);
        assert_eq!(record.corrected_errors, 5);
    }

    #[test]
    fn test_scrub_record_absent_counter_block_is_zero_cluster() {
        let row = scrub_row(["", "", "", "", "", "", ""]);
        let record = ScrubStatusRecord::from_row_in(&row, &Utc).unwrap();
        assert_eq!(record.read_errors, 0);
        assert_eq!(record.checksum_errors, 0);
        assert_eq!(record.corrected_errors, 0);
        assert_eq!(record.uncorrectable_errors, 0);
        assert_eq!(record.unverified_errors, 0);
    }

    #[test]
    fn test_scrub_record_partial_block_optional_counters_default() {
        // Summary counters may be independently absent within a present block.
        let row = scrub_row(["", "", "", "5", "5", "0", "0"]);
        let record = ScrubStatusRecord::from_row_in(&row, &Utc).unwrap();
        assert_eq!(record.read_errors, 0);
        assert_eq!(record.super_errors, 0);
        assert_eq!(record.verify_errors, 0);
        assert_eq!(record.checksum_errors, 5);
    }

    #[test]
    fn test_scrub_record_mandatory_counters_fail_when_block_present() {
        let row = scrub_row(["", "", "", "5", "", "0", "0"]);
        let err = ScrubStatusRecord::from_row_in(&row, &Utc).unwrap_err();
        assert_eq!(err.field, "corrected_errors");
    }

    #[test]
    fn test_scrub_record_point_fields() {
        let row = scrub_row(["0", "0", "0", "0", "0", "0", "0"]);
        let point = ScrubStatusRecord::from_row_in(&row, &Utc)
            .unwrap()
            .into_point("/data", 9);
        assert_eq!(point.measurement, SCRUB_MEASUREMENT);
        assert_eq!(point.tags["device_id"], "1");
        assert_eq!(point.fields["status"], FieldValue::Integer(1));
        assert_eq!(point.fields["start"], FieldValue::Integer(1_136_214_245));
        assert_eq!(point.fields.len(), 12);
    }

    #[test]
    fn test_scrub_record_unknown_status_sentinel() {
        let mut row = scrub_row(["0", "0", "0", "0", "0", "0", "0"]);
        row = {
            let mut fields: Vec<String> =
                (0..row.len()).map(|i| row.field(i).to_string()).collect();
            fields[scrub_col::STATUS] = "paused".to_string();
            Row::new(fields)
        };
        let record = ScrubStatusRecord::from_row_in(&row, &Utc).unwrap();
        assert_eq!(record.status.code(), -1);
    }
}
