//! Field coercion from tokenized text to typed metric values.
//!
//! Command output mixes plain integers, human byte sizes ("1.50GiB"),
//! transfer rates ("452.38KiB/s"), `HH:MM:SS` durations, status words
//! and wall-clock timestamps. Each coercer returns a [`CoerceError`]
//! naming the offending field and value so the caller can log and skip
//! the row instead of aborting the whole collection pass.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Failure to coerce one row field into its typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoerceError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl CoerceError {
    pub(crate) fn new(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for CoerceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "field '{}': cannot coerce '{}': {}",
            self.field, self.value, self.reason
        )
    }
}

impl std::error::Error for CoerceError {}

/// Parses a decimal integer field.
pub fn coerce_i64(field: &'static str, value: &str) -> Result<i64, CoerceError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| CoerceError::new(field, value, e.to_string()))
}

/// Parses a decimal integer field, treating an empty string as zero.
///
/// Used for counters that older tool versions omit entirely.
pub fn coerce_opt_i64(field: &'static str, value: &str) -> Result<i64, CoerceError> {
    if value.trim().is_empty() {
        Ok(0)
    } else {
        coerce_i64(field, value)
    }
}

/// Parses a decimal float field.
pub fn coerce_f64(field: &'static str, value: &str) -> Result<f64, CoerceError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| CoerceError::new(field, value, e.to_string()))
}

/// Parses a human-readable byte size like `512KiB`, `1GiB` or `10.5KiB`
/// into a byte count. Fractional sizes are rounded to the nearest byte.
///
/// Accepted unit forms are `K`/`KiB`/`KB` and likewise for M, G, T and P,
/// all interpreted as powers of 1024. A bare number is taken as bytes.
pub fn coerce_bytes(field: &'static str, value: &str) -> Result<i64, CoerceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoerceError::new(field, value, "empty byte size"));
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let magnitude: f64 = number
        .parse()
        .map_err(|_| CoerceError::new(field, value, "invalid numeric prefix"))?;

    let exponent = match unit.trim() {
        "" | "B" => 0u32,
        "K" | "KB" | "KiB" => 1,
        "M" | "MB" | "MiB" => 2,
        "G" | "GB" | "GiB" => 3,
        "T" | "TB" | "TiB" => 4,
        "P" | "PB" | "PiB" => 5,
        other => {
            return Err(CoerceError::new(
                field,
                value,
                format!("unknown byte unit '{}'", other),
            ));
        }
    };

    Ok((magnitude * 1024f64.powi(exponent as i32)).round() as i64)
}

/// Parses a transfer rate like `452.38KiB/s` into bytes per second.
pub fn coerce_rate(field: &'static str, value: &str) -> Result<i64, CoerceError> {
    let stripped = value.trim().strip_suffix("/s").unwrap_or(value.trim());
    coerce_bytes(field, stripped)
}

/// Parses an `H:MM:SS` duration into whole seconds.
///
/// Hours are unbounded; minutes and seconds are taken at face value
/// without range checks, matching the tool's own formatting.
pub fn coerce_hms(field: &'static str, value: &str) -> Result<i64, CoerceError> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(CoerceError::new(field, value, "expected H:MM:SS"));
    }
    let mut total = 0i64;
    for part in &parts {
        let n: i64 = part
            .parse()
            .map_err(|_| CoerceError::new(field, value, "non-numeric duration component"))?;
        total = total * 60 + n;
    }
    Ok(total)
}

/// Formats whole seconds back into `HH:MM:SS`.
pub fn format_hms(seconds: i64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Parses a scrub start time like `Mon Jan  2 15:04:05 2006` into an
/// epoch timestamp, interpreting the wall-clock time as local time.
pub fn coerce_scrub_time(field: &'static str, value: &str) -> Result<i64, CoerceError> {
    coerce_scrub_time_in(field, value, &Local)
}

/// Timezone-injectable variant of [`coerce_scrub_time`].
///
/// The leading weekday token is validated for shape but not consulted;
/// scrub output from long-running systems can carry a weekday that
/// disagrees with the date after clock changes, and the kernel side
/// never checks it either.
pub fn coerce_scrub_time_in<Tz: TimeZone>(
    field: &'static str,
    value: &str,
    tz: &Tz,
) -> Result<i64, CoerceError> {
    let trimmed = value.trim();
    let rest = match trimmed.split_once(' ') {
        Some((weekday, rest)) if weekday.len() == 3 && weekday.chars().all(|c| c.is_ascii_alphabetic()) => rest,
        _ => return Err(CoerceError::new(field, value, "missing weekday prefix")),
    };
    let naive = NaiveDateTime::parse_from_str(rest.trim(), "%b %e %H:%M:%S %Y")
        .map_err(|e| CoerceError::new(field, value, e.to_string()))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| CoerceError::new(field, value, "nonexistent local time"))
}

/// Formats an epoch timestamp in the scrub wall-clock layout, in the
/// given timezone.
pub fn format_scrub_time_in<Tz: TimeZone>(epoch: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let dt: DateTime<Tz> = tz
        .timestamp_opt(epoch, 0)
        .single()
        .unwrap_or_else(|| tz.timestamp_opt(0, 0).unwrap());
    dt.format("%a %b %-d %H:%M:%S %Y").to_string()
}

/// Scrub status word mapped to a stable numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubStatus {
    Running,
    Finished,
    Aborted,
    Interrupted,
    Unknown,
}

impl ScrubStatus {
    /// Maps a status word from scrub output. Unrecognized words map to
    /// [`ScrubStatus::Unknown`] rather than failing the row.
    pub fn from_word(word: &str) -> Self {
        match word.trim() {
            "running" => Self::Running,
            "finished" => Self::Finished,
            "aborted" => Self::Aborted,
            "interrupted" => Self::Interrupted,
            _ => Self::Unknown,
        }
    }

    /// Numeric code emitted as the `status` field. Unknown is a negative
    /// sentinel so it cannot be confused with a live scrub.
    pub fn code(self) -> i64 {
        match self {
            Self::Running => 0,
            Self::Finished => 1,
            Self::Aborted => 2,
            Self::Interrupted => 3,
            Self::Unknown => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_coerce_i64() {
        assert_eq!(coerce_i64("n", "42").unwrap(), 42);
        assert_eq!(coerce_i64("n", " 7 ").unwrap(), 7);
        assert!(coerce_i64("n", "").is_err());
        assert!(coerce_i64("n", "4x").is_err());
    }

    #[test]
    fn test_coerce_opt_i64_empty_is_zero() {
        assert_eq!(coerce_opt_i64("n", "").unwrap(), 0);
        assert_eq!(coerce_opt_i64("n", "5").unwrap(), 5);
        assert!(coerce_opt_i64("n", "bad").is_err());
    }

    #[test]
    fn test_coerce_bytes_units() {
        assert_eq!(coerce_bytes("b", "0").unwrap(), 0);
        assert_eq!(coerce_bytes("b", "512").unwrap(), 512);
        assert_eq!(coerce_bytes("b", "512B").unwrap(), 512);
        assert_eq!(coerce_bytes("b", "1KiB").unwrap(), 1024);
        assert_eq!(coerce_bytes("b", "1GiB").unwrap(), 1_073_741_824);
        assert_eq!(coerce_bytes("b", "2TiB").unwrap(), 2_199_023_255_552);
        assert_eq!(coerce_bytes("b", "1PiB").unwrap(), 1_125_899_906_842_624);
    }

    #[test]
    fn test_coerce_bytes_fractional() {
        assert_eq!(coerce_bytes("b", "10.5KiB").unwrap(), 10_752);
        assert_eq!(coerce_bytes("b", "2.21MiB").unwrap(), 2_317_353);
        assert_eq!(coerce_bytes("b", "452.38KiB").unwrap(), 463_237);
    }

    #[test]
    fn test_coerce_bytes_rejects_garbage() {
        assert!(coerce_bytes("b", "").is_err());
        assert!(coerce_bytes("b", "GiB").is_err());
        assert!(coerce_bytes("b", "1XiB").is_err());
        assert!(coerce_bytes("b", "1.2.3KiB").is_err());
    }

    #[test]
    fn test_coerce_rate() {
        assert_eq!(coerce_rate("r", "452.38KiB/s").unwrap(), 463_237);
        assert_eq!(coerce_rate("r", "0.00B/s").unwrap(), 0);
        // A bare size without the /s suffix is still accepted.
        assert_eq!(coerce_rate("r", "1MiB").unwrap(), 1_048_576);
    }

    #[test]
    fn test_coerce_hms() {
        assert_eq!(coerce_hms("d", "0:00:00").unwrap(), 0);
        assert_eq!(coerce_hms("d", "0:00:05").unwrap(), 5);
        assert_eq!(coerce_hms("d", "1:02:03").unwrap(), 3723);
        assert_eq!(coerce_hms("d", "100:00:00").unwrap(), 360_000);
        assert!(coerce_hms("d", "1:02").is_err());
        assert!(coerce_hms("d", "1:xx:03").is_err());
    }

    #[test]
    fn test_format_hms_round_trip() {
        assert_eq!(format_hms(3723), "01:02:03");
        // Re-coercing a formatted duration preserves the second count,
        // including out-of-range minute/second components up to 99.
        for (h, m, s) in [(0, 0, 0), (0, 0, 59), (1, 2, 3), (23, 59, 59), (99, 99, 99)] {
            let total = coerce_hms("d", &format!("{}:{:02}:{:02}", h, m, s)).unwrap();
            assert_eq!(coerce_hms("d", &format_hms(total)).unwrap(), total);
        }
    }

    #[test]
    fn test_coerce_scrub_time_utc() {
        // Jan 2 2006 was in fact a Monday.
        let epoch = coerce_scrub_time_in("t", "Mon Jan  2 15:04:05 2006", &Utc).unwrap();
        assert_eq!(epoch, 1_136_214_245);
    }

    #[test]
    fn test_coerce_scrub_time_ignores_weekday_mismatch() {
        // Jan 2 2021 was a Saturday; the stale weekday must not matter.
        let good = coerce_scrub_time_in("t", "Sat Jan  2 15:04:05 2021", &Utc).unwrap();
        let stale = coerce_scrub_time_in("t", "Mon Jan  2 15:04:05 2021", &Utc).unwrap();
        assert_eq!(good, stale);
    }

    #[test]
    fn test_coerce_scrub_time_rejects_malformed() {
        assert!(coerce_scrub_time_in("t", "", &Utc).is_err());
        assert!(coerce_scrub_time_in("t", "Jan 2 15:04:05 2006", &Utc).is_err());
        assert!(coerce_scrub_time_in("t", "Mon Foo 2 15:04:05 2006", &Utc).is_err());
    }

    #[test]
    fn test_format_scrub_time_round_trip() {
        let rendered = format_scrub_time_in(1_136_214_245, &Utc);
        assert_eq!(rendered, "Mon Jan 2 15:04:05 2006");
        assert_eq!(
            coerce_scrub_time_in("t", &rendered, &Utc).unwrap(),
            1_136_214_245
        );
    }

    #[test]
    fn test_scrub_status_codes() {
        assert_eq!(ScrubStatus::from_word("running").code(), 0);
        assert_eq!(ScrubStatus::from_word("finished").code(), 1);
        assert_eq!(ScrubStatus::from_word("aborted").code(), 2);
        assert_eq!(ScrubStatus::from_word("interrupted").code(), 3);
        assert_eq!(ScrubStatus::from_word("resumed").code(), -1);
        assert_eq!(ScrubStatus::from_word("").code(), -1);
    }
}
