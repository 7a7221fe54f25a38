//! Output sinks for metric points.

use crate::point::MetricPoint;
use std::io::{self, Write};

/// Destination for collected metric points.
///
/// Collectors emit points one at a time as rows are classified, so a
/// failing sink surfaces immediately instead of after a full pass.
pub trait PointSink {
    fn emit(&mut self, point: MetricPoint) -> io::Result<()>;
}

/// Writes one InfluxDB line-protocol line per point.
pub struct LineProtocolSink<W: Write> {
    writer: W,
}

impl<W: Write> LineProtocolSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> PointSink for LineProtocolSink<W> {
    fn emit(&mut self, point: MetricPoint) -> io::Result<()> {
        writeln!(self.writer, "{}", point.to_line_protocol())
    }
}

/// Writes one JSON object per line.
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> PointSink for JsonSink<W> {
    fn emit(&mut self, point: MetricPoint) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, &point)?;
        writeln!(self.writer)
    }
}

/// Collects points in memory. Test helper.
#[derive(Default)]
pub struct VecSink {
    pub points: Vec<MetricPoint>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PointSink for VecSink {
    fn emit(&mut self, point: MetricPoint) -> io::Result<()> {
        self.points.push(point);
        Ok(())
    }
}
