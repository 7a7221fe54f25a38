//! btrfs health metrics collection.
//!
//! Parses the output of the `btrfs` administration tool with
//! template-driven state machines and emits time-series points in
//! InfluxDB line protocol or JSON.
//!
//! - [`textfsm`]: template-driven tokenizer producing rows from text
//! - [`record`]: row classification and typed record construction
//! - [`coerce`]: string-to-typed-value conversion rules
//! - [`point`] / [`emit`]: metric point model and output sinks
//! - [`collector`]: mount discovery and per-family collection passes

pub mod coerce;
pub mod collector;
pub mod emit;
pub mod point;
pub mod record;
pub mod textfsm;
