//! Relay activity log ingestion and traffic accounting.
//!
//! The [`LogMonitor`] follows the relay's access log and keeps the
//! traffic ledger up to date. Two duties run while the monitor is
//! active:
//!
//! - **tail**: consumes newly appended log lines, parsing each with a
//!   structured-first, textual-fallback strategy, and accumulates
//!   per-subscriber byte deltas in memory;
//! - **flush**: on a fixed interval (and once more at stop) commits the
//!   accumulated deltas to the store, which enforces traffic limits.
//!
//! The log is best-effort telemetry: unparseable lines are skipped, a
//! missing or rotated file is reopened with a bounded delay, and lines
//! referencing unknown subscribers are dropped. Nothing here is fatal
//! to the host process.

mod aggregate;
mod error;
mod monitor;
mod parse;
mod tail;

pub use aggregate::{Aggregate, FlushEntry, TrafficTable};
pub use error::IngestError;
pub use monitor::{LogMonitor, MonitorStatus};
pub use parse::{parse_line, LogRecord, ParsedLine};
