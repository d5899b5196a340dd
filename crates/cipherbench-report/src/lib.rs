//! Timing reports and the statistics pipeline.
//!
//! A benchmark run produces a [`TimingReport`]: an append-only stream of
//! typed timing events plus free-form header and footer text. Reports
//! round-trip through a tagged CSV format. The statistics pipeline consumes
//! loaded reports and emits per-event-type statistics, a summary view, and
//! a many-report overview.

pub mod compiler;
pub mod event;
pub mod overview;
pub mod prefix;
pub mod report;
pub mod stats;

pub use compiler::{CompilerConfig, compile};
pub use event::{EventTimer, TimingEvent};
pub use overview::{OverviewBuilder, OverviewHeader};
pub use prefix::{TimeUnit, TimingPrefix, timing_prefix, timing_prefix_with};
pub use report::{ReportError, TimingReport};
pub use stats::{EventTypeStats, ReportStats, StatisticsResult, compute_stats};
