//! Loot reports: periodic markdown summaries of quest activity.

pub mod generator;
pub mod period;
pub mod render;
pub mod schedule;
pub mod summary;

pub use generator::{ReportGenerator, write_report};
pub use period::ReportPeriod;
pub use render::{file_name, render_report};
pub use schedule::{parse_schedule, run_scheduled};
pub use summary::{ReportSummary, gather_summary};
