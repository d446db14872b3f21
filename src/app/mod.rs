//! Run orchestration and the output side: progress, summary, exports.
mod export;
mod progress;
mod runner;
mod summary;

pub use export::{export_csv, export_json};
pub use progress::{NoProgress, ProgressSink, TerminalProgress, progress_sink};
pub use runner::{RunController, RunOutcome};
pub use summary::{print_summary, render_summary};
