//! Daily report daemon: waits for the configured local time, runs the report
//! job, repeats until ctrl-c.

mod error;
mod runtime;
pub mod schedule;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, run_once, scheduler, start_blocking};
pub use schedule::{next_run_after, Schedule};
