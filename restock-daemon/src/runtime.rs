use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use restock_core::config;
use restock_sync::{pipeline, Context, Job, JobOutcome, ReportOutcome};

use crate::error::{io_err, DaemonError};
use crate::schedule::Schedule;

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon until ctrl-c.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let config = config::load_at(&home)?;
    let schedule = Schedule::new(config.daily_at()?, config.utc_offset()?);
    let ctx = Context::from_config(&home, &config).await?;
    info!(
        home = %home.display(),
        daily_at = %schedule.at,
        offset = %schedule.offset,
        "daemon started"
    );
    scheduler(&ctx, schedule, ctrl_c()).await
}

async fn ctrl_c() -> Result<(), DaemonError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|err| DaemonError::Signal(err.to_string()))?;
    info!("received ctrl-c, shutting down daemon");
    Ok(())
}

/// Fire the daily report at every scheduled instant until `shutdown`
/// resolves. A failed run is logged and the loop waits for the next day.
///
/// Missed days (host asleep) are not caught up: after a late wake-up the job
/// runs once and the schedule restarts from the current time.
pub async fn scheduler<F>(ctx: &Context, schedule: Schedule, shutdown: F) -> Result<(), DaemonError>
where
    F: Future<Output = Result<(), DaemonError>>,
{
    tokio::pin!(shutdown);
    let mut after = Utc::now();
    loop {
        let target = schedule.next_after(after);
        let delay = (target - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        info!(next_run = %target.with_timezone(&schedule.offset), "waiting for next daily report");

        tokio::select! {
            result = &mut shutdown => return result,
            _ = tokio::time::sleep(delay) => {
                let now = Utc::now();
                if let Err(err) = run_once(ctx, now).await {
                    error!(error = %err, "daily report run failed");
                }
                after = target.max(now);
            }
        }
    }
}

/// Run the daily report job once, as of `now`.
pub async fn run_once(ctx: &Context, now: DateTime<Utc>) -> Result<JobOutcome, DaemonError> {
    let outcome = pipeline::run(ctx, Job::DailyReport, now).await?;
    match &outcome {
        JobOutcome::Report(ReportOutcome::Sent { date, rows }) => {
            info!(%date, stores = rows.len(), "daily report sent");
        }
        JobOutcome::Report(ReportOutcome::Failed { message }) => {
            warn!(%message, "daily report failed; error mail attempted");
        }
        other => info!(outcome = ?other, "daily report finished"),
    }
    Ok(outcome)
}

/// Install the process-wide subscriber on stderr. `RUST_LOG` overrides the
/// default `info` filter. Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
