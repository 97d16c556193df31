use crate::{client::SeparatorClient, error::Result, types::JobDetail};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

/// Fixed status poll cadence, matching the service UI.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
        }
    }
}

/// Poll a job's status at a fixed interval until it reaches a terminal
/// state or `stop` is raised.
///
/// The observer runs once per sample, including the terminal one. Returns
/// `Ok(None)` when stopped early. Transport retries happen inside the HTTP
/// layer; any error that survives them is propagated, not swallowed.
///
/// The poller never synchronises with the log stream for the same job;
/// both detect terminal state on their own.
pub fn poll_until_terminal(
    client: &SeparatorClient,
    job_id: &str,
    opts: &PollOptions,
    stop: Option<&AtomicBool>,
    mut on_update: impl FnMut(&JobDetail),
) -> Result<Option<JobDetail>> {
    let stopped = || stop.map(|s| s.load(Ordering::Relaxed)).unwrap_or(false);

    loop {
        if stopped() {
            return Ok(None);
        }

        let detail = client.job(job_id)?;
        on_update(&detail);

        if detail.is_terminal() {
            tracing::debug!(job_id, status = %detail.status, "job reached terminal state");
            return Ok(Some(detail));
        }

        thread::sleep(opts.interval);
    }
}
