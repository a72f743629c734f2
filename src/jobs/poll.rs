//! Polling a single job until it finishes

use crate::api::JobApi;
use crate::config::JobsConfig;
use crate::error::{FormularyError, Result};
use crate::models::Job;
use std::time::Duration;

/// Poll `id` until its status is terminal
///
/// `on_update` sees every fetched snapshot, including the final one. Fails
/// with [`FormularyError::Timeout`] once `poll_timeout` has elapsed.
pub async fn wait_for_job<J, F>(api: &J, id: i64, config: &JobsConfig, mut on_update: F) -> Result<Job>
where
    J: JobApi + ?Sized,
    F: FnMut(&Job),
{
    let poll = async {
        let period = config.poll_interval().max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let job = api.job_status(id).await?;
            log::debug!("Job {} is {}", id, job.status.code());
            on_update(&job);
            if job.status.is_terminal() {
                log::info!("Job {} finished: {}", id, job.status);
                return Ok(job);
            }
        }
    };

    match tokio::time::timeout(config.poll_timeout(), poll).await {
        Ok(result) => result,
        Err(_) => Err(FormularyError::Timeout(format!(
            "job {} still running after {}s",
            id, config.poll_timeout_secs
        ))),
    }
}
