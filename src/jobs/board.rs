//! Cached job table

use crate::api::JobApi;
use crate::error::Result;
use crate::loadable::Loadable;
use crate::models::{Job, JobStatus};

/// Job list as last fetched from the backend
#[derive(Debug, Default)]
pub struct JobBoard {
    jobs: Loadable<Vec<Job>>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Loadable<Vec<Job>> {
        &self.jobs
    }

    /// Cached jobs, empty until loaded
    pub fn jobs(&self) -> &[Job] {
        self.jobs.ready().map(Vec::as_slice).unwrap_or_default()
    }

    /// The cached table must be fetched before use
    pub fn is_stale(&self) -> bool {
        !self.jobs.is_ready()
    }

    pub fn invalidate(&mut self) {
        self.jobs = Loadable::NotLoaded;
    }

    /// Fetch the job table; failures are kept as the board's error state
    pub async fn refresh<J: JobApi + ?Sized>(&mut self, api: &J) -> Result<&[Job]> {
        self.jobs = Loadable::Pending;
        match api.list_jobs().await {
            Ok(jobs) => {
                log::info!("Loaded {} jobs", jobs.len());
                self.jobs = Loadable::Ready(jobs);
                Ok(self.jobs())
            }
            Err(e) => {
                log::warn!("Loading jobs failed: {}", e);
                self.jobs = Loadable::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch the job table only if the cache is stale
    pub async fn ensure_loaded<J: JobApi + ?Sized>(&mut self, api: &J) -> Result<&[Job]> {
        if self.is_stale() {
            self.refresh(api).await
        } else {
            Ok(self.jobs())
        }
    }

    /// Unarchived jobs whose id contains `fragment`
    pub fn filter_by_id(&self, fragment: &str) -> Vec<&Job> {
        let fragment = fragment.trim();
        self.jobs()
            .iter()
            .filter(|job| job.status != JobStatus::Archived)
            .filter(|job| job.id.to_string().contains(fragment))
            .collect()
    }

    /// Archive a job, then reload the table
    pub async fn archive<J: JobApi + ?Sized>(&mut self, api: &J, id: i64) -> Result<()> {
        api.archive_job(id).await?;
        self.invalidate();
        self.refresh(api).await?;
        Ok(())
    }
}
