//! Background import jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of a job, using the backend's short codes on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[serde(rename = "pnd")]
    Pending,
    #[serde(rename = "prc")]
    Processing,
    #[serde(rename = "suc")]
    Succeeded,
    #[serde(rename = "err")]
    Failed,
    #[serde(rename = "arc")]
    Archived,
}

/// Operator actions offered for a job row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobAction {
    Start,
    Stop,
    Archive,
}

impl JobStatus {
    /// Short wire code
    pub fn code(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pnd",
            JobStatus::Processing => "prc",
            JobStatus::Succeeded => "suc",
            JobStatus::Failed => "err",
            JobStatus::Archived => "arc",
        }
    }

    /// Human-readable description
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Waiting in queue",
            JobStatus::Processing => "Processing",
            JobStatus::Succeeded => "Processed successfully",
            JobStatus::Failed => "Processing failed",
            JobStatus::Archived => "Archived",
        }
    }

    /// No further transitions happen on the worker side
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Archived
        )
    }

    /// Whether `action` is enabled for a job in this state
    pub fn allows(&self, action: JobAction) -> bool {
        match action {
            JobAction::Start => !matches!(self, JobStatus::Processing | JobStatus::Succeeded),
            JobAction::Stop => !matches!(self, JobStatus::Succeeded | JobStatus::Failed),
            JobAction::Archive => true,
        }
    }

    pub fn allowed_actions(&self) -> Vec<JobAction> {
        [JobAction::Start, JobAction::Stop, JobAction::Archive]
            .into_iter()
            .filter(|action| self.allows(*action))
            .collect()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A PDF import job as reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub id: i64,
    pub status: JobStatus,
    pub datetime: DateTime<Utc>,
}
