//! In-memory backends for unit tests

use super::backend::{ChatBackend, FormulaStore, JobApi};
use crate::error::{FormularyError, Result};
use crate::models::{
    ChatMessage, FormulaRecord, Job, JobStatus, MatchIndex, MatchResult, NewFormula, SearchQuery,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

fn unavailable() -> FormularyError {
    FormularyError::Http {
        status: 503,
        body: "unavailable".to_string(),
    }
}

/// Formula store answering deep queries with case-insensitive substring offsets
#[derive(Default)]
pub struct FakeStore {
    formulas: Mutex<Vec<FormulaRecord>>,
    deep_delays: Mutex<HashMap<String, Duration>>,
    list_calls: AtomicUsize,
    deep_calls: AtomicUsize,
    fail_list: AtomicBool,
    fail_deep: AtomicBool,
    fail_create: AtomicBool,
}

impl FakeStore {
    pub fn with_formulas(formulas: Vec<FormulaRecord>) -> Self {
        Self {
            formulas: Mutex::new(formulas),
            ..Default::default()
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn deep_calls(&self) -> usize {
        self.deep_calls.load(Ordering::SeqCst)
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deep(&self, fail: bool) {
        self.fail_deep.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Delay answers to deep queries for `term`
    pub fn delay_deep(&self, term: &str, delay: Duration) {
        self.deep_delays.lock().unwrap().insert(term.to_string(), delay);
    }
}

#[async_trait]
impl FormulaStore for FakeStore {
    async fn list_formulas(&self) -> Result<Vec<FormulaRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.formulas.lock().unwrap().clone())
    }

    async fn get_formula(&self, id: i64) -> Result<FormulaRecord> {
        self.formulas
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == Some(id))
            .cloned()
            .ok_or(FormularyError::Http {
                status: 404,
                body: String::new(),
            })
    }

    async fn create_formula(&self, formula: &NewFormula) -> Result<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut formulas = self.formulas.lock().unwrap();
        let id = formulas.iter().filter_map(|f| f.id).max().unwrap_or(0) + 1;
        formulas.push(
            FormulaRecord::new(id, formula.name.clone(), formula.latex.clone())
                .with_source(formula.source.clone())
                .with_description(formula.description.clone()),
        );
        Ok(())
    }

    async fn compare_indexes(&self, query: &SearchQuery) -> Result<Vec<MatchResult>> {
        self.deep_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.deep_delays.lock().unwrap().get(&query.latex).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_deep.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let needle = query.latex.to_lowercase();
        let formulas = self.formulas.lock().unwrap().clone();
        Ok(formulas
            .into_iter()
            .map(|formula| {
                let indexes = if needle.is_empty() {
                    Vec::new()
                } else {
                    formula
                        .latex
                        .to_lowercase()
                        .match_indices(&needle)
                        .map(|(offset, _)| MatchIndex::Offset(offset as i64))
                        .collect()
                };
                MatchResult { formula, indexes }
            })
            .collect())
    }
}

/// Job API whose jobs advance one state per status request
#[derive(Default)]
pub struct FakeJobs {
    jobs: Mutex<Vec<Job>>,
    status_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FakeJobs {
    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            ..Default::default()
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobApi for FakeJobs {
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|job| job.status != JobStatus::Archived)
            .cloned()
            .collect())
    }

    async fn job_status(&self, id: i64) -> Result<Job> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or(FormularyError::Http {
                status: 404,
                body: String::new(),
            })?;
        let snapshot = job.clone();
        job.status = match job.status {
            JobStatus::Pending => JobStatus::Processing,
            JobStatus::Processing => JobStatus::Succeeded,
            other => other,
        };
        Ok(snapshot)
    }

    async fn archive_job(&self, id: i64) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => {
                job.status = JobStatus::Archived;
                Ok(())
            }
            None => Err(FormularyError::Http {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// Chat backend echoing the last user message with the turn number
#[derive(Default)]
pub struct FakeChat {
    fail: bool,
    last_len: AtomicUsize,
}

impl FakeChat {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn last_transcript_len(&self) -> usize {
        self.last_len.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for FakeChat {
    async fn send_transcript(&self, transcript: &[ChatMessage]) -> Result<String> {
        self.last_len.store(transcript.len(), Ordering::SeqCst);
        if self.fail {
            return Err(unavailable());
        }
        let last = transcript.last().map(|m| m.content.as_str()).unwrap_or_default();
        let turn = transcript.len().div_ceil(2);
        Ok(format!("echo: {} ({})", last, turn))
    }
}
