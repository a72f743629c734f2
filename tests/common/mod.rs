//! Stub formula backend served with axum on an ephemeral port

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use formulary::config::ApiConfig;
use formulary::models::{ChatMessage, FormulaRecord, Job, JobStatus, NewFormula};
use formulary::{ApiClient, Config};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n% stub document\n";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nstub";

/// A multipart field the backend received
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: Option<String>,
    pub size: usize,
}

#[derive(Default)]
pub struct BackendState {
    pub formulas: Mutex<Vec<FormulaRecord>>,
    pub jobs: Mutex<Vec<Job>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub deep_bodies: Mutex<Vec<Value>>,
    pub deep_delays: Mutex<HashMap<String, Duration>>,
    pub list_calls: AtomicUsize,
    pub deep_calls: AtomicUsize,
    pub fail_list: AtomicBool,
}

impl BackendState {
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn deep_calls(&self) -> usize {
        self.deep_calls.load(Ordering::SeqCst)
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn delay_deep(&self, term: &str, delay: Duration) {
        self.deep_delays
            .lock()
            .unwrap()
            .insert(term.to_string(), delay);
    }
}

pub struct StubBackend {
    /// Base URL including the `/api` prefix
    pub base_url: String,
    pub origin: String,
    pub state: Arc<BackendState>,
}

impl StubBackend {
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.api = ApiConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
            ..Default::default()
        };
        config.search.debounce_ms = 20;
        config.jobs.poll_interval_ms = 10;
        config.jobs.poll_timeout_secs = 5;
        config
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config().api).unwrap()
    }
}

pub fn sample_formulas() -> Vec<FormulaRecord> {
    vec![
        FormulaRecord::new(1, "Circle", "x^2+y^2").with_source("geometry"),
        FormulaRecord::new(2, "Sum", "a+b"),
    ]
}

/// Serve the stub on 127.0.0.1 with a random port
pub async fn start(formulas: Vec<FormulaRecord>) -> StubBackend {
    let state = Arc::new(BackendState {
        formulas: Mutex::new(formulas),
        ..Default::default()
    });

    let api = Router::new()
        .route("/formulas", get(list_formulas).post(create_formula))
        .route("/formulas/:id", get(get_formula))
        .route("/compare_indexes", post(compare_indexes))
        .route("/parse_pdf", post(parse_pdf))
        .route("/parse_screenshot", post(parse_screenshot))
        .route("/export_png", post(export_png))
        .route("/jobs", get(list_jobs))
        .route("/jobs/status/:id", get(job_status))
        .route("/jobs/archive/:id", post(archive_job))
        .route("/message", post(message));

    let app = Router::new()
        .nest("/api", api)
        .route("/docs/:name", get(download))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubBackend {
        base_url: format!("http://{}/api", addr),
        origin: format!("http://{}", addr),
        state,
    }
}

type Shared = State<Arc<BackendState>>;

async fn list_formulas(State(state): Shared) -> Response {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_list.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "database offline").into_response();
    }
    Json(state.formulas.lock().unwrap().clone()).into_response()
}

async fn get_formula(State(state): Shared, Path(id): Path<i64>) -> Response {
    let formulas = state.formulas.lock().unwrap();
    match formulas.iter().find(|f| f.id == Some(id)) {
        Some(formula) => Json(formula.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_formula(State(state): Shared, Json(formula): Json<NewFormula>) -> StatusCode {
    let mut formulas = state.formulas.lock().unwrap();
    let id = formulas.iter().filter_map(|f| f.id).max().unwrap_or(0) + 1;
    formulas.push(
        FormulaRecord::new(id, formula.name, formula.latex)
            .with_source(formula.source)
            .with_description(formula.description),
    );
    StatusCode::CREATED
}

#[derive(Deserialize)]
struct CompareBody {
    latex: String,
}

async fn compare_indexes(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.deep_calls.fetch_add(1, Ordering::SeqCst);
    state.deep_bodies.lock().unwrap().push(body.clone());
    let Ok(query) = serde_json::from_value::<CompareBody>(body) else {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    };

    let delay = state.deep_delays.lock().unwrap().get(&query.latex).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    // Structural comparison stand-in: spans of exact substring matches
    let formulas = state.formulas.lock().unwrap().clone();
    let results: Vec<Value> = formulas
        .into_iter()
        .map(|formula| {
            let indexes: Vec<[usize; 2]> = if query.latex.is_empty() {
                Vec::new()
            } else {
                formula
                    .latex
                    .match_indices(&query.latex)
                    .map(|(start, m)| [start, start + m.len()])
                    .collect()
            };
            json!({ "formula": formula, "indexes": indexes })
        })
        .collect();
    Json(results).into_response()
}

async fn record_uploads(state: &BackendState, mut multipart: Multipart) -> Vec<Upload> {
    let mut received = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        let name = field.name().unwrap_or("unknown").to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap_or_default();
        received.push(Upload {
            field: name,
            file_name,
            size: bytes.len(),
        });
    }
    state.uploads.lock().unwrap().extend(received.iter().cloned());
    received
}

async fn parse_pdf(State(state): Shared, multipart: Multipart) -> Response {
    let uploads = record_uploads(&state, multipart).await;
    if !uploads.iter().any(|u| u.field == "file" && u.size > 0) {
        return (StatusCode::BAD_REQUEST, "missing file").into_response();
    }

    let mut jobs = state.jobs.lock().unwrap();
    let job = Job {
        id: jobs.iter().map(|j| j.id).max().unwrap_or(0) + 1,
        status: JobStatus::Pending,
        datetime: Utc::now(),
    };
    jobs.push(job.clone());
    Json(job).into_response()
}

async fn parse_screenshot(State(state): Shared, multipart: Multipart) -> Response {
    let uploads = record_uploads(&state, multipart).await;
    if !uploads.iter().any(|u| u.field == "image" && u.size > 0) {
        return (StatusCode::BAD_REQUEST, "missing image").into_response();
    }
    Json("\\frac{a}{b}").into_response()
}

#[derive(Deserialize)]
struct ExportBody {
    latex: String,
}

async fn export_png(Json(body): Json<ExportBody>) -> Response {
    if body.latex.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES).into_response()
}

async fn list_jobs(State(state): Shared) -> Json<Vec<Job>> {
    let jobs = state.jobs.lock().unwrap();
    Json(
        jobs.iter()
            .filter(|job| job.status != JobStatus::Archived)
            .cloned()
            .collect(),
    )
}

/// Reports the current state, then advances the job one step
async fn job_status(State(state): Shared, Path(id): Path<i64>) -> Response {
    let mut jobs = state.jobs.lock().unwrap();
    let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let snapshot = job.clone();
    job.status = match job.status {
        JobStatus::Pending => JobStatus::Processing,
        JobStatus::Processing => JobStatus::Succeeded,
        other => other,
    };
    Json(snapshot).into_response()
}

async fn archive_job(State(state): Shared, Path(id): Path<i64>) -> StatusCode {
    let mut jobs = state.jobs.lock().unwrap();
    match jobs.iter_mut().find(|job| job.id == id) {
        Some(job) => {
            job.status = JobStatus::Archived;
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn message(Json(transcript): Json<Vec<ChatMessage>>) -> Json<String> {
    let last = transcript
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();
    Json(format!("{} message(s), last: {}", transcript.len(), last))
}

async fn download(Path(name): Path<String>) -> Response {
    if name.ends_with(".pdf") {
        ([(header::CONTENT_TYPE, "application/pdf")], PDF_BYTES).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}
