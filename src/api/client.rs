//! ApiClient - HTTP client for the formula backend
//!
//! Every endpoint path is joined onto a single base URL, so the client works the
//! same against the backend directly or behind a reverse-proxy prefix such as
//! `http://host/api`.

use super::backend::{ChatBackend, FormulaStore, JobApi};
use crate::config::ApiConfig;
use crate::error::{FormularyError, Result};
use crate::models::{ChatMessage, FormulaRecord, Job, MatchResult, NewFormula, SearchQuery};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// Typed client for every backend endpoint
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

#[derive(Serialize)]
struct LatexBody<'a> {
    latex: &'a str,
}

impl ApiClient {
    /// Create a client from connection settings
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FormularyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base = parse_base_url(&config.base_url)?;
        log::debug!("ApiClient initialized for {}", base);
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of an endpoint path
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        log::debug!("GET {}", url);
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        log::debug!("POST {}", url);
        let response = check(self.http.post(url).json(body).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let url = self.endpoint(path)?;
        log::debug!("POST multipart {}", url);
        let response = check(self.http.post(url).multipart(form).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Upload a PDF for background formula extraction
    pub async fn parse_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<Job> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let job: Job = self.post_form("parse_pdf", Form::new().part("file", part)).await?;
        log::info!("PDF '{}' queued as job {}", file_name, job.id);
        Ok(job)
    }

    /// Recognise the formula in a screenshot; returns its LaTeX
    pub async fn parse_screenshot(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let latex: String = self
            .post_form("parse_screenshot", Form::new().part("image", part))
            .await?;
        log::info!("Screenshot '{}' recognised as '{}'", file_name, latex);
        Ok(latex)
    }

    /// Render LaTeX to PNG on the backend
    pub async fn export_png(&self, latex: &str) -> Result<Vec<u8>> {
        let url = self.endpoint("export_png")?;
        log::debug!("POST {}", url);
        let response = check(
            self.http
                .post(url)
                .json(&LatexBody { latex })
                .send()
                .await?,
        )
        .await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Fetch an arbitrary absolute URL, used for importing remote PDFs
    pub async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        log::debug!("GET {}", url);
        let response = check(self.http.get(url.clone()).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl FormulaStore for ApiClient {
    async fn list_formulas(&self) -> Result<Vec<FormulaRecord>> {
        self.get_json("formulas").await
    }

    async fn get_formula(&self, id: i64) -> Result<FormulaRecord> {
        self.get_json(&format!("formulas/{}", id)).await
    }

    async fn create_formula(&self, formula: &NewFormula) -> Result<()> {
        let url = self.endpoint("formulas")?;
        log::debug!("POST {}", url);
        check(self.http.post(url).json(formula).send().await?).await?;
        Ok(())
    }

    async fn compare_indexes(&self, query: &SearchQuery) -> Result<Vec<MatchResult>> {
        self.post_json("compare_indexes", &query.to_payload()).await
    }
}

#[async_trait]
impl JobApi for ApiClient {
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.get_json("jobs").await
    }

    async fn job_status(&self, id: i64) -> Result<Job> {
        self.get_json(&format!("jobs/status/{}", id)).await
    }

    async fn archive_job(&self, id: i64) -> Result<()> {
        let url = self.endpoint(&format!("jobs/archive/{}", id))?;
        log::debug!("POST {}", url);
        check(self.http.post(url).send().await?).await?;
        log::info!("Archived job {}", id);
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn send_transcript(&self, transcript: &[ChatMessage]) -> Result<String> {
        self.post_json("message", transcript).await
    }
}

/// Turn a non-2xx response into [`FormularyError::Http`]
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    log::warn!("{} returned {}", url, status);
    Err(FormularyError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Parse a base URL, making sure relative endpoint joins keep its path
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FormularyError::Config("Base URL must not be empty".to_string()));
    }
    let mut base = Url::parse(trimmed)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}
