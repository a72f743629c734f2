//! Import and export of formulas
//!
//! PDFs (local or remote) and screenshots are uploaded to the backend for
//! recognition; formulas can be rendered back to PNG files.

use crate::api::ApiClient;
use crate::error::{FormularyError, Result};
use crate::models::Job;
use crate::utils::{ensure_directory, is_image_file, is_pdf_file, sanitize_filename};
use std::path::{Path, PathBuf};
use url::Url;

const DEFAULT_PDF_NAME: &str = "document.pdf";

/// Where a PDF import reads its document from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfSource {
    File(PathBuf),
    Url(String),
}

impl PdfSource {
    /// Load the document, returning the upload file name and its bytes
    async fn load(&self, client: &ApiClient) -> Result<(String, Vec<u8>)> {
        match self {
            PdfSource::File(path) => {
                if path.as_os_str().is_empty() {
                    return Err(FormularyError::EmptyInput("no PDF file selected".to_string()));
                }
                if !is_pdf_file(path) {
                    return Err(FormularyError::InvalidInput(format!(
                        "{} is not a PDF",
                        path.display()
                    )));
                }
                let bytes = tokio::fs::read(path).await?;
                Ok((file_name_of(path, DEFAULT_PDF_NAME), bytes))
            }
            PdfSource::Url(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(FormularyError::EmptyInput("no PDF URL given".to_string()));
                }
                let url = Url::parse(raw)?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(FormularyError::InvalidInput(format!(
                        "unsupported URL scheme '{}'",
                        url.scheme()
                    )));
                }
                log::info!("Downloading {}", url);
                let bytes = client.download(&url).await?;
                Ok((url_file_name(&url), bytes))
            }
        }
    }
}

/// Upload a PDF and return the extraction job the backend created
pub async fn import_pdf(client: &ApiClient, source: &PdfSource) -> Result<Job> {
    let (file_name, bytes) = source.load(client).await?;
    if bytes.is_empty() {
        return Err(FormularyError::EmptyInput(format!("{} is empty", file_name)));
    }
    client.parse_pdf(&file_name, bytes).await
}

/// Recognise the formula in an image file; returns its LaTeX
pub async fn import_screenshot<P: AsRef<Path>>(client: &ApiClient, path: P) -> Result<String> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(FormularyError::EmptyInput("no image selected".to_string()));
    }
    if !is_image_file(path) {
        return Err(FormularyError::InvalidInput(format!(
            "{} is not an image",
            path.display()
        )));
    }
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(FormularyError::EmptyInput(format!("{} is empty", path.display())));
    }
    client
        .parse_screenshot(&file_name_of(path, "screenshot.png"), bytes)
        .await
}

/// Render `latex` to a PNG file at `out_path`; returns the bytes written
pub async fn export_png<P: AsRef<Path>>(client: &ApiClient, latex: &str, out_path: P) -> Result<u64> {
    if latex.trim().is_empty() {
        return Err(FormularyError::EmptyInput("nothing to export".to_string()));
    }
    let out_path = out_path.as_ref();
    let png = client.export_png(latex).await?;
    if let Some(parent) = out_path.parent() {
        ensure_directory(parent)?;
    }
    tokio::fs::write(out_path, &png).await?;
    log::info!("Wrote {} bytes to {}", png.len(), out_path.display());
    Ok(png.len() as u64)
}

fn file_name_of(path: &Path, fallback: &str) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Upload name for a remote document: the last path segment, if any
fn url_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_PDF_NAME.to_string())
}
