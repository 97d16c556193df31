use crate::{
    error::{ClientError, Result},
    io::net::{self, ProgressReader},
    registry::resolve_model,
    stream::LogStream,
    types::{JobDetail, JobQuery, JobSummary, LogHistory, Stem, StemList, UploadReceipt},
    validate::{mime_for_file, validate_upload},
};
use anyhow::Context;
use reqwest::{
    blocking::{multipart, Response},
    header::ACCEPT,
    Url,
};
use serde::de::DeserializeOwned;
use std::{fs, fs::File, path::Path};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// HTTP client for one Stem Separator backend.
///
/// All methods are blocking; clone the client to drive several requests
/// from separate threads (the underlying connection pool is shared).
#[derive(Clone)]
pub struct SeparatorClient {
    http: reqwest::blocking::Client,
    base_url: Url,
}

impl SeparatorClient {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let url = base_url
            .map(Url::parse)
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL))
            .context("invalid backend base URL")?;
        Ok(Self {
            http: net::http_client(),
            base_url: url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check that the backend is up.
    pub fn health(&self) -> Result<serde_json::Value> {
        let resp = net::send_with_retry(self.http.get(self.url("health")?))?;
        Self::parse_json(resp)
    }

    /// Upload an audio file without starting processing.
    ///
    /// The file is validated locally (size, extension, model name) before
    /// any bytes go on the wire; the body is streamed with upload progress.
    pub fn upload(&self, input: &Path, model: &str) -> Result<UploadReceipt> {
        let model = resolve_model(model)?;
        let form = self.upload_form(input)?;
        let resp = self
            .http
            .post(self.url("api/audio/upload")?)
            .query(&[("model", model.as_str())])
            .multipart(form)
            .send()?;
        Self::parse_json(resp)
    }

    /// Upload and immediately start processing in one request.
    pub fn upload_and_process(&self, input: &Path, model: &str) -> Result<UploadReceipt> {
        let model = resolve_model(model)?;
        let form = self.upload_form(input)?;
        let resp = self
            .http
            .post(self.url("api/audio/process")?)
            .query(&[("model", model.as_str())])
            .multipart(form)
            .send()?;
        Self::parse_json(resp)
    }

    /// Start processing a previously uploaded job.
    pub fn start_processing(&self, job_id: &str) -> Result<UploadReceipt> {
        let url = self.url(&format!("api/audio/process/{job_id}"))?;
        let resp = net::send_with_retry(self.http.post(url))?;
        Self::parse_json(resp)
    }

    /// Fetch the current status of a job.
    pub fn job(&self, job_id: &str) -> Result<JobDetail> {
        let url = self.url(&format!("api/jobs/{job_id}"))?;
        let resp = net::send_with_retry(self.http.get(url))?;
        Self::parse_json(resp)
    }

    /// List jobs, optionally filtered by status.
    pub fn jobs(&self, query: &JobQuery) -> Result<Vec<JobSummary>> {
        let mut params: Vec<(&str, String)> = vec![
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(status) = query.status {
            params.push(("status", status.to_string()));
        }
        let resp = net::send_with_retry(self.http.get(self.url("api/jobs/")?).query(&params))?;
        Self::parse_json(resp)
    }

    /// Cancel a pending or processing job.
    pub fn cancel_job(&self, job_id: &str) -> Result<()> {
        let url = self.url(&format!("api/jobs/{job_id}/cancel"))?;
        let resp = net::send_with_retry(self.http.post(url))?;
        Self::check(resp).map(|_| ())
    }

    /// List the stems of a completed job.
    pub fn stems(&self, job_id: &str) -> Result<Vec<Stem>> {
        let url = self.url(&format!("api/audio/stems/{job_id}"))?;
        let resp = net::send_with_retry(self.http.get(url))?;
        let list: StemList = Self::parse_json(resp)?;
        Ok(list.stems)
    }

    /// Download one stem to `dest`, streaming with byte progress.
    /// Returns the number of bytes written.
    pub fn download_stem(&self, job_id: &str, stem_name: &str, dest: &Path) -> Result<u64> {
        let url = self.url(&format!("api/audio/download/{job_id}/{stem_name}"))?;
        let resp = net::send_with_retry(self.http.get(url))?;
        let resp = Self::check(resp)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        net::download_with_progress(resp, dest)
    }

    /// Delete a job and its files on the backend.
    pub fn delete_job(&self, job_id: &str) -> Result<()> {
        let url = self.url(&format!("api/audio/job/{job_id}"))?;
        let resp = net::send_with_retry(self.http.delete(url))?;
        Self::check(resp).map(|_| ())
    }

    /// Fetch the most recent log entries for a job.
    pub fn log_history(&self, job_id: &str, limit: usize) -> Result<LogHistory> {
        let url = self.url(&format!("api/audio/logs/{job_id}/latest"))?;
        let resp = net::send_with_retry(
            self.http.get(url).query(&[("limit", limit.to_string())]),
        )?;
        Self::parse_json(resp)
    }

    /// Clear the server-side log buffer for a job. The live stream, if
    /// any, keeps running.
    pub fn clear_logs(&self, job_id: &str) -> Result<()> {
        let url = self.url(&format!("api/audio/logs/{job_id}"))?;
        let resp = net::send_with_retry(self.http.delete(url))?;
        Self::check(resp).map(|_| ())
    }

    /// Open the server-sent-events log stream for a job.
    pub fn open_log_stream(&self, job_id: &str) -> Result<LogStream> {
        let url = self.url(&format!("api/audio/logs/{job_id}/stream"))?;
        let resp = net::send_with_retry(
            self.http.get(url).header(ACCEPT, "text/event-stream"),
        )?;
        let resp = Self::check(resp)?;
        Ok(LogStream::connect(resp))
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(path)
            .with_context(|| format!("failed to build URL for {path}"))?)
    }

    fn upload_form(&self, input: &Path) -> Result<multipart::Form> {
        let meta = fs::metadata(input)
            .map_err(|_| ClientError::InvalidUpload(format!("File not found: {}", input.display())))?;
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_for_file(&file_name);

        if let Some(reason) = validate_upload(&file_name, meta.len(), Some(mime)) {
            return Err(ClientError::InvalidUpload(reason));
        }

        let reader = ProgressReader::new(File::open(input)?, meta.len());
        let part = multipart::Part::reader_with_length(reader, meta.len())
            .file_name(file_name)
            .mime_str(mime)?;
        Ok(multipart::Form::new().part("file", part))
    }

    /// Map a non-2xx response to [`ClientError::Api`], extracting the
    /// backend's `{"detail": …}` message when the body carries one.
    fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or(body);
        Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    fn parse_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
        Ok(Self::check(resp)?.json()?)
    }
}
