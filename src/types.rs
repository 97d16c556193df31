use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a separation job as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Uploaded,
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// A job reaches exactly one terminal state and never leaves it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// The states that close the log stream. Cancellation does not emit
    /// a closing status event, so it is excluded here.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uploaded => "uploaded",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uploaded" => Ok(Self::Uploaded),
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown job status `{other}`")),
        }
    }
}

/// Response of the upload and process endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub job_id: String,
    pub filename: String,
    pub status: JobState,
    pub message: String,
}

/// One entry of the job listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub filename: String,
    pub status: JobState,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full status of a single job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetail {
    pub job_id: String,
    pub filename: String,
    pub status: JobState,
    #[serde(default)]
    pub progress: f32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobDetail {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A separated track produced by a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stem {
    pub name: String,
    pub filename: String,
    /// File size in bytes.
    pub size: u64,
}

/// Wrapper object returned by the stems endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StemList {
    pub stems: Vec<Stem>,
}

/// Severity of a processing log line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Progress,
    Stdout,
    Stderr,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Progress => "PROGRESS",
            Self::Stdout => "STDOUT",
            Self::Stderr => "STDERR",
        };
        f.write_str(s)
    }
}

/// One processing log line for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Snapshot returned by the latest-logs endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogHistory {
    pub job_id: String,
    pub logs: Vec<LogEntry>,
    pub total_logs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showing: Option<u64>,
}

/// Filter for the job listing endpoint.
#[derive(Debug, Clone)]
pub struct JobQuery {
    pub status: Option<JobState>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}
