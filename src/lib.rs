//! # stem-separator-client
//!
//! Client for the Stem Separator service: upload audio, start separation
//! jobs, poll their status, stream processing logs, and download the
//! resulting stems (vocals, drums, bass, other).

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod registry;
pub mod stream;
pub mod types;
pub mod validate;

mod io;
mod paths;

pub use crate::{
    client::SeparatorClient,
    config::ClientConfig,
    error::{ClientError, Result},
    io::progress::{set_download_progress_callback, set_upload_progress_callback},
    poller::{poll_until_terminal, PollOptions, POLL_INTERVAL},
    stream::{LogBuffer, LogStream, StreamEvent, StreamState, LOG_BUFFER_CAP},
    types::{
        JobDetail, JobQuery, JobState, JobSummary, LogEntry, LogHistory, LogLevel, Stem,
        UploadReceipt,
    },
    validate::{validate_file, validate_upload, MAX_UPLOAD_BYTES},
};
