use crate::types::{JobState, LogEntry};
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};

/// Client-side cap on buffered log entries: only the most recent entries
/// are kept regardless of stream volume.
pub const LOG_BUFFER_CAP: usize = 100;

/// Lifecycle of one log stream connection. There is no reconnection: a
/// closed stream stays closed and a new one must be opened to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Streaming,
    ClosedNormal,
    ClosedError,
}

/// Decoded server-sent event from the log stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Connected,
    Log(LogEntry),
    Heartbeat,
    Status(JobState),
    Error(String),
}

/// Read one SSE frame (event name plus data payload) from the reader.
///
/// Handles `event:`/`data:` fields, multi-line data, `:` comment lines and
/// CRLF endings. Returns `Ok(None)` at end of stream.
pub fn read_frame<R: BufRead>(reader: &mut R) -> std::io::Result<Option<(String, String)>> {
    let mut event = String::new();
    let mut data = String::new();
    let mut saw_field = false;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(saw_field.then(|| (event, data)));
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);

        if trimmed.is_empty() {
            if saw_field {
                return Ok(Some((event, data)));
            }
            continue;
        }
        if trimmed.starts_with(':') {
            // keep-alive comment
            continue;
        }

        let (field, value) = match trimmed.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (trimmed, ""),
        };
        match field {
            "event" => {
                event = value.to_string();
                saw_field = true;
            }
            "data" => {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(value);
                saw_field = true;
            }
            // the backend does not use id/retry fields
            _ => {}
        }
    }
}

/// Decode a raw SSE frame into a typed [`StreamEvent`].
///
/// Unknown event kinds and malformed payloads yield `None`; callers log
/// and continue.
pub fn decode_event(event: &str, data: &str) -> Option<StreamEvent> {
    #[derive(Deserialize)]
    struct StatusData {
        status: JobState,
    }
    #[derive(Deserialize)]
    struct ErrorData {
        error: String,
    }

    match event {
        "connected" => Some(StreamEvent::Connected),
        "heartbeat" => Some(StreamEvent::Heartbeat),
        "log" => serde_json::from_str::<LogEntry>(data)
            .ok()
            .map(StreamEvent::Log),
        "status" => serde_json::from_str::<StatusData>(data)
            .ok()
            .map(|d| StreamEvent::Status(d.status)),
        "error" => {
            let message = serde_json::from_str::<ErrorData>(data)
                .map(|d| d.error)
                .unwrap_or_else(|_| "log stream error".to_string());
            Some(StreamEvent::Error(message))
        }
        _ => None,
    }
}

/// Ring buffer over the most recent log entries.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    total_seen: u64,
}

impl LogBuffer {
    pub fn push(&mut self, entry: LogEntry) {
        self.total_seen += 1;
        if self.entries.len() == LOG_BUFFER_CAP {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Seed the buffer from a history snapshot, oldest first.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries pushed over the lifetime of the buffer, including evicted ones.
    pub fn total_seen(&self) -> u64 {
        self.total_seen
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_seen = 0;
    }
}

/// Consumer of one job's server-sent-events log stream.
///
/// State machine: `Connecting → Streaming → {ClosedNormal, ClosedError}`.
/// The stream closes itself on a completed/failed status event and never
/// processes anything past that point.
pub struct LogStream {
    reader: BufReader<Box<dyn Read + Send>>,
    state: StreamState,
    buffer: LogBuffer,
    last_status: Option<JobState>,
    error: Option<String>,
}

impl LogStream {
    /// Wrap an open SSE response body (or any byte source in tests).
    pub fn connect(source: impl Read + Send + 'static) -> Self {
        Self {
            reader: BufReader::new(Box::new(source)),
            state: StreamState::Connecting,
            buffer: LogBuffer::default(),
            last_status: None,
            error: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn last_status(&self) -> Option<JobState> {
        self.last_status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Empty the local buffer. The remote stream is unaffected; pair with
    /// [`SeparatorClient::clear_logs`](crate::client::SeparatorClient::clear_logs)
    /// to also drop the server-side history.
    pub fn clear_local(&mut self) {
        self.buffer.clear();
    }

    /// Pull the next event, updating buffer and state. Returns `None` once
    /// the stream has closed; after a terminal status no further events
    /// are read or processed.
    pub fn next_event(&mut self) -> Option<StreamEvent> {
        if matches!(self.state, StreamState::ClosedNormal | StreamState::ClosedError) {
            return None;
        }
        loop {
            match read_frame(&mut self.reader) {
                Ok(Some((event, data))) => match decode_event(&event, &data) {
                    Some(ev) => {
                        self.apply(&ev);
                        return Some(ev);
                    }
                    None => {
                        tracing::debug!(%event, "skipping unknown or malformed stream event");
                    }
                },
                Ok(None) => {
                    self.state = StreamState::ClosedNormal;
                    return None;
                }
                Err(err) => {
                    self.error = Some(err.to_string());
                    self.state = StreamState::ClosedError;
                    return None;
                }
            }
        }
    }

    /// Drain the stream to completion, handing each event to the callback.
    /// Returns the closing state.
    pub fn run(&mut self, mut on_event: impl FnMut(&StreamEvent)) -> StreamState {
        while let Some(ev) = self.next_event() {
            on_event(&ev);
        }
        self.state
    }

    fn apply(&mut self, ev: &StreamEvent) {
        match ev {
            StreamEvent::Log(entry) => {
                if self.state == StreamState::Connecting {
                    self.state = StreamState::Streaming;
                }
                self.buffer.push(entry.clone());
            }
            StreamEvent::Status(status) => {
                self.last_status = Some(*status);
                if status.is_settled() {
                    self.state = StreamState::ClosedNormal;
                }
            }
            StreamEvent::Error(message) => {
                self.error = Some(message.clone());
                self.state = StreamState::ClosedError;
            }
            StreamEvent::Connected | StreamEvent::Heartbeat => {}
        }
    }
}
