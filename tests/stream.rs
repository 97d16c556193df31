use std::io::Cursor;

use stem_separator_client::stream::{decode_event, read_frame, LogStream};
use stem_separator_client::{JobState, LogLevel, StreamEvent, StreamState, LOG_BUFFER_CAP};

fn log_frame(n: usize) -> String {
    format!(
        "event: log\ndata: {{\"timestamp\":\"2024-05-01T12:00:{:02}Z\",\"level\":\"INFO\",\"message\":\"line {n}\"}}\n\n",
        n % 60
    )
}

fn status_frame(status: &str) -> String {
    format!("event: status\ndata: {{\"status\":\"{status}\"}}\n\n")
}

#[test]
fn read_frame_parses_event_and_data() {
    let mut src = Cursor::new("event: log\ndata: {\"a\":1}\n\n");
    let (event, data) = read_frame(&mut src).unwrap().expect("one frame");
    assert_eq!(event, "log");
    assert_eq!(data, "{\"a\":1}");
    assert!(read_frame(&mut src).unwrap().is_none());
}

#[test]
fn read_frame_skips_comments_and_handles_crlf() {
    let mut src = Cursor::new(": keep-alive\r\n\r\nevent: heartbeat\r\ndata: {}\r\n\r\n");
    let (event, _) = read_frame(&mut src).unwrap().expect("heartbeat frame");
    assert_eq!(event, "heartbeat");
}

#[test]
fn read_frame_joins_multiline_data() {
    let mut src = Cursor::new("event: error\ndata: first\ndata: second\n\n");
    let (_, data) = read_frame(&mut src).unwrap().unwrap();
    assert_eq!(data, "first\nsecond");
}

#[test]
fn decode_event_rejects_unknown_kinds() {
    assert!(decode_event("shutdown", "{}").is_none());
    assert!(decode_event("log", "not json").is_none());
}

#[test]
fn decode_event_parses_log_entries() {
    let data = "{\"timestamp\":\"2024-05-01T12:00:00Z\",\"level\":\"STDERR\",\"message\":\"x\"}";
    match decode_event("log", data) {
        Some(StreamEvent::Log(entry)) => {
            assert_eq!(entry.level, LogLevel::Stderr);
            assert_eq!(entry.message, "x");
        }
        other => panic!("expected log event, got {other:?}"),
    }
}

#[test]
fn buffer_never_exceeds_cap() {
    let mut body = String::from("event: connected\ndata: {\"job_id\":\"j1\"}\n\n");
    for n in 0..150 {
        body.push_str(&log_frame(n));
    }

    let mut stream = LogStream::connect(Cursor::new(body));
    let state = stream.run(|_| {});

    assert_eq!(state, StreamState::ClosedNormal);
    assert_eq!(stream.buffer().len(), LOG_BUFFER_CAP);
    assert_eq!(stream.buffer().total_seen(), 150);
    // Oldest entries were evicted; the first survivor is line 50.
    let first = stream.buffer().iter().next().unwrap();
    assert_eq!(first.message, "line 50");
}

#[test]
fn first_log_moves_stream_to_streaming() {
    let body = format!("event: connected\ndata: {{}}\n\n{}", log_frame(0));
    let mut stream = LogStream::connect(Cursor::new(body));

    assert_eq!(stream.state(), StreamState::Connecting);
    stream.next_event(); // connected
    assert_eq!(stream.state(), StreamState::Connecting);
    stream.next_event(); // first log
    assert_eq!(stream.state(), StreamState::Streaming);
}

#[test]
fn terminal_status_closes_and_trailing_events_are_not_processed() {
    let mut body = String::new();
    body.push_str(&log_frame(1));
    body.push_str(&log_frame(2));
    body.push_str(&status_frame("completed"));
    // Anything after the terminal status must be ignored.
    body.push_str(&log_frame(3));
    body.push_str(&status_frame("failed"));

    let mut stream = LogStream::connect(Cursor::new(body));
    let mut events = 0;
    let state = stream.run(|_| events += 1);

    assert_eq!(state, StreamState::ClosedNormal);
    assert_eq!(events, 3); // two logs and one status
    assert_eq!(stream.buffer().len(), 2);
    assert_eq!(stream.last_status(), Some(JobState::Completed));
    assert!(stream.next_event().is_none());
}

#[test]
fn server_error_event_closes_with_error() {
    let body = format!(
        "{}event: error\ndata: {{\"error\":\"job not found\"}}\n\n",
        log_frame(1)
    );
    let mut stream = LogStream::connect(Cursor::new(body));
    let state = stream.run(|_| {});

    assert_eq!(state, StreamState::ClosedError);
    assert_eq!(stream.error(), Some("job not found"));
}

#[test]
fn eof_without_terminal_status_closes_normally() {
    let mut stream = LogStream::connect(Cursor::new(log_frame(1)));
    let state = stream.run(|_| {});

    assert_eq!(state, StreamState::ClosedNormal);
    assert_eq!(stream.last_status(), None);
    assert_eq!(stream.buffer().len(), 1);
}

#[test]
fn seeding_from_history_respects_the_cap() {
    use stem_separator_client::{LogBuffer, LogEntry, LogLevel};

    let entries = (0..120).map(|n| LogEntry {
        timestamp: "2024-05-01T12:00:00Z".parse().unwrap(),
        level: LogLevel::Info,
        message: format!("line {n}"),
    });

    let mut buffer = LogBuffer::default();
    buffer.extend(entries);

    assert_eq!(buffer.len(), LOG_BUFFER_CAP);
    assert_eq!(buffer.total_seen(), 120);
    assert_eq!(buffer.iter().next().unwrap().message, "line 20");
}

#[test]
fn clear_local_empties_the_buffer_only() {
    let body = format!("{}{}", log_frame(1), log_frame(2));
    let mut stream = LogStream::connect(Cursor::new(body));
    stream.next_event();
    stream.next_event();
    assert_eq!(stream.buffer().len(), 2);

    stream.clear_local();
    assert!(stream.buffer().is_empty());
    assert_eq!(stream.state(), StreamState::Streaming);
}
