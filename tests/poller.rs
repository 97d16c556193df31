use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use httpmock::prelude::*;

use stem_separator_client::{poll_until_terminal, JobState, PollOptions, SeparatorClient};

fn job_body(status: &str, progress: f32) -> serde_json::Value {
    serde_json::json!({
        "job_id": "job-1",
        "filename": "track.mp3",
        "status": status,
        "progress": progress,
        "message": "working",
        "created_at": "2024-05-01T12:00:00Z"
    })
}

fn fast_opts() -> PollOptions {
    PollOptions {
        interval: Duration::from_millis(20),
    }
}

#[test]
fn returns_final_detail_once_job_completes() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/jobs/job-1");
        then.status(200).json_body(job_body("completed", 100.0));
    });

    let client = SeparatorClient::new(Some(&server.base_url())).unwrap();
    let mut samples = 0;
    let detail = poll_until_terminal(&client, "job-1", &fast_opts(), None, |_| samples += 1)
        .unwrap()
        .expect("poller should reach the terminal state");

    assert_eq!(detail.status, JobState::Completed);
    assert!(detail.is_terminal());
    assert_eq!(samples, 1);
}

#[test]
fn keeps_polling_until_the_job_turns_terminal() {
    let server = MockServer::start();
    let mut processing = server.mock(|when, then| {
        when.method(GET).path("/api/jobs/job-1");
        then.status(200).json_body(job_body("processing", 40.0));
    });

    let client = SeparatorClient::new(Some(&server.base_url())).unwrap();
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        let result =
            poll_until_terminal(&client, "job-1", &fast_opts(), None, |d| seen.push(d.status));
        (seen, result)
    });

    // Let a few processing samples land, then flip the backend to done.
    // The completed mock goes up before the processing one comes down so
    // every poll matches something.
    thread::sleep(Duration::from_millis(100));
    server.mock(|when, then| {
        when.method(GET).path("/api/jobs/job-1");
        then.status(200).json_body(job_body("completed", 100.0));
    });
    processing.delete();

    let (seen, result) = handle.join().unwrap();
    let detail = result.unwrap().expect("should reach terminal state");

    assert_eq!(detail.status, JobState::Completed);
    assert!(seen.contains(&JobState::Processing));
    assert_eq!(*seen.last().unwrap(), JobState::Completed);
    // Exactly one terminal sample; polling stopped there.
    assert_eq!(
        seen.iter().filter(|s| s.is_terminal()).count(),
        1,
        "poller must stop at the first terminal sample"
    );
}

#[test]
fn stop_flag_halts_polling_early() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/jobs/job-1");
        then.status(200).json_body(job_body("processing", 10.0));
    });

    let client = SeparatorClient::new(Some(&server.base_url())).unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_in_thread = stop.clone();

    let handle = thread::spawn(move || {
        poll_until_terminal(&client, "job-1", &fast_opts(), Some(&stop_in_thread), |_| {})
    });

    thread::sleep(Duration::from_millis(60));
    stop.store(true, Ordering::Relaxed);

    let result = handle.join().unwrap().unwrap();
    assert!(result.is_none(), "a stopped poll yields no final detail");
}

#[test]
fn api_errors_propagate_out_of_the_poll() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/jobs/job-1");
        then.status(404)
            .json_body(serde_json::json!({"detail": "Job not found"}));
    });

    let client = SeparatorClient::new(Some(&server.base_url())).unwrap();
    let err = poll_until_terminal(&client, "job-1", &fast_opts(), None, |_| {})
        .expect_err("missing job should fail the poll");
    assert!(err.to_string().contains("Job not found"));
}
