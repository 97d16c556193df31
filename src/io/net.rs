use crate::{
    error::Result,
    io::progress::{emit_download_progress, emit_upload_progress},
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::{
    fs,
    fs::File,
    io::{Read, Write},
    path::Path,
    thread,
    time::Duration,
};

/// Fixed transport-level retry count. No backoff.
pub const TRANSPORT_RETRIES: usize = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

pub fn http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60 * 60))
        .build()
        .expect("reqwest client build failed")
}

/// Send a request, retrying transport failures up to [`TRANSPORT_RETRIES`]
/// times with a fixed delay. Requests whose body cannot be cloned (streamed
/// uploads) are sent exactly once. HTTP error statuses are not retried.
pub fn send_with_retry(req: RequestBuilder) -> reqwest::Result<Response> {
    for attempt in 1..=TRANSPORT_RETRIES {
        let Some(this_try) = req.try_clone() else {
            break;
        };
        match this_try.send() {
            Ok(resp) => return Ok(resp),
            Err(err) => {
                tracing::warn!(
                    attempt,
                    "transport error, retrying in {:?}: {err}",
                    RETRY_DELAY
                );
                thread::sleep(RETRY_DELAY);
            }
        }
    }
    req.send()
}

/// Stream a checked response body to `dest`, reporting byte progress.
///
/// Writes to a `.part` sibling first and renames into place only once the
/// body has been fully received. Returns the number of bytes written.
pub fn download_with_progress(mut resp: Response, dest: &Path) -> Result<u64> {
    let tmp = dest.with_extension("part");

    let total = resp.content_length().unwrap_or(0);

    emit_download_progress(0, total);

    let mut file = File::create(&tmp)?;
    let mut downloaded: u64 = 0;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = resp.read(&mut buf)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])?;
        downloaded += n as u64;
        emit_download_progress(downloaded, total);
    }
    file.flush()?;

    if dest.exists() {
        fs::remove_file(dest).ok();
    }

    fs::rename(&tmp, dest)?;

    emit_download_progress(total.max(downloaded), total.max(downloaded));

    Ok(downloaded)
}

/// `Read` adapter that reports upload progress as the transport consumes
/// the wrapped reader.
pub struct ProgressReader<R> {
    inner: R,
    sent: u64,
    total: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, total: u64) -> Self {
        emit_upload_progress(0, total);
        Self {
            inner,
            sent: 0,
            total,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.sent += n as u64;
        emit_upload_progress(self.sent, self.total);
        Ok(n)
    }
}
