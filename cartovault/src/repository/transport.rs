//! Transport collaborator: fetching documents and downloading files.
//!
//! [`HttpTransport`] streams over reqwest's blocking client. Tests and
//! embedders can supply their own [`Transport`].

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{ResourceError, ResourceResult};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Progress notification: `(bytes_transferred, total_bytes)`; total is `None` when unknown.
///
/// Invoked synchronously on the downloading thread; must not block.
pub type TransferProgress<'a> = &'a (dyn Fn(u64, Option<u64>) + Sync);

/// Network access used by the repository client.
pub trait Transport: Send + Sync {
    /// Fetch a whole document into memory.
    fn fetch(&self, url: &str) -> ResourceResult<Vec<u8>>;

    /// Download `url` into `dest`, reporting progress.
    ///
    /// On failure no file is left at `dest`. Returns the number of bytes written.
    fn download(&self, url: &str, dest: &Path, progress: TransferProgress<'_>)
        -> ResourceResult<u64>;
}

/// HTTP transport backed by reqwest's blocking client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> ResourceResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> ResourceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cartovault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResourceError::transfer("<client>", e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn send(&self, url: &str) -> ResourceResult<reqwest::blocking::Response> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                ResourceError::transfer(
                    url,
                    format!("timed out after {}s", self.timeout.as_secs()),
                )
            } else {
                ResourceError::transfer(url, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResourceError::transfer(
                url,
                format!("GET request failed with status {}", status),
            ));
        }
        Ok(response)
    }

    fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        progress: TransferProgress<'_>,
    ) -> ResourceResult<u64> {
        let mut response = self.send(url)?;
        let total = response.content_length();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ResourceError::io(parent, e))?;
        }
        let file = File::create(dest).map_err(|e| ResourceError::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = 0u64;

        progress(0, total);
        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| ResourceError::transfer(url, format!("read error: {}", e)))?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| ResourceError::io(dest, e))?;
            downloaded += bytes_read as u64;
            progress(downloaded, total);
        }

        writer.flush().map_err(|e| ResourceError::io(dest, e))?;
        Ok(downloaded)
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> ResourceResult<Vec<u8>> {
        let response = self.send(url)?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ResourceError::transfer(url, e.to_string()))
    }

    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: TransferProgress<'_>,
    ) -> ResourceResult<u64> {
        let result = self.stream_to_file(url, dest, progress);
        if result.is_err() && dest.exists() {
            fs::remove_file(dest).ok();
        }
        result
    }
}
