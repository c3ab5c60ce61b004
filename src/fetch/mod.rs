// src/fetch/mod.rs
//! Obtains the archive bytes, either from the remote file host or from disk,
//! before any processing starts.

pub mod drive;

use crate::error::FetchError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use tokio::{fs, time::sleep};
use tracing::{error, info, instrument, warn};

pub use drive::{download_url, extract_file_id, DEFAULT_DOWNLOAD_ENDPOINT};

/// ZIP local file header magic.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Where the archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveLocation {
    /// A Google Drive file id.
    Drive(String),
    Path(PathBuf),
}

impl ArchiveLocation {
    /// Existing paths win; anything else is treated as a Drive id or share URL.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let path = PathBuf::from(input);
        if path.exists() {
            return Ok(ArchiveLocation::Path(path));
        }
        extract_file_id(input).map(ArchiveLocation::Drive)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub timeout_secs: u64,
    /// Base URL that download requests go to.
    pub endpoint: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            timeout_secs: 120,
            endpoint: DEFAULT_DOWNLOAD_ENDPOINT.to_string(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

/// HTTP client configured for the file host: cookie store for the download
/// confirmation handshake, and the policy's request timeout.
pub fn build_client(policy: &RetryPolicy) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(policy.timeout_secs))
        .build()?)
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Returns the complete archive bytes for `location`.
///
/// Remote downloads are retried with exponential backoff; a response that is
/// not a ZIP counts as a failed attempt. Local files are read once.
#[instrument(level = "info", skip(client, policy))]
pub async fn fetch_archive_bytes(
    client: &Client,
    location: &ArchiveLocation,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, FetchError> {
    let file_id = match location {
        ArchiveLocation::Path(path) => {
            let bytes = fs::read(path).await?;
            info!(path = %path.display(), bytes = bytes.len(), "read local archive");
            return Ok(bytes);
        }
        ArchiveLocation::Drive(id) => id,
    };

    let mut attempts = 0;
    loop {
        attempts += 1;
        let result = match drive::download_once(client, &policy.endpoint, file_id).await {
            Ok(bytes) if is_zip(&bytes) => Ok(bytes),
            Ok(bytes) => Err(FetchError::NotAnArchive(bytes.len())),
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => {
                info!(file_id = %file_id, bytes = bytes.len(), attempts, "downloaded archive");
                return Ok(bytes);
            }
            Err(e) if attempts <= policy.max_retries => {
                let delay = policy.backoff(attempts);
                warn!(file_id = %file_id, attempt = attempts, delay_ms = delay.as_millis() as u64, error = %e, "retrying");
                sleep(delay).await;
            }
            Err(e) => {
                error!(file_id = %file_id, error = %e, "exhausted retries");
                return Err(FetchError::Exhausted {
                    attempts,
                    last: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const HTML: &str = "text/html; charset=utf-8";
    const BINARY: &str = "application/octet-stream";

    /// Serves `responses` in order, one per connection, repeating the last one.
    /// Returns the endpoint URL and the request lines seen so far.
    async fn serve(responses: Vec<(&'static str, Vec<u8>)>) -> Result<(String, Arc<Mutex<Vec<String>>>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            let mut served = 0usize;
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            request.extend_from_slice(&chunk[..n]);
                            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }
                let line = String::from_utf8_lossy(&request)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                log.lock().unwrap().push(line);

                let (content_type, body) = &responses[served.min(responses.len() - 1)];
                served += 1;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    content_type,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            }
        });
        Ok((format!("http://{}/uc", addr), seen))
    }

    fn fast_policy(endpoint: String, max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff_ms: 1,
            timeout_secs: 5,
            endpoint,
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            initial_backoff_ms: 100,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(800));
    }

    #[test]
    fn test_is_zip() {
        assert!(is_zip(b"PK\x03\x04rest"));
        assert!(!is_zip(b"<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_local_path_location() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(b"PK\x03\x04payload")?;
        let path = tmp.path().to_string_lossy().to_string();

        let location = ArchiveLocation::parse(&path)?;
        assert_eq!(location, ArchiveLocation::Path(tmp.path().to_path_buf()));

        let client = Client::new();
        let bytes = fetch_archive_bytes(&client, &location, &RetryPolicy::default()).await?;
        assert_eq!(bytes, b"PK\x03\x04payload");
        Ok(())
    }

    #[tokio::test]
    async fn test_drive_download_retries_and_confirms() -> Result<()> {
        let (endpoint, seen) = serve(vec![
            (HTML, b"<p>Too many users have viewed this file</p>".to_vec()),
            (
                HTML,
                br#"<a href="/uc?export=download&amp;confirm=t0k_1&amp;id=abcdefghijkl">Download anyway</a>"#.to_vec(),
            ),
            (BINARY, b"PK\x03\x04archive".to_vec()),
        ])
        .await?;
        let policy = fast_policy(endpoint, 3);
        let client = build_client(&policy)?;
        let location = ArchiveLocation::Drive("abcdefghijkl".to_string());

        let bytes = fetch_archive_bytes(&client, &location, &policy).await?;
        assert_eq!(bytes, b"PK\x03\x04archive");

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].contains("id=abcdefghijkl"));
        assert!(seen[2].contains("confirm=t0k_1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_zip_responses_exhaust_retries() -> Result<()> {
        let (endpoint, seen) = serve(vec![(BINARY, b"not an archive".to_vec())]).await?;
        let policy = fast_policy(endpoint, 2);
        let client = build_client(&policy)?;
        let location = ArchiveLocation::Drive("abcdefghijkl".to_string());

        let err = fetch_archive_bytes(&client, &location, &policy)
            .await
            .expect_err("should give up");
        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("not a ZIP"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(seen.lock().unwrap().len(), 3);
        Ok(())
    }

    #[test]
    fn test_parse_drive_location() {
        let location = ArchiveLocation::parse("https://drive.google.com/file/d/1A0yeEBAvLkX64PlatHboPAHhHVIcJICw/view")
            .expect("share url");
        assert_eq!(
            location,
            ArchiveLocation::Drive("1A0yeEBAvLkX64PlatHboPAHhHVIcJICw".to_string())
        );
    }
}
