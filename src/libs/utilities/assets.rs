// HTTP(S) downloads for release archives and their checksum manifests.
//
// The `ureq` agent is built with automatic redirects disabled so that every
// hop goes through `Fetcher::open`, which enforces the HTTPS policy and the
// redirect bound. Bodies are streamed to disk in fixed-size chunks; the
// cancel token is polled between chunks.

use crate::errors::FetchError;
use crate::schemas::installer_config::InstallerConfig;
use crate::schemas::release::DownloadTask;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

const CHUNK_SIZE: usize = 64 * 1024;

/// Shared flag that aborts an in-flight download at the next chunk boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub max_redirects: usize,
    pub connect_timeout: Duration,
    /// Upper bound for one request including reading its body.
    pub request_timeout: Duration,
    pub allow_insecure_http: bool,
}

impl From<&InstallerConfig> for FetchOptions {
    fn from(cfg: &InstallerConfig) -> Self {
        FetchOptions {
            max_redirects: cfg.max_redirects,
            connect_timeout: cfg.connect_timeout(),
            request_timeout: cfg.request_timeout(),
            allow_insecure_http: cfg.allow_insecure_http,
        }
    }
}

pub struct Fetcher {
    agent: ureq::Agent,
    options: FetchOptions,
    cancel: CancelToken,
}

enum CopyError {
    Read(io::Error),
    Write(io::Error),
    Limit(u64),
    Cancelled,
}

impl Fetcher {
    pub fn new(options: FetchOptions, cancel: CancelToken) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("kandi-install/", env!("CARGO_PKG_VERSION")))
            .redirects(0)
            .timeout_connect(options.connect_timeout)
            .timeout(options.request_timeout)
            .build();
        Fetcher { agent, options, cancel }
    }

    /// Downloads `task.source_url` into `task.destination`.
    ///
    /// The destination is only created once a `200` response arrives. If the body
    /// cannot be fully written the partial file is removed before returning the error.
    ///
    /// # Arguments
    /// * `task`: Source URL and destination path of this download.
    ///
    /// # Returns
    /// * `Ok(u64)`: number of bytes written.
    /// * `Err(FetchError)` for a refused URL, network failure, non-200 final
    ///   status, redirect trouble, a broken body stream or cancellation.
    pub fn fetch(&self, task: &DownloadTask) -> Result<u64, FetchError> {
        log_info!("[Fetch] Downloading from: {}", task.source_url.blue());
        let response = self.open(&task.source_url)?;
        let final_url = response.get_url().to_string();

        let mut file = File::create(&task.destination).map_err(|source| FetchError::Io {
            path: task.destination.clone(),
            source,
        })?;

        let mut reader = response.into_reader();
        let written = copy_chunks(&mut reader, &mut file, &self.cancel, None)
            .and_then(|n| file.flush().map(|_| n).map_err(CopyError::Write));

        match written {
            Ok(bytes) => {
                log_debug!(
                    "[Fetch] Wrote {} bytes to {}",
                    bytes,
                    task.destination.display().to_string().green()
                );
                Ok(bytes)
            }
            Err(err) => {
                drop(file);
                discard_partial(&task.destination);
                Err(into_fetch_error(err, &final_url, &task.destination))
            }
        }
    }

    /// Fetches a small document into memory, rejecting bodies larger than `limit` bytes.
    pub fn fetch_bytes(&self, url: &str, limit: u64) -> Result<Vec<u8>, FetchError> {
        log_debug!("[Fetch] Fetching document {}", url.blue());
        let response = self.open(url)?;
        let final_url = response.get_url().to_string();
        let mut body = Vec::new();
        copy_chunks(&mut response.into_reader(), &mut body, &self.cancel, Some(limit))
            .map_err(|err| into_fetch_error(err, &final_url, Path::new("<memory>")))?;
        Ok(body)
    }

    // Issues GETs, following at most `max_redirects` redirects, until a 200 arrives.
    fn open(&self, url: &str) -> Result<ureq::Response, FetchError> {
        let mut current = self.checked_url(url)?;
        let mut hops = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            log_debug!("[Fetch] GET {}", current.as_str().dimmed());
            let response = match self.agent.get(current.as_str()).call() {
                Ok(response) => response,
                Err(ureq::Error::Status(code, _)) => return Err(FetchError::BadStatus(code)),
                Err(ureq::Error::Transport(transport)) => {
                    return Err(FetchError::Network {
                        url: current.to_string(),
                        source: Box::new(transport),
                    });
                }
            };

            let status = response.status();
            match status {
                200 => return Ok(response),
                301 | 302 | 303 | 307 | 308 => {
                    let location = response
                        .header("location")
                        .ok_or(FetchError::MissingLocation(status))?
                        .to_string();
                    if hops >= self.options.max_redirects {
                        return Err(FetchError::TooManyRedirects(hops));
                    }
                    hops += 1;
                    let next = current.join(&location).map_err(|e| FetchError::InvalidUrl {
                        url: location.clone(),
                        reason: e.to_string(),
                    })?;
                    log_debug!("[Fetch] HTTP {} redirect {} -> {}", status, hops, next.as_str().dimmed());
                    current = self.checked_url(next.as_str())?;
                }
                other => return Err(FetchError::BadStatus(other)),
            }
        }
    }

    fn checked_url(&self, raw: &str) -> Result<Url, FetchError> {
        let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "https" => Ok(url),
            "http" if self.options.allow_insecure_http => Ok(url),
            "http" => Err(FetchError::InsecureUrl(raw.to_string())),
            other => Err(FetchError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

fn copy_chunks<R: Read + ?Sized, W: Write>(
    reader: &mut R,
    writer: &mut W,
    cancel: &CancelToken,
    limit: Option<u64>,
) -> Result<u64, CopyError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Err(CopyError::Cancelled);
        }
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        total += n as u64;
        if let Some(max) = limit {
            if total > max {
                return Err(CopyError::Limit(max));
            }
        }
        writer.write_all(&buf[..n]).map_err(CopyError::Write)?;
    }
}

fn into_fetch_error(err: CopyError, url: &str, path: &Path) -> FetchError {
    match err {
        CopyError::Read(source) => FetchError::Stream { url: url.to_string(), source },
        CopyError::Write(source) => FetchError::Io { path: path.to_path_buf(), source },
        CopyError::Limit(max) => FetchError::TooLarge(max),
        CopyError::Cancelled => FetchError::Cancelled,
    }
}

// Best effort: a failed removal must not mask the download error.
fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log_debug!("[Fetch] Removed partial download {}", path.display()),
        Err(e) => log_debug!("[Fetch] Could not remove partial download {}: {}", path.display(), e),
    }
}
