use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use gutenpub_logging::{book_debug, book_info, book_warn};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::persist::AtomicFileWriter;
use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 5,
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Blocking HTTP client shared by the document and asset fetchers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    settings: FetchSettings,
}

impl HttpClient {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    /// GET `url`; any non-2xx status is an error.
    pub fn get(&self, url: &Url) -> Result<FetchOutput, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("bad status for '{url}': {status}"),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, Some(content_len)));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        response
            .take(max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(map_body_error)?;
        if bytes.len() as u64 > max_bytes {
            return Err(too_large(max_bytes, None));
        }

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            content_type,
            byte_len: bytes.len() as u64,
        };
        Ok(FetchOutput { bytes, metadata })
    }
}

fn too_large(max_bytes: u64, actual: Option<u64>) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge { max_bytes, actual },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn map_body_error(err: io::Error) -> FetchError {
    if err.kind() == io::ErrorKind::TimedOut {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOrigin {
    Cache,
    Network,
}

/// Raw source bytes plus what is needed to resolve relative links in them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub bytes: Vec<u8>,
    pub base_url: Url,
    /// Only known for network responses.
    pub content_type: Option<String>,
    pub origin: DocumentOrigin,
}

/// Return the cached copy at `cache_path` if it is readable, otherwise download
/// `url` and leave a copy at `cache_path`.
///
/// The base URL is always the source URL, so a cached and a fresh run resolve
/// images identically. Failing to write the cache copy only logs a warning.
pub fn fetch_or_load_document(
    url: &str,
    cache_path: &Path,
    client: &HttpClient,
) -> Result<SourceDocument, FetchError> {
    let base_url = Url::parse(url)
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, format!("'{url}': {err}")))?;

    match fs::read(cache_path) {
        Ok(bytes) => {
            book_info!(
                "Loaded source document from cache {:?} ({} bytes)",
                cache_path,
                bytes.len()
            );
            return Ok(SourceDocument {
                bytes,
                base_url,
                content_type: None,
                origin: DocumentOrigin::Cache,
            });
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            book_debug!("No cached document at {:?}, fetching {}", cache_path, url);
        }
        Err(err) => {
            book_warn!(
                "Cached document {:?} is unreadable ({}), fetching {}",
                cache_path,
                err,
                url
            );
        }
    }

    let output = client.get(&base_url)?;
    book_info!(
        "Fetched source document {} ({} bytes)",
        output.metadata.final_url,
        output.metadata.byte_len
    );

    match AtomicFileWriter::for_target(cache_path) {
        Some((writer, filename)) => {
            if let Err(err) = writer.write(&filename, &output.bytes) {
                book_warn!("Failed to save document to {:?}: {}", cache_path, err);
            }
        }
        None => book_warn!("Cache path {:?} has no file name, not saving", cache_path),
    }

    Ok(SourceDocument {
        bytes: output.bytes,
        base_url,
        content_type: output.metadata.content_type,
        origin: DocumentOrigin::Network,
    })
}
