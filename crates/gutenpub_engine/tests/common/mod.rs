#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use gutenpub_engine::{AssetResolver, FailureKind, FetchError, ResolveError, ResolvedAsset};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

/// A wiremock server driven from blocking test code.
///
/// The runtime is only entered while mounting or inspecting, so the blocking
/// HTTP client never runs inside an async context.
pub struct MockSite {
    pub server: MockServer,
    runtime: tokio::runtime::Runtime,
}

impl MockSite {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }

    pub fn serve(&self, route: &str, status: u16, body: &[u8], content_type: &str) {
        let mock = Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body.to_vec(), content_type));
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn serve_delayed(&self, route: &str, delay: Duration) {
        let mock = Mock::given(method("GET")).and(path(route)).respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_string("slow"),
        );
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn hits(&self, route: &str) -> usize {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == route)
            .count()
    }
}

/// Resolver that never touches the network: every URL resolves to
/// `../images/{last segment}` unless listed as failing.
#[derive(Default)]
pub struct FakeResolver {
    pub failing: Vec<String>,
    pub calls: HashMap<String, usize>,
}

impl FakeResolver {
    pub fn failing(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.values().sum()
    }
}

impl AssetResolver for FakeResolver {
    fn resolve(&mut self, url: &Url) -> Result<ResolvedAsset, ResolveError> {
        *self.calls.entry(url.to_string()).or_default() += 1;
        if self.failing.iter().any(|failing| failing == url.as_str()) {
            return Err(ResolveError::Fetch(FetchError {
                kind: FailureKind::HttpStatus(404),
                message: format!("bad status for '{url}'"),
            }));
        }
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("x");
        Ok(ResolvedAsset {
            local_path: PathBuf::from("cache").join(name),
            packaged_path: format!("../images/{name}"),
        })
    }
}
