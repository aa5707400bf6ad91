//! REST content API backend for the storefront engine.
//!
//! [`HttpSource`] implements [`ContentSource`] against a JSON REST API:
//!
//! | Operation          | Request                             |
//! |--------------------|-------------------------------------|
//! | `list_containers`  | `GET {base}/containers?kind={kind}` |
//! | `list_products`    | `GET {base}/products`               |
//! | `product_by_id`    | `GET {base}/products/{id}`          |
//! | `page_by_slug`     | `GET {base}/pages/{slug}`           |
//! | `layout`           | `GET {base}/layout`                 |
//! | `list_blog_pages`  | `GET {base}/blog/pages`             |
//!
//! A `404` on a single-entity endpoint is a miss (`Ok(None)`); on a collection
//! endpoint it is an error. Requests use the blocking `ureq` agent on the
//! tokio blocking pool.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use sf_source_http::{HttpSource, HttpSourceConfig};
//!
//! let source = HttpSource::new(HttpSourceConfig {
//!     base_url: "https://cms.example.com/api".to_owned(),
//!     access_token: Some("secret".to_owned()),
//!     timeout: Duration::from_secs(30),
//! });
//! let products = source.list_products().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use sf_source::{
    Container, ContainerKind, ContentSource, ErrorStatus, Layout, Page, Product, SourceError,
    SourceErrorKind,
};
use ureq::Agent;

/// Backend identifier attached to errors.
const BACKEND: &str = "Http";

/// Characters left unescaped in a path segment. Dots are escaped so that `..`
/// never reaches the API as a relative segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'~');

/// Connection settings for [`HttpSource`].
#[derive(Clone, Debug)]
pub struct HttpSourceConfig {
    /// API base URL (trailing slash optional).
    pub base_url: String,
    /// Bearer token, if the API requires one.
    pub access_token: Option<String>,
    /// Global timeout per request.
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Content source backed by a JSON REST API.
pub struct HttpSource {
    inner: Arc<Client>,
}

/// Shared blocking client, moved into blocking tasks.
struct Client {
    agent: Agent,
    base_url: String,
    auth_header: Option<String>,
}

impl HttpSource {
    /// Create a source from connection settings.
    #[must_use]
    pub fn new(config: HttpSourceConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self::with_agent(config, agent)
    }

    fn with_agent(config: HttpSourceConfig, agent: Agent) -> Self {
        Self {
            inner: Arc::new(Client {
                agent,
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                auth_header: config.access_token.map(|token| format!("Bearer {token}")),
            }),
        }
    }

    /// GET a resource, mapping `404` to `None`.
    async fn fetch<T>(&self, resource: String) -> Result<Option<T>, SourceError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = Arc::clone(&self.inner);
        let task_resource = resource.clone();
        tokio::task::spawn_blocking(move || client.get_json(&task_resource))
            .await
            .map_err(|e| {
                SourceError::new(SourceErrorKind::Other)
                    .with_backend(BACKEND)
                    .with_resource(resource)
                    .with_source(e)
            })?
    }

    /// GET a resource that must exist.
    async fn fetch_required<T>(&self, resource: String) -> Result<T, SourceError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.fetch(resource.clone()).await?.ok_or_else(|| {
            SourceError::new(SourceErrorKind::NotFound)
                .with_backend(BACKEND)
                .with_resource(resource)
        })
    }
}

impl Client {
    fn url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.base_url)
    }

    fn get_json<T: DeserializeOwned>(&self, resource: &str) -> Result<Option<T>, SourceError> {
        let url = self.url(resource);
        tracing::debug!(url = %url, "Fetching from content API");

        let mut request = self.agent.get(&url).header("Accept", "application/json");
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request.call().map_err(|e| transport_error(e, resource))?;
        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if let Some(error) = status_error(status) {
            return Err(error.with_resource(resource));
        }

        let mut body = response.into_body();
        body.read_json::<T>().map(Some).map_err(|e| {
            SourceError::new(SourceErrorKind::Decode)
                .with_backend(BACKEND)
                .with_resource(resource)
                .with_source(e)
        })
    }
}

/// Percent-encode a single path segment.
fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Map a non-success HTTP status to an error. Returns `None` for 2xx/3xx.
fn status_error(status: u16) -> Option<SourceError> {
    let (kind, retry) = match status {
        200..=399 => return None,
        401 | 403 => (SourceErrorKind::PermissionDenied, ErrorStatus::Permanent),
        404 => (SourceErrorKind::NotFound, ErrorStatus::Permanent),
        408 => (SourceErrorKind::Timeout, ErrorStatus::Temporary),
        429 => (SourceErrorKind::RateLimited, ErrorStatus::Persistent),
        400..=499 => (SourceErrorKind::InvalidRequest, ErrorStatus::Permanent),
        500..=599 => (SourceErrorKind::Unavailable, ErrorStatus::Persistent),
        _ => (SourceErrorKind::Other, ErrorStatus::Permanent),
    };
    Some(
        SourceError::new(kind)
            .with_status(retry)
            .with_backend(BACKEND)
            .with_source(HttpStatus(status)),
    )
}

/// Map a transport failure (DNS, TLS, connect, timeout) to an error.
fn transport_error(error: ureq::Error, resource: &str) -> SourceError {
    let (kind, retry) = match error {
        ureq::Error::Timeout(_) => (SourceErrorKind::Timeout, ErrorStatus::Temporary),
        _ => (SourceErrorKind::Unavailable, ErrorStatus::Temporary),
    };
    SourceError::new(kind)
        .with_status(retry)
        .with_backend(BACKEND)
        .with_resource(resource)
        .with_source(error)
}

/// Unexpected HTTP status returned by the content API.
#[derive(Debug)]
struct HttpStatus(u16);

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}", self.0)
    }
}

impl std::error::Error for HttpStatus {}

#[async_trait]
impl ContentSource for HttpSource {
    async fn list_containers(&self, kind: &ContainerKind) -> Result<Vec<Container>, SourceError> {
        self.fetch_required(format!("containers?kind={}", segment(kind.as_str())))
            .await
    }

    async fn list_products(&self) -> Result<Vec<Product>, SourceError> {
        self.fetch_required("products".to_owned()).await
    }

    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, SourceError> {
        self.fetch(format!("products/{}", segment(id))).await
    }

    async fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, SourceError> {
        self.fetch(format!("pages/{}", segment(slug))).await
    }

    async fn layout(&self) -> Result<Layout, SourceError> {
        self.fetch_required("layout".to_owned()).await
    }

    async fn list_blog_pages(&self) -> Result<Vec<Page>, SourceError> {
        self.fetch_required("blog/pages".to_owned()).await
    }
}
