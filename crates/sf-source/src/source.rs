//! Content source trait and error types.
//!
//! Provides the core [`ContentSource`] trait for abstracting the remote content
//! API, along with [`SourceError`] for unified error handling across backends.
//!
//! # Misses Are Not Errors
//!
//! Single-entity lookups return `Ok(None)` when the entity does not exist.
//! [`SourceError`] is reserved for the source itself failing (unreachable,
//! rejecting credentials, returning garbage). Callers must propagate it.

use async_trait::async_trait;

use crate::model::{Container, ContainerKind, Layout, Page, Product};

/// Semantic error categories (inspired by Object Store + `OpenDAL`).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum SourceErrorKind {
    /// Endpoint or collection does not exist (misconfigured source).
    NotFound,
    /// Credentials rejected.
    PermissionDenied,
    /// Request rejected as malformed.
    InvalidRequest,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Too many requests.
    RateLimited,
    /// Operation timed out.
    Timeout,
    /// Response could not be decoded.
    Decode,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance (from `OpenDAL`).
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub enum ErrorStatus {
    /// Don't retry (config error, invalid request).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (rate limited, service unavailable).
    Persistent,
}

/// Content source error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct SourceError {
    kind: SourceErrorKind,
    status: ErrorStatus,
    resource: Option<String>,
    backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    /// Create a new source error.
    #[must_use]
    pub fn new(kind: SourceErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            resource: None,
            backend: None,
            source: None,
        }
    }

    /// Create an "unavailable" error, the usual transient failure.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(SourceErrorKind::Unavailable).with_status(ErrorStatus::Persistent)
    }

    /// Attach the resource being fetched (e.g. `products/p1`).
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Semantic error category.
    #[must_use]
    pub fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    /// Retry guidance.
    #[must_use]
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Resource context (if any).
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Backend identifier (if any).
    #[must_use]
    pub fn backend(&self) -> Option<&'static str> {
        self.backend
    }

    /// Whether retrying later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.status != ErrorStatus::Permanent
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (resource: products/p1)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            SourceErrorKind::NotFound => "Not found",
            SourceErrorKind::PermissionDenied => "Permission denied",
            SourceErrorKind::InvalidRequest => "Invalid request",
            SourceErrorKind::Unavailable => "Unavailable",
            SourceErrorKind::RateLimited => "Rate limited",
            SourceErrorKind::Timeout => "Timeout",
            SourceErrorKind::Decode => "Decode error",
            SourceErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(resource) = &self.resource {
            write!(f, " (resource: {resource})")?;
        }

        Ok(())
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Read-only access to the remote content API.
///
/// Every operation is idempotent and may fail with a transient
/// [`SourceError`]. There are no transactional guarantees across calls.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List all containers of the given kind.
    async fn list_containers(&self, kind: &ContainerKind) -> Result<Vec<Container>, SourceError>;

    /// List all products with the fields needed for slug derivation.
    async fn list_products(&self) -> Result<Vec<Product>, SourceError>;

    /// Fetch a product by its opaque id.
    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, SourceError>;

    /// Fetch the product whose derived slug equals `slug`.
    ///
    /// Slugs are derived rather than stored, so the default implementation
    /// lists all products and compares derived slugs. When several products
    /// derive the same slug the first one in source order wins.
    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, SourceError> {
        let products = self.list_products().await?;
        Ok(products.into_iter().find(|product| product.slug() == slug))
    }

    /// Fetch an editorial page by its own slug.
    async fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, SourceError>;

    /// Fetch the site-wide layout.
    async fn layout(&self) -> Result<Layout, SourceError>;

    /// Fetch the blog home container, if one exists.
    async fn blog_home(&self) -> Result<Option<Container>, SourceError> {
        let homes = self.list_containers(&ContainerKind::blog_home()).await?;
        Ok(homes.into_iter().next())
    }

    /// List all blog pages.
    async fn list_blog_pages(&self) -> Result<Vec<Page>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Reset;

    #[test]
    fn test_error_display_full() {
        let err = SourceError::unavailable()
            .with_backend("Http")
            .with_resource("products/p1")
            .with_source(Reset);

        assert_eq!(
            err.to_string(),
            "[Http] Unavailable: connection reset (resource: products/p1)"
        );
    }

    #[test]
    fn test_error_display_minimal() {
        let err = SourceError::new(SourceErrorKind::Decode);
        assert_eq!(err.to_string(), "Decode error");
    }

    #[test]
    fn test_unavailable_is_transient() {
        let err = SourceError::unavailable();
        assert_eq!(err.kind(), SourceErrorKind::Unavailable);
        assert_eq!(err.status(), ErrorStatus::Persistent);
        assert!(err.is_transient());
    }

    #[test]
    fn test_default_status_is_permanent() {
        let err = SourceError::new(SourceErrorKind::PermissionDenied);
        assert_eq!(err.status(), ErrorStatus::Permanent);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_downcast_source() {
        let err = SourceError::new(SourceErrorKind::Other).with_source(Reset);
        assert!(err.downcast_source::<Reset>().is_some());
        assert!(std::error::Error::source(&err).is_some());
    }
}
