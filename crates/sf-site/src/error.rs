//! Error types for site building.

use sf_source::SourceError;

/// Error returned when a build fails.
///
/// A failed build never replaces the published snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Content source unreachable or erroring during enumeration or
    /// prerendering.
    #[error("Content source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
}
