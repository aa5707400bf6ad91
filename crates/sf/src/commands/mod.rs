//! CLI command implementations.

pub(crate) mod routes;
pub(crate) mod serve;

use std::sync::Arc;

use sf_config::Config;
use sf_source::ContentSource;
use sf_source_http::{HttpSource, HttpSourceConfig};

use crate::error::CliError;

pub(crate) use routes::RoutesArgs;
pub(crate) use serve::ServeArgs;

/// Create the content source described by the `[source]` section.
fn content_source(config: &Config) -> Result<Arc<dyn ContentSource>, CliError> {
    let source = config.require_source()?;
    Ok(Arc::new(HttpSource::new(HttpSourceConfig {
        base_url: source.base_url.clone(),
        access_token: source.access_token.clone(),
        timeout: source.timeout(),
    })))
}
