//! `sf routes` command implementation.

use std::path::PathBuf;

use clap::Args;
use sf_config::{CliSettings, Config};
use sf_site::{RouteKind, paths};

use crate::commands::content_source;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the routes command.
#[derive(Args)]
pub(crate) struct RoutesArgs {
    /// Path to configuration file (default: auto-discover storefront.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content API base URL (overrides config).
    #[arg(long, env = "STOREFRONT_SOURCE_URL")]
    source_url: Option<String>,

    /// Print the route set as JSON.
    #[arg(long)]
    json: bool,
}

impl RoutesArgs {
    /// Execute the routes command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or enumeration fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            base_url: self.source_url,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let source = content_source(&config)?;

        let routes = paths::enumerate(source.as_ref()).await?;

        if self.json {
            output.print(&serde_json::to_string_pretty(&routes)?);
            return Ok(());
        }

        output.highlight(&format!("Id-addressed routes ({})", routes.id_routes().len()));
        for route in routes.id_routes() {
            output.route(&route.key().to_string(), kind_label(route.kind));
        }
        output.highlight(&format!(
            "Slug-addressed routes ({})",
            routes.slug_routes().len()
        ));
        for route in routes.slug_routes() {
            output.route(&route.key().to_string(), kind_label(route.kind));
        }

        Ok(())
    }
}

fn kind_label(kind: RouteKind) -> &'static str {
    match kind {
        RouteKind::Product => "product",
        RouteKind::Page => "page",
        RouteKind::ProductById => "product-by-id",
    }
}
