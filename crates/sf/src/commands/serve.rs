//! `sf serve` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use sf_cache::{Cache, FileCache, MemoryCache};
use sf_config::{CliSettings, Config};
use sf_server::{run_server, server_config_from_config};
use sf_site::{Storefront, StorefrontConfig};

use crate::commands::content_source;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover storefront.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Content API base URL (overrides config).
    #[arg(long, env = "STOREFRONT_SOURCE_URL")]
    source_url: Option<String>,

    /// Revalidation interval in seconds (overrides config).
    #[arg(long)]
    revalidate: Option<u64>,

    /// Enable verbose output (request and regeneration logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable the disk route cache (default: enabled).
    #[arg(long)]
    cache: Option<bool>,

    /// Disable the disk route cache.
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the initial build fails or
    /// the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cache_enabled = self.resolve_cache_enabled();
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            base_url: self.source_url,
            cache_enabled,
            revalidate_secs: self.revalidate,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(path = ?config.config_path, "Loaded configuration");
        let source = content_source(&config)?;

        let cache: Box<dyn Cache> = if config.cache_resolved.enabled {
            ensure_project_dir(&config.cache_resolved.project_dir)?;
            let cache_dir = config.cache_resolved.cache_dir();
            output.info(&format!("Cache directory: {}", cache_dir.display()));
            Box::new(FileCache::new(cache_dir, version))
        } else {
            output.info("Cache: in-memory");
            Box::new(MemoryCache::new())
        };

        if let Some(source_config) = &config.source {
            output.info(&format!("Content source: {}", source_config.base_url));
        }
        output.info(&format!(
            "Revalidate interval: {}s",
            config.revalidate.interval_secs
        ));

        let storefront_config = StorefrontConfig::default()
            .with_revalidate_interval(config.revalidate.interval())
            .with_version(version);
        let storefront = Arc::new(Storefront::new(source, cache.as_ref(), storefront_config));

        let report = storefront.build().await?;
        output.success(&format!(
            "Built {} id-addressed and {} slug-addressed routes in {}ms",
            report.id_routes,
            report.slug_routes,
            report.elapsed.as_millis()
        ));

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        let server_config = server_config_from_config(&config, version.to_owned());
        run_server(server_config, storefront)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }

    /// Resolve `cache_enabled` from --cache/--no-cache flags.
    fn resolve_cache_enabled(&self) -> Option<bool> {
        self.no_cache.then_some(false).or(self.cache)
    }
}

/// Ensure the `.storefront/` project directory exists with a `.gitignore`.
fn ensure_project_dir(project_dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(project_dir)?;

    let gitignore_path = project_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let _ = std::fs::write(&gitignore_path, "# Automatically created by sf\n*\n");
    }

    Ok(())
}
