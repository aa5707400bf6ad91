//! Slug resolution core of the storefront engine.
//!
//! This crate provides:
//! - [`paths`]: enumeration of every id-addressed and slug-addressed route
//! - [`ContentResolver`]: product-then-page resolution of a two-segment path
//! - [`StalenessController`]: route cache with deferred resolution, background
//!   revalidation and single-flight per key
//! - [`Storefront`]: build/serve facade tying the three together
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sf_cache::MemoryCache;
//! use sf_site::{RouteKey, Storefront, StorefrontConfig};
//!
//! let storefront = Storefront::new(source, &MemoryCache::new(), StorefrontConfig::default());
//! storefront.build().await?;
//!
//! let response = storefront.page(&RouteKey::new("shop", "scarf-red"));
//! ```

mod clock;
mod error;
pub mod paths;
mod resolver;
mod route;
mod staleness;
mod storefront;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SiteError;
pub use resolver::{ContentResolver, Entity, Resolution, ResolvedContent};
pub use route::{ResolvedRoute, RouteKey, RouteKind, RouteSet};
pub use staleness::{RouteResponse, StalenessController};
pub use storefront::{BuildReport, BuildSnapshot, Storefront, StorefrontConfig};
