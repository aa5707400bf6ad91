//! Content source abstraction for the storefront engine.
//!
//! This crate provides a [`ContentSource`] trait for abstracting access to the
//! remote content API that owns products, editorial pages and their slug-bearing
//! containers. This enables:
//!
//! - **Unit testing** without a live content API
//! - **Backend flexibility** (hosted CMS, REST gateway, fixtures)
//! - **Clean separation** between route resolution logic and network I/O
//!
//! # Architecture
//!
//! The crate provides:
//! - Data model: [`Container`], [`Product`], [`Page`], [`Layout`]
//! - [`ContentSource`] trait with read-only, idempotent fetch operations
//! - [`derive_product_slug`] for the human-readable product slug
//! - [`MockSource`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use sf_source::{ContainerKind, ContentSource};
//!
//! let containers = source.list_containers(&ContainerKind::product_page()).await?;
//! for container in containers {
//!     println!("{}: {}", container.slug, container.title);
//! }
//! ```

#[cfg(feature = "mock")]
mod mock;
mod model;
mod slug;
mod source;

#[cfg(feature = "mock")]
pub use mock::{MockSource, Operation};
pub use model::{Container, ContainerKind, Layout, NavLink, Page, Product};
pub use slug::derive_product_slug;
pub use source::{ContentSource, ErrorStatus, SourceError, SourceErrorKind};
