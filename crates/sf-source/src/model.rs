//! Content model shared by every source backend.
//!
//! All types round-trip through JSON so resolved entities can be cached and
//! compared byte-for-byte.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::slug::derive_product_slug;

/// Kind of a top-level container.
///
/// The set of kinds is open: the content API may introduce new kinds and they
/// must round-trip unchanged. The storefront only gives meaning to
/// [`ContainerKind::product_page`] and [`ContainerKind::blog_home`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerKind(String);

impl ContainerKind {
    const PRODUCT_PAGE: &'static str = "productPage";
    const BLOG_HOME: &'static str = "blogHome";

    /// Create a kind from its wire name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Page-bearing container. Every product is reachable under each of these.
    #[must_use]
    pub fn product_page() -> Self {
        Self::new(Self::PRODUCT_PAGE)
    }

    /// Blog home container. Blog pages hang off the (single) blog home.
    #[must_use]
    pub fn blog_home() -> Self {
        Self::new(Self::BLOG_HOME)
    }

    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Top-level navigational entity identified by a unique slug.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Unique slug (first URL segment).
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Container kind.
    pub kind: ContainerKind,
}

/// Sellable product.
///
/// A product has an opaque `id` and a derived slug (see [`Product::slug`]).
/// Products are not scoped to a container: any container slug may prefix any
/// product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Opaque identifier assigned by the content API.
    pub id: String,
    /// Product title.
    pub title: String,
    /// Variant label (e.g. a color), part of the derived slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Unit price.
    pub price: f64,
    /// Rich-text description document.
    #[serde(default)]
    pub description: serde_json::Value,
    /// Image URLs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl Product {
    /// Human-readable slug derived from the product fields.
    #[must_use]
    pub fn slug(&self) -> String {
        derive_product_slug(&self.title, self.variant.as_deref())
    }
}

/// Editorial document addressed by its own slug.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page slug (second URL segment).
    pub slug: String,
    /// Page title.
    pub title: String,
    /// Rich-text content document, opaque to the storefront.
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Navigation entry of the site layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    /// Display title.
    pub title: String,
    /// Link target path.
    pub path: String,
}

/// Site-wide layout content required by every route.
///
/// Fetched once per resolution. It never takes part in route identity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Site title.
    #[serde(default)]
    pub title: String,
    /// Navigation entries.
    #[serde(default)]
    pub navigation: Vec<NavLink>,
    /// Any other layout fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
