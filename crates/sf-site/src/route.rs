//! Route identity.
//!
//! A route is a two-segment path `/{container_slug}/{leaf}`. The leaf is a raw
//! product id, a derived product slug or a page slug; nothing in the URL says
//! which. [`RouteKind`] records what the Slug Index Builder enumerated it as.

use std::collections::HashSet;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Characters left unescaped in a cache key segment. `/` and `%` are always
/// escaped, so distinct segment pairs never share a key.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// What an enumerated route was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteKind {
    /// Slug-addressed product (leaf is a derived product slug).
    Product,
    /// Slug-addressed blog page (leaf is the page slug).
    Page,
    /// Id-addressed product (leaf is the raw product id).
    ProductById,
}

/// Two-segment path, without any kind information.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteKey {
    /// First path segment.
    pub container_slug: String,
    /// Second path segment.
    pub leaf: String,
}

impl RouteKey {
    /// Create a key from its two segments.
    #[must_use]
    pub fn new(container_slug: impl Into<String>, leaf: impl Into<String>) -> Self {
        Self {
            container_slug: container_slug.into(),
            leaf: leaf.into(),
        }
    }

    /// Key used in the route cache (`container/leaf`, each segment
    /// percent-encoded).
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "{}/{}",
            utf8_percent_encode(&self.container_slug, KEY_SEGMENT),
            utf8_percent_encode(&self.leaf, KEY_SEGMENT)
        )
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.container_slug, self.leaf)
    }
}

/// Enumerated route: a key plus the kind it was enumerated as.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoute {
    /// First path segment.
    pub container_slug: String,
    /// Second path segment.
    pub leaf: String,
    /// Source of the leaf identifier.
    pub kind: RouteKind,
}

impl ResolvedRoute {
    /// Create a route.
    #[must_use]
    pub fn new(container_slug: impl Into<String>, leaf: impl Into<String>, kind: RouteKind) -> Self {
        Self {
            container_slug: container_slug.into(),
            leaf: leaf.into(),
            kind,
        }
    }

    /// Route key, dropping the kind.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.container_slug.clone(), self.leaf.clone())
    }
}

/// Full static route set produced by one enumeration.
///
/// Holds both route shapes in emission order plus membership indexes.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSet {
    id_routes: Vec<ResolvedRoute>,
    slug_routes: Vec<ResolvedRoute>,
    #[serde(skip)]
    id_index: HashSet<RouteKey>,
    #[serde(skip)]
    slug_index: HashSet<RouteKey>,
}

impl RouteSet {
    /// Bundle the two route shapes.
    #[must_use]
    pub fn new(id_routes: Vec<ResolvedRoute>, slug_routes: Vec<ResolvedRoute>) -> Self {
        let id_index = id_routes.iter().map(ResolvedRoute::key).collect();
        let slug_index = slug_routes.iter().map(ResolvedRoute::key).collect();
        Self {
            id_routes,
            slug_routes,
            id_index,
            slug_index,
        }
    }

    /// Id-addressed routes.
    #[must_use]
    pub fn id_routes(&self) -> &[ResolvedRoute] {
        &self.id_routes
    }

    /// Slug-addressed routes (products first, then blog pages).
    #[must_use]
    pub fn slug_routes(&self) -> &[ResolvedRoute] {
        &self.slug_routes
    }

    /// Whether `key` was enumerated as an id-addressed route.
    #[must_use]
    pub fn contains_id(&self, key: &RouteKey) -> bool {
        self.id_index.contains(key)
    }

    /// Whether `key` was enumerated as a slug-addressed route.
    #[must_use]
    pub fn contains_slug(&self, key: &RouteKey) -> bool {
        self.slug_index.contains(key)
    }

    /// Total number of routes across both shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_routes.len() + self.slug_routes.len()
    }

    /// Whether both shapes are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
