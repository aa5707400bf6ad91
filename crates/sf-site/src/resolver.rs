//! Content Resolver.
//!
//! Maps a two-segment path to exactly one of a product, a page or "not found",
//! together with the site layout.
//!
//! # Precedence
//!
//! 1. Product whose derived slug equals the leaf. Product wins ties.
//! 2. Only on a product miss: page whose slug equals the leaf.
//! 3. Otherwise not found.
//!
//! The container slug never filters products: any page-bearing container can
//! prefix any product, which is what makes the Cartesian-product enumeration
//! in [`crate::paths`] safe. The layout fetch runs concurrently with the
//! precedence chain and both must succeed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sf_source::{ContentSource, Layout, Page, Product, SourceError};

use crate::route::RouteKey;

/// Resolved content entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Entity {
    /// Product, reached by derived slug or by id.
    Product(Product),
    /// Editorial page.
    Page(Page),
}

impl Entity {
    /// Kind name handed to the presentation layer.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Product(_) => "product",
            Self::Page(_) => "page",
        }
    }
}

/// Entity plus the layout it is rendered with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContent {
    /// Resolved entity.
    pub entity: Entity,
    /// Site layout fetched for this resolution.
    pub layout: Layout,
}

/// Outcome of one resolution. Not-found is a result, not an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// Path denotes an entity.
    Found(Box<ResolvedContent>),
    /// Neither a product nor a page matched.
    NotFound,
}

impl Resolution {
    fn found(entity: Entity, layout: Layout) -> Self {
        Self::Found(Box::new(ResolvedContent { entity, layout }))
    }

    /// Whether the path denotes an entity.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Resolves paths against a content source. Pure read path.
#[derive(Clone)]
pub struct ContentResolver {
    source: Arc<dyn ContentSource>,
}

impl ContentResolver {
    /// Create a resolver over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Resolve a slug-addressed path.
    ///
    /// # Errors
    ///
    /// Returns the first gateway error from either the precedence chain or the
    /// layout fetch. No partial result is produced.
    pub async fn resolve(&self, key: &RouteKey) -> Result<Resolution, SourceError> {
        tracing::debug!(route = %key, "Resolving route");
        let (entity, layout) = tokio::try_join!(self.entity_by_slug(&key.leaf), self.source.layout())?;
        Ok(entity.map_or(Resolution::NotFound, |entity| Resolution::found(entity, layout)))
    }

    /// Resolve an id-addressed path. The container slug is not consulted.
    ///
    /// # Errors
    ///
    /// Returns the first gateway error from the product or layout fetch.
    pub async fn resolve_by_id(&self, key: &RouteKey) -> Result<Resolution, SourceError> {
        tracing::debug!(route = %key, "Resolving route by id");
        let (product, layout) =
            tokio::try_join!(self.source.product_by_id(&key.leaf), self.source.layout())?;
        Ok(product.map_or(Resolution::NotFound, |product| {
            Resolution::found(Entity::Product(product), layout)
        }))
    }

    /// Product-then-page chain. The page lookup only runs on a product miss.
    async fn entity_by_slug(&self, leaf: &str) -> Result<Option<Entity>, SourceError> {
        if let Some(product) = self.source.product_by_slug(leaf).await? {
            return Ok(Some(Entity::Product(product)));
        }
        Ok(self.source.page_by_slug(leaf).await?.map(Entity::Page))
    }
}
