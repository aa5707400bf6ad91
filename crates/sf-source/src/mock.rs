//! Mock content source for testing.
//!
//! Provides [`MockSource`] for unit testing without a live content API.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{Container, ContainerKind, Layout, Page, Product};
use crate::source::{ContentSource, SourceError};

/// Gateway operation, used to count calls made against a [`MockSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`ContentSource::list_containers`].
    ListContainers,
    /// [`ContentSource::list_products`].
    ListProducts,
    /// [`ContentSource::product_by_id`].
    ProductById,
    /// [`ContentSource::product_by_slug`].
    ProductBySlug,
    /// [`ContentSource::page_by_slug`].
    PageBySlug,
    /// [`ContentSource::layout`].
    Layout,
    /// [`ContentSource::blog_home`].
    BlogHome,
    /// [`ContentSource::list_blog_pages`].
    ListBlogPages,
}

/// Mock content source for testing.
///
/// Stores containers, products and pages in memory. Use the builder methods
/// to configure the mock with test data and the mutators to simulate content
/// changes after a build.
///
/// # Example
///
/// ```ignore
/// use sf_source::{ContainerKind, MockSource};
///
/// let source = MockSource::new()
///     .with_container("shop", ContainerKind::product_page())
///     .with_product("p1", "Scarf", Some("Red"));
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    containers: RwLock<Vec<Container>>,
    products: RwLock<Vec<Product>>,
    pages: RwLock<Vec<Page>>,
    blog_pages: RwLock<Vec<Page>>,
    layout: RwLock<Layout>,
    unavailable: AtomicBool,
    latency: RwLock<Option<Duration>>,
    calls: RwLock<HashMap<Operation, usize>>,
}

impl MockSource {
    /// Create a new empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container with the given slug and kind. The title mirrors the slug.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_container(self, slug: impl Into<String>, kind: ContainerKind) -> Self {
        let slug = slug.into();
        self.containers.write().unwrap().push(Container {
            title: slug.clone(),
            slug,
            kind,
        });
        self
    }

    /// Add a product with the given id, title and optional variant.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_product(
        self,
        id: impl Into<String>,
        title: impl Into<String>,
        variant: Option<&str>,
    ) -> Self {
        self.upsert_product(Product {
            id: id.into(),
            title: title.into(),
            variant: variant.map(str::to_owned),
            price: 10.0,
            description: serde_json::Value::Null,
            images: Vec::new(),
        });
        self
    }

    /// Add an editorial page reachable through [`ContentSource::page_by_slug`].
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(self, slug: impl Into<String>, title: impl Into<String>) -> Self {
        self.pages.write().unwrap().push(Page {
            slug: slug.into(),
            title: title.into(),
            content: serde_json::Value::Null,
        });
        self
    }

    /// Add a blog page. Blog pages are also reachable by slug.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_blog_page(self, slug: impl Into<String>, title: impl Into<String>) -> Self {
        let page = Page {
            slug: slug.into(),
            title: title.into(),
            content: serde_json::Value::Null,
        };
        self.pages.write().unwrap().push(page.clone());
        self.blog_pages.write().unwrap().push(page);
        self
    }

    /// Set the site layout.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_layout(self, layout: Layout) -> Self {
        *self.layout.write().unwrap() = layout;
        self
    }

    /// Delay every operation by `latency`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.write().unwrap() = Some(latency);
        self
    }

    /// Insert a product or replace the one with the same id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn upsert_product(&self, product: Product) {
        let mut products = self.products.write().unwrap();
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    /// Delete a product at the source.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_product(&self, id: &str) {
        self.products.write().unwrap().retain(|p| p.id != id);
    }

    /// Delete a page (editorial or blog) at the source.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_page(&self, slug: &str) {
        self.pages.write().unwrap().retain(|p| p.slug != slug);
        self.blog_pages.write().unwrap().retain(|p| p.slug != slug);
    }

    /// Make every operation fail with [`SourceError::unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of calls made for `operation`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls
            .read()
            .unwrap()
            .get(&operation)
            .copied()
            .unwrap_or_default()
    }

    /// Reset all call counters.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn reset_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    /// Record the call, apply latency and injected failures.
    async fn enter(&self, operation: Operation) -> Result<(), SourceError> {
        *self.calls.write().unwrap().entry(operation).or_default() += 1;

        let latency = *self.latency.read().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SourceError::unavailable().with_backend("Mock"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn list_containers(&self, kind: &ContainerKind) -> Result<Vec<Container>, SourceError> {
        self.enter(Operation::ListContainers).await?;
        Ok(self
            .containers
            .read()
            .unwrap()
            .iter()
            .filter(|c| &c.kind == kind)
            .cloned()
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>, SourceError> {
        self.enter(Operation::ListProducts).await?;
        Ok(self.products.read().unwrap().clone())
    }

    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, SourceError> {
        self.enter(Operation::ProductById).await?;
        Ok(self
            .products
            .read()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, SourceError> {
        self.enter(Operation::ProductBySlug).await?;
        Ok(self
            .products
            .read()
            .unwrap()
            .iter()
            .find(|p| p.slug() == slug)
            .cloned())
    }

    async fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, SourceError> {
        self.enter(Operation::PageBySlug).await?;
        Ok(self
            .pages
            .read()
            .unwrap()
            .iter()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn layout(&self) -> Result<Layout, SourceError> {
        self.enter(Operation::Layout).await?;
        Ok(self.layout.read().unwrap().clone())
    }

    async fn blog_home(&self) -> Result<Option<Container>, SourceError> {
        self.enter(Operation::BlogHome).await?;
        let blog_home = ContainerKind::blog_home();
        Ok(self
            .containers
            .read()
            .unwrap()
            .iter()
            .find(|c| c.kind == blog_home)
            .cloned())
    }

    async fn list_blog_pages(&self) -> Result<Vec<Page>, SourceError> {
        self.enter(Operation::ListBlogPages).await?;
        Ok(self.blog_pages.read().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MockSource {
        MockSource::new()
            .with_container("shop", ContainerKind::product_page())
            .with_container("blog", ContainerKind::blog_home())
            .with_product("p1", "Scarf", Some("Red"))
            .with_blog_page("news-1", "News")
    }

    #[tokio::test]
    async fn test_list_containers_filters_by_kind() {
        let source = source();
        let shops = source
            .list_containers(&ContainerKind::product_page())
            .await
            .unwrap();
        assert_eq!(shops.len(), 1);
        assert_eq!(shops[0].slug, "shop");
    }

    #[tokio::test]
    async fn test_product_by_slug_uses_derived_slug() {
        let source = source();
        let product = source.product_by_slug("scarf-red").await.unwrap();
        assert_eq!(product.map(|p| p.id), Some("p1".to_owned()));
        assert!(source.product_by_slug("scarf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blog_pages_reachable_by_slug() {
        let source = source();
        assert!(source.page_by_slug("news-1").await.unwrap().is_some());
        assert_eq!(source.list_blog_pages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_operation() {
        let source = source();
        source.set_unavailable(true);
        assert!(source.list_products().await.is_err());
        assert!(source.layout().await.is_err());

        source.set_unavailable(false);
        assert!(source.layout().await.is_ok());
    }

    #[tokio::test]
    async fn test_counts_calls() {
        let source = source();
        let _ = source.product_by_id("p1").await;
        let _ = source.product_by_id("p2").await;
        assert_eq!(source.calls(Operation::ProductById), 2);
        assert_eq!(source.calls(Operation::Layout), 0);

        source.reset_calls();
        assert_eq!(source.calls(Operation::ProductById), 0);
    }

    #[tokio::test]
    async fn test_remove_product() {
        let source = source();
        source.remove_product("p1");
        assert!(source.product_by_id("p1").await.unwrap().is_none());
    }
}
