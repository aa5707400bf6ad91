//! Slug Index Builder.
//!
//! Enumerates every `/{container}/{leaf}` route the site must serve, for both
//! route shapes:
//!
//! - **Id-addressed**: every page-bearing container slug × every product id.
//! - **Slug-addressed**: every page-bearing container slug × every derived
//!   product slug, followed by every blog page slug under the blog home
//!   container (none when there is no blog home).
//!
//! Enumeration is all-or-nothing: any content source failure fails the whole
//! call and no partial route set is returned.

use std::collections::HashSet;

use sf_source::{Container, ContainerKind, ContentSource, Page, SourceError};

use crate::route::{ResolvedRoute, RouteKind, RouteSet};

/// Enumerate both route shapes.
pub async fn enumerate(source: &dyn ContentSource) -> Result<RouteSet, SourceError> {
    let (id_routes, slug_routes) = tokio::try_join!(id_routes(source), slug_routes(source))?;
    Ok(RouteSet::new(id_routes, slug_routes))
}

/// Enumerate id-addressed routes: page-bearing containers × product ids.
pub async fn id_routes(source: &dyn ContentSource) -> Result<Vec<ResolvedRoute>, SourceError> {
    let kind = ContainerKind::product_page();
    let (containers, products) =
        tokio::try_join!(source.list_containers(&kind), source.list_products())?;
    let ids: Vec<String> = products.into_iter().map(|product| product.id).collect();
    Ok(cross_product(&containers, &ids, RouteKind::ProductById))
}

/// Enumerate slug-addressed routes: product routes first, then blog routes.
pub async fn slug_routes(source: &dyn ContentSource) -> Result<Vec<ResolvedRoute>, SourceError> {
    let kind = ContainerKind::product_page();
    let (containers, products) =
        tokio::try_join!(source.list_containers(&kind), source.list_products())?;
    let slugs: Vec<String> = products.iter().map(sf_source::Product::slug).collect();
    let mut routes = cross_product(&containers, &slugs, RouteKind::Product);

    let (blog_home, blog_pages) =
        tokio::try_join!(source.blog_home(), source.list_blog_pages())?;
    routes.extend(blog_routes(blog_home.as_ref(), &blog_pages));

    Ok(dedup(routes))
}

/// Attach every leaf to every container, container-major.
fn cross_product(containers: &[Container], leaves: &[String], kind: RouteKind) -> Vec<ResolvedRoute> {
    let routes = containers
        .iter()
        .flat_map(|container| {
            leaves
                .iter()
                .map(move |leaf| ResolvedRoute::new(container.slug.clone(), leaf.clone(), kind))
        })
        .collect();
    dedup(routes)
}

/// Attach blog page slugs to the blog home only.
fn blog_routes(blog_home: Option<&Container>, pages: &[Page]) -> Vec<ResolvedRoute> {
    let Some(home) = blog_home else {
        if !pages.is_empty() {
            tracing::debug!(pages = pages.len(), "No blog home, skipping blog routes");
        }
        return Vec::new();
    };
    pages
        .iter()
        .map(|page| ResolvedRoute::new(home.slug.clone(), page.slug.clone(), RouteKind::Page))
        .collect()
}

/// Drop repeated `(container, leaf)` pairs, keeping the first occurrence.
fn dedup(routes: Vec<ResolvedRoute>) -> Vec<ResolvedRoute> {
    let mut seen = HashSet::with_capacity(routes.len());
    routes
        .into_iter()
        .filter(|route| seen.insert(route.key()))
        .collect()
}
