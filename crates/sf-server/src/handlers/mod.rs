//! HTTP request handlers.

pub(crate) mod pages;
pub(crate) mod products;
pub(crate) mod routes;

use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use md5::{Digest, Md5};
use serde::Serialize;
use sf_site::{Entity, ResolvedContent};
use sf_source::{Layout, Page, Product};

use crate::error::ServerError;
use crate::state::AppState;

/// Presentation payload: `{kind, entity, layout}`.
#[derive(Serialize)]
struct ContentResponse<'a> {
    /// `product` or `page`.
    kind: &'static str,
    /// The resolved entity itself, without a tag.
    entity: EntityRef<'a>,
    /// Site layout.
    layout: &'a Layout,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EntityRef<'a> {
    Product(&'a Product),
    Page(&'a Page),
}

impl<'a> From<&'a ResolvedContent> for ContentResponse<'a> {
    fn from(content: &'a ResolvedContent) -> Self {
        let entity = match &content.entity {
            Entity::Product(product) => EntityRef::Product(product),
            Entity::Page(page) => EntityRef::Page(page),
        };
        Self {
            kind: content.entity.kind(),
            entity,
            layout: &content.layout,
        }
    }
}

/// Serialize resolved content with `ETag` and `Cache-Control` headers.
///
/// Answers 304 when `If-None-Match` matches.
fn content_response(
    state: &AppState,
    headers: &HeaderMap,
    content: &ResolvedContent,
    cache_control: String,
) -> Result<Response, ServerError> {
    let body = serde_json::to_string(&ContentResponse::from(content))?;
    let etag = compute_etag(&state.version, &body);

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.as_bytes() == etag.as_bytes()
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_owned()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response())
}

/// Compute `ETag` from version and content.
///
/// Uses MD5 hash truncated to 64 bits (16 hex chars).
fn compute_etag(version: &str, content: &str) -> String {
    let hash = Md5::digest(format!("{version}:{content}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}
