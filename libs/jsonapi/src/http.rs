//! Axum mounting of resources.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery},
    http::Method,
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};

use crate::dispatcher::{ApiRequest, ApiResponse, ResponseBody};
use crate::problem::ProblemResponse;
use crate::query::QueryParams;
use crate::resource::ResourceEndpoint;

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        match self.body {
            ResponseBody::Empty => self.status.into_response(),
            ResponseBody::Json(v) => (self.status, Json(v)).into_response(),
            ResponseBody::Problem(p) => ProblemResponse(p).into_response(),
        }
    }
}

fn request(method: Method, id: Option<String>, query: Option<String>, body: Bytes) -> ApiRequest {
    ApiRequest {
        method,
        id,
        query: query.as_deref().map(QueryParams::parse).unwrap_or_default(),
        body,
    }
}

/// Mount `endpoint` at `base` (e.g. `/prefectures`): the index at `base/` and
/// items at `base/{id}/`, each also without the trailing slash.
pub fn mount(router: Router, base: &str, endpoint: Arc<dyn ResourceEndpoint>) -> Router {
    let base = base.trim_end_matches('/');

    let index = {
        let endpoint = endpoint.clone();
        any(
            move |method: Method, RawQuery(query): RawQuery, body: Bytes| async move {
                endpoint.handle(request(method, None, query, body)).await
            },
        )
    };
    let item = any(
        move |method: Method, Path(id): Path<String>, RawQuery(query): RawQuery, body: Bytes| async move {
            endpoint.handle(request(method, Some(id), query, body)).await
        },
    );

    tracing::debug!(base, "mounting resource routes");
    let router = router
        .route(&format!("{base}/"), index.clone())
        .route(&format!("{base}/{{id}}/"), item.clone());
    if base.is_empty() {
        return router.route("/{id}", item);
    }
    router
        .route(base, index)
        .route(&format!("{base}/{{id}}"), item)
}

/// Collects resources and their base paths into one router.
#[derive(Default)]
pub struct ResourceRouter {
    mounts: Vec<(String, Arc<dyn ResourceEndpoint>)>,
}

impl ResourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, base: impl Into<String>, endpoint: Arc<dyn ResourceEndpoint>) -> Self {
        self.mounts.push((base.into(), endpoint));
        self
    }

    pub fn into_router(self) -> Router {
        self.mounts
            .into_iter()
            .fold(Router::new(), |router, (base, endpoint)| {
                mount(router, &base, endpoint)
            })
    }
}
