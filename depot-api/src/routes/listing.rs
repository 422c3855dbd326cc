//! Paginated listing routes of the Version API.
//!
//! Every listing answers `{"status":"ok","items":[..],"nextToken"?}`; the
//! client passes `nextToken` back as `?token=` to continue.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use depot_storage::{ContentStore, MetadataStore, VersionController};

use crate::error::ApiResult;
use crate::types::{ApiResponse, ListQuery};

/// `GET /`
pub async fn list_categories<C, M>(
    State(controller): State<Arc<VersionController<C, M>>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse>>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let page = controller.list_categories(query.token()).await?;
    Ok(Json(page.into()))
}

/// `GET /{category}`
pub async fn list_objects<C, M>(
    State(controller): State<Arc<VersionController<C, M>>>,
    Path(category): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse>>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let page = controller.list_objects(&category, query.token()).await?;
    Ok(Json(page.into()))
}

/// `GET /{category}/{object}/versions`
pub async fn list_object_versions<C, M>(
    State(controller): State<Arc<VersionController<C, M>>>,
    Path((category, object)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse>>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let page = controller
        .list_object_versions(&category, &object, query.token())
        .await?;
    Ok(Json(page.into()))
}
