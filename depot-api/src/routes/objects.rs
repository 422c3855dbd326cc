//! Object routes of the Version API: publish, fetch, head and pointer update.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use depot_core::{ChangeToken, Channel, ObjectPath};
use depot_storage::{ContentStore, MetadataStore, VersionController};

use crate::error::ApiResult;
use crate::types::{ApiResponse, ChannelQuery, PublishQuery};

/// Response header carrying the version label a read resolved to.
pub const VERSION_HEADER: &str = "x-depot-version";

pub const OBJECT_CONTENT_TYPE: &str = "application/octet-stream";

type Controller<C, M> = State<Arc<VersionController<C, M>>>;

// ============================================================================
// HANDLERS
// ============================================================================

/// `POST /{category}/{object}/{version}?dev=&prod=` with the object bytes as body.
pub async fn publish<C, M>(
    State(controller): Controller<C, M>,
    Path((category, object, version)): Path<(String, String, String)>,
    Query(query): Query<PublishQuery>,
    body: Bytes,
) -> ApiResult<Json<ApiResponse>>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let path = ObjectPath::new(category, object)?;
    controller
        .add_object_with_flags(&path, &version, body.to_vec(), query.dev(), query.prod())
        .await?;
    Ok(Json(ApiResponse::ok()))
}

/// `GET /{category}/{object}?dev=`
pub async fn get_current<C, M>(
    State(controller): Controller<C, M>,
    Path((category, object)): Path<(String, String)>,
    Query(query): Query<ChannelQuery>,
) -> ApiResult<Response>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let path = ObjectPath::new(category, object)?;
    let object = controller
        .get_object(&path, None, Channel::from_dev_flag(query.dev()))
        .await?;
    Ok(object_response(object.version.as_deref(), &object.token, object.body))
}

/// `GET /{category}/{object}/{version}`. Pointer state is never consulted.
pub async fn get_version<C, M>(
    State(controller): Controller<C, M>,
    Path((category, object, version)): Path<(String, String, String)>,
    Query(query): Query<ChannelQuery>,
) -> ApiResult<Response>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let path = ObjectPath::new(category, object)?;
    let object = controller
        .get_object(&path, Some(version.as_str()), Channel::from_dev_flag(query.dev()))
        .await?;
    Ok(object_response(object.version.as_deref(), &object.token, object.body))
}

/// `HEAD /{category}/{object}?dev=`
pub async fn head_current<C, M>(
    State(controller): Controller<C, M>,
    Path((category, object)): Path<(String, String)>,
    Query(query): Query<ChannelQuery>,
) -> ApiResult<Response>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let path = ObjectPath::new(category, object)?;
    let (version, token) = controller
        .head_object(&path, None, Channel::from_dev_flag(query.dev()))
        .await?;
    Ok(object_response(Some(version.as_str()), &token, Vec::new()))
}

/// `HEAD /{category}/{object}/{version}`
pub async fn head_version<C, M>(
    State(controller): Controller<C, M>,
    Path((category, object, version)): Path<(String, String, String)>,
) -> ApiResult<Response>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let path = ObjectPath::new(category, object)?;
    let (version, token) = controller
        .head_object(&path, Some(version.as_str()), Channel::Prod)
        .await?;
    Ok(object_response(Some(version.as_str()), &token, Vec::new()))
}

/// `PUT /{category}/{object}/{version}?dev=` moves one pointer.
pub async fn set_version<C, M>(
    State(controller): Controller<C, M>,
    Path((category, object, version)): Path<(String, String, String)>,
    Query(query): Query<ChannelQuery>,
) -> ApiResult<Json<ApiResponse>>
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    let path = ObjectPath::new(category, object)?;
    controller
        .set_version(&path, &version, Channel::from_dev_flag(query.dev()))
        .await?;
    Ok(Json(ApiResponse::ok()))
}

// ============================================================================
// HELPERS
// ============================================================================

fn object_response(version: Option<&str>, token: &ChangeToken, body: Vec<u8>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OBJECT_CONTENT_TYPE));
    if let Ok(etag) = HeaderValue::from_str(&token.to_etag()) {
        headers.insert(header::ETAG, etag);
    }
    if let Some(value) = version.and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(HeaderName::from_static(VERSION_HEADER), value);
    }
    (StatusCode::OK, headers, body).into_response()
}
