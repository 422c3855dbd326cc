//! Version API routes.
//!
//! | Method | Path                                  | Handler                          |
//! |--------|---------------------------------------|----------------------------------|
//! | GET    | `/up`                                 | [`health::up`]                   |
//! | GET    | `/`                                   | [`listing::list_categories`]     |
//! | GET    | `/{category}`                         | [`listing::list_objects`]        |
//! | GET    | `/{category}/{object}/versions`       | [`listing::list_object_versions`]|
//! | GET    | `/{category}/{object}[/{version}]`    | [`objects::get_current`] / [`objects::get_version`] |
//! | HEAD   | `/{category}/{object}[/{version}]`    | [`objects::head_current`] / [`objects::head_version`] |
//! | POST   | `/{category}/{object}/{version}`      | [`objects::publish`]             |
//! | PUT    | `/{category}/{object}/{version}`      | [`objects::set_version`]         |
//!
//! `versions` is therefore not usable as a version label over HTTP.

pub mod health;
pub mod listing;
pub mod objects;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use depot_storage::{ContentStore, MetadataStore, VersionController};
use tower_http::trace::TraceLayer;

/// Largest object body accepted by a publish.
pub const MAX_OBJECT_BYTES: usize = 512 * 1024 * 1024;

/// Build the Version API router over one controller.
pub fn create_router<C, M>(controller: Arc<VersionController<C, M>>) -> Router
where
    C: ContentStore + 'static,
    M: MetadataStore + 'static,
{
    Router::new()
        .route("/", get(listing::list_categories::<C, M>))
        .route("/:category", get(listing::list_objects::<C, M>))
        .route(
            "/:category/:object/versions",
            get(listing::list_object_versions::<C, M>),
        )
        .route(
            "/:category/:object",
            get(objects::get_current::<C, M>).head(objects::head_current::<C, M>),
        )
        .route(
            "/:category/:object/:version",
            get(objects::get_version::<C, M>)
                .head(objects::head_version::<C, M>)
                .post(objects::publish::<C, M>)
                .put(objects::set_version::<C, M>),
        )
        .with_state(controller)
        .merge(health::up_router())
        .layer(DefaultBodyLimit::max(MAX_OBJECT_BYTES))
        .layer(TraceLayer::new_for_http())
}
