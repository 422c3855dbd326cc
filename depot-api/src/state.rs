//! Version API state: one controller over the filesystem content store and
//! the LMDB pointer table.

use std::sync::Arc;

use depot_core::DepotConfig;
use depot_storage::{ControllerConfig, FsContentStore, LmdbMetadataStore, VersionController};

use crate::error::{ApiError, ApiResult};

pub type StoreController = VersionController<FsContentStore, LmdbMetadataStore>;

pub async fn open_controller(config: &DepotConfig) -> ApiResult<Arc<StoreController>> {
    let content = FsContentStore::open(&config.content_root)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to open content store: {}", e)))?;
    let metadata = LmdbMetadataStore::open(&config.metadata_path, config.metadata_map_size_mb)
        .map_err(|e| ApiError::internal_error(format!("Failed to open pointer table: {}", e)))?;

    tracing::info!(
        content_root = %config.content_root.display(),
        metadata_path = %config.metadata_path.display(),
        prefix = ?config.path_prefix,
        "Version controller opened"
    );
    Ok(Arc::new(VersionController::new(
        ControllerConfig::from_config(config),
        Arc::new(content),
        metadata,
    )))
}
