//! DEPOT Core - Domain Types
//!
//! Object identity, pointer records, the key naming scheme, the error
//! taxonomy and the configuration value. All other crates depend on this.
//! This crate performs no I/O.

pub mod config;
pub mod constants;
pub mod error;
pub mod keys;
pub mod object;

pub use config::DepotConfig;
pub use constants::*;
pub use error::{DepotError, DepotResult, ErrorKind, StoreError, StoreResult};
pub use keys::KeyScheme;
pub use object::{
    validate_segment, validate_version, ChangeToken, Channel, ListPage, ObjectPath, Promotion,
    StoredObject, VersionPointer,
};
