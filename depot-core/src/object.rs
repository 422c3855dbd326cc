//! Object identity, pointer records and listing pages.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{DepotError, DepotResult, PATH_DELIMITER};

// ============================================================================
// OBJECT PATH
// ============================================================================

/// Logical object name: `category/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath {
    category: String,
    name: String,
}

impl ObjectPath {
    /// Build a path from its two segments.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> DepotResult<Self> {
        let category = category.into();
        let name = name.into();
        validate_segment("category", &category)?;
        validate_segment("object", &name)?;
        Ok(Self { category, name })
    }

    /// Parse `category/name`.
    pub fn parse(path: &str) -> DepotResult<Self> {
        match path.split_once(PATH_DELIMITER) {
            Some((category, name)) => Self::new(category, name),
            None => Err(DepotError::malformed(
                "path",
                format!("{} is not of the form category/object", path),
            )),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.category, PATH_DELIMITER, self.name)
    }
}

/// Check one path segment (category, object name or version label).
pub fn validate_segment(field: &str, segment: &str) -> DepotResult<()> {
    if segment.is_empty() {
        return Err(DepotError::malformed(field, "must not be empty"));
    }
    if segment.contains(PATH_DELIMITER) {
        return Err(DepotError::malformed(
            field,
            format!("{} must not contain '{}'", segment, PATH_DELIMITER),
        ));
    }
    if segment == "." || segment == ".." {
        return Err(DepotError::malformed(field, format!("{} is reserved", segment)));
    }
    Ok(())
}

/// Check a caller-assigned version label.
pub fn validate_version(version: &str) -> DepotResult<()> {
    validate_segment("version", version)
}

// ============================================================================
// CHANNELS AND PROMOTION
// ============================================================================

/// Which pointer field a read or pointer update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The `version` field.
    Prod,
    /// The `dev` field.
    Dev,
}

impl Channel {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Channel::Dev
        } else {
            Channel::Prod
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Prod => write!(f, "prod"),
            Channel::Dev => write!(f, "dev"),
        }
    }
}

/// Pointer effect of a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Promotion {
    /// Store the bytes, leave pointers alone (staged publication).
    #[default]
    None,
    /// Advance `dev` only.
    Dev,
    /// Advance both `version` and `dev`.
    Prod,
}

impl Promotion {
    /// Derive the promotion from publish flags. `dev` is checked first, so a
    /// publish carrying both flags only moves the dev pointer.
    pub fn from_flags(dev: bool, prod: bool) -> Self {
        match (dev, prod) {
            (true, _) => Promotion::Dev,
            (false, true) => Promotion::Prod,
            (false, false) => Promotion::None,
        }
    }

    pub fn is_promoting(&self) -> bool {
        !matches!(self, Promotion::None)
    }
}

// ============================================================================
// POINTER RECORD
// ============================================================================

/// Metadata record naming the active prod/dev versions of one object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionPointer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev: Option<String>,
}

impl VersionPointer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Resolve the version label for a channel.
    pub fn channel(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Prod => self.version.as_deref(),
            Channel::Dev => self.dev.as_deref(),
        }
    }

    /// Set exactly one field.
    pub fn set_channel(&mut self, channel: Channel, version: impl Into<String>) {
        match channel {
            Channel::Prod => self.version = Some(version.into()),
            Channel::Dev => self.dev = Some(version.into()),
        }
    }

    /// Apply a publish promotion. Prod promotion moves `dev` in lockstep.
    pub fn promote(&mut self, promotion: Promotion, version: &str) {
        match promotion {
            Promotion::None => {}
            Promotion::Dev => self.set_channel(Channel::Dev, version),
            Promotion::Prod => {
                self.set_channel(Channel::Prod, version);
                self.set_channel(Channel::Dev, version);
            }
        }
    }
}

// ============================================================================
// CHANGE TOKEN
// ============================================================================

/// Opaque content fingerprint used to detect upstream changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeToken(String);

impl ChangeToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token for a byte payload: lowercase hex SHA-256.
    pub fn for_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    /// Build a token from an HTTP `ETag` value, dropping quotes and the weak
    /// validator marker.
    pub fn from_etag(etag: &str) -> Self {
        let etag = etag.trim();
        let etag = etag.strip_prefix("W/").unwrap_or(etag);
        Self(etag.trim_matches('"').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted form for an HTTP `ETag` header.
    pub fn to_etag(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// STORED OBJECT / LIST PAGE
// ============================================================================

/// Bytes of one version together with its change token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub token: ChangeToken,
    /// Version label the read resolved to, when known.
    pub version: Option<String>,
}

/// One page of a hierarchical listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListPage {
    pub items: Vec<String>,
    #[serde(rename = "nextToken", default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl ListPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_more(&self) -> bool {
        self.next_token.is_some()
    }
}
