//! Key naming scheme shared by the controller and the listing engine.
//!
//! Content keys are hierarchical (`[prefix/]category/object/version`) so the
//! content store can be listed one level at a time. Pointer keys are the bare
//! object path and never carry the prefix, keeping pointer lookups a single
//! primary-key read.

use crate::{ObjectPath, PATH_DELIMITER};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyScheme {
    prefix: Option<String>,
}

impl KeyScheme {
    /// Build a scheme. Surrounding delimiters are trimmed and an empty prefix
    /// is treated as absent.
    pub fn new(prefix: Option<&str>) -> Self {
        let prefix = prefix
            .map(|p| p.trim_matches(PATH_DELIMITER))
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Self { prefix }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Content key for one version of an object.
    pub fn content_key(&self, path: &ObjectPath, version: &str) -> String {
        format!("{}{}{}{}", self.root(), path, PATH_DELIMITER, version)
    }

    /// Metadata key for an object's pointer record.
    pub fn pointer_key(&self, path: &ObjectPath) -> String {
        path.to_string()
    }

    /// Listing prefix for categories: the store root, ending with a delimiter
    /// when a prefix is configured.
    pub fn root(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, PATH_DELIMITER),
            None => String::new(),
        }
    }

    /// Listing prefix for the objects of a category.
    pub fn category_prefix(&self, category: &str) -> String {
        format!("{}{}{}", self.root(), category, PATH_DELIMITER)
    }

    /// Listing prefix for the versions of an object.
    pub fn object_prefix(&self, category: &str, object: &str) -> String {
        format!(
            "{}{}{}{}{}",
            self.root(),
            category,
            PATH_DELIMITER,
            object,
            PATH_DELIMITER
        )
    }
}
