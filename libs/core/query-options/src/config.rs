//! Static per-resource-type configuration.
//!
//! Each client-visible resource type declares which fields may be selected or
//! sorted, which fields must always survive sparse-fieldset projection, and
//! which relations may be eager-loaded. Configs are immutable and collected
//! once at process start.

use std::collections::HashMap;

use crate::builder::QueryOptionsBuilder;
use crate::error::QueryError;

/// An includable relationship of a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationConfig {
    /// Client-visible relation name, which is also the related resource type
    /// name (e.g. `"supplier"`).
    pub name: &'static str,
    /// Storage collection the relation resolves to (e.g. `"suppliers"`).
    pub target: &'static str,
}

/// Static descriptor for one resource type.
#[derive(Debug, Clone, Copy)]
pub struct ResourceTypeConfig {
    /// Resource type name as it appears in query parameters (e.g. `"product"`).
    pub name: &'static str,
    /// Canonical storage collection (e.g. `"products"`).
    pub collection: &'static str,
    /// Fields that may be selected, sorted, or filtered on.
    pub accessible_fields: &'static [&'static str],
    /// Fields always included in the projection regardless of the request,
    /// so resource identity and relationships keep serializing.
    pub required_fields: &'static [&'static str],
    /// Relations that may be eager-loaded via `include=`.
    pub relations: &'static [RelationConfig],
}

impl ResourceTypeConfig {
    pub fn is_accessible(&self, field: &str) -> bool {
        self.accessible_fields.contains(&field)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationConfig> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// Registry of every configured resource type, built once at startup.
#[derive(Debug, Default, Clone)]
pub struct ResourceRegistry {
    configs: HashMap<&'static str, ResourceTypeConfig>,
}

impl ResourceRegistry {
    pub fn new(configs: impl IntoIterator<Item = ResourceTypeConfig>) -> Self {
        Self {
            configs: configs.into_iter().map(|c| (c.name, c)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResourceTypeConfig> {
        self.configs.get(name)
    }

    /// Start a builder for the given resource type.
    ///
    /// An unknown type is a configuration error (the route asked for a type
    /// nobody registered), not a request error; callers surface it as 500.
    pub fn builder<'a>(&'a self, resource: &str) -> Result<QueryOptionsBuilder<'a>, QueryError> {
        let config = self
            .configs
            .get(resource)
            .ok_or_else(|| QueryError::UnknownResourceType(resource.to_string()))?;
        Ok(QueryOptionsBuilder::new(self, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_resource_type_is_a_config_error() {
        let registry = ResourceRegistry::new([]);
        let err = registry.builder("widget").unwrap_err();
        assert!(matches!(err, QueryError::UnknownResourceType(t) if t == "widget"));
    }

    #[test]
    fn relation_lookup_by_name() {
        let config = ResourceTypeConfig {
            name: "product",
            collection: "products",
            accessible_fields: &["id", "name"],
            required_fields: &["id"],
            relations: &[RelationConfig {
                name: "supplier",
                target: "suppliers",
            }],
        };
        assert_eq!(config.relation("supplier").unwrap().target, "suppliers");
        assert!(config.relation("warehouse").is_none());
    }
}
