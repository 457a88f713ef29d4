//! The query options builder: converts a [`RawQuery`] into a validated
//! [`QueryDescriptor`] for exactly one resource type.

use serde::Serialize;

use crate::config::{ResourceRegistry, ResourceTypeConfig};
use crate::error::QueryError;
use crate::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::raw::{FieldsParam, RawQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One relation to eager-load, with an optional per-relation projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEntry {
    /// Relation name as requested (`"supplier"`).
    pub relation: String,
    /// Target collection to load (`"suppliers"`).
    pub target: String,
    /// Sparse fieldset for the related records, `None` = all fields.
    pub attributes: Option<Vec<String>>,
}

/// The validated output of parsing query parameters for one request.
///
/// Everything in here has been checked against the resource type's static
/// configuration; repositories may apply it without further validation.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub page: u64,
    pub limit: u64,
    pub offset: u64,
    pub order: Vec<(String, SortDirection)>,
    pub include: Vec<IncludeEntry>,
    /// Projection for the primary resource, `None` = all fields.
    pub attributes: Option<Vec<String>>,
    /// Whitelisted equality filters in request order.
    pub filter: Vec<(String, String)>,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            offset: 0,
            order: Vec::new(),
            include: Vec::new(),
            attributes: None,
            filter: Vec::new(),
        }
    }
}

impl QueryDescriptor {
    pub fn includes(&self, relation: &str) -> bool {
        self.include.iter().any(|e| e.relation == relation)
    }
}

/// Chainable builder over one resource type's configuration.
///
/// Operations may be invoked in any order, but [`QueryOptionsBuilder::build`]
/// applies them as pagination → sort → include → fields → filter; include must
/// resolve before fields so per-relation projections can attach to entries
/// that are actually being loaded.
#[derive(Debug)]
pub struct QueryOptionsBuilder<'a> {
    registry: &'a ResourceRegistry,
    config: &'a ResourceTypeConfig,
    descriptor: QueryDescriptor,
    paginated: bool,
}

impl<'a> QueryOptionsBuilder<'a> {
    pub(crate) fn new(registry: &'a ResourceRegistry, config: &'a ResourceTypeConfig) -> Self {
        Self {
            registry,
            config,
            descriptor: QueryDescriptor::default(),
            paginated: false,
        }
    }

    pub fn config(&self) -> &ResourceTypeConfig {
        self.config
    }

    /// Parse pagination parameters with defensive defaulting: absent,
    /// non-numeric, zero, or negative values fall back to page=1, limit=10.
    /// Never fails.
    pub fn add_pagination(&mut self, page: Option<&str>, limit: Option<&str>) -> &mut Self {
        let page = parse_positive(page, DEFAULT_PAGE);
        let limit = parse_positive(limit, DEFAULT_LIMIT);
        self.descriptor.page = page;
        self.descriptor.limit = limit;
        self.descriptor.offset = (page - 1) * limit;
        self.paginated = true;
        self
    }

    /// Parse a comma-separated sort list; a leading `-` means descending.
    /// Every field must be accessible; duplicates keep the first occurrence.
    pub fn add_order(&mut self, sort: &str) -> Result<&mut Self, QueryError> {
        for entry in sort.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (field, direction) = match entry.strip_prefix('-') {
                Some(field) => (field, SortDirection::Desc),
                None => (entry, SortDirection::Asc),
            };

            if !self.config.is_accessible(field) {
                return Err(QueryError::UnknownField {
                    parameter: "sort".to_string(),
                    resource: self.config.name.to_string(),
                    value: field.to_string(),
                });
            }

            if !self.descriptor.order.iter().any(|(f, _)| f == field) {
                self.descriptor
                    .order
                    .push((field.to_string(), direction));
            }
        }
        Ok(self)
    }

    /// Parse a comma-separated include list; every name must match a
    /// configured relation, which resolves to its target collection.
    pub fn add_include(&mut self, include: &str) -> Result<&mut Self, QueryError> {
        for name in include.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let relation =
                self.config
                    .relation(name)
                    .ok_or_else(|| QueryError::UnknownRelation {
                        resource: self.config.name.to_string(),
                        value: name.to_string(),
                    })?;

            if !self.descriptor.includes(name) {
                self.descriptor.include.push(IncludeEntry {
                    relation: relation.name.to_string(),
                    target: relation.target.to_string(),
                    attributes: None,
                });
            }
        }
        Ok(self)
    }

    /// Apply sparse fieldsets. The parameter must be a type→fields mapping;
    /// the primary type's projection always re-merges `required_fields`.
    ///
    /// A configured relation that is not in the include list is accepted and
    /// dropped (fields for records that will not be loaded have nothing to
    /// attach to); a key matching neither the primary type nor any configured
    /// relation is rejected.
    pub fn add_fields(&mut self, fields: &FieldsParam) -> Result<&mut Self, QueryError> {
        let entries = match fields {
            FieldsParam::Bare(value) => {
                return Err(QueryError::InvalidFieldsParameter {
                    value: value.clone(),
                });
            }
            FieldsParam::Map(entries) => entries,
        };

        for (type_name, list) in entries {
            if type_name == self.config.name {
                let attributes =
                    validate_projection(self.config, "fields", type_name, list)?;
                self.descriptor.attributes = Some(attributes);
            } else if self.descriptor.includes(type_name) {
                let related = self.registry.get(type_name).ok_or_else(|| {
                    QueryError::UnknownResourceType(type_name.clone())
                })?;
                let attributes = validate_projection(related, "fields", type_name, list)?;
                let entry = self
                    .descriptor
                    .include
                    .iter_mut()
                    .find(|e| e.relation == *type_name)
                    .expect("include entry checked above");
                entry.attributes = Some(attributes);
            } else if self.config.relation(type_name).is_some() {
                tracing::debug!(
                    resource = self.config.name,
                    relation = type_name.as_str(),
                    "fields for a relation that is not included, dropping"
                );
            } else {
                return Err(QueryError::UnknownFieldsType {
                    value: type_name.clone(),
                });
            }
        }
        Ok(self)
    }

    /// Whitelist equality filters against the accessible field set.
    pub fn add_filter(&mut self, filter: &[(String, String)]) -> Result<&mut Self, QueryError> {
        for (field, value) in filter {
            if !self.config.is_accessible(field) {
                return Err(QueryError::UnknownField {
                    parameter: format!("filter[{field}]"),
                    resource: self.config.name.to_string(),
                    value: field.clone(),
                });
            }
            self.descriptor.filter.push((field.clone(), value.clone()));
        }
        Ok(self)
    }

    /// Orchestrate all operations in the fixed order. Pagination always runs,
    /// from the raw parameters unless already applied by chaining; sort,
    /// include, fields, and filter only when their parameter is present.
    pub fn build(mut self, raw: &RawQuery) -> Result<QueryDescriptor, QueryError> {
        if !self.paginated {
            self.add_pagination(raw.page.as_deref(), raw.limit.as_deref());
        }
        if let Some(sort) = &raw.sort {
            self.add_order(sort)?;
        }
        if let Some(include) = &raw.include {
            self.add_include(include)?;
        }
        if let Some(fields) = &raw.fields {
            self.add_fields(fields)?;
        }
        if !raw.filter.is_empty() {
            self.add_filter(&raw.filter)?;
        }
        Ok(self.descriptor)
    }
}

fn parse_positive(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as u64)
        .unwrap_or(default)
}

/// Merge a requested field list with the config's required fields, validating
/// every requested field. Required fields come first; duplicates collapse.
fn validate_projection(
    config: &ResourceTypeConfig,
    parameter_prefix: &str,
    type_name: &str,
    list: &str,
) -> Result<Vec<String>, QueryError> {
    let mut attributes: Vec<String> = config
        .required_fields
        .iter()
        .map(|f| f.to_string())
        .collect();

    for field in list.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if !config.is_accessible(field) {
            return Err(QueryError::UnknownField {
                parameter: format!("{parameter_prefix}[{type_name}]"),
                resource: config.name.to_string(),
                value: field.to_string(),
            });
        }
        if !attributes.iter().any(|a| a == field) {
            attributes.push(field.to_string());
        }
    }

    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RelationConfig, ResourceRegistry, ResourceTypeConfig};

    const PRODUCT: ResourceTypeConfig = ResourceTypeConfig {
        name: "product",
        collection: "products",
        accessible_fields: &["id", "name", "price_cents", "stock", "supplier_id", "created_at"],
        required_fields: &["id"],
        relations: &[
            RelationConfig {
                name: "supplier",
                target: "suppliers",
            },
            RelationConfig {
                name: "category",
                target: "categories",
            },
        ],
    };

    const SUPPLIER: ResourceTypeConfig = ResourceTypeConfig {
        name: "supplier",
        collection: "suppliers",
        accessible_fields: &["id", "name", "email"],
        required_fields: &["id"],
        relations: &[],
    };

    fn registry() -> ResourceRegistry {
        ResourceRegistry::new([PRODUCT, SUPPLIER])
    }

    #[test]
    fn pagination_defaults_when_absent() {
        let registry = registry();
        let mut builder = registry.builder("product").unwrap();
        builder.add_pagination(None, None);
        let descriptor = builder.build(&RawQuery::default()).unwrap();
        assert_eq!(descriptor.limit, 10);
        assert_eq!(descriptor.offset, 0);
    }

    #[test]
    fn pagination_computes_offset() {
        let registry = registry();
        let mut builder = registry.builder("product").unwrap();
        builder.add_pagination(Some("3"), Some("5"));
        let descriptor = builder.build(&RawQuery::default()).unwrap();
        assert_eq!(descriptor.limit, 5);
        assert_eq!(descriptor.offset, 10);
        assert_eq!(descriptor.page, 3);
    }

    #[test]
    fn pagination_from_raw_query() {
        let registry = registry();
        let raw = RawQuery::parse("page=2&limit=5");
        let descriptor = registry.builder("product").unwrap().build(&raw).unwrap();
        assert_eq!(descriptor.limit, 5);
        assert_eq!(descriptor.offset, 5);
    }

    #[test]
    fn build_keeps_chained_pagination() {
        let registry = registry();
        let raw = RawQuery::parse("page=9&limit=50");
        let mut builder = registry.builder("product").unwrap();
        builder.add_pagination(Some("2"), Some("5"));
        let descriptor = builder.build(&raw).unwrap();
        assert_eq!(descriptor.page, 2);
        assert_eq!(descriptor.limit, 5);
        assert_eq!(descriptor.offset, 5);
    }

    #[test]
    fn pagination_defaults_on_garbage() {
        let registry = registry();
        let raw = RawQuery::parse("page=banana&limit=-3");
        let descriptor = registry.builder("product").unwrap().build(&raw).unwrap();
        assert_eq!(descriptor.page, 1);
        assert_eq!(descriptor.limit, 10);
        assert_eq!(descriptor.offset, 0);
    }

    #[test]
    fn sort_rejects_unknown_field() {
        let registry = registry();
        let raw = RawQuery::parse("sort=secret");
        let err = registry.builder("product").unwrap().build(&raw).unwrap_err();
        match err {
            QueryError::UnknownField {
                parameter, value, ..
            } => {
                assert_eq!(parameter, "sort");
                assert_eq!(value, "secret");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sort_parses_direction_and_dedupes_first_wins() {
        let registry = registry();
        let raw = RawQuery::parse("sort=-created_at,name,created_at");
        let descriptor = registry.builder("product").unwrap().build(&raw).unwrap();
        assert_eq!(
            descriptor.order,
            vec![
                ("created_at".to_string(), SortDirection::Desc),
                ("name".to_string(), SortDirection::Asc),
            ]
        );
    }

    #[test]
    fn include_rejects_unknown_relation() {
        let registry = registry();
        let raw = RawQuery::parse("include=warehouse");
        let err = registry.builder("product").unwrap().build(&raw).unwrap_err();
        match err {
            QueryError::UnknownRelation { value, .. } => assert_eq!(value, "warehouse"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn include_resolves_targets() {
        let registry = registry();
        let raw = RawQuery::parse("include=supplier,category");
        let descriptor = registry.builder("product").unwrap().build(&raw).unwrap();
        assert!(descriptor.includes("supplier"));
        assert_eq!(descriptor.include[0].target, "suppliers");
        assert_eq!(descriptor.include[1].target, "categories");
    }

    #[test]
    fn bare_fields_parameter_is_rejected() {
        let registry = registry();
        let raw = RawQuery::parse("fields=id,name");
        let err = registry.builder("product").unwrap().build(&raw).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFieldsParameter { .. }));
    }

    #[test]
    fn primary_fields_merge_required() {
        let registry = registry();
        let raw = RawQuery::parse("fields%5Bproduct%5D=name,price_cents");
        let descriptor = registry.builder("product").unwrap().build(&raw).unwrap();
        assert_eq!(
            descriptor.attributes,
            Some(vec![
                "id".to_string(),
                "name".to_string(),
                "price_cents".to_string()
            ])
        );
    }

    #[test]
    fn relation_fields_attach_to_included_entry() {
        let registry = registry();
        let raw = RawQuery::parse("include=supplier&fields%5Bsupplier%5D=name");
        let descriptor = registry.builder("product").unwrap().build(&raw).unwrap();
        let entry = &descriptor.include[0];
        assert_eq!(
            entry.attributes,
            Some(vec!["id".to_string(), "name".to_string()])
        );
    }

    #[test]
    fn fields_for_non_included_relation_are_dropped() {
        let registry = registry();
        let raw = RawQuery::parse("fields%5Bsupplier%5D=name");
        let descriptor = registry.builder("product").unwrap().build(&raw).unwrap();
        assert!(descriptor.include.is_empty());
        assert!(descriptor.attributes.is_none());
    }

    #[test]
    fn fields_for_unrelated_type_are_rejected() {
        let registry = registry();
        let raw = RawQuery::parse("fields%5Border%5D=status");
        let err = registry.builder("product").unwrap().build(&raw).unwrap_err();
        assert!(matches!(err, QueryError::UnknownFieldsType { value } if value == "order"));
    }

    #[test]
    fn fields_reject_inaccessible_field() {
        let registry = registry();
        let raw = RawQuery::parse("fields%5Bproduct%5D=password_hash");
        let err = registry.builder("product").unwrap().build(&raw).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { value, .. } if value == "password_hash"));
    }

    #[test]
    fn filter_is_whitelisted() {
        let registry = registry();
        let raw = RawQuery::parse("filter%5Bstock%5D=0");
        let descriptor = registry.builder("product").unwrap().build(&raw).unwrap();
        assert_eq!(descriptor.filter, vec![("stock".to_string(), "0".to_string())]);

        let raw = RawQuery::parse("filter%5Bpassword%5D=x");
        let err = registry.builder("product").unwrap().build(&raw).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { value, .. } if value == "password"));
    }
}
