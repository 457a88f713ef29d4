//! Query options library: translates untrusted HTTP query parameters into
//! safe, whitelisted query descriptors for a named resource type.
//!
//! The flow is always the same:
//!
//! 1. Each domain crate declares a static [`ResourceTypeConfig`] (accessible
//!    fields, required fields, includable relations).
//! 2. The app collects them into a [`ResourceRegistry`] at startup.
//! 3. A handler parses the request's query string into a [`RawQuery`] and runs
//!    it through a [`QueryOptionsBuilder`], producing a [`QueryDescriptor`]
//!    the repository layer can apply without trusting the client.
//! 4. After the count query ran, [`PageLinks`] computes first/last/next/prev
//!    navigation links with the same page/limit defaulting rules.
//!
//! Every request-level failure is a typed [`QueryError`] carrying a
//! human-readable detail plus the offending parameter/value.

pub mod apply;
pub mod builder;
pub mod config;
pub mod error;
pub mod pagination;
pub mod project;
pub mod raw;

pub use apply::apply_descriptor;
pub use builder::{IncludeEntry, QueryDescriptor, QueryOptionsBuilder, SortDirection};
pub use config::{RelationConfig, ResourceRegistry, ResourceTypeConfig};
pub use error::{ErrorSource, QueryError};
pub use pagination::{PageLinks, PageMeta, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use project::{project_list, project_value};
pub use raw::{FieldsParam, RawQuery};
