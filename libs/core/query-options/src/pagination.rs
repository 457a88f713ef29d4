//! Pagination link generation.
//!
//! Links are computed from the current request's path + raw query and the
//! total result count, using the same defaulting rules as the builder's
//! pagination step. The out-of-bounds check runs here, after the primary
//! query executed, so it reflects true record counts.

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::QueryError;
use crate::raw::RawQuery;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Navigation links for one list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// The `meta` object of a list payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PageMeta {
    /// Total number of records matching the query, before pagination.
    pub total: u64,
    pub first: String,
    pub last: String,
    pub next: Option<String>,
    pub prev: Option<String>,
}

impl PageMeta {
    pub fn new(total: u64, links: PageLinks) -> Self {
        Self {
            total,
            first: links.first,
            last: links.last,
            next: links.next,
            prev: links.prev,
        }
    }
}

impl PageLinks {
    /// Compute first/last/next/prev links for the current request.
    ///
    /// `page` and `limit` are re-parsed from the raw parameters with the
    /// builder's defaulting rules. A requested page beyond the last page is a
    /// hard error ([`QueryError::PageOutOfBounds`], HTTP 404 semantics).
    pub fn build(path: &str, raw: &RawQuery, total: u64) -> Result<Self, QueryError> {
        let page = parse_or_default(raw.page.as_deref(), DEFAULT_PAGE);
        let limit = parse_or_default(raw.limit.as_deref(), DEFAULT_LIMIT);

        let last = if total == 0 { 1 } else { total.div_ceil(limit) };
        if page > last {
            return Err(QueryError::PageOutOfBounds { page, last });
        }

        let next = if page + 1 > last {
            None
        } else {
            Some(render(path, raw, page + 1))
        };
        let prev = if page <= 1 {
            None
        } else {
            Some(render(path, raw, page - 1))
        };

        Ok(Self {
            first: render(path, raw, 1),
            last: render(path, raw, last),
            next,
            prev,
        })
    }
}

fn parse_or_default(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as u64)
        .unwrap_or(default)
}

/// Re-render the query string, preserving every original parameter and
/// overriding only `page`.
fn render(path: &str, raw: &RawQuery, page: u64) -> String {
    let mut pieces: Vec<String> = Vec::with_capacity(raw.pairs.len() + 1);
    let mut page_written = false;

    for (key, value) in &raw.pairs {
        if key == "page" {
            if !page_written {
                pieces.push(format!("page={page}"));
                page_written = true;
            }
        } else {
            pieces.push(format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            ));
        }
    }
    if !page_written {
        pieces.push(format!("page={page}"));
    }

    format!("{path}?{}", pieces.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_has_both_neighbours() {
        let raw = RawQuery::parse("page=2&limit=10");
        let links = PageLinks::build("/api/products", &raw, 25).unwrap();
        assert_eq!(links.first, "/api/products?page=1&limit=10");
        assert_eq!(links.last, "/api/products?page=3&limit=10");
        assert_eq!(links.next.as_deref(), Some("/api/products?page=3&limit=10"));
        assert_eq!(links.prev.as_deref(), Some("/api/products?page=1&limit=10"));
    }

    #[test]
    fn last_page_has_no_next() {
        let raw = RawQuery::parse("page=3&limit=10");
        let links = PageLinks::build("/api/products", &raw, 25).unwrap();
        assert!(links.next.is_none());
        assert_eq!(links.prev.as_deref(), Some("/api/products?page=2&limit=10"));
    }

    #[test]
    fn page_beyond_last_is_an_error() {
        let raw = RawQuery::parse("page=4&limit=10");
        let err = PageLinks::build("/api/products", &raw, 25).unwrap_err();
        assert!(matches!(
            err,
            QueryError::PageOutOfBounds { page: 4, last: 3 }
        ));
    }

    #[test]
    fn empty_result_set_has_a_single_page() {
        let raw = RawQuery::parse("");
        let links = PageLinks::build("/api/products", &raw, 0).unwrap();
        assert_eq!(links.first, "/api/products?page=1");
        assert_eq!(links.last, "/api/products?page=1");
        assert!(links.next.is_none());
        assert!(links.prev.is_none());
    }

    #[test]
    fn other_parameters_survive() {
        let raw = RawQuery::parse("filter%5Bstatus%5D=paid&page=1&limit=10&sort=-created_at");
        let links = PageLinks::build("/api/orders", &raw, 25).unwrap();
        let next = links.next.unwrap();
        assert!(next.contains("filter%5Bstatus%5D=paid"));
        assert!(next.contains("sort=-created_at"));
        assert!(next.contains("page=2"));
    }

    #[test]
    fn defaults_agree_with_the_builder() {
        // Non-numeric raw values are treated as absent here too.
        let raw = RawQuery::parse("page=banana");
        let links = PageLinks::build("/api/products", &raw, 25).unwrap();
        assert_eq!(links.next.as_deref(), Some("/api/products?page=2"));
    }
}
