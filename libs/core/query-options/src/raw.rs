//! Raw query-string parsing.
//!
//! Axum's `Query<T>` extractor cannot represent the JSON-API bracket syntax
//! (`fields[product]=id,name`, `filter[status]=paid`), so handlers hand the
//! raw query string to [`RawQuery::parse`] instead. Parsing never fails: this
//! stage only sorts pairs into buckets, all validation happens in the builder.

use std::borrow::Cow;

/// The `fields` parameter as received on the wire.
///
/// The contract requires a mapping (`fields[type]=a,b`); a bare
/// `fields=a,b` is kept verbatim so the builder can reject it with the
/// offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldsParam {
    /// `fields=...` without a type key. Always a validation error.
    Bare(String),
    /// `fields[type]=list` entries in request order.
    Map(Vec<(String, String)>),
}

/// Decoded, untyped query parameters for one request.
#[derive(Debug, Clone, Default)]
pub struct RawQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub include: Option<String>,
    pub fields: Option<FieldsParam>,
    /// `filter[field]=value` entries in request order.
    pub filter: Vec<(String, String)>,
    /// Every original pair, decoded, in request order. Pagination links
    /// re-render these so unrelated parameters survive round-trips.
    pub pairs: Vec<(String, String)>,
}

impl RawQuery {
    /// Parse a query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let mut raw = RawQuery::default();

        for piece in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = piece.split_once('=').unwrap_or((piece, ""));
            let key = decode(key);
            let value = decode(value);

            match key.as_str() {
                "page" => raw.page = Some(value.clone()),
                "limit" => raw.limit = Some(value.clone()),
                "sort" => raw.sort = Some(value.clone()),
                "include" => raw.include = Some(value.clone()),
                "fields" => raw.fields = Some(FieldsParam::Bare(value.clone())),
                _ => {
                    if let Some(inner) = bracket_key(&key, "fields") {
                        match raw.fields {
                            // A bare `fields=` already poisoned the parameter;
                            // keep it so the builder reports the right error.
                            Some(FieldsParam::Bare(_)) => {}
                            Some(FieldsParam::Map(ref mut entries)) => {
                                entries.push((inner.to_string(), value.clone()));
                            }
                            None => {
                                raw.fields = Some(FieldsParam::Map(vec![(
                                    inner.to_string(),
                                    value.clone(),
                                )]));
                            }
                        }
                    } else if let Some(inner) = bracket_key(&key, "filter") {
                        raw.filter.push((inner.to_string(), value.clone()));
                    }
                }
            }

            raw.pairs.push((key, value));
        }

        raw
    }
}

/// Extract `inner` from keys shaped like `prefix[inner]`.
fn bracket_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
        .filter(|inner| !inner.is_empty())
}

fn decode(component: &str) -> String {
    // Form encoding uses '+' for spaces; percent-decode the rest.
    let spaced = component.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(Cow::Borrowed(_)) => spaced,
        Ok(Cow::Owned(decoded)) => decoded,
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_parameters() {
        let raw = RawQuery::parse("page=2&limit=5&sort=-created_at&include=supplier");
        assert_eq!(raw.page.as_deref(), Some("2"));
        assert_eq!(raw.limit.as_deref(), Some("5"));
        assert_eq!(raw.sort.as_deref(), Some("-created_at"));
        assert_eq!(raw.include.as_deref(), Some("supplier"));
        assert_eq!(raw.pairs.len(), 4);
    }

    #[test]
    fn parses_bracketed_fields_and_filters() {
        let raw = RawQuery::parse("fields%5Bproduct%5D=id,name&filter%5Bstatus%5D=paid");
        match raw.fields {
            Some(FieldsParam::Map(entries)) => {
                assert_eq!(entries, vec![("product".to_string(), "id,name".to_string())]);
            }
            other => panic!("expected fields map, got {other:?}"),
        }
        assert_eq!(
            raw.filter,
            vec![("status".to_string(), "paid".to_string())]
        );
    }

    #[test]
    fn bare_fields_is_kept_for_rejection() {
        let raw = RawQuery::parse("fields=id,name");
        assert_eq!(
            raw.fields,
            Some(FieldsParam::Bare("id,name".to_string()))
        );
    }

    #[test]
    fn unrelated_pairs_are_preserved() {
        let raw = RawQuery::parse("page=1&foo=bar");
        assert!(raw.pairs.contains(&("foo".to_string(), "bar".to_string())));
    }

    #[test]
    fn plus_decodes_to_space() {
        let raw = RawQuery::parse("filter%5Bname%5D=red+shoes");
        assert_eq!(raw.filter[0].1, "red shoes");
    }
}
