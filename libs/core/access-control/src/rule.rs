//! Permission rules and their parsing.
//!
//! Permission rows are colon-delimited names of the form
//! `action:subject[:scope]`. They resolve into explicit [`Rule`] values with
//! a tagged [`Scope`] instead of string-mangled action names, and ownership
//! conditions bind the requester's id at parse time.

use uuid::Uuid;

/// How far a rule reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Unqualified `action:subject` permission.
    None,
    /// `:own` — restricted to records whose ownership field matches the
    /// requester.
    Own,
    /// `:all` — elevated, covers every record of the subject type.
    All,
}

/// One resolved permission rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub action: String,
    pub subject: String,
    pub scope: Scope,
    /// For [`Scope::Own`] rules: the ownership field and the requester id it
    /// must match.
    pub ownership: Option<(&'static str, Uuid)>,
}

impl Rule {
    pub fn universal(action: &str, subject: &str) -> Self {
        Self {
            action: action.to_string(),
            subject: subject.to_string(),
            scope: Scope::None,
            ownership: None,
        }
    }

    pub fn all(action: &str, subject: &str) -> Self {
        Self {
            action: action.to_string(),
            subject: subject.to_string(),
            scope: Scope::All,
            ownership: None,
        }
    }

    pub fn own(action: &str, subject: &str, field: &'static str, owner: Uuid) -> Self {
        Self {
            action: action.to_string(),
            subject: subject.to_string(),
            scope: Scope::Own,
            ownership: Some((field, owner)),
        }
    }
}

/// Explicit subject-type → ownership-field map.
///
/// There is deliberately no fallback field name: an own-scoped permission for
/// a subject missing here is skipped (deny-safe) rather than guessed at.
pub fn ownership_field(subject: &str) -> Option<&'static str> {
    match subject {
        "user" => Some("id"),
        "supplier" => Some("id"),
        "product" => Some("supplier_id"),
        "sale" => Some("supplier_id"),
        "order" => Some("user_id"),
        "review" => Some("user_id"),
        "media" => Some("owner_id"),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("permission name '{0}' is not of the form action:subject[:scope]")]
    Malformed(String),
    #[error("subject '{0}' has no ownership field mapping")]
    UnmappedSubject(String),
}

/// Parse a permission name into a rule for the given requester.
pub fn parse_permission(name: &str, requester: Uuid) -> Result<Rule, RuleParseError> {
    let parts: Vec<&str> = name.split(':').collect();
    match parts.as_slice() {
        [action, subject] if !action.is_empty() && !subject.is_empty() => {
            Ok(Rule::universal(action, subject))
        }
        [action, subject, "all"] if !action.is_empty() && !subject.is_empty() => {
            Ok(Rule::all(action, subject))
        }
        [action, subject, "own"] if !action.is_empty() && !subject.is_empty() => {
            let field = ownership_field(subject)
                .ok_or_else(|| RuleParseError::UnmappedSubject(subject.to_string()))?;
            Ok(Rule::own(action, subject, field, requester))
        }
        _ => Err(RuleParseError::Malformed(name.to_string())),
    }
}

/// A resource instance presented to an ownership-scoped authorization check.
///
/// This is the explicit replacement for marker-field hacks on ad-hoc objects:
/// call sites tag the subject type and attach the ownership values the static
/// map expects.
#[derive(Debug, Clone)]
pub struct SubjectRecord {
    subject: String,
    owners: Vec<(&'static str, Uuid)>,
}

impl SubjectRecord {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            owners: Vec::new(),
        }
    }

    pub fn owned_by(mut self, field: &'static str, owner: Uuid) -> Self {
        self.owners.push((field, owner));
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn owner(&self, field: &str) -> Option<Uuid> {
        self.owners
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, id)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_three_shapes() {
        let requester = Uuid::new_v4();

        let rule = parse_permission("read:product", requester).unwrap();
        assert_eq!(rule.scope, Scope::None);
        assert!(rule.ownership.is_none());

        let rule = parse_permission("read:order:all", requester).unwrap();
        assert_eq!(rule.scope, Scope::All);

        let rule = parse_permission("update:product:own", requester).unwrap();
        assert_eq!(rule.scope, Scope::Own);
        assert_eq!(rule.ownership, Some(("supplier_id", requester)));
    }

    #[test]
    fn rejects_malformed_names() {
        let requester = Uuid::new_v4();
        assert!(matches!(
            parse_permission("read", requester),
            Err(RuleParseError::Malformed(_))
        ));
        assert!(matches!(
            parse_permission("read:product:sometimes", requester),
            Err(RuleParseError::Malformed(_))
        ));
        assert!(matches!(
            parse_permission(":product", requester),
            Err(RuleParseError::Malformed(_))
        ));
    }

    #[test]
    fn own_scope_without_mapping_is_rejected() {
        let requester = Uuid::new_v4();
        assert_eq!(
            parse_permission("read:invoice:own", requester),
            Err(RuleParseError::UnmappedSubject("invoice".to_string()))
        );
    }

    #[test]
    fn subject_record_carries_owner_values() {
        let owner = Uuid::new_v4();
        let record = SubjectRecord::new("product").owned_by("supplier_id", owner);
        assert_eq!(record.owner("supplier_id"), Some(owner));
        assert_eq!(record.owner("user_id"), None);
    }
}
