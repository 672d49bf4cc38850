//! Validated permission grant patterns.
//!
//! A grant is either a literal permission (`products.read`), a prefix
//! wildcard (`products.*`), or the global wildcard (`*`). A `*` anywhere
//! else is malformed and rejected when grants are resolved; a rejected
//! grant confers nothing (fail-closed).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid permission pattern '{0}': wildcard must be the whole pattern or a trailing '.*'")]
pub struct InvalidPermissionPattern(pub String);

/// One parsed grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionPattern {
    /// Exact permission string.
    Literal(String),
    /// Trailing wildcard; the stored prefix includes the dot
    /// (`products.*` matches anything starting with `products.`).
    Prefix(String),
    /// The global wildcard `*`.
    Any,
}

impl PermissionPattern {
    pub fn parse(pattern: &str) -> Result<Self, InvalidPermissionPattern> {
        if pattern == "*" {
            return Ok(PermissionPattern::Any);
        }
        if let Some(prefix) = pattern.strip_suffix(".*") {
            if prefix.is_empty() || prefix.contains('*') {
                return Err(InvalidPermissionPattern(pattern.to_string()));
            }
            return Ok(PermissionPattern::Prefix(format!("{prefix}.")));
        }
        if pattern.contains('*') {
            return Err(InvalidPermissionPattern(pattern.to_string()));
        }
        Ok(PermissionPattern::Literal(pattern.to_string()))
    }

    pub fn matches(&self, permission: &str) -> bool {
        match self {
            PermissionPattern::Literal(literal) => literal == permission,
            PermissionPattern::Prefix(prefix) => permission.starts_with(prefix.as_str()),
            PermissionPattern::Any => true,
        }
    }
}

/// A user's resolved grants.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    grants: Vec<String>,
    patterns: Vec<PermissionPattern>,
}

impl PermissionSet {
    /// Parse raw grant strings. Malformed patterns are dropped with a
    /// warning and never match anything.
    pub fn resolve(grants: &[String]) -> Self {
        let mut kept = Vec::with_capacity(grants.len());
        let mut patterns = Vec::with_capacity(grants.len());
        for grant in grants {
            match PermissionPattern::parse(grant) {
                Ok(pattern) => {
                    kept.push(grant.clone());
                    patterns.push(pattern);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed permission grant");
                }
            }
        }
        Self {
            grants: kept,
            patterns,
        }
    }

    /// Empty set — denies everything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw grant strings as handed out by the source.
    pub fn grants(&self) -> &[String] {
        &self.grants
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if any grant matches the permission.
    pub fn allows(&self, permission: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            PermissionPattern::parse("products.read").unwrap(),
            PermissionPattern::Literal("products.read".to_string())
        );
    }

    #[test]
    fn test_parse_prefix_keeps_dot() {
        assert_eq!(
            PermissionPattern::parse("products.*").unwrap(),
            PermissionPattern::Prefix("products.".to_string())
        );
    }

    #[test]
    fn test_parse_global_wildcard() {
        assert_eq!(PermissionPattern::parse("*").unwrap(), PermissionPattern::Any);
    }

    #[test]
    fn test_parse_rejects_non_trailing_wildcard() {
        assert!(PermissionPattern::parse("prod*.read").is_err());
        assert!(PermissionPattern::parse("*.read").is_err());
        assert!(PermissionPattern::parse(".*").is_err());
        assert!(PermissionPattern::parse("products.**").is_err());
    }

    #[test]
    fn test_prefix_matching() {
        let pattern = PermissionPattern::parse("products.*").unwrap();
        assert!(pattern.matches("products.read"));
        assert!(pattern.matches("products.bom.update"));
        assert!(!pattern.matches("products"));
        assert!(!pattern.matches("suppliers.read"));
    }

    #[test]
    fn test_resolve_drops_malformed_grants() {
        let set = PermissionSet::resolve(&[
            "products.*".to_string(),
            "bad*pattern".to_string(),
            "ecos.approve".to_string(),
        ]);
        assert_eq!(set.grants().len(), 2);
        assert!(set.allows("products.read"));
        assert!(set.allows("ecos.approve"));
        assert!(!set.allows("bad.pattern"));
    }

    #[test]
    fn test_spec_examples() {
        let wildcard = PermissionSet::resolve(&["*".to_string()]);
        assert!(wildcard.allows("products.read"));

        let prefixed = PermissionSet::resolve(&["products.*".to_string()]);
        assert!(prefixed.allows("products.read"));

        let literal = PermissionSet::resolve(&["products.read".to_string()]);
        assert!(literal.allows("products.read"));

        let other = PermissionSet::resolve(&["suppliers.*".to_string()]);
        assert!(!other.allows("products.read"));
    }
}
