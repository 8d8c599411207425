//! Name selectors for namespaces and pods

use crate::error::Error;
use regex::Regex;

/// Compiled name selector; an empty pattern selects everything
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Option<Regex>,
}

impl NamePattern {
    /// Compile an optional selector
    pub fn compile(pattern: Option<&str>) -> Result<Self, Error> {
        let regex = match pattern.filter(|p| !p.is_empty()) {
            None => None,
            Some(p) => Some(Regex::new(p).map_err(|e| Error::invalid_pattern(p, e.to_string()))?),
        };
        Ok(Self { regex })
    }

    /// Selector that accepts every name
    pub fn any() -> Self {
        Self { regex: None }
    }

    /// Unanchored match, as with the usual regex `find` semantics
    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().map_or(true, |r| r.is_match(name))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pattern_matches_all() {
        for pattern in [None, Some("")] {
            let p = NamePattern::compile(pattern).unwrap();
            assert!(p.matches("anything"));
            assert!(p.as_str().is_none());
        }
    }

    #[test]
    fn test_unanchored_match() {
        let p = NamePattern::compile(Some("prod")).unwrap();
        assert!(p.matches("billing-prod"));
        assert!(!p.matches("billing-dev"));

        let anchored = NamePattern::compile(Some("^billing-")).unwrap();
        assert!(anchored.matches("billing-prod"));
        assert!(!anchored.matches("team-billing-prod"));
    }

    #[test]
    fn test_malformed_pattern() {
        let err = NamePattern::compile(Some("[")).unwrap_err();
        match err {
            Error::InvalidPattern { pattern, .. } => assert_eq!(pattern, "["),
            other => panic!("unexpected error: {other}"),
        }
    }
}
