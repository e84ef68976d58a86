//! URL pattern matching for bindings
//!
//! Matching is deterministic and side-effect free: the same URL and rule set
//! always produce the same matches, in input order. No match is not an error;
//! callers decide fallback behavior.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::catalog::error::CatalogError;

/// Specificity class of a match rule. Declared in ascending order so the
/// derived `Ord` ranks exact > domain > path-prefix > regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Specificity {
    Regex,
    PathPrefix,
    Domain,
    Exact,
}

/// Kind of URL match a rule performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKind {
    /// Identical URL after normalization
    Exact,

    /// Host equality or sub-domain suffix
    Domain,

    /// Host equality plus path prefix, pattern form `host/prefix`
    PathPrefix,

    /// Anchored regular expression over the normalized URL
    Regex,
}

impl MatchKind {
    pub fn specificity(&self) -> Specificity {
        match self {
            MatchKind::Exact => Specificity::Exact,
            MatchKind::Domain => Specificity::Domain,
            MatchKind::PathPrefix => Specificity::PathPrefix,
            MatchKind::Regex => Specificity::Regex,
        }
    }
}

/// A URL match rule attached to a binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRule {
    pub kind: MatchKind,
    pub pattern: String,
}

/// Normalize a parsed URL for comparison: `Url::parse` already lower-cases
/// scheme and host; this additionally strips any trailing slash.
pub fn normalized_url_str(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

impl MatchRule {
    pub fn exact(pattern: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Exact,
            pattern: pattern.into(),
        }
    }

    pub fn domain(pattern: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Domain,
            pattern: pattern.into(),
        }
    }

    pub fn path_prefix(pattern: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::PathPrefix,
            pattern: pattern.into(),
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Regex,
            pattern: pattern.into(),
        }
    }

    pub fn specificity(&self) -> Specificity {
        self.kind.specificity()
    }

    /// Whether this rule matches `url`. Errors only when the rule's own
    /// pattern cannot be evaluated, never because of the candidate URL.
    pub fn matches(&self, url: &Url) -> Result<bool, CatalogError> {
        match self.kind {
            MatchKind::Exact => {
                let pattern_url =
                    Url::parse(&self.pattern).map_err(|e| CatalogError::InvalidPattern {
                        pattern: self.pattern.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(normalized_url_str(url) == normalized_url_str(&pattern_url))
            }
            MatchKind::Domain => {
                let Some(host) = url.host_str() else {
                    return Ok(false);
                };
                let want = self.pattern.to_ascii_lowercase();
                Ok(host == want || host.ends_with(&format!(".{want}")))
            }
            MatchKind::PathPrefix => {
                let trimmed = self
                    .pattern
                    .split_once("://")
                    .map(|(_, rest)| rest)
                    .unwrap_or(&self.pattern);
                let (want_host, prefix) = match trimmed.split_once('/') {
                    Some((h, p)) => (h.to_ascii_lowercase(), format!("/{p}")),
                    None => (trimmed.to_ascii_lowercase(), "/".to_string()),
                };
                let Some(host) = url.host_str() else {
                    return Ok(false);
                };
                Ok(host == want_host && url.path().starts_with(&prefix))
            }
            MatchKind::Regex => {
                let re = Regex::new(&format!("^(?:{})$", self.pattern)).map_err(|e| {
                    CatalogError::InvalidPattern {
                        pattern: self.pattern.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(re.is_match(&normalized_url_str(url)))
            }
        }
    }
}

/// A rule that matched a URL, tagged with its specificity class
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub rule: &'a MatchRule,
    pub specificity: Specificity,
}

/// Match `url` against `rules`, preserving input order. Rules whose patterns
/// cannot be evaluated are skipped and logged; they never abort matching.
pub fn match_rules<'a>(
    url: &Url,
    rules: impl IntoIterator<Item = &'a MatchRule>,
) -> Vec<RuleMatch<'a>> {
    let mut matches = Vec::new();
    for rule in rules {
        match rule.matches(url) {
            Ok(true) => matches.push(RuleMatch {
                rule,
                specificity: rule.specificity(),
            }),
            Ok(false) => {}
            Err(e) => {
                warn!(pattern = %rule.pattern, error = %e, "skipping unevaluable match rule");
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn exact_match_normalizes_case_and_trailing_slash() {
        let rule = MatchRule::exact("https://example.com/news");
        assert!(rule.matches(&url("HTTPS://EXAMPLE.COM/news/")).unwrap());
        assert!(!rule.matches(&url("https://example.com/News")).unwrap());
    }

    #[test]
    fn domain_match_covers_subdomains() {
        let rule = MatchRule::domain("example.com");
        assert!(rule.matches(&url("https://example.com/a")).unwrap());
        assert!(rule.matches(&url("https://blog.example.com/a")).unwrap());
        assert!(!rule.matches(&url("https://notexample.com/a")).unwrap());
    }

    #[test]
    fn path_prefix_requires_host_equality() {
        let rule = MatchRule::path_prefix("example.com/docs");
        assert!(rule.matches(&url("https://example.com/docs/intro")).unwrap());
        assert!(!rule.matches(&url("https://example.com/blog")).unwrap());
        assert!(!rule.matches(&url("https://blog.example.com/docs")).unwrap());
    }

    #[test]
    fn regex_match_is_anchored() {
        let rule = MatchRule::regex(r"https://example\.com/article/\d+");
        assert!(rule.matches(&url("https://example.com/article/42")).unwrap());
        // A partial match must not count as a match.
        assert!(
            !rule
                .matches(&url("https://example.com/article/42/comments"))
                .unwrap()
        );
    }

    #[test]
    fn invalid_regex_is_an_error_not_a_non_match() {
        let rule = MatchRule::regex("([unclosed");
        assert!(matches!(
            rule.matches(&url("https://example.com")),
            Err(CatalogError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn no_match_is_an_empty_result() {
        let rules = vec![MatchRule::domain("other.com")];
        let found = match_rules(&url("https://example.com"), &rules);
        assert!(found.is_empty());
    }

    #[test]
    fn matching_is_deterministic() {
        let rules = vec![
            MatchRule::domain("example.com"),
            MatchRule::exact("https://example.com/a"),
            MatchRule::regex(r"https://example\.com/.*"),
        ];
        let target = url("https://example.com/a");

        let first: Vec<Specificity> = match_rules(&target, &rules)
            .iter()
            .map(|m| m.specificity)
            .collect();
        let second: Vec<Specificity> = match_rules(&target, &rules)
            .iter()
            .map(|m| m.specificity)
            .collect();

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![Specificity::Domain, Specificity::Exact, Specificity::Regex]
        );
    }

    #[test]
    fn specificity_orders_exact_above_all() {
        assert!(Specificity::Exact > Specificity::Domain);
        assert!(Specificity::Domain > Specificity::PathPrefix);
        assert!(Specificity::PathPrefix > Specificity::Regex);
    }
}
