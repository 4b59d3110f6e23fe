//! # Source Override Rules
//!
//! The workspace root's description may rewrite where a package set is
//! fetched from, e.g. to redirect a public repository to an internal
//! mirror. Rules are matched against the *repository identity* of a
//! descriptor, so superficial URL differences still hit.
//!
//! Resolution is pure (no I/O) and idempotent: feeding a descriptor that
//! is already the result of a rewrite back in returns it unchanged, and
//! at most one rewrite is applied per call. Rules may be scoped to a
//! caller-supplied scope key (the resolver always passes
//! `pkg_set:<root identity>`); an unscoped rule applies everywhere.

use serde::{Deserialize, Serialize};

use crate::source::SourceDescriptor;

/// A single rewrite rule from the `overrides:` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OverrideRule {
    /// Scope key this rule is restricted to. `None` applies to every
    /// scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// The descriptor to match, by repository identity.
    #[serde(rename = "match")]
    pub matches: SourceDescriptor,
    /// The descriptor to substitute.
    pub rewrite: SourceDescriptor,
}

/// The set of configured override rules.
#[derive(Debug, Clone, Default)]
pub struct OverrideConfig {
    rules: Vec<OverrideRule>,
}

impl OverrideConfig {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply the first matching rule for `scope_key` to `descriptor`.
    ///
    /// Returns the descriptor unchanged when no rule matches or when the
    /// descriptor is already the rewrite target of an applicable rule
    /// (idempotence).
    pub fn resolve(&self, scope_key: &str, descriptor: &SourceDescriptor) -> SourceDescriptor {
        let identity = descriptor.identity();
        let applicable = |rule: &&OverrideRule| {
            rule.scope.as_deref().map_or(true, |s| s == scope_key)
        };

        // Already-rewritten descriptors pass through untouched.
        if self
            .rules
            .iter()
            .filter(applicable)
            .any(|rule| rule.rewrite.identity() == identity)
        {
            return descriptor.clone();
        }

        for rule in self.rules.iter().filter(applicable) {
            if rule.matches.identity() == identity {
                return rule.rewrite.clone();
            }
        }
        descriptor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn git(url: &str, rev: &str) -> SourceDescriptor {
        SourceDescriptor::git(Url::parse(url).unwrap(), rev)
    }

    fn rule(scope: Option<&str>, matches: SourceDescriptor, rewrite: SourceDescriptor) -> OverrideRule {
        OverrideRule {
            scope: scope.map(str::to_string),
            matches,
            rewrite,
        }
    }

    #[test]
    fn test_no_rules_is_identity() {
        let config = OverrideConfig::default();
        let d = git("https://example.com/sets.git", "main");
        assert_eq!(config.resolve("pkg_set:root", &d), d);
    }

    #[test]
    fn test_rewrite_applied() {
        let public = git("https://github.com/example/sets.git", "main");
        let mirror = git("https://git.internal/mirrors/sets.git", "main");
        let config = OverrideConfig::new(vec![rule(None, public.clone(), mirror.clone())]);
        assert_eq!(config.resolve("pkg_set:root", &public), mirror);
    }

    #[test]
    fn test_match_by_identity_not_raw_form() {
        let public = git("https://github.com/example/sets.git", "main");
        let spelled_differently = git("https://GITHUB.com/example/sets", "main");
        let mirror = git("https://git.internal/mirrors/sets.git", "main");
        let config = OverrideConfig::new(vec![rule(None, public, mirror.clone())]);
        assert_eq!(config.resolve("pkg_set:root", &spelled_differently), mirror);
    }

    #[test]
    fn test_idempotent() {
        let public = git("https://github.com/example/sets.git", "main");
        let mirror = git("https://git.internal/mirrors/sets.git", "main");
        let config = OverrideConfig::new(vec![rule(None, public.clone(), mirror.clone())]);
        let once = config.resolve("pkg_set:root", &public);
        let twice = config.resolve("pkg_set:root", &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_scope_restriction() {
        let public = git("https://github.com/example/sets.git", "main");
        let mirror = git("https://git.internal/mirrors/sets.git", "main");
        let config = OverrideConfig::new(vec![rule(
            Some("pkg_set:local:/srv/ws"),
            public.clone(),
            mirror.clone(),
        )]);
        assert_eq!(config.resolve("pkg_set:local:/srv/ws", &public), mirror);
        assert_eq!(config.resolve("pkg_set:local:/srv/other", &public), public);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let public = git("https://github.com/example/sets.git", "main");
        let first = git("https://git.internal/a/sets.git", "main");
        let second = git("https://git.internal/b/sets.git", "main");
        let config = OverrideConfig::new(vec![
            rule(None, public.clone(), first.clone()),
            rule(None, public.clone(), second),
        ]);
        assert_eq!(config.resolve("pkg_set:root", &public), first);
    }

    #[test]
    fn test_single_rewrite_per_call() {
        // A chain a -> b, b -> c must not collapse to c in one call.
        let a = git("https://example.com/a.git", "main");
        let b = git("https://example.com/b.git", "main");
        let c = git("https://example.com/c.git", "main");
        let config = OverrideConfig::new(vec![
            rule(None, a.clone(), b.clone()),
            rule(None, b.clone(), c),
        ]);
        assert_eq!(config.resolve("pkg_set:root", &a), b);
        // And b, being a rewrite target, stays put.
        assert_eq!(config.resolve("pkg_set:root", &b), b);
    }

    #[test]
    fn test_rule_deserializes_from_yaml() {
        let yaml = r#"
scope: "pkg_set:local:/srv/ws"
match:
  url: https://github.com/example/sets.git
  ref: main
rewrite:
  url: https://git.internal/mirrors/sets.git
  ref: main
"#;
        let rule: OverrideRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.scope.as_deref(), Some("pkg_set:local:/srv/ws"));
        assert!(!rule.matches.is_local());
    }
}
