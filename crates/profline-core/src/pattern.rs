//! Key matching.
//!
//! A key used for lookup is compiled into a [`KeyPattern`]:
//!
//! - a key containing `*` is a wildcard, `*` standing for any sequence,
//!   anchored at both ends and matched case-insensitively;
//! - any other key is a case-insensitive, anchored regular expression. Keys
//!   without regex metacharacters take a fast path that compares text
//!   directly, which is equivalent;
//! - in literal-only mode nothing is interpreted and keys must be equal.
//!
//! A key that fails to compile as a regex falls back to literal equality.

use regex::{Regex, RegexBuilder};
use tracing::debug;

/// The wildcard character in key patterns.
pub const WILDCARD: char = '*';

const REGEX_META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

#[derive(Clone, Debug)]
enum Matcher {
    Exact,
    Plain(String),
    Pattern(Regex),
}

/// A compiled lookup key.
#[derive(Clone, Debug)]
pub struct KeyPattern {
    source: String,
    wildcard: bool,
    matcher: Matcher,
}

impl KeyPattern {
    /// Compile `pattern`. With `literal_only` set the pattern is compared
    /// verbatim.
    pub fn compile(pattern: &str, literal_only: bool) -> Self {
        let source = pattern.to_string();
        if literal_only {
            return Self { source, wildcard: false, matcher: Matcher::Exact };
        }

        if pattern.contains(WILDCARD) {
            let body = pattern
                .split(WILDCARD)
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            let matcher = match build_regex(&format!("^{body}$")) {
                Some(re) => Matcher::Pattern(re),
                None => Matcher::Exact,
            };
            return Self { source, wildcard: true, matcher };
        }

        if !pattern.contains(REGEX_META) {
            let lowered = pattern.to_lowercase();
            return Self { source, wildcard: false, matcher: Matcher::Plain(lowered) };
        }

        let mut expr = String::with_capacity(pattern.len() + 2);
        if !pattern.starts_with('^') {
            expr.push('^');
        }
        expr.push_str(pattern);
        if !pattern.ends_with('$') || pattern.ends_with("\\$") {
            expr.push('$');
        }
        let matcher = match build_regex(&expr) {
            Some(re) => Matcher::Pattern(re),
            None => {
                debug!(key = pattern, "key is not a valid pattern; matching literally");
                Matcher::Exact
            }
        };
        Self { source, wildcard: false, matcher }
    }

    /// The pattern text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the pattern contains a wildcard and wildcards are
    /// being interpreted.
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// The portion of the pattern before the first wildcard, or before the
    /// first regex metacharacter of a regex key. A plain key is its own
    /// prefix, so stripping it from the key it matches leaves `""`.
    pub fn literal_prefix(&self) -> &str {
        if self.wildcard {
            return self.source.split(WILDCARD).next().unwrap_or("");
        }
        if !matches!(self.matcher, Matcher::Pattern(_)) {
            return &self.source;
        }
        let body = self.source.strip_prefix('^').unwrap_or(&self.source);
        match body.find(REGEX_META) {
            Some(at) => &body[..at],
            None => body,
        }
    }

    /// Test a stored key against this pattern.
    pub fn is_match(&self, key: &str) -> bool {
        match &self.matcher {
            Matcher::Exact => key == self.source,
            Matcher::Plain(lowered) => key.to_lowercase() == *lowered,
            Matcher::Pattern(re) => re.is_match(key),
        }
    }

    /// Remove the literal prefix from a key this pattern matched.
    pub fn strip<'k>(&self, key: &'k str) -> &'k str {
        let prefix = self.literal_prefix();
        match key.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(prefix) => &key[prefix.len()..],
            _ => key,
        }
    }
}

fn build_regex(expr: &str) -> Option<Regex> {
    RegexBuilder::new(expr).case_insensitive(true).build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_key_is_case_insensitive() {
        let p = KeyPattern::compile("-Retries", false);
        assert!(p.is_match("-Retries"));
        assert!(p.is_match("-retries"));
        assert!(!p.is_match("-Retries2"));
        assert!(!p.is_wildcard());
    }

    #[test]
    fn literal_mode_requires_equality() {
        let p = KeyPattern::compile("-Task*", true);
        assert!(p.is_match("-Task*"));
        assert!(!p.is_match("-Task1"));
        assert!(!KeyPattern::compile("-Name", true).is_match("-name"));
    }

    #[test]
    fn wildcard_anchors_both_ends() {
        let p = KeyPattern::compile("-Task*", false);
        assert!(p.is_wildcard());
        assert!(p.is_match("-Task"));
        assert!(p.is_match("-TaskRenew"));
        assert!(p.is_match("-taskrenew"));
        assert!(!p.is_match("-SubTask"));
    }

    #[test]
    fn wildcard_escapes_other_characters() {
        let p = KeyPattern::compile("-Site.*", false);
        assert!(p.is_match("-Site.Name"));
        assert!(!p.is_match("-SiteXName"));
    }

    #[test]
    fn regex_key_gets_end_anchor() {
        let p = KeyPattern::compile("-Host(Name|Port)", false);
        assert!(p.is_match("-HostName"));
        assert!(p.is_match("-hostport"));
        assert!(!p.is_match("-HostNameX"));
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        let p = KeyPattern::compile("-Bad(", false);
        assert!(p.is_match("-Bad("));
        assert!(!p.is_match("-bad("));
    }

    #[test]
    fn strip_removes_literal_prefix() {
        let p = KeyPattern::compile("-Task*", false);
        assert_eq!(p.literal_prefix(), "-Task");
        assert_eq!(p.strip("-TaskRenew"), "Renew");
        assert_eq!(p.strip("-taskRenew"), "Renew");
    }

    #[test]
    fn regex_key_strips_up_to_first_metacharacter() {
        let p = KeyPattern::compile("-Host(Name|Port)", false);
        assert_eq!(p.literal_prefix(), "-Host");
        assert_eq!(p.strip("-HostPort"), "Port");

        let anchored = KeyPattern::compile("^-Site.+", false);
        assert_eq!(anchored.literal_prefix(), "-Site");
        assert_eq!(anchored.strip("-SiteName"), "Name");
    }

    #[test]
    fn plain_key_strips_to_empty() {
        let p = KeyPattern::compile("-Name", false);
        assert_eq!(p.literal_prefix(), "-Name");
        assert_eq!(p.strip("-name"), "");
    }
}
