//! The ordered entry store.
//!
//! A [`Profile`] is an ordered sequence of [`Entry`] values. Duplicate keys
//! are legal and meaningful: a repeated key is a list. Every key-based
//! operation resolves its argument through a [`KeyPattern`], so callers may
//! pass literal keys, wildcards, or regular expressions, and always get the
//! first match by position.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::entry::Entry;
use crate::error::{ProfileError, ProfileResult};
use crate::line;
use crate::pattern::KeyPattern;
use crate::value::{FromValue, Value};

/// An ordered multimap of key/value entries.
#[derive(Clone, Debug, Default)]
pub struct Profile {
    entries: Vec<Entry>,
    literal_keys: bool,
}

impl Profile {
    /// Create an empty profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty profile in literal-only key mode.
    pub fn literal() -> Self {
        Self {
            entries: Vec::new(),
            literal_keys: true,
        }
    }

    /// Returns `true` if keys are compared verbatim instead of as patterns.
    pub fn literal_keys(&self) -> bool {
        self.literal_keys
    }

    /// Switch literal-only key mode on or off.
    pub fn set_literal_keys(&mut self, literal: bool) {
        self.literal_keys = literal;
    }

    /// Compile a lookup key under this profile's key mode.
    pub fn pattern(&self, key: &str) -> KeyPattern {
        KeyPattern::compile(key, self.literal_keys)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the profile has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Iterate keys in order, duplicates included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// The entry at `index`.
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Mutable access to the entry at `index`.
    pub fn entry_mut(&mut self, index: usize) -> Option<&mut Entry> {
        self.entries.get_mut(index)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append an entry, duplicates allowed.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.push(Entry::new(key, value));
    }

    /// Insert an entry at `index`, clamped to the end.
    pub fn insert(&mut self, index: usize, key: impl Into<String>, value: impl Into<Value>) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, Entry::new(key, value));
    }

    /// Remove and return the entry at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<Entry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    // ---------------------------------------------------------------
    // Key-based access
    // ---------------------------------------------------------------

    /// Position of the first entry whose key matches `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index_of_pattern(&self.pattern(key))
    }

    /// Position of the first entry matching a compiled pattern.
    pub fn index_of_pattern(&self, pattern: &KeyPattern) -> Option<usize> {
        self.entries.iter().position(|e| pattern.is_match(&e.key))
    }

    /// Value of the first entry whose key matches `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index_of(key).map(|i| &self.entries[i].value)
    }

    /// Values of every matching entry, in order.
    pub fn values_of(&self, key: &str) -> Vec<&Value> {
        let pattern = self.pattern(key);
        self.entries
            .iter()
            .filter(|e| pattern.is_match(&e.key))
            .map(|e| &e.value)
            .collect()
    }

    /// Returns `true` if any key matches `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    /// Replace the value of the first match, or append a new entry.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        match self.index_of(key) {
            Some(i) => self.entries[i].value = value.into(),
            None => self.entries.push(Entry::new(key, value)),
        }
    }

    /// Remove every matching entry. Returns how many were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let pattern = self.pattern(key);
        let before = self.entries.len();
        self.entries.retain(|e| !pattern.is_match(&e.key));
        before - self.entries.len()
    }

    /// All matching entries in their original order. With `strip_prefix` the
    /// literal part of `key` before its first wildcard is removed from each
    /// result key.
    pub fn subset(&self, key: &str, strip_prefix: bool) -> Profile {
        let pattern = self.pattern(key);
        let entries = self
            .entries
            .iter()
            .filter(|e| pattern.is_match(&e.key))
            .map(|e| {
                let key: &str = if strip_prefix { pattern.strip(&e.key) } else { &e.key };
                Entry::new(key, e.value.clone())
            })
            .collect();
        Profile {
            entries,
            literal_keys: self.literal_keys,
        }
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    /// Distinct stored keys matching a pattern, in order of first
    /// appearance.
    pub(crate) fn distinct_keys_matching(&self, pattern: &KeyPattern) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for e in &self.entries {
            if pattern.is_match(&e.key) && !keys.contains(&e.key) {
                keys.push(e.key.clone());
            }
        }
        keys
    }

    // ---------------------------------------------------------------
    // Value-based access (always literal)
    // ---------------------------------------------------------------

    /// Position of the first entry whose value text equals `value`.
    pub fn index_of_value(&self, value: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.value.text() == value)
    }

    /// Returns `true` if any entry's value text equals `value`.
    pub fn contains_value(&self, value: &str) -> bool {
        self.index_of_value(value).is_some()
    }

    // ---------------------------------------------------------------
    // GetAdd and typed accessors
    // ---------------------------------------------------------------

    /// Return the value of `key`, inserting `default` at the end when the key
    /// is absent. The flag reports whether an entry was inserted.
    pub fn get_add_entry(&mut self, key: &str, default: impl Into<Value>) -> (Value, bool) {
        if let Some(value) = self.get(key) {
            return (value.clone(), false);
        }
        let default = default.into();
        self.entries.push(Entry::new(key, default.clone()));
        (default, true)
    }

    /// Return the value of `key`, recording `default` when it is absent.
    pub fn get_add(&mut self, key: &str, default: impl Into<Value>) -> Value {
        self.get_add_entry(key, default).0
    }

    /// Typed GetAdd. A stored value that does not convert yields `default`.
    pub fn get_as<T>(&mut self, key: &str, default: T) -> T
    where
        T: FromValue + Into<Value> + Clone,
    {
        let value = self.get_add(key, default.clone());
        convert_or_default(key, &value, default)
    }

    /// Strict typed read: `None` if absent, an error if present but not
    /// convertible. Never inserts.
    pub fn try_get<T: FromValue>(&self, key: &str) -> ProfileResult<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => T::from_value(value).map(Some).ok_or_else(|| ProfileError::Conversion {
                key: key.to_string(),
                target: T::TYPE_NAME,
                value: value.text().into_owned(),
            }),
        }
    }

    pub fn bool_value(&mut self, key: &str, default: bool) -> bool {
        self.get_as(key, default)
    }

    pub fn int_value(&mut self, key: &str, default: i64) -> i64 {
        self.get_as(key, default)
    }

    pub fn float_value(&mut self, key: &str, default: f64) -> f64 {
        self.get_as(key, default)
    }

    pub fn string_value(&mut self, key: &str, default: &str) -> String {
        self.get_as(key, default.to_string())
    }

    pub fn datetime_value(&mut self, key: &str, default: DateTime<Utc>) -> DateTime<Utc> {
        self.get_as(key, default)
    }

    /// Nested profile stored under `key`; an empty profile is recorded when
    /// absent.
    pub fn profile_value(&mut self, key: &str) -> Profile {
        self.get_as(key, Profile::new())
    }

    // ---------------------------------------------------------------
    // Line codec
    // ---------------------------------------------------------------

    /// Parse command-line / command-block text.
    pub fn parse(text: &str) -> ProfileResult<Profile> {
        line::parse(text)
    }

    /// Parse pre-split process arguments.
    pub fn parse_args<I, S>(args: I) -> ProfileResult<Profile>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        line::parse_args(args)
    }

    /// All entries on one line, separated by spaces.
    pub fn to_command_line(&self) -> String {
        line::to_command_line(self)
    }

    /// One `-Key=value` argument per entry, unquoted.
    pub fn to_command_line_array(&self) -> Vec<String> {
        line::to_command_line_array(self)
    }

    /// One entry per line; the on-disk line format.
    pub fn to_command_block(&self) -> String {
        line::to_command_block(self)
    }

    /// Append a single `-Key=value` or `-Switch` token.
    pub fn add_token(&mut self, token: &str) -> ProfileResult<()> {
        let parsed = line::parse(token.trim()).map_err(|e| {
            ProfileError::InvalidMutation(format!("{token:?} is not a key/value pair: {e}"))
        })?;
        match parsed.entries.len() {
            1 => {
                self.entries.extend(parsed.entries);
                Ok(())
            }
            n => Err(ProfileError::InvalidMutation(format!(
                "expected one key/value pair in {token:?}, found {n}"
            ))),
        }
    }
}

fn convert_or_default<T: FromValue>(key: &str, value: &Value, default: T) -> T {
    match T::from_value(value) {
        Some(v) => v,
        None => {
            warn!(key, value = %value, target = T::TYPE_NAME, "stored value does not convert; using default");
            default
        }
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Profile {}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_block())
    }
}

impl FromStr for Profile {
    type Err = ProfileError;

    fn from_str(s: &str) -> ProfileResult<Self> {
        Profile::parse(s)
    }
}

impl FromIterator<Entry> for Profile {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Profile {
            entries: iter.into_iter().collect(),
            literal_keys: false,
        }
    }
}

impl Extend<Entry> for Profile {
    fn extend<I: IntoIterator<Item = Entry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for Profile {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Profile {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Profile {
        let mut p = Profile::new();
        p.push("-Name", "Alice Smith");
        p.push("-Task", "renew");
        p.push("-Retries", "3");
        p.push("-TaskExtra", "bind");
        p.push("-Task", "notify");
        p
    }

    #[test]
    fn get_returns_first_match() {
        let p = sample();
        assert_eq!(p.get("-Task").unwrap().text(), "renew");
        assert_eq!(p.get("-task").unwrap().text(), "renew");
        assert_eq!(p.get("-Task*").unwrap().text(), "renew");
        assert!(p.get("-Missing").is_none());
    }

    #[test]
    fn set_replaces_first_or_appends() {
        let mut p = sample();
        p.set("-Task", "replaced");
        assert_eq!(p.entry(1).unwrap().value.text(), "replaced");
        assert_eq!(p.entry(4).unwrap().value.text(), "notify");

        p.set("-New", "x");
        assert_eq!(p.len(), 6);
        assert_eq!(p.entry(5).unwrap().key, "-New");
    }

    #[test]
    fn remove_removes_all_matches() {
        let mut p = sample();
        assert_eq!(p.remove("-Task"), 2);
        assert_eq!(p.len(), 3);
        assert_eq!(p.remove("-Task*"), 1);
        assert_eq!(p.keys().collect::<Vec<_>>(), vec!["-Name", "-Retries"]);
    }

    #[test]
    fn subset_keeps_order_and_strips_prefix() {
        let p = sample();
        let subset = p.subset("-Task*", false);
        assert_eq!(
            subset.keys().collect::<Vec<_>>(),
            vec!["-Task", "-TaskExtra", "-Task"]
        );

        let stripped = p.subset("-Task*", true);
        assert_eq!(stripped.keys().collect::<Vec<_>>(), vec!["", "Extra", ""]);
        assert_eq!(
            stripped.iter().map(|e| e.value.text().into_owned()).collect::<Vec<_>>(),
            vec!["renew", "bind", "notify"]
        );
    }

    #[test]
    fn values_of_lists_repeated_keys() {
        let p = sample();
        let values: Vec<_> = p.values_of("-Task").iter().map(|v| v.text().into_owned()).collect();
        assert_eq!(values, vec!["renew", "notify"]);
    }

    #[test]
    fn value_lookup_is_literal() {
        let p = sample();
        assert!(p.contains_value("renew"));
        assert!(!p.contains_value("ren*"));
        assert_eq!(p.index_of_value("3"), Some(2));
    }

    #[test]
    fn literal_mode_disables_patterns() {
        let mut p = sample();
        p.set_literal_keys(true);
        assert!(!p.contains_key("-Task*"));
        assert!(!p.contains_key("-task"));
        assert!(p.contains_key("-Task"));
    }

    #[test]
    fn get_add_records_default_once() {
        let mut p = Profile::new();
        assert_eq!(p.get_add("-Port", 443i64).text(), "443");
        assert_eq!(p.get_add("-Port", 443i64).text(), "443");
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn get_add_keeps_existing_value() {
        let mut p = sample();
        let (value, inserted) = p.get_add_entry("-Retries", 9i64);
        assert_eq!(value.text(), "3");
        assert!(!inserted);
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn typed_accessors_fall_back_on_bad_text() {
        let mut p = Profile::new();
        p.push("-Retries", "many");
        assert_eq!(p.int_value("-Retries", 5), 5);
        assert!(p.bool_value("-Verbose", true));
        assert_eq!(p.get("-Verbose").unwrap().text(), "True");
        assert_eq!(p.string_value("-Name", "anon"), "anon");
        assert_eq!(p.float_value("-Ratio", 0.5), 0.5);
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn try_get_reports_conversion_errors() {
        let mut p = Profile::new();
        p.push("-Retries", "many");
        assert!(p.try_get::<i64>("-Missing").unwrap().is_none());
        let err = p.try_get::<i64>("-Retries").unwrap_err();
        assert!(matches!(err, ProfileError::Conversion { target: "i64", .. }));
    }

    #[test]
    fn profile_value_parses_nested_block() {
        let mut p = Profile::parse("-Site=[\n-Host=example.org\n-Port=443\n-Site=]").unwrap();
        let site = p.profile_value("-Site");
        assert_eq!(site.len(), 2);
        assert_eq!(site.get("-Port").unwrap().text(), "443");
    }

    #[test]
    fn add_token_rejects_non_pairs() {
        let mut p = Profile::new();
        p.add_token("-Name=Bob").unwrap();
        p.add_token("-Verbose").unwrap();
        assert_eq!(p.len(), 2);

        let err = p.add_token("just text").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidMutation(_)));
        let err = p.add_token("-Site=[").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidMutation(_)));
        let err = p.add_token("-A=1 -B=2").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidMutation(_)));
        let err = p.add_token("").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidMutation(_)));
    }

    #[test]
    fn serializes_as_ordered_entries() {
        let mut p = Profile::new();
        p.push("-Task", "a");
        p.push("-Task", "b");
        p.push("-Verbose", true);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(
            json,
            r#"[{"key":"-Task","value":"a"},{"key":"-Task","value":"b"},{"key":"-Verbose","value":"True"}]"#
        );
    }

    #[test]
    fn insert_and_remove_at() {
        let mut p = sample();
        p.insert(0, "-First", "1");
        assert_eq!(p.entry(0).unwrap().key, "-First");
        let removed = p.remove_at(0).unwrap();
        assert_eq!(removed.key, "-First");
        assert!(p.remove_at(99).is_none());
    }
}
