//! Load reconciliation: combining a parsed batch into a live profile.
//!
//! - [`LoadAction::Append`] adds every entry to the end.
//! - [`LoadAction::Overwrite`] clears the profile, then appends.
//! - [`LoadAction::Merge`] resolves each incoming key against the current
//!   entries. The first time a stored key is hit in a pass, a single entry is
//!   updated in place; several entries with that key collapse into one at the
//!   end. Later incoming entries for a key already resolved in the same pass
//!   are appended, which is how repeatable keys accumulate from an override
//!   source. Unmatched literal keys are appended; unmatched wildcards are
//!   dropped.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::Entry;
use crate::error::ProfileResult;
use crate::profile::Profile;
use crate::value::Value;

/// How a parsed batch is combined with the live profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadAction {
    /// Add every entry at the end, duplicates allowed.
    #[default]
    Append,
    /// Override matching entries, appending the rest.
    Merge,
    /// Replace the whole profile.
    Overwrite,
}

/// Outcome of a [`Profile::load`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Every entry that changed the profile, under the stored key it resolved
    /// to.
    pub applied: Vec<Entry>,
    /// Entries added at the end.
    pub appended: usize,
    /// Entries whose value was replaced in place.
    pub replaced: usize,
    /// Keys whose duplicates were collapsed into a single entry.
    pub collapsed: usize,
    /// Wildcard entries that matched nothing.
    pub skipped: usize,
}

impl Profile {
    /// Combine `batch` into this profile using `action`.
    pub fn load(&mut self, batch: Profile, action: LoadAction) -> LoadReport {
        let mut report = LoadReport::default();
        match action {
            LoadAction::Overwrite => {
                self.clear();
                self.append_all(batch, &mut report);
            }
            LoadAction::Append => self.append_all(batch, &mut report),
            LoadAction::Merge => self.merge(batch, &mut report),
        }
        debug!(
            ?action,
            appended = report.appended,
            replaced = report.replaced,
            collapsed = report.collapsed,
            skipped = report.skipped,
            "profile load"
        );
        report
    }

    /// Parse command-line text and combine it into this profile.
    pub fn load_from_command_line(&mut self, text: &str, action: LoadAction) -> ProfileResult<LoadReport> {
        let batch = Profile::parse(text)?;
        Ok(self.load(batch, action))
    }

    /// Parse pre-split arguments and combine them into this profile.
    pub fn load_from_args<I, S>(&mut self, args: I, action: LoadAction) -> ProfileResult<LoadReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch = Profile::parse_args(args)?;
        Ok(self.load(batch, action))
    }

    fn append_all(&mut self, batch: Profile, report: &mut LoadReport) {
        for entry in batch {
            report.applied.push(entry.clone());
            report.appended += 1;
            self.entries_mut().push(entry);
        }
    }

    fn merge(&mut self, batch: Profile, report: &mut LoadReport) {
        let mut resolved: HashSet<String> = HashSet::new();

        for Entry { key, value } in batch {
            let pattern = self.pattern(&key);

            if pattern.is_wildcard() {
                let targets = self.distinct_keys_matching(&pattern);
                if targets.is_empty() {
                    debug!(key = %key, "wildcard override matched nothing");
                    report.skipped += 1;
                    continue;
                }
                for target in targets {
                    if resolved.contains(&target) {
                        for e in self.entries_mut().iter_mut().filter(|e| e.key == target) {
                            e.value = value.clone();
                            report.replaced += 1;
                        }
                    } else {
                        self.replace_or_collapse(&target, value.clone(), report);
                        resolved.insert(target.clone());
                    }
                    report.applied.push(Entry::new(target, value.clone()));
                }
                continue;
            }

            let target = self
                .index_of_pattern(&pattern)
                .and_then(|i| self.entry(i))
                .map(|e| e.key.clone());

            match target {
                Some(target) if resolved.contains(&target) => {
                    self.entries_mut().push(Entry::new(target.clone(), value.clone()));
                    report.appended += 1;
                    report.applied.push(Entry::new(target, value));
                }
                Some(target) => {
                    self.replace_or_collapse(&target, value.clone(), report);
                    resolved.insert(target.clone());
                    report.applied.push(Entry::new(target, value));
                }
                None => {
                    self.entries_mut().push(Entry::new(key.clone(), value.clone()));
                    report.appended += 1;
                    resolved.insert(key.clone());
                    report.applied.push(Entry::new(key, value));
                }
            }
        }
    }

    /// Update the single entry stored under `key`, or collapse several into
    /// one at the end.
    fn replace_or_collapse(&mut self, key: &str, value: Value, report: &mut LoadReport) {
        let entries = self.entries_mut();
        let count = entries.iter().filter(|e| e.key == key).count();
        if count <= 1 {
            if let Some(e) = entries.iter_mut().find(|e| e.key == key) {
                e.value = value;
                report.replaced += 1;
            }
        } else {
            entries.retain(|e| e.key != key);
            entries.push(Entry::new(key, value));
            report.collapsed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pairs(p: &Profile) -> Vec<(String, String)> {
        p.iter()
            .map(|e| (e.key.clone(), e.value.text().into_owned()))
            .collect()
    }

    fn base() -> Profile {
        let mut p = Profile::new();
        p.load(
            Profile::parse(r#"-Name="Alice Smith" -Retries=3 -Verbose"#).unwrap(),
            LoadAction::Append,
        );
        p
    }

    #[test]
    fn append_yields_three_entries() {
        let p = base();
        assert_eq!(
            pairs(&p),
            vec![
                ("-Name".to_string(), "Alice Smith".to_string()),
                ("-Retries".to_string(), "3".to_string()),
                ("-Verbose".to_string(), "True".to_string()),
            ]
        );
    }

    #[test]
    fn merge_replaces_in_place() {
        let mut p = base();
        let report = p.load(Profile::parse("-Retries=5").unwrap(), LoadAction::Merge);
        assert_eq!(p.len(), 3);
        assert_eq!(p.entry(1).unwrap().key, "-Retries");
        assert_eq!(p.entry(1).unwrap().value.text(), "5");
        assert_eq!(p.entry(0).unwrap().value.text(), "Alice Smith");
        assert_eq!(p.entry(2).unwrap().value.text(), "True");
        assert_eq!(report.replaced, 1);
    }

    #[test]
    fn merge_resolves_case_insensitively_and_keeps_stored_key() {
        let mut p = base();
        p.load(Profile::parse("-retries=7").unwrap(), LoadAction::Merge);
        assert_eq!(p.entry(1).unwrap().key, "-Retries");
        assert_eq!(p.entry(1).unwrap().value.text(), "7");
    }

    #[test]
    fn merge_collapses_duplicates_then_accumulates() {
        let mut p = Profile::parse("-Task=a -Name=x -Task=b -Task=c").unwrap();
        let report = p.load(Profile::parse("-Task=y -Task=z").unwrap(), LoadAction::Merge);
        assert_eq!(
            pairs(&p),
            vec![
                ("-Name".to_string(), "x".to_string()),
                ("-Task".to_string(), "y".to_string()),
                ("-Task".to_string(), "z".to_string()),
            ]
        );
        assert_eq!(report.collapsed, 1);
        assert_eq!(report.appended, 1);
    }

    #[test]
    fn merge_appends_unknown_keys() {
        let mut p = base();
        p.load(Profile::parse("-New=1").unwrap(), LoadAction::Merge);
        assert_eq!(p.len(), 4);
        assert_eq!(p.entry(3).unwrap().key, "-New");
    }

    #[test]
    fn wildcard_merge_overwrites_many_and_never_inserts() {
        let mut p = Profile::parse("-TaskA=1 -Other=x -TaskB=2").unwrap();
        let report = p.load(Profile::parse("-Task*=0 -Missing*=9").unwrap(), LoadAction::Merge);
        assert_eq!(
            pairs(&p),
            vec![
                ("-TaskA".to_string(), "0".to_string()),
                ("-Other".to_string(), "x".to_string()),
                ("-TaskB".to_string(), "0".to_string()),
            ]
        );
        assert_eq!(report.skipped, 1);
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.applied[0].key, "-TaskA");
    }

    #[test]
    fn wildcard_after_literal_in_same_pass_updates_all_copies() {
        let mut p = Profile::parse("-Task=a -Task=b").unwrap();
        p.load(Profile::parse("-Task=x -Task=y -Task*=z").unwrap(), LoadAction::Merge);
        assert_eq!(
            pairs(&p),
            vec![
                ("-Task".to_string(), "z".to_string()),
                ("-Task".to_string(), "z".to_string()),
            ]
        );
    }

    #[test]
    fn overwrite_replaces_everything() {
        let mut p = base();
        p.load(Profile::parse("-Only=1").unwrap(), LoadAction::Overwrite);
        assert_eq!(pairs(&p), vec![("-Only".to_string(), "1".to_string())]);
    }

    #[test]
    fn merge_list_run_at_end_is_stable() {
        let batch = Profile::parse("-Task=y -Task=z -Retries=1").unwrap();
        let mut once = Profile::parse("-Task=a -Retries=3 -Task=b").unwrap();
        once.load(batch.clone(), LoadAction::Merge);
        let mut twice = once.clone();
        twice.load(batch, LoadAction::Merge);
        assert_eq!(once, twice);
    }

    #[test]
    fn remerging_a_list_moves_its_run_to_the_end() {
        let batch = Profile::parse("-A=1 -A=2").unwrap();
        let mut p = Profile::parse("-A=x -B=y").unwrap();

        p.load(batch.clone(), LoadAction::Merge);
        assert_eq!(
            pairs(&p),
            vec![
                ("-A".to_string(), "1".to_string()),
                ("-B".to_string(), "y".to_string()),
                ("-A".to_string(), "2".to_string()),
            ]
        );

        let report = p.load(batch, LoadAction::Merge);
        assert_eq!(report.collapsed, 1);
        assert_eq!(
            pairs(&p),
            vec![
                ("-B".to_string(), "y".to_string()),
                ("-A".to_string(), "1".to_string()),
                ("-A".to_string(), "2".to_string()),
            ]
        );

        let settled = p.clone();
        p.load(Profile::parse("-A=1 -A=2").unwrap(), LoadAction::Merge);
        assert_eq!(p, settled);
    }

    proptest! {
        // Each stored key is hit at most once per pass: distinct literal keys,
        // plus a wildcard over a key no literal names.
        #[test]
        fn merge_twice_equals_merge_once(
            stored in proptest::collection::vec(("-(A|B|C|Ab)", "[a-z0-9]{1,4}"), 0..8),
            incoming in proptest::collection::btree_map("-(A|B|C|D)", "[a-z0-9]{1,4}", 0..4),
            wildcard in proptest::option::of("[a-z0-9]{1,4}"),
        ) {
            let mut batch: Profile = incoming
                .iter()
                .map(|(k, v)| Entry::new(k.as_str(), v.as_str()))
                .collect();
            if let Some(v) = wildcard {
                batch.push("-Ab*", v);
            }
            let mut once: Profile = stored
                .iter()
                .map(|(k, v)| Entry::new(k.as_str(), v.as_str()))
                .collect();
            once.load(batch.clone(), LoadAction::Merge);
            let mut twice = once.clone();
            twice.load(batch, LoadAction::Merge);
            prop_assert_eq!(pairs(&once), pairs(&twice));
        }
    }
}
