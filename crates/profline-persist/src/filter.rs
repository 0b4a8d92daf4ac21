//! The persisted view of a profile with command-line overrides taken out.
//!
//! For every key the command line touched, live entries still holding a
//! command-line value are swapped back, in order, for the values the file
//! had (`baseline`). Surplus command-line entries are dropped; surplus
//! baseline values are re-inserted after the last swapped entry. Entries
//! whose value no longer matches any override were changed at runtime and
//! are kept as they are.

use profline_core::{Entry, Profile, Value};

/// `live` minus the effect of `overrides`, reconciled key by key against
/// `baseline`.
pub fn without_command_line(live: &Profile, baseline: &Profile, overrides: &[Entry]) -> Profile {
    let mut out = live.clone();

    for key in distinct_keys(overrides) {
        let mut pending: Vec<&Value> = overrides
            .iter()
            .filter(|e| e.key == key)
            .map(|e| &e.value)
            .collect();
        let mut restore = baseline
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.value.clone());

        let mut i = 0;
        let mut last_restored: Option<usize> = None;
        while i < out.len() {
            let from_command_line = match out.entry(i) {
                Some(e) if e.key == key => take_match(&mut pending, &e.value),
                _ => false,
            };
            if !from_command_line {
                i += 1;
                continue;
            }
            match restore.next() {
                Some(value) => {
                    if let Some(e) = out.entry_mut(i) {
                        e.value = value;
                    }
                    last_restored = Some(i);
                    i += 1;
                }
                None => {
                    out.remove_at(i);
                }
            }
        }

        if let Some(mut at) = last_restored {
            for value in restore {
                at += 1;
                out.insert(at, key.clone(), value);
            }
        }
    }

    out
}

fn distinct_keys(entries: &[Entry]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for e in entries {
        if !keys.contains(&e.key) {
            keys.push(e.key.clone());
        }
    }
    keys
}

fn take_match(pending: &mut Vec<&Value>, value: &Value) -> bool {
    match pending.iter().position(|v| *v == value) {
        Some(pos) => {
            pending.remove(pos);
            true
        }
        None => false,
    }
}
