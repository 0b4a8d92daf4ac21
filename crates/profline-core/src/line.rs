//! The line codec: command-line / command-block text.
//!
//! Grammar, informally:
//!
//! ```text
//! profile  := ws* (token ws*)*
//! token    := switch | pair | block
//! switch   := '-' key                       (value "True")
//! pair     := '-' key '=' (quoted | bare)
//! block    := '-' key '=[' newline? inner newline? '-' key '=]'
//! quoted   := '"' text '"' | '\'' text '\''
//! bare     := text up to whitespace that is followed by '-'
//! ```
//!
//! A new token only starts at whitespace followed by the argument marker, so
//! a `-` inside a path or a negative number after `=` stays in the value.
//! Quoted values may nest quoted argument lists: a quote preceded by
//! whitespace opens a level, a quote followed by whitespace closes one.
//! An unterminated quote swallows the rest of the input as a literal value.

use tracing::warn;

use crate::entry::Entry;
use crate::error::{ProfileError, ProfileResult};
use crate::profile::Profile;
use crate::value::{Value, TRUE_TEXT};

/// The argument marker that starts every key.
pub const ARG_MARKER: char = '-';

const BLOCK_OPEN: &str = "[";
const BLOCK_CLOSE: &str = "]";

// ---------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------

/// Parse command-line or command-block text into a profile.
pub fn parse(text: &str) -> ProfileResult<Profile> {
    let mut profile = Profile::new();
    let mut pos = skip_ws(text, 0);

    while pos < text.len() {
        if !text[pos..].starts_with(ARG_MARKER) {
            let end = text[pos..].find(char::is_whitespace).map_or(text.len(), |i| pos + i);
            return Err(ProfileError::UnexpectedToken {
                position: pos,
                token: text[pos..end].to_string(),
            });
        }

        let key_end = text[pos..]
            .find(|c: char| c == '=' || c.is_whitespace())
            .map_or(text.len(), |i| pos + i);
        let key = &text[pos..key_end];

        if key_end == text.len() || !text[key_end..].starts_with('=') {
            profile.push(key, TRUE_TEXT);
            pos = skip_ws(text, key_end);
            continue;
        }

        let value_start = key_end + 1;
        let (value, next) = if is_marker_at(text, value_start, BLOCK_OPEN) {
            read_block(text, key, value_start + BLOCK_OPEN.len())?
        } else if is_marker_at(text, value_start, BLOCK_CLOSE) {
            return Err(ProfileError::Parse {
                position: pos,
                reason: format!("{key}=] without a matching {key}=["),
            });
        } else if text[value_start..].starts_with(['"', '\'']) {
            read_quoted(text, value_start)
        } else {
            read_bare(text, value_start)
        };

        profile.push(key, value);
        pos = skip_ws(text, next);
    }

    Ok(profile)
}

/// Parse pre-split arguments, as a process receives them.
///
/// Each argument is one token; surrounding quotes are stripped. An argument
/// without the marker becomes the value of a preceding bare switch. Blocks
/// span arguments from `-Key=[` to `-Key=]`, joined by newlines.
pub fn parse_args<I, S>(args: I) -> ProfileResult<Profile>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
    let mut entries: Vec<Entry> = Vec::new();
    let mut last_was_switch = false;
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        i += 1;

        if arg.trim().is_empty() {
            continue;
        }

        if !arg.starts_with(ARG_MARKER) {
            match entries.last_mut() {
                Some(last) if last_was_switch => {
                    last.value = Value::Scalar(strip_quotes(arg).to_string());
                    last_was_switch = false;
                    continue;
                }
                _ => {
                    return Err(ProfileError::UnexpectedToken {
                        position: i - 1,
                        token: arg.to_string(),
                    })
                }
            }
        }

        let Some((key, value)) = arg.split_once('=') else {
            entries.push(Entry::new(arg, TRUE_TEXT));
            last_was_switch = true;
            continue;
        };
        last_was_switch = false;

        if value == BLOCK_OPEN {
            let open = format!("{key}={BLOCK_OPEN}");
            let close = format!("{key}={BLOCK_CLOSE}");
            let mut depth = 1usize;
            let mut inner: Vec<&str> = Vec::new();
            loop {
                let Some(next) = args.get(i) else {
                    return Err(ProfileError::UnterminatedBlock { key: key.to_string() });
                };
                i += 1;
                if *next == open {
                    depth += 1;
                } else if *next == close {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                inner.push(next);
            }
            entries.push(Entry::new(key, inner.join("\n")));
        } else {
            entries.push(Entry::new(key, strip_quotes(value)));
        }
    }

    Ok(entries.into_iter().collect())
}

fn skip_ws(text: &str, from: usize) -> usize {
    text[from..]
        .find(|c: char| !c.is_whitespace())
        .map_or(text.len(), |i| from + i)
}

fn at_boundary(text: &str, pos: usize) -> bool {
    text[pos..].chars().next().is_none_or(char::is_whitespace)
}

fn preceded_by_ws(text: &str, pos: usize) -> bool {
    text[..pos].chars().next_back().is_some_and(char::is_whitespace)
}

/// `marker` sits at `pos` and is followed by whitespace or end of input.
fn is_marker_at(text: &str, pos: usize, marker: &str) -> bool {
    text[pos..].starts_with(marker) && at_boundary(text, pos + marker.len())
}

fn read_bare(text: &str, start: usize) -> (String, usize) {
    let mut pos = start;
    while let Some(offset) = text[pos..].find(char::is_whitespace) {
        let ws = pos + offset;
        let after = skip_ws(text, ws);
        if after == text.len() || text[after..].starts_with(ARG_MARKER) {
            return (text[start..ws].to_string(), after);
        }
        pos = after;
    }
    (text[start..].to_string(), text.len())
}

fn read_quoted(text: &str, start: usize) -> (String, usize) {
    let Some(quote) = text[start..].chars().next() else {
        return (String::new(), text.len());
    };
    let body = start + quote.len_utf8();
    let mut depth = 1usize;

    for (offset, c) in text[body..].char_indices() {
        if c != quote {
            continue;
        }
        let at = body + offset;
        let after = at + quote.len_utf8();
        let closes = at_boundary(text, after);
        if preceded_by_ws(text, at) && !closes {
            depth += 1;
        } else if closes {
            depth -= 1;
            if depth == 0 {
                return (text[body..at].to_string(), after);
            }
        }
    }

    warn!(position = start, "unterminated quote; taking the rest of the input literally");
    (text[body..].to_string(), text.len())
}

fn read_block(text: &str, key: &str, after_open: usize) -> ProfileResult<(String, usize)> {
    let open = format!("{key}={BLOCK_OPEN}");
    let close = format!("{key}={BLOCK_CLOSE}");

    let mut inner_start = after_open
        + text[after_open..]
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(text.len() - after_open);
    if text[inner_start..].starts_with("\r\n") {
        inner_start += 2;
    } else if text[inner_start..].starts_with('\n') {
        inner_start += 1;
    }

    let mut depth = 1usize;
    let mut pos = inner_start;
    while pos < text.len() {
        let Some(offset) = text[pos..].find(key) else {
            break;
        };
        let at = pos + offset;
        let starts_token = at == inner_start || preceded_by_ws(text, at);
        if starts_token && is_marker_at(text, at, &open) {
            depth += 1;
            pos = at + open.len();
            continue;
        }
        if starts_token && is_marker_at(text, at, &close) {
            depth -= 1;
            if depth == 0 {
                let inner = trim_block_tail(&text[inner_start..at]);
                return Ok((inner.to_string(), at + close.len()));
            }
            pos = at + close.len();
            continue;
        }
        pos = at + key.len().max(1);
    }

    Err(ProfileError::UnterminatedBlock { key: key.to_string() })
}

/// Drop the line break (and any indentation of the end marker) that
/// separates the block body from its closing marker.
fn trim_block_tail(inner: &str) -> &str {
    let trimmed = if inner.ends_with('\n') {
        inner
    } else {
        inner.trim_end_matches([' ', '\t'])
    };
    if let Some(rest) = trimmed.strip_suffix('\n') {
        rest.strip_suffix('\r').unwrap_or(rest)
    } else {
        trimmed
    }
}

fn strip_quotes(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

// ---------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------

/// Render one entry as a token, quoting or blocking the value as needed.
pub fn format_entry(entry: &Entry) -> String {
    let key = &entry.key;
    let text = entry.value.text();

    if needs_block(&entry.value, &text) {
        return format_block(key, &text);
    }
    if !needs_quotes(&text) {
        return format!("{key}={text}");
    }
    if !text.contains('"') {
        format!("{key}=\"{text}\"")
    } else {
        format!("{key}='{text}'")
    }
}

/// Fail with [`ProfileError::Unrepresentable`] if an entry would not read
/// back from its block form. Quoted and bare forms always do.
pub fn check_entry(entry: &Entry) -> ProfileResult<()> {
    let text = entry.value.text();
    if !needs_block(&entry.value, &text) {
        return Ok(());
    }
    let formatted = format_block(&entry.key, &text);
    let after_open = entry.key.len() + 1 + BLOCK_OPEN.len();
    match read_block(&formatted, &entry.key, after_open) {
        Ok((inner, end)) if inner == text && end == formatted.len() => Ok(()),
        _ => Err(ProfileError::Unrepresentable { key: entry.key.clone() }),
    }
}

/// [`check_entry`] for every entry.
pub fn check_profile(profile: &Profile) -> ProfileResult<()> {
    profile.iter().try_for_each(check_entry)
}

fn needs_block(value: &Value, text: &str) -> bool {
    value.is_profile()
        || text.contains('\n')
        || (needs_quotes(text) && text.contains('"') && text.contains('\''))
}

fn format_block(key: &str, text: &str) -> String {
    format!("{key}={BLOCK_OPEN}\n{text}\n{key}={BLOCK_CLOSE}")
}

fn needs_quotes(text: &str) -> bool {
    text.contains(char::is_whitespace)
        || text.contains(ARG_MARKER)
        || text.starts_with(['"', '\''])
        || text == BLOCK_OPEN
        || text == BLOCK_CLOSE
}

/// All entries on a single line.
pub fn to_command_line(profile: &Profile) -> String {
    profile.iter().map(format_entry).collect::<Vec<_>>().join(" ")
}

/// One entry per line.
pub fn to_command_block(profile: &Profile) -> String {
    profile.iter().map(format_entry).collect::<Vec<_>>().join("\n")
}

/// One unquoted `-Key=value` argument per entry.
pub fn to_command_line_array(profile: &Profile) -> Vec<String> {
    profile
        .iter()
        .map(|e| format!("{}={}", e.key, e.value.text()))
        .collect()
}
