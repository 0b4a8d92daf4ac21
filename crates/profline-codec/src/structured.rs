//! The structured codec: a flat list of tagged elements.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <configuration>
//!   <appSettings>
//!     <add key="-Name" value="Alice Smith"/>
//!     <add key="-Notes" value="&#xA;line1&#xA;line2&#xA;"/>
//!   </appSettings>
//! </configuration>
//! ```
//!
//! Only `add` elements directly under `configuration/appSettings` are read;
//! anything else in the document is ignored. A value containing a newline is
//! wrapped in a leading and trailing newline, and line breaks are written as
//! character references so they survive attribute handling.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use profline_core::{Entry, Profile};

use crate::error::{CodecError, CodecResult};

pub const ROOT: &str = "configuration";
pub const SECTION: &str = "appSettings";
pub const ITEM: &str = "add";
pub const KEY_ATTR: &str = "key";
pub const VALUE_ATTR: &str = "value";

const SENTINEL: char = '\n';

/// Render a profile as a structured document.
pub fn to_structured(profile: &Profile) -> CodecResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write(&mut writer, Event::Start(BytesStart::new(ROOT)))?;
    write(&mut writer, Event::Start(BytesStart::new(SECTION)))?;

    for entry in profile {
        let text = entry.value.text();
        let value = wrap_multiline(&text);
        let mut item = BytesStart::new(ITEM);
        item.push_attribute((KEY_ATTR.as_bytes(), escape_attr(&entry.key).as_bytes()));
        item.push_attribute((VALUE_ATTR.as_bytes(), escape_attr(&value).as_bytes()));
        write(&mut writer, Event::Empty(item))?;
    }

    write(&mut writer, Event::End(BytesEnd::new(SECTION)))?;
    write(&mut writer, Event::End(BytesEnd::new(ROOT)))?;

    let mut text = String::from_utf8(writer.into_inner())?;
    text.push('\n');
    Ok(text)
}

/// Parse a structured document.
pub fn from_structured(text: &str) -> CodecResult<Profile> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut profile = Profile::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(CodecError::Structured(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        };

        match event {
            Event::Start(e) => {
                let name = element_name(&e);
                if path.is_empty() && name == ROOT {
                    saw_root = true;
                }
                path.push(name);
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                if path.is_empty() && name == ROOT {
                    saw_root = true;
                } else if name == ITEM && in_section(&path) {
                    let entry = read_item(&e)?;
                    profile.push(entry.key, entry.value);
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(CodecError::Structured(format!("unclosed element <{}>", path.join("/"))));
    }
    if !saw_root {
        return Err(CodecError::Structured(format!("missing <{ROOT}> root element")));
    }
    Ok(profile)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> CodecResult<()> {
    writer
        .write_event(event)
        .map_err(|e| CodecError::Structured(e.to_string()))
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn in_section(path: &[String]) -> bool {
    path.len() == 2 && path[0] == ROOT && path[1] == SECTION
}

fn read_item(e: &BytesStart<'_>) -> CodecResult<Entry> {
    let mut key: Option<String> = None;
    let mut value = String::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|e| CodecError::Structured(e.to_string()))?;
        let text = attr
            .unescape_value()
            .map_err(|e| CodecError::Structured(e.to_string()))?;
        match attr.key.as_ref() {
            k if k == KEY_ATTR.as_bytes() => key = Some(text.into_owned()),
            k if k == VALUE_ATTR.as_bytes() => value = unwrap_multiline(&text).to_string(),
            _ => {}
        }
    }

    let key = key.ok_or_else(|| {
        CodecError::Structured(format!("<{ITEM}> element without a {KEY_ATTR} attribute"))
    })?;
    Ok(Entry::new(key, value))
}

fn escape_attr(raw: &str) -> String {
    escape(raw)
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
        .replace('\t', "&#x9;")
}

fn wrap_multiline(text: &str) -> Cow<'_, str> {
    if text.contains(SENTINEL) {
        Cow::Owned(format!("{SENTINEL}{text}{SENTINEL}"))
    } else {
        Cow::Borrowed(text)
    }
}

fn unwrap_multiline(text: &str) -> &str {
    match text.strip_prefix(SENTINEL).and_then(|t| t.strip_suffix(SENTINEL)) {
        Some(inner) => inner,
        None => text,
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

    fn sample() -> Profile {
        let mut p = Profile::new();
        p.push("-Name", "Alice Smith");
        p.push("-Task", "renew");
        p.push("-Task", "notify");
        p.push("-Quote", r#"it's "quoted" & <tagged>"#);
        p.push("-Notes", "line1\nline2");
        p
    }

    #[test]
    fn writes_flat_elements_under_fixed_path() {
        let text = to_structured(&sample()).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<configuration>"));
        assert!(text.contains("<appSettings>"));
        assert!(text.contains(r#"key="-Name" value="Alice Smith""#));
        assert!(text.contains("&#xA;line1&#xA;line2&#xA;"));
    }

    #[test]
    fn roundtrip_preserves_order_and_duplicates() {
        let original = sample();
        let back = from_structured(&to_structured(&original).unwrap()).unwrap();
        assert_eq!(pairs(&back), pairs(&original));
    }

    #[test]
    fn ignores_elements_outside_the_section() {
        let text = r#"<?xml version="1.0"?>
<configuration>
  <startup><add key="-Ignored" value="1"/></startup>
  <appSettings>
    <add key="-Kept" value="2"/>
    <clear/>
  </appSettings>
</configuration>"#;
        let p = from_structured(text).unwrap();
        assert_eq!(pairs(&p), vec![("-Kept".to_string(), "2".to_string())]);
    }

    #[test]
    fn accepts_empty_section_and_root() {
        assert!(from_structured("<configuration/>").unwrap().is_empty());
        assert!(from_structured("<configuration><appSettings/></configuration>")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rejects_line_text() {
        assert!(from_structured("-Name=Alice -Retries=3").is_err());
    }

    #[test]
    fn rejects_missing_key_and_unclosed_root() {
        let err = from_structured(r#"<configuration><appSettings><add value="1"/></appSettings></configuration>"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Structured(_)));
        assert!(from_structured("<configuration><appSettings>").is_err());
    }

    #[test]
    fn line_and_structured_are_interchangeable() {
        let original = sample();
        let via_line = Profile::parse(&original.to_command_block()).unwrap();
        let via_structured = from_structured(&to_structured(&via_line).unwrap()).unwrap();
        let back_to_line = Profile::parse(&via_structured.to_command_block()).unwrap();
        assert_eq!(pairs(&back_to_line), pairs(&original));
    }

    proptest! {
        #[test]
        fn structured_roundtrips(
            entries in proptest::collection::vec(
                ("-[A-Za-z]{1,8}", "[ -~\n\t]{0,24}"),
                0..8,
            )
        ) {
            let profile: Profile = entries
                .iter()
                .map(|(k, v)| Entry::new(k.as_str(), v.as_str()))
                .collect();
            let back = from_structured(&to_structured(&profile).unwrap()).unwrap();
            prop_assert_eq!(pairs(&back), pairs(&profile));
        }
    }
}
