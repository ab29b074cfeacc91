//! Header decoding: the 4-byte length prefix, the UTF-16LE attribute blob, and the
//! derived policy (version, encoding, encryption, key normalization, stylesheet).

use std::collections::HashMap;

use encoding_rs::UTF_16LE;
use regex::Regex;

use crate::error::{MdictError, Result};
use crate::source::ByteSource;
use crate::types::{EncryptFlag, Encoding, EngineVersion};

/// Attributes parsed once at `open`, plus the derived policy fields the rest of
/// the reader consults throughout its lifetime.
#[derive(Debug, Clone)]
pub struct HeaderAttributes {
    pub version: EngineVersion,
    pub version_number: f64,
    pub encoding: Encoding,
    pub encrypted: EncryptFlag,
    pub key_case_sensitive: bool,
    pub strip_key: bool,
    pub stylesheet: HashMap<u32, (String, String)>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub creation_date: Option<String>,
}

/// Decodes the header section starting at byte 0 of `source`. Returns the parsed
/// attributes plus the absolute offset where the keyword section begins
/// (`4 + header_length + 4`).
pub fn decode(source: &dyn ByteSource, default_encoding: Encoding) -> Result<(HeaderAttributes, u64)> {
    let len_buf = source.read_at(0, 4)?;
    let header_length = u32::from_be_bytes([len_buf[0], len_buf[1], len_buf[2], len_buf[3]]) as u64;

    let header_buf = source.read_at(4, header_length)?;
    let (decoded, _, had_errors) = UTF_16LE.decode(&header_buf);
    if had_errors {
        return Err(MdictError::InvalidHeader("header is not valid UTF-16LE".into()));
    }
    let header_text = decoded.trim_end_matches('\0').to_string();

    // Trailing 4-byte checksum, not validated (see specification §4.4).
    let _ = source.read_at(4 + header_length, 4)?;

    let attrs = scan_attributes(&header_text)?;

    let version_str = attrs
        .get("GeneratedByEngineVersion")
        .map(|s| s.trim())
        .unwrap_or("1.2");
    let version_number: f64 = version_str
        .parse()
        .map_err(|_| MdictError::UnsupportedVersion(version_str.to_string()))?;
    let version = EngineVersion::from_version_number(version_number);

    let encoding = attrs
        .get("Encoding")
        .filter(|s| !s.is_empty())
        .map(|s| Encoding::from_header_label(s))
        .unwrap_or(default_encoding);

    let encrypted_value: u8 = match attrs.get("Encrypted").map(|s| s.trim()) {
        None | Some("") | Some("No") => 0,
        Some("Yes") => 1,
        Some(s) => s.parse().unwrap_or(0),
    };
    let encrypted = EncryptFlag::from_bits(encrypted_value);

    let key_case_sensitive = yes_no(attrs.get("KeyCaseSensitive"), false);
    let strip_key_default = matches!(version, EngineVersion::V1);
    let strip_key = match attrs.get("StripKey") {
        Some(s) => yes_no(Some(s), strip_key_default),
        None => strip_key_default,
    };

    let stylesheet = attrs
        .get("StyleSheet")
        .map(|s| parse_stylesheet(s))
        .unwrap_or_default();

    let header_end_offset = 4 + header_length + 4;

    Ok((
        HeaderAttributes {
            version,
            version_number,
            encoding,
            encrypted,
            key_case_sensitive,
            strip_key,
            stylesheet,
            title: attrs.get("Title").cloned(),
            description: attrs.get("Description").cloned(),
            creation_date: attrs.get("CreationDate").cloned(),
        },
        header_end_offset,
    ))
}

fn yes_no(value: Option<&String>, default: bool) -> bool {
    match value.map(|s| s.trim()) {
        Some("Yes") | Some("yes") | Some("1") => true,
        Some("No") | Some("no") | Some("0") => false,
        _ => default,
    }
}

/// Scans the header's single root element (`Dictionary` or `Library_Data`) for its
/// `name="value"` attributes. This is the out-of-scope "XML parser" the
/// specification names as an external collaborator: the header is one flat element
/// with no nesting, so a regex scan over attribute pairs is the whole parser,
/// exactly as the teacher crate and `zangloo/mdict` both implement it for this
/// format.
fn scan_attributes(xml: &str) -> Result<HashMap<String, String>> {
    let root_re = Regex::new(r"<(Dictionary|Library_Data)\b").unwrap();
    if !root_re.is_match(xml) {
        return Err(MdictError::InvalidHeader(
            "missing Dictionary/Library_Data root element".into(),
        ));
    }

    let attr_re = Regex::new(r#"(\w+)="((?:[^"\\]|\\.)*)""#).unwrap();
    let mut attrs = HashMap::new();
    for cap in attr_re.captures_iter(xml) {
        let key = cap[1].to_string();
        let value = unescape_entities(&cap[2]);
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Parses the `StyleSheet` attribute into a tag -> (prefix, suffix) table.
///
/// Per §4.8: the attribute is whitespace-separated tokens. A token that parses as
/// a decimal number starts a new entry (closing the previous one, if any). Of the
/// non-numeric tokens belonging to an entry, those containing `/` are suffix
/// parts; the rest accumulate (space-joined) into the prefix.
pub fn parse_stylesheet(text: &str) -> HashMap<u32, (String, String)> {
    let mut table = HashMap::new();
    let mut current: Option<u32> = None;
    let mut prefix_parts: Vec<&str> = Vec::new();
    let mut suffix_parts: Vec<&str> = Vec::new();

    let flush = |table: &mut HashMap<u32, (String, String)>,
                 current: Option<u32>,
                 prefix_parts: &[&str],
                 suffix_parts: &[&str]| {
        if let Some(tag) = current {
            table.insert(tag, (prefix_parts.join(" "), suffix_parts.concat()));
        }
    };

    for token in text.split_whitespace() {
        if let Ok(tag) = token.parse::<u32>() {
            flush(&mut table, current, &prefix_parts, &suffix_parts);
            current = Some(tag);
            prefix_parts.clear();
            suffix_parts.clear();
        } else if token.contains('/') {
            suffix_parts.push(token);
        } else {
            prefix_parts.push(token);
        }
    }
    flush(&mut table, current, &prefix_parts, &suffix_parts);

    table
}

/// Expands `` `N`text`N` `` style spans in a definition using the stylesheet
/// table. A tag with no table entry passes through unchanged — retaining the
/// source's documented fallback behavior (see §9, "fallback on empty second
/// element").
pub fn expand_stylesheet(definition: &str, styles: &HashMap<u32, (String, String)>) -> String {
    if styles.is_empty() || !definition.contains('`') {
        return definition.to_string();
    }

    let parts: Vec<&str> = definition.split('`').collect();
    let mut out = String::with_capacity(definition.len());
    let mut i = 0;
    while i < parts.len() {
        if let Ok(tag) = parts[i].parse::<u32>() {
            if i + 1 < parts.len() {
                let text = parts[i + 1];
                match styles.get(&tag) {
                    Some((prefix, suffix)) => {
                        out.push_str(prefix);
                        out.push_str(text);
                        out.push_str(suffix);
                    }
                    None => {
                        out.push('`');
                        out.push_str(parts[i]);
                        out.push('`');
                        out.push_str(text);
                    }
                }
                i += 2;
                // Skip the matching closing tag marker, e.g. the second `1` in
                // "see `1`bold`1` word".
                if i < parts.len() && parts[i] == parts[i - 2] {
                    i += 1;
                }
                continue;
            }
        }
        out.push_str(parts[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_stylesheet() {
        let table = parse_stylesheet("1 <b> </b> 2 <i> </i>");
        assert_eq!(table.get(&1), Some(&("<b>".to_string(), "</b>".to_string())));
        assert_eq!(table.get(&2), Some(&("<i>".to_string(), "</i>".to_string())));
    }

    #[test]
    fn expands_style_spans() {
        let table = parse_stylesheet("1 <b> </b>");
        let expanded = expand_stylesheet("see `1`bold`1` word", &table);
        assert_eq!(expanded, "see <b>bold</b> word");
    }

    #[test]
    fn unknown_tag_passes_through() {
        let table = parse_stylesheet("1 <b> </b>");
        let expanded = expand_stylesheet("see `9`bold`9` word", &table);
        assert_eq!(expanded, "see `9`bold`9` word");
    }

    #[test]
    fn attribute_scan_requires_root_element() {
        assert!(scan_attributes("<NotADictionary Foo=\"bar\" />").is_err());
        let attrs = scan_attributes(r#"<Dictionary GeneratedByEngineVersion="2.0" Encrypted="2" />"#)
            .unwrap();
        assert_eq!(attrs.get("GeneratedByEngineVersion").unwrap(), "2.0");
        assert_eq!(attrs.get("Encrypted").unwrap(), "2");
    }
}
