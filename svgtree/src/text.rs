// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::XmlSpace;

// Limits nested entity expansion.
const MAX_ENTITY_DEPTH: u8 = 4;

/// Expands character and entity references.
///
/// Unknown or malformed references are kept as is.
/// When `normalize` is set, `\t`, `\n`, `\r` and `\r\n` are replaced with a single space,
/// as required for attribute values.
pub(crate) fn decode<'a>(
    text: &'a str,
    entities: &HashMap<String, String>,
    normalize: bool,
) -> Cow<'a, str> {
    let needs_work = text
        .bytes()
        .any(|c| c == b'&' || (normalize && matches!(c, b'\t' | b'\n' | b'\r')));
    if !needs_work {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    decode_into(text, entities, normalize, 0, &mut out);
    Cow::Owned(out)
}

fn decode_into(
    text: &str,
    entities: &HashMap<String, String>,
    normalize: bool,
    depth: u8,
    out: &mut String,
) {
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        match c {
            '&' => match parse_reference(rest) {
                Some((reference, len)) => {
                    match reference {
                        Reference::Char(c) => out.push(c),
                        Reference::Entity(name) => match entities.get(name) {
                            Some(value) if depth < MAX_ENTITY_DEPTH => {
                                decode_into(value, entities, normalize, depth + 1, out);
                            }
                            _ => out.push_str(&rest[..len]),
                        },
                    }
                    rest = &rest[len..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            },
            '\r' if normalize => {
                out.push(' ');
                rest = rest.strip_prefix("\r\n").unwrap_or(&rest[1..]);
            }
            '\t' | '\n' if normalize => {
                out.push(' ');
                rest = &rest[1..];
            }
            _ => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
}

pub(crate) enum Reference<'a> {
    Char(char),
    Entity(&'a str),
}

/// Parses a reference at the start of `text`.
///
/// Returns the reference and its length in bytes, including `&` and `;`.
pub(crate) fn parse_reference(text: &str) -> Option<(Reference, usize)> {
    let text = text.strip_prefix('&')?;
    let end = text.find(';')?;
    let name = &text[..end];
    let len = end + 2;

    if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix('x') {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };

        return Some((Reference::Char(char::from_u32(code)?), len));
    }

    let c = match name {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let valid = !name.is_empty()
                && name
                    .bytes()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b'.' | b':'));
            return if valid {
                Some((Reference::Entity(name), len))
            } else {
                None
            };
        }
    };

    Some((Reference::Char(c), len))
}

/// Applies the SVG whitespace handling rules to a text node content.
///
/// With `xml:space="default"`, newlines are removed, tabs become spaces and
/// consecutive spaces are collapsed. With `xml:space="preserve"`, newlines and tabs
/// become spaces and everything else is kept.
///
/// Leading and trailing spaces are kept, since trimming depends on the position
/// of the node inside a text chunk.
pub fn normalize_text(text: &str, mode: XmlSpace) -> String {
    let mut out = String::with_capacity(text.len());
    match mode {
        XmlSpace::Default => {
            let mut prev_space = false;
            for c in text.chars() {
                match c {
                    '\n' | '\r' => {}
                    ' ' | '\t' => {
                        if !prev_space {
                            out.push(' ');
                        }
                        prev_space = true;
                    }
                    _ => {
                        out.push(c);
                        prev_space = false;
                    }
                }
            }
        }
        XmlSpace::Preserve => {
            let mut chars = text.chars().peekable();
            while let Some(c) = chars.next() {
                match c {
                    '\r' => {
                        if chars.peek() == Some(&'\n') {
                            chars.next();
                        }
                        out.push(' ');
                    }
                    '\n' | '\t' => out.push(' '),
                    _ => out.push(c),
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_entities() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn decode_borrowed() {
        assert!(matches!(
            decode("10 20", &no_entities(), true),
            Cow::Borrowed("10 20")
        ));
    }

    #[test]
    fn decode_predefined_and_numeric() {
        assert_eq!(
            decode("a &lt; b &amp; &#65;&#x42;", &no_entities(), false),
            "a < b & AB"
        );
    }

    #[test]
    fn decode_unknown_kept() {
        assert_eq!(decode("&unknown; & x", &no_entities(), false), "&unknown; & x");
    }

    #[test]
    fn decode_custom_entity() {
        let mut entities = HashMap::new();
        entities.insert("ns".to_string(), "http://&lt;ns&gt;".to_string());
        assert_eq!(decode("&ns;", &entities, false), "http://<ns>");
    }

    #[test]
    fn decode_recursive_entity_is_bounded() {
        let mut entities = HashMap::new();
        entities.insert("a".to_string(), "&a;&a;".to_string());
        let text = decode("&a;", &entities, false);
        assert!(text.len() < 1024);
    }

    #[test]
    fn decode_normalizes_whitespace() {
        assert_eq!(decode("1\t2\r\n3\n4", &no_entities(), true), "1 2 3 4");
    }

    #[test]
    fn normalize_default() {
        assert_eq!(
            normalize_text("  Hello\n   \tWorld ", XmlSpace::Default),
            " Hello World "
        );
    }

    #[test]
    fn normalize_preserve() {
        assert_eq!(
            normalize_text("a\n\tb  c", XmlSpace::Preserve),
            "a  b  c"
        );
    }
}
