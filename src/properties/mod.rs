use crate::charset::Charset;
use crate::lines::lines;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map;
use std::str::{Chars, FromStr};
use thiserror::Error;

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

/// Key/value pairs read from a properties file.
///
/// Later assignments to the same key replace earlier ones. Iteration order is
/// unspecified.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: HashMap<String, String>,
}

/// Error type for malformed properties text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct PropertiesError {
    /// 1-based number of the natural line where the offending logical line starts.
    pub line: usize,
    /// Description of the parsing error.
    pub message: String,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value stored under `key`, or `default` if there is none.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes `key`, returning the value it held.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns true if a value is stored under `key`, even an empty one.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrows every key/value pair, in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Borrows every key, in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Hands the entries over as a plain map.
impl From<Properties> for HashMap<String, String> {
    fn from(properties: Properties) -> Self {
        properties.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

/// Consumes the properties, yielding owned pairs in unspecified order.
impl IntoIterator for Properties {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromStr for Properties {
    type Err = PropertiesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_properties_str(s)
    }
}

/// Parses properties text.
///
/// Blank lines and lines starting with `#` or `!` are skipped. A line ending in
/// an odd number of backslashes continues on the next line. Keys end at the
/// first unescaped `=`, `:` or whitespace; `\t`, `\n`, `\r`, `\f` and `\uXXXX`
/// escapes are decoded in keys and values.
///
/// # Arguments
///
/// * `content` - The properties text.
///
/// # Returns
///
/// * `Ok(Properties)` with one entry per key, the last assignment winning.
/// * `Err(PropertiesError)` on a malformed `\u` escape.
pub fn parse_properties_str(content: &str) -> Result<Properties, PropertiesError> {
    let mut properties = Properties::new();
    let mut natural = lines(content).enumerate();

    while let Some((index, line)) = natural.next() {
        let trimmed = line.trim_start_matches(WHITESPACE);
        if trimmed.is_empty() || trimmed.starts_with(['#', '!']) {
            continue;
        }

        let mut logical = String::new();
        let mut current = trimmed;
        loop {
            if !continues(current) {
                logical.push_str(current);
                break;
            }
            logical.push_str(&current[..current.len() - 1]);
            match natural.next() {
                Some((_, next)) => current = next.trim_start_matches(WHITESPACE),
                None => break,
            }
        }

        let (raw_key, raw_value) = split_key_value(&logical);
        let error = |message: String| PropertiesError {
            line: index + 1,
            message,
        };
        let key = unescape(raw_key).map_err(error)?;
        let value = unescape(raw_value).map_err(error)?;
        properties.insert(key, value);
    }

    Ok(properties)
}

/// Parses properties from raw bytes.
///
/// The bytes are read as UTF-8 when valid, otherwise as ISO-8859-1, so files
/// written by older tooling still load.
pub fn parse_properties_bytes(bytes: &[u8]) -> Result<Properties, PropertiesError> {
    let text = match Charset::Utf8.decode(bytes) {
        Ok(text) => text,
        Err(_) => Charset::Latin1.decode(bytes).unwrap_or_default(),
    };
    parse_properties_str(&text)
}

/// Whether a natural line ends in an odd number of backslashes.
fn continues(line: &str) -> bool {
    line.bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 1
}

/// Splits a logical line into its still-escaped key and value.
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    let mut value_start = line.len();
    let mut has_separator = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                value_start = i + 1;
                has_separator = true;
                break;
            }
            ' ' | '\t' | '\x0c' => {
                key_end = i;
                value_start = i + 1;
                break;
            }
            _ => {}
        }
    }

    let mut value = line[value_start..].trim_start_matches(WHITESPACE);
    if !has_separator {
        if let Some(rest) = value.strip_prefix(['=', ':']) {
            value = rest.trim_start_matches(WHITESPACE);
        }
    }

    (&line[..key_end], value)
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => out.push(unicode_escape(&mut chars)?),
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// Decodes the code unit after a `\u`, pairing surrogates written as two escapes.
fn unicode_escape(chars: &mut Chars<'_>) -> Result<char, String> {
    let unit = hex4(chars)?;
    if let Some(c) = char::from_u32(u32::from(unit)) {
        return Ok(c);
    }

    if (0xD800..0xDC00).contains(&unit) {
        if let Some(rest) = chars.as_str().strip_prefix("\\u") {
            let mut lookahead = rest.chars();
            let low = hex4(&mut lookahead)?;
            if let Some(Ok(c)) = char::decode_utf16([unit, low]).next() {
                *chars = lookahead;
                return Ok(c);
            }
        }
    }

    Err(format!("unpaired surrogate \\u{:04X}", unit))
}

fn hex4(chars: &mut Chars<'_>) -> Result<u16, String> {
    let mut unit = 0u16;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| "malformed \\uxxxx encoding".to_string())?;
        unit = (unit << 4) | digit as u16;
    }
    Ok(unit)
}
