use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Text encodings understood by the string readers.
///
/// `Utf8` is the platform default used whenever no charset is given.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    #[default]
    Utf8,
    Ascii,
    Latin1,
    Utf16Le,
    Utf16Be,
}

/// Errors raised while turning bytes into text or parsing a charset name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid {charset} byte sequence at offset {offset}")]
    Malformed { charset: Charset, offset: usize },
    #[error("{charset} input has an odd length of {len} bytes")]
    OddLength { charset: Charset, len: usize },
    #[error("unsupported charset: {0}")]
    Unsupported(String),
}

impl Charset {
    /// The conventional name of the charset.
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Ascii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf16Be => "UTF-16BE",
        }
    }

    /// Decodes `bytes` into a `String`.
    ///
    /// Decoding is strict: malformed input is an error rather than being
    /// replaced. A UTF-8 byte order mark is kept as `U+FEFF`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` pointing at the first offending byte.
    pub fn decode(self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| DecodeError::Malformed {
                    charset: self,
                    offset: e.valid_up_to(),
                }),
            Charset::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(DecodeError::Malformed { charset: self, offset }),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
            Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Charset::Utf16Le | Charset::Utf16Be => self.decode_utf16(bytes),
        }
    }

    fn decode_utf16(self, bytes: &[u8]) -> Result<String, DecodeError> {
        if bytes.len() % 2 != 0 {
            return Err(DecodeError::OddLength {
                charset: self,
                len: bytes.len(),
            });
        }

        let units = bytes.chunks_exact(2).map(|pair| match self {
            Charset::Utf16Be => u16::from_be_bytes([pair[0], pair[1]]),
            _ => u16::from_le_bytes([pair[0], pair[1]]),
        });

        let mut text = String::with_capacity(bytes.len() / 2);
        let mut offset = 0;
        for unit in char::decode_utf16(units) {
            match unit {
                Ok(c) => {
                    offset += c.len_utf16() * 2;
                    text.push(c);
                }
                Err(_) => return Err(DecodeError::Malformed { charset: self, offset }),
            }
        }
        Ok(text)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = DecodeError;

    /// Parses a charset name, ignoring case, dashes and underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "utf8" => Ok(Charset::Utf8),
            "ascii" | "usascii" => Ok(Charset::Ascii),
            "latin1" | "iso88591" => Ok(Charset::Latin1),
            "utf16le" => Ok(Charset::Utf16Le),
            "utf16be" => Ok(Charset::Utf16Be),
            _ => Err(DecodeError::Unsupported(s.to_string())),
        }
    }
}
