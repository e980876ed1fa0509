//! Text encodings a kbin document can declare in its header.

use std::fmt;

use encoding_rs::{EUC_JP, SHIFT_JIS, UTF_8};

use crate::{Error, Result};

/// One of the six code pages a kbin header can name.
///
/// Shift-JIS has two ids on the wire; `0x80` is the one writers produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextEncoding {
    /// Shift-JIS under id `0x00`.
    ShiftJisLegacy,
    Ascii,
    Latin1,
    EucJp,
    /// Shift-JIS under id `0x80`.
    ShiftJis,
    Utf8,
}

impl TextEncoding {
    /// All encodings in header id order.
    pub const ALL: [TextEncoding; 6] = [
        Self::ShiftJisLegacy,
        Self::Ascii,
        Self::Latin1,
        Self::EucJp,
        Self::ShiftJis,
        Self::Utf8,
    ];

    /// Header id byte.
    pub const fn id(self) -> u8 {
        match self {
            Self::ShiftJisLegacy => 0x00,
            Self::Ascii => 0x20,
            Self::Latin1 => 0x40,
            Self::EucJp => 0x60,
            Self::ShiftJis => 0x80,
            Self::Utf8 => 0xA0,
        }
    }

    /// Resolve a header id byte. Unknown ids decode as UTF-8.
    pub fn from_id(id: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|encoding| encoding.id() == id)
            .unwrap_or(Self::Utf8)
    }

    /// Resolve a user-facing label such as `shift_jis` or `utf-8`.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace(&['-', '_'][..], "");
        Some(match normalized.as_str() {
            "shiftjis" | "sjis" | "cp932" | "windows31j" => Self::ShiftJis,
            "ascii" | "usascii" => Self::Ascii,
            "latin1" | "iso88591" => Self::Latin1,
            "eucjp" => Self::EucJp,
            "utf8" => Self::Utf8,
            _ => return None,
        })
    }

    /// Canonical label.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShiftJisLegacy | Self::ShiftJis => "shift_jis",
            Self::Ascii => "ascii",
            Self::Latin1 => "iso-8859-1",
            Self::EucJp => "euc-jp",
            Self::Utf8 => "utf-8",
        }
    }

    /// Whether this is one of the Shift-JIS ids.
    pub const fn is_shift_jis(self) -> bool {
        matches!(self, Self::ShiftJis | Self::ShiftJisLegacy)
    }

    /// Encode text, failing on characters the code page cannot represent.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        let unencodable = || Error::StringEncodeFailure {
            encoding: self,
            value: text.to_string(),
        };

        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Ascii => {
                if text.is_ascii() {
                    Ok(text.as_bytes().to_vec())
                } else {
                    Err(unencodable())
                }
            }
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| unencodable()))
                .collect(),
            Self::ShiftJis | Self::ShiftJisLegacy | Self::EucJp => {
                let codec = if self == Self::EucJp { EUC_JP } else { SHIFT_JIS };
                let (bytes, _, had_errors) = codec.encode(text);
                if had_errors {
                    Err(unencodable())
                } else {
                    Ok(bytes.into_owned())
                }
            }
        }
    }

    /// Decode bytes, failing on sequences that are invalid in the code page.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        let undecodable = || Error::StringDecodeFailure {
            encoding: self,
            bytes: bytes.to_vec(),
        };

        match self {
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Ascii => {
                if bytes.is_ascii() {
                    Ok(bytes.iter().map(|&b| char::from(b)).collect())
                } else {
                    Err(undecodable())
                }
            }
            Self::Utf8 | Self::ShiftJis | Self::ShiftJisLegacy | Self::EucJp => {
                let codec = match self {
                    Self::Utf8 => UTF_8,
                    Self::EucJp => EUC_JP,
                    _ => SHIFT_JIS,
                };
                codec
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(|text| text.into_owned())
                    .ok_or_else(undecodable)
            }
        }
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::ShiftJis
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
