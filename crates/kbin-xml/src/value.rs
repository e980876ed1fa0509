//! Conversion between node text and typed binary values.

use std::fmt::Write as _;

use kbin_common::{ByteBuffer, Scalar, StorageUnit};

use crate::types::{TextFormat, TypeSpec};
use crate::{Error, Result, TextEncoding};

/// A node value ready for the data stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedValue {
    /// Big-endian payload, without any length prefix.
    pub bytes: Vec<u8>,
    /// Number of storage units in `bytes`.
    pub units: usize,
}

/// Turn node text into payload bytes according to the type's text rule.
pub fn parse_value(spec: &TypeSpec, text: &str, encoding: TextEncoding) -> Result<EncodedValue> {
    match spec.format {
        TextFormat::None => Ok(EncodedValue {
            bytes: Vec::new(),
            units: 0,
        }),
        TextFormat::Hex => {
            let bytes = parse_hex(text.trim()).ok_or_else(|| invalid(spec, text))?;
            Ok(EncodedValue {
                units: bytes.len(),
                bytes,
            })
        }
        TextFormat::Text => {
            let mut bytes = encoding.encode(text)?;
            bytes.push(0);
            Ok(EncodedValue {
                units: bytes.len(),
                bytes,
            })
        }
        TextFormat::Integer | TextFormat::Float | TextFormat::Bool | TextFormat::Ip4 => {
            let unit = spec.unit.ok_or_else(|| invalid(spec, text))?;
            let scalars = text
                .split_whitespace()
                .map(|token| parse_token(spec, unit, token))
                .collect::<Result<Vec<_>>>()?;

            let mut buf = ByteBuffer::with_capacity(scalars.len() * unit.width());
            buf.write_scalars(&scalars);
            Ok(EncodedValue {
                units: scalars.len(),
                bytes: buf.into_vec(),
            })
        }
    }
}

/// Render decoded scalars as node text: tokens joined by single spaces.
pub fn format_values(spec: &TypeSpec, values: &[Scalar]) -> String {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        format_scalar(spec.format, value, &mut out);
    }
    out
}

fn format_scalar(format: TextFormat, value: &Scalar, out: &mut String) {
    // Writing into a String cannot fail.
    let _ = match (format, *value) {
        (TextFormat::Ip4, Scalar::U32(v)) => {
            let [a, b, c, d] = v.to_be_bytes();
            write!(out, "{}.{}.{}.{}", a, b, c, d)
        }
        (_, Scalar::F32(v)) => write!(out, "{:.6}", v),
        (_, Scalar::F64(v)) => write!(out, "{:.6}", v),
        (_, Scalar::S8(v)) => write!(out, "{}", v),
        (_, Scalar::U8(v)) => write!(out, "{}", v),
        (_, Scalar::S16(v)) => write!(out, "{}", v),
        (_, Scalar::U16(v)) => write!(out, "{}", v),
        (_, Scalar::S32(v)) => write!(out, "{}", v),
        (_, Scalar::U32(v)) => write!(out, "{}", v),
        (_, Scalar::S64(v)) => write!(out, "{}", v),
        (_, Scalar::U64(v)) => write!(out, "{}", v),
    };
}

fn parse_token(spec: &TypeSpec, unit: StorageUnit, token: &str) -> Result<Scalar> {
    let bad = || invalid(spec, token);

    match spec.format {
        TextFormat::Ip4 => return parse_ip4(token).map(Scalar::U32).ok_or_else(bad),
        TextFormat::Bool => {
            return match token {
                "true" => Ok(Scalar::S8(1)),
                "false" => Ok(Scalar::S8(0)),
                other => other.parse().map(Scalar::S8).map_err(|_| bad()),
            }
        }
        _ => {}
    }

    match unit {
        StorageUnit::S8 => token.parse().map(Scalar::S8).map_err(|_| bad()),
        StorageUnit::U8 | StorageUnit::RawBytes | StorageUnit::UtfText => {
            token.parse().map(Scalar::U8).map_err(|_| bad())
        }
        StorageUnit::S16 => token.parse().map(Scalar::S16).map_err(|_| bad()),
        StorageUnit::U16 => token.parse().map(Scalar::U16).map_err(|_| bad()),
        StorageUnit::S32 => token.parse().map(Scalar::S32).map_err(|_| bad()),
        StorageUnit::U32 => token.parse().map(Scalar::U32).map_err(|_| bad()),
        StorageUnit::S64 => token.parse().map(Scalar::S64).map_err(|_| bad()),
        StorageUnit::U64 => token.parse().map(Scalar::U64).map_err(|_| bad()),
        StorageUnit::F32 => token.parse().map(Scalar::F32).map_err(|_| bad()),
        StorageUnit::F64 => token.parse().map(Scalar::F64).map_err(|_| bad()),
    }
}

/// Parse `a.b.c.d` into its big-endian u32 value.
pub fn parse_ip4(text: &str) -> Option<u32> {
    let mut octets = [0u8; 4];
    let mut parts = text.split('.');
    for octet in &mut octets {
        *octet = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(u32::from_be_bytes(octets))
}

/// Decode hex pairs. Odd-length input gets a leading zero nibble.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;

    let padded = if digits.len() % 2 == 1 {
        std::iter::once(0).chain(digits).collect::<Vec<_>>()
    } else {
        digits
    };

    Some(
        padded
            .chunks_exact(2)
            .map(|pair| (pair[0] << 4) | pair[1])
            .collect(),
    )
}

/// Lowercase hex pairs.
pub fn format_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

fn invalid(spec: &TypeSpec, value: &str) -> Error {
    Error::InvalidValue {
        type_name: spec.name().to_string(),
        value: value.to_string(),
    }
}
