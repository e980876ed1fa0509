//! Sixbit name packing.
//!
//! Compressed kbin documents store node and attribute names as a length byte
//! followed by 6-bit character codes packed MSB-first and zero-padded to a byte
//! boundary.

use kbin_common::ByteBuffer;

use crate::{Error, Result};

/// The 64 symbols a sixbit name can contain, indexed by code.
pub const ALPHABET: &[u8; 64] = b"0123456789:ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Longest name the length byte can describe.
pub const MAX_LEN: usize = 255;

const INVALID: u8 = 0xFF;

const CODES: [u8; 128] = {
    let mut codes = [INVALID; 128];
    let mut i = 0;
    while i < ALPHABET.len() {
        codes[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    codes
};

/// Sixbit code for a character.
#[inline]
fn code_of(c: char) -> Option<u8> {
    let index = c as usize;
    if index < CODES.len() && CODES[index] != INVALID {
        Some(CODES[index])
    } else {
        None
    }
}

/// Number of packed bytes for a name of `len` characters.
#[inline]
pub const fn packed_len(len: usize) -> usize {
    (len * 6).div_ceil(8)
}

/// Pack `name` into its length byte and bitstream.
pub fn pack(name: &str) -> Result<Vec<u8>> {
    let codes = name
        .chars()
        .map(|symbol| {
            code_of(symbol).ok_or_else(|| Error::InvalidSymbol {
                name: name.to_string(),
                symbol,
            })
        })
        .collect::<Result<Vec<u8>>>()?;

    if codes.len() > MAX_LEN {
        return Err(Error::NameLength {
            name: name.to_string(),
            len: codes.len(),
            min: 0,
            max: MAX_LEN,
        });
    }

    let mut out = vec![0u8; 1 + packed_len(codes.len())];
    out[0] = codes.len() as u8;
    let bits = &mut out[1..];
    for (i, code) in codes.iter().enumerate() {
        for bit in 0..6 {
            if code & (0x20 >> bit) != 0 {
                let pos = i * 6 + bit;
                bits[pos / 8] |= 0x80 >> (pos % 8);
            }
        }
    }
    Ok(out)
}

/// Pack `name` and append it to `buf`.
pub fn pack_into(name: &str, buf: &mut ByteBuffer) -> Result<()> {
    buf.write_bytes(&pack(name)?);
    Ok(())
}

/// Read a packed name from `buf`.
pub fn unpack(buf: &mut ByteBuffer) -> Result<String> {
    let len = buf.read::<u8>()? as usize;
    let bits = buf.read_bytes(packed_len(len))?;

    let mut name = String::with_capacity(len);
    for i in 0..len {
        let mut code = 0u8;
        for bit in 0..6 {
            let pos = i * 6 + bit;
            code = (code << 1) | ((bits[pos / 8] >> (7 - pos % 8)) & 1);
        }
        name.push(char::from(ALPHABET[code as usize]));
    }
    Ok(name)
}
