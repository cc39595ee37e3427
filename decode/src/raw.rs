// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Decode and encode the raw bytes behind an info-control record.

use crate::Error;
use platform_messages::Polarity;

/// Return the mask of the low `len` bits of a byte.
pub const fn low_bits_mask(len: usize) -> u8 {
    if len >= 8 {
        0xff
    } else {
        !(0xff_u8 << len)
    }
}

/// Extract a bit field from a single byte.
///
/// With negative polarity the byte is inverted before extraction.
pub fn decode_bits(raw: u8, pola: Polarity, bit_offset: u8, len: usize) -> Result<u8, Error> {
    if bit_offset >= 8 {
        return Err(Error::BitOutOfRange);
    }
    let raw = if pola == Polarity::Negative { !raw } else { raw };
    Ok((raw >> bit_offset) & low_bits_mask(len))
}

/// Assemble an integer from a run of bytes.
///
/// Positive (and unspecified) polarity reads the bytes big-endian; negative
/// polarity reads them little-endian. Bytes beyond the width of an `i32`
/// shift the leading bytes out.
pub fn decode_int(buf: &[u8], pola: Polarity) -> i32 {
    let fold = |acc: u32, b: &u8| (acc << 8) | u32::from(*b);
    let value = if pola == Polarity::Negative {
        buf.iter().rev().fold(0, fold)
    } else {
        buf.iter().fold(0, fold)
    };
    value as i32
}

/// Parse a base-10 signed integer from a byte string.
///
/// Parsing stops at the first NUL. Leading whitespace and an optional sign
/// are accepted, and trailing non-digits (such as a newline) are ignored.
pub fn decode_num_str(buf: &[u8]) -> Result<i32, Error> {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    let s = String::from_utf8_lossy(&buf[..end]);
    let t = s.trim_start();
    let (negative, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let n_digits = digits.bytes().take_while(u8::is_ascii_digit).count();
    if n_digits == 0 {
        return Err(Error::InvalidNumber(s.into_owned()));
    }
    let magnitude: i64 = digits[..n_digits]
        .parse()
        .map_err(|_| Error::InvalidNumber(s.to_string()))?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| Error::OutOfRange(value))
}

/// A byte to be written into a bit field, along with the bits it covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BitWrite {
    pub value: u8,
    pub mask: u8,
}

impl BitWrite {
    /// Return true if the write covers the entire byte.
    pub const fn is_full(&self) -> bool {
        self.mask == 0xff
    }

    /// Merge the write into the current contents of the byte.
    pub const fn merge(&self, current: u8) -> u8 {
        (current & !self.mask) | (self.value & self.mask)
    }
}

/// Encode a value into a bit field write.
///
/// The low byte of the value is shifted to `bit_offset`, then inverted for
/// negative polarity.
pub fn encode_bits(value: i32, pola: Polarity, bit_offset: u8, len: usize) -> Result<BitWrite, Error> {
    if bit_offset >= 8 {
        return Err(Error::BitOutOfRange);
    }
    let mut byte = ((value & 0xff) as u8) << bit_offset;
    if pola == Polarity::Negative {
        byte = !byte;
    }
    Ok(BitWrite {
        value: byte,
        mask: low_bits_mask(len) << bit_offset,
    })
}

/// Convert a value into `len` bytes for a register write.
///
/// Positive polarity produces big-endian bytes and negative polarity
/// little-endian. At most 4 bytes may be produced.
pub fn encode_int(value: u32, len: usize, pola: Polarity) -> Result<Vec<u8>, Error> {
    const MAX_WIDTH: usize = 4;
    if len == 0 || len > MAX_WIDTH {
        return Err(Error::InvalidLength {
            what: "register width",
            len,
        });
    }
    let le = value.to_le_bytes();
    match pola {
        Polarity::Positive => Ok(le[..len].iter().rev().copied().collect()),
        Polarity::Negative => Ok(le[..len].to_vec()),
        Polarity::None => Err(Error::UnsupportedPolarity),
    }
}

#[cfg(test)]
mod tests {
    use super::decode_bits;
    use super::decode_int;
    use super::decode_num_str;
    use super::encode_bits;
    use super::encode_int;
    use super::low_bits_mask;
    use crate::Error;
    use platform_messages::Polarity;

    #[test]
    fn test_decode_bits_positive_matches_shift_and_mask() {
        for raw in 0..=255u8 {
            for off in 0..8 {
                for len in 1..=8 {
                    let expected = ((u32::from(raw) >> off) & ((1 << len) - 1)) as u8;
                    assert_eq!(
                        decode_bits(raw, Polarity::Positive, off, len).unwrap(),
                        expected
                    );
                }
            }
        }
    }

    #[test]
    fn test_decode_bits_negative_inverts() {
        for raw in 0..=255u8 {
            let expected = ((!raw) >> 3) & 0b11;
            assert_eq!(decode_bits(raw, Polarity::Negative, 3, 2).unwrap(), expected);
        }
        assert_eq!(decode_bits(0, Polarity::Positive, 8, 1), Err(Error::BitOutOfRange));
    }

    #[test]
    fn test_decode_int_byte_order() {
        assert_eq!(decode_int(&[0x12, 0x34], Polarity::Positive), 0x1234);
        assert_eq!(decode_int(&[0x12, 0x34], Polarity::None), 0x1234);
        assert_eq!(decode_int(&[0x12, 0x34], Polarity::Negative), 0x3412);
        assert_eq!(decode_int(&[0xff, 0xff, 0xff, 0xfe], Polarity::Positive), -2);
    }

    #[test]
    fn test_decode_num_str() {
        assert_eq!(decode_num_str(b"45123\n").unwrap(), 45123);
        assert_eq!(decode_num_str(b"-12\0garbage").unwrap(), -12);
        assert_eq!(decode_num_str(b"  +7").unwrap(), 7);
        assert!(decode_num_str(b"abc").is_err());
        assert!(decode_num_str(b"99999999999").is_err());
    }

    #[test]
    fn test_encode_bits_masks() {
        let w = encode_bits(1, Polarity::Positive, 3, 1).unwrap();
        assert_eq!(w.value, 0b1000);
        assert_eq!(w.mask, 0b1000);
        assert!(!w.is_full());
        assert_eq!(w.merge(0xff), 0xff);
        assert_eq!(w.merge(0x00), 0x08);

        let w = encode_bits(1, Polarity::Negative, 3, 1).unwrap();
        assert_eq!(w.merge(0xff), 0xf7);

        let w = encode_bits(0x1a5, Polarity::Positive, 0, 8).unwrap();
        assert!(w.is_full());
        assert_eq!(w.value, 0xa5);
        assert_eq!(low_bits_mask(3), 0b111);
    }

    #[test]
    fn test_encode_int() {
        assert_eq!(
            encode_int(0x1234_5678, 4, Polarity::Positive).unwrap(),
            vec![0x12, 0x34, 0x56, 0x78]
        );
        assert_eq!(
            encode_int(0x1234_5678, 4, Polarity::Negative).unwrap(),
            vec![0x78, 0x56, 0x34, 0x12]
        );
        assert_eq!(encode_int(0x5678, 2, Polarity::Positive).unwrap(), vec![0x56, 0x78]);
        assert_eq!(
            encode_int(1, 4, Polarity::None),
            Err(Error::UnsupportedPolarity)
        );
        assert!(encode_int(1, 5, Polarity::Positive).is_err());
    }
}
