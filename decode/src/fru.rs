// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Decoding of IPMI FRU EEPROM images.
//!
//! Only the common header, the Board Info area, and the Product Info area
//! are decoded. Every area is protected by a zero-sum checksum, which is
//! verified before any field is read.

use crate::Error;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use platform_messages::DevInfo;
use std::fmt;

/// The size of the FRU common header.
pub const COMMON_HEADER_LEN: usize = 8;

/// The only supported FRU format version.
pub const FRU_FORMAT_VERSION: u8 = 0x01;

/// Area offsets and lengths are stored in units of 8 bytes.
const AREA_UNIT: usize = 8;

/// The type/length byte that terminates the field list of an area.
const END_OF_FIELDS: u8 = 0xc1;

crate::bitfield_enum! {
    name = TypeCode,
    description = "The encoding of a FRU field, from bits [7:6] of its type/length byte",
    bits = 7:6,
    variants = {
        0b00, Binary, "binary",
        0b01, BcdPlus, "BCD plus",
        0b10, Ascii6, "6-bit ASCII",
        0b11, Latin1, "8-bit ASCII + Latin 1",
    },
}

/// Return true if the bytes sum to zero modulo 256.
fn checksum_ok(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0
}

/// The FRU common header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CommonHeader {
    pub version: u8,
    pub internal_offset: u8,
    pub chassis_offset: u8,
    pub board_offset: u8,
    pub product_offset: u8,
    pub multirecord_offset: u8,
}

impl CommonHeader {
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        let Some(header) = buf.get(..COMMON_HEADER_LEN) else {
            return Err(Error::Truncated {
                needed: COMMON_HEADER_LEN,
                available: buf.len(),
            });
        };
        if header[0] & 0x0f != FRU_FORMAT_VERSION {
            return Err(Error::InvalidHeader("unsupported FRU format version"));
        }
        if !checksum_ok(header) {
            return Err(Error::InvalidHeader("FRU common header checksum"));
        }
        Ok(Self {
            version: header[0] & 0x0f,
            internal_offset: header[1],
            chassis_offset: header[2],
            board_offset: header[3],
            product_offset: header[4],
            multirecord_offset: header[5],
        })
    }
}

/// Decode the contents of a FRU field according to its type code.
pub fn decode_field(code: TypeCode, data: &[u8]) -> String {
    match code {
        TypeCode::Binary => data.iter().map(|b| format!("{b:02x}")).collect(),
        TypeCode::BcdPlus => data
            .iter()
            .flat_map(|b| [b >> 4, b & 0x0f])
            .map(|nibble| match nibble {
                0..=9 => char::from(b'0' + nibble),
                0xa => ' ',
                0xb => '-',
                0xc => '.',
                _ => '?',
            })
            .collect(),
        TypeCode::Ascii6 => {
            // Four characters are packed into every three bytes, LSB first.
            let mut out = String::with_capacity(data.len() * 4 / 3);
            let mut acc: u32 = 0;
            let mut bits = 0;
            for b in data {
                acc |= u32::from(*b) << bits;
                bits += 8;
                while bits >= 6 {
                    out.push(char::from(0x20 + (acc & 0x3f) as u8));
                    acc >>= 6;
                    bits -= 6;
                }
            }
            out.trim_end().to_string()
        }
        TypeCode::Latin1 => data.iter().map(|b| char::from(*b)).collect::<String>(),
    }
}

// Split an area's variable-length fields, stopping at the end marker.
fn parse_fields(mut data: &[u8]) -> Result<Vec<String>, Error> {
    let mut fields = Vec::new();
    loop {
        let Some((&type_len, rest)) = data.split_first() else {
            return Err(Error::InvalidHeader("FRU field list is not terminated"));
        };
        if type_len == END_OF_FIELDS {
            return Ok(fields);
        }
        let len = usize::from(type_len & 0x3f);
        let Some(value) = rest.get(..len) else {
            return Err(Error::Truncated {
                needed: len,
                available: rest.len(),
            });
        };
        let code = TypeCode::try_from(type_len)?;
        fields.push(decode_field(code, value).trim_end_matches('\0').to_string());
        data = &rest[len..];
    }
}

// Return the checksummed bytes of the area starting at `offset` units.
fn area(buf: &[u8], offset: u8) -> Result<&[u8], Error> {
    let start = usize::from(offset) * AREA_UNIT;
    let header = buf.get(start..start + 2).ok_or(Error::Truncated {
        needed: start + 2,
        available: buf.len(),
    })?;
    if header[0] & 0x0f != FRU_FORMAT_VERSION {
        return Err(Error::InvalidHeader("unsupported FRU area version"));
    }
    let len = usize::from(header[1]) * AREA_UNIT;
    if len < 3 {
        return Err(Error::InvalidLength {
            what: "FRU area",
            len,
        });
    }
    let bytes = buf.get(start..start + len).ok_or(Error::Truncated {
        needed: start + len,
        available: buf.len(),
    })?;
    if !checksum_ok(bytes) {
        return Err(Error::InvalidHeader("FRU area checksum"));
    }
    Ok(bytes)
}

// Take the next field, or an empty string if the area ran out of fields.
fn take(fields: &mut std::vec::IntoIter<String>) -> String {
    fields.next().unwrap_or_default()
}

/// The Board Info area.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BoardInfo {
    pub lang_code: u8,
    /// Minutes since 1996-01-01 00:00 UTC.
    pub mfg_minutes: u32,
    pub manufacturer: String,
    pub product_name: String,
    pub serial: String,
    pub part_number: String,
    pub fru_file_id: String,
    pub custom: Vec<String>,
}

impl BoardInfo {
    pub fn parse(area: &[u8]) -> Result<Self, Error> {
        let Some(fixed) = area.get(..6) else {
            return Err(Error::Truncated {
                needed: 6,
                available: area.len(),
            });
        };
        let mfg_minutes = u32::from_le_bytes([fixed[3], fixed[4], fixed[5], 0]);
        let mut fields = parse_fields(&area[6..])?.into_iter();
        Ok(Self {
            lang_code: fixed[2],
            mfg_minutes,
            manufacturer: take(&mut fields),
            product_name: take(&mut fields),
            serial: take(&mut fields),
            part_number: take(&mut fields),
            fru_file_id: take(&mut fields),
            custom: fields.collect(),
        })
    }

    /// Return the manufacturing date, if one is recorded.
    pub fn mfg_date(&self) -> Option<NaiveDateTime> {
        if self.mfg_minutes == 0 {
            return None;
        }
        NaiveDate::from_ymd_opt(1996, 1, 1)?
            .and_hms_opt(0, 0, 0)?
            .checked_add_signed(Duration::minutes(i64::from(self.mfg_minutes)))
    }
}

/// The Product Info area.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProductInfo {
    pub lang_code: u8,
    pub manufacturer: String,
    pub product_name: String,
    pub part_number: String,
    pub version: String,
    pub serial: String,
    pub asset_tag: String,
    pub fru_file_id: String,
    pub custom: Vec<String>,
}

impl ProductInfo {
    pub fn parse(area: &[u8]) -> Result<Self, Error> {
        let Some(fixed) = area.get(..3) else {
            return Err(Error::Truncated {
                needed: 3,
                available: area.len(),
            });
        };
        let mut fields = parse_fields(&area[3..])?.into_iter();
        Ok(Self {
            lang_code: fixed[2],
            manufacturer: take(&mut fields),
            product_name: take(&mut fields),
            part_number: take(&mut fields),
            version: take(&mut fields),
            serial: take(&mut fields),
            asset_tag: take(&mut fields),
            fru_file_id: take(&mut fields),
            custom: fields.collect(),
        })
    }
}

/// The area of a FRU image to take identity fields from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FruArea {
    Board,
    Product,
}

/// The decoded identity areas of a FRU image.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FruInfo {
    pub header: Option<CommonHeader>,
    pub board: Option<BoardInfo>,
    pub product: Option<ProductInfo>,
}

impl FruInfo {
    /// Parse a FRU image. Areas with a zero offset are absent.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        let header = CommonHeader::parse(buf)?;
        let board = match header.board_offset {
            0 => None,
            off => Some(BoardInfo::parse(area(buf, off)?)?),
        };
        let product = match header.product_offset {
            0 => None,
            off => Some(ProductInfo::parse(area(buf, off)?)?),
        };
        Ok(Self {
            header: Some(header),
            board,
            product,
        })
    }

    /// Look up an identity field in the requested area.
    pub fn field(&self, area: FruArea, info: DevInfo) -> Option<&str> {
        let value = match area {
            FruArea::Board => {
                let board = self.board.as_ref()?;
                match info {
                    DevInfo::Name => &board.product_name,
                    DevInfo::Sn => &board.serial,
                    DevInfo::PartNumber | DevInfo::PartName => &board.part_number,
                    DevInfo::Vendor => &board.manufacturer,
                    DevInfo::HwInfo => board.custom.first()?,
                    _ => return None,
                }
            }
            FruArea::Product => {
                let product = self.product.as_ref()?;
                match info {
                    DevInfo::Name => &product.product_name,
                    DevInfo::Sn => &product.serial,
                    DevInfo::PartNumber | DevInfo::PartName | DevInfo::DevType => {
                        &product.part_number
                    }
                    DevInfo::Vendor => &product.manufacturer,
                    DevInfo::HwInfo => &product.version,
                    DevInfo::AssetTag => &product.asset_tag,
                    _ => return None,
                }
            }
        };
        Some(value.as_str())
    }
}

impl fmt::Display for FruInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(board) = &self.board {
            writeln!(f, "Board Info:")?;
            if let Some(date) = board.mfg_date() {
                writeln!(f, "  Mfg Date:      {date}")?;
            }
            writeln!(f, "  Manufacturer:  {}", board.manufacturer)?;
            writeln!(f, "  Product Name:  {}", board.product_name)?;
            writeln!(f, "  Serial Number: {}", board.serial)?;
            writeln!(f, "  Part Number:   {}", board.part_number)?;
        }
        if let Some(product) = &self.product {
            writeln!(f, "Product Info:")?;
            writeln!(f, "  Manufacturer:  {}", product.manufacturer)?;
            writeln!(f, "  Product Name:  {}", product.product_name)?;
            writeln!(f, "  Part Number:   {}", product.part_number)?;
            writeln!(f, "  Version:       {}", product.version)?;
            writeln!(f, "  Serial Number: {}", product.serial)?;
            writeln!(f, "  Asset Tag:     {}", product.asset_tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::decode_field;
    use super::FruArea;
    use super::FruInfo;
    use super::TypeCode;
    use crate::Error;
    use platform_messages::DevInfo;

    fn fix_checksum(bytes: &mut [u8]) {
        let n = bytes.len();
        let sum = bytes[..n - 1]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        bytes[n - 1] = 0u8.wrapping_sub(sum);
    }

    fn build_area(fixed: &[u8], fields: &[&str]) -> Vec<u8> {
        let mut area = fixed.to_vec();
        for field in fields {
            area.push(0xc0 | field.len() as u8);
            area.extend_from_slice(field.as_bytes());
        }
        area.push(0xc1);
        // Pad to a multiple of 8, leaving room for the checksum.
        while (area.len() + 1) % 8 != 0 {
            area.push(0);
        }
        area.push(0);
        area[1] = (area.len() / 8) as u8;
        fix_checksum(&mut area);
        area
    }

    /// Build a FRU image with board and product areas.
    pub(crate) fn fru_image(board: &[&str], product: &[&str]) -> Vec<u8> {
        let board = build_area(&[0x01, 0, 0x19, 0x45, 0x00, 0x00], board);
        let product = build_area(&[0x01, 0, 0x19], product);
        let board_offset = 1u8;
        let product_offset = board_offset + (board.len() / 8) as u8;
        let mut header = vec![0x01, 0, 0, board_offset, product_offset, 0, 0, 0];
        fix_checksum(&mut header);
        let mut image = header;
        image.extend_from_slice(&board);
        image.extend_from_slice(&product);
        image
    }

    #[test]
    fn test_fru_parse_fields() {
        let image = fru_image(
            &["ACME", "MAINBOARD", "BSN001", "BPN-01", ""],
            &["ACME", "PSU-550W-AC", "PN-550", "A01", "PSN123", "TAG9", ""],
        );
        let fru = FruInfo::parse(&image).unwrap();
        assert_eq!(fru.field(FruArea::Product, DevInfo::Name), Some("PSU-550W-AC"));
        assert_eq!(fru.field(FruArea::Product, DevInfo::Sn), Some("PSN123"));
        assert_eq!(fru.field(FruArea::Product, DevInfo::HwInfo), Some("A01"));
        assert_eq!(fru.field(FruArea::Product, DevInfo::AssetTag), Some("TAG9"));
        assert_eq!(fru.field(FruArea::Board, DevInfo::Vendor), Some("ACME"));
        assert_eq!(fru.field(FruArea::Board, DevInfo::Sn), Some("BSN001"));
        assert_eq!(fru.field(FruArea::Board, DevInfo::Mac), None);

        let date = fru.board.as_ref().unwrap().mfg_date().unwrap();
        assert_eq!(date.to_string(), "1996-01-01 01:09:00");
    }

    #[test]
    fn test_fru_rejects_bad_checksum() {
        let mut image = fru_image(&["A", "B", "C", "D", ""], &["A", "B", "C", "D", "E", "F", ""]);
        image[7] ^= 1;
        assert!(FruInfo::parse(&image).is_err());

        let mut image = fru_image(&["A", "B", "C", "D", ""], &["A", "B", "C", "D", "E", "F", ""]);
        image[10] ^= 1;
        assert!(matches!(
            FruInfo::parse(&image),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(TypeCode::try_from(0xc5).unwrap(), TypeCode::Latin1);
        assert_eq!(TypeCode::try_from(0x45).unwrap(), TypeCode::BcdPlus);
        assert_eq!(decode_field(TypeCode::BcdPlus, &[0x12, 0xb3]), "12-3");
        assert_eq!(decode_field(TypeCode::Binary, &[0xde, 0xad]), "dead");
        // "ABCD" in 6-bit ASCII, packed LSB first.
        assert_eq!(decode_field(TypeCode::Ascii6, &[0xa1, 0x38, 0x92]), "ABCD");
    }
}
