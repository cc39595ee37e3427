// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Type-length-value EEPROM formats.
//!
//! Two layouts are supported. Fan modules carry a compact 6-byte header
//! followed by TLV entries, and the system EEPROM uses the ONIE `TlvInfo`
//! format, which adds a signature and a trailing CRC-32.

use crate::Error;
use crc::Crc;
use crc::CRC_32_ISO_HDLC;
use std::fmt;

/// The size of the fan EEPROM TLV header.
pub const FAN_TLV_HEADER_LEN: usize = 6;

/// The largest TLV payload accepted from a fan EEPROM.
///
/// Larger values are what blank EEPROMs hold, and are treated as unset.
pub const FAN_TLV_MAX_LEN: usize = 0xff;

/// The header of a fan EEPROM TLV area.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FanTlvHeader {
    pub version: u8,
    pub flag: u8,
    pub hw_version: u8,
    pub kind: u8,
    pub tlv_len: usize,
}

impl FanTlvHeader {
    /// Parse the header, rejecting unset or oversized payload lengths.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        let Some(header) = buf.get(..FAN_TLV_HEADER_LEN) else {
            return Err(Error::Truncated {
                needed: FAN_TLV_HEADER_LEN,
                available: buf.len(),
            });
        };
        let tlv_len = usize::from(u16::from_be_bytes([header[4], header[5]]));
        if tlv_len == 0 || tlv_len > FAN_TLV_MAX_LEN {
            return Err(Error::InvalidLength {
                what: "fan TLV area",
                len: tlv_len,
            });
        }
        Ok(Self {
            version: header[0],
            flag: header[1],
            hw_version: header[2],
            kind: header[3],
            tlv_len,
        })
    }
}

/// Find the entry with type `code` in a run of TLV entries.
///
/// The entry's value is copied into `out`, which must have room for the value
/// and a terminator, and its length is returned.
pub fn find_field(data: &[u8], code: u8, out: &mut [u8]) -> Result<usize, Error> {
    let mut entries = TlvEntries { data };
    for (kind, value) in &mut entries {
        if kind == code && value.len() < out.len() {
            out[..value.len()].copy_from_slice(value);
            return Ok(value.len());
        }
    }
    Err(Error::FieldNotFound(code))
}

// Iterate `(type, value)` pairs, stopping at the first truncated entry.
struct TlvEntries<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for TlvEntries<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let [kind, len, rest @ ..] = self.data else {
            return None;
        };
        let value = rest.get(..usize::from(*len))?;
        self.data = &rest[value.len()..];
        Some((*kind, value))
    }
}

/// The signature at the start of an ONIE `TlvInfo` EEPROM.
pub const TLV_INFO_SIGNATURE: &[u8; 8] = b"TlvInfo\0";

/// The only supported `TlvInfo` format version.
pub const TLV_INFO_VERSION: u8 = 0x01;

/// The size of the `TlvInfo` header: signature, version, and total length.
pub const TLV_INFO_HEADER_LEN: usize = 11;

/// The type code of the CRC-32 entry that ends a `TlvInfo` area.
pub const TLV_CODE_CRC_32: u8 = 0xfe;

const ONIE_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Well-known ONIE `TlvInfo` type codes.
pub mod code {
    pub const PRODUCT_NAME: u8 = 0x21;
    pub const PART_NUMBER: u8 = 0x22;
    pub const SERIAL_NUMBER: u8 = 0x23;
    pub const BASE_MAC: u8 = 0x24;
    pub const MANUFACTURE_DATE: u8 = 0x25;
    pub const DEVICE_VERSION: u8 = 0x26;
    pub const LABEL_REVISION: u8 = 0x27;
    pub const PLATFORM_NAME: u8 = 0x28;
    pub const ONIE_VERSION: u8 = 0x29;
    pub const MAC_ADDRESSES: u8 = 0x2a;
    pub const MANUFACTURER: u8 = 0x2b;
    pub const COUNTRY_CODE: u8 = 0x2c;
    pub const VENDOR: u8 = 0x2d;
    pub const DIAG_VERSION: u8 = 0x2e;
    pub const SERVICE_TAG: u8 = 0x2f;
    pub const VENDOR_EXTENSION: u8 = 0xfd;
    pub const CRC_32: u8 = super::TLV_CODE_CRC_32;
}

/// Return a human-readable name for an ONIE type code.
pub const fn code_name(kind: u8) -> &'static str {
    match kind {
        code::PRODUCT_NAME => "Product Name",
        code::PART_NUMBER => "Part Number",
        code::SERIAL_NUMBER => "Serial Number",
        code::BASE_MAC => "Base MAC Address",
        code::MANUFACTURE_DATE => "Manufacture Date",
        code::DEVICE_VERSION => "Device Version",
        code::LABEL_REVISION => "Label Revision",
        code::PLATFORM_NAME => "Platform Name",
        code::ONIE_VERSION => "ONIE Version",
        code::MAC_ADDRESSES => "MAC Addresses",
        code::MANUFACTURER => "Manufacturer",
        code::COUNTRY_CODE => "Country Code",
        code::VENDOR => "Vendor Name",
        code::DIAG_VERSION => "Diag Version",
        code::SERVICE_TAG => "Service Tag",
        code::VENDOR_EXTENSION => "Vendor Extension",
        code::CRC_32 => "CRC-32",
        _ => "Unknown",
    }
}

/// A single `TlvInfo` entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TlvEntry {
    pub kind: u8,
    pub value: Vec<u8>,
}

impl fmt::Display for TlvEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            code::BASE_MAC if self.value.len() == 6 => {
                let v = &self.value;
                write!(
                    f,
                    "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                    v[0], v[1], v[2], v[3], v[4], v[5]
                )
            }
            code::MAC_ADDRESSES if self.value.len() == 2 => {
                write!(f, "{}", u16::from_be_bytes([self.value[0], self.value[1]]))
            }
            code::DEVICE_VERSION if self.value.len() == 1 => write!(f, "{}", self.value[0]),
            code::CRC_32 | code::VENDOR_EXTENSION => {
                write!(f, "0x")?;
                for b in &self.value {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
            _ => write!(f, "{}", String::from_utf8_lossy(&self.value)),
        }
    }
}

/// A decoded and CRC-checked ONIE `TlvInfo` EEPROM.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TlvInfo {
    pub version: u8,
    pub entries: Vec<TlvEntry>,
}

impl TlvInfo {
    /// Parse a `TlvInfo` image, verifying its CRC-32 trailer.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < TLV_INFO_HEADER_LEN {
            return Err(Error::Truncated {
                needed: TLV_INFO_HEADER_LEN,
                available: buf.len(),
            });
        }
        if &buf[..8] != TLV_INFO_SIGNATURE {
            return Err(Error::InvalidHeader("bad TlvInfo signature"));
        }
        let version = buf[8];
        if version != TLV_INFO_VERSION {
            return Err(Error::InvalidHeader("unsupported TlvInfo version"));
        }
        let total = usize::from(u16::from_be_bytes([buf[9], buf[10]]));
        let end = TLV_INFO_HEADER_LEN + total;
        let Some(body) = buf.get(TLV_INFO_HEADER_LEN..end) else {
            return Err(Error::Truncated {
                needed: end,
                available: buf.len(),
            });
        };

        let mut entries = Vec::new();
        let mut offset = TLV_INFO_HEADER_LEN;
        let mut iter = TlvEntries { data: body };
        for (kind, value) in &mut iter {
            if kind == TLV_CODE_CRC_32 {
                let Ok(bytes) = <[u8; 4]>::try_from(value) else {
                    return Err(Error::InvalidLength {
                        what: "CRC-32 entry",
                        len: value.len(),
                    });
                };
                let expected = u32::from_be_bytes(bytes);
                let actual = ONIE_CRC.checksum(&buf[..offset + 2]);
                if expected != actual {
                    return Err(Error::BadChecksum { expected, actual });
                }
                entries.push(TlvEntry {
                    kind,
                    value: value.to_vec(),
                });
                return Ok(Self { version, entries });
            }
            offset += 2 + value.len();
            entries.push(TlvEntry {
                kind,
                value: value.to_vec(),
            });
        }
        Err(Error::FieldNotFound(TLV_CODE_CRC_32))
    }

    /// Return the value of the first entry with the given type code.
    pub fn field(&self, kind: u8) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.value.as_slice())
    }
}

impl fmt::Display for TlvInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TlvInfo Header:")?;
        writeln!(f, "   Id String:    TlvInfo")?;
        writeln!(f, "   Version:      {}", self.version)?;
        for entry in &self.entries {
            writeln!(
                f,
                "{:<20} 0x{:02X} {:>3} {}",
                code_name(entry.kind),
                entry.kind,
                entry.value.len(),
                entry
            )?;
        }
        Ok(())
    }
}
