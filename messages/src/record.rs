// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The records stored in the registry.

use crate::Error;
use crate::RecordKind;
use crate::INFO_BUF_MAX_LEN;
use crate::INFO_FPATH_MAX_LEN;
use crate::INFO_INT_MAX_LEN;
use crate::INFO_STR_CONS_MAX_LEN;
use serde::Deserialize;
use serde::Serialize;

/// How an info-control record produces its value.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Mode {
    #[default]
    None = 0,
    /// Read from hardware and decode.
    Config = 1,
    /// Return `int_cons`.
    Constant = 2,
    /// The value lives in a TLV EEPROM and is decoded elsewhere.
    Tlv = 3,
    /// Return `str_cons`.
    StrConstant = 4,
}

/// Where the raw bytes of an info-control record come from.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Source {
    #[default]
    None = 0,
    Cpld = 1,
    Fpga = 2,
    OtherI2c = 3,
    File = 4,
}

/// How the raw bytes of an info-control record are interpreted.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Format {
    #[default]
    None = 0,
    /// A bit field within a single byte.
    Bit = 1,
    /// A multi-byte integer.
    Byte = 2,
    /// A multi-byte integer, read identically to `Byte`.
    NumBytes = 3,
    /// A base-10 decimal string.
    NumStr = 4,
    /// A buffer decoded by a caller-provided function.
    NumBuf = 5,
    /// A raw buffer.
    Buf = 6,
}

/// The polarity of a bit field, or the byte order of an integer.
///
/// For `Bit` records a negative polarity inverts the raw byte. For `Byte`
/// records, positive polarity is big-endian and negative is little-endian.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Polarity {
    #[default]
    None = 0,
    Positive = 1,
    Negative = 2,
}

/// A declarative description of how to produce one value.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct InfoCtrl {
    pub mode: Mode,
    pub int_cons: i32,
    pub src: Source,
    pub frmt: Format,
    pub pola: Polarity,
    pub fpath: String,
    /// Source-specific address.
    ///
    /// For CPLD and other-I2C sources this packs a device selector and an
    /// offset, see [`CpldAddr`] and [`OtherI2cAddr`]. For file sources it is
    /// the byte offset into the file.
    #[serde(deserialize_with = "de_addr")]
    pub addr: u32,
    pub len: usize,
    pub bit_offset: u8,
    pub str_cons: String,
    pub int_extra1: i32,
    pub int_extra2: i32,
    pub int_extra3: i32,
}

impl InfoCtrl {
    /// Check the bounded string fields.
    pub fn validate(&self) -> Result<(), Error> {
        if self.fpath.len() >= INFO_FPATH_MAX_LEN {
            return Err(Error::FieldTooLong {
                field: "fpath",
                len: self.fpath.len(),
                max: INFO_FPATH_MAX_LEN - 1,
            });
        }
        if self.str_cons.len() >= INFO_STR_CONS_MAX_LEN {
            return Err(Error::FieldTooLong {
                field: "str_cons",
                len: self.str_cons.len(),
                max: INFO_STR_CONS_MAX_LEN - 1,
            });
        }
        Ok(())
    }

    /// Return true if `len` is usable for an integer read.
    pub const fn int_len_valid(&self) -> bool {
        self.len > 0 && self.len < INFO_INT_MAX_LEN
    }

    /// Return true if `len` is usable for a buffer read.
    pub const fn buf_len_valid(&self) -> bool {
        self.len > 0 && self.len < INFO_BUF_MAX_LEN
    }

    /// Return true if `bit_offset` is within a byte.
    pub const fn bit_offset_valid(&self) -> bool {
        self.bit_offset < 8
    }
}

// Addresses are far easier to read in hex, so accept either a JSON number
// or a string such as `"0x0100_0010"`.
fn de_addr<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Addr {
        Num(u32),
        Str(String),
    }
    match Addr::deserialize(deserializer)? {
        Addr::Num(n) => Ok(n),
        Addr::Str(s) => parse_u32(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse an unsigned integer in decimal, or hex with a `0x` prefix.
///
/// Underscores are ignored.
pub fn parse_u32(s: &str) -> Result<u32, String> {
    let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
    let res = match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => cleaned.parse(),
    };
    res.map_err(|e| format!("invalid address '{s}': {e}"))
}

/// The location of an I2C device.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct I2cDev {
    pub bus: u32,
    pub addr: u16,
}

/// A CPLD register address, unpacked from an info-control `addr`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CpldAddr {
    pub slot: u8,
    pub id: u8,
    pub offset: u16,
}

impl From<u32> for CpldAddr {
    fn from(addr: u32) -> Self {
        Self {
            slot: ((addr >> 24) & 0xff) as u8,
            id: ((addr >> 16) & 0xff) as u8,
            offset: (addr & 0xffff) as u16,
        }
    }
}

impl From<CpldAddr> for u32 {
    fn from(a: CpldAddr) -> Self {
        (u32::from(a.slot) << 24) | (u32::from(a.id) << 16) | u32::from(a.offset)
    }
}

/// An address on an "other" I2C device, unpacked from an info-control
/// `addr`.
///
/// The main id and index select the device descriptor stored under
/// [`crate::Item::OtherI2cDev`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OtherI2cAddr {
    pub main_id: u8,
    pub index: u8,
    pub offset: u16,
}

impl From<u32> for OtherI2cAddr {
    fn from(addr: u32) -> Self {
        Self {
            main_id: ((addr >> 24) & 0xff) as u8,
            index: ((addr >> 16) & 0xff) as u8,
            offset: (addr & 0xffff) as u16,
        }
    }
}

/// A value stored in the registry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Int(i32),
    Str(String),
    I2cDev(I2cDev),
    Info(InfoCtrl),
}

impl Record {
    /// Return the shape of this record.
    pub const fn kind(&self) -> RecordKind {
        match self {
            Record::Int(_) => RecordKind::Int,
            Record::Str(_) => RecordKind::Str,
            Record::I2cDev(_) => RecordKind::I2cDev,
            Record::Info(_) => RecordKind::Info,
        }
    }
}
