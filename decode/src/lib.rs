// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Decode raw register contents, sensor readings, and EEPROM images.
//!
//! Everything in this crate operates on bytes that have already been read
//! from hardware. Nothing here performs I/O.

use platform_messages::Error as MessageError;
use thiserror::Error;

pub mod fan;
pub mod fru;
pub mod hwmon;
pub mod pmbus;
pub mod raw;
pub mod sensor;
pub mod tlv;
pub mod utils;

pub use fru::FruArea;
pub use fru::FruInfo;
pub use hwmon::HwmonScale;
pub use tlv::TlvInfo;

/// An error decoding hardware data.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("Bit index out of range")]
    BitOutOfRange,

    #[error("Invalid bit field value")]
    InvalidBitField,

    #[error("Invalid length {len} for {what}")]
    InvalidLength { what: &'static str, len: usize },

    #[error("Data truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Invalid number: '{0}'")]
    InvalidNumber(String),

    #[error("Value {0} is out of range")]
    OutOfRange(i64),

    #[error("Unsupported polarity for this operation")]
    UnsupportedPolarity,

    #[error("Invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("Field 0x{0:02x} not found")]
    FieldNotFound(u8),

    #[error("Checksum mismatch: expected 0x{expected:08x}, computed 0x{actual:08x}")]
    BadChecksum { expected: u32, actual: u32 },

    #[error("Schema error")]
    Schema(#[from] MessageError),
}
