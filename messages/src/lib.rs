// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The schema shared between the platform configuration database and the
//! drivers that consume it.
//!
//! A chassis is described by a large set of records, each stored under a
//! [`Key`]. A key names an [`Item`] and two small indices. The range an item
//! falls in determines which [`Record`] shape it holds: an integer, a string,
//! an I2C device descriptor, or an [`InfoCtrl`] describing how to fetch and
//! decode a value from hardware.

pub mod entity;
pub mod item;
pub mod key;
pub mod pmbus;
pub mod record;

pub use entity::*;
pub use item::Item;
pub use item::RecordKind;
pub use key::Key;
pub use record::CpldAddr;
pub use record::Format;
pub use record::I2cDev;
pub use record::InfoCtrl;
pub use record::Mode;
pub use record::OtherI2cAddr;
pub use record::Polarity;
pub use record::Record;
pub use record::Source;

/// The maximum number of raw bytes an integer-valued record may read.
///
/// Valid lengths are in `(0, INFO_INT_MAX_LEN)`.
pub const INFO_INT_MAX_LEN: usize = 32;

/// The maximum number of raw bytes a buffer-valued record may read.
///
/// Valid lengths are in `(0, INFO_BUF_MAX_LEN)`.
pub const INFO_BUF_MAX_LEN: usize = 128;

/// The maximum length of the file path of a `FILE`-sourced record.
pub const INFO_FPATH_MAX_LEN: usize = 128;

/// The maximum length of a string constant.
pub const INFO_STR_CONS_MAX_LEN: usize = 64;

/// An error describing a malformed schema element.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// The numeric item id is not part of the enumeration, or is a range
    /// sentinel.
    #[error("Unknown item id: {0}")]
    UnknownItem(u16),

    /// No item has the provided name.
    #[error("Unknown item name: '{0}'")]
    UnknownItemName(String),

    /// A record's shape does not match the range its item belongs to.
    #[error("Item '{item}' holds {expected:?} records, found {found:?}")]
    ShapeMismatch {
        item: &'static str,
        expected: RecordKind,
        found: RecordKind,
    },

    /// A string field exceeds its maximum length.
    #[error("Field '{field}' is {len} bytes, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A numeric value does not correspond to any variant of an enumeration.
    #[error("Invalid value for {what}: {value}")]
    InvalidValue { what: &'static str, value: i64 },
}
