// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Errors returned by the platform controller.

use platform_decode::Error as DecodeError;
use platform_messages::Error as MessageError;
use thiserror::Error;

/// An error accessing or interpreting platform hardware.
///
/// Each variant corresponds to one of the result codes exposed through the
/// attribute surface, see [`Error::code`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Initialization failed: {0}")]
    Init(String),

    #[error("Invalid slot {0}")]
    SlotInvalid(u32),

    #[error("Invalid mode: {0}")]
    ModeInvalid(String),

    #[error("Mode not supported")]
    ModeNotSupported,

    #[error("Record type error: {0}")]
    Type(String),

    #[error("Device not supported")]
    DevNotSupported,

    #[error("Device failure: {0}")]
    DevFail(String),

    #[error("Invalid index")]
    IndexInvalid,

    #[error("No interface")]
    NoInterface,

    #[error("No such node: {0}")]
    NoNode(String),

    #[error("Node failure: {0}")]
    NodeFail(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Out of memory")]
    NoMemory,

    #[error("Check failed: {0}")]
    CheckFail(String),

    #[error("Decode error")]
    Decode(#[from] DecodeError),

    #[error("Schema error")]
    Schema(#[from] MessageError),
}

impl Error {
    pub const INIT_ERR: i32 = 1;
    pub const SLOT_INVALID: i32 = 2;
    pub const MODE_INVALID: i32 = 3;
    pub const MODE_NOTSUPPORT: i32 = 4;
    pub const TYPE_ERR: i32 = 5;
    pub const DEV_NOTSUPPORT: i32 = 6;
    pub const DEV_FAIL: i32 = 7;
    pub const INDEX_INVALID: i32 = 8;
    pub const NO_INTF: i32 = 9;
    pub const NO_NODE: i32 = 10;
    pub const NODE_FAIL: i32 = 11;
    pub const INVALID_VALUE: i32 = 12;
    pub const NO_MEMORY: i32 = 13;
    pub const CHECK_FAIL: i32 = 14;

    /// Return the negative result code for this error.
    pub fn code(&self) -> i32 {
        let code = match self {
            Error::Init(_) => Self::INIT_ERR,
            Error::SlotInvalid(_) => Self::SLOT_INVALID,
            Error::ModeInvalid(_) => Self::MODE_INVALID,
            Error::ModeNotSupported => Self::MODE_NOTSUPPORT,
            Error::Type(_) => Self::TYPE_ERR,
            Error::DevNotSupported => Self::DEV_NOTSUPPORT,
            Error::DevFail(_) => Self::DEV_FAIL,
            Error::IndexInvalid => Self::INDEX_INVALID,
            Error::NoInterface => Self::NO_INTF,
            Error::NoNode(_) => Self::NO_NODE,
            Error::NodeFail(_) => Self::NODE_FAIL,
            Error::InvalidValue(_) => Self::INVALID_VALUE,
            Error::NoMemory => Self::NO_MEMORY,
            Error::CheckFail(_) => Self::CHECK_FAIL,
            Error::Decode(e) => match e {
                DecodeError::BadChecksum { .. } => Self::CHECK_FAIL,
                DecodeError::InvalidNumber(_) | DecodeError::OutOfRange(_) => Self::INVALID_VALUE,
                _ => Self::TYPE_ERR,
            },
            Error::Schema(_) => Self::TYPE_ERR,
        };
        -code
    }

    /// Return true if the error means the attribute is not supported on
    /// this platform, rather than that accessing it failed.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::DevNotSupported)
    }

    pub(crate) fn io(what: impl std::fmt::Display, e: std::io::Error) -> Self {
        Error::DevFail(format!("{what}: {e}"))
    }
}
