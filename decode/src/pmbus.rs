// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Status derived from a PSU's PMBus `STATUS_WORD`.

use platform_messages::pmbus::StatusWord;
use platform_messages::PsuInputType;
use platform_messages::ALARM_FAN;
use platform_messages::ALARM_TEMP;
use platform_messages::ALARM_VOLTAGE;

/// The coarse health of a PSU.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum HwStatus {
    Present = 0x00,
    Absent = 0x01,
    Fail = 0x02,
    Warn = 0x04,
}

impl HwStatus {
    /// Classify a PSU whose CPLD reports an output or alert problem.
    ///
    /// A negated power-good signal is a failure, anything else is a warning.
    pub fn from_status_word(word: u16) -> Self {
        if StatusWord::from_bits_retain(word).contains(StatusWord::POWER_GOOD) {
            HwStatus::Fail
        } else {
            HwStatus::Warn
        }
    }

    pub const fn code(&self) -> u8 {
        *self as u8
    }
}

/// Bits of the PSU fault mask.
pub mod fault {
    pub const ABSENT: u8 = 0x01;
    pub const OFF: u8 = 0x02;
    pub const FANS: u8 = 0x04;
    pub const VOUT_OV: u8 = 0x08;
    pub const IOUT_OC: u8 = 0x10;
    pub const INPUT: u8 = 0x20;
    pub const TEMPERATURE: u8 = 0x40;
}

/// Build the PSU fault mask from presence and the status word.
pub fn fault_mask(present: bool, word: u16) -> u8 {
    if !present {
        return fault::ABSENT;
    }
    let word = StatusWord::from_bits_retain(word);
    [
        (StatusWord::OFF, fault::OFF),
        (StatusWord::FANS, fault::FANS),
        (StatusWord::VOUT_OV, fault::VOUT_OV),
        (StatusWord::IOUT_OC, fault::IOUT_OC),
        (StatusWord::INPUT | StatusWord::VIN_UV, fault::INPUT),
        (StatusWord::TEMPERATURE, fault::TEMPERATURE),
    ]
    .into_iter()
    .filter(|(bits, _)| word.intersects(*bits))
    .fold(0, |mask, (_, bit)| mask | bit)
}

/// Build the alarm byte from the status word.
pub fn alarm(word: u16) -> u32 {
    let word = StatusWord::from_bits_retain(word);
    let mut alarm = 0;
    if word.contains(StatusWord::TEMPERATURE) {
        alarm |= ALARM_TEMP;
    }
    if word.contains(StatusWord::FANS) {
        alarm |= ALARM_FAN;
    }
    if word.intersects(StatusWord::VOLTAGE_ERR) {
        alarm |= ALARM_VOLTAGE;
    }
    alarm
}

/// Return true if the status word shows output power being delivered.
pub fn output_ok(word: u16) -> bool {
    !StatusWord::from_bits_retain(word).intersects(StatusWord::OUTPUT_NOT_OK)
}

/// Return true if the status word shows input power present.
pub fn input_ok(word: u16) -> bool {
    !StatusWord::from_bits_retain(word).contains(StatusWord::INPUT)
}

/// Decode the PMBus input type register.
pub fn input_type(raw: i32) -> Option<PsuInputType> {
    u8::try_from(raw)
        .ok()
        .and_then(|r| PsuInputType::try_from(r).ok())
}
