// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Convert raw CPLD sensor registers into physical units.
//!
//! Temperatures are produced in millidegrees Celsius, voltages in the units
//! implied by the configured coefficient (usually millivolts).

use crate::Error;
use platform_messages::SensorFormat;

/// The lowest plausible temperature, in degrees Celsius.
pub const VALID_TEMP_MIN: i64 = -40;

/// The highest plausible temperature, in degrees Celsius.
pub const VALID_TEMP_MAX: i64 = 120;

/// The value reported in place of an implausible temperature.
pub const TEMP_INVALID: i64 = -99_999_999;

/// Decode a PMBus LINEAR11 word, scaled by 1000.
///
/// The top 5 bits are a signed exponent and the low 11 bits a signed
/// mantissa. Power readings are scaled by a further 1000.
pub fn linear11(data: i32, is_power: bool) -> i64 {
    let exponent = (data as i16) >> 11;
    let mantissa = ((((data & 0x7ff) << 5) as i16) >> 5) as i64;
    let mut val = mantissa * 1000;
    if is_power {
        val *= 1000;
    }
    if exponent >= 0 {
        val << exponent
    } else {
        val >> -exponent
    }
}

/// Decode a TMP464 temperature register into millidegrees.
pub fn tmp464(data: i32) -> i64 {
    if data >= 0 {
        i64::from(data) * 625 / 80
    } else {
        // Only the magnitude bits survive.
        let magnitude = i64::from((!(data & 0x7ff)).wrapping_add(1) as i16);
        magnitude * 625 / 80
    }
}

/// Decode a Tomahawk 5 on-die thermal sensor into millidegrees.
pub fn mac_th5(data: i32) -> i64 {
    let code = i64::from(data >> 4);
    476_359 - ((code - 2) * 317_704) / 2000
}

/// Decode a Tomahawk 4 on-die thermal sensor into millidegrees.
pub fn mac_th4(data: i32) -> i64 {
    let code = i64::from(data >> 4);
    356_070 - ((code - 2) * 237_340) / 2000
}

/// Convert a raw CPLD temperature register using the configured format
/// selector, and apply the plausibility guard.
///
/// Unknown selectors and `LINEAR16` pass the raw value through.
pub fn cpld_temperature(data: i32, selector: i32, is_power: bool) -> i64 {
    let format = u8::try_from(selector)
        .ok()
        .and_then(|s| SensorFormat::try_from(s).ok());
    let val = match format {
        Some(SensorFormat::Linear11) => linear11(data, is_power),
        Some(SensorFormat::Tmp464) => tmp464(data),
        Some(SensorFormat::MacTh5) => mac_th5(data),
        Some(SensorFormat::MacTh4) => mac_th4(data),
        Some(SensorFormat::Linear16) | None => i64::from(data),
    };
    guard_temperature(val)
}

/// Replace a millidegree reading outside the plausible range with
/// [`TEMP_INVALID`].
pub const fn guard_temperature(millideg: i64) -> i64 {
    let deg = millideg / 1000;
    if deg < VALID_TEMP_MIN || deg > VALID_TEMP_MAX {
        TEMP_INVALID
    } else {
        millideg
    }
}

/// The way a CPLD encodes an ADC voltage reading.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoltageCoding {
    /// A 12-bit code in bits `[15:4]`, normalized against a reference.
    Mode1,
    /// The high byte and the low nibble form a 12-bit code.
    Mode2,
}

impl VoltageCoding {
    /// Select the coding from the record's mode selector.
    pub const fn from_selector(selector: i32) -> Self {
        if selector == 1 {
            VoltageCoding::Mode2
        } else {
            VoltageCoding::Mode1
        }
    }

    /// Extract the ADC code from a raw register value.
    pub const fn code(&self, raw: u32) -> u32 {
        match self {
            VoltageCoding::Mode1 => (raw >> 4) & 0xfff,
            VoltageCoding::Mode2 => ((raw & 0xff00) >> 4) + (raw & 0xf),
        }
    }
}

/// Convert a mode 2 code into a voltage with coefficient `k`.
pub const fn voltage_mode2(code: u32, k: u32) -> u32 {
    ((code as u64 * 33 * k as u64) / 40950) as u32
}

/// Convert a mode 1 code that is itself the reference channel.
pub const fn voltage_mode1_reference(code: u32, k: u32) -> u32 {
    ((code as u64 * 16 * 33 * k as u64) / ((65536 - 5000) * 10)) as u32
}

/// Convert a mode 1 code, normalized by the raw reference channel reading.
pub fn voltage_mode1_normalized(code: u32, reference_raw: u32, k: u32) -> Result<u32, Error> {
    let reference = VoltageCoding::Mode1.code(reference_raw);
    if reference == 0 {
        return Err(Error::OutOfRange(0));
    }
    Ok(((u64::from(code) * u64::from(k)) / u64::from(reference)) as u32)
}
