// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Fan tachometer, PWM, and threshold-key arithmetic.

use crate::Error;

/// The tachometer clock, divided by the raw count to get RPM.
pub const TACH_CLOCK: u32 = 15_000_000;

/// The full-scale fan ratio register value.
pub const RATIO_MAX: u32 = 255;

/// The largest accepted PWM percentage.
pub const PWM_MAX: u32 = 100;

/// Threshold selector for the minimum speed.
pub const THRESHOLD_MIN: u8 = 0x01;

/// Threshold selector for the maximum speed.
pub const THRESHOLD_MAX: u8 = 0x02;

/// Threshold selector for the speed tolerance, in percent.
pub const THRESHOLD_TOLERANCE: u8 = 0x03;

/// Threshold selector for the target speed at 0% PWM. Each 10% step adds 1.
pub const THRESHOLD_TARGET_0: u8 = 0x10;

/// Threshold selector for the target speed at 100% PWM.
pub const THRESHOLD_TARGET_100: u8 = 0x1a;

/// Convert a raw tachometer reading into RPM.
///
/// A raw value of 0 or `0xffff` means the tachometer saw no pulses. Some fans
/// report pulses per interval instead, selected by `linear120`, and their
/// speed is the raw count times 120.
pub const fn rpm_from_tach(raw: u32, linear120: bool) -> u32 {
    if linear120 {
        return raw.saturating_mul(120);
    }
    if raw == 0 || raw == 0xffff {
        0
    } else {
        TACH_CLOCK / raw
    }
}

/// Convert a PWM percentage into a fan ratio register value.
pub fn level_from_pwm(pwm: u32) -> Result<u8, Error> {
    if pwm > PWM_MAX {
        return Err(Error::OutOfRange(i64::from(pwm)));
    }
    Ok((pwm * RATIO_MAX / PWM_MAX) as u8)
}

/// Convert a fan ratio register value into a PWM percentage, rounding up.
pub const fn pwm_from_level(level: u8) -> u32 {
    let scaled = level as u32 * PWM_MAX;
    let pwm = scaled / RATIO_MAX;
    if scaled % RATIO_MAX > 0 {
        pwm + 1
    } else {
        pwm
    }
}

/// Return the threshold selector for the target speed at a PWM percentage.
pub const fn target_selector(pwm: u32) -> u8 {
    let step = if pwm > PWM_MAX { PWM_MAX } else { pwm } / 10;
    THRESHOLD_TARGET_0 + step as u8
}

/// Build the first index of a fan threshold key.
pub const fn threshold_index1(selector: u8, main_dev: u8) -> u32 {
    ((selector as u32) << 8) | main_dev as u32
}

/// Build the second index of a fan threshold key.
pub const fn threshold_index2(fan_type: u8, motor: u8) -> u32 {
    (((fan_type & 0xf) as u32) << 4) | (motor & 0xf) as u32
}

/// Apply a percentage tolerance to a target speed.
pub const fn tolerance(target: i32, percent: i32) -> i32 {
    ((target as i64 * percent as i64) / 100) as i32
}
