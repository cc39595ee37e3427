// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Indicator LEDs.
//!
//! Each LED has a raw register value, and a per-LED table mapping raw values
//! to the colours in [`LedColor`](platform_messages::LedColor).

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::Led;
use slog::debug;

// Raw LED values are a single register byte.
const LED_RAW_MAX: i32 = 0xff;

impl<B: Bus> Platform<B> {
    /// Return the colour shown by an LED.
    pub fn led_status(&self, led: Led, index: u32) -> Result<i32, Error> {
        let raw = self.get_int(Key::new(Item::LedStatus, led.into(), index), None)?;
        if !(0..=LED_RAW_MAX).contains(&raw) {
            return Err(Error::DevFail(format!("{led} raw value {raw} out of range")));
        }
        let decode = Key::new(Item::LedStatusDecode, led.into(), raw as u32);
        let color = self.registry.get_int(decode).ok_or_else(|| {
            Error::DevFail(format!("{led} raw value 0x{raw:02x} has no colour"))
        })?;
        debug!(
            self.unit_log("led"),
            "read LED";
            "led" => %led,
            "index" => index,
            "raw" => raw,
            "color" => color,
        );
        Ok(color)
    }

    /// Show a colour on an LED.
    ///
    /// The raw value written is the first whose decoded colour matches.
    pub fn set_led_status(&self, led: Led, index: u32, color: i32) -> Result<(), Error> {
        let key = Key::new(Item::LedStatus, led.into(), index);
        if self.registry.get_info(key).is_none() {
            return Err(Error::DevNotSupported);
        }
        if !(0..=LED_RAW_MAX).contains(&color) {
            return Err(Error::InvalidValue(format!("LED colour {color} out of range")));
        }
        let raw = (0..=LED_RAW_MAX)
            .find(|raw| {
                let decode = Key::new(Item::LedStatusDecode, led.into(), *raw as u32);
                self.registry.get_int(decode) == Some(color)
            })
            .ok_or_else(|| Error::InvalidValue(format!("{led} cannot show colour {color}")))?;
        self.set_int(key, raw)?;
        debug!(
            self.unit_log("led"),
            "set LED";
            "led" => %led,
            "index" => index,
            "raw" => raw,
            "color" => color,
        );
        Ok(())
    }
}
