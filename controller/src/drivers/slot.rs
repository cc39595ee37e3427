// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Line card slots.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_decode::FruArea;
use platform_messages::DevInfo;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::MainDev;
use slog::debug;

impl<B: Bus> Platform<B> {
    /// Return 1 if a card is present in the slot, 0 if not.
    pub fn slot_status(&self, slot: u32) -> Result<i32, Error> {
        self.get_int(
            Key::new(Item::DevPresentStatus, MainDev::Slot.into(), slot),
            None,
        )
    }

    /// Return an identity field from the Board Info area of a card's FRU.
    pub fn slot_info(&self, slot: u32, info: DevInfo) -> Result<String, Error> {
        let key = Key::new(Item::OtherI2cDev, MainDev::Slot.into(), slot);
        let dev = *self
            .registry
            .get_i2c_dev(key)
            .ok_or(Error::DevNotSupported)?;
        let sysfs_name = self.registry.get_str(Key::new(Item::SlotSysfsName, 0, 0));
        self.fru_field(&dev, sysfs_name, FruArea::Board, info)
            .map_err(|e| {
                debug!(
                    self.unit_log("slot"),
                    "failed to read slot EEPROM";
                    "slot" => slot,
                    "field" => %info,
                    "reason" => %e,
                );
                Error::DevFail(format!("slot {slot} {info}: {e}"))
            })
    }

    /// Return the power state of a slot.
    pub fn slot_power_status(&self, slot: u32) -> Result<i32, Error> {
        self.get_int(Key::new(Item::PowerStatus, MainDev::Slot.into(), slot), None)
    }

    pub fn set_slot_power_status(&self, slot: u32, value: i32) -> Result<(), Error> {
        self.set_int(Key::new(Item::PowerStatus, MainDev::Slot.into(), slot), value)
    }
}
