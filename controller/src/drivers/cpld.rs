// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! CPLD identity and scratch register.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::MainDev;
use slog::debug;

impl<B: Bus> Platform<B> {
    pub fn cpld_name(&self, main_dev: MainDev, index: u32) -> Result<&str, Error> {
        self.config_str(Key::new(Item::CpldName, main_dev.into(), index))
    }

    pub fn cpld_type(&self, main_dev: MainDev, index: u32) -> Result<&str, Error> {
        self.config_str(Key::new(Item::CpldType, main_dev.into(), index))
    }

    pub fn cpld_fw_version(&self, main_dev: MainDev, index: u32) -> Result<u32, Error> {
        let key = Key::new(Item::CpldVersion, main_dev.into(), index);
        Ok(self.get_int(key, None)? as u32)
    }

    pub fn cpld_hw_version(&self, main_dev: MainDev, index: u32) -> Result<u32, Error> {
        let key = Key::new(Item::CpldHwVersion, main_dev.into(), index);
        Ok(self.get_int(key, None)? as u32)
    }

    /// Read the CPLD scratch register.
    pub fn cpld_testreg(&self, main_dev: MainDev, index: u32) -> Result<i32, Error> {
        self.get_int(Key::new(Item::CpldTestReg, main_dev.into(), index), None)
    }

    /// Write the CPLD scratch register, which holds a single byte.
    pub fn set_cpld_testreg(&self, main_dev: MainDev, index: u32, value: i32) -> Result<(), Error> {
        if !(0..=0xff).contains(&value) {
            return Err(Error::InvalidValue(format!(
                "CPLD test register value {value:#x}"
            )));
        }
        self.set_int(Key::new(Item::CpldTestReg, main_dev.into(), index), value)?;
        debug!(
            self.unit_log("cpld"),
            "wrote test register";
            "main_dev" => %main_dev,
            "index" => index,
            "value" => value,
        );
        Ok(())
    }
}
