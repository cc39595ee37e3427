// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Drivers for each kind of entity in a chassis.
//!
//! Every driver is a set of methods on [`Platform`], each of which reads or
//! writes one attribute of one entity. Drivers return typed values. Turning
//! them into text is the job of the [`surface`](crate::surface).

pub mod cpld;
pub mod eeprom;
pub mod fan;
pub mod fpga;
pub mod led;
pub mod psu;
pub mod sensor;
pub mod sff;
pub mod slot;
pub mod system;
pub mod watchdog;

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_decode::fru::COMMON_HEADER_LEN;
use platform_decode::FruArea;
use platform_decode::FruInfo;
use platform_messages::DevInfo;
use platform_messages::I2cDev;
use slog::debug;
use slog::Logger;

/// The largest identity string read from an EEPROM.
pub(crate) const INFO_STRING_MAX: usize = 256;

// Area offsets and lengths in a FRU image are in units of 8 bytes.
const FRU_AREA_UNIT: usize = 8;

/// Return the text of a C-style string buffer, up to its first NUL.
pub(crate) fn c_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl<B: Bus> Platform<B> {
    // Return a logger for one driver.
    pub(crate) fn unit_log(&self, unit: &'static str) -> Logger {
        self.log.new(slog::o!("unit" => unit))
    }

    /// Read and decode the FRU image of an I2C EEPROM.
    ///
    /// The common header is read first, and then just enough of the image to
    /// cover the Board and Product Info areas it points at.
    pub fn read_fru(&self, dev: &I2cDev, sysfs_name: Option<&str>) -> Result<FruInfo, Error> {
        let mut header = [0u8; COMMON_HEADER_LEN];
        self.i2c_read(dev, 0, &mut header, sysfs_name)?;

        // Bytes 3 and 4 locate the Board and Product Info areas. The second
        // byte of each area holds its length.
        let mut end = COMMON_HEADER_LEN;
        for offset in [header[3], header[4]] {
            if offset == 0 {
                continue;
            }
            let start = usize::from(offset) * FRU_AREA_UNIT;
            let mut area_header = [0u8; 2];
            self.i2c_read(dev, start as u32, &mut area_header, sysfs_name)?;
            end = end.max(start + usize::from(area_header[1]) * FRU_AREA_UNIT);
        }

        let mut image = vec![0u8; end];
        let n = self.i2c_read(dev, 0, &mut image, sysfs_name)?;
        image.truncate(n);
        let fru = FruInfo::parse(&image)?;
        debug!(
            self.log,
            "read FRU image";
            "bus" => dev.bus,
            "addr" => dev.addr,
            "len" => n,
        );
        Ok(fru)
    }

    // Read one identity field from the FRU image of an I2C EEPROM.
    pub(crate) fn fru_field(
        &self,
        dev: &I2cDev,
        sysfs_name: Option<&str>,
        area: FruArea,
        info: DevInfo,
    ) -> Result<String, Error> {
        let fru = self.read_fru(dev, sysfs_name)?;
        fru.field(area, info)
            .map(String::from)
            .ok_or_else(|| Error::Type(format!("FRU has no {area:?} field {info}")))
    }
}
