// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! EEPROMs exposed as files, including the system EEPROM.
//!
//! EEPROMs are keyed by the main device they describe and an index. The
//! system EEPROM is EEPROM 0 of the main board.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_decode::TlvInfo;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::MainDev;
use platform_messages::MinorDev;
use slog::debug;
use std::path::Path;

// Validate a caller's offset and transfer length.
fn check_transfer(offset: i64, len: usize) -> Result<u64, Error> {
    if len == 0 {
        return Err(Error::InvalidValue(String::from("empty EEPROM transfer")));
    }
    u64::try_from(offset).map_err(|_| Error::InvalidValue(format!("EEPROM offset {offset}")))
}

impl<B: Bus> Platform<B> {
    /// Return the number of EEPROMs on the main board.
    pub fn board_eeprom_count(&self) -> Result<i32, Error> {
        self.dev_number(MainDev::Mainboard, MinorDev::Eeprom)
    }

    /// Return the size of an EEPROM in bytes.
    pub fn eeprom_size(&self, e2_type: MainDev, index: u32) -> Result<i32, Error> {
        self.config_int(Key::new(Item::EepromSize, e2_type.into(), index))
    }

    pub fn eeprom_alias(&self, e2_type: MainDev, index: u32) -> Result<&str, Error> {
        self.config_str(Key::new(Item::EepromAlias, e2_type.into(), index))
    }

    pub fn eeprom_tag(&self, e2_type: MainDev, index: u32) -> Result<&str, Error> {
        self.config_str(Key::new(Item::EepromTag, e2_type.into(), index))
    }

    pub fn eeprom_type(&self, e2_type: MainDev, index: u32) -> Result<&str, Error> {
        self.config_str(Key::new(Item::EepromType, e2_type.into(), index))
    }

    fn eeprom_path(&self, e2_type: MainDev, index: u32) -> Result<&Path, Error> {
        self.config_str(Key::new(Item::EepromPath, e2_type.into(), index))
            .map(Path::new)
    }

    /// Read EEPROM contents at `offset`, returning the number of bytes read.
    pub fn read_eeprom(
        &self,
        e2_type: MainDev,
        index: u32,
        offset: i64,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        let offset = check_transfer(offset, buf.len())?;
        let path = self.eeprom_path(e2_type, index)?;
        buf.fill(0);
        let n = self.file_read(path, offset, buf).inspect_err(|e| {
            debug!(
                self.unit_log("eeprom"),
                "failed to read EEPROM";
                "path" => %path.display(),
                "offset" => offset,
                "reason" => %e,
            );
        })?;
        Ok(n)
    }

    /// Write EEPROM contents at `offset`, returning the number of bytes
    /// written.
    pub fn write_eeprom(
        &self,
        e2_type: MainDev,
        index: u32,
        offset: i64,
        data: &[u8],
    ) -> Result<usize, Error> {
        let offset = check_transfer(offset, data.len())?;
        let path = self.eeprom_path(e2_type, index)?;
        let n = self.file_write(path, offset, data)?;
        debug!(
            self.unit_log("eeprom"),
            "wrote EEPROM";
            "path" => %path.display(),
            "offset" => offset,
            "len" => n,
        );
        Ok(n)
    }

    pub fn syseeprom_size(&self) -> Result<i32, Error> {
        self.eeprom_size(MainDev::Mainboard, 0)
    }

    pub fn read_syseeprom(&self, offset: i64, buf: &mut [u8]) -> Result<usize, Error> {
        self.read_eeprom(MainDev::Mainboard, 0, offset, buf)
    }

    pub fn write_syseeprom(&self, offset: i64, data: &[u8]) -> Result<usize, Error> {
        self.write_eeprom(MainDev::Mainboard, 0, offset, data)
    }

    /// Read and decode the whole system EEPROM as an ONIE `TlvInfo` image.
    pub fn syseeprom_info(&self) -> Result<TlvInfo, Error> {
        let size = usize::try_from(self.syseeprom_size()?)
            .map_err(|_| Error::Type(String::from("negative system EEPROM size")))?;
        let mut image = vec![0u8; size];
        let n = self.read_syseeprom(0, &mut image)?;
        image.truncate(n);
        Ok(TlvInfo::parse(&image)?)
    }
}
