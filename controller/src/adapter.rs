// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Device access built on the raw [`Bus`] transfers.
//!
//! This layer turns the addresses stored in configuration records into bus
//! transfers. It resolves how each CPLD is attached, finds I2C devices by
//! their descriptors, and retries SMBus transfers that fail.

use crate::config::RETRY_DELAY;
use crate::config::RETRY_TIMES;
use crate::Bus;
use crate::Error;
use crate::Platform;
use crate::SMBUS_BLOCK_MAX;
use platform_messages::CpldAddr;
use platform_messages::I2cDev;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::OtherI2cAddr;
use slog::debug;
use slog::error;
use slog::trace;
use slog::warn;
use std::path::Path;
use std::path::PathBuf;

/// How a CPLD is attached to the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CpldAccess {
    I2c,
    Lpc,
}

// Convert a register offset into an SMBus command byte.
fn smbus_offset(offset: u32) -> Result<u8, Error> {
    u8::try_from(offset)
        .map_err(|_| Error::InvalidValue(format!("SMBus offset 0x{offset:x} out of range")))
}

impl<B: Bus> Platform<B> {
    // Run a bus transfer, retrying failures a fixed number of times.
    fn retry<T>(&self, what: &str, mut f: impl FnMut() -> Result<T, Error>) -> Result<T, Error> {
        let mut attempt = 1;
        loop {
            match f() {
                Ok(x) => return Ok(x),
                Err(e) if attempt < RETRY_TIMES => {
                    warn!(
                        self.log,
                        "bus transfer failed, retrying";
                        "what" => what,
                        "attempt" => attempt,
                        "reason" => %e,
                    );
                    std::thread::sleep(RETRY_DELAY);
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        self.log,
                        "bus transfer failed";
                        "what" => what,
                        "attempts" => attempt,
                        "reason" => %e,
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Return how the CPLD at `(slot, id)` is attached.
    ///
    /// A missing or unrecognized mode is treated as I2C, which is reported
    /// once per CPLD.
    pub fn cpld_access(&self, slot: u8, id: u8) -> CpldAccess {
        let key = Key::new(Item::CpldMode, slot.into(), id.into());
        match self.registry.get_str(key) {
            Some(mode) if mode.starts_with("lpc") => CpldAccess::Lpc,
            Some(mode) if mode.starts_with("i2c") => CpldAccess::I2c,
            mode => {
                let first = self
                    .cpld_mode_warned
                    .lock()
                    .map(|mut warned| warned.insert((slot, id)))
                    .unwrap_or(false);
                if first {
                    warn!(
                        self.log,
                        "CPLD mode missing or unknown, using i2c";
                        "slot" => slot,
                        "id" => id,
                        "mode" => ?mode,
                    );
                }
                CpldAccess::I2c
            }
        }
    }

    fn cpld_i2c_dev(&self, slot: u8, id: u8) -> Result<I2cDev, Error> {
        let key = Key::new(Item::CpldI2cDev, slot.into(), id.into());
        self.registry.get_i2c_dev(key).copied().ok_or_else(|| {
            debug!(self.log, "no CPLD I2C descriptor"; "key" => %key);
            Error::DevNotSupported
        })
    }

    fn cpld_port(&self, slot: u8, id: u8, offset: u16) -> Result<u16, Error> {
        if !cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
            return Err(Error::DevNotSupported);
        }
        let key = Key::new(Item::CpldLpcDev, slot.into(), id.into());
        let base = self.config_int(key)?;
        u16::try_from(i64::from(base) + i64::from(offset))
            .map_err(|_| Error::InvalidValue(format!("LPC port {base:#x} + {offset:#x}")))
    }

    /// Read one byte from a CPLD register.
    pub fn cpld_read(&self, addr: u32) -> Result<u8, Error> {
        let CpldAddr { slot, id, offset } = CpldAddr::from(addr);
        let value = match self.cpld_access(slot, id) {
            CpldAccess::I2c => {
                let dev = self.cpld_i2c_dev(slot, id)?;
                let offset = smbus_offset(offset.into())?;
                self.retry("cpld read", || {
                    self.bus.smbus_read_byte(dev.bus, dev.addr, offset)
                })?
            }
            CpldAccess::Lpc => {
                let port = self.cpld_port(slot, id, offset)?;
                self.bus.port_read(port)?
            }
        };
        trace!(
            self.log,
            "cpld read";
            "addr" => format!("{addr:#010x}"),
            "value" => value,
        );
        Ok(value)
    }

    /// Write one byte to a CPLD register.
    pub fn cpld_write(&self, addr: u32, value: u8) -> Result<(), Error> {
        let CpldAddr { slot, id, offset } = CpldAddr::from(addr);
        match self.cpld_access(slot, id) {
            CpldAccess::I2c => {
                let dev = self.cpld_i2c_dev(slot, id)?;
                let offset = smbus_offset(offset.into())?;
                self.retry("cpld write", || {
                    self.bus.smbus_write_byte(dev.bus, dev.addr, offset, value)
                })?;
            }
            CpldAccess::Lpc => {
                let port = self.cpld_port(slot, id, offset)?;
                self.bus.port_write(port, value)?;
            }
        }
        trace!(
            self.log,
            "cpld write";
            "addr" => format!("{addr:#010x}"),
            "value" => value,
        );
        Ok(())
    }

    /// Return the path of a sysfs attribute of an I2C device.
    pub fn i2c_sysfs_path(&self, dev: &I2cDev, name: &str) -> PathBuf {
        self.config
            .i2c_sysfs_root
            .join(format!("{}-{:04x}", dev.bus, dev.addr))
            .join(name)
    }

    /// Read bytes from an I2C device, starting at `offset`.
    ///
    /// When `sysfs_name` is provided, the bytes are read through that
    /// attribute of the device's kernel driver, and fewer bytes than
    /// requested may be returned. Otherwise each byte is read with its own
    /// SMBus transfer, and the whole buffer is always filled.
    pub fn i2c_read(
        &self,
        dev: &I2cDev,
        offset: u32,
        buf: &mut [u8],
        sysfs_name: Option<&str>,
    ) -> Result<usize, Error> {
        if buf.is_empty() {
            return Err(Error::InvalidValue(String::from("empty I2C read")));
        }
        if let Some(name) = sysfs_name {
            let path = self.i2c_sysfs_path(dev, name);
            let n = self.file_read(&path, u64::from(offset), buf)?;
            if n == 0 {
                return Err(Error::DevFail(format!("{}: no data", path.display())));
            }
            return Ok(n);
        }
        for (i, byte) in buf.iter_mut().enumerate() {
            let reg = smbus_offset(offset + i as u32)?;
            *byte = self.retry("i2c read", || {
                self.bus.smbus_read_byte(dev.bus, dev.addr, reg)
            })?;
        }
        Ok(buf.len())
    }

    /// Write bytes to an I2C device, one SMBus transfer per byte.
    pub fn i2c_write(&self, dev: &I2cDev, offset: u32, data: &[u8]) -> Result<usize, Error> {
        if data.is_empty() {
            return Err(Error::InvalidValue(String::from("empty I2C write")));
        }
        for (i, byte) in data.iter().enumerate() {
            let reg = smbus_offset(offset + i as u32)?;
            self.retry("i2c write", || {
                self.bus.smbus_write_byte(dev.bus, dev.addr, reg, *byte)
            })?;
        }
        Ok(data.len())
    }

    /// Fill `buf` with a block read from an "other" I2C device.
    ///
    /// The device is named by the main id and index packed into `addr`.
    pub fn other_i2c_read(&self, addr: u32, buf: &mut [u8]) -> Result<(), Error> {
        let OtherI2cAddr {
            main_id,
            index,
            offset,
        } = OtherI2cAddr::from(addr);
        let key = Key::new(Item::OtherI2cDev, main_id.into(), index.into());
        let dev = self
            .registry
            .get_i2c_dev(key)
            .copied()
            .ok_or_else(|| Error::NodeFail(format!("no I2C descriptor at {key}")))?;

        let mut total = 0;
        while total < buf.len() {
            let want = (buf.len() - total).min(SMBUS_BLOCK_MAX);
            let reg = smbus_offset(u32::from(offset) + total as u32)?;
            let chunk = &mut buf[total..total + want];
            let n = self.retry("other i2c block read", || {
                self.bus.smbus_read_block(dev.bus, dev.addr, reg, chunk)
            })?;
            total += n;
            if n < want {
                break;
            }
        }
        if total < buf.len() {
            return Err(Error::DevFail(format!(
                "short block read from {}-{:02x}: {total} of {} bytes",
                dev.bus,
                dev.addr,
                buf.len()
            )));
        }
        Ok(())
    }

    /// Read from a file, at most the configured maximum in one read.
    pub fn file_read(&self, path: &Path, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Err(Error::InvalidValue(String::from("empty file read")));
        }
        let n = buf.len().min(self.config.max_rw_len);
        let n = self.bus.file_read(path, offset, &mut buf[..n])?;
        trace!(
            self.log,
            "file read";
            "path" => %path.display(),
            "offset" => offset,
            "len" => n,
        );
        Ok(n)
    }

    /// Write to a file, at most the configured maximum in one write.
    pub fn file_write(&self, path: &Path, offset: u64, data: &[u8]) -> Result<usize, Error> {
        if data.is_empty() {
            return Err(Error::InvalidValue(String::from("empty file write")));
        }
        let n = data.len().min(self.config.max_rw_len);
        let n = self.bus.file_write(path, offset, &data[..n])?;
        trace!(
            self.log,
            "file write";
            "path" => %path.display(),
            "offset" => offset,
            "len" => n,
        );
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::CpldAccess;
    use crate::bus::mock::Transfer;
    use crate::platform::tests::TestRegistry;
    use crate::Bus;
    use crate::Error;
    use platform_messages::I2cDev;
    use platform_messages::Item;

    #[test]
    fn test_cpld_mode_resolution() {
        let platform = TestRegistry::default()
            .str(Item::CpldMode, 0, 0, "i2c")
            .str(Item::CpldMode, 0, 1, "lpc")
            .str(Item::CpldMode, 0, 2, "spi")
            .build();
        assert_eq!(platform.cpld_access(0, 0), CpldAccess::I2c);
        assert_eq!(platform.cpld_access(0, 1), CpldAccess::Lpc);
        assert_eq!(platform.cpld_access(0, 2), CpldAccess::I2c);
        assert_eq!(platform.cpld_access(1, 0), CpldAccess::I2c);
        let warned = platform.cpld_mode_warned.lock().unwrap();
        assert!(warned.contains(&(0, 2)));
        assert!(warned.contains(&(1, 0)));
        assert!(!warned.contains(&(0, 0)));
    }

    #[test]
    fn test_cpld_i2c_read_write() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x33)
            .build();
        platform.bus().set_byte(2, 0x33, 0x20, 0x5a);
        assert_eq!(platform.cpld_read(0x0000_0020).unwrap(), 0x5a);
        platform.cpld_write(0x0000_0021, 0x99).unwrap();
        assert_eq!(
            platform.bus().writes(),
            vec![Transfer::Smbus {
                bus: 2,
                addr: 0x33,
                offset: 0x21,
                value: 0x99
            }]
        );
    }

    #[test]
    fn test_cpld_missing_descriptor_is_not_supported() {
        let platform = TestRegistry::default().build();
        assert!(platform
            .cpld_read(0x0001_0000)
            .unwrap_err()
            .is_not_supported());
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn test_cpld_lpc() {
        let platform = TestRegistry::default()
            .str(Item::CpldMode, 0, 1, "lpc")
            .int(Item::CpldLpcDev, 0, 1, 0x900)
            .build();
        platform.bus().set_port(0x910, 0x42);
        assert_eq!(platform.cpld_read(0x0001_0010).unwrap(), 0x42);
        platform.cpld_write(0x0001_0011, 7).unwrap();
        assert_eq!(platform.bus().port(0x911), Some(7));
    }

    #[test]
    fn test_retry_recovers_within_budget() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x33)
            .build();
        platform.bus().set_byte(2, 0x33, 0x01, 0x11);
        platform.bus().fail_next(4);
        assert_eq!(platform.cpld_read(0x0000_0001).unwrap(), 0x11);
        assert_eq!(platform.bus().transfers(), 5);

        platform.bus().fail_next(5);
        assert!(matches!(
            platform.cpld_read(0x0000_0001),
            Err(Error::DevFail(_))
        ));
        assert_eq!(platform.bus().transfers(), 10);
    }

    #[test]
    fn test_i2c_read_bytes_and_sysfs() {
        let dir = tempfile::tempdir().unwrap();
        let mut platform = TestRegistry::default().build();
        platform.config.i2c_sysfs_root = dir.path().to_path_buf();
        let dev = I2cDev { bus: 7, addr: 0x50 };

        platform.bus().set_bytes(7, 0x50, 4, &[1, 2, 3]);
        let mut buf = [0u8; 3];
        assert_eq!(platform.i2c_read(&dev, 4, &mut buf, None).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        let mut long = [0u8; 4];
        assert!(platform.i2c_read(&dev, 4, &mut long, None).is_err());

        let node = dir.path().join("7-0050");
        std::fs::create_dir(&node).unwrap();
        std::fs::write(node.join("eeprom"), b"abcdef").unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(
            platform.i2c_read(&dev, 2, &mut buf, Some("eeprom")).unwrap(),
            4
        );
        assert_eq!(&buf[..4], b"cdef");
        assert!(platform.i2c_read(&dev, 6, &mut buf, Some("eeprom")).is_err());

        platform.i2c_write(&dev, 0x10, &[9, 8]).unwrap();
        assert_eq!(platform.bus().byte(7, 0x50, 0x11), Some(8));
    }

    #[test]
    fn test_other_i2c_block_read() {
        let platform = TestRegistry::default()
            .i2c(Item::OtherI2cDev, 2, 1, 9, 0x58)
            .build();
        let data: Vec<u8> = (0..40).collect();
        platform.bus().set_bytes(9, 0x58, 0x10, &data);

        let mut buf = [0u8; 40];
        platform.other_i2c_read(0x0201_0010, &mut buf).unwrap();
        assert_eq!(buf.to_vec(), data);

        let mut buf = [0u8; 48];
        assert!(matches!(
            platform.other_i2c_read(0x0201_0010, &mut buf),
            Err(Error::DevFail(_))
        ));
        assert!(matches!(
            platform.other_i2c_read(0x0202_0010, &mut buf),
            Err(Error::NodeFail(_))
        ));
    }

    #[test]
    fn test_file_io_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"0123456789").unwrap();
        let mut platform = TestRegistry::default().build();
        platform.config.max_rw_len = 4;

        let mut buf = [0u8; 10];
        assert_eq!(platform.file_read(&path, 0, &mut buf).unwrap(), 4);
        assert_eq!(platform.file_write(&path, 0, b"abcdef").unwrap(), 4);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcd456789");
        assert!(platform.file_read(&path, 0, &mut []).is_err());
    }
}
