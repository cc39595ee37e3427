// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! FPGA identity and scratch register.
//!
//! FPGA registers are reached through a file, usually a PCIe resource or a
//! character device exported by the FPGA's own driver.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_decode::raw::encode_int;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::MainDev;
use slog::debug;
use std::path::Path;

// Scratch registers are at most 32 bits wide.
const FPGA_REG_WIDTH_MAX: usize = 4;

impl<B: Bus> Platform<B> {
    pub fn fpga_name(&self, main_dev: MainDev, index: u32) -> Result<&str, Error> {
        self.config_str(Key::new(Item::FpgaName, main_dev.into(), index))
    }

    /// Return the type of an FPGA.
    ///
    /// When no type is configured, it is decoded from the FPGA's model
    /// register.
    pub fn fpga_type(&self, main_dev: MainDev, index: u32) -> Result<String, Error> {
        if let Some(fpga_type) = self
            .registry
            .get_str(Key::new(Item::FpgaType, main_dev.into(), index))
        {
            return Ok(String::from(fpga_type));
        }
        let model = self.get_int(Key::new(Item::FpgaModelReg, main_dev.into(), index), None)?;
        let decoded = self
            .registry
            .get_str(Key::new(Item::FpgaModelDecode, model as u32, 0))
            .ok_or_else(|| {
                debug!(
                    self.unit_log("fpga"),
                    "unknown FPGA model";
                    "index" => index,
                    "model" => format!("{model:#010x}"),
                );
                Error::DevNotSupported
            })?;
        Ok(String::from(decoded))
    }

    pub fn fpga_fw_version(&self, main_dev: MainDev, index: u32) -> Result<u32, Error> {
        let key = Key::new(Item::FpgaVersion, main_dev.into(), index);
        Ok(self.get_int(key, None)? as u32)
    }

    /// FPGAs do not report a hardware version.
    pub fn fpga_hw_version(&self, _main_dev: MainDev, _index: u32) -> Result<u32, Error> {
        Err(Error::DevNotSupported)
    }

    /// Read the FPGA scratch register.
    pub fn fpga_testreg(&self, main_dev: MainDev, index: u32) -> Result<u32, Error> {
        let key = Key::new(Item::FpgaTestReg, main_dev.into(), index);
        Ok(self.get_int(key, None)? as u32)
    }

    /// Write the FPGA scratch register.
    ///
    /// The value is laid out over the register width in the byte order
    /// given by the record's polarity, and written to the record's file.
    pub fn set_fpga_testreg(&self, main_dev: MainDev, index: u32, value: u32) -> Result<(), Error> {
        let key = Key::new(Item::FpgaTestReg, main_dev.into(), index);
        let info = self.registry.get_info(key).ok_or(Error::DevNotSupported)?;
        if info.len > FPGA_REG_WIDTH_MAX {
            return Err(Error::InvalidValue(format!(
                "FPGA register width {} unsupported",
                info.len
            )));
        }
        let data = encode_int(value, info.len, info.pola)
            .map_err(|e| Error::InvalidValue(e.to_string()))?;
        debug!(
            self.unit_log("fpga"),
            "writing test register";
            "path" => &info.fpath,
            "addr" => info.addr,
            "len" => info.len,
            "value" => format!("{value:#x}"),
        );
        self.file_write(Path::new(&info.fpath), u64::from(info.addr), &data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::platform::tests::TestRegistry;
    use crate::Error;
    use platform_messages::Format;
    use platform_messages::InfoCtrl;
    use platform_messages::Item;
    use platform_messages::MainDev;
    use platform_messages::Mode;
    use platform_messages::Polarity;
    use platform_messages::Source;
    use std::path::Path;

    fn reg(path: &Path, addr: u32, pola: Polarity) -> InfoCtrl {
        InfoCtrl {
            mode: Mode::Config,
            src: Source::File,
            frmt: Format::Byte,
            pola,
            fpath: path.display().to_string(),
            addr,
            len: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_fpga_type_from_model() {
        let dir = tempfile::tempdir().unwrap();
        let resource = dir.path().join("resource0");
        std::fs::write(&resource, [0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x07]).unwrap();
        let platform = TestRegistry::default()
            .str(Item::FpgaName, 0, 0, "MAC_FPGA")
            .str(Item::FpgaType, 0, 1, "XC7A50T")
            .info(Item::FpgaModelReg, 0, 0, reg(&resource, 0, Polarity::Positive))
            .info(Item::FpgaModelReg, 0, 2, reg(&resource, 4, Polarity::Positive))
            .str(Item::FpgaModelDecode, 3, 0, "XC7A100T")
            .build();

        assert_eq!(platform.fpga_name(MainDev::Mainboard, 0).unwrap(), "MAC_FPGA");
        assert_eq!(platform.fpga_type(MainDev::Mainboard, 0).unwrap(), "XC7A100T");
        assert_eq!(platform.fpga_type(MainDev::Mainboard, 1).unwrap(), "XC7A50T");
        assert!(platform
            .fpga_type(MainDev::Mainboard, 2)
            .unwrap_err()
            .is_not_supported());
        assert!(platform
            .fpga_hw_version(MainDev::Mainboard, 0)
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn test_fpga_testreg_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let resource = dir.path().join("resource0");
        std::fs::write(&resource, [0u8; 16]).unwrap();
        let platform = TestRegistry::default()
            .info(Item::FpgaTestReg, 0, 0, reg(&resource, 8, Polarity::Positive))
            .info(Item::FpgaTestReg, 0, 1, reg(&resource, 12, Polarity::Negative))
            .info(Item::FpgaVersion, 0, 0, reg(&resource, 8, Polarity::Positive))
            .build();

        platform
            .set_fpga_testreg(MainDev::Mainboard, 0, 0x1234_5678)
            .unwrap();
        assert_eq!(
            platform.fpga_testreg(MainDev::Mainboard, 0).unwrap(),
            0x1234_5678
        );
        assert_eq!(
            platform.fpga_fw_version(MainDev::Mainboard, 0).unwrap(),
            0x1234_5678
        );
        platform.set_fpga_testreg(MainDev::Mainboard, 1, 0xa5).unwrap();
        assert_eq!(platform.fpga_testreg(MainDev::Mainboard, 1).unwrap(), 0xa5);

        let image = std::fs::read(&resource).unwrap();
        assert_eq!(&image[8..12], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(&image[12..16], &[0xa5, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_fpga_testreg_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let resource = dir.path().join("resource0");
        std::fs::write(&resource, [0u8; 8]).unwrap();
        let platform = TestRegistry::default()
            .info(
                Item::FpgaTestReg,
                0,
                0,
                InfoCtrl {
                    len: 8,
                    ..reg(&resource, 0, Polarity::Positive)
                },
            )
            .info(Item::FpgaTestReg, 0, 1, reg(&resource, 0, Polarity::None))
            .build();

        assert!(matches!(
            platform.set_fpga_testreg(MainDev::Mainboard, 0, 1),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(
            platform.set_fpga_testreg(MainDev::Mainboard, 1, 1),
            Err(Error::InvalidValue(_))
        ));
        assert!(platform
            .set_fpga_testreg(MainDev::Mainboard, 2, 1)
            .unwrap_err()
            .is_not_supported());
    }
}
