// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Sideband signals of transceiver ports.
//!
//! Ports are numbered from 1. Port 0 addresses every port at once, for the
//! signals whose CPLD has a chassis-wide control.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::MainDev;
use platform_messages::MinorDev;
use platform_messages::SffAttr;
use slog::debug;

// Optoe types are stored as a single ASCII digit.
const OPTOE_TYPE_MAX: i32 = 9;

impl<B: Bus> Platform<B> {
    /// Return the number of transceiver ports.
    pub fn port_count(&self) -> Result<u32, Error> {
        match self.dev_number(MainDev::Sff, MinorDev::None) {
            Ok(n) if n > 0 => Ok(n as u32),
            Ok(n) => Err(Error::DevFail(format!("invalid port count {n}"))),
            Err(e) => Err(Error::DevFail(format!("no port count: {e}"))),
        }
    }

    /// Read a sideband signal of a port.
    pub fn sff_cpld_info(&self, port: u32, attr: SffAttr) -> Result<i32, Error> {
        self.get_int(Key::new(Item::SffCpldReg, port, attr.into()), None)
    }

    /// Drive a sideband signal of a port, which must be 0 or 1.
    pub fn set_sff_cpld_info(&self, port: u32, attr: SffAttr, value: i32) -> Result<(), Error> {
        if value != 0 && value != 1 {
            return Err(Error::InvalidValue(format!("{attr} value {value}")));
        }
        self.set_int(Key::new(Item::SffCpldReg, port, attr.into()), value)?;
        debug!(
            self.unit_log("sff"),
            "set port signal";
            "port" => port,
            "attr" => %attr,
            "value" => value,
        );
        Ok(())
    }

    /// Return the optoe driver type of a port.
    pub fn optoe_type(&self, port: u32) -> Result<i32, Error> {
        let raw = self.get_int(Key::new(Item::SffOptoeType, port, 0), None)?;
        Ok(raw - i32::from(b'0'))
    }

    /// Set the optoe driver type of a port, in `0..=9`.
    pub fn set_optoe_type(&self, port: u32, optoe_type: i32) -> Result<(), Error> {
        if !(0..=OPTOE_TYPE_MAX).contains(&optoe_type) {
            return Err(Error::InvalidValue(format!("optoe type {optoe_type}")));
        }
        self.set_int(
            Key::new(Item::SffOptoeType, port, 0),
            i32::from(b'0') + optoe_type,
        )
    }

    // Read one signal of every port, one digit per port.
    fn sff_all(&self, attr: SffAttr) -> Result<String, Error> {
        let n = self.port_count()?;
        (1..=n)
            .map(|port| {
                self.sff_cpld_info(port, attr).inspect_err(|e| {
                    debug!(
                        self.unit_log("sff"),
                        "failed to read port signal";
                        "port" => port,
                        "attr" => %attr,
                        "reason" => %e,
                    );
                })
            })
            .map(|value| value.map(|v| v.to_string()))
            .collect()
    }

    /// Return the presence of every port, one digit per port.
    pub fn transceiver_present_status(&self) -> Result<String, Error> {
        self.sff_all(SffAttr::ModulePresent)
    }

    /// Return the power state of every port, one digit per port.
    pub fn transceiver_power_on_status(&self) -> Result<String, Error> {
        self.sff_all(SffAttr::PowerOn)
    }

    /// Power every port on or off at once.
    pub fn set_transceiver_power_on_status(&self, value: i32) -> Result<(), Error> {
        self.set_sff_cpld_info(0, SffAttr::PowerOn, value)
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::mock::Transfer;
    use crate::platform::tests::TestRegistry;
    use crate::Error;
    use platform_messages::Format;
    use platform_messages::InfoCtrl;
    use platform_messages::Item;
    use platform_messages::Mode;
    use platform_messages::Polarity;
    use platform_messages::SffAttr;
    use platform_messages::Source;

    fn constant(value: i32) -> InfoCtrl {
        InfoCtrl {
            mode: Mode::Constant,
            int_cons: value,
            ..Default::default()
        }
    }

    fn cpld(addr: u32, frmt: Format, bit_offset: u8) -> InfoCtrl {
        InfoCtrl {
            mode: Mode::Config,
            src: Source::Cpld,
            frmt,
            pola: Polarity::Positive,
            addr,
            len: 1,
            bit_offset,
            ..Default::default()
        }
    }

    #[test]
    fn test_present_status_of_every_port() {
        let mut reg = TestRegistry::default().int(Item::DevNum, 3, 0, 32);
        for port in 1..=32 {
            let present = i32::from(port % 2 == 0);
            reg = reg.info(Item::SffCpldReg, port, 8, constant(present));
        }
        let platform = reg.build();
        assert_eq!(
            platform.transceiver_present_status().unwrap(),
            "01010101010101010101010101010101"
        );
    }

    #[test]
    fn test_aggregate_failures() {
        let platform = TestRegistry::default()
            .int(Item::DevNum, 3, 0, 2)
            .info(Item::SffCpldReg, 1, 1, constant(1))
            .build();
        assert!(platform
            .transceiver_power_on_status()
            .unwrap_err()
            .is_not_supported());

        // A failing port's error is returned as is.
        let platform = TestRegistry::default()
            .int(Item::DevNum, 3, 0, 2)
            .info(Item::SffCpldReg, 1, 8, constant(1))
            .info(Item::SffCpldReg, 2, 8, cpld(0x30, Format::Bit, 9))
            .build();
        assert!(matches!(
            platform.transceiver_present_status(),
            Err(Error::Type(_))
        ));

        let platform = TestRegistry::default().int(Item::DevNum, 3, 0, 0).build();
        assert!(matches!(
            platform.transceiver_present_status(),
            Err(Error::DevFail(_))
        ));
        let platform = TestRegistry::default().build();
        assert!(matches!(platform.port_count(), Err(Error::DevFail(_))));
    }

    #[test]
    fn test_port_signals() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 1, 3, 0x30)
            .info(Item::SffCpldReg, 5, 6, cpld(0x0001_0010, Format::Bit, 4))
            .info(Item::SffCpldReg, 0, 1, cpld(0x0001_0020, Format::Byte, 0))
            .build();
        platform.bus().set_byte(3, 0x30, 0x10, 0x0f);

        assert_eq!(platform.sff_cpld_info(5, SffAttr::Reset).unwrap(), 0);
        platform.set_sff_cpld_info(5, SffAttr::Reset, 1).unwrap();
        assert_eq!(platform.bus().byte(3, 0x30, 0x10), Some(0x1f));
        assert_eq!(platform.sff_cpld_info(5, SffAttr::Reset).unwrap(), 1);
        assert!(matches!(
            platform.set_sff_cpld_info(5, SffAttr::Reset, 2),
            Err(Error::InvalidValue(_))
        ));
        assert!(platform
            .set_sff_cpld_info(5, SffAttr::TxDis, 1)
            .unwrap_err()
            .is_not_supported());

        platform.set_transceiver_power_on_status(1).unwrap();
        assert_eq!(
            platform.bus().writes().last(),
            Some(&Transfer::Smbus {
                bus: 3,
                addr: 0x30,
                offset: 0x20,
                value: 1,
            })
        );
    }

    #[test]
    fn test_optoe_type_round_trip() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x33)
            .info(Item::SffOptoeType, 1, 0, cpld(0x50, Format::Byte, 0))
            .build();
        for n in 0..=9 {
            platform.set_optoe_type(1, n).unwrap();
            assert_eq!(platform.bus().byte(2, 0x33, 0x50), Some(b'0' + n as u8));
            assert_eq!(platform.optoe_type(1).unwrap(), n);
        }
        for n in [-1, 10] {
            assert!(matches!(
                platform.set_optoe_type(1, n),
                Err(Error::InvalidValue(_))
            ));
        }
    }
}
