// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! System control sequences.
//!
//! A system control, such as a board power cycle or a transceiver power
//! domain, is driven by a configured sequence of register writes. Writing
//! value `v` to a control of type `t` runs the sequence stored under
//! `t | v`. Each step may be guarded by a precondition, which skips the step
//! when it does not hold, and followed by a postcondition, which is polled
//! until it holds.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::PortPower;
use slog::debug;
use slog::info;
use slog::warn;
use std::time::Duration;

// Pause for a configured number of microseconds, if any.
fn step_delay(us: i32) {
    if let Ok(us) = u64::try_from(us) {
        if us > 0 {
            std::thread::sleep(Duration::from_micros(us));
        }
    }
}

impl<B: Bus> Platform<B> {
    // Return the number of steps in the sequence for `type_detail`.
    fn system_cmd_count(&self, type_detail: u32) -> Result<u32, Error> {
        match self
            .registry
            .get_int(Key::new(Item::BmcSystemCmdNum, type_detail, 0))
        {
            Some(n) if n > 0 => Ok(n as u32),
            _ => {
                debug!(
                    self.unit_log("system"),
                    "no command sequence";
                    "type" => format!("{type_detail:#x}"),
                );
                Err(Error::DevNotSupported)
            }
        }
    }

    // Poll the postcondition of one step, if it has one.
    fn system_check_step(&self, type_detail: u32, step: u32) -> Result<(), Error> {
        let key = Key::new(Item::CheckValBmcSystem, type_detail, step);
        let Some(check) = self.registry.get_info(key) else {
            return Ok(());
        };
        let attempts = check.int_extra2.max(1);
        let mut last = None;
        for attempt in 1..=attempts {
            let value = self.get_int(key, None)?;
            if value == check.int_extra1 {
                return Ok(());
            }
            debug!(
                self.unit_log("system"),
                "postcondition not met";
                "key" => %key,
                "value" => value,
                "expected" => check.int_extra1,
                "attempt" => attempt,
            );
            last = Some(value);
            step_delay(check.int_extra3);
        }
        Err(Error::CheckFail(format!(
            "{key}: read {:?}, expected {}",
            last, check.int_extra1
        )))
    }

    /// Read a system control, decoded through its status table if one is
    /// configured.
    pub fn system_value(&self, sys_type: u32) -> Result<i32, Error> {
        let value = self.get_int(Key::new(Item::BmcSystem, sys_type, 0), None)?;
        let decode_key = Key::new(Item::SystemStatusDecode, sys_type, value as u32);
        Ok(self.registry.get_int(decode_key).unwrap_or(value))
    }

    /// Run the sequence that sets a system control to `value`.
    pub fn set_system_value(&self, sys_type: u32, value: i32) -> Result<(), Error> {
        let type_detail = sys_type | (value as u32 & 0xff);
        let count = self.system_cmd_count(type_detail)?;
        let log = self.unit_log("system");
        for step in 0..count {
            let pre_key = Key::new(Item::PreCheckBmcSystem, type_detail, step);
            if let Some(pre) = self.registry.get_info(pre_key) {
                let current = self.get_int(pre_key, None)?;
                if current != pre.int_extra1 {
                    debug!(
                        log,
                        "precondition not met, skipping step";
                        "type" => format!("{type_detail:#x}"),
                        "step" => step,
                        "value" => current,
                        "expected" => pre.int_extra1,
                    );
                    continue;
                }
            }

            let key = Key::new(Item::BmcSystem, type_detail, step);
            let cmd = self.registry.get_info(key).ok_or_else(|| {
                warn!(log, "missing command step"; "key" => %key);
                Error::DevNotSupported
            })?;
            self.set_int(key, cmd.int_cons)?;
            step_delay(cmd.int_extra1);
            self.system_check_step(type_detail, step)?;
        }
        info!(
            log,
            "ran system command sequence";
            "type" => format!("{sys_type:#x}"),
            "value" => value,
            "steps" => count,
        );
        Ok(())
    }

    /// Return the power state of a transceiver power domain.
    ///
    /// The domain is on when any of its sequence's postconditions fails to
    /// hold.
    pub fn port_power_status(&self, sys_type: u32) -> Result<PortPower, Error> {
        let count = self.system_cmd_count(sys_type)?;
        for step in 0..count {
            match self.system_check_step(sys_type, step) {
                Ok(()) => {}
                Err(Error::CheckFail(_)) => return Ok(PortPower::On),
                Err(e) => return Err(e),
            }
        }
        Ok(PortPower::Off)
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
    use platform_messages::PortPower;
    use platform_messages::Source;

    fn constant(value: i32, expected: i32) -> InfoCtrl {
        InfoCtrl {
            mode: Mode::Constant,
            int_cons: value,
            int_extra1: expected,
            ..Default::default()
        }
    }

    fn cpld_write(addr: u32, value: i32) -> InfoCtrl {
        InfoCtrl {
            mode: Mode::Config,
            src: Source::Cpld,
            frmt: Format::Byte,
            pola: Polarity::Positive,
            addr,
            len: 1,
            int_cons: value,
            ..Default::default()
        }
    }

    #[test]
    fn test_set_system_value_runs_steps() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x0d)
            .int(Item::BmcSystemCmdNum, 0x101, 0, 3)
            .info(Item::PreCheckBmcSystem, 0x101, 0, constant(0, 1))
            .info(Item::BmcSystem, 0x101, 0, cpld_write(0x30, 0xee))
            .info(Item::BmcSystem, 0x101, 1, cpld_write(0x40, 0x5a))
            .info(Item::CheckValBmcSystem, 0x101, 1, constant(1, 1))
            .info(Item::PreCheckBmcSystem, 0x101, 2, constant(1, 1))
            .info(Item::BmcSystem, 0x101, 2, cpld_write(0x41, 0x01))
            .build();

        platform.set_system_value(0x100, 1).unwrap();
        assert_eq!(
            platform.bus().writes(),
            vec![
                Transfer::Smbus {
                    bus: 2,
                    addr: 0x0d,
                    offset: 0x40,
                    value: 0x5a,
                },
                Transfer::Smbus {
                    bus: 2,
                    addr: 0x0d,
                    offset: 0x41,
                    value: 0x01,
                },
            ]
        );

        assert!(platform
            .set_system_value(0x100, 2)
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn test_set_system_value_failures() {
        let check = InfoCtrl {
            int_extra2: 3,
            ..constant(0, 1)
        };
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x0d)
            .int(Item::BmcSystemCmdNum, 0x201, 0, 1)
            .info(Item::BmcSystem, 0x201, 0, cpld_write(0x30, 1))
            .info(Item::CheckValBmcSystem, 0x201, 0, check)
            .int(Item::BmcSystemCmdNum, 0x202, 0, 2)
            .info(Item::BmcSystem, 0x202, 0, cpld_write(0x31, 1))
            .int(Item::BmcSystemCmdNum, 0x203, 0, 0)
            .build();

        assert!(matches!(
            platform.set_system_value(0x200, 1),
            Err(Error::CheckFail(_))
        ));
        // The second step is missing.
        assert!(platform
            .set_system_value(0x200, 2)
            .unwrap_err()
            .is_not_supported());
        assert_eq!(platform.bus().writes().len(), 2);
        assert!(platform
            .set_system_value(0x200, 3)
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn test_system_value_decode() {
        let status = InfoCtrl {
            mode: Mode::Config,
            src: Source::Cpld,
            frmt: Format::Byte,
            pola: Polarity::Positive,
            addr: 0x50,
            len: 1,
            ..Default::default()
        };
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x0d)
            .info(Item::BmcSystem, 0x300, 0, status)
            .int(Item::SystemStatusDecode, 0x300, 0x03, 1)
            .build();

        platform.bus().set_byte(2, 0x0d, 0x50, 0x03);
        assert_eq!(platform.system_value(0x300).unwrap(), 1);
        platform.bus().set_byte(2, 0x0d, 0x50, 0x07);
        assert_eq!(platform.system_value(0x300).unwrap(), 7);
        assert!(platform.system_value(0x400).unwrap_err().is_not_supported());
    }

    #[test]
    fn test_port_power_status() {
        let platform = TestRegistry::default()
            .int(Item::BmcSystemCmdNum, 0x500, 0, 2)
            .info(Item::CheckValBmcSystem, 0x500, 0, constant(1, 1))
            .info(Item::CheckValBmcSystem, 0x500, 1, constant(1, 1))
            .int(Item::BmcSystemCmdNum, 0x600, 0, 2)
            .info(Item::CheckValBmcSystem, 0x600, 0, constant(1, 1))
            .info(Item::CheckValBmcSystem, 0x600, 1, constant(0, 1))
            .build();

        assert_eq!(platform.port_power_status(0x500).unwrap(), PortPower::Off);
        assert_eq!(platform.port_power_status(0x600).unwrap(), PortPower::On);
        assert!(platform
            .port_power_status(0x700)
            .unwrap_err()
            .is_not_supported());
    }
}
