// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Power supplies.
//!
//! A PSU is observed two ways: through status bits the CPLD latches from its
//! presence, output, and alert pins, and through its own PMBus registers,
//! exposed as sensor records. Identity comes either from a FRU EEPROM or from
//! PMBus manufacturer registers.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_decode::pmbus::alarm;
use platform_decode::pmbus::fault_mask;
use platform_decode::pmbus::input_ok;
use platform_decode::pmbus::input_type;
use platform_decode::pmbus::output_ok;
use platform_decode::pmbus::HwStatus;
use platform_decode::utils::name_matches;
use platform_decode::utils::printable_string;
use platform_decode::FruArea;
use platform_messages::DevInfo;
use platform_messages::DevStatus;
use platform_messages::I2cDev;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::LedColor;
use platform_messages::MainDev;
use platform_messages::MinorDev;
use platform_messages::PsuCpldStatus;
use platform_messages::PsuSensor;
use slog::debug;
use std::path::Path;

/// Where PSU identity fields are read from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PsuFruMode {
    /// A FRU EEPROM on the PSU's I2C bus.
    Eeprom,
    /// PMBus `MFR_*` registers, exposed as sensor records.
    Pmbus,
}

// A resolved source of PSU identity fields.
enum PsuIdentity<'a> {
    Eeprom {
        dev: I2cDev,
        sysfs_name: Option<&'a str>,
    },
    Pmbus,
}

// Parse an integer with an optional `0x` prefix.
fn parse_word(s: &str) -> Result<u16, Error> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    value
        .ok()
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| Error::InvalidValue(format!("invalid status word '{s}'")))
}

impl<B: Bus> Platform<B> {
    /// Return the configured source of PSU identity, EEPROM unless set to
    /// PMBus.
    pub fn psu_fru_mode(&self) -> PsuFruMode {
        match self.registry.get_str(Key::new(Item::PsuFruMode, 0, 0)) {
            Some(mode) if name_matches(mode, "pmbus") => PsuFruMode::Pmbus,
            _ => PsuFruMode::Eeprom,
        }
    }

    /// Return a PSU status signal latched by the CPLD.
    pub fn psu_cpld_status(&self, psu: u32, status: PsuCpldStatus) -> Result<i32, Error> {
        self.get_int(Key::new(Item::PsuStatus, psu, status.into()), None)
    }

    /// Return 1 if the PSU is present, 0 if not.
    pub fn psu_present(&self, psu: u32) -> Result<i32, Error> {
        self.psu_cpld_status(psu, PsuCpldStatus::Present)
    }

    /// Return the PMBus `STATUS_WORD` as text, as read from the PSU.
    pub fn psu_pmbus_status(&self, psu: u32) -> Result<String, Error> {
        self.get_sensor(Key::new(Item::HwmonPsu, psu, PsuSensor::HwStatus.into()))
    }

    /// Return the PMBus `STATUS_WORD` of a PSU.
    pub fn psu_status_word(&self, psu: u32) -> Result<u16, Error> {
        parse_word(&self.psu_pmbus_status(psu)?)
    }

    /// Return the coarse health of a PSU.
    ///
    /// The status word is consulted only when the CPLD reports the output
    /// down or the alert pin asserted.
    pub fn psu_hw_status(&self, psu: u32) -> Result<HwStatus, Error> {
        if self.psu_present(psu)? == 0 {
            return Ok(HwStatus::Absent);
        }
        let output = self.psu_cpld_status(psu, PsuCpldStatus::Output)?;
        let alert = self.psu_cpld_status(psu, PsuCpldStatus::Alert)?;
        if output != 0 && alert != 0 {
            return Ok(HwStatus::Present);
        }
        let word = self.psu_status_word(psu)?;
        let status = HwStatus::from_status_word(word);
        debug!(
            self.unit_log("psu"),
            "PSU reports a problem";
            "psu" => psu,
            "output" => output,
            "alert" => alert,
            "status_word" => format!("{word:#06x}"),
            "status" => ?status,
        );
        Ok(status)
    }

    /// Return the bit mask of faults reported by a PSU.
    pub fn psu_fault_status(&self, psu: u32) -> Result<u8, Error> {
        if self.psu_present(psu)? == 0 {
            return Ok(fault_mask(false, 0));
        }
        Ok(fault_mask(true, self.psu_status_word(psu)?))
    }

    /// Return the colour of a PSU's status LED, derived from its health.
    pub fn psu_led_status(&self, psu: u32) -> Result<LedColor, Error> {
        if self.psu_present(psu)? == 0 {
            return Ok(LedColor::Off);
        }
        if self.psu_status_word(psu)? != 0 {
            Ok(LedColor::Yellow)
        } else {
            Ok(LedColor::Green)
        }
    }

    fn psu_pmbus_reg(&self, psu: u32, reg: PsuSensor) -> Result<i32, Error> {
        self.get_int(Key::new(Item::PsuPmbusReg, psu, reg.into()), None)
    }

    /// Return the raw PMBus status register of a PSU.
    pub fn psu_status_pmbus(&self, psu: u32) -> Result<i32, Error> {
        self.psu_pmbus_reg(psu, PsuSensor::None)
    }

    /// Return whether a PSU is delivering output power.
    pub fn psu_out_status(&self, psu: u32) -> Result<DevStatus, Error> {
        let word = self.psu_pmbus_reg(psu, PsuSensor::OutStatus)?;
        if output_ok(word as u16) {
            Ok(DevStatus::Ok)
        } else {
            Ok(DevStatus::NotOk)
        }
    }

    /// Return whether a PSU has input power.
    pub fn psu_in_status(&self, psu: u32) -> Result<DevStatus, Error> {
        let word = self.psu_pmbus_reg(psu, PsuSensor::InStatus)?;
        if input_ok(word as u16) {
            Ok(DevStatus::Ok)
        } else {
            Ok(DevStatus::NotOk)
        }
    }

    /// Return the alarm bits of a PSU, see
    /// [`ALARM_TEMP`](platform_messages::ALARM_TEMP) and friends.
    pub fn psu_alarm(&self, psu: u32) -> Result<u32, Error> {
        let word = self.psu_pmbus_reg(psu, PsuSensor::OutStatus)?;
        Ok(alarm(word as u16))
    }

    /// Return the input supply type of a PSU, 1 for AC and 0 for DC.
    pub fn psu_input_type(&self, psu: u32) -> Result<u8, Error> {
        let raw = self.psu_pmbus_reg(psu, PsuSensor::InType)?;
        let kind = input_type(raw).ok_or_else(|| {
            debug!(self.unit_log("psu"), "unknown input type"; "psu" => psu, "raw" => raw);
            Error::DevNotSupported
        })?;
        Ok(kind.sysfs_value())
    }

    /// Return the duty cycle of a PSU's fan.
    pub fn psu_fan_ratio(&self, psu: u32) -> Result<i32, Error> {
        self.psu_pmbus_reg(psu, PsuSensor::FanRatio)
    }

    /// Read a PMBus sensor or threshold of a PSU, as text.
    pub fn psu_sensor(&self, psu: u32, sensor: PsuSensor) -> Result<String, Error> {
        self.get_sensor(Key::new(Item::HwmonPsu, psu, sensor.into()))
    }

    fn psu_identity(&self, psu: u32) -> Result<PsuIdentity<'_>, Error> {
        match self.psu_fru_mode() {
            PsuFruMode::Pmbus => Ok(PsuIdentity::Pmbus),
            PsuFruMode::Eeprom => {
                let key = Key::new(Item::OtherI2cDev, MainDev::Psu.into(), psu);
                let dev = *self
                    .registry
                    .get_i2c_dev(key)
                    .ok_or(Error::DevNotSupported)?;
                let sysfs_name = self.registry.get_str(Key::new(Item::PsuSysfsName, 0, 0));
                Ok(PsuIdentity::Eeprom { dev, sysfs_name })
            }
        }
    }

    fn read_psu_identity(
        &self,
        psu: u32,
        source: &PsuIdentity<'_>,
        info: DevInfo,
    ) -> Result<String, Error> {
        match source {
            PsuIdentity::Pmbus => {
                let value = self.get_sensor(Key::new(Item::PsuFruPmbus, psu, info.into()))?;
                Ok(value.strip_suffix('\n').unwrap_or(&value).to_string())
            }
            PsuIdentity::Eeprom { dev, sysfs_name } => {
                self.fru_field(dev, *sysfs_name, FruArea::Product, info)
            }
        }
    }

    // Find the configured PSU type whose name prefix matches the part
    // number.
    fn psu_type_from(&self, psu: u32, source: &PsuIdentity<'_>) -> Result<u32, Error> {
        let part = self
            .read_psu_identity(psu, source, DevInfo::PartNumber)
            .map_err(|e| Error::DevFail(format!("PSU {psu} part number: {e}")))?;
        let part = printable_string(part.as_bytes());
        let n_types = self.dev_number(MainDev::Psu, MinorDev::Psu).unwrap_or(0);
        (0..n_types.max(0) as u32)
            .find(|t| {
                self.registry
                    .get_str(Key::new(Item::PowerName, *t, 0))
                    .is_some_and(|pattern| name_matches(&part, pattern))
            })
            .ok_or_else(|| Error::NoNode(format!("no PSU type matches '{part}'")))
    }

    /// Return the configured type of a PSU, found from its part number.
    pub fn psu_type(&self, psu: u32) -> Result<u32, Error> {
        let source = self.psu_identity(psu)?;
        self.psu_type_from(psu, &source)
    }

    /// Return an identity field of a PSU.
    ///
    /// The part name, fan direction, maximum output power, and fan speed
    /// formula are not stored on the PSU. They are looked up by PSU type.
    pub fn psu_info(&self, psu: u32, info: DevInfo) -> Result<String, Error> {
        let log = self.unit_log("psu");
        let source = self.psu_identity(psu)?;
        let decoded = match info {
            DevInfo::PartName
            | DevInfo::FanDirection
            | DevInfo::MaxOutputPower
            | DevInfo::SpeedCal => {
                let psu_type = self.psu_type_from(psu, &source).map_err(|e| {
                    debug!(log, "unknown PSU type"; "psu" => psu, "reason" => %e);
                    Error::DevFail(format!("PSU {psu} type unknown: {e}"))
                })?;
                Some((psu_type, info))
            }
            _ => None,
        };

        let Some((psu_type, info)) = decoded else {
            return self.read_psu_identity(psu, &source, info).map_err(|e| {
                debug!(log, "failed to read PSU identity"; "psu" => psu, "field" => %info, "reason" => %e);
                Error::DevFail(format!("PSU {psu} {info}: {e}"))
            });
        };
        let value = match info {
            DevInfo::PartName => self
                .registry
                .get_str(Key::new(Item::DecodePowerName, psu_type, 0))
                .map(String::from),
            DevInfo::FanDirection => self
                .registry
                .get_int(Key::new(Item::DecodePowerFanDir, psu_type, 0))
                .map(|x| x.to_string()),
            DevInfo::MaxOutputPower => self
                .registry
                .get_int(Key::new(Item::PowerRsupply, psu_type, 0))
                .map(|x| x.to_string()),
            _ => self
                .registry
                .get_str(Key::new(Item::FanSpeedCal, psu_type, 0))
                .map(String::from),
        };
        value.ok_or_else(|| {
            debug!(log, "PSU type has no decoded field"; "type" => psu_type, "field" => %info);
            Error::DevFail(format!("PSU type {psu_type} has no {info}"))
        })
    }

    // Read a dump file whose path is stored at `item`.
    fn psu_dump(&self, item: Item, psu: u32) -> Result<String, Error> {
        let path = self.config_str(Key::new(item, psu, 0))?;
        let mut buf = vec![0u8; self.config.max_rw_len];
        let n = self.file_read(Path::new(path), 0, &mut buf)?;
        buf.truncate(n);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Return the blackbox log of a PSU.
    pub fn psu_blackbox(&self, psu: u32) -> Result<String, Error> {
        self.psu_dump(Item::PsuBlackboxInfo, psu)
    }

    /// Return the PMBus register dump of a PSU.
    pub fn psu_pmbus_info(&self, psu: u32) -> Result<String, Error> {
        self.psu_dump(Item::PsuPmbusInfo, psu)
    }

    /// Clear the blackbox log of a PSU by writing `value`.
    pub fn clear_psu_blackbox(&self, psu: u32, value: u8) -> Result<(), Error> {
        let path = self.config_str(Key::new(Item::PsuClearBlackbox, psu, 0))?;
        self.file_write(Path::new(path), 0, value.to_string().as_bytes())?;
        debug!(self.unit_log("psu"), "cleared PSU blackbox"; "psu" => psu, "path" => path);
        Ok(())
    }
}
