// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Fan modules: presence, motors, speed, PWM, identity, and thresholds.

use super::c_string;
use super::INFO_STRING_MAX;
use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_decode::fan::level_from_pwm;
use platform_decode::fan::pwm_from_level;
use platform_decode::fan::rpm_from_tach;
use platform_decode::fan::target_selector;
use platform_decode::fan::threshold_index1;
use platform_decode::fan::threshold_index2;
use platform_decode::fan::tolerance;
use platform_decode::fan::THRESHOLD_MAX;
use platform_decode::fan::THRESHOLD_MIN;
use platform_decode::fan::THRESHOLD_TOLERANCE;
use platform_decode::tlv::find_field;
use platform_decode::tlv::FanTlvHeader;
use platform_decode::tlv::FAN_TLV_HEADER_LEN;
use platform_decode::utils::name_matches;
use platform_decode::utils::printable_string;
use platform_decode::FruArea;
use platform_messages::DevInfo;
use platform_messages::DevStatus;
use platform_messages::I2cDev;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::MainDev;
use platform_messages::MinorDev;
use platform_messages::FAN_SPEED_LINEAR120;
use slog::debug;
use slog::warn;

/// The layout of a fan module's identity EEPROM.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FanEepromMode {
    /// A short header followed by `(type, len, value)` entries.
    Tlv,
    /// An IPMI FRU image.
    Fru,
}

impl<B: Bus> Platform<B> {
    /// Return 1 if the fan module is present, 0 if not.
    pub fn fan_present(&self, fan: u32) -> Result<i32, Error> {
        self.get_int(
            Key::new(Item::DevPresentStatus, MainDev::Fan.into(), fan),
            None,
        )
    }

    /// Return 1 if a fan motor is turning, 0 if it is stalled.
    pub fn fan_motor_status(&self, fan: u32, motor: u32) -> Result<i32, Error> {
        self.get_int(Key::new(Item::FanRollStatus, fan, motor), None)
    }

    /// Return the health of a fan module.
    ///
    /// A present module is healthy only if every one of its motors turns.
    pub fn fan_status(&self, fan: u32) -> Result<DevStatus, Error> {
        let log = self.unit_log("fan");
        if self.fan_present(fan)? == 0 {
            debug!(log, "fan absent"; "fan" => fan);
            return Ok(DevStatus::Absent);
        }
        let motors = self.dev_number(MainDev::Fan, MinorDev::Motor)?;
        if motors <= 0 {
            return Err(Error::DevFail(format!("invalid motor count {motors}")));
        }
        for motor in 1..=motors as u32 {
            if self.fan_motor_status(fan, motor)? == 0 {
                debug!(log, "fan motor stalled"; "fan" => fan, "motor" => motor);
                return Ok(DevStatus::NotOk);
            }
        }
        Ok(DevStatus::Ok)
    }

    /// Return the speed of a fan motor in RPM.
    pub fn fan_speed(&self, fan: u32, motor: u32) -> Result<u32, Error> {
        let key = Key::new(Item::FanSpeed, fan, motor);
        let raw = self.get_int(key, None)?;
        let linear120 = self
            .registry
            .get_info(key)
            .is_some_and(|info| info.int_extra1 == FAN_SPEED_LINEAR120);
        Ok(rpm_from_tach(raw as u32, linear120))
    }

    /// Set the duty cycle of a fan module, in percent.
    pub fn set_fan_pwm(&self, fan: u32, pwm: i32) -> Result<(), Error> {
        let level = u32::try_from(pwm)
            .ok()
            .and_then(|p| level_from_pwm(p).ok())
            .ok_or_else(|| Error::InvalidValue(format!("fan PWM {pwm} out of range")))?;
        self.set_int(Key::new(Item::FanRatio, fan, 0), i32::from(level))?;
        debug!(
            self.unit_log("fan"),
            "set fan PWM";
            "fan" => fan,
            "pwm" => pwm,
            "level" => level,
        );
        Ok(())
    }

    /// Return the duty cycle of a fan module, in percent.
    pub fn fan_pwm(&self, fan: u32) -> Result<u32, Error> {
        let raw = self.get_int(Key::new(Item::FanRatio, fan, 0), None)?;
        let level = u8::try_from(raw)
            .map_err(|_| Error::DevFail(format!("fan ratio {raw} out of range")))?;
        Ok(pwm_from_level(level))
    }

    /// Return the configured layout of fan EEPROMs, TLV unless set to FRU.
    pub fn fan_eeprom_mode(&self) -> FanEepromMode {
        match self.registry.get_str(Key::new(Item::FanE2Mode, 0, 0)) {
            Some(mode) if name_matches(mode, "fru") => FanEepromMode::Fru,
            _ => FanEepromMode::Tlv,
        }
    }

    // Read one entry from the TLV area of a fan EEPROM.
    fn fan_tlv_field(
        &self,
        dev: &I2cDev,
        sysfs_name: Option<&str>,
        info: DevInfo,
    ) -> Result<String, Error> {
        let mut header = [0u8; FAN_TLV_HEADER_LEN];
        self.i2c_read(dev, 0, &mut header, sysfs_name)?;
        let header = FanTlvHeader::parse(&header)?;
        let mut data = vec![0u8; header.tlv_len];
        let n = self.i2c_read(dev, FAN_TLV_HEADER_LEN as u32, &mut data, sysfs_name)?;
        data.truncate(n);
        let mut out = [0u8; INFO_STRING_MAX];
        let len = find_field(&data, info.as_u8(), &mut out)?;
        Ok(c_string(&out[..len]))
    }

    // Read an identity field exactly as stored in the fan EEPROM.
    fn fan_raw_info(&self, fan: u32, info: DevInfo) -> Result<String, Error> {
        let key = Key::new(Item::OtherI2cDev, MainDev::Fan.into(), fan);
        let dev = *self
            .registry
            .get_i2c_dev(key)
            .ok_or(Error::DevNotSupported)?;
        let sysfs_name = self.registry.get_str(Key::new(Item::FanSysfsName, 0, 0));

        let res = match self.fan_eeprom_mode() {
            FanEepromMode::Tlv => {
                if info == DevInfo::PartNumber {
                    return Err(Error::DevNotSupported);
                }
                self.fan_tlv_field(&dev, sysfs_name, info)
            }
            FanEepromMode::Fru => {
                let area = if info == DevInfo::Vendor {
                    FruArea::Board
                } else {
                    FruArea::Product
                };
                self.fru_field(&dev, sysfs_name, area, info)
            }
        };
        res.map_err(|e| {
            debug!(
                self.unit_log("fan"),
                "failed to read fan EEPROM";
                "fan" => fan,
                "field" => %info,
                "reason" => %e,
            );
            Error::DevFail(format!("fan {fan} EEPROM: {e}"))
        })
    }

    // Find the (type, sub-type) whose configured name prefix matches.
    //
    // Returns `None` when no fan names are configured at all.
    fn match_fan_name(&self, name: &str) -> Result<Option<(u32, u32)>, Error> {
        let Ok(n_types) = self.dev_number(MainDev::Fan, MinorDev::Fan) else {
            return Ok(None);
        };
        for fan_type in 1..=n_types.max(0) as u32 {
            let n_sub = self.config_int(Key::new(Item::FanTypeNum, fan_type, 0))?;
            for sub in 1..=n_sub.max(0) as u32 {
                let pattern = self.config_str(Key::new(Item::FanName, fan_type, sub))?;
                if name_matches(name, pattern) {
                    return Ok(Some((fan_type, sub)));
                }
            }
        }
        Ok(None)
    }

    // Replace a fan's product name with its configured display name.
    fn decode_fan_name(&self, name: String) -> String {
        let decoded = self.match_fan_name(&name).and_then(|found| match found {
            Some((fan_type, _)) => self
                .config_str(Key::new(Item::DecodeFanName, fan_type, 0))
                .map(|s| Some(String::from(s))),
            None => Ok(None),
        });
        match decoded {
            Ok(Some(decoded)) => decoded,
            Ok(None) => name,
            Err(e) => {
                warn!(
                    self.unit_log("fan"),
                    "failed to decode fan name";
                    "name" => %name,
                    "reason" => %e,
                );
                name
            }
        }
    }

    /// Return an identity field of a fan module.
    ///
    /// Product names are replaced by their display name when the product
    /// matches a configured fan type.
    pub fn fan_info(&self, fan: u32, info: DevInfo) -> Result<String, Error> {
        let value = self.fan_raw_info(fan, info)?;
        if info == DevInfo::Name {
            return Ok(self.decode_fan_name(value));
        }
        Ok(value)
    }

    /// Return the configured (type, sub-type) of a fan module.
    pub fn fan_type(&self, fan: u32) -> Result<(u32, u32), Error> {
        let name = self.fan_raw_info(fan, DevInfo::Name)?;
        let name = printable_string(name.as_bytes());
        self.match_fan_name(&name)?
            .ok_or_else(|| Error::NoNode(format!("no fan type matches '{name}'")))
    }

    // Look up the type of a fan for a derived attribute.
    fn known_fan_type(&self, fan: u32) -> Result<(u32, u32), Error> {
        self.fan_type(fan).map_err(|e| {
            debug!(self.unit_log("fan"), "unknown fan type"; "fan" => fan, "reason" => %e);
            Error::DevFail(format!("fan {fan} type unknown: {e}"))
        })
    }

    /// Return the airflow direction of a fan module, 0 for front-to-back
    /// and 1 for back-to-front.
    pub fn fan_direction(&self, fan: u32) -> Result<i32, Error> {
        if self.fan_present(fan)? == 0 {
            return Err(Error::DevNotSupported);
        }
        let (fan_type, sub) = self.known_fan_type(fan)?;
        self.config_int(Key::new(Item::FanDirection, fan_type, sub))
    }

    fn fan_threshold(&self, fan_type: u32, motor: u32, selector: u8) -> Result<i32, Error> {
        let key = Key::new(
            Item::FanThreshold,
            threshold_index1(selector, MainDev::Fan.as_u8()),
            threshold_index2(fan_type as u8, motor as u8),
        );
        self.config_int(key)
    }

    /// Return the lowest speed a healthy motor may turn at, in RPM.
    pub fn fan_speed_min(&self, fan: u32, motor: u32) -> Result<i32, Error> {
        let (fan_type, _) = self.known_fan_type(fan)?;
        self.fan_threshold(fan_type, motor, THRESHOLD_MIN)
    }

    /// Return the highest speed a healthy motor may turn at, in RPM.
    pub fn fan_speed_max(&self, fan: u32, motor: u32) -> Result<i32, Error> {
        let (fan_type, _) = self.known_fan_type(fan)?;
        self.fan_threshold(fan_type, motor, THRESHOLD_MAX)
    }

    /// Return the expected speed of a motor at the module's current PWM.
    pub fn fan_speed_target(&self, fan: u32, motor: u32) -> Result<i32, Error> {
        let (fan_type, _) = self.known_fan_type(fan)?;
        let pwm = self.fan_pwm(fan)?;
        self.fan_threshold(fan_type, motor, target_selector(pwm))
    }

    /// Return how far, in RPM, a motor may stray from its target speed.
    pub fn fan_speed_tolerance(&self, fan: u32, motor: u32) -> Result<i32, Error> {
        let (fan_type, _) = self.known_fan_type(fan)?;
        let percent = self.fan_threshold(fan_type, motor, THRESHOLD_TOLERANCE)?;
        let target = self.fan_speed_target(fan, motor)?;
        Ok(tolerance(target, percent))
    }
}
