// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Temperature, voltage, current, and power sensors.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::MainDev;
use platform_messages::MinorDev;
use platform_messages::SensorAttr;
use platform_messages::SensorMonitor;
use slog::debug;

/// Return the first key index of a sensor record.
pub const fn sensor_index1(dev_index: u32, sensor_index: u32) -> u32 {
    ((dev_index & 0xff) << 8) | (sensor_index & 0xff)
}

/// Return the second key index of a sensor record.
pub const fn sensor_index2(main_dev: u8, attr: u8) -> u32 {
    (((main_dev & 0xf) as u32) << 4) | (attr & 0xf) as u32
}

// The item holding sensor attributes of a kind.
fn sensor_item(kind: MinorDev) -> Result<Item, Error> {
    match kind {
        MinorDev::Temp => Ok(Item::HwmonTemp),
        MinorDev::In => Ok(Item::HwmonIn),
        MinorDev::Curr => Ok(Item::HwmonCurr),
        MinorDev::Power => Ok(Item::HwmonPower),
        _ => Err(Error::InvalidValue(format!("{kind} is not a sensor type"))),
    }
}

// The monitor flag item of a kind, and its decode table.
fn monitor_items(kind: MinorDev) -> Result<(Item, Item), Error> {
    match kind {
        MinorDev::Temp => Ok((Item::HwmonTempMonitorFlag, Item::HwmonTempMonitorDc)),
        MinorDev::In => Ok((Item::HwmonInMonitorFlag, Item::HwmonInMonitorFlagDc)),
        MinorDev::Curr => Ok((Item::HwmonCurrMonitorFlag, Item::HwmonCurrMonitorFlagDc)),
        _ => Err(Error::InvalidValue(format!("{kind} has no monitor flag"))),
    }
}

impl<B: Bus> Platform<B> {
    /// Read an attribute of a sensor, as newline-terminated text.
    ///
    /// `dev_index` is 0 for sensors on the main board, and otherwise names
    /// the PSU or slot carrying the sensor. Sensor indices start at 1.
    pub fn sensor_info(
        &self,
        main_dev: MainDev,
        dev_index: u32,
        kind: MinorDev,
        sensor_index: u32,
        attr: SensorAttr,
    ) -> Result<String, Error> {
        let item = sensor_item(kind)?;
        let key = Key::new(
            item,
            sensor_index1(dev_index, sensor_index),
            sensor_index2(main_dev.as_u8(), attr.as_u8()),
        );
        self.get_sensor(key).inspect_err(|e| {
            debug!(
                self.unit_log("sensor"),
                "failed to read sensor";
                "key" => %key,
                "attr" => %attr,
                "reason" => %e,
            );
        })
    }

    pub fn temp_info(
        &self,
        main_dev: MainDev,
        dev_index: u32,
        temp_index: u32,
        attr: SensorAttr,
    ) -> Result<String, Error> {
        self.sensor_info(main_dev, dev_index, MinorDev::Temp, temp_index, attr)
    }

    pub fn voltage_info(
        &self,
        main_dev: MainDev,
        dev_index: u32,
        in_index: u32,
        attr: SensorAttr,
    ) -> Result<String, Error> {
        self.sensor_info(main_dev, dev_index, MinorDev::In, in_index, attr)
    }

    pub fn current_info(
        &self,
        main_dev: MainDev,
        dev_index: u32,
        curr_index: u32,
        attr: SensorAttr,
    ) -> Result<String, Error> {
        self.sensor_info(main_dev, dev_index, MinorDev::Curr, curr_index, attr)
    }

    /// Return whether a sensor should be monitored.
    ///
    /// Sensors without a monitor flag are always monitored. A raw flag value
    /// is replaced by its entry in the decode table, if it has one.
    pub fn monitor_flag(
        &self,
        main_dev: MainDev,
        dev_index: u32,
        kind: MinorDev,
        sensor_index: u32,
    ) -> Result<i32, Error> {
        let (flag, decode) = monitor_items(kind)?;
        let index1 = sensor_index1(dev_index, sensor_index);
        let key = Key::new(flag, index1, sensor_index2(main_dev.as_u8(), 0));
        if self.registry.get_info(key).is_none() {
            return Ok(i32::from(SensorMonitor::Yes.as_u8()));
        }
        let raw = self.get_int(key, None)?;
        let value = self
            .registry
            .get_int(Key::new(decode, index1, raw as u32))
            .unwrap_or(raw);
        debug!(
            self.unit_log("sensor"),
            "read monitor flag";
            "key" => %key,
            "raw" => raw,
            "value" => value,
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::sensor_index1;
    use super::sensor_index2;
    use crate::platform::tests::TestRegistry;
    use crate::Error;
    use platform_messages::Format;
    use platform_messages::InfoCtrl;
    use platform_messages::Item;
    use platform_messages::MainDev;
    use platform_messages::MinorDev;
    use platform_messages::Mode;
    use platform_messages::SensorAttr;
    use platform_messages::Source;

    fn constant(value: i32) -> InfoCtrl {
        InfoCtrl {
            mode: Mode::Constant,
            int_cons: value,
            ..Default::default()
        }
    }

    #[test]
    fn test_sensor_indices() {
        assert_eq!(sensor_index1(0, 1), 0x0001);
        assert_eq!(sensor_index1(2, 3), 0x0203);
        assert_eq!(sensor_index2(MainDev::Psu.as_u8(), SensorAttr::Max.as_u8()), 0x23);
        assert_eq!(sensor_index2(MainDev::Slot.as_u8(), SensorAttr::Low.as_u8()), 0x5a);
    }

    #[test]
    fn test_temp_input_from_hwmon() {
        let dir = tempfile::tempdir().unwrap();
        let hwmon = dir.path().join("3-004c").join("hwmon");
        std::fs::create_dir_all(hwmon.join("hwmon2")).unwrap();
        std::fs::write(hwmon.join("hwmon2").join("temp1_input"), b"45123\n").unwrap();
        let info = InfoCtrl {
            mode: Mode::Config,
            src: Source::File,
            frmt: Format::Buf,
            fpath: hwmon.to_str().unwrap().to_string(),
            str_cons: String::from("temp1_input"),
            len: 8,
            int_cons: 3,
            bit_offset: 1,
            ..Default::default()
        };
        let platform = TestRegistry::default()
            .info(Item::HwmonTemp, 0x0001, 0x00, info)
            .build();

        assert_eq!(
            platform
                .temp_info(MainDev::Mainboard, 0, 1, SensorAttr::Input)
                .unwrap(),
            "45.1\n"
        );
        assert!(platform
            .temp_info(MainDev::Mainboard, 0, 2, SensorAttr::Input)
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn test_sensor_kinds() {
        let alias = InfoCtrl {
            mode: Mode::StrConstant,
            str_cons: String::from("VDD_CORE"),
            ..Default::default()
        };
        let platform = TestRegistry::default()
            .info(Item::HwmonIn, 0x0101, 0x51, alias)
            .info(Item::HwmonCurr, 0x0002, 0x03, constant(30000))
            .build();

        assert_eq!(
            platform
                .voltage_info(MainDev::Slot, 1, 1, SensorAttr::Alias)
                .unwrap(),
            "VDD_CORE\n"
        );
        assert_eq!(
            platform
                .current_info(MainDev::Mainboard, 0, 2, SensorAttr::Max)
                .unwrap(),
            "30000\n"
        );
        assert!(matches!(
            platform.sensor_info(MainDev::Mainboard, 0, MinorDev::Fan, 1, SensorAttr::Input),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn test_monitor_flag() {
        let platform = TestRegistry::default()
            .info(Item::HwmonTempMonitorFlag, 0x0001, 0x00, constant(1))
            .info(Item::HwmonTempMonitorFlag, 0x0002, 0x00, constant(5))
            .int(Item::HwmonTempMonitorDc, 0x0002, 5, 0)
            .info(Item::HwmonInMonitorFlag, 0x0001, 0x00, constant(7))
            .build();

        // No record means the sensor is always monitored.
        assert_eq!(
            platform
                .monitor_flag(MainDev::Mainboard, 0, MinorDev::Curr, 1)
                .unwrap(),
            1
        );
        assert_eq!(
            platform
                .monitor_flag(MainDev::Mainboard, 0, MinorDev::Temp, 1)
                .unwrap(),
            1
        );
        assert_eq!(
            platform
                .monitor_flag(MainDev::Mainboard, 0, MinorDev::Temp, 2)
                .unwrap(),
            0
        );
        assert_eq!(
            platform
                .monitor_flag(MainDev::Mainboard, 0, MinorDev::In, 1)
                .unwrap(),
            7
        );
        assert!(matches!(
            platform.monitor_flag(MainDev::Mainboard, 0, MinorDev::Power, 1),
            Err(Error::InvalidValue(_))
        ));
    }
}
