// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The enumeration of configuration items.
//!
//! Item ids are laid out in four contiguous ranges, each terminated by a
//! sentinel id that is never itself a valid item. The range an id falls in
//! determines the shape of the records stored under it:
//!
//! | Range | Record |
//! |-------|--------|
//! | `(0, INT_END)` | integer |
//! | `(INT_END, STRING_END)` | string |
//! | `(STRING_END, I2C_DEV_END)` | I2C device descriptor |
//! | `(I2C_DEV_END, INFO_CTRL_END)` | info-control |
//!
//! The numeric ids are part of the schema and must not be reordered.

use crate::Error;
use serde::Deserialize;
use serde::Serialize;

/// The sentinel terminating the integer range.
pub const INT_END: u16 = 16;

/// The sentinel terminating the string range.
pub const STRING_END: u16 = 41;

/// The sentinel terminating the I2C device range.
pub const I2C_DEV_END: u16 = 44;

/// The sentinel terminating the info-control range.
pub const INFO_CTRL_END: u16 = 74;

/// The shape of record an item holds.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Int,
    Str,
    I2cDev,
    Info,
}

impl RecordKind {
    /// Return the record kind for a raw item id, using the range sentinels.
    ///
    /// Id 0 and the sentinels themselves have no kind.
    pub const fn from_item_id(id: u16) -> Option<Self> {
        if id == 0 {
            None
        } else if id < INT_END {
            Some(RecordKind::Int)
        } else if id > INT_END && id < STRING_END {
            Some(RecordKind::Str)
        } else if id > STRING_END && id < I2C_DEV_END {
            Some(RecordKind::I2cDev)
        } else if id > I2C_DEV_END && id < INFO_CTRL_END {
            Some(RecordKind::Info)
        } else {
            None
        }
    }
}

macro_rules! schema_items {
    ($( $variant:ident = $id:literal, $name:literal, $doc:literal; )+) => {
        /// A configuration item.
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(test, derive(strum::EnumIter))]
        #[repr(u16)]
        pub enum Item {
            $(
                #[doc = $doc]
                $variant = $id,
            )+
        }

        impl Item {
            /// Every item, in id order.
            pub const ALL: &'static [Item] = &[ $( Item::$variant, )+ ];

            /// Return the human-readable name of this item.
            ///
            /// These names are also used by the configuration loader.
            pub const fn name(&self) -> &'static str {
                match self {
                    $( Item::$variant => $name, )+
                }
            }
        }

        impl TryFrom<u16> for Item {
            type Error = Error;

            fn try_from(id: u16) -> Result<Self, Self::Error> {
                match id {
                    $( $id => Ok(Item::$variant), )+
                    _ => Err(Error::UnknownItem(id)),
                }
            }
        }
    };
}

schema_items! {
    DevNum = 1, "dev_num", "Number of devices of a (main, minor) kind.";
    BmcSystemCmdNum = 2, "bmc_system_cmd_num", "Number of steps in a system command sequence.";
    FanThreshold = 3, "fan_threshold", "Fan speed thresholds, keyed by threshold and fan type.";
    LedStatusDecode = 4, "led_status_decode", "Map from raw LED register value to user colour.";
    SystemStatusDecode = 5, "system_status_decode", "Map from raw system status to user value.";
    CpldLpcDev = 6, "cpld_lpc_dev", "Base I/O port of an LPC-attached CPLD.";
    FanTypeNum = 7, "fan_type_num", "Number of sub-types of a fan type.";
    EepromSize = 8, "eeprom_size", "Size of an EEPROM in bytes.";
    DecodePowerFanDir = 9, "decode_power_fan_dir", "Airflow direction of a PSU type.";
    WatchdogId = 10, "watchdog_id", "Kernel watchdog device number.";
    PowerRsupply = 11, "power_rate_supply", "Rated output power of a PSU type.";
    FanDirection = 12, "fan_direction", "Airflow direction of a fan (type, sub-type).";
    HwmonTempMonitorDc = 13, "dc_monitor_flag_hwmon_temp", "Decode table for temperature monitor flags.";
    HwmonInMonitorFlagDc = 14, "dc_monitor_flag_hwmon_in", "Decode table for voltage monitor flags.";
    HwmonCurrMonitorFlagDc = 15, "dc_monitor_flag_hwmon_curr", "Decode table for current monitor flags.";

    CpldMode = 17, "mode_cpld", "Access mode of a CPLD, `i2c` or `lpc`.";
    CpldName = 18, "cpld_name", "Name of a CPLD.";
    CpldType = 19, "cpld_type", "Type of a CPLD.";
    FpgaName = 20, "fpga_name", "Name of an FPGA.";
    FpgaType = 21, "fpga_type", "Type of an FPGA.";
    FpgaModelDecode = 22, "fpga_model_decode", "Map from FPGA model register value to type.";
    FanE2Mode = 23, "fan_e2_mode", "Fan EEPROM format, `tlv` or `fru`.";
    PsuFruMode = 24, "psu_fru_mode", "PSU identity source, `eeprom` or `pmbus`.";
    FanSysfsName = 25, "fan_sysfs_name", "Sysfs attribute exposing fan EEPROM contents.";
    PowerName = 26, "power_name", "Product name prefix identifying a PSU type.";
    FanName = 27, "fan_name", "Product name prefix identifying a fan (type, sub-type).";
    DecodePowerName = 28, "decode_power_name", "User-facing name of a PSU type.";
    FanSpeedCal = 29, "fan_speed_cal", "Fan speed calculation formula of a PSU type.";
    DecodeFanName = 30, "decode_fan_name", "User-facing name of a fan type.";
    EepromPath = 31, "eeprom_path", "File path of an EEPROM.";
    WatchdogName = 32, "watchdog_name", "File name of a watchdog attribute.";
    PsuSysfsName = 33, "psu_sysfs_name", "Sysfs attribute exposing PSU EEPROM contents.";
    SlotSysfsName = 34, "slot_sysfs_name", "Sysfs attribute exposing slot EEPROM contents.";
    EepromAlias = 35, "eeprom_alias", "Alias of an EEPROM.";
    EepromTag = 36, "eeprom_tag", "Tag of an EEPROM.";
    EepromType = 37, "eeprom_type", "Type of an EEPROM.";
    PsuBlackboxInfo = 38, "psu_blackbox_info", "File path of a PSU blackbox dump.";
    PsuPmbusInfo = 39, "psu_pmbus_info", "File path of a PSU PMBus register dump.";
    PsuClearBlackbox = 40, "psu_clear_blackbox", "File path used to clear a PSU blackbox.";

    CpldI2cDev = 42, "cpld_i2c_dev", "Bus and address of an I2C-attached CPLD.";
    OtherI2cDev = 43, "other_i2c_dev", "Bus and address of any other I2C device.";

    FanRollStatus = 45, "fan_roll_status", "Whether a fan motor is turning.";
    FanSpeed = 46, "fan_speed", "Fan motor tachometer count.";
    FanRatio = 47, "fan_ratio", "Fan PWM level.";
    LedStatus = 48, "led_status", "Raw LED register value.";
    CpldVersion = 49, "cpld_version", "CPLD firmware version.";
    CpldHwVersion = 50, "cpld_hw_version", "CPLD hardware version.";
    CpldTestReg = 51, "cpld_test_reg", "CPLD scratch register.";
    DevPresentStatus = 52, "dev_present_status", "Presence of a field-replaceable device.";
    PsuStatus = 53, "psu_status", "PSU status bits observed by the CPLD.";
    HwmonTemp = 54, "hwmon_temp", "Temperature sensor attribute.";
    HwmonTempMonitorFlag = 55, "monitor_flag_hwmon_temp", "Whether a temperature sensor is monitored.";
    HwmonIn = 56, "hwmon_in", "Voltage sensor attribute.";
    HwmonInMonitorFlag = 57, "monitor_flag_hwmon_in", "Whether a voltage sensor is monitored.";
    HwmonCurr = 58, "hwmon_curr", "Current sensor attribute.";
    HwmonCurrMonitorFlag = 59, "monitor_flag_hwmon_curr", "Whether a current sensor is monitored.";
    HwmonPsu = 60, "hwmon_psu", "PSU PMBus sensor attribute.";
    SffOptoeType = 61, "sff_optoe_type", "Optoe driver type of a transceiver port.";
    HwmonPower = 62, "hwmon_power", "Power sensor attribute.";
    SffCpldReg = 63, "sff_cpld_reg", "Transceiver sideband signal in a CPLD.";
    FpgaVersion = 64, "fpga_version", "FPGA firmware version.";
    FpgaTestReg = 65, "fpga_test_reg", "FPGA scratch register.";
    FpgaModelReg = 66, "fpga_model_reg", "FPGA model register.";
    PsuPmbusReg = 67, "psu_pmbus_reg", "PSU PMBus register.";
    WatchdogDev = 68, "watchdog_dev", "Watchdog control register.";
    BmcSystem = 69, "bmc_system", "Step of a system command sequence.";
    PreCheckBmcSystem = 70, "pre_check_bmc_system", "Precondition of a system command step.";
    CheckValBmcSystem = 71, "check_val_bmc_system", "Postcondition of a system command step.";
    PsuFruPmbus = 72, "psu_fru_pmbus", "PSU identity field read over PMBus.";
    PowerStatus = 73, "power_status", "Power state of a slot.";
}

impl Item {
    /// Return the numeric id of this item.
    pub const fn id(&self) -> u16 {
        *self as u16
    }

    /// Return the shape of record this item holds.
    pub const fn kind(&self) -> RecordKind {
        match RecordKind::from_item_id(self.id()) {
            Some(kind) => kind,
            // Every variant is declared inside one of the ranges.
            None => RecordKind::Int,
        }
    }
}

impl core::fmt::Display for Item {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl core::str::FromStr for Item {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Item::ALL
            .iter()
            .find(|item| item.name() == s)
            .copied()
            .ok_or_else(|| Error::UnknownItemName(String::from(s)))
    }
}

impl Serialize for Item {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
