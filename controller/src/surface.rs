// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Text attributes backed by the entity drivers.
//!
//! Each [`Attribute`] names one readable or writable value of one entity.
//! Reads always produce a single newline-terminated line of text. A failed
//! read produces [`NOT_SUPPORTED`] when the platform does not describe the
//! attribute, and [`FAILED`] for every other error. A failed write yields
//! the negative code of the error.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_messages::DevInfo;
use platform_messages::Led;
use platform_messages::MainDev;
use platform_messages::MinorDev;
use platform_messages::PsuSensor;
use platform_messages::SensorAttr;
use platform_messages::SffAttr;
use platform_messages::WatchdogAttr;
use slog::debug;

/// The text of an attribute the platform does not support.
pub const NOT_SUPPORTED: &str = "NA\n";

/// The text of an attribute which could not be read.
pub const FAILED: &str = "ERROR\n";

/// An attribute of a fan module as a whole.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum FanAttr {
    Present,
    Status,
    Pwm,
    Direction,
    Led,
}

/// An attribute of one motor of a fan module.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum MotorAttr {
    Status,
    Speed,
    SpeedMin,
    SpeedMax,
    SpeedTarget,
    SpeedTolerance,
}

/// A status attribute of a PSU.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum PsuAttr {
    Present,
    HwStatus,
    PmbusStatus,
    FaultStatus,
    Alarm,
    Led,
    InStatus,
    OutStatus,
    InputType,
    FanRatio,
    Blackbox,
    PmbusInfo,
    ClearBlackbox,
}

/// An attribute of a CPLD or FPGA.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ChipAttr {
    Name,
    Type,
    FwVersion,
    HwVersion,
    TestReg,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum SlotAttr {
    Status,
    Power,
    Led,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum EepromAttr {
    Size,
    Alias,
    Tag,
    Type,
}

/// One attribute of one entity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Attribute {
    DevNumber {
        main_dev: MainDev,
        minor_dev: MinorDev,
    },
    Fan {
        fan: u32,
        attr: FanAttr,
    },
    FanMotor {
        fan: u32,
        motor: u32,
        attr: MotorAttr,
    },
    FanInfo {
        fan: u32,
        info: DevInfo,
    },
    Psu {
        psu: u32,
        attr: PsuAttr,
    },
    PsuInfo {
        psu: u32,
        info: DevInfo,
    },
    PsuSensor {
        psu: u32,
        sensor: PsuSensor,
    },
    Sensor {
        main_dev: MainDev,
        dev_index: u32,
        kind: MinorDev,
        index: u32,
        attr: SensorAttr,
    },
    SensorMonitor {
        main_dev: MainDev,
        dev_index: u32,
        kind: MinorDev,
        index: u32,
    },
    Led {
        led: Led,
        index: u32,
    },
    Sff {
        port: u32,
        attr: SffAttr,
    },
    OptoeType {
        port: u32,
    },
    TransceiverPresent,
    TransceiverPowerOn,
    Cpld {
        main_dev: MainDev,
        index: u32,
        attr: ChipAttr,
    },
    Fpga {
        main_dev: MainDev,
        index: u32,
        attr: ChipAttr,
    },
    Slot {
        slot: u32,
        attr: SlotAttr,
    },
    SlotInfo {
        slot: u32,
        info: DevInfo,
    },
    Eeprom {
        e2_type: MainDev,
        index: u32,
        attr: EepromAttr,
    },
    Watchdog {
        attr: WatchdogAttr,
    },
    System {
        sys_type: u32,
    },
    PortPower {
        sys_type: u32,
    },
}

/// Return the text shown for a failed read.
pub fn error_text(e: &Error) -> &'static str {
    if e.is_not_supported() {
        NOT_SUPPORTED
    } else {
        FAILED
    }
}

// Terminate attribute text with exactly one newline.
fn terminate(text: &str) -> String {
    format!("{}\n", text.trim_end_matches(['\n', '\0']))
}

/// Parse the text written to an attribute, in decimal or `0x` hex.
pub fn parse_value(text: &str) -> Result<i64, Error> {
    let s = text.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| Error::InvalidValue(format!("invalid attribute value '{s}'")))?;
    Ok(if negative { -magnitude } else { magnitude })
}

// Narrow a written value to the width a driver takes.
fn narrow<T: TryFrom<i64>>(value: i64) -> Result<T, Error> {
    T::try_from(value).map_err(|_| Error::InvalidValue(format!("value {value} out of range")))
}

impl<B: Bus> Platform<B> {
    /// Read an attribute as text, without mapping errors.
    pub fn read_attribute(&self, attr: &Attribute) -> Result<String, Error> {
        let text = match *attr {
            Attribute::DevNumber {
                main_dev,
                minor_dev,
            } => self.dev_number(main_dev, minor_dev)?.to_string(),
            Attribute::Fan { fan, attr } => match attr {
                FanAttr::Present => self.fan_present(fan)?.to_string(),
                FanAttr::Status => self.fan_status(fan)?.as_u8().to_string(),
                FanAttr::Pwm => self.fan_pwm(fan)?.to_string(),
                FanAttr::Direction => self.fan_direction(fan)?.to_string(),
                FanAttr::Led => self.led_status(Led::FanModule, fan)?.to_string(),
            },
            Attribute::FanMotor { fan, motor, attr } => match attr {
                MotorAttr::Status => self.fan_motor_status(fan, motor)?.to_string(),
                MotorAttr::Speed => self.fan_speed(fan, motor)?.to_string(),
                MotorAttr::SpeedMin => self.fan_speed_min(fan, motor)?.to_string(),
                MotorAttr::SpeedMax => self.fan_speed_max(fan, motor)?.to_string(),
                MotorAttr::SpeedTarget => self.fan_speed_target(fan, motor)?.to_string(),
                MotorAttr::SpeedTolerance => self.fan_speed_tolerance(fan, motor)?.to_string(),
            },
            Attribute::FanInfo { fan, info } => self.fan_info(fan, info)?,
            Attribute::Psu { psu, attr } => match attr {
                PsuAttr::Present => self.psu_present(psu)?.to_string(),
                PsuAttr::HwStatus => self.psu_hw_status(psu)?.code().to_string(),
                PsuAttr::PmbusStatus => self.psu_pmbus_status(psu)?,
                PsuAttr::FaultStatus => self.psu_fault_status(psu)?.to_string(),
                PsuAttr::Alarm => self.psu_alarm(psu)?.to_string(),
                PsuAttr::Led => self.psu_led_status(psu)?.as_u8().to_string(),
                PsuAttr::InStatus => self.psu_in_status(psu)?.as_u8().to_string(),
                PsuAttr::OutStatus => self.psu_out_status(psu)?.as_u8().to_string(),
                PsuAttr::InputType => self.psu_input_type(psu)?.to_string(),
                PsuAttr::FanRatio => self.psu_fan_ratio(psu)?.to_string(),
                PsuAttr::Blackbox => self.psu_blackbox(psu)?,
                PsuAttr::PmbusInfo => self.psu_pmbus_info(psu)?,
                PsuAttr::ClearBlackbox => return Err(Error::DevNotSupported),
            },
            Attribute::PsuInfo { psu, info } => self.psu_info(psu, info)?,
            Attribute::PsuSensor { psu, sensor } => self.psu_sensor(psu, sensor)?,
            Attribute::Sensor {
                main_dev,
                dev_index,
                kind,
                index,
                attr,
            } => self.sensor_info(main_dev, dev_index, kind, index, attr)?,
            Attribute::SensorMonitor {
                main_dev,
                dev_index,
                kind,
                index,
            } => self
                .monitor_flag(main_dev, dev_index, kind, index)?
                .to_string(),
            Attribute::Led { led, index } => self.led_status(led, index)?.to_string(),
            Attribute::Sff { port, attr } => self.sff_cpld_info(port, attr)?.to_string(),
            Attribute::OptoeType { port } => self.optoe_type(port)?.to_string(),
            Attribute::TransceiverPresent => self.transceiver_present_status()?,
            Attribute::TransceiverPowerOn => self.transceiver_power_on_status()?,
            Attribute::Cpld {
                main_dev,
                index,
                attr,
            } => match attr {
                ChipAttr::Name => self.cpld_name(main_dev, index)?.to_string(),
                ChipAttr::Type => self.cpld_type(main_dev, index)?.to_string(),
                ChipAttr::FwVersion => format!("{:08x}", self.cpld_fw_version(main_dev, index)?),
                ChipAttr::HwVersion => format!("{:02x}", self.cpld_hw_version(main_dev, index)?),
                ChipAttr::TestReg => format!("0x{:02x}", self.cpld_testreg(main_dev, index)?),
            },
            Attribute::Fpga {
                main_dev,
                index,
                attr,
            } => match attr {
                ChipAttr::Name => self.fpga_name(main_dev, index)?.to_string(),
                ChipAttr::Type => self.fpga_type(main_dev, index)?,
                ChipAttr::FwVersion => format!("0x{:08x}", self.fpga_fw_version(main_dev, index)?),
                ChipAttr::HwVersion => format!("0x{:08x}", self.fpga_hw_version(main_dev, index)?),
                ChipAttr::TestReg => format!("0x{:08x}", self.fpga_testreg(main_dev, index)?),
            },
            Attribute::Slot { slot, attr } => match attr {
                SlotAttr::Status => self.slot_status(slot)?.to_string(),
                SlotAttr::Power => self.slot_power_status(slot)?.to_string(),
                SlotAttr::Led => self.led_status(Led::SlotModule, slot)?.to_string(),
            },
            Attribute::SlotInfo { slot, info } => self.slot_info(slot, info)?,
            Attribute::Eeprom {
                e2_type,
                index,
                attr,
            } => match attr {
                EepromAttr::Size => self.eeprom_size(e2_type, index)?.to_string(),
                EepromAttr::Alias => self.eeprom_alias(e2_type, index)?.to_string(),
                EepromAttr::Tag => self.eeprom_tag(e2_type, index)?.to_string(),
                EepromAttr::Type => self.eeprom_type(e2_type, index)?.to_string(),
            },
            Attribute::Watchdog { attr } => match attr {
                WatchdogAttr::Enable => self.watchdog_enable()?.to_string(),
                WatchdogAttr::State => self.watchdog_state()?.to_string(),
                _ => self.watchdog_info(attr)?,
            },
            Attribute::System { sys_type } => self.system_value(sys_type)?.to_string(),
            Attribute::PortPower { sys_type } => {
                self.port_power_status(sys_type)?.as_u8().to_string()
            }
        };
        Ok(terminate(&text))
    }

    /// Show an attribute, mapping a failure to its error text.
    pub fn show(&self, attr: &Attribute) -> String {
        self.read_attribute(attr).unwrap_or_else(|e| {
            debug!(
                self.log,
                "attribute read failed";
                "attr" => ?attr,
                "code" => e.code(),
                "reason" => %e,
            );
            String::from(error_text(&e))
        })
    }

    /// Write text to an attribute, without mapping errors.
    pub fn write_attribute(&self, attr: &Attribute, text: &str) -> Result<(), Error> {
        let value = parse_value(text)?;
        match *attr {
            Attribute::Fan {
                fan,
                attr: FanAttr::Pwm,
            } => self.set_fan_pwm(fan, narrow(value)?),
            Attribute::Fan {
                fan,
                attr: FanAttr::Led,
            } => self.set_led_status(Led::FanModule, fan, narrow(value)?),
            Attribute::Psu {
                psu,
                attr: PsuAttr::ClearBlackbox,
            } => self.clear_psu_blackbox(psu, narrow(value)?),
            Attribute::Led { led, index } => self.set_led_status(led, index, narrow(value)?),
            Attribute::Sff { port, attr } => self.set_sff_cpld_info(port, attr, narrow(value)?),
            Attribute::OptoeType { port } => self.set_optoe_type(port, narrow(value)?),
            Attribute::TransceiverPowerOn => {
                self.set_transceiver_power_on_status(narrow(value)?)
            }
            Attribute::Cpld {
                main_dev,
                index,
                attr: ChipAttr::TestReg,
            } => self.set_cpld_testreg(main_dev, index, narrow(value)?),
            Attribute::Fpga {
                main_dev,
                index,
                attr: ChipAttr::TestReg,
            } => self.set_fpga_testreg(main_dev, index, narrow(value)?),
            Attribute::Slot {
                slot,
                attr: SlotAttr::Power,
            } => self.set_slot_power_status(slot, narrow(value)?),
            Attribute::Slot {
                slot,
                attr: SlotAttr::Led,
            } => self.set_led_status(Led::SlotModule, slot, narrow(value)?),
            Attribute::Watchdog {
                attr: WatchdogAttr::Enable,
            } => self.set_watchdog_enable(narrow(value)?),
            Attribute::System { sys_type } => self.set_system_value(sys_type, narrow(value)?),
            _ => Err(Error::DevNotSupported),
        }
    }

    /// Store text to an attribute, returning the negative error code on
    /// failure.
    pub fn store(&self, attr: &Attribute, text: &str) -> Result<(), i32> {
        self.write_attribute(attr, text).map_err(|e| {
            debug!(
                self.log,
                "attribute write failed";
                "attr" => ?attr,
                "value" => text.trim(),
                "code" => e.code(),
                "reason" => %e,
            );
            e.code()
        })
    }
}
