// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Enumerations describing the entities of a chassis and their attributes.
//!
//! The numeric values of these enumerations appear inside registry keys and
//! are part of the configuration schema.

use crate::Error;

/// Define a `u8`-backed enumeration whose values are fixed by the schema.
///
/// Each variant carries its numeric value and a display name. The generated
/// type converts to and from `u8`, displays as its name, and can be parsed
/// from the command line.
#[macro_export]
macro_rules! platform_enum {
    (
        name = $name:ident,
        description = $docstring:literal,
        variants = { $( $value:literal, $variant:ident, $display:literal $(,)? ),+ }
        $(,)?
    ) => {
        #[doc = $docstring]
        #[derive(
            Clone,
            Copy,
            Debug,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            serde::Deserialize,
            serde::Serialize,
        )]
        #[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
        #[cfg_attr(feature = "std", derive(clap::ValueEnum))]
        #[repr(u8)]
        pub enum $name {
            $(
                #[serde(rename = $display)]
                #[cfg_attr(feature = "std", value(name = $display))]
                $variant = $value
            ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Return the numeric value of this variant.
            pub const fn as_u8(&self) -> u8 {
                *self as u8
            }

            /// Return the display name of this variant.
            pub const fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $display, )+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl ::core::convert::TryFrom<u8> for $name {
            type Error = Error;

            fn try_from(x: u8) -> Result<Self, Self::Error> {
                match x {
                    $( $value => Ok($name::$variant), )+
                    _ => Err(Error::InvalidValue {
                        what: stringify!($name),
                        value: i64::from(x),
                    }),
                }
            }
        }

        impl ::core::convert::From<$name> for u8 {
            fn from(x: $name) -> u8 {
                x.as_u8()
            }
        }

        impl ::core::convert::From<$name> for u32 {
            fn from(x: $name) -> u32 {
                u32::from(x.as_u8())
            }
        }
    };
}

platform_enum! {
    name = DevStatus,
    description = "The presence and health of a field-replaceable device.",
    variants = {
        0, Absent, "absent",
        1, Ok, "ok",
        2, NotOk, "not_ok",
    },
}

platform_enum! {
    name = MainDev,
    description = "The top-level class of a device, used as a key index.",
    variants = {
        0, Mainboard, "mainboard",
        1, Fan, "fan",
        2, Psu, "psu",
        3, Sff, "sff",
        4, Cpld, "cpld",
        5, Slot, "slot",
    },
}

platform_enum! {
    name = MinorDev,
    description = "A class of sub-device within a main device.",
    variants = {
        0, None, "none",
        1, Temp, "temp",
        2, In, "in",
        3, Curr, "curr",
        4, Power, "power",
        5, Motor, "motor",
        6, Psu, "psu",
        7, Fan, "fan",
        8, Cpld, "cpld",
        9, Fpga, "fpga",
        10, Eeprom, "eeprom",
    },
}

platform_enum! {
    name = SensorAttr,
    description = "An attribute of a temperature, voltage, or current sensor.",
    variants = {
        0, Input, "input",
        1, Alias, "alias",
        2, Type, "type",
        3, Max, "max",
        4, MaxHyst, "max_hyst",
        5, Min, "min",
        6, Crit, "crit",
        7, Range, "range",
        8, NominalVal, "nominal_val",
        9, High, "high",
        10, Low, "low",
    },
}

platform_enum! {
    name = SffAttr,
    description = "A sideband signal of a transceiver port, exposed by a CPLD.",
    variants = {
        1, PowerOn, "power_on",
        2, TxFault, "tx_fault",
        3, TxDis, "tx_dis",
        4, PresentReserved, "present_reserved",
        5, RxLos, "rx_los",
        6, Reset, "reset",
        7, LpMode, "lpmode",
        8, ModulePresent, "module_present",
        9, Interrupt, "interrupt",
    },
}

platform_enum! {
    name = Led,
    description = "A chassis or module indicator LED.",
    variants = {
        0, SysFront, "sys_front",
        1, SysRear, "sys_rear",
        2, BmcFront, "bmc_front",
        3, BmcRear, "bmc_rear",
        4, FanFront, "fan_front",
        5, FanRear, "fan_rear",
        6, PsuFront, "psu_front",
        7, PsuRear, "psu_rear",
        8, IdFront, "id_front",
        9, IdRear, "id_rear",
        10, FanModule, "fan_module",
        11, PsuModule, "psu_module",
        12, SlotModule, "slot_module",
    },
}

platform_enum! {
    name = LedColor,
    description = "The user-facing state of an LED.",
    variants = {
        0, Off, "off",
        1, Green, "green",
        2, Yellow, "yellow",
        3, Red, "red",
        4, Blue, "blue",
        5, FlashingGreen, "flashing_green",
        6, FlashingYellow, "flashing_yellow",
        7, FlashingRed, "flashing_red",
    },
}

platform_enum! {
    name = DevInfo,
    description = "An identity field of a device, usually stored in an EEPROM.",
    variants = {
        1, Mac, "mac",
        2, Name, "name",
        3, Sn, "sn",
        4, PwrCons, "pwr_cons",
        5, HwInfo, "hw_info",
        6, DevType, "dev_type",
        7, PartName, "part_name",
        8, PartNumber, "part_number",
        9, FanDirection, "fan_direction",
        10, MaxOutputPower, "max_output_power",
        11, SpeedCal, "speed_cal",
        12, AssetTag, "asset_tag",
        13, Vendor, "vendor",
    },
}

platform_enum! {
    name = PsuSensor,
    description = "A PMBus-derived attribute of a PSU.",
    variants = {
        0, None, "none",
        1, InVol, "in_vol",
        2, InCurr, "in_curr",
        3, InPower, "in_power",
        4, OutVol, "out_vol",
        5, OutCurr, "out_curr",
        6, OutPower, "out_power",
        7, FanSpeed, "fan_speed",
        8, OutMaxPower, "out_max_power",
        9, OutStatus, "out_status",
        10, InStatus, "in_status",
        11, InType, "in_type",
        12, FanRatio, "fan_ratio",
        13, InVolMax, "in_vol_max",
        14, InCurrMax, "in_curr_max",
        15, InVolMin, "in_vol_min",
        16, InCurrMin, "in_curr_min",
        17, OutVolMax, "out_vol_max",
        18, OutCurrMax, "out_curr_max",
        19, OutVolMin, "out_vol_min",
        20, OutCurrMin, "out_curr_min",
        21, FanSpeedMax, "fan_speed_max",
        22, FanSpeedMin, "fan_speed_min",
        23, InPowerMax, "in_power_max",
        24, InPowerMin, "in_power_min",
        25, OutPowerMax, "out_power_max",
        26, OutPowerMin, "out_power_min",
        27, HwStatus, "hw_status",
    },
}

platform_enum! {
    name = WatchdogAttr,
    description = "An attribute of a hardware watchdog.",
    variants = {
        0, Name, "identify",
        1, State, "state",
        2, TimeLeft, "timeleft",
        3, Timeout, "timeout",
        4, Enable, "enable",
    },
}

platform_enum! {
    name = SensorMonitor,
    description = "Whether a sensor is actively monitored.",
    variants = {
        0, No, "no",
        1, Yes, "yes",
    },
}

platform_enum! {
    name = PortPower,
    description = "The power state of a transceiver port.",
    variants = {
        0, Off, "off",
        1, On, "on",
    },
}

platform_enum! {
    name = SensorFormat,
    description = "The wire format of a raw CPLD sensor register.",
    variants = {
        1, Linear11, "linear11",
        2, Linear16, "linear16",
        3, Tmp464, "tmp464",
        4, MacTh5, "mac_th5",
        5, MacTh4, "mac_th4",
    },
}

platform_enum! {
    name = PsuCpldStatus,
    description = "A PSU status signal observed through the CPLD.",
    variants = {
        0, Present, "present",
        1, Output, "output",
        2, Alert, "alert",
        3, Input, "input",
    },
}

platform_enum! {
    name = PsuInputType,
    description = "The input supply type reported by a PSU over PMBus.",
    variants = {
        1, Ac, "ac",
        2, Dc, "dc",
    },
}

impl PsuInputType {
    /// Return the value exposed to users for this input type.
    pub const fn sysfs_value(&self) -> u8 {
        match self {
            PsuInputType::Ac => 1,
            PsuInputType::Dc => 0,
        }
    }
}

/// The rpm calculation a fan uses for its tachometer register.
///
/// Stored in `int_extra1` of the fan speed record.
pub const FAN_SPEED_LINEAR120: i32 = 1;

/// The "alarm" bit reported for a PSU over-temperature condition.
pub const ALARM_TEMP: u32 = 0x1;

/// The "alarm" bit reported for a PSU fan fault.
pub const ALARM_FAN: u32 = 0x2;

/// The "alarm" bit reported for a PSU voltage, current, or power fault.
pub const ALARM_VOLTAGE: u32 = 0x4;
