// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! A configuration-driven hardware abstraction for switch platforms.
//!
//! The hardware of a chassis is described entirely by a [`Registry`] of
//! keyed records. A [`Platform`] pairs that registry with a [`Bus`] and
//! evaluates records into reads and writes of CPLD registers, I2C devices,
//! and files. The entity drivers build on that to expose fans, PSUs,
//! sensors, LEDs, transceiver ports, CPLDs, FPGAs, slots, EEPROMs, and the
//! watchdog, and the [`surface`] turns driver results into attribute text.

mod adapter;
mod bus;
mod config;
pub mod drivers;
mod error;
mod info;
mod platform;
mod registry;
pub mod surface;

pub use adapter::CpldAccess;
pub use bus::Bus;
pub use bus::LinuxBus;
pub use bus::SMBUS_BLOCK_MAX;
pub use config::*;
pub use drivers::fan::FanEepromMode;
pub use drivers::psu::PsuFruMode;
pub use error::Error;
pub use info::BufDecoder;
pub use info::IntDecoder;
pub use info::Reading;
pub use info::HWMON_DIR_PREFIX;
pub use platform::Platform;
pub use registry::key_to_name;
pub use registry::Registry;
pub use surface::Attribute;
