// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Configuration of the platform controller.

use crate::Error;
use std::path::PathBuf;
use std::time::Duration;

/// The number of attempts made for an SMBus transfer.
pub const RETRY_TIMES: usize = 5;

/// The pause between attempts at an SMBus transfer.
pub const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Return the default directory holding I2C device sysfs nodes.
pub fn default_i2c_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/bus/i2c/devices")
}

/// Return the default directory holding `i2c-N` character devices.
pub fn default_i2c_dev_root() -> PathBuf {
    PathBuf::from("/dev")
}

/// Return the default device used for x86 port I/O.
pub fn default_port_device() -> PathBuf {
    PathBuf::from("/dev/port")
}

/// Return the default directory holding watchdog device nodes.
pub fn default_watchdog_root() -> PathBuf {
    PathBuf::from("/sys/class/watchdog")
}

/// Return the default limit on a single file read or write.
pub const fn default_max_rw_len() -> usize {
    4096
}

/// Configuration for a [`crate::Platform`].
///
/// The [`ConfigBuilder`] can be used to construct this with defaults that
/// match a standard Linux host.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(any(feature = "api-traits", test), derive(schemars::JsonSchema))]
pub struct Config {
    /// Directory of I2C devices, used to read EEPROMs through a driver's
    /// sysfs attribute at `{root}/{bus}-{addr:04x}/{name}`.
    pub i2c_sysfs_root: PathBuf,

    /// Directory containing the `i2c-N` character devices.
    pub i2c_dev_root: PathBuf,

    /// The device used for LPC `inb`/`outb`.
    pub port_device: PathBuf,

    /// Directory of watchdog devices, each at `{root}/watchdogN`.
    pub watchdog_root: PathBuf,

    /// The maximum number of bytes moved by one file read or write.
    pub max_rw_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            i2c_sysfs_root: default_i2c_sysfs_root(),
            i2c_dev_root: default_i2c_dev_root(),
            port_device: default_port_device(),
            watchdog_root: default_watchdog_root(),
            max_rw_len: default_max_rw_len(),
        }
    }
}

/// A builder interface for generating controller configuration.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    i2c_sysfs_root: Option<PathBuf>,
    i2c_dev_root: Option<PathBuf>,
    port_device: Option<PathBuf>,
    watchdog_root: Option<PathBuf>,
    max_rw_len: Option<usize>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory of I2C device sysfs nodes.
    pub fn i2c_sysfs_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.i2c_sysfs_root = Some(path.into());
        self
    }

    /// Set the directory containing `i2c-N` character devices.
    pub fn i2c_dev_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.i2c_dev_root = Some(path.into());
        self
    }

    /// Set the device used for port I/O.
    pub fn port_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.port_device = Some(path.into());
        self
    }

    /// Set the directory of watchdog devices.
    pub fn watchdog_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.watchdog_root = Some(path.into());
        self
    }

    /// Set the largest single file read or write.
    pub fn max_rw_len(mut self, len: usize) -> Self {
        self.max_rw_len = Some(len);
        self
    }

    /// Build a `Config` from `self`.
    pub fn build(self) -> Result<Config, Error> {
        let max_rw_len = self.max_rw_len.unwrap_or_else(default_max_rw_len);
        if max_rw_len == 0 {
            return Err(Error::InvalidValue(String::from(
                "max_rw_len must be nonzero",
            )));
        }
        Ok(Config {
            i2c_sysfs_root: self.i2c_sysfs_root.unwrap_or_else(default_i2c_sysfs_root),
            i2c_dev_root: self.i2c_dev_root.unwrap_or_else(default_i2c_dev_root),
            port_device: self.port_device.unwrap_or_else(default_port_device),
            watchdog_root: self.watchdog_root.unwrap_or_else(default_watchdog_root),
            max_rw_len,
        })
    }
}
