// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The kernel hardware watchdog.
//!
//! Attributes are read from the watchdog's class directory, which is
//! `watchdogN` under the configured watchdog root. The enable control is an
//! ordinary info-control record.

use super::c_string;
use super::INFO_STRING_MAX;
use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::WatchdogAttr;
use slog::debug;
use std::path::PathBuf;

// Kernel state strings, matched by prefix, and the enable value each means.
const WATCHDOG_STATES: [(&str, i32); 2] = [("inactive", 0), ("active", 1)];

impl<B: Bus> Platform<B> {
    /// Return the kernel device number of the watchdog.
    pub fn watchdog_id(&self) -> Result<u32, Error> {
        let id = self.config_int(Key::new(Item::WatchdogId, 0, 0))?;
        u32::try_from(id).map_err(|_| Error::Type(format!("watchdog id {id}")))
    }

    fn watchdog_path(&self, id: u32, attr: WatchdogAttr) -> Result<PathBuf, Error> {
        let name = self.config_str(Key::new(Item::WatchdogName, id, attr.into()))?;
        Ok(self
            .config
            .watchdog_root
            .join(format!("watchdog{id}"))
            .join(name))
    }

    /// Read an attribute file of the watchdog.
    pub fn watchdog_info(&self, attr: WatchdogAttr) -> Result<String, Error> {
        let id = self.watchdog_id()?;
        let path = self.watchdog_path(id, attr)?;
        let mut buf = [0u8; INFO_STRING_MAX - 1];
        let n = self.file_read(&path, 0, &mut buf).inspect_err(|e| {
            debug!(
                self.unit_log("watchdog"),
                "failed to read watchdog attribute";
                "path" => %path.display(),
                "reason" => %e,
            );
        })?;
        Ok(c_string(&buf[..n]))
    }

    /// Return 1 if the watchdog is enabled, 0 if not.
    pub fn watchdog_enable(&self) -> Result<i32, Error> {
        let id = self.watchdog_id()?;
        self.get_int(
            Key::new(Item::WatchdogDev, id, WatchdogAttr::Enable.into()),
            None,
        )
    }

    pub fn set_watchdog_enable(&self, value: i32) -> Result<(), Error> {
        let id = self.watchdog_id()?;
        self.set_int(
            Key::new(Item::WatchdogDev, id, WatchdogAttr::Enable.into()),
            value,
        )?;
        debug!(
            self.unit_log("watchdog"),
            "set watchdog enable";
            "id" => id,
            "value" => value,
        );
        Ok(())
    }

    /// Return the kernel's state of the watchdog as an enable value.
    pub fn watchdog_state(&self) -> Result<i32, Error> {
        let state = self
            .watchdog_info(WatchdogAttr::State)
            .map_err(|e| Error::DevFail(format!("watchdog state: {e}")))?;
        WATCHDOG_STATES
            .iter()
            .find(|(name, _)| state.starts_with(name))
            .map(|(_, value)| *value)
            .ok_or_else(|| {
                debug!(
                    self.unit_log("watchdog"),
                    "unknown watchdog state";
                    "state" => state.trim_end(),
                );
                Error::DevFail(format!("unknown watchdog state {:?}", state.trim_end()))
            })
    }
}
