// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The platform context shared by every driver.

use crate::Bus;
use crate::Config;
use crate::Error;
use crate::LinuxBus;
use crate::Registry;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::MainDev;
use platform_messages::MinorDev;
use slog::debug;
use slog::Logger;
use std::collections::HashSet;
use std::sync::Mutex;

/// A handle to the hardware of one chassis.
///
/// The platform bundles the chassis configuration with the bus used to reach
/// its devices. All entity operations are methods on this type, and take
/// `&self`, so a single platform can be shared between threads. The
/// registry is never modified after construction.
#[derive(Debug)]
pub struct Platform<B: Bus = LinuxBus> {
    pub(crate) registry: Registry,
    pub(crate) bus: B,
    pub(crate) config: Config,
    pub(crate) log: Logger,
    // CPLDs whose access mode has already been reported as defaulted.
    pub(crate) cpld_mode_warned: Mutex<HashSet<(u8, u8)>>,
}

impl Platform<LinuxBus> {
    /// Create a platform which talks to the hardware of the local host.
    pub fn linux(config: Config, registry: Registry, log: Logger) -> Self {
        let bus = LinuxBus::new(&config);
        Self::new(config, registry, bus, log)
    }
}

impl<B: Bus> Platform<B> {
    /// Create a platform from a configuration registry and a bus.
    pub fn new(config: Config, registry: Registry, bus: B, log: Logger) -> Self {
        debug!(
            log,
            "created platform";
            "n_records" => registry.len(),
            "max_rw_len" => config.max_rw_len,
        );
        Self {
            registry,
            bus,
            config,
            log,
            cpld_mode_warned: Mutex::new(HashSet::new()),
        }
    }

    /// Return the configuration registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Return the bus used to reach hardware.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    /// Return the number of devices of a kind.
    pub fn dev_number(&self, main_dev: MainDev, minor_dev: MinorDev) -> Result<i32, Error> {
        let key = Key::new(Item::DevNum, main_dev.into(), minor_dev.into());
        self.registry
            .get_int(key)
            .ok_or(Error::DevNotSupported)
    }

    // Look up a string record, failing as unsupported when it is absent.
    pub(crate) fn config_str(&self, key: Key) -> Result<&str, Error> {
        self.registry.get_str(key).ok_or_else(|| {
            debug!(self.log, "string record not configured"; "key" => %key);
            Error::DevNotSupported
        })
    }

    // Look up an integer record, failing as unsupported when it is absent.
    pub(crate) fn config_int(&self, key: Key) -> Result<i32, Error> {
        self.registry.get_int(key).ok_or_else(|| {
            debug!(self.log, "integer record not configured"; "key" => %key);
            Error::DevNotSupported
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::Platform;
    use crate::bus::mock::MockBus;
    use crate::Config;
    use crate::ConfigBuilder;
    use crate::Registry;
    use platform_messages::InfoCtrl;
    use platform_messages::Item;
    use platform_messages::Key;
    use platform_messages::MainDev;
    use platform_messages::MinorDev;
    use platform_messages::Record;

    /// Return a logger which discards everything.
    pub(crate) fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    /// A registry builder for tests.
    #[derive(Default)]
    pub(crate) struct TestRegistry(pub Registry);

    impl TestRegistry {
        pub fn int(mut self, item: Item, i1: u32, i2: u32, value: i32) -> Self {
            self.0
                .insert(Key::new(item, i1, i2), Record::Int(value))
                .unwrap();
            self
        }

        pub fn str(mut self, item: Item, i1: u32, i2: u32, value: &str) -> Self {
            self.0
                .insert(Key::new(item, i1, i2), Record::Str(value.to_string()))
                .unwrap();
            self
        }

        pub fn i2c(mut self, item: Item, i1: u32, i2: u32, bus: u32, addr: u16) -> Self {
            self.0
                .insert(
                    Key::new(item, i1, i2),
                    Record::I2cDev(platform_messages::I2cDev { bus, addr }),
                )
                .unwrap();
            self
        }

        pub fn info(mut self, item: Item, i1: u32, i2: u32, info: InfoCtrl) -> Self {
            self.0
                .insert(Key::new(item, i1, i2), Record::Info(info))
                .unwrap();
            self
        }

        pub fn build(self) -> Platform<MockBus> {
            self.build_with(Config::default())
        }

        pub fn build_with(self, config: Config) -> Platform<MockBus> {
            Platform::new(config, self.0, MockBus::new(), test_logger())
        }

        pub fn build_with_sysfs_root(self, root: &std::path::Path) -> Platform<MockBus> {
            let config = ConfigBuilder::new().i2c_sysfs_root(root).build().unwrap();
            self.build_with(config)
        }
    }

    #[test]
    fn test_dev_number() {
        let platform = TestRegistry::default()
            .int(Item::DevNum, 1, 0, 6)
            .build();
        assert_eq!(
            platform.dev_number(MainDev::Fan, MinorDev::None).unwrap(),
            6
        );
        assert!(platform
            .dev_number(MainDev::Psu, MinorDev::None)
            .unwrap_err()
            .is_not_supported());
    }
}
