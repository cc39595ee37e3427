// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Raw access to the buses that platform devices hang off.
//!
//! The [`Bus`] trait is the lowest layer of the controller. It performs a
//! single transfer and reports whether it worked; retries, address decoding
//! and length policy all live above it, in [`crate::Platform`].

use crate::Error;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// The largest SMBus block transfer, in bytes.
pub const SMBUS_BLOCK_MAX: usize = 32;

/// Primitive transfers used to reach platform hardware.
///
/// The file operations have default implementations using the host's
/// filesystem, since sysfs attributes are ordinary files.
pub trait Bus: Send + Sync {
    /// Read one byte with an SMBus "read byte data" transfer.
    fn smbus_read_byte(&self, bus: u32, addr: u16, offset: u8) -> Result<u8, Error>;

    /// Write one byte with an SMBus "write byte data" transfer.
    fn smbus_write_byte(&self, bus: u32, addr: u16, offset: u8, value: u8) -> Result<(), Error>;

    /// Read up to [`SMBUS_BLOCK_MAX`] bytes with an I2C block read.
    ///
    /// Returns the number of bytes actually transferred.
    fn smbus_read_block(
        &self,
        bus: u32,
        addr: u16,
        offset: u8,
        buf: &mut [u8],
    ) -> Result<usize, Error>;

    /// Read a byte from an x86 I/O port.
    fn port_read(&self, port: u16) -> Result<u8, Error>;

    /// Write a byte to an x86 I/O port.
    fn port_write(&self, port: u16, value: u8) -> Result<(), Error>;

    /// Read from a file at an offset, returning the number of bytes read.
    ///
    /// A single read is issued, so fewer bytes than requested may be
    /// returned.
    fn file_read(&self, path: &Path, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let mut file = File::open(path).map_err(|e| Error::io(path.display(), e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(path.display(), e))?;
        file.read(buf).map_err(|e| Error::io(path.display(), e))
    }

    /// Write to a file at an offset, syncing it before it is closed.
    fn file_write(&self, path: &Path, offset: u64, data: &[u8]) -> Result<usize, Error> {
        let mut file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| Error::io(path.display(), e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(path.display(), e))?;
        let n = file.write(data).map_err(|e| Error::io(path.display(), e))?;
        file.sync_all().map_err(|e| Error::io(path.display(), e))?;
        Ok(n)
    }

    /// Return the names of the entries in a directory.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, Error> {
        std::fs::read_dir(path)
            .map_err(|e| Error::NoNode(format!("{}: {e}", path.display())))?
            .map(|entry| {
                entry
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .map_err(|e| Error::io(path.display(), e))
            })
            .collect()
    }
}

mod ioctl {
    use nix::ioctl_write_int_bad;
    use nix::ioctl_write_ptr_bad;

    const I2C_SLAVE_FORCE: u16 = 0x0706;
    const I2C_SMBUS: u16 = 0x0720;

    pub const SMBUS_READ: u8 = 1;
    pub const SMBUS_WRITE: u8 = 0;
    pub const SMBUS_BYTE_DATA: u32 = 2;
    pub const SMBUS_I2C_BLOCK_DATA: u32 = 8;

    // Large enough for the kernel's `union i2c_smbus_data`: a length byte,
    // a 32 byte block, and a PEC byte.
    #[repr(C)]
    pub struct SmbusData {
        pub block: [u8; super::SMBUS_BLOCK_MAX + 2],
    }

    #[repr(C)]
    pub struct SmbusIoctlData {
        pub read_write: u8,
        pub command: u8,
        pub size: u32,
        pub data: *mut SmbusData,
    }

    ioctl_write_int_bad!(i2c_slave_force, I2C_SLAVE_FORCE);
    ioctl_write_ptr_bad!(i2c_smbus, I2C_SMBUS, SmbusIoctlData);
}

/// A [`Bus`] using the Linux `i2c-dev` interface and `/dev/port`.
#[derive(Clone, Debug)]
pub struct LinuxBus {
    dev_root: PathBuf,
    port_device: PathBuf,
}

impl LinuxBus {
    pub fn new(config: &crate::Config) -> Self {
        Self {
            dev_root: config.i2c_dev_root.clone(),
            port_device: config.port_device.clone(),
        }
    }

    // Open the adapter for `bus` and bind it to the device at `addr`.
    //
    // The address is forced, since the devices we talk to usually have a
    // kernel driver bound as well.
    fn open_device(&self, bus: u32, addr: u16) -> Result<File, Error> {
        use std::os::fd::AsRawFd;
        let path = self.dev_root.join(format!("i2c-{bus}"));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::io(path.display(), e))?;
        // Safety: the descriptor is open for the duration of the call, and
        // the request takes its argument by value.
        unsafe { ioctl::i2c_slave_force(file.as_raw_fd(), i32::from(addr)) }.map_err(|e| {
            Error::DevFail(format!("{}: bind 0x{addr:02x}: {e}", path.display()))
        })?;
        Ok(file)
    }

    fn smbus(
        &self,
        bus: u32,
        addr: u16,
        read_write: u8,
        command: u8,
        size: u32,
        data: &mut ioctl::SmbusData,
    ) -> Result<(), Error> {
        use std::os::fd::AsRawFd;
        let file = self.open_device(bus, addr)?;
        let args = ioctl::SmbusIoctlData {
            read_write,
            command,
            size,
            data,
        };
        // Safety: `args` and the data it points to outlive the call, and the
        // data buffer is the size the kernel expects.
        unsafe { ioctl::i2c_smbus(file.as_raw_fd(), &args) }.map_err(|e| {
            Error::DevFail(format!(
                "i2c-{bus} 0x{addr:02x} offset 0x{command:02x}: {e}"
            ))
        })?;
        Ok(())
    }
}

impl Bus for LinuxBus {
    fn smbus_read_byte(&self, bus: u32, addr: u16, offset: u8) -> Result<u8, Error> {
        let mut data = ioctl::SmbusData {
            block: [0; SMBUS_BLOCK_MAX + 2],
        };
        self.smbus(
            bus,
            addr,
            ioctl::SMBUS_READ,
            offset,
            ioctl::SMBUS_BYTE_DATA,
            &mut data,
        )?;
        Ok(data.block[0])
    }

    fn smbus_write_byte(&self, bus: u32, addr: u16, offset: u8, value: u8) -> Result<(), Error> {
        let mut data = ioctl::SmbusData {
            block: [0; SMBUS_BLOCK_MAX + 2],
        };
        data.block[0] = value;
        self.smbus(
            bus,
            addr,
            ioctl::SMBUS_WRITE,
            offset,
            ioctl::SMBUS_BYTE_DATA,
            &mut data,
        )
    }

    fn smbus_read_block(
        &self,
        bus: u32,
        addr: u16,
        offset: u8,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        let len = buf.len().min(SMBUS_BLOCK_MAX);
        let mut data = ioctl::SmbusData {
            block: [0; SMBUS_BLOCK_MAX + 2],
        };
        // The requested length goes in the first byte, and the kernel
        // replaces it with the length actually read.
        data.block[0] = len as u8;
        self.smbus(
            bus,
            addr,
            ioctl::SMBUS_READ,
            offset,
            ioctl::SMBUS_I2C_BLOCK_DATA,
            &mut data,
        )?;
        let n = usize::from(data.block[0]).min(len);
        buf[..n].copy_from_slice(&data.block[1..=n]);
        Ok(n)
    }

    fn port_read(&self, port: u16) -> Result<u8, Error> {
        use std::os::unix::fs::FileExt;
        let file = File::open(&self.port_device)
            .map_err(|e| Error::io(self.port_device.display(), e))?;
        let mut byte = [0u8; 1];
        file.read_exact_at(&mut byte, u64::from(port))
            .map_err(|e| Error::io(format_args!("inb 0x{port:04x}"), e))?;
        Ok(byte[0])
    }

    fn port_write(&self, port: u16, value: u8) -> Result<(), Error> {
        use std::os::unix::fs::FileExt;
        let file = OpenOptions::new()
            .write(true)
            .open(&self.port_device)
            .map_err(|e| Error::io(self.port_device.display(), e))?;
        file.write_all_at(&[value], u64::from(port))
            .map_err(|e| Error::io(format_args!("outb 0x{port:04x}"), e))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! An in-memory bus for exercising the controller without hardware.

    use super::Bus;
    use crate::Error;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    /// A write observed by the mock bus.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub enum Transfer {
        Smbus {
            bus: u32,
            addr: u16,
            offset: u8,
            value: u8,
        },
        Port {
            port: u16,
            value: u8,
        },
    }

    /// A bus backed by a map of registers.
    ///
    /// Reads of registers that were never set fail, as if no device were
    /// present. Writes are recorded and update the register map.
    #[derive(Debug, Default)]
    pub struct MockBus {
        registers: Mutex<BTreeMap<(u32, u16, u8), u8>>,
        ports: Mutex<BTreeMap<u16, u8>>,
        writes: Mutex<Vec<Transfer>>,
        failures: AtomicUsize,
        transfers: AtomicUsize,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_byte(&self, bus: u32, addr: u16, offset: u8, value: u8) {
            self.registers
                .lock()
                .unwrap()
                .insert((bus, addr, offset), value);
        }

        pub fn set_bytes(&self, bus: u32, addr: u16, offset: u8, values: &[u8]) {
            for (i, v) in values.iter().enumerate() {
                self.set_byte(bus, addr, offset + i as u8, *v);
            }
        }

        pub fn byte(&self, bus: u32, addr: u16, offset: u8) -> Option<u8> {
            self.registers
                .lock()
                .unwrap()
                .get(&(bus, addr, offset))
                .copied()
        }

        pub fn set_port(&self, port: u16, value: u8) {
            self.ports.lock().unwrap().insert(port, value);
        }

        pub fn port(&self, port: u16) -> Option<u8> {
            self.ports.lock().unwrap().get(&port).copied()
        }

        /// Fail the next `n` transfers of any kind.
        pub fn fail_next(&self, n: usize) {
            self.failures.store(n, Ordering::SeqCst);
        }

        /// Return every write made so far.
        pub fn writes(&self) -> Vec<Transfer> {
            self.writes.lock().unwrap().clone()
        }

        /// Return the number of transfers attempted, including failures.
        pub fn transfers(&self) -> usize {
            self.transfers.load(Ordering::SeqCst)
        }

        fn start(&self) -> Result<(), Error> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::DevFail(String::from("injected failure")));
            }
            Ok(())
        }
    }

    impl Bus for MockBus {
        fn smbus_read_byte(&self, bus: u32, addr: u16, offset: u8) -> Result<u8, Error> {
            self.start()?;
            self.byte(bus, addr, offset)
                .ok_or_else(|| Error::DevFail(format!("no register {bus}-{addr:02x}:{offset:02x}")))
        }

        fn smbus_write_byte(
            &self,
            bus: u32,
            addr: u16,
            offset: u8,
            value: u8,
        ) -> Result<(), Error> {
            self.start()?;
            self.set_byte(bus, addr, offset, value);
            self.writes.lock().unwrap().push(Transfer::Smbus {
                bus,
                addr,
                offset,
                value,
            });
            Ok(())
        }

        fn smbus_read_block(
            &self,
            bus: u32,
            addr: u16,
            offset: u8,
            buf: &mut [u8],
        ) -> Result<usize, Error> {
            self.start()?;
            let mut n = 0;
            for (i, b) in buf.iter_mut().take(super::SMBUS_BLOCK_MAX).enumerate() {
                let Some(reg) = offset.checked_add(i as u8) else {
                    break;
                };
                match self.byte(bus, addr, reg) {
                    Some(v) => *b = v,
                    None => break,
                }
                n += 1;
            }
            if n == 0 {
                return Err(Error::DevFail(format!("no block {bus}-{addr:02x}:{offset:02x}")));
            }
            Ok(n)
        }

        fn port_read(&self, port: u16) -> Result<u8, Error> {
            self.start()?;
            self.port(port)
                .ok_or_else(|| Error::DevFail(format!("no port 0x{port:04x}")))
        }

        fn port_write(&self, port: u16, value: u8) -> Result<(), Error> {
            self.start()?;
            self.set_port(port, value);
            self.writes
                .lock()
                .unwrap()
                .push(Transfer::Port { port, value });
            Ok(())
        }
    }
}
