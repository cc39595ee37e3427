// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Evaluate info-control records.
//!
//! An info-control record describes where the raw bytes of a value live, and
//! how to turn them into an integer or a buffer. Most entity attributes are a
//! single evaluation of one record.

use crate::Bus;
use crate::Error;
use crate::Platform;
use platform_decode::hwmon::HwmonScale;
use platform_decode::raw::decode_bits;
use platform_decode::raw::decode_int;
use platform_decode::raw::decode_num_str;
use platform_decode::raw::encode_bits;
use platform_decode::sensor;
use platform_decode::sensor::VoltageCoding;
use platform_messages::Format;
use platform_messages::InfoCtrl;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::Mode;
use platform_messages::RecordKind;
use platform_messages::Source;
use slog::debug;
use slog::trace;
use std::path::Path;

/// The directory name prefix of a hwmon device.
pub const HWMON_DIR_PREFIX: &str = "hwmon";

/// A function turning raw bytes into an integer.
pub type IntDecoder<'a> = &'a dyn Fn(&[u8]) -> Result<i32, Error>;

/// A function turning raw bytes into a new buffer.
pub type BufDecoder<'a> = &'a dyn Fn(&[u8]) -> Result<Vec<u8>, Error>;

/// The result of evaluating an integer record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reading {
    /// The decoded value.
    Int(i32),
    /// The value is stored in a TLV EEPROM, which the caller must parse.
    Tlv,
}

fn check_info_key(key: Key) -> Result<(), Error> {
    match key.item() {
        Ok(item) if item.kind() == RecordKind::Info => Ok(()),
        _ => Err(Error::IndexInvalid),
    }
}

impl<B: Bus> Platform<B> {
    fn info(&self, key: Key) -> Result<&InfoCtrl, Error> {
        check_info_key(key)?;
        self.registry.get_info(key).ok_or_else(|| {
            debug!(self.log, "info-control record not configured"; "key" => %key);
            Error::DevNotSupported
        })
    }

    // Read raw bytes for a record, returning the number of bytes read.
    //
    // `path` replaces the record's file path when provided.
    fn read_source(
        &self,
        info: &InfoCtrl,
        path: Option<&Path>,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        match info.src {
            Source::Cpld => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = self.cpld_read(info.addr.wrapping_add(i as u32))?;
                }
                Ok(buf.len())
            }
            Source::OtherI2c => {
                self.other_i2c_read(info.addr, buf)?;
                Ok(buf.len())
            }
            Source::File => {
                let path = path.unwrap_or_else(|| Path::new(&info.fpath));
                self.file_read(path, u64::from(info.addr), buf)
            }
            Source::Fpga => Err(Error::DevFail(String::from(
                "reading records from an FPGA source is not supported",
            ))),
            Source::None => Err(Error::DevFail(String::from("record has no source"))),
        }
    }

    fn write_source(&self, info: &InfoCtrl, data: &[u8]) -> Result<(), Error> {
        match info.src {
            Source::Cpld => {
                for (i, byte) in data.iter().enumerate() {
                    self.cpld_write(info.addr.wrapping_add(i as u32), *byte)?;
                }
                Ok(())
            }
            Source::File => {
                let n = self.file_write(Path::new(&info.fpath), u64::from(info.addr), data)?;
                if n < data.len() {
                    return Err(Error::DevFail(format!(
                        "{}: short write of {n} bytes",
                        info.fpath
                    )));
                }
                Ok(())
            }
            Source::Fpga | Source::OtherI2c => Err(Error::DevNotSupported),
            Source::None => Err(Error::DevFail(String::from("record has no source"))),
        }
    }

    // Evaluate an integer record that has already been looked up.
    pub(crate) fn eval_int(
        &self,
        info: &InfoCtrl,
        pfun: Option<IntDecoder<'_>>,
    ) -> Result<Reading, Error> {
        match info.mode {
            Mode::Constant => return Ok(Reading::Int(info.int_cons)),
            Mode::Tlv => return Ok(Reading::Tlv),
            _ => {}
        }

        let n_bytes = match info.frmt {
            Format::Bit => {
                if !info.bit_offset_valid() {
                    return Err(Error::Type(format!(
                        "bit offset {} out of range",
                        info.bit_offset
                    )));
                }
                1
            }
            Format::Byte | Format::NumBytes | Format::NumStr | Format::NumBuf => {
                if !info.int_len_valid() {
                    return Err(Error::Type(format!("invalid integer length {}", info.len)));
                }
                info.len
            }
            other => return Err(Error::Type(format!("format {other:?} is not an integer"))),
        };

        let mut buf = vec![0u8; n_bytes];
        let n_read = match self.read_source(info, None, &mut buf) {
            Ok(0) => Err(Error::DevFail(String::from("no data"))),
            Ok(n) => Ok(n),
            Err(e @ Error::DevNotSupported) => Err(e),
            Err(e) => Err(Error::DevFail(e.to_string())),
        }?;

        let value = match info.frmt {
            Format::Bit => {
                let bits = decode_bits(buf[0], info.pola, info.bit_offset, info.len)?;
                match pfun {
                    Some(f) => f(&[bits])?,
                    None => i32::from(bits),
                }
            }
            Format::Byte | Format::NumBytes => decode_int(&buf, info.pola),
            Format::NumStr => decode_num_str(&buf[..n_read])?,
            _ => {
                let f = pfun.ok_or(Error::IndexInvalid)?;
                f(&buf[..n_read])?
            }
        };
        trace!(
            self.log,
            "read integer record";
            "src" => ?info.src,
            "frmt" => ?info.frmt,
            "addr" => format!("{:#x}", info.addr),
            "value" => value,
        );
        Ok(Reading::Int(value))
    }

    /// Evaluate the integer record at `key`.
    ///
    /// `pfun` converts the raw bytes of bit-field and buffer-number formats.
    pub fn get_reading(&self, key: Key, pfun: Option<IntDecoder<'_>>) -> Result<Reading, Error> {
        let info = self.info(key)?;
        self.eval_int(info, pfun).inspect_err(|e| {
            debug!(self.log, "failed to read integer record"; "key" => %key, "reason" => %e);
        })
    }

    /// Evaluate the integer record at `key`, which must not be TLV-backed.
    pub fn get_int(&self, key: Key, pfun: Option<IntDecoder<'_>>) -> Result<i32, Error> {
        match self.get_reading(key, pfun)? {
            Reading::Int(x) => Ok(x),
            Reading::Tlv => Err(Error::ModeNotSupported),
        }
    }

    fn eval_buf(
        &self,
        info: &InfoCtrl,
        path: Option<&Path>,
        pfun: Option<BufDecoder<'_>>,
    ) -> Result<Vec<u8>, Error> {
        if info.frmt != Format::Buf || !info.buf_len_valid() {
            return Err(Error::Type(format!(
                "format {:?} with length {} is not a buffer",
                info.frmt, info.len
            )));
        }
        let mut buf = vec![0u8; info.len];
        let n = match self.read_source(info, path, &mut buf) {
            Ok(0) => Err(Error::DevFail(String::from("no data"))),
            Ok(n) => Ok(n),
            Err(e) => Err(Error::DevFail(e.to_string())),
        }?;
        buf.truncate(n);
        match pfun {
            Some(f) => f(&buf).map_err(|e| Error::DevFail(e.to_string())),
            None => Ok(buf),
        }
    }

    /// Read the buffer record at `key`.
    pub fn get_buf(&self, key: Key, pfun: Option<BufDecoder<'_>>) -> Result<Vec<u8>, Error> {
        let info = self.info(key)?;
        if info.mode != Mode::Config {
            return Err(Error::Type(format!("mode {:?} cannot produce a buffer", info.mode)));
        }
        self.eval_buf(info, None, pfun).inspect_err(|e| {
            debug!(self.log, "failed to read buffer record"; "key" => %key, "reason" => %e);
        })
    }

    /// Write an integer through the record at `key`.
    ///
    /// A single byte is written, except for decimal-string records which
    /// write their configured string.
    pub fn set_int(&self, key: Key, value: i32) -> Result<(), Error> {
        let info = self.info(key)?;
        if info.mode != Mode::Config {
            return Err(Error::Type(format!("mode {:?} cannot be written", info.mode)));
        }

        let payload = match info.frmt {
            Format::Bit => {
                if !info.bit_offset_valid() {
                    return Err(Error::Type(format!(
                        "bit offset {} out of range",
                        info.bit_offset
                    )));
                }
                let write = encode_bits(value, info.pola, info.bit_offset, info.len)?;
                if write.is_full() {
                    vec![write.value]
                } else {
                    let mut current = [0u8; 1];
                    match self.read_source(info, None, &mut current) {
                        Ok(n) if n > 0 => {}
                        Ok(_) => return Err(Error::DevFail(String::from("no data"))),
                        Err(e) => return Err(Error::DevFail(e.to_string())),
                    }
                    vec![write.merge(current[0])]
                }
            }
            Format::Byte | Format::NumBytes | Format::NumBuf => {
                if !info.int_len_valid() {
                    return Err(Error::Type(format!("invalid integer length {}", info.len)));
                }
                vec![(value & 0xff) as u8]
            }
            Format::NumStr => {
                if info.str_cons.is_empty() {
                    return Err(Error::InvalidValue(format!(
                        "{key} has no string to write"
                    )));
                }
                info.str_cons.as_bytes().to_vec()
            }
            other => return Err(Error::Type(format!("format {other:?} cannot be written"))),
        };

        match self.write_source(info, &payload) {
            Ok(()) => {}
            Err(e @ Error::DevNotSupported) => return Err(e),
            Err(e) => return Err(Error::DevFail(e.to_string())),
        }
        debug!(
            self.log,
            "wrote integer record";
            "key" => %key,
            "value" => value,
        );
        Ok(())
    }

    // Read a value from the hwmon device found below the record's path.
    fn hwmon_buf(&self, info: &InfoCtrl) -> Result<String, Error> {
        if info.frmt != Format::Buf || !info.buf_len_valid() {
            return Err(Error::Type(format!(
                "format {:?} with length {} is not a buffer",
                info.frmt, info.len
            )));
        }
        let dir = Path::new(&info.fpath);
        let child = self
            .bus
            .list_dir(dir)
            .ok()
            .and_then(|names| names.into_iter().find(|n| n.starts_with(HWMON_DIR_PREFIX)))
            .ok_or_else(|| {
                Error::NoNode(format!("no {HWMON_DIR_PREFIX} directory in {}", info.fpath))
            })?;
        let path = dir.join(child).join(&info.str_cons);
        trace!(self.log, "resolved hwmon path"; "path" => %path.display());

        let scale = HwmonScale {
            exponent: info.int_cons,
            decimal: info.bit_offset,
            coefficient: if info.int_extra1 == 0 { 1 } else { info.int_extra1 },
            addend: info.int_extra2,
        };
        let format = |raw: &[u8]| -> Result<Vec<u8>, Error> {
            Ok(scale.format(raw).into_bytes())
        };
        let out = self.eval_buf(info, Some(&path), Some(&format))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn cpld_voltage(&self, info: &InfoCtrl) -> Result<u32, Error> {
        let k = info.int_extra2 as u32;
        let raw = self.eval_int(info, None)?;
        let Reading::Int(raw) = raw else {
            return Err(Error::ModeNotSupported);
        };
        let raw = raw as u32;
        let coding = VoltageCoding::from_selector(info.int_extra3);
        let code = coding.code(raw);
        let value = match coding {
            VoltageCoding::Mode2 => sensor::voltage_mode2(code, k),
            VoltageCoding::Mode1 if info.addr == info.int_extra1 as u32 => {
                sensor::voltage_mode1_reference(code, k)
            }
            VoltageCoding::Mode1 => {
                let reference = InfoCtrl {
                    addr: info.int_extra1 as u32,
                    ..info.clone()
                };
                let Reading::Int(reference_raw) = self.eval_int(&reference, None)? else {
                    return Err(Error::ModeNotSupported);
                };
                sensor::voltage_mode1_normalized(code, reference_raw as u32, k)?
            }
        };
        trace!(
            self.log,
            "decoded CPLD voltage";
            "raw" => format!("{raw:#x}"),
            "coding" => ?coding,
            "value" => value,
        );
        Ok(value)
    }

    fn cpld_temperature(&self, key: Key, info: &InfoCtrl) -> Result<i64, Error> {
        let Reading::Int(raw) = self.eval_int(info, None)? else {
            return Err(Error::ModeNotSupported);
        };
        let is_power = key.item().ok() == Some(Item::HwmonPower);
        let value = sensor::cpld_temperature(raw, info.int_extra1, is_power);
        if value == sensor::TEMP_INVALID {
            debug!(
                self.log,
                "temperature out of range";
                "key" => %key,
                "raw" => raw,
            );
        }
        Ok(value)
    }

    /// Read a sensor attribute as newline-terminated text.
    ///
    /// Values read from hwmon files are rescaled with the exponent, decimal
    /// places, coefficient, and addend carried by the record. Voltage and
    /// temperature registers in a CPLD are decoded with their configured
    /// coding.
    pub fn get_sensor(&self, key: Key) -> Result<String, Error> {
        if check_info_key(key).is_err() {
            return Err(Error::InvalidValue(format!("{key} is not an info-control key")));
        }
        let info = self.info(key)?;
        match info.mode {
            Mode::StrConstant => return Ok(format!("{}\n", info.str_cons)),
            Mode::Constant => return Ok(format!("{}\n", info.int_cons)),
            _ => {}
        }

        if info.mode == Mode::Config && info.src == Source::File {
            let res = if info.fpath.contains(HWMON_DIR_PREFIX) {
                self.hwmon_buf(info)
            } else {
                self.get_buf(key, None)
                    .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            };
            return res.inspect_err(|e| {
                debug!(self.log, "failed to read sensor file"; "key" => %key, "reason" => %e);
            });
        }

        let item = key.item()?;
        match (item, info.src) {
            (Item::HwmonIn, Source::Cpld) => {
                let value = self.cpld_voltage(info).map_err(|e| {
                    debug!(self.log, "failed to read CPLD voltage"; "key" => %key, "reason" => %e);
                    Error::DevNotSupported
                })?;
                let scale = HwmonScale {
                    exponent: info.int_cons,
                    decimal: info.bit_offset,
                    coefficient: 1,
                    addend: 0,
                };
                Ok(scale.format(format!("{value}\n").as_bytes()))
            }
            (Item::HwmonTemp, Source::Cpld) => {
                let value = self.cpld_temperature(key, info).map_err(|e| {
                    debug!(
                        self.log,
                        "failed to read CPLD temperature";
                        "key" => %key,
                        "reason" => %e,
                    );
                    Error::DevNotSupported
                })?;
                Ok(format!("{value}\n"))
            }
            _ => {
                debug!(self.log, "no way to read sensor"; "key" => %key, "src" => ?info.src);
                Err(Error::ModeNotSupported)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Reading;
    use crate::platform::tests::TestRegistry;
    use crate::Error;
    use platform_messages::Format;
    use platform_messages::InfoCtrl;
    use platform_messages::Item;
    use platform_messages::Key;
    use platform_messages::Mode;
    use platform_messages::Polarity;
    use platform_messages::Source;

    fn cpld(addr: u32, frmt: Format, len: usize) -> InfoCtrl {
        InfoCtrl {
            mode: Mode::Config,
            src: Source::Cpld,
            frmt,
            pola: Polarity::Positive,
            addr,
            len,
            ..Default::default()
        }
    }

    fn file(path: &std::path::Path, frmt: Format, len: usize) -> InfoCtrl {
        InfoCtrl {
            mode: Mode::Config,
            src: Source::File,
            frmt,
            fpath: path.display().to_string(),
            len,
            ..Default::default()
        }
    }

    #[test]
    fn test_constant_never_touches_bus() {
        let platform = TestRegistry::default()
            .info(
                Item::FanSpeed,
                1,
                1,
                InfoCtrl {
                    mode: Mode::Constant,
                    int_cons: -17,
                    src: Source::Cpld,
                    ..Default::default()
                },
            )
            .build();
        let key = Key::new(Item::FanSpeed, 1, 1);
        assert_eq!(platform.get_int(key, None).unwrap(), -17);
        assert_eq!(platform.bus().transfers(), 0);
    }

    #[test]
    fn test_tlv_mode_is_reported() {
        let platform = TestRegistry::default()
            .info(
                Item::HwmonPsu,
                1,
                1,
                InfoCtrl {
                    mode: Mode::Tlv,
                    ..Default::default()
                },
            )
            .build();
        let key = Key::new(Item::HwmonPsu, 1, 1);
        assert_eq!(platform.get_reading(key, None).unwrap(), Reading::Tlv);
        assert!(matches!(
            platform.get_int(key, None),
            Err(Error::ModeNotSupported)
        ));
    }

    #[test]
    fn test_missing_and_non_info_keys() {
        let platform = TestRegistry::default().build();
        assert!(platform
            .get_int(Key::new(Item::FanRatio, 1, 0), None)
            .unwrap_err()
            .is_not_supported());
        assert!(matches!(
            platform.get_int(Key::new(Item::DevNum, 1, 0), None),
            Err(Error::IndexInvalid)
        ));
        assert!(matches!(
            platform.get_sensor(Key::new(Item::CpldName, 0, 0)),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn test_bit_decode_matches_shift_and_mask() {
        for raw in [0x00u8, 0x5a, 0xa5, 0xff, 0x13] {
            for pola in [Polarity::Positive, Polarity::Negative] {
                for offset in 0..8u8 {
                    for len in 1..=3usize {
                        let platform = TestRegistry::default()
                            .i2c(Item::CpldI2cDev, 0, 0, 1, 0x30)
                            .info(
                                Item::DevPresentStatus,
                                1,
                                1,
                                InfoCtrl {
                                    pola,
                                    bit_offset: offset,
                                    ..cpld(0x10, Format::Bit, len)
                                },
                            )
                            .build();
                        platform.bus().set_byte(1, 0x30, 0x10, raw);
                        let byte = if pola == Polarity::Negative { !raw } else { raw };
                        let expected = (byte >> offset) & ((1u8 << len) - 1);
                        let key = Key::new(Item::DevPresentStatus, 1, 1);
                        assert_eq!(
                            platform.get_int(key, None).unwrap(),
                            i32::from(expected)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_bit_decode_with_pfun() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 1, 0x30)
            .info(
                Item::DevPresentStatus,
                1,
                1,
                InfoCtrl {
                    bit_offset: 4,
                    ..cpld(0x10, Format::Bit, 1)
                },
            )
            .build();
        platform.bus().set_byte(1, 0x30, 0x10, 0x10);
        let invert = |b: &[u8]| -> Result<i32, Error> { Ok(i32::from(b[0] == 0)) };
        let key = Key::new(Item::DevPresentStatus, 1, 1);
        assert_eq!(platform.get_int(key, Some(&invert)).unwrap(), 0);
    }

    #[test]
    fn test_byte_decode_polarity() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 1, 0x30)
            .info(Item::FanSpeed, 1, 1, cpld(0x20, Format::Byte, 2))
            .info(
                Item::FanSpeed,
                1,
                2,
                InfoCtrl {
                    pola: Polarity::Negative,
                    ..cpld(0x20, Format::NumBytes, 2)
                },
            )
            .build();
        platform.bus().set_bytes(1, 0x30, 0x20, &[0x3a, 0x98]);
        assert_eq!(
            platform.get_int(Key::new(Item::FanSpeed, 1, 1), None).unwrap(),
            0x3a98
        );
        assert_eq!(
            platform.get_int(Key::new(Item::FanSpeed, 1, 2), None).unwrap(),
            0x983a
        );
    }

    #[test]
    fn test_length_and_offset_validation() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 1, 0x30)
            .info(Item::FanSpeed, 1, 1, cpld(0x20, Format::Byte, 32))
            .info(Item::FanSpeed, 1, 2, cpld(0x20, Format::Byte, 0))
            .info(
                Item::FanSpeed,
                1,
                3,
                InfoCtrl {
                    bit_offset: 8,
                    ..cpld(0x20, Format::Bit, 1)
                },
            )
            .info(Item::FanSpeed, 1, 4, cpld(0x20, Format::Buf, 4))
            .build();
        for i in 1..=4 {
            assert!(
                matches!(
                    platform.get_int(Key::new(Item::FanSpeed, 1, i), None),
                    Err(Error::Type(_))
                ),
                "record {i}"
            );
        }
        assert_eq!(platform.bus().transfers(), 0);
    }

    #[test]
    fn test_num_buf_requires_pfun() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 1, 0x30)
            .info(Item::FanSpeed, 1, 1, cpld(0x20, Format::NumBuf, 2))
            .build();
        platform.bus().set_bytes(1, 0x30, 0x20, &[1, 2]);
        let key = Key::new(Item::FanSpeed, 1, 1);
        assert!(matches!(
            platform.get_int(key, None),
            Err(Error::IndexInvalid)
        ));
        let sum = |b: &[u8]| -> Result<i32, Error> { Ok(b.iter().map(|x| i32::from(*x)).sum()) };
        assert_eq!(platform.get_int(key, Some(&sum)).unwrap(), 3);
    }

    #[test]
    fn test_num_str_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");
        std::fs::write(&path, b"-1234\n").unwrap();
        let platform = TestRegistry::default()
            .info(Item::PsuPmbusReg, 1, 0, file(&path, Format::NumStr, 16))
            .build();
        assert_eq!(
            platform
                .get_int(Key::new(Item::PsuPmbusReg, 1, 0), None)
                .unwrap(),
            -1234
        );
    }

    #[test]
    fn test_read_failure_is_dev_fail() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 1, 0x30)
            .info(Item::FanSpeed, 1, 1, cpld(0x20, Format::Byte, 1))
            .info(
                Item::FanSpeed,
                1,
                2,
                InfoCtrl {
                    src: Source::Fpga,
                    ..cpld(0x20, Format::Byte, 1)
                },
            )
            .build();
        assert!(matches!(
            platform.get_int(Key::new(Item::FanSpeed, 1, 1), None),
            Err(Error::DevFail(_))
        ));
        assert!(matches!(
            platform.get_int(Key::new(Item::FanSpeed, 1, 2), None),
            Err(Error::DevFail(_))
        ));
    }

    #[test]
    fn test_get_buf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blackbox");
        std::fs::write(&path, b"abc").unwrap();
        let platform = TestRegistry::default()
            .info(Item::HwmonPsu, 1, 1, file(&path, Format::Buf, 64))
            .info(Item::HwmonPsu, 1, 2, file(&path, Format::Byte, 4))
            .info(
                Item::HwmonPsu,
                1,
                3,
                InfoCtrl {
                    mode: Mode::Constant,
                    ..file(&path, Format::Buf, 4)
                },
            )
            .build();
        assert_eq!(
            platform
                .get_buf(Key::new(Item::HwmonPsu, 1, 1), None)
                .unwrap(),
            b"abc"
        );
        let upper = |b: &[u8]| -> Result<Vec<u8>, Error> { Ok(b.to_ascii_uppercase()) };
        assert_eq!(
            platform
                .get_buf(Key::new(Item::HwmonPsu, 1, 1), Some(&upper))
                .unwrap(),
            b"ABC"
        );
        let fail = |_: &[u8]| -> Result<Vec<u8>, Error> { Err(Error::InvalidValue(String::from("nope"))) };
        assert!(matches!(
            platform.get_buf(Key::new(Item::HwmonPsu, 1, 1), Some(&fail)),
            Err(Error::DevFail(_))
        ));
        assert!(matches!(
            platform.get_buf(Key::new(Item::HwmonPsu, 1, 2), None),
            Err(Error::Type(_))
        ));
        assert!(matches!(
            platform.get_buf(Key::new(Item::HwmonPsu, 1, 3), None),
            Err(Error::Type(_))
        ));
    }

    #[test]
    fn test_set_int_byte() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x33)
            .info(Item::FanRatio, 1, 0, cpld(0x20, Format::Byte, 1))
            .build();
        platform
            .set_int(Key::new(Item::FanRatio, 1, 0), 0x199)
            .unwrap();
        assert_eq!(platform.bus().byte(2, 0x33, 0x20), Some(0x99));
    }

    #[test]
    fn test_set_int_num_bytes() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x33)
            .info(Item::FanRatio, 1, 0, cpld(0x20, Format::NumBytes, 1))
            .build();
        let key = Key::new(Item::FanRatio, 1, 0);
        platform.set_int(key, 0x99).unwrap();
        assert_eq!(platform.bus().byte(2, 0x33, 0x20), Some(0x99));
        assert_eq!(platform.get_int(key, None).unwrap(), 0x99);
    }

    #[test]
    fn test_set_int_bit_read_modify_write() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 2, 0x33)
            .info(
                Item::SffCpldReg,
                1,
                3,
                InfoCtrl {
                    bit_offset: 2,
                    ..cpld(0x40, Format::Bit, 1)
                },
            )
            .info(
                Item::SffCpldReg,
                2,
                3,
                InfoCtrl {
                    pola: Polarity::Negative,
                    bit_offset: 2,
                    ..cpld(0x41, Format::Bit, 1)
                },
            )
            .build();
        platform.bus().set_byte(2, 0x33, 0x40, 0xf0);
        platform.bus().set_byte(2, 0x33, 0x41, 0xff);
        platform
            .set_int(Key::new(Item::SffCpldReg, 1, 3), 1)
            .unwrap();
        assert_eq!(platform.bus().byte(2, 0x33, 0x40), Some(0xf4));
        platform
            .set_int(Key::new(Item::SffCpldReg, 2, 3), 1)
            .unwrap();
        assert_eq!(platform.bus().byte(2, 0x33, 0x41), Some(0xfb));
        assert_eq!(
            platform
                .get_int(Key::new(Item::SffCpldReg, 2, 3), None)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_set_int_rejections() {
        let platform = TestRegistry::default()
            .info(
                Item::FanRatio,
                1,
                0,
                InfoCtrl {
                    src: Source::OtherI2c,
                    ..cpld(0x20, Format::Byte, 1)
                },
            )
            .info(
                Item::FanRatio,
                2,
                0,
                InfoCtrl {
                    mode: Mode::Constant,
                    ..cpld(0x20, Format::Byte, 1)
                },
            )
            .info(Item::FanRatio, 3, 0, cpld(0x20, Format::NumStr, 1))
            .info(Item::FanRatio, 4, 0, cpld(0x20, Format::Buf, 1))
            .build();
        assert!(platform
            .set_int(Key::new(Item::FanRatio, 1, 0), 1)
            .unwrap_err()
            .is_not_supported());
        assert!(matches!(
            platform.set_int(Key::new(Item::FanRatio, 2, 0), 1),
            Err(Error::Type(_))
        ));
        assert!(matches!(
            platform.set_int(Key::new(Item::FanRatio, 3, 0), 1),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(
            platform.set_int(Key::new(Item::FanRatio, 4, 0), 1),
            Err(Error::Type(_))
        ));
        assert!(platform
            .set_int(Key::new(Item::FanRatio, 5, 0), 1)
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn test_set_int_num_str_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clear");
        std::fs::write(&path, b"").unwrap();
        let platform = TestRegistry::default()
            .info(
                Item::WatchdogDev,
                0,
                4,
                InfoCtrl {
                    str_cons: String::from("1"),
                    ..file(&path, Format::NumStr, 4)
                },
            )
            .build();
        platform
            .set_int(Key::new(Item::WatchdogDev, 0, 4), 0)
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"1");
    }

    #[test]
    fn test_sensor_hwmon_formatted() {
        let dir = tempfile::tempdir().unwrap();
        let hwmon = dir.path().join("3-004c").join("hwmon");
        std::fs::create_dir_all(hwmon.join("hwmon2")).unwrap();
        std::fs::write(hwmon.join("hwmon2").join("temp1_input"), b"45123\n").unwrap();

        let info = InfoCtrl {
            int_cons: 3,
            bit_offset: 1,
            str_cons: String::from("temp1_input"),
            ..file(&hwmon, Format::Buf, 8)
        };
        let platform = TestRegistry::default()
            .info(Item::HwmonTemp, 1, 0, info.clone())
            .info(
                Item::HwmonTemp,
                2,
                0,
                InfoCtrl {
                    int_extra1: 2,
                    int_extra2: 1000,
                    ..info.clone()
                },
            )
            .info(
                Item::HwmonTemp,
                3,
                0,
                InfoCtrl {
                    str_cons: String::from("temp9_input"),
                    ..info
                },
            )
            .build();
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonTemp, 1, 0)).unwrap(),
            "45.1\n"
        );
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonTemp, 2, 0)).unwrap(),
            "92.2\n"
        );
        assert!(matches!(
            platform.get_sensor(Key::new(Item::HwmonTemp, 3, 0)),
            Err(Error::DevFail(_))
        ));
    }

    #[test]
    fn test_sensor_hwmon_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let hwmon = dir.path().join("hwmon");
        std::fs::create_dir_all(hwmon.join("device")).unwrap();
        let platform = TestRegistry::default()
            .info(Item::HwmonIn, 1, 0, file(&hwmon, Format::Buf, 8))
            .build();
        assert!(matches!(
            platform.get_sensor(Key::new(Item::HwmonIn, 1, 0)),
            Err(Error::NoNode(_))
        ));
    }

    #[test]
    fn test_sensor_constants_and_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alias");
        std::fs::write(&path, b"CPU\n").unwrap();
        let platform = TestRegistry::default()
            .info(
                Item::HwmonTemp,
                1,
                1,
                InfoCtrl {
                    mode: Mode::StrConstant,
                    str_cons: String::from("inlet"),
                    ..Default::default()
                },
            )
            .info(
                Item::HwmonTemp,
                1,
                3,
                InfoCtrl {
                    mode: Mode::Constant,
                    int_cons: 80000,
                    ..Default::default()
                },
            )
            .info(Item::HwmonTemp, 1, 4, file(&path, Format::Buf, 16))
            .info(Item::HwmonCurr, 1, 0, cpld(0x10, Format::Byte, 1))
            .build();
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonTemp, 1, 1)).unwrap(),
            "inlet\n"
        );
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonTemp, 1, 3)).unwrap(),
            "80000\n"
        );
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonTemp, 1, 4)).unwrap(),
            "CPU\n"
        );
        assert!(matches!(
            platform.get_sensor(Key::new(Item::HwmonCurr, 1, 0)),
            Err(Error::ModeNotSupported)
        ));
    }

    #[test]
    fn test_sensor_cpld_voltage() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 1, 0x30)
            // Mode 2 at 0x10.
            .info(
                Item::HwmonIn,
                1,
                0,
                InfoCtrl {
                    int_extra2: 1000,
                    int_extra3: 1,
                    ..cpld(0x10, Format::Byte, 2)
                },
            )
            // Mode 1, normalized against the reference at 0x20.
            .info(
                Item::HwmonIn,
                2,
                0,
                InfoCtrl {
                    int_extra1: 0x20,
                    int_extra2: 1000,
                    ..cpld(0x12, Format::Byte, 2)
                },
            )
            // Mode 1, itself the reference.
            .info(
                Item::HwmonIn,
                3,
                0,
                InfoCtrl {
                    int_extra1: 0x20,
                    int_extra2: 1000,
                    ..cpld(0x20, Format::Byte, 2)
                },
            )
            // Mode 1 with an unreadable reference.
            .info(
                Item::HwmonIn,
                4,
                0,
                InfoCtrl {
                    int_extra1: 0x40,
                    int_extra2: 1000,
                    ..cpld(0x12, Format::Byte, 2)
                },
            )
            .build();
        platform.bus().set_bytes(1, 0x30, 0x10, &[0x12, 0x34]);
        platform.bus().set_bytes(1, 0x30, 0x12, &[0x40, 0x00]);
        platform.bus().set_bytes(1, 0x30, 0x20, &[0x80, 0x00]);

        // code 0x124 = 292, 292 * 33 * 1000 / 40950 = 235
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonIn, 1, 0)).unwrap(),
            "235\n"
        );
        // code 0x400 = 1024, reference 0x800 = 2048
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonIn, 2, 0)).unwrap(),
            "500\n"
        );
        // 2048 * 16 * 33 * 1000 / 605360 = 1786
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonIn, 3, 0)).unwrap(),
            "1786\n"
        );
        assert!(platform
            .get_sensor(Key::new(Item::HwmonIn, 4, 0))
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn test_sensor_cpld_temperature() {
        let platform = TestRegistry::default()
            .i2c(Item::CpldI2cDev, 0, 0, 1, 0x30)
            .info(
                Item::HwmonTemp,
                1,
                0,
                InfoCtrl {
                    int_extra1: 3,
                    ..cpld(0x10, Format::Byte, 2)
                },
            )
            .info(
                Item::HwmonTemp,
                2,
                0,
                InfoCtrl {
                    int_extra1: 4,
                    ..cpld(0x12, Format::Byte, 1)
                },
            )
            .build();
        // 0x0c80 = 3200, 3200 * 625 / 80 = 25000
        platform.bus().set_bytes(1, 0x30, 0x10, &[0x0c, 0x80]);
        // TH5 at raw 0x20 is 476 degrees, and is rejected.
        platform.bus().set_byte(1, 0x30, 0x12, 0x20);
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonTemp, 1, 0)).unwrap(),
            "25000\n"
        );
        assert_eq!(
            platform.get_sensor(Key::new(Item::HwmonTemp, 2, 0)).unwrap(),
            "-99999999\n"
        );
    }
}
