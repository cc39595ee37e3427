// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use anyhow::anyhow;
use anyhow::Context;
use clap::Args as ClapArgs;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use itertools::Itertools;
use platform_controller::surface::parse_value;
use platform_controller::surface::ChipAttr;
use platform_controller::surface::EepromAttr;
use platform_controller::surface::FanAttr;
use platform_controller::surface::MotorAttr;
use platform_controller::surface::PsuAttr;
use platform_controller::surface::SlotAttr;
use platform_controller::Attribute;
use platform_controller::ConfigBuilder;
use platform_controller::Platform;
use platform_controller::Registry;
use platform_decode::tlv::find_field;
use platform_decode::tlv::FanTlvHeader;
use platform_decode::tlv::FAN_TLV_HEADER_LEN;
use platform_decode::FruInfo;
use platform_decode::TlvInfo;
use platform_messages::DevInfo;
use platform_messages::Led;
use platform_messages::MainDev;
use platform_messages::MinorDev;
use platform_messages::PsuSensor;
use platform_messages::Record;
use platform_messages::SensorAttr;
use platform_messages::SffAttr;
use platform_messages::WatchdogAttr;
use slog::Drain;
use slog::Level;
use std::path::Path;
use std::path::PathBuf;
use tabled::settings::Style;
use tabled::Table;
use tabled::Tabled;

fn parse_log_level(s: &str) -> Result<Level, String> {
    s.parse().map_err(|_| String::from("invalid log level"))
}

// Indices and system types are commonly written in hex.
fn parse_u32(s: &str) -> Result<u32, String> {
    parse_value(s)
        .ok()
        .and_then(|x| u32::try_from(x).ok())
        .ok_or_else(|| format!("invalid value '{s}'"))
}

/// Inspect and control switch platform hardware.
///
/// The hardware is described by a JSON registry of configuration records.
/// Each command reads one attribute, or writes it when `--set` is given.
/// Attributes print as the platform would expose them, with `NA` for those
/// the platform does not support and `ERROR` for those which failed.
#[derive(Parser)]
#[command(version, about, long_about)]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,

    /// The JSON registry describing the platform.
    #[arg(short, long, default_value = "/etc/platform/registry.json")]
    config: PathBuf,

    /// The directory holding I2C device attributes.
    #[arg(long)]
    i2c_sysfs_root: Option<PathBuf>,

    /// The directory holding kernel watchdog devices.
    #[arg(long)]
    watchdog_root: Option<PathBuf>,

    /// The log-level.
    #[arg(
        short,
        long,
        default_value_t = Level::Info,
        value_parser = parse_log_level
    )]
    log_level: Level,
}

/// The sensor to address.
#[derive(ClapArgs)]
struct SensorArgs {
    /// The sensor index, starting from 1.
    index: u32,

    #[arg(value_enum, default_value_t = SensorAttr::Input)]
    attr: SensorAttr,

    /// The class of device carrying the sensor.
    #[arg(long, value_enum, default_value_t = MainDev::Mainboard)]
    main_dev: MainDev,

    /// The index of the device carrying the sensor, 0 for the main board.
    #[arg(long, default_value_t = 0)]
    dev_index: u32,

    /// Print whether the sensor is monitored instead.
    #[arg(long)]
    monitor: bool,
}

/// The CPLD or FPGA to address.
#[derive(ClapArgs)]
struct ChipArgs {
    index: u32,

    #[arg(value_enum)]
    attr: ChipAttr,

    #[arg(long, value_enum, default_value_t = MainDev::Mainboard)]
    main_dev: MainDev,

    /// Write this value to the test register.
    #[arg(long)]
    set: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Transceivers {
    Present,
    PowerOn,
}

#[derive(Clone, Copy, ValueEnum)]
enum ImageFormat {
    /// A fan EEPROM TLV area.
    FanTlv,
    /// An ONIE TlvInfo system EEPROM.
    Onie,
    /// An IPMI FRU image.
    Fru,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print every record in the registry.
    Dump,

    /// Print the number of devices of a kind.
    Count {
        #[arg(value_enum)]
        main_dev: MainDev,
        #[arg(value_enum, default_value_t = MinorDev::None)]
        minor_dev: MinorDev,
    },

    /// Read or write an attribute of a fan module.
    Fan {
        fan: u32,
        #[arg(value_enum)]
        attr: FanAttr,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read an attribute of one fan motor.
    Motor {
        fan: u32,
        motor: u32,
        #[arg(value_enum)]
        attr: MotorAttr,
    },

    /// Read an identity field of a fan module.
    FanInfo {
        fan: u32,
        #[arg(value_enum)]
        info: DevInfo,
    },

    /// Read a status attribute of a PSU, or clear its blackbox.
    Psu {
        psu: u32,
        #[arg(value_enum)]
        attr: PsuAttr,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read an identity field of a PSU.
    PsuInfo {
        psu: u32,
        #[arg(value_enum)]
        info: DevInfo,
    },

    /// Read a PMBus sensor or threshold of a PSU.
    PsuSensor {
        psu: u32,
        #[arg(value_enum)]
        sensor: PsuSensor,
    },

    /// Read a temperature sensor.
    Temp(SensorArgs),

    /// Read a voltage sensor.
    Vol(SensorArgs),

    /// Read a current sensor.
    Curr(SensorArgs),

    /// Read or write an LED.
    Led {
        #[arg(value_enum)]
        led: Led,
        #[arg(default_value_t = 0)]
        index: u32,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read or write a sideband signal of a transceiver port.
    Sff {
        port: u32,
        #[arg(value_enum)]
        attr: SffAttr,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read or write the optoe driver type of a transceiver port.
    Optoe {
        port: u32,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read a signal of every transceiver port, or power all ports.
    Transceivers {
        #[arg(value_enum)]
        which: Transceivers,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read a CPLD attribute, or write its test register.
    Cpld(ChipArgs),

    /// Read an FPGA attribute, or write its test register.
    Fpga(ChipArgs),

    /// Read or write an attribute of a line card slot.
    Slot {
        slot: u32,
        #[arg(value_enum)]
        attr: SlotAttr,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read an identity field of a line card.
    SlotInfo {
        slot: u32,
        #[arg(value_enum)]
        info: DevInfo,
    },

    /// Read an attribute of an EEPROM.
    Eeprom {
        #[arg(value_enum)]
        e2_type: MainDev,
        index: u32,
        #[arg(value_enum)]
        attr: EepromAttr,
    },

    /// Dump the contents of an EEPROM.
    ReadEeprom {
        #[arg(value_enum)]
        e2_type: MainDev,
        index: u32,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long, default_value_t = 256)]
        len: usize,
    },

    /// Decode the system EEPROM.
    Syseeprom,

    /// Read or enable the hardware watchdog.
    Watchdog {
        #[arg(value_enum)]
        attr: WatchdogAttr,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read a system control, or run the sequence setting it.
    System {
        #[arg(value_parser = parse_u32)]
        sys_type: u32,
        #[arg(long)]
        set: Option<String>,
    },

    /// Read the power state of a transceiver power domain.
    PortPower {
        #[arg(value_parser = parse_u32)]
        sys_type: u32,
    },

    /// Decode an EEPROM image from a file.
    Decode {
        #[arg(value_enum)]
        format: ImageFormat,
        path: PathBuf,
    },
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Index1")]
    index1: u16,
    #[tabled(rename = "Index2")]
    index2: u8,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn describe_record(record: &Record) -> String {
    match record {
        Record::Int(x) => x.to_string(),
        Record::Str(s) => format!("{s:?}"),
        Record::I2cDev(dev) => format!("bus {} addr 0x{:02x}", dev.bus, dev.addr),
        Record::Info(info) => {
            let mut text = format!("{:?} {:?} {:?}", info.mode, info.src, info.frmt);
            if !info.fpath.is_empty() {
                text.push_str(&format!(" {}", info.fpath));
            }
            text.push_str(&format!(" addr 0x{:x} len {}", info.addr, info.len));
            text
        }
    }
}

fn print_registry(registry: &Registry) {
    let rows = registry.iter().map(|(key, record)| RecordRow {
        key: format!("0x{:010x}", key.0),
        item: platform_controller::key_to_name(key.item_id()).to_string(),
        index1: key.index1(),
        index2: key.index2(),
        value: describe_record(record),
    });
    println!("{}", Table::new(rows).with(Style::psql()));
}

// Column width for printing data below.
const WIDTH: usize = 16;

fn print_hex(offset: i64, data: &[u8]) {
    for (i, line) in data.chunks(WIDTH).enumerate() {
        let hex = line.iter().map(|byte| format!("{byte:02x}")).join(" ");
        let text: String = line
            .iter()
            .map(|b| if b.is_ascii_graphic() { char::from(*b) } else { '.' })
            .collect();
        println!(
            "{:08x}  {hex:<width$}  {text}",
            offset + (i * WIDTH) as i64,
            width = WIDTH * 3 - 1
        );
    }
}

fn decode_image(format: ImageFormat, path: &Path) -> anyhow::Result<()> {
    let image = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match format {
        ImageFormat::FanTlv => {
            let header = FanTlvHeader::parse(&image)?;
            let data = image
                .get(FAN_TLV_HEADER_LEN..)
                .map(|rest| &rest[..rest.len().min(header.tlv_len)])
                .unwrap_or_default();
            let mut out = [0u8; 256];
            let rows = DevInfo::ALL.iter().filter_map(|info| {
                let len = find_field(data, info.as_u8(), &mut out).ok()?;
                Some(FieldRow {
                    field: info.to_string(),
                    value: String::from_utf8_lossy(&out[..len]).into_owned(),
                })
            });
            println!(
                "version {} flag {} hw version {} type {}",
                header.version, header.flag, header.hw_version, header.kind
            );
            println!("{}", Table::new(rows).with(Style::psql()));
        }
        ImageFormat::Onie => println!("{}", TlvInfo::parse(&image)?),
        ImageFormat::Fru => println!("{}", FruInfo::parse(&image)?),
    }
    Ok(())
}

// Show an attribute, or store a value to it.
fn access(platform: &Platform, attr: Attribute, set: Option<String>) -> anyhow::Result<()> {
    match set {
        Some(value) => platform
            .store(&attr, &value)
            .map_err(|code| anyhow!("failed to write {value} to {attr:?}: error {code}")),
        None => {
            print!("{}", platform.show(&attr));
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Cmd::Decode { format, path } = &args.cmd {
        return decode_image(*format, path);
    }

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, args.log_level).fuse();
    let log = slog::Logger::root(drain, slog::o!());

    let mut builder = ConfigBuilder::new();
    if let Some(root) = args.i2c_sysfs_root {
        builder = builder.i2c_sysfs_root(root);
    }
    if let Some(root) = args.watchdog_root {
        builder = builder.watchdog_root(root);
    }
    let config = builder.build()?;
    let registry = Registry::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    slog::debug!(log, "loaded registry"; "path" => %args.config.display(), "records" => registry.len());
    let platform = Platform::linux(config, registry, log);

    match args.cmd {
        Cmd::Dump => print_registry(platform.registry()),
        Cmd::Count {
            main_dev,
            minor_dev,
        } => access(
            &platform,
            Attribute::DevNumber {
                main_dev,
                minor_dev,
            },
            None,
        )?,
        Cmd::Fan { fan, attr, set } => access(&platform, Attribute::Fan { fan, attr }, set)?,
        Cmd::Motor { fan, motor, attr } => {
            access(&platform, Attribute::FanMotor { fan, motor, attr }, None)?
        }
        Cmd::FanInfo { fan, info } => access(&platform, Attribute::FanInfo { fan, info }, None)?,
        Cmd::Psu { psu, attr, set } => access(&platform, Attribute::Psu { psu, attr }, set)?,
        Cmd::PsuInfo { psu, info } => access(&platform, Attribute::PsuInfo { psu, info }, None)?,
        Cmd::PsuSensor { psu, sensor } => {
            access(&platform, Attribute::PsuSensor { psu, sensor }, None)?
        }
        Cmd::Temp(sensor) => access(&platform, sensor_attribute(MinorDev::Temp, &sensor), None)?,
        Cmd::Vol(sensor) => access(&platform, sensor_attribute(MinorDev::In, &sensor), None)?,
        Cmd::Curr(sensor) => access(&platform, sensor_attribute(MinorDev::Curr, &sensor), None)?,
        Cmd::Led { led, index, set } => access(&platform, Attribute::Led { led, index }, set)?,
        Cmd::Sff { port, attr, set } => access(&platform, Attribute::Sff { port, attr }, set)?,
        Cmd::Optoe { port, set } => access(&platform, Attribute::OptoeType { port }, set)?,
        Cmd::Transceivers { which, set } => {
            let attr = match which {
                Transceivers::Present => Attribute::TransceiverPresent,
                Transceivers::PowerOn => Attribute::TransceiverPowerOn,
            };
            access(&platform, attr, set)?
        }
        Cmd::Cpld(chip) => access(
            &platform,
            Attribute::Cpld {
                main_dev: chip.main_dev,
                index: chip.index,
                attr: chip.attr,
            },
            chip.set,
        )?,
        Cmd::Fpga(chip) => access(
            &platform,
            Attribute::Fpga {
                main_dev: chip.main_dev,
                index: chip.index,
                attr: chip.attr,
            },
            chip.set,
        )?,
        Cmd::Slot { slot, attr, set } => access(&platform, Attribute::Slot { slot, attr }, set)?,
        Cmd::SlotInfo { slot, info } => {
            access(&platform, Attribute::SlotInfo { slot, info }, None)?
        }
        Cmd::Eeprom {
            e2_type,
            index,
            attr,
        } => access(
            &platform,
            Attribute::Eeprom {
                e2_type,
                index,
                attr,
            },
            None,
        )?,
        Cmd::ReadEeprom {
            e2_type,
            index,
            offset,
            len,
        } => {
            let mut buf = vec![0u8; len];
            let n = platform.read_eeprom(e2_type, index, offset, &mut buf)?;
            print_hex(offset, &buf[..n]);
        }
        Cmd::Syseeprom => println!("{}", platform.syseeprom_info()?),
        Cmd::Watchdog { attr, set } => access(&platform, Attribute::Watchdog { attr }, set)?,
        Cmd::System { sys_type, set } => {
            access(&platform, Attribute::System { sys_type }, set)?
        }
        Cmd::PortPower { sys_type } => {
            access(&platform, Attribute::PortPower { sys_type }, None)?
        }
        Cmd::Decode { format, path } => decode_image(format, &path)?,
    }
    Ok(())
}

fn sensor_attribute(kind: MinorDev, sensor: &SensorArgs) -> Attribute {
    if sensor.monitor {
        Attribute::SensorMonitor {
            main_dev: sensor.main_dev,
            dev_index: sensor.dev_index,
            kind,
            index: sensor.index,
        }
    } else {
        Attribute::Sensor {
            main_dev: sensor.main_dev,
            dev_index: sensor.dev_index,
            kind,
            index: sensor.index,
            attr: sensor.attr,
        }
    }
}
