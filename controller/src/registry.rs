// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The keyed store of platform configuration records.

use crate::Error;
use platform_messages::Error as MessageError;
use platform_messages::I2cDev;
use platform_messages::InfoCtrl;
use platform_messages::Item;
use platform_messages::Key;
use platform_messages::Record;
use platform_messages::RecordKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// The configuration of a chassis, as a map from [`Key`] to [`Record`].
///
/// Every record is checked against the shape its item requires when it is
/// inserted, so lookups only need to handle absence.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    records: BTreeMap<Key, Record>,
}

// One element of the JSON configuration document.
#[derive(Debug, Deserialize)]
struct Entry {
    item: Item,
    #[serde(default)]
    index1: u32,
    #[serde(default)]
    index2: u32,
    #[serde(flatten)]
    body: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct IntBody {
    value: i32,
}

#[derive(Debug, Deserialize)]
struct StrBody {
    value: String,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record already stored at `key`.
    ///
    /// Fails if the key does not name an item, or if the record's shape
    /// differs from the item's.
    pub fn insert(&mut self, key: Key, record: Record) -> Result<Option<Record>, Error> {
        let item = key.item()?;
        if item.kind() != record.kind() {
            return Err(Error::Schema(MessageError::ShapeMismatch {
                item: item.name(),
                expected: item.kind(),
                found: record.kind(),
            }));
        }
        if let Record::Info(info) = &record {
            info.validate()?;
        }
        Ok(self.records.insert(key, record))
    }

    /// Return the record stored at `key`, if any.
    pub fn get_item(&self, key: Key) -> Option<&Record> {
        self.records.get(&key)
    }

    /// Return the integer record stored at `key`.
    pub fn get_int(&self, key: Key) -> Option<i32> {
        match self.get_item(key) {
            Some(Record::Int(x)) => Some(*x),
            _ => None,
        }
    }

    /// Return the string record stored at `key`.
    pub fn get_str(&self, key: Key) -> Option<&str> {
        match self.get_item(key) {
            Some(Record::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Return the I2C device record stored at `key`.
    pub fn get_i2c_dev(&self, key: Key) -> Option<&I2cDev> {
        match self.get_item(key) {
            Some(Record::I2cDev(dev)) => Some(dev),
            _ => None,
        }
    }

    /// Return the info-control record stored at `key`.
    pub fn get_info(&self, key: Key) -> Option<&InfoCtrl> {
        match self.get_item(key) {
            Some(Record::Info(info)) => Some(info),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Record)> {
        self.records.iter()
    }

    /// Build a registry from a JSON array of entries.
    ///
    /// Each entry names its item and indices, and carries the fields of the
    /// record shape that item holds. Integer and string records use a single
    /// `value` field, for example:
    ///
    /// ```json
    /// [
    ///   { "item": "mode_cpld", "index1": 0, "index2": 1, "value": "lpc" },
    ///   { "item": "cpld_i2c_dev", "index1": 0, "index2": 0, "bus": 2, "addr": 51 }
    /// ]
    /// ```
    pub fn from_json(s: &str) -> Result<Self, Error> {
        let entries: Vec<Entry> =
            serde_json::from_str(s).map_err(|e| Error::Init(e.to_string()))?;
        let mut registry = Self::new();
        for entry in entries {
            let key = Key::new(entry.item, entry.index1, entry.index2);
            let record = Self::parse_body(entry.item, entry.body)
                .map_err(|e| Error::Init(format!("{key}: {e}")))?;
            if registry.insert(key, record)?.is_some() {
                return Err(Error::Init(format!("duplicate record for {key}")));
            }
        }
        Ok(registry)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Init(format!("{}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    fn parse_body(item: Item, body: serde_json::Value) -> Result<Record, serde_json::Error> {
        let record = match item.kind() {
            RecordKind::Int => Record::Int(serde_json::from_value::<IntBody>(body)?.value),
            RecordKind::Str => Record::Str(serde_json::from_value::<StrBody>(body)?.value),
            RecordKind::I2cDev => Record::I2cDev(serde_json::from_value(body)?),
            RecordKind::Info => Record::Info(serde_json::from_value(body)?),
        };
        Ok(record)
    }
}

/// Return the name of the item with the provided id, for diagnostics.
pub fn key_to_name(item_id: u16) -> &'static str {
    Item::try_from(item_id)
        .map(|item| item.name())
        .unwrap_or("unknown")
}
