// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Registry keys.

use crate::Error;
use crate::Item;
use serde::Deserialize;
use serde::Serialize;

/// A key into the platform configuration registry.
///
/// A key packs an item id and two indices as
/// `(item << 24) | (index1 << 8) | index2`, with the item and first index
/// truncated to 16 bits and the second index truncated to 8 bits. Drivers
/// commonly build the indices from several smaller fields, so the
/// truncation is applied here rather than rejected.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct Key(pub u64);

impl Key {
    /// Construct a key from an item and two indices.
    pub const fn new(item: Item, index1: u32, index2: u32) -> Self {
        Self::from_raw(item.id(), index1, index2)
    }

    /// Construct a key from a raw item id and two indices.
    pub const fn from_raw(item: u16, index1: u32, index2: u32) -> Self {
        Key(((item as u64 & 0xffff) << 24)
            | ((index1 as u64 & 0xffff) << 8)
            | (index2 as u64 & 0xff))
    }

    /// Return the raw item id encoded in the key.
    pub const fn item_id(&self) -> u16 {
        ((self.0 >> 24) & 0xffff) as u16
    }

    /// Return the item encoded in the key, if it names one.
    pub fn item(&self) -> Result<Item, Error> {
        Item::try_from(self.item_id())
    }

    /// Return the first index.
    pub const fn index1(&self) -> u16 {
        ((self.0 >> 8) & 0xffff) as u16
    }

    /// Return the second index.
    pub const fn index2(&self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl core::fmt::Display for Key {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self.item() {
            Ok(item) => write!(f, "{}[{}][{}]", item, self.index1(), self.index2()),
            Err(_) => write!(
                f,
                "unknown({})[{}][{}]",
                self.item_id(),
                self.index1(),
                self.index2()
            ),
        }
    }
}
