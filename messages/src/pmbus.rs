// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The PMBus `STATUS_WORD` register, as used by PSU drivers.

use bitflags::bitflags;

bitflags! {
    /// Bits of the 16-bit PMBus `STATUS_WORD`.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct StatusWord: u16 {
        const CML = 1 << 1;
        const TEMPERATURE = 1 << 2;
        const VIN_UV = 1 << 3;
        const IOUT_OC = 1 << 4;
        const VOUT_OV = 1 << 5;
        const OFF = 1 << 6;
        const BUSY = 1 << 7;
        const FANS = 1 << 10;
        /// Set when the power-good signal is negated.
        const POWER_GOOD = 1 << 11;
        const INPUT = 1 << 13;
        const IOUT = 1 << 14;
        const VOUT = 1 << 15;

        /// Every bit describing an electrical fault.
        const VOLTAGE_ERR = Self::VOUT.bits()
            | Self::IOUT.bits()
            | Self::INPUT.bits()
            | Self::POWER_GOOD.bits()
            | Self::OFF.bits()
            | Self::VOUT_OV.bits()
            | Self::IOUT_OC.bits()
            | Self::VIN_UV.bits();

        /// Bits that mean the output is not being delivered.
        const OUTPUT_NOT_OK = Self::INPUT.bits()
            | Self::OFF.bits()
            | Self::POWER_GOOD.bits();

        // Vendor and reserved bits are carried through.
        const _ = !0;
    }
}
