// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Rescale and format hwmon-style decimal readings.

use crate::raw::decode_num_str;
use std::fmt::Write;

/// How to rescale a decimal reading read from an hwmon attribute.
///
/// Hwmon attributes report integers in fixed units, e.g. millidegrees. The
/// value is first adjusted as `(value + addend) * coefficient`, then divided
/// by `10^exponent` and rendered with at most `decimal` fractional digits.
/// With no fractional digits only the magnitude is printed. Input that is
/// not a decimal number reads as zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HwmonScale {
    pub exponent: i32,
    pub decimal: u8,
    pub coefficient: i32,
    pub addend: i32,
}

impl Default for HwmonScale {
    fn default() -> Self {
        Self {
            exponent: 0,
            decimal: 0,
            coefficient: 1,
            addend: 0,
        }
    }
}

impl HwmonScale {
    /// Return true if formatting leaves the input unchanged.
    pub const fn is_identity(&self) -> bool {
        self.exponent <= 0 && self.coefficient == 1 && self.addend == 0
    }

    /// Format a raw reading, returning a newline-terminated string.
    pub fn format(&self, input: &[u8]) -> String {
        if self.is_identity() {
            let end = input.iter().position(|b| *b == 0).unwrap_or(input.len());
            return String::from_utf8_lossy(&input[..end]).into_owned();
        }

        let exponent = self.exponent.clamp(0, 18) as u32;
        let divisor = 10_i64.pow(exponent);
        let raw = i64::from(decode_num_str(input).unwrap_or(0));
        let value = (raw + i64::from(self.addend)) * i64::from(self.coefficient);
        let magnitude = value.abs();
        let whole = magnitude / divisor;
        let frac = magnitude % divisor;

        if self.decimal == 0 {
            return format!("{whole}\n");
        }

        let sign = if value < 0 { "-" } else { "" };
        let mut out = String::new();
        let width = exponent as usize;
        // Writing to a String cannot fail.
        let _ = write!(out, "{sign}{whole}.{frac:0width$}");

        if let Some(dot) = out.find('.') {
            let keep = dot + 1 + usize::from(self.decimal);
            if keep < out.len() {
                out.truncate(keep);
            }
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::HwmonScale;

    fn scale(exponent: i32, decimal: u8, coefficient: i32, addend: i32) -> HwmonScale {
        HwmonScale {
            exponent,
            decimal,
            coefficient,
            addend,
        }
    }

    #[test]
    fn test_identity_copies_input() {
        let s = HwmonScale::default();
        assert!(s.is_identity());
        assert_eq!(s.format(b"45123\n\0\0"), "45123\n");
        assert_eq!(s.format(b"not a number\n"), "not a number\n");
    }

    #[test]
    fn test_exponent_and_decimal() {
        assert_eq!(scale(3, 1, 1, 0).format(b"45123\n"), "45.1\n");
        assert_eq!(scale(3, 3, 1, 0).format(b"45123\n"), "45.123\n");
        assert_eq!(scale(3, 5, 1, 0).format(b"45123\n"), "45.123\n");
        assert_eq!(scale(3, 2, 1, 0).format(b"45003\n"), "45.00\n");
        assert_eq!(scale(3, 0, 1, 0).format(b"45923\n"), "45\n");
    }

    #[test]
    fn test_coefficient_and_addend() {
        assert_eq!(scale(0, 0, 2, 0).format(b"21\n"), "42\n");
        assert_eq!(scale(3, 1, 1, -50_000).format(b"45123\n"), "-4.8\n");
        assert_eq!(scale(0, 1, 10, 1).format(b"4"), "50.0\n");
    }

    #[test]
    fn test_negative_without_decimals_drops_sign() {
        assert_eq!(scale(3, 0, 1, 0).format(b"-45123"), "45\n");
        assert_eq!(scale(3, 0, 1, 0).format(b"-123"), "0\n");
        assert_eq!(scale(0, 0, 1, -60).format(b"20\n"), "40\n");
    }

    #[test]
    fn test_non_numeric_reads_as_zero() {
        assert_eq!(scale(3, 1, 1, 0).format(b"abc"), "0.0\n");
        assert_eq!(scale(3, 0, 1, 2000).format(b"\0"), "2\n");
    }
}
