// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Utilities shared by the decoders.

/// Truncate a byte string at the first byte that is not printable ASCII.
///
/// EEPROM fields are commonly padded with NULs, `0xff`, or spaces. Anything
/// outside `0x21..=0x7e` ends the field, including the space character.
pub fn trim_unprintable(buf: &[u8]) -> &[u8] {
    let end = buf
        .iter()
        .position(|b| !(0x21..=0x7e).contains(b))
        .unwrap_or(buf.len());
    &buf[..end]
}

/// Return the printable prefix of a byte string as a `String`.
pub fn printable_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(trim_unprintable(buf)).into_owned()
}

/// Return true if `name` begins with the configured `pattern`.
///
/// Product names are matched against configured prefixes, case-sensitively,
/// over the length of the pattern. An empty pattern matches nothing.
pub fn name_matches(name: &str, pattern: &str) -> bool {
    !pattern.is_empty() && name.as_bytes().starts_with(pattern.as_bytes())
}

/// A helper macro to generate an enum from a bitfield.
///
/// EEPROM formats pack small enumerations into a few bits of a byte. This
/// macro maps a set of bit patterns to enum variants, generating a
/// `TryFrom<u8>` implementation that masks and shifts the field, and a
/// `Display` implementation.
///
/// # Example
///
/// ```ignore
/// use platform_decode::Error;
///
/// // A 2-bit pattern in bits [3:2] of a byte.
/// platform_decode::bitfield_enum! {
///     name = Foo,
///     description = "A bit pattern representing foo",
///     bits = 3:2,
///     variants = {
///         0b00, First, "The first value",
///         0b01, Second, "The second value",
///         0b10, Third, "The third value",
///         0b11, Fourth, "The fourth value",
///     },
/// }
///
/// assert_eq!(Foo::try_from(0b0000_1000).unwrap(), Foo::Third);
/// ```
#[macro_export]
macro_rules! bitfield_enum {
    (
        name = $name:ident,
        description = $docstring:literal,
        bits = $high_bit:literal : $low_bit:literal,
        variants = { $( $bits:literal, $variant:ident, $display:literal $(,)? ),+ }
        $(,)?
    ) => {
        // Sanity checks on the bit ranges.
        static_assertions::const_assert!($high_bit < 8);
        static_assertions::const_assert!($low_bit < 8);
        static_assertions::const_assert!($low_bit <= $high_bit);

        // Sanity check that the mask is _equal_ to all the bit patterns OR'd
        // together, once shifted into place.
        static_assertions::const_assert_eq!(
            $name::MASK,
            $( ($bits << $low_bit) )|+
        );

        impl $name {
            #[allow(dead_code)]
            pub const HIGH_BIT: u8 = $high_bit;
            #[allow(dead_code)]
            pub const LOW_BIT: u8 = $low_bit;
            pub const MASK: u8 = (0xff << $low_bit) & (0xff >> (7 - $high_bit));
        }

        #[doc = $docstring]
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[cfg_attr(
            feature = "api-traits",
            derive(schemars::JsonSchema, serde::Deserialize, serde::Serialize)
        )]
        pub enum $name {
            $($variant),+
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                use $name::*;
                match self {
                    $( $variant => write!(f, "{}", $display), )+
                }
            }
        }

        impl ::core::convert::TryFrom<u8> for $name {
            type Error = Error;

            fn try_from(x: u8) -> Result<Self, Self::Error> {
                use $name::*;
                #[deny(overlapping_range_endpoints)]
                match (x & Self::MASK) >> $low_bit {
                    $( $bits => Ok($variant), )+
                    _ => Err(Error::InvalidBitField),
                }
            }
        }

        impl ::core::convert::From<$name> for u8 {
            fn from(x: $name) -> u8 {
                use $name::*;
                match x {
                    $( $variant => $bits << $low_bit, )+
                }
            }
        }
    };
}
