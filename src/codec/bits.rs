// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bit-level helpers for 16-bit protocol words.

/// Extracts bits `from..=to` of `word`, shifted down to bit 0.
#[must_use]
pub const fn extract(word: u16, from: u8, to: u8) -> u16 {
    let width = to - from + 1;
    if width >= 16 {
        return word >> from;
    }
    (word >> from) & ((1u16 << width) - 1)
}

/// Interprets the low `width` bits of `value` as a two's complement number.
#[must_use]
pub const fn sign_extend(value: u16, width: u8) -> i32 {
    let value = value as i32;
    let sign = 1i32 << (width - 1);
    if value & sign == 0 {
        value
    } else {
        value - (sign << 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_ranges() {
        assert_eq!(extract(0x1719, 0, 7), 0x19);
        assert_eq!(extract(0x1719, 8, 15), 0x17);
        assert_eq!(extract(0b1_1100_0000, 6, 8), 0b111);
        assert_eq!(extract(0x0021, 0, 0), 1);
        assert_eq!(extract(0x0021, 1, 1), 0);
        assert_eq!(extract(0xABCD, 0, 15), 0xABCD);
    }

    #[test]
    fn sign_extend_byte_and_word() {
        assert_eq!(sign_extend(0x7F, 8), 127);
        assert_eq!(sign_extend(0xFB, 8), -5);
        assert_eq!(sign_extend(0xFF9C, 16), -100);
        assert_eq!(sign_extend(0x00E6, 16), 230);
    }
}
