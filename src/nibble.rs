use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// A 4-bit unsigned integer (nibble).
///
/// Used for register indices (`V0`..`VF`) and keypad keys, so that indexing
/// the 16-entry register file and key latch can never go out of range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub struct u4(u8);

impl u4 {
    /// Creates a new `u4` from a `u8`.
    ///
    /// Panics if the value is greater than 0x0F.
    pub const fn new(value: u8) -> Self {
        assert!(value <= 0x0F, "u4 value must be in range 0x0-0xF");
        Self(value)
    }

    /// Creates a `u4` from the low nibble of `value`, discarding the high bits.
    pub const fn from_low_bits(value: u8) -> Self {
        Self(value & 0x0F)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for u4 {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 0x0F {
            Ok(Self(value))
        } else {
            Err(value)
        }
    }
}

/// Parses a single hex digit, with or without a `0x` prefix.
impl FromStr for u4 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim_start_matches("0x").trim_start_matches("0X");
        u8::from_str_radix(digits, 16)
            .ok()
            .and_then(|value| u4::try_from(value).ok())
            .ok_or_else(|| format!("Invalid nibble: '{}' (expected 0-F)", s))
    }
}

impl From<u4> for usize {
    fn from(v: u4) -> usize {
        v.0 as usize
    }
}

impl From<u4> for u8 {
    fn from(v: u4) -> u8 {
        v.0
    }
}

impl fmt::Display for u4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl<T> Index<u4> for [T; 16] {
    type Output = T;

    fn index(&self, index: u4) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T> IndexMut<u4> for [T; 16] {
    fn index_mut(&mut self, index: u4) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_sixteen_entry_arrays() {
        let mut regs = [0u8; 16];
        regs[u4::new(0xA)] = 7;
        assert_eq!(regs[10], 7);
        assert_eq!(regs[u4::new(0xA)], 7);
    }

    #[test]
    fn try_from_rejects_wide_values() {
        assert_eq!(u4::try_from(0x0F), Ok(u4::new(0xF)));
        assert_eq!(u4::try_from(0x10), Err(0x10));
    }

    #[test]
    fn low_bits_masks_high_nibble() {
        assert_eq!(u4::from_low_bits(0x3C), u4::new(0xC));
    }

    #[test]
    fn parses_hex_digits() {
        assert_eq!("a".parse::<u4>(), Ok(u4::new(0xA)));
        assert_eq!("0xF".parse::<u4>(), Ok(u4::new(0xF)));
        assert!("10".parse::<u4>().is_err());
        assert!("g".parse::<u4>().is_err());
        assert!("".parse::<u4>().is_err());
    }

    #[test]
    #[should_panic]
    fn new_panics_on_overflow() {
        let _ = u4::new(0x10);
    }
}
