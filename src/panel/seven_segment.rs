/*
 *  panel/seven_segment.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  4-digit 7-segment display: segment state and digit select lines
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! The nearest 74HC595 in the chain drives segments a-g plus dp. Four GPIO
//! lines select the active digit: common cathode, pulled LOW to enable.
//!
//! Segment encoding (active HIGH):
//!   bit 0 = a (top)          bit 4 = e (bottom-left)
//!   bit 1 = b (top-right)    bit 5 = f (top-left)
//!   bit 2 = c (bottom-right) bit 6 = g (middle)
//!   bit 3 = d (bottom)       bit 7 = dp (colon)

use crate::panel::availability::Availability;
use crate::panel::error::PanelError;
use crate::panel::traits::{LineProvider, OutputLine};

pub const DIGIT_COUNT: usize = 4;

/// Segment patterns for 0-9
pub const SEGMENTS: [u8; 10] = [
    0b0011_1111, // 0: a b c d e f
    0b0000_0110, // 1: b c
    0b0101_1011, // 2: a b d e g
    0b0100_1111, // 3: a b c d g
    0b0110_0110, // 4: b c f g
    0b0110_1101, // 5: a c d f g
    0b0111_1101, // 6: a c d e f g
    0b0000_0111, // 7: a b c
    0b0111_1111, // 8: a b c d e f g
    0b0110_1111, // 9: a b c d f g
];

pub const BLANK: u8 = 0x00;

/// Decimal point, wired as the HH:MM colon
pub const DP_BIT: u8 = 0b1000_0000;

/// The colon sits between the hour and minute pairs, on digit 2's dp
pub const COLON_DIGIT: usize = 1;

/// Segment pattern for a single decimal digit, blank for anything else
pub fn segment_for(value: u32) -> u8 {
    SEGMENTS.get(value as usize).copied().unwrap_or(BLANK)
}

/// What the four digits should show. Lives in the shared panel state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SevenSegmentState {
    digits: [u8; DIGIT_COUNT],
    colon: bool,
}

impl SevenSegmentState {
    /// Show HH:MM; hours wrap at 100
    pub fn set_time(&mut self, hours: u32, minutes: u32) {
        let hours = hours % 100;
        self.digits = [
            segment_for(hours / 10),
            segment_for(hours % 10),
            segment_for((minutes / 10) % 10),
            segment_for(minutes % 10),
        ];
    }

    pub fn set_colon(&mut self, on: bool) {
        self.colon = on;
    }

    pub fn colon(&self) -> bool {
        self.colon
    }

    /// Stored segment bytes, colon not applied
    pub fn digits(&self) -> [u8; DIGIT_COUNT] {
        self.digits
    }

    /// Segment byte to shift out for `index`, with the colon merged in
    pub fn get_digit_data(&self, index: usize) -> u8 {
        let segments = self.digits.get(index).copied().unwrap_or(BLANK);
        if self.colon && index == COLON_DIGIT {
            segments | DP_BIT
        } else {
            segments
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The four digit-enable lines, active LOW.
pub struct DigitSelect {
    lines: Availability<Vec<Box<dyn OutputLine>>>,
}

impl DigitSelect {
    /// Claim the digit lines, all starting HIGH so every digit is dark
    pub fn setup(provider: &mut dyn LineProvider, pins: &[u32; DIGIT_COUNT]) -> Self {
        let lines = Availability::from_setup("7-segment digit select",
            provider.claim_outputs(pins, true));
        Self { lines }
    }

    pub fn unavailable() -> Self {
        Self { lines: Availability::Unavailable }
    }

    pub fn available(&self) -> bool {
        self.lines.is_ready()
    }

    /// Enable exactly one digit, disable the others.
    ///
    /// The others go dark before `index` is enabled, so a failed write never
    /// leaves two digits lit.
    pub fn select_digit(&mut self, index: usize) -> Result<(), PanelError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(());
        };
        for (i, line) in lines.iter_mut().enumerate() {
            if i != index {
                line.drive(true)?;
            }
        }
        match lines.get_mut(index) {
            Some(line) => line.drive(false),
            None => Ok(()),
        }
    }

    /// Disable every digit
    pub fn all_off(&mut self) -> Result<(), PanelError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(());
        };
        for line in lines.iter_mut() {
            line.drive(true)?;
        }
        Ok(())
    }
}
