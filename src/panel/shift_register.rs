/*
 *  panel/shift_register.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bit-bang driver for a daisy chain of 74HC595 shift registers
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

use log::info;

use crate::panel::availability::Availability;
use crate::panel::error::PanelError;
use crate::panel::traits::{Bus, LineProvider, OutputLine};

/// BCM pins of the shared chain plus the number of chips wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPins {
    /// SER - serial data in
    pub data: u32,
    /// RCLK - storage (latch) clock
    pub latch: u32,
    /// SRCLK - shift clock
    pub clock: u32,
    pub chips: usize,
}

struct ChainLines {
    data: Box<dyn OutputLine>,
    latch: Box<dyn OutputLine>,
    clock: Box<dyn OutputLine>,
}

/// Shift-register chain shared by the seven-segment display and the matrix.
pub struct ShiftRegisterChain {
    lines: Availability<ChainLines>,
    chips: usize,
}

impl ShiftRegisterChain {
    /// Claim the three control lines, all starting low
    pub fn setup(provider: &mut dyn LineProvider, pins: ChainPins) -> Self {
        let lines = Availability::from_setup("shift register chain", claim_lines(provider, pins));
        if lines.is_ready() {
            info!("chain of {} shift register(s) on data={} latch={} clock={}",
                pins.chips, pins.data, pins.latch, pins.clock);
        }
        Self { lines, chips: pins.chips }
    }

    /// A chain whose lines were never acquired
    pub fn unavailable(chips: usize) -> Self {
        Self { lines: Availability::Unavailable, chips }
    }
}

fn claim_lines(provider: &mut dyn LineProvider, pins: ChainPins) -> Result<ChainLines, PanelError> {
    Ok(ChainLines {
        data: provider.claim_output(pins.data, false)?,
        latch: provider.claim_output(pins.latch, false)?,
        clock: provider.claim_output(pins.clock, false)?,
    })
}

impl Bus for ShiftRegisterChain {
    fn available(&self) -> bool {
        self.lines.is_ready()
    }

    fn chips(&self) -> usize {
        self.chips
    }

    fn shift_out(&mut self, data: &[u8]) -> Result<(), PanelError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(());
        };

        lines.latch.drive(false)?;
        for &byte in data {
            for bit in (0..8).rev() {
                // data must be stable before the rising clock edge
                lines.data.drive((byte >> bit) & 1 == 1)?;
                lines.clock.drive(true)?;
                lines.clock.drive(false)?;
            }
        }
        // storage register takes the whole chain on this edge
        lines.latch.drive(true)?;
        lines.latch.drive(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::mock::MockGpio;

    const PINS: ChainPins = ChainPins { data: 5, latch: 6, clock: 13, chips: 3 };

    #[test]
    fn test_three_chip_readback() {
        let mut gpio = MockGpio::with_chain(PINS);
        let mut chain = ShiftRegisterChain::setup(&mut gpio, PINS);
        assert!(chain.available());

        chain.shift_out(&[0xFF, 0x00, 0b0011_1111]).unwrap();

        assert_eq!(gpio.chain_output(), vec![0xFF, 0x00, 0x3F]);
    }

    #[test]
    fn test_single_chip_readback() {
        let pins = ChainPins { chips: 1, ..PINS };
        let mut gpio = MockGpio::with_chain(pins);
        let mut chain = ShiftRegisterChain::setup(&mut gpio, pins);

        for byte in [0x00u8, 0x01, 0x80, 0xA5, 0x5A, 0xFF] {
            chain.shift_out(&[byte]).unwrap();
            assert_eq!(gpio.chain_output(), vec![byte]);
        }
    }

    #[test]
    fn test_msb_first_with_single_latch() {
        let mut gpio = MockGpio::with_chain(PINS);
        let mut chain = ShiftRegisterChain::setup(&mut gpio, PINS);

        chain.shift_out(&[0x80, 0x01, 0x00]).unwrap();

        assert_eq!(gpio.clock_pulses(), 24);
        assert_eq!(gpio.latch_pulses(), 1);
        // first data bit clocked in is the MSB of the first byte
        assert_eq!(gpio.shifted_bits()[0], true);
        assert_eq!(gpio.shifted_bits()[15], true);
    }

    #[test]
    fn test_nothing_visible_before_latch() {
        let mut gpio = MockGpio::with_chain(PINS);
        let mut chain = ShiftRegisterChain::setup(&mut gpio, PINS);
        chain.shift_out(&[0x11, 0x22, 0x33]).unwrap();

        // latch goes low, then dies before the rising edge
        gpio.fail_writes_after(PINS.latch, 1);
        assert!(chain.shift_out(&[0xAA, 0xBB, 0xCC]).is_err());
        assert_eq!(gpio.chain_output(), vec![0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_claim_failure_is_unavailable_and_inert() {
        let mut gpio = MockGpio::with_chain(PINS);
        gpio.fail_claim(PINS.clock);
        let mut chain = ShiftRegisterChain::setup(&mut gpio, PINS);

        assert!(!chain.available());
        assert!(chain.shift_out(&[0xFF, 0xFF, 0xFF]).is_ok());
        assert_eq!(gpio.latch_pulses(), 0);
    }

    #[test]
    fn test_clear_shifts_zeros() {
        let mut gpio = MockGpio::with_chain(PINS);
        let mut chain = ShiftRegisterChain::setup(&mut gpio, PINS);
        chain.shift_out(&[0xFF, 0xFF, 0xFF]).unwrap();

        chain.clear(3).unwrap();

        assert_eq!(gpio.chain_output(), vec![0x00, 0x00, 0x00]);
    }
}
