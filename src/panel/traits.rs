/*
 *  panel/traits.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Hardware seams: output lines, line providers and the shift-register bus
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

use embedded_hal::digital::OutputPin;

use crate::panel::error::PanelError;

/// A single claimed output line.
///
/// Every `embedded-hal` output pin is an `OutputLine`, so the cdev pins used
/// on the Pi and the in-memory pins used by the tests go through the same
/// path.
pub trait OutputLine: Send {
    /// Drive the line high (`true`) or low (`false`)
    fn drive(&mut self, high: bool) -> Result<(), PanelError>;
}

impl<P> OutputLine for P
where
    P: OutputPin + Send,
{
    fn drive(&mut self, high: bool) -> Result<(), PanelError> {
        let result = if high { self.set_high() } else { self.set_low() };
        result.map_err(|e| PanelError::Gpio(format!("{e:?}")))
    }
}

/// Source of output lines, one per BCM pin number.
pub trait LineProvider {
    /// Claim `pin` as an output, starting at the given level
    fn claim_output(&mut self, pin: u32, initially_high: bool)
        -> Result<Box<dyn OutputLine>, PanelError>;

    /// Claim a group of pins, all starting at the same level.
    ///
    /// Lines already claimed are released again if a later pin fails.
    fn claim_outputs(&mut self, pins: &[u32], initially_high: bool)
        -> Result<Vec<Box<dyn OutputLine>>, PanelError> {
        pins.iter()
            .map(|&pin| self.claim_output(pin, initially_high))
            .collect()
    }
}

/// Write access to a chain of shift registers.
///
/// Only the multiplex worker holds one of these while it runs.
pub trait Bus: Send {
    /// Whether the control lines were acquired at setup
    fn available(&self) -> bool;

    /// Number of chips wired in the chain
    fn chips(&self) -> usize;

    /// Shift `data` into the chain, one byte per chip, and latch it.
    ///
    /// The first byte ends up in the chip farthest from the data pin. Nothing
    /// becomes visible until every bit has been shifted. No-op when the bus
    /// is unavailable.
    fn shift_out(&mut self, data: &[u8]) -> Result<(), PanelError>;

    /// Shift zeros through `num_chips` chips
    fn clear(&mut self, num_chips: usize) -> Result<(), PanelError> {
        self.shift_out(&vec![0x00; num_chips])
    }
}
