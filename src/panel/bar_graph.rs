/*
 *  panel/bar_graph.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  10-segment LED bar graph on dedicated GPIO lines
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

use log::debug;

use crate::panel::availability::Availability;
use crate::panel::error::PanelError;
use crate::panel::traits::{LineProvider, OutputLine};

pub const BAR_SEGMENTS: usize = 10;

/// Clamp any requested level into 0..=10
pub fn clamp_level(level: i32) -> u8 {
    level.clamp(0, BAR_SEGMENTS as i32) as u8
}

/// Health gauge: `set_level(0)` is all off, `set_level(10)` all on.
///
/// Every segment owns its line, so the bar graph never touches the shared
/// chain or the multiplexer.
pub struct BarGraph {
    lines: Availability<Vec<Box<dyn OutputLine>>>,
    level: u8,
}

impl BarGraph {
    /// Claim the segment lines left to right, all starting low
    pub fn setup(provider: &mut dyn LineProvider, pins: &[u32; BAR_SEGMENTS]) -> Self {
        let lines = Availability::from_setup("bar graph", provider.claim_outputs(pins, false));
        Self { lines, level: 0 }
    }

    pub fn unavailable() -> Self {
        Self { lines: Availability::Unavailable, level: 0 }
    }

    pub fn available(&self) -> bool {
        self.lines.is_ready()
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn set_level(&mut self, level: i32) {
        let Some(lines) = self.lines.as_mut() else {
            return;
        };
        let level = clamp_level(level);
        self.level = level;
        if let Err(e) = drive_level(lines, level) {
            debug!("bar graph write error: {}", e);
        }
    }

    /// All segments off
    pub fn cleanup(&mut self) {
        let Some(lines) = self.lines.as_mut() else {
            return;
        };
        self.level = 0;
        for line in lines.iter_mut() {
            if let Err(e) = line.drive(false) {
                debug!("bar graph cleanup error: {}", e);
            }
        }
    }
}

fn drive_level(lines: &mut [Box<dyn OutputLine>], level: u8) -> Result<(), PanelError> {
    for (i, line) in lines.iter_mut().enumerate() {
        line.drive(i < level as usize)?;
    }
    Ok(())
}
