/*
 *  panel/gpio.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Linux GPIO character device lines via linux-embedded-hal
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

use linux_embedded_hal::CdevPin;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use log::{debug, info};

use crate::panel::error::PanelError;
use crate::panel::traits::{LineProvider, OutputLine};

/// Consumer label shown by `gpioinfo` for lines we hold
const CONSUMER: &str = "scout-panel";

/// Hands out output lines from one gpiochip (e.g. "/dev/gpiochip0").
pub struct CdevLineProvider {
    chip: Chip,
    path: String,
}

impl CdevLineProvider {
    pub fn open(path: &str) -> Result<Self, PanelError> {
        let chip = Chip::new(path)
            .map_err(|e| PanelError::Gpio(format!("{}: {}", path, e)))?;
        info!("GPIO chip {} opened ({} lines)", path, chip.num_lines());
        Ok(Self { chip, path: path.to_string() })
    }
}

impl LineProvider for CdevLineProvider {
    fn claim_output(&mut self, pin: u32, initially_high: bool)
        -> Result<Box<dyn OutputLine>, PanelError> {
        let acquire = |reason: String| PanelError::Acquire { pin, reason };

        let line = self.chip.get_line(pin)
            .map_err(|e| acquire(e.to_string()))?;
        let handle = line
            .request(LineRequestFlags::OUTPUT, u8::from(initially_high), CONSUMER)
            .map_err(|e| acquire(e.to_string()))?;
        let output = CdevPin::new(handle)
            .map_err(|e| acquire(e.to_string()))?;

        debug!("claimed GPIO{} on {} (initial {})", pin, self.path,
            if initially_high { "high" } else { "low" });
        Ok(Box::new(output))
    }
}
