/*
 *  panel/error.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the indicator panel
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

use thiserror::Error;

/// Unified error type for panel hardware operations.
///
/// None of these escape the public display operations: acquisition errors
/// become an `Unavailable` component, I/O errors inside the multiplex loop
/// are logged and retried on the next slot.
#[derive(Debug, Error)]
pub enum PanelError {
    /// GPIO chip could not be opened or a line write failed
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// A single output line could not be claimed
    #[error("unable to claim GPIO{pin}: {reason}")]
    Acquire { pin: u32, reason: String },

    /// Operation on a component whose hardware was never acquired
    #[error("{0} not available")]
    Unavailable(&'static str),

    /// Wiring does not support the requested display
    #[error("configuration mismatch: {0}")]
    Config(String),

    /// Multiplex worker could not be spawned
    #[error("multiplex thread error: {0}")]
    Thread(#[from] std::io::Error),
}
