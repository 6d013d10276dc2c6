/*
 *  panel/mod.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel subsystem - shift-register chain, multiplexed displays, bar graph
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod availability;
pub mod state;

// Hardware backends
pub mod gpio;
pub mod mock;

// Displays
pub mod shift_register;
pub mod seven_segment;
pub mod dot_matrix;
pub mod bar_graph;

// Background refresh
pub mod multiplex;

// Facade
pub mod dashboard;

pub use availability::Availability;
pub use dashboard::{Dashboard, PanelSettings};
pub use error::PanelError;
pub use multiplex::{MultiplexScheduler, MultiplexTiming, Multiplexer};
pub use shift_register::{ChainPins, ShiftRegisterChain};
pub use state::{PanelState, SharedPanel};
pub use traits::{Bus, LineProvider, OutputLine};
