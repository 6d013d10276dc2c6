/*
 *  panel/state.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display state shared between producers and the multiplex worker
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

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::panel::dot_matrix::DotMatrixState;
use crate::panel::seven_segment::SevenSegmentState;

/// Everything the multiplexed displays show.
///
/// One lock guards all of it. Hold the guard only to read or write these
/// fields, never across GPIO or bus I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub seven_segment: SevenSegmentState,
    pub matrix: DotMatrixState,
}

pub type SharedPanel = Arc<Mutex<PanelState>>;

pub fn shared_panel() -> SharedPanel {
    Arc::new(Mutex::new(PanelState::default()))
}

/// Lock the panel state.
///
/// The state is plain data and valid after any partial update, so a panic
/// on another thread does not make it unusable.
pub fn lock_panel(panel: &SharedPanel) -> MutexGuard<'_, PanelState> {
    panel.lock().unwrap_or_else(PoisonError::into_inner)
}
