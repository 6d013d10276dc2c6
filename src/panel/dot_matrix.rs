/*
 *  panel/dot_matrix.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  8x8 LED dot matrix state, scanned row by row over the shared chain
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
//! Two chips of the chain drive the matrix: the farthest selects the row
//! (active LOW, one bit low), the middle one carries the column data
//! (active HIGH).

use crate::glyphs::GLYPH_BLANK;
use crate::panel::availability::Availability;
use crate::panel::error::PanelError;

pub const MATRIX_ROWS: usize = 8;

/// Chips the matrix needs: seven-segment + row select + columns
pub const MATRIX_CHIPS: usize = 3;

/// Row select byte with every row disabled
pub const ROW_BLANK: u8 = 0xFF;
pub const COL_BLANK: u8 = 0x00;

/// Marker for a matrix the chain is able to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixWiring;

/// Capability check only; the matrix claims no lines of its own
pub fn setup(chain_has_enough_chips: bool) -> Availability<MatrixWiring> {
    let wiring = if chain_has_enough_chips {
        Ok(MatrixWiring)
    } else {
        Err(PanelError::Config(format!("dot matrix needs {} shift registers", MATRIX_CHIPS)))
    };
    Availability::from_setup("dot matrix", wiring)
}

/// Pattern and blink mode. Lives in the shared panel state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotMatrixState {
    pattern: [u8; MATRIX_ROWS],
    blink: bool,
}

impl Default for DotMatrixState {
    fn default() -> Self {
        Self { pattern: GLYPH_BLANK, blink: false }
    }
}

impl DotMatrixState {
    /// Store a pattern, truncated or zero-padded to 8 rows
    pub fn set_pattern(&mut self, pattern: &[u8]) {
        let mut rows = GLYPH_BLANK;
        for (row, &bits) in rows.iter_mut().zip(pattern) {
            *row = bits;
        }
        self.pattern = rows;
    }

    pub fn pattern(&self) -> [u8; MATRIX_ROWS] {
        self.pattern
    }

    /// Blink mode, used while an alarm is sounding
    pub fn set_blink(&mut self, blink: bool) {
        self.blink = blink;
    }

    pub fn blinking(&self) -> bool {
        self.blink
    }

    /// `(row_select, col_data)` for `row`; out-of-range rows get no columns
    pub fn get_row_data(&self, row: usize) -> (u8, u8) {
        let row_select = match row {
            r if r < MATRIX_ROWS => !(1u8 << r),
            _ => ROW_BLANK,
        };
        let columns = self.pattern.get(row).copied().unwrap_or(COL_BLANK);
        (row_select, columns)
    }

    /// Row data as it should be lit during the given blink phase
    pub fn visible_row_data(&self, row: usize, blink_on: bool) -> (u8, u8) {
        let (row_select, columns) = self.get_row_data(row);
        if self.blink && !blink_on {
            (row_select, COL_BLANK)
        } else {
            (row_select, columns)
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
