/*
 *  lib.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
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
//! Indicator panel for the clawpi-scout appliance: a 4-digit 7-segment
//! display and an 8x8 dot matrix multiplexed over one 74HC595 chain, plus a
//! 10-segment bar graph on its own GPIO lines.

pub mod config;
pub mod constants;
pub mod glyphs;
pub mod metrics;
pub mod panel;
