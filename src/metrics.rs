/*
 *  metrics.rs
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
//! Host health from /proc, the local input for the panel's health checks.

use std::fs;
use std::io;

const LOADAVG_PATH: &str = "/proc/loadavg";
const UPTIME_PATH: &str = "/proc/uptime";

/// One health sample.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HostMetrics {
    /// 1-minute load average, percent of one core
    pub load_percent: f64,
    pub uptime_secs: u64,
}

impl HostMetrics {
    /// Read both values. Missing or unreadable files count as zero.
    pub fn sample() -> Self {
        Self {
            load_percent: read_first_field(LOADAVG_PATH).map_or(0.0, |v| v * 100.0),
            uptime_secs: read_first_field(UPTIME_PATH).map_or(0, |v| v as u64),
        }
    }

    /// Healthy while load stays under `max_load_percent`
    pub fn healthy(&self, max_load_percent: u32) -> bool {
        self.load_percent < f64::from(max_load_percent)
    }
}

/// Reads the first float value from a given file path.
fn read_first_field(path: &str) -> io::Result<f64> {
    parse_first_field(&fs::read_to_string(path)?)
}

fn parse_first_field(content: &str) -> io::Result<f64> {
    let first_word = content.split_whitespace().next().unwrap_or("0.0");
    first_word.parse::<f64>().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Counts good checks in a row, reset by the first bad one
#[derive(Debug, Default, Clone, Copy)]
pub struct Streak {
    consecutive_ok: u32,
}

impl Streak {
    pub fn record(&mut self, ok: bool) -> u32 {
        self.consecutive_ok = if ok { self.consecutive_ok.saturating_add(1) } else { 0 };
        self.consecutive_ok
    }
}
