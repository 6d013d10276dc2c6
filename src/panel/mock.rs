/*
 *  panel/mock.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory GPIO lines, a simulated 74HC595 chain and a recording bus
 *  for testing without hardware
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

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};

use crate::panel::error::PanelError;
use crate::panel::shift_register::ChainPins;
use crate::panel::traits::{Bus, LineProvider, OutputLine};

/// Mock GPIO chip
///
/// Hands out in-memory lines and records every level change. This is useful
/// for:
/// - Unit tests
/// - Integration tests
/// - Development without a Pi
///
/// Optionally a simulated shift-register chain listens on the data, clock
/// and latch pins so tests can read back what the chips would output.
#[derive(Debug, Clone, Default)]
pub struct MockGpio {
    log: Arc<Mutex<GpioLog>>,
}

#[derive(Debug, Default)]
struct GpioLog {
    levels: HashMap<u32, bool>,
    writes: Vec<(u32, bool)>,
    claimed: Vec<u32>,
    failing_claims: HashSet<u32>,
    /// pin -> writes still allowed before the line starts failing
    failing_writes: HashMap<u32, usize>,
    chain: Option<SimulatedChain>,
}

/// Behavioural model of a 74HC595 daisy chain.
#[derive(Debug, Clone)]
struct SimulatedChain {
    pins: ChainPins,
    /// front is the first chip's QA, back the last chip's QH
    shift: VecDeque<bool>,
    storage: VecDeque<bool>,
    shifted: Vec<bool>,
    clock_pulses: usize,
    latch_pulses: usize,
    frames: Vec<Vec<u8>>,
}

impl SimulatedChain {
    fn new(pins: ChainPins) -> Self {
        let bits = pins.chips * 8;
        Self {
            pins,
            shift: VecDeque::from(vec![false; bits]),
            storage: VecDeque::from(vec![false; bits]),
            shifted: Vec::new(),
            clock_pulses: 0,
            latch_pulses: 0,
            frames: Vec::new(),
        }
    }

    fn on_rising_edge(&mut self, pin: u32, data_level: bool) {
        if pin == self.pins.clock {
            self.clock_pulses += 1;
            self.shifted.push(data_level);
            self.shift.push_front(data_level);
            self.shift.pop_back();
        } else if pin == self.pins.latch {
            self.latch_pulses += 1;
            self.storage = self.shift.clone();
            let frame = self.output();
            self.frames.push(frame);
        }
    }

    /// Latched outputs, farthest chip first, each byte MSB first
    fn output(&self) -> Vec<u8> {
        let bits: Vec<bool> = self.storage.iter().rev().copied().collect();
        bits.chunks(8)
            .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
            .collect()
    }
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock chip with a simulated chain wired to `pins`
    pub fn with_chain(pins: ChainPins) -> Self {
        let gpio = Self::new();
        gpio.lock_log().chain = Some(SimulatedChain::new(pins));
        gpio
    }

    fn lock_log(&self) -> MutexGuard<'_, GpioLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse any attempt to claim `pin`
    pub fn fail_claim(&self, pin: u32) {
        self.lock_log().failing_claims.insert(pin);
    }

    /// Every write to `pin` fails from now on
    pub fn fail_writes_on(&self, pin: u32) {
        self.fail_writes_after(pin, 0);
    }

    /// Allow `count` more writes to `pin`, then fail
    pub fn fail_writes_after(&self, pin: u32, count: usize) {
        self.lock_log().failing_writes.insert(pin, count);
    }

    /// Let writes to `pin` succeed again
    pub fn heal(&self, pin: u32) {
        self.lock_log().failing_writes.remove(&pin);
    }

    /// Current level of a claimed pin
    pub fn level(&self, pin: u32) -> Option<bool> {
        self.lock_log().levels.get(&pin).copied()
    }

    /// Every successful write, in order
    pub fn writes(&self) -> Vec<(u32, bool)> {
        self.lock_log().writes.clone()
    }

    pub fn claimed(&self) -> Vec<u32> {
        self.lock_log().claimed.clone()
    }

    /// What the chain's output registers currently show
    pub fn chain_output(&self) -> Vec<u8> {
        self.lock_log().chain.as_ref().map(SimulatedChain::output).unwrap_or_default()
    }

    /// Every frame the chain has latched so far
    pub fn latched_frames(&self) -> Vec<Vec<u8>> {
        self.lock_log().chain.as_ref().map(|c| c.frames.clone()).unwrap_or_default()
    }

    pub fn clock_pulses(&self) -> usize {
        self.lock_log().chain.as_ref().map_or(0, |c| c.clock_pulses)
    }

    pub fn latch_pulses(&self) -> usize {
        self.lock_log().chain.as_ref().map_or(0, |c| c.latch_pulses)
    }

    /// Data bits in the order they were clocked in
    pub fn shifted_bits(&self) -> Vec<bool> {
        self.lock_log().chain.as_ref().map(|c| c.shifted.clone()).unwrap_or_default()
    }
}

impl LineProvider for MockGpio {
    fn claim_output(&mut self, pin: u32, initially_high: bool)
        -> Result<Box<dyn OutputLine>, PanelError> {
        let mut log = self.lock_log();
        if log.failing_claims.contains(&pin) {
            return Err(PanelError::Acquire { pin, reason: "simulated claim failure".into() });
        }
        if log.claimed.contains(&pin) {
            return Err(PanelError::Acquire { pin, reason: "line busy".into() });
        }
        log.claimed.push(pin);
        log.levels.insert(pin, initially_high);
        Ok(Box::new(MockLine { pin, log: Arc::clone(&self.log) }))
    }
}

/// One in-memory output line
#[derive(Debug)]
pub struct MockLine {
    pin: u32,
    log: Arc<Mutex<GpioLog>>,
}

#[derive(Debug)]
pub struct MockLineError {
    pub pin: u32,
}

impl digital::Error for MockLineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl MockLine {
    fn write(&mut self, high: bool) -> Result<(), MockLineError> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(remaining) = log.failing_writes.get_mut(&self.pin) {
            if *remaining == 0 {
                return Err(MockLineError { pin: self.pin });
            }
            *remaining -= 1;
        }

        let previous = log.levels.insert(self.pin, high).unwrap_or(false);
        log.writes.push((self.pin, high));

        if high && !previous {
            let GpioLog { levels, chain, .. } = &mut *log;
            if let Some(chain) = chain.as_mut() {
                let data_level = levels.get(&chain.pins.data).copied().unwrap_or(false);
                chain.on_rising_edge(self.pin, data_level);
            }
        }
        Ok(())
    }
}

impl ErrorType for MockLine {
    type Error = MockLineError;
}

impl OutputPin for MockLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

/// Bus that records each frame instead of bit-banging it.
///
/// Clones share the same frame log, so a test can keep one handle while the
/// multiplexer owns another.
#[derive(Debug, Clone)]
pub struct RecordingBus {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    failures: Arc<AtomicUsize>,
    chips: usize,
    available: bool,
}

impl RecordingBus {
    pub fn new(chips: usize) -> Self {
        Self {
            frames: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(AtomicUsize::new(0)),
            chips,
            available: true,
        }
    }

    pub fn unavailable(chips: usize) -> Self {
        Self { available: false, ..Self::new(chips) }
    }

    /// Make the next `count` frames fail
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear_frames(&self) {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Bus for RecordingBus {
    fn available(&self) -> bool {
        self.available
    }

    fn chips(&self) -> usize {
        self.chips
    }

    fn shift_out(&mut self, data: &[u8]) -> Result<(), PanelError> {
        if !self.available {
            return Ok(());
        }
        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            return Err(PanelError::Gpio("simulated bus fault".into()));
        }
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).push(data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_line_records_levels() {
        let mut gpio = MockGpio::new();
        let mut line = gpio.claim_output(17, true).unwrap();
        assert_eq!(gpio.level(17), Some(true));

        line.drive(false).unwrap();

        assert_eq!(gpio.level(17), Some(false));
        assert_eq!(gpio.writes(), vec![(17, false)]);
    }

    #[test]
    fn test_mock_line_busy() {
        let mut gpio = MockGpio::new();
        let _line = gpio.claim_output(4, false).unwrap();
        assert!(gpio.claim_output(4, false).is_err());
    }

    #[test]
    fn test_mock_write_failure_and_heal() {
        let mut gpio = MockGpio::new();
        let mut line = gpio.claim_output(22, false).unwrap();

        gpio.fail_writes_on(22);
        assert!(line.drive(true).is_err());
        assert_eq!(gpio.level(22), Some(false));

        gpio.heal(22);
        assert!(line.drive(true).is_ok());
    }

    #[test]
    fn test_recording_bus_failures() {
        let mut bus = RecordingBus::new(3);
        bus.fail_next(1);
        assert!(bus.shift_out(&[1, 2, 3]).is_err());
        assert!(bus.shift_out(&[4, 5, 6]).is_ok());
        assert_eq!(bus.frames(), vec![vec![4, 5, 6]]);
    }
}
