/*
 *  panel/multiplex.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Background multiplexing of the 7-segment display and the dot matrix
 *  over the shared shift-register chain
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
//! One worker thread owns the chain and cycles through 12 slots:
//! 4 seven-segment digits, then 8 matrix rows. At ~1 kHz total each
//! digit/row refreshes at ~83 Hz, enough to avoid visible flicker.
//!
//! Chain layout, first byte shifted first: `[matrix_row, matrix_col, segments]`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::constants::{BLINK_TICKS, FAULT_BACKOFF_MS, SLOT_INTERVAL_US, STOP_TIMEOUT_MS};
use crate::panel::availability::Availability;
use crate::panel::dot_matrix::{MatrixWiring, COL_BLANK, MATRIX_CHIPS, ROW_BLANK};
use crate::panel::error::PanelError;
use crate::panel::seven_segment::{DigitSelect, DIGIT_COUNT};
use crate::panel::state::{lock_panel, SharedPanel};
use crate::panel::traits::Bus;

/// 4 digits + 8 rows
pub const SLOT_COUNT: usize = 12;
pub const DIGIT_SLOTS: usize = DIGIT_COUNT;

/// Segment byte while a matrix row owns the chain
const SEGMENTS_BLANK: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplexTiming {
    /// Pause after every slot
    pub slot_interval: Duration,
    /// Ticks between colon / blink toggles
    pub blink_ticks: u32,
    /// Pause after a failed slot
    pub fault_backoff: Duration,
    /// Longest `stop()` waits for the worker
    pub stop_timeout: Duration,
}

impl Default for MultiplexTiming {
    fn default() -> Self {
        Self {
            slot_interval: Duration::from_micros(SLOT_INTERVAL_US),
            blink_ticks: BLINK_TICKS,
            fault_backoff: Duration::from_millis(FAULT_BACKOFF_MS),
            stop_timeout: Duration::from_millis(STOP_TIMEOUT_MS),
        }
    }
}

/// Slot state machine driven one tick at a time by the worker.
///
/// Owns the chain and the digit lines; borrows the shared panel state only
/// long enough to copy out one digit or one row.
pub struct Multiplexer {
    bus: Box<dyn Bus>,
    digits: DigitSelect,
    matrix: Availability<MatrixWiring>,
    panel: SharedPanel,
    blink_ticks: u32,
    cycle: usize,
    colon_counter: u32,
    blink_counter: u32,
    blink_on: bool,
}

impl Multiplexer {
    pub fn new(
        bus: Box<dyn Bus>,
        digits: DigitSelect,
        matrix: Availability<MatrixWiring>,
        panel: SharedPanel,
        blink_ticks: u32,
    ) -> Self {
        Self {
            bus,
            digits,
            matrix,
            panel,
            blink_ticks: blink_ticks.max(1),
            cycle: 0,
            colon_counter: 0,
            blink_counter: 0,
            blink_on: true,
        }
    }

    /// Back to slot 0 with both phase counters cleared
    pub fn reset(&mut self) {
        self.cycle = 0;
        self.colon_counter = 0;
        self.blink_counter = 0;
        self.blink_on = true;
    }

    /// Slot the next tick will render
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn colon_counter(&self) -> u32 {
        self.colon_counter
    }

    pub fn blink_counter(&self) -> u32 {
        self.blink_counter
    }

    pub fn blink_on(&self) -> bool {
        self.blink_on
    }

    pub fn seven_segment_available(&self) -> bool {
        self.digits.available() && self.bus.available()
    }

    pub fn matrix_available(&self) -> bool {
        self.matrix.is_ready() && self.bus.available()
    }

    /// Render one slot and move on to the next.
    ///
    /// The cycle advances even when the slot fails, so a fault on one digit
    /// or row never stalls the others.
    pub fn tick(&mut self) -> Result<(), PanelError> {
        let slot = self.cycle;
        self.cycle = (self.cycle + 1) % SLOT_COUNT;
        self.advance_phases();

        if slot < DIGIT_SLOTS {
            self.render_digit(slot)
        } else {
            self.render_row(slot - DIGIT_SLOTS)
        }
    }

    fn advance_phases(&mut self) {
        self.blink_counter += 1;
        if self.blink_counter >= self.blink_ticks {
            self.blink_counter = 0;
            self.blink_on = !self.blink_on;
        }

        self.colon_counter += 1;
        if self.colon_counter >= self.blink_ticks {
            self.colon_counter = 0;
            if self.digits.available() {
                let mut panel = lock_panel(&self.panel);
                let colon = panel.seven_segment.colon();
                panel.seven_segment.set_colon(!colon);
            }
        }
    }

    fn render_digit(&mut self, index: usize) -> Result<(), PanelError> {
        if !self.seven_segment_available() {
            return Ok(());
        }

        let segments = lock_panel(&self.panel).seven_segment.get_digit_data(index);

        // matrix chips wired (enabled or not) must stay dark while a digit is lit
        if self.bus.chips() >= MATRIX_CHIPS {
            self.bus.shift_out(&[ROW_BLANK, COL_BLANK, segments])?;
        } else {
            self.bus.shift_out(&[segments])?;
        }
        self.digits.select_digit(index)
    }

    fn render_row(&mut self, row: usize) -> Result<(), PanelError> {
        if !self.matrix_available() {
            return Ok(());
        }

        let (row_select, columns) =
            lock_panel(&self.panel).matrix.visible_row_data(row, self.blink_on);

        // a digit left enabled would show this row's segment byte
        self.digits.all_off()?;
        self.bus.shift_out(&[row_select, columns, SEGMENTS_BLANK])
    }

    /// Digits off and the whole chain shifted to zero
    pub fn blank(&mut self) -> Result<(), PanelError> {
        self.digits.all_off()?;
        let chips = self.bus.chips();
        self.bus.clear(chips)
    }
}

struct Worker {
    handle: JoinHandle<Multiplexer>,
    done: mpsc::Receiver<()>,
}

/// Runs a [`Multiplexer`] on its own thread.
///
/// The multiplexer moves into the worker on `start()` and comes back on a
/// clean `stop()`, so nothing else can write to the chain while it runs.
pub struct MultiplexScheduler {
    engine: Option<Multiplexer>,
    worker: Option<Worker>,
    running: Arc<AtomicBool>,
    timing: MultiplexTiming,
}

impl MultiplexScheduler {
    pub fn new(engine: Multiplexer, timing: MultiplexTiming) -> Self {
        Self {
            engine: Some(engine),
            worker: None,
            running: Arc::new(AtomicBool::new(false)),
            timing,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// The idle multiplexer; `None` while the worker has it
    pub fn engine(&self) -> Option<&Multiplexer> {
        self.engine.as_ref()
    }

    /// Spawn the worker. Counters restart from slot 0 every time.
    pub fn start(&mut self) -> Result<(), PanelError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let Some(mut engine) = self.engine.take() else {
            return Err(PanelError::Unavailable("multiplex hardware"));
        };
        engine.reset();

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let timing = self.timing;
        let (done_tx, done_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("multiplex".to_string())
            .spawn(move || {
                refresh_loop(&mut engine, &running, timing);
                let _ = done_tx.send(());
                engine
            })?;

        self.worker = Some(Worker { handle, done: done_rx });
        info!("multiplex thread started");
        Ok(())
    }

    /// Ask the worker to finish and wait for it, at most `stop_timeout`.
    ///
    /// A worker that overruns is left detached; the caller is not held up.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return;
        };

        match worker.done.recv_timeout(self.timing.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match worker.handle.join() {
                Ok(engine) => {
                    self.engine = Some(engine);
                    info!("multiplex thread stopped");
                }
                Err(_) => warn!("multiplex thread panicked, chain released"),
            },
            Err(RecvTimeoutError::Timeout) => {
                warn!("multiplex thread did not stop within {:?}, detaching",
                    self.timing.stop_timeout);
            }
        }
    }

    /// Blank both displays. Only while stopped; the worker owns the chain
    /// otherwise.
    pub fn blank(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.blank() {
                debug!("multiplex blank error: {}", e);
            }
        }
    }
}

impl Drop for MultiplexScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn refresh_loop(engine: &mut Multiplexer, running: &AtomicBool, timing: MultiplexTiming) {
    while running.load(Ordering::SeqCst) {
        match engine.tick() {
            Ok(()) => thread::sleep(timing.slot_interval),
            Err(e) => {
                debug!("multiplex error: {}", e);
                thread::sleep(timing.fault_backoff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyphs::GLYPH_X;
    use crate::panel::dot_matrix;
    use crate::panel::mock::{MockGpio, RecordingBus};
    use crate::panel::seven_segment::{SEGMENTS, DP_BIT};
    use crate::panel::state::shared_panel;

    const DIGIT_PINS: [u32; 4] = [12, 16, 20, 21];

    struct Rig {
        engine: Multiplexer,
        bus: RecordingBus,
        gpio: MockGpio,
        panel: SharedPanel,
    }

    fn rig(chips: usize, blink_ticks: u32) -> Rig {
        let bus = RecordingBus::new(chips);
        let mut gpio = MockGpio::new();
        let digits = DigitSelect::setup(&mut gpio, &DIGIT_PINS);
        let panel = shared_panel();
        {
            let mut state = lock_panel(&panel);
            state.seven_segment.set_time(12, 34);
            state.matrix.set_pattern(&GLYPH_X);
        }
        let matrix = dot_matrix::setup(chips >= dot_matrix::MATRIX_CHIPS);
        let engine = Multiplexer::new(
            Box::new(bus.clone()), digits, matrix, Arc::clone(&panel), blink_ticks);
        Rig { engine, bus, gpio, panel }
    }

    fn digit_levels(gpio: &MockGpio) -> [bool; 4] {
        DIGIT_PINS.map(|p| gpio.level(p).unwrap_or(true))
    }

    #[test]
    fn test_full_cycle_three_chips() {
        let mut rig = rig(3, 500);
        let segments = [SEGMENTS[1], SEGMENTS[2], SEGMENTS[3], SEGMENTS[4]];

        for slot in 0..SLOT_COUNT {
            rig.engine.tick().unwrap();
            if slot < DIGIT_SLOTS {
                let mut expected = [true; 4];
                expected[slot] = false;
                assert_eq!(digit_levels(&rig.gpio), expected, "slot {}", slot);
            } else {
                assert_eq!(digit_levels(&rig.gpio), [true; 4], "slot {}", slot);
            }
        }

        let frames = rig.bus.frames();
        assert_eq!(frames.len(), SLOT_COUNT);
        for (k, frame) in frames[..DIGIT_SLOTS].iter().enumerate() {
            assert_eq!(frame, &vec![0xFF, 0x00, segments[k]]);
        }
        for (r, frame) in frames[DIGIT_SLOTS..].iter().enumerate() {
            assert_eq!(frame, &vec![!(1u8 << r), GLYPH_X[r], 0x00]);
        }
        assert_eq!(rig.engine.cycle(), 0);
    }

    #[test]
    fn test_single_chip_skips_matrix_slots() {
        let mut rig = rig(1, 500);
        assert!(!rig.engine.matrix_available());

        for _ in 0..SLOT_COUNT {
            rig.engine.tick().unwrap();
        }

        let frames = rig.bus.frames();
        assert_eq!(frames, vec![
            vec![SEGMENTS[1]], vec![SEGMENTS[2]], vec![SEGMENTS[3]], vec![SEGMENTS[4]],
        ]);
    }

    #[test]
    fn test_no_ghosting_over_many_cycles() {
        let mut rig = rig(3, 7);
        for _ in 0..SLOT_COUNT * 20 {
            rig.engine.tick().unwrap();
        }
        for frame in rig.bus.frames() {
            assert_eq!(frame.len(), 3);
            let is_digit_frame = frame[0] == 0xFF;
            if is_digit_frame {
                assert_eq!(frame[1], 0x00);
            } else {
                assert_eq!(frame[0].count_zeros(), 1);
                assert_eq!(frame[2], 0x00);
            }
        }
    }

    #[test]
    fn test_blink_phase_blanks_columns() {
        let mut rig = rig(3, 4);
        lock_panel(&rig.panel).matrix.set_blink(true);

        for _ in 0..SLOT_COUNT {
            rig.engine.tick().unwrap();
        }

        // blink-on flips on ticks 4, 8 and 12
        let columns: Vec<u8> = rig.bus.frames()[DIGIT_SLOTS..].iter().map(|f| f[1]).collect();
        assert_eq!(columns, vec![0, 0, 0, GLYPH_X[3], GLYPH_X[4], GLYPH_X[5], GLYPH_X[6], 0]);
    }

    #[test]
    fn test_colon_toggles_in_shared_state() {
        let mut rig = rig(3, 3);
        assert!(!lock_panel(&rig.panel).seven_segment.colon());

        for _ in 0..3 {
            rig.engine.tick().unwrap();
        }
        assert!(lock_panel(&rig.panel).seven_segment.colon());
        assert_ne!(lock_panel(&rig.panel).seven_segment.get_digit_data(1) & DP_BIT, 0);

        for _ in 0..3 {
            rig.engine.tick().unwrap();
        }
        assert!(!lock_panel(&rig.panel).seven_segment.colon());
    }

    #[test]
    fn test_reset_clears_counters() {
        let mut rig = rig(3, 5);
        for _ in 0..7 {
            rig.engine.tick().unwrap();
        }
        assert_eq!(rig.engine.cycle(), 7);
        assert_eq!(rig.engine.blink_counter(), 2);
        assert!(!rig.engine.blink_on());

        rig.engine.reset();

        assert_eq!(rig.engine.cycle(), 0);
        assert_eq!(rig.engine.colon_counter(), 0);
        assert_eq!(rig.engine.blink_counter(), 0);
        assert!(rig.engine.blink_on());
    }

    #[test]
    fn test_fault_still_advances_cycle() {
        let mut rig = rig(3, 500);
        rig.bus.fail_next(1);

        assert!(rig.engine.tick().is_err());
        assert_eq!(rig.engine.cycle(), 1);
        assert!(rig.engine.tick().is_ok());
        assert_eq!(rig.bus.frames(), vec![vec![0xFF, 0x00, SEGMENTS[2]]]);
    }

    #[test]
    fn test_unavailable_bus_renders_nothing() {
        let mut gpio = MockGpio::new();
        let digits = DigitSelect::setup(&mut gpio, &DIGIT_PINS);
        let bus = RecordingBus::unavailable(3);
        let mut engine = Multiplexer::new(
            Box::new(bus.clone()), digits, dot_matrix::setup(true), shared_panel(), 500);

        for _ in 0..SLOT_COUNT {
            engine.tick().unwrap();
        }
        assert!(bus.frames().is_empty());
        assert!(gpio.writes().is_empty());
    }

    fn fast_timing() -> MultiplexTiming {
        MultiplexTiming {
            slot_interval: Duration::from_micros(200),
            blink_ticks: 500,
            fault_backoff: Duration::from_millis(2),
            stop_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_restart_begins_at_slot_zero() {
        let rig = rig(3, 500);
        let bus = rig.bus.clone();
        let mut scheduler = MultiplexScheduler::new(rig.engine, fast_timing());

        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        assert!(scheduler.engine().is_none());
        thread::sleep(Duration::from_millis(20));
        scheduler.stop();
        assert!(!scheduler.is_running());
        assert!(!bus.frames().is_empty());

        bus.clear_frames();
        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(5));
        scheduler.stop();

        let frames = bus.frames();
        assert_eq!(frames[0], vec![0xFF, 0x00, SEGMENTS[1]]);
        let engine = scheduler.engine().unwrap();
        assert!(engine.cycle() < SLOT_COUNT);
    }

    #[test]
    fn test_worker_survives_bus_faults() {
        let rig = rig(3, 500);
        let bus = rig.bus.clone();
        bus.fail_next(5);
        let mut scheduler = MultiplexScheduler::new(rig.engine, fast_timing());

        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(60));
        scheduler.stop();

        assert!(!bus.frames().is_empty());
        assert!(scheduler.engine().is_some());
    }

    #[test]
    fn test_disabled_matrix_still_blanked_on_three_chips() {
        let bus = RecordingBus::new(3);
        let mut gpio = MockGpio::new();
        let digits = DigitSelect::setup(&mut gpio, &DIGIT_PINS);
        let panel = shared_panel();
        lock_panel(&panel).seven_segment.set_time(12, 34);
        let mut engine = Multiplexer::new(
            Box::new(bus.clone()), digits, Availability::Unavailable, panel, 500);

        for _ in 0..SLOT_COUNT {
            engine.tick().unwrap();
        }

        assert_eq!(bus.frames(), vec![
            vec![0xFF, 0x00, SEGMENTS[1]],
            vec![0xFF, 0x00, SEGMENTS[2]],
            vec![0xFF, 0x00, SEGMENTS[3]],
            vec![0xFF, 0x00, SEGMENTS[4]],
        ]);
    }

    /// Bus stuck in a write far longer than any stop timeout
    struct StalledBus {
        stall: Duration,
    }

    impl Bus for StalledBus {
        fn available(&self) -> bool {
            true
        }

        fn chips(&self) -> usize {
            3
        }

        fn shift_out(&mut self, _data: &[u8]) -> Result<(), PanelError> {
            thread::sleep(self.stall);
            Ok(())
        }
    }

    #[test]
    fn test_stop_gives_up_on_stalled_worker() {
        let mut gpio = MockGpio::new();
        let digits = DigitSelect::setup(&mut gpio, &DIGIT_PINS);
        let engine = Multiplexer::new(Box::new(StalledBus { stall: Duration::from_secs(3) }),
            digits, dot_matrix::setup(true), shared_panel(), 500);
        let timing = MultiplexTiming { stop_timeout: Duration::from_millis(200), ..fast_timing() };
        let mut scheduler = MultiplexScheduler::new(engine, timing);

        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(50));

        let began = std::time::Instant::now();
        scheduler.stop();
        let waited = began.elapsed();

        assert!(waited >= Duration::from_millis(200), "returned early: {:?}", waited);
        assert!(waited < Duration::from_secs(2), "caller held up: {:?}", waited);
        assert!(!scheduler.is_running());
        assert!(scheduler.engine().is_none());
        assert!(matches!(scheduler.start(), Err(PanelError::Unavailable(_))));
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let rig = rig(3, 500);
        let mut scheduler = MultiplexScheduler::new(rig.engine, fast_timing());
        scheduler.stop();
        assert!(scheduler.engine().is_some());
        scheduler.blank();
        assert_eq!(rig.bus.frames(), vec![vec![0x00, 0x00, 0x00]]);
    }
}
