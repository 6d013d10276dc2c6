/*
 *  panel/dashboard.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Facade over the bar graph, the multiplexed displays and their worker
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

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::constants::{
    ALARM_HALF_PULSE_MS, BAR_PINS, CLOCK_PIN, DATA_PIN, DEFAULT_GPIO_CHIP, DIGIT_PINS,
    HEALTH_MAX, HEALTH_STEP_DOWN, HEALTH_STEP_UP, LATCH_PIN, SHIFT_REGISTER_CHIPS,
};
use crate::glyphs::{GLYPH_SMILEY, GLYPH_X};
use crate::panel::availability::Availability;
use crate::panel::bar_graph::{BarGraph, BAR_SEGMENTS};
use crate::panel::dot_matrix::{self, MATRIX_CHIPS};
use crate::panel::gpio::CdevLineProvider;
use crate::panel::multiplex::{MultiplexScheduler, MultiplexTiming, Multiplexer};
use crate::panel::seven_segment::{DigitSelect, DIGIT_COUNT};
use crate::panel::shift_register::{ChainPins, ShiftRegisterChain};
use crate::panel::state::{lock_panel, shared_panel, PanelState, SharedPanel};
use crate::panel::traits::{Bus, LineProvider};

/// Wiring and timing, fixed for the lifetime of a [`Dashboard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSettings {
    pub gpio_chip: String,
    pub chain: ChainPins,
    /// Digit select pins; `None` disables the 7-segment display
    pub seven_segment: Option<[u32; DIGIT_COUNT]>,
    pub dot_matrix: bool,
    /// Segment pins; `None` disables the bar graph
    pub bar_graph: Option<[u32; BAR_SEGMENTS]>,
    pub timing: MultiplexTiming,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            gpio_chip: DEFAULT_GPIO_CHIP.to_string(),
            chain: ChainPins {
                data: DATA_PIN,
                latch: LATCH_PIN,
                clock: CLOCK_PIN,
                chips: SHIFT_REGISTER_CHIPS,
            },
            seven_segment: Some(DIGIT_PINS),
            dot_matrix: true,
            bar_graph: Some(BAR_PINS),
            timing: MultiplexTiming::default(),
        }
    }
}

/// The whole indicator panel.
///
/// Every operation is safe to call whatever hardware turned out to be
/// missing; absent components simply ignore it.
pub struct Dashboard {
    panel: SharedPanel,
    bar_graph: BarGraph,
    scheduler: Option<MultiplexScheduler>,
    chain_ready: bool,
    seven_segment_ready: bool,
    dot_matrix_ready: bool,
    health_score: i32,
}

impl Dashboard {
    /// Open the configured gpiochip and set everything up on it.
    ///
    /// A chip that cannot be opened leaves every component unavailable.
    pub fn open(settings: &PanelSettings) -> Self {
        match CdevLineProvider::open(&settings.gpio_chip) {
            Ok(mut provider) => Self::setup(settings, &mut provider),
            Err(e) => {
                warn!("GPIO not available ({}), panel disabled", e);
                Self::inert()
            }
        }
    }

    /// Set up every enabled component on lines from `provider` and start
    /// multiplexing if there is anything to multiplex.
    pub fn setup(settings: &PanelSettings, provider: &mut dyn LineProvider) -> Self {
        let bar_graph = match settings.bar_graph {
            Some(pins) => BarGraph::setup(provider, &pins),
            None => BarGraph::unavailable(),
        };

        let wants_chain = settings.seven_segment.is_some() || settings.dot_matrix;
        let chain = if wants_chain {
            ShiftRegisterChain::setup(provider, settings.chain)
        } else {
            ShiftRegisterChain::unavailable(settings.chain.chips)
        };
        let chain_ready = chain.available();

        let digits = match settings.seven_segment {
            Some(pins) if chain_ready => DigitSelect::setup(provider, &pins),
            Some(_) => {
                warn!("7-segment display not available - shift register chain not ready");
                DigitSelect::unavailable()
            }
            None => DigitSelect::unavailable(),
        };

        let matrix = if settings.dot_matrix && chain_ready {
            dot_matrix::setup(settings.chain.chips >= MATRIX_CHIPS)
        } else {
            Availability::Unavailable
        };

        let panel = shared_panel();
        let seven_segment_ready = digits.available();
        let dot_matrix_ready = matrix.is_ready();

        let scheduler = if seven_segment_ready || dot_matrix_ready {
            let engine = Multiplexer::new(Box::new(chain), digits, matrix,
                Arc::clone(&panel), settings.timing.blink_ticks);
            let mut scheduler = MultiplexScheduler::new(engine, settings.timing);
            if let Err(e) = scheduler.start() {
                warn!("multiplex not started: {}", e);
            }
            Some(scheduler)
        } else {
            None
        };

        info!("panel ready: bar graph {}, 7-segment {}, dot matrix {}",
            up_down(bar_graph.available()), up_down(seven_segment_ready),
            up_down(dot_matrix_ready));

        Self {
            panel,
            bar_graph,
            scheduler,
            chain_ready,
            seven_segment_ready,
            dot_matrix_ready,
            health_score: 0,
        }
    }

    /// A panel with no hardware at all
    pub fn inert() -> Self {
        Self {
            panel: shared_panel(),
            bar_graph: BarGraph::unavailable(),
            scheduler: None,
            chain_ready: false,
            seven_segment_ready: false,
            dot_matrix_ready: false,
            health_score: 0,
        }
    }

    pub fn set_pattern(&self, pattern: &[u8]) {
        lock_panel(&self.panel).matrix.set_pattern(pattern);
    }

    pub fn set_blink(&self, blink: bool) {
        lock_panel(&self.panel).matrix.set_blink(blink);
    }

    pub fn set_time(&self, hours: u32, minutes: u32) {
        lock_panel(&self.panel).seven_segment.set_time(hours, minutes);
    }

    pub fn set_colon(&self, on: bool) {
        lock_panel(&self.panel).seven_segment.set_colon(on);
    }

    pub fn set_bar_level(&mut self, level: i32) {
        self.bar_graph.set_level(level);
    }

    /// Copy of what the multiplexed displays are showing
    pub fn snapshot(&self) -> PanelState {
        lock_panel(&self.panel).clone()
    }

    /// (Re)start multiplexing; counters begin again at slot 0
    pub fn start(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            if let Err(e) = scheduler.start() {
                warn!("multiplex not started: {}", e);
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.stop();
        }
    }

    pub fn chain_available(&self) -> bool {
        self.chain_ready
    }

    pub fn seven_segment_available(&self) -> bool {
        self.seven_segment_ready
    }

    pub fn dot_matrix_available(&self) -> bool {
        self.dot_matrix_ready
    }

    pub fn bar_graph_available(&self) -> bool {
        self.bar_graph.available()
    }

    pub fn scheduler_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(MultiplexScheduler::is_running)
    }

    pub fn health_score(&self) -> i32 {
        self.health_score
    }

    pub fn bar_level(&self) -> u8 {
        self.bar_graph.level()
    }

    /// Fold one health check result into every display.
    ///
    /// Score climbs slowly and drops fast: +1 per good check, -2 per bad one,
    /// kept within 0..=10 and shown on the bar graph. Uptime goes to the
    /// 7-segment as HH:MM, the matrix shows a smiley or an X.
    pub fn on_health_check(&mut self, ok: bool, consecutive_ok: u32, uptime_secs: u64) {
        self.health_score = if ok {
            (self.health_score + HEALTH_STEP_UP).min(HEALTH_MAX)
        } else {
            (self.health_score - HEALTH_STEP_DOWN).max(0)
        };
        debug!("health check ok={} streak={} score={}", ok, consecutive_ok, self.health_score);

        self.bar_graph.set_level(self.health_score);

        let (hours, minutes) = uptime_hhmm(uptime_secs);
        let mut panel = lock_panel(&self.panel);
        panel.seven_segment.set_time(hours, minutes);
        panel.matrix.set_pattern(if ok { &GLYPH_SMILEY } else { &GLYPH_X });
    }

    /// Blink the matrix for `pulses` on/off pulses of 400 ms
    pub async fn alarm(&self, pulses: u32) {
        info!("alarm: {} pulse(s)", pulses);
        self.set_blink(true);
        let pulse = Duration::from_millis(2 * ALARM_HALF_PULSE_MS);
        tokio::time::sleep(pulse * pulses).await;
        self.set_blink(false);
    }

    /// Stop multiplexing and leave every output dark
    pub fn cleanup(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.stop();
        }
        self.bar_graph.cleanup();
        {
            let mut panel = lock_panel(&self.panel);
            panel.seven_segment.clear();
            panel.matrix.clear();
        }
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.blank();
        }
        info!("panel cleaned up");
    }
}

/// Uptime as (hours, minutes); hours wrap at 100
pub fn uptime_hhmm(uptime_secs: u64) -> (u32, u32) {
    let hours = ((uptime_secs / 3600) % 100) as u32;
    let minutes = ((uptime_secs % 3600) / 60) as u32;
    (hours, minutes)
}

fn up_down(ready: bool) -> &'static str {
    if ready { "up" } else { "down" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::mock::MockGpio;
    use crate::panel::seven_segment::SEGMENTS;

    fn settings() -> PanelSettings {
        PanelSettings {
            timing: MultiplexTiming {
                slot_interval: Duration::from_micros(200),
                blink_ticks: 500,
                fault_backoff: Duration::from_millis(2),
                stop_timeout: Duration::from_secs(1),
            },
            ..PanelSettings::default()
        }
    }

    #[test]
    fn test_uptime_hhmm() {
        assert_eq!(uptime_hhmm(0), (0, 0));
        assert_eq!(uptime_hhmm(3 * 3600 + 25 * 60 + 59), (3, 25));
        assert_eq!(uptime_hhmm(123 * 3600 + 60), (23, 1));
    }

    #[test]
    fn test_health_score_bounds() {
        let mut dash = Dashboard::inert();
        for _ in 0..15 {
            dash.on_health_check(true, 0, 0);
        }
        assert_eq!(dash.health_score(), 10);

        dash.on_health_check(false, 0, 0);
        assert_eq!(dash.health_score(), 8);
        for _ in 0..10 {
            dash.on_health_check(false, 0, 0);
        }
        assert_eq!(dash.health_score(), 0);
    }

    #[test]
    fn test_health_check_updates_state() {
        let mut dash = Dashboard::inert();
        dash.on_health_check(true, 1, 7 * 3600 + 5 * 60);
        let state = dash.snapshot();
        assert_eq!(state.seven_segment.digits(),
            [SEGMENTS[0], SEGMENTS[7], SEGMENTS[0], SEGMENTS[5]]);
        assert_eq!(state.matrix.pattern(), GLYPH_SMILEY);

        dash.on_health_check(false, 0, 7 * 3600 + 5 * 60);
        assert_eq!(dash.snapshot().matrix.pattern(), GLYPH_X);
    }

    #[test]
    fn test_inert_panel_ignores_everything() {
        let mut dash = Dashboard::inert();
        dash.set_bar_level(5);
        dash.start();
        dash.stop();
        dash.cleanup();
        assert!(!dash.chain_available());
        assert!(!dash.scheduler_running());
        assert_eq!(dash.bar_level(), 0);
    }

    #[test]
    fn test_full_setup_on_mock_gpio() {
        let settings = settings();
        let mut gpio = MockGpio::with_chain(settings.chain);
        let mut dash = Dashboard::setup(&settings, &mut gpio);

        assert!(dash.chain_available());
        assert!(dash.seven_segment_available());
        assert!(dash.dot_matrix_available());
        assert!(dash.bar_graph_available());
        assert!(dash.scheduler_running());

        dash.on_health_check(true, 1, 0);
        assert_eq!(dash.bar_level(), 1);
        assert_eq!(gpio.level(BAR_PINS[0]), Some(true));
        assert_eq!(gpio.level(BAR_PINS[1]), Some(false));

        std::thread::sleep(Duration::from_millis(20));
        dash.cleanup();
        assert!(!dash.scheduler_running());
        assert!(!gpio.latched_frames().is_empty());
        assert_eq!(gpio.chain_output(), vec![0, 0, 0]);
        assert!(DIGIT_PINS.iter().all(|&p| gpio.level(p) == Some(true)));
        assert!(BAR_PINS.iter().all(|&p| gpio.level(p) == Some(false)));
    }

    #[test]
    fn test_single_chip_has_no_matrix() {
        let mut settings = settings();
        settings.chain.chips = 1;
        let mut gpio = MockGpio::with_chain(settings.chain);
        let mut dash = Dashboard::setup(&settings, &mut gpio);

        assert!(dash.seven_segment_available());
        assert!(!dash.dot_matrix_available());
        dash.cleanup();
    }

    #[test]
    fn test_matrix_disabled_on_full_chain_stays_dark() {
        let settings = PanelSettings { dot_matrix: false, ..settings() };
        assert_eq!(settings.chain.chips, 3);
        let mut gpio = MockGpio::with_chain(settings.chain);
        let mut dash = Dashboard::setup(&settings, &mut gpio);
        assert!(!dash.dot_matrix_available());
        assert!(dash.seven_segment_available());

        dash.set_time(12, 34);
        std::thread::sleep(Duration::from_millis(20));
        dash.stop();

        let frames = gpio.latched_frames();
        assert!(!frames.is_empty());
        for frame in &frames {
            assert_eq!(frame.len(), 3);
            assert_eq!(&frame[..2], &[0xFF, 0x00], "matrix lit by {:?}", frame);
        }
        dash.cleanup();
    }

    #[test]
    fn test_chain_failure_takes_down_multiplexed_displays() {
        let settings = settings();
        let mut gpio = MockGpio::new();
        gpio.fail_claim(settings.chain.latch);
        let mut dash = Dashboard::setup(&settings, &mut gpio);

        assert!(!dash.chain_available());
        assert!(!dash.seven_segment_available());
        assert!(!dash.dot_matrix_available());
        assert!(!dash.scheduler_running());
        assert!(dash.bar_graph_available());
        // digit lines are never claimed without a chain
        assert!(DIGIT_PINS.iter().all(|p| !gpio.claimed().contains(p)));
        dash.cleanup();
    }

    #[test]
    fn test_disabled_components_claim_nothing() {
        let settings = PanelSettings {
            seven_segment: None,
            dot_matrix: false,
            bar_graph: None,
            ..settings()
        };
        let mut gpio = MockGpio::new();
        let dash = Dashboard::setup(&settings, &mut gpio);

        assert!(gpio.claimed().is_empty());
        assert!(!dash.scheduler_running());
    }

    #[tokio::test]
    async fn test_alarm_blinks_then_stops() {
        let dash = Dashboard::inert();
        dash.alarm(1).await;
        assert!(!dash.snapshot().matrix.blinking());
    }
}
