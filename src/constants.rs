//! This module contains global constants used across the panel and the binary.

/// Default GPIO character device on the Pi
pub const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";

// Shift register control lines (BCM numbering)
pub const DATA_PIN: u32 = 5;
pub const LATCH_PIN: u32 = 6;
pub const CLOCK_PIN: u32 = 13;

/// 7-segment + dot matrix row select + dot matrix columns
pub const SHIFT_REGISTER_CHIPS: usize = 3;

/// Digit enables, left to right, active LOW
pub const DIGIT_PINS: [u32; 4] = [12, 16, 20, 21];

/// Bar graph segments, left to right, active HIGH
pub const BAR_PINS: [u32; 10] = [25, 8, 7, 9, 11, 10, 19, 26, 18, 15];

// Multiplex timing
/// One slot every millisecond, ~83 Hz per digit/row over 12 slots
pub const SLOT_INTERVAL_US: u64 = 1_000;
/// Ticks between colon and blink toggles, ~0.5 s
pub const BLINK_TICKS: u32 = 500;
pub const FAULT_BACKOFF_MS: u64 = 10;
pub const STOP_TIMEOUT_MS: u64 = 1_000;

// Health gauge
pub const HEALTH_MAX: i32 = 10;
pub const HEALTH_STEP_UP: i32 = 1;
pub const HEALTH_STEP_DOWN: i32 = 2;

/// Alarm blink: on and off half of one pulse
pub const ALARM_HALF_PULSE_MS: u64 = 200;
pub const ALARM_DEFAULT_PULSES: u32 = 3;

// Host health polling
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 60;
/// 1-minute load average, percent of one core, considered healthy below this
pub const DEFAULT_MAX_LOAD_PERCENT: u32 = 400;
