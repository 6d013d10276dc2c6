use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use std::collections::HashSet;
use std::time::Duration;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::constants::{
    BAR_PINS, BLINK_TICKS, CLOCK_PIN, DATA_PIN, DEFAULT_GPIO_CHIP, DEFAULT_HEALTH_INTERVAL_SECS,
    DEFAULT_MAX_LOAD_PERCENT, DIGIT_PINS, FAULT_BACKOFF_MS, LATCH_PIN, SHIFT_REGISTER_CHIPS,
    SLOT_INTERVAL_US, STOP_TIMEOUT_MS,
};
use crate::panel::{ChainPins, MultiplexTiming, PanelSettings};

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// General options
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    /// panel wiring & multiplex timing
    pub panel: Option<PanelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PanelConfig {
    pub gpio_chip: Option<String>,  // e.g. "/dev/gpiochip0"
    pub shift_register: Option<ShiftRegisterConfig>,
    pub seven_segment: Option<SevenSegmentConfig>,
    pub dot_matrix: Option<DotMatrixConfig>,
    pub bar_graph: Option<BarGraphConfig>,
    pub multiplex: Option<MultiplexConfig>,
}

/// BCM numbering throughout
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ShiftRegisterConfig {
    pub data_pin: Option<u32>,
    pub latch_pin: Option<u32>,
    pub clock_pin: Option<u32>,
    pub chips: Option<usize>,      // 1 (7-segment only) or 3 (+ dot matrix)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SevenSegmentConfig {
    pub enabled: Option<bool>,
    pub digit_pins: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DotMatrixConfig {
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BarGraphConfig {
    pub enabled: Option<bool>,
    pub pins: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MultiplexConfig {
    pub slot_interval_us: Option<u64>,
    pub blink_ticks: Option<u32>,
    pub fault_backoff_ms: Option<u64>,
    pub stop_timeout_ms: Option<u64>,
}

/// What the binary does with the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Host uptime and load on the panel
    Uptime,
    /// Wiring check: every display in turn, then all together
    Demo,
}

/// CLI overrides. Config fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "scout-panel", about = "clawpi-scout indicator panel", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Mode::Uptime)]
    pub mode: Mode,
    /// seconds between health checks (uptime mode)
    #[arg(long, default_value_t = DEFAULT_HEALTH_INTERVAL_SECS)]
    pub interval: u64,
    /// 1-minute load, in percent of one core, counted as unhealthy
    #[arg(long, default_value_t = DEFAULT_MAX_LOAD_PERCENT)]
    pub max_load: u32,
    /// force debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub gpio_chip: Option<String>,
    /// shift registers in the chain, 1 or 3
    #[arg(long)]
    pub chips: Option<usize>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_seven_segment: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_dot_matrix: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_bar_graph: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<(Cli, Config), ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli)?;
    Ok((cli, cfg))
}

/// Defaults, then YAML, then `cli`, then validation.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Pretty YAML of effective config (nice for debugging)
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/scout/panel.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/scout/panel.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/scout-panel.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["panel.yaml", "config/scout.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Merge one optional group, field by field when both sides have it.
fn merge_group<T, F>(dst: &mut Option<T>, src: Option<T>, fields: F)
where
    F: FnOnce(&mut T, T),
{
    let Some(s) = src else { return };
    if let Some(d) = dst.as_mut() {
        fields(d, s);
    } else {
        *dst = Some(s);
    }
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    // panel
    merge_group(&mut dst.panel, src.panel, merge_panel);
}

fn merge_panel(dst: &mut PanelConfig, src: PanelConfig) {
    if src.gpio_chip.is_some()      { dst.gpio_chip = src.gpio_chip; }
    merge_group(&mut dst.shift_register, src.shift_register, |d, s| {
        if s.data_pin.is_some()     { d.data_pin = s.data_pin; }
        if s.latch_pin.is_some()    { d.latch_pin = s.latch_pin; }
        if s.clock_pin.is_some()    { d.clock_pin = s.clock_pin; }
        if s.chips.is_some()        { d.chips = s.chips; }
    });
    merge_group(&mut dst.seven_segment, src.seven_segment, |d, s| {
        if s.enabled.is_some()      { d.enabled = s.enabled; }
        if s.digit_pins.is_some()   { d.digit_pins = s.digit_pins; }
    });
    merge_group(&mut dst.dot_matrix, src.dot_matrix, |d, s| {
        if s.enabled.is_some()      { d.enabled = s.enabled; }
    });
    merge_group(&mut dst.bar_graph, src.bar_graph, |d, s| {
        if s.enabled.is_some()      { d.enabled = s.enabled; }
        if s.pins.is_some()         { d.pins = s.pins; }
    });
    merge_group(&mut dst.multiplex, src.multiplex, |d, s| {
        if s.slot_interval_us.is_some() { d.slot_interval_us = s.slot_interval_us; }
        if s.blink_ticks.is_some()      { d.blink_ticks = s.blink_ticks; }
        if s.fault_backoff_ms.is_some() { d.fault_backoff_ms = s.fault_backoff_ms; }
        if s.stop_timeout_ms.is_some()  { d.stop_timeout_ms = s.stop_timeout_ms; }
    });
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    let any_panel = cli.gpio_chip.is_some()
        || cli.chips.is_some()
        || cli.no_seven_segment
        || cli.no_dot_matrix
        || cli.no_bar_graph;
    if !any_panel {
        return;
    }

    let panel = cfg.panel.get_or_insert_with(PanelConfig::default);
    if cli.gpio_chip.is_some()       { panel.gpio_chip = cli.gpio_chip.clone(); }
    if cli.chips.is_some() {
        panel.shift_register.get_or_insert_with(ShiftRegisterConfig::default).chips = cli.chips;
    }
    if cli.no_seven_segment {
        panel.seven_segment.get_or_insert_with(SevenSegmentConfig::default).enabled = Some(false);
    }
    if cli.no_dot_matrix {
        panel.dot_matrix.get_or_insert_with(DotMatrixConfig::default).enabled = Some(false);
    }
    if cli.no_bar_graph {
        panel.bar_graph.get_or_insert_with(BarGraphConfig::default).enabled = Some(false);
    }
}

fn pin_array<const N: usize>(what: &str, pins: Option<&Vec<u32>>, default: [u32; N])
    -> Result<[u32; N], ConfigError> {
    match pins {
        None => Ok(default),
        Some(pins) => <[u32; N]>::try_from(pins.as_slice()).map_err(|_| {
            ConfigError::Validation(format!("{} needs exactly {} pins, got {}", what, N, pins.len()))
        }),
    }
}

fn non_zero<T: PartialEq + Default + Copy>(what: &str, value: Option<T>, default: T)
    -> Result<T, ConfigError> {
    let value = value.unwrap_or(default);
    if value == T::default() {
        return Err(ConfigError::Validation(format!("multiplex {} must be > 0", what)));
    }
    Ok(value)
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Resolve the panel section against the built-in wiring
    pub fn panel_settings(&self) -> Result<PanelSettings, ConfigError> {
        let panel = self.panel.clone().unwrap_or_default();
        let sr = panel.shift_register.unwrap_or_default();
        let seven = panel.seven_segment.unwrap_or_default();
        let matrix = panel.dot_matrix.unwrap_or_default();
        let bar = panel.bar_graph.unwrap_or_default();
        let mux = panel.multiplex.unwrap_or_default();

        let chain = ChainPins {
            data: sr.data_pin.unwrap_or(DATA_PIN),
            latch: sr.latch_pin.unwrap_or(LATCH_PIN),
            clock: sr.clock_pin.unwrap_or(CLOCK_PIN),
            chips: sr.chips.unwrap_or(SHIFT_REGISTER_CHIPS),
        };

        let seven_segment = if seven.enabled.unwrap_or(true) {
            Some(pin_array("seven_segment.digit_pins", seven.digit_pins.as_ref(), DIGIT_PINS)?)
        } else {
            None
        };
        let bar_graph = if bar.enabled.unwrap_or(true) {
            Some(pin_array("bar_graph.pins", bar.pins.as_ref(), BAR_PINS)?)
        } else {
            None
        };

        let timing = MultiplexTiming {
            slot_interval: Duration::from_micros(
                non_zero("slot_interval_us", mux.slot_interval_us, SLOT_INTERVAL_US)?),
            blink_ticks: non_zero("blink_ticks", mux.blink_ticks, BLINK_TICKS)?,
            fault_backoff: Duration::from_millis(
                non_zero("fault_backoff_ms", mux.fault_backoff_ms, FAULT_BACKOFF_MS)?),
            stop_timeout: Duration::from_millis(
                non_zero("stop_timeout_ms", mux.stop_timeout_ms, STOP_TIMEOUT_MS)?),
        };

        Ok(PanelSettings {
            gpio_chip: panel.gpio_chip.unwrap_or_else(|| DEFAULT_GPIO_CHIP.to_string()),
            chain,
            seven_segment,
            dot_matrix: matrix.enabled.unwrap_or(true),
            bar_graph,
            timing,
        })
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let settings = cfg.panel_settings()?;

    match settings.chain.chips {
        1 | 3 => {},
        n => return Err(ConfigError::Validation(
            format!("shift_register chips must be 1 or 3, got {}", n))),
    }

    let mut pins: Vec<u32> = Vec::new();
    if settings.seven_segment.is_some() || settings.dot_matrix {
        pins.extend([settings.chain.data, settings.chain.latch, settings.chain.clock]);
    }
    if let Some(digits) = settings.seven_segment {
        pins.extend(digits);
    }
    if let Some(bar) = settings.bar_graph {
        pins.extend(bar);
    }
    let mut seen = HashSet::new();
    for pin in pins {
        if !seen.insert(pin) {
            return Err(ConfigError::Validation(format!("GPIO{} assigned more than once", pin)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["scout-panel"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_wiring() {
        let settings = Config::default().panel_settings().unwrap();
        assert_eq!(settings, PanelSettings::default());
        assert!(validate(&Config::default()).is_ok());
        assert_eq!(Config::default().log_level(), "info");
    }

    #[test]
    fn test_yaml_sections() {
        let cfg = parse_yaml(r#"
log_level: debug
panel:
  gpio_chip: /dev/gpiochip4
  shift_register: { data_pin: 17, latch_pin: 27, clock_pin: 22, chips: 1 }
  dot_matrix: { enabled: false }
  multiplex: { blink_ticks: 250 }
"#).unwrap();
        let settings = cfg.panel_settings().unwrap();

        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(settings.gpio_chip, "/dev/gpiochip4");
        assert_eq!(settings.chain, ChainPins { data: 17, latch: 27, clock: 22, chips: 1 });
        assert!(!settings.dot_matrix);
        assert_eq!(settings.seven_segment, Some(DIGIT_PINS));
        assert_eq!(settings.timing.blink_ticks, 250);
        assert_eq!(settings.timing.slot_interval, Duration::from_micros(SLOT_INTERVAL_US));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut cfg = parse_yaml("panel: { shift_register: { data_pin: 17, chips: 1 } }").unwrap();
        merge(&mut cfg, parse_yaml("panel: { shift_register: { chips: 3 } }").unwrap());

        let sr = cfg.panel.unwrap().shift_register.unwrap();
        assert_eq!(sr.data_pin, Some(17));
        assert_eq!(sr.chips, Some(3));
    }

    #[test]
    fn test_cli_overrides_yaml() {
        let mut cfg = parse_yaml("log_level: warn\npanel: { bar_graph: { enabled: true } }").unwrap();
        let args = cli(&["--log-level", "trace", "--chips", "1", "--no-bar-graph"]);
        apply_cli_overrides(&mut cfg, &args);
        let settings = cfg.panel_settings().unwrap();

        assert_eq!(cfg.log_level(), "trace");
        assert_eq!(settings.chain.chips, 1);
        assert_eq!(settings.bar_graph, None);
    }

    #[test]
    fn test_cli_defaults() {
        let args = cli(&[]);
        assert_eq!(args.mode, Mode::Uptime);
        assert_eq!(args.interval, DEFAULT_HEALTH_INTERVAL_SECS);
        assert_eq!(args.max_load, DEFAULT_MAX_LOAD_PERCENT);
        assert_eq!(cli(&["--mode", "demo"]).mode, Mode::Demo);
    }

    #[test]
    fn test_rejects_bad_chain_length() {
        let cfg = parse_yaml("panel: { shift_register: { chips: 2 } }").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_wrong_pin_counts() {
        let cfg = parse_yaml("panel: { seven_segment: { digit_pins: [12, 16, 20] } }").unwrap();
        assert!(validate(&cfg).is_err());

        let cfg = parse_yaml("panel: { bar_graph: { pins: [1, 2] } }").unwrap();
        assert!(validate(&cfg).is_err());

        // disabled components are not checked
        let cfg = parse_yaml("panel: { bar_graph: { enabled: false, pins: [1, 2] } }").unwrap();
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_rejects_shared_pins() {
        let cfg = parse_yaml("panel: { shift_register: { data_pin: 25 } }").unwrap();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("GPIO25"));

        let cfg = parse_yaml(
            "panel: { shift_register: { data_pin: 25 }, bar_graph: { enabled: false } }").unwrap();
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_rejects_zero_timing() {
        let cfg = parse_yaml("panel: { multiplex: { slot_interval_us: 0 } }").unwrap();
        assert!(validate(&cfg).is_err());
        let cfg = parse_yaml("panel: { multiplex: { blink_ticks: 0 } }").unwrap();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let args = cli(&["--config", "/nonexistent/scout-panel.yaml"]);
        assert!(matches!(load_from(&args), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_dump_round_trips() {
        let cfg = parse_yaml("log_level: debug\npanel: { dot_matrix: { enabled: false } }").unwrap();
        let text = dump(&cfg).unwrap();
        assert_eq!(parse_yaml(&text).unwrap(), cfg);
    }
}
