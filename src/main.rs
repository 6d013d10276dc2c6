/*
 *  main.rs
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

use std::time::Duration;
use anyhow::{bail, Context};
use log::{info, warn, error};
use env_logger::Env;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::sleep;

use scout_panel::config::{self, Mode};
use scout_panel::constants::ALARM_DEFAULT_PULSES;
use scout_panel::glyphs::{DEMO_GLYPHS, GLYPH_CHECK, GLYPH_EXCLAIM, GLYPH_HEART, GLYPH_SMILEY, GLYPH_X};
use scout_panel::metrics::{HostMetrics, Streak};
use scout_panel::panel::dashboard::uptime_hhmm;
use scout_panel::panel::Dashboard;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// Poll host health and fold every sample into the panel
async fn uptime_loop(dashboard: &mut Dashboard, interval: Duration, max_load: u32) {
    let mut ticker = tokio::time::interval(interval);
    let mut streak = Streak::default();
    let mut was_ok = true;

    loop {
        ticker.tick().await;
        let sample = HostMetrics::sample();
        let ok = sample.healthy(max_load);
        let consecutive_ok = streak.record(ok);
        let (hours, minutes) = uptime_hhmm(sample.uptime_secs);
        info!("load {:.0}% uptime {:02}:{:02} - {}", sample.load_percent, hours, minutes,
            if ok { "ok" } else { "UNHEALTHY" });

        dashboard.on_health_check(ok, consecutive_ok, sample.uptime_secs);
        if was_ok && !ok {
            warn!("host load above {}%", max_load);
            dashboard.alarm(ALARM_DEFAULT_PULSES).await;
        }
        was_ok = ok;
    }
}

/// 0..=10..=0 over 20 steps
fn triangle_level(step: u32) -> i32 {
    let phase = (step % 20) as i32;
    if phase > 10 { 20 - phase } else { phase }
}

/// Wiring check, one display at a time and then all of them together
async fn demo_loop(dashboard: &mut Dashboard) {
    info!("demo: bar graph fills 0-10, then drains");
    if !dashboard.bar_graph_available() {
        warn!("demo: bar graph not available - check wiring");
    }
    for level in 0..=10 {
        dashboard.set_bar_level(level);
        sleep(Duration::from_millis(300)).await;
    }
    sleep(Duration::from_millis(500)).await;
    for level in (0..=10).rev() {
        dashboard.set_bar_level(level);
        sleep(Duration::from_millis(200)).await;
    }

    info!("demo: 7-segment 00:00, 12:34, 23:59, then counting");
    if !dashboard.seven_segment_available() {
        warn!("demo: 7-segment not available (chain {})",
            if dashboard.chain_available() { "up" } else { "down" });
    }
    for (hours, minutes) in [(0, 0), (12, 34), (23, 59)] {
        dashboard.set_time(hours, minutes);
        sleep(Duration::from_secs(2)).await;
    }
    for minutes in 0..10 {
        dashboard.set_time(0, minutes);
        sleep(Duration::from_millis(500)).await;
    }

    info!("demo: dot matrix patterns");
    if !dashboard.dot_matrix_available() {
        warn!("demo: dot matrix not available - needs 3 shift registers");
    }
    for (name, glyph) in DEMO_GLYPHS {
        info!("demo: showing {}", name);
        dashboard.set_pattern(&glyph);
        sleep(Duration::from_secs(2)).await;
    }
    info!("demo: blinking X");
    dashboard.set_pattern(&GLYPH_X);
    dashboard.set_blink(true);
    sleep(Duration::from_secs(3)).await;
    dashboard.set_blink(false);

    info!("demo: all displays together, one minute per second");
    let rotation = [GLYPH_SMILEY, GLYPH_HEART, GLYPH_CHECK, GLYPH_X, GLYPH_EXCLAIM];
    let mut step: u32 = 0;
    loop {
        let (hours, minutes) = uptime_hhmm(u64::from(step) * 60);
        dashboard.set_time(hours, minutes);
        dashboard.set_pattern(&rotation[(step as usize / 3) % rotation.len()]);
        dashboard.set_bar_level(triangle_level(step));
        sleep(Duration::from_secs(1)).await;
        step = step.wrapping_add(1);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cli, cfg) = config::load().context("loading configuration")?;

    if cli.dump_config {
        println!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    // Initialize the logger with the appropriate level based on debug flag
    env_logger::Builder::from_env(Env::default().default_filter_or(
        if cli.debug { "debug" } else { cfg.log_level() }))
        .format_timestamp_secs()
        .init();

    info!("{} keeping an eye on the scout", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if cli.interval == 0 {
        bail!("--interval must be at least 1 second");
    }

    let settings = cfg.panel_settings().context("resolving panel settings")?;
    let mut dashboard = Dashboard::open(&settings);

    tokio::select! {
        // Handle Unix signals for graceful shutdown
        result = signal_handler() => {
            if let Err(e) = result {
                error!("signal handling unavailable: {}", e);
            }
        }

        _ = async {
            match cli.mode {
                Mode::Uptime => {
                    uptime_loop(&mut dashboard, Duration::from_secs(cli.interval), cli.max_load).await
                }
                Mode::Demo => demo_loop(&mut dashboard).await,
            }
        } => {
            info!("Closed panel loop.");
        }
    }

    info!("Main application exiting. Blanking the panel.");
    dashboard.cleanup();

    Ok(())
}
