//! Terminal colors for panel output.
//!
//! Every function honors `NO_COLOR`, `FORCE_COLOR` and TTY detection through
//! owo-colors' `if_supports_color()`. `--no-color` sets an in-process flag
//! that skips styling entirely.

use std::sync::atomic::{AtomicBool, Ordering};

use billy_protocol::ServiceState;
use billy_sync::NotificationLevel;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

static NO_COLOR_FLAG: AtomicBool = AtomicBool::new(false);

/// Call once from main.rs when `--no-color` is passed.
pub fn set_no_color() {
    NO_COLOR_FLAG.store(true, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb {
    const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }
}

const LAKE: Rgb = Rgb::from_hex(0x5FA8D3); // Names, accent
const KELP: Rgb = Rgb::from_hex(0x7FA65A); // Running, success
const BRASS: Rgb = Rgb::from_hex(0xD1A054); // Transitions, warnings
const RUST: Rgb = Rgb::from_hex(0xC0614F); // Failures
const SLATE: Rgb = Rgb::from_hex(0x6B7280); // Secondary text

fn no_color() -> bool {
    NO_COLOR_FLAG.load(Ordering::Relaxed)
}

fn paint(text: &str, rgb: Rgb) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stdout, |t| t.truecolor(rgb.r, rgb.g, rgb.b))
        .to_string()
}

/// Profile and persona names.
pub fn accent(text: &str) -> String {
    paint(text, LAKE)
}

pub fn success(text: &str) -> String {
    paint(text, KELP)
}

pub fn warning(text: &str) -> String {
    paint(text, BRASS)
}

pub fn error(text: &str) -> String {
    paint(text, RUST)
}

/// Secondary info, hints and timestamps.
pub fn muted(text: &str) -> String {
    paint(text, SLATE)
}

pub fn bold(text: &str) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stdout, |t| t.bold()).to_string()
}

pub fn service_state(state: ServiceState) -> String {
    let text = state.to_string();
    match state {
        ServiceState::Active => success(&text),
        ServiceState::Failed => error(&text),
        ServiceState::Inactive => muted(&text),
        ServiceState::Starting | ServiceState::Stopping | ServiceState::Restarting => {
            warning(&text)
        }
    }
}

pub fn notification(level: NotificationLevel, text: &str) -> String {
    match level {
        NotificationLevel::Info => muted(text),
        NotificationLevel::Success => success(text),
        NotificationLevel::Warning => warning(text),
        NotificationLevel::Error => error(text),
    }
}
