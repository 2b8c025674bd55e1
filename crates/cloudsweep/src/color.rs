//! Terminal colors for tables, progress lines and messages.
//!
//! All functions respect `NO_COLOR`, `FORCE_COLOR` and TTY detection via
//! `owo-colors`' `if_supports_color()`.

use owo_colors::OwoColorize;
use owo_colors::Stream::{self, Stderr, Stdout};

/// Called once from main.rs when `--no-color` is passed.
pub fn set_no_color() {
    // supports-color reads this on every call.
    // SAFETY: called once at startup before any threads are spawned.
    unsafe { std::env::set_var("NO_COLOR", "1") };
}

// Ice (accent): #7CB4C8
const ICE: (u8, u8, u8) = (124, 180, 200);

// Aurora (success): #6B8F5E
const AURORA: (u8, u8, u8) = (107, 143, 94);

// Copper (warning): #C49A5C
const COPPER: (u8, u8, u8) = (196, 154, 92);

// Ember (error/danger): #B87060
const EMBER: (u8, u8, u8) = (184, 112, 96);

// Muted: #5C6370
const MUTED: (u8, u8, u8) = (92, 99, 112);

fn paint(stream: Stream, text: &str, rgb: (u8, u8, u8)) -> String {
    text.if_supports_color(stream, |t| t.truecolor(rgb.0, rgb.1, rgb.2))
        .to_string()
}

/// Resource ids and class names.
pub fn ice(text: &str) -> String {
    paint(Stdout, text, ICE)
}

pub fn aurora(text: &str) -> String {
    paint(Stdout, text, AURORA)
}

pub fn copper(text: &str) -> String {
    paint(Stdout, text, COPPER)
}

pub fn ember(text: &str) -> String {
    paint(Stdout, text, EMBER)
}

pub fn bold(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.bold()).to_string()
}

/// Secondary info, borders, excluded rows.
pub fn muted(text: &str) -> String {
    paint(Stdout, text, MUTED)
}

/// Color-code an outcome status for stdout tables.
pub fn outcome(status: &str) -> String {
    match status {
        "deleted" => aurora(status),
        "planned" => ice(status),
        "failed" | "dependency_unsatisfied" => ember(status),
        "kept" | "rejected" | "cancelled" => copper(status),
        "skipped" | "pending" => muted(status),
        _ => status.to_string(),
    }
}

/// Same palette as [`outcome`], detected against stderr for live lines.
pub fn outcome_stderr(status: &str) -> String {
    match status {
        "deleted" => paint(Stderr, status, AURORA),
        "planned" => paint(Stderr, status, ICE),
        "failed" | "dependency_unsatisfied" => paint(Stderr, status, EMBER),
        "kept" | "rejected" | "cancelled" => paint(Stderr, status, COPPER),
        _ => status.to_string(),
    }
}

/// Error styling for stderr messages.
pub fn error(text: &str) -> String {
    paint(Stderr, text, EMBER)
}

pub fn warning(text: &str) -> String {
    paint(Stderr, text, COPPER)
}

pub fn hint(text: &str) -> String {
    paint(Stderr, text, MUTED)
}
