//! Console output for the run and scan reports.
//!
//! Everything goes through [`print`], so lines land above the live progress bar
//! instead of tearing it.

use std::fmt::Display;

use blecount_common::config::Config;
use colored::*;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;

pub const WIDTH: usize = 64;
pub const PRINT_TARGET: &str = "blecount::print";

const SETTING_WIDTH: usize = 12;
const NAME_WIDTH: usize = 20;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("")
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg)
    };
}

pub fn print(msg: &str) {
    info!(target: "blecount::print", raw_msg = msg);
}

fn pad_to(text: &str, width: usize) -> String {
    let fill: usize = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{text}{}", " ".repeat(fill))
}

pub fn banner(cfg: &Config) {
    if cfg.no_banner || cfg.quiet > 0 {
        return;
    }
    let title: String = format!("blecount {}", env!("CARGO_PKG_VERSION"));
    let rule: String = "━".repeat(WIDTH.saturating_sub(title.len() + 3));
    print(&format!(
        "{} {} {}",
        "━".color(colors::SEPARATOR),
        title.color(colors::PRIMARY).bold(),
        rule.color(colors::SEPARATOR)
    ));
}

/// Section title, left aligned and ruled out to the full width.
pub fn section(title: &str, cfg: &Config) {
    if cfg.quiet > 0 {
        return;
    }
    let label: String = title.to_uppercase();
    let rule: String = "─".repeat(WIDTH.saturating_sub(label.len() + 4));
    print(&format!(
        "{} {} {}",
        "──".color(colors::SEPARATOR),
        label.color(colors::PRIMARY),
        rule.color(colors::SEPARATOR)
    ));
}

pub fn rule() {
    print(&format!("{}", "━".repeat(WIDTH).color(colors::SEPARATOR)));
}

/// `key ........ value` line of the run settings block.
pub fn setting(key: &str, value: impl Display) {
    let dots: String = ".".repeat(SETTING_WIDTH.saturating_sub(key.len()));
    print(&format!(
        "  {} {} {}",
        key.color(colors::PRIMARY),
        dots.color(colors::SEPARATOR),
        value.to_string().color(colors::TEXT_DEFAULT)
    ));
}

/// One device per line: index, padded name, then `detail`.
pub fn device_row(idx: usize, name: &str, detail: impl Display) {
    print(&format!(
        "{} {} {detail}",
        format!("{:>2}.", idx + 1).color(colors::ACCENT),
        pad_to(name, NAME_WIDTH).color(colors::PRIMARY)
    ));
}

/// Indented `key: value` lines under a device row.
pub fn details(pairs: &[(&str, ColoredString)]) {
    let key_width: usize = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in pairs {
        print(&format!(
            "      {}{} {value}",
            pad_to(key, key_width).color(colors::TEXT_DEFAULT),
            ":".color(colors::SEPARATOR)
        ));
    }
}

/// Centered summary line.
pub fn summary(msg: &str) {
    let fill: usize = WIDTH.saturating_sub(console::measure_text_width(msg)) / 2;
    print(&format!("{}{msg}", " ".repeat(fill)));
}

pub fn failure(msg: &str) {
    print(&format!("{}", msg.red().bold()));
}
