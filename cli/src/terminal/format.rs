use crate::terminal::colors;
use blecount_core::counter::PacketCounts;
use blecount_core::session::SessionOutcome;
use blecount_core::{DeviceReport, Verdict};
use colored::*;

pub fn count_to_string(count: u64) -> ColoredString {
    let text: String = count.to_string();
    if count == 0 {
        text.red().bold()
    } else {
        text.color(colors::COUNT).bold()
    }
}

pub fn outcome_to_string(outcome: &SessionOutcome) -> ColoredString {
    match &outcome.result {
        Ok(()) => "completed".green(),
        Err(e) => format!("{e} (reached {})", outcome.reached).yellow(),
    }
}

pub fn gravity_to_string(counts: &PacketCounts) -> ColoredString {
    match counts.mean_gravity() {
        Some(g) => format!("{g:.3} g over {} samples", counts.gravity_samples).normal(),
        None => "no accel samples".dimmed(),
    }
}

pub fn verdict_to_string(verdict: Verdict) -> ColoredString {
    match verdict {
        Verdict::Pass => verdict.to_string().green().bold(),
        Verdict::Fail => verdict.to_string().red().bold(),
    }
}

/// The single line every device gets in the final report.
pub fn total_line(report: &DeviceReport) -> String {
    format!(
        "{} → packets = {}",
        report.identity.address.color(colors::ADDRESS),
        count_to_string(report.counts.total)
    )
}

pub fn report_to_details(report: &DeviceReport) -> Vec<(&'static str, ColoredString)> {
    let counts: &PacketCounts = &report.counts;
    vec![
        ("Breakdown", format!("{} accel / {} gyro / {} other", counts.accel, counts.gyro, counts.other).normal()),
        ("Gravity", gravity_to_string(counts)),
        ("Session", outcome_to_string(&report.outcome)),
        ("Verdict", verdict_to_string(report.verdict())),
    ]
}
