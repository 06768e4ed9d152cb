//! Plain-text maintenance report (`maintenance.txt`).

use chrono::{DateTime, Utc};
use mwatch_core::{Aspect, DisplayZone, TrackedState};
use std::fmt::Write;

const WIDTH: usize = 60;
const EMPTY_LINE: &str = "✅ Tidak ada coin dalam maintenance";

fn heading(aspect: Aspect) -> &'static str {
    match aspect {
        Aspect::Withdraw => "📤 WITHDRAW MAINTENANCE",
        Aspect::Deposit => "📥 DEPOSIT MAINTENANCE",
    }
}

/// Render both aspects with counts and disabled-since times.
pub fn render_report(state: &TrackedState, zone: &DisplayZone, now: DateTime<Utc>) -> String {
    let rule = "=".repeat(WIDTH);
    let thin = "-".repeat(WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "📊 GATE.IO MAINTENANCE REPORT");
    let _ = writeln!(out, "📅 Generated: {}", zone.format(now));
    let _ = writeln!(out, "{rule}\n");

    for aspect in Aspect::ALL {
        let disabled = state.disabled(aspect);
        let _ = writeln!(out, "{}", heading(aspect));
        let _ = writeln!(out, "{thin}");
        if disabled.is_empty() {
            let _ = writeln!(out, "{EMPTY_LINE}");
        }
        for (i, (key, since)) in disabled.iter().enumerate() {
            let _ = writeln!(out, "{}. {key}", i + 1);
            let _ = writeln!(out, "   Maintenance since: {}", zone.format(*since));
        }
        let _ = writeln!(out, "\nTotal: {} chains", disabled.len());
        let _ = writeln!(out, "\n{rule}");
        if aspect == Aspect::Withdraw {
            out.push('\n');
        }
    }

    let _ = writeln!(out, "🤖 Gate.io Maintenance Bot");
    let _ = writeln!(out, "{rule}");
    out
}
