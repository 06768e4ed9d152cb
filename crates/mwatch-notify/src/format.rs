//! Message rendering (Telegram HTML).

use chrono::{DateTime, Utc};
use mwatch_core::{Direction, DisplayZone, Transition};

/// Counts shown in the startup banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupSummary {
    pub withdraw_disabled: usize,
    pub deposit_disabled: usize,
    pub total_pairs: usize,
    pub restored: bool,
}

/// Renders notifications with timestamps in the display zone.
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    zone: DisplayZone,
}

impl MessageFormatter {
    pub fn new(zone: DisplayZone) -> Self {
        Self { zone }
    }

    /// One message per transition.
    pub fn transition(&self, transition: &Transition) -> String {
        let (emoji, verb) = match transition.direction {
            Direction::Entered => ("🟢", "Masuk"),
            Direction::Exited => ("🔴", "Keluar"),
        };
        format!(
            "{emoji} <b>{verb} {} Maintenance</b>\n\n\
             💰 Coin  : <b>{} ({})</b>\n\
             📅 Time  : {}",
            transition.aspect.label(),
            escape_html(&transition.key.currency),
            escape_html(&transition.key.chain),
            self.zone.format(transition.at),
        )
    }

    pub fn startup(&self, summary: StartupSummary, at: DateTime<Utc>) -> String {
        let mut msg = format!(
            "🤖 <b>Bot Started</b>\n\n\
             📅 {}\n\
             📤 Withdraw: {}\n\
             📥 Deposit: {}\n\
             📊 Total: {}",
            self.zone.format(at),
            summary.withdraw_disabled,
            summary.deposit_disabled,
            summary.total_pairs,
        );
        if summary.restored {
            msg.push_str("\n📂 <i>State restored</i>");
        }
        msg
    }

    pub fn shutdown(&self, at: DateTime<Utc>) -> String {
        format!("🛑 <b>Bot Stopped</b>\n\n📅 {}", self.zone.format(at))
    }
}

/// Escape the three characters the Bot API HTML mode reserves.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            c => out.push(c),
        }
    }
    out
}
