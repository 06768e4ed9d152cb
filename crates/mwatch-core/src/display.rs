//! Human-facing timestamp rendering.
//!
//! State is kept in UTC. Reports, chat messages and the startup banner show
//! times in a fixed display offset (WIB, UTC+7, by default).

use crate::error::{CoreError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed-offset zone used for rendering timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayZone {
    offset: FixedOffset,
    label: String,
}

impl DisplayZone {
    /// Create a display zone from an hour offset and a label.
    pub fn new(utc_offset_hours: i32, label: impl Into<String>) -> Result<Self> {
        let offset = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                CoreError::InvalidConfig(format!("utc offset out of range: {utc_offset_hours}h"))
            })?;
        Ok(Self {
            offset,
            label: label.into(),
        })
    }

    /// Western Indonesian Time (UTC+7).
    pub fn wib() -> Self {
        Self {
            offset: FixedOffset::east_opt(7 * 3600).expect("UTC+7 is a valid offset"),
            label: "WIB".to_string(),
        }
    }

    /// Zone label appended to rendered times.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Render as `YYYY-MM-DD HH:MM:SS <label>`.
    pub fn format(&self, at: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            at.with_timezone(&self.offset).format(DISPLAY_FORMAT),
            self.label
        )
    }

    /// Parse a string previously produced by [`DisplayZone::format`].
    pub fn parse(&self, s: &str) -> Result<DateTime<Utc>> {
        let trimmed = s.trim();
        let naive_part = trimmed
            .strip_suffix(self.label.as_str())
            .map(str::trim_end)
            .unwrap_or(trimmed);
        let naive = NaiveDateTime::parse_from_str(naive_part, DISPLAY_FORMAT)
            .map_err(|e| CoreError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| CoreError::InvalidTimestamp(s.to_string()))
    }
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self::wib()
    }
}
