use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Start and end of a session on the evaluation day. Both ends are `None`
/// when the card's time text could not be read.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    /// A window whose end precedes its start is not a window.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if start > end {
            return TimeWindow::empty();
        }
        TimeWindow {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn empty() -> Self {
        TimeWindow::default()
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Inclusive on both ends.
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= instant && instant <= end,
            _ => false,
        }
    }

    pub fn starts_after(&self, instant: NaiveDateTime) -> bool {
        self.is_valid() && self.start.is_some_and(|start| start > instant)
    }

    /// `HH:MM~HH:MM`, with `??` standing in for a missing end.
    pub fn display(&self) -> String {
        let fmt = |t: Option<NaiveDateTime>| {
            t.map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "??".to_string())
        };
        format!("{}~{}", fmt(self.start), fmt(self.end))
    }
}
