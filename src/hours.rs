//! Business-hours gate
//!
//! Submissions are only accepted Monday to Friday between the configured
//! opening hours, evaluated at a fixed UTC offset (the default is -03:00,
//! Brasília time; São Paulo has not observed DST since 2019). The check
//! takes an explicit instant so boundaries are testable.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};

/// The service window: weekdays, `open_hour <= hour < close_hour` at
/// `utc_offset_hours`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub utc_offset_hours: i32,
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            utc_offset_hours: -3,
            open_hour: 8,
            close_hour: 18,
        }
    }
}

impl BusinessHours {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let Some(offset) = FixedOffset::east_opt(self.utc_offset_hours * 3600) else {
            return false;
        };
        let local = now.with_timezone(&offset);
        let weekday = local.weekday().number_from_monday() <= 5;
        let hour = local.hour();
        weekday && hour >= self.open_hour && hour < self.close_hour
    }

    pub fn is_open_now(&self) -> bool {
        self.is_open_at(Utc::now())
    }

    /// The notice shown when a request arrives outside the window.
    pub fn closed_notice(&self) -> String {
        format!(
            "service is available Monday to Friday, {:02}:00 to {:02}:00 (UTC{:+03}:00)",
            self.open_hour, self.close_hour, self.utc_offset_hours
        )
    }
}
