//! UTC day windows used for generation, sweeping and reporting

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// A calendar day in UTC as the half-open range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_day(day: NaiveDate) -> Self {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        Self {
            day,
            start,
            end: start + Duration::days(1),
        }
    }

    /// The day containing `instant`
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self::for_day(instant.date_naive())
    }

    pub fn today() -> Self {
        Self::containing(Utc::now())
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// ISO date used in export file names
    pub fn label(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

/// Time left until the next UTC midnight after `now`
pub fn until_next_midnight(now: DateTime<Utc>) -> std::time::Duration {
    let next = DayWindow::containing(now).end;
    (next - now).to_std().unwrap_or_default()
}
