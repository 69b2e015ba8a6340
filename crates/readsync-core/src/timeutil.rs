//! Shelf-timezone day boundaries and the date strings written to Notion.
//!
//! WeRead reports reading days as unix timestamps at local midnight of the
//! shelf timezone (UTC+8 by default). Everything that turns a timestamp into
//! a title or a date property goes through [`ShelfClock`].

use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeZone, Utc};

const SECONDS_PER_HOUR: i32 = 3600;

/// Converts between unix timestamps and calendar values in the shelf timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShelfClock {
    offset: FixedOffset,
}

impl ShelfClock {
    /// Clock for a whole-hour UTC offset. Out-of-range offsets fall back to UTC.
    pub fn from_hours(hours: i32) -> Self {
        let offset = hours
            .checked_mul(SECONDS_PER_HOUR)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    /// Local datetime for a unix timestamp, `None` if out of chrono's range.
    pub fn local(&self, timestamp: i64) -> Option<DateTime<FixedOffset>> {
        self.offset.timestamp_opt(timestamp, 0).single()
    }

    /// Unix timestamp of local midnight on the day containing `instant`.
    pub fn start_of_day(&self, instant: DateTime<Utc>) -> i64 {
        let local = instant.with_timezone(&self.offset);
        local
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| self.offset.from_local_datetime(&midnight).single())
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| instant.timestamp())
    }

    /// Unix timestamp of local midnight today.
    pub fn today(&self) -> i64 {
        self.start_of_day(Utc::now())
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&self, timestamp: i64) -> String {
        self.format(timestamp, "%Y-%m-%d")
    }

    /// `YYYY年MM月DD日`
    pub fn chinese_date_string(&self, timestamp: i64) -> String {
        self.format(timestamp, "%Y年%m月%d日")
    }

    /// Titles of the year / month / week / day rows a timestamp belongs to.
    pub fn period_titles(&self, timestamp: i64) -> Option<PeriodTitles> {
        let local = self.local(timestamp)?;
        let week = local.iso_week();
        Some(PeriodTitles {
            year: local.format("%Y").to_string(),
            month: format!("{}年{}月", local.year(), local.month()),
            week: format!("{}年第{}周", week.year(), week.week()),
            date: local.format("%Y年%m月%d日").to_string(),
        })
    }

    fn format(&self, timestamp: i64, pattern: &str) -> String {
        match self.local(timestamp) {
            Some(dt) => dt.format(pattern).to_string(),
            None => timestamp.to_string(),
        }
    }
}

impl Default for ShelfClock {
    fn default() -> Self {
        Self::from_hours(8)
    }
}

/// Row titles in the year / month / week / day period databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodTitles {
    pub year: String,
    pub month: String,
    pub week: String,
    pub date: String,
}
