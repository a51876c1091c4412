use chrono::{NaiveDateTime, NaiveTime, Timelike, Weekday};

pub type AlarmId = i64;

/// Time-of-day an alarm rings at, normalized to whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTime(NaiveTime);

impl AlarmTime {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized = inner
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .expect("Will never fail.");
        Self(normalized)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Alarm {
    pub id: AlarmId,
    /// Anchor date and time. The date portion only matters for one-shot
    /// alarms; recurring alarms reuse the time-of-day.
    pub date_time: NaiveDateTime,
    pub enabled: bool,
    pub recurring_days: Vec<Weekday>,
    pub label: Option<String>,
}

impl Alarm {
    pub fn time(&self) -> NaiveTime {
        self.date_time.time()
    }
}

/// 12-hour rendering used in replies and transcripts, e.g. "6:10 AM".
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}
