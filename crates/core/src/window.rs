use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The bounds of "today" in a reference timezone.
///
/// Built once per tracking session and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TrackingWindow {
    /// Resolves the calendar day containing `now` in `tz`.
    ///
    /// `start` is the first instant of that day and `end` is the first
    /// instant of the next one, so `end > start` always holds even on DST
    /// transition days.
    #[must_use]
    pub fn containing(now: DateTime<Utc>, tz: Tz) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        let start = start_of_day(today, tz);
        let end = today
            .checked_add_days(Days::new(1))
            .map_or_else(|| start + chrono::Duration::days(1), |d| start_of_day(d, tz));
        Self { start, end }
    }

    #[must_use]
    pub fn today(tz: Tz) -> Self {
        Self::containing(Utc::now(), tz)
    }

    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Next day boundary strictly after `now` in `tz`.
#[must_use]
pub fn next_midnight(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    TrackingWindow::containing(now, tz).end
}

/// Time left until [`next_midnight`].
#[must_use]
pub fn until_next_midnight(now: DateTime<Utc>, tz: Tz) -> std::time::Duration {
    (next_midnight(now, tz) - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

// Local midnight can be skipped by a DST jump in some zones; walk forward to
// the first representable instant of the day.
fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let mut time = NaiveTime::MIN;
    for _ in 0..=24 * 4 {
        if let Some(local) = tz.from_local_datetime(&date.and_time(time)).earliest() {
            return local.with_timezone(&Utc);
        }
        time += chrono::Duration::minutes(15);
    }
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
