// Weekly recurrence and calendar helpers
//
// All "local" times are evaluated in the scheduling time zone; instants are
// stored and compared in UTC.

use crate::errors::ScheduleError;
use crate::models::{Frequency, RepeatRule};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Local hour at which scheduled searches run
pub const RUN_HOUR: u32 = 7;

/// Number of calendar days the assistant is steered towards
pub const RECENT_DAYS: usize = 7;

/// ScheduleTrigger calculates the next run of a recurring schedule
pub trait ScheduleTrigger {
    /// Next run strictly derived from the rule and the current instant
    fn next_run_at(&self, now: DateTime<Utc>, timezone: Tz) -> Result<DateTime<Utc>, ScheduleError>;
}

impl ScheduleTrigger for RepeatRule {
    fn next_run_at(&self, now: DateTime<Utc>, timezone: Tz) -> Result<DateTime<Utc>, ScheduleError> {
        match self.frequency {
            Frequency::Weekly => calculate_weekly_next_run(self.day_of_week, now, timezone),
        }
    }
}

/// Next weekly run at 07:00 local time.
///
/// `day_of_week` is ISO (1 = Monday .. 7 = Sunday). When the target day is
/// today and the local hour has already reached 07, the run moves to next week.
pub fn calculate_weekly_next_run(
    day_of_week: i32,
    now: DateTime<Utc>,
    timezone: Tz,
) -> Result<DateTime<Utc>, ScheduleError> {
    if !(1..=7).contains(&day_of_week) {
        return Err(ScheduleError::InvalidDayOfWeek(day_of_week));
    }

    let local = now.with_timezone(&timezone);

    // Sunday-based index: ISO 7 becomes 0
    let target = i64::from(day_of_week % 7);
    let current = i64::from(local.weekday().num_days_from_sunday());

    let mut days_to_add = (target - current + 7) % 7;
    if days_to_add == 0 && local.hour() >= RUN_HOUR {
        days_to_add = 7;
    }

    let run_date = local.date_naive() + Duration::days(days_to_add);
    let run_local = run_date
        .and_hms_milli_opt(RUN_HOUR, 0, 0, 0)
        .ok_or_else(|| ScheduleError::CalculationFailed(format!("invalid run time on {}", run_date)))?;

    let next = timezone
        .from_local_datetime(&run_local)
        .earliest()
        .ok_or_else(|| {
            ScheduleError::CalculationFailed(format!(
                "{} does not exist in {}",
                run_local, timezone
            ))
        })?;

    Ok(next.with_timezone(&Utc))
}

/// Local calendar date of an instant
pub fn local_date(now: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Stable per-week key (`YYYY-MM-DD` of the week's Monday)
pub fn week_key(date: NaiveDate) -> String {
    week_start(date).format("%Y-%m-%d").to_string()
}

/// The `count` most recent calendar days, newest first, starting with `today`
pub fn recent_days(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|offset| today - Duration::days(offset as i64))
        .collect()
}
