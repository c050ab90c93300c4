use jiff::civil::{Date, Weekday};
use jiff::tz::TimeZone;
use jiff::ToSpan;

/// First day with data in the store.
pub const DATA_START: Date = jiff::civil::date(2020, 1, 1);

pub fn is_weekend(date: Date) -> bool {
    matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

/// Go back `days` working days.  The ministry doesn't publish on weekends,
/// so the report before Monday's is Friday's.
pub fn subtract_days_ignoring_weekends(initial_date: Date, days: u32) -> Date {
    let mut result = initial_date;
    let mut remaining = days;
    while remaining > 0 {
        result = result.saturating_sub(1.day());
        if !is_weekend(result) {
            remaining -= 1;
        }
    }
    result
}

/// Monday and Sunday of the week containing `day`.
pub fn week_bounds(day: Date) -> (Date, Date) {
    let offset = i64::from(day.weekday().to_monday_zero_offset());
    let monday = day.saturating_sub(offset.days());
    (monday, monday.saturating_add(6.days()))
}

/// Signed number of days from `start` to `end`.
pub fn days_between(start: Date, end: Date) -> i64 {
    end.since(start)
        .map(|span| i64::from(span.get_days()))
        .unwrap_or_default()
}

/// Milliseconds since the epoch at midnight UTC, as expected by the
/// dashboard's `from`/`to` parameters.
pub fn epoch_millis(date: Date) -> i64 {
    date.to_zoned(TimeZone::UTC)
        .map(|z| z.timestamp().as_millisecond())
        .unwrap_or_default()
}
