use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

/// Layout accepted for wall-clock departure times.
pub const DEPARTURE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reads a departure time either as RFC 3339 or as `YYYY-MM-DD HH:MM:SS` in `tz`.
pub fn parse_departure(input: &str, tz: Tz) -> AppResult<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(input) {
        return Ok(with_offset.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(input, DEPARTURE_FORMAT).map_err(|_| {
        AppError::BadRequest(format!(
            "invalid departure date time '{}', expected YYYY-MM-DD HH:MM:SS",
            input
        ))
    })?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, _) => Err(AppError::BadRequest(format!(
            "departure date time '{}' is ambiguous in {}",
            input, tz
        ))),
        LocalResult::None => Err(AppError::BadRequest(format!(
            "departure date time '{}' does not exist in {}",
            input, tz
        ))),
    }
}

/// True once `now` is strictly past `days` before departure. The deadline instant itself is allowed.
pub fn deadline_passed(now: DateTime<Utc>, departure: DateTime<Utc>, days: i32) -> bool {
    now > departure - Duration::days(i64::from(days))
}

/// Half-open `[start, end)` covering `month` of `year` in `tz`.
pub fn month_window(year: i32, month: u32, tz: Tz) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(format!(
            "month must be between 1 and 12, got {}",
            month
        )));
    }
    if !(1..=9999).contains(&year) {
        return Err(AppError::BadRequest(format!(
            "year must be between 1 and 9999, got {}",
            year
        )));
    }

    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let start = local_midnight(year, month, tz)?;
    let end = local_midnight(next_year, next_month, tz)?;
    Ok((start, end))
}

fn local_midnight(year: i32, month: u32, tz: Tz) -> AppResult<DateTime<Utc>> {
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| AppError::BadRequest(format!("invalid date {}-{:02}-01", year, month)))?;

    // A DST jump can skip midnight; the first instant after the gap opens the month.
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| AppError::internal(format!("cannot resolve midnight of {}-{:02}-01 in {}", year, month, tz)))
}

/// Calendar year and month of `now` as seen in `tz`.
pub fn year_month_of(now: DateTime<Utc>, tz: Tz) -> (i32, u32) {
    let local = now.with_timezone(&tz);
    (local.year(), local.month())
}
