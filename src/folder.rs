//! Destination folder naming.
//!
//! Each sweep writes into `{root}/{yyyyMMdd}`. The date is either a configured override
//! or the current calendar date in Central European time (CET, UTC+1, switching to
//! CEST, UTC+2, between the last Sundays of March and October at 01:00 UTC).

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};

const FOLDER_FORMAT: &str = "%Y%m%d";

/// Parse a `yyyyMMdd` override. Anything other than eight digits forming a real date is None.
pub fn parse_override_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, FOLDER_FORMAT).ok()
}

fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = first_of_next.pred_opt()?;
    while day.weekday() != Weekday::Sun {
        day = day.pred_opt()?;
    }
    Some(day)
}

/// Whether `now` falls inside the EU summer-time window.
fn is_summer_time(now: DateTime<Utc>) -> bool {
    let year = now.year();
    let switch = |month| {
        last_sunday(year, month)
            .and_then(|d| d.and_hms_opt(1, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    };
    match (switch(3), switch(10)) {
        (Some(start), Some(end)) => now >= start && now < end,
        _ => false,
    }
}

/// Calendar date in Central European time at instant `now`.
pub fn central_europe_date(now: DateTime<Utc>) -> NaiveDate {
    let offset_hours = if is_summer_time(now) { 2 } else { 1 };
    (now + Duration::hours(offset_hours)).date_naive()
}

/// Folder name for a sweep happening at `now`.
pub fn folder_name_at(date_override: Option<NaiveDate>, now: DateTime<Utc>) -> String {
    date_override
        .unwrap_or_else(|| central_europe_date(now))
        .format(FOLDER_FORMAT)
        .to_string()
}

/// Folder name for a sweep happening now.
pub fn today_folder_name(date_override: Option<NaiveDate>) -> String {
    folder_name_at(date_override, Utc::now())
}
