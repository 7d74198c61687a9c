use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike};

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::days(1)).with_time(NaiveTime::MIN).unwrap()
}

/// Returns start of the next hour. Used for slicing segments into hourly buckets.
pub fn next_hour_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::hours(1))
        .with_minute(0)
        .unwrap()
        .with_second(0)
        .unwrap()
        .with_nanosecond(0)
        .unwrap()
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

/// Duration as fractional hours, rounded to 2 decimal places for reports.
pub fn duration_hours(v: Duration) -> f64 {
    (v.num_seconds() as f64 / 3600. * 100.).round() / 100.
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::{format_duration, next_hour_start};

    #[test]
    fn formats_durations_per_magnitude() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(62)), "1m2s");
        assert_eq!(format_duration(Duration::seconds(3723)), "1h2m3s");
    }

    #[test]
    fn next_hour_start_truncates() {
        let date = Utc
            .from_utc_datetime(
                &NaiveDate::from_ymd_opt(2024, 4, 5)
                    .unwrap()
                    .and_hms_opt(12, 24, 54)
                    .unwrap(),
            );
        let next = next_hour_start(date);
        assert_eq!(next.to_rfc3339(), "2024-04-05T13:00:00+00:00");
    }
}
