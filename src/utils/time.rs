use chrono::{DateTime, Duration, Local, NaiveDateTime, Timelike, Utc};

/// Format used for `last_active` in the activity log.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Converts fractional seconds coming from the configuration into a [Duration]. Negative values
/// are treated as zero.
pub fn seconds(value: f64) -> Duration {
    Duration::milliseconds((value.max(0.) * 1000.).round() as i64)
}

/// Same as [seconds], but for the std duration used by the tokio timers.
pub fn std_seconds(value: f64) -> std::time::Duration {
    std::time::Duration::from_millis((value.max(0.) * 1000.).round() as u64)
}

/// Seconds with 2 decimal places, the precision the activity log stores durations with.
pub fn rounded_seconds(duration: Duration) -> f64 {
    (duration.num_milliseconds() as f64 / 10.).round() / 100.
}

/// Local wall clock time without sub-second precision, since the log format drops it anyway.
pub fn to_log_timestamp(moment: DateTime<Utc>) -> NaiveDateTime {
    let local = moment.with_timezone(&Local).naive_local();
    local.with_nanosecond(0).unwrap_or(local)
}

/// Formats seconds as `1h2m3s`, `2m3s` or `3s`.
pub fn format_seconds(value: f64) -> String {
    let v = seconds(value);
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
