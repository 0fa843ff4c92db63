use chrono::{DateTime, SecondsFormat, Utc};

/// Format milliseconds as an Application Insights timespan `HH:MM:SS.mmm`.
///
/// Hours are always `00`; request durations are expected to stay below one hour. Negative and
/// non-finite durations are treated as zero.
pub(crate) fn duration_to_string(duration_ms: f64) -> String {
    let duration_ms = if duration_ms.is_finite() && duration_ms > 0.0 {
        duration_ms
    } else {
        0.0
    };
    let total_seconds = (duration_ms / 1000.0).floor();
    let millis = (duration_ms - total_seconds * 1000.0) as u64;
    let total_seconds = total_seconds as u64;
    let m = total_seconds / 60;
    let s = total_seconds % 60;
    format!("00:{:0>2}:{:0>2}.{:0>3}", m, s, millis)
}

pub(crate) fn time_to_string(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn now_string() -> String {
    time_to_string(Utc::now())
}

/// Random 64-bit id as 16 lowercase hex characters.
pub(crate) fn random_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}
