//! Human-readable duration formatting for messages and reports.

/// Short "N min M sec" form used in the session-completed message.
pub fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    let remaining_seconds = seconds % 60;
    format!("{minutes} min {remaining_seconds} sec")
}

/// Full human form, collapsing to the largest useful units.
///
/// Sub-minute durations render as seconds, sub-hour as minutes and
/// seconds, and anything longer as hours and minutes.
pub fn format_time_from_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds} sec");
    }

    let minutes = seconds / 60;
    let remaining_seconds = seconds % 60;

    if minutes < 60 {
        return if remaining_seconds > 0 {
            format!("{minutes} min {remaining_seconds} sec")
        } else {
            format!("{minutes} min")
        };
    }

    let hours = minutes / 60;
    let remaining_minutes = minutes % 60;

    if remaining_minutes > 0 || remaining_seconds > 0 {
        format!("{hours} h {remaining_minutes} min")
    } else {
        format!("{hours} h")
    }
}
