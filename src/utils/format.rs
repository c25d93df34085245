use chrono::NaiveTime;

use super::time::to_12h;

/// Format a duration in seconds to "Xh Ym" or "Ym" string
pub fn format_duration_secs(secs: i64) -> String {
    if secs <= 0 {
        return "now".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Format a NaiveTime to "HH:MM", or "hh:MM AM" when `twelve_hour` is set
pub fn format_time(t: NaiveTime, twelve_hour: bool) -> String {
    if twelve_hour {
        to_12h(t)
    } else {
        t.format("%H:%M").to_string()
    }
}

/// Cut a long text to `max` characters, appending an ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
