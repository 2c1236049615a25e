use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

const MINUTE: i64 = 60;
const HOUR: i64 = 3600;
const DAY: i64 = 86_400;
const WEEK: i64 = 604_800;

pub fn format_rfc3339(instant: OffsetDateTime) -> String {
    instant.format(&Rfc3339).expect("utc instant formats as rfc3339")
}

/// Coarse relative-time label for a stored RFC 3339 timestamp. An
/// unparsable timestamp is returned verbatim.
pub fn time_ago(timestamp: &str) -> String {
    time_ago_at(timestamp, OffsetDateTime::now_utc())
}

pub fn time_ago_at(timestamp: &str, now: OffsetDateTime) -> String {
    let Ok(instant) = OffsetDateTime::parse(timestamp, &Rfc3339) else {
        return timestamp.to_string();
    };
    let elapsed = (now - instant).whole_seconds();
    if elapsed < MINUTE {
        return "Just now".to_string();
    }
    if elapsed < HOUR {
        return unit_ago(elapsed / MINUTE, "minute");
    }
    if elapsed < DAY {
        return unit_ago(elapsed / HOUR, "hour");
    }
    if elapsed < WEEK {
        return unit_ago(elapsed / DAY, "day");
    }
    let date = format_description!("[month repr:short] [day padding:none], [year]");
    instant.format(&date).unwrap_or_else(|_| timestamp.to_string())
}

fn unit_ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn base() -> OffsetDateTime {
        OffsetDateTime::parse("2026-03-10T12:00:00Z", &Rfc3339).unwrap()
    }

    fn shifted(seconds: i64) -> String {
        format_rfc3339(base() - Duration::seconds(seconds))
    }

    #[test]
    fn under_a_minute_is_just_now() {
        assert_eq!(time_ago_at(&shifted(0), base()), "Just now");
        assert_eq!(time_ago_at(&shifted(59), base()), "Just now");
    }

    #[test]
    fn minutes_band_with_singular_form() {
        assert_eq!(time_ago_at(&shifted(60), base()), "1 minute ago");
        assert_eq!(time_ago_at(&shifted(5 * 60 + 30), base()), "5 minutes ago");
        assert_eq!(time_ago_at(&shifted(3599), base()), "59 minutes ago");
    }

    #[test]
    fn hours_band() {
        assert_eq!(time_ago_at(&shifted(3600), base()), "1 hour ago");
        assert_eq!(time_ago_at(&shifted(23 * 3600), base()), "23 hours ago");
    }

    #[test]
    fn days_band() {
        assert_eq!(time_ago_at(&shifted(86_400), base()), "1 day ago");
        assert_eq!(time_ago_at(&shifted(6 * 86_400), base()), "6 days ago");
    }

    #[test]
    fn a_week_or_more_becomes_an_absolute_date() {
        assert_eq!(time_ago_at(&shifted(7 * 86_400), base()), "Mar 3, 2026");
        assert_eq!(time_ago_at(&shifted(40 * 86_400), base()), "Jan 29, 2026");
    }

    #[test]
    fn future_timestamps_read_as_just_now() {
        assert_eq!(time_ago_at(&shifted(-120), base()), "Just now");
    }

    #[test]
    fn unparsable_timestamp_is_returned_verbatim() {
        assert_eq!(time_ago_at("yesterday-ish", base()), "yesterday-ish");
    }
}
