use crate::types::MediaMetadata;
use chrono::NaiveDate;
use serde_json::Value;

/// Map the resolver's native metadata document to a canonical record.
///
/// Applies fallback chains for fields the tool may omit: `uploader` falls
/// back to `channel` and then to the literal `"Unknown"`, numeric fields
/// default to zero, and duration/upload-date are also rendered as display
/// strings.
pub fn normalize(raw: &Value) -> MediaMetadata {
    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();

    let uploader = raw
        .get("uploader")
        .and_then(Value::as_str)
        .or_else(|| raw.get("channel").and_then(Value::as_str))
        .unwrap_or("Unknown")
        .to_string();

    let duration_secs = raw
        .get("duration")
        .and_then(Value::as_f64)
        .map(|d| d.max(0.0) as u64)
        .unwrap_or(0);

    let upload_date = raw
        .get("upload_date")
        .and_then(Value::as_str)
        .map(str::to_string);
    let upload_date_display = upload_date.as_deref().and_then(format_upload_date);

    MediaMetadata {
        title,
        uploader,
        duration_secs,
        duration_display: format_duration(duration_secs),
        upload_date,
        upload_date_display,
        view_count: raw.get("view_count").and_then(Value::as_u64).unwrap_or(0),
        like_count: raw.get("like_count").and_then(Value::as_u64).unwrap_or(0),
        thumbnail: None,
    }
}

/// Render seconds as `H:MM:SS`, or `M:SS` under an hour
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Render a `YYYYMMDD` tool date as `YYYY-MM-DD`; None if it does not parse
fn format_upload_date(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_fall_back() {
        let meta = normalize(&json!({}));
        assert_eq!(meta.title, "Unknown");
        assert_eq!(meta.uploader, "Unknown");
        assert_eq!(meta.duration_secs, 0);
        assert_eq!(meta.duration_display, "0:00");
        assert_eq!(meta.view_count, 0);
        assert_eq!(meta.like_count, 0);
        assert!(meta.upload_date.is_none());
    }

    #[test]
    fn uploader_falls_back_to_channel() {
        let meta = normalize(&json!({ "channel": "Some Channel" }));
        assert_eq!(meta.uploader, "Some Channel");

        let meta = normalize(&json!({ "uploader": "Someone", "channel": "Other" }));
        assert_eq!(meta.uploader, "Someone");
    }

    #[test]
    fn full_document_normalizes() {
        let meta = normalize(&json!({
            "title": "A Song",
            "uploader": "An Artist",
            "duration": 3725.4,
            "upload_date": "20230405",
            "view_count": 1200,
            "like_count": 34
        }));
        assert_eq!(meta.title, "A Song");
        assert_eq!(meta.duration_secs, 3725);
        assert_eq!(meta.duration_display, "1:02:05");
        assert_eq!(meta.upload_date_display.as_deref(), Some("2023-04-05"));
        assert_eq!(meta.view_count, 1200);
    }

    #[test]
    fn short_durations_have_no_hour_field() {
        assert_eq!(format_duration(61), "1:01");
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(3600), "1:00:00");
    }

    #[test]
    fn bad_upload_date_has_no_display_form() {
        let meta = normalize(&json!({ "upload_date": "not-a-date" }));
        assert_eq!(meta.upload_date.as_deref(), Some("not-a-date"));
        assert!(meta.upload_date_display.is_none());
    }
}
