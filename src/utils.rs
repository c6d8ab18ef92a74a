use chrono::{SecondsFormat, Utc};

/// Current time as an RFC3339 / ISO-8601 string with millisecond precision,
/// e.g. "2026-08-07T12:34:56.789Z" — the shape JavaScript clients expect
/// from `Date.toISOString()`.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_shape() {
        let ts = iso_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
