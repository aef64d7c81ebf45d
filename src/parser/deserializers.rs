use chrono::{NaiveDate, NaiveDateTime};

/// Day-first formats, tried before the ISO ones.
const DAY_FIRST_DT_FMTS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DAY_FIRST_DATE_FMTS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const ISO_DT_FMTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a spreadsheet date cell, reading ambiguous dates day-first
/// ("05/01/2024" is 5 January). Returns None for empty or unparseable cells.
pub fn parse_day_first_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DAY_FIRST_DT_FMTS.iter().chain(ISO_DT_FMTS) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    DAY_FIRST_DATE_FMTS
        .iter()
        .chain(&["%Y-%m-%d"])
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// "" / whitespace → None, otherwise the trimmed text.
pub fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(dt: NaiveDateTime) -> String {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    #[test]
    fn test_day_first_slash() {
        let dt = parse_day_first_datetime("05/01/2024 16:24").unwrap();
        assert_eq!(iso(dt), "2024-01-05T16:24:00");
    }

    #[test]
    fn test_day_first_with_seconds_and_dash() {
        let dt = parse_day_first_datetime("10-02-2024 08:15:30").unwrap();
        assert_eq!(iso(dt), "2024-02-10T08:15:30");
    }

    #[test]
    fn test_date_only() {
        let dt = parse_day_first_datetime("31/12/2023").unwrap();
        assert_eq!(iso(dt), "2023-12-31T00:00:00");
    }

    #[test]
    fn test_iso_still_accepted() {
        assert_eq!(
            iso(parse_day_first_datetime("2024-03-07").unwrap()),
            "2024-03-07T00:00:00"
        );
        assert_eq!(
            iso(parse_day_first_datetime("2024-03-07 09:00:00").unwrap()),
            "2024-03-07T09:00:00"
        );
    }

    #[test]
    fn test_unparseable_is_absent() {
        assert!(parse_day_first_datetime("").is_none());
        assert!(parse_day_first_datetime("   ").is_none());
        assert!(parse_day_first_datetime("not a date").is_none());
        assert!(parse_day_first_datetime("32/01/2024").is_none());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  bug "), Some("bug".to_string()));
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("\t"), None);
    }
}
