//! Property tests for the RFC 2822 date parser.

use chrono::{FixedOffset, NaiveDate, TimeZone};
use proptest::prelude::*;

use mimetree::parser::date::{parse_date_time, ZoneSource};

proptest! {
    #[test]
    fn numeric_offsets_recover_wall_clock(
        year in 1900i32..2100,
        month in 1u32..=12,
        day in 1u32..=28,
        hour in 0u32..24,
        minute in 0u32..60,
        second in 0u32..60,
        offset_minutes in -(23 * 60 + 59)..=(23 * 60 + 59),
    ) {
        let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
        let local = NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap();
        let written = offset.from_local_datetime(&local).unwrap();
        let text = written.format("%a, %d %b %Y %H:%M:%S %z").to_string();

        let parsed = parse_date_time(&text).unwrap();
        prop_assert_eq!(parsed.local(), written);
        prop_assert_eq!(parsed.utc, written.with_timezone(&chrono::Utc));
        prop_assert_eq!(parsed.zone, ZoneSource::Numeric);
    }

    #[test]
    fn comments_anywhere_are_ignored(
        comment in "[a-zA-Z0-9 ]{0,12}",
        hour in 0u32..24,
    ) {
        let plain = format!("1 Jan 2000 {hour:02}:30:00 +0100");
        let commented = format!("({comment}) 1 Jan 2000 ({comment}) {hour:02}:30:00 +0100 ({comment})");
        prop_assert_eq!(
            parse_date_time(&plain).unwrap(),
            parse_date_time(&commented).unwrap()
        );
    }

    #[test]
    fn arbitrary_text_never_panics(input in "\\PC{0,40}") {
        let _ = parse_date_time(&input);
    }
}
