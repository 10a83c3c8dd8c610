use super::common::utc;
use crate::monitoring::investigations::recurrence::next_run;
use crate::monitoring::investigations::ScheduleKind;
use chrono::{Datelike, Duration, Timelike, Weekday};

#[test]
fn daily_advances_to_the_next_morning() {
    let next = next_run(utc(2024, 1, 1, 9, 0), ScheduleKind::Daily, utc(2024, 1, 1, 10, 0));
    assert_eq!(next, utc(2024, 1, 2, 9, 0));
}

#[test]
fn daily_keeps_a_future_anchor() {
    let anchor = utc(2024, 3, 5, 6, 30);
    let next = next_run(anchor, ScheduleKind::Daily, utc(2024, 3, 1, 12, 0));
    assert_eq!(next, anchor);
}

#[test]
fn daily_anchor_equal_to_now_advances_a_full_day() {
    let anchor = utc(2024, 1, 1, 9, 0);
    let next = next_run(anchor, ScheduleKind::Daily, anchor);
    assert_eq!(next, utc(2024, 1, 2, 9, 0));
}

#[test]
fn weekly_preserves_weekday_and_time() {
    // 2024-01-01 is a Monday.
    let next = next_run(utc(2024, 1, 1, 9, 0), ScheduleKind::Weekly, utc(2024, 1, 10, 0, 0));
    assert_eq!(next, utc(2024, 1, 15, 9, 0));
    assert_eq!(next.weekday(), Weekday::Mon);
}

#[test]
fn biweekly_advances_in_fourteen_day_steps_from_the_anchor() {
    let next = next_run(
        utc(2024, 1, 1, 9, 0),
        ScheduleKind::Biweekly,
        utc(2024, 1, 20, 0, 0),
    );
    assert_eq!(next, utc(2024, 1, 29, 9, 0));
}

#[test]
fn monthly_preserves_day_of_month() {
    let next = next_run(
        utc(2024, 1, 15, 8, 0),
        ScheduleKind::Monthly,
        utc(2024, 3, 20, 0, 0),
    );
    assert_eq!(next, utc(2024, 4, 15, 8, 0));
}

#[test]
fn monthly_clamps_into_short_months() {
    let next = next_run(
        utc(2023, 1, 31, 8, 0),
        ScheduleKind::Monthly,
        utc(2023, 2, 10, 0, 0),
    );
    assert_eq!(next, utc(2023, 2, 28, 8, 0));
}

#[test]
fn custom_keeps_a_future_anchor_unchanged() {
    let anchor = utc(2030, 6, 1, 12, 0);
    let next = next_run(anchor, ScheduleKind::Custom, utc(2024, 1, 1, 0, 0));
    assert_eq!(next, anchor);
}

#[test]
fn custom_never_reschedules_into_the_past() {
    let now = utc(2024, 1, 1, 12, 0);
    let next = next_run(utc(2020, 1, 1, 0, 0), ScheduleKind::Custom, now);
    assert_eq!(next, now + Duration::seconds(1));
}

#[test]
fn every_kind_returns_a_time_strictly_after_now() {
    let kinds = [
        ScheduleKind::Daily,
        ScheduleKind::Weekly,
        ScheduleKind::Biweekly,
        ScheduleKind::Monthly,
        ScheduleKind::Custom,
    ];
    let now = utc(2024, 7, 15, 13, 45);
    let anchors = [
        utc(2019, 2, 28, 23, 59),
        utc(2024, 7, 15, 13, 45),
        utc(2024, 7, 15, 13, 44),
        utc(2026, 1, 1, 0, 0),
    ];

    for kind in kinds {
        for anchor in anchors {
            let next = next_run(anchor, kind, now);
            assert!(
                next > now,
                "{kind:?} from {anchor} produced {next}, not after {now}"
            );
        }
    }
}

#[test]
fn daily_preserves_the_anchor_time_of_day_over_long_gaps() {
    let next = next_run(
        utc(2022, 11, 3, 5, 15),
        ScheduleKind::Daily,
        utc(2024, 6, 1, 4, 0),
    );
    assert_eq!((next.hour(), next.minute()), (5, 15));
    assert_eq!(next, utc(2024, 6, 1, 5, 15));
}
