use chrono::{DateTime, Datelike, Duration, Months, Utc};

use super::domain::ScheduleKind;

/// Smallest schedulable increment: CUSTOM anchors that have already passed
/// are pushed this far beyond `now` rather than silently into the past.
const CUSTOM_EPSILON_SECS: i64 = 1;

/// Next fire time for an investigation. Pure; all inputs and outputs are UTC.
///
/// The result is always strictly after `now`, for every kind — an anchor
/// equal to `now` advances a full period, which is what prevents immediate
/// re-fire loops after a completed run.
pub fn next_run(anchor: DateTime<Utc>, kind: ScheduleKind, now: DateTime<Utc>) -> DateTime<Utc> {
    match kind {
        ScheduleKind::Daily => advance_by_days(anchor, 1, now),
        ScheduleKind::Weekly => advance_by_days(anchor, 7, now),
        ScheduleKind::Biweekly => advance_by_days(anchor, 14, now),
        ScheduleKind::Monthly => advance_by_months(anchor, now),
        ScheduleKind::Custom => {
            if anchor > now {
                anchor
            } else {
                now + Duration::seconds(CUSTOM_EPSILON_SECS)
            }
        }
    }
}

/// Advance the anchor by whole `step_days` periods until strictly after
/// `now`, preserving the anchor's time of day (and weekday for 7/14-day
/// steps).
fn advance_by_days(anchor: DateTime<Utc>, step_days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    if anchor > now {
        return anchor;
    }

    let elapsed_days = (now - anchor).num_days();
    let periods = elapsed_days / step_days + 1;
    let mut candidate = anchor + Duration::days(periods * step_days);
    while candidate <= now {
        candidate += Duration::days(step_days);
    }
    candidate
}

/// Advance by calendar months, preserving the anchor's day-of-month and time.
/// Short target months clamp to their last day (chrono's month arithmetic).
fn advance_by_months(anchor: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if anchor > now {
        return anchor;
    }

    let elapsed_months =
        (now.year() - anchor.year()) * 12 + now.month() as i32 - anchor.month() as i32;
    let mut months = elapsed_months.max(0) as u32;
    loop {
        let candidate = anchor
            .checked_add_months(Months::new(months))
            .unwrap_or_else(|| now + Duration::seconds(CUSTOM_EPSILON_SECS));
        if candidate > now {
            return candidate;
        }
        months += 1;
    }
}
