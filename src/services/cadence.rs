use time::util::days_in_year_month;
use time::{Date, Month};

use crate::db::types::Cadence;

/// The due dates of one generation pass: every date the schedule owes within
/// `[from, to]`, plus the first date beyond `to` (the candidate
/// `next_due_date`). The set is a pure function of (cadence, start, window),
/// so re-running a window always re-derives the same dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DueDates {
    pub(crate) due: Vec<Date>,
    pub(crate) next_due: Date,
}

/// Walk a schedule forward from `start` (its anchor date). Dates the walk
/// passes before `from` are consumed without being owed; month-based
/// cadences keep the anchor's day-of-month, clamped to the target month's
/// last day, so a Jan-31 anchor yields Feb-28 and then Mar-31 again rather
/// than drifting.
pub(crate) fn due_dates(
    cadence: Cadence,
    start: Date,
    anchor_day: u8,
    from: Date,
    to: Date,
) -> DueDates {
    let mut current = start;
    let mut due = Vec::new();

    while current <= to {
        if current >= from {
            due.push(current);
        }
        current = advance(cadence, current, anchor_day);
    }

    DueDates { due, next_due: current }
}

fn advance(cadence: Cadence, date: Date, anchor_day: u8) -> Date {
    match cadence {
        Cadence::Weekly => date.saturating_add(time::Duration::days(7)),
        Cadence::Biweekly => date.saturating_add(time::Duration::days(14)),
        Cadence::Monthly => add_months(date, 1, anchor_day),
        Cadence::Quarterly => add_months(date, 3, anchor_day),
        Cadence::Yearly => add_months(date, 12, anchor_day),
    }
}

fn add_months(date: Date, months: i32, anchor_day: u8) -> Date {
    let zero_based = date.year() * 12 + (date.month() as i32 - 1) + months;
    let year = zero_based.div_euclid(12);
    let month = Month::try_from((zero_based.rem_euclid(12) + 1) as u8).expect("month in 1..=12");
    let day = anchor_day.min(days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).expect("clamped day is valid")
}
