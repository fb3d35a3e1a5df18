use chrono::{Datelike, NaiveDate};

/// Academic months in session order. The session starts in April.
pub const ACADEMIC_MONTHS: [&str; 12] = [
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
    "January",
    "February",
    "March",
];

/// Months that fall in the calendar year after the session started.
const NEXT_YEAR_MONTHS: [&str; 3] = ["January", "February", "March"];

pub fn is_academic_month(name: &str) -> bool {
    ACADEMIC_MONTHS.contains(&name)
}

/// Position of a month within the session (April = 0).
pub fn academic_month_index(name: &str) -> Option<usize> {
    ACADEMIC_MONTHS.iter().position(|m| *m == name)
}

/// Calendar year in which the session containing `date` started.
pub fn academic_year_start(date: NaiveDate) -> i32 {
    if date.month() < 4 {
        date.year() - 1
    } else {
        date.year()
    }
}

/// Calendar year a payment for `month` belongs to within the session starting `start_year`.
pub fn payment_year(month: &str, start_year: i32) -> i32 {
    if NEXT_YEAR_MONTHS.contains(&month) {
        start_year + 1
    } else {
        start_year
    }
}
