//! Date navigation
//!
//! Steps a reference date one granularity unit forwards or backwards. Month and
//! year steps clamp the day-of-month to the target month instead of rolling
//! over (Jan 31 + 1 month = Feb 28/29).

use crate::types::{Direction, Granularity};
use chrono::{Days, Months, NaiveDate};

/// Move `reference` one `granularity` unit in `direction`.
///
/// Pure: never consults the clock. A step past chrono's representable range
/// returns `reference` unchanged.
pub fn step(reference: NaiveDate, granularity: Granularity, direction: Direction) -> NaiveDate {
    let stepped = match (granularity, direction) {
        (Granularity::Day, Direction::Next) => reference.checked_add_days(Days::new(1)),
        (Granularity::Day, Direction::Prev) => reference.checked_sub_days(Days::new(1)),
        (Granularity::Week, Direction::Next) => reference.checked_add_days(Days::new(7)),
        (Granularity::Week, Direction::Prev) => reference.checked_sub_days(Days::new(7)),
        (Granularity::Month, Direction::Next) => reference.checked_add_months(Months::new(1)),
        (Granularity::Month, Direction::Prev) => reference.checked_sub_months(Months::new(1)),
        (Granularity::Year, Direction::Next) => reference.checked_add_months(Months::new(12)),
        (Granularity::Year, Direction::Prev) => reference.checked_sub_months(Months::new(12)),
    };

    stepped.unwrap_or(reference)
}

/// Apply `step` `count` times
pub fn step_n(
    reference: NaiveDate,
    granularity: Granularity,
    direction: Direction,
    count: u32,
) -> NaiveDate {
    (0..count).fold(reference, |date, _| step(date, granularity, direction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_and_week_steps() {
        assert_eq!(
            step(date(2024, 2, 28), Granularity::Day, Direction::Next),
            date(2024, 2, 29)
        );
        assert_eq!(
            step(date(2024, 3, 1), Granularity::Day, Direction::Prev),
            date(2024, 2, 29)
        );
        assert_eq!(
            step(date(2024, 12, 29), Granularity::Week, Direction::Next),
            date(2025, 1, 5)
        );
        assert_eq!(
            step(date(2024, 1, 3), Granularity::Week, Direction::Prev),
            date(2023, 12, 27)
        );
    }

    #[test]
    fn test_month_step_clamps_day() {
        assert_eq!(
            step(date(2024, 1, 31), Granularity::Month, Direction::Next),
            date(2024, 2, 29)
        );
        assert_eq!(
            step(date(2023, 1, 31), Granularity::Month, Direction::Next),
            date(2023, 2, 28)
        );
        assert_eq!(
            step(date(2024, 3, 31), Granularity::Month, Direction::Prev),
            date(2024, 2, 29)
        );
        assert_eq!(
            step(date(2024, 12, 15), Granularity::Month, Direction::Next),
            date(2025, 1, 15)
        );
    }

    #[test]
    fn test_year_step_clamps_leap_day() {
        assert_eq!(
            step(date(2024, 2, 29), Granularity::Year, Direction::Next),
            date(2025, 2, 28)
        );
        assert_eq!(
            step(date(2024, 2, 29), Granularity::Year, Direction::Prev),
            date(2023, 2, 28)
        );
        assert_eq!(
            step(date(2023, 6, 10), Granularity::Year, Direction::Next),
            date(2024, 6, 10)
        );
    }

    #[test]
    fn test_step_out_of_range_is_identity() {
        assert_eq!(
            step(NaiveDate::MAX, Granularity::Day, Direction::Next),
            NaiveDate::MAX
        );
        assert_eq!(
            step(NaiveDate::MIN, Granularity::Year, Direction::Prev),
            NaiveDate::MIN
        );
    }

    #[test]
    fn test_step_n() {
        assert_eq!(
            step_n(date(2024, 1, 31), Granularity::Month, Direction::Next, 2),
            date(2024, 3, 29)
        );
        assert_eq!(
            step_n(date(2024, 5, 5), Granularity::Day, Direction::Prev, 0),
            date(2024, 5, 5)
        );
    }
}
