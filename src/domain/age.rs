//! Child age arithmetic.

use time::{Date, Duration};

use super::{error::DomainError, types::AgeGroup};

/// Children must be younger than this many days to be registered.
pub const MAX_CHILD_AGE_DAYS: i64 = 1826;

/// Whole calendar months between `dob` and `today`, ignoring the day of month.
pub fn age_in_months(dob: Date, today: Date) -> i32 {
    let years = today.year() - dob.year();
    let months = i32::from(u8::from(today.month())) - i32::from(u8::from(dob.month()));
    years * 12 + months
}

pub fn age_group_on(dob: Date, today: Date) -> AgeGroup {
    AgeGroup::for_months(age_in_months(dob, today))
}

/// Human readable age, e.g. `"7 months"` or `"2 years and 6 months"`.
///
/// The year count rounds `months / 12` half-to-even, so 30 months reads as two
/// years and 42 months as four.
pub fn age_string(months: i32) -> String {
    if months < 25 {
        return format!("{months} months");
    }
    let years = round_half_even_twelfths(months);
    let remainder = months.rem_euclid(12);
    format!("{years} years and {remainder} months")
}

fn round_half_even_twelfths(months: i32) -> i32 {
    let quotient = months.div_euclid(12);
    match months.rem_euclid(12) {
        0..=5 => quotient,
        6 if quotient % 2 == 0 => quotient,
        _ => quotient + 1,
    }
}

/// A date of birth is acceptable when it is not in the future and the child is
/// younger than [`MAX_CHILD_AGE_DAYS`].
pub fn validate_child_dob(dob: Date, today: Date) -> Result<(), DomainError> {
    if dob > today {
        return Err(DomainError::validation(
            "dob",
            "date of birth cannot be in the future",
        ));
    }
    if today - dob >= Duration::days(MAX_CHILD_AGE_DAYS) {
        return Err(DomainError::validation(
            "dob",
            "No child above the age of 5 can be added",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn months_ignore_day_of_month() {
        assert_eq!(age_in_months(date!(2024 - 01 - 31), date!(2024 - 02 - 01)), 1);
        assert_eq!(age_in_months(date!(2023 - 11 - 15), date!(2024 - 02 - 14)), 3);
        assert_eq!(age_in_months(date!(2020 - 06 - 01), date!(2024 - 06 - 30)), 48);
    }

    #[test]
    fn group_boundaries_follow_calendar_months() {
        let today = date!(2026 - 10 - 16);
        let cases = [
            (date!(2026 - 10 - 01), AgeGroup::UnderOneMonth),
            (date!(2026 - 09 - 01), AgeGroup::UnderOneMonth),
            (date!(2026 - 08 - 01), AgeGroup::OneToThreeMonths),
            (date!(2026 - 07 - 01), AgeGroup::ThreeToSixMonths),
            (date!(2026 - 04 - 01), AgeGroup::SixToTwelveMonths),
            (date!(2025 - 10 - 01), AgeGroup::TwelveToTwentyFourMonths),
            (date!(2024 - 10 - 01), AgeGroup::TwoToFiveYears),
            (date!(2021 - 10 - 01), AgeGroup::TwoToFiveYears),
            (date!(2021 - 09 - 01), AgeGroup::UnderOneMonth),
        ];
        for (dob, expected) in cases {
            assert_eq!(age_group_on(dob, today), expected, "dob = {dob}");
        }
    }

    #[test]
    fn age_string_switches_to_years_after_two_years() {
        assert_eq!(age_string(0), "0 months");
        assert_eq!(age_string(24), "24 months");
        assert_eq!(age_string(25), "2 years and 1 months");
        assert_eq!(age_string(35), "3 years and 11 months");
    }

    #[test]
    fn age_string_rounds_half_to_even() {
        assert_eq!(age_string(30), "2 years and 6 months");
        assert_eq!(age_string(42), "4 years and 6 months");
        assert_eq!(age_string(54), "4 years and 6 months");
        assert_eq!(age_string(31), "3 years and 7 months");
    }

    #[test]
    fn dob_validation_rejects_future_and_old_children() {
        let today = date!(2026 - 10 - 16);
        assert!(validate_child_dob(today, today).is_ok());
        assert!(validate_child_dob(date!(2021 - 10 - 17), today).is_ok());
        assert!(validate_child_dob(date!(2026 - 10 - 17), today).is_err());
        assert!(validate_child_dob(date!(2021 - 10 - 16), today).is_err());
        assert!(validate_child_dob(date!(2019 - 01 - 01), today).is_err());
    }
}
