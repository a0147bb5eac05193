//! Shared domain enumerations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// The six fixed age buckets content is filtered by.
///
/// Codes are persisted as `smallint` and travel through sessions and forms
/// as their integer value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "i16", into = "i16")]
pub enum AgeGroup {
    UnderOneMonth,
    OneToThreeMonths,
    ThreeToSixMonths,
    SixToTwelveMonths,
    TwelveToTwentyFourMonths,
    TwoToFiveYears,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 6] = [
        AgeGroup::UnderOneMonth,
        AgeGroup::OneToThreeMonths,
        AgeGroup::ThreeToSixMonths,
        AgeGroup::SixToTwelveMonths,
        AgeGroup::TwelveToTwentyFourMonths,
        AgeGroup::TwoToFiveYears,
    ];

    pub fn code(self) -> i16 {
        match self {
            AgeGroup::UnderOneMonth => 0,
            AgeGroup::OneToThreeMonths => 1,
            AgeGroup::ThreeToSixMonths => 2,
            AgeGroup::SixToTwelveMonths => 3,
            AgeGroup::TwelveToTwentyFourMonths => 4,
            AgeGroup::TwoToFiveYears => 5,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, DomainError> {
        match code {
            0 => Ok(AgeGroup::UnderOneMonth),
            1 => Ok(AgeGroup::OneToThreeMonths),
            2 => Ok(AgeGroup::ThreeToSixMonths),
            3 => Ok(AgeGroup::SixToTwelveMonths),
            4 => Ok(AgeGroup::TwelveToTwentyFourMonths),
            5 => Ok(AgeGroup::TwoToFiveYears),
            other => Err(DomainError::UnknownAgeGroup { code: other }),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::UnderOneMonth => "less than 1 month",
            AgeGroup::OneToThreeMonths => "1-3 months",
            AgeGroup::ThreeToSixMonths => "3-6 months",
            AgeGroup::SixToTwelveMonths => "6-12 months",
            AgeGroup::TwelveToTwentyFourMonths => "12-24 months",
            AgeGroup::TwoToFiveYears => "2-5 years",
        }
    }

    /// Map an age in whole months onto its bucket.
    ///
    /// Ages above 60 months fall back to [`AgeGroup::UnderOneMonth`]; existing
    /// content and bookmarks depend on that mapping.
    pub fn for_months(months: i32) -> Self {
        if months <= 1 {
            AgeGroup::UnderOneMonth
        } else if months < 3 {
            AgeGroup::OneToThreeMonths
        } else if months < 6 {
            AgeGroup::ThreeToSixMonths
        } else if months < 12 {
            AgeGroup::SixToTwelveMonths
        } else if months < 24 {
            AgeGroup::TwelveToTwentyFourMonths
        } else if months <= 60 {
            AgeGroup::TwoToFiveYears
        } else {
            AgeGroup::UnderOneMonth
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<i16> for AgeGroup {
    type Error = DomainError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::from_code(value.into())
    }
}

impl From<AgeGroup> for i16 {
    fn from(value: AgeGroup) -> Self {
        value.code()
    }
}

impl FromStr for AgeGroup {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainError::validation("age_group", format!("`{s}` is not a number")))?;
        Self::from_code(code)
    }
}
