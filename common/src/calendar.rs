//! Calendar [`Date`] and wall-clock [`Time`] without a time zone.
//!
//! Values are in the shop's local time and are never converted to UTC.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{fmt, str::FromStr, time::Duration};

use derive_more::{Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{format_description::BorrowedFormatItem, macros::format_description};

/// Format of a [`Date`]: `YYYY-MM-DD`.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Format of a [`Time`] with seconds: `HH:MM:SS`.
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

/// Format of a [`Time`] without seconds: `HH:MM`.
const SHORT_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]");

/// Calendar date.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Date(time::Date);

impl Date {
    /// Creates a new [`Date`] from the provided components.
    ///
    /// [`None`] is returned if the components don't form a valid date.
    #[must_use]
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day)
            .ok()
            .map(Self)
    }

    /// Returns the previous [`Date`], if any.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.0.previous_day().map(Self)
    }

    /// Returns the next [`Date`], if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }

    /// Combines this [`Date`] with the provided [`Time`] into a
    /// [`LocalDateTime`].
    #[must_use]
    pub fn at(self, time: Time) -> LocalDateTime {
        LocalDateTime(self.0.with_time(time.0))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.format(DATE_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl FromStr for Date {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time::Date::parse(s, DATE_FORMAT)
            .map(Self)
            .map_err(ParseError)
    }
}

impl From<time::Date> for Date {
    fn from(d: time::Date) -> Self {
        Self(d)
    }
}

/// Wall-clock time of a day with a second precision.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Time(time::Time);

impl Time {
    /// Creates a new [`Time`] from the provided components.
    ///
    /// [`None`] is returned if the components don't form a valid time.
    #[must_use]
    pub fn from_hms(hour: u8, minute: u8, second: u8) -> Option<Self> {
        time::Time::from_hms(hour, minute, second).ok().map(Self)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = if self.0.second() == 0 {
            SHORT_TIME_FORMAT
        } else {
            TIME_FORMAT
        };
        let s = self.0.format(format).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl FromStr for Time {
    type Err = ParseError;

    /// Parses either `HH:MM` or `HH:MM:SS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time::Time::parse(s, SHORT_TIME_FORMAT)
            .or_else(|_| time::Time::parse(s, TIME_FORMAT))
            .map(Self)
            .map_err(ParseError)
    }
}

impl From<time::Time> for Time {
    fn from(t: time::Time) -> Self {
        Self(t)
    }
}

/// [`Date`] and [`Time`] combined, without a time zone.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LocalDateTime(time::PrimitiveDateTime);

impl LocalDateTime {
    /// Returns the [`Date`] part of this [`LocalDateTime`].
    #[must_use]
    pub fn date(self) -> Date {
        Date(self.0.date())
    }

    /// Returns the [`Time`] part of this [`LocalDateTime`].
    #[must_use]
    pub fn time(self) -> Time {
        Time(self.0.time())
    }
}

impl std::ops::Add<Duration> for LocalDateTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

/// Error of parsing a [`Date`] or a [`Time`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("invalid format: {_0}")]
pub struct ParseError(time::error::Parse);

#[cfg(feature = "postgres")]
impl FromSql<'_> for Date {
    accepts!(DATE);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::Date::from_sql(ty, raw).map(Self)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Date {
    accepts!(DATE);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, w)
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for Time {
    accepts!(TIME);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::Time::from_sql(ty, raw).map(Self)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Time {
    accepts!(TIME);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, w)
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use super::{Date, Time};

    impl Serialize for Date {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Date {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            String::deserialize(deserializer)?
                .parse()
                .map_err(D::Error::custom)
        }
    }

    impl Serialize for Time {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Time {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            String::deserialize(deserializer)?
                .parse()
                .map_err(D::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Date, Time};

    #[test]
    fn parses_dates() {
        let d: Date = "2025-03-01".parse().unwrap();

        assert_eq!(d, Date::from_ymd(2025, 3, 1).unwrap());
        assert_eq!(d.to_string(), "2025-03-01");
        assert!("2025-02-30".parse::<Date>().is_err());
        assert!("01/03/2025".parse::<Date>().is_err());
    }

    #[test]
    fn parses_times_with_and_without_seconds() {
        let short: Time = "10:00".parse().unwrap();
        let long: Time = "10:00:00".parse().unwrap();

        assert_eq!(short, long);
        assert_eq!(short.to_string(), "10:00");
        assert_eq!("09:15:30".parse::<Time>().unwrap().to_string(), "09:15:30");
        assert!("25:00".parse::<Time>().is_err());
    }

    #[test]
    fn steps_over_midnight() {
        let d = Date::from_ymd(2025, 2, 28).unwrap();
        let late = d.at(Time::from_hms(23, 45, 0).unwrap());

        let end = late + Duration::from_secs(30 * 60);

        assert_eq!(end.date(), Date::from_ymd(2025, 3, 1).unwrap());
        assert_eq!(end.time(), Time::from_hms(0, 15, 0).unwrap());
        assert_eq!(d.next(), Some(end.date()));
        assert_eq!(end.date().previous(), Some(d));
    }
}
