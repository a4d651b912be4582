//! [`Slot`] definitions.

use std::time;

use common::{Date, LocalDateTime, Time};
use derive_more::Display;

#[cfg(doc)]
use crate::domain::Appointment;

/// Time window occupied by an [`Appointment`] in a barber's schedule.
///
/// Window is half-open: `[start, start + duration)`, so back-to-back
/// [`Slot`]s don't overlap.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("{date} {time}+{duration}")]
pub struct Slot {
    /// [`Date`] of this [`Slot`].
    pub date: Date,

    /// [`Time`] this [`Slot`] starts at.
    pub time: Time,

    /// [`Duration`] of this [`Slot`].
    pub duration: Duration,
}

impl Slot {
    /// Returns the [`LocalDateTime`] this [`Slot`] starts at.
    #[must_use]
    pub fn start(&self) -> LocalDateTime {
        self.date.at(self.time)
    }

    /// Returns the [`LocalDateTime`] this [`Slot`] ends at (exclusive).
    #[must_use]
    pub fn end(&self) -> LocalDateTime {
        self.start() + self.duration.into()
    }

    /// Indicates whether this [`Slot`] overlaps with the `other` one.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }
}

/// Duration of a [`Slot`] in minutes.
#[derive(Clone, Copy, Debug, Display, Eq, Ord, PartialEq, PartialOrd)]
#[display("{_0}min")]
pub struct Duration(u16);

impl Duration {
    /// [`Duration`] used when neither an [`Appointment`] nor its treatment
    /// specifies one.
    pub const DEFAULT: Self = Self(30);

    /// Longest possible [`Duration`]: a whole day.
    pub const MAX: Self = Self(24 * 60);

    /// Creates a new [`Duration`] if the given amount of `minutes` is
    /// positive and doesn't exceed [`Duration::MAX`].
    #[must_use]
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes > 0 && minutes <= Self::MAX.0).then_some(Self(minutes))
    }

    /// Returns the number of minutes in this [`Duration`].
    #[must_use]
    pub const fn minutes(self) -> u16 {
        self.0
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Duration> for time::Duration {
    fn from(d: Duration) -> Self {
        Self::from_secs(u64::from(d.0) * 60)
    }
}

#[cfg(test)]
mod tests {
    use common::{Date, Time};

    use super::{Duration, Slot};

    fn slot(date: &str, time: &str, minutes: u16) -> Slot {
        Slot {
            date: date.parse().unwrap(),
            time: time.parse().unwrap(),
            duration: Duration::from_minutes(minutes).unwrap(),
        }
    }

    #[test]
    fn overlaps_when_windows_intersect() {
        let a = slot("2025-03-01", "10:00", 30);

        assert!(a.overlaps(&slot("2025-03-01", "10:00", 30)));
        assert!(a.overlaps(&slot("2025-03-01", "10:15", 30)));
        assert!(a.overlaps(&slot("2025-03-01", "09:45", 30)));
        assert!(a.overlaps(&slot("2025-03-01", "09:00", 120)));
        assert!(slot("2025-03-01", "09:00", 120).overlaps(&a));
    }

    #[test]
    fn back_to_back_slots_do_not_overlap() {
        let a = slot("2025-03-01", "10:00", 30);

        assert!(!a.overlaps(&slot("2025-03-01", "10:30", 30)));
        assert!(!a.overlaps(&slot("2025-03-01", "09:30", 30)));
        assert!(!a.overlaps(&slot("2025-03-02", "10:00", 30)));
    }

    #[test]
    fn overlaps_across_midnight() {
        let late = slot("2025-03-01", "23:30", 60);

        assert!(late.overlaps(&slot("2025-03-02", "00:00", 30)));
        assert!(!late.overlaps(&slot("2025-03-02", "00:30", 30)));
        assert_eq!(late.end().date(), Date::from_ymd(2025, 3, 2).unwrap());
        assert_eq!(late.end().time(), Time::from_hms(0, 30, 0).unwrap());
    }

    #[test]
    fn bounds_duration() {
        assert_eq!(Duration::default().minutes(), 30);
        assert!(Duration::from_minutes(0).is_none());
        assert!(Duration::from_minutes(24 * 60).is_some());
        assert!(Duration::from_minutes(24 * 60 + 1).is_none());
    }
}
