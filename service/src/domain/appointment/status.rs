//! [`Status`] definitions.

use common::define_kind;

#[cfg(doc)]
use crate::domain::Appointment;

define_kind! {
    #[doc = "Lifecycle status of an [`Appointment`]."]
    enum Status {
        #[doc = "Booked, awaiting confirmation."]
        Pending = 1,

        #[doc = "Confirmed by the barber."]
        Confirmed = 2,

        #[doc = "Being served right now."]
        InProgress = 3,

        #[doc = "Served."]
        Completed = 4,

        #[doc = "Cancelled, freeing the slot."]
        Cancelled = 5,

        #[doc = "Client didn't show up."]
        NoShow = 6,
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Pending
    }
}

impl Status {
    /// Indicates whether nothing may follow this [`Status`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Indicates whether an [`Appointment`] in this [`Status`] holds its slot
    /// in the barber's schedule.
    #[must_use]
    pub const fn occupies_slot(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Indicates whether an [`Appointment`] may be created in this [`Status`].
    #[must_use]
    pub const fn is_initial(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Position of this [`Status`] on the service path
    /// `pending -> confirmed -> in_progress -> completed`, if it lies there.
    const fn progress(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::InProgress => Some(2),
            Self::Completed => Some(3),
            Self::Cancelled | Self::NoShow => None,
        }
    }

    /// Checks whether this [`Status`] may be changed to the `next` one.
    ///
    /// Moving forward along the service path may skip steps, cancelling is
    /// possible until a terminal [`Status`] is reached, and only a confirmed
    /// [`Appointment`] may become a no-show. Keeping the same [`Status`] is
    /// always allowed.
    #[must_use]
    pub fn can_become(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Cancelled => true,
            Self::NoShow => self == Self::Confirmed,
            Self::Pending
            | Self::Confirmed
            | Self::InProgress
            | Self::Completed => {
                matches!(
                    (self.progress(), next.progress()),
                    (Some(from), Some(to)) if from < to,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Status;

    const ALL: [Status; 6] = [
        Status::Pending,
        Status::Confirmed,
        Status::InProgress,
        Status::Completed,
        Status::Cancelled,
        Status::NoShow,
    ];

    #[test]
    fn moves_forward_only() {
        assert!(Status::Pending.can_become(Status::Confirmed));
        assert!(Status::Pending.can_become(Status::Completed));
        assert!(Status::Confirmed.can_become(Status::InProgress));
        assert!(Status::InProgress.can_become(Status::Completed));

        assert!(!Status::Confirmed.can_become(Status::Pending));
        assert!(!Status::InProgress.can_become(Status::Confirmed));
    }

    #[test]
    fn cancels_from_any_active_status() {
        for s in [Status::Pending, Status::Confirmed, Status::InProgress] {
            assert!(s.can_become(Status::Cancelled), "{s} -> cancelled");
        }
    }

    #[test]
    fn no_show_only_after_confirmation() {
        assert!(Status::Confirmed.can_become(Status::NoShow));
        assert!(!Status::Pending.can_become(Status::NoShow));
        assert!(!Status::InProgress.can_become(Status::NoShow));
    }

    #[test]
    fn never_leaves_terminal_status() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL.into_iter().filter(|s| *s != from) {
                assert!(!from.can_become(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn keeps_same_status() {
        for s in ALL {
            assert!(s.can_become(s), "{s} -> {s}");
        }
    }

    #[test]
    fn parses_snake_case() {
        assert_eq!("in_progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!(Status::NoShow.to_string(), "no_show");
        assert!("IN_PROGRESS".parse::<Status>().is_err());
    }

    #[test]
    fn starts_pending_or_confirmed() {
        assert_eq!(Status::default(), Status::Pending);
        assert_eq!(
            ALL.into_iter().filter(|s| s.is_initial()).collect::<Vec<_>>(),
            [Status::Pending, Status::Confirmed],
        );
    }
}
