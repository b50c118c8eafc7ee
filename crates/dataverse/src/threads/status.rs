use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::EducationThread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Open,
    OpenStart,
    OpenEnd,
    Active,
    Upcoming,
    Expired,
    Unknown,
}

impl ThreadStatus {
    /// Statuses in listing priority: running threads first, finished ones last.
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Active,
            Self::Upcoming,
            Self::Open,
            Self::OpenStart,
            Self::OpenEnd,
            Self::Expired,
            Self::Unknown,
        ]
    }

    pub fn priority(self) -> usize {
        Self::ordered()
            .iter()
            .position(|status| *status == self)
            .unwrap_or(usize::MAX)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::OpenStart => "open_start",
            Self::OpenEnd => "open_end",
            Self::Active => "active",
            Self::Upcoming => "upcoming",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

impl EducationThread {
    pub fn status(&self, today: NaiveDate) -> ThreadStatus {
        match (self.is_open_start, self.is_open_end) {
            (true, true) => ThreadStatus::Open,
            (true, false) => ThreadStatus::OpenStart,
            (false, true) => ThreadStatus::OpenEnd,
            (false, false) => match (self.start_date, self.end_date) {
                (Some(start), _) if today < start => ThreadStatus::Upcoming,
                (_, Some(end)) if today > end => ThreadStatus::Expired,
                (Some(_), Some(_)) => ThreadStatus::Active,
                _ => ThreadStatus::Unknown,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ContentId, ThreadId};
    use chrono::Utc;
    use serde_json::Map;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn thread(open_start: bool, open_end: bool) -> EducationThread {
        EducationThread {
            id: ThreadId(1),
            article: "UX-2025-04".to_string(),
            author_content: ContentId(1),
            start_date: Some(date(2025, 4, 1)),
            end_date: Some(date(2025, 6, 30)),
            is_open_start: open_start,
            is_open_end: open_end,
            is_auto_generated: false,
            schedule: Map::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn open_flags_decide_before_dates() {
        let today = date(2030, 1, 1);
        assert_eq!(thread(true, true).status(today), ThreadStatus::Open);
        assert_eq!(thread(true, false).status(today), ThreadStatus::OpenStart);
        assert_eq!(thread(false, true).status(today), ThreadStatus::OpenEnd);
    }

    #[test]
    fn closed_bounds_compare_against_today() {
        let closed = thread(false, false);
        assert_eq!(closed.status(date(2025, 3, 31)), ThreadStatus::Upcoming);
        assert_eq!(closed.status(date(2025, 4, 1)), ThreadStatus::Active);
        assert_eq!(closed.status(date(2025, 6, 30)), ThreadStatus::Active);
        assert_eq!(closed.status(date(2025, 7, 1)), ThreadStatus::Expired);
    }

    #[test]
    fn missing_closed_bound_is_unknown() {
        let mut broken = thread(false, false);
        broken.start_date = None;
        assert_eq!(broken.status(date(2025, 5, 1)), ThreadStatus::Unknown);
        assert_eq!(broken.status(date(2025, 8, 1)), ThreadStatus::Expired);
    }

    #[test]
    fn remaining_bound_still_constrains_running() {
        let open_start = thread(true, false);
        assert!(open_start.runs_on(date(2020, 1, 1)));
        assert!(!open_start.runs_on(date(2025, 7, 1)));

        let open_end = thread(false, true);
        assert!(!open_end.runs_on(date(2025, 3, 1)));
        assert!(open_end.runs_on(date(2040, 1, 1)));

        let mut unbounded = thread(true, false);
        unbounded.is_open_end = true;
        assert!(unbounded.runs_on(date(1999, 1, 1)));
    }

    #[test]
    fn priority_places_active_first_and_expired_last() {
        assert_eq!(ThreadStatus::Active.priority(), 0);
        assert!(ThreadStatus::Open.priority() < ThreadStatus::Expired.priority());
        assert!(ThreadStatus::Expired.priority() < ThreadStatus::Unknown.priority());
    }
}
