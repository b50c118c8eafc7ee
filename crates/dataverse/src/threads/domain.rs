use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{ContentId, ContractId, ThreadId};
use crate::store::{require_text, DataError};

/// A scheduled run of a course built on authored content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationThread {
    pub id: ThreadId,
    pub article: String,
    pub author_content: ContentId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_open_start: bool,
    pub is_open_end: bool,
    pub is_auto_generated: bool,
    pub schedule: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl EducationThread {
    /// Days between the bounds when both are closed.
    pub fn duration_days(&self) -> Option<i64> {
        match (self.is_open_start, self.is_open_end, self.start_date, self.end_date) {
            (false, false, Some(start), Some(end)) => Some((end - start).num_days()),
            _ => None,
        }
    }

    /// Whether `today` falls inside the bounds that constrain the thread.
    pub fn runs_on(&self, today: NaiveDate) -> bool {
        let after_start = self.is_open_start || self.start_date.is_some_and(|start| start <= today);
        let before_end = self.is_open_end || self.end_date.is_some_and(|end| today <= end);
        after_start && before_end
    }

    /// True when the schedule flags `key` as enabled.
    pub fn has_schedule_flag(&self, key: &str) -> bool {
        matches!(self.schedule.get(key), Some(Value::Bool(true)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEducationThread {
    pub article: String,
    pub author_content: ContentId,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_open_start: bool,
    #[serde(default)]
    pub is_open_end: bool,
    #[serde(default)]
    pub is_auto_generated: bool,
    #[serde(default)]
    pub schedule: Map<String, Value>,
}

impl NewEducationThread {
    pub fn validate(&self) -> Result<(), DataError> {
        require_text("article", &self.article, 50)?;

        if !self.is_open_start && self.start_date.is_none() {
            return Err(DataError::invalid(
                "start_date",
                "required unless the start is open",
            ));
        }
        if !self.is_open_end && self.end_date.is_none() {
            return Err(DataError::invalid(
                "end_date",
                "required unless the end is open",
            ));
        }

        if let (false, false, Some(start), Some(end)) = (
            self.is_open_start,
            self.is_open_end,
            self.start_date,
            self.end_date,
        ) {
            if start > end {
                return Err(DataError::invalid("end_date", "must not precede start_date"));
            }
        }

        Ok(())
    }
}

/// Link between a thread and a contract staffed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadContractAssignment {
    pub thread: ThreadId,
    pub contract: ContractId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn new_thread() -> NewEducationThread {
        NewEducationThread {
            article: "DA-2025-03".to_string(),
            author_content: ContentId(1),
            start_date: Some(date(2025, 3, 1)),
            end_date: Some(date(2025, 5, 31)),
            is_open_start: false,
            is_open_end: false,
            is_auto_generated: false,
            schedule: Map::new(),
        }
    }

    #[test]
    fn closed_bounds_require_dates() {
        let mut thread = new_thread();
        thread.start_date = None;
        assert_eq!(
            thread.validate(),
            Err(DataError::invalid(
                "start_date",
                "required unless the start is open"
            ))
        );

        thread.is_open_start = true;
        assert!(thread.validate().is_ok());

        thread.end_date = None;
        assert!(thread.validate().is_err());
    }

    #[test]
    fn reversed_bounds_are_rejected() {
        let mut thread = new_thread();
        thread.end_date = Some(date(2025, 2, 1));
        assert!(thread.validate().is_err());

        thread.is_open_end = true;
        assert!(thread.validate().is_ok(), "open end ignores the recorded date");
    }
}
