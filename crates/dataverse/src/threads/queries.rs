use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::domain::EducationThread;
use super::status::ThreadStatus;
use crate::store::Dataset;

/// Criteria for listing education threads. Unset fields do not filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadFilter {
    #[serde(default)]
    pub status: Option<ThreadStatus>,
    /// Case-insensitive substring of the article.
    #[serde(default)]
    pub article: Option<String>,
    /// Course format encoded in the article (bootcamp, workshop, ...).
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub schedule_key: Option<String>,
    #[serde(default)]
    pub auto_generated: Option<bool>,
    #[serde(default)]
    pub created_within_days: Option<u32>,
    #[serde(default)]
    pub order: Option<ThreadOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadOrder {
    StatusPriority,
    StartDate,
    StartDateDesc,
    Duration,
    DurationDesc,
}

impl ThreadFilter {
    pub fn matches(&self, thread: &EducationThread, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();

        if self.status.is_some_and(|status| thread.status(today) != status) {
            return false;
        }
        if let Some(query) = &self.article {
            if !contains_ignore_case(&thread.article, query) {
                return false;
            }
        }
        if let Some(format) = &self.format {
            if !contains_ignore_case(&thread.article, format) {
                return false;
            }
        }
        if let Some(key) = &self.schedule_key {
            if !thread.has_schedule_flag(key) {
                return false;
            }
        }
        if self
            .auto_generated
            .is_some_and(|flag| thread.is_auto_generated != flag)
        {
            return false;
        }
        let cutoff = self
            .created_within_days
            .and_then(|days| now.checked_sub_signed(Duration::days(i64::from(days))));
        if cutoff.is_some_and(|cutoff| thread.created_at < cutoff) {
            return false;
        }

        true
    }

    /// Matching threads in the requested order (identifier order by default).
    pub fn apply<'a>(&self, data: &'a Dataset, now: DateTime<Utc>) -> Vec<&'a EducationThread> {
        let today = now.date_naive();
        let mut threads: Vec<&EducationThread> = data
            .threads()
            .filter(|thread| self.matches(thread, now))
            .collect();

        match self.order {
            Some(ThreadOrder::StatusPriority) => {
                threads.sort_by_key(|thread| thread.status(today).priority())
            }
            Some(ThreadOrder::StartDate) => threads.sort_by_key(|thread| thread.start_date),
            Some(ThreadOrder::StartDateDesc) => {
                threads.sort_by_key(|thread| std::cmp::Reverse(thread.start_date))
            }
            Some(ThreadOrder::Duration) => threads.sort_by_key(|thread| thread.duration_days()),
            Some(ThreadOrder::DurationDesc) => {
                threads.sort_by_key(|thread| std::cmp::Reverse(thread.duration_days()))
            }
            None => {}
        }

        threads
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
