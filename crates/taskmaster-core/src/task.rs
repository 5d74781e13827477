use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
pub enum Status {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl Status {
    pub fn rank(self) -> u8 {
        match self {
            Self::New => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    pub status: Status,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<Status>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn from_draft(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: draft.id.unwrap_or_else(Uuid::new_v4),
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            status: draft.status.unwrap_or(Status::New),
            created_at: draft.created_at.unwrap_or(now),
        }
    }
}

/// List-view ordering: open work first, then soonest due, dated before
/// undated, newest entry breaking remaining ties.
pub fn listing_order(a: &Task, b: &Task) -> Ordering {
    a.status
        .rank()
        .cmp(&b.status.rank())
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn task_with(status: Status, due: Option<&str>, created_offset_secs: i64) -> Task {
        let base = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        Task {
            id: Uuid::new_v4(),
            title: format!("{status} task"),
            description: None,
            due_date: due.map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid due date")
            }),
            status,
            created_at: base + Duration::seconds(created_offset_secs),
        }
    }

    #[test]
    fn statuses_sort_new_then_in_progress_then_completed() {
        let mut tasks = vec![
            task_with(Status::Completed, None, 0),
            task_with(Status::New, None, 1),
            task_with(Status::InProgress, None, 2),
        ];
        tasks.sort_by(listing_order);

        let statuses: Vec<Status> = tasks.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![Status::New, Status::InProgress, Status::Completed]
        );
    }

    #[test]
    fn dated_tasks_sort_before_undated_within_a_status() {
        let mut tasks = vec![
            task_with(Status::New, None, 0),
            task_with(Status::New, Some("2024-03-05"), 1),
            task_with(Status::New, Some("2024-03-02"), 2),
        ];
        tasks.sort_by(listing_order);

        assert_eq!(
            tasks[0].due_date,
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
        assert_eq!(
            tasks[1].due_date,
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(tasks[2].due_date, None);
    }

    #[test]
    fn undated_ties_break_on_newest_entry_first() {
        let older = task_with(Status::New, None, 0);
        let newer = task_with(Status::New, None, 60);

        let mut tasks = vec![older.clone(), newer.clone()];
        tasks.sort_by(listing_order);

        assert_eq!(tasks[0].id, newer.id);
        assert_eq!(tasks[1].id, older.id);
    }

    #[test]
    fn task_serializes_with_camel_case_keys_and_plain_date() {
        let task = task_with(Status::InProgress, Some("2024-03-01"), 0);
        let json = serde_json::to_string(&task).expect("serialize task");

        assert!(json.contains("\"dueDate\":\"2024-03-01\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"status\":\"In Progress\""));
        assert!(!json.contains("description"));

        let back: Task = serde_json::from_str(&json).expect("deserialize task");
        assert_eq!(back, task);
    }
}
