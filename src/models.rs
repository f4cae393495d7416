use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TaskId = i64;
pub type CategoryId = i64;
pub type TagId = i64;

/// Marker placed first in a tag selection to exclude untagged tasks
pub const TAGGED_ONLY: TagId = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub tag_names: Vec<String>,
    #[serde(default)]
    pub parent_task: Option<TaskId>,
    #[serde(default)]
    pub has_subtasks: bool,
    #[serde(default)]
    pub sub_tasks: Vec<TaskId>,
    #[serde(default, with = "hms")]
    pub estimated_time: Option<TimeDelta>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            due_date: None,
            completed: false,
            completed_at: None,
            category: None,
            category_name: None,
            tags: Vec::new(),
            tag_names: Vec::new(),
            parent_task: None,
            has_subtasks: false,
            sub_tasks: Vec::new(),
            estimated_time: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_task.is_some()
    }

    /// Case-insensitive match of `needle` (already lowercased) against title and description
    pub fn matches_text(&self, needle: &str) -> bool {
        if self.title.to_lowercase().contains(needle) {
            return true;
        }
        self.description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_as_workload")]
    pub as_workload: bool,
}

fn default_as_workload() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// Body sent when creating or renaming a category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub as_workload: bool,
}

/// Body sent when creating or renaming a tag
#[derive(Debug, Clone, Serialize)]
pub struct TagInput {
    pub name: String,
}

/// Aggregate view kept alongside the task map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub parent_count: usize,
    #[serde(default)]
    pub incomplete_count: usize,
    #[serde(default)]
    pub complete_count: usize,
    #[serde(default)]
    pub incomplete_tasks: Vec<TaskId>,
    #[serde(default)]
    pub complete_tasks: Vec<TaskId>,
}

/// Bulk-load payload: the task map plus the aggregates, flattened
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskListResponse {
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
    #[serde(flatten)]
    pub data: TaskData,
}

/// Outcome of deleting a parent task.
///
/// The API answers with one of two shapes depending on `keep_subtasks`:
/// the promoted sub-tasks with their completion breakdown, or the ids of
/// the sub-tasks that were deleted alongside the parent. Every field is
/// defaulted so either shape (or an empty body) decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
    #[serde(default)]
    pub sub_count: usize,
    #[serde(default)]
    pub incomplete_count: usize,
    #[serde(default)]
    pub complete_count: usize,
    #[serde(default)]
    pub incomplete_tasks: Vec<TaskId>,
    #[serde(default)]
    pub complete_tasks: Vec<TaskId>,
    #[serde(default)]
    pub deleted_subtasks: Vec<TaskId>,
}

/// Login answers with both tokens; refresh answers with a new access token only
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Body for `POST register/`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Durations travel as `"[D ]HH:MM:SS[.ffffff]"`
pub mod hms {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<TimeDelta>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(delta) => serializer.serialize_str(&format(*delta)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<TimeDelta>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {}", s))),
        }
    }

    pub fn format(delta: TimeDelta) -> String {
        let total = delta.num_seconds().max(0);
        let days = total / 86_400;
        let hours = (total % 86_400) / 3_600;
        let minutes = (total % 3_600) / 60;
        let seconds = total % 60;
        if days > 0 {
            format!("{} {:02}:{:02}:{:02}", days, hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        }
    }

    pub fn parse(s: &str) -> Option<TimeDelta> {
        let s = s.trim();
        let (days, clock) = match s.split_once(' ') {
            Some((d, rest)) => (d.parse::<i64>().ok()?, rest),
            None => (0, s),
        };
        let mut parts = clock.split(':');
        let hours: i64 = parts.next()?.parse().ok()?;
        let minutes: i64 = parts.next()?.parse().ok()?;
        // fractional seconds are dropped
        let seconds: i64 = match parts.next() {
            Some(sec) => sec.split('.').next()?.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        // out-of-range values are rejected, not wrapped
        let total = days
            .checked_mul(86_400)?
            .checked_add(hours.checked_mul(3_600)?)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds)?;
        TimeDelta::try_seconds(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_decodes_with_sparse_fields() {
        let task: Task = serde_json::from_str(r#"{"id": 4, "title": "Write report"}"#).unwrap();
        assert_eq!(task.id, 4);
        assert!(!task.completed);
        assert!(task.tags.is_empty());
        assert!(task.parent_task.is_none());
        assert!(task.estimated_time.is_none());
    }

    #[test]
    fn task_decodes_estimated_time() {
        let task: Task = serde_json::from_str(
            r#"{"id": 1, "title": "A", "estimated_time": "1 02:30:00", "tags": [3, 5]}"#,
        )
        .unwrap();
        assert_eq!(task.estimated_time, Some(TimeDelta::seconds(86_400 + 2 * 3_600 + 30 * 60)));
        assert_eq!(task.tags, vec![3, 5]);
    }

    #[test]
    fn hms_formats_without_days() {
        assert_eq!(hms::format(TimeDelta::minutes(90)), "01:30:00");
        assert_eq!(hms::format(TimeDelta::hours(25)), "1 01:00:00");
    }

    #[test]
    fn hms_rejects_garbage() {
        assert!(hms::parse("abc").is_none());
        assert!(hms::parse("1:2:3:4").is_none());
        assert_eq!(hms::parse("00:45:10.500"), Some(TimeDelta::seconds(45 * 60 + 10)));
    }

    #[test]
    fn hms_rejects_out_of_range_durations() {
        assert!(hms::parse("9999999999999999:00").is_none());
        assert!(hms::parse("999999999999999 00:00:00").is_none());
        // fits in i64 seconds but not in a TimeDelta
        assert!(hms::parse("200000000000 00:00:00").is_none());
    }

    #[test]
    fn task_with_huge_estimate_is_a_decode_error() {
        let result = serde_json::from_str::<Task>(
            r#"{"id": 1, "title": "A", "estimated_time": "999999999999999 00:00:00"}"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn list_response_flattens_aggregates() {
        let json = r#"{
            "tasks": {"1": {"id": 1, "title": "A"}},
            "total_count": 1, "parent_count": 1,
            "incomplete_count": 1, "complete_count": 0,
            "incomplete_tasks": [1], "complete_tasks": []
        }"#;
        let payload: TaskListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(payload.tasks.len(), 1);
        assert_eq!(payload.data.incomplete_tasks, vec![1]);
        assert_eq!(payload.data.parent_count, 1);
    }

    #[test]
    fn delete_response_accepts_either_shape() {
        let discarded: DeleteResponse =
            serde_json::from_str(r#"{"deleted_subtasks": [2, 3]}"#).unwrap();
        assert_eq!(discarded.deleted_subtasks, vec![2, 3]);
        assert_eq!(discarded.sub_count, 0);

        let empty: DeleteResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, DeleteResponse::default());
    }

    #[test]
    fn matches_text_checks_description() {
        let mut task = Task::new(1, "Groceries");
        task.description = Some("Buy MILK".to_string());
        assert!(task.matches_text("milk"));
        assert!(task.matches_text("groc"));
        assert!(!task.matches_text("bread"));
    }
}
