//! Task form data and the diff sent to the API.
//!
//! A [`TaskDraft`] holds what the form currently shows. Creating sends every
//! field that is set; editing sends a [`TaskPatch`] with only the fields that
//! changed, where a field the user cleared travels as JSON `null`.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::models::{CategoryId, TagId, Task, TaskId, hms};
use crate::utils::{parse_date, to_local_midnight};
use crate::view::local_due_date;

#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Invalid due date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid estimate '{0}', expected HH:MM or minutes")]
    InvalidEstimate(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub category: Option<CategoryId>,
    pub tags: Vec<TagId>,
    pub parent_task: Option<TaskId>,
    pub estimated_time: Option<TimeDelta>,
}

impl TaskDraft {
    /// Blank form, optionally creating a sub-task of `parent`
    pub fn for_new(parent: Option<TaskId>) -> Self {
        Self {
            parent_task: parent,
            ..Self::default()
        }
    }

    /// Form pre-filled from an existing task
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: non_blank(task.description.as_deref()),
            due_date: local_due_date(task),
            completed: task.completed,
            category: task.category,
            tags: task.tags.clone(),
            parent_task: task.parent_task,
            estimated_time: task.estimated_time,
        }
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        Ok(())
    }

    /// Every set field, ready for `POST tasks/`
    pub fn create_payload(&self) -> Result<TaskPatch, DraftError> {
        self.validate()?;
        let description = non_blank(self.description.as_deref());
        Ok(TaskPatch {
            title: Some(self.title.trim().to_string()),
            description: description.map(Some),
            due_date: self.due_date.map(|d| Some(to_local_midnight(d))),
            completed: Some(self.completed),
            category: self.category.map(Some),
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
            parent_task: self.parent_task.map(Some),
            estimated_time: self.estimated_time.map(Some),
        })
    }

    /// Only the fields that differ from `original`, ready for `PATCH tasks/{id}/`
    pub fn changes_from(&self, original: &Task) -> Result<TaskPatch, DraftError> {
        self.validate()?;
        let before = TaskDraft::from_task(original);
        let title = self.title.trim();
        let description = non_blank(self.description.as_deref());

        Ok(TaskPatch {
            title: (title != before.title).then(|| title.to_string()),
            description: changed(description, before.description),
            due_date: changed(self.due_date, before.due_date).map(|d| d.map(to_local_midnight)),
            completed: (self.completed != before.completed).then_some(self.completed),
            category: changed(self.category, before.category),
            tags: (self.tags != before.tags).then(|| self.tags.clone()),
            parent_task: changed(self.parent_task, before.parent_task),
            estimated_time: changed(self.estimated_time, before.estimated_time),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `Some(new)` when the value changed; `Some(None)` means "clear it"
fn changed<T: PartialEq>(new: Option<T>, old: Option<T>) -> Option<Option<T>> {
    if new == old { None } else { Some(new) }
}

/// Partial task body. Outer `None` omits the field, `Some(None)` sends `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<CategoryId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task: Option<Option<TaskId>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_estimate"
    )]
    pub estimated_time: Option<Option<TimeDelta>>,
}

impl TaskPatch {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn serialize_estimate<S>(value: &Option<Option<TimeDelta>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(Some(delta)) => serializer.serialize_str(&hms::format(*delta)),
        _ => serializer.serialize_none(),
    }
}

/// Due date typed into a form or passed on the command line; blank clears it
pub fn parse_due(input: &str) -> Result<Option<NaiveDate>, DraftError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    parse_date(input)
        .map(Some)
        .map_err(|_| DraftError::InvalidDate(input.to_string()))
}

/// Estimate as `HH:MM`, `HH:MM:SS` or a bare number of minutes; blank clears it
pub fn parse_estimate(input: &str) -> Result<Option<TimeDelta>, DraftError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(minutes) = input.parse::<u32>() {
        return Ok(Some(TimeDelta::minutes(i64::from(minutes))));
    }
    hms::parse(input)
        .map(Some)
        .ok_or_else(|| DraftError::InvalidEstimate(input.to_string()))
}
