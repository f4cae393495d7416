//! Derived, read-only views over the task store: search, filters and the
//! sort parameters sent back to the API.

use chrono::{Datelike, Local, NaiveDate, TimeDelta};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::{CategoryId, TAGGED_ONLY, TagId, Task, TaskId};
use crate::store::{OrganizerState, TaskState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Complete,
    Incomplete,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [StatusFilter::All, StatusFilter::Complete, StatusFilter::Incomplete];

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Complete => "Completed",
            StatusFilter::Incomplete => "Incomplete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DueFilter {
    #[default]
    All,
    NoDueDate,
    Overdue,
    Today,
    ThisWeek,
    Future,
}

impl DueFilter {
    pub const ALL: [DueFilter; 6] = [
        DueFilter::All,
        DueFilter::NoDueDate,
        DueFilter::Overdue,
        DueFilter::Today,
        DueFilter::ThisWeek,
        DueFilter::Future,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DueFilter::All => "All",
            DueFilter::NoDueDate => "No Due Date",
            DueFilter::Overdue => "Overdue",
            DueFilter::Today => "Due Today",
            DueFilter::ThisWeek => "Due This Week",
            DueFilter::Future => "Future",
        }
    }

    fn matches(&self, due: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (self, due) {
            (DueFilter::All, _) => true,
            (DueFilter::NoDueDate, due) => due.is_none(),
            (_, None) => false,
            (DueFilter::Overdue, Some(d)) => d < today,
            (DueFilter::Today, Some(d)) => d == today,
            (DueFilter::ThisWeek, Some(d)) => d >= today && d <= end_of_week(today),
            (DueFilter::Future, Some(d)) => d > today,
        }
    }
}

/// Sunday of the Monday-based week containing `day`
pub fn end_of_week(day: NaiveDate) -> NaiveDate {
    let remaining = 6 - i64::from(day.weekday().num_days_from_monday());
    day + TimeDelta::days(remaining)
}

/// Calendar date of a task's due timestamp in the local timezone
pub fn local_due_date(task: &Task) -> Option<NaiveDate> {
    task.due_date.map(|d| d.with_timezone(&Local).date_naive())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub search: String,
    pub categories: Vec<CategoryId>,
    /// Selected tags; `TAGGED_ONLY` in first position also excludes untagged tasks
    pub tags: Vec<TagId>,
    pub status: StatusFilter,
    pub due: DueFilter,
}

impl TaskFilter {
    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty()
            || !self.categories.is_empty()
            || !self.tags.is_empty()
            || self.status != StatusFilter::All
            || self.due != DueFilter::All
    }

    pub fn tagged_only(&self) -> bool {
        self.tags.first() == Some(&TAGGED_ONLY)
    }

    pub fn toggle_tag(&mut self, id: TagId) {
        if id == TAGGED_ONLY {
            self.toggle_tagged_only();
        } else if let Some(pos) = self.tags.iter().position(|t| *t == id) {
            self.tags.remove(pos);
        } else {
            self.tags.push(id);
        }
    }

    pub fn toggle_tagged_only(&mut self) {
        if self.tagged_only() {
            self.tags.remove(0);
        } else {
            self.tags.retain(|t| *t != TAGGED_ONLY);
            self.tags.insert(0, TAGGED_ONLY);
        }
    }

    pub fn toggle_category(&mut self, id: CategoryId) {
        if let Some(pos) = self.categories.iter().position(|c| *c == id) {
            self.categories.remove(pos);
        } else {
            self.categories.push(id);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// One-line description of the active filters
    pub fn summary(&self, organizers: &OrganizerState) -> String {
        let mut parts = Vec::new();
        if !self.search.trim().is_empty() {
            parts.push(format!("Search: \"{}\"", self.search.trim()));
        }
        if self.status != StatusFilter::All {
            parts.push(format!("Status: {}", self.status.label()));
        }
        if self.due != DueFilter::All {
            parts.push(format!("Due: {}", self.due.label()));
        }
        if !self.categories.is_empty() {
            let names: Vec<String> = self
                .categories
                .iter()
                .map(|id| {
                    organizers
                        .category(*id)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| format!("#{}", id))
                })
                .collect();
            parts.push(format!("Categories: {}", names.join(", ")));
        }
        if !self.tags.is_empty() {
            let mut names: Vec<String> = self
                .tags
                .iter()
                .filter(|id| **id != TAGGED_ONLY)
                .map(|id| {
                    organizers
                        .tag(*id)
                        .map(|t| t.name.clone())
                        .unwrap_or_else(|| format!("#{}", id))
                })
                .collect();
            if self.tagged_only() {
                names.insert(0, "tagged only".to_string());
            }
            parts.push(format!("Tags: {}", names.join(", ")));
        }
        if parts.is_empty() {
            "No filters".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

/// Whether a parent task or any of its sub-tasks mentions `needle` (lowercased)
fn matches_search(state: &TaskState, task: &Task, needle: &str) -> bool {
    task.matches_text(needle)
        || state
            .subtasks_of(task.id)
            .iter()
            .any(|child| child.matches_text(needle))
}

fn matches_tags(task: &Task, filter: &TaskFilter) -> bool {
    let tagged_only = filter.tagged_only();
    let selected: Vec<TagId> = filter
        .tags
        .iter()
        .copied()
        .filter(|t| *t != TAGGED_ONLY)
        .collect();

    if task.tags.is_empty() {
        return !tagged_only;
    }
    // the tagged-only marker on its own keeps every tagged task
    selected.is_empty() || task.tags.iter().any(|t| selected.contains(t))
}

/// Visible parent task ids after applying `filter`.
///
/// Always computed from the full store; stages narrow in order search,
/// category, tags, status, due date. Sub-tasks are never returned at the
/// top level and the store's list order is preserved.
pub fn filter_tasks(state: &TaskState, filter: &TaskFilter, today: NaiveDate) -> Vec<TaskId> {
    let needle = filter.search.trim().to_lowercase();

    state
        .parent_ids()
        .filter_map(|id| state.task(id))
        .filter(|task| !task.is_subtask())
        .filter(|task| needle.is_empty() || matches_search(state, task, &needle))
        .filter(|task| {
            filter.categories.is_empty()
                || task
                    .category
                    .is_some_and(|c| filter.categories.contains(&c))
        })
        .filter(|task| filter.tags.is_empty() || matches_tags(task, filter))
        .filter(|task| match filter.status {
            StatusFilter::All => true,
            StatusFilter::Complete => task.completed,
            StatusFilter::Incomplete => !task.completed,
        })
        .filter(|task| filter.due.matches(local_due_date(task), today))
        .map(|task| task.id)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    DueDate,
    CreatedAt,
    Category,
    EstimatedTime,
    Subtasks,
}

impl SortKey {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortKey::DueDate => "due_date",
            SortKey::CreatedAt => "created_at",
            SortKey::Category => "category",
            SortKey::EstimatedTime => "estimated_time",
            SortKey::Subtasks => "subtasks",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::DueDate => "Due date",
            SortKey::CreatedAt => "Created",
            SortKey::Category => "Category priority",
            SortKey::EstimatedTime => "Duration",
            SortKey::Subtasks => "Sub-task count",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortKey::DueDate => SortKey::CreatedAt,
            SortKey::CreatedAt => SortKey::Category,
            SortKey::Category => SortKey::EstimatedTime,
            SortKey::EstimatedTime => SortKey::Subtasks,
            SortKey::Subtasks => SortKey::DueDate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Server-side ordering requested with a re-fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortRequest {
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortRequest {
    pub fn new(sort_by: SortKey, order: SortOrder) -> Self {
        Self { sort_by, order }
    }

    pub fn query(&self) -> [(&'static str, &'static str); 2] {
        [("sort_by", self.sort_by.as_param()), ("order", self.order.as_param())]
    }

    pub fn label(&self) -> String {
        let arrow = match self.order {
            SortOrder::Asc => "↑",
            SortOrder::Desc => "↓",
        };
        format!("{} {}", self.sort_by.label(), arrow)
    }
}

/// Short human form of an estimate: "1hr 30min", "45sec", "0min".
/// Seconds only show when there are no hours or minutes; days fold into hours.
pub fn format_duration(delta: TimeDelta) -> String {
    let total = delta.num_seconds().max(0);
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}hr", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}min", minutes));
    }
    if parts.is_empty() && seconds > 0 {
        parts.push(format!("{}sec", seconds));
    }
    if parts.is_empty() {
        "0min".to_string()
    } else {
        parts.join(" ")
    }
}
