//! Tags and categories, kept the same way as tasks: a plain state record
//! advanced by a pure reducer from confirmed API responses.

use crate::models::{Category, CategoryId, Tag, TagId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizerState {
    pub tags: Vec<Tag>,
    pub categories: Vec<Category>,
    pub loading: bool,
    pub error: String,
}

impl OrganizerState {
    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        let name = name.trim();
        self.tags.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        let name = name.trim();
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Display names for a list of tag ids, skipping unknown ids
    pub fn tag_names(&self, ids: &[TagId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.tag(*id))
            .map(|t| t.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrganizerAction {
    SetLoading(bool),
    SetError(String),
    SetTags(Vec<Tag>),
    SetCategories(Vec<Category>),
    AddTag(Tag),
    UpdateTag(Tag),
    RemoveTag(TagId),
    AddCategory(Category),
    UpdateCategory(Category),
    RemoveCategory(CategoryId),
}

pub fn apply(mut state: OrganizerState, action: OrganizerAction) -> OrganizerState {
    match action {
        OrganizerAction::SetLoading(loading) => state.loading = loading,
        OrganizerAction::SetError(error) => {
            state.error = error;
            state.loading = false;
        }
        OrganizerAction::SetTags(tags) => {
            state.tags = tags;
            sort_by_name(&mut state.tags, |t| &t.name);
            state.loading = false;
            state.error.clear();
        }
        OrganizerAction::SetCategories(categories) => {
            state.categories = categories;
            sort_by_name(&mut state.categories, |c| &c.name);
            state.loading = false;
            state.error.clear();
        }
        OrganizerAction::AddTag(tag) | OrganizerAction::UpdateTag(tag) => {
            upsert(&mut state.tags, tag, |t| t.id);
            sort_by_name(&mut state.tags, |t| &t.name);
        }
        OrganizerAction::RemoveTag(id) => state.tags.retain(|t| t.id != id),
        OrganizerAction::AddCategory(category) | OrganizerAction::UpdateCategory(category) => {
            upsert(&mut state.categories, category, |c| c.id);
            sort_by_name(&mut state.categories, |c| &c.name);
        }
        OrganizerAction::RemoveCategory(id) => state.categories.retain(|c| c.id != id),
    }
    state
}

fn upsert<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> i64) {
    let key = id(&item);
    match items.iter_mut().find(|existing| id(existing) == key) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

fn sort_by_name<T>(items: &mut [T], name: impl Fn(&T) -> &String) {
    items.sort_by_key(|item| name(item).to_lowercase());
}

#[derive(Debug, Default)]
pub struct OrganizerStore {
    state: OrganizerState,
}

impl OrganizerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OrganizerState {
        &self.state
    }

    pub fn dispatch(&mut self, action: OrganizerAction) {
        let state = std::mem::take(&mut self.state);
        self.state = apply(state, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: TagId, name: &str) -> Tag {
        Tag {
            id,
            name: name.to_string(),
        }
    }

    fn category(id: CategoryId, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            description: None,
            as_workload: true,
        }
    }

    #[test]
    fn set_tags_sorts_and_clears_error() {
        let state = OrganizerState {
            error: "Failed to load tags. Please try again.".into(),
            loading: true,
            ..OrganizerState::default()
        };
        let state = apply(state, OrganizerAction::SetTags(vec![tag(2, "work"), tag(1, "Home")]));
        assert_eq!(state.tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(state.error.is_empty());
        assert!(!state.loading);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut store = OrganizerStore::new();
        store.dispatch(OrganizerAction::SetCategories(vec![category(1, "Health"), category(2, "Work")]));
        store.dispatch(OrganizerAction::UpdateCategory(category(1, "Zen")));
        let names: Vec<_> = store.state().categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Work", "Zen"]);

        store.dispatch(OrganizerAction::RemoveCategory(2));
        assert_eq!(store.state().categories.len(), 1);
    }

    #[test]
    fn lookups_ignore_case() {
        let mut store = OrganizerStore::new();
        store.dispatch(OrganizerAction::AddTag(tag(7, "Urgent")));
        assert_eq!(store.state().tag_by_name(" urgent ").map(|t| t.id), Some(7));
        assert_eq!(store.state().tag_names(&[7, 99]), vec!["Urgent".to_string()]);
    }
}
