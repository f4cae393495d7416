pub mod organizers;
pub mod tasks;

pub use organizers::{OrganizerAction, OrganizerState, OrganizerStore};
pub use tasks::{TaskAction, TaskState, TaskStore};
